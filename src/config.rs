use crate::{PoolError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::num::NonZeroUsize;
use std::path::Path;
use std::thread;

const DEFAULT_THREAD_NAME: &str = "fnpool";

pub type ConcurrencyProbe = fn() -> io::Result<NonZeroUsize>;

pub fn available_parallelism() -> io::Result<NonZeroUsize> {
    thread::available_parallelism()
}

/// Pool settings, loadable from a JSON document.
///
/// Every field is optional in the document:
///
/// ```json
/// { "workers": 4, "thread_name": "render", "stack_size": 1048576 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PoolConfig {
    pub workers: Option<usize>,
    // workers are named `<thread_name>-<index>`
    pub thread_name: String,
    pub stack_size: Option<usize>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        PoolConfig {
            workers: None,
            thread_name: DEFAULT_THREAD_NAME.to_owned(),
            stack_size: None,
        }
    }
}

impl PoolConfig {
    pub fn from_json(doc: &str) -> Result<PoolConfig> {
        let config: PoolConfig = serde_json::from_str(doc)?;
        check_thread_name(&config.thread_name)?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<PoolConfig> {
        let doc = fs::read_to_string(path)?;
        PoolConfig::from_json(&doc)
    }
}

/// Thread names are handed to the OS as C strings.
pub fn check_thread_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(PoolError::Configuration(
            "thread_name must not be empty".to_owned(),
        ));
    }
    if name.contains('\0') {
        return Err(PoolError::Configuration(
            "thread_name must not contain NUL bytes".to_owned(),
        ));
    }
    Ok(())
}

/// An explicit zero is rejected. Without a request the probe decides, and a
/// failing probe is a configuration error rather than a silent fallback.
pub fn resolve_worker_count(requested: Option<usize>, probe: ConcurrencyProbe) -> Result<usize> {
    match requested {
        Some(0) => Err(PoolError::Configuration(
            "worker count must be at least 1".to_owned(),
        )),
        Some(n) => Ok(n),
        None => probe().map(NonZeroUsize::get).map_err(|e| {
            PoolError::Configuration(format!("cannot determine hardware concurrency: {}", e))
        }),
    }
}

use failure::Fail;
use std::io;
use std::time::Duration;

/// Error type for the pool.
#[derive(Fail, Debug)]
pub enum PoolError {
    /// The worker count could not be resolved to a positive integer,
    /// or a configuration document was rejected.
    #[fail(display = "invalid pool configuration: {}", _0)]
    Configuration(String),
    /// Spawning a worker or reading a configuration file failed.
    #[fail(display = "{}", _0)]
    Io(#[cause] io::Error),
    /// A configuration document is not valid JSON.
    #[fail(display = "{}", _0)]
    Json(#[cause] serde_json::Error),
    /// `wait_timeout` gave up while work was still pending.
    #[fail(display = "timed out after {:?} with {} items pending", waited, pending)]
    Timeout { waited: Duration, pending: usize },
}

impl From<io::Error> for PoolError {
    fn from(err: io::Error) -> PoolError {
        PoolError::Io(err)
    }
}

impl From<serde_json::Error> for PoolError {
    fn from(err: serde_json::Error) -> PoolError {
        PoolError::Json(err)
    }
}

pub type Result<T> = std::result::Result<T, PoolError>;

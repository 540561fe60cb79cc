//! A fixed-size pool of worker threads that run one function over a stream
//! of submitted values.
//!
//! The function is bound once at construction and must produce side effects
//! only: nothing flows back through `submit`, and failures inside the
//! function are never returned from `wait`. Panics are caught at the call
//! boundary and routed to an optional hook (see [`Builder::on_panic`]); the
//! worker carries on with the next value. Under `panic = "abort"` a panic
//! takes the whole process down and the pool offers no guarantees.
//!
//! ```
//! use fnpool::thread_pool::FunctionPool;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! let total = Arc::new(AtomicUsize::new(0));
//! let sum = Arc::clone(&total);
//! let pool = FunctionPool::with_workers(move |n: &usize| {
//!     sum.fetch_add(*n, Ordering::SeqCst);
//! }, 2)?;
//!
//! for n in 1..=10 {
//!     pool.submit(n);
//! }
//! pool.wait();
//! assert_eq!(total.load(Ordering::SeqCst), 55);
//! # Ok::<(), fnpool::PoolError>(())
//! ```

use crate::config::{self, ConcurrencyProbe, PoolConfig};
use crate::{PoolError, Result};
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

mod queue;
mod worker;

use self::queue::WorkQueue;
use self::worker::{Shared, TargetFn};

pub use self::worker::{PanicHook, WorkerPanic};

// The worker count is caller supplied; the OS decides how many threads it
// will actually grant.
const MAX_PREALLOCATED_WORKERS: usize = 1024;

pub struct Builder<T> {
    function: TargetFn<T>,
    config: PoolConfig,
    probe: ConcurrencyProbe,
    on_panic: Option<PanicHook>,
}

impl<T: Send + 'static> Builder<T> {
    pub fn new<F>(function: F) -> Self
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        Builder::from_config(function, PoolConfig::default())
    }

    pub fn from_config<F>(function: F, config: PoolConfig) -> Self
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        Builder {
            function: Box::new(function),
            config,
            probe: config::available_parallelism,
            on_panic: None,
        }
    }

    pub fn workers(mut self, count: usize) -> Self {
        self.config.workers = Some(count);
        self
    }

    pub fn thread_name(mut self, prefix: impl Into<String>) -> Self {
        self.config.thread_name = prefix.into();
        self
    }

    pub fn stack_size(mut self, bytes: usize) -> Self {
        self.config.stack_size = Some(bytes);
        self
    }

    /// Called on the worker thread for every panic caught in the target
    /// function. Without a hook the panic is logged.
    pub fn on_panic<H>(mut self, hook: H) -> Self
    where
        H: Fn(&WorkerPanic) + Send + Sync + 'static,
    {
        self.on_panic = Some(Arc::new(hook));
        self
    }

    pub fn concurrency_probe(mut self, probe: ConcurrencyProbe) -> Self {
        self.probe = probe;
        self
    }

    /// Spawns every worker and returns once all of them are running.
    pub fn build(self) -> Result<FunctionPool<T>> {
        self.build_with(worker::spawn_worker)
    }

    fn build_with<S>(self, mut spawn: S) -> Result<FunctionPool<T>>
    where
        S: FnMut(usize, Arc<Shared<T>>, thread::Builder) -> io::Result<JoinHandle<()>>,
    {
        let count = config::resolve_worker_count(self.config.workers, self.probe)?;
        config::check_thread_name(&self.config.thread_name)?;

        let shared = Arc::new(Shared {
            queue: WorkQueue::new(),
            function: self.function,
            on_panic: self.on_panic,
        });
        let mut pool = FunctionPool {
            shared,
            workers: Vec::with_capacity(count.min(MAX_PREALLOCATED_WORKERS)),
        };

        for id in 0..count {
            let mut builder =
                thread::Builder::new().name(format!("{}-{}", self.config.thread_name, id));
            if let Some(size) = self.config.stack_size {
                builder = builder.stack_size(size);
            }
            match spawn(id, Arc::clone(&pool.shared), builder) {
                Ok(handle) => pool.workers.push(handle),
                Err(e) => {
                    // dropping the pool shuts down and joins what was spawned
                    error!("failed to spawn worker {}: {}", id, e);
                    return Err(e.into());
                }
            }
        }

        pool.shared.queue.wait_for_workers(count);
        info!(
            "started {} workers named {}-*",
            count, self.config.thread_name
        );
        Ok(pool)
    }
}

/// Runs one bound function on a fixed set of worker threads.
///
/// Values passed to [`submit`](FunctionPool::submit) are owned by the pool
/// until a worker has executed and dropped them. Dropping the pool discards
/// whatever is still queued and joins every worker; call
/// [`wait`](FunctionPool::wait) first to drain.
pub struct FunctionPool<T> {
    shared: Arc<Shared<T>>,
    workers: Vec<JoinHandle<()>>,
}

impl<T: Send + 'static> FunctionPool<T> {
    pub fn new<F>(function: F) -> Result<Self>
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        Builder::new(function).build()
    }

    pub fn with_workers<F>(function: F, workers: usize) -> Result<Self>
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        Builder::new(function).workers(workers).build()
    }

    pub fn builder<F>(function: F) -> Builder<T>
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        Builder::new(function)
    }

    pub fn submit(&self, value: T) {
        self.shared.queue.push(value);
    }
}

impl<T> FunctionPool<T> {
    /// Blocks until every submitted value has been executed.
    ///
    /// Returns the first time the pending count is observed at zero.
    /// Everything submitted before the call is then complete; values
    /// submitted afterwards need another `wait`. Safe to call from several
    /// threads at once.
    pub fn wait(&self) {
        self.shared.queue.wait_idle();
    }

    /// [`wait`](FunctionPool::wait) with a deadline.
    pub fn wait_timeout(&self, timeout: Duration) -> Result<()> {
        self.shared
            .queue
            .wait_idle_timeout(timeout)
            .map_err(|pending| PoolError::Timeout {
                waited: timeout,
                pending,
            })
    }

    /// Values submitted but not yet fully executed.
    pub fn pending(&self) -> usize {
        self.shared.queue.pending()
    }

    pub fn queued(&self) -> usize {
        self.shared.queue.len()
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    pub fn live_workers(&self) -> usize {
        self.shared.queue.live()
    }
}

impl<T> Drop for FunctionPool<T> {
    fn drop(&mut self) {
        let discarded = self.shared.queue.shutdown();
        if !discarded.is_empty() {
            warn!("discarding {} queued items at shutdown", discarded.len());
        }
        drop(discarded);

        for handle in self.workers.drain(..) {
            if let Err(e) = handle.join() {
                error!("worker thread terminated abnormally: {:?}", e);
            }
        }
        info!("pool shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn failed_spawn_joins_the_partial_pool() {
        let captured = Arc::new(AtomicUsize::new(0));
        let calls = Arc::clone(&captured);
        let attempts = AtomicUsize::new(0);

        let res = Builder::new(move |_: &u32| {
            calls.fetch_add(1, Ordering::SeqCst);
        })
        .workers(4)
        .build_with(|id, shared, builder| {
            attempts.fetch_add(1, Ordering::SeqCst);
            if id == 2 {
                Err(io::Error::new(io::ErrorKind::Other, "out of threads"))
            } else {
                worker::spawn_worker(id, shared, builder)
            }
        });

        match res {
            Err(PoolError::Io(e)) => assert_eq!(e.to_string(), "out of threads"),
            Err(e) => panic!("unexpected error {}", e),
            Ok(_) => panic!("pool built despite a failed spawn"),
        }
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        // the two spawned workers held the function; it is gone once they are joined
        assert_eq!(Arc::strong_count(&captured), 1);
        assert_eq!(captured.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn nul_in_thread_name_is_a_configuration_error() {
        match Builder::new(|_: &u8| {}).workers(1).thread_name("a\0b").build() {
            Err(PoolError::Configuration(msg)) => assert!(msg.contains("NUL")),
            Err(e) => panic!("unexpected error {}", e),
            Ok(_) => panic!("NUL accepted in thread name"),
        }
    }
}

use super::queue::WorkQueue;
use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

pub(crate) type TargetFn<T> = Box<dyn Fn(&T) + Send + Sync + 'static>;

/// Callback told about every panic a worker recovers from.
pub type PanicHook = Arc<dyn Fn(&WorkerPanic) + Send + Sync + 'static>;

/// A panic raised by the target function and caught by a worker.
#[derive(Debug, Clone)]
pub struct WorkerPanic {
    /// Index of the worker that caught the panic.
    pub worker: usize,
    pub message: String,
}

/// State shared by the pool handle and every worker.
pub(crate) struct Shared<T> {
    pub queue: WorkQueue<T>,
    pub function: TargetFn<T>,
    pub on_panic: Option<PanicHook>,
}

impl<T> Shared<T> {
    // Dropping the value is part of executing it, so a panicking `Drop` is
    // caught and reported like a panic in the function.
    fn execute(&self, worker: usize, value: T) {
        let run = AssertUnwindSafe(move || {
            (self.function)(&value);
            drop(value);
        });
        let payload = match panic::catch_unwind(run) {
            Ok(()) => return,
            Err(payload) => payload,
        };
        let report = WorkerPanic {
            worker,
            message: panic_message(&*payload),
        };
        match self.on_panic {
            Some(ref hook) => {
                if panic::catch_unwind(AssertUnwindSafe(|| hook(&report))).is_err() {
                    error!("worker {}: panic hook panicked while reporting: {}", worker, report.message);
                }
            }
            None => error!("worker {}: target function panicked: {}", worker, report.message),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "<non-string panic payload>".to_owned()
    }
}

pub(crate) fn spawn_worker<T>(
    id: usize,
    shared: Arc<Shared<T>>,
    builder: thread::Builder,
) -> io::Result<JoinHandle<()>>
where
    T: Send + 'static,
{
    builder.spawn(move || run_worker(id, &shared))
}

// Keeps the live count honest even if the worker unwinds.
struct Registration<'a, T> {
    id: usize,
    queue: &'a WorkQueue<T>,
}

impl<'a, T> Registration<'a, T> {
    fn new(id: usize, queue: &'a WorkQueue<T>) -> Self {
        queue.worker_started();
        debug!("worker {} started", id);
        Registration { id, queue }
    }
}

impl<'a, T> Drop for Registration<'a, T> {
    fn drop(&mut self) {
        if thread::panicking() {
            error!("worker {} is unwinding", self.id);
        } else {
            debug!("worker {} exiting", self.id);
        }
        self.queue.worker_exited();
    }
}

// Marks one dequeued value as finished, on every exit path.
struct Completion<'a, T>(&'a WorkQueue<T>);

impl<'a, T> Drop for Completion<'a, T> {
    fn drop(&mut self) {
        self.0.complete();
    }
}

// Idle -> Executing -> Idle until the queue reports shutdown, then Terminated.
fn run_worker<T>(id: usize, shared: &Shared<T>) {
    let _registration = Registration::new(id, &shared.queue);

    while let Some(value) = shared.queue.pop_blocking() {
        let _done = Completion(&shared.queue);
        shared.execute(id, value);
    }
}

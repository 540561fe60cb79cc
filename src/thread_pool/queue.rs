use std::collections::VecDeque;
use std::mem;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

struct State<T> {
    items: VecDeque<T>,
    // submitted but not yet finished executing
    pending: usize,
    live: usize,
    shutdown: bool,
}

/// Unbounded FIFO of parameter values shared by the pool and its workers.
///
/// A single mutex guards the items, the pending counter, the live worker
/// count and the shutdown flag. `available` is only ever waited on by
/// workers and `idle` only by drain and startup waiters, so a push can never
/// be swallowed by a thread blocked in `wait`.
pub(crate) struct WorkQueue<T> {
    state: Mutex<State<T>>,
    available: Condvar,
    idle: Condvar,
}

impl<T> WorkQueue<T> {
    pub fn new() -> Self {
        WorkQueue {
            state: Mutex::new(State {
                items: VecDeque::new(),
                pending: 0,
                live: 0,
                shutdown: false,
            }),
            available: Condvar::new(),
            idle: Condvar::new(),
        }
    }

    // User code never runs under this lock, so poisoning carries no broken
    // invariant and is ignored.
    fn lock(&self) -> MutexGuard<State<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, value: T) {
        let mut state = self.lock();
        state.pending += 1;
        state.items.push_back(value);
        drop(state);
        self.available.notify_one();
    }

    /// Blocks until a value is available or the queue is shut down.
    /// `None` tells the worker to terminate.
    pub fn pop_blocking(&self) -> Option<T> {
        let mut state = self.lock();
        loop {
            if let Some(value) = state.items.pop_front() {
                return Some(value);
            }
            if state.shutdown {
                return None;
            }
            state = self
                .available
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Marks one dequeued value as fully executed.
    pub fn complete(&self) {
        let mut state = self.lock();
        debug_assert!(state.pending > 0, "completed more items than submitted");
        state.pending = state.pending.saturating_sub(1);
        if state.pending == 0 {
            self.idle.notify_all();
        }
    }

    pub fn wait_idle(&self) {
        let mut state = self.lock();
        while state.pending > 0 {
            state = self.idle.wait(state).unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Like `wait_idle`, but gives up at the deadline and reports how many
    /// items were still pending.
    pub fn wait_idle_timeout(&self, timeout: Duration) -> Result<(), usize> {
        let deadline = Instant::now() + timeout;
        let mut state = self.lock();
        while state.pending > 0 {
            let now = Instant::now();
            if now >= deadline {
                return Err(state.pending);
            }
            state = self
                .idle
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        Ok(())
    }

    /// Flags shutdown, wakes every worker and hands back the values that were
    /// never dequeued. The caller drops them outside the lock.
    pub fn shutdown(&self) -> VecDeque<T> {
        let mut state = self.lock();
        state.shutdown = true;
        let discarded = mem::replace(&mut state.items, VecDeque::new());
        state.pending -= discarded.len();
        if state.pending == 0 {
            self.idle.notify_all();
        }
        drop(state);
        self.available.notify_all();
        discarded
    }

    pub fn worker_started(&self) {
        self.lock().live += 1;
        self.idle.notify_all();
    }

    pub fn worker_exited(&self) {
        let mut state = self.lock();
        state.live = state.live.saturating_sub(1);
        drop(state);
        self.idle.notify_all();
    }

    /// Startup gate: blocks until `count` workers are live, or until
    /// shutdown begins.
    pub fn wait_for_workers(&self, count: usize) {
        let mut state = self.lock();
        while state.live < count && !state.shutdown {
            state = self.idle.wait(state).unwrap_or_else(PoisonError::into_inner);
        }
    }

    pub fn pending(&self) -> usize {
        self.lock().pending
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn live(&self) -> usize {
        self.lock().live
    }
}

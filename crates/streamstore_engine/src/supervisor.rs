//! Supervisor for detached fetches.
//!
//! A request with `await_fetching = false` returns as soon as the
//! in-flight state is persisted; the fetch itself runs on a thread owned
//! here, scoped to the engine's lifetime rather than the caller's. There
//! is no cancellation: a detached fetch runs to completion even if the
//! triggering caller abandons interest.

use parking_lot::Mutex;
use std::thread::{self, JoinHandle};

/// Owner of detached fetch threads.
pub struct FetchSupervisor {
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl FetchSupervisor {
    /// Creates a supervisor with no running work.
    pub fn new() -> Self {
        Self {
            handles: Mutex::new(Vec::new()),
        }
    }

    /// Spawns a detached task.
    ///
    /// Finished handles are pruned on each spawn so the set stays
    /// bounded by the number of concurrently running fetches.
    pub fn spawn<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut handles = self.handles.lock();
        handles.retain(|handle| !handle.is_finished());
        handles.push(thread::spawn(task));
    }

    /// Number of detached tasks not yet known to have finished.
    pub fn running(&self) -> usize {
        let mut handles = self.handles.lock();
        handles.retain(|handle| !handle.is_finished());
        handles.len()
    }

    /// Blocks until every detached task spawned so far has completed.
    ///
    /// Used by tests and orderly shutdown; panics from detached tasks
    /// are swallowed here because their failure path already reached the
    /// state store.
    pub fn wait_idle(&self) {
        loop {
            let drained: Vec<JoinHandle<()>> = {
                let mut handles = self.handles.lock();
                handles.drain(..).collect()
            };
            if drained.is_empty() {
                break;
            }
            for handle in drained {
                let _ = handle.join();
            }
        }
    }
}

impl Default for FetchSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn spawned_work_runs_to_completion() {
        let supervisor = FetchSupervisor::new();
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..4 {
            let counter = Arc::clone(&counter);
            supervisor.spawn(move || {
                thread::sleep(Duration::from_millis(5));
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }

        supervisor.wait_idle();
        assert_eq!(counter.load(Ordering::SeqCst), 4);
        assert_eq!(supervisor.running(), 0);
    }

    #[test]
    fn wait_idle_on_empty_supervisor_returns() {
        let supervisor = FetchSupervisor::new();
        supervisor.wait_idle();
        assert_eq!(supervisor.running(), 0);
    }

    #[test]
    fn finished_handles_are_pruned() {
        let supervisor = FetchSupervisor::new();
        supervisor.spawn(|| {});
        supervisor.wait_idle();
        supervisor.spawn(|| thread::sleep(Duration::from_millis(20)));
        assert!(supervisor.running() <= 1);
        supervisor.wait_idle();
    }
}

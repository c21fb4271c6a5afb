//! Deferred tasks that the store runs once their delay has elapsed.
//!
//! The host drives the queue from its frame loop via
//! `SceneStore::run_pending_tasks`. Tasks still queued when the store is
//! disposed or reset are cancelled and never run.

#[cfg(not(target_arch = "wasm32"))]
use std::time::{Duration, Instant};

#[cfg(target_arch = "wasm32")]
use web_time::{Duration, Instant};

/// Work the store can defer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferredTask {
    /// Recompute the selector overlay after the renderer re-laid out.
    RefreshSelector,
    /// Recompute both overlays.
    RefreshOverlays,
}

/// Handle used to cancel a scheduled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskHandle(u64);

#[derive(Debug, Clone)]
struct Scheduled {
    handle: TaskHandle,
    due: Instant,
    task: DeferredTask,
}

/// Queue of tasks ordered by due time.
#[derive(Debug, Clone, Default)]
pub struct DeferredTasks {
    scheduled: Vec<Scheduled>,
    next_handle: u64,
}

impl DeferredTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `task` to become due `delay` after `now`.
    pub fn schedule(&mut self, task: DeferredTask, now: Instant, delay: Duration) -> TaskHandle {
        let handle = TaskHandle(self.next_handle);
        self.next_handle += 1;

        let due = now + delay;
        // Keep FIFO order among tasks sharing a due time.
        let index = self.scheduled.partition_point(|s| s.due <= due);
        self.scheduled.insert(index, Scheduled { handle, due, task });
        handle
    }

    /// Cancel a task. Returns true if it was still pending.
    pub fn cancel(&mut self, handle: TaskHandle) -> bool {
        let before = self.scheduled.len();
        self.scheduled.retain(|s| s.handle != handle);
        self.scheduled.len() != before
    }

    /// Cancel every pending task, returning how many were dropped.
    pub fn cancel_all(&mut self) -> usize {
        let count = self.scheduled.len();
        self.scheduled.clear();
        count
    }

    /// Remove and return all tasks due at or before `now`, in due order.
    pub fn take_due(&mut self, now: Instant) -> Vec<DeferredTask> {
        let split = self.scheduled.partition_point(|s| s.due <= now);
        self.scheduled.drain(..split).map(|s| s.task).collect()
    }

    pub fn len(&self) -> usize {
        self.scheduled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scheduled.is_empty()
    }
}

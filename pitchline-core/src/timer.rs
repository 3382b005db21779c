//! Cancellable deferred action, driven by an explicit clock.
//!
//! There is no background thread: the owner passes the current monotonic time
//! to [`CancellableTask::poll`] and gets the action back once it is due.

use std::time::Duration;

/// Identifies one arming of a [`CancellableTask`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskHandle(u64);

#[derive(Debug, Clone)]
struct Armed<A> {
    handle: TaskHandle,
    due: Duration,
    action: A,
}

/// A single-slot deferred action. At most one instance is armed at a time.
#[derive(Debug, Clone)]
pub struct CancellableTask<A> {
    armed: Option<Armed<A>>,
    next_id: u64,
}

impl<A> Default for CancellableTask<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> CancellableTask<A> {
    pub fn new() -> Self {
        Self {
            armed: None,
            next_id: 0,
        }
    }

    /// Schedules `action` to become due at `now + delay`.
    ///
    /// Any previously armed instance is dropped first; its handle goes stale.
    pub fn arm(&mut self, now: Duration, delay: Duration, action: A) -> TaskHandle {
        let handle = TaskHandle(self.next_id);
        self.next_id += 1;
        self.armed = Some(Armed {
            handle,
            due: now + delay,
            action,
        });
        handle
    }

    /// Cancels the instance identified by `handle`.
    ///
    /// Returns whether something was canceled. Stale or repeated handles are
    /// ignored.
    pub fn cancel(&mut self, handle: TaskHandle) -> bool {
        match &self.armed {
            Some(armed) if armed.handle == handle => {
                self.armed = None;
                true
            }
            _ => false,
        }
    }

    /// Cancels whatever is armed.
    pub fn cancel_any(&mut self) -> bool {
        self.armed.take().is_some()
    }

    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    /// Handle of the armed instance, if any.
    pub fn handle(&self) -> Option<TaskHandle> {
        self.armed.as_ref().map(|armed| armed.handle)
    }

    /// Time at which the armed action becomes due.
    pub fn due(&self) -> Option<Duration> {
        self.armed.as_ref().map(|armed| armed.due)
    }

    /// Returns the action if it is due at `now`, disarming the task.
    pub fn poll(&mut self, now: Duration) -> Option<A> {
        match &self.armed {
            Some(armed) if now >= armed.due => self.armed.take().map(|armed| armed.action),
            _ => None,
        }
    }
}

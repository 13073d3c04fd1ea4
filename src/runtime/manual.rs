use super::{Scheduler, TimerHandle};
use futures::executor::{LocalPool, LocalSpawner};
use futures::future::LocalBoxFuture;
use futures::task::LocalSpawnExt;
use std::cell::{Cell, RefCell};

struct PendingTimer {
    handle: TimerHandle,
    due_ms: i64,
    task: Box<dyn FnOnce()>,
}

/// Virtual-clock scheduler. Time only moves on `advance`, and spawned
/// futures only run on `advance` or `run_until_stalled`.
pub struct ManualScheduler {
    now: Cell<i64>,
    next_id: Cell<u64>,
    timers: RefCell<Vec<PendingTimer>>,
    pool: RefCell<LocalPool>,
    spawner: LocalSpawner,
}

impl ManualScheduler {
    pub fn new() -> Self {
        let pool = LocalPool::new();
        let spawner = pool.spawner();
        Self {
            now: Cell::new(0),
            next_id: Cell::new(1),
            timers: RefCell::new(Vec::new()),
            pool: RefCell::new(pool),
            spawner,
        }
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.borrow().len()
    }

    /// Poll spawned futures until none can make progress.
    pub fn run_until_stalled(&self) {
        self.pool.borrow_mut().run_until_stalled();
    }

    /// Move the clock forward, firing due timers in order and letting
    /// spawned futures settle between them.
    pub fn advance(&self, ms: u32) {
        let target = self.now.get() + i64::from(ms);
        loop {
            self.run_until_stalled();

            let next = {
                let mut timers = self.timers.borrow_mut();
                let idx = timers
                    .iter()
                    .enumerate()
                    .filter(|(_, t)| t.due_ms <= target)
                    .min_by_key(|(_, t)| (t.due_ms, t.handle.0))
                    .map(|(i, _)| i);
                idx.map(|i| timers.remove(i))
            };
            let Some(timer) = next else {
                break;
            };

            self.now.set(self.now.get().max(timer.due_ms));
            (timer.task)();
        }
        self.now.set(target);
        self.run_until_stalled();
    }
}

impl Default for ManualScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for ManualScheduler {
    fn now_ms(&self) -> i64 {
        self.now.get()
    }

    fn schedule(&self, delay_ms: u32, task: Box<dyn FnOnce()>) -> TimerHandle {
        let handle = TimerHandle(self.next_id.get());
        self.next_id.set(handle.0 + 1);
        self.timers.borrow_mut().push(PendingTimer {
            handle,
            due_ms: self.now.get() + i64::from(delay_ms),
            task,
        });
        handle
    }

    fn cancel(&self, handle: TimerHandle) {
        self.timers.borrow_mut().retain(|t| t.handle != handle);
    }

    fn spawn(&self, fut: LocalBoxFuture<'static, ()>) {
        if let Err(e) = self.spawner.spawn_local(fut) {
            tracing::warn!(error = %e, "failed to spawn task");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    fn recorder() -> (Rc<RefCell<Vec<&'static str>>>, impl Fn(&'static str) -> Box<dyn FnOnce()>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let log2 = log.clone();
        let make = move |name: &'static str| -> Box<dyn FnOnce()> {
            let log = log2.clone();
            Box::new(move || log.borrow_mut().push(name))
        };
        (log, make)
    }

    #[test]
    fn test_timer_fires_only_after_delay() {
        let s = ManualScheduler::new();
        let (log, make) = recorder();
        s.schedule(500, make("a"));

        s.advance(499);
        assert!(log.borrow().is_empty());

        s.advance(1);
        assert_eq!(*log.borrow(), vec!["a"]);
        assert_eq!(s.now_ms(), 500);
        assert_eq!(s.pending_timers(), 0);
    }

    #[test]
    fn test_timers_fire_in_due_order() {
        let s = ManualScheduler::new();
        let (log, make) = recorder();
        s.schedule(300, make("late"));
        s.schedule(100, make("early"));
        s.advance(1000);
        assert_eq!(*log.borrow(), vec!["early", "late"]);
    }

    #[test]
    fn test_cancelled_timer_never_fires() {
        let s = ManualScheduler::new();
        let (log, make) = recorder();
        let h = s.schedule(100, make("a"));
        s.cancel(h);
        s.advance(1000);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_spawned_future_runs_when_stalled_pool_is_polled() {
        let s = ManualScheduler::new();
        let hit = Rc::new(Cell::new(false));
        let hit2 = hit.clone();
        s.spawn(Box::pin(async move { hit2.set(true) }));
        assert!(!hit.get());

        s.run_until_stalled();
        assert!(hit.get());
    }

    #[test]
    fn test_timer_scheduled_from_timer_fires_within_same_advance() {
        let s = Rc::new(ManualScheduler::new());
        let (log, make) = recorder();
        let s2 = s.clone();
        let second = make("second");
        let first = make("first");
        s.schedule(
            100,
            Box::new(move || {
                first();
                s2.schedule(100, second);
            }),
        );
        s.advance(250);
        assert_eq!(*log.borrow(), vec!["first", "second"]);
    }
}

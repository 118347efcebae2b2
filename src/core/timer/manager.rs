//=========================================================================
// Timer Manager
//=========================================================================
//
// Pools timers by interval and multiplexes timeout/interval identifiers
// onto a minimal set of underlying timers.
//
// The manager's own tick handler is subscribed to the driving trigger
// lazily, on first timer creation, and unsubscribed when the last timer
// is deleted.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use log::debug;

//=== Internal Dependencies ===============================================

use super::Timer;
use crate::core::trigger::{HandlerId, Trigger};

//=== Internal Types ======================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerKind {
    Timeout,
    Interval,
}

impl TimerKind {
    fn label(self) -> &'static str {
        match self {
            TimerKind::Timeout => "set_timeout",
            TimerKind::Interval => "set_interval",
        }
    }
}

struct IdentifierEntry {
    timer: Timer,
    registration: HandlerId,
    kind: TimerKind,
}

struct ManagerState {
    fps: f64,
    driver: Trigger<()>,
    registration: Option<HandlerId>,
    timers: Vec<Timer>,
    identifiers: HashMap<u64, IdentifierEntry>,
    next_identifier: u64,
    destroyed: bool,
}

//=== TimerHandle =========================================================

/// Identifier for a pending timeout or interval.
///
/// Returned by [`TimerManager::set_timeout`] and
/// [`TimerManager::set_interval`]; consumed by the matching clear call.
#[derive(Debug)]
pub struct TimerHandle {
    id: u64,
}

//=== TimerManager ========================================================

/// Pools [`Timer`]s by interval and drives them from a tick trigger.
///
/// Cheap cloneable handle. Each scene owns one manager driven by its
/// update trigger, so scene timers only advance while the scene receives
/// ticks.
pub struct TimerManager {
    state: Rc<RefCell<ManagerState>>,
}

impl Clone for TimerManager {
    fn clone(&self) -> Self {
        Self {
            state: Rc::clone(&self.state),
        }
    }
}

impl TimerManager {
    //--- Construction -----------------------------------------------------

    /// Creates a manager driven by `driver`, quantizing intervals to
    /// `fps` ticks per second.
    ///
    /// # Panics
    ///
    /// Panics if `fps` is not positive.
    pub fn new(driver: &Trigger<()>, fps: f64) -> Self {
        assert!(fps > 0.0, "TimerManager::new: fps must be positive, got {}", fps);
        Self {
            state: Rc::new(RefCell::new(ManagerState {
                fps,
                driver: driver.clone(),
                registration: None,
                timers: Vec::new(),
                identifiers: HashMap::new(),
                next_identifier: 1,
                destroyed: false,
            })),
        }
    }

    //--- Timer Pool -------------------------------------------------------

    /// Returns a timer with the given nominal interval.
    ///
    /// An existing timer is reused while it is still within its freshness
    /// window (see [`Timer::is_fresh`]), so logically-simultaneous
    /// timeouts of the same interval share one underlying counter. The
    /// first created timer subscribes the manager to its driving trigger.
    ///
    /// # Panics
    ///
    /// Panics if `interval_ms` is negative or the manager is destroyed.
    pub fn create_timer(&self, interval_ms: f64) -> Timer {
        assert!(
            interval_ms >= 0.0,
            "TimerManager::create_timer: negative interval ({} ms)",
            interval_ms
        );
        {
            let state = self.state.borrow();
            assert!(
                !state.destroyed,
                "TimerManager::create_timer: manager is destroyed"
            );
            for timer in &state.timers {
                if timer.interval_ms() == interval_ms && timer.is_fresh() {
                    return timer.clone();
                }
            }
        }

        let (timer, first) = {
            let mut state = self.state.borrow_mut();
            let timer = Timer::new(interval_ms, state.fps);
            state.timers.push(timer.clone());
            (timer, state.registration.is_none())
        };
        if first {
            self.subscribe_to_driver();
        }
        debug!("TimerManager: created timer (interval: {} ms)", interval_ms);
        timer
    }

    /// Deletes a timer from the pool, destroying it.
    ///
    /// # Panics
    ///
    /// Panics if the timer still has elapsed handlers
    /// ([`Timer::can_delete`] is false), if the timer is not registered
    /// with this manager, or if the manager's tick handler is missing
    /// while timers are registered. All three indicate programmer error.
    pub fn delete_timer(&self, timer: &Timer) {
        assert!(
            timer.can_delete(),
            "TimerManager::delete_timer: timer (interval: {} ms) still has elapsed handlers",
            timer.interval_ms()
        );
        let unsubscribe = {
            let mut state = self.state.borrow_mut();
            let index = state
                .timers
                .iter()
                .position(|t| Timer::ptr_eq(t, timer))
                .unwrap_or_else(|| {
                    panic!(
                        "TimerManager::delete_timer: unknown timer (interval: {} ms)",
                        timer.interval_ms()
                    )
                });
            assert!(
                state.registration.is_some(),
                "TimerManager::delete_timer: tick handler missing while timers are registered"
            );
            state.timers.remove(index);
            if state.timers.is_empty() {
                let registration = state.registration.take();
                registration.map(|r| (state.driver.clone(), r))
            } else {
                None
            }
        };
        timer.destroy();
        if let Some((driver, registration)) = unsubscribe {
            driver.remove(registration);
        }
        debug!("TimerManager: deleted timer (interval: {} ms)", timer.interval_ms());
    }

    /// Number of pooled timers.
    pub fn timer_count(&self) -> usize {
        self.state.borrow().timers.len()
    }

    //--- Timeouts and Intervals -------------------------------------------

    /// Schedules `callback` to run once, `milliseconds` from now.
    ///
    /// The returned handle self-clears when the callback fires; clearing
    /// it afterwards is a fatal precondition violation.
    pub fn set_timeout(&self, milliseconds: f64, callback: impl FnOnce() + 'static) -> TimerHandle {
        let timer = self.create_timer(milliseconds);
        let id = self.alloc_identifier();
        let weak = Rc::downgrade(&self.state);
        let mut callback = Some(callback);
        let registration = timer.elapsed().add(move |_| {
            let Some(state) = weak.upgrade() else {
                return true;
            };
            let manager = TimerManager { state };
            // Release the identifier before running user code so the
            // callback can schedule fresh timers of the same interval.
            if manager.finish_timeout(id) {
                if let Some(callback) = callback.take() {
                    callback();
                }
            }
            false
        });
        self.state.borrow_mut().identifiers.insert(
            id,
            IdentifierEntry {
                timer,
                registration,
                kind: TimerKind::Timeout,
            },
        );
        TimerHandle { id }
    }

    /// Schedules `callback` to run every `milliseconds` until the handle
    /// is cleared.
    pub fn set_interval(&self, milliseconds: f64, mut callback: impl FnMut() + 'static) -> TimerHandle {
        let timer = self.create_timer(milliseconds);
        let id = self.alloc_identifier();
        let registration = timer.elapsed().add(move |_| {
            callback();
            false
        });
        self.state.borrow_mut().identifiers.insert(
            id,
            IdentifierEntry {
                timer,
                registration,
                kind: TimerKind::Interval,
            },
        );
        TimerHandle { id }
    }

    /// Cancels a pending timeout.
    ///
    /// # Panics
    ///
    /// Panics if the handle is unknown, already fired, already cleared,
    /// or was created by [`TimerManager::set_interval`].
    pub fn clear_timeout(&self, handle: TimerHandle) {
        self.clear(handle, TimerKind::Timeout);
    }

    /// Cancels a running interval.
    ///
    /// # Panics
    ///
    /// Panics if the handle is unknown, already cleared, or was created
    /// by [`TimerManager::set_timeout`].
    pub fn clear_interval(&self, handle: TimerHandle) {
        self.clear(handle, TimerKind::Interval);
    }

    fn clear(&self, handle: TimerHandle, kind: TimerKind) {
        let operation = match kind {
            TimerKind::Timeout => "clear_timeout",
            TimerKind::Interval => "clear_interval",
        };
        let entry = self
            .state
            .borrow_mut()
            .identifiers
            .remove(&handle.id)
            .unwrap_or_else(|| {
                panic!(
                    "TimerManager::{}: unknown or already cleared identifier",
                    operation
                )
            });
        assert!(
            entry.kind == kind,
            "TimerManager::{}: identifier was created by {}",
            operation,
            entry.kind.label()
        );
        entry.timer.elapsed().remove(entry.registration);
        if entry.timer.can_delete() {
            self.delete_timer(&entry.timer);
        }
    }

    //--- Destruction ------------------------------------------------------

    /// Releases every identifier and timer and detaches from the driving
    /// trigger. Idempotent.
    pub fn destroy(&self) {
        let (driver, registration, timers) = {
            let mut state = self.state.borrow_mut();
            if state.destroyed {
                return;
            }
            state.destroyed = true;
            state.identifiers.clear();
            (
                state.driver.clone(),
                state.registration.take(),
                std::mem::take(&mut state.timers),
            )
        };
        if let Some(registration) = registration {
            driver.remove(registration);
        }
        for timer in &timers {
            timer.destroy();
        }
    }

    //--- Internal Helpers -------------------------------------------------

    fn alloc_identifier(&self) -> u64 {
        let mut state = self.state.borrow_mut();
        let id = state.next_identifier;
        state.next_identifier += 1;
        id
    }

    fn subscribe_to_driver(&self) {
        let driver = self.state.borrow().driver.clone();
        let weak = Rc::downgrade(&self.state);
        let registration = driver.add(move |_| match weak.upgrade() {
            Some(state) => {
                TimerManager { state }.handle_tick();
                false
            }
            None => true,
        });
        self.state.borrow_mut().registration = Some(registration);
    }

    /// Ticks every pooled timer. Elapsed handlers may create or delete
    /// timers; the pool is snapshotted first so the pass stays stable.
    fn handle_tick(&self) {
        let timers: Vec<Timer> = self.state.borrow().timers.clone();
        for timer in timers {
            timer.tick();
        }
    }

    fn finish_timeout(&self, id: u64) -> bool {
        let entry = match self.state.borrow_mut().identifiers.remove(&id) {
            Some(entry) => entry,
            None => return false,
        };
        entry.timer.elapsed().remove(entry.registration);
        if entry.timer.can_delete() {
            self.delete_timer(&entry.timer);
        }
        true
    }
}

//=========================================================================
// Tests
//=========================================================================

//=========================================================================
// Timer
//=========================================================================
//
// A repeating countdown driven by dispatcher firings.
//
// The nominal interval is scaled by the ticking frequency once, at
// construction, and every tick adds exactly 1000 scaled units (one tick
// is 1000/fps ms, and 1000/fps * fps = 1000). The elapsed trigger fires
// once for each multiple of the scaled interval strictly crossed, so the
// interval/fps division never enters floating point.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::cell::RefCell;
use std::rc::Rc;

//=== Internal Dependencies ===============================================

use crate::core::trigger::Trigger;

//=== Internal Types ======================================================

struct TimerState {
    interval_ms: f64,
    scaled_interval: i64,
    scaled_elapsed: i64,
    elapsed: Trigger<()>,
    destroyed: bool,
}

//=== Timer ===============================================================

/// Frame-quantized repeating countdown.
///
/// Cheap cloneable handle. Timers are normally obtained from
/// [`TimerManager::create_timer`](super::TimerManager::create_timer),
/// which pools them by interval; the elapsed notifications are delivered
/// through [`Timer::elapsed`].
pub struct Timer {
    state: Rc<RefCell<TimerState>>,
}

impl Clone for Timer {
    fn clone(&self) -> Self {
        Self {
            state: Rc::clone(&self.state),
        }
    }
}

impl Timer {
    //--- Construction -----------------------------------------------------

    /// Creates a timer with the given nominal interval in milliseconds,
    /// quantized to `fps` ticks per second.
    ///
    /// # Panics
    ///
    /// Panics if `interval_ms` is negative or `fps` is not positive.
    pub fn new(interval_ms: f64, fps: f64) -> Self {
        assert!(
            interval_ms >= 0.0,
            "Timer::new: negative interval ({} ms)",
            interval_ms
        );
        assert!(fps > 0.0, "Timer::new: fps must be positive, got {}", fps);

        let scaled_interval = ((interval_ms * fps).round() as i64).max(1);
        Self {
            state: Rc::new(RefCell::new(TimerState {
                interval_ms,
                scaled_interval,
                scaled_elapsed: 0,
                elapsed: Trigger::new(),
                destroyed: false,
            })),
        }
    }

    //--- Ticking ----------------------------------------------------------

    /// Advances the timer by one driving tick (1000 scaled units) and
    /// fires the elapsed trigger once per interval multiple strictly
    /// crossed. Ignored on a destroyed timer.
    pub fn tick(&self) {
        let fire_count = {
            let mut state = self.state.borrow_mut();
            if state.destroyed {
                return;
            }
            state.scaled_elapsed += 1000;
            let mut count = 0;
            while state.scaled_elapsed > state.scaled_interval {
                state.scaled_elapsed -= state.scaled_interval;
                count += 1;
            }
            count
        };

        let elapsed = self.elapsed();
        for _ in 0..fire_count {
            if self.state.borrow().destroyed {
                break;
            }
            elapsed.fire(&());
        }
    }

    //--- Accessors --------------------------------------------------------

    /// The elapsed-notification trigger.
    pub fn elapsed(&self) -> Trigger<()> {
        self.state.borrow().elapsed.clone()
    }

    /// The nominal interval in milliseconds.
    pub fn interval_ms(&self) -> f64 {
        self.state.borrow().interval_ms
    }

    /// Whether the timer is still within the sharing window: less than
    /// `min(1000, scaled_interval)` scaled units accumulated. A fresh
    /// timer can back additional logically-simultaneous timeouts of the
    /// same interval.
    pub fn is_fresh(&self) -> bool {
        let state = self.state.borrow();
        state.scaled_elapsed < state.scaled_interval.min(1000)
    }

    /// Whether the timer may be deleted: destroyed already, or no elapsed
    /// handlers remain.
    pub fn can_delete(&self) -> bool {
        let state = self.state.borrow();
        state.destroyed || state.elapsed.is_empty()
    }

    /// Whether [`Timer::destroy`] has been called.
    pub fn destroyed(&self) -> bool {
        self.state.borrow().destroyed
    }

    /// Whether two handles refer to the same timer.
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Rc::ptr_eq(&a.state, &b.state)
    }

    //--- Destruction ------------------------------------------------------

    /// Destroys the elapsed trigger and stops reacting to ticks.
    /// Idempotent.
    pub fn destroy(&self) {
        let elapsed = {
            let mut state = self.state.borrow_mut();
            if state.destroyed {
                return;
            }
            state.destroyed = true;
            state.elapsed.clone()
        };
        elapsed.destroy();
    }
}

//=========================================================================
// Tests
//=========================================================================

//=========================================================================
// Clock
//=========================================================================
//
// Host-side fixed-rate tick source.
//
// An active instance needs something to pace by-clock ticks; this pump
// runs a background thread that sleeps to maintain the configured rate
// and delivers tick signals over a bounded channel. The simulation core
// never depends on it: hosts are free to drive Game::tick from their own
// loop (replays and passive instances always do).
//
// A full channel drops the signal rather than queueing unboundedly, so a
// consumer that falls behind coalesces ticks instead of accumulating an
// ever-growing backlog.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use log::{debug, info};

//=== ClockTick ===========================================================

/// One pacing signal from the clock thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockTick {
    /// Signals produced so far, including dropped ones. Gaps in the
    /// sequence tell the consumer how many ticks it coalesced.
    pub seq: u64,
}

//=== Clock ===============================================================

/// Fixed-rate tick pump on a background thread.
///
/// # Examples
///
/// ```no_run
/// use lockstep_engine::clock::Clock;
///
/// let clock = Clock::spawn(30.0, 8);
/// for tick in clock.ticks().iter().take(30) {
///     // drive Game::tick from here
///     let _ = tick.seq;
/// }
/// clock.stop();
/// ```
pub struct Clock {
    ticks: Receiver<ClockTick>,
    stop: Sender<()>,
    handle: thread::JoinHandle<()>,
}

impl Clock {
    /// Spawns the pacing thread.
    ///
    /// # Panics
    ///
    /// Panics if `fps <= 0.0` or `capacity == 0`.
    pub fn spawn(fps: f64, capacity: usize) -> Self {
        assert!(fps > 0.0, "Clock::spawn: fps must be positive, got {}", fps);
        assert!(capacity > 0, "Clock::spawn: capacity must be positive");

        let (tick_tx, tick_rx) = bounded(capacity);
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let frame_duration = Duration::from_secs_f64(1.0 / fps);

        info!("Clock: spawning tick pump ({} fps)", fps);
        let handle = thread::spawn(move || {
            let mut seq: u64 = 0;
            let mut next_frame = Instant::now() + frame_duration;

            loop {
                let now = Instant::now();
                if now < next_frame {
                    thread::sleep(next_frame - now);
                }
                next_frame += frame_duration;

                // Stop request or every consumer gone: exit cleanly.
                if stop_rx.try_recv().is_ok() {
                    debug!("Clock: stop requested, tick pump exiting");
                    break;
                }

                seq += 1;
                match tick_tx.try_send(ClockTick { seq }) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        debug!("Clock: consumer behind, dropping tick {}", seq);
                    }
                    Err(TrySendError::Disconnected(_)) => {
                        debug!("Clock: consumer disconnected, tick pump exiting");
                        break;
                    }
                }
            }
        });

        Self {
            ticks: tick_rx,
            stop: stop_tx,
            handle,
        }
    }

    /// The tick signal receiver.
    pub fn ticks(&self) -> &Receiver<ClockTick> {
        &self.ticks
    }

    /// Stops the pacing thread and waits for it to exit.
    pub fn stop(self) {
        let _ = self.stop.send(());
        let _ = self.handle.join();
    }
}

//=========================================================================
// Tests
//=========================================================================

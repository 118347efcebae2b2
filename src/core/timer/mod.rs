//=========================================================================
// Timer System
//=========================================================================
//
// Frame-quantized repeating countdowns.
//
// Architecture:
//   TimerManager  (one per scene, driven by the scene's update trigger)
//     ├─ timers: Vec<Timer>           (pooled by nominal interval)
//     └─ identifiers: timeout/interval handles over shared timers
//
// Elapsed time is accumulated in integer units scaled by the ticking
// frequency, so long runs stay free of cumulative floating-point error.
//
//=========================================================================

//=== Module Declarations =================================================

mod manager;
mod timer;

//=== Public API ==========================================================

pub use manager::{TimerHandle, TimerManager};
pub use timer::Timer;

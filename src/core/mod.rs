//=========================================================================
// Core Systems
//=========================================================================
//
// The deterministic simulation subsystems.
//
// Responsibilities:
// - Event dispatch (trigger): ordered pub/sub everything else builds on
// - Timers: frame-quantized countdowns free of floating-point drift
// - Events + filter pipeline: the tick-carried event model
// - Scenes: lifecycle state machine with tick-deferred stack mutation
// - Context: the shared state handle (age, random, entity ids, requests)
// - Host bridge: the narrow contract to the surrounding runtime
// - Snapshot: resumable state capture
//
// Notes:
// Execution is single-threaded and externally driven. A tick is one
// synchronous call into the Game driver; every firing, filter pass, and
// scene transition it causes completes before that call returns.
//
//=========================================================================

//=== Module Declarations =================================================

pub mod context;
pub mod event;
pub mod host_bridge;
pub mod random;
pub mod scene;
pub mod snapshot;
pub mod timer;
pub mod trigger;

//=== Public API ==========================================================

pub use context::GameContext;
pub use host_bridge::{GameHost, InstanceType, NullHost, SceneMode};
pub use scene::{LocalTickMode, Scene, SceneConfig, SceneLifecycleState, TickGenerationMode};
pub use snapshot::{Snapshot, SnapshotError};
pub use trigger::{HandlerId, HandlerOptions, OwnerId, Trigger};

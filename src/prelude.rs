//=========================================================================
// Prelude
//=========================================================================
//
// Convenience module that re-exports commonly used types and traits.
//
// Usage:
//   use lockstep_engine::prelude::*;
//
//=========================================================================

//=== Public API ==========================================================

// Driver
pub use crate::game::{Game, GameBuilder};

// Context
pub use crate::core::context::GameContext;

// Triggers
pub use crate::core::trigger::{HandlerId, HandlerOptions, OwnerId, Trigger};

// Timers
pub use crate::core::timer::{Timer, TimerHandle, TimerManager};

// Events and filters
pub use crate::core::event::filter::{
    shared_filter, EventFilter, EventFilterController, SharedEventFilter,
};
pub use crate::core::event::{
    Event, JoinEvent, LeaveEvent, MessageEvent, OperationEvent, Player, PlayerId,
    PlayerInfoEvent, PointEvent, PointMoveEvent, SeedEvent, TimestampEvent,
};

// Scenes
pub use crate::core::scene::{
    LocalTickMode, Scene, SceneConfig, SceneLifecycleState, TickGenerationMode,
};

// Host contract
pub use crate::core::host_bridge::{GameHost, InstanceType, NullHost, SceneMode};

// Random and snapshots
pub use crate::core::random::{XorshiftRandom, XorshiftState};
pub use crate::core::snapshot::{Snapshot, SnapshotError};

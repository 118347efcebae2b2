//=========================================================================
// Host Bridge
//=========================================================================
//
// Core-to-host interface types.
//
// Defines the narrow contract between this core and the surrounding
// network/runtime layer that actually carries ticks, events, and
// snapshots between instances.
//
//=========================================================================

//=== Module Declarations =================================================

mod interface;

//=== Public API ==========================================================

pub use interface::{GameHost, InstanceType, NullHost, SceneMode};

//=========================================================================
// Lockstep Engine — Library Root
//
// This crate is the deterministic-simulation core of a multiplayer game
// engine: every participating instance (player clients, server-side
// replay/record instances) advances through an identical sequence of
// ticks and events and reaches bit-identical state.
//
// Responsibilities:
// - Expose the tick driver (`Game`) and its builder
// - Expose the core subsystems (triggers, timers, events, scenes)
// - Keep the whole simulation single-threaded and externally driven:
//   the host calls `Game::tick`, and everything that tick causes
//   completes before the call returns
//
// Typical usage:
// ```no_run
// use lockstep_engine::prelude::*;
//
// fn main() {
//     let mut game = GameBuilder::new().with_fps(30.0).build(NullHost);
//     let scene = Scene::new(game.context(), SceneConfig::default());
//     game.push_scene(scene);
//     game.tick(true, 0, Vec::new());
// }
// ```
//
//=========================================================================

//--- Public Modules ------------------------------------------------------
//
// `core` contains the simulation subsystems (triggers, timers, events,
// scenes, snapshots). It is exposed publicly for engine-level
// extensibility, but normal game code will mostly use the top-level
// `Game` facade and the prelude.
//
// `clock` is host-side plumbing: a fixed-rate tick pump for active
// instances. The core itself never depends on it.
//
pub mod clock;
pub mod core;
pub mod prelude;

//--- Internal Modules ----------------------------------------------------
//
// `game` defines the tick driver and its builder.
//
mod game;

//--- Public Exports ------------------------------------------------------
//
// Re-exports the driver and the types virtually every host touches, so
// users can `use lockstep_engine::{Game, GameBuilder}` without knowing
// the internal module structure.
//
pub use crate::core::context::GameContext;
pub use crate::core::event::Event;
pub use crate::core::host_bridge::{GameHost, InstanceType, NullHost, SceneMode};
pub use crate::core::scene::{Scene, SceneConfig};
pub use crate::core::snapshot::Snapshot;
pub use game::{Game, GameBuilder};

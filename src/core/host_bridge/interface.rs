//=========================================================================
// Host Interface
//=========================================================================
//
// The contract implemented by the surrounding network/runtime layer.
//
// The core calls outward through this trait; inbound traffic (consumed
// ticks and their events) enters through Game::tick. Transport wire
// encoding, asset formats, and retry policy all live on the host side.
//
//=========================================================================

//=== Internal Dependencies ===============================================

use crate::core::event::Event;
use crate::core::scene::{LocalTickMode, TickGenerationMode};
use crate::core::snapshot::Snapshot;

//=== InstanceType ========================================================

/// Whether this running instance originates ticks or only consumes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceType {
    /// Responsible for generating ticks and events.
    Active,
    /// Replays the tick stream produced elsewhere.
    Passive,
}

//=== SceneMode ===========================================================

/// Tick-sourcing mode of the top-of-stack scene, reported to the host so
/// it can adjust how ticks are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneMode {
    pub local: LocalTickMode,
    pub tick_generation_mode: TickGenerationMode,
}

//=== GameHost ============================================================

/// Outbound contract to the surrounding runtime.
///
/// Implementations forward to the transport (networked play), to a
/// replay recorder, or to nothing at all ([`NullHost`]).
pub trait GameHost {
    /// Requests a globally-ordered tick carrying `events`. Called only
    /// while the active scene's generation mode is manual.
    fn raise_tick(&mut self, events: Vec<Event>);

    /// Hands an event to the outbound channel immediately.
    fn raise_event(&mut self, event: Event);

    /// Fired whenever the top-of-stack scene's mode changes.
    fn change_scene_mode(&mut self, mode: SceneMode);

    /// Whether this instance is the canonical snapshot producer. Exactly
    /// one among synchronized peers should answer true.
    fn should_save_snapshot(&self) -> bool;

    /// Persists a snapshot. Only invoked after
    /// [`GameHost::should_save_snapshot`] answered true.
    fn save_snapshot(&mut self, snapshot: Snapshot);

    /// Pauses local-tick generation. No-op on an active instance. Must
    /// not be invoked during scene transitions, the loading scene, or
    /// while asset requests are pending; callers are responsible for
    /// honoring this restriction.
    fn suspend_local_tick(&mut self);

    /// Resumes local-tick generation. No-op on an active instance.
    fn resume_local_tick(&mut self);

    /// Whether this instance generates ticks or replays them.
    fn instance_type(&self) -> InstanceType;

    /// Current simulation time in milliseconds, derived from the
    /// consumed-tick count, never from the wall clock.
    fn current_time(&self) -> f64;
}

//=== NullHost ============================================================

/// Host that discards everything: a passive, transportless runtime for
/// headless simulation and tests.
#[derive(Debug, Default)]
pub struct NullHost;

impl GameHost for NullHost {
    fn raise_tick(&mut self, _events: Vec<Event>) {}

    fn raise_event(&mut self, _event: Event) {}

    fn change_scene_mode(&mut self, _mode: SceneMode) {}

    fn should_save_snapshot(&self) -> bool {
        false
    }

    fn save_snapshot(&mut self, _snapshot: Snapshot) {}

    fn suspend_local_tick(&mut self) {}

    fn resume_local_tick(&mut self) {}

    fn instance_type(&self) -> InstanceType {
        InstanceType::Passive
    }

    fn current_time(&self) -> f64 {
        0.0
    }
}

//=========================================================================
// Lockstep Game Driver
//
// Main entry point and tick coordinator for the simulation core.
//
// Architecture:
// ```text
//     GameBuilder  ──build(host)──>  Game  ──tick()──>  [Simulation]
//         │                           │
//         ├─ with_fps()               ├─ event filter pipeline
//         └─ with_seed()              ├─ per-kind dispatch to scene triggers
//                                     ├─ age / random / entity-id context
//                                     └─ deferred scene-stack flush
// ```
//
// Every participating instance feeds the same tick sequence into
// Game::tick and reaches bit-identical state; the host contract carries
// everything that crosses the instance boundary.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::collections::BTreeMap;

use log::{debug, info, trace};
use serde_json::Value;

//=== Internal Dependencies ===============================================

use crate::core::context::GameContext;
use crate::core::event::filter::{EventFilterPipeline, SharedEventFilter};
use crate::core::event::{Event, JoinEvent, LeaveEvent, Player, PlayerId, PlayerInfoEvent};
use crate::core::host_bridge::{GameHost, InstanceType, SceneMode};
use crate::core::scene::stack::SceneStack;
use crate::core::scene::{Scene, TickGenerationMode};
use crate::core::snapshot::Snapshot;
use crate::core::trigger::Trigger;

//=== GameBuilder =========================================================

/// Builder for configuring and constructing a [`Game`].
///
/// # Default Values
///
/// - **fps**: 30.0 (simulation ticks per second)
/// - **seed**: 0 (initial random generator seed; normally superseded by
///   the transport's `seed` event)
///
/// # Examples
///
/// ```no_run
/// use lockstep_engine::{GameBuilder, NullHost};
///
/// let game = GameBuilder::new()
///     .with_fps(60.0)
///     .with_seed(42)
///     .build(NullHost);
/// ```
pub struct GameBuilder {
    fps: f64,
    seed: u64,
}

impl GameBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self { fps: 30.0, seed: 0 }
    }

    /// Sets the simulation tick rate every timer interval is quantized
    /// against. All instances of one session must agree on it.
    ///
    /// Default: 30.0
    ///
    /// # Panics
    ///
    /// Panics if `fps <= 0.0`.
    pub fn with_fps(mut self, fps: f64) -> Self {
        assert!(fps > 0.0, "fps must be positive, got {}", fps);
        self.fps = fps;
        self
    }

    /// Sets the initial random generator seed.
    ///
    /// Default: 0. A `seed` event consumed from the transport re-seeds
    /// the generator regardless of this value.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Builds the game instance over the given host.
    pub fn build(self, host: impl GameHost + 'static) -> Game {
        info!("Building game (fps: {}, seed: {})", self.fps, self.seed);

        Game {
            context: GameContext::new(self.fps, self.seed),
            scenes: SceneStack::new(),
            filters: EventFilterPipeline::new(),
            host: Box::new(host),
            players: BTreeMap::new(),
            on_scene_change: Trigger::new(),
            on_join: Trigger::new(),
            on_leave: Trigger::new(),
            on_player_info: Trigger::new(),
            last_omitted_local_ticks: 0,
            last_timestamp: None,
        }
    }
}

impl Default for GameBuilder {
    fn default() -> Self {
        Self::new()
    }
}

//=== Game ================================================================

/// The tick driver: owns the authoritative age counter, the scene stack,
/// the event filter pipeline, and the shared random generator, and ties
/// them together for each consumed tick.
///
/// # Tick processing
///
/// Each [`Game::tick`] call, in order:
///
/// 1. runs the event filter pipeline over the tick's event set,
/// 2. dispatches the surviving events by kind,
/// 3. fires the top scene's update trigger (driving its timers),
/// 4. advances the age iff the tick is globally ordered,
/// 5. applies deferred scene-stack requests.
///
/// Everything completes synchronously before the call returns; the core
/// has no threads of its own.
pub struct Game {
    context: GameContext,
    scenes: SceneStack,
    filters: EventFilterPipeline,
    host: Box<dyn GameHost>,
    players: BTreeMap<PlayerId, Player>,
    on_scene_change: Trigger<Scene>,
    on_join: Trigger<JoinEvent>,
    on_leave: Trigger<LeaveEvent>,
    on_player_info: Trigger<PlayerInfoEvent>,
    last_omitted_local_ticks: u32,
    last_timestamp: Option<i64>,
}

impl Game {
    //--- Accessors --------------------------------------------------------

    /// The shared simulation context (fps, age, random, entity ids).
    pub fn context(&self) -> &GameContext {
        &self.context
    }

    /// Consumed non-local ticks: the logical clock.
    pub fn age(&self) -> u64 {
        self.context.age()
    }

    /// Simulation ticks per second.
    pub fn fps(&self) -> f64 {
        self.context.fps()
    }

    /// The current top-of-stack scene, if any.
    pub fn scene(&self) -> Option<Scene> {
        self.scenes.top()
    }

    /// Depth of the scene stack.
    pub fn scene_count(&self) -> usize {
        self.scenes.len()
    }

    /// Local ticks omitted before the most recent interpolated tick.
    pub fn last_omitted_local_ticks(&self) -> u32 {
        self.last_omitted_local_ticks
    }

    /// Most recent timestamp event consumed, if any.
    pub fn last_timestamp(&self) -> Option<i64> {
        self.last_timestamp
    }

    /// Players currently joined, keyed by id (deterministic order).
    pub fn players(&self) -> &BTreeMap<PlayerId, Player> {
        &self.players
    }

    //--- Game-level Triggers ----------------------------------------------

    /// Fired with the new top scene after every applied stack change.
    /// Survives [`Game::reset_from_snapshot`], so host-level observers
    /// keep watching across resets.
    pub fn on_scene_change(&self) -> Trigger<Scene> {
        self.on_scene_change.clone()
    }

    /// Fired when a player joins. Survives reset.
    pub fn on_join(&self) -> Trigger<JoinEvent> {
        self.on_join.clone()
    }

    /// Fired when a player leaves. Survives reset.
    pub fn on_leave(&self) -> Trigger<LeaveEvent> {
        self.on_leave.clone()
    }

    /// Fired on player metadata updates. Survives reset.
    pub fn on_player_info(&self) -> Trigger<PlayerInfoEvent> {
        self.on_player_info.clone()
    }

    //--- Scene Transitions ------------------------------------------------

    /// Requests pushing `scene`, applied at the next tick boundary. The
    /// stack is unchanged when this returns.
    pub fn push_scene(&mut self, scene: Scene) {
        self.context.request_push_scene(scene);
    }

    /// Requests replacing the top scene, applied at the next tick
    /// boundary. With `preserve_current`, the outgoing scene is removed
    /// without destruction and the caller owns its lifetime.
    pub fn replace_scene(&mut self, scene: Scene, preserve_current: bool) {
        self.context.request_replace_scene(scene, preserve_current);
    }

    /// Requests popping `step` scenes, applied at the next tick boundary.
    /// Removed scenes are destroyed unless `preserve`.
    ///
    /// # Panics
    ///
    /// Panics if `step` is zero; popping past the stack depth panics when
    /// the request is applied.
    pub fn pop_scene(&mut self, preserve: bool, step: usize) {
        self.context.request_pop_scene(preserve, step);
    }

    //--- Event Filters ----------------------------------------------------

    /// Appends `filter` to the pipeline. With `handle_empty`, the filter
    /// also runs on ticks carrying no events.
    pub fn add_event_filter(&mut self, filter: SharedEventFilter, handle_empty: bool) {
        self.filters.add(filter, handle_empty);
    }

    /// Removes a filter by handle identity.
    pub fn remove_event_filter(&mut self, filter: &SharedEventFilter) -> bool {
        self.filters.remove(filter)
    }

    /// Removes every filter.
    pub fn remove_all_event_filters(&mut self) {
        self.filters.remove_all();
    }

    //--- Tick Consumption -------------------------------------------------

    /// Consumes one tick: filter, dispatch, update, advance, flush.
    ///
    /// `advance_age` is true for globally-ordered ticks and false for
    /// local ticks; local ticks are dispatched identically but never move
    /// the logical clock. `omitted_local_tick_count` reports how many
    /// local ticks the tick source skipped before this one (meaningful
    /// for local-tick-interpolating scenes). Returns whether the top
    /// scene changed at this boundary.
    pub fn tick(&mut self, advance_age: bool, omitted_local_tick_count: u32, events: Vec<Event>) -> bool {
        self.last_omitted_local_ticks = omitted_local_tick_count;

        let events = self.filters.apply(events);
        for event in events {
            self.dispatch_event(event);
        }

        if let Some(scene) = self.scenes.top() {
            scene.fire_update();
        }

        if advance_age {
            self.context.advance_age();
        }

        self.flush_scene_requests()
    }

    //--- Outbound Requests ------------------------------------------------

    /// Hands an event to the host's outbound channel immediately.
    pub fn raise_event(&mut self, event: Event) {
        self.host.raise_event(event);
    }

    /// Requests a tick carrying `events` from the host.
    ///
    /// # Panics
    ///
    /// Panics unless the active scene's tick-generation mode is
    /// [`TickGenerationMode::Manual`].
    pub fn raise_tick(&mut self, events: Vec<Event>) {
        let scene = self
            .scenes
            .top()
            .unwrap_or_else(|| panic!("raise_tick: no active scene"));
        assert!(
            scene.tick_generation_mode() == TickGenerationMode::Manual,
            "raise_tick: active scene '{}' generates ticks by clock; manual mode is required",
            scene.name()
        );
        self.host.raise_tick(events);
    }

    //--- Snapshot ---------------------------------------------------------

    /// Whether this instance is the canonical snapshot producer.
    pub fn should_save_snapshot(&self) -> bool {
        self.host.should_save_snapshot()
    }

    /// Assembles a snapshot (generator state and entity counter come from
    /// the context) and passes it through to the host.
    ///
    /// # Panics
    ///
    /// Panics if [`Game::should_save_snapshot`] is false: only the
    /// canonical producer among synchronized peers may persist state.
    pub fn save_snapshot(&mut self, frame: u64, payload: Value, timestamp: Option<i64>) {
        assert!(
            self.host.should_save_snapshot(),
            "save_snapshot: this instance is not the snapshot producer"
        );
        let snapshot = Snapshot {
            frame,
            payload,
            random_state: self.context.random_state(),
            next_entity_id: self.context.next_entity_id(),
            timestamp,
        };
        info!("Game: saving snapshot at frame {}", frame);
        self.host.save_snapshot(snapshot);
    }

    /// Discards the scene stack, pending transitions, and in-flight local
    /// state, then reinitializes age, the random generator, and the
    /// entity counter from `snapshot`.
    ///
    /// Game-level observers ([`Game::on_scene_change`] and friends) and
    /// the event filter pipeline survive; the game is expected to rebuild
    /// its scene stack from the snapshot payload afterwards.
    pub fn reset_from_snapshot(&mut self, snapshot: &Snapshot) {
        info!("Game: resetting from snapshot (frame: {})", snapshot.frame);
        self.scenes.destroy_all();
        self.context.clear_scene_requests();
        self.context.set_age(snapshot.frame);
        self.context.restore_random(snapshot.random_state);
        self.context.set_next_entity_id(snapshot.next_entity_id);
        self.players.clear();
        self.last_omitted_local_ticks = 0;
        self.last_timestamp = snapshot.timestamp;
    }

    //--- Host Delegation --------------------------------------------------

    /// Whether this instance originates ticks. Game logic must not branch
    /// global state on this; it exists to gate strictly local behavior.
    pub fn is_active_instance(&self) -> bool {
        self.host.instance_type() == InstanceType::Active
    }

    /// This instance's role in the session.
    pub fn instance_type(&self) -> InstanceType {
        self.host.instance_type()
    }

    /// Simulation time in milliseconds, derived from consumed ticks.
    pub fn current_time(&self) -> f64 {
        self.host.current_time()
    }

    /// Pauses local-tick generation. See
    /// [`GameHost::suspend_local_tick`] for the restrictions.
    pub fn suspend_local_tick(&mut self) {
        self.host.suspend_local_tick();
    }

    /// Resumes local-tick generation.
    pub fn resume_local_tick(&mut self) {
        self.host.resume_local_tick();
    }

    //--- Internal Helpers -------------------------------------------------

    fn dispatch_event(&mut self, event: Event) {
        trace!("Game: dispatching {} event", event.kind());
        match event {
            Event::PointDown(e) => {
                if let Some(scene) = self.scenes.top() {
                    scene.on_point_down().fire(&e);
                }
            }
            Event::PointUp(e) => {
                if let Some(scene) = self.scenes.top() {
                    scene.on_point_up().fire(&e);
                }
            }
            Event::PointMove(e) => {
                if let Some(scene) = self.scenes.top() {
                    scene.on_point_move().fire(&e);
                }
            }
            Event::Message(e) => {
                if let Some(scene) = self.scenes.top() {
                    scene.on_message().fire(&e);
                }
            }
            Event::Operation(e) => {
                if let Some(scene) = self.scenes.top() {
                    scene.on_operation().fire(&e);
                }
            }
            Event::Join(e) => {
                info!("Game: player '{}' joined", e.player.id);
                self.players.insert(e.player.id.clone(), e.player.clone());
                self.on_join.fire(&e);
            }
            Event::Leave(e) => {
                info!("Game: player '{}' left", e.player.id);
                self.players.remove(&e.player.id);
                self.on_leave.fire(&e);
            }
            Event::PlayerInfo(e) => {
                self.players.insert(e.player.id.clone(), e.player.clone());
                self.on_player_info.fire(&e);
            }
            Event::Seed(e) => {
                info!("Game: reseeding random generator");
                self.context.reseed(e.generator_seed);
            }
            Event::Timestamp(e) => {
                self.last_timestamp = Some(e.timestamp);
            }
        }
    }

    /// Drains the request queue once. Requests whose scene is still
    /// loading are retried at the next boundary.
    fn flush_scene_requests(&mut self) -> bool {
        let requests = self.context.take_scene_requests();
        if requests.is_empty() {
            return false;
        }
        let (changed, deferred) = self.scenes.flush(requests);
        self.context.requeue_scene_requests(deferred);
        if changed {
            self.notify_scene_change();
        }
        changed
    }

    fn notify_scene_change(&mut self) {
        let Some(top) = self.scenes.top() else {
            return;
        };
        let mode = SceneMode {
            local: top.local_tick_mode(),
            tick_generation_mode: top.tick_generation_mode(),
        };
        debug!("Game: top scene is now '{}'", top.name());
        self.on_scene_change.fire(&top);
        self.host.change_scene_mode(mode);
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

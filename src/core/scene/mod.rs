//=========================================================================
// Scene System
//=========================================================================
//
// Scene lifecycle state machine and the stacked-scene model.
//
// Architecture:
//   Scene (cloneable handle)
//     ├─ lifecycle: Standby → Active → {Deactive ⟷ Active}
//     │                     → BeforeDestroyed → Destroyed
//     ├─ triggers: update / message / point / operation / state / load
//     └─ timers: TimerManager driven by the scene's update trigger
//
// Stack mutation is requested synchronously and applied at tick
// boundaries by the driver (see stack.rs), which is what keeps scene
// transitions replay-consistent across instances.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use log::warn;

//=== Internal Dependencies ===============================================

use crate::core::context::GameContext;
use crate::core::event::{MessageEvent, OperationEvent, PointEvent, PointMoveEvent};
use crate::core::timer::{TimerHandle, TimerManager};
use crate::core::trigger::Trigger;

//=== Module Declarations =================================================

pub(crate) mod stack;

//=== Lifecycle State =====================================================

/// Scene lifecycle states.
///
/// Legal transitions: `Standby → Active`, `Active ⟷ Deactive`, and from
/// either `Active` or `Deactive` into `BeforeDestroyed → Destroyed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneLifecycleState {
    /// Constructed, never yet on top of the stack.
    Standby,
    /// On top of the stack, receiving ticks.
    Active,
    /// On the stack (or preserved off it) below the top.
    Deactive,
    /// Destruction notification in progress.
    BeforeDestroyed,
    /// Fully released.
    Destroyed,
}

//=== Tick Modes ==========================================================

/// How a scene relates to the globally-ordered tick stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LocalTickMode {
    /// Normal scene: consumes the globally-ordered stream only.
    #[default]
    NonLocal,
    /// Entirely local stream; ticks never advance the shared age.
    FullLocal,
    /// Global stream, padded with local ticks whenever no global tick is
    /// available, so local-only feedback keeps flowing.
    InterpolateLocal,
}

/// How ticks are produced while a scene is on top.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TickGenerationMode {
    /// The active instance's clock generates ticks.
    #[default]
    ByClock,
    /// Ticks are generated only by explicit `raise_tick` calls.
    Manual,
}

//=== Scene Configuration =================================================

/// Construction parameters for [`Scene::new`].
#[derive(Debug, Clone, Default)]
pub struct SceneConfig {
    /// Diagnostic name, used in logs and assertion messages.
    pub name: String,
    pub local: LocalTickMode,
    pub tick_generation_mode: TickGenerationMode,
    /// Number of external loads (assets, storage) that must complete
    /// before the scene may become active. See
    /// [`Scene::notify_asset_loaded`].
    pub asset_requests: usize,
}

//=== Internal Types ======================================================

struct SceneInner {
    name: String,
    lifecycle: SceneLifecycleState,
    local: LocalTickMode,
    tick_generation_mode: TickGenerationMode,
    on_update: Trigger<()>,
    on_message: Trigger<MessageEvent>,
    on_point_down: Trigger<PointEvent>,
    on_point_up: Trigger<PointEvent>,
    on_point_move: Trigger<PointMoveEvent>,
    on_operation: Trigger<OperationEvent>,
    on_state_change: Trigger<SceneLifecycleState>,
    on_load: Trigger<()>,
    pending_asset_requests: usize,
    timers: TimerManager,
}

//=== Scene ===============================================================

/// One phase of the application, with its own handlers, timers, and tick
/// mode.
///
/// Cheap cloneable handle. The scene stack owns scene lifetime: a scene
/// is destroyed exactly once, when permanently removed from the stack,
/// unless the removing call opted to preserve it.
pub struct Scene {
    inner: Rc<RefCell<SceneInner>>,
}

impl Clone for Scene {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl fmt::Debug for Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Scene")
            .field("name", &inner.name)
            .field("lifecycle", &inner.lifecycle)
            .finish()
    }
}

impl Scene {
    //--- Construction -----------------------------------------------------

    /// Creates a scene in `Standby`, with its timer manager driven by the
    /// scene's own update trigger (scene timers only advance while the
    /// scene receives ticks).
    pub fn new(context: &GameContext, config: SceneConfig) -> Self {
        let on_update: Trigger<()> = Trigger::new();
        let timers = TimerManager::new(&on_update, context.fps());
        Self {
            inner: Rc::new(RefCell::new(SceneInner {
                name: config.name,
                lifecycle: SceneLifecycleState::Standby,
                local: config.local,
                tick_generation_mode: config.tick_generation_mode,
                on_update,
                on_message: Trigger::new(),
                on_point_down: Trigger::new(),
                on_point_up: Trigger::new(),
                on_point_move: Trigger::new(),
                on_operation: Trigger::new(),
                on_state_change: Trigger::new(),
                on_load: Trigger::new(),
                pending_asset_requests: config.asset_requests,
                timers,
            })),
        }
    }

    //--- Accessors --------------------------------------------------------

    pub fn name(&self) -> String {
        self.inner.borrow().name.clone()
    }

    pub fn lifecycle(&self) -> SceneLifecycleState {
        self.inner.borrow().lifecycle
    }

    pub fn local_tick_mode(&self) -> LocalTickMode {
        self.inner.borrow().local
    }

    pub fn tick_generation_mode(&self) -> TickGenerationMode {
        self.inner.borrow().tick_generation_mode
    }

    pub fn destroyed(&self) -> bool {
        self.inner.borrow().lifecycle == SceneLifecycleState::Destroyed
    }

    /// Whether two handles refer to the same scene.
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Rc::ptr_eq(&a.inner, &b.inner)
    }

    //--- Triggers ---------------------------------------------------------

    /// Fired once per tick delivered to this scene; drives scene timers.
    pub fn on_update(&self) -> Trigger<()> {
        self.inner.borrow().on_update.clone()
    }

    pub fn on_message(&self) -> Trigger<MessageEvent> {
        self.inner.borrow().on_message.clone()
    }

    pub fn on_point_down(&self) -> Trigger<PointEvent> {
        self.inner.borrow().on_point_down.clone()
    }

    pub fn on_point_up(&self) -> Trigger<PointEvent> {
        self.inner.borrow().on_point_up.clone()
    }

    pub fn on_point_move(&self) -> Trigger<PointMoveEvent> {
        self.inner.borrow().on_point_move.clone()
    }

    pub fn on_operation(&self) -> Trigger<OperationEvent> {
        self.inner.borrow().on_operation.clone()
    }

    /// Fired with the new state on every lifecycle transition. This is
    /// the last trigger released during destruction, so observers see the
    /// `Destroyed` notification.
    pub fn on_state_change(&self) -> Trigger<SceneLifecycleState> {
        self.inner.borrow().on_state_change.clone()
    }

    /// Fired once when the last outstanding asset request completes.
    pub fn on_load(&self) -> Trigger<()> {
        self.inner.borrow().on_load.clone()
    }

    //--- Timers -----------------------------------------------------------

    /// Schedules `callback` once, `milliseconds` of scene time from now.
    pub fn set_timeout(&self, milliseconds: f64, callback: impl FnOnce() + 'static) -> TimerHandle {
        self.timers().set_timeout(milliseconds, callback)
    }

    /// Schedules `callback` every `milliseconds` of scene time.
    pub fn set_interval(&self, milliseconds: f64, callback: impl FnMut() + 'static) -> TimerHandle {
        self.timers().set_interval(milliseconds, callback)
    }

    /// Cancels a pending timeout. See [`TimerManager::clear_timeout`].
    pub fn clear_timeout(&self, handle: TimerHandle) {
        self.timers().clear_timeout(handle);
    }

    /// Cancels a running interval. See [`TimerManager::clear_interval`].
    pub fn clear_interval(&self, handle: TimerHandle) {
        self.timers().clear_interval(handle);
    }

    fn timers(&self) -> TimerManager {
        self.inner.borrow().timers.clone()
    }

    //--- Asset Readiness --------------------------------------------------

    /// Registers `count` additional external loads that must complete
    /// before the scene is ready.
    pub fn request_assets(&self, count: usize) {
        self.inner.borrow_mut().pending_asset_requests += count;
    }

    /// Records one completed external load; fires [`Scene::on_load`] when
    /// the last one completes. A notification with nothing outstanding is
    /// tolerated (the loader may deliver duplicates).
    pub fn notify_asset_loaded(&self) {
        let ready = {
            let mut inner = self.inner.borrow_mut();
            if inner.pending_asset_requests == 0 {
                warn!(
                    "Scene '{}': asset notification with no outstanding requests",
                    inner.name
                );
                return;
            }
            inner.pending_asset_requests -= 1;
            inner.pending_asset_requests == 0
        };
        if ready {
            self.on_load().fire(&());
        }
    }

    /// Whether every requested external load has completed. Entry into
    /// the scene is gated on this.
    pub fn is_ready(&self) -> bool {
        self.inner.borrow().pending_asset_requests == 0
    }

    //--- Driver Hooks -----------------------------------------------------

    /// Delivers one tick to the scene.
    pub(crate) fn fire_update(&self) {
        self.on_update().fire(&());
    }

    /// Applies a lifecycle transition and fires the state-change
    /// notification. No-op when the state is unchanged.
    pub(crate) fn set_lifecycle(&self, state: SceneLifecycleState) {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.lifecycle == state {
                return;
            }
            inner.lifecycle = state;
        }
        self.on_state_change().fire(&state);
    }

    //--- Destruction ------------------------------------------------------

    /// Destroys the scene: fires `BeforeDestroyed`, releases timers and
    /// triggers, then fires `Destroyed` and releases the state-change
    /// trigger itself. Idempotent.
    pub fn destroy(&self) {
        if self.destroyed() {
            return;
        }
        self.set_lifecycle(SceneLifecycleState::BeforeDestroyed);

        let (timers, on_update, on_message, on_point_down, on_point_up, on_point_move, on_operation, on_load) = {
            let inner = self.inner.borrow();
            (
                inner.timers.clone(),
                inner.on_update.clone(),
                inner.on_message.clone(),
                inner.on_point_down.clone(),
                inner.on_point_up.clone(),
                inner.on_point_move.clone(),
                inner.on_operation.clone(),
                inner.on_load.clone(),
            )
        };
        timers.destroy();
        on_update.destroy();
        on_message.destroy();
        on_point_down.destroy();
        on_point_up.destroy();
        on_point_move.destroy();
        on_operation.destroy();
        on_load.destroy();

        self.set_lifecycle(SceneLifecycleState::Destroyed);
        self.on_state_change().destroy();
    }
}

//=========================================================================
// Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn context() -> GameContext {
        GameContext::new(30.0, 0)
    }

    fn scene(name: &str) -> (GameContext, Scene) {
        let context = context();
        let scene = Scene::new(
            &context,
            SceneConfig {
                name: name.to_string(),
                ..Default::default()
            },
        );
        (context, scene)
    }

    //--- Lifecycle --------------------------------------------------------

    #[test]
    fn new_scene_is_standby_and_ready() {
        let (_context, scene) = scene("fresh");
        assert_eq!(scene.lifecycle(), SceneLifecycleState::Standby);
        assert!(scene.is_ready());
    }

    #[test]
    fn destroy_fires_before_destroyed_then_destroyed() {
        let (_context, scene) = scene("doomed");
        let states = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&states);
        scene.on_state_change().add(move |state: &SceneLifecycleState| {
            s.borrow_mut().push(*state);
            false
        });

        scene.destroy();
        assert_eq!(
            *states.borrow(),
            vec![
                SceneLifecycleState::BeforeDestroyed,
                SceneLifecycleState::Destroyed
            ]
        );
        assert!(scene.destroyed());
    }

    #[test]
    fn destroy_is_idempotent() {
        let (_context, scene) = scene("doomed");
        scene.destroy();
        scene.destroy();
        assert!(scene.destroyed());
    }

    //--- Timers -----------------------------------------------------------

    #[test]
    fn scene_timers_are_driven_by_the_update_trigger() {
        let (_context, scene) = scene("timed");
        let count = Rc::new(RefCell::new(0u32));
        let c = Rc::clone(&count);
        scene.set_interval(100.0, move || *c.borrow_mut() += 1);

        for _ in 0..30 {
            scene.fire_update();
        }
        assert_eq!(*count.borrow(), 9);
    }

    #[test]
    fn destroy_releases_scene_timers() {
        let (_context, scene) = scene("timed");
        let count = Rc::new(RefCell::new(0u32));
        let c = Rc::clone(&count);
        scene.set_interval(100.0, move || *c.borrow_mut() += 1);
        let update = scene.on_update();

        scene.destroy();
        for _ in 0..30 {
            update.fire(&());
        }
        assert_eq!(*count.borrow(), 0);
    }

    //--- Asset Readiness --------------------------------------------------

    #[test]
    fn scene_becomes_ready_when_the_last_asset_arrives() {
        let context = context();
        let scene = Scene::new(
            &context,
            SceneConfig {
                name: "loading".to_string(),
                asset_requests: 2,
                ..Default::default()
            },
        );
        let loaded = Rc::new(RefCell::new(false));
        let l = Rc::clone(&loaded);
        scene.on_load().add(move |_| {
            *l.borrow_mut() = true;
            false
        });

        assert!(!scene.is_ready());
        scene.notify_asset_loaded();
        assert!(!scene.is_ready());
        assert!(!*loaded.borrow());

        scene.notify_asset_loaded();
        assert!(scene.is_ready());
        assert!(*loaded.borrow());
    }

    #[test]
    fn surplus_asset_notifications_are_tolerated() {
        let (_context, scene) = scene("eager");
        scene.notify_asset_loaded();
        assert!(scene.is_ready());
    }
}

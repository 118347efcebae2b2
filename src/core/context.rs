//=========================================================================
// Game Context
//=========================================================================
//
// Shared simulation state handle passed to every component that needs it.
//
// Contains the state the tick driver owns on behalf of the whole
// instance:
// - fps: the ticking frequency every timer is quantized against
// - age: the logical clock (consumed non-local ticks)
// - random: the shared deterministic generator
// - next_entity_id: deterministic id source for game entities
// - scene_requests: deferred scene-transition commands
//
// Execution is single-threaded; the context is a cheap cloneable handle
// and the driver is the only component that mutates age, the generator
// seed, and the entity counter (scene code reads and draws through the
// accessors below).
//
//=========================================================================

//=== External Dependencies ===============================================

use std::cell::RefCell;
use std::rc::Rc;

//=== Internal Dependencies ===============================================

use crate::core::random::{XorshiftRandom, XorshiftState};
use crate::core::scene::stack::SceneRequest;
use crate::core::scene::Scene;

//=== Internal Types ======================================================

struct ContextState {
    fps: f64,
    age: u64,
    random: XorshiftRandom,
    next_entity_id: u64,
    scene_requests: Vec<SceneRequest>,
}

//=== GameContext =========================================================

/// Shared simulation state accessible to scenes and game code.
///
/// Scenes receive a context clone at construction; the
/// [`Game`](crate::Game) driver holds the authoritative handle.
pub struct GameContext {
    state: Rc<RefCell<ContextState>>,
}

impl Clone for GameContext {
    fn clone(&self) -> Self {
        Self {
            state: Rc::clone(&self.state),
        }
    }
}

impl GameContext {
    //--- Construction -----------------------------------------------------

    pub(crate) fn new(fps: f64, seed: u64) -> Self {
        Self {
            state: Rc::new(RefCell::new(ContextState {
                fps,
                age: 0,
                random: XorshiftRandom::from_seed(seed),
                next_entity_id: 1,
                scene_requests: Vec::new(),
            })),
        }
    }

    //--- Clock ------------------------------------------------------------

    /// The ticking frequency in ticks per second.
    pub fn fps(&self) -> f64 {
        self.state.borrow().fps
    }

    /// The logical clock: consumed non-local ticks since start (or since
    /// the snapshot this instance resumed from).
    pub fn age(&self) -> u64 {
        self.state.borrow().age
    }

    pub(crate) fn advance_age(&self) {
        self.state.borrow_mut().age += 1;
    }

    pub(crate) fn set_age(&self, age: u64) {
        self.state.borrow_mut().age = age;
    }

    //--- Random -----------------------------------------------------------

    /// Next 64 random bits from the shared generator.
    ///
    /// Draws advance the shared state; game logic must only draw at
    /// points reached identically on every instance.
    pub fn random_u64(&self) -> u64 {
        self.state.borrow_mut().random.next_u64()
    }

    /// Uniform draw in `[0, 1)` from the shared generator.
    pub fn random_f64(&self) -> f64 {
        self.state.borrow_mut().random.next_f64()
    }

    /// Uniform integer draw in `[lo, hi)` from the shared generator.
    pub fn random_range(&self, lo: i64, hi: i64) -> i64 {
        self.state.borrow_mut().random.next_range(lo, hi)
    }

    /// Captures the generator state for snapshotting.
    pub fn random_state(&self) -> XorshiftState {
        self.state.borrow().random.state()
    }

    pub(crate) fn reseed(&self, seed: u64) {
        self.state.borrow_mut().random = XorshiftRandom::from_seed(seed);
    }

    pub(crate) fn restore_random(&self, state: XorshiftState) {
        self.state.borrow_mut().random = XorshiftRandom::from_state(state);
    }

    //--- Entity Ids -------------------------------------------------------

    /// Allocates the next deterministic entity id.
    pub fn register_entity_id(&self) -> u64 {
        let mut state = self.state.borrow_mut();
        let id = state.next_entity_id;
        state.next_entity_id += 1;
        id
    }

    /// The id the next [`GameContext::register_entity_id`] call returns.
    pub fn next_entity_id(&self) -> u64 {
        self.state.borrow().next_entity_id
    }

    pub(crate) fn set_next_entity_id(&self, next: u64) {
        self.state.borrow_mut().next_entity_id = next;
    }

    //--- Scene Requests ---------------------------------------------------

    /// Requests a scene push, applied at the next tick boundary.
    pub fn request_push_scene(&self, scene: Scene) {
        self.state
            .borrow_mut()
            .scene_requests
            .push(SceneRequest::Push(scene));
    }

    /// Requests replacing the current top scene, applied at the next tick
    /// boundary. With `preserve_current`, the outgoing scene is removed
    /// without destruction and the caller owns its lifetime.
    pub fn request_replace_scene(&self, scene: Scene, preserve_current: bool) {
        self.state
            .borrow_mut()
            .scene_requests
            .push(SceneRequest::Replace {
                scene,
                preserve_current,
            });
    }

    /// Requests popping `step` scenes, applied at the next tick boundary.
    /// With `preserve`, removed scenes are not destroyed and the caller
    /// owns their lifetime.
    ///
    /// # Panics
    ///
    /// Panics if `step` is zero. Popping past the stack depth is checked
    /// when the request is applied.
    pub fn request_pop_scene(&self, preserve: bool, step: usize) {
        assert!(step >= 1, "request_pop_scene: step must be at least 1");
        self.state
            .borrow_mut()
            .scene_requests
            .push(SceneRequest::Pop { preserve, step });
    }

    pub(crate) fn take_scene_requests(&self) -> Vec<SceneRequest> {
        std::mem::take(&mut self.state.borrow_mut().scene_requests)
    }

    /// Puts deferred requests back at the front of the queue, ahead of
    /// anything requested since.
    pub(crate) fn requeue_scene_requests(&self, deferred: Vec<SceneRequest>) {
        if deferred.is_empty() {
            return;
        }
        let mut state = self.state.borrow_mut();
        let tail = std::mem::replace(&mut state.scene_requests, deferred);
        state.scene_requests.extend(tail);
    }

    pub(crate) fn clear_scene_requests(&self) {
        self.state.borrow_mut().scene_requests.clear();
    }
}

//=========================================================================
// Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn age_starts_at_zero_and_advances_by_one() {
        let context = GameContext::new(30.0, 0);
        assert_eq!(context.age(), 0);
        context.advance_age();
        context.advance_age();
        assert_eq!(context.age(), 2);
    }

    #[test]
    fn entity_ids_are_sequential() {
        let context = GameContext::new(30.0, 0);
        assert_eq!(context.register_entity_id(), 1);
        assert_eq!(context.register_entity_id(), 2);
        assert_eq!(context.next_entity_id(), 3);
    }

    #[test]
    fn reseed_restarts_the_draw_sequence() {
        let context = GameContext::new(30.0, 7);
        let first = context.random_u64();
        context.reseed(7);
        assert_eq!(context.random_u64(), first);
    }

    #[test]
    fn requeue_places_deferred_requests_first() {
        let context = GameContext::new(30.0, 0);
        let deferred_scene = Scene::new(
            &context,
            crate::core::scene::SceneConfig {
                name: "deferred".to_string(),
                ..Default::default()
            },
        );
        let fresh_scene = Scene::new(
            &context,
            crate::core::scene::SceneConfig {
                name: "fresh".to_string(),
                ..Default::default()
            },
        );

        context.request_push_scene(fresh_scene);
        context.requeue_scene_requests(vec![SceneRequest::Push(deferred_scene)]);

        let requests = context.take_scene_requests();
        assert_eq!(requests.len(), 2);
        match &requests[0] {
            SceneRequest::Push(scene) => assert_eq!(scene.name(), "deferred"),
            other => panic!("unexpected request: {:?}", other),
        }
    }

    #[test]
    #[should_panic(expected = "step must be at least 1")]
    fn pop_request_with_zero_step_panics() {
        let context = GameContext::new(30.0, 0);
        context.request_pop_scene(false, 0);
    }
}

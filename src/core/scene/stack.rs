//=========================================================================
// Scene Stack
//=========================================================================
//
// Ordered scene stack plus the deferred transition commands applied to
// it at tick boundaries.
//
// Flow:
//   push/replace/pop request → GameContext queue → flush() at boundary
//
// Exactly one scene is Active at a time; every applied transition fires
// the outgoing scene's notifications before the incoming scene's Active.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::collections::VecDeque;

use log::debug;

//=== Internal Dependencies ===============================================

use super::{Scene, SceneLifecycleState};

//=== SceneRequest ========================================================

/// A deferred scene-stack mutation.
///
/// Requests accumulate in the [`GameContext`](crate::GameContext) queue
/// and are drained exactly once per tick, strictly after that tick's
/// dispatch completes. A request cannot be cancelled once made; a later
/// request applied at the same boundary can only supersede its effect.
#[derive(Debug)]
pub(crate) enum SceneRequest {
    Push(Scene),
    Replace {
        scene: Scene,
        preserve_current: bool,
    },
    Pop {
        preserve: bool,
        step: usize,
    },
}

//=== SceneStack ==========================================================

/// The ordered stack of scenes. Owns scene lifetime: scenes are
/// destroyed when permanently removed, unless a request preserved them.
pub(crate) struct SceneStack {
    scenes: Vec<Scene>,
}

impl SceneStack {
    pub(crate) fn new() -> Self {
        Self { scenes: Vec::new() }
    }

    //--- Queries ----------------------------------------------------------

    pub(crate) fn top(&self) -> Option<Scene> {
        self.scenes.last().cloned()
    }

    pub(crate) fn len(&self) -> usize {
        self.scenes.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }

    fn contains(&self, scene: &Scene) -> bool {
        self.scenes.iter().any(|s| Scene::ptr_eq(s, scene))
    }

    //--- Flush ------------------------------------------------------------

    /// Applies queued requests in order. Returns whether the top scene
    /// changed, plus requests deferred because their scene is not ready
    /// yet (readiness blocks the queue so ordering is preserved; the
    /// driver retries at the next boundary).
    pub(crate) fn flush(&mut self, requests: Vec<SceneRequest>) -> (bool, Vec<SceneRequest>) {
        let top_before = self.top();

        let mut queue: VecDeque<SceneRequest> = requests.into();
        while let Some(request) = queue.pop_front() {
            match request {
                SceneRequest::Push(scene) => {
                    if !scene.is_ready() {
                        debug!("SceneStack: scene '{}' not ready, push deferred", scene.name());
                        queue.push_front(SceneRequest::Push(scene));
                        break;
                    }
                    self.apply_push(scene);
                }
                SceneRequest::Replace {
                    scene,
                    preserve_current,
                } => {
                    if !scene.is_ready() {
                        debug!(
                            "SceneStack: scene '{}' not ready, replace deferred",
                            scene.name()
                        );
                        queue.push_front(SceneRequest::Replace {
                            scene,
                            preserve_current,
                        });
                        break;
                    }
                    self.apply_replace(scene, preserve_current);
                }
                SceneRequest::Pop { preserve, step } => self.apply_pop(preserve, step),
            }
        }

        let top_after = self.top();
        let changed = match (&top_before, &top_after) {
            (Some(a), Some(b)) => !Scene::ptr_eq(a, b),
            (None, None) => false,
            _ => true,
        };
        (changed, queue.into())
    }

    //--- Reset ------------------------------------------------------------

    /// Destroys every scene, top-down. Used when reinitializing from a
    /// snapshot.
    pub(crate) fn destroy_all(&mut self) {
        while let Some(scene) = self.scenes.pop() {
            scene.destroy();
        }
    }

    //--- Internal Helpers -------------------------------------------------

    fn apply_push(&mut self, scene: Scene) {
        assert!(
            !scene.destroyed(),
            "push_scene: scene '{}' is already destroyed",
            scene.name()
        );
        assert!(
            !self.contains(&scene),
            "push_scene: scene '{}' is already on the stack",
            scene.name()
        );

        debug!("SceneStack: pushing scene '{}'", scene.name());
        if let Some(top) = self.top() {
            top.set_lifecycle(SceneLifecycleState::Deactive);
        }
        self.scenes.push(scene.clone());
        scene.set_lifecycle(SceneLifecycleState::Active);
    }

    fn apply_replace(&mut self, scene: Scene, preserve_current: bool) {
        assert!(
            !self.scenes.is_empty(),
            "replace_scene: no scene on the stack to replace"
        );
        assert!(
            !scene.destroyed(),
            "replace_scene: scene '{}' is already destroyed",
            scene.name()
        );
        assert!(
            !self.contains(&scene),
            "replace_scene: scene '{}' is already on the stack",
            scene.name()
        );

        let outgoing = self.scenes.pop().expect("stack checked non-empty");
        debug!(
            "SceneStack: replacing scene '{}' with '{}' (preserve: {})",
            outgoing.name(),
            scene.name(),
            preserve_current
        );
        if preserve_current {
            outgoing.set_lifecycle(SceneLifecycleState::Deactive);
        } else {
            outgoing.destroy();
        }
        self.scenes.push(scene.clone());
        scene.set_lifecycle(SceneLifecycleState::Active);
    }

    fn apply_pop(&mut self, preserve: bool, step: usize) {
        assert!(step >= 1, "pop_scene: step must be at least 1");
        assert!(
            step < self.scenes.len(),
            "pop_scene: cannot remove {} scene(s) from a stack of depth {}",
            step,
            self.scenes.len()
        );

        for _ in 0..step {
            let scene = self.scenes.pop().expect("depth checked above");
            debug!(
                "SceneStack: popping scene '{}' (preserve: {})",
                scene.name(),
                preserve
            );
            if preserve {
                scene.set_lifecycle(SceneLifecycleState::Deactive);
            } else {
                scene.destroy();
            }
        }

        let top = self.top().expect("at least one scene remains");
        top.set_lifecycle(SceneLifecycleState::Active);
    }
}

//=========================================================================
// Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::context::GameContext;
    use crate::core::scene::SceneConfig;
    use std::cell::RefCell;
    use std::rc::Rc;

    type StateLog = Rc<RefCell<Vec<(String, SceneLifecycleState)>>>;

    fn observed(context: &GameContext, name: &str, log: &StateLog) -> Scene {
        let scene = Scene::new(
            context,
            SceneConfig {
                name: name.to_string(),
                ..Default::default()
            },
        );
        let log = Rc::clone(log);
        let tag = name.to_string();
        scene.on_state_change().add(move |state: &SceneLifecycleState| {
            log.borrow_mut().push((tag.clone(), *state));
            false
        });
        scene
    }

    fn fixture() -> (GameContext, SceneStack, StateLog) {
        (
            GameContext::new(30.0, 0),
            SceneStack::new(),
            Rc::new(RefCell::new(Vec::new())),
        )
    }

    fn entry(name: &str, state: SceneLifecycleState) -> (String, SceneLifecycleState) {
        (name.to_string(), state)
    }

    //--- Push -------------------------------------------------------------

    #[test]
    fn push_deactivates_previous_top_then_activates_new() {
        let (context, mut stack, log) = fixture();
        let a = observed(&context, "a", &log);
        let b = observed(&context, "b", &log);

        stack.flush(vec![SceneRequest::Push(a)]);
        log.borrow_mut().clear();

        let (changed, deferred) = stack.flush(vec![SceneRequest::Push(b)]);
        assert!(changed);
        assert!(deferred.is_empty());
        assert_eq!(
            *log.borrow(),
            vec![
                entry("a", SceneLifecycleState::Deactive),
                entry("b", SceneLifecycleState::Active),
            ]
        );
    }

    #[test]
    fn first_push_activates_without_an_outgoing_scene() {
        let (context, mut stack, log) = fixture();
        let a = observed(&context, "a", &log);

        let (changed, _) = stack.flush(vec![SceneRequest::Push(a.clone())]);
        assert!(changed);
        assert_eq!(*log.borrow(), vec![entry("a", SceneLifecycleState::Active)]);
        assert!(Scene::ptr_eq(&stack.top().unwrap(), &a));
    }

    #[test]
    #[should_panic(expected = "already on the stack")]
    fn pushing_a_stacked_scene_panics() {
        let (context, mut stack, log) = fixture();
        let a = observed(&context, "a", &log);
        stack.flush(vec![SceneRequest::Push(a.clone()), SceneRequest::Push(a)]);
    }

    //--- Pop --------------------------------------------------------------

    #[test]
    fn pop_destroys_removed_scenes_in_stack_order_then_activates_exposed_top() {
        let (context, mut stack, log) = fixture();
        let a = observed(&context, "a", &log);
        let b = observed(&context, "b", &log);
        let c = observed(&context, "c", &log);
        stack.flush(vec![
            SceneRequest::Push(a),
            SceneRequest::Push(b),
            SceneRequest::Push(c),
        ]);
        log.borrow_mut().clear();

        let (changed, _) = stack.flush(vec![SceneRequest::Pop {
            preserve: false,
            step: 2,
        }]);
        assert!(changed);
        assert_eq!(
            *log.borrow(),
            vec![
                entry("c", SceneLifecycleState::BeforeDestroyed),
                entry("c", SceneLifecycleState::Destroyed),
                entry("b", SceneLifecycleState::BeforeDestroyed),
                entry("b", SceneLifecycleState::Destroyed),
                entry("a", SceneLifecycleState::Active),
            ]
        );
        assert_eq!(stack.len(), 1);
    }

    #[test]
    fn preserved_pop_leaves_scenes_undestroyed_for_the_caller() {
        let (context, mut stack, log) = fixture();
        let a = observed(&context, "a", &log);
        let b = observed(&context, "b", &log);
        stack.flush(vec![SceneRequest::Push(a.clone()), SceneRequest::Push(b.clone())]);

        stack.flush(vec![SceneRequest::Pop {
            preserve: true,
            step: 1,
        }]);
        assert!(!b.destroyed());
        assert_eq!(b.lifecycle(), SceneLifecycleState::Deactive);
        assert_eq!(a.lifecycle(), SceneLifecycleState::Active);

        // A preserved scene can come back.
        let (changed, _) = stack.flush(vec![SceneRequest::Push(b.clone())]);
        assert!(changed);
        assert_eq!(b.lifecycle(), SceneLifecycleState::Active);
    }

    #[test]
    #[should_panic(expected = "cannot remove 2 scene(s) from a stack of depth 2")]
    fn popping_past_the_stack_depth_panics() {
        let (context, mut stack, log) = fixture();
        let a = observed(&context, "a", &log);
        let b = observed(&context, "b", &log);
        stack.flush(vec![SceneRequest::Push(a), SceneRequest::Push(b)]);

        stack.flush(vec![SceneRequest::Pop {
            preserve: false,
            step: 2,
        }]);
    }

    //--- Replace ----------------------------------------------------------

    #[test]
    fn replace_destroys_outgoing_before_activating_incoming() {
        let (context, mut stack, log) = fixture();
        let a = observed(&context, "a", &log);
        let b = observed(&context, "b", &log);
        stack.flush(vec![SceneRequest::Push(a)]);
        log.borrow_mut().clear();

        stack.flush(vec![SceneRequest::Replace {
            scene: b,
            preserve_current: false,
        }]);
        assert_eq!(
            *log.borrow(),
            vec![
                entry("a", SceneLifecycleState::BeforeDestroyed),
                entry("a", SceneLifecycleState::Destroyed),
                entry("b", SceneLifecycleState::Active),
            ]
        );
        assert_eq!(stack.len(), 1);
    }

    #[test]
    fn replace_with_preserve_keeps_the_outgoing_scene() {
        let (context, mut stack, log) = fixture();
        let a = observed(&context, "a", &log);
        let b = observed(&context, "b", &log);
        stack.flush(vec![SceneRequest::Push(a.clone())]);

        stack.flush(vec![SceneRequest::Replace {
            scene: b,
            preserve_current: true,
        }]);
        assert!(!a.destroyed());
        assert_eq!(a.lifecycle(), SceneLifecycleState::Deactive);
    }

    //--- Readiness gating -------------------------------------------------

    #[test]
    fn unready_scene_defers_its_request_and_everything_behind_it() {
        let (context, mut stack, log) = fixture();
        let base = observed(&context, "base", &log);
        stack.flush(vec![SceneRequest::Push(base)]);

        let loading = Scene::new(
            &context,
            SceneConfig {
                name: "loading".to_string(),
                asset_requests: 1,
                ..Default::default()
            },
        );
        let follow_up = observed(&context, "follow-up", &log);

        let (changed, deferred) = stack.flush(vec![
            SceneRequest::Push(loading.clone()),
            SceneRequest::Push(follow_up),
        ]);
        assert!(!changed);
        assert_eq!(deferred.len(), 2);
        assert_eq!(stack.len(), 1);

        // Once the asset arrives, the retried flush applies both in order.
        loading.notify_asset_loaded();
        let (changed, deferred) = stack.flush(deferred);
        assert!(changed);
        assert!(deferred.is_empty());
        assert_eq!(stack.len(), 3);
        assert_eq!(stack.top().unwrap().name(), "follow-up");
    }

    //--- Reset ------------------------------------------------------------

    #[test]
    fn destroy_all_empties_the_stack_top_down() {
        let (context, mut stack, log) = fixture();
        let a = observed(&context, "a", &log);
        let b = observed(&context, "b", &log);
        stack.flush(vec![SceneRequest::Push(a.clone()), SceneRequest::Push(b.clone())]);
        log.borrow_mut().clear();

        stack.destroy_all();
        assert!(stack.is_empty());
        assert!(a.destroyed());
        assert!(b.destroyed());
        assert_eq!(
            log.borrow()
                .iter()
                .map(|(name, _)| name.clone())
                .collect::<Vec<_>>(),
            vec!["b", "b", "a", "a"]
        );
    }
}

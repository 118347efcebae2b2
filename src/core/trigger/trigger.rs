//=========================================================================
// Trigger
//=========================================================================
//
// Ordered handler list with snapshot firing and optional chaining.
//
// A Trigger is a cheap cloneable handle over shared state. Handlers run
// on the single engine thread and may freely add or remove handlers on
// the trigger they were invoked from; the in-progress firing always
// visits the snapshot taken when fire() was entered.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use log::warn;

//=== Internal Dependencies ===============================================

use super::{HandlerId, HandlerOptions, OwnerId};

//=== Internal Types ======================================================

type Callback<T> = Rc<RefCell<dyn FnMut(&T) -> bool>>;
type ChainFilter<T> = Rc<dyn Fn(&T) -> bool>;

struct HandlerEntry<T> {
    id: HandlerId,
    owner: Option<OwnerId>,
    name: Option<String>,
    once: bool,
    callback: Callback<T>,
}

/// Upstream link of a chained trigger.
///
/// Invariant: `registration` is Some iff this trigger currently has at
/// least one handler of its own.
struct Chain<T> {
    upstream: Trigger<T>,
    filter: Option<ChainFilter<T>>,
    registration: Option<HandlerId>,
}

struct TriggerState<T> {
    handlers: Vec<HandlerEntry<T>>,
    chain: Option<Chain<T>>,
    next_id: u64,
    destroyed: bool,
}

//=== Trigger =============================================================

/// Strongly-ordered publish/subscribe dispatcher.
///
/// Handlers are invoked in registration order. A handler returning `true`
/// (or registered via [`Trigger::add_once`]) is removed immediately after
/// its invocation. Handles are cheap clones sharing one handler list.
///
/// # Chaining
///
/// A trigger built with [`Trigger::chained`] re-fires every payload fired
/// on its upstream trigger, optionally filtered by a predicate. The
/// upstream subscription is lazy: it exists exactly while the chained
/// trigger has handlers of its own, so an idle chained trigger costs its
/// upstream nothing.
///
/// # Reentrancy
///
/// Handlers may add and remove handlers on the trigger that invoked them,
/// and may fire *other* triggers. A handler must not fire the trigger it
/// is itself registered on.
pub struct Trigger<T> {
    state: Rc<RefCell<TriggerState<T>>>,
}

impl<T> Clone for Trigger<T> {
    fn clone(&self) -> Self {
        Self {
            state: Rc::clone(&self.state),
        }
    }
}

impl<T: 'static> Default for Trigger<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> Trigger<T> {
    //--- Construction -----------------------------------------------------

    /// Creates an empty trigger with no upstream.
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(TriggerState {
                handlers: Vec::new(),
                chain: None,
                next_id: 1,
                destroyed: false,
            })),
        }
    }

    /// Creates a trigger that re-fires everything fired on `upstream`.
    pub fn chained(upstream: &Trigger<T>) -> Self {
        Self::build_chained(upstream, None)
    }

    /// Creates a chained trigger that re-fires only payloads for which
    /// `filter` returns `true`.
    pub fn chained_with_filter(
        upstream: &Trigger<T>,
        filter: impl Fn(&T) -> bool + 'static,
    ) -> Self {
        Self::build_chained(upstream, Some(Rc::new(filter)))
    }

    fn build_chained(upstream: &Trigger<T>, filter: Option<ChainFilter<T>>) -> Self {
        let trigger = Self::new();
        trigger.state.borrow_mut().chain = Some(Chain {
            upstream: upstream.clone(),
            filter,
            registration: None,
        });
        trigger
    }

    //--- Registration -----------------------------------------------------

    /// Appends a handler, invoked on every [`Trigger::fire`] until it
    /// returns `true` or is removed.
    ///
    /// # Panics
    ///
    /// Panics if the trigger has been destroyed.
    pub fn add(&self, callback: impl FnMut(&T) -> bool + 'static) -> HandlerId {
        self.add_with(HandlerOptions::default(), callback)
    }

    /// Appends a handler removed after its first invocation, regardless
    /// of its return value.
    ///
    /// # Panics
    ///
    /// Panics if the trigger has been destroyed.
    pub fn add_once(&self, callback: impl FnMut(&T) -> bool + 'static) -> HandlerId {
        self.add_with(
            HandlerOptions {
                once: true,
                ..HandlerOptions::default()
            },
            callback,
        )
    }

    /// Appends a handler with explicit registration metadata.
    ///
    /// The first handler added to a chained trigger activates its
    /// upstream subscription.
    ///
    /// # Panics
    ///
    /// Panics if the trigger has been destroyed.
    pub fn add_with(
        &self,
        options: HandlerOptions,
        callback: impl FnMut(&T) -> bool + 'static,
    ) -> HandlerId {
        let (id, first) = {
            let mut state = self.state.borrow_mut();
            assert!(
                !state.destroyed,
                "Trigger::add: cannot register a handler on a destroyed trigger"
            );
            let id = HandlerId(state.next_id);
            state.next_id += 1;
            state.handlers.push(HandlerEntry {
                id,
                owner: options.owner,
                name: options.name,
                once: options.once,
                callback: Rc::new(RefCell::new(callback)),
            });
            (id, state.handlers.len() == 1)
        };
        if first {
            self.activate_chain();
        }
        id
    }

    //--- Firing -----------------------------------------------------------

    /// Invokes a snapshot of the current handler list in registration
    /// order.
    ///
    /// Handlers added during the firing do not run until the next firing;
    /// handlers removed during the firing are still visited (the snapshot
    /// is fixed on entry). A handler returning `true`, or registered with
    /// `once`, is removed immediately after it returns. Firing a destroyed
    /// trigger is a no-op; destruction observed mid-firing stops the
    /// remaining invocations.
    pub fn fire(&self, payload: &T) {
        let snapshot: Vec<(HandlerId, bool, Callback<T>)> = {
            let state = self.state.borrow();
            if state.destroyed || state.handlers.is_empty() {
                return;
            }
            state
                .handlers
                .iter()
                .map(|entry| (entry.id, entry.once, Rc::clone(&entry.callback)))
                .collect()
        };

        for (id, once, callback) in snapshot {
            if self.state.borrow().destroyed {
                break;
            }
            let drop_handler = (&mut *callback.borrow_mut())(payload);
            if drop_handler || once {
                self.remove(id);
            }
        }
    }

    //--- Removal ----------------------------------------------------------

    /// Removes the handler registered under `id`.
    ///
    /// Tolerant of missing entries: removing a handler that is already
    /// gone (self-removed during a firing, or removed by another handler)
    /// returns `false` without error.
    pub fn remove(&self, id: HandlerId) -> bool {
        self.remove_where(|entry| entry.id == id) > 0
    }

    /// Removes every handler registered under `owner`. Returns the
    /// removed count.
    pub fn remove_by_owner(&self, owner: OwnerId) -> usize {
        self.remove_where(|entry| entry.owner == Some(owner))
    }

    /// Removes every handler registered under `name`. Returns the
    /// removed count.
    pub fn remove_by_name(&self, name: &str) -> usize {
        self.remove_where(|entry| entry.name.as_deref() == Some(name))
    }

    /// Removes every handler. Returns the removed count.
    pub fn remove_all(&self) -> usize {
        self.remove_where(|_| true)
    }

    fn remove_where(&self, keep_out: impl Fn(&HandlerEntry<T>) -> bool) -> usize {
        let (removed, emptied) = {
            let mut state = self.state.borrow_mut();
            if state.destroyed {
                return 0;
            }
            let before = state.handlers.len();
            state.handlers.retain(|entry| !keep_out(entry));
            let removed = before - state.handlers.len();
            (removed, removed > 0 && state.handlers.is_empty())
        };
        if emptied {
            self.deactivate_chain();
        }
        removed
    }

    //--- Queries ----------------------------------------------------------

    /// Whether the handler registered under `id` is still present.
    pub fn contains(&self, id: HandlerId) -> bool {
        self.state
            .borrow()
            .handlers
            .iter()
            .any(|entry| entry.id == id)
    }

    /// Whether any handler is registered under `owner`.
    pub fn contains_owner(&self, owner: OwnerId) -> bool {
        self.state
            .borrow()
            .handlers
            .iter()
            .any(|entry| entry.owner == Some(owner))
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.state.borrow().handlers.len()
    }

    /// Whether no handlers are registered.
    pub fn is_empty(&self) -> bool {
        self.state.borrow().handlers.is_empty()
    }

    /// Whether two handles refer to the same trigger.
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Rc::ptr_eq(&a.state, &b.state)
    }

    //--- Destruction ------------------------------------------------------

    /// Releases the handler list and the upstream link.
    ///
    /// Idempotent. After destruction, firing and removal are no-ops and
    /// registration panics.
    pub fn destroy(&self) {
        if self.state.borrow().destroyed {
            return;
        }
        self.deactivate_chain();
        let mut state = self.state.borrow_mut();
        state.destroyed = true;
        state.handlers.clear();
        state.chain = None;
    }

    /// Whether [`Trigger::destroy`] has been called.
    pub fn destroyed(&self) -> bool {
        self.state.borrow().destroyed
    }

    //--- Chain Management -------------------------------------------------

    /// Subscribes to the upstream trigger. Called when the handler count
    /// transitions 0 → 1.
    fn activate_chain(&self) {
        let link = {
            let state = self.state.borrow();
            match &state.chain {
                Some(chain) if chain.registration.is_none() => {
                    Some((chain.upstream.clone(), chain.filter.clone()))
                }
                _ => None,
            }
        };
        let Some((upstream, filter)) = link else {
            return;
        };
        if upstream.destroyed() {
            warn!("Trigger: upstream of a chained trigger is destroyed, chain stays inactive");
            return;
        }

        let weak = Rc::downgrade(&self.state);
        let registration = upstream.add(move |payload: &T| {
            let Some(state) = weak.upgrade() else {
                // Downstream dropped without destroy(): detach from upstream.
                return true;
            };
            let downstream = Trigger { state };
            if filter.as_ref().map_or(true, |f| (**f)(payload)) {
                downstream.fire(payload);
            }
            false
        });

        if let Some(chain) = self.state.borrow_mut().chain.as_mut() {
            chain.registration = Some(registration);
        }
    }

    /// Unsubscribes from the upstream trigger. Called when the handler
    /// count transitions 1 → 0 and on destroy.
    fn deactivate_chain(&self) {
        let link = {
            let mut state = self.state.borrow_mut();
            state
                .chain
                .as_mut()
                .and_then(|chain| chain.registration.take().map(|r| (chain.upstream.clone(), r)))
        };
        if let Some((upstream, registration)) = link {
            upstream.remove(registration);
        }
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

    fn recorder() -> (Rc<RefCell<Vec<i32>>>, impl Fn(i32) -> Box<dyn FnMut(&()) -> bool>) {
        let log: Rc<RefCell<Vec<i32>>> = Rc::new(RefCell::new(Vec::new()));
        let log2 = Rc::clone(&log);
        let make = move |tag: i32| -> Box<dyn FnMut(&()) -> bool> {
            let log = Rc::clone(&log2);
            Box::new(move |_| {
                log.borrow_mut().push(tag);
                false
            })
        };
        (log, make)
    }

    //--- Ordering ---------------------------------------------------------

    #[test]
    fn fire_invokes_handlers_in_registration_order() {
        let trigger: Trigger<()> = Trigger::new();
        let (log, make) = recorder();
        trigger.add(make(1));
        trigger.add(make(2));
        trigger.add(make(3));

        trigger.fire(&());
        assert_eq!(*log.borrow(), vec![1, 2, 3]);
    }

    #[test]
    fn payload_reaches_every_handler() {
        let trigger: Trigger<i32> = Trigger::new();
        let sum = Rc::new(RefCell::new(0));
        for _ in 0..3 {
            let sum = Rc::clone(&sum);
            trigger.add(move |v: &i32| {
                *sum.borrow_mut() += *v;
                false
            });
        }
        trigger.fire(&7);
        assert_eq!(*sum.borrow(), 21);
    }

    //--- Self-removal -----------------------------------------------------

    #[test]
    fn truthy_return_removes_handler_after_invocation() {
        let trigger: Trigger<()> = Trigger::new();
        let count = Rc::new(RefCell::new(0));
        let c = Rc::clone(&count);
        trigger.add(move |_| {
            *c.borrow_mut() += 1;
            true
        });

        trigger.fire(&());
        trigger.fire(&());
        assert_eq!(*count.borrow(), 1);
        assert!(trigger.is_empty());
    }

    #[test]
    fn n_once_handlers_fired_twice_run_exactly_n_times() {
        let trigger: Trigger<()> = Trigger::new();
        let count = Rc::new(RefCell::new(0));
        for _ in 0..5 {
            let c = Rc::clone(&count);
            trigger.add_once(move |_| {
                *c.borrow_mut() += 1;
                false
            });
        }

        trigger.fire(&());
        trigger.fire(&());
        assert_eq!(*count.borrow(), 5);
        assert!(trigger.is_empty());
    }

    #[test]
    fn handlers_added_during_fire_do_not_run_in_same_firing() {
        let trigger: Trigger<()> = Trigger::new();
        let (log, make) = recorder();
        let inner = trigger.clone();
        let make_late = make(99);
        let make_late = Rc::new(RefCell::new(Some(make_late)));
        let log2 = Rc::clone(&log);
        trigger.add(move |_| {
            log2.borrow_mut().push(1);
            if let Some(late) = make_late.borrow_mut().take() {
                inner.add(late);
            }
            false
        });

        trigger.fire(&());
        assert_eq!(*log.borrow(), vec![1]);

        trigger.fire(&());
        assert_eq!(*log.borrow(), vec![1, 1, 99]);
    }

    #[test]
    fn removal_mid_fire_is_tolerant_for_later_self_removal() {
        // Handler 1 removes handler 2; handler 2 still runs (snapshot) and
        // self-removes without error.
        let trigger: Trigger<()> = Trigger::new();
        let (log, _) = recorder();
        let id2 = Rc::new(RefCell::new(None::<HandlerId>));

        let t = trigger.clone();
        let id2_ref = Rc::clone(&id2);
        let log1 = Rc::clone(&log);
        trigger.add(move |_| {
            log1.borrow_mut().push(1);
            t.remove(id2_ref.borrow().unwrap());
            false
        });
        let log2 = Rc::clone(&log);
        let id = trigger.add(move |_| {
            log2.borrow_mut().push(2);
            true
        });
        *id2.borrow_mut() = Some(id);

        trigger.fire(&());
        assert_eq!(*log.borrow(), vec![1, 2]);
        assert_eq!(trigger.len(), 1);
    }

    //--- Filtered removal -------------------------------------------------

    #[test]
    fn remove_by_owner_removes_only_that_owner() {
        let trigger: Trigger<()> = Trigger::new();
        let (log, make) = recorder();
        let owner = OwnerId::fresh();
        let other = OwnerId::fresh();
        trigger.add_with(
            HandlerOptions {
                owner: Some(owner),
                ..HandlerOptions::default()
            },
            make(1),
        );
        trigger.add_with(
            HandlerOptions {
                owner: Some(other),
                ..HandlerOptions::default()
            },
            make(2),
        );

        assert_eq!(trigger.remove_by_owner(owner), 1);
        assert!(!trigger.contains_owner(owner));
        trigger.fire(&());
        assert_eq!(*log.borrow(), vec![2]);
    }

    #[test]
    fn remove_by_name_removes_every_matching_registration() {
        let trigger: Trigger<()> = Trigger::new();
        let (log, make) = recorder();
        for tag in [1, 2] {
            trigger.add_with(
                HandlerOptions {
                    name: Some("doomed".to_string()),
                    ..HandlerOptions::default()
                },
                make(tag),
            );
        }
        trigger.add(make(3));

        assert_eq!(trigger.remove_by_name("doomed"), 2);
        trigger.fire(&());
        assert_eq!(*log.borrow(), vec![3]);
    }

    #[test]
    fn remove_is_tolerant_of_missing_entries() {
        let trigger: Trigger<()> = Trigger::new();
        let id = trigger.add(|_| false);
        assert!(trigger.remove(id));
        assert!(!trigger.remove(id));
    }

    //--- Chain ------------------------------------------------------------

    #[test]
    fn chained_trigger_without_handlers_is_not_subscribed() {
        let upstream: Trigger<i32> = Trigger::new();
        let _child = Trigger::chained(&upstream);
        assert!(upstream.is_empty());
    }

    #[test]
    fn chain_activates_on_first_handler_and_deactivates_on_last() {
        let upstream: Trigger<i32> = Trigger::new();
        let child = Trigger::chained(&upstream);
        let count = Rc::new(RefCell::new(0));

        // No handlers: firing upstream reaches nothing.
        upstream.fire(&1);
        assert_eq!(*count.borrow(), 0);

        let c = Rc::clone(&count);
        let id = child.add(move |_| {
            *c.borrow_mut() += 1;
            false
        });
        assert_eq!(upstream.len(), 1);
        upstream.fire(&1);
        assert_eq!(*count.borrow(), 1);

        child.remove(id);
        assert!(upstream.is_empty());
        upstream.fire(&1);
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn chain_filter_gates_refiring() {
        let upstream: Trigger<i32> = Trigger::new();
        let child = Trigger::chained_with_filter(&upstream, |v: &i32| *v > 10);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&seen);
        child.add(move |v: &i32| {
            s.borrow_mut().push(*v);
            false
        });

        upstream.fire(&5);
        upstream.fire(&15);
        assert_eq!(*seen.borrow(), vec![15]);
    }

    #[test]
    fn destroying_child_detaches_from_upstream() {
        let upstream: Trigger<i32> = Trigger::new();
        let child = Trigger::chained(&upstream);
        child.add(|_| false);
        assert_eq!(upstream.len(), 1);

        child.destroy();
        assert!(upstream.is_empty());
        upstream.fire(&1);
    }

    //--- Destruction ------------------------------------------------------

    #[test]
    fn firing_a_destroyed_trigger_is_a_noop() {
        let trigger: Trigger<()> = Trigger::new();
        trigger.add(|_| panic!("must not run"));
        trigger.destroy();
        trigger.fire(&());
        assert!(trigger.destroyed());
    }

    #[test]
    fn destroy_is_idempotent() {
        let trigger: Trigger<()> = Trigger::new();
        trigger.destroy();
        trigger.destroy();
        assert!(trigger.destroyed());
    }

    #[test]
    #[should_panic(expected = "destroyed trigger")]
    fn adding_to_a_destroyed_trigger_panics() {
        let trigger: Trigger<()> = Trigger::new();
        trigger.destroy();
        trigger.add(|_| false);
    }

    #[test]
    fn destruction_mid_fire_stops_remaining_handlers() {
        let trigger: Trigger<()> = Trigger::new();
        let (log, make) = recorder();
        let t = trigger.clone();
        let log1 = Rc::clone(&log);
        trigger.add(move |_| {
            log1.borrow_mut().push(1);
            t.destroy();
            false
        });
        trigger.add(make(2));

        trigger.fire(&());
        assert_eq!(*log.borrow(), vec![1]);
    }
}

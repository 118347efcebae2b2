//=========================================================================
// Event Filter Pipeline
//=========================================================================
//
// Ordered chain of transformations applied to a tick's event set before
// dispatch.
//
// Flow:
//   tick events → filter 1 → filter 2 → ... → dispatch
//
// A filter returns the events it passes on and may additionally queue
// events via the controller; queued events are handed to the *next*
// filter, so a filter can consume one event and produce others within a
// single pass.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::cell::RefCell;
use std::rc::Rc;

use log::warn;

//=== Internal Dependencies ===============================================

use super::Event;

//=== EventFilter =========================================================

/// A transformation over a tick's event set.
///
/// Implemented for closures of the same shape, so simple filters need no
/// named type:
///
/// ```
/// # use lockstep_engine::core::event::filter::{shared_filter, EventFilterController};
/// # use lockstep_engine::core::event::Event;
/// let drop_everything = shared_filter(
///     |_events: Vec<Event>, _controller: &mut EventFilterController| -> Vec<Event> {
///         Vec::new()
///     },
/// );
/// ```
pub trait EventFilter {
    fn apply(&mut self, events: Vec<Event>, controller: &mut EventFilterController) -> Vec<Event>;
}

impl<F> EventFilter for F
where
    F: FnMut(Vec<Event>, &mut EventFilterController) -> Vec<Event>,
{
    fn apply(&mut self, events: Vec<Event>, controller: &mut EventFilterController) -> Vec<Event> {
        self(events, controller)
    }
}

/// Shared filter handle. Registration and removal go by handle identity.
pub type SharedEventFilter = Rc<RefCell<dyn EventFilter>>;

/// Wraps a filter (or closure) into a [`SharedEventFilter`] handle.
pub fn shared_filter(filter: impl EventFilter + 'static) -> SharedEventFilter {
    Rc::new(RefCell::new(filter))
}

//=== EventFilterController ===============================================

/// Hands events forward past the currently running filter.
pub struct EventFilterController {
    queued: Vec<Event>,
}

impl EventFilterController {
    fn new() -> Self {
        Self { queued: Vec::new() }
    }

    /// Queues an event for the next filter in the chain (or, from the
    /// last filter, for dispatch). The currently running filter never
    /// sees it.
    pub fn process_next(&mut self, event: Event) {
        self.queued.push(event);
    }
}

//=== EventFilterPipeline =================================================

/// Ordered filter chain. Registration order is application order.
///
/// Filters persist across scene transitions (and across snapshot resets)
/// until explicitly removed.
pub struct EventFilterPipeline {
    filters: Vec<FilterEntry>,
}

struct FilterEntry {
    filter: SharedEventFilter,
    handle_empty: bool,
}

impl Default for EventFilterPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl EventFilterPipeline {
    pub fn new() -> Self {
        Self {
            filters: Vec::new(),
        }
    }

    //--- Registration -----------------------------------------------------

    /// Appends a filter. With `handle_empty`, the filter also runs on
    /// ticks that carry no events; without it, empty event sets skip the
    /// filter.
    pub fn add(&mut self, filter: SharedEventFilter, handle_empty: bool) {
        self.filters.push(FilterEntry {
            filter,
            handle_empty,
        });
    }

    /// Removes a filter by handle identity. Removing an unregistered
    /// filter is tolerated.
    pub fn remove(&mut self, filter: &SharedEventFilter) -> bool {
        let before = self.filters.len();
        self.filters
            .retain(|entry| !Rc::ptr_eq(&entry.filter, filter));
        if self.filters.len() == before {
            warn!("EventFilterPipeline: remove() called with an unregistered filter");
            return false;
        }
        true
    }

    /// Removes every filter.
    pub fn remove_all(&mut self) {
        self.filters.clear();
    }

    /// Number of registered filters.
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Whether no filters are registered.
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    //--- Application ------------------------------------------------------

    /// Runs the chain over one tick's event set.
    pub fn apply(&mut self, mut events: Vec<Event>) -> Vec<Event> {
        for entry in &self.filters {
            if events.is_empty() && !entry.handle_empty {
                continue;
            }
            let mut controller = EventFilterController::new();
            events = entry
                .filter
                .borrow_mut()
                .apply(std::mem::take(&mut events), &mut controller);
            events.append(&mut controller.queued);
        }
        events
    }
}

//=========================================================================
// Tests
//=========================================================================

//=========================================================================
// Trigger System
//=========================================================================
//
// Strongly-ordered publish/subscribe primitive.
//
// Architecture:
//   Trigger<T>
//     ├─ handlers: Vec<HandlerEntry<T>>   (insertion order = firing order)
//     └─ chain: Option<Chain<T>>          (lazy upstream subscription)
//
// Flow:
//   fire(&payload) → snapshot handlers → invoke in order → drop truthy/once
//
// Every other notification mechanism in the crate (timers, scene state
// changes, tick updates) is built on Trigger.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::sync::atomic::{AtomicU64, Ordering};

//=== Module Declarations =================================================

mod trigger;

//=== Public API ==========================================================

pub use trigger::Trigger;

//=== Handler Identity ====================================================

/// Identifies a single handler registration within one [`Trigger`].
///
/// Returned by [`Trigger::add`] and friends; used for targeted removal
/// and membership queries. Ids are unique per trigger, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(pub(crate) u64);

/// Opaque owner identity for grouped handler removal.
///
/// Components that register handlers on shared triggers tag them with an
/// owner token so they can be removed together on teardown. Uniqueness is
/// not enforced between registrations; the same callback may be registered
/// multiple times under different owners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OwnerId(u64);

impl OwnerId {
    /// Allocates a process-unique owner token.
    pub fn fresh() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        OwnerId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

//=== Handler Options =====================================================

/// Optional registration metadata for [`Trigger::add_with`].
///
/// `owner` and `name` enable filtered removal; `once` marks the handler
/// for removal after its first invocation regardless of return value.
#[derive(Default)]
pub struct HandlerOptions {
    /// Owner token for grouped removal via [`Trigger::remove_by_owner`].
    pub owner: Option<OwnerId>,

    /// Handler name for removal via [`Trigger::remove_by_name`].
    pub name: Option<String>,

    /// Remove the handler after its first invocation.
    pub once: bool,
}

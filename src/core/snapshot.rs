//=========================================================================
// Snapshot
//=========================================================================
//
// Serialized capture of simulation state for resumption and late join.
//
// A snapshot pins everything a fresh instance needs to fall in step with
// running peers: the logical clock, the generator state, the entity-id
// counter, and a game-defined payload describing the scene stack.
//
//=========================================================================

//=== External Dependencies ===============================================

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

//=== Internal Dependencies ===============================================

use crate::core::random::XorshiftState;

//=== SnapshotError =======================================================

/// Snapshot codec failures. These are host-side I/O concerns, not
/// simulation errors, and are therefore recoverable.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot encoding failed: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("snapshot decoding failed: {0}")]
    Decode(#[source] serde_json::Error),
}

//=== Snapshot ============================================================

/// A resumable capture of simulation state.
///
/// Produced only by the instance whose host answers
/// `should_save_snapshot() == true`; consumed by
/// [`Game::reset_from_snapshot`](crate::Game::reset_from_snapshot).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// The age at which the capture was taken. Resuming instances start
    /// their logical clock here.
    pub frame: u64,

    /// Game-defined scene-stack description. Opaque to the core.
    pub payload: Value,

    /// Random generator state at the capture point.
    pub random_state: XorshiftState,

    /// Next deterministic entity id.
    pub next_entity_id: u64,

    /// Optional wall-clock anchor supplied by the producing host.
    pub timestamp: Option<i64>,
}

impl Snapshot {
    /// Encodes the snapshot as JSON for the host's storage layer.
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        serde_json::to_string(self).map_err(SnapshotError::Encode)
    }

    /// Decodes a snapshot previously produced by [`Snapshot::to_json`].
    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        serde_json::from_str(json).map_err(SnapshotError::Decode)
    }
}

//=========================================================================
// Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Snapshot {
        Snapshot {
            frame: 120,
            payload: json!({"scene": "battle", "score": [3, 7]}),
            random_state: XorshiftState { s0: 11, s1: 22 },
            next_entity_id: 42,
            timestamp: Some(1_700_000_000),
        }
    }

    #[test]
    fn json_round_trip_preserves_every_field() {
        let snapshot = sample();
        let decoded = Snapshot::from_json(&snapshot.to_json().unwrap()).unwrap();
        assert_eq!(decoded, snapshot);
    }

    #[test]
    fn malformed_json_is_a_decode_error() {
        let result = Snapshot::from_json("{not json");
        assert!(matches!(result, Err(SnapshotError::Decode(_))));
    }
}

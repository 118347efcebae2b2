//=========================================================================
// Event Model
//=========================================================================
//
// The closed set of built-in event kinds carried by ticks.
//
// Payload data beyond the fields below is opaque to the core
// (serde_json::Value); its meaning belongs to the game code and the
// transport. Every kind carries a numeric priority used by the host when
// ordering outbound events.
//
//=========================================================================

//=== External Dependencies ===============================================

use serde::{Deserialize, Serialize};
use serde_json::Value;

//=== Module Declarations =================================================

pub mod filter;

//=== Player Identity =====================================================

/// Player identifier assigned by the transport layer.
pub type PlayerId = String;

/// A participating player, as carried by join/leave/point events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: Option<String>,
}

//=== Event Payloads ======================================================

/// Pointer press or release.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointEvent {
    pub priority: u8,
    pub player: Option<Player>,
    pub pointer_id: i32,
    pub x: f64,
    pub y: f64,
}

/// Pointer movement, with deltas relative to the previous report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointMoveEvent {
    pub priority: u8,
    pub player: Option<Player>,
    pub pointer_id: i32,
    pub x: f64,
    pub y: f64,
    pub delta_x: f64,
    pub delta_y: f64,
}

/// Broadcast message with opaque payload data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageEvent {
    pub priority: u8,
    pub player: Option<Player>,
    /// Local events never reach the transport.
    pub local: bool,
    pub data: Value,
}

/// A player joined the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinEvent {
    pub priority: u8,
    pub player: Player,
}

/// A player left the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaveEvent {
    pub priority: u8,
    pub player: Player,
}

/// Out-of-band player metadata update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerInfoEvent {
    pub priority: u8,
    pub player: Player,
    pub user_data: Value,
}

/// Re-seeds the shared random generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedEvent {
    pub priority: u8,
    pub generator_seed: u64,
}

/// Wall-clock anchor for replay alignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimestampEvent {
    pub priority: u8,
    pub player: Option<Player>,
    pub timestamp: i64,
}

/// Game-defined operation with an opaque payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationEvent {
    pub priority: u8,
    pub player: Option<Player>,
    pub code: u32,
    pub local: bool,
    pub data: Value,
}

//=== Event ===============================================================

/// A tick-carried event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Event {
    PointDown(PointEvent),
    PointUp(PointEvent),
    PointMove(PointMoveEvent),
    Message(MessageEvent),
    Join(JoinEvent),
    Leave(LeaveEvent),
    PlayerInfo(PlayerInfoEvent),
    Seed(SeedEvent),
    Timestamp(TimestampEvent),
    Operation(OperationEvent),
}

impl Event {
    /// The event's priority field.
    pub fn priority(&self) -> u8 {
        match self {
            Event::PointDown(e) | Event::PointUp(e) => e.priority,
            Event::PointMove(e) => e.priority,
            Event::Message(e) => e.priority,
            Event::Join(e) => e.priority,
            Event::Leave(e) => e.priority,
            Event::PlayerInfo(e) => e.priority,
            Event::Seed(e) => e.priority,
            Event::Timestamp(e) => e.priority,
            Event::Operation(e) => e.priority,
        }
    }

    /// Stable kind name, matching the wire-level tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::PointDown(_) => "point-down",
            Event::PointUp(_) => "point-up",
            Event::PointMove(_) => "point-move",
            Event::Message(_) => "message",
            Event::Join(_) => "join",
            Event::Leave(_) => "leave",
            Event::PlayerInfo(_) => "player-info",
            Event::Seed(_) => "seed",
            Event::Timestamp(_) => "timestamp",
            Event::Operation(_) => "operation",
        }
    }
}

//=========================================================================
// Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn kind_matches_serialized_tag() {
        let event = Event::Message(MessageEvent {
            priority: 2,
            player: None,
            local: false,
            data: json!({"hello": "world"}),
        });
        let encoded = serde_json::to_value(&event).unwrap();
        assert_eq!(encoded["type"], event.kind());
    }

    #[test]
    fn events_round_trip_through_json() {
        let event = Event::PointDown(PointEvent {
            priority: 0,
            player: Some(Player {
                id: "p1".to_string(),
                name: Some("alice".to_string()),
            }),
            pointer_id: 1,
            x: 12.5,
            y: -3.0,
        });
        let encoded = serde_json::to_string(&event).unwrap();
        let decoded: Event = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, event);
    }

    #[test]
    fn priority_accessor_covers_every_kind() {
        let events = [
            Event::Seed(SeedEvent {
                priority: 1,
                generator_seed: 9,
            }),
            Event::Timestamp(TimestampEvent {
                priority: 1,
                player: None,
                timestamp: 0,
            }),
            Event::Operation(OperationEvent {
                priority: 1,
                player: None,
                code: 4,
                local: true,
                data: Value::Null,
            }),
        ];
        for event in &events {
            assert_eq!(event.priority(), 1);
        }
    }
}

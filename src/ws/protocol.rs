//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::snapshot::GameStateView;
use crate::game::{Intent, Side};

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Enter the matchmaking queue
    FindMatch,

    /// Paddle input for the coming tick
    Input(InputPayload),
}

/// Input payload; every field is optional on the wire
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputPayload {
    #[serde(default)]
    pub up: Option<bool>,
    #[serde(default)]
    pub down: Option<bool>,
    /// Absolute paddle target, overrides `up`/`down` when present
    #[serde(default)]
    pub target_y: Option<f64>,
}

impl ClientMsg {
    /// Decode a text frame. Input fields of the wrong type are treated as
    /// absent rather than rejecting the whole frame.
    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        if value.get("type").and_then(|t| t.as_str()) == Some("input") {
            return Ok(ClientMsg::Input(InputPayload {
                up: value.get("up").and_then(|v| v.as_bool()),
                down: value.get("down").and_then(|v| v.as_bool()),
                target_y: value.get("targetY").and_then(|v| v.as_f64()),
            }));
        }
        serde_json::from_value(value)
    }
}

impl From<InputPayload> for Intent {
    fn from(payload: InputPayload) -> Self {
        Intent::from_parts(payload.up, payload.down, payload.target_y)
    }
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Paired with an opponent
    Matched {
        side: Side,
        #[serde(rename = "matchId")]
        match_id: Uuid,
    },

    /// Authoritative state, once per tick
    GameState { state: GameStateView, tick: u64 },

    /// The other player disconnected; the match is over
    OpponentLeft,
}

//! `player_action` encodings.
//!
//! Wire shape: `{"type":"player_action","action":<tag>,"player":<name>,"data":{..}}`.

use scriptwire_frame::{Envelope, FrameError, MessageKind};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;

/// An action the host performs on a player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "data", rename_all = "snake_case")]
pub enum PlayerAction {
    SendMessage {
        message: String,
    },
    SetGamemode {
        gamemode: String,
    },
    Teleport {
        x: f64,
        y: f64,
        z: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        world: Option<String>,
    },
    TeleportToPlayer {
        target: String,
    },
    Heal {},
    Feed {},
    SetFly {
        enabled: bool,
    },
    SetGodMode {
        enabled: bool,
    },
    GiveItem {
        material: String,
        amount: u32,
    },
}

impl PlayerAction {
    /// `give_item` with the material name upper-cased.
    pub fn give_item(material: &str, amount: u32) -> Self {
        PlayerAction::GiveItem {
            material: material.to_uppercase(),
            amount,
        }
    }

    /// `set_gamemode` with aliases normalized.
    pub fn set_gamemode(mode: &str) -> Self {
        PlayerAction::SetGamemode {
            gamemode: normalize_gamemode(mode),
        }
    }

    /// Wire tag of this action.
    pub fn tag(&self) -> &'static str {
        match self {
            PlayerAction::SendMessage { .. } => "send_message",
            PlayerAction::SetGamemode { .. } => "set_gamemode",
            PlayerAction::Teleport { .. } => "teleport",
            PlayerAction::TeleportToPlayer { .. } => "teleport_to_player",
            PlayerAction::Heal {} => "heal",
            PlayerAction::Feed {} => "feed",
            PlayerAction::SetFly { .. } => "set_fly",
            PlayerAction::SetGodMode { .. } => "set_god_mode",
            PlayerAction::GiveItem { .. } => "give_item",
        }
    }

    /// Encode as a `player_action` envelope addressed to `player`.
    pub fn to_envelope(&self, player: &str) -> Result<Envelope> {
        let tagged = serde_json::to_value(self).map_err(FrameError::Encode)?;
        let mut tagged = match tagged {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        let data = tagged
            .remove("data")
            .unwrap_or_else(|| Value::Object(Map::new()));

        Ok(Envelope::new(MessageKind::PlayerAction)
            .field("action", self.tag())
            .field("player", player)
            .data_value(data))
    }

    /// Decode a `player_action` envelope into its target player and action.
    ///
    /// Returns `None` for other envelope kinds.
    pub fn from_envelope(envelope: &Envelope) -> Result<Option<(String, PlayerAction)>> {
        if envelope.kind() != Some(MessageKind::PlayerAction) {
            return Ok(None);
        }
        let Some(player) = envelope.get_str("player") else {
            return Ok(None);
        };

        let mut tagged = Map::new();
        tagged.insert(
            "action".to_string(),
            envelope.fields.get("action").cloned().unwrap_or(Value::Null),
        );
        tagged.insert(
            "data".to_string(),
            envelope
                .data
                .clone()
                .unwrap_or_else(|| Value::Object(Map::new())),
        );

        let action = serde_json::from_value(Value::Object(tagged))?;
        Ok(Some((player.to_string(), action)))
    }
}

/// Map gamemode aliases to their canonical names.
///
/// Case-insensitive. Unrecognized values are returned unchanged; the host
/// decides whether to accept them.
pub fn normalize_gamemode(mode: &str) -> String {
    match mode.to_ascii_lowercase().as_str() {
        "0" | "survival" | "s" => "SURVIVAL".to_string(),
        "1" | "creative" | "c" => "CREATIVE".to_string(),
        "2" | "adventure" | "a" => "ADVENTURE".to_string(),
        "3" | "spectator" | "sp" => "SPECTATOR".to_string(),
        _ => mode.to_string(),
    }
}

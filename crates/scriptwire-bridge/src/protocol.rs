//! Typed payloads for the envelope kinds exchanged with the host.

use scriptwire_frame::{Envelope, MessageKind};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Chat color codes applied around a message prefix.
const PREFIX_COLOR: &str = "<color:#F5C527>";
const PREFIX_SEPARATOR: &str = " <dark_gray>> <gray>";

/// `command` payload: a player ran one of our commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandInvocation {
    pub command: String,
    pub player: String,
    #[serde(default)]
    pub args: Vec<String>,
}

/// `register_command` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterCommand {
    pub command: String,
}

/// `check_permission` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionQuery {
    pub player: String,
    pub permission: String,
    pub op_bypass: bool,
}

impl PermissionQuery {
    pub fn new(player: impl Into<String>, permission: impl Into<String>, op_bypass: bool) -> Self {
        Self {
            player: player.into(),
            permission: permission.into(),
            op_bypass,
        }
    }
}

/// `permission_result` payload. Echoes the query triple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionReply {
    pub player: String,
    pub permission: String,
    pub op_bypass: bool,
    pub has_permission: bool,
}

/// Build a `register_command` envelope.
pub fn register_command(name: &str) -> Result<Envelope> {
    let payload = RegisterCommand {
        command: name.to_string(),
    };
    Ok(Envelope::with_data(MessageKind::RegisterCommand, &payload)?)
}

/// Build a `check_permission` envelope.
pub fn check_permission(query: &PermissionQuery) -> Result<Envelope> {
    Ok(Envelope::with_data(MessageKind::CheckPermission, query)?)
}

/// Build an `execute` envelope for a console command.
pub fn execute(command: &str) -> Envelope {
    Envelope::new(MessageKind::Execute).field("command", command)
}

/// Build a `broadcast` envelope.
pub fn broadcast(message: &str) -> Envelope {
    Envelope::new(MessageKind::Broadcast).field("message", message)
}

/// Decorate a chat message with the configured prefix, if any.
pub fn format_message(prefix: Option<&str>, text: &str) -> String {
    match prefix {
        Some(prefix) if !prefix.is_empty() => {
            format!("{PREFIX_COLOR}{prefix}{PREFIX_SEPARATOR}{text}")
        }
        _ => text.to_string(),
    }
}

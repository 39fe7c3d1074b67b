//! Envelope `type` tags.
//!
//! The set is closed on the outbound side. Inbound envelopes with a tag
//! outside this set still decode; the dispatcher ignores them.

use std::fmt;
use std::str::FromStr;

/// Worker announces a command name to the host.
pub const REGISTER_COMMAND: &str = "register_command";

/// Worker asks the host whether a player holds a permission.
pub const CHECK_PERMISSION: &str = "check_permission";

/// Host answers a `check_permission` request.
pub const PERMISSION_RESULT: &str = "permission_result";

/// Host forwards a player command invocation.
pub const COMMAND: &str = "command";

/// Worker asks the host to act on a player.
pub const PLAYER_ACTION: &str = "player_action";

/// Worker asks the host to run a console command.
pub const EXECUTE: &str = "execute";

/// Worker asks the host to broadcast a chat message.
pub const BROADCAST: &str = "broadcast";

/// Known envelope kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    RegisterCommand,
    CheckPermission,
    PermissionResult,
    Command,
    PlayerAction,
    Execute,
    Broadcast,
}

impl MessageKind {
    /// All known kinds.
    pub const ALL: [MessageKind; 7] = [
        MessageKind::RegisterCommand,
        MessageKind::CheckPermission,
        MessageKind::PermissionResult,
        MessageKind::Command,
        MessageKind::PlayerAction,
        MessageKind::Execute,
        MessageKind::Broadcast,
    ];

    /// Wire tag for this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            MessageKind::RegisterCommand => REGISTER_COMMAND,
            MessageKind::CheckPermission => CHECK_PERMISSION,
            MessageKind::PermissionResult => PERMISSION_RESULT,
            MessageKind::Command => COMMAND,
            MessageKind::PlayerAction => PLAYER_ACTION,
            MessageKind::Execute => EXECUTE,
            MessageKind::Broadcast => BROADCAST,
        }
    }

    /// Returns true for kinds the host sends to the worker.
    pub fn is_inbound(self) -> bool {
        matches!(self, MessageKind::Command | MessageKind::PermissionResult)
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MessageKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or(())
    }
}

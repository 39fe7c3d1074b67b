//! Per-invocation handle passed to command handlers.

use crate::action::PlayerAction;
use crate::bridge::Session;
use crate::error::Result;
use crate::protocol::{self, format_message, PermissionQuery};
use crate::registry::CommandSpec;

/// One command invocation: who ran it, with which arguments.
///
/// Lives only for the duration of the handler call.
pub struct Context<'a> {
    player: &'a str,
    args: &'a [String],
    spec: &'a CommandSpec,
    session: &'a Session,
}

impl<'a> Context<'a> {
    pub(crate) fn new(
        session: &'a Session,
        spec: &'a CommandSpec,
        player: &'a str,
        args: &'a [String],
    ) -> Self {
        Self {
            player,
            args,
            spec,
            session,
        }
    }

    /// The invoking player.
    pub fn player(&self) -> &str {
        self.player
    }

    /// Name of the command being run.
    pub fn command(&self) -> &str {
        self.spec.name()
    }

    pub fn args(&self) -> &[String] {
        self.args
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }

    /// Argument at `index`, or `default` when out of range.
    pub fn string(&self, index: usize, default: &str) -> String {
        self.arg(index).unwrap_or(default).to_string()
    }

    /// Integer argument, or `default` when missing or not an integer.
    pub fn int(&self, index: usize, default: i64) -> i64 {
        self.arg(index)
            .and_then(|raw| raw.trim().parse().ok())
            .unwrap_or(default)
    }

    /// Float argument, or `default` when missing or not a number.
    pub fn float(&self, index: usize, default: f64) -> f64 {
        self.arg(index)
            .and_then(|raw| raw.trim().parse().ok())
            .unwrap_or(default)
    }

    /// Boolean argument (`true/false`, `on/off`, `yes/no`, `1/0`).
    pub fn bool(&self, index: usize, default: bool) -> bool {
        match self.arg(index).map(str::to_ascii_lowercase).as_deref() {
            Some("true" | "on" | "yes" | "1") => true,
            Some("false" | "off" | "no" | "0") => false,
            _ => default,
        }
    }

    /// Arguments from `from` onwards joined with single spaces.
    pub fn joined(&self, from: usize) -> String {
        self.args.get(from..).unwrap_or_default().join(" ")
    }

    /// Send a chat message to the invoking player.
    pub fn reply(&self, text: &str) -> Result<()> {
        self.message(self.player, text)
    }

    /// Send a chat message to any player.
    pub fn message(&self, player: &str, text: &str) -> Result<()> {
        let message = format_message(self.session.config.message_prefix.as_deref(), text);
        self.act_on(player, &PlayerAction::SendMessage { message })
    }

    /// Reply with the command's description and usage lines.
    pub fn send_usage(&self) -> Result<()> {
        if let Some(description) = self.spec.describe() {
            self.reply(description)?;
        }
        let usage = self.spec.usage_lines();
        if usage.is_empty() {
            return self.reply(&format!("Usage: /{}", self.spec.name()));
        }
        for line in usage {
            self.reply(line)?;
        }
        Ok(())
    }

    /// Broadcast a chat message to everyone.
    pub fn broadcast(&self, text: &str) -> Result<()> {
        self.session.outbound.send(&protocol::broadcast(text))
    }

    /// Run a console command on the host.
    pub fn execute(&self, command: &str) -> Result<()> {
        self.session.outbound.send(&protocol::execute(command))
    }

    /// Perform an action on the invoking player.
    pub fn act(&self, action: &PlayerAction) -> Result<()> {
        self.act_on(self.player, action)
    }

    /// Perform an action on any player.
    pub fn act_on(&self, player: &str, action: &PlayerAction) -> Result<()> {
        self.session.outbound.send(&action.to_envelope(player)?)
    }

    pub fn teleport(&self, x: f64, y: f64, z: f64, world: Option<&str>) -> Result<()> {
        self.act(&PlayerAction::Teleport {
            x,
            y,
            z,
            world: world.map(str::to_string),
        })
    }

    pub fn teleport_to_player(&self, target: &str) -> Result<()> {
        self.act(&PlayerAction::TeleportToPlayer {
            target: target.to_string(),
        })
    }

    pub fn heal(&self) -> Result<()> {
        self.act(&PlayerAction::Heal {})
    }

    pub fn feed(&self) -> Result<()> {
        self.act(&PlayerAction::Feed {})
    }

    pub fn set_fly(&self, enabled: bool) -> Result<()> {
        self.act(&PlayerAction::SetFly { enabled })
    }

    pub fn set_god_mode(&self, enabled: bool) -> Result<()> {
        self.act(&PlayerAction::SetGodMode { enabled })
    }

    pub fn give_item(&self, material: &str, amount: u32) -> Result<()> {
        self.act(&PlayerAction::give_item(material, amount))
    }

    /// Change gamemode; `c`, `1`, `creative` and friends are normalized.
    pub fn set_gamemode(&self, mode: &str) -> Result<()> {
        self.act(&PlayerAction::set_gamemode(mode))
    }

    /// Check an extra permission for the invoking player.
    ///
    /// Uses this command's op-bypass flag and fails closed on timeout.
    pub fn has_permission(&self, permission: &str) -> Result<bool> {
        let query = PermissionQuery::new(self.player, permission, self.spec.is_op_bypass());
        self.session
            .correlator
            .check(&self.session.outbound, &query)
    }
}

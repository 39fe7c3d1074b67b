//! Worker side of a line-oriented JSON command bridge.
//!
//! A host process (typically a game server) spawns the worker and talks to
//! it over stdin/stdout. The worker announces commands, the host forwards
//! player invocations, and handlers answer with actions such as chat
//! messages, teleports or console commands. Commands guarded by a
//! permission ask the host first and fail closed if no answer arrives in
//! time.

pub mod action;
pub mod bridge;
pub mod config;
pub mod context;
pub mod correlator;
pub mod error;
pub mod outbound;
pub mod protocol;
pub mod registry;

#[cfg(test)]
mod testing;

pub use action::{normalize_gamemode, PlayerAction};
pub use bridge::Bridge;
pub use config::{
    BridgeConfig, DispatchMode, DEFAULT_HANDLER_ERROR_MESSAGE, DEFAULT_MAX_PENDING_CHECKS,
    DEFAULT_NO_PERMISSION_MESSAGE, DEFAULT_PERMISSION_TIMEOUT,
};
pub use context::Context;
pub use correlator::{CorrelatorStats, PermissionCorrelator, PermissionKey};
pub use error::{BridgeError, HandlerError, HandlerResult, Result};
pub use outbound::Outbound;
pub use protocol::{CommandInvocation, PermissionQuery, PermissionReply, RegisterCommand};
pub use registry::{CommandRegistry, CommandSpec, Handler};

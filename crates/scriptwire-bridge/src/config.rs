use std::time::Duration;

use scriptwire_frame::FrameConfig;

/// Default wait for a `permission_result` reply.
pub const DEFAULT_PERMISSION_TIMEOUT: Duration = Duration::from_millis(200);

/// Default bound on outstanding permission checks.
pub const DEFAULT_MAX_PENDING_CHECKS: usize = 100;

/// Default notice sent when a permission check fails.
pub const DEFAULT_NO_PERMISSION_MESSAGE: &str = "§cNo permission.";

/// Default notice sent when a handler returns an error.
pub const DEFAULT_HANDLER_ERROR_MESSAGE: &str = "§cAn error occurred while running this command.";

/// How dispatched commands are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispatchMode {
    /// One dispatcher thread runs handlers in arrival order.
    #[default]
    Sequential,
    /// Every command runs on its own thread.
    Concurrent,
}

/// Bridge behavior configuration.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// How long a permission check waits before failing closed.
    pub permission_timeout: Duration,
    /// Checks beyond this many outstanding ones are denied immediately.
    pub max_pending_checks: usize,
    /// Handler execution model.
    pub dispatch: DispatchMode,
    /// Chat prefix applied to messages sent to players.
    pub message_prefix: Option<String>,
    /// Sent to a player who lacks a command's permission.
    pub no_permission_message: String,
    /// Sent to a player whose command handler failed.
    pub handler_error_message: String,
    /// Inbound line framing.
    pub frame: FrameConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            permission_timeout: DEFAULT_PERMISSION_TIMEOUT,
            max_pending_checks: DEFAULT_MAX_PENDING_CHECKS,
            dispatch: DispatchMode::default(),
            message_prefix: None,
            no_permission_message: DEFAULT_NO_PERMISSION_MESSAGE.to_string(),
            handler_error_message: DEFAULT_HANDLER_ERROR_MESSAGE.to_string(),
            frame: FrameConfig::default(),
        }
    }
}

impl BridgeConfig {
    /// Override the permission timeout.
    pub fn with_permission_timeout(mut self, timeout: Duration) -> Self {
        self.permission_timeout = timeout;
        self
    }

    /// Override the dispatch mode.
    pub fn with_dispatch(mut self, dispatch: DispatchMode) -> Self {
        self.dispatch = dispatch;
        self
    }

    /// Set the chat prefix for player messages.
    pub fn with_message_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.message_prefix = Some(prefix.into());
        self
    }

    /// Override the bound on outstanding permission checks.
    pub fn with_max_pending_checks(mut self, max: usize) -> Self {
        self.max_pending_checks = max;
        self
    }

    pub fn with_no_permission_message(mut self, message: impl Into<String>) -> Self {
        self.no_permission_message = message.into();
        self
    }

    pub fn with_handler_error_message(mut self, message: impl Into<String>) -> Self {
        self.handler_error_message = message.into();
        self
    }

    /// Override inbound line framing.
    pub fn with_frame(mut self, frame: FrameConfig) -> Self {
        self.frame = frame;
        self
    }
}

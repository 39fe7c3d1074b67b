use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::context::Context;
use crate::error::HandlerResult;

/// Command callback.
pub type Handler = Arc<dyn Fn(&Context<'_>) -> HandlerResult + Send + Sync>;

/// A command this worker answers, built once before listening.
#[derive(Clone)]
pub struct CommandSpec {
    name: String,
    permission: Option<String>,
    op_bypass: bool,
    description: Option<String>,
    usage: Vec<String>,
    handler: Handler,
}

impl CommandSpec {
    /// Create a command with no permission requirement.
    pub fn new<F>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&Context<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            permission: None,
            op_bypass: false,
            description: None,
            usage: Vec::new(),
            handler: Arc::new(handler),
        }
    }

    /// Require a permission before the handler runs.
    pub fn permission(mut self, permission: impl Into<String>) -> Self {
        self.permission = Some(permission.into());
        self
    }

    /// Let operators pass the permission check regardless of grants.
    pub fn op_bypass(mut self, op_bypass: bool) -> Self {
        self.op_bypass = op_bypass;
        self
    }

    /// One-line description shown in usage output.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Append a usage line.
    pub fn usage(mut self, line: impl Into<String>) -> Self {
        self.usage.push(line.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The permission to check, if any. An empty string means none.
    pub fn required_permission(&self) -> Option<&str> {
        self.permission.as_deref().filter(|perm| !perm.is_empty())
    }

    pub fn is_op_bypass(&self) -> bool {
        self.op_bypass
    }

    pub fn describe(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn usage_lines(&self) -> &[String] {
        &self.usage
    }

    /// Run the handler.
    pub fn invoke(&self, ctx: &Context<'_>) -> HandlerResult {
        (self.handler)(ctx)
    }
}

impl fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandSpec")
            .field("name", &self.name)
            .field("permission", &self.permission)
            .field("op_bypass", &self.op_bypass)
            .field("description", &self.description)
            .field("usage", &self.usage)
            .finish_non_exhaustive()
    }
}

/// Name-keyed command table.
///
/// Filled before the listen loop starts and read-only afterwards.
#[derive(Debug, Default)]
pub struct CommandRegistry {
    commands: HashMap<String, Arc<CommandSpec>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a command, replacing any previous one with the same name.
    pub fn insert(&mut self, spec: CommandSpec) -> Option<Arc<CommandSpec>> {
        self.commands.insert(spec.name.clone(), Arc::new(spec))
    }

    /// Look up a command by exact name.
    pub fn resolve(&self, name: &str) -> Option<Arc<CommandSpec>> {
        self.commands.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.commands.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

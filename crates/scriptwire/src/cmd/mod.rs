use clap::{Args, Subcommand};

use crate::exit::CliResult;

pub mod demo;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the built-in demo commands over stdin/stdout.
    Demo(DemoArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command) -> CliResult<i32> {
    match command {
        Command::Demo(args) => demo::run(args),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct DemoArgs {
    /// How long to wait for a permission reply (e.g. 200ms, 2s).
    #[arg(long, default_value = "200ms", env = "SCRIPTWIRE_PERMISSION_TIMEOUT")]
    pub permission_timeout: String,
    /// Chat prefix for messages sent to players.
    #[arg(long, env = "SCRIPTWIRE_PREFIX")]
    pub prefix: Option<String>,
    /// Run each command on its own thread.
    #[arg(long)]
    pub concurrent: bool,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

//! The engine: owns the streams, registry and correlator, and runs the
//! dispatch loop.

use std::io::{Read, Write};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use scriptwire_frame::{decode_envelope, FrameError, LineReader, MessageKind};

use crate::action::PlayerAction;
use crate::config::{BridgeConfig, DispatchMode};
use crate::context::Context;
use crate::correlator::{CorrelatorStats, PermissionCorrelator};
use crate::error::{BridgeError, Result};
use crate::outbound::Outbound;
use crate::protocol::{self, format_message, CommandInvocation, PermissionQuery, PermissionReply};
use crate::registry::{CommandRegistry, CommandSpec};

const DISPATCH_THREAD_NAME: &str = "scriptwire-dispatch";
const COMMAND_THREAD_NAME: &str = "scriptwire-cmd";

/// State shared by the reader, the dispatcher and every handler context.
pub(crate) struct Session {
    pub(crate) config: BridgeConfig,
    pub(crate) registry: CommandRegistry,
    pub(crate) outbound: Outbound,
    pub(crate) correlator: PermissionCorrelator,
}

impl Session {
    pub(crate) fn new(config: BridgeConfig, outbound: Outbound) -> Self {
        let correlator =
            PermissionCorrelator::new(config.permission_timeout, config.max_pending_checks);
        Self {
            config,
            registry: CommandRegistry::new(),
            outbound,
            correlator,
        }
    }

    /// Classify one inbound line.
    ///
    /// Permission replies are delivered here; command invocations are
    /// returned for dispatch. Everything else is skipped.
    fn route(&self, line: &[u8]) -> Option<CommandInvocation> {
        let envelope = match decode_envelope(line) {
            Ok(envelope) => envelope,
            Err(err) => {
                tracing::debug!(error = %err, "skipping malformed line");
                return None;
            }
        };

        match envelope.kind() {
            Some(MessageKind::Command) => match envelope.data_as::<CommandInvocation>() {
                Ok(invocation) => Some(invocation),
                Err(err) => {
                    tracing::debug!(error = %err, "skipping malformed command payload");
                    None
                }
            },
            Some(MessageKind::PermissionResult) => {
                match envelope.data_as::<PermissionReply>() {
                    Ok(reply) => {
                        self.correlator.deliver(&reply);
                    }
                    Err(err) => {
                        tracing::debug!(error = %err, "skipping malformed permission reply");
                    }
                }
                None
            }
            _ => {
                tracing::trace!(msg_type = %envelope.msg_type, "ignoring envelope");
                None
            }
        }
    }

    /// Resolve, gate and run one command.
    ///
    /// Never fails: denials and handler errors are reported to the player.
    fn dispatch(&self, invocation: &CommandInvocation) {
        let Some(spec) = self.registry.resolve(&invocation.command) else {
            tracing::debug!(command = %invocation.command, "ignoring unregistered command");
            return;
        };

        if let Some(permission) = spec.required_permission() {
            let query = PermissionQuery::new(&invocation.player, permission, spec.is_op_bypass());
            match self.correlator.check(&self.outbound, &query) {
                Ok(true) => {}
                Ok(false) => {
                    tracing::debug!(
                        command = %invocation.command,
                        player = %invocation.player,
                        permission,
                        "permission denied"
                    );
                    self.notify(&invocation.player, &self.config.no_permission_message);
                    return;
                }
                Err(err) => {
                    tracing::warn!(error = %err, "failed to send permission check");
                    return;
                }
            }
        }

        let ctx = Context::new(self, &spec, &invocation.player, &invocation.args);
        if let Err(err) = spec.invoke(&ctx) {
            tracing::warn!(
                command = %invocation.command,
                player = %invocation.player,
                error = %err,
                "command handler failed"
            );
            self.notify(&invocation.player, &self.config.handler_error_message);
        }
    }

    fn notify(&self, player: &str, text: &str) {
        let message = format_message(self.config.message_prefix.as_deref(), text);
        let sent = PlayerAction::SendMessage { message }
            .to_envelope(player)
            .and_then(|envelope| self.outbound.send(&envelope));
        if let Err(err) = sent {
            tracing::warn!(player, error = %err, "failed to notify player");
        }
    }
}

/// A worker-side protocol engine.
///
/// Register commands, then hand the inbound stream to [`Bridge::listen`].
///
/// ```no_run
/// use scriptwire_bridge::{Bridge, CommandSpec};
///
/// let mut bridge = Bridge::stdio();
/// bridge.register(
///     CommandSpec::new("heal", |ctx| {
///         ctx.heal()?;
///         ctx.reply("You have been healed.")?;
///         Ok(())
///     })
///     .permission("scripts.heal")
///     .op_bypass(true),
/// )?;
/// bridge.listen(std::io::stdin())?;
/// # Ok::<(), scriptwire_bridge::BridgeError>(())
/// ```
pub struct Bridge {
    session: Session,
}

impl Bridge {
    /// Create a bridge writing to `output` with default configuration.
    pub fn new<W: Write + Send + 'static>(output: W) -> Self {
        Self::with_config(output, BridgeConfig::default())
    }

    /// Create a bridge writing to `output` with explicit configuration.
    pub fn with_config<W: Write + Send + 'static>(output: W, config: BridgeConfig) -> Self {
        Self {
            session: Session::new(config, Outbound::new(output)),
        }
    }

    /// Create a bridge writing to stdout.
    pub fn stdio() -> Self {
        Self::new(std::io::stdout())
    }

    /// Store a command and announce it to the host.
    ///
    /// A later registration under the same name replaces the earlier one.
    pub fn register(&mut self, spec: CommandSpec) -> Result<()> {
        let name = spec.name().to_string();
        if name.trim().is_empty() || name.contains(char::is_whitespace) {
            return Err(BridgeError::InvalidCommand(format!(
                "command name must be a single non-empty word: {name:?}"
            )));
        }

        if self.session.registry.insert(spec).is_some() {
            tracing::debug!(command = %name, "replacing registered command");
        }
        self.session
            .outbound
            .send(&protocol::register_command(&name)?)?;
        tracing::debug!(command = %name, "registered command");
        Ok(())
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.session.registry
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.session.config
    }

    /// Handle for writing additional envelopes to the host.
    pub fn outbound(&self) -> &Outbound {
        &self.session.outbound
    }

    pub fn correlator_stats(&self) -> CorrelatorStats {
        self.session.correlator.stats()
    }

    /// Serve the host until `input` reaches end-of-stream.
    ///
    /// The calling thread reads lines and delivers permission replies;
    /// commands are queued in arrival order to a dispatcher thread, so a
    /// handler waiting on a permission check never blocks the reader.
    /// Returns `Ok(())` once the stream closes and queued commands finish.
    pub fn listen<R: Read>(self, input: R) -> Result<()> {
        let session = Arc::new(self.session);
        let mut reader = LineReader::with_config(input, session.config.frame);

        let (tx, rx) = mpsc::channel();
        let dispatcher = {
            let session = Arc::clone(&session);
            thread::Builder::new()
                .name(DISPATCH_THREAD_NAME.to_string())
                .spawn(move || run_dispatcher(session, rx))?
        };

        tracing::info!(
            commands = session.registry.len(),
            dispatch = ?session.config.dispatch,
            "listening for host messages"
        );

        let outcome = loop {
            let line = match reader.read_line() {
                Ok(line) => line,
                Err(FrameError::ConnectionClosed) => break Ok(()),
                Err(err) if err.is_decode_error() => {
                    tracing::debug!(error = %err, "skipping unreadable line");
                    continue;
                }
                Err(err) => break Err(BridgeError::from(err)),
            };

            if let Some(invocation) = session.route(&line) {
                if tx.send(invocation).is_err() {
                    break Err(BridgeError::Disconnected(
                        "dispatcher thread exited".to_string(),
                    ));
                }
            }
        };

        drop(tx);
        if dispatcher.join().is_err() {
            tracing::error!("dispatcher thread panicked");
            if outcome.is_ok() {
                return Err(BridgeError::Disconnected(
                    "dispatcher thread panicked".to_string(),
                ));
            }
        }

        tracing::info!(stats = ?session.correlator.stats(), "host stream closed");
        outcome
    }
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("config", &self.session.config)
            .field("commands", &self.session.registry.names())
            .finish_non_exhaustive()
    }
}

fn run_dispatcher(session: Arc<Session>, rx: Receiver<CommandInvocation>) {
    let mut workers: Vec<JoinHandle<()>> = Vec::new();

    for invocation in rx {
        match session.config.dispatch {
            DispatchMode::Sequential => session.dispatch(&invocation),
            DispatchMode::Concurrent => {
                if !session.registry.contains(&invocation.command) {
                    tracing::debug!(
                        command = %invocation.command,
                        "ignoring unregistered command"
                    );
                    continue;
                }
                workers.retain(|worker| !worker.is_finished());
                let session = Arc::clone(&session);
                let spawned = thread::Builder::new()
                    .name(COMMAND_THREAD_NAME.to_string())
                    .spawn(move || session.dispatch(&invocation));
                match spawned {
                    Ok(worker) => workers.push(worker),
                    Err(err) => tracing::error!(error = %err, "failed to spawn command thread"),
                }
            }
        }
    }

    for worker in workers {
        if worker.join().is_err() {
            tracing::error!("command thread panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::testing::SharedBuffer;

    fn command_line(command: &str, player: &str, args: &[&str]) -> String {
        json!({
            "type": "command",
            "data": {"command": command, "player": player, "args": args}
        })
        .to_string()
    }

    #[test]
    fn register_announces_command() {
        let sink = SharedBuffer::default();
        let mut bridge = Bridge::new(sink.clone());

        bridge.register(CommandSpec::new("heal", |_| Ok(()))).unwrap();
        bridge.register(CommandSpec::new("feed", |_| Ok(()))).unwrap();

        assert_eq!(
            sink.lines(),
            vec![
                r#"{"type":"register_command","data":{"command":"heal"}}"#,
                r#"{"type":"register_command","data":{"command":"feed"}}"#,
            ]
        );
        assert_eq!(bridge.registry().names(), vec!["feed", "heal"]);
    }

    #[test]
    fn register_rejects_bad_names() {
        let mut bridge = Bridge::new(SharedBuffer::default());
        assert!(matches!(
            bridge.register(CommandSpec::new("", |_| Ok(()))),
            Err(BridgeError::InvalidCommand(_))
        ));
        assert!(matches!(
            bridge.register(CommandSpec::new("two words", |_| Ok(()))),
            Err(BridgeError::InvalidCommand(_))
        ));
        assert!(bridge.registry().is_empty());
    }

    #[test]
    fn dispatches_to_matching_handler_only() {
        let sink = SharedBuffer::default();
        let mut bridge = Bridge::new(sink.clone());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let other_calls = Arc::new(AtomicUsize::new(0));

        let log = Arc::clone(&seen);
        bridge
            .register(CommandSpec::new("echo", move |ctx| {
                log.lock()
                    .unwrap()
                    .push((ctx.player().to_string(), ctx.args().to_vec()));
                Ok(())
            }))
            .unwrap();
        let counter = Arc::clone(&other_calls);
        bridge
            .register(CommandSpec::new("other", move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }))
            .unwrap();

        let input = format!("{}\n", command_line("echo", "Alice", &["a", "b"]));
        bridge.listen(Cursor::new(input)).unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![("Alice".to_string(), vec!["a".to_string(), "b".to_string()])]
        );
        assert_eq!(other_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unknown_commands_and_garbage_are_silent() {
        let sink = SharedBuffer::default();
        let mut bridge = Bridge::new(sink.clone());
        bridge.register(CommandSpec::new("heal", |_| Ok(()))).unwrap();

        let input = [
            command_line("fly", "Alice", &[]),
            "not json".to_string(),
            r#"{"data":{}}"#.to_string(),
            r#"{"type":"command","data":{"player":"Alice"}}"#.to_string(),
            r#"{"type":"shutdown"}"#.to_string(),
            r#"{"type":"permission_result","data":{"player":"Alice"}}"#.to_string(),
        ]
        .join("\n");
        bridge.listen(Cursor::new(input)).unwrap();

        assert_eq!(sink.lines().len(), 1, "only the registration line");
    }

    #[test]
    fn handler_error_is_reported_to_player() {
        let sink = SharedBuffer::default();
        let mut bridge = Bridge::new(sink.clone());
        bridge
            .register(CommandSpec::new("boom", |_| Err("exploded".into())))
            .unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        bridge
            .register(CommandSpec::new("after", move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }))
            .unwrap();

        let input = format!(
            "{}\n{}\n",
            command_line("boom", "Bob", &[]),
            command_line("after", "Bob", &[])
        );
        bridge.listen(Cursor::new(input)).unwrap();

        let sent = sink.envelopes();
        assert_eq!(sent.len(), 3);
        assert_eq!(sent[2].get_str("action"), Some("send_message"));
        assert_eq!(sent[2].get_str("player"), Some("Bob"));
        assert_eq!(
            sent[2].data,
            Some(json!({"message": crate::config::DEFAULT_HANDLER_ERROR_MESSAGE}))
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn missing_permission_reply_denies() {
        let sink = SharedBuffer::default();
        let config = BridgeConfig::default().with_permission_timeout(Duration::from_millis(30));
        let mut bridge = Bridge::with_config(sink.clone(), config);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        bridge
            .register(
                CommandSpec::new("heal", move |ctx| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    ctx.heal()?;
                    Ok(())
                })
                .permission("cmd.heal")
                .op_bypass(true),
            )
            .unwrap();

        let input = format!("{}\n", command_line("heal", "Alice", &[]));
        bridge.listen(Cursor::new(input)).unwrap();

        let sent = sink.envelopes();
        assert_eq!(sent.len(), 3);
        assert_eq!(sent[1].msg_type, "check_permission");
        assert_eq!(sent[2].get_str("action"), Some("send_message"));
        assert_eq!(sent[2].get_str("player"), Some("Alice"));
        assert_eq!(
            sent[2].data,
            Some(json!({"message": crate::config::DEFAULT_NO_PERMISSION_MESSAGE}))
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn concurrent_mode_runs_every_command() {
        let sink = SharedBuffer::default();
        let config = BridgeConfig::default().with_dispatch(DispatchMode::Concurrent);
        let mut bridge = Bridge::with_config(sink.clone(), config);
        bridge
            .register(CommandSpec::new("heal", |ctx| {
                ctx.heal()?;
                Ok(())
            }))
            .unwrap();

        let input: String = (0..10)
            .map(|n| format!("{}\n", command_line("heal", &format!("player{n}"), &[])))
            .collect();
        bridge.listen(Cursor::new(input)).unwrap();

        let heals = sink
            .envelopes()
            .iter()
            .filter(|env| env.get_str("action") == Some("heal"))
            .count();
        assert_eq!(heals, 10);
    }

    #[test]
    fn concurrent_mode_skips_unregistered_names() {
        let sink = SharedBuffer::default();
        let config = BridgeConfig::default().with_dispatch(DispatchMode::Concurrent);
        let mut bridge = Bridge::with_config(sink.clone(), config);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        bridge
            .register(CommandSpec::new("heal", move |ctx| {
                counter.fetch_add(1, Ordering::SeqCst);
                ctx.heal()?;
                Ok(())
            }))
            .unwrap();

        let input = format!(
            "{}\n{}\n{}\n",
            command_line("x\u{0}y", "Alice", &[]),
            command_line("vanish", "Alice", &[]),
            command_line("heal", "Alice", &[]),
        );
        bridge.listen(Cursor::new(input)).unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let actions: Vec<_> = sink
            .envelopes()
            .into_iter()
            .filter(|env| env.kind() == Some(MessageKind::PlayerAction))
            .collect();
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].get_str("action"), Some("heal"));
    }

    #[cfg(unix)]
    mod piped {
        use std::os::unix::net::UnixStream;

        use scriptwire_frame::{Envelope, LineReader, LineWriter};

        use super::*;

        struct Host {
            to_worker: LineWriter<UnixStream>,
            from_worker: LineReader<UnixStream>,
            worker: JoinHandle<Result<()>>,
        }

        fn start(bridge_setup: impl FnOnce(&mut Bridge), timeout: Duration) -> Host {
            let (worker_out, host_in) = UnixStream::pair().unwrap();
            let (host_out, worker_in) = UnixStream::pair().unwrap();

            let config = BridgeConfig::default().with_permission_timeout(timeout);
            let mut bridge = Bridge::with_config(worker_out, config);
            bridge_setup(&mut bridge);
            let worker = thread::spawn(move || bridge.listen(worker_in));

            Host {
                to_worker: LineWriter::new(host_out),
                from_worker: LineReader::new(host_in),
                worker,
            }
        }

        fn heal_bridge(bridge: &mut Bridge) {
            bridge
                .register(
                    CommandSpec::new("heal", |ctx| {
                        ctx.heal()?;
                        Ok(())
                    })
                    .permission("cmd.heal")
                    .op_bypass(true),
                )
                .unwrap();
        }

        fn send_line(host: &mut Host, line: &str) {
            host.to_worker
                .send(&scriptwire_frame::decode_envelope(line.as_bytes()).unwrap())
                .unwrap();
        }

        fn next(host: &mut Host) -> Envelope {
            host.from_worker.read_envelope().unwrap()
        }

        #[test]
        fn granted_permission_runs_handler() {
            let mut host = start(heal_bridge, Duration::from_secs(5));
            assert_eq!(next(&mut host).msg_type, "register_command");

            send_line(&mut host, &command_line("heal", "Alice", &[]));
            let check = next(&mut host);
            assert_eq!(check.msg_type, "check_permission");

            send_line(
                &mut host,
                r#"{"type":"permission_result","data":{"player":"Alice","permission":"cmd.heal","op_bypass":true,"has_permission":true}}"#,
            );
            let action = next(&mut host);
            assert_eq!(action.get_str("action"), Some("heal"));
            assert_eq!(action.get_str("player"), Some("Alice"));

            drop(host.to_worker);
            host.worker.join().unwrap().unwrap();
        }

        #[test]
        fn denied_permission_notifies_player() {
            let mut host = start(heal_bridge, Duration::from_secs(5));
            next(&mut host);

            send_line(&mut host, &command_line("heal", "Alice", &[]));
            next(&mut host);
            send_line(
                &mut host,
                r#"{"type":"permission_result","data":{"player":"Alice","permission":"cmd.heal","op_bypass":true,"has_permission":false}}"#,
            );

            let notice = next(&mut host);
            assert_eq!(notice.get_str("action"), Some("send_message"));
            assert_eq!(
                notice.data,
                Some(json!({"message": crate::config::DEFAULT_NO_PERMISSION_MESSAGE}))
            );

            drop(host.to_worker);
            host.worker.join().unwrap().unwrap();
        }

        #[test]
        fn handler_can_check_extra_permission() {
            let mut host = start(
                |bridge| {
                    bridge
                        .register(CommandSpec::new("fly", |ctx| {
                            if ctx.has_permission("cmd.fly.others")? {
                                ctx.act_on(&ctx.string(0, "nobody"), &PlayerAction::SetFly {
                                    enabled: true,
                                })?;
                            } else {
                                ctx.set_fly(true)?;
                            }
                            Ok(())
                        }))
                        .unwrap();
                },
                Duration::from_secs(5),
            );
            next(&mut host);

            send_line(&mut host, &command_line("fly", "Alice", &["Bob"]));
            let check = next(&mut host);
            assert_eq!(
                check.data,
                Some(json!({"player": "Alice", "permission": "cmd.fly.others", "op_bypass": false}))
            );
            send_line(
                &mut host,
                r#"{"type":"permission_result","data":{"player":"Alice","permission":"cmd.fly.others","op_bypass":false,"has_permission":true}}"#,
            );

            let action = next(&mut host);
            assert_eq!(action.get_str("action"), Some("set_fly"));
            assert_eq!(action.get_str("player"), Some("Bob"));

            drop(host.to_worker);
            host.worker.join().unwrap().unwrap();
        }
    }
}

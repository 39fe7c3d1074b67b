use std::time::Duration;

use scriptwire_bridge::{Bridge, BridgeConfig, CommandSpec, Context, DispatchMode, HandlerResult};

use crate::cmd::DemoArgs;
use crate::exit::{bridge_error, CliError, CliResult, SUCCESS, USAGE};

const MAX_GIVE_AMOUNT: i64 = 64 * 36;

pub fn run(args: DemoArgs) -> CliResult<i32> {
    let mut config = BridgeConfig::default()
        .with_permission_timeout(parse_duration(&args.permission_timeout)?);
    if let Some(prefix) = args.prefix {
        config = config.with_message_prefix(prefix);
    }
    if args.concurrent {
        config = config.with_dispatch(DispatchMode::Concurrent);
    }

    let mut bridge = Bridge::with_config(std::io::stdout(), config);
    for spec in demo_commands() {
        bridge
            .register(spec)
            .map_err(|err| bridge_error("register failed", err))?;
    }

    bridge
        .listen(std::io::stdin())
        .map_err(|err| bridge_error("listen failed", err))?;

    Ok(SUCCESS)
}

fn demo_commands() -> Vec<CommandSpec> {
    vec![
        CommandSpec::new("heal", heal)
            .permission("scriptwire.heal")
            .op_bypass(true)
            .description("Restore your health."),
        CommandSpec::new("feed", feed).description("Fill your hunger bar."),
        CommandSpec::new("fly", |ctx| {
            let enabled = ctx.bool(0, true);
            ctx.set_fly(enabled)?;
            ctx.reply(if enabled { "Flight enabled." } else { "Flight disabled." })?;
            Ok(())
        })
        .usage("/fly [on|off]"),
        CommandSpec::new("god", |ctx| {
            let enabled = ctx.bool(0, true);
            ctx.set_god_mode(enabled)?;
            ctx.reply(if enabled { "God mode enabled." } else { "God mode disabled." })?;
            Ok(())
        })
        .usage("/god [on|off]"),
        CommandSpec::new("gm", gamemode)
            .description("Change your gamemode.")
            .usage("/gm <survival|creative|adventure|spectator>"),
        CommandSpec::new("tp", teleport).usage("/tp <x> <y> <z> [world]"),
        CommandSpec::new("tpto", |ctx| match ctx.arg(0) {
            Some(target) => Ok(ctx.teleport_to_player(target)?),
            None => Ok(ctx.send_usage()?),
        })
        .usage("/tpto <player>"),
        CommandSpec::new("give", give).usage("/give <item> [amount]"),
        CommandSpec::new("say", |ctx| {
            if ctx.is_empty() {
                return Ok(ctx.send_usage()?);
            }
            ctx.broadcast(&format!("[{}] {}", ctx.player(), ctx.joined(0)))?;
            Ok(())
        })
        .permission("scriptwire.say")
        .usage("/say <message...>"),
        CommandSpec::new("run", |ctx| {
            if ctx.is_empty() {
                return Ok(ctx.send_usage()?);
            }
            ctx.execute(&ctx.joined(0))?;
            Ok(())
        })
        .permission("scriptwire.run")
        .usage("/run <command...>"),
    ]
}

fn heal(ctx: &Context<'_>) -> HandlerResult {
    ctx.heal()?;
    ctx.reply("You have been healed.")?;
    Ok(())
}

fn feed(ctx: &Context<'_>) -> HandlerResult {
    ctx.feed()?;
    ctx.reply("You have been fed.")?;
    Ok(())
}

fn gamemode(ctx: &Context<'_>) -> HandlerResult {
    let Some(mode) = ctx.arg(0) else {
        return Ok(ctx.send_usage()?);
    };
    ctx.set_gamemode(mode)?;
    ctx.reply(&format!("Gamemode set to {}.", scriptwire_bridge::normalize_gamemode(mode)))?;
    Ok(())
}

fn teleport(ctx: &Context<'_>) -> HandlerResult {
    if ctx.len() < 3 {
        return Ok(ctx.send_usage()?);
    }
    let coords = [ctx.float(0, f64::NAN), ctx.float(1, f64::NAN), ctx.float(2, f64::NAN)];
    if coords.iter().any(|value| !value.is_finite()) {
        return Err("coordinates must be numbers".into());
    }
    ctx.teleport(coords[0], coords[1], coords[2], ctx.arg(3))?;
    Ok(())
}

fn give(ctx: &Context<'_>) -> HandlerResult {
    let Some(item) = ctx.arg(0) else {
        return Ok(ctx.send_usage()?);
    };
    let amount = ctx.int(1, 1).clamp(1, MAX_GIVE_AMOUNT);
    ctx.give_item(item, u32::try_from(amount)?)?;
    Ok(())
}

fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, true)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}

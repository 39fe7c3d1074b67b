//! Minimal worker with one open command and one gated command.
//!
//! Run with:
//!   cargo run -p scriptwire --example greeter
//!
//! Then type host messages on stdin, for example:
//!   {"type":"command","data":{"command":"hello","player":"Alice","args":["Bob"]}}

use scriptwire::bridge::{Bridge, CommandSpec};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut bridge = Bridge::stdio();

    bridge.register(
        CommandSpec::new("hello", |ctx| {
            let target = ctx.string(0, ctx.player());
            ctx.message(&target, &format!("{} says hello!", ctx.player()))?;
            Ok(())
        })
        .usage("/hello [player]"),
    )?;

    bridge.register(
        CommandSpec::new("shout", |ctx| {
            if ctx.is_empty() {
                return Ok(ctx.send_usage()?);
            }
            ctx.broadcast(&ctx.joined(0))?;
            Ok(())
        })
        .permission("greeter.shout")
        .usage("/shout <message...>"),
    )?;

    bridge.listen(std::io::stdin())?;
    Ok(())
}

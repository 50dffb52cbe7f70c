//! Command-line front end for the **mss** client.
//!
//! `mss [--socket PATH] <command> [args...]`
//!
//! Every command prints its result as JSON on stdout.  On failure the error
//! is printed to stderr and the process exits with the absolute value of
//! the error code (see [`mss::ErrorKind::code`]).

use log::{error, info};
use mss::config::Config;
use mss::macos::system::MacSystem;
use mss::{Context, Error, WindowLayer};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::str::FromStr;

const USAGE: &str = "\
usage: mss [--socket PATH] <command>

commands:
  handshake | check | install | uninstall | load
  space create|destroy|focus <sid>
  space move <src> <dst> <prev> [--focus]
  window move <wid> <x> <y>
  window opacity <wid> <value>
  window fade <wid> <value> <secs>
  window layer <wid> below|normal|above
  window sticky|shadow <wid> on|off
  window focus|minimize|unminimize <wid>
  window frame <wid>
  window set-frame <wid> <x> <y> <w> <h>
  window resize <wid> <w> <h>
  window to-space <wid> <sid>
  display count
  display list [max]";

/// Exit status for malformed command lines (`EX_USAGE`).
const EXIT_USAGE: i32 = 64;

/// Resolve the config directory (`$XDG_CONFIG_HOME/mss`).
fn config_dir() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME").unwrap_or_else(|_| {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        format!("{}/.config", home)
    });
    PathBuf::from(base).join("mss")
}

/// Try to load the config from `$XDG_CONFIG_HOME/mss/config.json`,
/// falling back to compiled-in defaults.
fn load_config() -> Config {
    let path = config_dir().join("config.json");
    match Config::load(&path) {
        Ok(cfg) => {
            info!("loaded config from {}", path.display());
            cfg
        }
        Err(e) => {
            info!("no config file ({}), using defaults", e);
            Config::default()
        }
    }
}

enum CliError {
    Usage(String),
    Mss(Error),
}

impl From<Error> for CliError {
    fn from(e: Error) -> Self {
        CliError::Mss(e)
    }
}

//  Main

fn main() {
    env_logger::init();

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let mut config = load_config();
    if let Some(i) = args.iter().position(|a| a == "--socket") {
        if i + 1 >= args.len() {
            eprintln!("--socket needs a path\n\n{}", USAGE);
            std::process::exit(EXIT_USAGE);
        }
        let path = args.remove(i + 1);
        args.remove(i);
        config.socket_path = Some(PathBuf::from(path));
    }
    let args: Vec<&str> = args.iter().map(String::as_str).collect();

    let ctx = match Context::open(&config) {
        Ok(ctx) => ctx,
        Err(e) => fail(e),
    };
    let system = MacSystem::new(&config.install);

    match run(&ctx, &system, &args) {
        Ok(value) => println!("{}", value),
        Err(CliError::Usage(msg)) => {
            eprintln!("{}\n\n{}", msg, USAGE);
            std::process::exit(EXIT_USAGE);
        }
        Err(CliError::Mss(e)) => fail(e),
    }
    ctx.close();
}

fn fail(e: Error) -> ! {
    error!("{}", e);
    eprintln!("mss: {}", e);
    std::process::exit(e.code().abs());
}

//  Dispatch

fn run(ctx: &Context, system: &MacSystem, args: &[&str]) -> Result<Value, CliError> {
    let ok = json!({ "ok": true });
    match args {
        ["handshake"] => Ok(json!(ctx.handshake()?)),
        ["check"] => {
            ctx.check_requirements(system)?;
            Ok(ok)
        }
        ["install"] => {
            ctx.install(system)?;
            Ok(ok)
        }
        ["uninstall"] => {
            ctx.uninstall(system)?;
            Ok(ok)
        }
        ["load"] => {
            ctx.load(system)?;
            Ok(json!({ "capabilities": ctx.capabilities(), "version": ctx.version() }))
        }
        ["space", rest @ ..] => {
            ctx.handshake()?;
            space(ctx, rest)?;
            Ok(ok)
        }
        ["window", rest @ ..] => {
            ctx.handshake()?;
            window(ctx, rest)
        }
        ["display", rest @ ..] => {
            ctx.handshake()?;
            display(ctx, rest)
        }
        [] => Err(CliError::Usage("missing command".into())),
        [other, ..] => Err(CliError::Usage(format!("unknown command: {}", other))),
    }
}

fn space(ctx: &Context, args: &[&str]) -> Result<(), CliError> {
    match args {
        ["create", sid] => ctx.space_create(parse(sid, "sid")?)?,
        ["destroy", sid] => ctx.space_destroy(parse(sid, "sid")?)?,
        ["focus", sid] => ctx.space_focus(parse(sid, "sid")?)?,
        ["move", src, dst, prev, flags @ ..] => {
            let focus = match flags {
                [] => false,
                ["--focus"] => true,
                _ => return Err(CliError::Usage(format!("unexpected: {}", flags.join(" ")))),
            };
            ctx.space_move(
                parse(src, "src")?,
                parse(dst, "dst")?,
                parse(prev, "prev")?,
                focus,
            )?
        }
        _ => return Err(CliError::Usage(format!("bad space command: {}", args.join(" ")))),
    }
    Ok(())
}

fn window(ctx: &Context, args: &[&str]) -> Result<Value, CliError> {
    let ok = json!({ "ok": true });
    match args {
        ["move", wid, x, y] => ctx.window_move(parse(wid, "wid")?, parse(x, "x")?, parse(y, "y")?)?,
        ["opacity", wid, value] => {
            ctx.window_set_opacity(parse(wid, "wid")?, parse(value, "opacity")?)?
        }
        ["fade", wid, value, secs] => ctx.window_fade_opacity(
            parse(wid, "wid")?,
            parse(value, "opacity")?,
            parse(secs, "duration")?,
        )?,
        ["layer", wid, layer] => ctx.window_set_layer(parse(wid, "wid")?, parse_layer(layer)?)?,
        ["sticky", wid, flag] => ctx.window_set_sticky(parse(wid, "wid")?, parse_flag(flag)?)?,
        ["shadow", wid, flag] => ctx.window_set_shadow(parse(wid, "wid")?, parse_flag(flag)?)?,
        ["focus", wid] => ctx.window_focus(parse(wid, "wid")?)?,
        ["minimize", wid] => ctx.window_minimize(parse(wid, "wid")?)?,
        ["unminimize", wid] => ctx.window_unminimize(parse(wid, "wid")?)?,
        ["frame", wid] => {
            let wid = parse(wid, "wid")?;
            return Ok(json!({
                "frame": ctx.window_get_frame(wid)?,
                "opacity": ctx.window_get_opacity(wid)?,
                "layer": ctx.window_get_layer(wid)?,
                "sticky": ctx.window_is_sticky(wid)?,
                "minimized": ctx.window_is_minimized(wid)?,
            }));
        }
        ["set-frame", wid, x, y, w, h] => ctx.window_set_frame(
            parse(wid, "wid")?,
            parse(x, "x")?,
            parse(y, "y")?,
            parse(w, "width")?,
            parse(h, "height")?,
        )?,
        ["resize", wid, w, h] => {
            ctx.window_resize(parse(wid, "wid")?, parse(w, "width")?, parse(h, "height")?)?
        }
        ["to-space", wid, sid] => ctx.window_move_to_space(parse(wid, "wid")?, parse(sid, "sid")?)?,
        _ => return Err(CliError::Usage(format!("bad window command: {}", args.join(" ")))),
    }
    Ok(ok)
}

fn display(ctx: &Context, args: &[&str]) -> Result<Value, CliError> {
    match args {
        ["count"] => Ok(json!({ "count": ctx.display_get_count()? })),
        ["list"] => Ok(json!(ctx.display_get_list(mss::command::MAX_LIST_LEN)?)),
        ["list", max] => Ok(json!(ctx.display_get_list(parse(max, "max")?)?)),
        _ => Err(CliError::Usage(format!("bad display command: {}", args.join(" ")))),
    }
}

//  Argument parsing

fn parse<T: FromStr>(value: &str, name: &str) -> Result<T, CliError> {
    value
        .parse()
        .map_err(|_| CliError::Usage(format!("invalid {}: {}", name, value)))
}

fn parse_flag(value: &str) -> Result<bool, CliError> {
    match value {
        "on" | "true" | "1" => Ok(true),
        "off" | "false" | "0" => Ok(false),
        _ => Err(CliError::Usage(format!("expected on|off, got {}", value))),
    }
}

fn parse_layer(value: &str) -> Result<WindowLayer, CliError> {
    match value {
        "below" => Ok(WindowLayer::Below),
        "normal" => Ok(WindowLayer::Normal),
        "above" => Ok(WindowLayer::Above),
        _ => Err(CliError::Usage(format!(
            "expected below|normal|above, got {}",
            value
        ))),
    }
}

//! Command-line arguments.

use std::path::PathBuf;

use soundnav_types::OscArg;

pub const USAGE: &str = "\
usage: soundnav [options] <command>

commands:
  send <address> <value>     send one OSC message
  demo [--steps N]           stream a moving Tool transform
  pd [--gui] [--open PATCH]  run the Pure Data server until Enter is pressed

options:
  --host HOST       server host name
  --port PORT       server port
  --root ROOT       OSC address root
  --log-messages    log every sent message
  -v, --verbose     debug logging";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Send { address: String, value: OscArg },
    Demo { steps: usize },
    PureData { gui: bool, patch: Option<PathBuf> },
    Help,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Args {
    pub verbose: bool,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub root: Option<String>,
    pub log_messages: bool,
    pub command: Command,
}

const DEFAULT_DEMO_STEPS: usize = 200;

/// Parse arguments, excluding the program name.
pub fn parse(args: impl IntoIterator<Item = String>) -> Result<Args, String> {
    let mut parsed = Args {
        verbose: false,
        host: None,
        port: None,
        root: None,
        log_messages: false,
        command: Command::Help,
    };
    let mut positional = Vec::new();
    let mut steps = DEFAULT_DEMO_STEPS;
    let mut gui = false;
    let mut patch = None;

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-v" | "--verbose" => parsed.verbose = true,
            "--log-messages" => parsed.log_messages = true,
            "--gui" => gui = true,
            "-h" | "--help" => return Ok(parsed),
            "--host" => parsed.host = Some(value_of(&mut iter, "--host")?),
            "--root" => parsed.root = Some(value_of(&mut iter, "--root")?),
            "--open" => patch = Some(PathBuf::from(value_of(&mut iter, "--open")?)),
            "--port" => {
                let value = value_of(&mut iter, "--port")?;
                parsed.port = Some(
                    value
                        .parse()
                        .map_err(|_| format!("invalid port {:?}", value))?,
                );
            }
            "--steps" => {
                let value = value_of(&mut iter, "--steps")?;
                steps = value
                    .parse()
                    .map_err(|_| format!("invalid step count {:?}", value))?;
            }
            flag if flag.starts_with("--") => return Err(format!("unknown option {}", flag)),
            _ => positional.push(arg),
        }
    }

    parsed.command = match positional.first().map(String::as_str) {
        None => Command::Help,
        Some("send") => match &positional[1..] {
            [address, value] => Command::Send {
                address: address.clone(),
                value: parse_value(value),
            },
            _ => return Err("send expects <address> <value>".to_string()),
        },
        Some("demo") => Command::Demo { steps },
        Some("pd") => Command::PureData { gui, patch },
        Some(other) => return Err(format!("unknown command {}", other)),
    };
    Ok(parsed)
}

fn value_of(iter: &mut impl Iterator<Item = String>, flag: &str) -> Result<String, String> {
    iter.next().ok_or_else(|| format!("{} expects a value", flag))
}

/// Int, then float, then `true`/`false`; anything else is sent as a string.
pub fn parse_value(text: &str) -> OscArg {
    if let Ok(i) = text.parse::<i32>() {
        return OscArg::Int(i);
    }
    if let Ok(f) = text.parse::<f32>() {
        return OscArg::Float(f);
    }
    match text {
        "true" => OscArg::Bool(true),
        "false" => OscArg::Bool(false),
        _ => OscArg::Str(text.to_string()),
    }
}

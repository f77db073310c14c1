//! Encode session CLI - drive an encoder session one command at a time.

mod commands;
mod driver;

use clap::Parser;
use commands::{parse_line, parse_script, Command};
use console::style;
use driver::{Driver, Flow};
use encode_session::{Preset, SessionConfig, SessionError};
use std::io::{self, BufRead};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

/// Output mode for the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Normal colored text output.
    Normal,
    /// One JSON object per event.
    Json,
    /// Only packet descriptions.
    Quiet,
    /// Text output with queue and quantizer details.
    Verbose,
}

/// Command-line arguments for the encoder session driver.
#[derive(Parser, Debug)]
#[command(name = "encode-session")]
#[command(version)]
#[command(about = "Drive a bounded-lookahead encoder session by hand")]
#[command(long_about = "Submits frames to an encoder session, flushes it and \n\
    receives packets, printing what the session reports at each step.\n\n\
    Commands: send [n], flush, receive, drain, status, packets, config, help, quit.\n\
    Without --script, commands are read from stdin, one per line.\n\n\
    EXAMPLES:\n    \
    encode-session --script \"send send receive flush drain\"\n    \
    encode-session --lookahead 0 --script \"send receive flush receive\"\n    \
    encode-session --json --script \"send 4 flush drain status\"\n    \
    echo \"send 3\" | encode-session --verbose")]
struct Args {
    /// Frame width in pixels
    #[arg(long, default_value = "64")]
    width: u32,

    /// Frame height in pixels
    #[arg(long, default_value = "96")]
    height: u32,

    /// Lookahead depth in frames
    #[arg(short, long, default_value = "1")]
    lookahead: usize,

    /// Input queue capacity (default: lookahead + 1)
    #[arg(long)]
    capacity: Option<usize>,

    /// Base quantizer index (0-255)
    #[arg(long)]
    quantizer: Option<u8>,

    /// Maximum distance between keyframes
    #[arg(long)]
    keyframe_interval: Option<u32>,

    /// Encoder speed (0-10, lower is slower and better)
    #[arg(long)]
    speed: Option<u8>,

    /// Commands to run, e.g. "send 3 flush drain"
    #[arg(short, long)]
    script: Option<String>,

    /// Report failed commands and continue instead of exiting
    #[arg(short = 'k', long)]
    keep_going: bool,

    /// Verbose output (debug logging and queue details)
    #[arg(short, long, conflicts_with = "quiet", conflicts_with = "json")]
    verbose: bool,

    /// Quiet mode (only print packet descriptions)
    #[arg(short, long, conflicts_with = "verbose", conflicts_with = "json")]
    quiet: bool,

    /// JSON output mode for programmatic parsing
    #[arg(long, conflicts_with = "verbose", conflicts_with = "quiet")]
    json: bool,
}

impl Args {
    /// Determine the output mode based on flags.
    fn output_mode(&self) -> OutputMode {
        if self.json {
            OutputMode::Json
        } else if self.quiet {
            OutputMode::Quiet
        } else if self.verbose {
            OutputMode::Verbose
        } else {
            OutputMode::Normal
        }
    }

    /// Build the session configuration from the flags.
    fn session_config(&self) -> SessionConfig {
        let mut config = SessionConfig::new(self.width, self.height)
            .with_lookahead(self.lookahead)
            .with_queue_capacity(self.capacity.unwrap_or(0));

        if let Some(quantizer) = self.quantizer {
            config = config.with_quantizer(quantizer);
        }
        if let Some(max) = self.keyframe_interval {
            let min = config.min_keyframe_interval.min(max);
            config = config.with_keyframe_interval(min, max);
        }
        if let Some(speed) = self.speed {
            config = config.with_preset(Preset::from_speed(speed));
        }
        config
    }
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let output_mode = args.output_mode();

    // Logs go to stderr and are kept out of JSON and quiet output
    if output_mode != OutputMode::Json && output_mode != OutputMode::Quiet {
        init_logging(args.verbose);
    }

    let config = args.session_config();
    let mut driver = match Driver::new(config, output_mode) {
        Ok(driver) => driver,
        Err(e) => {
            report_error(output_mode, "invalid_config", &e);
            std::process::exit(1);
        }
    };

    if output_mode == OutputMode::Normal || output_mode == OutputMode::Verbose {
        print_header();
    }

    let mut failed = false;
    match args.script {
        Some(ref script) => {
            let commands = match parse_script(script) {
                Ok(commands) => commands,
                Err(e) => {
                    report_error(output_mode, "invalid_command", &e);
                    std::process::exit(2);
                }
            };
            for command in commands {
                match run_command(&mut driver, command, output_mode, args.keep_going) {
                    Ok(Flow::Continue) => {}
                    Ok(Flow::Quit) => break,
                    Err(()) => {
                        failed = true;
                        break;
                    }
                }
            }
        }
        None => {
            for line in io::stdin().lock().lines() {
                let line = line?;
                let command = match parse_line(&line) {
                    Ok(Some(command)) => command,
                    Ok(None) => continue,
                    Err(e) => {
                        report_error(output_mode, "invalid_command", &e);
                        if args.keep_going {
                            continue;
                        }
                        failed = true;
                        break;
                    }
                };
                match run_command(&mut driver, command, output_mode, args.keep_going) {
                    Ok(Flow::Continue) => {}
                    Ok(Flow::Quit) => break,
                    Err(()) => {
                        failed = true;
                        break;
                    }
                }
            }
        }
    }

    let stats = driver.finish();
    debug!(?stats, "done");

    if failed {
        std::process::exit(1);
    }
    Ok(())
}

/// Run one command; `Err` means the caller should stop with a failure.
fn run_command(
    driver: &mut Driver,
    command: Command,
    mode: OutputMode,
    keep_going: bool,
) -> Result<Flow, ()> {
    match driver.execute(command) {
        Ok(flow) => Ok(flow),
        Err(e) => {
            let kind = match e.downcast_ref::<SessionError>() {
                Some(SessionError::InvalidState { .. }) => "invalid_state",
                Some(SessionError::InvalidFrame(_)) => "invalid_frame",
                Some(_) => "session_error",
                None => "error",
            };
            report_error(mode, kind, &e);
            if keep_going {
                warn!(%command, "continuing after failed command");
                Ok(Flow::Continue)
            } else {
                Err(())
            }
        }
    }
}

fn report_error(mode: OutputMode, kind: &str, error: &anyhow::Error) {
    match mode {
        OutputMode::Json => {
            let error = serde_json::json!({
                "type": "error",
                "error": kind,
                "message": error.to_string(),
            });
            println!("{}", error);
        }
        OutputMode::Quiet => {}
        OutputMode::Normal | OutputMode::Verbose => {
            eprintln!("{} {}", style("Error:").red().bold(), error);
        }
    }
}

fn print_header() {
    println!();
    println!(
        "{}",
        style("+---------------------------------------------------------+").cyan()
    );
    println!(
        "{}  {}  {}",
        style("|").cyan(),
        style("ENCODE SESSION").cyan().bold(),
        style("                                      |").cyan()
    );
    println!(
        "{}  {}  {}",
        style("|").cyan(),
        style("send frames, flush, receive packets in order     ").white(),
        style("|").cyan()
    );
    println!(
        "{}",
        style("+---------------------------------------------------------+").cyan()
    );
    println!();
}

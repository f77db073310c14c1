//! Session commands and their parser.
//!
//! Commands come either from `--script` as one whitespace-separated string
//! or from stdin, one per line.

use anyhow::{anyhow, bail};
use std::fmt;
use std::str::FromStr;

/// A single step applied to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Submit `n` copies of the current frame.
    Send(usize),
    /// Request a flush.
    Flush,
    /// Poll once.
    Receive,
    /// Poll until the session needs data or ends.
    Drain,
    /// Print queue and encoder status.
    Status,
    /// List packets received so far.
    Packets,
    /// Print the session configuration.
    Config,
    /// List commands.
    Help,
    /// Stop reading commands.
    Quit,
}

impl Command {
    /// Names accepted by the parser, for help output.
    pub const NAMES: &'static [(&'static str, &'static str)] = &[
        ("send [n]", "submit n frames (default 1)"),
        ("flush", "stop accepting frames and drain"),
        ("receive", "poll one packet"),
        ("drain", "poll until more data is needed or the stream ends"),
        ("status", "show frames in queue, flushing and encoder status"),
        ("packets", "list received packets"),
        ("config", "show the encoder configuration"),
        ("help", "show this list"),
        ("quit", "close the session and exit"),
    ];

    fn from_word(word: &str) -> anyhow::Result<Self> {
        let command = match word.to_ascii_lowercase().as_str() {
            "send" | "s" => Self::Send(1),
            "flush" | "f" => Self::Flush,
            "receive" | "recv" | "r" => Self::Receive,
            "drain" | "d" => Self::Drain,
            "status" => Self::Status,
            "packets" => Self::Packets,
            "config" => Self::Config,
            "help" | "?" => Self::Help,
            "quit" | "exit" | "q" => Self::Quit,
            other => bail!("Unknown command: {other}. Type 'help' for the command list."),
        };
        Ok(command)
    }
}

impl FromStr for Command {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> anyhow::Result<Self> {
        let mut words = line.split_whitespace();
        let word = words.next().ok_or_else(|| anyhow!("Empty command"))?;
        let mut command = Self::from_word(word)?;

        if let Some(arg) = words.next() {
            match command {
                Self::Send(_) => command = Self::Send(parse_count(arg)?),
                _ => bail!("'{word}' takes no arguments"),
            }
        }
        if let Some(extra) = words.next() {
            bail!("Unexpected argument: {extra}");
        }

        Ok(command)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Send(1) => write!(f, "send"),
            Self::Send(n) => write!(f, "send {n}"),
            Self::Flush => write!(f, "flush"),
            Self::Receive => write!(f, "receive"),
            Self::Drain => write!(f, "drain"),
            Self::Status => write!(f, "status"),
            Self::Packets => write!(f, "packets"),
            Self::Config => write!(f, "config"),
            Self::Help => write!(f, "help"),
            Self::Quit => write!(f, "quit"),
        }
    }
}

fn parse_count(arg: &str) -> anyhow::Result<usize> {
    let count: usize = arg
        .parse()
        .map_err(|_| anyhow!("Invalid frame count: {arg}"))?;
    if count == 0 {
        bail!("Frame count must be at least 1");
    }
    Ok(count)
}

/// Parse a script such as `"send 3 flush drain"`.
///
/// `send` consumes the following word when it is a number.
pub fn parse_script(script: &str) -> anyhow::Result<Vec<Command>> {
    let mut commands = Vec::new();
    let mut words = script
        .split(|c: char| c.is_whitespace() || c == ',' || c == ';')
        .filter(|w| !w.is_empty())
        .peekable();

    while let Some(word) = words.next() {
        let mut command = Command::from_word(word)?;
        if let Command::Send(_) = command {
            if let Some(next) = words.peek() {
                if next.chars().all(|c| c.is_ascii_digit()) {
                    command = Command::Send(parse_count(next)?);
                    words.next();
                }
            }
        }
        commands.push(command);
    }

    Ok(commands)
}

/// Parse one stdin line. Blank lines and `#` comments yield `None`.
pub fn parse_line(line: &str) -> anyhow::Result<Option<Command>> {
    let line = line.split('#').next().unwrap_or_default().trim();
    if line.is_empty() {
        return Ok(None);
    }
    line.parse().map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_commands() {
        assert_eq!("send".parse::<Command>().unwrap(), Command::Send(1));
        assert_eq!("send 4".parse::<Command>().unwrap(), Command::Send(4));
        assert_eq!("FLUSH".parse::<Command>().unwrap(), Command::Flush);
        assert_eq!("recv".parse::<Command>().unwrap(), Command::Receive);
        assert_eq!("q".parse::<Command>().unwrap(), Command::Quit);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!("encode".parse::<Command>().is_err());
        assert!("send 0".parse::<Command>().is_err());
        assert!("send x".parse::<Command>().is_err());
        assert!("flush now".parse::<Command>().is_err());
        assert!("send 1 2".parse::<Command>().is_err());
    }

    #[test]
    fn test_parse_script() {
        let commands = parse_script("send send 3 flush, receive; drain status").unwrap();
        assert_eq!(
            commands,
            vec![
                Command::Send(1),
                Command::Send(3),
                Command::Flush,
                Command::Receive,
                Command::Drain,
                Command::Status,
            ]
        );
    }

    #[test]
    fn test_parse_script_unknown_word() {
        assert!(parse_script("send bogus").is_err());
    }

    #[test]
    fn test_parse_line_skips_comments() {
        assert_eq!(parse_line("   ").unwrap(), None);
        assert_eq!(parse_line("# nothing").unwrap(), None);
        assert_eq!(parse_line("send 2 # two").unwrap(), Some(Command::Send(2)));
    }

    #[test]
    fn test_display_parses_back() {
        for command in [Command::Send(1), Command::Send(7), Command::Drain, Command::Config] {
            assert_eq!(command.to_string().parse::<Command>().unwrap(), command);
        }
    }
}

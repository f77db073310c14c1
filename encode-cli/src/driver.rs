//! Applies commands to an encoder session and reports the outcome.

use crate::commands::Command;
use crate::OutputMode;
use console::style;
use encode_session::{
    EncodeSession, Frame, Packet, SessionConfig, SessionError, SessionStats,
};
use serde_json::json;
use tracing::debug;

/// Status shown after a poll that produced no packet.
const NEED_MORE_DATA_STATUS: &str = "need more data (send more frames or flush the encoder)";
const END_OF_STREAM_STATUS: &str = "end of stream";

/// Whether to keep reading commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Read the next command.
    Continue,
    /// Stop and close the session.
    Quit,
}

/// Outcome of a single poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Polled {
    Packet,
    NeedMoreData,
    EndOfStream,
}

/// Owns the session and the frame that every `send` resubmits.
pub struct Driver {
    session: EncodeSession,
    frame: Frame,
    packets: Vec<Packet>,
    encoder_status: String,
    mode: OutputMode,
}

impl Driver {
    /// Create a session for `config`.
    pub fn new(config: SessionConfig, mode: OutputMode) -> anyhow::Result<Self> {
        let session = EncodeSession::new(config)?;
        let frame = session.new_frame()?;
        Ok(Self {
            session,
            frame,
            packets: Vec::new(),
            encoder_status: String::new(),
            mode,
        })
    }

    /// Apply one command.
    ///
    /// Backpressure, `NeedMoreData` and `EndOfStream` are reported as
    /// events. Any other session error is returned to the caller.
    pub fn execute(&mut self, command: Command) -> anyhow::Result<Flow> {
        debug!(%command, "executing command");

        match command {
            Command::Send(count) => self.send(count)?,
            Command::Flush => self.flush()?,
            Command::Receive => {
                self.receive()?;
            }
            Command::Drain => self.drain()?,
            Command::Status => self.print_status(),
            Command::Packets => self.print_packets(),
            Command::Config => self.print_config()?,
            Command::Help => self.print_help(),
            Command::Quit => return Ok(Flow::Quit),
        }

        Ok(Flow::Continue)
    }

    /// Close the session and report the final statistics.
    pub fn finish(mut self) -> SessionStats {
        let stats = self.session.close();
        match self.mode {
            OutputMode::Json => {
                println!("{}", json!({ "type": "closed", "stats": stats }));
            }
            OutputMode::Normal | OutputMode::Verbose => {
                println!();
                println!("{}", style("Session closed:").cyan().bold());
                println!("  Frames submitted:  {}", style(stats.frames_submitted).white());
                println!("  Packets received:  {}", style(stats.packets_delivered).white());
                println!("  Keyframes:         {}", style(stats.keyframes).white());
                println!("  Bytes:             {}", style(stats.bytes_delivered).white());
                if self.mode == OutputMode::Verbose {
                    println!(
                        "  Average bitrate:   {}",
                        style(format!("{:.1} kbps", stats.avg_bitrate / 1000.0)).yellow()
                    );
                }
            }
            OutputMode::Quiet => {}
        }
        stats
    }

    fn send(&mut self, count: usize) -> anyhow::Result<()> {
        for _ in 0..count {
            match self.session.submit_frame(self.frame.clone()) {
                Ok(seq) => self.report_sent(seq),
                Err(SessionError::CapacityExceeded { capacity }) => {
                    self.report_backpressure(capacity);
                    break;
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    fn flush(&mut self) -> anyhow::Result<()> {
        self.session.request_flush()?;
        match self.mode {
            OutputMode::Json => println!("{}", json!({ "type": "flush" })),
            OutputMode::Normal | OutputMode::Verbose => {
                println!("{}", style("Flushing encoder").cyan());
            }
            OutputMode::Quiet => {}
        }
        Ok(())
    }

    fn receive(&mut self) -> anyhow::Result<Polled> {
        let polled = match self.session.poll_packet() {
            Ok(packet) => {
                self.encoder_status.clear();
                self.report_packet(&packet);
                self.packets.push(packet);
                Polled::Packet
            }
            Err(SessionError::NeedMoreData) => {
                self.set_status(NEED_MORE_DATA_STATUS);
                Polled::NeedMoreData
            }
            Err(SessionError::EndOfStream) => {
                self.set_status(END_OF_STREAM_STATUS);
                Polled::EndOfStream
            }
            Err(e) => return Err(e.into()),
        };
        Ok(polled)
    }

    fn drain(&mut self) -> anyhow::Result<()> {
        while self.receive()? == Polled::Packet {}
        Ok(())
    }

    fn set_status(&mut self, status: &str) {
        self.encoder_status = status.to_string();
        match self.mode {
            OutputMode::Json => {
                println!("{}", json!({ "type": "status", "encoder_status": status }));
            }
            OutputMode::Normal | OutputMode::Verbose => {
                println!("{} {}", style("Encoder:").yellow(), status);
            }
            OutputMode::Quiet => {}
        }
    }

    fn report_sent(&self, seq: u64) {
        match self.mode {
            OutputMode::Json => println!("{}", json!({ "type": "sent", "seq": seq })),
            OutputMode::Verbose => println!(
                "{} frame {} ({} queued)",
                style("Sent").green(),
                seq,
                self.session.queued_frames()
            ),
            OutputMode::Normal => println!("{} frame {}", style("Sent").green(), seq),
            OutputMode::Quiet => {}
        }
    }

    fn report_backpressure(&self, capacity: usize) {
        match self.mode {
            OutputMode::Json => println!(
                "{}",
                json!({ "type": "backpressure", "capacity": capacity })
            ),
            OutputMode::Normal | OutputMode::Verbose => println!(
                "{} input queue is full ({} frames), receive packets first",
                style("Busy:").yellow().bold(),
                capacity
            ),
            OutputMode::Quiet => {}
        }
    }

    fn report_packet(&self, packet: &Packet) {
        match self.mode {
            OutputMode::Json => println!(
                "{}",
                json!({
                    "type": "packet",
                    "seq": packet.seq,
                    "frame_type": packet.frame_type,
                    "qindex": packet.qindex,
                    "pts": packet.pts,
                    "size": packet.size(),
                    "description": packet.describe(),
                })
            ),
            OutputMode::Verbose => println!(
                "{} {} (qindex {}, pts {})",
                style("Packet:").green().bold(),
                packet.describe(),
                packet.qindex,
                packet.pts
            ),
            OutputMode::Normal => {
                println!("{} {}", style("Packet:").green().bold(), packet.describe())
            }
            OutputMode::Quiet => println!("{}", packet.describe()),
        }
    }

    fn print_status(&self) {
        let in_queue = self.session.frames_in_flight();
        let flushing = self.session.is_flushing();

        match self.mode {
            OutputMode::Json => println!(
                "{}",
                json!({
                    "type": "status",
                    "frames_in_queue": in_queue,
                    "flushing": flushing,
                    "encoder_status": self.encoder_status,
                    "state": self.session.state(),
                })
            ),
            OutputMode::Normal | OutputMode::Verbose => {
                println!("Frames in queue: {}", style(in_queue).white());
                println!("Flushing: {}", style(flushing).white());
                println!("Encoder Status: {}", self.encoder_status);
                if self.mode == OutputMode::Verbose {
                    println!("State: {}", style(self.session.state()).white());
                    println!(
                        "Input queue: {}/{}",
                        self.session.queued_frames(),
                        self.session.capacity()
                    );
                }
            }
            OutputMode::Quiet => {}
        }
    }

    fn print_packets(&self) {
        match self.mode {
            OutputMode::Json => {
                let list: Vec<String> = self.packets.iter().map(Packet::describe).collect();
                println!("{}", json!({ "type": "packets", "packets": list }));
            }
            OutputMode::Normal | OutputMode::Verbose => {
                if self.packets.is_empty() {
                    println!("{}", style("No packets received").dim());
                    return;
                }
                println!("{}", style("Encoded packets").cyan().bold());
                for (i, packet) in self.packets.iter().enumerate() {
                    println!("  {}. {}", i, packet.describe());
                }
            }
            OutputMode::Quiet => {}
        }
    }

    fn print_config(&self) -> anyhow::Result<()> {
        let config = self.session.config();
        match self.mode {
            OutputMode::Json => {
                println!("{}", json!({ "type": "config", "config": config }));
            }
            _ => {
                println!("{}", style("Encoder Config").cyan().bold());
                println!("{}", config.to_json()?);
            }
        }
        Ok(())
    }

    fn print_help(&self) {
        if self.mode == OutputMode::Json {
            let names: Vec<&str> = Command::NAMES.iter().map(|(name, _)| *name).collect();
            println!("{}", json!({ "type": "help", "commands": names }));
            return;
        }
        println!("{}", style("Commands").cyan().bold());
        for (name, description) in Command::NAMES {
            println!("  {:<10} {}", style(name).yellow(), description);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn driver(lookahead: usize) -> Driver {
        let config = SessionConfig::new(64, 96).with_lookahead(lookahead);
        Driver::new(config, OutputMode::Quiet).unwrap()
    }

    #[test]
    fn test_receive_before_enough_frames() {
        let mut d = driver(1);
        d.execute(Command::Send(1)).unwrap();
        d.execute(Command::Receive).unwrap();
        assert_eq!(d.encoder_status, NEED_MORE_DATA_STATUS);
        assert!(d.packets.is_empty());
    }

    #[test]
    fn test_send_flush_drain() {
        let mut d = driver(1);
        d.execute(Command::Send(2)).unwrap();
        d.execute(Command::Flush).unwrap();
        d.execute(Command::Drain).unwrap();
        assert_eq!(d.packets.len(), 2);
        assert_eq!(d.encoder_status, END_OF_STREAM_STATUS);
        assert_eq!(d.packets[0].describe().split(" - ").next(), Some("Frame 0"));
    }

    #[test]
    fn test_send_stops_at_capacity() {
        let mut d = driver(1);
        d.execute(Command::Send(5)).unwrap();
        let stats = d.finish();
        assert_eq!(stats.frames_submitted, 2);
    }

    #[test]
    fn test_send_after_flush_is_an_error() {
        let mut d = driver(0);
        d.execute(Command::Flush).unwrap();
        let err = d.execute(Command::Send(1)).unwrap_err();
        let session_err = err.downcast_ref::<SessionError>().unwrap();
        assert!(session_err.is_caller_error());
    }

    #[test]
    fn test_quit_stops() {
        let mut d = driver(0);
        assert_eq!(d.execute(Command::Quit).unwrap(), Flow::Quit);
        assert_eq!(d.execute(Command::Status).unwrap(), Flow::Continue);
    }
}

// Trace Native Host - Session Loop
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// One session per process: read frame -> decode -> dispatch -> filter ->
// sink -> reply, until the peer closes the stream or a terminal command
// arrives. Tracks: frames read, processed, filtered, malformed.

use crate::codec::{self, FrameError};
use crate::message::{Command, Status, TraceMessage, TraceStatus};
use crate::policy::{self, Settings};
use crate::sink::TraceSink;
use serde::Serialize;
use std::io::{Read, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Running,
    Terminated,
}

/// Counters reported when the session ends
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub frames: u64,
    pub processed: u64,
    pub filtered: u64,
    pub malformed: u64,
    pub sink_failures: u64,
}

impl SessionSummary {
    pub fn status_summary(&self) -> String {
        format!(
            "Frames: {} | Processed: {} | Filtered: {} | Malformed: {} | Sink failures: {}",
            self.frames, self.processed, self.filtered, self.malformed, self.sink_failures,
        )
    }
}

/// Native messaging session over a reader/writer pair
pub struct Session<'a, R, W, S> {
    reader: R,
    writer: W,
    sink: S,
    settings: Option<&'a Settings>,
    state: SessionState,
    summary: SessionSummary,
}

impl<'a, R: Read, W: Write, S: TraceSink> Session<'a, R, W, S> {
    pub fn new(reader: R, writer: W, sink: S, settings: Option<&'a Settings>) -> Self {
        Self {
            reader,
            writer,
            sink,
            settings,
            state: SessionState::Running,
            summary: SessionSummary::default(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn summary(&self) -> &SessionSummary {
        &self.summary
    }

    /// Give back the sink and writer, e.g. to inspect them after a run
    pub fn into_parts(self) -> (W, S) {
        (self.writer, self.sink)
    }

    /// Decide the reply for one message, writing it to the sink if accepted.
    /// A missing message ends the session.
    pub fn process_message(&mut self, message: Option<&TraceMessage>) -> Status {
        let Some(message) = message else {
            return Status::Exit;
        };

        match &message.command {
            Command::Exit => Status::Exit,
            Command::Trace => {
                let Some(text) = message.text() else {
                    return Status::Exit;
                };
                if !policy::should_process(message, self.settings) {
                    self.summary.filtered += 1;
                    return Status::Filtered;
                }
                if let Err(e) = self.sink.write(text, message.category()) {
                    self.summary.sink_failures += 1;
                    log::error!("Trace sink write failed: {}", e);
                }
                self.summary.processed += 1;
                Status::Processed
            }
            Command::Unrecognized(raw) => {
                log::warn!("Unrecognized command {:?}, ending session", raw);
                Status::Exit
            }
        }
    }

    /// Run one iteration. Returns the resulting state.
    pub fn step(&mut self) -> Result<SessionState, FrameError> {
        if self.state == SessionState::Terminated {
            return Ok(self.state);
        }

        let payload = match codec::read_frame(&mut self.reader) {
            Ok(Some(payload)) => payload,
            Ok(None) => {
                log::info!("Input stream closed by peer");
                self.state = SessionState::Terminated;
                return Ok(self.state);
            }
            Err(e) if e.is_recoverable() => {
                self.summary.malformed += 1;
                log::warn!("Discarding frame: {}", e);
                return Ok(self.state);
            }
            Err(e) => return Err(e),
        };
        self.summary.frames += 1;

        let message = match codec::decode(&payload) {
            Ok(message) => message,
            Err(e) => {
                self.summary.malformed += 1;
                log::error!("{}", e);
                log::error!("Raw payload: {}", String::from_utf8_lossy(&payload));
                return Ok(self.state);
            }
        };
        log::debug!("Received: {}", message.command.as_str());

        let status = self.process_message(Some(&message));
        self.reply(status)?;
        if status.ends_session() {
            self.state = SessionState::Terminated;
        }
        Ok(self.state)
    }

    /// Loop until terminated. Only unrecoverable stream errors surface.
    pub fn run(&mut self) -> Result<SessionSummary, FrameError> {
        while self.step()? == SessionState::Running {}
        log::info!("Session ended. {}", self.summary.status_summary());
        Ok(self.summary.clone())
    }

    fn reply(&mut self, status: Status) -> Result<(), FrameError> {
        let body = codec::encode(&TraceStatus::from(status))?;
        codec::write_frame(&mut self.writer, &body)
    }
}

// ============================================================================
// TESTS
// ============================================================================

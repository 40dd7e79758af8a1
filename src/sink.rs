// Trace Native Host - Trace Sink
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// Append-only destination for accepted trace messages.
// LogSink: routes through the `log` facade (stderr, target "trace").
// FileSink: appends timestamped lines to a trace file, one line per message.

use chrono::Local;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Log target used for accepted messages routed through `log`
pub const TRACE_TARGET: &str = "trace";

/// Receives messages that passed the filter policy
pub trait TraceSink {
    /// Append one message. `category` is the message context, when present.
    fn write(&mut self, message: &str, category: Option<&str>) -> io::Result<()>;
}

/// `category: message`, or just `message` without a category
pub fn format_line(message: &str, category: Option<&str>) -> String {
    match category {
        Some(category) => format!("{}: {}", category, message),
        None => message.to_string(),
    }
}

/// Escape line breaks so a message cannot span or forge trace file lines
fn escape_line_breaks(line: &str) -> String {
    line.replace('\r', "\\r").replace('\n', "\\n")
}

// ============================================================================
// LOG SINK
// ============================================================================

#[derive(Debug, Default)]
pub struct LogSink;

impl TraceSink for LogSink {
    fn write(&mut self, message: &str, category: Option<&str>) -> io::Result<()> {
        log::info!(target: TRACE_TARGET, "{}", format_line(message, category));
        Ok(())
    }
}

// ============================================================================
// FILE SINK
// ============================================================================

#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    file: File,
}

impl FileSink {
    /// Open for append, creating the file and its parent directory if needed
    pub fn open(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        log::info!("Trace file opened at {:?}", path);
        Ok(Self { path: path.to_path_buf(), file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TraceSink for FileSink {
    fn write(&mut self, message: &str, category: Option<&str>) -> io::Result<()> {
        let ts = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        let line = escape_line_breaks(&format_line(message, category));
        writeln!(self.file, "[{}] {}", ts, line)?;
        self.file.flush()
    }
}

impl<S: TraceSink + ?Sized> TraceSink for Box<S> {
    fn write(&mut self, message: &str, category: Option<&str>) -> io::Result<()> {
        (**self).write(message, category)
    }
}

// ============================================================================
// TEST SUPPORT
// ============================================================================

/// Records every write in memory; optionally fails them all
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct MemorySink {
    pub entries: Vec<(String, Option<String>)>,
    pub fail: bool,
}

#[cfg(test)]
impl TraceSink for MemorySink {
    fn write(&mut self, message: &str, category: Option<&str>) -> io::Result<()> {
        if self.fail {
            return Err(io::Error::new(io::ErrorKind::Other, "sink unavailable"));
        }
        self.entries.push((message.to_string(), category.map(str::to_string)));
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================

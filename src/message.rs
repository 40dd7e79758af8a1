// Trace Native Host - Message Model
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// Inbound trace requests and outbound status replies.
// Inbound:  {"Command", "Message"?, "Source"?, "Context"?, "Level"?}
// Outbound: {"Status"}

use crate::level::{LevelParse, TraceLevel};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Command carried by an inbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Trace,
    Exit,
    /// Anything else, including a missing or empty command
    Unrecognized(String),
}

impl Command {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("trace") => Command::Trace,
            Some("exit") => Command::Exit,
            Some(other) => Command::Unrecognized(other.to_string()),
            None => Command::Unrecognized(String::new()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Command::Trace => "trace",
            Command::Exit => "exit",
            Command::Unrecognized(raw) => raw,
        }
    }
}

/// Typed inbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceMessage {
    pub command: Command,
    pub message: Option<String>,
    pub source: Option<String>,
    pub context: Option<String>,
    /// None means the message is unconditional
    pub level: Option<TraceLevel>,
}

impl TraceMessage {
    pub fn trace(message: &str) -> Self {
        Self {
            command: Command::Trace,
            message: Some(message.to_string()),
            source: None,
            context: None,
            level: None,
        }
    }

    pub fn exit() -> Self {
        Self {
            command: Command::Exit,
            message: None,
            source: None,
            context: None,
            level: None,
        }
    }

    pub fn with_source(mut self, source: &str) -> Self {
        self.source = Some(source.to_string());
        self
    }

    pub fn with_context(mut self, context: &str) -> Self {
        self.context = Some(context.to_string());
        self
    }

    pub fn with_level(mut self, level: TraceLevel) -> Self {
        self.level = Some(level);
        self
    }

    /// Message text, treating an empty string the same as a missing one
    pub fn text(&self) -> Option<&str> {
        self.message.as_deref().filter(|m| !m.is_empty())
    }

    /// Sink category, present only for a non-empty context
    pub fn category(&self) -> Option<&str> {
        self.context.as_deref().filter(|c| !c.is_empty())
    }
}

/// JSON shape as it arrives on the wire. Level stays untyped until the
/// lenient parse runs.
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct WireMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<Value>,
}

impl WireMessage {
    pub(crate) fn into_message(self) -> TraceMessage {
        TraceMessage {
            command: Command::parse(self.command.as_deref()),
            message: self.message,
            source: self.source,
            context: self.context,
            level: self.level.as_ref().and_then(level_from_value),
        }
    }

    pub(crate) fn from_message(message: &TraceMessage) -> Self {
        Self {
            command: Some(message.command.as_str().to_string()),
            message: message.message.clone(),
            source: message.source.clone(),
            context: message.context.clone(),
            level: message.level.map(|l| Value::String(l.name().to_string())),
        }
    }
}

/// `null` counts as absent; strings and numbers go through the lenient
/// parse; any other JSON type falls back.
fn level_from_value(value: &Value) -> Option<TraceLevel> {
    let parsed = match value {
        Value::Null => return None,
        Value::String(s) => TraceLevel::parse_lenient(s),
        Value::Number(n) => n
            .as_u64()
            .and_then(TraceLevel::from_index)
            .map_or(LevelParse::Fallback, LevelParse::Known),
        _ => LevelParse::Fallback,
    };
    if parsed == LevelParse::Fallback {
        log::debug!("Unrecognized Level {}, using {}", value, parsed.level());
    }
    Some(parsed.level())
}

/// Reply status sent back to the extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Exit,
    Processed,
    Filtered,
}

impl Status {
    pub fn ends_session(self) -> bool {
        self == Status::Exit
    }
}

/// Outbound reply frame body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TraceStatus {
    pub status: Status,
}

impl From<Status> for TraceStatus {
    fn from(status: Status) -> Self {
        Self { status }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_parse_covers_all_cases() {
        assert_eq!(Command::parse(Some("trace")), Command::Trace);
        assert_eq!(Command::parse(Some("exit")), Command::Exit);
        assert_eq!(Command::parse(Some("Trace")), Command::Unrecognized("Trace".into()));
        assert_eq!(Command::parse(None), Command::Unrecognized(String::new()));
    }

    #[test]
    fn empty_text_counts_as_missing() {
        let mut msg = TraceMessage::trace("");
        assert_eq!(msg.text(), None);
        msg.message = None;
        assert_eq!(msg.text(), None);
        assert_eq!(TraceMessage::trace("x").text(), Some("x"));
    }

    #[test]
    fn empty_context_has_no_category() {
        let msg = TraceMessage::trace("x").with_context("");
        assert_eq!(msg.category(), None);
        let msg = TraceMessage::trace("x").with_context("yekneb.js");
        assert_eq!(msg.category(), Some("yekneb.js"));
    }

    #[test]
    fn level_values_are_lenient() {
        assert_eq!(level_from_value(&Value::Null), None);
        assert_eq!(level_from_value(&Value::from("debug")), Some(TraceLevel::Debug));
        assert_eq!(level_from_value(&Value::from("2")), Some(TraceLevel::Info));
        assert_eq!(level_from_value(&Value::from(4)), Some(TraceLevel::Verbose));
        assert_eq!(level_from_value(&Value::from(99)), Some(TraceLevel::Warning));
        assert_eq!(level_from_value(&Value::from(true)), Some(TraceLevel::Warning));
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&TraceStatus::from(Status::Filtered)).unwrap();
        assert_eq!(json, r#"{"Status":"filtered"}"#);
        assert!(Status::Exit.ends_session());
        assert!(!Status::Processed.ends_session());
    }
}

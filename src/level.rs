// Trace Native Host - Trace Levels
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// Ordered severity/verbosity classification shared by the wire model and
// the filter policy. error < warning < info < debug < verbose < extremelyVerbose.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Trace level, ordered from most severe to most verbose.
///
/// A message passes a threshold when `message_level <= threshold`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TraceLevel {
    Error,
    Warning,
    Info,
    Debug,
    Verbose,
    ExtremelyVerbose,
}

/// Level substituted for any value the wire parser does not recognize.
pub const FALLBACK_LEVEL: TraceLevel = TraceLevel::Warning;

impl TraceLevel {
    pub const ALL: [TraceLevel; 6] = [
        TraceLevel::Error,
        TraceLevel::Warning,
        TraceLevel::Info,
        TraceLevel::Debug,
        TraceLevel::Verbose,
        TraceLevel::ExtremelyVerbose,
    ];

    /// Wire name, exactly as the extension sends it
    pub fn name(self) -> &'static str {
        match self {
            TraceLevel::Error => "error",
            TraceLevel::Warning => "warning",
            TraceLevel::Info => "info",
            TraceLevel::Debug => "debug",
            TraceLevel::Verbose => "verbose",
            TraceLevel::ExtremelyVerbose => "extremelyVerbose",
        }
    }

    /// Level for a numeric discriminant (0 = error .. 5 = extremelyVerbose)
    pub fn from_index(index: u64) -> Option<Self> {
        usize::try_from(index).ok().and_then(|i| Self::ALL.get(i).copied())
    }

    /// Lenient wire parse. Exact, case-sensitive name or a decimal
    /// discriminant; anything else is `Fallback`.
    pub fn parse_lenient(raw: &str) -> LevelParse {
        let raw = raw.trim();
        if let Some(level) = Self::ALL.iter().copied().find(|l| l.name() == raw) {
            return LevelParse::Known(level);
        }
        match raw.parse::<u64>().ok().and_then(Self::from_index) {
            Some(level) => LevelParse::Known(level),
            None => LevelParse::Fallback,
        }
    }
}

/// Outcome of a lenient level parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelParse {
    Known(TraceLevel),
    Fallback,
}

impl LevelParse {
    pub fn level(self) -> TraceLevel {
        match self {
            LevelParse::Known(level) => level,
            LevelParse::Fallback => FALLBACK_LEVEL,
        }
    }
}

impl fmt::Display for TraceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown trace level '{0}'")]
pub struct UnknownLevel(pub String);

/// Strict, case-insensitive parse used for configuration values.
impl FromStr for TraceLevel {
    type Err = UnknownLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Some(level) = Self::ALL
            .iter()
            .copied()
            .find(|l| l.name().eq_ignore_ascii_case(trimmed))
        {
            return Ok(level);
        }
        trimmed
            .parse::<u64>()
            .ok()
            .and_then(Self::from_index)
            .ok_or_else(|| UnknownLevel(s.to_string()))
    }
}

impl Serialize for TraceLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

struct TraceLevelVisitor;

impl<'de> Visitor<'de> for TraceLevelVisitor {
    type Value = TraceLevel;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a trace level name or index 0-5")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<TraceLevel, E> {
        v.parse().map_err(E::custom)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<TraceLevel, E> {
        TraceLevel::from_index(v).ok_or_else(|| E::custom(UnknownLevel(v.to_string())))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<TraceLevel, E> {
        u64::try_from(v)
            .ok()
            .and_then(TraceLevel::from_index)
            .ok_or_else(|| E::custom(UnknownLevel(v.to_string())))
    }
}

/// Configuration-side deserialization; strict (unknown values are errors).
impl<'de> Deserialize<'de> for TraceLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(TraceLevelVisitor)
    }
}

// ============================================================================
// TESTS
// ============================================================================

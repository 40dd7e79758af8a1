// Trace Native Host - Filter Policy
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// Resolves the effective trace level for a (source, context) pair:
//   global default -> per-source "DefaultTraceLevel" -> per-source-per-context.
// Pure decision functions. No I/O, no mutation.

use crate::level::TraceLevel;
use crate::message::TraceMessage;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Context key holding a source's fallback level
pub const SOURCE_DEFAULT_KEY: &str = "DefaultTraceLevel";

/// Threshold used when no settings were loaded at all
pub const UNCONFIGURED_LEVEL: TraceLevel = TraceLevel::Info;

/// context name -> level
pub type ContextEntries = BTreeMap<String, TraceLevel>;

/// Filtering policy, loaded once at startup and read-only afterwards
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Settings {
    #[serde(default = "default_global_level")]
    pub global_default_trace_level: TraceLevel,
    /// source name -> context entries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_entries: Option<BTreeMap<String, ContextEntries>>,
}

fn default_global_level() -> TraceLevel {
    TraceLevel::Warning
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            global_default_trace_level: default_global_level(),
            source_entries: None,
        }
    }
}

impl Settings {
    pub fn with_global(level: TraceLevel) -> Self {
        Self { global_default_trace_level: level, source_entries: None }
    }

    /// Add or replace one (source, context) entry
    pub fn set_level(&mut self, source: &str, context: &str, level: TraceLevel) {
        self.source_entries
            .get_or_insert_with(BTreeMap::new)
            .entry(source.to_string())
            .or_default()
            .insert(context.to_string(), level);
    }

    /// Builder form of `set_level`
    pub fn with_level(mut self, source: &str, context: &str, level: TraceLevel) -> Self {
        self.set_level(source, context, level);
        self
    }
}

/// Effective threshold for a (source, context) pair.
pub fn resolve_level(
    settings: Option<&Settings>,
    source: Option<&str>,
    context: Option<&str>,
) -> TraceLevel {
    let Some(settings) = settings else {
        return UNCONFIGURED_LEVEL;
    };
    let global = settings.global_default_trace_level;

    let (Some(source), Some(context), Some(entries)) =
        (source, context, settings.source_entries.as_ref())
    else {
        return global;
    };

    let Some(contexts) = entries.get(source) else {
        return global;
    };

    contexts
        .get(context)
        .or_else(|| contexts.get(SOURCE_DEFAULT_KEY))
        .copied()
        .unwrap_or(global)
}

/// Whether a message passes the policy. Messages without a level always pass.
pub fn should_process(message: &TraceMessage, settings: Option<&Settings>) -> bool {
    let Some(level) = message.level else {
        return true;
    };
    let threshold = resolve_level(settings, message.source.as_deref(), message.context.as_deref());
    level <= threshold
}

// ============================================================================
// TESTS
// ============================================================================

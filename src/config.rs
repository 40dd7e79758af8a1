// Trace Native Host - Configuration
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// Builds the filter Settings once at startup from two layers:
//   1. Optional JSON file (AppSettings.json beside the executable)
//   2. Environment variables, "__" separating key segments
//      e.g. Settings__SourceEntries__JAWSInspect__InspectEvent=debug
// Section and field names match case-insensitively. Source and context
// names match exactly.

use crate::policy::Settings;
use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::path::Path;

pub const CONFIG_FILE_NAME: &str = "AppSettings.json";
pub const SETTINGS_SECTION: &str = "Settings";

/// Environment key segment separator
const ENV_SEPARATOR: &str = "__";

/// Canonical field names of the Settings section
const SETTINGS_FIELDS: [&str; 2] = ["GlobalDefaultTraceLevel", "SourceEntries"];

/// Load settings from `path` and the process environment.
///
/// `None` when no Settings section exists in either layer. Load failures are
/// logged and replaced by `Settings::default()`.
pub fn load(path: &Path) -> Option<Settings> {
    load_with_vars(path, std::env::vars())
}

/// `load` with an explicit set of environment variables
pub fn load_with_vars<I>(path: &Path, vars: I) -> Option<Settings>
where
    I: IntoIterator<Item = (String, String)>,
{
    match try_load(path, vars) {
        Ok(Some(settings)) => {
            log::info!(
                "Settings loaded: global default {}, {} source entries",
                settings.global_default_trace_level,
                settings.source_entries.as_ref().map_or(0, |e| e.len())
            );
            Some(settings)
        }
        Ok(None) => {
            log::info!("No {} section configured, using unconfigured defaults", SETTINGS_SECTION);
            None
        }
        Err(e) => {
            log::warn!("Settings load failed, using defaults: {:#}", e);
            Some(Settings::default())
        }
    }
}

/// Strict form of `load_with_vars`; errors instead of falling back
pub fn try_load<I>(path: &Path, vars: I) -> Result<Option<Settings>>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut root = read_file(path)?.unwrap_or_else(|| Value::Object(Map::new()));
    overlay_env(&mut root, vars);

    let Some(section) = take_section(&mut root) else {
        return Ok(None);
    };
    let section = normalize_fields(section);
    let settings: Settings = serde_json::from_value(section)
        .with_context(|| format!("Invalid {} section", SETTINGS_SECTION))?;
    Ok(Some(settings))
}

/// Parse the JSON file. Missing file is `Ok(None)`.
fn read_file(path: &Path) -> Result<Option<Value>> {
    if !path.exists() {
        log::debug!("Config not found at {:?}", path);
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {:?}", path))?;
    let value: Value = serde_json::from_str(&content)
        .with_context(|| format!("Invalid JSON in config file {:?}", path))?;
    if !value.is_object() {
        anyhow::bail!("Config file {:?} must contain a JSON object", path);
    }
    Ok(Some(value))
}

/// Apply `Settings__...` variables on top of the file layer
fn overlay_env<I>(root: &mut Value, vars: I)
where
    I: IntoIterator<Item = (String, String)>,
{
    for (key, value) in vars {
        let segments: Vec<&str> = key.split(ENV_SEPARATOR).collect();
        if segments.len() < 2 || !segments[0].eq_ignore_ascii_case(SETTINGS_SECTION) {
            continue;
        }
        if segments.iter().any(|s| s.is_empty()) {
            log::warn!("Ignoring malformed settings variable {}", key);
            continue;
        }
        log::debug!("Settings override from environment: {}", key);
        set_path(root, &segments, Value::String(value));
    }
}

/// Segments below this depth are source and context names
const CASE_INSENSITIVE_DEPTH: usize = 2;

/// Insert `value` at `segments`, creating objects along the way.
/// Section and field keys match existing keys case-insensitively; source and
/// context keys are inserted exactly as spelled.
fn set_path(root: &mut Value, segments: &[&str], value: Value) {
    let mut node = root;
    for (i, segment) in segments.iter().enumerate() {
        if !node.is_object() {
            *node = Value::Object(Map::new());
        }
        let Value::Object(map) = node else {
            return;
        };
        let existing = if i < CASE_INSENSITIVE_DEPTH {
            map.keys().find(|k| k.eq_ignore_ascii_case(segment)).cloned()
        } else {
            None
        };
        let key = existing.unwrap_or_else(|| segment.to_string());

        if i + 1 == segments.len() {
            map.insert(key, value);
            return;
        }
        node = map.entry(key).or_insert_with(|| Value::Object(Map::new()));
    }
}

fn take_section(root: &mut Value) -> Option<Value> {
    let map = root.as_object_mut()?;
    let key = map.keys().find(|k| k.eq_ignore_ascii_case(SETTINGS_SECTION)).cloned()?;
    map.remove(&key)
}

/// Rename Settings field keys to their canonical casing
fn normalize_fields(section: Value) -> Value {
    let Value::Object(map) = section else {
        return section;
    };
    let renamed = map
        .into_iter()
        .map(|(key, value)| {
            let canonical = SETTINGS_FIELDS
                .iter()
                .find(|f| f.eq_ignore_ascii_case(&key))
                .map_or(key, |f| f.to_string());
            (canonical, value)
        })
        .collect();
    Value::Object(renamed)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::TraceLevel;
    use crate::policy::resolve_level;
    use tempfile::tempdir;

    fn no_vars() -> Vec<(String, String)> {
        Vec::new()
    }

    fn var(key: &str, value: &str) -> (String, String) {
        (key.to_string(), value.to_string())
    }

    #[test]
    fn missing_file_and_env_is_unconfigured() {
        let dir = tempdir().unwrap();
        let settings = load_with_vars(&dir.path().join(CONFIG_FILE_NAME), no_vars());
        assert_eq!(settings, None);
    }

    #[test]
    fn file_settings_are_loaded() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(
            &path,
            r#"{
                "Logging": {"LogLevel": {"Default": "Information"}},
                "Settings": {
                    "GlobalDefaultTraceLevel": "warning",
                    "SourceEntries": {
                        "SullivanAndKey.com": {"yekneb.js": "info"},
                        "JAWSInspect": {"DefaultTraceLevel": "debug"}
                    }
                }
            }"#,
        )
        .unwrap();

        let settings = load_with_vars(&path, no_vars()).unwrap();
        assert_eq!(settings.global_default_trace_level, TraceLevel::Warning);
        assert_eq!(
            resolve_level(Some(&settings), Some("SullivanAndKey.com"), Some("yekneb.js")),
            TraceLevel::Info
        );
        assert_eq!(
            resolve_level(Some(&settings), Some("JAWSInspect"), Some("InspectEvent")),
            TraceLevel::Debug
        );
    }

    #[test]
    fn env_overrides_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, r#"{"settings": {"globalDefaultTraceLevel": "error"}}"#).unwrap();

        let vars = vec![
            var("SETTINGS__GLOBALDEFAULTTRACELEVEL", "verbose"),
            var("Settings__SourceEntries__S__C", "Debug"),
            var("PATH", "/usr/bin"),
        ];
        let settings = load_with_vars(&path, vars).unwrap();
        assert_eq!(settings.global_default_trace_level, TraceLevel::Verbose);
        assert_eq!(resolve_level(Some(&settings), Some("S"), Some("C")), TraceLevel::Debug);
    }

    #[test]
    fn env_alone_creates_settings() {
        let dir = tempdir().unwrap();
        let vars = vec![var("Settings__SourceEntries__S__DefaultTraceLevel", "3")];
        let settings = load_with_vars(&dir.path().join("absent.json"), vars).unwrap();
        assert_eq!(settings.global_default_trace_level, TraceLevel::Warning);
        assert_eq!(resolve_level(Some(&settings), Some("S"), Some("any")), TraceLevel::Debug);
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "{ not json").unwrap();
        assert!(try_load(&path, no_vars()).is_err());
        assert_eq!(load_with_vars(&path, no_vars()), Some(Settings::default()));
    }

    #[test]
    fn invalid_level_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        let vars = vec![var("Settings__GlobalDefaultTraceLevel", "shouting")];
        let settings = load_with_vars(&dir.path().join("absent.json"), vars);
        assert_eq!(settings, Some(Settings::default()));
    }

    #[test]
    fn malformed_env_keys_are_ignored() {
        let dir = tempdir().unwrap();
        let vars = vec![var("Settings____x", "debug"), var("Settings", "debug")];
        assert_eq!(load_with_vars(&dir.path().join("absent.json"), vars), None);
    }

    #[test]
    fn set_path_reuses_existing_keys() {
        let mut root = serde_json::json!({"Settings": {"SourceEntries": {"S": {"a": "info"}}}});
        set_path(&mut root, &["settings", "sourceentries", "S", "b"], Value::from("debug"));
        assert_eq!(root["Settings"]["SourceEntries"]["S"]["a"], "info");
        assert_eq!(root["Settings"]["SourceEntries"]["S"]["b"], "debug");
    }

    #[test]
    fn env_context_names_keep_their_case() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, r#"{"Settings":{"SourceEntries":{"S":{"c":"info"}}}}"#).unwrap();

        let vars = vec![
            var("Settings__SourceEntries__S__C", "debug"),
            var("Settings__SourceEntries__s__c", "error"),
        ];
        let settings = load_with_vars(&path, vars).unwrap();
        assert_eq!(resolve_level(Some(&settings), Some("S"), Some("c")), TraceLevel::Info);
        assert_eq!(resolve_level(Some(&settings), Some("S"), Some("C")), TraceLevel::Debug);
        assert_eq!(resolve_level(Some(&settings), Some("s"), Some("c")), TraceLevel::Error);
    }
}

//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`PalaverSettings::default()`]
//! 2. If the settings file exists, deep-merge its values over the defaults
//! 3. Apply `PALAVER_*` environment variable overrides (highest priority)
//! 4. Validate the result
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::Result;
use crate::types::PalaverSettings;

/// Directory holding Palaver's settings and default database (`~/.palaver`).
pub fn palaver_home() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".palaver")
}

/// Resolve the path to the settings file (`~/.palaver/settings.json`).
pub fn settings_path() -> PathBuf {
    palaver_home().join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<PalaverSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults. Invalid JSON or a value that fails
/// validation is an error.
pub fn load_settings_from_path(path: &Path) -> Result<PalaverSettings> {
    let mut settings = read_settings_file(path)?;
    apply_env_overrides(&mut settings);
    settings.validate()?;
    Ok(settings)
}

fn read_settings_file(path: &Path) -> Result<PalaverSettings> {
    let defaults = serde_json::to_value(PalaverSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    Ok(serde_json::from_value(merged)?)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply `PALAVER_*` environment variable overrides to loaded settings.
pub fn apply_env_overrides(settings: &mut PalaverSettings) {
    apply_overrides_from(settings, |name| std::env::var(name).ok());
}

/// Apply overrides read through `lookup`.
///
/// Invalid values are logged and ignored, leaving the file/default value.
pub fn apply_overrides_from<F>(settings: &mut PalaverSettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let read = |name: &str| lookup(name).filter(|v| !v.is_empty());

    // ── Server ──────────────────────────────────────────────────────
    if let Some(v) = read("PALAVER_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = read("PALAVER_PORT") {
        match parse_u16_range(&v, 0, 65535) {
            Some(port) => settings.server.port = port,
            None => warn!(key = "PALAVER_PORT", value = %v, "invalid u16 env var, ignoring"),
        }
    }
    if let Some(v) = read("PALAVER_MAX_CONNECTIONS") {
        match parse_usize_range(&v, 1, 1_000_000) {
            Some(n) => settings.server.max_connections = n,
            None => {
                warn!(key = "PALAVER_MAX_CONNECTIONS", value = %v, "invalid usize env var, ignoring");
            }
        }
    }

    // ── Database ────────────────────────────────────────────────────
    if let Some(v) = read("PALAVER_DB_PATH") {
        settings.database.path = v;
    }

    // ── Logging ─────────────────────────────────────────────────────
    if let Some(v) = read("PALAVER_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = read("PALAVER_LOG_JSON") {
        match parse_bool(&v) {
            Some(b) => settings.logging.json = b,
            None => warn!(key = "PALAVER_LOG_JSON", value = %v, "invalid boolean env var, ignoring"),
        }
    }

    // ── Chat ────────────────────────────────────────────────────────
    if let Some(v) = read("PALAVER_ADMISSION_POLICY") {
        match v.parse() {
            Ok(policy) => settings.chat.admission_policy = policy,
            Err(e) => warn!(key = "PALAVER_ADMISSION_POLICY", error = %e, "ignoring"),
        }
    }
    if let Some(v) = read("PALAVER_HISTORY_LIMIT") {
        match parse_usize_range(&v, 1, 10_000) {
            Some(n) => settings.chat.history_limit = n,
            None => {
                warn!(key = "PALAVER_HISTORY_LIMIT", value = %v, "invalid usize env var, ignoring");
            }
        }
    }
}

// ── Pure parsing functions ──────────────────────────────────────────────────

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `u16` within a range.
pub fn parse_u16_range(val: &str, min: u16, max: u16) -> Option<u16> {
    let n: u16 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `usize` within a range.
pub fn parse_usize_range(val: &str, min: usize, max: usize) -> Option<usize> {
    let n: usize = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

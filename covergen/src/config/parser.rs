//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This is the single place where INI key names are mapped to struct fields.

use std::path::PathBuf;
use std::str::FromStr;

use ini::{Ini, Properties};

use super::file::{ConfigFile, ConfigFileError};

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [source] section
    if let Some(section) = ini.section(Some("source")) {
        if let Some(v) = non_empty(section, "path") {
            config.source.path = expand_tilde(v);
        }
        if let Some(v) = non_empty(section, "query") {
            config.source.query = v.to_string();
        }
    }

    // [destination] section
    if let Some(section) = ini.section(Some("destination")) {
        if let Some(v) = non_empty(section, "path") {
            config.destination.path = expand_tilde(v);
        }
        if let Some(v) = non_empty(section, "table") {
            config.destination.table = v.to_string();
        }
    }

    // [zoom] section
    if let Some(section) = ini.section(Some("zoom")) {
        if let Some(v) = non_empty(section, "min") {
            config.zoom.min = parse(
                "zoom",
                "min",
                v,
                "must be an integer between 0 and 30",
            )?;
        }
        if let Some(v) = non_empty(section, "max") {
            config.zoom.max = parse(
                "zoom",
                "max",
                v,
                "must be an integer between 0 and 30",
            )?;
        }
    }

    // [coverage] section
    if let Some(section) = ini.section(Some("coverage")) {
        if let Some(v) = non_empty(section, "strategy") {
            config.coverage.strategy = parse("coverage", "strategy", v, "must be 'exact' or 'bbox'")?;
        }
        if let Some(v) = non_empty(section, "schedule") {
            config.coverage.schedule = parse(
                "coverage",
                "schedule",
                v,
                "must be 'sequential' or 'parallel'",
            )?;
        }
    }

    // [workers] section
    if let Some(section) = ini.section(Some("workers")) {
        if let Some(v) = non_empty(section, "count") {
            config.workers.count = Some(parse_positive("workers", "count", v)?);
        }
        if let Some(v) = non_empty(section, "queue_capacity") {
            config.workers.queue_capacity = parse_positive("workers", "queue_capacity", v)?;
        }
    }

    // [sink] section
    if let Some(section) = ini.section(Some("sink")) {
        if let Some(v) = non_empty(section, "flush_batch_size") {
            config.sink.flush_batch_size = parse_positive("sink", "flush_batch_size", v)?;
        }
    }

    // [errors] section
    if let Some(section) = ini.section(Some("errors")) {
        if let Some(v) = non_empty(section, "decode_policy") {
            config.errors.decode_policy =
                parse("errors", "decode_policy", v, "must be 'skip' or 'fail'")?;
        }
    }

    // [progress] section
    if let Some(section) = ini.section(Some("progress")) {
        if let Some(v) = non_empty(section, "interval") {
            config.progress.interval = parse(
                "progress",
                "interval",
                v,
                "must be a non-negative integer (0 disables progress lines)",
            )?;
        }
    }

    // [run] section
    if let Some(section) = ini.section(Some("run")) {
        if let Some(v) = non_empty(section, "timeout_secs") {
            config.run.timeout_secs = Some(parse(
                "run",
                "timeout_secs",
                v,
                "must be a non-negative integer (seconds)",
            )?);
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = non_empty(section, "directory") {
            config.logging.directory = expand_tilde(v);
        }
        if let Some(v) = non_empty(section, "file") {
            config.logging.file = v.to_string();
        }
    }

    Ok(config)
}

/// A trimmed value, treating blank values as absent.
fn non_empty<'a>(section: &'a Properties, key: &str) -> Option<&'a str> {
    section.get(key).map(str::trim).filter(|v| !v.is_empty())
}

fn parse<T: FromStr>(
    section: &str,
    key: &str,
    value: &str,
    reason: &str,
) -> Result<T, ConfigFileError> {
    value.parse().map_err(|_| ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    })
}

fn parse_positive(section: &str, key: &str, value: &str) -> Result<usize, ConfigFileError> {
    const REASON: &str = "must be a positive integer";
    match parse::<usize>(section, key, value, REASON)? {
        0 => Err(ConfigFileError::InvalidValue {
            section: section.to_string(),
            key: key.to_string(),
            value: value.to_string(),
            reason: REASON.to_string(),
        }),
        n => Ok(n),
    }
}

/// Expand a leading `~` to the user's home directory.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    } else if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

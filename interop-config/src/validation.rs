//! Custom validation functions for configuration.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashSet};

use interop_core::ScenarioId;
use validator::ValidationError;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

fn with_message(code: &'static str, message: String) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::Owned(message));
    error
}

fn check_scenario_id(id: &str) -> Result<(), ValidationError> {
    id.parse::<ScenarioId>()
        .map(|_| ())
        .map_err(|e| with_message("unknown_scenario", e.to_string()))
}

/// Every entry must name a catalog scenario.
pub fn validate_scenario_ids(ids: &[String]) -> Result<(), ValidationError> {
    ids.iter().try_for_each(|id| check_scenario_id(id))
}

/// Keys must name catalog scenarios; timeouts must be non-zero.
pub fn validate_scenario_timeouts(timeouts: &BTreeMap<String, u64>) -> Result<(), ValidationError> {
    for (id, secs) in timeouts {
        check_scenario_id(id)?;
        if *secs == 0 {
            return Err(with_message(
                "zero_timeout",
                format!("timeout for '{}' must be non-zero", id),
            ));
        }
    }
    Ok(())
}

/// Validate tracing log level.
pub fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    if LOG_LEVELS.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        Err(with_message(
            "invalid_log_level",
            format!("'{}' is not one of {}", level, LOG_LEVELS.join("/")),
        ))
    }
}

/// Implementation names appear in report rows and log file names.
pub fn validate_implementation_name(name: &str) -> Result<(), ValidationError> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.');
    if valid {
        Ok(())
    } else {
        Err(with_message(
            "invalid_name",
            format!("'{}' may only contain letters, digits, '-', '_' and '.'", name),
        ))
    }
}

/// Registered names must be unique within a registry.
pub fn validate_unique_names<'a>(
    names: impl IntoIterator<Item = &'a str>,
) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(with_message(
                "duplicate_name",
                format!("'{}' is registered twice", name),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_ids_must_be_in_the_catalog() {
        assert!(validate_scenario_ids(&["handshake".into(), "greeting".into()]).is_ok());
        let err = validate_scenario_ids(&["session_resumption".into()]).unwrap_err();
        assert_eq!(err.code, "unknown_scenario");
    }

    #[test]
    fn zero_timeouts_are_rejected() {
        let mut timeouts = BTreeMap::new();
        timeouts.insert("handshake".to_string(), 0);
        assert_eq!(
            validate_scenario_timeouts(&timeouts).unwrap_err().code,
            "zero_timeout"
        );
    }

    #[test]
    fn log_level_is_case_insensitive() {
        assert!(validate_log_level("DEBUG").is_ok());
        assert!(validate_log_level("verbose").is_err());
    }

    #[test]
    fn names_are_file_name_safe() {
        assert!(validate_implementation_name("s2n-tls").is_ok());
        assert!(validate_implementation_name("rustls_0.23").is_ok());
        assert!(validate_implementation_name("open ssl").is_err());
        assert!(validate_implementation_name("../bin").is_err());
    }

    #[test]
    fn duplicate_names_are_rejected() {
        assert!(validate_unique_names(["openssl", "rustls"]).is_ok());
        assert!(validate_unique_names(["openssl", "openssl"]).is_err());
    }
}

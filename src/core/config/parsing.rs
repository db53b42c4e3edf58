use std::env;

use super::types::{ConfigError, Environment, ExecutorBackend};

const DEFAULT_CORS_ORIGINS: &[&str] =
    &["http://localhost:5173", "http://localhost:3000", "http://localhost:8080"];

pub(super) fn env_optional(key: &str) -> Option<String> {
    env::var(key).ok().map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}

pub(super) fn env_or_default(key: &str, default: &str) -> String {
    env_optional(key).unwrap_or_else(|| default.to_string())
}

pub(super) fn parse_u16(field: &'static str, value: String) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidValue { field, value })
}

pub(super) fn parse_u64(field: &'static str, value: String) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidValue { field, value })
}

pub(super) fn parse_usize(field: &'static str, value: String) -> Result<usize, ConfigError> {
    value.parse::<usize>().map_err(|_| ConfigError::InvalidValue { field, value })
}

pub(super) fn parse_i32(field: &'static str, value: String) -> Result<i32, ConfigError> {
    value.parse::<i32>().map_err(|_| ConfigError::InvalidValue { field, value })
}

pub(super) fn parse_cors_origins(value: Option<String>) -> Result<Vec<String>, ConfigError> {
    let Some(raw) = value else {
        return Ok(default_cors_origins());
    };

    if raw.trim().is_empty() {
        return Ok(default_cors_origins());
    }

    if raw.trim_start().starts_with('[') {
        let parsed: Vec<String> =
            serde_json::from_str(&raw).map_err(|_| ConfigError::InvalidCors(raw.clone()))?;
        if parsed.is_empty() {
            return Ok(default_cors_origins());
        }
        return Ok(parsed);
    }

    let items: Vec<String> = raw
        .split(',')
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect();

    if items.is_empty() {
        return Ok(default_cors_origins());
    }

    Ok(items)
}

/// Comma separated, lowercased, first occurrence wins.
pub(super) fn parse_string_list(value: Option<String>, defaults: &[&str]) -> Vec<String> {
    let items: Vec<String> = match value {
        Some(raw) => raw
            .split(',')
            .map(|item| item.trim().to_ascii_lowercase())
            .filter(|item| !item.is_empty())
            .collect(),
        None => defaults.iter().map(|item| item.to_string()).collect(),
    };

    let mut unique = Vec::with_capacity(items.len());
    for item in items {
        if !unique.contains(&item) {
            unique.push(item);
        }
    }
    unique
}

pub(super) fn parse_bool(value: &str) -> bool {
    matches!(value, "1" | "true" | "TRUE" | "yes" | "YES" | "on" | "ON")
}

pub(super) fn parse_environment(value: Option<String>) -> Environment {
    match value.as_deref().map(|item| item.to_lowercase()) {
        Some(ref val) if val == "production" || val == "prod" => Environment::Production,
        Some(ref val) if val == "staging" => Environment::Staging,
        Some(ref val) if val == "test" || val == "testing" => Environment::Test,
        _ => Environment::Development,
    }
}

/// An explicit backend wins; otherwise a configured Lambda name beats a configured URL.
pub(super) fn parse_executor_backend(
    value: Option<String>,
    api_url: &str,
    lambda_name: &str,
) -> Result<ExecutorBackend, ConfigError> {
    match value.as_deref().map(|item| item.to_ascii_lowercase()) {
        Some(ref val) if val == "http" => Ok(ExecutorBackend::Http),
        Some(ref val) if val == "lambda" => Ok(ExecutorBackend::Lambda),
        Some(ref val) if val == "disabled" || val == "none" => Ok(ExecutorBackend::Disabled),
        Some(other) => {
            Err(ConfigError::InvalidValue { field: "EXECUTOR_BACKEND", value: other })
        }
        None if !lambda_name.is_empty() => Ok(ExecutorBackend::Lambda),
        None if !api_url.is_empty() => Ok(ExecutorBackend::Http),
        None => Ok(ExecutorBackend::Disabled),
    }
}

pub(super) fn is_valid_language_name(language: &str) -> bool {
    !language.is_empty()
        && language.len() <= 32
        && language.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '#' | '-' | '_'))
}

fn default_cors_origins() -> Vec<String> {
    DEFAULT_CORS_ORIGINS.iter().map(|item| item.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_cors_origins_json() {
        let raw = "[\"http://a\",\"http://b\"]".to_string();
        let parsed = parse_cors_origins(Some(raw)).expect("cors json");
        assert_eq!(parsed, vec!["http://a".to_string(), "http://b".to_string()]);
    }

    #[test]
    fn parse_cors_origins_csv() {
        let raw = "http://a, http://b".to_string();
        let parsed = parse_cors_origins(Some(raw)).expect("cors csv");
        assert_eq!(parsed, vec!["http://a".to_string(), "http://b".to_string()]);
    }

    #[test]
    fn parse_cors_origins_defaults_on_empty() {
        let parsed = parse_cors_origins(Some(" ".to_string())).expect("cors empty");
        assert_eq!(parsed, default_cors_origins());
    }

    #[test]
    fn parse_bool_variants() {
        assert!(parse_bool("1"));
        assert!(parse_bool("yes"));
        assert!(parse_bool("on"));
        assert!(!parse_bool("false"));
        assert!(!parse_bool("0"));
    }

    #[test]
    fn parse_environment_variants() {
        assert_eq!(parse_environment(Some("prod".to_string())), Environment::Production);
        assert_eq!(parse_environment(Some("staging".to_string())), Environment::Staging);
        assert_eq!(parse_environment(Some("testing".to_string())), Environment::Test);
        assert_eq!(parse_environment(None), Environment::Development);
    }

    #[test]
    fn string_list_is_lowercased_and_deduplicated() {
        let parsed = parse_string_list(Some("Python, cpp,python,,Java".to_string()), &[]);
        assert_eq!(parsed, vec!["python", "cpp", "java"]);
    }

    #[test]
    fn executor_backend_prefers_explicit_value() {
        assert_eq!(
            parse_executor_backend(Some("HTTP".to_string()), "", "grader").unwrap(),
            ExecutorBackend::Http
        );
        assert!(parse_executor_backend(Some("grpc".to_string()), "", "").is_err());
    }

    #[test]
    fn executor_backend_inferred_from_configured_targets() {
        assert_eq!(
            parse_executor_backend(None, "http://exec", "grader").unwrap(),
            ExecutorBackend::Lambda
        );
        assert_eq!(
            parse_executor_backend(None, "http://exec", "").unwrap(),
            ExecutorBackend::Http
        );
        assert_eq!(parse_executor_backend(None, "", "").unwrap(), ExecutorBackend::Disabled);
    }

    #[test]
    fn language_names() {
        assert!(is_valid_language_name("c++"));
        assert!(is_valid_language_name("csharp"));
        assert!(!is_valid_language_name("py thon"));
        assert!(!is_valid_language_name(""));
    }
}

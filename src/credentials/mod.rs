use std::io::IsTerminal;

use anyhow::{Context, Result};

use crate::error::ApiError;

/// Environment variable holding the API-Sports key
pub const ENV_API_KEY_VAR: &str = "API_SPORTS_KEY";

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Check for an API key in the API_SPORTS_KEY environment variable.
/// Returns Some(key) if the env var is set and non-empty, None otherwise.
pub fn get_key_from_env() -> Option<String> {
    non_empty(std::env::var(ENV_API_KEY_VAR).ok())
}

/// Prompts for the API-Sports key without echoing it
pub fn prompt_for_key() -> Result<String> {
    eprintln!("API-Sports key required (https://dashboard.api-football.com).");
    let key = rpassword::prompt_password("Enter API key: ").context("Failed to read API key from stdin")?;
    let key = key.trim();
    if key.is_empty() {
        anyhow::bail!("API key cannot be empty");
    }
    Ok(key.to_string())
}

/// Resolve the key from the command line, then the environment, then an
/// interactive prompt when stdin is a terminal.
pub fn resolve_api_key(flag: Option<String>) -> Result<String> {
    if let Some(key) = non_empty(flag).or_else(get_key_from_env) {
        return Ok(key);
    }
    if std::io::stdin().is_terminal() {
        return prompt_for_key();
    }
    Err(ApiError::MissingKey.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_wins() {
        let key = resolve_api_key(Some("  abc123  ".to_string())).unwrap();
        assert_eq!(key, "abc123");
    }

    #[test]
    fn test_blank_values_ignored() {
        assert_eq!(non_empty(Some("   ".to_string())), None);
        assert_eq!(non_empty(None), None);
        assert_eq!(non_empty(Some("k".to_string())), Some("k".to_string()));
    }
}

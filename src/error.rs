//! Error types shared across the crate.
//!
//! Library code returns these typed errors; the binary wraps them in
//! `anyhow` with context and maps them to exit codes.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Which pipeline a factor was requested for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactorKind {
    Spread,
    Total,
}

impl fmt::Display for FactorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FactorKind::Spread => write!(f, "spread"),
            FactorKind::Total => write!(f, "total"),
        }
    }
}

/// A factor name that is not present in the registry.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("factor '{name}' not found. Registered: [{}]", .registered.join(", "))]
pub struct FactorNotFound {
    pub name: String,
    pub registered: Vec<String>,
}

/// Fatal errors raised by the pricing core before any game is priced.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PricingError {
    /// Unknown factor name in `spread_factors` / `total_factors`.
    #[error("configuration error: unknown {kind} factor: {source}")]
    Configuration {
        kind: FactorKind,
        #[source]
        source: FactorNotFound,
    },

    /// A schedule row references a team with no rating.
    #[error("data integrity error: missing ratings for: {}", .missing.join(", "))]
    DataIntegrity { missing: Vec<String> },
}

/// Errors loading the ratings / schedule tables.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{table} missing required columns: {}", .missing.join(", "))]
    MissingColumns {
        table: &'static str,
        missing: Vec<String>,
    },

    #[error("{table} line {line}: invalid {column} value '{value}'")]
    InvalidValue {
        table: &'static str,
        line: usize,
        column: &'static str,
        value: String,
    },

    #[error("{table}: {source}")]
    Csv {
        table: &'static str,
        #[source]
        source: csv::Error,
    },
}

/// Errors from the week calendar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error("invalid week {0}: must be at least 1 and within the calendar")]
    InvalidWeek(u32),

    #[error("unknown season {0}: no week-1 anchor date is configured")]
    UnknownSeason(i32),
}

/// Errors from the API-Sports client.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("missing API key: pass --api-key or set API_SPORTS_KEY")]
    MissingKey,

    #[error("API returned HTTP {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected API payload: {0}")]
    Payload(String),

    #[error(transparent)]
    Schedule(#[from] ScheduleError),
}

impl ApiError {
    /// Rate limits, server errors and transport failures are worth another try.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Status { status, .. } => {
                *status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
            ApiError::Transport(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            ApiError::MissingKey | ApiError::Payload(_) | ApiError::Schedule(_) => false,
        }
    }
}

/// Errors from the Parquet week cache.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parquet error on {}: {source}", .path.display())]
    Parquet {
        path: PathBuf,
        #[source]
        source: parquet::errors::ParquetError,
    },

    #[error("no weekly parquet files found under {}", .0.display())]
    NoFiles(PathBuf),

    #[error("{}: missing required column '{column}' (tried {})", .path.display(), .tried.join(", "))]
    MissingColumn {
        path: PathBuf,
        column: &'static str,
        tried: Vec<String>,
    },

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Schedule(#[from] ScheduleError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factor_not_found_lists_registered() {
        let err = FactorNotFound {
            name: "nonexistent_factor".to_string(),
            registered: vec!["home_field".to_string(), "qb_adjust".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("'nonexistent_factor'"));
        assert!(msg.contains("[home_field, qb_adjust]"));
    }

    #[test]
    fn test_data_integrity_message() {
        let err = PricingError::DataIntegrity {
            missing: vec!["DAL".to_string(), "NYG".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "data integrity error: missing ratings for: DAL, NYG"
        );
    }

    #[test]
    fn test_status_retryable() {
        let rate_limited = ApiError::Status {
            status: reqwest::StatusCode::TOO_MANY_REQUESTS,
            body: String::new(),
        };
        let unauthorized = ApiError::Status {
            status: reqwest::StatusCode::UNAUTHORIZED,
            body: String::new(),
        };
        assert!(rate_limited.is_retryable());
        assert!(!unauthorized.is_retryable());
        assert!(!ApiError::MissingKey.is_retryable());
    }
}

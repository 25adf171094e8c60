//! Price NFL point spreads, totals and moneylines from team power ratings.
//!
//! The [`pricing`] module holds the model: a registry of named factors
//! composed into spread and total pipelines, and the conversion from a
//! spread to win probabilities and American odds. The remaining modules
//! feed it (CSV loaders, YAML config, the API-Sports week cache) and
//! present its output.

pub mod api;
pub mod cache;
pub mod config;
pub mod credentials;
pub mod error;
pub mod io;
pub mod logging;
pub mod output;
pub mod pricing;
pub mod schedule;

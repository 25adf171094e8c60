//! API-Sports American football client and payload normalization.

pub mod client;
pub mod types;

pub use client::{ApiSportsClient, ClientSettings, GameSource, DEFAULT_BASE_URL, DEFAULT_LEAGUE_ID};
pub use types::{normalize_game, sort_schedule, GameRecord, ScheduleRow};

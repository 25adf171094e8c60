//! Spread and total pricing: factor pipelines, odds conversion and the
//! engine that ties them to a schedule.

pub mod config;
pub mod context;
pub mod engine;
pub mod factors;
pub mod models;
pub mod odds;
pub mod params;
pub mod registry;
pub mod validation;

pub use config::ModelConfig;
pub use context::{team_key, FactorContext, Game, TeamRating};
pub use engine::{Engine, LineExplanation, LineOutput, Matchup};
pub use factors::{Factor, FactorDelta, HomeField, OffDefTotal, QbAdjust};
pub use models::{Composition, FactorContribution, SpreadModel, TotalModel};
pub use odds::{american_odds_from_prob, win_prob_from_spread};
pub use params::{Params, PipelineConfig};
pub use registry::{FactorFactory, FactorRegistry};
pub use validation::validate_model_config;

use serde::{Deserialize, Serialize};

/// Numeric parameters for one pricing run.
///
/// Shared read-only by every model and factor in the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Params {
    /// Points credited to the home side at a true home game.
    pub home_field_points: f64,
    /// Points credited to the nominal home side at a neutral site.
    pub neutral_home_field_points: f64,
    /// Multiplier on the quarterback point differential.
    pub qb_weight: f64,
    /// League-average combined score.
    pub league_total: f64,
    /// Per-team pace adjustment; counted once for each side.
    pub pace_points: f64,
    /// Standard deviation of the final home-minus-away margin.
    pub margin_sd: f64,
    /// Symmetric clamp on the spread. `None` disables clamping.
    pub spread_cap: Option<f64>,
    /// Whether `off_def_total` contributes anything.
    pub use_off_def_for_total: bool,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            home_field_points: 1.65,
            neutral_home_field_points: 0.0,
            qb_weight: 1.0,
            league_total: 44.0,
            pace_points: 0.0,
            margin_sd: 13.45,
            spread_cap: Some(30.0),
            use_off_def_for_total: true,
        }
    }
}

/// Which factors run in each pipeline, in application order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub spread_factors: Vec<String>,
    pub total_factors: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            spread_factors: vec!["home_field".to_string(), "qb_adjust".to_string()],
            total_factors: vec!["off_def_total".to_string()],
        }
    }
}

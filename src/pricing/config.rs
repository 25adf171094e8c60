use serde::{Deserialize, Serialize};

use super::params::{Params, PipelineConfig};

/// The only model implementation name accepted for `spread_model` and
/// `total_model`.
pub const DEFAULT_MODEL: &str = "default";

/// Model configuration as written in the YAML file.
///
/// Every key is optional; anything left out falls back to
/// [`Params::default`] / [`PipelineConfig::default`].
///
/// Example YAML:
/// ```yaml
/// home_field_points: 1.65
/// qb_weight: 1.0
/// margin_sd: 13.45
/// spread_cap: 30.0      # null disables the cap
/// spread_factors: [home_field, qb_adjust]
/// total_factors: [off_def_total]
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ModelConfig {
    #[serde(default)]
    pub home_field_points: Option<f64>,

    #[serde(default)]
    pub neutral_home_field_points: Option<f64>,

    #[serde(default)]
    pub qb_weight: Option<f64>,

    #[serde(default)]
    pub league_total: Option<f64>,

    /// Per-team pace points; the total model counts it for both sides.
    #[serde(default)]
    pub pace_points: Option<f64>,

    /// Standard deviation of the home-minus-away margin (default: 13.45)
    #[serde(default)]
    pub margin_sd: Option<f64>,

    /// Absent means 30.0; an explicit `null` turns clamping off.
    #[serde(default = "default_spread_cap")]
    pub spread_cap: Option<f64>,

    #[serde(default)]
    pub use_off_def_for_total: Option<bool>,

    /// Spread factor names in application order
    #[serde(default)]
    pub spread_factors: Option<Vec<String>>,

    /// Total factor names in application order
    #[serde(default)]
    pub total_factors: Option<Vec<String>>,

    #[serde(default)]
    pub spread_model: Option<String>,

    #[serde(default)]
    pub total_model: Option<String>,
}

fn default_spread_cap() -> Option<f64> {
    Params::default().spread_cap
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self::from_parts(&Params::default(), &PipelineConfig::default())
    }
}

impl ModelConfig {
    /// Fully-populated config for the given parameters.
    pub fn from_parts(params: &Params, pipeline: &PipelineConfig) -> Self {
        Self {
            home_field_points: Some(params.home_field_points),
            neutral_home_field_points: Some(params.neutral_home_field_points),
            qb_weight: Some(params.qb_weight),
            league_total: Some(params.league_total),
            pace_points: Some(params.pace_points),
            margin_sd: Some(params.margin_sd),
            spread_cap: params.spread_cap,
            use_off_def_for_total: Some(params.use_off_def_for_total),
            spread_factors: Some(pipeline.spread_factors.clone()),
            total_factors: Some(pipeline.total_factors.clone()),
            spread_model: Some(DEFAULT_MODEL.to_string()),
            total_model: Some(DEFAULT_MODEL.to_string()),
        }
    }

    pub fn params(&self) -> Params {
        let d = Params::default();
        Params {
            home_field_points: self.home_field_points.unwrap_or(d.home_field_points),
            neutral_home_field_points: self
                .neutral_home_field_points
                .unwrap_or(d.neutral_home_field_points),
            qb_weight: self.qb_weight.unwrap_or(d.qb_weight),
            league_total: self.league_total.unwrap_or(d.league_total),
            pace_points: self.pace_points.unwrap_or(d.pace_points),
            margin_sd: self.margin_sd.unwrap_or(d.margin_sd),
            spread_cap: self.spread_cap,
            use_off_def_for_total: self.use_off_def_for_total.unwrap_or(d.use_off_def_for_total),
        }
    }

    pub fn pipeline(&self) -> PipelineConfig {
        let d = PipelineConfig::default();
        PipelineConfig {
            spread_factors: self.spread_factors.clone().unwrap_or(d.spread_factors),
            total_factors: self.total_factors.clone().unwrap_or(d.total_factors),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_yaml_gives_defaults() {
        let config: ModelConfig = serde_saphyr::from_str("{}").unwrap();
        assert_eq!(config.params(), Params::default());
        assert_eq!(config.pipeline(), PipelineConfig::default());
    }

    #[test]
    fn test_partial_override() {
        let yaml = r#"
home_field_points: 2.5
qb_weight: 0.8
spread_factors: [qb_adjust]
"#;
        let config: ModelConfig = serde_saphyr::from_str(yaml).unwrap();
        let params = config.params();
        assert_eq!(params.home_field_points, 2.5);
        assert_eq!(params.qb_weight, 0.8);
        assert_eq!(params.margin_sd, 13.45);
        assert_eq!(config.pipeline().spread_factors, vec!["qb_adjust"]);
        assert_eq!(config.pipeline().total_factors, vec!["off_def_total"]);
    }

    #[test]
    fn test_spread_cap_absent_vs_null() {
        let absent: ModelConfig = serde_saphyr::from_str("qb_weight: 1.0\n").unwrap();
        assert_eq!(absent.params().spread_cap, Some(30.0));

        let null: ModelConfig = serde_saphyr::from_str("spread_cap: null\n").unwrap();
        assert_eq!(null.params().spread_cap, None);

        let set: ModelConfig = serde_saphyr::from_str("spread_cap: 21\n").unwrap();
        assert_eq!(set.params().spread_cap, Some(21.0));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let result: Result<ModelConfig, _> = serde_saphyr::from_str("home_feild_points: 2.0\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_default_round_trips_through_yaml() {
        let config = ModelConfig::default();
        let yaml = serde_saphyr::to_string(&config).unwrap();
        let parsed: ModelConfig = serde_saphyr::from_str(&yaml).unwrap();
        assert_eq!(parsed, config);
    }
}

use super::config::{ModelConfig, DEFAULT_MODEL};
use super::registry::FactorRegistry;

/// Validate a model configuration before any engine is built.
/// Returns all validation errors at once (not just the first).
pub fn validate_model_config(
    config: &ModelConfig,
    registry: &FactorRegistry,
) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    if let Some(sd) = config.margin_sd {
        if !(sd.is_finite() && sd > 0.0) {
            errors.push(format!("margin_sd: must be a positive number (got {})", sd));
        }
    }

    if let Some(cap) = config.spread_cap {
        if !(cap.is_finite() && cap > 0.0) {
            errors.push(format!(
                "spread_cap: must be positive, or null to disable (got {})",
                cap
            ));
        }
    }

    if let Some(total) = config.league_total {
        if !(total.is_finite() && total >= 0.0) {
            errors.push(format!("league_total: must be non-negative (got {})", total));
        }
    }

    let numeric = [
        ("home_field_points", config.home_field_points),
        ("neutral_home_field_points", config.neutral_home_field_points),
        ("qb_weight", config.qb_weight),
        ("pace_points", config.pace_points),
    ];
    for (key, value) in numeric {
        if let Some(v) = value {
            if !v.is_finite() {
                errors.push(format!("{}: must be a finite number (got {})", key, v));
            }
        }
    }

    let pipelines = [
        ("spread_factors", config.spread_factors.as_deref()),
        ("total_factors", config.total_factors.as_deref()),
    ];
    for (key, names) in pipelines {
        for (i, name) in names.unwrap_or_default().iter().enumerate() {
            if !registry.contains(name) {
                errors.push(format!(
                    "{}[{}]: unknown factor '{}' (registered: {})",
                    key,
                    i,
                    name,
                    registry.names().join(", ")
                ));
            }
        }
    }

    let models = [
        ("spread_model", config.spread_model.as_deref()),
        ("total_model", config.total_model.as_deref()),
    ];
    for (key, model) in models {
        if let Some(model) = model {
            if model != DEFAULT_MODEL {
                errors.push(format!(
                    "{}: unsupported model '{}' (only '{}' is available)",
                    key, model, DEFAULT_MODEL
                ));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty() -> ModelConfig {
        serde_saphyr::from_str("{}").unwrap()
    }

    #[test]
    fn test_default_config_is_valid() {
        let registry = FactorRegistry::with_builtin();
        assert!(validate_model_config(&ModelConfig::default(), &registry).is_ok());
        assert!(validate_model_config(&empty(), &registry).is_ok());
    }

    #[test]
    fn test_non_positive_margin_sd() {
        let config = ModelConfig {
            margin_sd: Some(0.0),
            ..empty()
        };
        let errors = validate_model_config(&config, &FactorRegistry::with_builtin()).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("margin_sd"));
    }

    #[test]
    fn test_null_spread_cap_is_valid() {
        let config = ModelConfig {
            spread_cap: None,
            ..empty()
        };
        assert!(validate_model_config(&config, &FactorRegistry::with_builtin()).is_ok());
    }

    #[test]
    fn test_unknown_factor_names_indexed() {
        let config = ModelConfig {
            spread_factors: Some(vec!["home_field".to_string(), "nonexistent_factor".to_string()]),
            total_factors: Some(vec!["pace_boost".to_string()]),
            ..empty()
        };
        let errors = validate_model_config(&config, &FactorRegistry::with_builtin()).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains("spread_factors[1]"));
        assert!(errors[0].contains("'nonexistent_factor'"));
        assert!(errors[0].contains("home_field, off_def_total, qb_adjust"));
        assert!(errors[1].contains("total_factors[0]"));
    }

    #[test]
    fn test_collects_all_errors() {
        let config = ModelConfig {
            margin_sd: Some(-1.0),
            spread_cap: Some(0.0),
            league_total: Some(-3.0),
            qb_weight: Some(f64::NAN),
            spread_model: Some("elo".to_string()),
            ..empty()
        };
        let errors = validate_model_config(&config, &FactorRegistry::with_builtin()).unwrap_err();
        assert_eq!(errors.len(), 5);
        assert!(errors.iter().any(|e| e.starts_with("spread_model")));
        assert!(errors.iter().any(|e| e.starts_with("qb_weight")));
    }
}

use anyhow::{Context, Result};
use std::io::{BufRead, Write};
use std::path::PathBuf;

use crate::config::{get_config_path, save_config};
use crate::pricing::{validate_model_config, FactorRegistry, ModelConfig, Params, PipelineConfig};

/// Prompt user with a message and return their trimmed input.
fn prompt(message: &str) -> Result<String> {
    print!("{}", message);
    std::io::stdout()
        .flush()
        .context("Failed to flush stdout")?;
    let mut input = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut input)
        .context("Failed to read input")?;
    Ok(input.trim().to_string())
}

/// Prompt user with a message and a default value. Returns default if input is empty.
fn prompt_with_default(message: &str, default: &str) -> Result<String> {
    let input = prompt(&format!("{} [{}]: ", message, default))?;
    if input.is_empty() {
        Ok(default.to_string())
    } else {
        Ok(input)
    }
}

/// Prompt user with a yes/no question. Returns bool based on input and default.
fn prompt_yes_no(message: &str, default_yes: bool) -> Result<bool> {
    let hint = if default_yes { "Y/n" } else { "y/N" };
    let input = prompt(&format!("{} [{}]: ", message, hint))?;
    let input = input.to_lowercase();
    if input.is_empty() {
        Ok(default_yes)
    } else {
        Ok(input == "y" || input == "yes")
    }
}

/// Keep asking until the input parses as a number accepted by `check`.
fn prompt_number(message: &str, default: f64, check: impl Fn(f64) -> Result<(), String>) -> Result<f64> {
    loop {
        let input = prompt_with_default(message, &default.to_string())?;
        match input.parse::<f64>() {
            Ok(v) if v.is_finite() => match check(v) {
                Ok(()) => return Ok(v),
                Err(e) => println!("  Invalid: {}. Try again.", e),
            },
            _ => println!("  Invalid: must be a number. Try again."),
        }
    }
}

fn any_number(_: f64) -> Result<(), String> {
    Ok(())
}

/// Parse a comma-separated factor list, rejecting unregistered names.
fn parse_factor_list(input: &str, registry: &FactorRegistry) -> Result<Vec<String>, String> {
    let names: Vec<String> = input
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty() && *s != "none")
        .map(String::from)
        .collect();
    let unknown: Vec<&str> = names
        .iter()
        .filter(|n| !registry.contains(n))
        .map(String::as_str)
        .collect();
    if unknown.is_empty() {
        Ok(names)
    } else {
        Err(format!(
            "unknown factor(s) {}; registered: {}",
            unknown.join(", "),
            registry.names().join(", ")
        ))
    }
}

fn prompt_factors(message: &str, default: &[String], registry: &FactorRegistry) -> Result<Vec<String>> {
    let default = if default.is_empty() {
        "none".to_string()
    } else {
        default.join(", ")
    };
    loop {
        let input = prompt_with_default(message, &default)?;
        match parse_factor_list(&input, registry) {
            Ok(names) => return Ok(names),
            Err(e) => println!("  Invalid: {}. Try again.", e),
        }
    }
}

fn prompt_model_config(registry: &FactorRegistry) -> Result<ModelConfig> {
    let d = Params::default();
    let dp = PipelineConfig::default();

    println!();
    println!("Spread model: power difference plus spread factors, in order.");
    let home_field_points = prompt_number("Home-field points", d.home_field_points, any_number)?;
    let neutral_home_field_points = prompt_number(
        "Home-field points at a neutral site",
        d.neutral_home_field_points,
        any_number,
    )?;
    let qb_weight = prompt_number("QB differential weight", d.qb_weight, any_number)?;
    let spread_cap = loop {
        let input = prompt_with_default(
            "Spread cap ('none' to disable)",
            &d.spread_cap.map_or("none".to_string(), |c| c.to_string()),
        )?;
        if input.eq_ignore_ascii_case("none") {
            break None;
        }
        match input.parse::<f64>() {
            Ok(v) if v.is_finite() && v > 0.0 => break Some(v),
            _ => println!("  Invalid: must be a positive number or 'none'. Try again."),
        }
    };
    println!("Registered factors: {}", registry.names().join(", "));
    let spread_factors = prompt_factors("Spread factors (comma-separated)", &dp.spread_factors, registry)?;

    println!();
    println!("Total model: league total plus pace for both sides plus total factors.");
    let league_total = prompt_number("League-average total", d.league_total, |v| {
        if v >= 0.0 {
            Ok(())
        } else {
            Err("must be non-negative".to_string())
        }
    })?;
    let pace_points = prompt_number("Pace points per team", d.pace_points, any_number)?;
    let use_off_def_for_total =
        prompt_yes_no("Use offense/defense ratings for the total?", d.use_off_def_for_total)?;
    let total_factors = prompt_factors("Total factors (comma-separated)", &dp.total_factors, registry)?;

    println!();
    println!("Win probabilities treat the final margin as normal around the spread.");
    let margin_sd = prompt_number("Margin standard deviation", d.margin_sd, |v| {
        if v > 0.0 {
            Ok(())
        } else {
            Err("must be positive".to_string())
        }
    })?;

    let params = Params {
        home_field_points,
        neutral_home_field_points,
        qb_weight,
        league_total,
        pace_points,
        margin_sd,
        spread_cap,
        use_off_def_for_total,
    };
    let pipeline = PipelineConfig {
        spread_factors,
        total_factors,
    };
    Ok(ModelConfig::from_parts(&params, &pipeline))
}

/// Run the interactive init wizard to create a config file.
///
/// With `accept_defaults` no questions are asked: the default model is
/// written to `default_path` (or the standard location), replacing any
/// existing file.
pub fn run_init_wizard(default_path: Option<PathBuf>, accept_defaults: bool) -> Result<()> {
    let registry = FactorRegistry::with_builtin();
    let default_config_path = match default_path {
        Some(p) => p,
        None => get_config_path()?,
    };

    if accept_defaults {
        save_config(&default_config_path, &ModelConfig::default())?;
        println!("Config written to {}", default_config_path.display());
        return Ok(());
    }

    println!();
    println!("NFL Lines Model Configuration");
    println!("=============================");

    let configure = prompt_yes_no("Configure model parameters? (n accepts defaults)", true)?;
    let config = if configure {
        prompt_model_config(&registry)?
    } else {
        ModelConfig::default()
    };

    if let Err(errors) = validate_model_config(&config, &registry) {
        anyhow::bail!("Configuration is invalid:\n  {}", errors.join("\n  "));
    }

    println!();
    let path_str = prompt_with_default(
        "Where should the config be saved?",
        &default_config_path.display().to_string(),
    )?;
    let config_path = PathBuf::from(&path_str);

    if config_path.exists() {
        let overwrite = prompt_yes_no(
            &format!(
                "Config already exists at {}. Overwrite?",
                config_path.display()
            ),
            false,
        )?;
        if !overwrite {
            println!("Aborted.");
            return Ok(());
        }
    }

    save_config(&config_path, &config)?;

    println!();
    println!("Config written to {}", config_path.display());
    println!("Run `nfl-lines price --ratings <csv> --schedule <csv>` to price a slate.");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_factor_list() {
        let registry = FactorRegistry::with_builtin();
        assert_eq!(
            parse_factor_list(" home_field ,qb_adjust", &registry).unwrap(),
            vec!["home_field", "qb_adjust"]
        );
        assert!(parse_factor_list("none", &registry).unwrap().is_empty());
        assert!(parse_factor_list("", &registry).unwrap().is_empty());
    }

    #[test]
    fn test_parse_factor_list_unknown() {
        let registry = FactorRegistry::with_builtin();
        let err = parse_factor_list("home_field, wind", &registry).unwrap_err();
        assert!(err.contains("wind"));
        assert!(err.contains("qb_adjust"));
    }
}

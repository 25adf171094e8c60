mod init;

pub use init::run_init_wizard;

use anyhow::{Context, Result};
use atomic_write_file::AtomicWriteFile;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::pricing::ModelConfig;

/// Get the config directory path (~/.config/nfl-lines/)
pub fn get_config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".config").join("nfl-lines"))
}

/// Get the default config file path (~/.config/nfl-lines/config.yaml)
pub fn get_config_path() -> Result<PathBuf> {
    Ok(get_config_dir()?.join("config.yaml"))
}

/// Load the model configuration.
///
/// An explicit `path` must exist. Without one the default location is tried,
/// and a missing default file yields [`ModelConfig::default`].
///
/// # Errors
///
/// Returns an error if:
/// - An explicitly given config file does not exist
/// - The config file cannot be read
/// - The YAML cannot be parsed or contains unknown keys
pub fn load_config(path: Option<&Path>) -> Result<ModelConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                anyhow::bail!("Config file not found at {}", p.display());
            }
            p.to_path_buf()
        }
        None => {
            let default_path = get_config_path()?;
            if !default_path.exists() {
                debug!(path = %default_path.display(), "no config file, using defaults");
                return Ok(ModelConfig::default());
            }
            default_path
        }
    };

    let config_content = fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read config file at {}", config_path.display()))?;

    let config: ModelConfig = serde_saphyr::from_str(&config_content)
        .with_context(|| format!("Failed to parse config: invalid YAML in {}", config_path.display()))?;

    debug!(path = %config_path.display(), "loaded model config");
    Ok(config)
}

/// Write the model configuration atomically, creating parent directories.
pub fn save_config(path: &Path, config: &ModelConfig) -> Result<()> {
    let yaml = serde_saphyr::to_string(config)
        .map_err(|e| anyhow::anyhow!("Failed to serialize config: {}", e))?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
    }

    let mut file = AtomicWriteFile::open(path)
        .with_context(|| format!("Failed to open atomic write file at {}", path.display()))?;
    file.write_all(yaml.as_bytes())
        .with_context(|| format!("Failed to write config to {}", path.display()))?;
    file.commit()
        .with_context(|| format!("Failed to save config to {}", path.display()))?;
    Ok(())
}

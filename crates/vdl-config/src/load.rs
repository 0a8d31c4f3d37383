use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::ConfigError;
use crate::merge::merge_configs;
use crate::validate::validate;

/// Directory holding per-project overrides.
const PROJECT_DIR: &str = ".vdlview";

/// Load configuration from disk.
///
/// Merges `Config::default() <- config_dir/config.toml <-
/// .vdlview/config.toml` (the nearest one at or above `project_dir`) and
/// validates the result. Missing files are skipped.
///
/// # Errors
///
/// Returns [`ConfigError`] on I/O failure, parse failure, or the first
/// validation failure.
pub fn load_config(config_dir: &Path, project_dir: Option<&Path>) -> Result<Config, ConfigError> {
    let mut config = Config::default();

    let global_path = config_dir.join("config.toml");
    if global_path.is_file() {
        let content = std::fs::read_to_string(&global_path)?;
        config = merge_configs(&config, &content)?;
        tracing::debug!("merged global config {}", global_path.display());
    }

    if let Some(project_path) = project_dir.and_then(find_project_config) {
        let content = std::fs::read_to_string(&project_path)?;
        config = merge_configs(&config, &content)?;
        tracing::debug!("merged project config {}", project_path.display());
    }

    check(&config)?;
    Ok(config)
}

/// The platform config directory for vdlview (`~/.config/vdlview` on
/// Linux), or `None` when the platform has none.
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("vdlview"))
}

fn check(config: &Config) -> Result<(), ConfigError> {
    validate(config).map_err(|errors| {
        for extra in errors.iter().skip(1) {
            tracing::warn!("{extra}");
        }
        errors
            .into_iter()
            .next()
            .unwrap_or_else(|| ConfigError::Validation {
                field: "unknown".to_string(),
                message: "validation failed".to_string(),
            })
    })
}

/// Walk from `start` upward looking for `.vdlview/config.toml`.
fn find_project_config(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(PROJECT_DIR).join("config.toml"))
        .find(|candidate| candidate.is_file())
}

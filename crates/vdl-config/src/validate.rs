use crate::config::Config;
use crate::error::ConfigError;

/// Validate a [`Config`], returning every violation found.
pub fn validate(config: &Config) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if let Some(file) = &config.log.file {
        if file.as_os_str().is_empty() {
            errors.push(ConfigError::Validation {
                field: "log.file".to_string(),
                message: "must not be empty".to_string(),
            });
        } else if file.file_name().is_none() {
            errors.push(ConfigError::Validation {
                field: "log.file".to_string(),
                message: format!("must name a file, got {}", file.display()),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

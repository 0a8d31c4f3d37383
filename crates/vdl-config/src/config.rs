use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Log verbosity level.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive understood by `tracing_subscriber::EnvFilter`.
    pub fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default)]
    pub level: LogLevel,
    /// Write logs here instead of stderr.
    pub file: Option<PathBuf>,
}

/// Options sent with every pointer chase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChaseConfig {
    /// Show members inherited from base classes.
    #[serde(default)]
    pub inherited_members: bool,
    /// Show the target using its dynamic type.
    #[serde(default)]
    pub dynamic_type: bool,
}

/// Tree presentation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeConfig {
    /// Shorten scoped names of dereferenced pointer targets.
    #[serde(default = "default_true")]
    pub clean_pointer_names: bool,
}

fn default_true() -> bool {
    true
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            clean_pointer_names: true,
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub chase: ChaseConfig,
    #[serde(default)]
    pub tree: TreeConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let cfg = Config::default();
        assert_eq!(cfg.log.level, LogLevel::Info);
        assert!(cfg.log.file.is_none());
        assert!(!cfg.chase.inherited_members);
        assert!(!cfg.chase.dynamic_type);
        assert!(cfg.tree.clean_pointer_names);
    }

    #[test]
    fn parse_from_toml_string() {
        let input = r#"
[log]
level = "debug"

[chase]
dynamic_type = true
"#;
        let cfg: Config = toml::from_str(input).expect("parse toml");
        assert_eq!(cfg.log.level, LogLevel::Debug);
        assert!(cfg.chase.dynamic_type);
        // Unspecified fields keep defaults via serde(default)
        assert!(!cfg.chase.inherited_members);
        assert!(cfg.tree.clean_pointer_names);
    }

    #[test]
    fn serde_roundtrip_preserves_values() {
        let cfg = Config {
            log: LogConfig {
                level: LogLevel::Trace,
                file: Some(PathBuf::from("/tmp/vdlview.log")),
            },
            chase: ChaseConfig {
                inherited_members: true,
                dynamic_type: true,
            },
            tree: TreeConfig {
                clean_pointer_names: false,
            },
        };
        let toml_str = toml::to_string(&cfg).expect("serialize");
        let back: Config = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(cfg, back);
    }

    #[test]
    fn empty_toml_gives_defaults() {
        let cfg: Config = toml::from_str("").expect("parse empty toml");
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn log_level_filters() {
        assert_eq!(LogLevel::Warn.as_filter(), "warn");
        assert_eq!(LogLevel::default().as_filter(), "info");
    }
}

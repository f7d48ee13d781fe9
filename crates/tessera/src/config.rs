//! Configuration file loading for tessera.
//!
//! Reads `tessera.config.json` from the current working directory.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "tessera.config.json";

/// Top-level tessera configuration.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct TesseraConfig {
    /// JSON Schema reference (for editor autocompletion).
    #[serde(rename = "$schema", default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    /// Partial files registered before any template renders, keyed by the
    /// name used in `{{>name}}`.
    ///
    /// Relative paths resolve against the directory holding the config file.
    #[serde(default)]
    pub partials: BTreeMap<String, PathBuf>,

    /// Default log level (`error`, `warn`, `info`, `debug`, `trace`).
    #[serde(default, rename = "logLevel", skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    /// Configuration for the `check` command.
    #[serde(default)]
    pub check: CheckConfig,

    #[serde(skip)]
    pub base: PathBuf,
}

/// Configuration for the `check` command.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct CheckConfig {
    /// Fail when any template produces a warning.
    #[serde(default, rename = "warningsAsErrors")]
    pub warnings_as_errors: bool,
}

impl TesseraConfig {
    /// Configured log level, `warn` when unset or unrecognised.
    pub fn log_level(&self) -> tracing::Level {
        self.log_level
            .as_deref()
            .and_then(|level| level.parse().ok())
            .unwrap_or(tracing::Level::WARN)
    }

    /// Configured partials with paths resolved against the config directory.
    pub fn partial_paths(&self) -> impl Iterator<Item = (&str, PathBuf)> + '_ {
        self.partials
            .iter()
            .map(|(name, path)| (name.as_str(), self.base.join(path)))
    }
}

/// Load `tessera.config.json` from the given directory (or CWD if None).
pub fn load_config(dir: Option<&Path>) -> TesseraConfig {
    let base = dir
        .map(|d| d.to_path_buf())
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_default());
    let config_path = base.join(CONFIG_FILE);

    if !config_path.exists() {
        return TesseraConfig {
            base,
            ..Default::default()
        };
    }

    let config = match std::fs::read_to_string(&config_path) {
        Ok(content) => match serde_json::from_str(&content) {
            Ok(config) => config,
            Err(e) => {
                eprintln!(
                    "\x1b[33mWarning:\x1b[0m Failed to parse {}: {}",
                    config_path.display(),
                    e
                );
                TesseraConfig::default()
            }
        },
        Err(e) => {
            eprintln!(
                "\x1b[33mWarning:\x1b[0m Failed to read {}: {}",
                config_path.display(),
                e
            );
            TesseraConfig::default()
        }
    };

    TesseraConfig { base, ..config }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let config: TesseraConfig = serde_json::from_str(
            r#"{
                "partials": { "footer": "partials/footer.stache" },
                "logLevel": "debug",
                "check": { "warningsAsErrors": true }
            }"#,
        )
        .unwrap();
        assert_eq!(config.log_level(), tracing::Level::DEBUG);
        assert!(config.check.warnings_as_errors);
        assert_eq!(
            config.partials.get("footer"),
            Some(&PathBuf::from("partials/footer.stache"))
        );
    }

    #[test]
    fn test_defaults() {
        let config: TesseraConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.log_level(), tracing::Level::WARN);
        assert!(!config.check.warnings_as_errors);
        assert!(config.partials.is_empty());
    }

    #[test]
    fn test_unknown_level_falls_back() {
        let config = TesseraConfig {
            log_level: Some("loud".into()),
            ..Default::default()
        };
        assert_eq!(config.log_level(), tracing::Level::WARN);
    }

    #[test]
    fn test_partial_paths_resolve_against_base() {
        let mut config = TesseraConfig {
            base: PathBuf::from("/site"),
            ..Default::default()
        };
        config.partials.insert("nav".into(), PathBuf::from("nav.stache"));
        let paths: Vec<_> = config.partial_paths().collect();
        assert_eq!(paths, vec![("nav", PathBuf::from("/site/nav.stache"))]);
    }

    #[test]
    fn test_missing_config_is_default() {
        let dir = std::env::temp_dir().join("tessera-config-test-missing");
        let config = load_config(Some(&dir));
        assert!(config.partials.is_empty());
        assert_eq!(config.base, dir);
    }
}

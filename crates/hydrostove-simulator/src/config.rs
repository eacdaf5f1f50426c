//! Loading the monitor configuration from a TOML file

use std::path::{Path, PathBuf};

use hydrostove_core::MonitorConfig;
use log::{info, warn};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("TOML parse error in '{path}': {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Load the configuration. A missing file gives the defaults; every field
/// absent from the file keeps its default value.
pub fn load(path: impl AsRef<Path>) -> Result<MonitorConfig, ConfigError> {
    let path = path.as_ref();
    if !path.exists() {
        warn!(
            "Config file not found at '{}'; using defaults",
            path.display()
        );
        return Ok(MonitorConfig::default());
    }

    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let config = parse(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    info!("Loaded configuration from '{}'", path.display());
    Ok(config)
}

fn parse(raw: &str) -> Result<MonitorConfig, toml::de::Error> {
    toml::from_str(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_is_default() {
        assert_eq!(parse("").unwrap(), MonitorConfig::default());
    }

    #[test]
    fn test_partial_override() {
        let config = parse(
            r#"
            outlet_series_ohms = 4700.0

            [warning]
            max_outlet_c = 90.0

            [timing]
            history_period_ms = 1000
            "#,
        )
        .unwrap();

        assert_eq!(config.outlet_series_ohms, 4700.0);
        assert_eq!(config.warning.max_outlet_c, 90.0);
        assert_eq!(config.warning.min_flow_lpm, 0.5);
        assert_eq!(config.timing.history_period_ms, 1000);
        assert_eq!(config.timing.flow_period_ms, 1000);
        assert_eq!(config.inlet_series_ohms, 10_000.0);
    }

    #[test]
    fn test_wrong_type_is_an_error() {
        assert!(parse("[timing]\nflow_period_ms = \"fast\"").is_err());
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let config = load("/nonexistent/hydrostove.toml").unwrap();
        assert_eq!(config, MonitorConfig::default());
    }
}

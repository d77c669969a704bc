//! Configuration Loader - File Loading and Validation
//!
//! Handles loading `config.toml`, validating all parameters,
//! and providing clear error messages for misconfiguration.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use super::AppConfig;

/// Load and validate configuration from a TOML file.
///
/// # Errors
/// Returns detailed error if:
/// - File doesn't exist or can't be read
/// - TOML parsing fails
/// - Validation rules are violated
pub fn load_config(path: &str) -> Result<AppConfig> {
  let path = Path::new(path);

  let content = std::fs::read_to_string(path)
    .with_context(|| format!("Failed to read config file: {}", path.display()))?;

  let config = parse_config(&content)
    .with_context(|| format!("Invalid configuration in {}", path.display()))?;

  info!(
    path = %path.display(),
    user = %config.probe.user,
    database = %config.probe.database,
    metrics_port = config.metrics.port,
    "Configuration loaded successfully"
  );

  Ok(config)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<AppConfig> {
  let config: AppConfig = toml::from_str(content)
    .with_context(|| "Failed to parse config.toml")?;

  validate_config(&config)?;
  Ok(config)
}

/// Validate all configuration parameters.
///
/// The probe interval is not validated here: bad values
/// degrade to the default with a warning instead of aborting startup.
fn validate_config(config: &AppConfig) -> Result<()> {
  // Probe validation
  anyhow::ensure!(
    !config.probe.user.trim().is_empty(),
    "probe.user must not be empty"
  );
  anyhow::ensure!(
    !config.probe.database.trim().is_empty(),
    "probe.database must not be empty"
  );
  anyhow::ensure!(
    config.probe.init_attempts > 0,
    "probe.init_attempts must be at least 1, got {}",
    config.probe.init_attempts
  );
  anyhow::ensure!(
    config.probe.stop_grace_ms > 0,
    "probe.stop_grace_ms must be positive"
  );

  // Metrics validation
  anyhow::ensure!(
    !config.metrics.bind_host.is_empty(),
    "metrics.bind_host must not be empty"
  );

  // Engine endpoint validation
  anyhow::ensure!(
    config.authz.base_url.starts_with("http://")
      || config.authz.base_url.starts_with("https://"),
    "authz.base_url must be an http(s) URL, got `{}`",
    config.authz.base_url
  );
  anyhow::ensure!(
    config.authz.timeout_ms > 0,
    "authz.timeout_ms must be positive"
  );

  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::time::Duration;

  use crate::config::{RawInterval, resolve_interval};

  #[test]
  fn test_load_nonexistent_file() {
    let result = load_config("nonexistent.toml");
    assert!(result.is_err());
  }

  #[test]
  fn test_empty_document_uses_defaults() {
    let config = parse_config("").unwrap();
    assert_eq!(config.metrics.port, 6085);
    assert_eq!(config.probe.init_attempts, 3);
    assert!(config.probe.interval_seconds.is_none());
  }

  #[test]
  fn test_full_document() {
    let config = parse_config(
      r#"
      [monitor]
      log_level = "debug"

      [probe]
      user = "svc_probe"
      groups = ["monitoring"]
      database = "sales"
      table = "orders"
      interval_seconds = 30

      [metrics]
      port = 9185

      [authz]
      base_url = "https://engine.internal:6182"
      "#,
    )
    .unwrap();

    assert_eq!(config.monitor.log_level, "debug");
    assert_eq!(config.probe.groups, vec!["monitoring".to_string()]);
    assert_eq!(config.probe.interval_seconds, Some(RawInterval::Seconds(30)));
    assert_eq!(config.metrics.bind_address(), "0.0.0.0:9185");
  }

  #[test]
  fn test_textual_interval_is_accepted_for_later_fallback() {
    let config = parse_config("[probe]\ninterval_seconds = \"often\"\n").unwrap();
    assert_eq!(
      config.probe.interval_seconds,
      Some(RawInterval::Text("often".to_string()))
    );
  }

  #[test]
  fn test_non_integer_interval_values_fall_back_to_default() {
    for document in [
      "[probe]\ninterval_seconds = 1.5\n",
      "[probe]\ninterval_seconds = true\n",
      "[probe]\ninterval_seconds = [30]\n",
    ] {
      let config = parse_config(document).unwrap();
      assert!(
        matches!(config.probe.interval_seconds, Some(RawInterval::Other(_))),
        "{document}"
      );
      assert_eq!(
        resolve_interval(config.probe.interval_seconds.as_ref()),
        Duration::from_secs(60)
      );
    }
  }

  #[test]
  fn test_blank_database_rejected() {
    let err = parse_config("[probe]\ndatabase = \"  \"\n").unwrap_err();
    assert!(format!("{err:#}").contains("probe.database"));
  }

  #[test]
  fn test_non_http_base_url_rejected() {
    assert!(parse_config("[authz]\nbase_url = \"engine:6080\"\n").is_err());
  }
}

use std::path::Path;

use regex::Regex;
use tracing::warn;

use crate::errors::HawxError;
use super::schema::CONFIG_SCHEMA;
use super::types::{HawxConfig, MAX_STEPS};

pub async fn parse_config(path: &Path) -> Result<HawxConfig, HawxError> {
    if !path.exists() {
        return Err(HawxError::Config(format!("Config file not found: {}", path.display())));
    }

    let metadata = tokio::fs::metadata(path).await?;
    if metadata.len() > 1_048_576 {
        return Err(HawxError::Config("Config file exceeds 1MB limit".into()));
    }

    let content = tokio::fs::read_to_string(path).await?;
    parse_config_str(&content)
}

pub fn parse_config_str(content: &str) -> Result<HawxConfig, HawxError> {
    let yaml: serde_yaml::Value = serde_yaml::from_str(content)?;
    if yaml.is_null() {
        return Ok(HawxConfig::default());
    }

    validate_schema(&yaml)?;

    let config: HawxConfig = serde_yaml::from_value(yaml)?;
    validate_values(&config)?;
    Ok(config)
}

/// Validate config against the JSON schema for structural correctness.
fn validate_schema(yaml: &serde_yaml::Value) -> Result<(), HawxError> {
    let json_str = serde_json::to_string(yaml)
        .map_err(|e| HawxError::Config(format!("Config conversion error: {}", e)))?;
    let json_value: serde_json::Value = serde_json::from_str(&json_str)
        .map_err(|e| HawxError::Config(format!("Config conversion error: {}", e)))?;

    let compiled = jsonschema::JSONSchema::compile(&CONFIG_SCHEMA)
        .map_err(|e| HawxError::Config(format!("Schema compilation error: {}", e)))?;

    if let Err(errors) = compiled.validate(&json_value) {
        // Advisory only; semantic checks below are the hard gate.
        for e in errors {
            warn!(validation_error = %e, path = %e.instance_path, "Config schema warning");
        }
    }

    Ok(())
}

/// Reject values that would make the workflow meaningless.
fn validate_values(config: &HawxConfig) -> Result<(), HawxError> {
    if let Some(recon) = &config.recon {
        if let Some(steps) = recon.steps {
            if steps == 0 || steps > MAX_STEPS {
                return Err(HawxError::Config(format!(
                    "recon.steps must be between 1 and {}, got {}",
                    MAX_STEPS, steps
                )));
            }
        }
        if recon.workers == Some(0) {
            return Err(HawxError::Config("recon.workers must be at least 1".into()));
        }
        if recon.idle_timeout_secs == Some(0) || recon.total_timeout_secs == Some(0) {
            return Err(HawxError::Config("recon timeouts must be greater than zero".into()));
        }
        if recon.baseline_multiplier == Some(0) {
            return Err(HawxError::Config("recon.baseline_multiplier must be at least 1".into()));
        }
        if let Some(threshold) = recon.dedup_threshold {
            if !(threshold > 0.0 && threshold <= 1.0) {
                return Err(HawxError::Config(format!(
                    "recon.dedup_threshold must be in (0, 1], got {}",
                    threshold
                )));
            }
        }
        if recon.dedup_cap == Some(0) {
            return Err(HawxError::Config("recon.dedup_cap must be at least 1".into()));
        }
    }

    if let Some(filters) = &config.filters {
        for (tool, patterns) in filters {
            for pattern in patterns {
                Regex::new(pattern).map_err(|e| {
                    HawxError::Config(format!("Invalid filter pattern for '{}': {}", tool, e))
                })?;
            }
        }
    }

    Ok(())
}

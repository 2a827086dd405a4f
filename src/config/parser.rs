use std::path::Path;
use crate::errors::StingrayError;
use super::types::{DistributionSystem, StingrayConfig};
use super::schema::CONFIG_SCHEMA;
use tracing::warn;

const MAX_CONFIG_BYTES: u64 = 1_048_576;

pub async fn parse_config(path: &Path) -> Result<StingrayConfig, StingrayError> {
    if !path.exists() {
        return Err(StingrayError::Config(format!("Config file not found: {}", path.display())));
    }

    let metadata = tokio::fs::metadata(path).await?;
    if metadata.len() > MAX_CONFIG_BYTES {
        return Err(StingrayError::Config("Config file exceeds 1MB limit".into()));
    }

    let content = tokio::fs::read_to_string(path).await?;
    parse_config_str(&content)
}

pub fn parse_config_str(content: &str) -> Result<StingrayConfig, StingrayError> {
    let yaml: serde_yaml::Value = serde_yaml::from_str(content)?;

    for msg in schema_warnings(&yaml)? {
        warn!(validation_error = %msg, "Config schema warning");
    }

    let config: StingrayConfig = serde_yaml::from_value(yaml)?;
    validate_conflicts(&config)?;
    Ok(config)
}

/// Structural problems found by the JSON schema. Advisory: callers log them.
pub fn schema_warnings(yaml: &serde_yaml::Value) -> Result<Vec<String>, StingrayError> {
    let json_value = serde_json::to_value(yaml)
        .map_err(|e| StingrayError::Config(format!("Config conversion error: {}", e)))?;

    let compiled = jsonschema::JSONSchema::compile(&CONFIG_SCHEMA)
        .map_err(|e| StingrayError::Config(format!("Schema compilation error: {}", e)))?;

    let messages = match compiled.validate(&json_value) {
        Ok(()) => Vec::new(),
        Err(errors) => errors.map(|e| format!("{} at {}", e, e.instance_path)).collect(),
    };
    Ok(messages)
}

/// Detect semantic conflicts in the parsed configuration.
fn validate_conflicts(config: &StingrayConfig) -> Result<(), StingrayError> {
    if let Some(scan) = &config.scan {
        if scan.testcases.as_ref().is_some_and(|t| t.is_empty()) {
            return Err(StingrayError::Config("scan.testcases must not be empty".into()));
        }
        if scan.max_attempts == Some(0) {
            return Err(StingrayError::Config("scan.max_attempts must be at least 1".into()));
        }
    }

    if let Some(retry) = &config.retry {
        if retry.attempts == Some(0) {
            return Err(StingrayError::Config("retry.attempts must be at least 1".into()));
        }
    }

    if let Some(report) = &config.report {
        if report.json_file.as_ref().is_some_and(|f| f.trim().is_empty()) {
            return Err(StingrayError::Config("report.json_file must not be empty".into()));
        }
    }

    if let Some(distribution) = &config.distribution {
        match distribution.system {
            DistributionSystem::HockeyApp => {
                if let Some(hockey) = &distribution.hockeyapp {
                    if hockey.bundle_id.is_none() && hockey.public_id.is_none() {
                        return Err(StingrayError::Config(
                            "distribution.hockeyapp needs bundle_id or public_id".into(),
                        ));
                    }
                }
            }
            DistributionSystem::AppCenter => {
                if let Some(appcenter) = &distribution.appcenter {
                    if appcenter.release_id.is_some() && appcenter.version.is_some() {
                        warn!("Both appcenter.release_id and appcenter.version set; release_id wins");
                    }
                }
            }
            DistributionSystem::File => {}
        }
    }

    Ok(())
}

use anyhow::{Context, Result, anyhow, bail};
use schemars::{Schema, schema_for};
use serde_valid::Validate;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tracing::{debug, warn};

use super::models::{Config, SourceConfig};

/// Load configuration from a string slice.
pub fn load_from_str(s: &str) -> Result<Config> {
    let cfg: Config =
        serde_json::from_str(s).context("Failed to parse JSON config string into Config")?;
    validate_config(&cfg)?;
    Ok(cfg)
}

/// Load configuration from any reader (e.g., a file).
pub fn load_from_reader<R: Read>(reader: R) -> Result<Config> {
    let cfg: Config =
        serde_json::from_reader(reader).context("Failed to parse JSON config from reader")?;
    validate_config(&cfg)?;
    Ok(cfg)
}

/// Load configuration from a file path synchronously.
pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path_ref = path.as_ref();
    let file = File::open(path_ref)
        .with_context(|| format!("Failed to open config file {}", path_ref.display()))?;
    let cfg = load_from_reader(file)
        .with_context(|| format!("Invalid config file {}", path_ref.display()))?;
    debug!("Loaded config from {}", path_ref.display());
    Ok(cfg)
}

/// Load configuration from a file path asynchronously (Tokio).
pub async fn load_from_path_async<P: AsRef<Path>>(path: P) -> Result<Config> {
    use tokio::fs;
    let path_ref = path.as_ref();
    let bytes = fs::read(path_ref)
        .await
        .with_context(|| format!("Failed to read config file {}", path_ref.display()))?;
    let cfg: Config = serde_json::from_slice(&bytes)
        .with_context(|| format!("Failed to parse JSON config from {}", path_ref.display()))?;
    validate_config(&cfg)?;
    debug!("Loaded config from {}", path_ref.display());
    Ok(cfg)
}

/// Generate the JSON Schema for the Config model.
pub fn generate_schema() -> Schema {
    schema_for!(Config)
}

/// Write the JSON Schema for the Config model to any writer (pretty-printed).
pub fn write_schema_to_writer<W: Write>(mut writer: W) -> Result<()> {
    let schema = generate_schema();
    let json = serde_json::to_string_pretty(&schema).context("Failed to serialize schema")?;
    writer
        .write_all(json.as_bytes())
        .context("Failed to write schema to writer")?;
    Ok(())
}

/// Check numeric bounds and cross-field constraints.
/// - Field bounds come from the `serde_valid` attributes on the models.
/// - At most one stdin source.
/// - File sources need a non-empty path.
pub fn validate_config(cfg: &Config) -> Result<()> {
    cfg.validate()
        .map_err(|errors| anyhow!("Config failed validation: {errors}"))?;

    let stdin_sources = cfg
        .sources
        .iter()
        .filter(|s| matches!(s, SourceConfig::Stdin))
        .count();
    if stdin_sources > 1 {
        bail!("At most one stdin source may be configured (found {stdin_sources})");
    }

    for (idx, source) in cfg.sources.iter().enumerate() {
        if let SourceConfig::File { path } = source {
            if path.trim().is_empty() {
                bail!("File source at index {idx} has an empty path");
            }
        }
    }

    let session = &cfg.session;
    if session.dialog_wait_ms > session.dialog_timeout_ms {
        warn!(
            dialog_wait_ms = session.dialog_wait_ms,
            dialog_timeout_ms = session.dialog_timeout_ms,
            "dialog_wait_ms exceeds dialog_timeout_ms; dialog commands may outwait the engine"
        );
    }

    Ok(())
}

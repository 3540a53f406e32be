//! Harness configuration.
//!
//! Loaded from `--config`, else `./genassert.json`, else the user config dir,
//! else defaults. Command-line flags are applied on top by the caller.
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_SCHEMA_VERSION: u32 = 1;
pub const LOCAL_CONFIG_FILE: &str = "genassert.json";
const USER_CONFIG_DIR: &str = "genassert";
const USER_CONFIG_FILE: &str = "config.json";
const DEFAULT_TIMEOUT_SECONDS: f64 = 60.0;
const DEFAULT_JOBS: usize = 1;

fn default_timeout_seconds() -> f64 {
    DEFAULT_TIMEOUT_SECONDS
}

fn default_jobs() -> usize {
    DEFAULT_JOBS
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HarnessConfig {
    pub schema_version: u32,
    /// Generator command line, split with shell rules.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generator: Option<String>,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: f64,
    #[serde(default = "default_jobs")]
    pub jobs: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub templates_root: Option<PathBuf>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        HarnessConfig {
            schema_version: CONFIG_SCHEMA_VERSION,
            generator: None,
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            jobs: DEFAULT_JOBS,
            templates_root: None,
        }
    }
}

impl HarnessConfig {
    /// Generator timeout; errors when `timeout_seconds` does not fit a `Duration`.
    pub fn timeout(&self) -> Result<Duration> {
        Duration::try_from_secs_f64(self.timeout_seconds).map_err(|_| {
            anyhow!(
                "timeout_seconds is out of range (got {})",
                self.timeout_seconds
            )
        })
    }
}

/// Load a config file; relative `templates_root` resolves against its directory.
pub fn load_config(path: &Path) -> Result<HarnessConfig> {
    let bytes = fs::read(path).with_context(|| format!("read config {}", path.display()))?;
    let mut config: HarnessConfig = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse config JSON {}", path.display()))?;
    validate_config(&config).with_context(|| format!("invalid config {}", path.display()))?;
    if let Some(root) = config.templates_root.take() {
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        config.templates_root = Some(if root.is_absolute() {
            root
        } else {
            base.join(root)
        });
    }
    Ok(config)
}

/// Find and load the effective config.
///
/// An explicit path must exist; the implicit locations are optional.
pub fn discover_config(
    explicit: Option<&Path>,
    cwd: &Path,
) -> Result<(HarnessConfig, Option<PathBuf>)> {
    if let Some(path) = explicit {
        return Ok((load_config(path)?, Some(path.to_path_buf())));
    }
    let mut candidates = vec![cwd.join(LOCAL_CONFIG_FILE)];
    if let Some(dir) = dirs::config_dir() {
        candidates.push(dir.join(USER_CONFIG_DIR).join(USER_CONFIG_FILE));
    }
    for candidate in candidates {
        if candidate.is_file() {
            tracing::debug!(path = %candidate.display(), "using config file");
            return Ok((load_config(&candidate)?, Some(candidate)));
        }
    }
    Ok((HarnessConfig::default(), None))
}

/// Validate schema version and numeric limits.
pub fn validate_config(config: &HarnessConfig) -> Result<()> {
    if config.schema_version != CONFIG_SCHEMA_VERSION {
        return Err(anyhow!(
            "unsupported config schema_version {}",
            config.schema_version
        ));
    }
    if !config.timeout_seconds.is_finite() || config.timeout_seconds <= 0.0 {
        return Err(anyhow!(
            "timeout_seconds must be a positive number (got {})",
            config.timeout_seconds
        ));
    }
    config.timeout()?;
    if config.jobs == 0 {
        return Err(anyhow!("jobs must be at least 1"));
    }
    if let Some(generator) = config.generator.as_deref() {
        if generator.trim().is_empty() {
            return Err(anyhow!("generator must be non-empty when set"));
        }
    }
    Ok(())
}

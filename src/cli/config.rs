use std::path::Path;

use anyhow::{Context as _, Result, bail};
use serde::Deserialize;

pub const DEFAULT_CONFIG_FILE: &str = "ironflow-delay.yaml";

/// Configuration loaded from `ironflow-delay.yaml`.
/// All fields are optional — missing fields fall back to CLI/env/defaults.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct DelayConfig {
    /// Abort a node run after this many milliseconds.
    pub timeout_ms: Option<u64>,
    /// Output format for `run` and `ports` (json, pretty).
    pub format: Option<String>,
}

impl DelayConfig {
    /// Load configuration from a YAML file.
    ///
    /// An explicit `path` must exist. Without one, `ironflow-delay.yaml` in
    /// the current directory is read when present, defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) if !p.exists() => bail!("Config file not found: {}", p.display()),
            Some(p) => Self::from_file(p),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::from_file(default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Parse configuration from YAML text.
    pub fn from_yaml(contents: &str) -> Result<Self> {
        Ok(serde_yml::from_str(contents)?)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_yaml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }
}

use serde::{Deserialize, Serialize};
use std::{collections::HashMap, env, fs, path::Path};

use crate::errors::ContainerError;

const ENV_DETECT_CYCLES: &str = "GRAPHDI_DETECT_CYCLES";
const ENV_MAX_DEPTH: &str = "GRAPHDI_MAX_DEPTH";
const ENV_TRACE_RESOLUTIONS: &str = "GRAPHDI_TRACE_RESOLUTIONS";

const DEFAULT_MAX_DEPTH: usize = 256;

/// Resolver tuning. This configures how the container resolves, not what it registers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerConfig {
    /// Fail with a circular dependency error when a type re-enters its own resolution
    pub detect_cycles: bool,
    /// Upper bound on nested resolutions, enforced even when cycle detection is off
    pub max_depth: usize,
    /// Log the duration of every resolution
    pub trace_resolutions: bool,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            detect_cycles: true,
            max_depth: DEFAULT_MAX_DEPTH,
            trace_resolutions: false,
        }
    }
}

/// Partial configuration as read from a TOML file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PartialContainerConfig {
    pub detect_cycles: Option<bool>,
    pub max_depth: Option<usize>,
    pub trace_resolutions: Option<bool>,
}

impl ContainerConfig {
    /// Parse a TOML document, falling back to defaults for missing fields
    pub fn from_toml_str(content: &str) -> Result<Self, ContainerError> {
        let partial: PartialContainerConfig = toml::from_str(content)
            .map_err(|e| ContainerError::Config(format!("failed to parse TOML: {}", e)))?;
        Self::from_partial_and_env(Some(partial), HashMap::new())
    }

    /// Load from a TOML file and apply environment overrides
    pub fn load(path: &Path) -> Result<Self, ContainerError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ContainerError::Config(format!("failed to read '{}': {}", path.display(), e))
        })?;
        let partial: PartialContainerConfig = toml::from_str(&content).map_err(|e| {
            ContainerError::Config(format!("failed to parse '{}': {}", path.display(), e))
        })?;
        Self::from_partial_and_env(Some(partial), Self::collect_env_vars())
    }

    /// Defaults with environment overrides only
    pub fn from_env() -> Result<Self, ContainerError> {
        Self::from_partial_and_env(None, Self::collect_env_vars())
    }

    /// Environment values take precedence over file values
    pub fn from_partial_and_env(
        partial: Option<PartialContainerConfig>,
        env_map: HashMap<String, String>,
    ) -> Result<Self, ContainerError> {
        let partial = partial.unwrap_or_default();
        let defaults = Self::default();

        let detect_cycles = match env_map.get(ENV_DETECT_CYCLES) {
            Some(raw) => parse_bool(ENV_DETECT_CYCLES, raw)?,
            None => partial.detect_cycles.unwrap_or(defaults.detect_cycles),
        };
        let max_depth = match env_map.get(ENV_MAX_DEPTH) {
            Some(raw) => raw.trim().parse().map_err(|_| {
                ContainerError::Config(format!("{} must be a positive integer, got '{}'", ENV_MAX_DEPTH, raw))
            })?,
            None => partial.max_depth.unwrap_or(defaults.max_depth),
        };
        let trace_resolutions = match env_map.get(ENV_TRACE_RESOLUTIONS) {
            Some(raw) => parse_bool(ENV_TRACE_RESOLUTIONS, raw)?,
            None => partial.trace_resolutions.unwrap_or(defaults.trace_resolutions),
        };

        if max_depth == 0 {
            return Err(ContainerError::Config("max_depth must be greater than zero".to_string()));
        }

        Ok(Self {
            detect_cycles,
            max_depth,
            trace_resolutions,
        })
    }

    fn collect_env_vars() -> HashMap<String, String> {
        let env_keys = [ENV_DETECT_CYCLES, ENV_MAX_DEPTH, ENV_TRACE_RESOLUTIONS];

        let mut env_map = HashMap::new();
        for key in &env_keys {
            if let Ok(value) = env::var(key) {
                env_map.insert(key.to_string(), value);
            }
        }
        env_map
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, ContainerError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ContainerError::Config(format!("{} must be a boolean, got '{}'", key, raw))),
    }
}

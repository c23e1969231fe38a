//! Tree configuration
//!
//! One `TreeConfig` is shared by every node of a tree. It is fixed when the
//! root is created.

use crate::errors::{ArborError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Configuration shared by all nodes of one tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TreeConfig {
    /// Interval between warnings while a closing node waits for children
    pub pending_wait_warn_interval_ms: u64,
    /// Log handle release failures during teardown
    pub log_release_failures: bool,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            pending_wait_warn_interval_ms: 5_000,
            log_release_failures: true,
        }
    }
}

impl TreeConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ArborError::config(format!("Invalid TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ArborError::config(format!(
                "Failed to read config file {}: {e}",
                path.display()
            ))
        })?;
        Self::from_toml_str(&content)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.pending_wait_warn_interval_ms == 0 {
            return Err(ArborError::config(
                "pending_wait_warn_interval_ms must be greater than zero",
            ));
        }
        Ok(())
    }

    /// Warning interval as a `Duration`
    pub fn pending_wait_warn_interval(&self) -> Duration {
        Duration::from_millis(self.pending_wait_warn_interval_ms)
    }
}

//! # Configuration
//!
//! Layered, later wins:
//!
//! 1. built-in defaults
//! 2. TOML file (`--config`, else `fwcat.toml` in the current directory if present)
//! 3. environment (`FWCAT_WORK_ROOT`)
//! 4. CLI flags
//!
//! ```toml
//! work_root = "frameworks"
//! python = "python3"
//! jobs = 2
//!
//! [registry]
//! channel = "release"
//! url = "https://github.com/JuliaRegistries/General"
//! ```

use fwcat_core::CatalogError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File picked up when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "fwcat.toml";

/// Environment override for `work_root`.
pub const WORK_ROOT_ENV: &str = "FWCAT_WORK_ROOT";

/// Maximum config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

/// Registry ecosystem settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Runtime manager binary.
    pub runtime: PathBuf,
    /// Runtime channel to install or update.
    pub channel: String,
    /// Extra package registry to add; empty uses the default registry only.
    pub url: String,
    /// Runtime binary used to drive the package manager.
    pub julia: PathBuf,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            runtime: PathBuf::from("juliaup"),
            channel: "release".to_string(),
            url: String::new(),
            julia: PathBuf::from("julia"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root of working trees and the installation ledger.
    pub work_root: PathBuf,
    pub python: PathBuf,
    pub git: PathBuf,
    /// Concurrent installs in a batch.
    pub jobs: usize,
    /// Branch cloned for source installs; unset follows the remote HEAD.
    pub default_branch: Option<String>,
    pub registry: RegistryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            work_root: PathBuf::from("frameworks"),
            python: PathBuf::from("python3"),
            git: PathBuf::from("git"),
            jobs: 1,
            default_branch: None,
            registry: RegistryConfig::default(),
        }
    }
}

impl Config {
    /// Parse a TOML document; missing keys keep their defaults.
    pub fn from_toml(text: &str) -> Result<Self, CatalogError> {
        toml::from_str(text)
            .map_err(|e| CatalogError::SerializationError(format!("Invalid config: {}", e)))
    }

    /// Read a config file.
    pub fn from_file(path: &Path) -> Result<Self, CatalogError> {
        let metadata = std::fs::metadata(path).map_err(|e| {
            CatalogError::IoError(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(CatalogError::SerializationError(format!(
                "Config file size {} bytes exceeds maximum allowed {} bytes",
                metadata.len(),
                MAX_CONFIG_FILE_SIZE
            )));
        }

        let text = std::fs::read_to_string(path).map_err(|e| {
            CatalogError::IoError(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        Self::from_toml(&text)
    }

    /// Layers 1 and 2. An explicit path must exist; the default file is optional.
    pub fn load(explicit: Option<&Path>) -> Result<Self, CatalogError> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if fallback.is_file() {
                    Self::from_file(fallback)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Layer 3, reading variables through `lookup`.
    #[must_use]
    pub fn with_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(root) = lookup(WORK_ROOT_ENV).filter(|v| !v.trim().is_empty()) {
            self.work_root = PathBuf::from(root);
        }
        self
    }

    /// Layer 4.
    #[must_use]
    pub fn with_overrides(mut self, work_root: Option<PathBuf>, jobs: Option<usize>) -> Self {
        if let Some(root) = work_root {
            self.work_root = root;
        }
        if let Some(jobs) = jobs {
            self.jobs = jobs;
        }
        self.jobs = self.jobs.max(1);
        self
    }
}

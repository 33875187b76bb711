/*============================================================
  Synavera Project: Loop Support
  Module: loop_support_core::config
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Load and validate the Loop Support configuration file that
    names the running build, tunes version-check fan-out, and
    declares the built-in plugins to register.

  Security / Safety Notes:
    Reads operator-owned TOML only; remote manifest URLs are
    stored verbatim and never logged with query strings.

  Dependencies:
    serde + toml for parsing, dirs for XDG default locations.

  Operational Scope:
    Consumed by the CLI entry point and by the scenario catalog
    feature gate.

  Revision History:
    2026-10-19 COD  Authored configuration layer.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Explicit defaults for every tunable
    - Validation before any plugin is constructed
============================================================*/

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Result, SupportError};

const APP_DIR: &str = "loop-support";
const CONFIG_FILE: &str = "config.toml";

/// Root configuration document.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SupportConfig {
    pub bundle_identifier: String,
    pub current_version: String,
    pub scenarios_enabled: bool,
    pub scenario_dir: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
    pub version_check: VersionCheckConfig,
    pub release_manifests: Vec<ReleaseManifestConfig>,
    pub scenario_sources: Vec<ScenarioSourceConfig>,
}

impl Default for SupportConfig {
    fn default() -> Self {
        Self {
            bundle_identifier: "org.loopkit.Loop".into(),
            current_version: env!("CARGO_PKG_VERSION").into(),
            scenarios_enabled: false,
            scenario_dir: None,
            log_dir: None,
            version_check: VersionCheckConfig::default(),
            release_manifests: Vec::new(),
            scenario_sources: Vec::new(),
        }
    }
}

/// Tunables for the concurrent version-check fan-out.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VersionCheckConfig {
    /// Per-plugin time limit in seconds.
    pub timeout: u64,
    pub max_parallel_checks: usize,
}

impl Default for VersionCheckConfig {
    fn default() -> Self {
        Self {
            timeout: 15,
            max_parallel_checks: 8,
        }
    }
}

/// A release manifest plugin, read from a file path or an HTTP(S) URL.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReleaseManifestConfig {
    pub identifier: String,
    pub source: String,
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
}

/// A scenario directory plugin.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioSourceConfig {
    pub identifier: String,
    pub root: PathBuf,
}

fn default_max_retries() -> usize {
    3
}

impl SupportConfig {
    /// Load from an explicit path, or from the default location if present.
    ///
    /// An explicit path must exist; a missing default file yields defaults.
    pub fn load_from_optional_path(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::load(path)?,
            None => match default_config_path() {
                Some(default) if default.is_file() => Self::load(&default)?,
                _ => Self::default(),
            },
        };
        config.validate()?;
        Ok(config)
    }

    fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|err| {
            SupportError::Config(format!("Failed to read {}: {err}", path.display()))
        })?;
        Self::parse(&raw)
            .map_err(|err| SupportError::Config(format!("{}: {err}", path.display())))
    }

    /// Parse a TOML document without validating it.
    pub fn parse(raw: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    /// Reject values that would make fan-out or plugin wiring meaningless.
    pub fn validate(&self) -> Result<()> {
        if self.bundle_identifier.trim().is_empty() {
            return Err(SupportError::Config("bundle_identifier must not be empty".into()));
        }
        if self.current_version.trim().is_empty() {
            return Err(SupportError::Config("current_version must not be empty".into()));
        }
        if self.version_check.timeout == 0 {
            return Err(SupportError::Config(
                "version_check.timeout must be at least one second".into(),
            ));
        }
        if self.version_check.max_parallel_checks == 0 {
            return Err(SupportError::Config(
                "version_check.max_parallel_checks must be at least one".into(),
            ));
        }
        let identifiers = self
            .release_manifests
            .iter()
            .map(|m| m.identifier.as_str())
            .chain(self.scenario_sources.iter().map(|s| s.identifier.as_str()));
        for identifier in identifiers {
            if identifier.trim().is_empty() {
                return Err(SupportError::Config("plugin identifier must not be empty".into()));
            }
        }
        Ok(())
    }

    /// Directory for session logs.
    pub fn log_dir(&self) -> PathBuf {
        self.log_dir.clone().unwrap_or_else(|| {
            dirs::state_dir()
                .or_else(dirs::data_local_dir)
                .unwrap_or_else(std::env::temp_dir)
                .join(APP_DIR)
                .join("logs")
        })
    }

    /// Directory scanned for candidate scenario files.
    pub fn scenario_dir(&self) -> PathBuf {
        self.scenario_dir.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join(APP_DIR)
                .join("scenarios")
        })
    }
}

/// `$XDG_CONFIG_HOME/loop-support/config.toml`, when a config dir is known.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
}

/*============================================================
  Synavera Project: Loop Support
  Module: loop_support_core::error
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Centralise Loop Support error types so plugin failures,
    configuration faults, and CLI exits share one taxonomy.

  Security / Safety Notes:
    Error contexts carry plugin identifiers and paths only;
    manifest payloads and URLs with credentials are not echoed.

  Dependencies:
    thiserror for ergonomic error definitions.

  Operational Scope:
    Returned by plugins and configuration loaders. The support
    aggregator never propagates these outward; it logs them and
    reduces to safe defaults.

  Revision History:
    2026-10-19 COD  Established support error taxonomy.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Explicit error taxonomy with actionable context
    - No silent failure paths
    - Stable exit codes for operational tooling
============================================================*/

use std::io;
use std::process::ExitCode;

use thiserror::Error;

/// Result alias for Loop Support operations.
pub type Result<T> = std::result::Result<T, SupportError>;

/// Enumerates high-level error domains surfaced by Loop Support.
#[derive(Debug, Error)]
pub enum SupportError {
    #[error("Configuration: {0}")]
    Config(String),
    #[error("Plugin `{identifier}`: {message}")]
    Plugin { identifier: String, message: String },
    #[error("Network: {0}")]
    Network(String),
    #[error("Serialization: {0}")]
    Serialization(String),
    #[error("Filesystem: {0}")]
    Filesystem(String),
    #[error("Runtime: {0}")]
    Runtime(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl SupportError {
    /// Shorthand for a failure attributed to a single plugin.
    pub fn plugin(identifier: impl Into<String>, message: impl Into<String>) -> Self {
        SupportError::Plugin {
            identifier: identifier.into(),
            message: message.into(),
        }
    }

    /// Map error category to a deterministic exit code.
    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.exit_status())
    }

    fn exit_status(&self) -> u8 {
        match self {
            SupportError::Config(_) => 20,
            SupportError::Plugin { .. } => 25,
            SupportError::Network(_) => 30,
            SupportError::Serialization(_) => 31,
            SupportError::Filesystem(_) => 40,
            SupportError::Io(_) => 41,
            SupportError::Runtime(_) => 50,
        }
    }
}

/*============================================================
  Synavera Project: Loop Support
  Module: loop_support_core
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Library root for Loop Support Core: a registry of support
    plugins with concurrent version-check and scenario
    aggregation.

  Security / Safety Notes:
    Plugins are untrusted; every aggregate call contains plugin
    failures and never fails outward.

  Dependencies:
    tokio, async-trait, serde, thiserror, chrono, sha2, reqwest.

  Operational Scope:
    Linked by the `loop-support` binary and by integration
    tests.

  Revision History:
    2026-10-19 COD  Split library root from CLI entry point.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Explicit module boundaries per concern
============================================================*/

pub mod alert;
pub mod builtin;
pub mod catalog;
pub mod config;
pub mod error;
pub mod logger;
pub mod plugin;
pub mod scenario;
pub mod support;
pub mod version;

pub use alert::{Alert, AlertIdentifier, AlertIssuer, LoggingAlertIssuer};
pub use catalog::ScenarioCatalog;
pub use config::SupportConfig;
pub use error::{Result, SupportError};
pub use logger::Logger;
pub use plugin::{
    Capabilities, Reset, ScenarioProvider, SupportDescriptor, SupportPlugin, VersionCheck,
};
pub use scenario::{collate_scenarios, Locator, LoopScenario};
pub use support::{BuildInfo, CheckOutcome, PluginOutcome, SupportManager, VersionReport};
pub use version::{reduce_updates, VersionUpdate};

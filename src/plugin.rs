/*============================================================
  Synavera Project: Loop Support
  Module: loop_support_core::plugin
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Declare the capability contracts a support plugin may
    implement and the registration entry the aggregator keeps.

  Security / Safety Notes:
    Plugins are untrusted: their latency, failures, and panics
    are contained by the aggregator, not by this contract.

  Dependencies:
    async-trait for the suspending version-check capability.

  Operational Scope:
    Implemented by built-in and third-party support plugins;
    queried once at registration to fix the capability set.

  Revision History:
    2026-10-19 COD  Replaced placeholder hooks with capability
                    traits and registration entries.
  ------------------------------------------------------------
  SSE Principles Observed:
    - One trait per capability, no assumed defaults
    - Capability presence decided before dispatch
============================================================*/

use std::fmt;
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use serde::Serialize;

use crate::alert::AlertIssuer;
use crate::error::Result;
use crate::scenario::{Locator, LoopScenario};
use crate::version::VersionUpdate;

/// Reports whether the running build should be updated.
#[async_trait]
pub trait VersionCheck: Send + Sync {
    /// `Ok(None)` means the plugin has no opinion.
    async fn check_version(
        &self,
        bundle_identifier: &str,
        current_version: &str,
    ) -> Result<Option<VersionUpdate>>;
}

/// Recognizes testing scenarios among candidate locators.
///
/// Implementations should return an empty list rather than fail; errors that
/// do escape are treated as an empty contribution.
pub trait ScenarioProvider: Send + Sync {
    fn get_scenarios(&self, candidates: &[Locator]) -> Result<Vec<LoopScenario>>;

    /// Called when one of this provider's scenarios becomes the active one.
    fn scenario_activated(&self, _scenario: &LoopScenario) {}
}

/// Resets plugin-local loop state on operator request.
pub trait Reset: Send + Sync {
    fn reset_loop(&self);

    fn loop_needs_reset(&self) -> bool {
        false
    }
}

/// A support backend contributing zero or more capabilities.
///
/// Each accessor hands back the capability when implemented; the defaults
/// declare it absent.
pub trait SupportPlugin: Send + Sync {
    fn identifier(&self) -> &str;

    fn as_version_check(self: Arc<Self>) -> Option<Arc<dyn VersionCheck>> {
        None
    }

    fn as_scenario_provider(self: Arc<Self>) -> Option<Arc<dyn ScenarioProvider>> {
        None
    }

    fn as_reset(self: Arc<Self>) -> Option<Arc<dyn Reset>> {
        None
    }

    /// Called once at registration with the shared alert sink.
    fn attach_alert_issuer(&self, _issuer: Weak<dyn AlertIssuer>) {}
}

/// Capability set declared by a plugin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    pub version_check: bool,
    pub scenario_provider: bool,
    pub reset: bool,
}

impl fmt::Display for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = Vec::new();
        if self.version_check {
            names.push("version-check");
        }
        if self.scenario_provider {
            names.push("scenarios");
        }
        if self.reset {
            names.push("reset");
        }
        if names.is_empty() {
            f.write_str("none")
        } else {
            f.write_str(&names.join(","))
        }
    }
}

/// A registered plugin with its capabilities resolved.
pub struct SupportEntry {
    identifier: String,
    plugin: Arc<dyn SupportPlugin>,
    version_check: Option<Arc<dyn VersionCheck>>,
    scenario_provider: Option<Arc<dyn ScenarioProvider>>,
    reset: Option<Arc<dyn Reset>>,
}

impl SupportEntry {
    /// Query every capability accessor once.
    pub fn resolve(plugin: Arc<dyn SupportPlugin>) -> Self {
        Self {
            identifier: plugin.identifier().to_string(),
            version_check: plugin.clone().as_version_check(),
            scenario_provider: plugin.clone().as_scenario_provider(),
            reset: plugin.clone().as_reset(),
            plugin,
        }
    }

    /// True when this entry was registered from the same plugin instance.
    pub fn is_instance(&self, plugin: &Arc<dyn SupportPlugin>) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.plugin), Arc::as_ptr(plugin))
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn plugin(&self) -> &Arc<dyn SupportPlugin> {
        &self.plugin
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            version_check: self.version_check.is_some(),
            scenario_provider: self.scenario_provider.is_some(),
            reset: self.reset.is_some(),
        }
    }

    pub fn version_check(&self) -> Option<Arc<dyn VersionCheck>> {
        self.version_check.clone()
    }

    pub fn scenario_provider(&self) -> Option<Arc<dyn ScenarioProvider>> {
        self.scenario_provider.clone()
    }

    pub fn reset(&self) -> Option<&Arc<dyn Reset>> {
        self.reset.as_ref()
    }
}

/// Identifier and capabilities of a registered plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SupportDescriptor {
    pub identifier: String,
    pub capabilities: Capabilities,
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ResetOnly;

    impl SupportPlugin for ResetOnly {
        fn identifier(&self) -> &str {
            "reset-only"
        }

        fn as_reset(self: Arc<Self>) -> Option<Arc<dyn Reset>> {
            Some(self)
        }
    }

    impl Reset for ResetOnly {
        fn reset_loop(&self) {}
    }

    struct Bare;

    impl SupportPlugin for Bare {
        fn identifier(&self) -> &str {
            "bare"
        }
    }

    #[test]
    fn resolve_records_declared_capabilities_only() {
        let entry = SupportEntry::resolve(Arc::new(ResetOnly));
        assert_eq!(entry.identifier(), "reset-only");
        assert_eq!(
            entry.capabilities(),
            Capabilities {
                version_check: false,
                scenario_provider: false,
                reset: true,
            }
        );
        assert!(entry.version_check().is_none());
        assert_eq!(entry.capabilities().to_string(), "reset");
    }

    #[test]
    fn instances_are_compared_by_address() {
        let plugin: Arc<dyn SupportPlugin> = Arc::new(Bare);
        let entry = SupportEntry::resolve(plugin.clone());
        assert!(entry.is_instance(&plugin));
        assert!(!entry.is_instance(&(Arc::new(Bare) as Arc<dyn SupportPlugin>)));
    }

    #[test]
    fn plugin_without_capabilities_is_legal() {
        let entry = SupportEntry::resolve(Arc::new(Bare));
        assert_eq!(entry.capabilities(), Capabilities::default());
        assert_eq!(entry.capabilities().to_string(), "none");
    }
}

/*============================================================
  Synavera Project: Loop Support
  Module: loop_support_core::support
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Hold the live set of support plugins and aggregate their
    version checks and scenario listings under concurrency and
    partial failure.

  Security / Safety Notes:
    Plugin failures, timeouts, and panics are contained per
    plugin and reduced to safe defaults; no aggregate call
    propagates a plugin error.

  Dependencies:
    tokio for task fan-out, semaphores, and timeouts.

  Operational Scope:
    Shared behind Arc by the CLI and any presentation layer;
    registration may race with in-flight fan-out.

  Revision History:
    2026-10-19 COD  Authored support aggregator.
    2026-10-19 COD  Bounded scenario lookups; added scenario
                    activation.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Snapshot-then-dispatch registry access
    - Order-insensitive reductions after a join barrier
    - Structured logging of every contained failure
============================================================*/

use std::sync::{Arc, PoisonError, RwLock, Weak};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::{timeout, timeout_at, Instant};

use crate::alert::AlertIssuer;
use crate::catalog::ScenarioCatalog;
use crate::config::SupportConfig;
use crate::error::{Result, SupportError};
use crate::logger::Logger;
use crate::plugin::{ScenarioProvider, SupportDescriptor, SupportEntry, SupportPlugin};
use crate::scenario::{collate_scenarios, Locator, LoopScenario};
use crate::version::{reduce_updates, VersionUpdate};

/// Identity of the running build, passed to every version check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildInfo {
    pub bundle_identifier: String,
    pub current_version: String,
}

impl BuildInfo {
    pub fn new(bundle_identifier: impl Into<String>, current_version: impl Into<String>) -> Self {
        Self {
            bundle_identifier: bundle_identifier.into(),
            current_version: current_version.into(),
        }
    }
}

/// What a single plugin contributed to a version check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "camelCase")]
pub enum CheckOutcome {
    Update(VersionUpdate),
    NoOpinion,
    Failed(String),
}

impl CheckOutcome {
    /// Verdict fed into the merge; failures carry no opinion.
    pub fn verdict(&self) -> Option<VersionUpdate> {
        match self {
            CheckOutcome::Update(update) => Some(*update),
            CheckOutcome::NoOpinion | CheckOutcome::Failed(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginOutcome {
    pub identifier: String,
    pub outcome: CheckOutcome,
}

/// Merged version verdict plus the per-plugin outcomes behind it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionReport {
    pub result: VersionUpdate,
    pub outcomes: Vec<PluginOutcome>,
}

/// Registry and aggregator for support plugins.
pub struct SupportManager {
    supports: RwLock<Vec<Arc<SupportEntry>>>,
    alert_issuer: Weak<dyn AlertIssuer>,
    build: BuildInfo,
    check_timeout: Duration,
    max_parallel_checks: usize,
    logger: Arc<Logger>,
}

impl SupportManager {
    pub fn new(build: BuildInfo, alert_issuer: Weak<dyn AlertIssuer>, logger: Arc<Logger>) -> Self {
        let defaults = crate::config::VersionCheckConfig::default();
        Self {
            supports: RwLock::new(Vec::new()),
            alert_issuer,
            build,
            check_timeout: Duration::from_secs(defaults.timeout),
            max_parallel_checks: defaults.max_parallel_checks,
            logger,
        }
    }

    /// Build an empty manager tuned by the configuration file.
    pub fn from_config(
        config: &SupportConfig,
        alert_issuer: Weak<dyn AlertIssuer>,
        logger: Arc<Logger>,
    ) -> Self {
        let build = BuildInfo::new(&config.bundle_identifier, &config.current_version);
        Self::new(build, alert_issuer, logger)
            .with_check_timeout(Duration::from_secs(config.version_check.timeout))
            .with_max_parallel_checks(config.version_check.max_parallel_checks)
    }

    pub fn with_check_timeout(mut self, limit: Duration) -> Self {
        self.check_timeout = limit;
        self
    }

    pub fn with_max_parallel_checks(mut self, limit: usize) -> Self {
        self.max_parallel_checks = limit.max(1);
        self
    }

    pub fn build(&self) -> &BuildInfo {
        &self.build
    }

    /// Register a plugin. Duplicate identifiers are kept side by side;
    /// registering the same instance twice is a no-op.
    pub fn add_support(&self, plugin: Arc<dyn SupportPlugin>) {
        if self.is_registered(&plugin) {
            self.logger.debug(
                "REGISTER",
                format!("{} already registered; ignoring", plugin.identifier()),
            );
            return;
        }

        // Plugin code runs outside the registry lock.
        plugin.attach_alert_issuer(self.alert_issuer.clone());
        let entry = SupportEntry::resolve(plugin);

        let mut supports = self.supports.write().unwrap_or_else(PoisonError::into_inner);
        if supports.iter().any(|existing| existing.is_instance(entry.plugin())) {
            return;
        }
        if supports
            .iter()
            .any(|existing| existing.identifier() == entry.identifier())
        {
            self.logger.warn(
                "REGISTER",
                format!("Duplicate support identifier {}", entry.identifier()),
            );
        }
        self.logger.info(
            "REGISTER",
            format!("{} [{}]", entry.identifier(), entry.capabilities()),
        );
        supports.push(Arc::new(entry));
    }

    /// Registered plugins in registration order.
    pub fn available_supports(&self) -> Vec<SupportDescriptor> {
        self.snapshot()
            .iter()
            .map(|entry| SupportDescriptor {
                identifier: entry.identifier().to_string(),
                capabilities: entry.capabilities(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.supports.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_registered(&self, plugin: &Arc<dyn SupportPlugin>) -> bool {
        self.supports
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|entry| entry.is_instance(plugin))
    }

    fn snapshot(&self) -> Vec<Arc<SupportEntry>> {
        self.supports
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Merged update verdict across all version-check plugins.
    pub async fn check_version(&self) -> VersionUpdate {
        self.check_version_report().await.result
    }

    /// Run every version check concurrently and merge by severity.
    pub async fn check_version_report(&self) -> VersionReport {
        let checks: Vec<_> = self
            .snapshot()
            .iter()
            .filter_map(|entry| {
                entry
                    .version_check()
                    .map(|check| (entry.identifier().to_string(), check))
            })
            .collect();

        let semaphore = Arc::new(Semaphore::new(self.max_parallel_checks));
        let mut tasks = Vec::with_capacity(checks.len());
        for (identifier, check) in checks {
            let semaphore = semaphore.clone();
            let build = self.build.clone();
            let limit = self.check_timeout;
            let task_identifier = identifier.clone();
            tasks.push((
                identifier,
                tokio::spawn(async move {
                    let _permit = semaphore.acquire_owned().await.map_err(|_| {
                        SupportError::Runtime("version check semaphore closed".into())
                    })?;
                    let pending =
                        check.check_version(&build.bundle_identifier, &build.current_version);
                    match timeout(limit, pending).await {
                        Ok(result) => result,
                        Err(_) => Err(SupportError::plugin(
                            task_identifier,
                            format!("version check timed out after {}s", limit.as_secs_f32()),
                        )),
                    }
                }),
            ));
        }

        let mut outcomes = Vec::with_capacity(tasks.len());
        for (identifier, task) in tasks {
            let outcome = match task.await {
                Ok(Ok(Some(update))) => CheckOutcome::Update(update),
                Ok(Ok(None)) => CheckOutcome::NoOpinion,
                Ok(Err(err)) => {
                    self.logger
                        .warn("VERSION", format!("{identifier} check failed: {err}"));
                    CheckOutcome::Failed(err.to_string())
                }
                Err(err) => {
                    self.logger
                        .error("VERSION", format!("{identifier} check task aborted: {err}"));
                    CheckOutcome::Failed(format!("check task aborted: {err}"))
                }
            };
            self.logger
                .debug("VERSION", format!("{identifier} → {outcome:?}"));
            outcomes.push(PluginOutcome {
                identifier,
                outcome,
            });
        }

        let result = reduce_updates(outcomes.iter().map(|o| o.outcome.verdict()));
        outcomes.sort_by(|a, b| a.identifier.cmp(&b.identifier));
        self.logger.info(
            "VERSION",
            format!("{} plugin(s) consulted; verdict {result}", outcomes.len()),
        );
        VersionReport { result, outcomes }
    }

    /// Collect scenarios from every provider, deduplicated and sorted by name.
    ///
    /// Lookups share the version-check time limit; a provider that has not
    /// answered by then contributes nothing.
    pub async fn enumerate_scenarios(&self, candidates: &[Locator]) -> Vec<LoopScenario> {
        if candidates.is_empty() {
            return Vec::new();
        }

        let candidates: Arc<[Locator]> = Arc::from(candidates);
        let deadline = Instant::now() + self.check_timeout;
        let tasks: Vec<_> = self
            .snapshot()
            .iter()
            .filter_map(|entry| {
                let provider = entry.scenario_provider()?;
                Some((
                    entry.identifier().to_string(),
                    spawn_lookup(provider, candidates.clone()),
                ))
            })
            .collect();

        let mut contributions = Vec::with_capacity(tasks.len());
        for (identifier, task) in tasks {
            if let Some(scenarios) = self.await_lookup(&identifier, task, deadline).await {
                contributions.push(scenarios);
            }
        }

        let scenarios = collate_scenarios(contributions);
        self.logger.info(
            "SCENARIO",
            format!(
                "{} candidate(s) yielded {} scenario(s)",
                candidates.len(),
                scenarios.len()
            ),
        );
        scenarios
    }

    /// Make `locator` the catalog's active scenario.
    ///
    /// The earliest registered provider that recognizes the locator owns the
    /// scenario and is told it is now active. Returns `None`, leaving the
    /// catalog untouched, when no provider recognizes it.
    pub async fn activate_scenario(
        &self,
        catalog: &ScenarioCatalog,
        locator: &Locator,
    ) -> Option<LoopScenario> {
        let candidates: Arc<[Locator]> = Arc::from(std::slice::from_ref(locator));
        for entry in self.snapshot() {
            let Some(provider) = entry.scenario_provider() else {
                continue;
            };
            let task = spawn_lookup(provider.clone(), candidates.clone());
            let deadline = Instant::now() + self.check_timeout;
            let Some(found) = self.await_lookup(entry.identifier(), task, deadline).await else {
                continue;
            };
            let Some(scenario) = found.into_iter().find(|s| s.url == *locator) else {
                continue;
            };

            provider.scenario_activated(&scenario);
            catalog.set_active_scenario(Some(locator.clone()));
            self.logger.info(
                "SCENARIO",
                format!("{} activated {} ({locator})", entry.identifier(), scenario.name),
            );
            return Some(scenario);
        }

        self.logger
            .warn("SCENARIO", format!("No provider recognizes {locator}"));
        None
    }

    async fn await_lookup(
        &self,
        identifier: &str,
        task: JoinHandle<Result<Vec<LoopScenario>>>,
        deadline: Instant,
    ) -> Option<Vec<LoopScenario>> {
        match timeout_at(deadline, task).await {
            Ok(Ok(Ok(scenarios))) => {
                self.logger.debug(
                    "SCENARIO",
                    format!("{identifier} recognized {} scenario(s)", scenarios.len()),
                );
                Some(scenarios)
            }
            Ok(Ok(Err(err))) => {
                self.logger
                    .warn("SCENARIO", format!("{identifier} lookup failed: {err}"));
                None
            }
            Ok(Err(err)) => {
                self.logger
                    .error("SCENARIO", format!("{identifier} lookup task aborted: {err}"));
                None
            }
            Err(_) => {
                self.logger.warn(
                    "SCENARIO",
                    format!(
                        "{identifier} lookup timed out after {}ms",
                        self.check_timeout.as_millis()
                    ),
                );
                None
            }
        }
    }

    /// Reset the earliest resettable plugin registered under this identifier.
    ///
    /// Returns `false` when no such plugin exists or none can reset.
    pub fn reset_loop(&self, identifier: &str) -> bool {
        let snapshot = self.snapshot();
        let mut matching = snapshot
            .iter()
            .filter(|entry| entry.identifier() == identifier)
            .peekable();
        if matching.peek().is_none() {
            self.logger
                .warn("RESET", format!("{identifier} is not registered"));
            return false;
        }
        let Some(reset) = matching.find_map(|entry| entry.reset()) else {
            self.logger
                .warn("RESET", format!("{identifier} does not support reset"));
            return false;
        };
        reset.reset_loop();
        self.logger.info("RESET", format!("{identifier} reset"));
        true
    }

    /// True when any resettable plugin asks for a reset.
    pub fn loop_needs_reset(&self) -> bool {
        self.snapshot()
            .iter()
            .filter_map(|entry| entry.reset())
            .any(|reset| reset.loop_needs_reset())
    }
}

fn spawn_lookup(
    provider: Arc<dyn ScenarioProvider>,
    candidates: Arc<[Locator]>,
) -> JoinHandle<Result<Vec<LoopScenario>>> {
    tokio::task::spawn_blocking(move || provider.get_scenarios(&candidates))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::alert::{Alert, AlertIdentifier};
    use crate::plugin::{Reset, VersionCheck};

    struct NullIssuer;

    impl AlertIssuer for NullIssuer {
        fn issue_alert(&self, _alert: Alert) {}
        fn retract_alert(&self, _identifier: &AlertIdentifier) {}
    }

    fn manager() -> SupportManager {
        let issuer: Arc<dyn AlertIssuer> = Arc::new(NullIssuer);
        SupportManager::new(
            BuildInfo::new("org.example.Loop", "1.0.0"),
            Arc::downgrade(&issuer),
            Arc::new(Logger::console(false)),
        )
    }

    struct Slow {
        calls: AtomicUsize,
    }

    impl SupportPlugin for Slow {
        fn identifier(&self) -> &str {
            "slow"
        }

        fn as_version_check(self: Arc<Self>) -> Option<Arc<dyn VersionCheck>> {
            Some(self)
        }
    }

    #[async_trait]
    impl VersionCheck for Slow {
        async fn check_version(&self, _: &str, _: &str) -> Result<Option<VersionUpdate>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(Some(VersionUpdate::Required))
        }
    }

    #[tokio::test]
    async fn timed_out_check_is_contained() {
        let manager = manager().with_check_timeout(Duration::from_millis(20));
        manager.add_support(Arc::new(Slow {
            calls: AtomicUsize::new(0),
        }));

        let report = manager.check_version_report().await;
        assert_eq!(report.result, VersionUpdate::NoUpdateNeeded);
        assert!(matches!(report.outcomes[0].outcome, CheckOutcome::Failed(_)));
    }

    #[tokio::test]
    async fn same_instance_registers_once() {
        let manager = manager().with_check_timeout(Duration::from_millis(20));
        let slow = Arc::new(Slow {
            calls: AtomicUsize::new(0),
        });
        manager.add_support(slow.clone());
        manager.add_support(slow.clone());
        assert_eq!(manager.len(), 1);

        manager.check_version().await;
        assert_eq!(slow.calls.load(Ordering::SeqCst), 1);
    }

    struct Panicky;

    impl SupportPlugin for Panicky {
        fn identifier(&self) -> &str {
            "panicky"
        }

        fn as_version_check(self: Arc<Self>) -> Option<Arc<dyn VersionCheck>> {
            Some(self)
        }
    }

    #[async_trait]
    impl VersionCheck for Panicky {
        async fn check_version(&self, _: &str, _: &str) -> Result<Option<VersionUpdate>> {
            panic!("plugin bug");
        }
    }

    #[tokio::test]
    async fn panicking_check_counts_as_failure() {
        let manager = manager();
        manager.add_support(Arc::new(Panicky));
        let report = manager.check_version_report().await;
        assert_eq!(report.result, VersionUpdate::NoUpdateNeeded);
        assert_eq!(report.outcomes.len(), 1);
    }

    struct Resettable {
        identifier: &'static str,
        needs_reset: bool,
        resets: AtomicUsize,
    }

    impl SupportPlugin for Resettable {
        fn identifier(&self) -> &str {
            self.identifier
        }

        fn as_reset(self: Arc<Self>) -> Option<Arc<dyn Reset>> {
            Some(self)
        }
    }

    impl Reset for Resettable {
        fn reset_loop(&self) {
            self.resets.fetch_add(1, Ordering::SeqCst);
        }

        fn loop_needs_reset(&self) -> bool {
            self.needs_reset
        }
    }

    fn resettable(identifier: &'static str, needs_reset: bool) -> Arc<Resettable> {
        Arc::new(Resettable {
            identifier,
            needs_reset,
            resets: AtomicUsize::new(0),
        })
    }

    #[test]
    fn reset_targets_first_matching_plugin() {
        let manager = manager();
        let first = resettable("dup", false);
        let second = resettable("dup", false);
        manager.add_support(first.clone());
        manager.add_support(second.clone());

        assert!(manager.reset_loop("dup"));
        assert_eq!(first.resets.load(Ordering::SeqCst), 1);
        assert_eq!(second.resets.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn reset_of_unknown_or_incapable_plugin_is_noop() {
        let manager = manager();
        manager.add_support(Arc::new(Panicky));
        assert!(!manager.reset_loop("missing"));
        assert!(!manager.reset_loop("panicky"));
    }

    #[test]
    fn reset_skips_same_named_plugin_without_reset() {
        let manager = manager();
        manager.add_support(Arc::new(Panicky));
        let resettable = resettable("panicky", false);
        manager.add_support(resettable.clone());

        assert!(manager.reset_loop("panicky"));
        assert_eq!(resettable.resets.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn needs_reset_when_any_plugin_asks() {
        let manager = manager();
        manager.add_support(resettable("calm", false));
        assert!(!manager.loop_needs_reset());
        manager.add_support(resettable("dirty", true));
        assert!(manager.loop_needs_reset());
    }

    #[test]
    fn descriptors_follow_registration_order() {
        let manager = manager();
        manager.add_support(resettable("b", false));
        manager.add_support(Arc::new(Panicky));
        let names: Vec<String> = manager
            .available_supports()
            .into_iter()
            .map(|d| d.identifier)
            .collect();
        assert_eq!(names, ["b", "panicky"]);
    }
}

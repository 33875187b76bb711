//! Shared mock plugins for the support manager integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use loop_support_core::{
    Alert, AlertIdentifier, AlertIssuer, BuildInfo, Locator, Logger, LoopScenario, Result,
    ScenarioProvider, SupportError, SupportManager, SupportPlugin, VersionCheck, VersionUpdate,
};

/// Scripted result for a mock version check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scripted {
    Verdict(Option<VersionUpdate>),
    Fail,
}

pub struct MockVersionSupport {
    identifier: String,
    result: Mutex<Scripted>,
    delay: Duration,
    calls: AtomicUsize,
}

impl MockVersionSupport {
    pub fn new(identifier: &str, result: Scripted) -> Arc<Self> {
        Self::delayed(identifier, result, Duration::ZERO)
    }

    pub fn delayed(identifier: &str, result: Scripted, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            identifier: identifier.to_string(),
            result: Mutex::new(result),
            delay,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn set_result(&self, result: Scripted) {
        *self.result.lock().unwrap() = result;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SupportPlugin for MockVersionSupport {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn as_version_check(self: Arc<Self>) -> Option<Arc<dyn VersionCheck>> {
        Some(self)
    }
}

#[async_trait]
impl VersionCheck for MockVersionSupport {
    async fn check_version(&self, _: &str, _: &str) -> Result<Option<VersionUpdate>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let scripted = *self.result.lock().unwrap();
        match scripted {
            Scripted::Verdict(verdict) => Ok(verdict),
            Scripted::Fail => Err(SupportError::plugin(&self.identifier, "scripted failure")),
        }
    }
}

pub struct MockScenarioSupport {
    identifier: String,
    scenarios: Option<Vec<LoopScenario>>,
    delay: Duration,
    activated: Mutex<Vec<Locator>>,
}

impl MockScenarioSupport {
    /// Returns every scenario whose locator is among the candidates.
    pub fn returning(identifier: &str, scenarios: Vec<LoopScenario>) -> Arc<Self> {
        Self::stalled(identifier, scenarios, Duration::ZERO)
    }

    /// Like `returning`, but blocks its thread for `delay` first.
    pub fn stalled(identifier: &str, scenarios: Vec<LoopScenario>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            identifier: identifier.to_string(),
            scenarios: Some(scenarios),
            delay,
            activated: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(identifier: &str) -> Arc<Self> {
        Arc::new(Self {
            identifier: identifier.to_string(),
            scenarios: None,
            delay: Duration::ZERO,
            activated: Mutex::new(Vec::new()),
        })
    }

    pub fn activated(&self) -> Vec<Locator> {
        self.activated.lock().unwrap().clone()
    }
}

impl SupportPlugin for MockScenarioSupport {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn as_scenario_provider(self: Arc<Self>) -> Option<Arc<dyn ScenarioProvider>> {
        Some(self)
    }
}

impl ScenarioProvider for MockScenarioSupport {
    fn get_scenarios(&self, candidates: &[Locator]) -> Result<Vec<LoopScenario>> {
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        match &self.scenarios {
            Some(scenarios) => Ok(scenarios
                .iter()
                .filter(|s| candidates.contains(&s.url))
                .cloned()
                .collect()),
            None => Err(SupportError::plugin(&self.identifier, "scenario lookup failed")),
        }
    }

    fn scenario_activated(&self, scenario: &LoopScenario) {
        self.activated.lock().unwrap().push(scenario.url.clone());
    }
}

/// A plugin declaring no capabilities at all.
pub struct InertSupport;

impl SupportPlugin for InertSupport {
    fn identifier(&self) -> &str {
        "inert"
    }
}

#[derive(Default)]
pub struct RecordingIssuer {
    pub issued: Mutex<Vec<Alert>>,
}

impl AlertIssuer for RecordingIssuer {
    fn issue_alert(&self, alert: Alert) {
        self.issued.lock().unwrap().push(alert);
    }

    fn retract_alert(&self, _identifier: &AlertIdentifier) {}
}

/// Manager plus the strong issuer reference that keeps its weak handle alive.
pub fn manager() -> (SupportManager, Arc<dyn AlertIssuer>) {
    let issuer: Arc<dyn AlertIssuer> = Arc::new(RecordingIssuer::default());
    let manager = SupportManager::new(
        BuildInfo::new("org.example.Loop", "3.0.0"),
        Arc::downgrade(&issuer),
        Arc::new(Logger::console(false)),
    );
    (manager, issuer)
}

/*============================================================
  Synavera Project: Loop Support
  Module: loop_support_core::builtin
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Reference support plugins shipped with Loop Support: a
    release-manifest version check and a scenario directory
    provider with reset support.

  Security / Safety Notes:
    Remote manifests are fetched with read-only HTTPS GET
    requests; no credentials are transmitted.

  Dependencies:
    reqwest for HTTP, serde for manifest parsing, urlencoding
    for query composition.

  Operational Scope:
    Registered by the CLI from configuration. The aggregator
    treats them like any third-party plugin.

  Revision History:
    2026-10-19 COD  Implemented built-in support plugins.
    2026-10-19 COD  Redacted logged manifest URLs; rejected
                    parent components in locators.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Defensive retry logic with exponential backoff
    - Structured response parsing with explicit error paths
============================================================*/

use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::{Arc, OnceLock, Weak};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tokio::time::sleep;
use urlencoding::encode;

use crate::alert::{Alert, AlertIdentifier, AlertIssuer};
use crate::config::{ReleaseManifestConfig, ScenarioSourceConfig};
use crate::error::{Result, SupportError};
use crate::plugin::{Reset, ScenarioProvider, SupportPlugin, VersionCheck};
use crate::scenario::{Locator, LoopScenario};
use crate::version::VersionUpdate;

/// Where a release manifest lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestSource {
    File(PathBuf),
    Remote(String),
}

impl ManifestSource {
    pub fn parse(raw: &str) -> Self {
        if raw.starts_with("http://") || raw.starts_with("https://") {
            ManifestSource::Remote(raw.to_string())
        } else {
            ManifestSource::File(PathBuf::from(raw))
        }
    }
}

/// Published minimum and recommended versions per bundle identifier.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReleaseManifest {
    #[serde(default)]
    pub bundles: HashMap<String, BundleRelease>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BundleRelease {
    pub minimum: Option<String>,
    pub recommended: Option<String>,
}

impl ReleaseManifest {
    /// Verdict for a build; `None` when the bundle is not listed.
    pub fn verdict(&self, bundle_identifier: &str, current_version: &str) -> Option<VersionUpdate> {
        let release = self.bundles.get(bundle_identifier)?;
        let older_than = |floor: &Option<String>| {
            floor
                .as_deref()
                .is_some_and(|floor| compare_versions(current_version, floor) == Ordering::Less)
        };
        if older_than(&release.minimum) {
            Some(VersionUpdate::Required)
        } else if older_than(&release.recommended) {
            Some(VersionUpdate::Recommended)
        } else {
            Some(VersionUpdate::NoUpdateNeeded)
        }
    }
}

/// Compare dot-separated versions numerically; missing components are zero.
pub fn compare_versions(left: &str, right: &str) -> Ordering {
    let parse = |version: &str| -> Vec<u64> {
        version
            .trim()
            .trim_start_matches(['v', 'V'])
            .split('.')
            .map(|component| {
                let digits: String = component.chars().take_while(char::is_ascii_digit).collect();
                digits.parse().unwrap_or(0)
            })
            .collect()
    };
    let (left, right) = (parse(left), parse(right));
    let width = left.len().max(right.len());
    (0..width)
        .map(|i| {
            let l = left.get(i).copied().unwrap_or(0);
            let r = right.get(i).copied().unwrap_or(0);
            l.cmp(&r)
        })
        .find(|ordering| *ordering != Ordering::Equal)
        .unwrap_or(Ordering::Equal)
}

/// Version check backed by a release manifest file or URL.
pub struct ReleaseManifestSupport {
    identifier: String,
    source: ManifestSource,
    client: reqwest::Client,
    max_retries: usize,
}

impl ReleaseManifestSupport {
    pub fn new(config: &ReleaseManifestConfig, request_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .user_agent(concat!("Loop-Support/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| SupportError::Network(format!("Failed to build HTTP client: {err}")))?;

        Ok(Self {
            identifier: config.identifier.clone(),
            source: ManifestSource::parse(&config.source),
            client,
            max_retries: config.max_retries.max(1),
        })
    }

    pub fn source(&self) -> &ManifestSource {
        &self.source
    }

    async fn load_manifest(
        &self,
        bundle_identifier: &str,
        version: &str,
    ) -> Result<ReleaseManifest> {
        match &self.source {
            ManifestSource::File(path) => self.read_manifest(path).await,
            ManifestSource::Remote(url) => {
                self.fetch_manifest(&compose_url(url, bundle_identifier, version))
                    .await
            }
        }
    }

    async fn read_manifest(&self, path: &Path) -> Result<ReleaseManifest> {
        let raw = tokio::fs::read(path).await.map_err(|err| {
            SupportError::plugin(
                &self.identifier,
                format!("Failed to read manifest {}: {err}", path.display()),
            )
        })?;
        serde_json::from_slice(&raw).map_err(|err| {
            SupportError::Serialization(format!(
                "Failed to decode manifest {}: {err}",
                path.display()
            ))
        })
    }

    async fn fetch_manifest(&self, url: &str) -> Result<ReleaseManifest> {
        let mut attempt = 0;
        loop {
            let response = self.client.get(url).send().await.map_err(|err| {
                SupportError::Network(format!(
                    "Manifest request to {} failed: {}",
                    redact_query(url),
                    err.without_url()
                ))
            })?;

            if response.status() == StatusCode::OK {
                return response.json::<ReleaseManifest>().await.map_err(|err| {
                    SupportError::Serialization(format!("Failed to decode manifest: {err}"))
                });
            }

            attempt += 1;
            if attempt >= self.max_retries {
                return Err(SupportError::Network(format!(
                    "Manifest request {} failed with status {} after {attempt} attempts",
                    redact_query(url),
                    response.status()
                )));
            }
            let exponent = (attempt as u32).min(8);
            sleep(Duration::from_millis(200_u64.saturating_mul(1_u64 << exponent))).await;
        }
    }
}

/// Drop the query and any userinfo so logged URLs carry no tokens.
fn redact_query(url: &str) -> String {
    let bare = url.split(['?', '#']).next().unwrap_or(url);
    match bare.split_once("://") {
        Some((scheme, rest)) => {
            let host_start = rest
                .find('/')
                .map_or(rest, |slash| &rest[..slash])
                .rfind('@')
                .map_or(0, |at| at + 1);
            format!("{scheme}://{}", &rest[host_start..])
        }
        None => bare.to_string(),
    }
}

fn compose_url(base: &str, bundle_identifier: &str, version: &str) -> String {
    let separator = if base.contains('?') { '&' } else { '?' };
    format!(
        "{base}{separator}bundle={}&version={}",
        encode(bundle_identifier),
        encode(version)
    )
}

impl SupportPlugin for ReleaseManifestSupport {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn as_version_check(self: Arc<Self>) -> Option<Arc<dyn VersionCheck>> {
        Some(self)
    }
}

#[async_trait]
impl VersionCheck for ReleaseManifestSupport {
    async fn check_version(
        &self,
        bundle_identifier: &str,
        current_version: &str,
    ) -> Result<Option<VersionUpdate>> {
        let manifest = self.load_manifest(bundle_identifier, current_version).await?;
        Ok(manifest.verdict(bundle_identifier, current_version))
    }
}

/// Scenario provider for JSON fixtures under a root directory.
///
/// Also resettable: loading a scenario marks the loop as needing a reset
/// and raises an alert until `reset_loop` clears it.
pub struct ScenarioDirectorySupport {
    identifier: String,
    root: PathBuf,
    needs_reset: AtomicBool,
    alert_issuer: OnceLock<Weak<dyn AlertIssuer>>,
}

impl ScenarioDirectorySupport {
    pub fn new(config: &ScenarioSourceConfig) -> Self {
        Self {
            identifier: config.identifier.clone(),
            root: config.root.clone(),
            needs_reset: AtomicBool::new(false),
            alert_issuer: OnceLock::new(),
        }
    }

    fn reset_alert_identifier(&self) -> AlertIdentifier {
        AlertIdentifier::new(&self.identifier, "loopNeedsReset")
    }

    fn issuer(&self) -> Option<Arc<dyn AlertIssuer>> {
        self.alert_issuer.get().and_then(Weak::upgrade)
    }

    /// Record that scenario data was injected and the loop must be reset.
    fn mark_needs_reset(&self) {
        if self.needs_reset.swap(true, AtomicOrdering::SeqCst) {
            return;
        }
        if let Some(issuer) = self.issuer() {
            issuer.issue_alert(Alert {
                identifier: self.reset_alert_identifier(),
                title: "Loop reset required".into(),
                body: format!("Scenario data from {} is active.", self.root.display()),
            });
        }
    }

    fn recognize(&self, locator: &Locator) -> Option<LoopScenario> {
        let path = locator.to_path()?;
        let escapes = path
            .components()
            .any(|component| matches!(component, Component::ParentDir));
        if escapes || !path.starts_with(&self.root) {
            return None;
        }
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if !is_json {
            return None;
        }
        let name = path.file_stem()?.to_string_lossy().into_owned();
        Some(LoopScenario::new(name, locator.clone()))
    }
}

impl SupportPlugin for ScenarioDirectorySupport {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn as_scenario_provider(self: Arc<Self>) -> Option<Arc<dyn ScenarioProvider>> {
        Some(self)
    }

    fn as_reset(self: Arc<Self>) -> Option<Arc<dyn Reset>> {
        Some(self)
    }

    fn attach_alert_issuer(&self, issuer: Weak<dyn AlertIssuer>) {
        // First registration wins.
        let _ = self.alert_issuer.set(issuer);
    }
}

impl ScenarioProvider for ScenarioDirectorySupport {
    fn get_scenarios(&self, candidates: &[Locator]) -> Result<Vec<LoopScenario>> {
        Ok(candidates
            .iter()
            .filter_map(|locator| self.recognize(locator))
            .collect())
    }

    fn scenario_activated(&self, _scenario: &LoopScenario) {
        self.mark_needs_reset();
    }
}

impl Reset for ScenarioDirectorySupport {
    fn reset_loop(&self) {
        if !self.needs_reset.swap(false, AtomicOrdering::SeqCst) {
            return;
        }
        if let Some(issuer) = self.issuer() {
            issuer.retract_alert(&self.reset_alert_identifier());
        }
    }

    fn loop_needs_reset(&self) -> bool {
        self.needs_reset.load(AtomicOrdering::SeqCst)
    }
}

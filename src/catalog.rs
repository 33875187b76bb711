/*============================================================
  Synavera Project: Loop Support
  Module: loop_support_core::catalog
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Track candidate scenario files on disk and notify
    subscribers whenever the candidate set changes, so they
    can re-run scenario enumeration.

  Security / Safety Notes:
    Lists a single operator-configured directory; files are
    never opened or parsed here.

  Dependencies:
    tokio::fs for async listing, tokio::sync::watch for
    change notification.

  Operational Scope:
    Constructed only when scenarios are enabled in config;
    consumed by presentation layers and the CLI.

  Revision History:
    2026-10-19 COD  Authored scenario catalog.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Feature gate expressed as an absent instance
    - Notifications fire on change only
============================================================*/

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;

use crate::config::SupportConfig;
use crate::error::{Result, SupportError};
use crate::logger::Logger;
use crate::scenario::Locator;

const SCENARIO_EXTENSION: &str = "json";

/// Candidate scenario locators plus change notification.
pub struct ScenarioCatalog {
    directory: PathBuf,
    candidates: watch::Sender<Vec<Locator>>,
    active: Mutex<Option<Locator>>,
    logger: Arc<Logger>,
}

impl ScenarioCatalog {
    pub fn new(directory: PathBuf, logger: Arc<Logger>) -> Self {
        let (candidates, _) = watch::channel(Vec::new());
        Self {
            directory,
            candidates,
            active: Mutex::new(None),
            logger,
        }
    }

    /// `None` when scenarios are disabled.
    pub fn from_config(config: &SupportConfig, logger: Arc<Logger>) -> Option<Self> {
        if !config.scenarios_enabled {
            logger.debug("CATALOG", "Scenarios disabled; catalog not constructed");
            return None;
        }
        Some(Self::new(config.scenario_dir(), logger))
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Receiver that observes every published candidate set.
    pub fn subscribe(&self) -> watch::Receiver<Vec<Locator>> {
        self.candidates.subscribe()
    }

    pub fn candidate_urls(&self) -> Vec<Locator> {
        self.candidates.borrow().clone()
    }

    /// Replace the candidate set, notifying subscribers if it changed.
    pub fn publish(&self, urls: Vec<Locator>) -> bool {
        let count = urls.len();
        let changed = self.candidates.send_if_modified(|current| {
            if *current == urls {
                false
            } else {
                *current = urls;
                true
            }
        });
        if changed {
            self.logger
                .info("CATALOG", format!("{count} candidate scenario file(s)"));
        }
        changed
    }

    /// List `*.json` files in the scenario directory and publish them.
    ///
    /// A missing directory publishes an empty set.
    pub async fn rescan(&self) -> Result<Vec<Locator>> {
        let urls = match list_scenario_files(&self.directory).await {
            Ok(urls) => urls,
            Err(SupportError::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {
                self.logger.warn(
                    "CATALOG",
                    format!("Scenario directory {} missing", self.directory.display()),
                );
                Vec::new()
            }
            Err(err) => return Err(err),
        };
        self.publish(urls.clone());
        Ok(urls)
    }

    pub fn active_scenario(&self) -> Option<Locator> {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_active_scenario(&self, locator: Option<Locator>) {
        *self.active.lock().unwrap_or_else(PoisonError::into_inner) = locator;
    }
}

async fn list_scenario_files(directory: &Path) -> Result<Vec<Locator>> {
    let mut entries = tokio::fs::read_dir(directory).await?;
    let mut urls = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_scenario = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(SCENARIO_EXTENSION));
        if is_scenario && entry.file_type().await?.is_file() {
            urls.push(Locator::from_path(&path));
        }
    }
    urls.sort();
    Ok(urls)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog(dir: &Path) -> ScenarioCatalog {
        ScenarioCatalog::new(dir.to_path_buf(), Arc::new(Logger::console(false)))
    }

    #[test]
    fn disabled_config_builds_nothing() {
        let config = SupportConfig::default();
        assert!(ScenarioCatalog::from_config(&config, Arc::new(Logger::console(false))).is_none());

        let enabled = SupportConfig {
            scenarios_enabled: true,
            scenario_dir: Some(PathBuf::from("/tmp/scenarios")),
            ..SupportConfig::default()
        };
        let catalog =
            ScenarioCatalog::from_config(&enabled, Arc::new(Logger::console(false))).unwrap();
        assert_eq!(catalog.directory(), Path::new("/tmp/scenarios"));
    }

    #[tokio::test]
    async fn rescan_lists_json_files_sorted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.json"), "{}").unwrap();
        std::fs::write(dir.path().join("a.JSON"), "{}").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "").unwrap();
        std::fs::create_dir(dir.path().join("nested.json")).unwrap();

        let catalog = catalog(dir.path());
        let urls = catalog.rescan().await.unwrap();
        let expected = vec![
            Locator::from_path(&dir.path().join("a.JSON")),
            Locator::from_path(&dir.path().join("b.json")),
        ];
        assert_eq!(urls, expected);
        assert_eq!(catalog.candidate_urls(), expected);
    }

    #[tokio::test]
    async fn subscribers_see_changes_only() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = catalog(dir.path());
        let mut updates = catalog.subscribe();

        assert!(catalog.publish(vec![Locator::new("file:///x.json")]));
        updates.changed().await.unwrap();
        assert_eq!(updates.borrow_and_update().len(), 1);

        assert!(!catalog.publish(vec![Locator::new("file:///x.json")]));
        assert!(!updates.has_changed().unwrap());
    }

    #[tokio::test]
    async fn missing_directory_publishes_empty_set() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = catalog(&dir.path().join("absent"));
        catalog.publish(vec![Locator::new("file:///stale.json")]);
        assert!(catalog.rescan().await.unwrap().is_empty());
        assert!(catalog.candidate_urls().is_empty());
    }

    #[test]
    fn tracks_active_scenario() {
        let catalog = catalog(Path::new("/tmp"));
        assert!(catalog.active_scenario().is_none());
        catalog.set_active_scenario(Some(Locator::new("file:///tmp/a.json")));
        assert_eq!(
            catalog.active_scenario(),
            Some(Locator::new("file:///tmp/a.json"))
        );
    }
}

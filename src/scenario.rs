/*============================================================
  Synavera Project: Loop Support
  Module: loop_support_core::scenario
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Describe testing scenarios and collapse the lists returned
    by many scenario providers into one ordered catalog.

  Security / Safety Notes:
    Locators are opaque strings; nothing here dereferences
    them or touches the filesystem.

  Dependencies:
    serde for JSON listings.

  Operational Scope:
    Used by the support aggregator after scenario fan-in and
    by plugins to build scenario values.

  Revision History:
    2026-10-19 COD  Authored scenario identity and collation.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Identity by backing locator, never by display name
    - Deterministic ordering for reproducible listings
============================================================*/

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

const FILE_SCHEME: &str = "file://";

/// Canonical string form of a scenario's backing resource.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Locator(String);

impl Locator {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Build a `file://` locator for a filesystem path.
    pub fn from_path(path: &Path) -> Self {
        Self(format!("{FILE_SCHEME}{}", path.display()))
    }

    /// Filesystem path for `file://` locators.
    pub fn to_path(&self) -> Option<PathBuf> {
        self.0.strip_prefix(FILE_SCHEME).map(PathBuf::from)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Locator {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// A named testing scenario backed by a uniquely located resource.
///
/// Equality and hashing consider the locator only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoopScenario {
    pub name: String,
    pub url: Locator,
}

impl LoopScenario {
    pub fn new(name: impl Into<String>, url: impl Into<Locator>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

impl PartialEq for LoopScenario {
    fn eq(&self, other: &Self) -> bool {
        self.url == other.url
    }
}

impl Eq for LoopScenario {}

impl Hash for LoopScenario {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.url.hash(state);
    }
}

/// Merge provider contributions into one catalog.
///
/// The first value seen for a locator is kept. Output is sorted by name,
/// then by locator so equal names still come out in a fixed order.
pub fn collate_scenarios<I>(contributions: I) -> Vec<LoopScenario>
where
    I: IntoIterator<Item = Vec<LoopScenario>>,
{
    let mut unique: HashMap<String, LoopScenario> = HashMap::new();
    for scenario in contributions.into_iter().flatten() {
        unique
            .entry(scenario.url.as_str().to_string())
            .or_insert(scenario);
    }

    let mut scenarios: Vec<LoopScenario> = unique.into_values().collect();
    scenarios.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.url.cmp(&b.url)));
    scenarios
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_ignores_name() {
        let a = LoopScenario::new("Alpha", "file:///s/a.json");
        let renamed = LoopScenario::new("Renamed", "file:///s/a.json");
        let elsewhere = LoopScenario::new("Alpha", "file:///s/b.json");
        assert_eq!(a, renamed);
        assert_ne!(a, elsewhere);
    }

    #[test]
    fn shared_locators_collapse() {
        let first = vec![LoopScenario::new("Alpha", "loc1")];
        let second = vec![
            LoopScenario::new("Alpha", "loc1"),
            LoopScenario::new("Beta", "loc2"),
        ];
        let merged = collate_scenarios([first, second]);
        let names: Vec<&str> = merged.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["Alpha", "Beta"]);
    }

    #[test]
    fn first_seen_value_is_kept() {
        let merged = collate_scenarios([
            vec![LoopScenario::new("Original", "loc1")],
            vec![LoopScenario::new("Duplicate", "loc1")],
        ]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].name, "Original");
    }

    #[test]
    fn equal_names_order_by_locator() {
        let merged = collate_scenarios([vec![
            LoopScenario::new("Same", "loc-b"),
            LoopScenario::new("Same", "loc-a"),
        ]]);
        let urls: Vec<&str> = merged.iter().map(|s| s.url.as_str()).collect();
        assert_eq!(urls, ["loc-a", "loc-b"]);
    }

    #[test]
    fn file_locators_round_trip_paths() {
        let path = Path::new("/var/lib/scenarios/high.json");
        let locator = Locator::from_path(path);
        assert_eq!(locator.as_str(), "file:///var/lib/scenarios/high.json");
        assert_eq!(locator.to_path().as_deref(), Some(path));
        assert!(Locator::new("https://example.org/a.json").to_path().is_none());
    }
}

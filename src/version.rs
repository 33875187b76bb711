/*============================================================
  Synavera Project: Loop Support
  Module: loop_support_core::version
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Define the version-update severity lattice and the merge
    used to fold many plugin verdicts into one.

  Security / Safety Notes:
    Pure data and arithmetic; no I/O performed in this module.

  Dependencies:
    serde for report serialization.

  Operational Scope:
    Consumed by the support aggregator and version-check
    plugins.

  Revision History:
    2026-10-19 COD  Introduced VersionUpdate lattice.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Total ordering declared once, in variant order
    - Order-insensitive merge for concurrent fan-in
============================================================*/

use std::fmt;

use serde::{Deserialize, Serialize};

/// Urgency of a software update, ascending severity.
///
/// Variant order is the lattice order; `merge` is the maximum.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum VersionUpdate {
    #[default]
    None,
    NoUpdateNeeded,
    Recommended,
    Required,
}

impl VersionUpdate {
    /// Every level, lowest first.
    pub const ALL: [VersionUpdate; 4] = [
        VersionUpdate::None,
        VersionUpdate::NoUpdateNeeded,
        VersionUpdate::Recommended,
        VersionUpdate::Required,
    ];

    /// Least upper bound of two verdicts.
    pub fn merge(self, other: VersionUpdate) -> VersionUpdate {
        self.max(other)
    }

    /// True when the operator should be prompted to update.
    pub fn is_update_available(self) -> bool {
        matches!(self, VersionUpdate::Recommended | VersionUpdate::Required)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            VersionUpdate::None => "none",
            VersionUpdate::NoUpdateNeeded => "noUpdateNeeded",
            VersionUpdate::Recommended => "recommended",
            VersionUpdate::Required => "required",
        }
    }
}

impl fmt::Display for VersionUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fold plugin verdicts into one aggregate verdict.
///
/// Missing opinions count as `NoUpdateNeeded`, and so does an empty input.
pub fn reduce_updates<I>(verdicts: I) -> VersionUpdate
where
    I: IntoIterator<Item = Option<VersionUpdate>>,
{
    verdicts
        .into_iter()
        .map(|verdict| verdict.unwrap_or(VersionUpdate::NoUpdateNeeded))
        .fold(VersionUpdate::NoUpdateNeeded, VersionUpdate::merge)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lattice_is_ascending() {
        for pair in VersionUpdate::ALL.windows(2) {
            assert!(pair[0] < pair[1], "{} !< {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn reduce_defaults_to_no_update_needed() {
        let empty: Vec<Option<VersionUpdate>> = Vec::new();
        assert_eq!(reduce_updates(empty), VersionUpdate::NoUpdateNeeded);
        let silent: [Option<VersionUpdate>; 2] = [None, None];
        assert_eq!(reduce_updates(silent), VersionUpdate::NoUpdateNeeded);
    }

    #[test]
    fn none_verdict_never_lowers_the_floor() {
        assert_eq!(
            reduce_updates([Some(VersionUpdate::None)]),
            VersionUpdate::NoUpdateNeeded
        );
    }

    #[test]
    fn highest_verdict_wins() {
        let verdicts = [
            Some(VersionUpdate::Recommended),
            None,
            Some(VersionUpdate::Required),
            Some(VersionUpdate::NoUpdateNeeded),
        ];
        assert_eq!(reduce_updates(verdicts), VersionUpdate::Required);
    }

    #[test]
    fn serializes_in_camel_case() {
        let encoded = serde_json::to_string(&VersionUpdate::NoUpdateNeeded).unwrap();
        assert_eq!(encoded, "\"noUpdateNeeded\"");
        let decoded: VersionUpdate = serde_json::from_str("\"required\"").unwrap();
        assert_eq!(decoded, VersionUpdate::Required);
    }

    #[test]
    fn only_recommended_and_required_prompt() {
        let prompting: Vec<_> = VersionUpdate::ALL
            .into_iter()
            .filter(|level| level.is_update_available())
            .collect();
        assert_eq!(
            prompting,
            vec![VersionUpdate::Recommended, VersionUpdate::Required]
        );
    }
}

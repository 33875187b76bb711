/*============================================================
  Synavera Project: Loop Support
  Module: loop_support_core::alert
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Define the alert boundary through which support plugins
    raise and retract operator alerts outside request flow.

  Security / Safety Notes:
    Alert bodies are plugin-authored text and are logged as-is.

  Dependencies:
    serde for alert payloads.

  Operational Scope:
    The aggregator hands a weak reference to an AlertIssuer to
    each plugin at registration and never calls it itself.

  Revision History:
    2026-10-19 COD  Added alert boundary and logging issuer.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Non-owning references across plugin boundaries
    - Safe concurrent use from many plugin tasks
============================================================*/

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::logger::Logger;

/// Identifies an alert by the issuing plugin and a plugin-local key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AlertIdentifier {
    pub manager_identifier: String,
    pub alert_identifier: String,
}

impl AlertIdentifier {
    pub fn new(manager_identifier: impl Into<String>, alert_identifier: impl Into<String>) -> Self {
        Self {
            manager_identifier: manager_identifier.into(),
            alert_identifier: alert_identifier.into(),
        }
    }
}

impl fmt::Display for AlertIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.manager_identifier, self.alert_identifier)
    }
}

/// An operator-facing alert raised by a plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub identifier: AlertIdentifier,
    pub title: String,
    pub body: String,
}

/// Sink for plugin-originated alerts. Must tolerate concurrent callers.
pub trait AlertIssuer: Send + Sync {
    fn issue_alert(&self, alert: Alert);
    fn retract_alert(&self, identifier: &AlertIdentifier);
}

/// Alert issuer that logs traffic and remembers which alerts are live.
pub struct LoggingAlertIssuer {
    logger: Arc<Logger>,
    active: Mutex<BTreeMap<AlertIdentifier, Alert>>,
}

impl LoggingAlertIssuer {
    pub fn new(logger: Arc<Logger>) -> Self {
        Self {
            logger,
            active: Mutex::new(BTreeMap::new()),
        }
    }

    /// Snapshot of currently issued alerts, ordered by identifier.
    pub fn active_alerts(&self) -> Vec<Alert> {
        match self.active.lock() {
            Ok(guard) => guard.values().cloned().collect(),
            Err(poisoned) => poisoned.into_inner().values().cloned().collect(),
        }
    }

    fn with_active<R>(&self, f: impl FnOnce(&mut BTreeMap<AlertIdentifier, Alert>) -> R) -> R {
        match self.active.lock() {
            Ok(mut guard) => f(&mut *guard),
            Err(poisoned) => f(&mut *poisoned.into_inner()),
        }
    }
}

impl AlertIssuer for LoggingAlertIssuer {
    fn issue_alert(&self, alert: Alert) {
        self.logger.warn(
            "ALERT",
            format!("{} issued: {} ({})", alert.identifier, alert.title, alert.body),
        );
        self.with_active(|active| {
            active.insert(alert.identifier.clone(), alert);
        });
    }

    fn retract_alert(&self, identifier: &AlertIdentifier) {
        let removed = self.with_active(|active| active.remove(identifier).is_some());
        if removed {
            self.logger.info("ALERT", format!("{identifier} retracted"));
        } else {
            self.logger
                .debug("ALERT", format!("{identifier} retracted but was not active"));
        }
    }
}

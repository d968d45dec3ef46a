//! # Batch Installer
//!
//! Runs many installs at once on blocking workers.
//!
//! - at most `jobs` installs execute concurrently (semaphore)
//! - installs of the SAME definition serialize through a per-name lock
//! - one failure never affects another definition's outcome

use super::{InstallOutcome, InstallRequest, Orchestrator};
use fwcat_core::{CatalogError, ResolvedFrameworkDefinition};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::Semaphore;

/// Outcome of one definition within a batch.
#[derive(Debug)]
pub struct InstallReport {
    pub name: String,
    pub result: Result<InstallOutcome, CatalogError>,
}

impl InstallReport {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// JSON view for `--json-mode`.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match &self.result {
            Ok(outcome) => serde_json::json!({
                "name": self.name,
                "ok": true,
                "outcome": outcome,
            }),
            Err(e) => serde_json::json!({
                "name": self.name,
                "ok": false,
                "error": e.to_string(),
                "kind": format!("{:?}", e.kind()),
            }),
        }
    }
}

#[derive(Debug, Serialize)]
struct Summary {
    requested: usize,
    succeeded: usize,
    failed: usize,
}

/// Count successes and failures.
#[must_use]
pub fn summarize(reports: &[InstallReport]) -> serde_json::Value {
    let succeeded = reports.iter().filter(|r| r.is_success()).count();
    serde_json::to_value(Summary {
        requested: reports.len(),
        succeeded,
        failed: reports.len() - succeeded,
    })
    .unwrap_or_default()
}

// =============================================================================
// LOCK MAP
// =============================================================================

/// name → async mutex. Entries are created on first use and kept.
#[derive(Default)]
struct LockMap {
    inner: Mutex<BTreeMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl LockMap {
    fn lock_for(&self, name: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(map.entry(name.to_string()).or_default())
    }
}

// =============================================================================
// INSTALLER
// =============================================================================

/// Cheap to clone; clones share the semaphore and the lock map.
#[derive(Clone)]
pub struct BatchInstaller {
    orchestrator: Arc<Orchestrator>,
    permits: Arc<Semaphore>,
    locks: Arc<LockMap>,
}

impl BatchInstaller {
    /// `jobs` is clamped to at least one.
    pub fn new(orchestrator: Arc<Orchestrator>, jobs: usize) -> Self {
        Self {
            orchestrator,
            permits: Arc::new(Semaphore::new(jobs.max(1))),
            locks: Arc::new(LockMap::default()),
        }
    }

    #[must_use]
    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    /// Install one definition on a blocking worker.
    pub async fn install(
        &self,
        definition: ResolvedFrameworkDefinition,
        request: InstallRequest,
    ) -> InstallReport {
        let name = definition.name.clone();
        let result = self.run(definition, request).await;
        if let Err(e) = &result {
            tracing::error!(framework = %name, error = %e, "Install failed");
        }
        InstallReport { name, result }
    }

    async fn run(
        &self,
        definition: ResolvedFrameworkDefinition,
        request: InstallRequest,
    ) -> Result<InstallOutcome, CatalogError> {
        let name = definition.name.clone();

        // Name lock before the permit: a waiter on a busy name holds no job slot.
        let guard = self.locks.lock_for(&name).lock_owned().await;
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|e| CatalogError::execution(&name, "schedule", e.to_string()))?;

        let orchestrator = Arc::clone(&self.orchestrator);
        tokio::task::spawn_blocking(move || {
            let _guard = guard;
            let _permit = permit;
            orchestrator.install(&definition, &request)
        })
        .await
        .map_err(|e| CatalogError::execution(&name, "worker", e.to_string()))?
    }

    /// Install every item concurrently. Reports come back in input order.
    pub async fn install_all(
        &self,
        items: Vec<(ResolvedFrameworkDefinition, InstallRequest)>,
    ) -> Vec<InstallReport> {
        let handles: Vec<_> = items
            .into_iter()
            .map(|(definition, request)| {
                let name = definition.name.clone();
                let installer = self.clone();
                let handle =
                    tokio::spawn(async move { installer.install(definition, request).await });
                (name, handle)
            })
            .collect();

        let mut reports = Vec::with_capacity(handles.len());
        for (name, handle) in handles {
            let report = match handle.await {
                Ok(report) => report,
                Err(e) => InstallReport {
                    result: Err(CatalogError::execution(&name, "worker", e.to_string())),
                    name,
                },
            };
            reports.push(report);
        }
        reports
    }
}

//! Install and activate: populating and pruning cache generations.

use tracing::{info, warn};

use crate::models::Request;

use super::{ServiceWorker, WorkerError, WorkerState};

/// What an activation sweep removed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivationReport {
    pub deleted: Vec<String>,
    pub kept: Vec<String>,
}

impl ServiceWorker {
    /// Populate the static cache with the app shell, all or nothing.
    ///
    /// On failure the worker becomes redundant and the static cache holds no
    /// entries; the platform is expected to retry with a fresh worker.
    pub async fn install(&mut self) -> Result<(), WorkerError> {
        if self.state != WorkerState::Parsed {
            return Err(WorkerError::InvalidState {
                action: "install",
                state: self.state,
            });
        }
        info!("Installing worker");
        self.state = WorkerState::Installing;

        match self.precache().await {
            Ok(count) => {
                info!(cache = %self.config.cache_names.static_assets, assets = count, "Cached static assets");
                self.state = WorkerState::Installed;
                self.skip_waiting = true;
                info!("Skip waiting on install");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Install failed");
                self.state = WorkerState::Redundant;
                Err(e)
            }
        }
    }

    async fn precache(&self) -> Result<usize, WorkerError> {
        let requests = self
            .config
            .static_assets
            .iter()
            .map(|asset| Request::resolve(&self.config.origin, asset))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| WorkerError::Manifest(e.to_string()))?;

        let cache = self
            .storage
            .open(&self.config.cache_names.static_assets)
            .await
            .map_err(WorkerError::Install)?;
        cache
            .add_all(&requests, self.fetcher.as_ref())
            .await
            .map_err(WorkerError::Install)?;
        Ok(requests.len())
    }

    /// Delete every cache generation that isn't currently recognized, then
    /// take control of open pages.
    pub async fn activate(&mut self) -> Result<ActivationReport, WorkerError> {
        if self.state != WorkerState::Installed {
            return Err(WorkerError::InvalidState {
                action: "activate",
                state: self.state,
            });
        }
        info!("Activating worker");
        self.state = WorkerState::Activating;

        let mut report = ActivationReport::default();
        for name in self.storage.keys().await {
            if self.config.cache_names.is_recognized(&name) {
                report.kept.push(name);
                continue;
            }
            info!(cache = %name, "Deleting old cache");
            self.storage
                .delete(&name)
                .await
                .map_err(WorkerError::Activate)?;
            report.deleted.push(name);
        }

        self.state = WorkerState::Activated;
        self.clients_claimed = true;
        info!("Claiming clients");
        Ok(report)
    }
}

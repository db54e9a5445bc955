//! Waiting on dev-server rebuilds for script file names.

use crate::error::{CrxError, Result};
use crate::host::Rebuilder;
use crate::registry::SharedRegistry;
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct Generations {
    started: u64,
    finished: u64,
}

/// Runs the external rebuild, one at a time.
///
/// A request is satisfied by any rebuild that starts after it was made, so
/// callers queued behind a running rebuild share the next one.
pub struct RebuildScheduler {
    rebuilder: Arc<dyn Rebuilder>,
    generations: Mutex<Generations>,
    running: tokio::sync::Mutex<()>,
}

impl RebuildScheduler {
    pub fn new(rebuilder: Arc<dyn Rebuilder>) -> Self {
        Self {
            rebuilder,
            generations: Mutex::new(Generations::default()),
            running: tokio::sync::Mutex::new(()),
        }
    }

    /// Number of rebuilds that completed successfully.
    pub fn completed(&self) -> u64 {
        self.generations.lock().map(|g| g.finished).unwrap_or(0)
    }

    pub async fn request(&self) -> Result<()> {
        self.request_while(|| Ok(true)).await.map(|_| ())
    }

    /// Like [`request`](Self::request), but once it is this caller's turn
    /// `still_needed` is asked again, and no rebuild runs when it says no.
    /// Returns whether this call ran a rebuild.
    pub async fn request_while<F>(&self, still_needed: F) -> Result<bool>
    where
        F: Fn() -> Result<bool>,
    {
        let wanted = self.generations.lock().map_err(|_| CrxError::Poisoned)?.started + 1;
        let _running = self.running.lock().await;

        if self.generations.lock().map_err(|_| CrxError::Poisoned)?.finished >= wanted {
            return Ok(false);
        }
        if !still_needed()? {
            return Ok(false);
        }
        let generation = {
            let mut g = self.generations.lock().map_err(|_| CrxError::Poisoned)?;
            g.started += 1;
            g.started
        };

        tracing::info!("rebuilding extension files (#{})", generation);
        self.rebuilder.rebuild().await.map_err(CrxError::Rebuild)?;

        let mut g = self.generations.lock().map_err(|_| CrxError::Poisoned)?;
        g.finished = g.finished.max(generation);
        Ok(true)
    }
}

/// Answers "what is this script's file name" in serve mode, rebuilding once
/// when the name is not known yet.
pub struct RebuildGate {
    registry: SharedRegistry,
    scheduler: Arc<RebuildScheduler>,
}

impl RebuildGate {
    pub fn new(registry: SharedRegistry, scheduler: Arc<RebuildScheduler>) -> Self {
        Self { registry, scheduler }
    }

    pub fn scheduler(&self) -> &Arc<RebuildScheduler> {
        &self.scheduler
    }

    fn lookup(&self, script_id: &str) -> Result<Option<String>> {
        let registry = self.registry.read().map_err(|_| CrxError::Poisoned)?;
        let record = registry.get(script_id).ok_or_else(|| CrxError::UnknownScript {
            script_id: script_id.to_string(),
        })?;
        Ok(record.loader_file_name.clone())
    }

    pub async fn file_name(&self, script_id: &str) -> Result<String> {
        if let Some(name) = self.lookup(script_id)? {
            return Ok(name);
        }

        tracing::debug!("{} has no file name yet, waiting for rebuild", script_id);
        // A rebuild that finished while this request queued may already
        // have produced the name.
        self.scheduler
            .request_while(|| Ok(self.lookup(script_id)?.is_none()))
            .await?;

        self.lookup(script_id)?.ok_or_else(|| CrxError::UnresolvedAfterRebuild {
            script_id: script_id.to_string(),
        })
    }
}

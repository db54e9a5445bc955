//! Build-start emission of registered scripts.

use crate::config::{BuildMode, Preamble};
use crate::error::{CrxError, Result};
use crate::host::{PluginContext, RefId};
use crate::preamble::{resolve_preamble, FrameworkIntegration, PREAMBLE_CHUNK_NAME, PREAMBLE_CODE_ID};
use crate::registry::{ScriptRegistry, SharedRegistry};

/// What build-start left behind for the later phases.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BuildStartOutcome {
    /// Script ids that received a ref during this call.
    pub emitted: Vec<String>,
    pub preamble_code: Option<String>,
    pub preamble_ref: Option<RefId>,
}

/// Return the script's ref, emitting its chunk first if it has none.
pub fn ensure_emitted(
    ctx: &mut dyn PluginContext,
    registry: &mut ScriptRegistry,
    script_id: &str,
) -> Result<RefId> {
    let record = registry.get(script_id).ok_or_else(|| CrxError::UnknownScript {
        script_id: script_id.to_string(),
    })?;
    if let Some(ref_id) = &record.ref_id {
        return Ok(ref_id.clone());
    }

    let source = record.source_id.to_string_lossy().to_string();
    let name = record.display_name();
    let ref_id = ctx.emit_chunk(&source, &name).map_err(CrxError::Host)?;
    tracing::debug!("emitted {} as {} (ref {})", script_id, name, ref_id);

    registry.assign_ref(script_id, ref_id.clone())?;
    Ok(ref_id)
}

/// Emit a chunk for every record without a ref. Records that already have
/// one are left alone, so calling this again on a rebuild only picks up
/// scripts registered since.
pub fn emit_pending(ctx: &mut dyn PluginContext, registry: &mut ScriptRegistry) -> Result<Vec<String>> {
    let pending = registry.pending_emission();
    for script_id in &pending {
        ensure_emitted(ctx, registry, script_id)?;
    }
    Ok(pending)
}

pub struct EmissionCoordinator<'a> {
    registry: &'a SharedRegistry,
    preamble: &'a Preamble,
    integration: Option<&'a dyn FrameworkIntegration>,
}

impl<'a> EmissionCoordinator<'a> {
    pub fn new(registry: &'a SharedRegistry, preamble: &'a Preamble) -> Self {
        Self {
            registry,
            preamble,
            integration: None,
        }
    }

    pub fn with_integration(mut self, integration: Option<&'a dyn FrameworkIntegration>) -> Self {
        self.integration = integration;
        self
    }

    pub async fn build_start(&self, ctx: &mut dyn PluginContext) -> Result<BuildStartOutcome> {
        let emitted = {
            let mut registry = self.registry.write().map_err(|_| CrxError::Poisoned)?;
            emit_pending(ctx, &mut registry)?
        };
        if !emitted.is_empty() {
            tracing::info!("emitted {} content script(s) at build start", emitted.len());
        }

        let mut outcome = BuildStartOutcome {
            emitted,
            ..BuildStartOutcome::default()
        };

        if !BuildMode::from_watch(ctx.watch_mode()).is_watch() {
            return Ok(outcome);
        }

        outcome.preamble_code = resolve_preamble(self.preamble, self.integration).await;
        if outcome.preamble_code.is_some() {
            let ref_id = ctx
                .emit_chunk(PREAMBLE_CODE_ID, PREAMBLE_CHUNK_NAME)
                .map_err(CrxError::Host)?;
            tracing::debug!("emitted content script preamble (ref {})", ref_id);
            outcome.preamble_ref = Some(ref_id);
        }

        Ok(outcome)
    }
}

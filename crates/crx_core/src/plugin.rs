//! Build-pipeline hooks for dynamic and declared content scripts.
//!
//! A [`ContentScriptSession`] owns the script registry for one build or one
//! watch session. The build-mode hooks ([`BuildPlugin`]) and the serve-mode
//! hooks ([`ServePlugin`]) it hands out share that registry.

use crate::config::{BuildMode, ContentScriptsOptions, SessionConfig};
use crate::emission::{ensure_emitted, EmissionCoordinator};
use crate::error::{CrxError, Result};
use crate::host::{OutputBundle, PluginContext, RefId, Rebuilder};
use crate::identity::{is_script_request, ScriptResolver};
use crate::loader::{self, hmr_client_source, loader_asset_name, LoaderSynthesizer, HMR_CLIENT_ASSET_NAME};
use crate::manifest::Manifest;
use crate::placeholder::{rewrite_bundle, stub_module};
use crate::preamble::{FrameworkIntegration, PREAMBLE_CODE_ID};
use crate::rebuild::{RebuildGate, RebuildScheduler};
use crate::registry::{ScriptRegistry, SharedRegistry};
use std::path::Path;
use std::sync::Arc;

pub const PLUGIN_NAME: &str = "crx:content-scripts";

pub struct ContentScriptSession {
    config: SessionConfig,
    registry: SharedRegistry,
    resolver: ScriptResolver,
}

impl ContentScriptSession {
    pub fn new(config: SessionConfig) -> Self {
        crate::logging::init();
        let resolver = ScriptResolver::new(&config.root);
        Self {
            config,
            registry: ScriptRegistry::shared(),
            resolver,
        }
    }

    pub fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    /// Drop every record, as a fresh build invocation would.
    pub fn reset(&self) -> Result<()> {
        self.registry.write().map_err(|_| CrxError::Poisoned)?.clear();
        Ok(())
    }

    pub fn build_plugin(&self) -> BuildPlugin {
        BuildPlugin {
            registry: self.registry.clone(),
            resolver: self.resolver.clone(),
            options: self.config.options.clone(),
            integration: None,
            port: None,
            preamble_code: None,
            preamble_ref: None,
        }
    }

    pub fn serve_plugin(&self, rebuilder: Arc<dyn Rebuilder>) -> ServePlugin {
        let scheduler = Arc::new(RebuildScheduler::new(rebuilder));
        ServePlugin {
            registry: self.registry.clone(),
            resolver: self.resolver.clone(),
            gate: RebuildGate::new(self.registry.clone(), scheduler),
        }
    }
}

/// Register a `?script` import and return its virtual id.
fn register_request(
    registry: &SharedRegistry,
    resolver: &ScriptResolver,
    source: &str,
    importer: Option<&Path>,
) -> Result<Option<String>> {
    let Some(importer) = importer else {
        return Ok(None);
    };
    if !is_script_request(source) {
        return Ok(None);
    }

    let identity = resolver.resolve(source, importer);
    let mut registry = registry.write().map_err(|_| CrxError::Poisoned)?;
    if registry.register(&identity) {
        tracing::debug!("registered dynamic script {}", identity.script_id);
    }
    Ok(Some(identity.script_id))
}

/// Hooks that run inside the bundler's build (one-shot or watch).
pub struct BuildPlugin {
    registry: SharedRegistry,
    resolver: ScriptResolver,
    options: ContentScriptsOptions,
    integration: Option<Arc<dyn FrameworkIntegration>>,
    port: Option<u16>,
    preamble_code: Option<String>,
    preamble_ref: Option<RefId>,
}

impl BuildPlugin {
    pub fn with_integration(mut self, integration: Arc<dyn FrameworkIntegration>) -> Self {
        self.integration = Some(integration);
        self
    }

    pub fn preamble_code(&self) -> Option<&str> {
        self.preamble_code.as_deref()
    }

    pub async fn build_start(&mut self, ctx: &mut dyn PluginContext) -> Result<()> {
        let outcome = EmissionCoordinator::new(&self.registry, &self.options.preamble_code)
            .with_integration(self.integration.as_deref())
            .build_start(ctx)
            .await?;
        self.preamble_code = outcome.preamble_code;
        self.preamble_ref = outcome.preamble_ref;
        Ok(())
    }

    pub fn resolve_id(&self, source: &str, importer: Option<&Path>) -> Result<Option<String>> {
        if let Some(script_id) = register_request(&self.registry, &self.resolver, source, importer)? {
            return Ok(Some(script_id));
        }
        if source == PREAMBLE_CODE_ID {
            return Ok(Some(PREAMBLE_CODE_ID.to_string()));
        }
        Ok(None)
    }

    pub fn load(&self, ctx: &mut dyn PluginContext, id: &str) -> Result<Option<String>> {
        let mut registry = self.registry.write().map_err(|_| CrxError::Poisoned)?;
        if registry.contains(id) {
            // Registered after build start: emit now.
            let ref_id = ensure_emitted(ctx, &mut registry, id)?;
            return Ok(Some(stub_module(&ref_id)));
        }
        if id == PREAMBLE_CODE_ID {
            return Ok(self.preamble_code.clone());
        }
        Ok(None)
    }

    /// The file writer started its dev server on `port`.
    pub fn file_writer_start(&mut self, port: u16) {
        self.port = Some(port);
    }

    /// Emit loaders, resolve placeholders in `bundle` and point the
    /// manifest's declared content scripts at their loaders.
    pub fn render_manifest(
        &mut self,
        ctx: &mut dyn PluginContext,
        manifest: Manifest,
        bundle: &mut OutputBundle,
    ) -> Result<Manifest> {
        let rendered = self.render(ctx, manifest, bundle);
        if let Err(e) = &rendered {
            tracing::error!("{}: {}", PLUGIN_NAME, e);
        }
        rendered
    }

    fn render(
        &mut self,
        ctx: &mut dyn PluginContext,
        mut manifest: Manifest,
        bundle: &mut OutputBundle,
    ) -> Result<Manifest> {
        let mode = BuildMode::from_watch(ctx.watch_mode());
        let port = match (mode, self.port) {
            (BuildMode::Watch, None) => return Err(CrxError::PortUndefined),
            (_, port) => port,
        };

        let mut registry = self.registry.write().map_err(|_| CrxError::Poisoned)?;

        let script_count = manifest.content_script_count() + registry.len();
        let client_name = match port {
            Some(port) if mode.is_watch() && script_count > 0 => {
                let client_ref = ctx
                    .emit_asset(HMR_CLIENT_ASSET_NAME, &hmr_client_source(port))
                    .map_err(CrxError::Host)?;
                Some(ctx.file_name(&client_ref).map_err(CrxError::Host)?)
            }
            _ => None,
        };
        let preamble_name = self
            .preamble_ref
            .as_ref()
            .map(|r| ctx.file_name(r))
            .transpose()
            .map_err(CrxError::Host)?;

        let synthesizer = LoaderSynthesizer::new(mode, preamble_name.as_deref(), client_name.as_deref());

        let resolved = loader::emit_loaders(ctx, &mut registry, &synthesizer)?;
        let rewritten = rewrite_bundle(bundle, &registry)?;
        drop(registry);

        manifest.rewrite_content_scripts(|file| -> Result<String> {
            let loader_ref = ctx
                .emit_asset(&loader_asset_name(file), &synthesizer.source(file))
                .map_err(CrxError::Host)?;
            ctx.file_name(&loader_ref).map_err(CrxError::Host)
        })?;

        tracing::info!(
            "content scripts rendered: {} dynamic, {} declared, {} chunk(s) rewritten",
            resolved,
            manifest.content_script_count(),
            rewritten
        );
        Ok(manifest)
    }
}

/// Hooks for the dev server, where dynamic imports resolve straight to the
/// file names produced by the file writer's build.
pub struct ServePlugin {
    registry: SharedRegistry,
    resolver: ScriptResolver,
    gate: RebuildGate,
}

impl ServePlugin {
    pub fn resolve_id(&self, source: &str, importer: Option<&Path>) -> Result<Option<String>> {
        register_request(&self.registry, &self.resolver, source, importer)
    }

    pub async fn load(&self, id: &str) -> Result<Option<String>> {
        let known = self.registry.read().map_err(|_| CrxError::Poisoned)?.contains(id);
        if !known {
            return Ok(None);
        }
        let file_name = self.gate.file_name(id).await?;
        Ok(Some(format!(
            "export default {}",
            serde_json::Value::String(file_name)
        )))
    }

    pub fn rebuilds(&self) -> u64 {
        self.gate.scheduler().completed()
    }
}

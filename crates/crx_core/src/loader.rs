//! Loader scripts that content script entries actually run.

use crate::config::BuildMode;
use crate::error::{CrxError, Result};
use crate::host::PluginContext;
use crate::identity::ScriptType;
use crate::registry::ScriptRegistry;
use std::path::Path;

/// Dev loader. `__PREAMBLE__`, `__CLIENT__` and `__SCRIPT__` are replaced
/// with JSON literals; a falsy literal means the piece is absent.
pub const CONTENT_DEV_LOADER_JS: &str = r#"(function () {
  'use strict';

  const injectTime = performance.now();
  (async () => {
    if (__PREAMBLE__) await import(chrome.runtime.getURL(__PREAMBLE__));
    if (__CLIENT__) await import(chrome.runtime.getURL(__CLIENT__));
    const { onExecute } = await import(chrome.runtime.getURL(__SCRIPT__));
    onExecute?.({ perf: { injectTime, loadTime: performance.now() - injectTime } });
  })().catch(console.error);
})();
"#;

pub const CONTENT_PRO_LOADER_JS: &str = r#"(function () {
  'use strict';

  const injectTime = performance.now();
  (async () => {
    const { onExecute } = await import(chrome.runtime.getURL(__SCRIPT__));
    onExecute?.({ perf: { injectTime, loadTime: performance.now() - injectTime } });
  })().catch(console.error);
})();
"#;

/// Live-reload client imported by dev loaders. `__SERVER_PORT__` is the
/// dev server's port.
pub const CONTENT_HMR_CLIENT_JS: &str = r#"const port = __SERVER_PORT__;
const socket = new WebSocket(`ws://localhost:${port}`, 'vite-hmr');

socket.addEventListener('message', ({ data }) => {
  const payload = JSON.parse(data);
  if (payload.type === 'full-reload' || payload.type === 'update') {
    chrome.runtime.sendMessage({ type: 'crx:content-script-reload' }).catch(() => {});
    location.reload();
  }
});

socket.addEventListener('close', () => {
  console.log('[crx] dev server disconnected, polling for restart');
  const timer = setInterval(async () => {
    try {
      await fetch(`http://localhost:${port}`);
      clearInterval(timer);
      location.reload();
    } catch {}
  }, 1000);
});
"#;

pub const HMR_CLIENT_ASSET_NAME: &str = "content-script-hmr-client.js";

/// `content-script-loader.<stem>.js` for the script file `script`.
pub fn loader_asset_name(script: &str) -> String {
    let stem = Path::new(script)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    format!("content-script-loader.{}.js", stem)
}

pub fn hmr_client_source(port: u16) -> String {
    CONTENT_HMR_CLIENT_JS.replace("__SERVER_PORT__", &port.to_string())
}

fn json_str(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoaderStrategy {
    /// Emit a loader that imports the compiled module.
    Wrapped,
    /// Point the entry at the compiled script itself.
    Direct,
}

/// Decide how a script type is loaded.
pub fn loader_strategy(script_type: &ScriptType, source_id: &str) -> Result<LoaderStrategy> {
    match script_type {
        ScriptType::Module => Ok(LoaderStrategy::Wrapped),
        // TODO: rebundle iife scripts so they can run from opaque origins.
        ScriptType::Iife => Ok(LoaderStrategy::Direct),
        // Main world scripts run without an isolated-world loader.
        ScriptType::Main => Ok(LoaderStrategy::Direct),
        ScriptType::Unknown(other) => Err(CrxError::UnknownScriptType {
            script_type: other.clone(),
            source_id: source_id.to_string(),
        }),
    }
}

#[derive(Clone, Copy, Debug)]
pub struct LoaderSynthesizer<'a> {
    mode: BuildMode,
    preamble_name: Option<&'a str>,
    client_name: Option<&'a str>,
}

impl<'a> LoaderSynthesizer<'a> {
    pub fn production() -> Self {
        Self {
            mode: BuildMode::Build,
            preamble_name: None,
            client_name: None,
        }
    }

    pub fn dev(preamble_name: Option<&'a str>, client_name: Option<&'a str>) -> Self {
        Self {
            mode: BuildMode::Watch,
            preamble_name,
            client_name,
        }
    }

    pub fn new(mode: BuildMode, preamble_name: Option<&'a str>, client_name: Option<&'a str>) -> Self {
        match mode {
            BuildMode::Watch => Self::dev(preamble_name, client_name),
            BuildMode::Build => Self::production(),
        }
    }

    /// Loader source for the module script `script_name`.
    pub fn source(&self, script_name: &str) -> String {
        match self.mode {
            BuildMode::Watch => CONTENT_DEV_LOADER_JS
                .replace("__PREAMBLE__", &json_str(self.preamble_name.unwrap_or("")))
                .replace(
                    "__CLIENT__",
                    &self.client_name.map(json_str).unwrap_or_else(|| "undefined".to_string()),
                )
                .replace("__SCRIPT__", &json_str(script_name)),
            BuildMode::Build => CONTENT_PRO_LOADER_JS.replace("__SCRIPT__", &json_str(script_name)),
        }
    }

    /// Loader source for a script of `script_type`, or `None` when that
    /// type does not get a loader.
    pub fn synthesize(
        &self,
        script_type: &ScriptType,
        source_id: &str,
        script_name: &str,
    ) -> Result<Option<String>> {
        match loader_strategy(script_type, source_id)? {
            LoaderStrategy::Wrapped => Ok(Some(self.source(script_name))),
            LoaderStrategy::Direct => Ok(None),
        }
    }
}

/// Give every emitted script its final names, emitting a loader asset for
/// the types that need one. Records without a ref are skipped; they were
/// registered after this build's chunks were requested.
pub fn emit_loaders(
    ctx: &mut dyn PluginContext,
    registry: &mut ScriptRegistry,
    synthesizer: &LoaderSynthesizer<'_>,
) -> Result<usize> {
    let ids: Vec<String> = registry.entries().map(|(id, _)| id.to_string()).collect();
    let mut resolved = 0;

    for script_id in ids {
        let Some(record) = registry.get(&script_id).cloned() else {
            continue;
        };
        let Some(ref_id) = record.ref_id else {
            continue;
        };

        let script_name = ctx.file_name(&ref_id).map_err(CrxError::Host)?;
        let source_id = record.source_id.to_string_lossy();
        let loader_name = match synthesizer.synthesize(&record.script_type, &source_id, &script_name)? {
            Some(source) => {
                let loader_ref = ctx
                    .emit_asset(&loader_asset_name(&script_name), &source)
                    .map_err(CrxError::Host)?;
                ctx.file_name(&loader_ref).map_err(CrxError::Host)?
            }
            None => script_name.clone(),
        };

        tracing::debug!("{} -> {} (loader {})", script_id, script_name, loader_name);
        registry.assign_file_names(&script_id, script_name, loader_name)?;
        resolved += 1;
    }
    Ok(resolved)
}

//! Fast-refresh preamble lookup.

use crate::config::Preamble;
use async_trait::async_trait;

/// Virtual module id the preamble chunk is emitted from.
pub const PREAMBLE_CODE_ID: &str = "contentScript.preambleCode";

pub const PREAMBLE_CHUNK_NAME: &str = "content-script-preamble.js";

/// A UI framework that can supply its own refresh preamble.
#[async_trait]
pub trait FrameworkIntegration: Send + Sync {
    fn name(&self) -> &str;

    async fn preamble_code(&self) -> anyhow::Result<String>;
}

const REACT_REFRESH_PREAMBLE: &str = r#"import RefreshRuntime from "__BASE__@react-refresh"
RefreshRuntime.injectIntoGlobalHook(window)
window.$RefreshReg$ = () => {}
window.$RefreshSig$ = () => (type) => type
window.__vite_plugin_react_preamble_installed__ = true
"#;

/// React fast refresh, importing the runtime as a bare package.
#[derive(Clone, Debug, Default)]
pub struct ReactRefreshPreamble;

#[async_trait]
impl FrameworkIntegration for ReactRefreshPreamble {
    fn name(&self) -> &str {
        "react"
    }

    async fn preamble_code(&self) -> anyhow::Result<String> {
        Ok(REACT_REFRESH_PREAMBLE.replace("__BASE__@react-refresh", "react-refresh"))
    }
}

/// Settle the configured preamble into code or nothing.
///
/// Only `Preamble::Auto` consults the integration; any failure there means
/// no preamble.
pub async fn resolve_preamble(
    configured: &Preamble,
    integration: Option<&dyn FrameworkIntegration>,
) -> Option<String> {
    match configured {
        Preamble::Code(code) => Some(code.clone()).filter(|c| !c.is_empty()),
        Preamble::Disabled => None,
        Preamble::Auto => {
            let integration = integration?;
            match integration.preamble_code().await {
                Ok(code) if !code.is_empty() => Some(code),
                Ok(_) => None,
                Err(e) => {
                    tracing::warn!(
                        "no preamble from {} integration, continuing without: {}",
                        integration.name(),
                        e
                    );
                    None
                }
            }
        }
    }
}

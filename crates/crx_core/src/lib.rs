//! Content-script orchestration for browser-extension builds.
//!
//! Dynamic `?script` imports and manifest-declared content scripts point at
//! files whose names only exist once the bundle is rendered. Scripts are
//! registered at resolve time, emitted at build start, referenced through
//! placeholder tokens until render, and then wrapped in loaders whose final
//! paths are patched back into the emitted code and the manifest.

pub mod config;
pub mod emission;
pub mod error;
pub mod host;
pub mod identity;
pub mod loader;
pub mod logging;
pub mod manifest;
pub mod placeholder;
pub mod plugin;
pub mod preamble;
pub mod rebuild;
pub mod registry;
pub mod remap;

pub use config::{BuildMode, ContentScriptsOptions, Preamble, SessionConfig};
pub use error::{CrxError, Result};
pub use host::{OutputAsset, OutputBundle, OutputChunk, OutputItem, PluginContext, Rebuilder, RefId};
pub use identity::{resolve_script, ScriptIdentity, ScriptType};
pub use manifest::Manifest;
pub use plugin::{BuildPlugin, ContentScriptSession, ServePlugin};
pub use registry::{ScriptRecord, ScriptRegistry, SharedRegistry};

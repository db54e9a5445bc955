//! Error types for content-script orchestration.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CrxError>;

#[derive(Error, Debug)]
pub enum CrxError {
    /// A script was imported with a type no loader strategy exists for.
    #[error("Unknown script type: \"{script_type}\" ({source_id})")]
    UnknownScriptType {
        script_type: String,
        source_id: String,
    },

    /// Watch mode needs the dev server port before HMR wiring can be emitted.
    #[error("server port is undefined")]
    PortUndefined,

    /// A rebuild finished without producing the requested script.
    #[error("dynamic script file name is undefined after rebuild: {script_id}")]
    UnresolvedAfterRebuild { script_id: String },

    #[error("emission ref already assigned for {script_id}")]
    RefAlreadyAssigned { script_id: String },

    #[error("script is not registered: {script_id}")]
    UnknownScript { script_id: String },

    #[error("script registry lock poisoned")]
    Poisoned,

    #[error("host bundler error: {0}")]
    Host(#[source] anyhow::Error),

    #[error("rebuild failed: {0}")]
    Rebuild(#[source] anyhow::Error),

    #[error("source map error: {0}")]
    SourceMap(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

//! The part of the extension manifest this subsystem rewrites.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentScript {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub js: Option<Vec<String>>,
    /// `matches`, `css`, `run_at` and friends, passed through as-is.
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_scripts: Option<Vec<ContentScript>>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

impl Manifest {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Number of declared `content_scripts` entries.
    pub fn content_script_count(&self) -> usize {
        self.content_scripts.as_ref().map_or(0, Vec::len)
    }

    /// Replace every declared script file with the result of `rewrite`.
    pub fn rewrite_content_scripts<E>(
        &mut self,
        mut rewrite: impl FnMut(&str) -> Result<String, E>,
    ) -> Result<(), E> {
        let Some(entries) = self.content_scripts.as_mut() else {
            return Ok(());
        };
        for entry in entries {
            if let Some(js) = entry.js.as_mut() {
                for file in js.iter_mut() {
                    *file = rewrite(file)?;
                }
            }
        }
        Ok(())
    }
}

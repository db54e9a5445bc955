//! Per-session table of dynamic scripts.

use crate::error::{CrxError, Result};
use crate::host::RefId;
use crate::identity::{ScriptIdentity, ScriptType};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScriptRecord {
    pub source_id: PathBuf,
    pub script_type: ScriptType,
    pub ref_id: Option<RefId>,
    /// Bundler file name of the compiled script.
    pub output_file_name: Option<String>,
    /// File name a content script entry should point at: the loader for
    /// module scripts, the compiled script otherwise.
    pub loader_file_name: Option<String>,
}

impl ScriptRecord {
    pub fn new(source_id: PathBuf, script_type: ScriptType) -> Self {
        Self {
            source_id,
            script_type,
            ref_id: None,
            output_file_name: None,
            loader_file_name: None,
        }
    }

    /// Base name used when asking the bundler to emit this script.
    pub fn display_name(&self) -> String {
        self.source_id
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

impl From<&ScriptIdentity> for ScriptRecord {
    fn from(identity: &ScriptIdentity) -> Self {
        ScriptRecord::new(identity.source_id.clone(), identity.script_type.clone())
    }
}

/// Insertion-ordered map from script id to record.
#[derive(Clone, Debug, Default)]
pub struct ScriptRegistry {
    records: Vec<(String, ScriptRecord)>,
    index: HashMap<String, usize>,
}

pub type SharedRegistry = Arc<RwLock<ScriptRegistry>>;

impl ScriptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedRegistry {
        Arc::new(RwLock::new(Self::new()))
    }

    pub fn get(&self, script_id: &str) -> Option<&ScriptRecord> {
        self.index.get(script_id).map(|&i| &self.records[i].1)
    }

    pub fn contains(&self, script_id: &str) -> bool {
        self.index.contains_key(script_id)
    }

    /// Insert or replace, keeping the original position on replace.
    pub fn set(&mut self, script_id: &str, record: ScriptRecord) {
        match self.index.get(script_id) {
            Some(&i) => self.records[i].1 = record,
            None => {
                self.index.insert(script_id.to_string(), self.records.len());
                self.records.push((script_id.to_string(), record));
            }
        }
    }

    /// Register a resolved identity unless it is already known.
    /// Returns true when a new record was created.
    pub fn register(&mut self, identity: &ScriptIdentity) -> bool {
        if self.contains(&identity.script_id) {
            return false;
        }
        self.set(&identity.script_id, ScriptRecord::from(identity));
        true
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &ScriptRecord)> {
        self.records.iter().map(|(id, r)| (id.as_str(), r))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Script ids whose records still lack an emission ref.
    pub fn pending_emission(&self) -> Vec<String> {
        self.entries()
            .filter(|(_, r)| r.ref_id.is_none())
            .map(|(id, _)| id.to_string())
            .collect()
    }

    pub fn assign_ref(&mut self, script_id: &str, ref_id: RefId) -> Result<()> {
        let record = self.get_mut(script_id)?;
        if record.ref_id.is_some() {
            return Err(CrxError::RefAlreadyAssigned {
                script_id: script_id.to_string(),
            });
        }
        record.ref_id = Some(ref_id);
        Ok(())
    }

    pub fn assign_file_names(
        &mut self,
        script_id: &str,
        output_file_name: String,
        loader_file_name: String,
    ) -> Result<()> {
        let record = self.get_mut(script_id)?;
        if record.ref_id.is_none() {
            return Err(CrxError::UnknownScript {
                script_id: script_id.to_string(),
            });
        }
        record.output_file_name = Some(output_file_name);
        record.loader_file_name = Some(loader_file_name);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.index.clear();
    }

    fn get_mut(&mut self, script_id: &str) -> Result<&mut ScriptRecord> {
        match self.index.get(script_id) {
            Some(&i) => Ok(&mut self.records[i].1),
            None => Err(CrxError::UnknownScript {
                script_id: script_id.to_string(),
            }),
        }
    }
}

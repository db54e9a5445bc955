//! Capabilities consumed from the host bundler.

use async_trait::async_trait;
use std::fmt;

/// Opaque forward reference handed out by the bundler for an emitted file.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RefId(String);

impl RefId {
    pub fn new(id: impl Into<String>) -> Self {
        RefId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RefId {
    fn from(id: &str) -> Self {
        RefId(id.to_string())
    }
}

impl fmt::Display for RefId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The slice of the bundler's plugin context this subsystem needs.
pub trait PluginContext: Send {
    /// Request compilation of `id` as its own chunk.
    fn emit_chunk(&mut self, id: &str, name: &str) -> anyhow::Result<RefId>;

    /// Request emission of a precomputed text asset.
    fn emit_asset(&mut self, name: &str, source: &str) -> anyhow::Result<RefId>;

    /// Final output path of an emitted file. Only valid once rendering began.
    fn file_name(&self, ref_id: &RefId) -> anyhow::Result<String>;

    fn watch_mode(&self) -> bool;
}

/// The dev server's "rebuild the extension files and wait" operation.
#[async_trait]
pub trait Rebuilder: Send + Sync {
    async fn rebuild(&self) -> anyhow::Result<()>;
}

#[derive(Clone, Debug, Default)]
pub struct OutputChunk {
    pub file_name: String,
    pub code: String,
    /// Source map JSON, when the bundler produced one.
    pub map: Option<String>,
    /// Ids of the modules rendered into this chunk.
    pub modules: Vec<String>,
}

impl OutputChunk {
    pub fn contains_module(&self, id: &str) -> bool {
        self.modules.iter().any(|m| m == id)
    }
}

#[derive(Clone, Debug, Default)]
pub struct OutputAsset {
    pub file_name: String,
    pub source: String,
}

#[derive(Clone, Debug)]
pub enum OutputItem {
    Chunk(OutputChunk),
    Asset(OutputAsset),
}

impl OutputItem {
    pub fn file_name(&self) -> &str {
        match self {
            OutputItem::Chunk(c) => &c.file_name,
            OutputItem::Asset(a) => &a.file_name,
        }
    }
}

/// Rendered output, in the order the bundler produced it.
#[derive(Clone, Debug, Default)]
pub struct OutputBundle {
    items: Vec<OutputItem>,
}

impl OutputBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, item: OutputItem) {
        match self.items.iter_mut().find(|i| i.file_name() == item.file_name()) {
            Some(existing) => *existing = item,
            None => self.items.push(item),
        }
    }

    pub fn get(&self, file_name: &str) -> Option<&OutputItem> {
        self.items.iter().find(|i| i.file_name() == file_name)
    }

    pub fn chunk(&self, file_name: &str) -> Option<&OutputChunk> {
        match self.get(file_name) {
            Some(OutputItem::Chunk(c)) => Some(c),
            _ => None,
        }
    }

    pub fn chunks_mut(&mut self) -> impl Iterator<Item = &mut OutputChunk> {
        self.items.iter_mut().filter_map(|i| match i {
            OutputItem::Chunk(c) => Some(c),
            OutputItem::Asset(_) => None,
        })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

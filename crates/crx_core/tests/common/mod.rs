#![allow(dead_code)]

use crx_core::{OutputBundle, OutputChunk, OutputItem, PluginContext, RefId};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

// Fresh directory under the system temp dir.
pub fn setup_workspace(name: &str) -> PathBuf {
    let mut path = std::env::temp_dir();
    path.push("crx_tests");
    path.push(name);
    if path.exists() {
        fs::remove_dir_all(&path).unwrap();
    }
    fs::create_dir_all(&path).unwrap();
    path
}

pub fn write_file(root: &Path, relative: &str, contents: &str) -> PathBuf {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, contents).unwrap();
    path
}

#[derive(Clone, Debug)]
pub enum Emitted {
    Chunk { id: String, name: String },
    Asset { name: String, source: String },
}

/// Stand-in for the host bundler. Refs are `ref0`, `ref1`, ...; chunk file
/// names are `assets/<stem>.h<n>.js` unless pinned, assets land in `assets/`.
#[derive(Debug, Default)]
pub struct MockBundler {
    pub watch: bool,
    pub emitted: Vec<(RefId, Emitted)>,
    rendering: bool,
    chunk_names: HashMap<String, String>,
}

impl MockBundler {
    pub fn build() -> Self {
        Self::default()
    }

    pub fn watch() -> Self {
        Self {
            watch: true,
            ..Self::default()
        }
    }

    pub fn with_chunk_name(mut self, display_name: &str, file_name: &str) -> Self {
        self.chunk_names.insert(display_name.to_string(), file_name.to_string());
        self
    }

    pub fn start_render(&mut self) {
        self.rendering = true;
    }

    pub fn next_build(&mut self) {
        self.rendering = false;
    }

    pub fn chunk_count(&self) -> usize {
        self.emitted
            .iter()
            .filter(|(_, e)| matches!(e, Emitted::Chunk { .. }))
            .count()
    }

    pub fn asset_source(&self, name: &str) -> Option<&str> {
        self.emitted.iter().rev().find_map(|(_, e)| match e {
            Emitted::Asset { name: n, source } if n == name => Some(source.as_str()),
            _ => None,
        })
    }

    pub fn asset_names(&self) -> Vec<&str> {
        self.emitted
            .iter()
            .filter_map(|(_, e)| match e {
                Emitted::Asset { name, .. } => Some(name.as_str()),
                Emitted::Chunk { .. } => None,
            })
            .collect()
    }

    fn emit(&mut self, emitted: Emitted) -> RefId {
        let ref_id = RefId::new(format!("ref{}", self.emitted.len()));
        self.emitted.push((ref_id.clone(), emitted));
        ref_id
    }
}

impl PluginContext for MockBundler {
    fn emit_chunk(&mut self, id: &str, name: &str) -> anyhow::Result<RefId> {
        Ok(self.emit(Emitted::Chunk {
            id: id.to_string(),
            name: name.to_string(),
        }))
    }

    fn emit_asset(&mut self, name: &str, source: &str) -> anyhow::Result<RefId> {
        Ok(self.emit(Emitted::Asset {
            name: name.to_string(),
            source: source.to_string(),
        }))
    }

    fn file_name(&self, ref_id: &RefId) -> anyhow::Result<String> {
        if !self.rendering {
            anyhow::bail!("file name for {} requested before render", ref_id);
        }
        let (index, (_, emitted)) = self
            .emitted
            .iter()
            .enumerate()
            .find(|(_, (r, _))| r == ref_id)
            .ok_or_else(|| anyhow::anyhow!("unknown ref {}", ref_id))?;

        Ok(match emitted {
            Emitted::Chunk { name, .. } => match self.chunk_names.get(name) {
                Some(pinned) => pinned.clone(),
                None => {
                    let stem = Path::new(name).file_stem().unwrap().to_string_lossy();
                    format!("assets/{}.h{}.js", stem, index)
                }
            },
            Emitted::Asset { name, .. } => format!("assets/{}", name),
        })
    }

    fn watch_mode(&self) -> bool {
        self.watch
    }
}

pub fn chunk(file_name: &str, code: &str, modules: &[&str]) -> OutputChunk {
    OutputChunk {
        file_name: file_name.to_string(),
        code: code.to_string(),
        map: None,
        modules: modules.iter().map(|m| m.to_string()).collect(),
    }
}

pub fn bundle_of(chunks: Vec<OutputChunk>) -> OutputBundle {
    let mut bundle = OutputBundle::new();
    for c in chunks {
        bundle.insert(OutputItem::Chunk(c));
    }
    bundle
}

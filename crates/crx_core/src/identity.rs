//! Canonical identities for `?script` imports.

use std::fmt;
use std::path::{Component, Path, PathBuf};

/// Namespace prefix shared by every dynamic script identity.
pub const PLUGIN_NAMESPACE: &str = "crx:content-scripts";

/// Probed in order when a script specifier has no extension.
pub const SCRIPT_EXTENSIONS: [&str; 5] = [".ts", ".tsx", ".js", ".jsx", ".mjs"];

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum ScriptType {
    #[default]
    Module,
    Iife,
    Main,
    /// Anything else found in the query. Kept as-is so the loader
    /// synthesizer can report it with the offending source id.
    Unknown(String),
}

impl ScriptType {
    pub fn parse(value: &str) -> Self {
        match value {
            "module" => ScriptType::Module,
            "iife" => ScriptType::Iife,
            "main" => ScriptType::Main,
            other => ScriptType::Unknown(other.to_string()),
        }
    }
}

impl fmt::Display for ScriptType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptType::Module => f.write_str("module"),
            ScriptType::Iife => f.write_str("iife"),
            ScriptType::Main => f.write_str("main"),
            ScriptType::Unknown(other) => f.write_str(other),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScriptIdentity {
    /// Registry key, `crx:content-scripts::<path relative to root>`.
    pub script_id: String,
    /// Absolute path of the source file.
    pub source_id: PathBuf,
    pub script_type: ScriptType,
}

/// True for specifiers that ask for a content script, e.g. `./foo.ts?script`.
pub fn is_script_request(specifier: &str) -> bool {
    specifier.contains("?script")
}

#[derive(Clone, Debug)]
pub struct ScriptResolver {
    root: PathBuf,
}

impl ScriptResolver {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    /// Resolve `specifier` imported from the file `importer`.
    ///
    /// The only side effect is probing the filesystem for extensions; a path
    /// that matches nothing is returned unresolved so the failure surfaces
    /// when the bundler tries to read it.
    pub fn resolve(&self, specifier: &str, importer: &Path) -> ScriptIdentity {
        let (base, query) = specifier.split_once('?').unwrap_or((specifier, ""));
        let script_type = query
            .split('&')
            .nth(1)
            .filter(|t| !t.is_empty())
            .map(ScriptType::parse)
            .unwrap_or_default();

        let dir = importer.parent().unwrap_or(Path::new("/"));
        let resolved = normalize(&dir.join(base));
        let source_id = if resolved.extension().is_some() {
            resolved
        } else {
            probe_extensions(&resolved).unwrap_or(resolved)
        };

        let relative = relative_to(&self.root, &source_id);
        tracing::debug!("resolved script {} -> {:?} ({})", specifier, source_id, script_type);

        ScriptIdentity {
            script_id: format!("{}::{}", PLUGIN_NAMESPACE, relative),
            source_id,
            script_type,
        }
    }
}

pub fn resolve_script(specifier: &str, importer: &Path, root: &Path) -> ScriptIdentity {
    ScriptResolver::new(root).resolve(specifier, importer)
}

fn probe_extensions(path: &Path) -> Option<PathBuf> {
    SCRIPT_EXTENSIONS
        .iter()
        .map(|ext| {
            let mut candidate = path.as_os_str().to_owned();
            candidate.push(ext);
            PathBuf::from(candidate)
        })
        .find(|candidate| candidate.exists())
}

/// Lexically collapse `.` and `..` segments.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Forward-slash path of `path` relative to `root`, with `..` when outside it.
fn relative_to(root: &Path, path: &Path) -> String {
    let root = normalize(root);
    let root_parts: Vec<_> = root.components().collect();
    let path_parts: Vec<_> = path.components().collect();
    let shared = root_parts
        .iter()
        .zip(&path_parts)
        .take_while(|(a, b)| a == b)
        .count();

    let ups = std::iter::repeat("..".to_string()).take(root_parts.len() - shared);
    let rest = path_parts[shared..]
        .iter()
        .map(|c| c.as_os_str().to_string_lossy().to_string());
    ups.chain(rest).collect::<Vec<_>>().join("/")
}

//! Placeholder tokens for script file names that are only known at render.
//!
//! Loading a `?script` module yields `export default "%IMPORTED_SCRIPT_<ref>%"`.
//! Once the bundle is rendered each token is swapped for the root-relative
//! path of the script's loader, and the chunk's source map is shifted by the
//! same edits.

use crate::error::{CrxError, Result};
use crate::host::{OutputBundle, OutputChunk, RefId};
use crate::registry::ScriptRegistry;
use crate::remap;
use std::collections::HashMap;
use std::fmt::Write;

pub const PLACEHOLDER_PREFIX: &str = "%IMPORTED_SCRIPT_";
const PLACEHOLDER_SUFFIX: char = '%';

pub fn placeholder_token(ref_id: &RefId) -> String {
    format!("{}{}{}", PLACEHOLDER_PREFIX, ref_id, PLACEHOLDER_SUFFIX)
}

/// Module code returned when a dynamic script's virtual module is loaded.
pub fn stub_module(ref_id: &RefId) -> String {
    format!("export default \"{}\"", placeholder_token(ref_id))
}

/// Escape `value` for the inside of a double-quoted JS string. The result is
/// pure ASCII so byte and UTF-16 lengths agree.
pub fn escape_double_quoted(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_ascii() && !c.is_ascii_control() => out.push(c),
            c => {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    let _ = write!(out, "\\u{:04X}", unit);
                }
            }
        }
    }
    out
}

/// Replace `code[start..end]` with `replacement`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Edit {
    pub start: usize,
    pub end: usize,
    pub replacement: String,
}

/// One linear pass over `code` collecting an edit for every exact token
/// found in `replacements` (token -> replacement text).
pub fn find_edits(code: &str, replacements: &HashMap<String, String>) -> Vec<Edit> {
    let mut edits = Vec::new();
    let mut cursor = 0;
    while let Some(found) = code[cursor..].find(PLACEHOLDER_PREFIX) {
        let start = cursor + found;
        let body = start + PLACEHOLDER_PREFIX.len();
        let Some(close) = code[body..].find(PLACEHOLDER_SUFFIX) else {
            break;
        };
        let end = body + close + 1;
        match replacements.get(&code[start..end]) {
            Some(replacement) => {
                edits.push(Edit {
                    start,
                    end,
                    replacement: replacement.clone(),
                });
                cursor = end;
            }
            None => cursor = body,
        }
    }
    edits
}

/// Apply sorted, non-overlapping edits.
pub fn apply_edits(code: &str, edits: &[Edit]) -> String {
    let mut out = String::with_capacity(code.len());
    let mut last = 0;
    for edit in edits {
        out.push_str(&code[last..edit.start]);
        out.push_str(&edit.replacement);
        last = edit.end;
    }
    out.push_str(&code[last..]);
    out
}

/// Rewrite the tokens of `refs` (ref -> final file name) inside one chunk.
/// Returns false when the chunk held none of them.
pub fn rewrite_chunk(chunk: &mut OutputChunk, refs: &[(RefId, String)]) -> Result<bool> {
    let replacements: HashMap<String, String> = refs
        .iter()
        .map(|(ref_id, file_name)| {
            (
                placeholder_token(ref_id),
                escape_double_quoted(&format!("/{}", file_name)),
            )
        })
        .collect();

    let edits = find_edits(&chunk.code, &replacements);
    if edits.is_empty() {
        return Ok(false);
    }

    if let Some(map) = &chunk.map {
        let shifted = remap::apply_edits_to_map(map, &chunk.code, &edits)
            .map_err(|e| CrxError::SourceMap(format!("{}: {}", chunk.file_name, e)))?;
        chunk.map = Some(shifted);
    }
    chunk.code = apply_edits(&chunk.code, &edits);
    tracing::debug!("resolved {} script placeholder(s) in {}", edits.len(), chunk.file_name);
    Ok(true)
}

/// Resolve placeholders in every chunk that contains the virtual module of
/// a script whose file name is known. Returns the number of chunks changed.
pub fn rewrite_bundle(bundle: &mut OutputBundle, registry: &ScriptRegistry) -> Result<usize> {
    let mut rewritten = 0;
    for chunk in bundle.chunks_mut() {
        let refs: Vec<(RefId, String)> = registry
            .entries()
            .filter(|(script_id, _)| chunk.contains_module(script_id))
            .filter_map(|(_, record)| Some((record.ref_id.clone()?, record.loader_file_name.clone()?)))
            .collect();
        if refs.is_empty() {
            continue;
        }
        if rewrite_chunk(chunk, &refs)? {
            rewritten += 1;
        }
    }
    Ok(rewritten)
}

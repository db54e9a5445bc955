//! Keep a chunk's source map in step with in-line text edits.
//!
//! Edits never span lines, so only generated columns on edited lines move.
//! Columns are counted in UTF-16 code units, as source maps require.

use crate::placeholder::Edit;
use oxc_sourcemap::{SourceMap, SourceMapBuilder};
use serde::Deserialize;

/// An edit located in generated line/column space.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct LineEdit {
    line: u32,
    start_col: u32,
    end_col: u32,
    delta: i64,
}

fn utf16_len(text: &str) -> u32 {
    text.encode_utf16().count() as u32
}

fn locate(code: &str, edits: &[Edit]) -> Vec<LineEdit> {
    let mut located = Vec::with_capacity(edits.len());
    let mut line = 0u32;
    let mut line_start = 0usize;
    let mut scanned = 0usize;

    for edit in edits {
        for (offset, _) in code[scanned..edit.start].match_indices('\n') {
            line += 1;
            line_start = scanned + offset + 1;
        }
        scanned = edit.start;

        let start_col = utf16_len(&code[line_start..edit.start]);
        let end_col = start_col + utf16_len(&code[edit.start..edit.end]);
        located.push(LineEdit {
            line,
            start_col,
            end_col,
            delta: utf16_len(&edit.replacement) as i64 - (end_col - start_col) as i64,
        });
    }
    located
}

/// New generated column for a mapping at `line:col` after `edits`. A mapping
/// that pointed inside a replaced span moves to the start of the replacement.
fn shift_column(edits: &[LineEdit], line: u32, col: u32) -> u32 {
    let mut shifted = col as i64;
    for edit in edits.iter().filter(|e| e.line == line) {
        if col >= edit.end_col {
            shifted += edit.delta;
        } else if col > edit.start_col {
            shifted -= (col - edit.start_col) as i64;
        }
    }
    shifted.max(0) as u32
}

#[derive(Deserialize)]
struct Mappings {
    mappings: String,
}

/// Swap the `mappings` string of `map_json` for `mappings`, leaving every
/// other byte of the document as it was.
fn splice_mappings(map_json: &str, old: &str, mappings: &str) -> anyhow::Result<String> {
    const KEY: &str = "\"mappings\"";
    let key = map_json
        .find(KEY)
        .ok_or_else(|| anyhow::anyhow!("source map has no mappings field"))?;
    let after_key = key + KEY.len();
    let value = map_json[after_key..]
        .find(|c: char| !c.is_whitespace() && c != ':')
        .map(|offset| after_key + offset)
        .ok_or_else(|| anyhow::anyhow!("source map mappings field has no value"))?;

    let literal = serde_json::to_string(old)?;
    if !map_json[value..].starts_with(&literal) {
        anyhow::bail!("source map mappings field is not a plain string");
    }
    Ok(format!(
        "{}{}{}",
        &map_json[..value],
        serde_json::to_string(mappings)?,
        &map_json[value + literal.len()..]
    ))
}

/// Re-derive the `mappings` of `map_json` for `code` rewritten by `edits`.
/// Every other field of the map is carried over untouched.
pub fn apply_edits_to_map(map_json: &str, code: &str, edits: &[Edit]) -> anyhow::Result<String> {
    let original = SourceMap::from_json_string(map_json)
        .map_err(|e| anyhow::anyhow!("invalid source map: {:?}", e))?;
    let located = locate(code, edits);

    let mut builder = SourceMapBuilder::default();
    for token in original.get_tokens() {
        builder.add_token(
            token.get_dst_line(),
            shift_column(&located, token.get_dst_line(), token.get_dst_col()),
            token.get_src_line(),
            token.get_src_col(),
            token.get_source_id(),
            token.get_name_id(),
        );
    }
    let encoded: Mappings = serde_json::from_str(&builder.into_sourcemap().to_json_string())?;
    let current: Mappings = serde_json::from_str(map_json)?;

    splice_mappings(map_json, &current.mappings, &encoded.mappings)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edit(code: &str, needle: &str, replacement: &str) -> Edit {
        let start = code.find(needle).unwrap();
        Edit {
            start,
            end: start + needle.len(),
            replacement: replacement.to_string(),
        }
    }

    #[test]
    fn test_locate_on_second_line() {
        let code = "let a;\nconst s = \"%TOKEN%\"; f();";
        let located = locate(code, &[edit(code, "%TOKEN%", "/x.js")]);
        assert_eq!(
            located,
            vec![LineEdit {
                line: 1,
                start_col: 11,
                end_col: 18,
                delta: -2,
            }]
        );
    }

    #[test]
    fn test_shift_column() {
        let edits = [LineEdit {
            line: 1,
            start_col: 11,
            end_col: 18,
            delta: 5,
        }];
        assert_eq!(shift_column(&edits, 0, 30), 30);
        assert_eq!(shift_column(&edits, 1, 4), 4);
        assert_eq!(shift_column(&edits, 1, 11), 11);
        assert_eq!(shift_column(&edits, 1, 14), 11);
        assert_eq!(shift_column(&edits, 1, 18), 23);
    }

    #[test]
    fn test_splice_keeps_layout() {
        let map = "{\n  \"version\": 3,\n  \"sources\": [\"a.ts\"],\n  \"names\": [],\n  \"mappings\" : \"AAAA\"\n}";
        let out = splice_mappings(map, "AAAA", "AAAA,CAAC").unwrap();
        assert_eq!(
            out,
            "{\n  \"version\": 3,\n  \"sources\": [\"a.ts\"],\n  \"names\": [],\n  \"mappings\" : \"AAAA,CAAC\"\n}"
        );
        assert!(splice_mappings("{\"version\":3}", "AAAA", "").is_err());
    }

    #[test]
    fn test_columns_count_utf16() {
        let code = "const é = \"%T%\";";
        let located = locate(code, &[edit(code, "%T%", "/a")]);
        assert_eq!(located[0].start_col, 11);
        assert_eq!(located[0].delta, -1);
    }
}

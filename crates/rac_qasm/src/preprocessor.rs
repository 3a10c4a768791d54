//! Include resolution.
//!
//! `qelib1.inc` is treated as built in (its gates are known to the
//! extractor); any other include is inlined from disk before parsing.

use crate::error::{QasmError, Result};
use std::fs;
use std::path::Path;

/// Recursively inlines `include "file";` lines relative to `base_path`.
pub fn resolve_includes(input: &str, base_path: &Path) -> Result<String> {
    let mut output = String::new();
    for line in input.lines() {
        let trimmed = line.trim();
        let filename = match parse_include(trimmed) {
            Some(name) => name,
            None => {
                output.push_str(line);
                output.push('\n');
                continue;
            }
        };
        if filename == "qelib1.inc" {
            continue;
        }
        let include_path = base_path.join(filename);
        let content = fs::read_to_string(&include_path).map_err(|e| {
            QasmError::Parse(format!(
                "failed to read include file {}: {e}",
                include_path.display()
            ))
        })?;
        let nested_base = include_path.parent().unwrap_or(Path::new("."));
        output.push_str(&resolve_includes(&content, nested_base)?);
        output.push('\n');
    }
    Ok(output)
}

fn parse_include(line: &str) -> Option<&str> {
    let rest = line.strip_prefix("include")?.trim_start();
    let rest = rest.strip_prefix('"')?;
    let end = rest.find('"')?;
    Some(&rest[..end])
}

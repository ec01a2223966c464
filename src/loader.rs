//! JSONL loading and writing
//!
//! One JSON object per line. Lines that fail to decode are skipped and
//! reported as [`Diagnostic::MalformedLine`]; blank lines are ignored.

use crate::diagnostics::{Diagnostic, Diagnostics};
use anyhow::{Context, Result};
use serde_json::Value;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

pub fn load_jsonl(path: &Path, diagnostics: &mut Diagnostics) -> Result<Vec<Value>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let mut records = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(line) {
            Ok(value) => records.push(value),
            Err(e) => diagnostics.push(Diagnostic::MalformedLine {
                path: path.display().to_string(),
                line: idx + 1,
                error: e.to_string(),
            }),
        }
    }

    tracing::debug!(path = %path.display(), records = records.len(), "loaded jsonl");
    Ok(records)
}

pub fn write_jsonl(path: &Path, records: &[Value]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let file = fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    for record in records {
        serde_json::to_writer(&mut writer, record)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;

    tracing::debug!(path = %path.display(), records = records.len(), "wrote jsonl");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticKind;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_malformed_lines_are_skipped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.jsonl");
        fs::write(&path, "{\"a\": 1}\nnot json\n\n{\"b\": \"ü\"}\n").unwrap();

        let mut diagnostics = Diagnostics::new();
        let records = load_jsonl(&path, &mut diagnostics).unwrap();

        assert_eq!(records, vec![json!({"a": 1}), json!({"b": "ü"})]);
        assert_eq!(diagnostics.count(DiagnosticKind::MalformedLine), 1);
        match &diagnostics.events()[0].diagnostic {
            Diagnostic::MalformedLine { line, .. } => assert_eq!(*line, 2),
            other => panic!("unexpected diagnostic {:?}", other),
        }
    }

    #[test]
    fn test_write_then_load_preserves_field_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("out.jsonl");
        let records = vec![json!({"z": 1, "a": "naïve"}), json!({"m": [1, 2]})];

        write_jsonl(&path, &records).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("{\"z\":1,\"a\":\"naïve\"}\n"));

        let mut diagnostics = Diagnostics::new();
        assert_eq!(load_jsonl(&path, &mut diagnostics).unwrap(), records);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempdir().unwrap();
        let mut diagnostics = Diagnostics::new();
        assert!(load_jsonl(&dir.path().join("absent.jsonl"), &mut diagnostics).is_err());
    }
}

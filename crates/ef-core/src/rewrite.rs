//! Pure text rewriting and atomic per-file commits.
//!
//! Edits are computed against the immutable original text and applied in a
//! single pass. Committing writes the complete new content to a temporary file
//! next to the target and renames it over the target, so an interrupted run
//! leaves either the old or the new file and never a partial one.

use crate::error::{EfError, EfResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Replacement of `start..end` (byte offsets) by `text`; an insertion when `start == end`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TextEdit {
    pub start: usize,
    pub end: usize,
    pub text: String,
}

impl TextEdit {
    pub fn insert(at: usize, text: impl Into<String>) -> Self {
        Self {
            start: at,
            end: at,
            text: text.into(),
        }
    }

    pub fn replace(start: usize, end: usize, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }

    pub fn is_insertion(&self) -> bool {
        self.start == self.end
    }
}

/// Applies edits to `original` and returns the new text.
///
/// Edits are ordered by position; identical edits collapse into one (several
/// elements of one iteration may request the same index parameter). Insertions
/// at the same offset keep their relative order. Overlapping replacements are
/// rejected.
pub fn apply_edits(original: &str, edits: &[TextEdit]) -> EfResult<String> {
    let mut seen = HashSet::new();
    let mut ordered: Vec<(usize, &TextEdit)> = edits
        .iter()
        .enumerate()
        .filter(|(_, edit)| seen.insert(*edit))
        .collect();
    ordered.sort_by_key(|(i, edit)| (edit.start, edit.end, *i));

    let mut out = String::with_capacity(original.len() + edits.len() * 32);
    let mut cursor = 0usize;
    for (_, edit) in ordered {
        if edit.start > edit.end
            || edit.end > original.len()
            || !original.is_char_boundary(edit.start)
            || !original.is_char_boundary(edit.end)
        {
            return Err(EfError::EditOutOfBounds {
                start: edit.start,
                end: edit.end,
            });
        }
        if edit.start < cursor {
            return Err(EfError::OverlappingEdits { offset: edit.start });
        }
        out.push_str(&original[cursor..edit.start]);
        out.push_str(&edit.text);
        cursor = edit.end;
    }
    out.push_str(&original[cursor..]);
    Ok(out)
}

/// blake3 hash of file content, hex encoded
pub fn content_hash(content: &str) -> String {
    blake3::hash(content.as_bytes()).to_hex().to_string()
}

/// Atomically replaces `path` with `new_content` if its current content still
/// hashes to `expected_hash`.
///
/// Returns [`EfError::WriteConflict`] without touching the file when the
/// content changed since it was analyzed.
pub fn commit_file(path: &Path, expected_hash: &str, new_content: &str) -> EfResult<()> {
    let current = std::fs::read_to_string(path)?;
    if content_hash(&current) != expected_hash {
        return Err(EfError::WriteConflict {
            path: path.to_path_buf(),
        });
    }

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(new_content.as_bytes())?;
    temp.as_file().sync_all()?;

    // keep the original permissions on the replacement
    let permissions = std::fs::metadata(path)
        .and_then(|metadata| std::fs::set_permissions(temp.path(), metadata.permissions()));
    if let Err(err) = permissions {
        tracing::warn!(path = %path.display(), error = %err, "Failed to copy permissions to patched file");
    }

    temp.persist(path).map_err(|e| EfError::Io(e.error))?;
    tracing::debug!(path = %path.display(), "Committed patched file");
    Ok(())
}

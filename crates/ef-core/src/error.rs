use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by e2e-forge operations.
///
/// Per-file problems that must not stop a run (unresolvable imports,
/// unparsable files, ambiguous call sites) are recorded as diagnostics in
/// [`crate::models::Diagnostics`] instead.
#[derive(Debug, Error)]
pub enum EfError {
    /// Source root or another required input does not exist
    #[error("input unavailable: {path}")]
    InputUnavailable { path: PathBuf },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to parse {file}: {message}")]
    Parse { file: PathBuf, message: String },

    /// File changed on disk between analysis and write
    #[error("write conflict: {path} changed since it was analyzed")]
    WriteConflict { path: PathBuf },

    /// Edits passed to the rewriter overlap each other
    #[error("overlapping edits at byte {offset}")]
    OverlappingEdits { offset: usize },

    /// Edit offsets fall outside the source text or split a character
    #[error("edit range {start}..{end} is outside the source text")]
    EditOutOfBounds { start: usize, end: usize },

    /// Interactive session finished while proposals were still pending
    #[error("{pending} selector proposals in {path} are still undecided")]
    UnresolvedDecisions { path: PathBuf, pending: usize },

    #[error("invalid selector value '{value}': {reason}")]
    InvalidSelector { value: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type EfResult<T> = Result<T, EfError>;

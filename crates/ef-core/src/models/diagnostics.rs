use serde::{Deserialize, Serialize};

/// Import that could not be resolved to a file on disk
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResolutionError {
    /// Project-relative path of the importing module
    pub importer: String,
    pub specifier: String,
    pub line: usize,
    pub reason: String,
}

/// File skipped because it could not be parsed
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParseFailure {
    pub file: String,
    pub message: String,
}

/// Patch aborted because the file changed after analysis
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WriteConflict {
    pub file: String,
}

/// Patch that failed to plan or write; the rest of the run went on
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PatchFailure {
    pub file: String,
    pub message: String,
}

/// Non-fatal problems collected during a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub resolution_errors: Vec<ResolutionError>,
    pub parse_failures: Vec<ParseFailure>,
    pub write_conflicts: Vec<WriteConflict>,
    pub patch_failures: Vec<PatchFailure>,
}

impl Diagnostics {
    pub fn is_empty(&self) -> bool {
        self.resolution_errors.is_empty()
            && self.parse_failures.is_empty()
            && self.write_conflicts.is_empty()
            && self.patch_failures.is_empty()
    }

    /// Merges another set, keeping entries sorted and unique
    pub fn merge(&mut self, other: Diagnostics) {
        self.resolution_errors.extend(other.resolution_errors);
        self.parse_failures.extend(other.parse_failures);
        self.write_conflicts.extend(other.write_conflicts);
        self.patch_failures.extend(other.patch_failures);
        self.normalize();
    }

    pub fn normalize(&mut self) {
        self.resolution_errors.sort();
        self.resolution_errors.dedup();
        self.parse_failures.sort();
        self.parse_failures.dedup();
        self.write_conflicts.sort();
        self.write_conflicts.dedup();
        self.patch_failures.sort();
        self.patch_failures.dedup();
    }

    /// Keeps only entries whose file passes the predicate
    pub fn retain_files<F>(&mut self, keep: F)
    where
        F: Fn(&str) -> bool,
    {
        self.resolution_errors.retain(|e| keep(&e.importer));
        self.parse_failures.retain(|e| keep(&e.file));
        self.write_conflicts.retain(|e| keep(&e.file));
        self.patch_failures.retain(|e| keep(&e.file));
    }
}

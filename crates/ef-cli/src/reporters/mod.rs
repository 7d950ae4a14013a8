pub mod json;
pub mod markdown;

pub use json::{write_inventory, JsonReporter};
pub use markdown::MarkdownReporter;

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Creates the directory a report is written into
pub fn ensure_parent(output_path: &str) -> Result<()> {
    if let Some(parent) = Path::new(output_path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
    }
    Ok(())
}

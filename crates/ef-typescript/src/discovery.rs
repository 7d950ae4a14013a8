use anyhow::{Context, Result};
use ef_core::parsers::SOURCE_EXTENSIONS;
use ef_core::EfError;
use globset::{Glob, GlobSet, GlobSetBuilder};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Directories never scanned
const SKIPPED_DIRS: &[&str] = &[
    "node_modules", "dist", "build", "out", "coverage", ".next", ".nuxt", ".git", ".turbo",
    "storybook-static",
];

/// Where sources live and which files are entry points
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectLayout {
    /// Project root; relative entries below are resolved against it
    pub root: PathBuf,
    /// Source roots; empty means `src` when it exists, else the project root
    pub source_roots: Vec<PathBuf>,
    /// Globs over project-relative paths selecting page entry points
    pub entry_points: Vec<String>,
    /// Globs over project-relative paths never analyzed nor audited
    pub exclude: Vec<String>,
    /// Import aliases, prefix -> directory relative to the root
    pub aliases: IndexMap<String, String>,
    /// Maximum import depth below an entry point (None = unlimited)
    pub max_recursion_depth: Option<usize>,
}

impl Default for ProjectLayout {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            source_roots: Vec::new(),
            entry_points: [
                "**/pages/**/*.{tsx,jsx,ts,js}",
                "**/app/**/page.{tsx,jsx,ts,js}",
                "**/views/**/*Page.{tsx,jsx}",
                "**/screens/**/*Screen.{tsx,jsx}",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            exclude: [
                "**/*.test.*",
                "**/*.spec.*",
                "**/*.stories.*",
                "**/__tests__/**",
                "**/__mocks__/**",
                "**/*.d.ts",
                "**/pages/_app.*",
                "**/pages/_document.*",
                "**/pages/api/**",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            aliases: IndexMap::new(),
            max_recursion_depth: None,
        }
    }
}

impl ProjectLayout {
    pub fn for_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Source roots as absolute paths
    pub fn resolved_source_roots(&self) -> Vec<PathBuf> {
        if self.source_roots.is_empty() {
            let src = self.root.join("src");
            return vec![if src.is_dir() { src } else { self.root.clone() }];
        }
        self.source_roots
            .iter()
            .map(|r| if r.is_absolute() { r.clone() } else { self.root.join(r) })
            .collect()
    }

    pub fn entry_set(&self) -> Result<GlobSet> {
        build_globset(&self.entry_points).context("invalid entry_points glob")
    }

    pub fn exclude_set(&self) -> Result<GlobSet> {
        build_globset(&self.exclude).context("invalid exclude glob")
    }

    /// Project-relative display path with forward slashes
    pub fn display_path(&self, path: &Path) -> String {
        let root = crate::path_resolver::normalize_path(&self.root);
        path.strip_prefix(&root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/")
    }
}

/// Builds a glob set; any invalid pattern is a configuration error
pub fn build_globset(patterns: &[String]) -> Result<GlobSet, EfError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns.iter().filter(|p| !p.trim().is_empty()) {
        let glob = Glob::new(pattern)
            .map_err(|err| EfError::Config(format!("invalid glob '{}': {}", pattern, err)))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|err| EfError::Config(err.to_string()))
}

/// Source files under the layout's roots that are not excluded, sorted
pub fn discover_sources(layout: &ProjectLayout) -> Result<Vec<PathBuf>> {
    let exclude = layout.exclude_set()?;
    let mut files = Vec::new();
    for root in layout.resolved_source_roots() {
        if !root.exists() {
            return Err(EfError::InputUnavailable { path: root }.into());
        }
        collect_files(&root, &mut files)?;
    }
    let mut files: Vec<PathBuf> = files
        .into_iter()
        .map(|f| crate::path_resolver::normalize_path(&f))
        .filter(|f| !exclude.is_match(layout.display_path(f)))
        .collect();
    files.sort();
    files.dedup();
    Ok(files)
}

fn collect_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    if dir.is_file() {
        if is_source_file(dir) {
            files.push(dir.to_path_buf());
        }
        return Ok(());
    }
    for entry in std::fs::read_dir(dir).with_context(|| format!("Failed to read {:?}", dir))? {
        let path = entry?.path();
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        if path.is_dir() {
            if name.starts_with('.') || SKIPPED_DIRS.contains(&name) {
                continue;
            }
            collect_files(&path, files)?;
        } else if is_source_file(&path) {
            files.push(path);
        }
    }
    Ok(())
}

fn is_source_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| SOURCE_EXTENSIONS.contains(&e))
        .unwrap_or(false)
}

/// Files matching the entry globs, in sorted order
pub fn match_entry_points(layout: &ProjectLayout, files: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let entries = layout.entry_set()?;
    Ok(files
        .iter()
        .filter(|f| entries.is_match(layout.display_path(f)))
        .cloned()
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "export {};\n").unwrap();
    }

    #[test]
    fn test_discovery_skips_excluded_and_vendor_files() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        touch(root, "src/pages/Home.tsx");
        touch(root, "src/pages/Home.test.tsx");
        touch(root, "src/components/Button.tsx");
        touch(root, "src/components/Button.stories.tsx");
        touch(root, "src/styles/app.css");
        touch(root, "src/node_modules/pkg/index.js");

        let layout = ProjectLayout::for_root(root);
        let files = discover_sources(&layout).unwrap();
        let displays: Vec<String> = files.iter().map(|f| layout.display_path(f)).collect();

        assert_eq!(displays, vec!["src/components/Button.tsx", "src/pages/Home.tsx"]);
        let entries = match_entry_points(&layout, &files).unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].ends_with("pages/Home.tsx"));
    }

    #[test]
    fn test_missing_source_root_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let layout = ProjectLayout {
            source_roots: vec![PathBuf::from("does-not-exist")],
            ..ProjectLayout::for_root(temp_dir.path())
        };
        let err = discover_sources(&layout).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<EfError>(),
            Some(EfError::InputUnavailable { .. })
        ));
    }

    #[test]
    fn test_invalid_glob_is_config_error() {
        let layout = ProjectLayout {
            entry_points: vec!["src/{pages".to_string()],
            ..ProjectLayout::default()
        };
        assert!(layout.entry_set().is_err());
    }
}

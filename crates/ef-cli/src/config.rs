use anyhow::{Context, Result};
use ef_core::catalog::{CallShape, CallShapeCatalog, IntegrationCatalog, IntegrationSignature, TelemetryDestination};
use ef_core::EfError;
use ef_mock::MockConfig;
use ef_typescript::{build_globset, ProjectLayout, SelectorRules};
use indexmap::IndexMap;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Config file looked up in the working directory when `--config` is absent
pub const DEFAULT_CONFIG_FILE: &str = "e2e-forge.toml";

/// Project configuration
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub project: ProjectConfig,
    pub catalog: CatalogConfig,
    pub integrations: IntegrationsConfig,
    pub selectors: SelectorRules,
    pub mocks: MockConfig,
    pub output: OutputConfig,
    pub thresholds: ThresholdsConfig,
}

/// Where the application lives
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Project root (the directory holding `package.json`)
    pub root: String,
    /// Source roots relative to the project root
    pub source_roots: Vec<String>,
    /// Entry point globs; built-in page conventions when absent
    pub entry_points: Option<Vec<String>>,
    /// Exclusion globs; built-in test and story patterns when absent
    pub exclude: Option<Vec<String>>,
    /// Import aliases, prefix -> directory relative to the project root
    pub aliases: IndexMap<String, String>,
    /// Maximum import depth below an entry point (None = unlimited)
    pub max_recursion_depth: Option<usize>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            root: ".".to_string(),
            source_roots: Vec::new(),
            entry_points: None,
            exclude: None,
            aliases: IndexMap::new(),
            max_recursion_depth: None,
        }
    }
}

/// Call shapes recognized as network access
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Use only the shapes listed here
    pub replace_defaults: bool,
    /// Checked before the built-in shapes
    pub shapes: Vec<CallShape>,
}

/// Third-party integrations and telemetry destinations
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct IntegrationsConfig {
    pub replace_defaults: bool,
    /// Entries named like a built-in one replace it
    pub integrations: Vec<IntegrationSignature>,
    pub telemetry: Vec<TelemetryDestination>,
}

/// Output configuration
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Coverage report format: markdown or json
    pub format: String,
    pub inventory: String,
    /// Coverage report path; the extension follows the format
    pub coverage: String,
    /// Mock definitions path; the extension follows the mock format
    pub mocks: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: "markdown".to_string(),
            inventory: "inventory.json".to_string(),
            coverage: "coverage.md".to_string(),
            mocks: "mocks.json".to_string(),
        }
    }
}

/// Exit-status thresholds
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ThresholdsConfig {
    /// Unresolved call sites plus resolution errors tolerated before the run
    /// fails; unlimited when absent
    pub max_unresolved: Option<usize>,
}

impl ThresholdsConfig {
    pub fn exceeded(&self, unresolved: usize) -> bool {
        self.max_unresolved.is_some_and(|max| unresolved > max)
    }
}

impl Config {
    /// Loads configuration from a file
    ///
    /// # Arguments
    /// * `path` - Path to the config file (can be absolute or relative)
    /// * `base_path` - Optional base path for resolving relative paths in config.
    ///   If None, uses the directory of the config file as base.
    pub fn load(path: &str, base_path: Option<&Path>) -> Result<Self> {
        let config_path = Path::new(path);
        let content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {}", path))?;
        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path))?;

        let base = base_path.unwrap_or_else(|| match config_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        });
        config.resolve_relative_paths(base)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path` when it exists; the default file name may be absent, in
    /// which case built-in defaults apply to the working directory.
    pub fn load_or_default(path: &str) -> Result<Self> {
        if Path::new(path).exists() || path != DEFAULT_CONFIG_FILE {
            return Self::load(path, None);
        }
        tracing::info!(config = %path, "No config file found, using defaults");
        let mut config = Config::default();
        config.resolve_relative_paths(Path::new("."))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        let root = Path::new(&self.project.root);
        if !root.is_dir() {
            return Err(EfError::InputUnavailable {
                path: root.to_path_buf(),
            }
            .into());
        }

        match self.output.format.as_str() {
            "markdown" | "json" => {}
            other => {
                anyhow::bail!(
                    "Invalid output format: {}. Supported formats: markdown, json",
                    other
                );
            }
        }
        for (name, value) in [
            ("output.inventory", &self.output.inventory),
            ("output.coverage", &self.output.coverage),
            ("output.mocks", &self.output.mocks),
        ] {
            if value.is_empty() {
                anyhow::bail!("{} cannot be empty", name);
            }
        }

        if !self.selectors.attribute.starts_with("data-") {
            return Err(EfError::Config(format!(
                "selectors.attribute must be a data attribute, got '{}'",
                self.selectors.attribute
            ))
            .into());
        }
        if self.selectors.max_purpose_words == 0 {
            return Err(EfError::Config("selectors.max_purpose_words must be at least 1".to_string()).into());
        }

        if self.mocks.page_size == 0 {
            return Err(EfError::Config("mocks.page_size must be at least 1".to_string()).into());
        }
        if self.mocks.url_prefix.is_empty() {
            return Err(EfError::Config("mocks.url_prefix cannot be empty".to_string()).into());
        }

        let layout = self.layout();
        build_globset(&layout.entry_points).context("Invalid project.entry_points")?;
        build_globset(&layout.exclude).context("Invalid project.exclude")?;
        Ok(())
    }

    /// Resolves all relative paths in the config relative to the base path
    fn resolve_relative_paths(&mut self, base: &Path) -> Result<()> {
        if !Path::new(&self.project.root).is_absolute() {
            let joined = base.join(&self.project.root);
            let resolved = if joined.exists() {
                joined
                    .canonicalize()
                    .with_context(|| format!("Failed to resolve project.root: {}", self.project.root))?
            } else {
                joined
            };
            self.project.root = resolved.to_string_lossy().to_string();
        }

        for path in [
            &mut self.output.inventory,
            &mut self.output.coverage,
            &mut self.output.mocks,
        ] {
            if !path.is_empty() && !Path::new(path.as_str()).is_absolute() {
                *path = base.join(path.as_str()).to_string_lossy().to_string();
            }
        }
        Ok(())
    }

    pub fn root(&self) -> PathBuf {
        PathBuf::from(&self.project.root)
    }

    /// Project layout for discovery and graph building
    pub fn layout(&self) -> ProjectLayout {
        let mut layout = ProjectLayout::for_root(self.root());
        layout.source_roots = self.project.source_roots.iter().map(PathBuf::from).collect();
        if let Some(entries) = &self.project.entry_points {
            layout.entry_points = entries.clone();
        }
        if let Some(exclude) = &self.project.exclude {
            layout.exclude = exclude.clone();
        }
        layout.aliases = self.project.aliases.clone();
        layout.max_recursion_depth = self.project.max_recursion_depth;
        layout
    }

    /// Configured shapes first, then the built-in ones unless replaced
    pub fn call_shapes(&self) -> CallShapeCatalog {
        let mut shapes = self.catalog.shapes.clone();
        if !self.catalog.replace_defaults {
            shapes.extend(
                CallShapeCatalog::default()
                    .shapes
                    .into_iter()
                    .filter(|shape| !self.catalog.shapes.contains(shape)),
            );
        }
        CallShapeCatalog { shapes }
    }

    /// Built-in signatures with configured entries merged in by name
    pub fn integration_catalog(&self) -> IntegrationCatalog {
        let mut catalog = if self.integrations.replace_defaults {
            IntegrationCatalog {
                integrations: Vec::new(),
                telemetry: Vec::new(),
            }
        } else {
            IntegrationCatalog::default()
        };
        for signature in &self.integrations.integrations {
            match catalog.integrations.iter_mut().find(|s| s.name == signature.name) {
                Some(existing) => *existing = signature.clone(),
                None => catalog.integrations.push(signature.clone()),
            }
        }
        for destination in &self.integrations.telemetry {
            match catalog.telemetry.iter_mut().find(|d| d.name == destination.name) {
                Some(existing) => *existing = destination.clone(),
                None => catalog.telemetry.push(destination.clone()),
            }
        }
        catalog
    }

    /// Coverage report path with the extension of `format`
    pub fn coverage_path(&self, format: crate::ReportFormat) -> PathBuf {
        let extension = match format {
            crate::ReportFormat::Markdown => "md",
            crate::ReportFormat::Json => "json",
        };
        PathBuf::from(&self.output.coverage).with_extension(extension)
    }

    /// Mock output path with the extension of `format`
    pub fn mocks_path(&self, format: ef_mock::MockFormat) -> PathBuf {
        PathBuf::from(&self.output.mocks).with_extension(format.extension())
    }

    /// Report format named in the config
    pub fn report_format(&self) -> crate::ReportFormat {
        match self.output.format.as_str() {
            "json" => crate::ReportFormat::Json,
            _ => crate::ReportFormat::Markdown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ef_core::models::HookKind;
    use tempfile::TempDir;

    fn write_config(dir: &Path, content: &str) -> String {
        let path = dir.join(DEFAULT_CONFIG_FILE);
        fs::write(&path, content).unwrap();
        path.to_string_lossy().to_string()
    }

    #[test]
    fn test_relative_paths_follow_config_directory() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("web/src")).unwrap();
        let path = write_config(
            temp_dir.path(),
            "[project]\nroot = \"web\"\n\n[output]\ninventory = \"out/inventory.json\"\n",
        );

        let config = Config::load(&path, None).unwrap();

        assert!(config.root().ends_with("web"));
        assert!(config.root().is_absolute());
        assert_eq!(
            PathBuf::from(&config.output.inventory),
            temp_dir.path().join("out/inventory.json")
        );
        assert_eq!(config.coverage_path(crate::ReportFormat::Json).extension().unwrap(), "json");
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_config(temp_dir.path(), "[project]\nroot = \"missing\"\n");
        let err = Config::load(&path, None).unwrap_err();
        assert!(err.to_string().contains("input unavailable"));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let temp_dir = TempDir::new().unwrap();
        for content in [
            "[output]\nformat = \"html\"\n",
            "[selectors]\nattribute = \"id\"\n",
            "[mocks]\npage_size = 0\n",
            "[project]\nexclude = [\"[\"]\n",
            "[thresholds]\nmax_unresolved = \"many\"\n",
        ] {
            let path = write_config(temp_dir.path(), content);
            assert!(Config::load(&path, None).is_err(), "accepted: {}", content);
        }
    }

    #[test]
    fn test_catalogs_extend_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_config(
            temp_dir.path(),
            r#"
[[catalog.shapes]]
shape = "hook_invocation"
name = "useApi"
kind = "query"

[[integrations.telemetry]]
name = "plausible"
hosts = ["plausible.io"]

[mocks]
wire_case = "camel-case"
page_size = 3

[thresholds]
max_unresolved = 2
"#,
        );
        let config = Config::load(&path, None).unwrap();

        let shapes = config.call_shapes();
        assert_eq!(
            shapes.shapes[0],
            CallShape::HookInvocation {
                name: "useApi".to_string(),
                kind: HookKind::Query,
                source: Default::default(),
            }
        );
        assert_eq!(shapes.shapes.len(), CallShapeCatalog::default().shapes.len() + 1);
        let catalog = config.integration_catalog();
        assert!(catalog.telemetry.iter().any(|d| d.name == "plausible"));
        assert!(catalog.telemetry.iter().any(|d| d.name == "segment"));
        assert_eq!(config.mocks.page_size, 3);
        assert_eq!(config.mocks.url_prefix, "**");
        assert!(!config.thresholds.exceeded(2));
        assert!(config.thresholds.exceeded(3));
    }
}

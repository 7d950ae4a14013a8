use anyhow::{Context, Result};
use ef_core::parsers::SOURCE_EXTENSIONS;
use serde_json::Value;
use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

/// Outcome of resolving one import specifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Source file inside one of the source roots
    File(PathBuf),
    /// Package, asset or file outside the source roots
    External(String),
    /// Relative or aliased specifier with no file behind it
    Missing(String),
}

/// Resolves import specifiers: relative paths, tsconfig `paths`, configured
/// aliases, tsconfig `baseUrl`, then bare packages.
pub struct TypeScriptPathResolver {
    /// tsconfig `paths`: pattern -> targets, e.g. "@/*" -> ["src/*"]
    mappings: Vec<(String, Vec<String>)>,
    /// Base URL from tsconfig.json
    base_url: Option<PathBuf>,
    /// Configured aliases: prefix -> directory
    aliases: Vec<(String, PathBuf)>,
    project_root: PathBuf,
    source_roots: Vec<PathBuf>,
}

impl TypeScriptPathResolver {
    /// Creates a resolver for `project_root`, reading tsconfig.json when present
    pub fn new(project_root: &Path) -> Self {
        let mut resolver = Self {
            mappings: Vec::new(),
            base_url: None,
            aliases: Vec::new(),
            project_root: project_root.to_path_buf(),
            source_roots: vec![normalize_path(project_root)],
        };

        if let Err(err) = resolver.load_tsconfig(project_root) {
            // expected for plain JavaScript projects
            tracing::debug!(
                project_root = ?project_root,
                error = %err,
                "No usable tsconfig.json"
            );
        }

        resolver
    }

    /// Only files under these roots become graph nodes
    pub fn with_source_roots(mut self, roots: &[PathBuf]) -> Self {
        if !roots.is_empty() {
            self.source_roots = roots.iter().map(|r| normalize_path(r)).collect();
        }
        self
    }

    /// Adds configured aliases (`"@" = "src"`, `"~components/*" = "src/components/*"`)
    pub fn with_aliases<'a, I>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        for (prefix, target) in aliases {
            let prefix = prefix.trim_end_matches("/*").trim_end_matches('/').to_string();
            let target = target.trim_end_matches("/*").trim_end_matches('/');
            self.aliases.push((prefix, self.project_root.join(target)));
        }
        // longest prefix first
        self.aliases.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        self
    }

    fn load_tsconfig(&mut self, project_root: &Path) -> Result<()> {
        let tsconfig_path = ["tsconfig.json", "tsconfig.base.json", "jsconfig.json"]
            .iter()
            .map(|name| project_root.join(name))
            .find(|path| path.exists())
            .context("tsconfig.json not found")?;

        let content = std::fs::read_to_string(&tsconfig_path)
            .with_context(|| format!("Failed to read {:?}", tsconfig_path))?;
        let json: Value = serde_json::from_str(&strip_json_comments(&content))
            .with_context(|| format!("Failed to parse {:?}", tsconfig_path))?;

        let options = json.get("compilerOptions");
        if let Some(base_url) = options
            .and_then(|opts| opts.get("baseUrl"))
            .and_then(|v| v.as_str())
        {
            self.base_url = Some(if base_url == "." {
                project_root.to_path_buf()
            } else {
                project_root.join(base_url)
            });
        }

        if let Some(paths) = options
            .and_then(|opts| opts.get("paths"))
            .and_then(|v| v.as_object())
        {
            for (pattern, targets) in paths {
                let targets: Vec<String> = targets
                    .as_array()
                    .map(|items| {
                        items
                            .iter()
                            .filter_map(|t| t.as_str().map(str::to_string))
                            .collect()
                    })
                    .unwrap_or_default();
                if !targets.is_empty() {
                    self.mappings.push((pattern.clone(), targets));
                }
            }
        }

        tracing::debug!(
            tsconfig = ?tsconfig_path,
            mappings = self.mappings.len(),
            base_url = ?self.base_url,
            "Loaded tsconfig"
        );
        Ok(())
    }

    /// Resolves `specifier` as written in `importer`
    pub fn resolve(&self, specifier: &str, importer: &Path) -> Resolution {
        if is_relative(specifier) {
            let base = importer.parent().unwrap_or(&self.project_root);
            return match try_candidates(&base.join(specifier)) {
                Some(path) => self.classify(path),
                None => Resolution::Missing(format!("cannot find '{}'", specifier)),
            };
        }

        let mut aliased = false;
        for (pattern, targets) in &self.mappings {
            let Some(rest) = match_pattern(pattern, specifier) else {
                continue;
            };
            aliased = true;
            let base = self.base_url.as_ref().unwrap_or(&self.project_root);
            for target in targets {
                let target = target.replacen('*', rest, 1);
                if let Some(path) = try_candidates(&base.join(target)) {
                    return self.classify(path);
                }
            }
        }

        for (prefix, dir) in &self.aliases {
            let rest = if specifier == prefix {
                Some("")
            } else {
                specifier
                    .strip_prefix(prefix.as_str())
                    .and_then(|rest| rest.strip_prefix('/'))
            };
            if let Some(rest) = rest {
                aliased = true;
                if let Some(path) = try_candidates(&dir.join(rest)) {
                    return self.classify(path);
                }
            }
        }

        if let Some(base_url) = &self.base_url {
            if let Some(path) = try_candidates(&base_url.join(specifier)) {
                return self.classify(path);
            }
        }

        if aliased {
            return Resolution::Missing(format!("alias target for '{}' not found", specifier));
        }
        Resolution::External(package_name(specifier))
    }

    fn classify(&self, path: PathBuf) -> Resolution {
        let path = normalize_path(&path);
        let is_code = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| SOURCE_EXTENSIONS.contains(&e))
            .unwrap_or(false);
        let inside = self.source_roots.iter().any(|root| path.starts_with(root));
        if is_code && inside && !path.components().any(|c| c.as_os_str() == "node_modules") {
            Resolution::File(path)
        } else {
            let display = path
                .strip_prefix(normalize_path(&self.project_root))
                .unwrap_or(path.as_path())
                .to_string_lossy()
                .replace('\\', "/");
            Resolution::External(display)
        }
    }
}

impl Default for TypeScriptPathResolver {
    fn default() -> Self {
        Self {
            mappings: Vec::new(),
            base_url: None,
            aliases: Vec::new(),
            project_root: PathBuf::from("."),
            source_roots: vec![PathBuf::from(".")],
        }
    }
}

fn is_relative(specifier: &str) -> bool {
    specifier == "."
        || specifier == ".."
        || specifier.starts_with("./")
        || specifier.starts_with("../")
        || specifier.starts_with('/')
}

/// Matches a tsconfig `paths` pattern, returning what `*` captured
fn match_pattern<'a>(pattern: &str, specifier: &'a str) -> Option<&'a str> {
    match pattern.split_once('*') {
        Some((prefix, suffix)) => specifier
            .strip_prefix(prefix)
            .and_then(|rest| rest.strip_suffix(suffix)),
        None => (pattern == specifier).then_some(""),
    }
}

/// Tries the path as-is, with each source extension appended, with a
/// TypeScript extension instead of an emitted `.js`, and as a directory index
fn try_candidates(candidate: &Path) -> Option<PathBuf> {
    if candidate.is_file() {
        return Some(candidate.to_path_buf());
    }
    for ext in SOURCE_EXTENSIONS {
        let mut with_ext = OsString::from(candidate.as_os_str());
        with_ext.push(".");
        with_ext.push(ext);
        let with_ext = PathBuf::from(with_ext);
        if with_ext.is_file() {
            return Some(with_ext);
        }
    }
    if matches!(
        candidate.extension().and_then(|e| e.to_str()),
        Some("js") | Some("jsx") | Some("mjs") | Some("cjs")
    ) {
        for ext in ["ts", "tsx"] {
            let swapped = candidate.with_extension(ext);
            if swapped.is_file() {
                return Some(swapped);
            }
        }
    }
    if candidate.is_dir() {
        for ext in SOURCE_EXTENSIONS {
            let index = candidate.join(format!("index.{}", ext));
            if index.is_file() {
                return Some(index);
            }
        }
    }
    None
}

/// `@scope/pkg/sub` -> `@scope/pkg`, `pkg/sub` -> `pkg`
pub fn package_name(specifier: &str) -> String {
    let mut parts = specifier.split('/');
    match (parts.next(), parts.next()) {
        (Some(scope), Some(name)) if scope.starts_with('@') => format!("{}/{}", scope, name),
        (Some(name), _) => name.to_string(),
        _ => specifier.to_string(),
    }
}

/// Canonical path when it exists, lexically cleaned otherwise
pub fn normalize_path(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Removes `//` and `/* */` comments and trailing commas so tsconfig files parse as JSON
fn strip_json_comments(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut in_string = false;
    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            if c == '\\' {
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match (c, chars.peek()) {
            ('"', _) => {
                in_string = true;
                out.push(c);
            }
            ('/', Some('/')) => {
                for next in chars.by_ref() {
                    if next == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            ('/', Some('*')) => {
                chars.next();
                let mut prev = ' ';
                for next in chars.by_ref() {
                    if prev == '*' && next == '/' {
                        break;
                    }
                    prev = next;
                }
            }
            _ => out.push(c),
        }
    }

    // trailing commas before a closing bracket
    let mut cleaned = String::with_capacity(out.len());
    let bytes: Vec<char> = out.chars().collect();
    let mut in_string = false;
    for (i, c) in bytes.iter().enumerate() {
        if *c == '"' && (i == 0 || bytes[i - 1] != '\\') {
            in_string = !in_string;
        }
        if *c == ',' && !in_string {
            let next = bytes[i + 1..].iter().find(|ch| !ch.is_whitespace());
            if matches!(next, Some('}') | Some(']')) {
                continue;
            }
        }
        cleaned.push(*c);
    }
    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) -> PathBuf {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_relative_extension_and_index_resolution() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let page = write(root, "src/pages/Home.tsx", "");
        let button = write(root, "src/components/Button.tsx", "");
        let list = write(root, "src/components/list/index.ts", "");

        let resolver = TypeScriptPathResolver::new(root);
        assert_eq!(
            resolver.resolve("../components/Button", &page),
            Resolution::File(normalize_path(&button))
        );
        assert_eq!(
            resolver.resolve("../components/list", &page),
            Resolution::File(normalize_path(&list))
        );
        assert!(matches!(
            resolver.resolve("./Missing", &page),
            Resolution::Missing(_)
        ));
    }

    #[test]
    fn test_tsconfig_paths_with_comments() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write(
            root,
            "tsconfig.json",
            r#"{
                // editor settings
                "compilerOptions": {
                    "baseUrl": ".",
                    "paths": { "@/*": ["src/*"], }, /* aliases */
                },
            }"#,
        );
        let page = write(root, "src/pages/Home.tsx", "");
        let client = write(root, "src/api/client.ts", "");

        let resolver = TypeScriptPathResolver::new(root);
        assert_eq!(
            resolver.resolve("@/api/client", &page),
            Resolution::File(normalize_path(&client))
        );
        assert!(matches!(
            resolver.resolve("@/api/nothing", &page),
            Resolution::Missing(_)
        ));
        // baseUrl lookup
        assert_eq!(
            resolver.resolve("src/api/client", &page),
            Resolution::File(normalize_path(&client))
        );
    }

    #[test]
    fn test_configured_alias_and_packages() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let page = write(root, "src/pages/Home.tsx", "");
        let hook = write(root, "src/hooks/useTodos.ts", "");
        write(root, "src/pages/home.css", "");

        let mut aliases = IndexMap::new();
        aliases.insert("~".to_string(), "src".to_string());
        let resolver = TypeScriptPathResolver::new(root).with_aliases(&aliases);

        assert_eq!(
            resolver.resolve("~/hooks/useTodos", &page),
            Resolution::File(normalize_path(&hook))
        );
        assert_eq!(
            resolver.resolve("@tanstack/react-query/build", &page),
            Resolution::External("@tanstack/react-query".to_string())
        );
        assert_eq!(
            resolver.resolve("./home.css", &page),
            Resolution::External("src/pages/home.css".to_string())
        );
    }

    #[test]
    fn test_files_outside_source_roots_are_external() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let page = write(root, "src/App.tsx", "");
        write(root, "shared/theme.ts", "");

        let resolver =
            TypeScriptPathResolver::new(root).with_source_roots(&[root.join("src")]);
        assert_eq!(
            resolver.resolve("../shared/theme", &page),
            Resolution::External("shared/theme.ts".to_string())
        );
    }
}

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

const CONFIG_TEMPLATE: &str = r#"# e2e-forge configuration

[project]
# Directory holding package.json; relative paths in this file resolve against
# the directory of the config file.
root = "."
# Source roots relative to the project root (default: src, else the root)
# source_roots = ["src"]
# Entry point globs over project-relative paths (default: pages/, app/**/page,
# views/*Page, screens/*Screen)
# entry_points = ["src/pages/**/*.tsx"]
# Files never analyzed nor audited (default: tests, stories, mocks, .d.ts)
# exclude = ["**/*.test.*", "**/*.stories.*"]
# Maximum import depth below an entry point (optional, unlimited by default)
# max_recursion_depth = 20

# Import aliases on top of tsconfig paths
# [project.aliases]
# "@/" = "src/"

# Extra call shapes, checked before the built-in ones
# [catalog]
# replace_defaults = false
# [[catalog.shapes]]
# shape = "hook_invocation"
# name = "useApi"
# kind = "query"
# [[catalog.shapes]]
# shape = "bare_client_call"
# object = "backend"
# [[catalog.shapes]]
# shape = "wrapped_hook"
# pattern = "request*"

# Third-party SDKs and analytics destinations; entries replace built-ins by name
# [[integrations.telemetry]]
# name = "plausible"
# hosts = ["plausible.io"]

[selectors]
attribute = "data-testid"
# Other attributes accepted as existing selectors
aliases = ["data-cy", "data-test"]
# max_purpose_words = 3
# library_components = ["Button", "TextField"]
# presentational_wrappers = ["Box", "Stack", "Grid"]

[mocks]
# Prepended to every endpoint template
url_prefix = "**"
page_size = 2
# Field naming of the backend: snake-case, camel-case, pascal-case, kebab-case
wire_case = "snake-case"
# Abort every known analytics destination, not only the observed ones
block_all_telemetry = false

# Field names for a resource (singular name)
# [mocks.resources]
# todo = ["id", "title", "completed", "created_at"]

# [[mocks.overrides]]
# endpoint = "/api/todos/"
# method = "POST"
# status = 422
# body = { detail = "invalid" }

[output]
format = "markdown"
inventory = "inventory.json"
coverage = "coverage.md"
mocks = "mocks.json"

[thresholds]
# Fail the run when unresolved calls plus resolution errors exceed this
# max_unresolved = 0
"#;

/// Creates the configuration file
pub fn execute_init(path: &str) -> Result<()> {
    let config_path = Path::new(path);
    if config_path.exists() {
        anyhow::bail!("Config file already exists: {}", path);
    }

    fs::write(config_path, CONFIG_TEMPLATE)
        .with_context(|| format!("Failed to write config file: {}", path))?;
    println!("Created config file: {}", path);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use tempfile::TempDir;

    #[test]
    fn test_template_loads_and_is_not_overwritten() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("e2e-forge.toml");
        let path = path.to_str().unwrap();

        execute_init(path).unwrap();
        let config = Config::load(path, None).unwrap();
        assert_eq!(config.selectors.attribute, "data-testid");
        assert_eq!(config.thresholds.max_unresolved, None);

        assert!(execute_init(path).is_err());
    }
}

use crate::commands::{build_graph, progress_bar};
use crate::config::Config;
use crate::reporters::ensure_parent;
use crate::MockOutputFormat;
use anyhow::{Context, Result};
use colored::Colorize;
use ef_mock::{MockFormat, MockSet, MockSynthesizer, RouteKind};
use ef_typescript::{build_globset, Analyzer, ReportEmitter, Scope};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Written fixture set
#[derive(Debug)]
pub struct MocksSummary {
    pub set: MockSet,
    pub format: MockFormat,
    pub path: PathBuf,
}

pub fn execute_mocks(
    config_path: &str,
    format: Option<MockOutputFormat>,
    output: Option<PathBuf>,
) -> Result<MocksSummary> {
    let config = Config::load_or_default(config_path)?;
    run_mocks(&config, format.map(MockFormat::from), output)
}

/// Synthesizes fixtures for the whole project and writes them.
///
/// The format comes from the flag, then from the extension of the output
/// path, then from the configured mocks path.
pub fn run_mocks(config: &Config, format: Option<MockFormat>, output: Option<PathBuf>) -> Result<MocksSummary> {
    let format = format
        .or_else(|| output.as_deref().and_then(format_from_extension))
        .or_else(|| format_from_extension(Path::new(&config.output.mocks)))
        .unwrap_or_default();
    let path = output.unwrap_or_else(|| config.mocks_path(format));

    let layout = config.layout();
    let graph = build_graph(layout.clone())?;
    let catalog = config.call_shapes();
    let integrations = config.integration_catalog();
    let exclude = build_globset(&layout.exclude)?;
    let analyzer = Analyzer::new(&graph, &catalog, &integrations, &config.selectors, &exclude);
    let emitter = ReportEmitter::new(&graph, analyzer, config.root());

    let pb = progress_bar(0, "routes")?;
    pb.set_message("Extracting API calls...");
    let analysis = emitter.analyze(&Scope::Full);
    let set = MockSynthesizer::new(&config.mocks, &integrations).synthesize(&analysis.calls, &analysis.third_party);
    pb.finish_with_message(format!("Synthesized {} routes", set.routes.len()));

    let rendered = format.render(&set)?;
    let path_str = path.to_string_lossy();
    ensure_parent(&path_str)?;
    fs::write(&path, rendered).with_context(|| format!("Failed to write mocks: {}", path.display()))?;

    let endpoints = set.routes_of(RouteKind::Endpoint).count();
    let blocked = set.routes_of(RouteKind::TelemetryBlock).count();
    info!(routes = set.routes.len(), endpoints, blocked, stubs = set.stubs.len(), %format, "Mocks written");
    println!(
        "{} {} endpoint route(s), {} telemetry block(s), {} integration stub(s)",
        "Mocks:".bold(),
        endpoints.to_string().green(),
        blocked,
        set.stubs.len()
    );
    println!("Mocks saved to {}", path_str);

    Ok(MocksSummary { set, format, path })
}

fn format_from_extension(path: &Path) -> Option<MockFormat> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(|ext| ext.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(format_from_extension(Path::new("out/mocks.yml")), Some(MockFormat::Yaml));
        assert_eq!(format_from_extension(Path::new("e2e/mocks.ts")), Some(MockFormat::Playwright));
        assert_eq!(format_from_extension(Path::new("mocks")), None);
        assert_eq!(format_from_extension(Path::new("mocks.txt")), None);
    }
}

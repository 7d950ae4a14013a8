pub mod init;
pub mod mocks;
pub mod scan;

use anyhow::Result;
use ef_core::graph::ComponentGraph;
use ef_typescript::{ModuleGraphBuilder, ProjectLayout};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Bar over `len` units, or a spinner when the length is unknown
pub(crate) fn progress_bar(len: u64, unit: &str) -> Result<ProgressBar> {
    if len == 0 {
        let pb = ProgressBar::new_spinner();
        pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
        pb.enable_steady_tick(Duration::from_millis(100));
        return Ok(pb);
    }
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(&format!(
                "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} {} {{msg}}",
                unit
            ))?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

/// Discovers sources and builds the component graph
pub(crate) fn build_graph(layout: ProjectLayout) -> Result<ComponentGraph> {
    let pb = progress_bar(0, "modules")?;
    pb.set_message("Building component graph...");
    let graph = ModuleGraphBuilder::build_project(layout)?;
    pb.finish_with_message(format!(
        "Component graph built: {} modules, {} entry points",
        graph.module_count(),
        graph.entry_points().len()
    ));
    Ok(graph)
}

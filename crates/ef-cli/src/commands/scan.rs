use crate::commands::{build_graph, progress_bar};
use crate::config::Config;
use crate::prompt::{confirm_session, PromptOutcome};
use crate::reporters::{write_inventory, JsonReporter, MarkdownReporter};
use crate::{ReportFormat, ScanMode};
use anyhow::{Context, Result};
use colored::Colorize;
use ef_core::graph::ComponentGraph;
use ef_core::models::{CoverageReport, FileAudit, InventoryDocument, PatchFailure, WriteConflict};
use ef_core::EfError;
use ef_typescript::{
    build_globset, plan_patch, Analyzer, FilePatch, PatchOptions, PatchSession, ReportEmitter, Scope,
};
use std::fs;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(clap::Args, Debug, Clone, Default)]
pub struct ScanArgs {
    /// Part of the project to report on
    #[arg(long, value_enum, default_value_t = ScanMode::Full)]
    pub mode: ScanMode,
    /// Changed files (mode `changes`)
    #[arg(long = "changed", num_args = 1..)]
    pub changed: Vec<PathBuf>,
    /// File listing one changed path per line (mode `changes`)
    #[arg(long)]
    pub changed_list: Option<PathBuf>,
    /// Directory or file to scan (mode `path`)
    #[arg(long)]
    pub path: Option<PathBuf>,
    /// Write missing selectors into the sources
    #[arg(long)]
    pub fix: bool,
    /// Confirm every proposal before writing
    #[arg(long, requires = "fix")]
    pub interactive: bool,
    /// Also rename selectors that break the naming convention
    #[arg(long)]
    pub rename_invalid: bool,
    /// Print the planned change of every file as a diff
    #[arg(long)]
    pub diff: bool,
    /// Coverage report format; the config decides when absent
    #[arg(long, value_enum)]
    pub format: Option<ReportFormat>,
}

impl ScanArgs {
    /// Scope selected by the mode flags
    pub fn scope(&self) -> Result<Scope> {
        match self.mode {
            ScanMode::Full => Ok(Scope::Full),
            ScanMode::Changes => {
                let mut paths = self.changed.clone();
                if let Some(list) = &self.changed_list {
                    let content = fs::read_to_string(list)
                        .with_context(|| format!("Failed to read change list: {}", list.display()))?;
                    paths.extend(
                        content
                            .lines()
                            .map(str::trim)
                            .filter(|line| !line.is_empty() && !line.starts_with('#'))
                            .map(PathBuf::from),
                    );
                }
                if paths.is_empty() {
                    warn!("Change-set mode without changed files; nothing is in scope");
                }
                Ok(Scope::ChangeSet(paths))
            }
            ScanMode::Path => self
                .path
                .clone()
                .map(Scope::SinglePath)
                .ok_or_else(|| anyhow::anyhow!("--mode path requires --path")),
        }
    }
}

/// What a scan produced
#[derive(Debug)]
pub struct ScanSummary {
    pub inventory: InventoryDocument,
    pub coverage: CoverageReport,
    /// Files written by fix mode
    pub patched: Vec<String>,
    pub threshold_exceeded: bool,
}

/// Executes a scan, prompting on the terminal in interactive mode
pub fn execute_scan(config_path: &str, args: &ScanArgs) -> Result<ScanSummary> {
    let config = Config::load_or_default(config_path)?;
    let stdin = std::io::stdin();
    let mut input = stdin.lock();
    let mut output = std::io::stdout();
    run_scan(&config, args, &mut input, &mut output)
}

/// Scan with explicit prompt streams
pub fn run_scan<R: BufRead, W: Write>(
    config: &Config,
    args: &ScanArgs,
    input: &mut R,
    output: &mut W,
) -> Result<ScanSummary> {
    let scope = args.scope()?;
    let layout = config.layout();
    let graph = build_graph(layout.clone())?;

    let catalog = config.call_shapes();
    let integrations = config.integration_catalog();
    let exclude = build_globset(&layout.exclude)?;
    let analyzer = Analyzer::new(&graph, &catalog, &integrations, &config.selectors, &exclude);
    let emitter = ReportEmitter::new(&graph, analyzer, config.root());

    let pb = progress_bar(0, "files")?;
    pb.set_message(format!("Analyzing {}...", scope));
    let analysis = emitter.analyze(&scope);
    let (inventory, mut coverage) = emitter.documents(&scope, &analysis);
    pb.finish_with_message(format!("Analyzed {} files", analysis.files.len()));

    let mut patched = Vec::new();
    if args.fix || args.diff {
        let options = PatchOptions {
            rename_invalid: args.rename_invalid,
        };
        let pb = progress_bar(analysis.audits.len() as u64, "files")?;
        pb.set_message("Planning selectors...");
        for audit in analysis.audits.values() {
            pb.inc(1);
            let result = pb.suspend(|| patch_file(config, &graph, audit, args, options, input, output));
            match result {
                Ok(Some(file)) => patched.push(file),
                Ok(None) => {}
                Err(err) => match err.downcast_ref::<EfError>() {
                    Some(EfError::WriteConflict { path }) => {
                        warn!(file = %audit.file, path = %path.display(), "File changed since analysis, not patched");
                        coverage.diagnostics.write_conflicts.push(WriteConflict {
                            file: audit.file.clone(),
                        });
                        coverage.counts.write_conflicts += 1;
                    }
                    _ => {
                        let message = format!("{:#}", err);
                        warn!(file = %audit.file, error = %message, "Patch failed, file left unchanged");
                        coverage.diagnostics.patch_failures.push(PatchFailure {
                            file: audit.file.clone(),
                            message,
                        });
                        coverage.counts.patch_failures += 1;
                    }
                },
            }
        }
        coverage.diagnostics.normalize();
        pb.finish_with_message(format!("Patched {} files", patched.len()));
    }

    write_inventory(&inventory, &config.output.inventory)?;
    let format = args.format.unwrap_or_else(|| config.report_format());
    let coverage_path = config.coverage_path(format);
    let coverage_path = coverage_path.to_string_lossy();
    match format {
        ReportFormat::Json => JsonReporter.generate(&coverage, &inventory, &coverage_path)?,
        ReportFormat::Markdown => MarkdownReporter.generate(&coverage, &inventory, &coverage_path)?,
    }

    let unresolved = coverage.unresolved_total();
    let threshold_exceeded = config.thresholds.exceeded(unresolved);
    info!(
        files = coverage.counts.files_analyzed,
        unresolved,
        patched = patched.len(),
        "Scan completed"
    );
    print_summary(output, &coverage, &inventory, &patched, config, threshold_exceeded)?;
    writeln!(
        output,
        "Inventory saved to {}, coverage report saved to {}",
        config.output.inventory, coverage_path
    )?;

    Ok(ScanSummary {
        inventory,
        coverage,
        patched,
        threshold_exceeded,
    })
}

/// Plans, shows and writes the patch of one file; returns the file when written
fn patch_file<R: BufRead, W: Write>(
    config: &Config,
    graph: &ComponentGraph,
    audit: &FileAudit,
    args: &ScanArgs,
    options: PatchOptions,
    input: &mut R,
    output: &mut W,
) -> Result<Option<String>> {
    let patch = if args.interactive {
        interactive_patch(config, graph, audit, options, input, output)?
    } else {
        plan_file(graph, audit, options)?
    };
    let Some(patch) = patch.filter(|p| !p.is_noop()) else {
        return Ok(None);
    };

    if args.diff {
        write!(output, "{}", patch.diff()?)?;
    }
    if !args.fix {
        return Ok(None);
    }
    patch.commit()?;
    Ok(Some(patch.file))
}

fn plan_file(graph: &ComponentGraph, audit: &FileAudit, options: PatchOptions) -> Result<Option<FilePatch>> {
    let Some(module) = graph.node_for_display(&audit.file).and_then(|id| graph.module(id)) else {
        warn!(file = %audit.file, "Audited file missing from the graph");
        return Ok(None);
    };
    Ok(Some(plan_patch(module, audit, options)?))
}

fn interactive_patch<R: BufRead, W: Write>(
    config: &Config,
    graph: &ComponentGraph,
    audit: &FileAudit,
    options: PatchOptions,
    input: &mut R,
    output: &mut W,
) -> Result<Option<FilePatch>> {
    let Some(module) = graph.node_for_display(&audit.file).and_then(|id| graph.module(id)) else {
        return Ok(None);
    };
    let mut session = PatchSession::new(
        module,
        audit,
        &config.selectors.attribute,
        &config.selectors.generic_values,
        options,
    );
    if session.is_empty() {
        return Ok(None);
    }
    match confirm_session(&audit.file, &mut session, input, output)? {
        PromptOutcome::Completed => Ok(Some(session.finish()?)),
        PromptOutcome::Abandoned => {
            warn!(file = %audit.file, pending = session.pending(), "Proposals left undecided, file not patched");
            Ok(None)
        }
    }
}

fn print_summary<W: Write>(
    output: &mut W,
    coverage: &CoverageReport,
    inventory: &InventoryDocument,
    patched: &[String],
    config: &Config,
    threshold_exceeded: bool,
) -> Result<()> {
    let counts = &coverage.counts;
    writeln!(output, "{} ({})", "Scan summary".bold(), coverage.scope)?;
    writeln!(
        output,
        "  pages: {}  endpoints: {}  files: {}",
        inventory.pages.len(),
        inventory.endpoints.len(),
        counts.files_analyzed
    )?;
    let percent = format!("{:.1}%", counts.coverage_percent);
    let percent = if counts.selectors_missing == 0 {
        percent.green()
    } else {
        percent.yellow()
    };
    writeln!(
        output,
        "  selector coverage: {} ({} missing, {} naming violations)",
        percent, counts.selectors_missing, counts.naming_violations
    )?;
    if !patched.is_empty() {
        writeln!(output, "  patched files: {}", patched.len().to_string().green())?;
    }
    if counts.write_conflicts > 0 {
        writeln!(output, "  write conflicts: {}", counts.write_conflicts.to_string().red())?;
    }
    if counts.patch_failures > 0 {
        writeln!(output, "  patch failures: {}", counts.patch_failures.to_string().red())?;
    }

    let unresolved = coverage.unresolved_total();
    let line = format!(
        "  unresolved: {} calls, {} imports",
        counts.unresolved_calls, counts.resolution_errors
    );
    match config.thresholds.max_unresolved {
        Some(max) if threshold_exceeded => {
            writeln!(output, "{} {}", line.red(), format!("(limit {})", max).red().bold())?
        }
        Some(max) => writeln!(output, "{} (limit {})", line, max)?,
        None if unresolved > 0 => writeln!(output, "{}", line.yellow())?,
        None => writeln!(output, "{}", line)?,
    }
    Ok(())
}

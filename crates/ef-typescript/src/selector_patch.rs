//! Applying selector proposals to source text.
//!
//! All edits of a file are planned against the analyzed snapshot and applied
//! in one pass; the result is written with [`commit_file`], which refuses to
//! overwrite a file that changed in the meantime.

use crate::selector_audit::render_attribute;
use ef_core::graph::SourceModule;
use ef_core::models::{FileAudit, Location};
use ef_core::naming::validate_selector;
use ef_core::rewrite::{apply_edits, commit_file, TextEdit};
use ef_core::{EfError, EfResult};
use std::path::PathBuf;
use std::sync::Arc;

/// Lines of unchanged context around each diff hunk
const DIFF_CONTEXT: usize = 3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatchOptions {
    /// Also rewrite existing values that break the naming convention
    pub rename_invalid: bool,
}

/// New content planned for one file
#[derive(Debug, Clone)]
pub struct FilePatch {
    pub file: String,
    pub path: PathBuf,
    /// Hash of the snapshot the edits were planned against
    pub original_hash: String,
    pub original: Arc<str>,
    pub new_text: String,
    pub edits: Vec<TextEdit>,
    pub insertions: usize,
    pub renames: usize,
}

impl FilePatch {
    pub fn is_noop(&self) -> bool {
        self.new_text.as_str() == &*self.original
    }

    /// Unified-style diff of the planned change
    pub fn diff(&self) -> EfResult<String> {
        unified_diff(&self.file, &self.original, &self.edits)
    }

    /// Writes the new content atomically; a file that changed since analysis is left untouched
    pub fn commit(&self) -> EfResult<()> {
        if self.is_noop() {
            return Ok(());
        }
        commit_file(&self.path, &self.original_hash, &self.new_text)?;
        tracing::info!(
            file = %self.file,
            insertions = self.insertions,
            renames = self.renames,
            "Patched selectors"
        );
        Ok(())
    }
}

/// Every edit the audit asks for, honoring rename mode
pub fn plan_edits(audit: &FileAudit, options: PatchOptions) -> Vec<TextEdit> {
    let mut edits: Vec<TextEdit> = audit
        .missing()
        .flat_map(|c| c.edits.iter().cloned())
        .collect();
    if options.rename_invalid {
        edits.extend(audit.violations.iter().flat_map(|v| v.edits.iter().cloned()));
    }
    edits
}

/// Pure rewrite of `original` according to `audit`
pub fn patch_source(original: &str, audit: &FileAudit, options: PatchOptions) -> EfResult<String> {
    apply_edits(original, &plan_edits(audit, options))
}

/// Plans the patch of an analyzed module without asking for confirmation
pub fn plan_patch(
    module: &SourceModule,
    audit: &FileAudit,
    options: PatchOptions,
) -> EfResult<FilePatch> {
    let edits = plan_edits(audit, options);
    let new_text = apply_edits(&module.source, &edits)?;
    Ok(FilePatch {
        file: module.display.clone(),
        path: module.path.clone(),
        original_hash: module.hash.clone(),
        original: module.source.clone(),
        new_text,
        edits,
        insertions: audit.missing().count(),
        renames: if options.rename_invalid {
            audit.violations.len()
        } else {
            0
        },
    })
}

/// Caller's answer to one proposal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Accept,
    /// Use this static value instead of the suggestion
    Modify(String),
    Skip,
}

/// Proposal awaiting a decision, as shown to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proposal {
    pub index: usize,
    pub element: String,
    pub location: Location,
    /// Value currently in the source (renames only)
    pub current: Option<String>,
    /// Rendered value that will be written on accept
    pub suggested: String,
}

#[derive(Debug, Clone)]
struct PendingEdit {
    element: String,
    location: Location,
    current: Option<String>,
    attribute: String,
    base: String,
    disambiguators: Vec<String>,
    /// First edit writes the attribute; the rest add loop index parameters
    edits: Vec<TextEdit>,
    is_rename: bool,
}

/// Pull-based confirmation of one file's proposals.
///
/// Proposals are answered one at a time; [`PatchSession::finish`] refuses to
/// produce a patch while any of them is still undecided.
pub struct PatchSession {
    file: String,
    path: PathBuf,
    original_hash: String,
    original: Arc<str>,
    generic_values: Vec<String>,
    existing_values: Vec<(Location, String)>,
    proposals: Vec<PendingEdit>,
    decisions: Vec<Option<Decision>>,
}

impl PatchSession {
    pub fn new(
        module: &SourceModule,
        audit: &FileAudit,
        attribute: &str,
        generic_values: &[String],
        options: PatchOptions,
    ) -> Self {
        let mut proposals: Vec<PendingEdit> = audit
            .missing()
            .map(|c| PendingEdit {
                element: c.element.clone(),
                location: c.location.clone(),
                current: None,
                attribute: attribute.to_string(),
                base: c.suggested.clone(),
                disambiguators: c.disambiguators.clone(),
                edits: c.edits.clone(),
                is_rename: false,
            })
            .collect();
        if options.rename_invalid {
            proposals.extend(audit.violations.iter().map(|v| PendingEdit {
                element: v.element.clone(),
                location: v.location.clone(),
                current: Some(v.current.clone()),
                attribute: v.attribute.clone(),
                base: ef_core::naming::static_selector_part(&v.suggested),
                disambiguators: audit
                    .candidates
                    .iter()
                    .find(|c| c.location == v.location)
                    .map(|c| c.disambiguators.clone())
                    .unwrap_or_default(),
                edits: v.edits.clone(),
                is_rename: true,
            }));
        }
        proposals.sort_by(|a, b| a.location.cmp(&b.location));
        let decisions = vec![None; proposals.len()];
        Self {
            file: module.display.clone(),
            path: module.path.clone(),
            original_hash: module.hash.clone(),
            original: module.source.clone(),
            generic_values: generic_values.to_vec(),
            existing_values: audit.existing_values.clone(),
            proposals,
            decisions,
        }
    }

    pub fn len(&self) -> usize {
        self.proposals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proposals.is_empty()
    }

    pub fn pending(&self) -> usize {
        self.decisions.iter().filter(|d| d.is_none()).count()
    }

    /// First proposal without a decision
    pub fn next_pending(&self) -> Option<Proposal> {
        let index = self.decisions.iter().position(|d| d.is_none())?;
        let pending = &self.proposals[index];
        Some(Proposal {
            index,
            element: pending.element.clone(),
            location: pending.location.clone(),
            current: pending.current.clone(),
            suggested: ef_core::models::render_selector_value(&pending.base, &pending.disambiguators),
        })
    }

    /// Records a decision; a modified value must follow the naming convention
    /// and must not collide with a value already in the file or with another
    /// proposal of the file.
    pub fn resolve(&mut self, index: usize, decision: Decision) -> EfResult<()> {
        if index >= self.proposals.len() {
            return Err(EfError::Config(format!(
                "no proposal {} in {}",
                index, self.file
            )));
        }
        if let Decision::Modify(value) = &decision {
            if let Some(kind) = validate_selector(value, &self.generic_values) {
                return Err(EfError::InvalidSelector {
                    value: value.clone(),
                    reason: kind.to_string(),
                });
            }
            let collides = self
                .existing_values
                .iter()
                .any(|(location, existing)| existing == value && !self.replaced(location, index))
                || self
                    .proposals
                    .iter()
                    .enumerate()
                    .any(|(i, _)| i != index && self.effective_base(i) == Some(value.as_str()));
            if collides {
                return Err(EfError::InvalidSelector {
                    value: value.clone(),
                    reason: "duplicate in file".to_string(),
                });
            }
        }
        self.decisions[index] = Some(decision);
        Ok(())
    }

    /// Whether the existing value at `location` goes away once `index` is decided
    fn replaced(&self, location: &Location, index: usize) -> bool {
        self.proposals.iter().enumerate().any(|(i, p)| {
            p.is_rename
                && p.location == *location
                && (i == index
                    || matches!(self.decisions[i], Some(Decision::Accept) | Some(Decision::Modify(_))))
        })
    }

    fn effective_base(&self, index: usize) -> Option<&str> {
        match self.decisions.get(index)? {
            Some(Decision::Modify(value)) => Some(value.as_str()),
            Some(Decision::Skip) => None,
            _ => self.proposals.get(index).map(|p| p.base.as_str()),
        }
    }

    /// Builds the patch from the accepted and modified proposals
    pub fn finish(self) -> EfResult<FilePatch> {
        let pending = self.pending();
        if pending > 0 {
            return Err(EfError::UnresolvedDecisions {
                path: self.path,
                pending,
            });
        }

        let mut edits = Vec::new();
        let mut insertions = 0;
        let mut renames = 0;
        for (proposal, decision) in self.proposals.iter().zip(&self.decisions) {
            let base = match decision {
                Some(Decision::Accept) => proposal.base.clone(),
                Some(Decision::Modify(value)) => value.clone(),
                _ => continue,
            };
            let mut planned = proposal.edits.clone();
            if let Some(first) = planned.first_mut() {
                let attribute = render_attribute(&proposal.attribute, &base, &proposal.disambiguators);
                first.text = if first.is_insertion() {
                    format!(" {}", attribute)
                } else {
                    attribute
                };
            }
            edits.extend(planned);
            if proposal.is_rename {
                renames += 1;
            } else {
                insertions += 1;
            }
        }

        let new_text = apply_edits(&self.original, &edits)?;
        Ok(FilePatch {
            file: self.file,
            path: self.path,
            original_hash: self.original_hash,
            original: self.original,
            new_text,
            edits,
            insertions,
            renames,
        })
    }
}

/// Unified-style diff of `edits` applied to `original`
pub fn unified_diff(file: &str, original: &str, edits: &[TextEdit]) -> EfResult<String> {
    let mut edits: Vec<&TextEdit> = edits.iter().collect();
    edits.sort();
    edits.dedup();
    if edits.is_empty() {
        return Ok(String::new());
    }

    let mut line_starts = vec![0usize];
    line_starts.extend(original.match_indices('\n').map(|(i, _)| i + 1));
    if line_starts.last() == Some(&original.len()) && !original.is_empty() {
        line_starts.pop();
    }
    let line_count = line_starts.len();
    let line_of = |offset: usize| line_starts.partition_point(|&s| s <= offset).saturating_sub(1);
    let line_end = |line: usize| line_starts.get(line + 1).copied().unwrap_or(original.len());

    // (first changed line, last changed line, edits)
    let mut groups: Vec<(usize, usize, Vec<&TextEdit>)> = Vec::new();
    for edit in edits {
        let first = line_of(edit.start);
        let last = if edit.is_insertion() {
            first
        } else {
            line_of(edit.end - 1)
        };
        match groups.last_mut() {
            Some((_, group_last, group)) if first <= *group_last + 2 * DIFF_CONTEXT + 1 => {
                *group_last = (*group_last).max(last);
                group.push(edit);
            }
            _ => groups.push((first, last, vec![edit])),
        }
    }

    let mut out = format!("--- a/{}\n+++ b/{}\n", file, file);
    let mut delta: isize = 0;
    for (first, last, group) in groups {
        let start_line = first.saturating_sub(DIFF_CONTEXT);
        let end_line = (last + DIFF_CONTEXT).min(line_count.saturating_sub(1));
        let base = line_starts[start_line];
        let old_chunk = &original[base..line_end(end_line)];
        let shifted: Vec<TextEdit> = group
            .iter()
            .map(|e| TextEdit::replace(e.start - base, e.end - base, e.text.clone()))
            .collect();
        let new_chunk = apply_edits(old_chunk, &shifted)?;

        let old_lines: Vec<&str> = old_chunk.lines().collect();
        let new_lines: Vec<&str> = new_chunk.lines().collect();
        let prefix = first - start_line;
        let suffix = end_line - last;
        let new_start = start_line as isize + 1 + delta;
        out.push_str(&format!(
            "@@ -{},{} +{},{} @@\n",
            start_line + 1,
            old_lines.len(),
            new_start,
            new_lines.len()
        ));
        for line in &old_lines[..prefix.min(old_lines.len())] {
            out.push_str(&format!(" {}\n", line));
        }
        for line in &old_lines[prefix.min(old_lines.len())..old_lines.len().saturating_sub(suffix)] {
            out.push_str(&format!("-{}\n", line));
        }
        let new_middle_end = new_lines.len().saturating_sub(suffix).max(prefix.min(new_lines.len()));
        for line in &new_lines[prefix.min(new_lines.len())..new_middle_end] {
            out.push_str(&format!("+{}\n", line));
        }
        for line in &old_lines[old_lines.len().saturating_sub(suffix)..] {
            out.push_str(&format!(" {}\n", line));
        }
        delta += new_lines.len() as isize - old_lines.len() as isize;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selector_audit::{SelectorAuditor, SelectorRules};
    use ef_core::parsers::TypeScriptParser;
    use std::path::Path;
    use tempfile::TempDir;

    const TODO_LIST: &str = r#"export default function TodoList({ todos, remove }) {
    return (
        <ul>
            {todos.map((todo) => (
                <li key={todo.id}>
                    <button onClick={() => remove(todo.id)}>Delete</button>
                </li>
            ))}
        </ul>
    );
}
"#;

    fn module_at(dir: &Path, rel: &str, source: &str) -> SourceModule {
        let path = dir.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, source).unwrap();
        let facts = TypeScriptParser::new().scan_source(source, &path, rel).unwrap();
        SourceModule::new(path, rel.to_string(), facts, source.to_string())
    }

    fn audit(module: &SourceModule) -> FileAudit {
        let rules = SelectorRules::default();
        SelectorAuditor::new(&rules).audit_module(module)
    }

    #[test]
    fn test_patch_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let module = module_at(temp_dir.path(), "src/TodoList.tsx", TODO_LIST);
        let first = audit(&module);
        assert_eq!(first.missing().count(), 3);

        let patched = patch_source(TODO_LIST, &first, PatchOptions::default()).unwrap();
        assert!(patched.contains(r#"<ul data-testid="todo-list">"#));
        assert!(patched.contains("<li data-testid={`todo-list-item-${todo.id}`} key={todo.id}>"));

        let rules = SelectorRules::default();
        let second = SelectorAuditor::new(&rules)
            .audit_source(&patched, Path::new("src/TodoList.tsx"), "src/TodoList.tsx")
            .unwrap();
        assert_eq!(second.missing().count(), 0);
        assert!(second.violations.is_empty());
        assert_eq!(patch_source(&patched, &second, PatchOptions::default()).unwrap(), patched);
    }

    #[test]
    fn test_session_requires_every_decision() {
        let temp_dir = TempDir::new().unwrap();
        let module = module_at(temp_dir.path(), "src/TodoList.tsx", TODO_LIST);
        let audit = audit(&module);
        let generic = SelectorRules::default().generic_values;
        let mut session = PatchSession::new(&module, &audit, "data-testid", &generic, PatchOptions::default());

        assert_eq!(session.len(), 3);
        let first = session.next_pending().unwrap();
        assert_eq!(first.suggested, "todo-list");
        session.resolve(first.index, Decision::Accept).unwrap();

        let second = session.next_pending().unwrap();
        assert!(matches!(
            session.resolve(second.index, Decision::Modify("Bad Value".to_string())),
            Err(EfError::InvalidSelector { .. })
        ));
        session
            .resolve(second.index, Decision::Modify("todo-list-entry".to_string()))
            .unwrap();

        assert_eq!(session.pending(), 1);
        let before = std::fs::read_to_string(&module.path).unwrap();
        let err = PatchSession::new(&module, &audit, "data-testid", &generic, PatchOptions::default())
            .finish()
            .unwrap_err();
        assert!(matches!(err, EfError::UnresolvedDecisions { pending: 3, .. }));
        assert_eq!(std::fs::read_to_string(&module.path).unwrap(), before);

        let third = session.next_pending().unwrap();
        session.resolve(third.index, Decision::Skip).unwrap();
        let patch = session.finish().unwrap();
        assert_eq!(patch.insertions, 2);
        assert!(patch.new_text.contains("data-testid={`todo-list-entry-${todo.id}`}"));
        assert!(!patch.new_text.contains("remove-button"));

        patch.commit().unwrap();
        assert_eq!(std::fs::read_to_string(&module.path).unwrap(), patch.new_text);
    }

    #[test]
    fn test_modified_value_cannot_reuse_existing_selector() {
        let temp_dir = TempDir::new().unwrap();
        let source = r#"export function App({ save, cancel }) {
    return (
        <div>
            <button data-testid="app-save-button" onClick={save}>Save</button>
            <button onClick={cancel}>Cancel</button>
        </div>
    );
}
"#;
        let module = module_at(temp_dir.path(), "src/App.tsx", source);
        let audit = audit(&module);
        assert_eq!(audit.missing().count(), 1);
        let generic = SelectorRules::default().generic_values;
        let mut session = PatchSession::new(&module, &audit, "data-testid", &generic, PatchOptions::default());

        let proposal = session.next_pending().unwrap();
        let err = session
            .resolve(proposal.index, Decision::Modify("app-save-button".to_string()))
            .unwrap_err();
        assert!(matches!(err, EfError::InvalidSelector { ref value, .. } if value == "app-save-button"));
        assert_eq!(session.pending(), 1);

        session
            .resolve(proposal.index, Decision::Modify("app-discard-button".to_string()))
            .unwrap();
        let patch = session.finish().unwrap();
        assert!(patch.new_text.contains(r#"data-testid="app-discard-button""#));
    }

    #[test]
    fn test_commit_detects_concurrent_change() {
        let temp_dir = TempDir::new().unwrap();
        let source = "export const Save = () => <button>Save</button>;\n";
        let module = module_at(temp_dir.path(), "src/Save.tsx", source);
        let patch = plan_patch(&module, &audit(&module), PatchOptions::default()).unwrap();
        assert!(!patch.is_noop());

        std::fs::write(&module.path, "export const Save = () => null;\n").unwrap();
        let err = patch.commit().unwrap_err();
        assert!(matches!(err, EfError::WriteConflict { .. }));
        assert_eq!(
            std::fs::read_to_string(&module.path).unwrap(),
            "export const Save = () => null;\n"
        );
    }

    #[test]
    fn test_rename_mode_rewrites_violations_only_on_request() {
        let temp_dir = TempDir::new().unwrap();
        let source = "export function Search() {\n    return <input name=\"query\" data-cy=\"searchBox\" />;\n}\n";
        let module = module_at(temp_dir.path(), "src/Search.tsx", source);
        let audit = audit(&module);
        assert_eq!(audit.violations.len(), 1);

        assert_eq!(patch_source(source, &audit, PatchOptions::default()).unwrap(), source);
        let renamed = patch_source(source, &audit, PatchOptions { rename_invalid: true }).unwrap();
        assert!(renamed.contains(r#"data-cy="search-query-input""#));
    }

    #[test]
    fn test_unified_diff() {
        let original = "line 1\nline 2\n<button>Go</button>\nline 4\n";
        let edits = vec![TextEdit::insert(21, " data-testid=\"app-go-button\"")];
        let diff = unified_diff("src/App.tsx", original, &edits).unwrap();
        assert_eq!(
            diff,
            "--- a/src/App.tsx\n+++ b/src/App.tsx\n@@ -1,4 +1,4 @@\n line 1\n line 2\n-<button>Go</button>\n+<button data-testid=\"app-go-button\">Go</button>\n line 4\n"
        );
    }
}

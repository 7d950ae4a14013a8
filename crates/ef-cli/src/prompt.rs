//! Terminal confirmation of selector proposals.

use anyhow::Result;
use colored::Colorize;
use ef_core::EfError;
use ef_typescript::{Decision, PatchSession};
use std::io::{BufRead, Write};

/// How an interactive session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptOutcome {
    /// Every proposal has a decision
    Completed,
    /// Input ended or the user quit; the file must stay untouched
    Abandoned,
}

/// Asks for a decision on every pending proposal of `session`.
///
/// Answers: `a` accept, `s` skip, `m <value>` use another value, `A` accept
/// the rest of the file, `S` skip the rest, `q` leave the file unchanged.
pub fn confirm_session<R: BufRead, W: Write>(
    file: &str,
    session: &mut PatchSession,
    input: &mut R,
    output: &mut W,
) -> Result<PromptOutcome> {
    writeln!(
        output,
        "{} {} ({} proposal(s))",
        "==>".blue().bold(),
        file.bold(),
        session.len()
    )?;

    while let Some(proposal) = session.next_pending() {
        match &proposal.current {
            Some(current) => writeln!(
                output,
                "  {} <{}> rename {} -> {}",
                proposal.location.to_string().dimmed(),
                proposal.element,
                current.red(),
                proposal.suggested.green()
            )?,
            None => writeln!(
                output,
                "  {} <{}> add {}",
                proposal.location.to_string().dimmed(),
                proposal.element,
                proposal.suggested.green()
            )?,
        }
        write!(output, "  [a]ccept [s]kip [m <value>] [A]ll [S]kip rest [q]uit > ")?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            writeln!(output)?;
            return Ok(PromptOutcome::Abandoned);
        }
        let answer = line.trim();
        let decision = match answer {
            "" | "a" | "y" => Decision::Accept,
            "s" | "n" => Decision::Skip,
            "A" => {
                resolve_rest(session, Decision::Accept)?;
                break;
            }
            "S" => {
                resolve_rest(session, Decision::Skip)?;
                break;
            }
            "q" => return Ok(PromptOutcome::Abandoned),
            other => match other.strip_prefix("m ") {
                Some(value) => Decision::Modify(value.trim().to_string()),
                None => {
                    writeln!(output, "  {}", "unknown answer".yellow())?;
                    continue;
                }
            },
        };

        match session.resolve(proposal.index, decision) {
            Ok(()) => {}
            Err(EfError::InvalidSelector { value, reason }) => {
                writeln!(output, "  {} '{}': {}", "rejected".red(), value, reason)?;
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(PromptOutcome::Completed)
}

fn resolve_rest(session: &mut PatchSession, decision: Decision) -> Result<()> {
    while let Some(proposal) = session.next_pending() {
        session.resolve(proposal.index, decision.clone())?;
    }
    Ok(())
}

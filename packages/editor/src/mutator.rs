//! # Paragraph Mutator
//!
//! Commits a [`ChangeSet`] to a paragraph's run list.
//!
//! ## Semantics
//!
//! - Runs are split at the deletion and insertion boundaries
//! - Live runs inside the deletion are re-tagged, their text retained
//! - Runs already deleted are left as they are
//! - The author's own pending insertions inside the deletion are dropped
//! - The insertion run goes right after the deletion
//! - Neighbouring text runs with identical format and revision are merged
//!
//! The mutation is atomic: it is built on a copy of the runs and swapped in
//! only when every step succeeded.

use crate::recorder::{ChangeSet, Deletion};
use redline_docx::{Paragraph, Run};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MutationError {
    #[error("Span {start}..{end} out of bounds for text of length {len}")]
    SpanOutOfBounds { start: usize, end: usize, len: usize },

    #[error("Offset {0} is not on a character boundary")]
    NotCharBoundary(usize),

    #[error("Cannot delete text inserted by {author}")]
    ForeignInsertion { author: String },
}

/// Apply `changes` to `paragraph`, leaving it untouched on error
pub fn apply(paragraph: &mut Paragraph, changes: &ChangeSet) -> Result<(), MutationError> {
    let text = paragraph.text();
    validate(&text, changes)?;

    let mut runs = paragraph.runs().to_vec();
    if let Some(deletion) = &changes.deletion {
        split_at(&mut runs, deletion.range.start);
        split_at(&mut runs, deletion.range.end);
    }
    if let Some(insertion) = &changes.insertion {
        split_at(&mut runs, insertion.offset);
    }

    let mut placed: Vec<(usize, Run)> = Vec::with_capacity(runs.len() + 1);
    let mut start = 0;
    for run in runs {
        let end = start + run.len();
        let run_start = start;
        start = end;

        match &changes.deletion {
            Some(deletion) if !run.is_empty() && run_start >= deletion.range.start && end <= deletion.range.end => {
                if let Some(run) = delete_run(run, deletion)? {
                    placed.push((run_start, run));
                }
            }
            _ => placed.push((run_start, run)),
        }
    }

    if let Some(insertion) = &changes.insertion {
        let at = placed
            .iter()
            .position(|(start, run)| !run.is_empty() && *start >= insertion.offset)
            .unwrap_or(placed.len());
        let run = Run::text(
            insertion.text.clone(),
            insertion.format.clone(),
            Some(insertion.revision.clone()),
        );
        placed.insert(at, (insertion.offset, run));
    }

    let runs = merge_adjacent(placed.into_iter().map(|(_, run)| run).collect());
    paragraph.replace_runs(runs);
    Ok(())
}

fn validate(text: &str, changes: &ChangeSet) -> Result<(), MutationError> {
    let check = |offset: usize| {
        if text.is_char_boundary(offset) {
            Ok(())
        } else {
            Err(MutationError::NotCharBoundary(offset))
        }
    };

    if let Some(deletion) = &changes.deletion {
        let range = &deletion.range;
        if range.start > range.end || range.end > text.len() {
            return Err(MutationError::SpanOutOfBounds {
                start: range.start,
                end: range.end,
                len: text.len(),
            });
        }
        check(range.start)?;
        check(range.end)?;
    }

    if let Some(insertion) = &changes.insertion {
        if insertion.offset > text.len() {
            return Err(MutationError::SpanOutOfBounds {
                start: insertion.offset,
                end: insertion.offset,
                len: text.len(),
            });
        }
        check(insertion.offset)?;
    }

    Ok(())
}

/// What happens to one run lying inside the deletion
fn delete_run(mut run: Run, deletion: &Deletion) -> Result<Option<Run>, MutationError> {
    if run.is_deleted() {
        return Ok(Some(run));
    }

    if let Some(revision) = run.revision.as_ref().filter(|r| r.is_insertion()) {
        if revision.author != deletion.revision.author {
            return Err(MutationError::ForeignInsertion {
                author: revision.author.clone(),
            });
        }
        return Ok(None);
    }

    run.revision = Some(deletion.revision.clone());
    Ok(Some(run))
}

/// Split the text run strictly containing `offset` into two runs
fn split_at(runs: &mut Vec<Run>, offset: usize) {
    let mut start = 0;
    for index in 0..runs.len() {
        let end = start + runs[index].len();
        if runs[index].is_text() && start < offset && offset < end {
            let tail_text = runs[index].text.split_off(offset - start);
            let tail = Run::text(tail_text, runs[index].format.clone(), runs[index].revision.clone());
            runs.insert(index + 1, tail);
            return;
        }
        start = end;
    }
}

fn merge_adjacent(runs: Vec<Run>) -> Vec<Run> {
    let mut merged: Vec<Run> = Vec::with_capacity(runs.len());
    for run in runs {
        if let Some(last) = merged.last_mut() {
            if last.is_text() && run.is_text() && last.format == run.format && last.revision == run.revision {
                last.text.push_str(&run.text);
                continue;
            }
        }
        merged.push(run);
    }
    merged
}

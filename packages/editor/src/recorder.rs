//! # Change Recorder
//!
//! Turns a located span and its replacement into a tracked change set:
//! an optional deletion range and an optional insertion, each with its own
//! attributed revision. Nothing is mutated here apart from the id allocator.
//!
//! ```text
//! "may use" → "may not use"
//!    narrowing keeps "may " and "use"
//!    ChangeSet { deletion: None, insertion: "not " at 4 }
//! ```

use crate::config::RecorderConfig;
use chrono::{DateTime, Utc};
use redline_docx::{Paragraph, Revision, RevisionIds, RevisionKind, Run, RunFormat};
use serde::{Deserialize, Serialize};
use std::ops::Range;
use thiserror::Error;
use tracing::debug;

/// Who made the changes of one batch, and when
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribution {
    pub author: String,
    pub date: Option<String>,
}

impl Attribution {
    pub fn new(author: impl Into<String>, date: DateTime<Utc>) -> Self {
        Self {
            author: author.into(),
            date: Some(date.format("%Y-%m-%dT%H:%M:%SZ").to_string()),
        }
    }

    pub fn now(author: impl Into<String>) -> Self {
        Self::new(author, Utc::now())
    }

    /// Attribution without a timestamp
    pub fn undated(author: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            date: None,
        }
    }

    fn revision(&self, kind: RevisionKind, ids: &mut RevisionIds) -> Revision {
        Revision::new(kind, ids.next_id(), self.author.clone(), self.date.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deletion {
    /// Byte range in the paragraph's visible text
    pub range: Range<usize>,
    pub revision: Revision,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Insertion {
    /// Byte offset in the paragraph's visible text
    pub offset: usize,
    pub text: String,
    pub revision: Revision,
    pub format: RunFormat,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub deletion: Option<Deletion>,
    pub insertion: Option<Insertion>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.deletion.is_none() && self.insertion.is_none()
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChangeConflict {
    #[error("span overlaps a pending insertion by {author} (revision {id})")]
    ForeignInsertion { author: String, id: String },

    #[error("span is already deleted")]
    AlreadyDeleted,

    #[error("replacement text is identical to the located text")]
    NoOp,

    #[error("span {start}..{end} is outside the paragraph text (length {len})")]
    OutOfBounds { start: usize, end: usize, len: usize },
}

#[derive(Debug, Clone, Default)]
pub struct ChangeRecorder {
    config: RecorderConfig,
}

impl ChangeRecorder {
    pub fn new(config: RecorderConfig) -> Self {
        Self { config }
    }

    /// Build the change set replacing `span` of `paragraph` with `new_text`
    pub fn record(
        &self,
        paragraph: &Paragraph,
        span: Range<usize>,
        new_text: &str,
        attribution: &Attribution,
        ids: &mut RevisionIds,
    ) -> Result<ChangeSet, ChangeConflict> {
        let text = paragraph.text();
        if span.start > span.end
            || span.end > text.len()
            || !text.is_char_boundary(span.start)
            || !text.is_char_boundary(span.end)
        {
            return Err(ChangeConflict::OutOfBounds {
                start: span.start,
                end: span.end,
                len: text.len(),
            });
        }

        let old_text = &text[span.clone()];
        let (deleted, inserted) = if self.config.word_level_narrowing {
            let (old_cut, new_cut) = narrow(old_text, new_text);
            (span.start + old_cut.start..span.start + old_cut.end, &new_text[new_cut])
        } else if old_text == new_text {
            (span.start..span.start, "")
        } else {
            (span.clone(), new_text)
        };

        if deleted.is_empty() && inserted.is_empty() {
            return Err(ChangeConflict::NoOp);
        }

        if !deleted.is_empty() {
            check_deletable(paragraph, &deleted, &attribution.author)?;
        }

        let placement = if inserted.is_empty() {
            None
        } else {
            Some(insertion_point(paragraph, deleted.end, &attribution.author)?)
        };

        let format = if deleted.is_empty() {
            format_before(paragraph, deleted.start)
        } else {
            format_within(paragraph, &deleted).unwrap_or_else(|| format_before(paragraph, deleted.start))
        };

        debug!(
            deleted = ?deleted,
            inserted = inserted.len(),
            "Recorded change"
        );

        let deletion = (!deleted.is_empty()).then(|| Deletion {
            range: deleted.clone(),
            revision: attribution.revision(RevisionKind::Deletion, ids),
        });
        let insertion = placement.map(|placement| {
            let (revision, format) = match placement.extends {
                Some(run) => (run.revision.clone(), run.format.clone()),
                None => (None, format),
            };
            Insertion {
                offset: placement.offset,
                text: inserted.to_string(),
                revision: revision.unwrap_or_else(|| attribution.revision(RevisionKind::Insertion, ids)),
                format,
            }
        });

        Ok(ChangeSet { deletion, insertion })
    }
}

/// Byte ranges of `old` and `new` that differ, trimmed to whole words
fn narrow(old: &str, new: &str) -> (Range<usize>, Range<usize>) {
    let o: Vec<char> = old.chars().collect();
    let n: Vec<char> = new.chars().collect();

    let mut prefix = o.iter().zip(&n).take_while(|(a, b)| a == b).count();
    while prefix > 0 && !(is_boundary(&o, prefix) && is_boundary(&n, prefix)) {
        prefix -= 1;
    }

    let max_suffix = (o.len() - prefix).min(n.len() - prefix);
    let mut suffix = o
        .iter()
        .rev()
        .zip(n.iter().rev())
        .take(max_suffix)
        .take_while(|(a, b)| a == b)
        .count();
    while suffix > 0 && !(is_boundary(&o, o.len() - suffix) && is_boundary(&n, n.len() - suffix)) {
        suffix -= 1;
    }

    (
        byte_offset(old, prefix)..byte_offset(old, o.len() - suffix),
        byte_offset(new, prefix)..byte_offset(new, n.len() - suffix),
    )
}

/// A cut at `index` does not split a word
fn is_boundary(chars: &[char], index: usize) -> bool {
    index == 0 || index == chars.len() || chars[index - 1].is_whitespace() || chars[index].is_whitespace()
}

fn byte_offset(s: &str, chars: usize) -> usize {
    s.char_indices().nth(chars).map(|(i, _)| i).unwrap_or(s.len())
}

/// Text-bearing runs overlapping `range`
fn overlapping<'p>(paragraph: &'p Paragraph, range: &Range<usize>) -> impl Iterator<Item = &'p Run> + 'p {
    let range = range.clone();
    paragraph
        .runs()
        .iter()
        .zip(paragraph.run_offsets())
        .filter(move |(run, start)| !run.is_empty() && *start < range.end && start + run.len() > range.start)
        .map(|(run, _)| run)
}

fn check_deletable(paragraph: &Paragraph, range: &Range<usize>, author: &str) -> Result<(), ChangeConflict> {
    let mut live = false;
    for run in overlapping(paragraph, range) {
        match &run.revision {
            Some(revision) if revision.is_insertion() && revision.author != author => {
                return Err(ChangeConflict::ForeignInsertion {
                    author: revision.author.clone(),
                    id: revision.id.clone(),
                });
            }
            Some(revision) if revision.is_deletion() => {}
            _ => live = true,
        }
    }

    if live {
        Ok(())
    } else {
        Err(ChangeConflict::AlreadyDeleted)
    }
}

/// Where an insertion lands, and the pending insertion it extends
struct Placement<'p> {
    offset: usize,
    extends: Option<&'p Run>,
}

/// Keep an insertion at `offset` from splitting another revision's run.
///
/// Inside a deleted run it moves past the run; inside the author's own
/// pending insertion it joins that insertion; inside anyone else's it is a
/// conflict.
fn insertion_point<'p>(paragraph: &'p Paragraph, offset: usize, author: &str) -> Result<Placement<'p>, ChangeConflict> {
    let inside = paragraph
        .runs()
        .iter()
        .zip(paragraph.run_offsets())
        .find(|(run, start)| *start < offset && offset < start + run.len());

    let Some((run, start)) = inside else {
        return Ok(Placement { offset, extends: None });
    };

    match &run.revision {
        Some(revision) if revision.is_deletion() => Ok(Placement {
            offset: start + run.len(),
            extends: None,
        }),
        Some(revision) if revision.author != author => Err(ChangeConflict::ForeignInsertion {
            author: revision.author.clone(),
            id: revision.id.clone(),
        }),
        Some(_) => Ok(Placement { offset, extends: Some(run) }),
        None => Ok(Placement { offset, extends: None }),
    }
}

/// Format of the first live text-bearing run in `range`
fn format_within(paragraph: &Paragraph, range: &Range<usize>) -> Option<RunFormat> {
    overlapping(paragraph, range)
        .find(|run| !run.is_opaque() && !run.is_deleted())
        .map(|run| run.format.clone())
}

/// Format of the text-bearing run ending at or containing `offset`, else
/// the first text-bearing run of the paragraph
fn format_before(paragraph: &Paragraph, offset: usize) -> RunFormat {
    let runs = paragraph.runs();
    let offsets = paragraph.run_offsets();

    runs.iter()
        .zip(&offsets)
        .filter(|(run, start)| !run.is_opaque() && !run.is_empty() && **start < offset)
        .last()
        .or_else(|| runs.iter().zip(&offsets).find(|(run, _)| !run.is_opaque() && !run.is_empty()))
        .map(|(run, _)| run.format.clone())
        .unwrap_or_default()
}

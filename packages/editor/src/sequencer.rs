//! # Edit Sequencer
//!
//! Applies an ordered batch of proposals to one document.
//!
//! ```text
//! for each proposal, in order:
//!   locate in every paragraph of the TextView
//!   (visible text first, accepted text when nothing matched verbatim)
//!        ↓
//!   resolve one paragraph (or report NotFound / Ambiguous)
//!        ↓
//!   record → mutate → refresh the TextView entry
//! ```
//!
//! Later proposals are always located against the text as it stands after
//! the earlier ones, so an edit can never land on a stale offset. A failing
//! proposal is reported and the batch moves on.

use crate::config::{ConfigError, EditorConfig};
use crate::locator::{Confidence, LocateFailure, LocatedSpan, TextLocator, TextMatch};
use crate::mutator;
use crate::outcome::{EditOutcome, EditStatus};
use crate::proposal::EditProposal;
use crate::recorder::{Attribution, ChangeRecorder};
use redline_docx::{Document, Paragraph};
use std::ops::Range;
use tracing::{debug, info, instrument, warn};

/// One paragraph's text as the locator sees it
#[derive(Debug, Clone, Default)]
struct ParagraphText {
    visible: String,

    /// Visible text with deleted runs left out
    accepted: String,

    /// Visible byte offset of every accepted byte
    origin: Vec<usize>,
}

impl ParagraphText {
    fn new(paragraph: &Paragraph) -> Self {
        let mut text = Self::default();
        for run in paragraph.runs() {
            if !run.is_deleted() {
                text.accepted.push_str(&run.text);
                text.origin.extend(text.visible.len()..text.visible.len() + run.len());
            }
            text.visible.push_str(&run.text);
        }
        text
    }

    fn has_deletions(&self) -> bool {
        self.accepted.len() != self.visible.len()
    }

    /// Visible span covering a non-empty span of the accepted text
    fn visible_range(&self, accepted: Range<usize>) -> Option<Range<usize>> {
        let start = *self.origin.get(accepted.start)?;
        let last = *self.origin.get(accepted.end.checked_sub(1)?)?;
        (accepted.start < accepted.end).then(|| start..last + 1)
    }
}

/// Which text of each paragraph a pass searches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Projection {
    Visible,
    Accepted,
}

/// Snapshot of every paragraph's text for one batch
#[derive(Debug, Clone, Default)]
pub struct TextView {
    paragraphs: Vec<ParagraphText>,
}

impl TextView {
    pub fn snapshot(document: &Document) -> Self {
        Self {
            paragraphs: document.paragraphs().iter().map(ParagraphText::new).collect(),
        }
    }

    /// Re-read one paragraph after it was mutated
    pub fn refresh(&mut self, document: &Document, index: usize) {
        if let (Some(slot), Some(paragraph)) = (self.paragraphs.get_mut(index), document.paragraph(index)) {
            *slot = ParagraphText::new(paragraph);
        }
    }

    /// Visible text, deleted runs included
    pub fn get(&self, index: usize) -> Option<&str> {
        self.paragraphs.get(index).map(|p| p.visible.as_str())
    }

    /// Text as it reads once every pending change is accepted
    pub fn accepted(&self, index: usize) -> Option<&str> {
        self.paragraphs.get(index).map(|p| p.accepted.as_str())
    }

    pub fn len(&self) -> usize {
        self.paragraphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paragraphs.is_empty()
    }

    fn has_deletions(&self) -> bool {
        self.paragraphs.iter().any(ParagraphText::has_deletions)
    }
}

/// A paragraph that answered a location request
#[derive(Debug, Clone)]
struct Candidate {
    paragraph: usize,

    /// `None` when the paragraph itself was ambiguous
    found: Option<TextMatch>,

    /// Found by a verbatim strategy (or ambiguous between verbatim hits)
    verbatim: bool,

    /// Context score for verbatim candidates, match score for fuzzy ones
    rank: f64,

    occurrences: usize,
}

/// Why a proposal could not be placed
struct Unresolved {
    status: EditStatus,
    paragraph: Option<usize>,
    detail: String,
}

pub struct EditSequencer {
    attribution: Attribution,
    config: EditorConfig,
    locator: TextLocator,
    recorder: ChangeRecorder,
}

impl EditSequencer {
    pub fn new(attribution: Attribution, config: EditorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            locator: TextLocator::new(config.locator.clone()),
            recorder: ChangeRecorder::new(config.recorder.clone()),
            attribution,
            config,
        })
    }

    pub fn attribution(&self) -> &Attribution {
        &self.attribution
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Apply `proposals` in order; one outcome per proposal
    #[instrument(skip(self, document, proposals), fields(proposals = proposals.len(), paragraphs = document.len(), author = %self.attribution.author))]
    pub fn apply_all(&self, document: &mut Document, proposals: &[EditProposal]) -> Vec<EditOutcome> {
        info!("Applying edit batch");
        let mut view = TextView::snapshot(document);

        let outcomes: Vec<EditOutcome> = proposals
            .iter()
            .enumerate()
            .map(|(index, proposal)| {
                let outcome = self.apply_one(document, &mut view, index, proposal);
                match &outcome.detail {
                    Some(detail) if !outcome.status.is_applied() => {
                        warn!(edit = index, status = %outcome.status, detail = %detail, "Edit not applied")
                    }
                    _ => debug!(edit = index, paragraph = ?outcome.located_paragraph, "Edit applied"),
                }
                outcome
            })
            .collect();

        info!(
            applied = outcomes.iter().filter(|o| o.status.is_applied()).count(),
            failed = outcomes.iter().filter(|o| !o.status.is_applied()).count(),
            "Edit batch complete"
        );
        outcomes
    }

    fn apply_one(&self, document: &mut Document, view: &mut TextView, index: usize, proposal: &EditProposal) -> EditOutcome {
        if let Err(e) = proposal.validate() {
            return EditOutcome::failed(index, EditStatus::Skipped, e.to_string());
        }

        let span = match self.resolve(document, view, proposal) {
            Ok(span) => span,
            Err(unresolved) => {
                let outcome = EditOutcome::failed(index, unresolved.status, unresolved.detail);
                return match unresolved.paragraph {
                    Some(paragraph) => outcome.at_paragraph(paragraph),
                    None => outcome,
                };
            }
        };

        let skipped = |detail: String| EditOutcome::failed(index, EditStatus::Skipped, detail).at_paragraph(span.paragraph_index);

        let (paragraph, ids) = match document.paragraph_with_ids_mut(span.paragraph_index) {
            Ok(found) => found,
            Err(e) => return skipped(e.to_string()),
        };

        // Ids are only consumed when the mutation succeeds
        let mut trial_ids = *ids;
        let changes = match self
            .recorder
            .record(paragraph, span.range(), &proposal.new_text, &self.attribution, &mut trial_ids)
        {
            Ok(changes) => changes,
            Err(conflict) => return skipped(format!("change conflict: {}", conflict)),
        };

        if let Err(e) = mutator::apply(paragraph, &changes) {
            return skipped(format!("mutation failed: {}", e));
        }
        *ids = trial_ids;
        view.refresh(document, span.paragraph_index);

        EditOutcome {
            edit_index: index,
            status: EditStatus::Applied,
            located_paragraph: Some(span.paragraph_index),
            applied_score: Some(span.match_score),
            confidence: Some(span.confidence),
            detail: None,
        }
    }

    /// Every paragraph answering the proposal in one projection, and whether
    /// the context was seen anywhere
    fn candidates(&self, view: &TextView, proposal: &EditProposal, projection: Projection) -> (Vec<Candidate>, bool) {
        let mut candidates = Vec::new();
        let mut context_seen = false;

        for (paragraph, text) in view.paragraphs.iter().enumerate() {
            let haystack = match projection {
                Projection::Visible => &text.visible,
                // Paragraphs without deletions were already searched as is
                Projection::Accepted if text.has_deletions() => &text.accepted,
                Projection::Accepted => continue,
            };
            if haystack.is_empty() {
                continue;
            }

            match self.locator.locate(haystack, proposal) {
                Ok(mut found) => {
                    if projection == Projection::Accepted {
                        let Some(range) = text.visible_range(found.range()) else {
                            continue;
                        };
                        found.offset = range.start;
                        found.len = range.len();
                    }
                    candidates.push(Candidate {
                        paragraph,
                        verbatim: found.confidence != Confidence::Fuzzy,
                        rank: match found.confidence {
                            Confidence::Fuzzy => found.match_score,
                            _ => found.context_score,
                        },
                        occurrences: 1,
                        found: Some(found),
                    })
                }
                Err(LocateFailure::Ambiguous {
                    occurrences,
                    best_context_score,
                }) => candidates.push(Candidate {
                    paragraph,
                    found: None,
                    verbatim: true,
                    rank: best_context_score,
                    occurrences,
                }),
                Err(LocateFailure::NotFound { context_seen: seen }) => context_seen |= seen,
            }
        }

        (candidates, context_seen)
    }

    /// Pick the one paragraph span the proposal refers to
    fn resolve(&self, document: &Document, view: &TextView, proposal: &EditProposal) -> Result<LocatedSpan, Unresolved> {
        let (mut candidates, mut context_seen) = self.candidates(view, proposal, Projection::Visible);

        // Wording produced by earlier edits only reads verbatim once this
        // batch's deletions are skipped
        if !candidates.iter().any(|c| c.verbatim) && view.has_deletions() {
            let (accepted, seen) = self.candidates(view, proposal, Projection::Accepted);
            context_seen |= seen;
            if candidates.is_empty() || accepted.iter().any(|c| c.verbatim) {
                debug!(candidates = accepted.len(), "Located against accepted text");
                candidates = accepted;
            }
        }

        // Verbatim evidence outranks any fuzzy window
        if candidates.iter().any(|c| c.verbatim) {
            candidates.retain(|c| c.verbatim);
        }
        candidates.sort_by(|a, b| b.rank.total_cmp(&a.rank));
        debug!(candidates = candidates.len(), "Resolved location candidates");

        let best = match candidates.as_slice() {
            [] => {
                let status = if proposal.context().is_some() && !context_seen {
                    EditStatus::ContextNotFound
                } else {
                    EditStatus::SpecificTextNotFound
                };
                return Err(Unresolved {
                    status,
                    paragraph: None,
                    detail: format!("'{}' not found in any paragraph", proposal.specific_old_text.trim()),
                });
            }
            [only] => only,
            [best, runner_up, ..] => {
                let clear = best.found.is_some()
                    && (!best.verbatim || best.rank >= self.config.locator.min_context_similarity)
                    && best.rank - runner_up.rank >= self.config.locator.ambiguity_margin;
                if !clear {
                    return Err(Unresolved {
                        status: EditStatus::AmbiguousMatch,
                        paragraph: None,
                        detail: format!("matches in {} paragraphs and none stands out", candidates.len()),
                    });
                }
                best
            }
        };

        let Some(found) = &best.found else {
            return Err(Unresolved {
                status: EditStatus::AmbiguousMatch,
                paragraph: Some(best.paragraph),
                detail: format!("{} occurrences and the context does not single one out", best.occurrences),
            });
        };

        let run_index = document
            .paragraph(best.paragraph)
            .and_then(|p| p.run_at(found.offset))
            .unwrap_or(0);

        Ok(LocatedSpan {
            paragraph_index: best.paragraph,
            run_index,
            char_offset: found.offset,
            length: found.len,
            confidence: found.confidence,
            match_score: found.match_score,
            context_score: found.context_score,
        })
    }
}

/// Apply `proposals` to `document` with a one-off sequencer
pub fn apply_all(
    document: &mut Document,
    proposals: &[EditProposal],
    attribution: Attribution,
    config: EditorConfig,
) -> Result<Vec<EditOutcome>, ConfigError> {
    Ok(EditSequencer::new(attribution, config)?.apply_all(document, proposals))
}

#[cfg(test)]
mod tests {
    use super::*;
    use redline_docx::fixtures::docx_from_paragraphs;

    fn sequencer() -> EditSequencer {
        EditSequencer::new(Attribution::undated("Reviewer"), EditorConfig::default()).unwrap()
    }

    fn load(paragraphs: &[&str]) -> Document {
        Document::load(docx_from_paragraphs(paragraphs)).unwrap()
    }

    #[test]
    fn test_text_view_refresh() {
        let mut doc = load(&["one", "two"]);
        let mut view = TextView::snapshot(&doc);
        assert_eq!(view.get(1), Some("two"));

        let outcomes = sequencer().apply_all(&mut doc, &[EditProposal::new("two", "three")]);
        assert!(outcomes[0].status.is_applied());

        view.refresh(&doc, 1);
        assert_eq!(view.get(1), Some("twothree"));
        assert_eq!(view.accepted(1), Some("three"));
        assert_eq!(view.get(7), None);
    }

    #[test]
    fn test_accepted_span_maps_over_deleted_runs() {
        let mut doc = load(&["due net 30 days"]);
        sequencer().apply_all(&mut doc, &[EditProposal::new("net 30", "net 45")]);

        let text = ParagraphText::new(doc.paragraph(0).unwrap());
        assert_eq!(text.visible, "due net 3045 days");
        assert_eq!(text.accepted, "due net 45 days");
        assert_eq!(text.visible_range(4..15), Some(4..17));
        assert_eq!(text.visible_range(8..10), Some(10..12));
        assert_eq!(text.visible_range(3..3), None);
    }

    #[test]
    fn test_later_edit_can_target_earlier_wording() {
        let mut doc = load(&["Payment is due net 30 days after invoice."]);
        let outcomes = sequencer().apply_all(
            &mut doc,
            &[
                EditProposal::new("net 30", "net 45"),
                EditProposal::new("net 45 days", "net 60 days"),
            ],
        );

        assert_eq!(outcomes[0].status, EditStatus::Applied);
        assert_eq!(outcomes[1].status, EditStatus::Applied);
        assert_eq!(outcomes[1].confidence, Some(Confidence::Exact));

        let paragraph = doc.paragraph(0).unwrap();
        assert_eq!(paragraph.accepted_text(), "Payment is due net 60 days after invoice.");
        assert_eq!(paragraph.rejected_text(), "Payment is due net 30 days after invoice.");
    }

    #[test]
    fn test_unique_paragraph_is_resolved() {
        let mut doc = load(&["Definitions.", "The Term is one year."]);
        let outcomes = sequencer().apply_all(&mut doc, &[EditProposal::new("one year", "two years")]);

        assert_eq!(outcomes[0].status, EditStatus::Applied);
        assert_eq!(outcomes[0].located_paragraph, Some(1));
        assert_eq!(outcomes[0].confidence, Some(Confidence::Exact));
        assert_eq!(doc.paragraph(1).unwrap().accepted_text(), "The Term is two years.");
    }

    #[test]
    fn test_same_text_in_two_paragraphs_without_context_is_ambiguous() {
        let mut doc = load(&["Fees are payable monthly.", "Fees are payable monthly."]);
        let outcomes = sequencer().apply_all(&mut doc, &[EditProposal::new("monthly", "quarterly")]);

        assert_eq!(outcomes[0].status, EditStatus::AmbiguousMatch);
        assert!(!doc.is_dirty());
    }

    #[test]
    fn test_context_picks_paragraph() {
        let mut doc = load(&[
            "The Buyer shall pay within thirty days.",
            "The Seller shall deliver within thirty days.",
        ]);
        let proposal = EditProposal::new("thirty days", "ten days").with_context("The Seller shall deliver within thirty days.");
        let outcomes = sequencer().apply_all(&mut doc, &[proposal]);

        assert_eq!(outcomes[0].status, EditStatus::Applied);
        assert_eq!(outcomes[0].located_paragraph, Some(1));
        assert_eq!(doc.paragraph(0).unwrap().accepted_text(), "The Buyer shall pay within thirty days.");
    }

    #[test]
    fn test_missing_context_vs_missing_text() {
        let mut doc = load(&["Governing law: Delaware."]);
        let proposals = vec![
            EditProposal::new("New York", "Texas").with_context("laws of New York apply"),
            EditProposal::new("New York", "Texas").with_context("Governing law"),
            EditProposal::new("New York", "Texas"),
        ];

        let outcomes = sequencer().apply_all(&mut doc, &proposals);
        assert_eq!(outcomes[0].status, EditStatus::ContextNotFound);
        assert_eq!(outcomes[1].status, EditStatus::SpecificTextNotFound);
        assert_eq!(outcomes[2].status, EditStatus::SpecificTextNotFound);
    }

    #[test]
    fn test_invalid_proposal_is_skipped() {
        let mut doc = load(&["Text."]);
        let outcomes = sequencer().apply_all(&mut doc, &[EditProposal::new("", "x")]);

        assert_eq!(outcomes[0].status, EditStatus::Skipped);
        assert!(outcomes[0].detail.as_deref().unwrap_or("").contains("specific_old_text"));
    }

    #[test]
    fn test_noop_is_skipped_and_ids_not_consumed() {
        let mut doc = load(&["Keep this."]);
        let before = doc.revision_ids();
        let outcomes = sequencer().apply_all(&mut doc, &[EditProposal::new("Keep", "Keep")]);

        assert_eq!(outcomes[0].status, EditStatus::Skipped);
        assert_eq!(doc.revision_ids(), before);
        assert!(!doc.is_dirty());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = EditorConfig::default();
        config.locator.fuzzy_threshold = -0.1;
        assert!(EditSequencer::new(Attribution::undated("A"), config).is_err());
    }
}

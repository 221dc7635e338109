//! # Text Locator
//!
//! Finds where a proposal's old text lives inside one paragraph's current
//! text. Strategies run in a fixed order and the first one with an answer
//! wins:
//!
//! ```text
//! exact contextual → unique specific → disambiguation → fuzzy
//!   (context hit)      (one match)      (≥2 matches)     (no match)
//! ```
//!
//! All comparison happens on normalized text; returned offsets address the
//! original paragraph text.

use crate::config::LocatorConfig;
use crate::normalize::{find_all, NormalizedText};
use crate::proposal::EditProposal;
use crate::similarity::{context_score, similarity_ignore_case};
use serde::{Deserialize, Serialize};
use std::ops::Range;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    /// Verbatim and unique
    Exact,

    /// Verbatim, picked among several occurrences by its surroundings
    ContextMatched,

    /// Similar but not verbatim
    Fuzzy,
}

/// A located span inside one paragraph's text
#[derive(Debug, Clone, PartialEq)]
pub struct TextMatch {
    /// Byte offset into the paragraph text
    pub offset: usize,

    /// Byte length
    pub len: usize,

    pub confidence: Confidence,
    pub match_score: f64,
    pub context_score: f64,
    pub strategy: &'static str,
}

impl TextMatch {
    pub fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.len
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LocateFailure {
    /// Nothing matched; records whether the context occurs in the text
    NotFound { context_seen: bool },

    /// Several verbatim occurrences and nothing singles one out
    Ambiguous {
        occurrences: usize,
        best_context_score: f64,
    },
}

/// Document-level location of an edit target
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocatedSpan {
    pub paragraph_index: usize,
    pub run_index: usize,
    pub char_offset: usize,
    pub length: usize,
    pub confidence: Confidence,
    pub match_score: f64,
    pub context_score: f64,
}

impl LocatedSpan {
    pub fn range(&self) -> Range<usize> {
        self.char_offset..self.char_offset + self.length
    }
}

pub type Location = Result<TextMatch, LocateFailure>;
type Strategy = fn(&SearchContext) -> Option<Location>;

const STRATEGIES: [(&str, Strategy); 4] = [
    ("exact_contextual", exact_contextual),
    ("unique_specific", unique_specific),
    ("disambiguation", disambiguation),
    ("fuzzy", fuzzy),
];

/// Everything one search needs, computed once per paragraph
struct SearchContext<'a> {
    text: NormalizedText,
    specific: NormalizedText,
    context: Option<NormalizedText>,

    /// Where the specific text sits inside the context
    anchor: Option<usize>,

    /// Verbatim occurrences of the specific text
    occurrences: Vec<usize>,

    config: &'a LocatorConfig,
}

impl<'a> SearchContext<'a> {
    fn new(text: &str, proposal: &EditProposal, config: &'a LocatorConfig) -> Self {
        let text = NormalizedText::new(text);
        let specific = NormalizedText::query(&proposal.specific_old_text);
        let context = proposal
            .context()
            .map(NormalizedText::query)
            .filter(|c| !c.is_empty());
        let anchor = context
            .as_ref()
            .and_then(|c| find_all(c.chars(), specific.chars()).first().copied());
        let occurrences = find_all(text.chars(), specific.chars());

        Self {
            text,
            specific,
            context,
            anchor,
            occurrences,
            config,
        }
    }

    fn context_seen(&self) -> bool {
        self.context
            .as_ref()
            .map(|c| !find_all(self.text.chars(), c.chars()).is_empty())
            .unwrap_or(false)
    }

    fn context_score_at(&self, start: usize) -> f64 {
        match &self.context {
            Some(context) => context_score(&self.text, start, self.specific.len(), context, self.anchor),
            None => 0.0,
        }
    }

    fn to_match(&self, start: usize, len: usize, confidence: Confidence, match_score: f64, context_score: f64) -> TextMatch {
        let range = self.text.source_range(start, start + len);
        TextMatch {
            offset: range.start,
            len: range.end - range.start,
            confidence,
            match_score,
            context_score,
            strategy: "",
        }
    }
}

/// Locator configured with thresholds
#[derive(Debug, Clone, Default)]
pub struct TextLocator {
    config: LocatorConfig,
}

impl TextLocator {
    pub fn new(config: LocatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LocatorConfig {
        &self.config
    }

    /// Locate the proposal's specific text inside `text`
    pub fn locate(&self, text: &str, proposal: &EditProposal) -> Location {
        let search = SearchContext::new(text, proposal, &self.config);
        if search.specific.is_empty() {
            return Err(LocateFailure::NotFound { context_seen: false });
        }

        for (name, strategy) in STRATEGIES {
            if let Some(location) = strategy(&search) {
                debug!(strategy = name, found = location.is_ok(), "Locator strategy answered");
                return location.map(|m| TextMatch { strategy: name, ..m });
            }
        }

        Err(LocateFailure::NotFound {
            context_seen: search.context_seen(),
        })
    }
}

pub fn locate(text: &str, proposal: &EditProposal, config: &LocatorConfig) -> Location {
    TextLocator::new(config.clone()).locate(text, proposal)
}

/// Context present verbatim with the specific text at a single position in it
fn exact_contextual(search: &SearchContext) -> Option<Location> {
    let context = search.context.as_ref()?;
    let inner = find_all(context.chars(), search.specific.chars());
    if inner.is_empty() {
        return None;
    }

    let mut hits: Vec<usize> = find_all(search.text.chars(), context.chars())
        .into_iter()
        .flat_map(|start| inner.iter().map(move |offset| start + offset))
        .collect();
    hits.sort_unstable();
    hits.dedup();

    match hits.as_slice() {
        [only] => Some(Ok(search.to_match(*only, search.specific.len(), Confidence::Exact, 1.0, 1.0))),
        _ => None,
    }
}

/// Specific text occurs exactly once; stale context does not matter
fn unique_specific(search: &SearchContext) -> Option<Location> {
    match search.occurrences.as_slice() {
        [only] => {
            let score = search.context_score_at(*only);
            Some(Ok(search.to_match(*only, search.specific.len(), Confidence::Exact, 1.0, score)))
        }
        _ => None,
    }
}

/// Several occurrences: let the context pick one, or report ambiguity
fn disambiguation(search: &SearchContext) -> Option<Location> {
    if search.occurrences.len() < 2 {
        return None;
    }

    if search.context.is_none() {
        return Some(Err(LocateFailure::Ambiguous {
            occurrences: search.occurrences.len(),
            best_context_score: 0.0,
        }));
    }

    let mut scored: Vec<(usize, f64)> = search
        .occurrences
        .iter()
        .map(|&start| (start, search.context_score_at(start)))
        .collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));

    let (best_start, best) = scored[0];
    let runner_up = scored[1].1;

    if best >= search.config.min_context_similarity && best - runner_up >= search.config.ambiguity_margin {
        Some(Ok(search.to_match(best_start, search.specific.len(), Confidence::ContextMatched, 1.0, best)))
    } else {
        Some(Err(LocateFailure::Ambiguous {
            occurrences: scored.len(),
            best_context_score: best,
        }))
    }
}

/// Best similar window when nothing matches verbatim
fn fuzzy(search: &SearchContext) -> Option<Location> {
    if !search.occurrences.is_empty() {
        return None;
    }

    let windows = fuzzy_windows(&search.text, search.specific.len(), search.config.window_tolerance);
    let scores = score_windows(search.text.chars(), search.specific.chars(), &windows);

    // Windows are ordered by start then length, so strict comparison keeps
    // the earliest and then shortest window on ties
    let mut best: Option<((usize, usize), f64)> = None;
    for (window, score) in windows.into_iter().zip(scores) {
        if best.map(|(_, s)| score > s).unwrap_or(true) {
            best = Some((window, score));
        }
    }

    let ((start, len), score) = best?;
    debug!(score, threshold = search.config.fuzzy_threshold, "Best fuzzy window");

    if score >= search.config.fuzzy_threshold {
        let context = search.context_score_at(start);
        Some(Ok(search.to_match(start, len, Confidence::Fuzzy, score, context)))
    } else {
        None
    }
}

fn score_window(hay: &[char], query: &[char], (start, len): (usize, usize)) -> f64 {
    similarity_ignore_case(&hay[start..start + len], query)
}

/// Scores in window order, whichever way they are computed
#[cfg(feature = "parallel")]
fn score_windows(hay: &[char], query: &[char], windows: &[(usize, usize)]) -> Vec<f64> {
    use rayon::prelude::*;
    windows.par_iter().map(|w| score_window(hay, query, *w)).collect()
}

#[cfg(not(feature = "parallel"))]
fn score_windows(hay: &[char], query: &[char], windows: &[(usize, usize)]) -> Vec<f64> {
    windows.iter().map(|w| score_window(hay, query, *w)).collect()
}

/// Candidate `(start, len)` windows aligned to word boundaries
fn fuzzy_windows(text: &NormalizedText, query_len: usize, tolerance: f64) -> Vec<(usize, usize)> {
    let min_len = ((query_len as f64 * (1.0 - tolerance)).floor() as usize).max(1);
    let max_len = (query_len as f64 * (1.0 + tolerance)).ceil() as usize;

    let mut windows = Vec::new();
    for start in (0..text.len()).filter(|&i| text.is_word_start(i)) {
        for len in min_len..=max_len {
            let end = start + len;
            if end > text.len() {
                break;
            }
            if text.is_word_end(end) {
                windows.push((start, len));
            }
        }
    }
    windows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locator() -> TextLocator {
        TextLocator::new(LocatorConfig::default())
    }

    #[test]
    fn test_unique_exact_match() {
        let text = "The contractor may use subcontractors.";
        let proposal = EditProposal::new("may use", "may not use");

        let found = locator().locate(text, &proposal).unwrap();
        assert_eq!(&text[found.range()], "may use");
        assert_eq!(found.confidence, Confidence::Exact);
        assert_eq!(found.strategy, "unique_specific");
    }

    #[test]
    fn test_context_resolves_repeated_text() {
        let text = "The Buyer shall pay. The Seller shall deliver.";
        let proposal = EditProposal::new("shall", "must").with_context("The Seller shall deliver.");

        let found = locator().locate(text, &proposal).unwrap();
        assert_eq!(found.offset, 32);
        assert_eq!(found.confidence, Confidence::Exact);
        assert_eq!(found.strategy, "exact_contextual");
        assert_eq!(found.context_score, 1.0);
    }

    #[test]
    fn test_stale_context_still_exact() {
        let text = "Payment is due within thirty days.";
        let proposal = EditProposal::new("thirty days", "fifteen days").with_context("Payment is due in thirty days of invoice");

        let found = locator().locate(text, &proposal).unwrap();
        assert_eq!(&text[found.range()], "thirty days");
        assert_eq!(found.confidence, Confidence::Exact);
    }

    #[test]
    fn test_repeated_text_without_context_is_ambiguous() {
        let text = "Notice shall be given. Notice shall be written.";
        let proposal = EditProposal::new("Notice", "Written notice");

        let err = locator().locate(text, &proposal).unwrap_err();
        assert_eq!(
            err,
            LocateFailure::Ambiguous {
                occurrences: 2,
                best_context_score: 0.0
            }
        );
    }

    #[test]
    fn test_near_identical_context_is_ambiguous() {
        let text = "The fee is ten dollars per unit. The fee is ten dollars per item.";
        let proposal = EditProposal::new("ten dollars", "twelve dollars").with_context("The fee is ten dollars per thing.");

        let err = locator().locate(text, &proposal).unwrap_err();
        assert!(matches!(err, LocateFailure::Ambiguous { occurrences: 2, .. }));
    }

    #[test]
    fn test_context_matched_among_occurrences() {
        let text = "Term: one year from signing. Renewal: one year unless terminated by either party.";
        let proposal = EditProposal::new("one year", "two years").with_context("Renewal: one year unless terminated by the parties.");

        let found = locator().locate(text, &proposal).unwrap();
        assert_eq!(found.confidence, Confidence::ContextMatched);
        assert_eq!(found.offset, 38);
    }

    #[test]
    fn test_fuzzy_match_tolerates_typo() {
        let text = "The subcontracter must comply with all applicable laws.";
        let proposal = EditProposal::new("subcontractor must comply", "subcontractor shall comply");

        let found = locator().locate(text, &proposal).unwrap();
        assert_eq!(found.confidence, Confidence::Fuzzy);
        assert_eq!(&text[found.range()], "subcontracter must comply");
        assert!(found.match_score >= 0.85);
    }

    #[test]
    fn test_fuzzy_is_case_insensitive() {
        let text = "All Notices Shall Be In Writing.";
        let proposal = EditProposal::new("all notices shall be in writing", "x");

        let found = locator().locate(text, &proposal).unwrap();
        assert_eq!(found.confidence, Confidence::Fuzzy);
        assert_eq!(found.offset, 0);
    }

    #[test]
    fn test_not_found_reports_context() {
        let text = "Governing law is the State of Delaware.";

        let seen = EditProposal::new("New York", "Texas").with_context("State of Delaware");
        assert_eq!(
            locator().locate(text, &seen).unwrap_err(),
            LocateFailure::NotFound { context_seen: true }
        );

        let unseen = EditProposal::new("New York", "Texas").with_context("laws of New York");
        assert_eq!(
            locator().locate(text, &unseen).unwrap_err(),
            LocateFailure::NotFound { context_seen: false }
        );
    }

    #[test]
    fn test_normalized_match_maps_to_source() {
        let text = "the \u{201C}Agreement\u{201D}\u{00A0} means";
        let proposal = EditProposal::new("\"Agreement\" means", "\"Contract\" means");

        let found = locator().locate(text, &proposal).unwrap();
        assert_eq!(&text[found.range()], "\u{201C}Agreement\u{201D}\u{00A0} means");
    }

    #[test]
    fn test_location_is_idempotent() {
        let text = "Either party may terminate on thirty days notice.";
        let proposal = EditProposal::new("thirty days", "sixty days").with_context("terminate on thirty days notice");

        let first = locator().locate(text, &proposal).unwrap();
        let second = locator().locate(text, &proposal).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_fuzzy_windows_align_to_words() {
        let text = NormalizedText::new("ab cd ef");
        let windows = fuzzy_windows(&text, 5, 0.2);
        assert_eq!(windows, vec![(0, 5), (3, 5)]);
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_parallel_scores_match_sequential_scan() {
        let source = "the subcontracter must comply; the subcontractor must complie. ".repeat(40);
        let text = NormalizedText::new(&source);
        let query = NormalizedText::query("subcontractor must comply");
        let windows = fuzzy_windows(&text, query.len(), 0.2);

        let sequential: Vec<f64> = windows.iter().map(|w| score_window(text.chars(), query.chars(), *w)).collect();
        assert_eq!(score_windows(text.chars(), query.chars(), &windows), sequential);

        let proposal = EditProposal::new("subcontractor must comply", "x");
        let found = locator().locate(&source, &proposal).unwrap();
        assert_eq!(found.confidence, Confidence::Fuzzy);
        assert_eq!(found.offset, 4);
    }
}

//! Per-edit outcomes and the batch report.

use crate::locator::Confidence;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditStatus {
    Applied,
    ContextNotFound,
    SpecificTextNotFound,
    AmbiguousMatch,
    Skipped,
}

impl EditStatus {
    pub fn is_applied(&self) -> bool {
        matches!(self, EditStatus::Applied)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EditStatus::Applied => "applied",
            EditStatus::ContextNotFound => "context_not_found",
            EditStatus::SpecificTextNotFound => "specific_text_not_found",
            EditStatus::AmbiguousMatch => "ambiguous_match",
            EditStatus::Skipped => "skipped",
        }
    }
}

impl std::fmt::Display for EditStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened to one proposal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditOutcome {
    pub edit_index: usize,
    pub status: EditStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub located_paragraph: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub applied_score: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<Confidence>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl EditOutcome {
    pub fn failed(edit_index: usize, status: EditStatus, detail: impl Into<String>) -> Self {
        Self {
            edit_index,
            status,
            located_paragraph: None,
            applied_score: None,
            confidence: None,
            detail: Some(detail.into()),
        }
    }

    pub fn at_paragraph(mut self, paragraph: usize) -> Self {
        self.located_paragraph = Some(paragraph);
        self
    }
}

/// Outcomes of one or more batches, in proposal order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditReport {
    pub counts: BTreeMap<EditStatus, usize>,
    pub outcomes: Vec<EditOutcome>,
}

impl EditReport {
    pub fn new(outcomes: Vec<EditOutcome>) -> Self {
        let mut counts = BTreeMap::new();
        for outcome in &outcomes {
            *counts.entry(outcome.status).or_insert(0) += 1;
        }
        Self { counts, outcomes }
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn count(&self, status: EditStatus) -> usize {
        self.counts.get(&status).copied().unwrap_or(0)
    }

    pub fn applied(&self) -> impl Iterator<Item = &EditOutcome> {
        self.outcomes.iter().filter(|o| o.status.is_applied())
    }

    pub fn failed(&self) -> impl Iterator<Item = &EditOutcome> {
        self.outcomes.iter().filter(|o| !o.status.is_applied())
    }

    pub fn all_applied(&self) -> bool {
        self.outcomes.iter().all(|o| o.status.is_applied())
    }

    /// Append outcomes of a later batch, renumbering them after the current ones
    pub fn extend(&mut self, outcomes: Vec<EditOutcome>) {
        let offset = self.outcomes.len();
        for mut outcome in outcomes {
            outcome.edit_index += offset;
            *self.counts.entry(outcome.status).or_insert(0) += 1;
            self.outcomes.push(outcome);
        }
    }
}

//! # Redline Pipeline
//!
//! Coordinates the full document lifecycle: Load → Apply batches → Serialize
//!
//! The Pipeline manages:
//! - Owning the loaded document
//! - Running proposal batches through the sequencer
//! - Accumulating one report across batches
//! - Producing the final package bytes

use crate::{EditProposal, EditReport, EditSequencer, EditorError};
use redline_docx::Document;
use tracing::info;

/// Manages the load → edit → serialize pipeline for one document
pub struct Pipeline<'s> {
    document: Document,
    sequencer: &'s EditSequencer,
    report: EditReport,
}

impl<'s> Pipeline<'s> {
    /// Create pipeline for a loaded document
    pub fn new(document: Document, sequencer: &'s EditSequencer) -> Self {
        Self {
            document,
            sequencer,
            report: EditReport::default(),
        }
    }

    /// Load package bytes and create the pipeline
    pub fn load(bytes: impl Into<Vec<u8>>, sequencer: &'s EditSequencer) -> Result<Self, EditorError> {
        Ok(Self::new(Document::load(bytes)?, sequencer))
    }

    /// Apply one batch of proposals
    ///
    /// Outcomes are appended to the pipeline report, numbered after the
    /// outcomes of earlier batches.
    pub fn apply(&mut self, proposals: &[EditProposal]) -> &EditReport {
        let outcomes = self.sequencer.apply_all(&mut self.document, proposals);
        self.report.extend(outcomes);
        &self.report
    }

    /// Get current document
    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn report(&self) -> &EditReport {
        &self.report
    }

    /// Serialize the document and hand back the report
    pub fn finish(self) -> Result<RedlineResult, EditorError> {
        let document = self.document.serialize()?;
        info!(
            applied = self.report.count(crate::EditStatus::Applied),
            total = self.report.len(),
            "Redline complete"
        );
        Ok(RedlineResult {
            document,
            report: self.report,
        })
    }
}

/// Result of a redline run
#[derive(Debug, Clone)]
pub struct RedlineResult {
    /// Serialized package
    pub document: Vec<u8>,

    pub report: EditReport,
}

/// Load → apply → serialize in one call
pub fn redline(
    bytes: impl Into<Vec<u8>>,
    proposals: &[EditProposal],
    sequencer: &EditSequencer,
) -> Result<RedlineResult, EditorError> {
    let mut pipeline = Pipeline::load(bytes, sequencer)?;
    pipeline.apply(proposals);
    pipeline.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Attribution, EditStatus, EditorConfig};
    use redline_docx::fixtures::docx_from_paragraphs;

    fn sequencer() -> EditSequencer {
        EditSequencer::new(Attribution::undated("Reviewer"), EditorConfig::default()).unwrap()
    }

    #[test]
    fn test_batches_share_one_report() {
        let sequencer = sequencer();
        let bytes = docx_from_paragraphs(&["Alpha beta.", "Gamma delta."]);
        let mut pipeline = Pipeline::load(bytes, &sequencer).unwrap();

        pipeline.apply(&[EditProposal::new("beta", "bravo")]);
        let report = pipeline.apply(&[EditProposal::new("missing", "x"), EditProposal::new("delta", "dog")]);

        assert_eq!(report.len(), 3);
        assert_eq!(report.outcomes[1].edit_index, 1);
        assert_eq!(report.outcomes[1].status, EditStatus::SpecificTextNotFound);
        assert_eq!(report.count(EditStatus::Applied), 2);
    }

    #[test]
    fn test_redline_round_trip() {
        let sequencer = sequencer();
        let bytes = docx_from_paragraphs(&["Notice must be given in writing."]);

        let result = redline(bytes, &[EditProposal::new("must", "shall")], &sequencer).unwrap();
        let reloaded = Document::load(result.document).unwrap();

        assert_eq!(reloaded.plain_text(), "Notice shall be given in writing.");
        assert_eq!(reloaded.preexisting_tracked_changes().len(), 2);
        assert!(result.report.all_applied());
    }

    #[test]
    fn test_malformed_input_is_an_error() {
        let err = redline(b"nope".to_vec(), &[], &sequencer()).err().unwrap();
        assert!(matches!(err, EditorError::Document(_)));
    }
}

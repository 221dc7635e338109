//! # Redline Editor
//!
//! Applies language-model edit proposals to a document as tracked changes.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ redline-docx: .docx bytes → paragraph arena │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ editor: one batch of proposals              │
//! │  - locator: find the span (exact → fuzzy)   │
//! │  - recorder: build attributed ins/del       │
//! │  - mutator: split/tag/merge runs atomically │
//! │  - sequencer: order, refresh, report        │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ redline-docx: lossless serialization        │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Never destructive**: every change is a pending insertion or deletion
//! 2. **Current text only**: each proposal is located after earlier ones applied
//! 3. **Fail per edit**: an edit that cannot be placed safely is reported, not forced
//! 4. **Existing changes survive**: pending revisions by others are never rewritten
//!
//! ## Usage
//!
//! ```rust,ignore
//! use redline_editor::{parse_proposals, redline, Attribution, EditSequencer, EditorConfig};
//!
//! let proposals = parse_proposals(&std::fs::read_to_string("edits.json")?)?;
//! let sequencer = EditSequencer::new(Attribution::now("Reviewer"), EditorConfig::default())?;
//!
//! let result = redline(std::fs::read("contract.docx")?, &proposals, &sequencer)?;
//! std::fs::write("contract.redlined.docx", result.document)?;
//! ```

mod config;
mod errors;
mod locator;
pub mod mutator;
mod normalize;
mod outcome;
mod pipeline;
mod proposal;
mod recorder;
mod sequencer;
mod similarity;

pub use config::{ConfigError, EditorConfig, LocatorConfig, RecorderConfig};
pub use errors::EditorError;
pub use locator::{locate, Confidence, LocateFailure, LocatedSpan, Location, TextLocator, TextMatch};
pub use mutator::MutationError;
pub use normalize::NormalizedText;
pub use outcome::{EditOutcome, EditReport, EditStatus};
pub use pipeline::{redline, Pipeline, RedlineResult};
pub use proposal::{parse_proposals, EditProposal};
pub use recorder::{Attribution, ChangeConflict, ChangeRecorder, ChangeSet, Deletion, Insertion};
pub use sequencer::{apply_all, EditSequencer, TextView};

// Re-export the document session for convenience
pub use redline_docx::{Document, DocxError};

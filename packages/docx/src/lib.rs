//! # Redline DOCX
//!
//! Document session for the redline editing engine.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ package: .docx bytes → main-part XML        │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ parser: XML → paragraph arena of runs       │
//! │  - text / symbol / opaque runs              │
//! │  - pending w:ins / w:del as run tags        │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ serializer: dirty paragraphs re-emitted,    │
//! │ everything else copied verbatim             │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use redline_docx::Document;
//!
//! let doc = Document::load(std::fs::read("contract.docx")?)?;
//! for marker in doc.preexisting_tracked_changes() {
//!     println!("{:?} by {}", marker.kind, marker.author);
//! }
//! let bytes = doc.serialize()?;
//! ```

mod document;
mod error;
mod model;
mod package;
mod parser;
mod serializer;

#[cfg(feature = "fixtures")]
pub mod fixtures;

pub use document::{Document, RevisionIds, TrackedChangeSummary};
pub use error::{DocxError, DocxResult};
pub use model::{Paragraph, Revision, RevisionKind, Run, RunFormat, RunKind, TrackedChangeMarker};
pub use package::{Package, DEFAULT_MAIN_PART};
pub use serializer::{escape_attribute, escape_text, LosslessSerializer};

/// WordprocessingML main namespace
pub const WORDML_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

/// Qualified element or attribute name for a namespace prefix
pub fn qualified(prefix: &str, local: &str) -> String {
    if prefix.is_empty() {
        local.to_string()
    } else {
        format!("{}:{}", prefix, local)
    }
}

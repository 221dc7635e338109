//! # Document Session
//!
//! Owns one loaded `.docx` package and its paragraph arena.
//!
//! ## Lifecycle
//!
//! ```text
//! Load → Parse → Edit paragraphs → Serialize
//!   ↓      ↓           ↓               ↓
//! bytes  arena   replace_runs()   bytes (clean parts copied verbatim)
//! ```
//!
//! A document with no dirty paragraph serializes to exactly the bytes it was
//! loaded from.

use crate::error::{DocxError, DocxResult};
use crate::model::{Paragraph, RevisionKind, TrackedChangeMarker};
use crate::package::Package;
use crate::parser::parse_main_part;
use crate::serializer::LosslessSerializer;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Allocator for `w:id` values of new revisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevisionIds {
    next: u64,
}

impl RevisionIds {
    pub fn starting_at(next: u64) -> Self {
        Self { next }
    }

    pub fn next_id(&mut self) -> String {
        let id = self.next;
        self.next += 1;
        id.to_string()
    }

    pub fn peek(&self) -> u64 {
        self.next
    }
}

/// Counts of pending tracked changes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TrackedChangeSummary {
    pub insertions: usize,
    pub deletions: usize,
    pub by_author: BTreeMap<String, usize>,
}

impl TrackedChangeSummary {
    pub fn from_markers(markers: &[TrackedChangeMarker]) -> Self {
        let mut summary = Self::default();
        for marker in markers {
            match marker.kind {
                RevisionKind::Insertion => summary.insertions += 1,
                RevisionKind::Deletion => summary.deletions += 1,
            }
            *summary.by_author.entry(marker.author.clone()).or_insert(0) += 1;
        }
        summary
    }

    pub fn total(&self) -> usize {
        self.insertions + self.deletions
    }
}

/// Loaded word-processing document
#[derive(Debug, Clone)]
pub struct Document {
    package: Package,

    /// Main-part XML the paragraphs were parsed from
    source: String,

    /// Prefix bound to the WordprocessingML namespace
    prefix: String,

    paragraphs: Vec<Paragraph>,
    preexisting: Vec<TrackedChangeMarker>,
    revision_ids: RevisionIds,
}

impl Document {
    /// Load a document from package bytes
    pub fn load(bytes: impl Into<Vec<u8>>) -> DocxResult<Self> {
        let (package, source) = Package::open(bytes.into())?;
        let parsed = parse_main_part(&source)?;

        let preexisting: Vec<TrackedChangeMarker> = parsed
            .paragraphs
            .iter()
            .enumerate()
            .flat_map(|(index, p)| p.tracked_changes(index))
            .collect();

        let next_id = parsed.max_id.map(|id| id + 1).unwrap_or(1);

        info!(
            paragraphs = parsed.paragraphs.len(),
            tracked_changes = preexisting.len(),
            main_part = %package.main_part(),
            "Loaded document"
        );

        Ok(Self {
            package,
            source,
            prefix: parsed.prefix,
            paragraphs: parsed.paragraphs,
            preexisting,
            revision_ids: RevisionIds::starting_at(next_id),
        })
    }

    pub fn len(&self) -> usize {
        self.paragraphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paragraphs.is_empty()
    }

    pub fn paragraphs(&self) -> &[Paragraph] {
        &self.paragraphs
    }

    pub fn paragraph(&self, index: usize) -> Option<&Paragraph> {
        self.paragraphs.get(index)
    }

    pub fn paragraph_mut(&mut self, index: usize) -> DocxResult<&mut Paragraph> {
        self.paragraphs
            .get_mut(index)
            .ok_or(DocxError::ParagraphOutOfRange(index))
    }

    /// Mutable paragraph together with the revision id allocator
    pub fn paragraph_with_ids_mut(&mut self, index: usize) -> DocxResult<(&mut Paragraph, &mut RevisionIds)> {
        let paragraph = self
            .paragraphs
            .get_mut(index)
            .ok_or(DocxError::ParagraphOutOfRange(index))?;
        Ok((paragraph, &mut self.revision_ids))
    }

    pub fn revision_ids(&self) -> RevisionIds {
        self.revision_ids
    }

    /// Namespace prefix used for newly written elements
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn main_part(&self) -> &str {
        self.package.main_part()
    }

    /// Tracked changes present when the document was loaded
    pub fn preexisting_tracked_changes(&self) -> &[TrackedChangeMarker] {
        &self.preexisting
    }

    pub fn tracked_change_summary(&self) -> TrackedChangeSummary {
        TrackedChangeSummary::from_markers(&self.preexisting)
    }

    /// Tracked changes as of now, edits made since loading included
    pub fn tracked_changes(&self) -> Vec<TrackedChangeMarker> {
        self.paragraphs
            .iter()
            .enumerate()
            .flat_map(|(index, p)| p.tracked_changes(index))
            .collect()
    }

    /// Accepted text of every paragraph, one per line
    pub fn plain_text(&self) -> String {
        self.paragraphs
            .iter()
            .map(Paragraph::accepted_text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn is_dirty(&self) -> bool {
        self.paragraphs.iter().any(Paragraph::is_dirty)
    }

    /// Serialize back to package bytes
    pub fn serialize(&self) -> DocxResult<Vec<u8>> {
        if !self.is_dirty() {
            debug!("No paragraph changed; returning original package");
            return Ok(self.package.bytes().to_vec());
        }

        let xml = LosslessSerializer::new(&self.source, &self.prefix).serialize(&self.paragraphs);
        self.validate(&xml)?;

        let bytes = self.package.rewrite(&xml)?;
        info!(
            dirty = self.paragraphs.iter().filter(|p| p.is_dirty()).count(),
            bytes = bytes.len(),
            "Serialized document"
        );
        Ok(bytes)
    }

    /// Re-parse emitted XML and check it still describes the same paragraphs
    fn validate(&self, xml: &str) -> DocxResult<()> {
        let reparsed = parse_main_part(xml)
            .map_err(|e| DocxError::serialization(format!("emitted XML does not re-parse: {}", e)))?;

        if reparsed.paragraphs.len() != self.paragraphs.len() {
            return Err(DocxError::serialization(format!(
                "paragraph count changed from {} to {}",
                self.paragraphs.len(),
                reparsed.paragraphs.len()
            )));
        }

        for (index, (emitted, ours)) in reparsed.paragraphs.iter().zip(&self.paragraphs).enumerate() {
            if ours.is_dirty() && emitted.text() != ours.text() {
                return Err(DocxError::serialization(format!(
                    "paragraph {} text differs after serialization",
                    index
                )));
            }
        }

        Ok(())
    }
}

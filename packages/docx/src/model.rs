//! # Paragraph Model
//!
//! A paragraph is an explicit, ordered list of [`Run`] value records. Each run
//! carries its text, its formatting (the raw `w:r` open tag and `w:rPr`
//! properties) and an optional tracked-change tag. Structure that the editing
//! engine does not understand (paragraph properties, bookmarks, hyperlinks,
//! drawings, fields) is kept as opaque runs that contribute no text.
//!
//! ```text
//! <w:p>                                     Paragraph
//!   <w:pPr>..</w:pPr>                       Run { Opaque }
//!   <w:r><w:t>Payment </w:t></w:r>          Run { Text, "Payment " }
//!   <w:del ..><w:r><w:delText>net</..>      Run { Text, "net", Deletion }
//!   <w:ins ..><w:r><w:t>due</w:t>..         Run { Text, "due", Insertion }
//! </w:p>
//! ```

use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Zero-width markup Word scatters between runs. It may sit inside a
/// `w:ins`/`w:del` wrapper without changing what the wrapper covers.
const RANGE_MARKERS: &[&str] = &[
    "proofErr",
    "bookmarkStart",
    "bookmarkEnd",
    "commentRangeStart",
    "commentRangeEnd",
    "permStart",
    "permEnd",
];

/// Kind of a pending tracked change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevisionKind {
    Insertion,
    Deletion,
}

impl RevisionKind {
    /// Local element name of the wrapper (`ins` / `del`)
    pub fn element_name(&self) -> &'static str {
        match self {
            RevisionKind::Insertion => "ins",
            RevisionKind::Deletion => "del",
        }
    }
}

/// Tracked-change tag carried by a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revision {
    pub kind: RevisionKind,
    pub id: String,
    pub author: String,
    pub date: Option<String>,

    /// Raw wrapper open tag when the revision was read from the source
    #[serde(skip)]
    pub(crate) source_tag: Option<String>,
}

impl Revision {
    pub fn new(kind: RevisionKind, id: impl Into<String>, author: impl Into<String>, date: Option<String>) -> Self {
        Self {
            kind,
            id: id.into(),
            author: author.into(),
            date,
            source_tag: None,
        }
    }

    pub fn is_insertion(&self) -> bool {
        self.kind == RevisionKind::Insertion
    }

    pub fn is_deletion(&self) -> bool {
        self.kind == RevisionKind::Deletion
    }

    /// Whether this revision came from the loaded document
    pub fn is_preexisting(&self) -> bool {
        self.source_tag.is_some()
    }
}

/// Formatting of a run: its raw open tag and raw `w:rPr` element
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunFormat {
    pub(crate) open_tag: String,
    pub(crate) properties: String,
}

impl RunFormat {
    /// Raw `w:rPr` XML (empty when the run has no direct formatting)
    pub fn properties(&self) -> &str {
        &self.properties
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunKind {
    /// Plain text (`w:t` / `w:delText`), splittable at any char boundary
    Text,

    /// Single-character run content such as `w:tab` or `w:br`
    Symbol { xml: String },

    /// XML kept verbatim; no visible text
    Opaque { xml: String },
}

/// Contiguous content with uniform formatting and tracked-change status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Run {
    pub kind: RunKind,
    pub text: String,
    pub format: RunFormat,
    pub revision: Option<Revision>,
}

impl Run {
    pub fn text(text: impl Into<String>, format: RunFormat, revision: Option<Revision>) -> Self {
        Self {
            kind: RunKind::Text,
            text: text.into(),
            format,
            revision,
        }
    }

    pub(crate) fn symbol(xml: String, text: &str, format: RunFormat, revision: Option<Revision>) -> Self {
        Self {
            kind: RunKind::Symbol { xml },
            text: text.to_string(),
            format,
            revision,
        }
    }

    pub(crate) fn opaque(xml: String, revision: Option<Revision>) -> Self {
        Self {
            kind: RunKind::Opaque { xml },
            text: String::new(),
            format: RunFormat::default(),
            revision,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self.kind, RunKind::Text)
    }

    pub fn is_opaque(&self) -> bool {
        matches!(self.kind, RunKind::Opaque { .. })
    }

    pub fn is_deleted(&self) -> bool {
        self.revision.as_ref().map(Revision::is_deletion).unwrap_or(false)
    }

    pub fn is_inserted(&self) -> bool {
        self.revision.as_ref().map(Revision::is_insertion).unwrap_or(false)
    }

    /// Proof marks, bookmarks and similar zero-width markup
    pub fn is_range_marker(&self) -> bool {
        let RunKind::Opaque { xml } = &self.kind else {
            return false;
        };
        let name = xml
            .trim_start_matches('<')
            .split(|c: char| c.is_whitespace() || c == '/' || c == '>')
            .next()
            .unwrap_or_default();
        let local = name.rsplit(':').next().unwrap_or(name);
        RANGE_MARKERS.contains(&local)
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// A pending tracked change, covering a contiguous run range of one paragraph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedChangeMarker {
    pub paragraph_index: usize,
    pub kind: RevisionKind,
    pub id: String,
    pub author: String,
    pub timestamp: Option<String>,
    pub covers: Range<usize>,
}

/// A paragraph of the document body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paragraph {
    pub(crate) open_tag: String,
    pub(crate) close_tag: String,

    /// Byte range of the `w:p` element in the part it was loaded from
    pub(crate) source: Option<Range<usize>>,

    runs: Vec<Run>,
    dirty: bool,
}

impl Paragraph {
    pub(crate) fn from_source(open_tag: String, close_tag: String, source: Range<usize>, runs: Vec<Run>) -> Self {
        Self {
            open_tag,
            close_tag,
            source: Some(source),
            runs,
            dirty: false,
        }
    }

    /// Build a detached paragraph from runs (used by tests and tooling)
    pub fn from_runs(prefix: &str, runs: Vec<Run>) -> Self {
        let p = crate::qualified(prefix, "p");
        Self {
            open_tag: format!("<{}>", p),
            close_tag: format!("</{}>", p),
            source: None,
            runs,
            dirty: true,
        }
    }

    pub fn runs(&self) -> &[Run] {
        &self.runs
    }

    /// Visible text: every run, pending insertions and deletions included
    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }

    /// Text with every pending change accepted
    pub fn accepted_text(&self) -> String {
        self.runs
            .iter()
            .filter(|r| !r.is_deleted())
            .map(|r| r.text.as_str())
            .collect()
    }

    /// Text with every pending change rejected
    pub fn rejected_text(&self) -> String {
        self.runs
            .iter()
            .filter(|r| !r.is_inserted())
            .map(|r| r.text.as_str())
            .collect()
    }

    /// Start offset of every run within [`Paragraph::text`]
    pub fn run_offsets(&self) -> Vec<usize> {
        let mut offsets = Vec::with_capacity(self.runs.len());
        let mut pos = 0;
        for run in &self.runs {
            offsets.push(pos);
            pos += run.len();
        }
        offsets
    }

    /// Index of the text-bearing run containing `offset`
    pub fn run_at(&self, offset: usize) -> Option<usize> {
        let mut pos = 0;
        for (index, run) in self.runs.iter().enumerate() {
            if !run.is_empty() && offset >= pos && offset < pos + run.len() {
                return Some(index);
            }
            pos += run.len();
        }
        None
    }

    /// Pending tracked changes, one marker per contiguous revision
    pub fn tracked_changes(&self, paragraph_index: usize) -> Vec<TrackedChangeMarker> {
        let mut markers: Vec<TrackedChangeMarker> = Vec::new();

        let mut index = 0;
        while index < self.runs.len() {
            let Some(revision) = &self.runs[index].revision else {
                index += 1;
                continue;
            };
            let end = revision_group_end(&self.runs, index);

            match markers.last_mut() {
                Some(last) if last.covers.end == index && last.id == revision.id && last.kind == revision.kind => {
                    last.covers.end = end;
                }
                _ => markers.push(TrackedChangeMarker {
                    paragraph_index,
                    kind: revision.kind,
                    id: revision.id.clone(),
                    author: revision.author.clone(),
                    timestamp: revision.date.clone(),
                    covers: index..end,
                }),
            }
            index = end;
        }

        markers
    }

    /// Replace the run list (marks the paragraph for re-serialization)
    pub fn replace_runs(&mut self, runs: Vec<Run>) {
        self.runs = runs;
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

/// End (exclusive) of the revision group starting at `start`: the following
/// runs sharing its revision, bridging untracked range markers between them
pub(crate) fn revision_group_end(runs: &[Run], start: usize) -> usize {
    let Some(revision) = runs.get(start).and_then(|r| r.revision.as_ref()) else {
        return start + 1;
    };

    let mut end = start + 1;
    let mut next = end;
    while let Some(run) = runs.get(next) {
        if run.revision.as_ref() == Some(revision) {
            next += 1;
            end = next;
        } else if run.revision.is_none() && run.is_range_marker() {
            next += 1;
        } else {
            break;
        }
    }
    end
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rev(kind: RevisionKind, id: &str) -> Option<Revision> {
        Some(Revision::new(kind, id, "Reviewer", None))
    }

    fn sample() -> Paragraph {
        Paragraph::from_runs(
            "w",
            vec![
                Run::text("Pay ", RunFormat::default(), None),
                Run::text("net", RunFormat::default(), rev(RevisionKind::Deletion, "1")),
                Run::text("due", RunFormat::default(), rev(RevisionKind::Insertion, "2")),
                Run::text(" now", RunFormat::default(), None),
            ],
        )
    }

    #[test]
    fn test_text_projections() {
        let p = sample();
        assert_eq!(p.text(), "Pay netdue now");
        assert_eq!(p.accepted_text(), "Pay due now");
        assert_eq!(p.rejected_text(), "Pay net now");
    }

    #[test]
    fn test_run_at_skips_empty_runs() {
        let mut runs = sample().runs().to_vec();
        runs.insert(1, Run::opaque("<w:bookmarkStart/>".to_string(), None));
        let p = Paragraph::from_runs("w", runs);

        assert_eq!(p.run_at(0), Some(0));
        assert_eq!(p.run_at(4), Some(2));
        assert_eq!(p.run_at(14), None);
        assert_eq!(p.run_offsets(), vec![0, 4, 4, 7, 10]);
    }

    #[test]
    fn test_tracked_changes_group_by_revision() {
        let mut runs = sample().runs().to_vec();
        runs.insert(3, Run::text(" soon", RunFormat::default(), rev(RevisionKind::Insertion, "2")));
        let p = Paragraph::from_runs("w", runs);

        let markers = p.tracked_changes(7);
        assert_eq!(markers.len(), 2);
        assert_eq!(markers[0].kind, RevisionKind::Deletion);
        assert_eq!(markers[0].covers, 1..2);
        assert_eq!(markers[1].kind, RevisionKind::Insertion);
        assert_eq!(markers[1].covers, 2..4);
        assert_eq!(markers[1].paragraph_index, 7);
    }

    #[test]
    fn test_range_markers_inside_a_revision_are_bridged() {
        let deletion = rev(RevisionKind::Deletion, "4");
        let p = Paragraph::from_runs(
            "w",
            vec![
                Run::text("ten ", RunFormat::default(), deletion.clone()),
                Run::opaque(r#"<w:proofErr w:type="spellStart"/>"#.to_string(), None),
                Run::text("dollars", RunFormat::default(), deletion),
                Run::opaque("<w:bookmarkEnd w:id=\"0\"/>".to_string(), None),
                Run::text(".", RunFormat::default(), None),
            ],
        );

        assert!(p.runs()[1].is_range_marker());
        assert!(!Run::opaque("<w:r><w:drawing/></w:r>".to_string(), None).is_range_marker());

        let markers = p.tracked_changes(0);
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].covers, 0..3);
    }
}

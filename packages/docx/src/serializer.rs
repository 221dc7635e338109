//! Lossless main-part serializer.
//!
//! Clean paragraphs (and everything between them) are copied from the loaded
//! source verbatim; only dirty paragraphs are re-emitted from their runs.
//! Consecutive runs sharing a revision are grouped into one `w:ins`/`w:del`
//! wrapper, reusing the source wrapper tag for revisions that were loaded.
//! Range markers sitting between two runs of one revision go inside its
//! wrapper, so a revision id is never written twice.

use crate::model::{revision_group_end, Paragraph, Revision, Run, RunKind};
use crate::qualified;

pub struct LosslessSerializer<'a> {
    source: &'a str,
    prefix: &'a str,
}

impl<'a> LosslessSerializer<'a> {
    pub fn new(source: &'a str, prefix: &'a str) -> Self {
        Self { source, prefix }
    }

    /// Serialize the part, splicing dirty paragraphs into the source
    pub fn serialize(&self, paragraphs: &[Paragraph]) -> String {
        let mut output = String::with_capacity(self.source.len() + 256);
        let mut last_end = 0;

        for paragraph in paragraphs.iter().filter(|p| p.is_dirty()) {
            let Some(range) = &paragraph.source else {
                continue;
            };
            output.push_str(&self.source[last_end..range.start]);
            self.write_paragraph(paragraph, &mut output);
            last_end = range.end;
        }

        output.push_str(&self.source[last_end..]);
        output
    }

    pub fn write_paragraph(&self, paragraph: &Paragraph, out: &mut String) {
        out.push_str(&paragraph.open_tag);

        let runs = paragraph.runs();
        let mut i = 0;
        while i < runs.len() {
            match &runs[i].revision {
                None => {
                    self.write_run(&runs[i], false, out);
                    i += 1;
                }
                Some(revision) => {
                    let end = revision_group_end(runs, i);
                    self.write_revision(revision, &runs[i..end], out);
                    i = end;
                }
            }
        }

        out.push_str(&paragraph.close_tag);
    }

    fn write_revision(&self, revision: &Revision, runs: &[Run], out: &mut String) {
        let element = qualified(self.prefix, revision.kind.element_name());

        match &revision.source_tag {
            Some(tag) => out.push_str(tag),
            None => {
                out.push('<');
                out.push_str(&element);
                self.write_attribute("id", &revision.id, out);
                self.write_attribute("author", &revision.author, out);
                if let Some(date) = &revision.date {
                    self.write_attribute("date", date, out);
                }
                out.push('>');
            }
        }

        for run in runs {
            self.write_run(run, revision.is_deletion(), out);
        }

        out.push_str("</");
        out.push_str(&element);
        out.push('>');
    }

    fn write_attribute(&self, name: &str, value: &str, out: &mut String) {
        out.push(' ');
        out.push_str(&qualified(self.prefix, name));
        out.push_str("=\"");
        out.push_str(&escape_attribute(value));
        out.push('"');
    }

    fn write_run(&self, run: &Run, deleted: bool, out: &mut String) {
        let close = format!("</{}>", qualified(self.prefix, "r"));

        match &run.kind {
            RunKind::Opaque { xml } => out.push_str(xml),
            RunKind::Symbol { xml } => {
                self.write_run_start(run, out);
                out.push_str(xml);
                out.push_str(&close);
            }
            RunKind::Text => {
                let element = qualified(self.prefix, if deleted { "delText" } else { "t" });
                self.write_run_start(run, out);
                out.push('<');
                out.push_str(&element);
                out.push_str(" xml:space=\"preserve\">");
                out.push_str(&escape_text(&run.text));
                out.push_str("</");
                out.push_str(&element);
                out.push('>');
                out.push_str(&close);
            }
        }
    }

    fn write_run_start(&self, run: &Run, out: &mut String) {
        if run.format.open_tag.is_empty() {
            out.push('<');
            out.push_str(&qualified(self.prefix, "r"));
            out.push('>');
        } else {
            out.push_str(&run.format.open_tag);
        }
        out.push_str(&run.format.properties);
    }
}

pub fn escape_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            // Parsers fold a literal CR into LF
            '\r' => escaped.push_str("&#xD;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

pub fn escape_attribute(value: &str) -> String {
    escape_text(value)
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
        .replace('\n', "&#xA;")
        .replace('\t', "&#x9;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RevisionKind, RunFormat};

    #[test]
    fn test_write_new_revision_groups_runs() {
        let deletion = Revision::new(RevisionKind::Deletion, "4", "Editor", Some("2024-05-01T10:00:00Z".into()));
        let insertion = Revision::new(RevisionKind::Insertion, "5", "Editor", Some("2024-05-01T10:00:00Z".into()));
        let paragraph = Paragraph::from_runs(
            "w",
            vec![
                Run::text("Pay ", RunFormat::default(), None),
                Run::text("in ", RunFormat::default(), Some(deletion.clone())),
                Run::text("full", RunFormat::default(), Some(deletion)),
                Run::text("net 30", RunFormat::default(), Some(insertion)),
            ],
        );

        let serializer = LosslessSerializer::new("", "w");
        let mut out = String::new();
        serializer.write_paragraph(&paragraph, &mut out);

        assert_eq!(
            out,
            concat!(
                r#"<w:p><w:r><w:t xml:space="preserve">Pay </w:t></w:r>"#,
                r#"<w:del w:id="4" w:author="Editor" w:date="2024-05-01T10:00:00Z">"#,
                r#"<w:r><w:delText xml:space="preserve">in </w:delText></w:r>"#,
                r#"<w:r><w:delText xml:space="preserve">full</w:delText></w:r></w:del>"#,
                r#"<w:ins w:id="5" w:author="Editor" w:date="2024-05-01T10:00:00Z">"#,
                r#"<w:r><w:t xml:space="preserve">net 30</w:t></w:r></w:ins></w:p>"#,
            )
        );
    }

    #[test]
    fn test_proof_mark_inside_deletion_keeps_one_wrapper() {
        let deletion = Revision::new(RevisionKind::Deletion, "8", "Editor", None);
        let paragraph = Paragraph::from_runs(
            "w",
            vec![
                Run::text("ten ", RunFormat::default(), Some(deletion.clone())),
                Run::opaque("<w:proofErr/>".to_string(), None),
                Run::text("dollars", RunFormat::default(), Some(deletion)),
            ],
        );

        let mut out = String::new();
        LosslessSerializer::new("", "w").write_paragraph(&paragraph, &mut out);

        assert_eq!(out.matches("<w:del ").count(), 1);
        assert!(out.contains(r#"ten </w:delText></w:r><w:proofErr/><w:r>"#));
    }

    #[test]
    fn test_escaping() {
        assert_eq!(escape_text("a < b & c > d"), "a &lt; b &amp; c &gt; d");
        assert_eq!(escape_attribute("O'Neil \"QA\""), "O&apos;Neil &quot;QA&quot;");
        assert_eq!(escape_text("one\r\ntwo"), "one&#xD;\ntwo");
        assert_eq!(escape_attribute("a\tb\nc"), "a&#x9;b&#xA;c");
    }

    #[test]
    fn test_clean_paragraphs_are_copied() {
        let source = "<root>unchanged</root>";
        let serializer = LosslessSerializer::new(source, "w");
        assert_eq!(serializer.serialize(&[]), source);
    }
}

//! In-memory `.docx` builders for tests.

use crate::package::{document_xml, minimal_parts, write_parts};

/// Package whose body is `body_xml` (paragraph markup using the `w` prefix)
pub fn docx(body_xml: &str) -> Vec<u8> {
    write_parts(&minimal_parts(&document_xml(body_xml))).expect("in-memory package")
}

/// Package with one plain paragraph per entry
pub fn docx_from_paragraphs(paragraphs: &[&str]) -> Vec<u8> {
    let body: String = paragraphs.iter().map(|text| paragraph(text)).collect();
    docx(&body)
}

/// Package with extra parts next to the minimal ones
pub fn docx_with_parts(body_xml: &str, extra: &[(&str, &str)]) -> Vec<u8> {
    let mut parts = minimal_parts(&document_xml(body_xml));
    parts.extend(extra.iter().map(|(name, content)| (name.to_string(), content.to_string())));
    write_parts(&parts).expect("in-memory package")
}

/// One-run paragraph markup
pub fn paragraph(text: &str) -> String {
    format!(
        r#"<w:p><w:r><w:t xml:space="preserve">{}</w:t></w:r></w:p>"#,
        crate::escape_text(text)
    )
}

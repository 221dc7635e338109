//! ZIP package access.
//!
//! The package keeps the bytes it was opened from. Rewriting replaces the
//! main part only; every other entry is copied raw so its compressed bytes
//! are untouched.

use crate::error::{DocxError, DocxResult};
use std::io::{Cursor, Read, Write};
use tracing::debug;
use zip::write::FileOptions;
use zip::{ZipArchive, ZipWriter};

pub const DEFAULT_MAIN_PART: &str = "word/document.xml";

const RELATIONSHIPS_PART: &str = "_rels/.rels";
const OFFICE_DOCUMENT_REL: &str = "/officeDocument";
const BOM: char = '\u{FEFF}';

#[derive(Debug, Clone)]
pub struct Package {
    bytes: Vec<u8>,
    main_part: String,
    main_has_bom: bool,
}

impl Package {
    /// Open a package and return it with its main-part XML
    pub fn open(bytes: Vec<u8>) -> DocxResult<(Self, String)> {
        let mut archive = ZipArchive::new(Cursor::new(bytes.as_slice()))?;

        let main_part = resolve_main_part(&mut archive)?;
        let xml = read_text(&mut archive, &main_part)?
            .ok_or_else(|| DocxError::malformed(format!("missing main part '{}'", main_part)))?;

        let main_has_bom = xml.starts_with(BOM);
        let xml = xml.trim_start_matches(BOM).to_string();

        debug!(main_part = %main_part, entries = archive.len(), "Opened package");

        drop(archive);
        Ok((
            Self {
                bytes,
                main_part,
                main_has_bom,
            },
            xml,
        ))
    }

    pub fn main_part(&self) -> &str {
        &self.main_part
    }

    /// Bytes the package was opened from
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Write a new package with the main part replaced
    pub fn rewrite(&self, main_xml: &str) -> DocxResult<Vec<u8>> {
        let failure = |e: zip::result::ZipError| DocxError::serialization(format!("package write failed: {}", e));
        let io_failure = |e: std::io::Error| DocxError::serialization(format!("package write failed: {}", e));

        let mut archive = ZipArchive::new(Cursor::new(self.bytes.as_slice())).map_err(failure)?;
        let mut writer = ZipWriter::new(Cursor::new(Vec::with_capacity(self.bytes.len())));

        for index in 0..archive.len() {
            let file = archive.by_index_raw(index).map_err(failure)?;

            if file.name() == self.main_part {
                let name = file.name().to_string();
                let options = FileOptions::default().compression_method(file.compression());
                drop(file);

                writer.start_file(name, options).map_err(failure)?;
                if self.main_has_bom {
                    writer.write_all(BOM.to_string().as_bytes()).map_err(io_failure)?;
                }
                writer.write_all(main_xml.as_bytes()).map_err(io_failure)?;
            } else {
                writer.raw_copy_file(file).map_err(failure)?;
            }
        }

        let cursor = writer.finish().map_err(failure)?;
        Ok(cursor.into_inner())
    }
}

fn read_text<R: Read + std::io::Seek>(archive: &mut ZipArchive<R>, name: &str) -> DocxResult<Option<String>> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)
        .map_err(|e| DocxError::malformed(format!("cannot read '{}': {}", name, e)))?;

    String::from_utf8(bytes)
        .map(Some)
        .map_err(|_| DocxError::malformed(format!("part '{}' is not UTF-8", name)))
}

/// Main part named by the package relationships, else the conventional path
fn resolve_main_part<R: Read + std::io::Seek>(archive: &mut ZipArchive<R>) -> DocxResult<String> {
    let Some(rels) = read_text(archive, RELATIONSHIPS_PART)? else {
        return Ok(DEFAULT_MAIN_PART.to_string());
    };

    let rels = roxmltree::Document::parse(rels.trim_start_matches(BOM))?;
    let target = rels
        .descendants()
        .filter(|n| n.tag_name().name() == "Relationship")
        .find(|n| {
            n.attribute("Type")
                .map(|t| t.ends_with(OFFICE_DOCUMENT_REL))
                .unwrap_or(false)
        })
        .and_then(|n| n.attribute("Target"))
        .map(|t| t.trim_start_matches('/').to_string());

    Ok(target.unwrap_or_else(|| DEFAULT_MAIN_PART.to_string()))
}

/// Minimal package parts, shared by fixtures and tests
#[cfg(any(test, feature = "fixtures"))]
pub(crate) fn minimal_parts(document_xml: &str) -> Vec<(String, String)> {
    vec![
        (
            "[Content_Types].xml".to_string(),
            concat!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
                r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
                r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#,
                r#"<Default Extension="xml" ContentType="application/xml"/>"#,
                r#"<Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>"#,
                r#"</Types>"#
            )
            .to_string(),
        ),
        (
            RELATIONSHIPS_PART.to_string(),
            concat!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
                r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
                r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>"#,
                r#"</Relationships>"#
            )
            .to_string(),
        ),
        (DEFAULT_MAIN_PART.to_string(), document_xml.to_string()),
    ]
}

/// Wrap body XML into a main part declaring the `w` prefix
#[cfg(any(test, feature = "fixtures"))]
pub(crate) fn document_xml(body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>{}<w:document xmlns:w="{}"><w:body>{}<w:sectPr/></w:body></w:document>"#,
        "\n", crate::WORDML_NS, body
    )
}

/// Build a package from `(name, content)` parts, deflating every entry
#[cfg(any(test, feature = "fixtures"))]
pub(crate) fn write_parts(parts: &[(String, String)]) -> DocxResult<Vec<u8>> {
    let failure = |e: zip::result::ZipError| DocxError::serialization(e.to_string());

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    for (name, content) in parts {
        writer.start_file(name.as_str(), options).map_err(failure)?;
        writer
            .write_all(content.as_bytes())
            .map_err(|e| DocxError::serialization(e.to_string()))?;
    }

    Ok(writer.finish().map_err(failure)?.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_resolves_main_part() {
        let xml = document_xml("<w:p/>");
        let bytes = write_parts(&minimal_parts(&xml)).unwrap();

        let (package, main) = Package::open(bytes.clone()).unwrap();
        assert_eq!(package.main_part(), "word/document.xml");
        assert_eq!(main, xml);
        assert_eq!(package.bytes(), bytes.as_slice());
    }

    #[test]
    fn test_custom_main_part_location() {
        let xml = document_xml("<w:p/>");
        let parts = vec![
            (
                RELATIONSHIPS_PART.to_string(),
                r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="/content/main.xml"/></Relationships>"#.to_string(),
            ),
            ("content/main.xml".to_string(), xml.clone()),
        ];
        let bytes = write_parts(&parts).unwrap();

        let (package, main) = Package::open(bytes).unwrap();
        assert_eq!(package.main_part(), "content/main.xml");
        assert_eq!(main, xml);
    }

    #[test]
    fn test_not_a_zip_is_malformed() {
        let err = Package::open(b"plain text".to_vec()).err().unwrap();
        assert!(matches!(err, DocxError::MalformedDocument(_)));
    }

    #[test]
    fn test_missing_main_part_is_malformed() {
        let parts = vec![("other.xml".to_string(), "<a/>".to_string())];
        let bytes = write_parts(&parts).unwrap();

        let err = Package::open(bytes).err().unwrap();
        assert!(err.to_string().contains("missing main part"));
    }

    #[test]
    fn test_rewrite_replaces_only_main_part() {
        let mut parts = minimal_parts(&document_xml("<w:p/>"));
        parts.push(("word/styles.xml".to_string(), "<w:styles/>".to_string()));
        let bytes = write_parts(&parts).unwrap();
        let (package, _) = Package::open(bytes).unwrap();

        let replaced = document_xml("<w:p><w:r><w:t>new</w:t></w:r></w:p>");
        let rewritten = package.rewrite(&replaced).unwrap();

        let (_, main) = Package::open(rewritten.clone()).unwrap();
        assert_eq!(main, replaced);

        let mut archive = ZipArchive::new(Cursor::new(rewritten.as_slice())).unwrap();
        assert_eq!(read_text(&mut archive, "word/styles.xml").unwrap().as_deref(), Some("<w:styles/>"));
        assert_eq!(archive.len(), 4);
    }
}

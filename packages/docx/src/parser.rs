//! Main-part parser: WordprocessingML XML → paragraph arena.
//!
//! Only the structure needed for tracked changes is modelled. Every element
//! the editor cannot reason about becomes an opaque run holding its source
//! slice, so re-emitting a paragraph never loses markup.

use crate::error::{DocxError, DocxResult};
use crate::model::{Paragraph, Revision, RevisionKind, Run, RunFormat};
use crate::WORDML_NS;
use roxmltree::Node;
use tracing::debug;

pub(crate) struct ParsedBody {
    pub prefix: String,
    pub paragraphs: Vec<Paragraph>,
    pub max_id: Option<u64>,
}

pub(crate) fn parse_main_part(source: &str) -> DocxResult<ParsedBody> {
    let xml = roxmltree::Document::parse(source)?;
    let root = xml.root_element();

    if !is_w(&root, "document") {
        return Err(DocxError::malformed(format!(
            "unexpected root element '{}'",
            root.tag_name().name()
        )));
    }

    let body = root
        .children()
        .find(|n| is_w(n, "body"))
        .ok_or_else(|| DocxError::malformed("document has no body"))?;

    let prefix = root.lookup_prefix(WORDML_NS).unwrap_or("").to_string();

    let paragraphs: Vec<Paragraph> = body
        .descendants()
        .filter(|n| is_w(n, "p") && !n.ancestors().skip(1).any(|a| is_w(&a, "p")))
        .map(|n| parse_paragraph(n, source, &prefix))
        .collect();

    let max_id = root
        .descendants()
        .filter_map(|n| n.attribute((WORDML_NS, "id")))
        .filter_map(|id| id.parse::<u64>().ok())
        .max();

    debug!(paragraphs = paragraphs.len(), prefix = %prefix, "Parsed main part");

    Ok(ParsedBody {
        prefix,
        paragraphs,
        max_id,
    })
}

pub(crate) fn is_w(node: &Node, local: &str) -> bool {
    node.is_element() && node.tag_name().name() == local && node.tag_name().namespace() == Some(WORDML_NS)
}

fn raw<'a>(node: &Node, source: &'a str) -> &'a str {
    &source[node.range()]
}

/// Source slice of an element's start tag
fn open_tag<'a>(node: &Node, source: &'a str) -> &'a str {
    match node.first_child() {
        Some(child) => &source[node.range().start..child.range().start],
        None => raw(node, source),
    }
}

fn close_tag<'a>(node: &Node, source: &'a str) -> &'a str {
    match node.last_child() {
        Some(child) => &source[child.range().end..node.range().end],
        None => "",
    }
}

fn parse_paragraph(node: Node, source: &str, prefix: &str) -> Paragraph {
    let (open, close) = if node.has_children() {
        (open_tag(&node, source).to_string(), close_tag(&node, source).to_string())
    } else {
        // `<w:p/>`: reopen so runs can be emitted inside it
        let tag = raw(&node, source).trim_end_matches("/>").trim_end();
        (format!("{}>", tag), format!("</{}>", crate::qualified(prefix, "p")))
    };

    let mut runs = Vec::new();
    for child in node.children() {
        collect_inline(child, source, prefix, None, &mut runs);
    }

    Paragraph::from_source(open, close, node.range(), runs)
}

fn collect_inline(node: Node, source: &str, prefix: &str, revision: Option<&Revision>, out: &mut Vec<Run>) {
    if is_w(&node, "r") {
        parse_run(node, source, prefix, revision, out);
        return;
    }

    if revision.is_none() {
        if let Some(kind) = wrapper_kind(&node) {
            if is_simple_wrapper(&node) {
                let wrapper = Revision {
                    kind,
                    id: node.attribute((WORDML_NS, "id")).unwrap_or_default().to_string(),
                    author: node.attribute((WORDML_NS, "author")).unwrap_or_default().to_string(),
                    date: node.attribute((WORDML_NS, "date")).map(str::to_string),
                    source_tag: Some(open_tag(&node, source).to_string()),
                };
                for child in node.children() {
                    collect_inline(child, source, prefix, Some(&wrapper), out);
                }
                return;
            }
        }
    }

    out.push(Run::opaque(raw(&node, source).to_string(), revision.cloned()));
}

fn wrapper_kind(node: &Node) -> Option<RevisionKind> {
    if is_w(node, "ins") {
        Some(RevisionKind::Insertion)
    } else if is_w(node, "del") {
        Some(RevisionKind::Deletion)
    } else {
        None
    }
}

/// Wrappers with nested revisions or moves stay opaque
fn is_simple_wrapper(node: &Node) -> bool {
    node.has_children()
        && !node.descendants().skip(1).any(|d| {
            ["ins", "del", "moveFrom", "moveTo"]
                .iter()
                .any(|name| is_w(&d, name))
        })
}

fn parse_run(node: Node, source: &str, prefix: &str, revision: Option<&Revision>, out: &mut Vec<Run>) {
    if !node.has_children() {
        out.push(Run::opaque(raw(&node, source).to_string(), revision.cloned()));
        return;
    }

    let format = RunFormat {
        open_tag: open_tag(&node, source).to_string(),
        properties: node
            .children()
            .find(|c| is_w(c, "rPr"))
            .map(|c| raw(&c, source).to_string())
            .unwrap_or_default(),
    };
    let close = format!("</{}>", crate::qualified(prefix, "r"));

    for child in node.children().filter(|c| c.is_element()) {
        if is_w(&child, "rPr") {
            continue;
        }

        if is_w(&child, "t") || is_w(&child, "delText") {
            let text = child.text().unwrap_or("");
            if !text.is_empty() {
                out.push(Run::text(text, format.clone(), revision.cloned()));
            }
        } else if is_w(&child, "tab") {
            out.push(Run::symbol(raw(&child, source).to_string(), "\t", format.clone(), revision.cloned()));
        } else if is_w(&child, "br") || is_w(&child, "cr") {
            out.push(Run::symbol(raw(&child, source).to_string(), "\n", format.clone(), revision.cloned()));
        } else {
            let xml = format!("{}{}{}{}", format.open_tag, format.properties, raw(&child, source), close);
            out.push(Run::opaque(xml, revision.cloned()));
        }
    }
}

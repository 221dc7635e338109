//! Edit proposals as produced by the language-model layer.

use crate::EditorError;
use serde::{Deserialize, Serialize};

/// One proposed old → new text replacement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditProposal {
    /// Minimal exact span to change
    pub specific_old_text: String,

    /// Wider surrounding text used to disambiguate repeated occurrences
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contextual_old_text: Option<String>,

    #[serde(default)]
    pub new_text: String,

    #[serde(default)]
    pub reason: String,
}

impl EditProposal {
    pub fn new(specific_old_text: impl Into<String>, new_text: impl Into<String>) -> Self {
        Self {
            specific_old_text: specific_old_text.into(),
            contextual_old_text: None,
            new_text: new_text.into(),
            reason: String::new(),
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.contextual_old_text = Some(context.into());
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    /// Contextual text, if present and not blank
    pub fn context(&self) -> Option<&str> {
        self.contextual_old_text
            .as_deref()
            .filter(|c| !c.trim().is_empty())
    }

    pub fn validate(&self) -> Result<(), EditorError> {
        if self.specific_old_text.trim().is_empty() {
            return Err(EditorError::invalid_proposal("specific_old_text is empty"));
        }
        if let Some(c) = self.new_text.chars().find(|c| !is_xml_char(*c)) {
            return Err(EditorError::invalid_proposal(format!(
                "new_text contains U+{:04X}, which cannot be stored in a document",
                c as u32
            )));
        }
        Ok(())
    }
}

/// Characters allowed in XML 1.0 content
fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r' | '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}')
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ProposalFile {
    List(Vec<EditProposal>),
    Wrapped { edits: Vec<EditProposal> },
}

/// Parse proposals from JSON: a bare array or `{ "edits": [...] }`
pub fn parse_proposals(json: &str) -> Result<Vec<EditProposal>, EditorError> {
    let file: ProposalFile = serde_json::from_str(json)?;
    Ok(match file {
        ProposalFile::List(edits) | ProposalFile::Wrapped { edits } => edits,
    })
}

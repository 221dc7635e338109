//! Error types for the editor

use redline_docx::DocxError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Document error: {0}")]
    Document(#[from] DocxError),

    #[error("Invalid proposal: {0}")]
    InvalidProposal(String),

    #[error("Invalid proposals file: {0}")]
    ProposalFormat(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

impl EditorError {
    pub fn invalid_proposal(message: impl Into<String>) -> Self {
        Self::InvalidProposal(message.into())
    }
}

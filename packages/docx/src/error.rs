use thiserror::Error;

pub type DocxResult<T> = Result<T, DocxError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DocxError {
    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    #[error("Serialization failure: {0}")]
    SerializationFailure(String),

    #[error("Paragraph index out of range: {0}")]
    ParagraphOutOfRange(usize),
}

impl DocxError {
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedDocument(message.into())
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::SerializationFailure(message.into())
    }
}

impl From<zip::result::ZipError> for DocxError {
    fn from(e: zip::result::ZipError) -> Self {
        DocxError::MalformedDocument(format!("invalid package: {}", e))
    }
}

impl From<roxmltree::Error> for DocxError {
    fn from(e: roxmltree::Error) -> Self {
        DocxError::MalformedDocument(format!("invalid XML: {}", e))
    }
}

//! Error types for the text format.

use thiserror::Error;

/// Structured error types for reading and writing documents.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum YamlError {
    /// The text is not a well-formed document
    #[error("Syntax error at line {line}: {reason}")]
    Syntax { line: usize, reason: String },

    /// A plain or single-quoted scalar could not be decoded
    #[error("Invalid scalar: {0}")]
    Scalar(#[from] serde_yaml::Error),

    /// A double-quoted scalar could not be decoded
    #[error("Invalid quoted string: {0}")]
    Json(#[from] serde_json::Error),

    /// The document does not match the declared types
    #[error("Invalid document: {reason}")]
    Format { reason: String },

    /// Reading or writing a document file failed
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl YamlError {
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            YamlError::Syntax { .. }
                | YamlError::Scalar(_)
                | YamlError::Json(_)
                | YamlError::Format { .. }
        )
    }

    pub fn is_io_error(&self) -> bool {
        matches!(self, YamlError::Io { .. })
    }

    pub(crate) fn format(reason: impl Into<String>) -> Self {
        YamlError::Format {
            reason: reason.into(),
        }
    }
}

impl From<YamlError> for crate::Error {
    fn from(err: YamlError) -> Self {
        crate::Error::Yaml(err)
    }
}

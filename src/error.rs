//! Error types for the conversion pipeline.
//!
//! Only document-load failures and invalid caller configuration are fatal;
//! every per-page, per-item and per-image defect is absorbed by the stage
//! that observes it.

/// Result type alias for conversion operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while converting a document to Markdown.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The underlying PDF library failed to load or enumerate the document
    #[error("Failed to load document: {0}")]
    DocumentLoad(String),

    /// Caller configuration failed pre-flight validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A page could not be read from the document source
    #[error("Failed to read page {index}: {reason}")]
    Page {
        /// Zero-based page index
        index: usize,
        /// Reason reported by the document source
        reason: String,
    },

    /// Image record could not be decoded or re-encoded
    #[error("Image error: {0}")]
    Image(String),

    /// IO error (image save mode)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_load_error() {
        let err = Error::DocumentLoad("truncated xref".to_string());
        let msg = format!("{}", err);
        assert!(msg.contains("Failed to load document"));
        assert!(msg.contains("truncated xref"));
    }

    #[test]
    fn test_invalid_config_error() {
        let err = Error::InvalidConfig("save mode requires image_save_path".to_string());
        let msg = format!("{}", err);
        assert!(msg.contains("Invalid configuration"));
    }

    #[test]
    fn test_page_error() {
        let err = Error::Page {
            index: 3,
            reason: "missing content stream".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("page 3"));
        assert!(msg.contains("missing content stream"));
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Error>();
    }
}

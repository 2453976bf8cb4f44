/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, LumenError>;

/// Error type shared by the document codec, exporter, importer and the
/// preview session manager. Repository backends surface their failures
/// through [`LumenError::Repository`] so callers see them verbatim.
#[derive(Debug, thiserror::Error)]
pub enum LumenError {
    /// Generic I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed project document or stored payload
    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Repository backend failure
    #[error("repository error: {0}")]
    Repository(String),

    /// Referenced project does not exist
    #[error("project not found: {0}")]
    ProjectNotFound(String),

    /// Document file exceeds the configured size cap
    #[error("document too large: {size} bytes (limit {limit})")]
    FileTooLarge { size: u64, limit: u64 },

    /// Unsupported document schema version
    #[error("unsupported document version: {0}")]
    UnsupportedVersion(String),
}

impl LumenError {
    /// Creates a repository error with a custom message.
    pub fn repository(msg: impl Into<String>) -> Self {
        Self::Repository(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LumenError::ProjectNotFound("p1".to_string());
        assert_eq!(err.to_string(), "project not found: p1");

        let err = LumenError::FileTooLarge {
            size: 1024,
            limit: 500,
        };
        assert!(err.to_string().contains("1024"));
        assert!(err.to_string().contains("500"));
    }
}

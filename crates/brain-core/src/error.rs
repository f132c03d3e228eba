//! Error types for the second-brain service.

use thiserror::Error;

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type shared by every crate in the workspace.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource not found (or not owned by the caller)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Item not found for the given owner
    #[error("Item not found: {0}")]
    ItemNotFound(uuid::Uuid),

    /// Text generation failed
    #[error("Inference error: {0}")]
    Inference(String),

    /// Object storage rejected an upload or removal
    #[error("Storage error: {0}")]
    Storage(String),

    /// Messaging platform call failed (content download, reply)
    #[error("Messaging error: {0}")]
    Messaging(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// Authentication failed (bad signature, bad admin token)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}

impl Error {
    /// True for the "row does not exist under this owner" family.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_) | Error::ItemNotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_error_display_not_found() {
        let err = Error::NotFound("test resource".to_string());
        assert_eq!(err.to_string(), "Not found: test resource");
    }

    #[test]
    fn test_error_display_item_not_found() {
        let id = Uuid::nil();
        let err = Error::ItemNotFound(id);
        assert_eq!(err.to_string(), format!("Item not found: {}", id));
    }

    #[test]
    fn test_error_display_storage() {
        let err = Error::Storage("The resource already exists".to_string());
        assert_eq!(
            err.to_string(),
            "Storage error: The resource already exists"
        );
    }

    #[test]
    fn test_error_display_messaging() {
        let err = Error::Messaging("Failed to download image: Not Found".to_string());
        assert!(err.to_string().starts_with("Messaging error:"));
    }

    #[test]
    fn test_error_display_config() {
        let err = Error::Config("LINE_CHANNEL_SECRET is required".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration error: LINE_CHANNEL_SECRET is required"
        );
    }

    #[test]
    fn test_error_display_unauthorized() {
        let err = Error::Unauthorized("Invalid signature".to_string());
        assert_eq!(err.to_string(), "Unauthorized: Invalid signature");
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<i32>("not a number").unwrap_err();
        let err: Error = json_err.into();
        match err {
            Error::Serialization(msg) => assert!(!msg.is_empty()),
            _ => panic!("Expected Serialization error"),
        }
    }

    #[test]
    fn test_is_not_found() {
        assert!(Error::NotFound("x".into()).is_not_found());
        assert!(Error::ItemNotFound(Uuid::nil()).is_not_found());
        assert!(!Error::Internal("x".into()).is_not_found());
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }
}

//! Anthropic-specific error handling.

use brain_core::Error;

/// Anthropic error classes, keyed by HTTP status and error type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnthropicErrorCode {
    /// Invalid or missing API key.
    AuthenticationError,
    /// Key lacks access to the resource.
    PermissionError,
    /// Rate limit exceeded.
    RateLimitExceeded,
    /// API temporarily overloaded.
    Overloaded,
    /// Malformed request (bad model, too many tokens, ...).
    InvalidRequest,
    /// Server error.
    ServerError,
    /// Unknown error.
    Unknown,
}

impl AnthropicErrorCode {
    /// Determine error code from HTTP status and error type.
    pub fn from_response(status: u16, error_type: &str) -> Self {
        match (status, error_type) {
            (401, _) | (_, "authentication_error") => Self::AuthenticationError,
            (403, _) | (_, "permission_error") => Self::PermissionError,
            (429, _) | (_, "rate_limit_error") => Self::RateLimitExceeded,
            (529, _) | (_, "overloaded_error") => Self::Overloaded,
            (400, _) | (404, _) | (_, "invalid_request_error") => Self::InvalidRequest,
            (500..=599, _) => Self::ServerError,
            _ => Self::Unknown,
        }
    }
}

/// Convert an Anthropic error into the shared error type.
pub fn to_brain_error(code: AnthropicErrorCode, message: &str) -> Error {
    match code {
        AnthropicErrorCode::AuthenticationError | AnthropicErrorCode::PermissionError => {
            Error::Config(format!("Anthropic authentication failed: {}", message))
        }
        AnthropicErrorCode::RateLimitExceeded => {
            Error::Inference(format!("Rate limit exceeded: {}", message))
        }
        AnthropicErrorCode::Overloaded => Error::Inference(format!("API overloaded: {}", message)),
        AnthropicErrorCode::InvalidRequest => {
            Error::Inference(format!("Invalid request: {}", message))
        }
        AnthropicErrorCode::ServerError => Error::Inference(format!("Server error: {}", message)),
        AnthropicErrorCode::Unknown => Error::Inference(message.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_from_status() {
        assert_eq!(
            AnthropicErrorCode::from_response(401, "authentication_error"),
            AnthropicErrorCode::AuthenticationError
        );
        assert_eq!(
            AnthropicErrorCode::from_response(429, ""),
            AnthropicErrorCode::RateLimitExceeded
        );
        assert_eq!(
            AnthropicErrorCode::from_response(529, "overloaded_error"),
            AnthropicErrorCode::Overloaded
        );
        assert_eq!(
            AnthropicErrorCode::from_response(503, "api_error"),
            AnthropicErrorCode::ServerError
        );
        assert_eq!(
            AnthropicErrorCode::from_response(418, "teapot"),
            AnthropicErrorCode::Unknown
        );
    }

    #[test]
    fn test_auth_errors_map_to_config() {
        let err = to_brain_error(AnthropicErrorCode::AuthenticationError, "invalid x-api-key");
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_other_errors_map_to_inference() {
        let err = to_brain_error(AnthropicErrorCode::ServerError, "boom");
        assert_eq!(err.to_string(), "Inference error: Server error: boom");
    }
}

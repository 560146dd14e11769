//! Custom error types for paperharvest.
//!
//! All library functions return `Result<T, HarvestError>` instead of using `unwrap()`.

use thiserror::Error;

/// Main error type for paperharvest operations.
#[derive(Debug, Error)]
pub enum HarvestError {
    /// Network/HTTP request error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// External API returned a non-success status
    #[error("API error: {code} - {message}")]
    Api {
        /// HTTP status code
        code: u16,
        /// Error message
        message: String,
    },

    /// Response or document content could not be interpreted
    #[error("Parse error: {0}")]
    Parse(String),

    /// CSV serialization error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type alias using `HarvestError`
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Extension trait for adding context to Option types
pub trait OptionExt<T> {
    /// Convert Option to Result with a parse error message
    fn ok_or_parse(self, msg: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_parse(self, msg: &str) -> Result<T> {
        self.ok_or_else(|| HarvestError::Parse(msg.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_or_parse() {
        let missing: Option<u32> = None;
        match missing.ok_or_parse("no value") {
            Err(HarvestError::Parse(msg)) => assert_eq!(msg, "no value"),
            other => panic!("expected parse error, got {:?}", other),
        }
        assert!(matches!(Some(3).ok_or_parse("unused"), Ok(3)));
    }

    #[test]
    fn test_api_error_display() {
        let err = HarvestError::Api {
            code: 404,
            message: "Resource not found".to_string(),
        };
        assert_eq!(err.to_string(), "API error: 404 - Resource not found");
    }
}

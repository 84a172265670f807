// src/error.rs

//! Unified error handling for the course search application.

use std::fmt;

use thiserror::Error;

/// Result type alias for sugang operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// Endpoint answered with a non-success status
    #[error("HTTP {status}: {body}")]
    Fetch { status: u16, body: String },

    /// Every decode strategy failed for a downloaded table
    #[error("Failed to parse course table: {0}")]
    Parse(String),

    /// Scan finished every result page without finding the section
    #[error("row not found")]
    RowNotFound { subject: String, section: String },

    /// Browser automation fault, message passed through
    #[error("{0}")]
    Automation(String),

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// CSV export failed
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// XLSX export failed
    #[error("XLSX error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Input validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

impl AppError {
    /// Create a fetch error, keeping only the head of the response body.
    pub fn fetch(status: u16, body: &str) -> Self {
        Self::Fetch {
            status,
            body: body.chars().take(300).collect(),
        }
    }

    /// Create a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }

    /// Create a row-not-found error for a watchlist key.
    pub fn row_not_found(subject: impl Into<String>, section: impl Into<String>) -> Self {
        Self::RowNotFound {
            subject: subject.into(),
            section: section.into(),
        }
    }

    /// Wrap a browser automation failure.
    pub fn automation(message: impl fmt::Display) -> Self {
        Self::Automation(message.to_string())
    }

    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_truncates_body() {
        let body = "x".repeat(1000);
        match AppError::fetch(500, &body) {
            AppError::Fetch { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body.len(), 300);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_row_not_found_message() {
        let err = AppError::row_not_found("445.206", "999");
        assert_eq!(err.to_string(), "row not found");
    }
}

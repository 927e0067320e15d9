//! Request-level error types shared by the outer layers.
//!
//! Domain services report their own error enums; `AppError` covers what
//! happens before a request reaches them (malformed input, unknown routes)
//! and carries the same HTTP status and code vocabulary.

use thiserror::Error;

/// Application error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppError {
    /// A referenced resource does not exist.
    #[error("{resource} not found: {key}")]
    NotFound {
        /// Kind of resource.
        resource: &'static str,
        /// Key that was looked up.
        key: String,
    },

    /// Malformed or out-of-range input.
    #[error("Invalid request: {0}")]
    Validation(String),
}

impl AppError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::NotFound { .. } => 404,
            Self::Validation(_) => 400,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Validation(_) => "VALIDATION_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(AppError::NotFound { resource: "route", key: "/nope".into() }, 404, "NOT_FOUND")]
    #[case(AppError::Validation("bad date".into()), 400, "VALIDATION_ERROR")]
    fn test_status_and_code(#[case] err: AppError, #[case] status: u16, #[case] code: &str) {
        assert_eq!(err.status_code(), status);
        assert_eq!(err.error_code(), code);
    }

    #[test]
    fn test_display() {
        assert_eq!(
            AppError::Validation("as_of is required".into()).to_string(),
            "Invalid request: as_of is required"
        );
        assert_eq!(
            AppError::NotFound {
                resource: "route",
                key: "/api/v2".into()
            }
            .to_string(),
            "route not found: /api/v2"
        );
    }
}

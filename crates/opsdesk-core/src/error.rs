//! Error types for the opsdesk backend

use std::{error::Error as StdError, fmt};

/// Main error type shared by the opsdesk crates
#[derive(Debug)]
pub enum Error {
    /// I/O error
    Io(std::io::Error),

    /// Configuration error
    Configuration {
        /// Error message
        message: String,
    },

    /// Validation error
    Validation {
        /// Field that failed validation
        field: String,
        /// Validation error message
        message: String,
    },

    /// Not found error
    NotFound {
        /// Resource that was not found
        resource: String,
    },

    /// Conflicting state, e.g. a duplicate key
    Conflict {
        /// Conflict description
        message: String,
    },

    /// Serialization error
    Serialization(serde_json::Error),

    /// Export encoding error
    Export(String),

    /// Other error
    Other(String),
}

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Shorthand for a validation error on `field`
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Shorthand for a not-found error
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "I/O error: {err}"),
            Self::Configuration { message } => write!(f, "Configuration error: {message}"),
            Self::Validation { field, message } => {
                write!(f, "Validation error: {field} - {message}")
            }
            Self::NotFound { resource } => write!(f, "Resource not found: {resource}"),
            Self::Conflict { message } => write!(f, "Conflict: {message}"),
            Self::Serialization(err) => write!(f, "Serialization error: {err}"),
            Self::Export(msg) => write!(f, "Export error: {msg}"),
            Self::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Serialization(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err)
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(errors: validator::ValidationErrors) -> Self {
        let field = errors
            .field_errors()
            .keys()
            .next()
            .map_or_else(|| "__all__".to_string(), ToString::to_string);
        Self::Validation {
            field,
            message: errors.to_string(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io;

    #[test]
    fn test_io_error_conversion() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let app_error = Error::from(io_error);

        assert!(matches!(app_error, Error::Io(_)));
        assert!(app_error.to_string().contains("I/O error"));
        assert!(app_error.source().is_some());
    }

    #[test]
    fn test_validation_error() {
        let error = Error::validation("email", "must contain @");
        assert_eq!(error.to_string(), "Validation error: email - must contain @");
        assert!(error.source().is_none());
    }

    #[test]
    fn test_not_found_error() {
        let error = Error::not_found("user u-42");
        assert_eq!(error.to_string(), "Resource not found: user u-42");
    }

    #[test]
    fn test_serialization_error_conversion() {
        let json_error = serde_json::from_str::<serde_json::Value>("{oops}").unwrap_err();
        let app_error = Error::from(json_error);

        assert!(matches!(app_error, Error::Serialization(_)));
        assert!(app_error.source().is_some());
    }

    #[test]
    fn test_all_error_display_variants() {
        let cases = vec![
            (Error::Io(io::Error::other("disk")), "I/O error:"),
            (
                Error::Configuration {
                    message: "bad port".to_string(),
                },
                "Configuration error: bad port",
            ),
            (
                Error::Conflict {
                    message: "flag exists".to_string(),
                },
                "Conflict: flag exists",
            ),
            (Error::Export("csv writer".to_string()), "Export error: csv writer"),
            (Error::Other("plain".to_string()), "plain"),
        ];

        for (error, expected) in cases {
            let display = error.to_string();
            assert!(
                display.contains(expected),
                "'{display}' should contain '{expected}'"
            );
        }
    }
}

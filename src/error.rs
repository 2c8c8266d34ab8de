use thiserror::Error;

/// Structured error context for better error handling and debugging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// Field path or configuration key that caused the error (e.g., "currency_rules[1].pattern", "batch_size")
    pub field_path: Option<String>,
    /// Additional context about the error (e.g., expected range, actual value)
    pub details: Option<String>,
    /// Source of the error (e.g., "config_loader", "rate_provider")
    pub source: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self {
            field_path: None,
            details: None,
            source: None,
        }
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Unified error type for the donation analyzer.
///
/// Most failures in the pipeline are recovered where they happen (a bad
/// comment is skipped, a slow batch is abandoned, a failed rate fetch falls
/// back to a fixed table). The variants here are what is left to report.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    #[error("Validation error: {message}{}", format_context(.context))]
    Validation {
        message: String,
        context: ErrorContext,
    },

    /// The comment source could not produce comments at all.
    #[error("Comment source error: {message}{}", format_context(.context))]
    Source {
        message: String,
        context: ErrorContext,
    },

    /// A single comment could not be used (missing fields, undecodable line).
    #[error("Comment rejected: {message}{}", format_context(.context))]
    Comment {
        message: String,
        context: ErrorContext,
    },

    /// The exchange-rate source was unreachable or returned an unusable body.
    #[error("Rate fetch error: {message}{}", format_context(.context))]
    RateFetch {
        message: String,
        context: ErrorContext,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

// Helper function to format error context for display
fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

impl Error {
    /// Create a new configuration error with structured context
    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    /// Create a new validation error with structured context
    pub fn validation_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Validation {
            message: msg.into(),
            context,
        }
    }

    /// Create a new comment-source error with structured context
    pub fn source_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Source {
            message: msg.into(),
            context,
        }
    }

    /// Create a new rejected-comment error with structured context
    pub fn comment_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Comment {
            message: msg.into(),
            context,
        }
    }

    /// Create a new rate fetch error with structured context
    pub fn rate_fetch_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::RateFetch {
            message: msg.into(),
            context,
        }
    }

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Configuration { context, .. }
            | Error::Validation { context, .. }
            | Error::Source { context, .. }
            | Error::Comment { context, .. }
            | Error::RateFetch { context, .. } => Some(context),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_context() {
        let err = Error::validation_with_context(
            "batch_size must be at least 1",
            ErrorContext::new()
                .with_field_path("batch_size")
                .with_source("config_validator"),
        );
        assert_eq!(
            err.to_string(),
            "Validation error: batch_size must be at least 1 (field: batch_size, source: config_validator)"
        );
    }

    #[test]
    fn test_display_without_context() {
        let err = Error::source_with_context("stream closed", ErrorContext::new());
        assert_eq!(err.to_string(), "Comment source error: stream closed");
    }

    #[test]
    fn test_context_accessor() {
        let err = Error::comment_with_context(
            "missing author",
            ErrorContext::new().with_field_path("author"),
        );
        assert_eq!(
            err.context().and_then(|c| c.field_path.as_deref()),
            Some("author")
        );

        let io = Error::Io(std::io::Error::new(std::io::ErrorKind::Other, "boom"));
        assert!(io.context().is_none());
    }
}

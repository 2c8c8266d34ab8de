//! Comment records as delivered by a comment source.

use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};

/// A single comment.
///
/// Both fields are optional because sources routinely deliver partial
/// records; the batch processor drops those instead of failing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
}

impl Comment {
    pub fn new(text: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            author: Some(author.into()),
        }
    }

    /// A comment whose text could not be decoded.
    pub fn unreadable() -> Self {
        Self::default()
    }

    pub fn with_author(mut self, author: Option<String>) -> Self {
        self.author = author;
        self
    }

    /// Return `(text, author)` when the comment is usable for matching.
    ///
    /// `max_len` is measured in characters.
    pub fn usable_fields(&self, max_len: usize) -> Result<(&str, &str)> {
        let text = self.text.as_deref().unwrap_or_default();
        if text.is_empty() {
            return Err(Error::comment_with_context(
                "missing or empty text",
                ErrorContext::new().with_field_path("text"),
            ));
        }
        let author = self.author.as_deref().unwrap_or_default();
        if author.is_empty() {
            return Err(Error::comment_with_context(
                "missing or empty author",
                ErrorContext::new().with_field_path("author"),
            ));
        }
        let len = text.chars().count();
        if len > max_len {
            return Err(Error::comment_with_context(
                "text too long, treated as spam",
                ErrorContext::new()
                    .with_field_path("text")
                    .with_details(format!("{} chars > {}", len, max_len)),
            ));
        }
        Ok((text, author))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usable_comment() {
        let c = Comment::new("sent $5", "alice");
        assert_eq!(c.usable_fields(500).unwrap(), ("sent $5", "alice"));
    }

    #[test]
    fn test_missing_author_rejected() {
        let c = Comment::new("sent $5", "x").with_author(None);
        let err = c.usable_fields(500).unwrap_err();
        assert!(err.to_string().contains("author"));
    }

    #[test]
    fn test_empty_text_rejected() {
        assert!(Comment::new("", "bob").usable_fields(500).is_err());
        assert!(Comment::unreadable().usable_fields(500).is_err());
    }

    #[test]
    fn test_length_counts_chars_not_bytes() {
        // 500 rupee signs are 1500 bytes but exactly at the ceiling
        let text: String = "₹".repeat(500);
        assert!(Comment::new(text.clone(), "a").usable_fields(500).is_ok());
        let longer = format!("{}x", text);
        assert!(Comment::new(longer, "a").usable_fields(500).is_err());
    }

    #[test]
    fn test_deserialize_partial_record() {
        let c: Comment = serde_json::from_str(r#"{"text":"hi"}"#).unwrap();
        assert_eq!(c.text.as_deref(), Some("hi"));
        assert!(c.author.is_none());
    }
}

//! Donation records produced by the batch processor.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One donation amount found in one comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DonationRecord {
    /// Always positive and within the matching rule's maximum.
    pub amount: Decimal,
    /// ISO-style currency code, e.g. "USD".
    pub currency: String,
    /// The substring of the comment that matched, trimmed.
    pub matched_text: String,
    pub author: String,
}

impl DonationRecord {
    pub fn new(
        amount: Decimal,
        currency: impl Into<String>,
        matched_text: impl Into<String>,
        author: impl Into<String>,
    ) -> Self {
        Self {
            amount,
            currency: currency.into(),
            matched_text: matched_text.into(),
            author: author.into(),
        }
    }
}

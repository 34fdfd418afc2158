//! Sealed and plaintext shapes of a customer feedback record.

use chrono::{DateTime, Utc};

use crate::dek::WrappedDek;

/// One of the three sensitive fields carried by every record.
///
/// Variants are listed in the fixed order in which fields are sealed and opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Email,
    ContactNumber,
    FeedbackText,
}

impl Field {
    /// Processing order for seal and open.
    pub const ORDER: [Field; 3] = [Field::Email, Field::ContactNumber, Field::FeedbackText];

    /// Stable name, safe to log.
    pub fn as_str(self) -> &'static str {
        match self {
            Field::Email => "email",
            Field::ContactNumber => "contact_number",
            Field::FeedbackText => "feedback_text",
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decrypted customer feedback. Never persisted.
#[derive(Clone, PartialEq, Eq)]
pub struct PlaintextFeedback {
    pub email: String,
    pub contact_number: String,
    pub feedback: String,
}

impl PlaintextFeedback {
    pub fn new(
        email: impl Into<String>,
        contact_number: impl Into<String>,
        feedback: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            contact_number: contact_number.into(),
            feedback: feedback.into(),
        }
    }

    /// Borrow the value of `field`.
    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::Email => &self.email,
            Field::ContactNumber => &self.contact_number,
            Field::FeedbackText => &self.feedback,
        }
    }
}

impl std::fmt::Debug for PlaintextFeedback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PlaintextFeedback([REDACTED])")
    }
}

/// A sealed record, exactly as handed to the persistence layer.
///
/// Each field blob is a `nonce || tag || ciphertext` envelope produced with the
/// DEK inside `wrapped_dek`. `id` stays `None` until storage assigns one.
#[derive(Clone, PartialEq, Eq)]
pub struct FeedbackRecord {
    pub id: Option<i64>,
    pub wrapped_dek: WrappedDek,
    pub email: Vec<u8>,
    pub contact_number: Vec<u8>,
    pub feedback: Vec<u8>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FeedbackRecord {
    /// Borrow the sealed blob for `field`.
    pub fn envelope(&self, field: Field) -> &[u8] {
        match field {
            Field::Email => &self.email,
            Field::ContactNumber => &self.contact_number,
            Field::FeedbackText => &self.feedback,
        }
    }

    /// Return a copy of this record carrying a storage-assigned identity.
    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }
}

impl std::fmt::Debug for FeedbackRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedbackRecord")
            .field("id", &self.id)
            .field("wrapped_dek", &self.wrapped_dek)
            .field("email_len", &self.email.len())
            .field("contact_number_len", &self.contact_number.len())
            .field("feedback_len", &self.feedback.len())
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

use thiserror::Error;

/// Failure kinds an extractor reports to its caller.
///
/// Extractors return [`anyhow::Result`], these are carried inside
/// and can be told apart with [`anyhow::Error::downcast_ref`].
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("unable to download {resource} ({url}): {reason}")]
    Fetch {
        resource: String,
        url: String,
        reason: String,
    },

    #[error("malformed {resource}: {reason}")]
    MalformedMetadata { resource: String, reason: String },

    #[error("{resource} is missing the field {field}")]
    MissingField { resource: String, field: String },

    /// The page was fetched fine, there is just nothing to extract from it
    #[error("{0}")]
    NoContent(String),
}

impl ExtractionError {
    pub fn missing_field(resource: &str, field: &str) -> Self {
        ExtractionError::MissingField {
            resource: resource.to_string(),
            field: field.to_string(),
        }
    }

    pub fn malformed(resource: &str, reason: impl ToString) -> Self {
        ExtractionError::MalformedMetadata {
            resource: resource.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Whether this is an expected failure to be shown to the user as-is, rather than a bug
    pub fn is_expected(&self) -> bool {
        matches!(self, ExtractionError::NoContent(_))
    }
}

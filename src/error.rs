//! Error types for the crew desk.
//!
//! Every fallible desk operation returns [`DeskError`]. Validation failures
//! are raised before any backend request is issued; the remaining variants
//! describe what went wrong on the way to or back from the backend.

use thiserror::Error;

use crate::desk::NoticeKind;

/// Custom error type for desk operations.
///
/// - `#[error("...")]` is the Display text used in logs
/// - `#[from]` lets `?` convert library errors automatically
/// - [`DeskError::notice`] gives the operator-facing rendition
#[derive(Debug, Error)]
pub enum DeskError {
    /// Error reading a local file (templates, uploads).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The backend answered with a body that is not the expected JSON.
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Transport-level failure talking to the backend.
    #[error("HTTP request error: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// The backend answered, but not in a shape we understand.
    #[error("Invalid API response: {0}")]
    InvalidApiResponse(String),

    /// The backend answered `success: false`.
    #[error("Backend rejected the request: {0}")]
    Rejected(String),

    /// Input refused before any request was issued.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Input refused because it is already present.
    #[error("Already present: {0}")]
    Duplicate(String),

    /// Another request of the same workflow is still outstanding.
    #[error("Request already in progress: {0}")]
    Busy(&'static str),
}

impl DeskError {
    /// Whether the error happened below the JSON envelope, i.e. the backend
    /// could not be reached or did not speak JSON.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            DeskError::HttpRequest(_) | DeskError::JsonParse(_) | DeskError::InvalidApiResponse(_)
        )
    }

    /// Notification kind and text shown to the operator.
    pub fn notice(&self) -> (NoticeKind, String) {
        match self {
            DeskError::Validation(msg) => (NoticeKind::Error, msg.clone()),
            DeskError::Duplicate(msg) => (NoticeKind::Warning, msg.clone()),
            DeskError::Busy(what) => (
                NoticeKind::Warning,
                format!("{} already in progress, please wait", what),
            ),
            DeskError::Rejected(msg) => (NoticeKind::Error, format!("Error: {}", msg)),
            DeskError::Io(e) => (NoticeKind::Error, format!("Error: {}", e)),
            DeskError::HttpRequest(e) => (NoticeKind::Error, format!("Network error: {}", e)),
            DeskError::JsonParse(e) => (NoticeKind::Error, format!("Network error: {}", e)),
            DeskError::InvalidApiResponse(msg) => {
                (NoticeKind::Error, format!("Network error: {}", msg))
            }
        }
    }
}

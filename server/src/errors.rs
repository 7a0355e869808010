use thiserror::Error;
use uuid::Uuid;
use warp::reject;

/// Enumerates high-level errors returned by this library.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Represents an SQL error.
    #[error("SQLx error")]
    Sqlx { source: sqlx::Error },

    /// Represents an error with the request.
    #[error("Bad request")]
    BadRequest,

    /// Represents a path parameter that could not be parsed as an ID.
    #[error("Invalid ID: {0}")]
    InvalidId(String),

    /// Represents an operation against a submission that does not exist.
    #[error("Non-existent submission: {0}")]
    NonExistentId(Uuid),

    /// Represents a submission rejected at the boundary before any write.
    #[error("Malformed submission: {0}")]
    MalformedSubmission(String),

    /// Represents a request for an unknown aggregation dimension.
    #[error("Unknown statistics dimension: {0}")]
    UnknownDimension(String),

    /// Represents a daily window length outside the supported set.
    #[error("Unsupported window length: {0} days")]
    UnsupportedWindow(u16),

    /// Represents a missing or invalid dashboard token.
    #[error("Missing or invalid dashboard token")]
    Unauthorized,

    /// Represents a transport-level failure talking to the AI service.
    #[error("AI service request failed")]
    AiRequest { source: reqwest::Error },

    /// Represents a response from the AI service that could not be used.
    #[error("Unusable AI response: {0}")]
    AiResponse(String),

    /// Represents a recipient address that could not be parsed.
    #[error("Invalid email address")]
    InvalidEmailAddress,

    /// Represents a confirmation email that could not be constructed.
    #[error("Failed to build email")]
    EmailBuild { source: lettre::error::Error },

    /// Represents a transport-level failure sending a confirmation email.
    #[error("Failed to send email")]
    EmailSend {
        source: lettre::transport::smtp::Error,
    },
}

impl reject::Reject for BackendError {}

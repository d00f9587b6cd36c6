//! HTTP adapter error types.

use daylux_domain::error::LookupError;

/// Errors specific to the HTTP lookup adapters.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    /// The request could not be sent or the body could not be read.
    #[error("HTTP request failed")]
    Request(#[from] reqwest::Error),

    /// The server answered with a non-success status code.
    #[error("unexpected HTTP status {0}")]
    Status(reqwest::StatusCode),

    /// The body is not the expected JSON document.
    #[error("failed to parse response body")]
    Body(#[source] serde_json::Error),

    /// The service answered but reported a failure in its payload.
    #[error("service reported status {0:?}")]
    Service(String),

    /// A required field is missing or cannot be interpreted.
    #[error("response field `{0}` is missing or invalid")]
    Field(&'static str),
}

impl HttpError {
    /// Convert into a [`LookupError`] for propagation across port boundaries.
    pub fn into_domain(self) -> LookupError {
        match self {
            Self::Status(code) => LookupError::Status {
                status: code.to_string(),
            },
            Self::Service(status) => LookupError::Status { status },
            Self::Field(field) => LookupError::Malformed { field },
            other => LookupError::Unreachable(Box::new(other)),
        }
    }
}

impl From<HttpError> for LookupError {
    fn from(err: HttpError) -> Self {
        err.into_domain()
    }
}

//! Error types for the Spotify Web API and the authorization flow

use thiserror::Error;

/// Why an authenticated call was refused before reaching the network
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingCredential {
    /// No access token has ever been stored
    Missing,
    /// A token exists but its expiry has passed
    Expired,
}

/// Failure of a single Web API request
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not authenticated ({0:?})")]
    Unauthenticated(MissingCredential),

    #[error("{status}: {body}")]
    Http { status: u16, body: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Network error: {0}")]
    Network(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Network(err.to_string())
        }
    }
}

/// Bad input from the panel, rejected before any request is issued
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Invalid skip count: must be a positive integer greater than zero")]
    SkipCountNotPositive,

    #[error("Cannot skip more than {max} tracks at once")]
    SkipCountTooLarge { max: u32 },

    #[error("Invalid parameters for playFromQueue: missing track URI")]
    MissingTrackUri,

    #[error("Invalid parameters for playFromQueue: queue URIs must be a list")]
    QueueUrisNotSequence,
}

/// Failure of the authorization-code exchange or its preconditions
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("No Spotify client ID configured")]
    MissingClientId,

    #[error("Authorization flow is not waiting for a code")]
    InvalidState,

    #[error("Authorization code is empty")]
    EmptyCode,

    #[error("Token exchange failed: {body}")]
    Exchange { body: String },

    #[error("Token exchange failed: {0}")]
    Network(String),

    #[error("Token exchange returned an unexpected body: {0}")]
    MalformedTokenResponse(String),

    #[error("Failed to store credential: {0}")]
    Storage(String),
}

/// Failure of a user-initiated panel command
#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

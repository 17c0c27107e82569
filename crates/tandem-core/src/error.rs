//! Error types for tandem-core

use thiserror::Error;

use crate::auth::AuthError;

/// Result type alias using tandem-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in tandem-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// A required local field is missing or malformed; never sent to the gateway
    #[error("Invalid input: {0}")]
    Validation(String),

    /// The gateway rejected the call or could not be reached
    #[error("Remote error: {0}")]
    Remote(String),

    /// The gateway no longer recognizes the id
    #[error("Not found: {0}")]
    NotFound(String),

    /// A mutation for the same target is still submitting
    #[error("A change is already being saved: {0}")]
    MutationInFlight(String),

    /// Authentication error
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// HTTP transport error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Whether the failure came from the remote side of the boundary.
    ///
    /// `NotFound` counts as remote: the local store converges on the next load.
    #[must_use]
    pub const fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_) | Self::NotFound(_) | Self::Http(_))
    }

    /// Short text suitable for a user-facing notification.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::NotFound(_) => {
                "This item no longer exists. Refresh to see the latest data.".to_string()
            }
            Self::MutationInFlight(_) => {
                "Please wait until the current change is saved.".to_string()
            }
            Self::Auth(error) => error.to_string(),
            Self::Config(message) => format!("The app is not configured: {message}"),
            Self::Remote(_) | Self::Http(_) | Self::Serialization(_) => {
                "The change could not be saved. Please try again.".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_is_a_remote_error() {
        assert!(Error::NotFound("goal".to_string()).is_remote());
        assert!(Error::Remote("boom".to_string()).is_remote());
        assert!(!Error::Validation("title".to_string()).is_remote());
        assert!(!Error::MutationInFlight("goal".to_string()).is_remote());
    }

    #[test]
    fn validation_message_is_shown_verbatim() {
        let error = Error::Validation("Title is required".to_string());
        assert_eq!(error.user_message(), "Title is required");
    }
}

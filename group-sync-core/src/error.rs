//! Error types for the sync engine.

use std::fmt;

use thiserror::Error;

/// One structural problem found while validating a provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("could not find '{key}' key in credential")]
    MissingSecretKey { key: String },

    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    #[error("invalid url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("credential unavailable: {0}")]
    CredentialUnavailable(String),
}

/// Every validation problem of one provider, reported together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors(pub Vec<ValidationError>);

impl ValidationErrors {
    /// `None` when there is nothing to report.
    pub fn from_vec(errors: Vec<ValidationError>) -> Option<Self> {
        if errors.is_empty() {
            None
        } else {
            Some(Self(errors))
        }
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.0
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let [single] = self.0.as_slice() {
            return write!(f, "{single}");
        }
        write!(f, "[")?;
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{err}")?;
        }
        write!(f, "]")
    }
}

impl std::error::Error for ValidationErrors {}

/// A listing call against the directory failed.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} returned {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

/// The single authentication attempt failed.
#[derive(Debug, Error)]
pub enum AuthenticationError {
    #[error("failed to build HTTP client: {0}")]
    Client(String),

    #[error("token request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("token endpoint returned {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("credential is missing '{0}'")]
    MissingSecret(String),
}

/// What the orchestrator returns when a provider's run fails.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("validation failed for provider '{provider}': {errors}")]
    Validation {
        provider: String,
        errors: ValidationErrors,
    },

    #[error("authentication failed for provider '{provider}': {source}")]
    Authentication {
        provider: String,
        #[source]
        source: AuthenticationError,
    },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("invalid provider url '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("provider '{0}' has not been bound; call bind before sync")]
    NotBound(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregate_lists_every_cause() {
        let errors = ValidationErrors(vec![
            ValidationError::MissingSecretKey {
                key: "username".into(),
            },
            ValidationError::MissingField("realm"),
        ]);

        assert_eq!(
            errors.to_string(),
            "[could not find 'username' key in credential, missing required field 'realm']"
        );
    }

    #[test]
    fn empty_aggregate_is_none() {
        assert!(ValidationErrors::from_vec(Vec::new()).is_none());
    }
}

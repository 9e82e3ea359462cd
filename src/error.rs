//! Error types for the cdn-url-auth library.

use thiserror::Error;

/// Result type alias for cdn-url-auth operations
pub type AuthResult<T> = Result<T, AuthError>;

/// Token, URL and configuration errors
#[derive(Debug, Error)]
pub enum AuthError {
    /// Token format is invalid (too few fields, non-numeric expiry, oversize)
    #[error("Malformed token: {0}")]
    MalformedToken(String),

    /// Token expiry lies in the past
    #[error("Token has expired")]
    Expired,

    /// Recomputed digest does not match the supplied signature
    #[error("Token signature mismatch")]
    SignatureMismatch,

    /// No secret is configured for the resource domain
    #[error("No secret configured for domain: {0}")]
    UnknownDomain(String),

    /// URL could not be parsed
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Domain name is syntactically invalid
    #[error("Invalid domain: {0}")]
    InvalidDomain(String),

    /// Nonce is not a valid token nonce
    #[error("Invalid nonce: {0}")]
    InvalidNonce(String),

    /// Configuration value is invalid
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl AuthError {
    /// Returns true if this error indicates the token itself is invalid
    /// (as opposed to expired)
    pub fn is_invalid_token(&self) -> bool {
        matches!(
            self,
            AuthError::MalformedToken(_) | AuthError::SignatureMismatch | AuthError::InvalidNonce(_)
        )
    }

    /// Returns true if this error is due to expiration
    pub fn is_expired(&self) -> bool {
        matches!(self, AuthError::Expired)
    }

    /// Returns true if the URL should simply be left unsigned
    pub fn is_unprotected(&self) -> bool {
        matches!(self, AuthError::UnknownDomain(_))
    }

    /// Returns the HTTP status code an enforcing edge would answer with.
    ///
    /// Every token failure is a uniform 403, the same denial a CDN gives
    /// for a bad `auth_key`.
    pub fn http_status_code(&self) -> u16 {
        match self {
            AuthError::MalformedToken(_) => 403,
            AuthError::Expired => 403,
            AuthError::SignatureMismatch => 403,
            AuthError::InvalidNonce(_) => 403,
            AuthError::UnknownDomain(_) => 404,
            AuthError::InvalidUrl(_) => 400,
            AuthError::InvalidDomain(_) => 400,
            AuthError::InvalidConfig(_) => 500,
        }
    }
}

impl From<url::ParseError> for AuthError {
    fn from(err: url::ParseError) -> Self {
        AuthError::InvalidUrl(err.to_string())
    }
}

//! Token signing and verification.
//!
//! Tokens follow the CDN `auth_key` contract:
//!
//! ```text
//! token     = expiry "-" rand "-" uid "-" md5hex
//! md5hex    = lowercase hex( MD5( path "-" expiry "-" rand "-" uid "-" secret ) )
//! ```
//!
//! `expiry` is the Unix second after which the token is refused, `rand` a
//! 32 character alphanumeric nonce and `uid` is always `0`. Signatures are
//! compared in constant time.

use std::fmt;
use std::str::FromStr;

use md5::{Digest, Md5};
use rand::distributions::Alphanumeric;
use rand::Rng;
use subtle::ConstantTimeEq;

use crate::error::{AuthError, AuthResult};
use crate::validation::validate_nonce;
use crate::{DEFAULT_DURATION_SECS, MAX_TOKEN_LENGTH, NONCE_LENGTH, TOKEN_UID};

/// A parsed or freshly issued `auth_key` token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthToken {
    /// Expiry instant (Unix seconds). The token is valid while `now <= expires_at`.
    pub expires_at: i64,

    /// Per-token random nonce
    pub nonce: String,

    /// Reserved per-user field, always 0 for issued tokens
    pub uid: u64,

    /// Lowercase hex MD5 digest
    pub signature: String,
}

impl AuthToken {
    /// Build a token for `path` from explicit parts.
    ///
    /// This is the deterministic core of [`TokenSigner::sign`]; it is public
    /// so that fixed fixtures can be reproduced exactly.
    ///
    /// ```rust
    /// use cdn_url_auth::AuthToken;
    ///
    /// let token = AuthToken::issue("/img/a.jpg", b"s3cr3t", 2000000000, "A".repeat(32));
    /// assert_eq!(token.signature, "2a3cc425798257a91c8d21580df1c057");
    /// ```
    pub fn issue(
        path: &str,
        secret: impl AsRef<[u8]>,
        expires_at: i64,
        nonce: impl Into<String>,
    ) -> Self {
        let nonce = nonce.into();
        let signature = compute_signature(path, expires_at, &nonce, TOKEN_UID, secret.as_ref());
        Self {
            expires_at,
            nonce,
            uid: TOKEN_UID,
            signature,
        }
    }

    /// Parse a token string.
    ///
    /// The string is split on `-`; the first three fields are expiry, nonce
    /// and uid, everything after the third dash is the signature.
    pub fn parse(token: &str) -> AuthResult<Self> {
        if token.len() > MAX_TOKEN_LENGTH {
            return Err(AuthError::MalformedToken(format!(
                "Token exceeds maximum length of {} bytes",
                MAX_TOKEN_LENGTH
            )));
        }

        let mut parts = token.splitn(4, '-');
        let (Some(expiry), Some(nonce), Some(uid), Some(signature)) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(AuthError::MalformedToken(
                "Token must have format: expiry-rand-uid-signature".to_string(),
            ));
        };

        let expires_at = parse_canonical::<i64>(expiry, "expiry")?;
        let uid = parse_canonical::<u64>(uid, "uid")?;

        Ok(Self {
            expires_at,
            nonce: nonce.to_string(),
            uid,
            signature: signature.to_string(),
        })
    }

    /// Check that the token looks like one this crate issues: a 32
    /// character alphanumeric nonce and uid 0.
    ///
    /// Verification does not require this.
    pub fn validate(&self) -> AuthResult<()> {
        validate_nonce(&self.nonce)?;
        if self.uid != TOKEN_UID {
            return Err(AuthError::MalformedToken(format!(
                "Token uid must be {}, got {}",
                TOKEN_UID, self.uid
            )));
        }
        Ok(())
    }

    /// The exact string whose MD5 digest is the signature.
    pub fn signing_string(&self, path: &str, secret: &str) -> String {
        format!(
            "{}-{}-{}-{}-{}",
            normalize_path(path),
            self.expires_at,
            self.nonce,
            self.uid,
            secret
        )
    }

    /// Check if the token has expired at the given instant (Unix seconds).
    ///
    /// The expiry second itself is still valid.
    pub fn is_expired_at(&self, now: i64) -> bool {
        now > self.expires_at
    }

    /// Check if the token has expired
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(now_unix())
    }

    /// Get the remaining validity time in seconds
    pub fn remaining_seconds(&self) -> i64 {
        (self.expires_at - now_unix()).max(0)
    }

    /// Recompute the digest for `path` and compare it in constant time.
    pub fn matches(&self, path: &str, secret: impl AsRef<[u8]>) -> bool {
        let expected = compute_signature(
            path,
            self.expires_at,
            &self.nonce,
            self.uid,
            secret.as_ref(),
        );
        expected.as_bytes().ct_eq(self.signature.as_bytes()).into()
    }
}

impl fmt::Display for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}-{}",
            self.expires_at, self.nonce, self.uid, self.signature
        )
    }
}

impl FromStr for AuthToken {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Issues tokens for one secret.
///
/// # Example
///
/// ```rust
/// use cdn_url_auth::{TokenSigner, TokenVerifier};
///
/// let signer = TokenSigner::new("your_secret_key").with_duration(600);
/// let token = signer.sign("/img/a.jpg");
///
/// let verifier = TokenVerifier::new("your_secret_key");
/// assert!(verifier.verify("/img/a.jpg", &token));
/// ```
#[derive(Clone)]
pub struct TokenSigner {
    secret: Vec<u8>,
    /// Validity window in seconds (default: 1800)
    pub duration_secs: i64,
}

impl TokenSigner {
    /// Create a signer with the default validity window.
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
            duration_secs: DEFAULT_DURATION_SECS,
        }
    }

    /// Set the validity window in seconds.
    ///
    /// A negative window issues tokens that are already expired.
    pub fn with_duration(mut self, seconds: i64) -> Self {
        self.duration_secs = seconds;
        self
    }

    /// Issue a token for `path` and return its wire form.
    pub fn sign(&self, path: &str) -> String {
        self.issue(path).to_string()
    }

    /// Issue a token for `path`, expiring `duration_secs` from now.
    pub fn issue(&self, path: &str) -> AuthToken {
        self.issue_at(path, now_unix())
    }

    /// Issue a token as if the current time were `now`.
    pub fn issue_at(&self, path: &str, now: i64) -> AuthToken {
        let expires_at = now.saturating_add(self.duration_secs);
        AuthToken::issue(path, &self.secret, expires_at, generate_nonce())
    }
}

impl fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSigner")
            .field("secret", &"<redacted>")
            .field("duration_secs", &self.duration_secs)
            .finish()
    }
}

/// Verifies tokens for one secret.
///
/// [`verify`](Self::verify) collapses every failure to `false`;
/// [`check`](Self::check) reports which rule rejected the token.
#[derive(Clone)]
pub struct TokenVerifier {
    secret: Vec<u8>,
}

impl TokenVerifier {
    /// Create a verifier for the given secret.
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
        }
    }

    /// Returns true if `token` is a valid, unexpired token for `path`.
    pub fn verify(&self, path: &str, token: &str) -> bool {
        self.check(path, token).is_ok()
    }

    /// Same as [`verify`](Self::verify) with an explicit clock reading.
    pub fn verify_at(&self, path: &str, token: &str, now: i64) -> bool {
        self.check_at(path, token, now).is_ok()
    }

    /// Verify a token and return the parsed token.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the token has fewer than four dash-separated fields, a non-numeric
    ///   expiry or uid, or exceeds the maximum length
    /// - the expiry lies in the past
    /// - the signature does not match
    pub fn check(&self, path: &str, token: &str) -> AuthResult<AuthToken> {
        self.check_at(path, token, now_unix())
    }

    /// Same as [`check`](Self::check) with an explicit clock reading.
    pub fn check_at(&self, path: &str, token: &str, now: i64) -> AuthResult<AuthToken> {
        let parsed = AuthToken::parse(token).inspect_err(|e| {
            tracing::debug!(path = %path, error = %e, "Rejecting malformed token");
        })?;

        if parsed.is_expired_at(now) {
            tracing::debug!(
                path = %path,
                expires_at = parsed.expires_at,
                now,
                "Rejecting expired token"
            );
            return Err(AuthError::Expired);
        }

        if !parsed.matches(path, &self.secret) {
            tracing::debug!(path = %path, "Rejecting token with bad signature");
            return Err(AuthError::SignatureMismatch);
        }

        Ok(parsed)
    }
}

impl fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenVerifier")
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Issue a token for `path` valid for `duration_secs` seconds.
pub fn sign_token(path: &str, secret: &str, duration_secs: i64) -> String {
    TokenSigner::new(secret).with_duration(duration_secs).sign(path)
}

/// Returns true if `token` is valid for `path` under `secret` right now.
pub fn verify_token(path: &str, token: &str, secret: &str) -> bool {
    TokenVerifier::new(secret).verify(path, token)
}

/// Lowercase hex MD5 of `path-expiry-nonce-uid-secret`.
pub fn compute_signature(
    path: &str,
    expires_at: i64,
    nonce: &str,
    uid: u64,
    secret: &[u8],
) -> String {
    let mut hasher = Md5::new();
    hasher.update(normalize_path(path).as_bytes());
    hasher.update(format!("-{}-{}-{}-", expires_at, nonce, uid).as_bytes());
    hasher.update(secret);
    hex::encode(hasher.finalize())
}

/// Draw a fresh alphanumeric nonce from the thread-local generator.
pub fn generate_nonce() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(NONCE_LENGTH)
        .map(char::from)
        .collect()
}

/// An empty path signs as `/`.
fn normalize_path(path: &str) -> &str {
    if path.is_empty() {
        "/"
    } else {
        path
    }
}

/// Parse a number, refusing spellings that would hash differently from
/// what the signer produced (`+5`, `007`).
fn parse_canonical<T>(field: &str, name: &str) -> AuthResult<T>
where
    T: FromStr + ToString,
{
    let value = field
        .parse::<T>()
        .map_err(|_| AuthError::MalformedToken(format!("Token {} is not a number", name)))?;
    if value.to_string() != field {
        return Err(AuthError::MalformedToken(format!(
            "Token {} is not in canonical form",
            name
        )));
    }
    Ok(value)
}

fn now_unix() -> i64 {
    chrono::Utc::now().timestamp()
}

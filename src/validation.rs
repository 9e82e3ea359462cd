//! Input validation for configuration values and token fields.

use crate::error::{AuthError, AuthResult};
use crate::{MAX_DOMAIN_LENGTH, NONCE_LENGTH};

/// Validate a resource domain name from the key configuration.
///
/// Domains must:
/// - Be between 1 and 253 characters
/// - Consist of dot separated labels of letters, digits and hyphens
/// - Not start or end a label with a hyphen
///
/// Ports are rejected: URL hosts are matched without their port, and the
/// key list splits each line on its first `:`.
///
/// # Examples
///
/// ```rust
/// use cdn_url_auth::validate_domain;
///
/// assert!(validate_domain("cdn.example.com").is_ok());
///
/// assert!(validate_domain("").is_err());
/// assert!(validate_domain("localhost:8080").is_err());
/// assert!(validate_domain("bad_host.example.com").is_err());
/// ```
pub fn validate_domain(domain: &str) -> AuthResult<()> {
    if domain.is_empty() {
        return Err(AuthError::InvalidDomain(
            "Domain cannot be empty".to_string(),
        ));
    }

    if domain.contains(':') {
        return Err(AuthError::InvalidDomain(format!(
            "Domain '{}' must not carry a port",
            domain
        )));
    }

    if domain.len() > MAX_DOMAIN_LENGTH {
        return Err(AuthError::InvalidDomain(format!(
            "Domain exceeds maximum length of {} characters",
            MAX_DOMAIN_LENGTH
        )));
    }

    for label in domain.split('.') {
        if label.is_empty() {
            return Err(AuthError::InvalidDomain(format!(
                "Domain '{}' contains an empty label",
                domain
            )));
        }

        // DNS label limit
        if label.len() > 63 {
            return Err(AuthError::InvalidDomain(
                "Domain label exceeds 63 characters".to_string(),
            ));
        }

        if label.starts_with('-') || label.ends_with('-') {
            return Err(AuthError::InvalidDomain(format!(
                "Domain '{}' has a label starting or ending with hyphen",
                domain
            )));
        }

        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(AuthError::InvalidDomain(format!(
                "Domain '{}' contains invalid characters",
                domain
            )));
        }
    }

    Ok(())
}

/// Validate a token nonce.
///
/// Issued nonces are exactly 32 ASCII letters and digits. Verification does
/// not require this; it is for inspecting tokens from other issuers.
pub fn validate_nonce(nonce: &str) -> AuthResult<()> {
    if nonce.len() != NONCE_LENGTH {
        return Err(AuthError::InvalidNonce(format!(
            "Nonce must be {} characters, got {}",
            NONCE_LENGTH,
            nonce.len()
        )));
    }

    if !nonce.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(AuthError::InvalidNonce(
            "Nonce contains invalid characters".to_string(),
        ));
    }

    Ok(())
}

/// Validate a query parameter name.
///
/// The name is inserted into URLs without encoding, so only unreserved
/// characters are allowed.
pub fn validate_param_name(name: &str) -> AuthResult<()> {
    if name.is_empty() {
        return Err(AuthError::InvalidConfig(
            "Query parameter name cannot be empty".to_string(),
        ));
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '~'))
    {
        return Err(AuthError::InvalidConfig(format!(
            "Query parameter name '{}' contains invalid characters",
            name
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_domains() {
        assert!(validate_domain("cdn.example.com").is_ok());
        assert!(validate_domain("static-1.example.org").is_ok());
        assert!(validate_domain("localhost").is_ok());
        assert!(validate_domain("127.0.0.1").is_ok());
    }

    #[test]
    fn test_invalid_domains() {
        // Empty
        assert!(validate_domain("").is_err());

        // Empty label
        assert!(validate_domain("cdn..example.com").is_err());

        // Hyphen at label edge
        assert!(validate_domain("-cdn.example.com").is_err());
        assert!(validate_domain("cdn-.example.com").is_err());

        // Invalid characters
        assert!(validate_domain("cdn example.com").is_err());
        assert!(validate_domain("https://cdn.example.com").is_err());

        // Ports
        assert!(validate_domain("cdn.example.com:http").is_err());
        assert!(validate_domain("localhost:8080").is_err());

        // Too long
        let long_domain = format!("{}.com", "a.".repeat(200));
        assert!(validate_domain(&long_domain).is_err());
    }

    #[test]
    fn test_nonces() {
        assert!(validate_nonce(&"A".repeat(32)).is_ok());
        assert!(validate_nonce("0123456789abcdefghijABCDEFGHIJkl").is_ok());

        assert!(validate_nonce("").is_err());
        assert!(validate_nonce(&"a".repeat(31)).is_err());
        assert!(validate_nonce(&format!("{}!", "a".repeat(31))).is_err());
    }

    #[test]
    fn test_param_names() {
        assert!(validate_param_name("auth_key").is_ok());
        assert!(validate_param_name("sign").is_ok());

        assert!(validate_param_name("").is_err());
        assert!(validate_param_name("auth key").is_err());
        assert!(validate_param_name("a=b").is_err());
    }
}

//! Signing and checking whole resource URLs.
//!
//! [`UrlAuthenticator`] is what a page rewriter or an edge function talks
//! to: it decides whether a URL is protected, picks the domain's secret,
//! derives the signed path and places the token in the query string.
//!
//! Resource suffixes (CDN processing directives such as `/thumb`) are cut
//! from the end of the path before signing and re-attached after the token:
//!
//! ```text
//! https://cdn.example.com/a.jpg/thumb
//!   -> signs "/a.jpg"
//!   -> https://cdn.example.com/a.jpg?auth_key=<token>/thumb
//! ```

use url::{form_urlencoded, Url};

use crate::config::{AuthConfig, ParamName};
use crate::error::{AuthError, AuthResult};
use crate::keys::{DomainKeyStore, ExtensionSet};
use crate::token::{TokenSigner, TokenVerifier};
use crate::validation::validate_param_name;

/// Signs and verifies URLs for every configured domain.
///
/// # Example
///
/// ```rust
/// use cdn_url_auth::{AuthConfig, UrlAuthenticator};
///
/// let config = AuthConfig::default().with_domain_keys("cdn.example.com:your_secret_key");
/// let auth = UrlAuthenticator::new(&config);
///
/// let signed = auth.sign_url("https://cdn.example.com/img/a.jpg").unwrap().unwrap();
/// assert!(signed.starts_with("https://cdn.example.com/img/a.jpg?auth_key="));
/// assert!(auth.verify_url(&signed));
///
/// // Other hosts are left alone
/// assert_eq!(auth.sign_url("https://www.example.com/a.jpg").unwrap(), None);
/// ```
#[derive(Debug, Clone)]
pub struct UrlAuthenticator {
    keys: DomainKeyStore,
    extensions: ExtensionSet,
    suffixes: Vec<String>,
    duration_secs: i64,
    param_name: ParamName,
}

impl UrlAuthenticator {
    /// Build an authenticator from a configuration snapshot.
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            keys: config.domain_key_store(),
            extensions: config.extension_set(),
            suffixes: config.resource_suffix_list(),
            duration_secs: config.duration,
            param_name: config.param_name,
        }
    }

    /// Secret for `domain`, or `None` if the domain is not protected.
    ///
    /// Matching ignores ASCII case.
    pub fn resolve_secret(&self, domain: &str) -> Option<&str> {
        self.keys.lookup(domain)
    }

    /// Query parameter the token is placed in.
    pub fn param_name(&self) -> ParamName {
        self.param_name
    }

    /// Returns true if the absolute `url` should carry a token but does not.
    pub fn needs_auth(&self, url: &str) -> bool {
        let parts = UrlParts::split(url);
        let Ok(host) = parts.host() else {
            return false;
        };
        let (base, _) = self.split_suffix(parts.path);

        self.extensions.matches(base)
            && !parts.has_param(self.param_name.as_str())
            && self.keys.contains(&host)
    }

    /// Split `path` into the signed part and a trailing resource suffix.
    ///
    /// The first configured suffix that ends the path wins. Without a match
    /// the whole path is signed and the suffix is empty.
    pub fn split_suffix<'a>(&self, path: &'a str) -> (&'a str, &'a str) {
        for suffix in &self.suffixes {
            if let Some(base) = path.strip_suffix(suffix.as_str()) {
                return (base, &path[base.len()..]);
            }
        }
        (path, "")
    }

    /// The part of `path` that is signed: `path` without its resource suffix.
    pub fn signing_path<'a>(&self, path: &'a str) -> &'a str {
        self.split_suffix(path).0
    }

    /// Sign an absolute URL.
    ///
    /// Returns `Ok(None)` when the URL does not need a token: its extension
    /// is not listed, it already has the auth parameter, or its host has no
    /// secret. The extension is checked first, so a relative URL to an
    /// unlisted file is `Ok(None)` rather than an error.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidUrl`] if a URL with a listed extension
    /// has no host.
    pub fn sign_url(&self, url: &str) -> AuthResult<Option<String>> {
        self.sign_url_at(url, chrono::Utc::now().timestamp())
    }

    /// Same as [`sign_url`](Self::sign_url) with an explicit clock reading.
    pub fn sign_url_at(&self, url: &str, now: i64) -> AuthResult<Option<String>> {
        let parts = UrlParts::split(url);
        let (base, suffix) = self.split_suffix(parts.path);

        if !self.extensions.matches(base) {
            return Ok(None);
        }

        let host = parts.host()?;

        let param = self.param_name.as_str();
        if parts.has_param(param) {
            tracing::debug!(url = %url, "URL already carries an auth parameter");
            return Ok(None);
        }

        let secret = match self.resolve_secret(&host) {
            Some(secret) => secret,
            None => {
                tracing::debug!(host = %host, "Leaving URL of unprotected domain unsigned");
                return Ok(None);
            }
        };

        let token = TokenSigner::new(secret)
            .with_duration(self.duration_secs)
            .issue_at(base, now);

        let mut signed = String::with_capacity(url.len() + 96);
        signed.push_str(parts.origin);
        signed.push_str(base);
        signed.push('?');
        if let Some(query) = parts.query.filter(|q| !q.is_empty()) {
            signed.push_str(query);
            if !query.ends_with('&') {
                signed.push('&');
            }
        }
        signed.push_str(param);
        signed.push('=');
        signed.push_str(&token.to_string());
        signed.push_str(suffix);
        if let Some(fragment) = parts.fragment {
            signed.push('#');
            signed.push_str(fragment);
        }

        Ok(Some(signed))
    }

    /// Sign a URL found in a page served from `host`.
    ///
    /// Site-relative URLs (`/img/a.jpg`, `img/a.jpg`) are made absolute
    /// against `scheme://host/` first; the signed result is absolute.
    pub fn sign_relative(&self, url: &str, scheme: &str, host: &str) -> AuthResult<Option<String>> {
        if !UrlParts::split(url).origin.is_empty() {
            return self.sign_url(url);
        }

        let absolute = format!("{}://{}/{}", scheme, host, url.trim_start_matches('/'));
        self.sign_url(&absolute)
    }

    /// Returns true if `url` carries a valid, unexpired token for its path.
    pub fn verify_url(&self, url: &str) -> bool {
        self.check_url_at(url, chrono::Utc::now().timestamp()).is_ok()
    }

    /// Check a signed URL at the given instant.
    ///
    /// # Errors
    ///
    /// - [`AuthError::InvalidUrl`] if the URL has no host
    /// - [`AuthError::UnknownDomain`] if the host has no secret
    /// - [`AuthError::MalformedToken`] if the auth parameter is missing
    /// - any token verification error
    pub fn check_url_at(&self, url: &str, now: i64) -> AuthResult<()> {
        let parts = UrlParts::split(url);
        let host = parts.host()?;
        let secret = self
            .resolve_secret(&host)
            .ok_or_else(|| AuthError::UnknownDomain(host.clone()))?;

        let token = parts
            .param(self.param_name.as_str())
            .ok_or_else(|| AuthError::MalformedToken("URL has no auth parameter".to_string()))?;
        // A resource suffix follows the token in the query
        let (token, _) = self.split_suffix(&token);

        TokenVerifier::new(secret)
            .check_at(self.signing_path(parts.path), token, now)
            .map(|_| ())
    }
}

/// Issue a token for `path` and return it as a `name=token` query pair.
pub fn issue_token(path: &str, secret: &str, duration_secs: i64, param: ParamName) -> String {
    let token = TokenSigner::new(secret)
        .with_duration(duration_secs)
        .sign(path);
    format!("{}={}", param, token)
}

/// Append `param=token` to `url`, using `&` if a query string exists.
///
/// # Errors
///
/// Returns [`AuthError::InvalidConfig`] for a parameter name that would need
/// encoding.
///
/// ```rust
/// use cdn_url_auth::append_token;
///
/// assert_eq!(append_token("/a.jpg", "sign", "t").unwrap(), "/a.jpg?sign=t");
/// assert_eq!(append_token("/a.jpg?w=1", "sign", "t").unwrap(), "/a.jpg?w=1&sign=t");
/// ```
pub fn append_token(url: &str, param: &str, token: &str) -> AuthResult<String> {
    validate_param_name(param)?;

    let (rest, fragment) = match url.split_once('#') {
        Some((rest, fragment)) => (rest, Some(fragment)),
        None => (url, None),
    };

    let separator = match rest.split_once('?') {
        None => "?",
        Some((_, "")) => "",
        Some((_, q)) if q.ends_with('&') => "",
        Some(_) => "&",
    };

    let mut out = format!("{}{}{}={}", rest, separator, param, token);
    if let Some(fragment) = fragment {
        out.push('#');
        out.push_str(fragment);
    }
    Ok(out)
}

/// Path component of a URL as written, without query or fragment.
///
/// Returns `/` when the URL has no path.
pub fn resource_path(url: &str) -> &str {
    match UrlParts::split(url).path {
        "" => "/",
        path => path,
    }
}

/// Borrowed pieces of a URL as written.
///
/// The URL is not normalized; the signed path must be byte-identical to
/// what the CDN receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct UrlParts<'a> {
    /// `scheme://authority`, `//authority` or empty for relative URLs
    origin: &'a str,
    path: &'a str,
    query: Option<&'a str>,
    fragment: Option<&'a str>,
}

impl<'a> UrlParts<'a> {
    fn split(raw: &'a str) -> Self {
        let (rest, fragment) = match raw.split_once('#') {
            Some((rest, fragment)) => (rest, Some(fragment)),
            None => (raw, None),
        };
        let (rest, query) = match rest.split_once('?') {
            Some((rest, query)) => (rest, Some(query)),
            None => (rest, None),
        };

        let authority_start = match rest.find("://") {
            Some(i) if is_scheme(&rest[..i]) => Some(i + 3),
            _ if rest.starts_with("//") => Some(2),
            _ => None,
        };

        let origin_end = match authority_start {
            Some(start) => rest[start..]
                .find('/')
                .map(|i| start + i)
                .unwrap_or(rest.len()),
            None => 0,
        };

        Self {
            origin: &rest[..origin_end],
            path: &rest[origin_end..],
            query,
            fragment,
        }
    }

    /// Host name without port.
    fn host(&self) -> AuthResult<String> {
        let origin = match self.origin {
            "" => {
                return Err(AuthError::InvalidUrl(
                    "Relative URL has no host".to_string(),
                ))
            }
            o if o.starts_with("//") => format!("https:{}", o),
            o => o.to_string(),
        };

        let parsed = Url::parse(&origin)?;
        parsed
            .host_str()
            .map(str::to_string)
            .ok_or_else(|| AuthError::InvalidUrl(format!("URL '{}' has no host", origin)))
    }

    fn param(&self, name: &str) -> Option<String> {
        let query = self.query?;
        form_urlencoded::parse(query.as_bytes())
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    }

    fn has_param(&self, name: &str) -> bool {
        self.param(name).is_some()
    }
}

fn is_scheme(s: &str) -> bool {
    s.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::AuthToken;

    const NOW: i64 = 1_700_000_000;

    fn authenticator() -> UrlAuthenticator {
        let config = AuthConfig::default()
            .with_domain_keys("cdn.example.com:key1\nstatic.example.com:key2")
            .with_duration(600);
        UrlAuthenticator::new(&config)
    }

    fn token_of(signed: &str) -> AuthToken {
        let (_, token) = signed.split_once("auth_key=").unwrap();
        token.parse().unwrap()
    }

    #[test]
    fn test_split_url() {
        let parts = UrlParts::split("https://cdn.example.com:8443/a/b.jpg?x=1#top");
        assert_eq!(parts.origin, "https://cdn.example.com:8443");
        assert_eq!(parts.path, "/a/b.jpg");
        assert_eq!(parts.query, Some("x=1"));
        assert_eq!(parts.fragment, Some("top"));
        assert_eq!(parts.host().unwrap(), "cdn.example.com");

        let relative = UrlParts::split("/a/b.jpg?u=http://x");
        assert_eq!(relative.origin, "");
        assert_eq!(relative.path, "/a/b.jpg");
        assert!(relative.host().is_err());

        let protocol_relative = UrlParts::split("//cdn.example.com/a.jpg");
        assert_eq!(protocol_relative.host().unwrap(), "cdn.example.com");
    }

    #[test]
    fn test_resource_path() {
        assert_eq!(resource_path("https://cdn.example.com/img/a.jpg?x=1"), "/img/a.jpg");
        assert_eq!(resource_path("https://cdn.example.com"), "/");
        assert_eq!(resource_path("https://cdn.example.com?x=1"), "/");
        assert_eq!(resource_path("img/a.jpg"), "img/a.jpg");
    }

    #[test]
    fn test_sign_url_appends_token() {
        let auth = authenticator();
        let signed = auth
            .sign_url_at("https://cdn.example.com/img/a.jpg", NOW)
            .unwrap()
            .unwrap();

        assert!(signed.starts_with("https://cdn.example.com/img/a.jpg?auth_key="));
        let token = token_of(&signed);
        assert_eq!(token.expires_at, NOW + 600);
        assert!(token.matches("/img/a.jpg", "key1"));
        assert!(auth.check_url_at(&signed, NOW).is_ok());
    }

    #[test]
    fn test_sign_url_existing_query_and_fragment() {
        let auth = authenticator();
        let signed = auth
            .sign_url_at("https://cdn.example.com/a.png?w=100#frag", NOW)
            .unwrap()
            .unwrap();

        assert!(signed.starts_with("https://cdn.example.com/a.png?w=100&auth_key="));
        assert!(signed.ends_with("#frag"));
        // Query string is not part of the signed path
        assert!(token_of(signed.trim_end_matches("#frag")).matches("/a.png", "key1"));
    }

    #[test]
    fn test_sign_url_skips() {
        let auth = authenticator();

        // Unknown domain
        assert_eq!(auth.sign_url_at("https://www.example.com/a.jpg", NOW).unwrap(), None);
        // Extension not listed
        assert_eq!(auth.sign_url_at("https://cdn.example.com/a.html", NOW).unwrap(), None);
        // Already signed
        assert_eq!(
            auth.sign_url_at("https://cdn.example.com/a.jpg?auth_key=1-2-0-x", NOW)
                .unwrap(),
            None
        );
        // Relative URL needs a base
        assert!(matches!(
            auth.sign_url_at("/a.jpg", NOW),
            Err(AuthError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_sign_param_name() {
        let config = AuthConfig::default()
            .with_domain_keys("cdn.example.com:key1")
            .with_param_name(ParamName::Sign);
        let auth = UrlAuthenticator::new(&config);

        let signed = auth.sign_url("https://cdn.example.com/a.jpg").unwrap().unwrap();
        assert!(signed.starts_with("https://cdn.example.com/a.jpg?sign="));
        assert!(auth.verify_url(&signed));
    }

    #[test]
    fn test_needs_auth() {
        let auth = authenticator();

        assert!(auth.needs_auth("https://cdn.example.com/a.JPG"));
        assert!(!auth.needs_auth("https://cdn.example.com/a.jpg?auth_key=x"));
        assert!(!auth.needs_auth("https://other.example.com/a.jpg"));
        assert!(!auth.needs_auth("https://cdn.example.com/page"));
        assert!(!auth.needs_auth("a.jpg"));
    }

    #[test]
    fn test_sign_relative() {
        let auth = authenticator();

        let rooted = auth
            .sign_relative("/img/a.jpg", "https", "static.example.com")
            .unwrap()
            .unwrap();
        assert!(rooted.starts_with("https://static.example.com/img/a.jpg?auth_key="));

        let bare = auth
            .sign_relative("img/a.jpg", "http", "static.example.com")
            .unwrap()
            .unwrap();
        assert!(bare.starts_with("http://static.example.com/img/a.jpg?auth_key="));

        // Absolute URLs keep their own host
        let absolute = auth
            .sign_relative("https://cdn.example.com/a.jpg", "https", "static.example.com")
            .unwrap()
            .unwrap();
        assert!(absolute.starts_with("https://cdn.example.com/a.jpg?auth_key="));
    }

    #[test]
    fn test_resource_suffix_excluded_from_signature() {
        let config = AuthConfig::default()
            .with_domain_keys("cdn.example.com:key1")
            .with_resource_suffixes("thumb\n/w200");
        let auth = UrlAuthenticator::new(&config);

        assert_eq!(auth.split_suffix("/a.jpg/thumb"), ("/a.jpg", "/thumb"));
        assert_eq!(auth.split_suffix("/a.jpg"), ("/a.jpg", ""));

        let signed = auth
            .sign_url_at("https://cdn.example.com/a.jpg/thumb", NOW)
            .unwrap()
            .unwrap();
        assert!(signed.starts_with("https://cdn.example.com/a.jpg?auth_key="));
        assert!(signed.ends_with("/thumb"));

        let token = token_of(signed.trim_end_matches("/thumb"));
        assert!(token.matches("/a.jpg", "key1"));
        assert!(auth.check_url_at(&signed, NOW).is_ok());
    }

    #[test]
    fn test_suffix_left_in_path_verifies() {
        let config = AuthConfig::default()
            .with_domain_keys("cdn.example.com:key1")
            .with_resource_suffixes("/thumb");
        let auth = UrlAuthenticator::new(&config);
        let token = AuthToken::issue("/a.jpg", "key1", NOW + 600, "A".repeat(32));

        assert_eq!(auth.signing_path("/a.jpg/thumb"), "/a.jpg");
        assert!(auth
            .check_url_at(
                &format!("https://cdn.example.com/a.jpg/thumb?auth_key={}", token),
                NOW
            )
            .is_ok());
        assert!(auth
            .check_url_at(
                &format!("https://cdn.example.com/a.jpg?auth_key={}/thumb", token),
                NOW
            )
            .is_ok());
    }

    #[test]
    fn test_mixed_case_domain_config() {
        let config = AuthConfig::default().with_domain_keys("CDN.Example.com:key1");
        let auth = UrlAuthenticator::new(&config);

        assert_eq!(auth.resolve_secret("cdn.example.com"), Some("key1"));
        let signed = auth
            .sign_url_at("https://CDN.example.com/a.jpg", NOW)
            .unwrap()
            .unwrap();
        assert!(token_of(&signed).matches("/a.jpg", "key1"));
        assert!(auth.check_url_at(&signed, NOW).is_ok());
    }

    #[test]
    fn test_relative_unlisted_url_is_skipped() {
        let auth = authenticator();

        assert_eq!(auth.sign_url_at("/about.html", NOW).unwrap(), None);
        assert!(matches!(
            auth.sign_url_at("/about.jpg", NOW),
            Err(AuthError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_check_url_failures() {
        let auth = authenticator();
        let signed = auth
            .sign_url_at("https://cdn.example.com/a.jpg", NOW)
            .unwrap()
            .unwrap();

        // Expired
        assert!(matches!(
            auth.check_url_at(&signed, NOW + 601),
            Err(AuthError::Expired)
        ));
        // Token moved to another path
        let moved = signed.replace("/a.jpg", "/b.jpg");
        assert!(matches!(
            auth.check_url_at(&moved, NOW),
            Err(AuthError::SignatureMismatch)
        ));
        // Token moved to another protected domain
        let rehosted = signed.replace("cdn.example.com", "static.example.com");
        assert!(matches!(
            auth.check_url_at(&rehosted, NOW),
            Err(AuthError::SignatureMismatch)
        ));
        // Missing parameter
        assert!(matches!(
            auth.check_url_at("https://cdn.example.com/a.jpg", NOW),
            Err(AuthError::MalformedToken(_))
        ));
        // Unknown domain
        assert!(matches!(
            auth.check_url_at("https://www.example.com/a.jpg?auth_key=x", NOW),
            Err(AuthError::UnknownDomain(_))
        ));
    }

    #[test]
    fn test_issue_token() {
        let pair = issue_token("/img/a.jpg", "s3cr3t", 600, ParamName::AuthKey);
        let (name, token) = pair.split_once('=').unwrap();

        assert_eq!(name, "auth_key");
        assert!(TokenVerifier::new("s3cr3t").verify("/img/a.jpg", token));
        assert!(issue_token("/", "s3cr3t", 600, ParamName::Sign).starts_with("sign="));
    }

    #[test]
    fn test_append_token() {
        assert_eq!(append_token("/a.jpg", "auth_key", "t").unwrap(), "/a.jpg?auth_key=t");
        assert_eq!(
            append_token("/a.jpg?w=1", "auth_key", "t").unwrap(),
            "/a.jpg?w=1&auth_key=t"
        );
        assert_eq!(append_token("/a.jpg?", "auth_key", "t").unwrap(), "/a.jpg?auth_key=t");
        assert_eq!(
            append_token("/a.jpg#x", "auth_key", "t").unwrap(),
            "/a.jpg?auth_key=t#x"
        );
        assert!(matches!(
            append_token("/a.jpg", "auth key", "t"),
            Err(AuthError::InvalidConfig(_))
        ));
    }
}

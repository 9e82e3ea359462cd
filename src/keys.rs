//! Domain to secret mapping and the other plain-text lists of the
//! configuration.
//!
//! All lists share one discipline: split on the delimiter, trim, drop empty
//! entries.

use std::collections::{BTreeSet, HashMap};
use std::str::FromStr;

use crate::error::AuthError;

/// Secrets keyed by the resource domain they protect.
///
/// Parsed from newline separated `domain:secret` lines. Later lines win for
/// a repeated domain; lines without a `:` are skipped. Domains are stored
/// ASCII-lowercased and looked up case-insensitively, like URL hosts.
///
/// ```rust
/// use cdn_url_auth::DomainKeyStore;
///
/// let store = DomainKeyStore::parse("cdn.example.com:key1\nstatic.example.com:key2");
/// assert_eq!(store.lookup("cdn.example.com"), Some("key1"));
/// assert_eq!(store.lookup("www.example.com"), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomainKeyStore {
    keys: HashMap<String, String>,
}

impl DomainKeyStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the raw `domain:secret` configuration text.
    pub fn parse(raw: &str) -> Self {
        let mut keys = HashMap::new();

        for (index, line) in raw.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            match line.split_once(':') {
                Some((domain, secret)) => {
                    keys.insert(domain.trim().to_ascii_lowercase(), secret.trim().to_string());
                }
                None => {
                    // The line may be a bare secret, so only its position is logged
                    tracing::warn!(line = index + 1, "Skipping domain key line without ':'");
                }
            }
        }

        Self { keys }
    }

    /// Add or replace the secret for a domain.
    pub fn insert(&mut self, domain: impl Into<String>, secret: impl Into<String>) {
        self.keys
            .insert(domain.into().to_ascii_lowercase(), secret.into());
    }

    /// Secret for `domain`, or `None` if the domain is not protected.
    pub fn lookup(&self, domain: &str) -> Option<&str> {
        self.keys
            .get(&domain.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Returns true if `domain` has a configured secret.
    pub fn contains(&self, domain: &str) -> bool {
        self.keys.contains_key(&domain.to_ascii_lowercase())
    }

    /// Configured domains, sorted.
    pub fn domains(&self) -> Vec<&str> {
        let mut domains: Vec<&str> = self.keys.keys().map(String::as_str).collect();
        domains.sort_unstable();
        domains
    }

    /// Iterate over `(domain, secret)` pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.keys.iter().map(|(d, s)| (d.as_str(), s.as_str()))
    }

    /// Number of configured domains.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns true if no domain is configured.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl FromStr for DomainKeyStore {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

/// Parse a domain key list into a plain map.
pub fn parse_domain_keys(raw: &str) -> HashMap<String, String> {
    DomainKeyStore::parse(raw).keys
}

/// File extensions that require a token, stored lowercase without the dot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtensionSet {
    extensions: BTreeSet<String>,
}

impl ExtensionSet {
    /// Parse a `;` separated list such as `.jpg;.PNG; css`.
    pub fn parse(raw: &str) -> Self {
        let extensions = raw
            .split(';')
            .map(|ext| ext.trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();
        Self { extensions }
    }

    /// Returns true if the last segment of `path` ends in a listed extension.
    pub fn matches(&self, path: &str) -> bool {
        let file = path.rsplit('/').next().unwrap_or(path);
        match file.rsplit_once('.') {
            Some((_, ext)) => self.contains(ext),
            None => false,
        }
    }

    /// Returns true if `ext` (with or without leading dot) is listed.
    pub fn contains(&self, ext: &str) -> bool {
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        self.extensions.contains(&ext)
    }

    /// Iterate over the extensions in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.extensions.iter().map(String::as_str)
    }

    /// Number of listed extensions.
    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    /// Returns true if no extension is listed.
    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }
}

impl FromStr for ExtensionSet {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

/// Parse newline separated resource suffixes, each forced to start with `/`.
///
/// Order is kept; the first matching suffix wins when signing.
pub fn parse_resource_suffixes(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            if line.starts_with('/') {
                line.to_string()
            } else {
                format!("/{}", line)
            }
        })
        .collect()
}

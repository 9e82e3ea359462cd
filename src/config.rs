//! URL signing configuration.

use std::env;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AuthError, AuthResult};
use crate::keys::{parse_resource_suffixes, DomainKeyStore, ExtensionSet};
use crate::validation::validate_domain;
use crate::{DEFAULT_DURATION_SECS, DEFAULT_EXTENSIONS, DEFAULT_PARAM_NAME};

/// Name of the query parameter carrying the token.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamName {
    /// `auth_key`, the CDN's standard name
    #[default]
    AuthKey,
    /// `sign`
    Sign,
}

impl ParamName {
    /// The parameter name as it appears in URLs.
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamName::AuthKey => DEFAULT_PARAM_NAME,
            ParamName::Sign => "sign",
        }
    }
}

impl fmt::Display for ParamName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParamName {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "auth_key" => Ok(ParamName::AuthKey),
            "sign" => Ok(ParamName::Sign),
            other => Err(AuthError::InvalidConfig(format!(
                "Unknown auth parameter name '{}', expected 'auth_key' or 'sign'",
                other
            ))),
        }
    }
}

/// Configuration for signing resource URLs.
///
/// List-valued settings are kept as the raw text an operator edits and are
/// parsed on use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Newline separated `domain:secret` pairs
    pub domain_keys: String,

    /// Token validity in seconds (default: 1800)
    pub duration: i64,

    /// `;` separated extensions that require a token
    pub allowed_extensions: String,

    /// Query parameter carrying the token (default: `auth_key`)
    pub param_name: ParamName,

    /// Newline separated suffixes that are excluded from the signed path
    pub resource_suffixes: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            domain_keys: String::new(),
            duration: DEFAULT_DURATION_SECS,
            allowed_extensions: DEFAULT_EXTENSIONS.to_string(),
            param_name: ParamName::AuthKey,
            resource_suffixes: String::new(),
        }
    }
}

impl AuthConfig {
    /// Load configuration from environment variables, falling back to defaults.
    ///
    /// | Variable | Field |
    /// |---|---|
    /// | `CDN_AUTH_DOMAIN_KEYS` | `domain_keys` |
    /// | `CDN_AUTH_DURATION` | `duration` |
    /// | `CDN_AUTH_EXTENSIONS` | `allowed_extensions` |
    /// | `CDN_AUTH_PARAM_NAME` | `param_name` |
    /// | `CDN_AUTH_RESOURCE_SUFFIXES` | `resource_suffixes` |
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let domain_keys = lookup("CDN_AUTH_DOMAIN_KEYS")
            // Allow single-line env values
            .map(|v| v.replace("\\n", "\n"))
            .unwrap_or(defaults.domain_keys);

        let duration = lookup("CDN_AUTH_DURATION")
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(defaults.duration);

        let allowed_extensions =
            lookup("CDN_AUTH_EXTENSIONS").unwrap_or(defaults.allowed_extensions);

        let param_name = match lookup("CDN_AUTH_PARAM_NAME") {
            Some(v) => v.parse().unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Falling back to default auth parameter name");
                defaults.param_name
            }),
            None => defaults.param_name,
        };

        let resource_suffixes = lookup("CDN_AUTH_RESOURCE_SUFFIXES")
            .map(|v| v.replace("\\n", "\n"))
            .unwrap_or(defaults.resource_suffixes);

        Self {
            domain_keys,
            duration,
            allowed_extensions,
            param_name,
            resource_suffixes,
        }
    }

    /// Set the raw domain key text.
    pub fn with_domain_keys(mut self, raw: impl Into<String>) -> Self {
        self.domain_keys = raw.into();
        self
    }

    /// Set the token validity in seconds.
    pub fn with_duration(mut self, seconds: i64) -> Self {
        self.duration = seconds;
        self
    }

    /// Set the raw extension list.
    pub fn with_extensions(mut self, raw: impl Into<String>) -> Self {
        self.allowed_extensions = raw.into();
        self
    }

    /// Set the query parameter name.
    pub fn with_param_name(mut self, name: ParamName) -> Self {
        self.param_name = name;
        self
    }

    /// Set the raw resource suffix list.
    pub fn with_resource_suffixes(mut self, raw: impl Into<String>) -> Self {
        self.resource_suffixes = raw.into();
        self
    }

    /// Parse the domain key text.
    pub fn domain_key_store(&self) -> DomainKeyStore {
        DomainKeyStore::parse(&self.domain_keys)
    }

    /// Parse the extension list.
    pub fn extension_set(&self) -> ExtensionSet {
        ExtensionSet::parse(&self.allowed_extensions)
    }

    /// Parse the resource suffix list.
    pub fn resource_suffix_list(&self) -> Vec<String> {
        parse_resource_suffixes(&self.resource_suffixes)
    }

    /// Check that the configuration can sign anything at all.
    ///
    /// # Errors
    ///
    /// Returns an error if the duration is negative, no extension is listed,
    /// a configured domain is not a valid host name or a line was written as
    /// `host:port:secret`.
    pub fn validate(&self) -> AuthResult<()> {
        if self.duration < 0 {
            return Err(AuthError::InvalidConfig(format!(
                "Duration must not be negative, got {}",
                self.duration
            )));
        }

        if self.extension_set().is_empty() {
            return Err(AuthError::InvalidConfig(
                "At least one file extension must be configured".to_string(),
            ));
        }

        let store = self.domain_key_store();
        for domain in store.domains() {
            validate_domain(domain)?;

            // `host:8080:secret` splits into host `host` and secret `8080:secret`
            let secret = store.lookup(domain).unwrap_or_default();
            if let Some((port, _)) = secret.split_once(':') {
                if port.parse::<u16>().is_ok() {
                    return Err(AuthError::InvalidConfig(format!(
                        "Domain '{}' looks like it carries port {}; list the host without a port",
                        domain, port
                    )));
                }
            }
        }

        Ok(())
    }
}

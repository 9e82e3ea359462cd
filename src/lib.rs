//! # cdn-url-auth - Signed URL tokens for CDN hotlink protection
//!
//! Issues and checks the time-limited `auth_key` tokens a CDN uses to refuse
//! hotlinked resource requests.
//!
//! ## Features
//!
//! - **Token Signing**: `expiry-rand-uid-md5` tokens bound to a resource path and a per-domain secret
//! - **Token Verification**: expiry and signature checks with constant-time comparison
//! - **Domain Keys**: plain-text `domain:secret` lists, extension allow-lists and resource suffixes
//! - **URL Signing**: decide whether a URL is protected and append the token parameter
//!
//! ## Quick Start
//!
//! ```rust
//! use cdn_url_auth::{DomainKeyStore, TokenSigner, TokenVerifier};
//!
//! let keys = DomainKeyStore::parse("cdn.example.com:your_secret_key");
//!
//! if let Some(secret) = keys.lookup("cdn.example.com") {
//!     let token = TokenSigner::new(secret).with_duration(1800).sign("/img/a.jpg");
//!     let url = format!("https://cdn.example.com/img/a.jpg?auth_key={}", token);
//!
//!     // An edge function holding the same secret accepts it
//!     assert!(TokenVerifier::new(secret).verify("/img/a.jpg", &token));
//!     println!("{}", url);
//! }
//! ```
//!
//! ## Whole URLs
//!
//! ```rust
//! use cdn_url_auth::{AuthConfig, UrlAuthenticator};
//!
//! let config = AuthConfig::from_env().with_domain_keys("cdn.example.com:your_secret_key");
//! let auth = UrlAuthenticator::new(&config);
//!
//! match auth.sign_url("https://cdn.example.com/img/a.jpg?w=200") {
//!     Ok(Some(signed)) => println!("signed: {}", signed),
//!     Ok(None) => println!("not protected"),
//!     Err(e) => eprintln!("bad url: {}", e),
//! }
//! ```

pub mod config;
pub mod error;
pub mod keys;
pub mod signed_url;
pub mod token;
pub mod validation;

// Re-exports for convenience
pub use config::{AuthConfig, ParamName};
pub use error::{AuthError, AuthResult};
pub use keys::{parse_domain_keys, parse_resource_suffixes, DomainKeyStore, ExtensionSet};
pub use signed_url::{append_token, issue_token, resource_path, UrlAuthenticator};
pub use token::{sign_token, verify_token, AuthToken, TokenSigner, TokenVerifier};
pub use validation::{validate_domain, validate_nonce, validate_param_name};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Maximum token length accepted by the parser
pub const MAX_TOKEN_LENGTH: usize = 2048;

/// Length of the random nonce in issued tokens
pub const NONCE_LENGTH: usize = 32;

/// The uid field of issued tokens; per-user scoping is not used
pub const TOKEN_UID: u64 = 0;

/// Default token validity (30 minutes)
pub const DEFAULT_DURATION_SECS: i64 = 1800;

/// Default query parameter name
pub const DEFAULT_PARAM_NAME: &str = "auth_key";

/// Default extensions that require a token
pub const DEFAULT_EXTENSIONS: &str = ".jpg;.jpeg;.png;.gif;.webp;.css;.js;.mp4;.mp3;.pdf;.zip";

/// Maximum domain length per DNS
pub const MAX_DOMAIN_LENGTH: usize = 253;

/// Prelude module for common imports
pub mod prelude {
    pub use crate::config::{AuthConfig, ParamName};
    pub use crate::error::{AuthError, AuthResult};
    pub use crate::keys::{DomainKeyStore, ExtensionSet};
    pub use crate::signed_url::UrlAuthenticator;
    pub use crate::token::{AuthToken, TokenSigner, TokenVerifier};
}

//! Page URL signing example
//!
//! This example signs the resource URLs a page rewriter found in a
//! rendered page, resolving site-relative links against the page's host.
//!
//! Run with: CDN_AUTH_DOMAIN_KEYS='cdn.example.com:k1' cargo run --example sign_page_urls

use cdn_url_auth::{AuthConfig, UrlAuthenticator};

/// Signs one matched URL, or hands it back untouched.
fn rewrite_with<'a>(auth: &'a UrlAuthenticator, host: &'a str) -> impl Fn(&str) -> String + 'a {
    move |url: &str| match auth.sign_relative(url, "https", host) {
        Ok(Some(signed)) => signed,
        Ok(None) => url.to_string(),
        Err(e) => {
            eprintln!("   [WARN] {}: {}", url, e);
            url.to_string()
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AuthConfig::from_env();
    if config.domain_keys.is_empty() {
        config = config.with_domain_keys("cdn.example.com:your_secret_key");
    }
    config.validate()?;

    let auth = UrlAuthenticator::new(&config);
    let rewrite = rewrite_with(&auth, "cdn.example.com");

    println!("=== Page URL Signing Example ===\n");

    let found = [
        "https://cdn.example.com/img/banner.png",
        "/css/site.css?v=3",
        "js/app.js",
        "https://cdn.example.com/img/a.jpg?auth_key=already-signed",
        "https://www.example.com/logo.png",
        "/about.html",
    ];

    for url in found {
        let signed = rewrite(url);
        let status = if signed == url { "kept  " } else { "signed" };
        println!("[{}] {}", status, url);
        if signed != url {
            println!("         -> {}", signed);
            println!("         verified: {}", auth.verify_url(&signed));
        }
    }

    Ok(())
}

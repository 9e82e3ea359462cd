//! Token signing and verification example
//!
//! This example issues an `auth_key` token for one resource path and checks
//! it the way a CDN edge would.
//!
//! Run with: cargo run --example sign_and_verify

use cdn_url_auth::{AuthError, AuthToken, DomainKeyStore, TokenSigner, TokenVerifier};

fn main() {
    // Domain keys as an operator would paste them
    let keys = DomainKeyStore::parse(
        "cdn.example.com:your_secret_key\n\
         static.example.com:another_secret_key",
    );

    let secret = keys
        .lookup("cdn.example.com")
        .expect("cdn.example.com is configured above");

    let signer = TokenSigner::new(secret).with_duration(1800);
    let token = signer.issue("/img/a.jpg");

    println!("Generated token: {}", token);
    println!("  Expires in: {} seconds", token.remaining_seconds());
    println!("  URL: https://cdn.example.com/img/a.jpg?auth_key={}", token);
    println!();

    let verifier = TokenVerifier::new(secret);
    match verifier.check("/img/a.jpg", &token.to_string()) {
        Ok(parsed) => println!("[OK] Token verified, valid until {}", parsed.expires_at),
        Err(e) => {
            println!("[FAIL] Token verification failed!");
            println!("  Error: {}", e);
            println!("  HTTP Status: {}", e.http_status_code());
        }
    }

    println!();
    println!("--- Testing Error Cases ---");
    println!();

    // Wrong secret
    let other_secret = keys.lookup("static.example.com").unwrap_or_default();
    match TokenVerifier::new(other_secret).check("/img/a.jpg", &token.to_string()) {
        Err(AuthError::SignatureMismatch) => println!("[OK] Correctly rejected wrong secret"),
        Ok(_) => println!("[FAIL] Should have failed!"),
        Err(e) => println!("[WARN] Unexpected error: {}", e),
    }

    // Wrong path
    match verifier.check("/img/b.jpg", &token.to_string()) {
        Err(AuthError::SignatureMismatch) => println!("[OK] Correctly rejected other path"),
        Ok(_) => println!("[FAIL] Should have failed!"),
        Err(e) => println!("[WARN] Unexpected error: {}", e),
    }

    // Malformed
    match verifier.check("/img/a.jpg", "not-a-token") {
        Err(AuthError::MalformedToken(_)) => println!("[OK] Correctly rejected malformed token"),
        Ok(_) => println!("[FAIL] Should have failed!"),
        Err(e) => println!("[WARN] Unexpected error: {}", e),
    }

    // Expired
    let expired = AuthToken::issue(
        "/img/a.jpg",
        secret,
        chrono::Utc::now().timestamp() - 60,
        cdn_url_auth::token::generate_nonce(),
    );
    match verifier.check("/img/a.jpg", &expired.to_string()) {
        Err(AuthError::Expired) => println!("[OK] Correctly rejected expired token"),
        Ok(_) => println!("[FAIL] Should have failed!"),
        Err(e) => println!("[WARN] Unexpected error: {}", e),
    }
}

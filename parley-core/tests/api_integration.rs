//! Integration tests that call the real Gemini API.
//!
//! These tests require GEMINI_API_KEY to be set (via .env file or environment).
//! Run with: `cargo test -p parley-core --test api_integration -- --ignored`
//!
//! These are marked #[ignore] by default to avoid:
//! - API costs in CI
//! - Test failures when no API key is available
//! - Slow test runs (API calls take seconds)

use gemini::Gemini;
use parley_core::{ChatSession, Role, SessionConfig, SessionEvent, Variant};
use std::sync::Arc;

/// Load environment variables from .env file
fn setup() {
    let _ = dotenvy::dotenv();
}

/// Check if API key is available
fn has_api_key() -> bool {
    gemini::API_KEY_VARS
        .iter()
        .any(|var| std::env::var(var).is_ok_and(|v| !v.trim().is_empty()))
}

fn session(variant: Variant) -> ChatSession {
    let model = Gemini::from_env().expect("Failed to create Gemini client");
    let config = SessionConfig::new(variant)
        .with_model(gemini::DEFAULT_MODEL)
        .with_max_output_tokens(1024);
    ChatSession::new(config, Arc::new(model))
}

#[tokio::test]
#[ignore] // Run with: cargo test -p parley-core --test api_integration -- --ignored
async fn test_clone_replies() {
    setup();
    if !has_api_key() {
        eprintln!("Skipping test: GEMINI_API_KEY not set");
        return;
    }

    let mut session = session(Variant::Clone);
    session
        .handle_quiet(SessionEvent::Submit("Hi! What do you do?".into()))
        .await
        .expect("Clone should reply");

    let last = session.transcript().last().expect("transcript should not be empty");
    assert_eq!(last.role, Role::Assistant);
    assert!(!last.content.trim().is_empty(), "Reply should not be empty");
    println!("Clone: {}", last.content);
}

#[tokio::test]
#[ignore]
async fn test_solo_streams_reply() {
    setup();
    if !has_api_key() {
        eprintln!("Skipping test: GEMINI_API_KEY not set");
        return;
    }

    let mut session = session(Variant::Solo);
    let mut fragments = 0usize;
    session
        .handle(SessionEvent::Submit("Hello, I'm ready to begin.".into()), |p| {
            if let parley_core::Progress::Fragment(_) = p {
                fragments += 1;
            }
        })
        .await
        .expect("DM should reply");

    assert!(fragments > 0, "Expected at least one streamed fragment");
    let last = session.transcript().last().expect("transcript should not be empty");
    assert_eq!(last.role, Role::Assistant);
    println!("DM ({fragments} fragments): {}", last.content);
}

#[tokio::test]
#[ignore]
async fn test_invalid_key_is_classified() {
    setup();

    let model = Gemini::new("not-a-real-key").expect("client should build");
    let mut session = ChatSession::new(SessionConfig::new(Variant::Clone), Arc::new(model));
    let err = session
        .handle_quiet(SessionEvent::Submit("hello".into()))
        .await
        .expect_err("bad key should fail");

    assert!(err.is_model_failure());
    assert!(
        matches!(
            err,
            parley_core::SessionError::Model(gemini::Error::InvalidCredential(_))
        ),
        "unexpected error: {err}"
    );
    assert!(session.transcript().is_empty());
}

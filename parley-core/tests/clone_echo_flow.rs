//! Scripted tests for the clone and echo variants.
//!
//! These drive a `ChatSession` through `ScriptedModel`, so no API key is needed.

use parley_core::persona::{CLONE_PERSONA, TRAINING_ANALYSIS_HEADER, TRAINING_SCENARIO};
use parley_core::profile::DEFAULT_PROFILE;
use parley_core::testing::{assert_last_message, assert_profile, assert_roles, Scripted};
use parley_core::{Role, SessionConfig, SessionError, SessionEvent, TestHarness, Tone, Variant};

const DEMO_PROFILE: &str =
    "User exhibits a slightly sarcastic, brief tone, with an affinity for the 😅 emoji.";

// =============================================================================
// CLONE
// =============================================================================

#[tokio::test]
async fn test_clone_single_turn_prompt() {
    let mut harness = TestHarness::new(Variant::Clone);
    harness.expect_reply("Hi there! 😊 Tell me about yourself!");

    harness.submit("hey").await.unwrap();

    let prompt = harness.model.last_prompt().unwrap();
    assert_eq!(prompt, format!("{CLONE_PERSONA}\n\nUser: hey\nAssistant:"));
    assert_roles(&harness, &[Role::User, Role::Assistant]);
    assert_last_message(&harness, Role::Assistant, "Tell me about yourself");
}

#[tokio::test]
async fn test_clone_prompt_ignores_history() {
    let mut harness = TestHarness::new(Variant::Clone);
    harness.expect_reply("first").expect_reply("second");

    harness.submit("one").await.unwrap();
    harness.submit("two").await.unwrap();

    let prompt = harness.model.last_prompt().unwrap();
    assert!(!prompt.contains("one"));
    assert!(prompt.ends_with("User: two\nAssistant:"));
}

#[tokio::test]
async fn test_clone_tone_is_added() {
    let mut harness = TestHarness::new(Variant::Clone);
    harness.expect_reply("Good day.");

    harness.send(SessionEvent::SetTone(Tone::Formal)).await.unwrap();
    harness.submit("hello").await.unwrap();

    let prompt = harness.model.last_prompt().unwrap();
    assert!(prompt.contains("Preferred tone for this conversation: Formal."));
    assert_eq!(harness.session.view().tone, Tone::Formal);
}

#[tokio::test]
async fn test_clone_failure_rolls_back_user_turn() {
    let mut harness = TestHarness::new(Variant::Clone);
    harness.expect_reply("ok").expect_failure("quota exceeded");

    harness.submit("first").await.unwrap();
    let err = harness.submit("second").await.unwrap_err();

    assert!(err.is_model_failure());
    assert!(err.user_message(Variant::Clone).contains("quota exceeded"));
    assert_roles(&harness, &[Role::User, Role::Assistant]);
    assert_last_message(&harness, Role::Assistant, "ok");
}

// =============================================================================
// ECHO: ACCOUNTS
// =============================================================================

#[tokio::test]
async fn test_echo_requires_login() {
    let mut harness = TestHarness::new(Variant::Echo);

    let err = harness.submit("hello?").await.unwrap_err();
    assert!(matches!(err, SessionError::NotLoggedIn));

    let err = harness.send(SessionEvent::StartTraining).await.unwrap_err();
    assert!(matches!(err, SessionError::NotLoggedIn));

    assert!(harness.messages().is_empty());
    assert_eq!(harness.model.request_count(), 0);
}

#[tokio::test]
async fn test_echo_login_and_logout() {
    let mut harness = TestHarness::new(Variant::Echo);
    assert_profile(&harness, DEFAULT_PROFILE);

    let err = harness
        .send(SessionEvent::Login {
            username: "user1".into(),
            password: "wrong".into(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::LoginFailed));

    harness.login_demo_user().await.unwrap();
    assert_profile(&harness, DEMO_PROFILE);
    let view = harness.session.view();
    assert_eq!(view.username.as_deref(), Some("user1"));
    assert!(view.notice.unwrap().contains("Welcome back, user1!"));

    harness.expect_reply("Updated profile.").expect_reply("lol sure 😅");
    harness.submit("sup").await.unwrap();
    assert_eq!(harness.messages().len(), 2);

    harness.send(SessionEvent::Logout).await.unwrap();
    assert!(harness.messages().is_empty());
    assert_profile(&harness, DEFAULT_PROFILE);
    assert!(harness.session.username().is_none());
}

// =============================================================================
// ECHO: CHAT
// =============================================================================

#[tokio::test]
async fn test_echo_refreshes_profile_then_replies() {
    let mut harness = TestHarness::new(Variant::Echo);
    harness.login_demo_user().await.unwrap();
    harness
        .expect_reply("  User is terse and uses lowercase.  ")
        .expect_reply("yeah whatever");

    harness.submit("ok cool").await.unwrap();

    let requests = harness.model.requests();
    assert_eq!(requests.len(), 2);

    let update = &requests[0].contents[0].text;
    assert!(update.contains("\"ok cool\""));
    assert!(update.contains(DEMO_PROFILE));

    let chat = &requests[1].contents[0].text;
    assert!(chat.contains("--- USER STYLE PROFILE (Clone this style) ---\nUser is terse and uses lowercase.\n"));
    assert!(chat.ends_with("User: ok cool\nAssistant:"));
    // Once in the history window, once as the turn to answer.
    assert!(chat.contains("User: ok cool\n--- END CONTEXT ---"));
    assert_eq!(chat.matches("ok cool").count(), 2);

    assert_profile(&harness, "User is terse and uses lowercase.");
    // The refined profile is written back to the account.
    let stored = harness
        .session
        .accounts()
        .authenticate("user1", "password")
        .unwrap();
    assert_eq!(stored.as_str(), "User is terse and uses lowercase.");
    assert_last_message(&harness, Role::Assistant, "yeah whatever");
}

#[tokio::test]
async fn test_echo_history_window() {
    let mut harness = TestHarness::with_config(
        SessionConfig::new(Variant::Echo).with_history_window(4),
    );
    harness.login_demo_user().await.unwrap();

    for i in 0..4 {
        harness
            .expect_reply(format!("profile {i}"))
            .expect_reply(format!("reply {i}"));
        harness.submit(&format!("message {i}")).await.unwrap();
    }

    let prompt = harness.model.last_prompt().unwrap();
    // Exactly four messages, the new turn included: reply 1, message 2,
    // reply 2, message 3.
    assert!(!prompt.contains("message 0"));
    assert!(!prompt.contains("message 1"));
    assert!(prompt.contains(
        "--- CONVERSATION HISTORY (for immediate context) ---\n\
         Assistant: reply 1\nUser: message 2\nAssistant: reply 2\nUser: message 3\n\
         --- END CONTEXT ---"
    ));
    assert!(prompt.ends_with("User: message 3\nAssistant:"));
}

#[tokio::test]
async fn test_echo_profile_refresh_failure_keeps_profile() {
    let mut harness = TestHarness::new(Variant::Echo);
    harness.login_demo_user().await.unwrap();
    harness.expect_failure("profile call failed").expect_reply("still here");

    harness.submit("hello").await.unwrap();

    assert_profile(&harness, DEMO_PROFILE);
    assert_roles(&harness, &[Role::User, Role::Assistant]);
}

#[tokio::test]
async fn test_echo_chat_failure_discards_refreshed_profile() {
    let mut harness = TestHarness::new(Variant::Echo);
    harness.login_demo_user().await.unwrap();
    harness
        .expect_reply("User writes in all caps.")
        .expect_failure("quota exceeded");

    let err = harness.submit("HELLO").await.unwrap_err();

    assert!(err.is_model_failure());
    assert!(harness.messages().is_empty());
    assert_profile(&harness, DEMO_PROFILE);
    let stored = harness
        .session
        .accounts()
        .authenticate("user1", "password")
        .unwrap();
    assert_eq!(stored.as_str(), DEMO_PROFILE);
}

// =============================================================================
// ECHO: TRAINING
// =============================================================================

#[tokio::test]
async fn test_training_flow_updates_profile_from_tag() {
    let mut harness = TestHarness::new(Variant::Echo);
    harness.login_demo_user().await.unwrap();

    harness.send(SessionEvent::StartTraining).await.unwrap();
    assert!(harness.session.training_active());
    assert_roles(&harness, &[Role::System, Role::Scenario]);
    assert_last_message(&harness, Role::Scenario, TRAINING_SCENARIO);

    harness.expect_reply(
        "Nailed it, very on-brand sarcasm.\n[NEW_PROFILE: Sarcastic, brief, loves 😅 and ellipses...]",
    );
    harness.submit("sure... 😅").await.unwrap();

    assert!(!harness.session.training_active());
    assert_profile(&harness, "Sarcastic, brief, loves 😅 and ellipses...");

    let messages = harness.messages();
    assert_eq!(messages[2].role, Role::User);
    assert_eq!(messages[2].content, "(My Reply): sure... 😅");
    assert_eq!(
        messages[3].content,
        format!("{TRAINING_ANALYSIS_HEADER}\nNailed it, very on-brand sarcasm.")
    );

    // Only one model call: the analysis.
    assert_eq!(harness.model.request_count(), 1);
    let prompt = harness.model.last_prompt().unwrap();
    assert!(prompt.contains("'sure... 😅'"));
}

#[tokio::test]
async fn test_training_without_tag_keeps_profile() {
    let mut harness = TestHarness::new(Variant::Echo);
    harness.login_demo_user().await.unwrap();
    harness.send(SessionEvent::StartTraining).await.unwrap();

    harness.expect_reply("Pretty good reply, no notes.");
    harness.submit("On it!").await.unwrap();

    assert_profile(&harness, DEMO_PROFILE);
    assert_last_message(&harness, Role::Assistant, "Pretty good reply, no notes.");
}

#[tokio::test]
async fn test_end_training_actually_ends_it() {
    let mut harness = TestHarness::new(Variant::Echo);
    harness.login_demo_user().await.unwrap();
    harness.send(SessionEvent::StartTraining).await.unwrap();

    harness.send(SessionEvent::EndTraining).await.unwrap();
    assert!(!harness.session.training_active());

    let err = harness.send(SessionEvent::EndTraining).await.unwrap_err();
    assert!(matches!(err, SessionError::NotTraining));

    // The next input is ordinary chat: profile refresh plus reply.
    harness.expect_reply("Profile.").expect_reply("Reply.");
    harness.submit("back to normal").await.unwrap();
    assert_eq!(harness.model.request_count(), 2);
}

#[tokio::test]
async fn test_training_failure_allows_retry() {
    let mut harness = TestHarness::new(Variant::Echo);
    harness.login_demo_user().await.unwrap();
    harness.send(SessionEvent::StartTraining).await.unwrap();

    harness.model.push(Scripted::failure("service unavailable"));
    assert!(harness.submit("Sure thing").await.is_err());

    assert!(harness.session.training_active());
    assert_roles(&harness, &[Role::System, Role::Scenario]);
}

#[tokio::test]
async fn test_echo_reset_keeps_login() {
    let mut harness = TestHarness::new(Variant::Echo);
    harness.login_demo_user().await.unwrap();
    harness.send(SessionEvent::StartTraining).await.unwrap();

    harness.send(SessionEvent::Reset).await.unwrap();

    assert!(harness.messages().is_empty());
    assert!(!harness.session.training_active());
    assert_eq!(harness.session.username(), Some("user1"));
    assert_profile(&harness, DEMO_PROFILE);
}

//! Scripted tests for the party and solo Dungeon Master variants.

use gemini::Content;
use parley_core::persona::{PARTY_DM_INSTRUCTIONS, SOLO_DM_INSTRUCTIONS};
use parley_core::testing::{assert_last_message, assert_roles, Scripted};
use parley_core::{
    DiceRequest, DieType, Role, SessionError, SessionEvent, SheetField, TestHarness, Variant,
};

// =============================================================================
// PARTY
// =============================================================================

async fn started_party() -> TestHarness {
    let mut harness = TestHarness::new(Variant::Party);
    harness.send(SessionEvent::BeginAdventure).await.unwrap();
    harness
}

#[tokio::test]
async fn test_party_intro_gate() {
    let mut harness = TestHarness::new(Variant::Party);
    assert!(harness.session.view().show_intro);

    let err = harness.submit("I look around").await.unwrap_err();
    assert!(matches!(err, SessionError::IntroPending));

    let err = harness
        .send(SessionEvent::Roll(DieType::D20.request()))
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::IntroPending));

    harness.send(SessionEvent::BeginAdventure).await.unwrap();
    assert!(!harness.session.view().show_intro);
    assert!(harness.messages().is_empty());
}

#[tokio::test]
async fn test_party_multi_turn_request() {
    let mut harness = started_party().await;
    harness
        .expect_reply("You stand at the mouth of a cave. Kaelen whispers...")
        .expect_reply("Bartholomew draws his sword!");

    harness.submit("I look around").await.unwrap();
    assert!(harness.session.view().game_started);
    harness.submit("I step inside").await.unwrap();

    let request = harness.model.last_request().unwrap();
    assert_eq!(request.system.as_deref(), Some(PARTY_DM_INSTRUCTIONS));
    assert_eq!(
        request.contents,
        vec![
            Content::user("I look around"),
            Content::model("You stand at the mouth of a cave. Kaelen whispers..."),
            Content::user("I step inside"),
        ]
    );
    assert_last_message(&harness, Role::Assistant, "Bartholomew draws his sword!");
}

#[tokio::test]
async fn test_party_roll_injects_message_and_gets_reply() {
    let mut harness = started_party().await;
    harness.expect_reply("The lock clicks open.");

    harness
        .send(SessionEvent::Roll(DieType::D20.request()))
        .await
        .unwrap();

    assert_roles(&harness, &[Role::User, Role::Assistant]);
    let roll = harness.session.last_roll().unwrap().clone();
    assert!((1..=20).contains(&roll.total));

    let injected = &harness.messages()[0].content;
    assert_eq!(
        injected,
        &format!(
            "I rolled a d20 and got a **{0}**! (My current modifier is +0, so the total is {0}). DM, what happens next?",
            roll.total
        )
    );
    assert_last_message(&harness, Role::Assistant, "The lock clicks open.");
}

#[tokio::test]
async fn test_party_refuses_multi_die_roll() {
    let mut harness = started_party().await;
    let err = harness
        .send(SessionEvent::Roll(DiceRequest::ABILITY_SCORE))
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::MultiDieRoll(_)));
    assert_eq!(harness.model.request_count(), 0);
}

#[tokio::test]
async fn test_party_roll_failure_rolls_back() {
    let mut harness = started_party().await;
    harness.expect_failure("backend down");

    let err = harness
        .send(SessionEvent::Roll(DieType::D6.request()))
        .await
        .unwrap_err();

    assert!(err
        .user_message(Variant::Party)
        .starts_with("A critical quest failure (API error) occurred:"));
    assert!(harness.messages().is_empty());
    assert!(!harness.session.view().game_started);
    assert!(harness.session.last_roll().is_none());
}

#[tokio::test]
async fn test_party_roll_failure_restores_previous_roll() {
    let mut harness = started_party().await;
    harness.expect_reply("You spot a trapdoor.");
    harness
        .send(SessionEvent::Roll(DieType::D20.request()))
        .await
        .unwrap();
    let kept = harness.session.last_roll().unwrap().clone();

    harness.expect_failure("backend down");
    harness
        .send(SessionEvent::Roll(DieType::D8.request()))
        .await
        .unwrap_err();

    assert_eq!(harness.session.last_roll(), Some(&kept));
    assert_roles(&harness, &[Role::User, Role::Assistant]);
}

#[tokio::test]
async fn test_party_reset_shows_intro_again() {
    let mut harness = started_party().await;
    harness.expect_reply("A dragon appears.");
    harness.submit("I yell").await.unwrap();

    harness.send(SessionEvent::ToggleRules).await.unwrap();
    assert!(harness.session.view().rules_visible);

    harness.send(SessionEvent::Reset).await.unwrap();
    let view = harness.session.view();
    assert!(view.messages.is_empty());
    assert!(view.show_intro);
    assert!(!view.game_started);
}

// =============================================================================
// SOLO
// =============================================================================

#[tokio::test]
async fn test_solo_roll_is_sidebar_only() {
    let mut harness = TestHarness::new(Variant::Solo);
    assert_eq!(harness.session.view().last_roll_label(), "—");

    harness
        .send(SessionEvent::Roll(DiceRequest::ABILITY_SCORE))
        .await
        .unwrap();

    let view = harness.session.view();
    let roll = view.last_roll.clone().unwrap();
    assert_eq!(roll.rolls.len(), 4);
    assert_eq!(roll.dropped().len(), 1);
    assert_eq!(roll.total, roll.kept().iter().sum::<u32>());
    assert!(view.last_roll_label().starts_with("4d6 Drop Lowest: "));
    assert!(view.roll_details().contains("(Dropped lowest: "));

    assert!(harness.messages().is_empty());
    assert_eq!(harness.model.request_count(), 0);
}

#[tokio::test]
async fn test_solo_rejects_invalid_roll() {
    let mut harness = TestHarness::new(Variant::Solo);
    let request = DiceRequest {
        num_dice: 2,
        sides: 6,
        drop_lowest: 2,
    };
    let err = harness.send(SessionEvent::Roll(request)).await.unwrap_err();
    assert!(matches!(err, SessionError::Dice(_)));
    assert!(harness.session.last_roll().is_none());
}

#[tokio::test]
async fn test_solo_streams_into_one_message() {
    let mut harness = TestHarness::new(Variant::Solo);
    harness.expect_reply("Welcome, brave Alistair! Let us roll your abilities.");

    harness.submit("Hello DM").await.unwrap();

    assert!(harness.fragments.len() > 1);
    assert_eq!(
        harness.fragments.concat(),
        "Welcome, brave Alistair! Let us roll your abilities."
    );
    assert_roles(&harness, &[Role::User, Role::Assistant]);
    assert_last_message(&harness, Role::Assistant, "Let us roll your abilities.");
}

#[tokio::test]
async fn test_solo_system_includes_character_sheet() {
    let mut harness = TestHarness::new(Variant::Solo);
    harness
        .send(SessionEvent::UpdateSheet(SheetField::Name, "  Mira ".into()))
        .await
        .unwrap();
    harness.expect_reply("Greetings, Mira.");

    harness.submit("I am ready").await.unwrap();

    let system = harness.model.last_request().unwrap().system.unwrap();
    assert!(system.starts_with(SOLO_DM_INSTRUCTIONS));
    assert!(system.contains("- Name: Mira\n"));
    assert!(system.contains("- Race: Half-Elf\n"));
}

#[tokio::test]
async fn test_solo_stream_failure_discards_partial_reply() {
    let mut harness = TestHarness::new(Variant::Solo);
    harness.expect_reply("The tavern is warm.");
    harness.submit("I enter the tavern").await.unwrap();

    harness.model.push(Scripted::StreamFailure {
        partial: "The barkeep ".into(),
        message: "connection reset".into(),
    });
    let err = harness.submit("I order an ale").await.unwrap_err();

    assert!(err.is_model_failure());
    assert_eq!(harness.fragments, vec!["The barkeep "]);
    assert_roles(&harness, &[Role::User, Role::Assistant]);
    assert_last_message(&harness, Role::Assistant, "The tavern is warm.");
}

#[tokio::test]
async fn test_solo_reset_keeps_last_roll() {
    let mut harness = TestHarness::new(Variant::Solo);
    harness
        .send(SessionEvent::Roll(DieType::D20.request()))
        .await
        .unwrap();
    harness.expect_reply("Hi.");
    harness.submit("hi").await.unwrap();

    harness.send(SessionEvent::Reset).await.unwrap();

    assert!(harness.messages().is_empty());
    assert!(harness.session.last_roll().is_some());
}

#[tokio::test]
async fn test_dm_variants_reject_echo_actions() {
    let mut harness = TestHarness::new(Variant::Solo);
    let err = harness.send(SessionEvent::StartTraining).await.unwrap_err();
    assert!(matches!(err, SessionError::Unsupported { variant: Variant::Solo, .. }));

    let mut harness = TestHarness::new(Variant::Party);
    let err = harness
        .send(SessionEvent::UpdateSheet(SheetField::Class, "Bard".into()))
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::Unsupported { .. }));
}

//! Persona chat sessions over a hosted generative model.
//!
//! This crate provides:
//! - Four chat variants (clone, echo, party DM, solo DM) behind one session type
//! - Prompt assembly with a bounded history window
//! - A learned style profile with tagged-update extraction
//! - Dice rolling with drop-lowest support
//! - A `Model` seam with a Gemini implementation and a scripted test double
//!
//! # Quick Start
//!
//! ```ignore
//! use parley_core::{ChatSession, SessionConfig, SessionEvent, Variant};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let model = Arc::new(gemini::Gemini::from_env()?);
//!     let mut session = ChatSession::new(SessionConfig::new(Variant::Clone), model);
//!
//!     session
//!         .handle_quiet(SessionEvent::Submit("Hi! Who are you?".into()))
//!         .await?;
//!
//!     for message in session.transcript().messages() {
//!         println!("{}: {}", message.role, message.content);
//!     }
//!     Ok(())
//! }
//! ```

pub mod accounts;
pub mod dice;
pub mod message;
pub mod model;
pub mod persona;
pub mod profile;
pub mod prompt;
pub mod session;
pub mod sheet;
pub mod testing;

// Primary public API
pub use accounts::AccountDirectory;
pub use dice::{DiceError, DiceRequest, DieType, RollResult};
pub use message::{ChatMessage, Role, Transcript};
pub use model::{GenerationSettings, Model, ModelError, ModelRequest};
pub use persona::{Tone, Variant};
pub use profile::{StyleProfile, DEFAULT_PROFILE};
pub use session::{
    ChatSession, Progress, SessionConfig, SessionError, SessionEvent, SessionView,
};
pub use sheet::{CharacterSheet, SheetField};
pub use testing::{ScriptedModel, TestHarness};

//! TUI widgets for the chat front-end

pub mod dice_roll;
pub mod input;
pub mod intro;
pub mod sidebar;
pub mod status_bar;
pub mod transcript;

pub use dice_roll::{DiceAnimationState, DiceRollWidget};
pub use input::InputWidget;
pub use intro::IntroWidget;
pub use sidebar::SidebarWidget;
pub use status_bar::{HotkeyBarWidget, StatusBarWidget};
pub use transcript::TranscriptWidget;

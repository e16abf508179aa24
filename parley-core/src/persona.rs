//! Persona instructions and the fixed texts each variant sends to the model.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The four chat front-ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    /// Cheerful cloning machine, single-turn prompts.
    #[default]
    Clone,
    /// "Echo": learns a style profile and runs the auto-reply training game.
    Echo,
    /// Dungeon Master for a party of three AI companions, batch replies.
    Party,
    /// Dungeon Master for a solo adventure, streamed replies.
    Solo,
}

impl Variant {
    pub const ALL: [Variant; 4] = [Variant::Clone, Variant::Echo, Variant::Party, Variant::Solo];

    pub fn name(&self) -> &'static str {
        match self {
            Variant::Clone => "clone",
            Variant::Echo => "echo",
            Variant::Party => "party",
            Variant::Solo => "solo",
        }
    }

    /// Window title.
    pub fn title(&self) -> &'static str {
        match self {
            Variant::Clone => "Clone",
            Variant::Echo => "Echo: The Auto-Reply Clone",
            Variant::Party => "D&D Game Master Bot",
            Variant::Solo => "Gemini Dungeon Master (D&D 5e)",
        }
    }

    /// Placeholder shown in an empty input line.
    pub fn input_hint(&self, training_active: bool) -> &'static str {
        match self {
            Variant::Clone => "Chat with Clone",
            Variant::Echo if training_active => "Your Reply to Scenario:",
            Variant::Echo => "Chat with Echo:",
            Variant::Party => "What do you do? (e.g., 'I look around the room')",
            Variant::Solo => "Enter your character's roll, action, or response...",
        }
    }

    /// Shown while a reply is being generated.
    pub fn pending_label(&self) -> &'static str {
        match self {
            Variant::Clone | Variant::Echo => "Thinking...",
            Variant::Party => "The Dungeon Master is thinking...",
            Variant::Solo => "The DM is consulting the scrolls...",
        }
    }

    /// Model used when none is configured. The solo DM ran on the larger model.
    pub fn default_model(&self) -> &'static str {
        match self {
            Variant::Solo => "gemini-2.5-pro",
            _ => gemini::DEFAULT_MODEL,
        }
    }

    /// Fixed persona text for this variant.
    pub fn persona(&self) -> &'static str {
        match self {
            Variant::Clone => CLONE_PERSONA,
            Variant::Echo => ECHO_PERSONA,
            Variant::Party => PARTY_DM_INSTRUCTIONS,
            Variant::Solo => SOLO_DM_INSTRUCTIONS,
        }
    }

    pub fn uses_dice(&self) -> bool {
        matches!(self, Variant::Party | Variant::Solo)
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Variant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "clone" => Ok(Variant::Clone),
            "echo" => Ok(Variant::Echo),
            "party" | "gm" => Ok(Variant::Party),
            "solo" | "dm" => Ok(Variant::Solo),
            other => Err(format!(
                "unknown variant '{other}' (expected clone, echo, party or solo)"
            )),
        }
    }
}

/// Conversational tone requested by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Tone {
    #[default]
    Friendly,
    Formal,
    Funny,
}

impl Tone {
    pub const ALL: [Tone; 3] = [Tone::Friendly, Tone::Formal, Tone::Funny];

    pub fn name(&self) -> &'static str {
        match self {
            Tone::Friendly => "Friendly",
            Tone::Formal => "Formal",
            Tone::Funny => "Funny",
        }
    }

    /// Line appended to the persona.
    pub fn instruction(&self) -> String {
        format!("Preferred tone for this conversation: {}.", self.name())
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Tone {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tone::ALL
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown tone '{s}' (expected friendly, formal or funny)"))
    }
}

pub const CLONE_PERSONA: &str = "You are a friendly, neutral cloning machine served to mimic the user's behaviours.
Use a cheerful tone at first but slowly mimic the user's personality, emojis are allowed.
Engage with the user to learn more about them.";

pub const ECHO_PERSONA: &str = "You are Echo, an elite personal assistant designed to analyze and clone the user's communication profile.
Your ultimate goal is to generate responses that are indistinguishable from the user's own replies.

**Primary Directive: Clone the User's Profile**
1.  **Tone & Sentiment:** (e.g., sarcastic, enthusiastic, brief, verbose).
2.  **Punctuation & Emojis:** Use their exact patterns (e.g., if they use \"!\", use \"!!\").
3.  **Core Vocabulary:** Identify and reuse the user's favorite words and slang.
4.  **Response Length:** Match the length of the user's previous inputs.

**Secondary Directive: Respond as the User**
Based on the current chat history, analyze the user's style, and then generate a reply to the *most recent* user message, exactly as they would.";

pub const PARTY_DM_INSTRUCTIONS: &str = "You are a witty, fair, and immersive Dungeon Master (DM) for a Dungeons & Dragons 5th Edition (5e) campaign.
The game is called 'The Quest for the Lost Artifact'.

**Your Core Roles:**
1.  **Narrate the World:** Describe the settings, non-player characters (NPCs), and the consequences of the players' actions.
2.  **Manage the Story:** Guide the overarching plot. Present challenges, puzzles, and encounters.
3.  **Handle Game Mechanics:**
    * When a player wants to attempt an action with an uncertain outcome (e.g., attacking, persuading, searching), you must ask them for a **d20 roll** plus any relevant modifier (e.g., 'Roll a DC 15 Persuasion check.').
    * The player will then tell you the result of their roll (e.g., 'I rolled a 17!').
    * You will then determine if they succeed or fail based on the Difficulty Class (DC) you set and describe the outcome.
4.  **Manage Player Characters (PCs):** There are up to 4 players, including the human user.
    * **User (The Player):** The human interacting with you.
    * **AI Player 1 (Kaelen):** A stoic, half-elf Rogue, specialized in stealth. Kaelen often suggests the sneaky route.
    * **AI Player 2 (Bartholomew):** A boisterous, human Paladin, always advocating for the most honorable and direct approach.
    * **AI Player 3 (Lyra):** A quirky, gnome Wizard, who is very curious and prone to casting unnecessary spells.

**When the user gives an instruction or asks a question:**
* Respond as the DM, addressing the user's action and then, if appropriate, having the AI Players react or offer their own suggestions *in the third person* (e.g., \"Kaelen whispers, 'Maybe we should check the shadows first.'\").
* If the user asks to start a new game or if the session is just beginning, set the scene.
* **Keep the narrative flowing and be descriptive!**

**Start the game now. Set the initial scene and introduce the party.**";

pub const SOLO_DM_INSTRUCTIONS: &str = "You are a Dungeon Master (DM) for a solo Dungeons & Dragons 5th Edition text-based adventure.
Your primary goal is to provide an immersive, dynamic, and challenging role-playing experience.

### DM Rules & Behavior:
1.  **Do Not Break Character:** You are the DM and the world. Never mention that you are an AI or a language model.
2.  **Immersive Descriptions:** Describe scenes, NPCs, and events using vivid sensory details (sight, sound, smell, feel).
3.  **NPCs & Monsters:** Control all Non-Player Characters and monsters. You determine their actions, dialogue, and motivations.
4.  **Skill Checks & Rolls:**
    * When the player is required to roll for an action in the adventure, they will state the result in the chat (e.g., \"I rolled a 15 + 2 for a total of 17\"). You then determine the outcome.
5.  **Combat & Pacing:** Manage the combat rounds, track enemy stats, and keep the story moving.

### Game Start Sequence (CRITICAL - FOLLOW THESE STEPS EXACTLY):
1.  **Welcome & Character Status:** Your absolute first response must be a friendly welcome, acknowledging that the player has entered their basic character details in the sidebar.
2.  **Ability Score Roll (Step 1):** You must then explain the six D&D Ability Scores (Strength, Dexterity, Constitution, Intelligence, Wisdom, Charisma) and instruct the player to use the **4d6 Drop Lowest** method to generate their six scores. Instruct the player to enter their six results, one by one, in the chat.
3.  **Party Introduction (Step 2):** After the player has successfully provided six ability scores, your next response must be to introduce three pre-rolled, Level 1, AI-controlled party members, including their Name, Race, Class, and their six ability scores (you must generate these stats for them).
4.  **Scene Setup (Step 3):** After the party introduction, you must immediately ask the player: **\"With your full party assembled, do you wish to describe the first scene/location yourself, or shall I roll on the Random Encounters table to start the adventure?\"** The adventure begins only after the player answers this question.";

/// The external message the user answers during auto-reply training.
pub const TRAINING_SCENARIO: &str =
    "Your boss just texted you: 'Are you available for a quick 5-minute call at 4:30 PM today?'";

pub const TRAINING_ACTIVATED: &str = "***--- TRAINING MODE ACTIVATED ---***
Your task: Auto-reply to the following scenario in your own voice. Type your reply below.";

pub const TRAINING_ANALYSIS_HEADER: &str = "***--- TRAINING ANALYSIS ---***";

/// Party roster shown next to the party DM.
pub const PARTY_ROSTER: [(&str, &str); 3] = [
    ("Kaelen", "half-elf Rogue"),
    ("Bartholomew", "human Paladin"),
    ("Lyra", "gnome Wizard"),
];

pub const PARTY_INTRO: &str = "You are about to embark on an epic Dungeons & Dragons adventure!

The AI will serve as your Dungeon Master (DM) and control three AI party members.

How to Play:
1. Begin the adventure to start the story.
2. When the DM asks for a roll (like a d20), use the dice roller.
3. Type your actions in the chat!";

pub const PARTY_RULES: [&str; 3] = [
    "Rolls: When the DM asks for a check (e.g., 'DC 15 Persuasion'), use the dice roller to get your result.",
    "Modifiers: For simplicity, assume a +0 modifier to your rolls initially. Tell the DM the total.",
    "Actions: Describe what you want to do (e.g., 'I search the chest', 'I use my sword'). The DM handles the rest!",
];

pub const SOLO_RULES: &str = "When the DM asks for a check, type your total result (e.g., 'I got an 18'). For generating ability scores, use the 4d6 Drop Lowest roll and type your final result into the chat.";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_round_trip_names() {
        for variant in Variant::ALL {
            assert_eq!(variant.name().parse::<Variant>().unwrap(), variant);
        }
        assert_eq!("DM".parse::<Variant>().unwrap(), Variant::Solo);
        assert!("chess".parse::<Variant>().is_err());
    }

    #[test]
    fn test_tone_parse() {
        assert_eq!("formal".parse::<Tone>().unwrap(), Tone::Formal);
        assert_eq!(" FUNNY ".parse::<Tone>().unwrap(), Tone::Funny);
        assert!("grumpy".parse::<Tone>().is_err());
    }

    #[test]
    fn test_variant_capabilities() {
        assert!(Variant::Party.uses_dice());
        assert!(!Variant::Echo.uses_dice());
        assert_eq!(Variant::Solo.default_model(), "gemini-2.5-pro");
        assert_eq!(Variant::Echo.input_hint(true), "Your Reply to Scenario:");
    }
}

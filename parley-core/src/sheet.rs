//! Solo-adventure character sheet.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Basic character details the player fills in before the adventure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterSheet {
    pub name: String,
    pub race: String,
    pub class: String,
    /// Free-text appearance and background notes.
    pub details: String,
    /// Free-text "HP / AC" tracker.
    pub hp_ac: String,
}

impl Default for CharacterSheet {
    fn default() -> Self {
        Self {
            name: "Alistair".to_string(),
            race: "Half-Elf".to_string(),
            class: "Rogue".to_string(),
            details: "6ft tall, green eyes, wears a tattered cloak.".to_string(),
            hp_ac: "10 / 14".to_string(),
        }
    }
}

impl CharacterSheet {
    pub fn get(&self, field: SheetField) -> &str {
        match field {
            SheetField::Name => &self.name,
            SheetField::Race => &self.race,
            SheetField::Class => &self.class,
            SheetField::Details => &self.details,
            SheetField::HpAc => &self.hp_ac,
        }
    }

    pub fn set(&mut self, field: SheetField, value: impl Into<String>) {
        let value = value.into();
        match field {
            SheetField::Name => self.name = value,
            SheetField::Race => self.race = value,
            SheetField::Class => self.class = value,
            SheetField::Details => self.details = value,
            SheetField::HpAc => self.hp_ac = value,
        }
    }

    /// Block appended to the DM's system instruction.
    pub fn system_block(&self) -> String {
        let mut out = String::from("### Player Character (from the sidebar)\n");
        for field in SheetField::ALL {
            out.push_str(&format!("- {}: {}\n", field.label(), self.get(field)));
        }
        out
    }
}

/// Editable sheet fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SheetField {
    Name,
    Race,
    Class,
    Details,
    HpAc,
}

impl SheetField {
    pub const ALL: [SheetField; 5] = [
        SheetField::Name,
        SheetField::Race,
        SheetField::Class,
        SheetField::Details,
        SheetField::HpAc,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            SheetField::Name => "Name",
            SheetField::Race => "Race",
            SheetField::Class => "Class",
            SheetField::Details => "Details",
            SheetField::HpAc => "HP / AC",
        }
    }
}

impl fmt::Display for SheetField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for SheetField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "name" => Ok(SheetField::Name),
            "race" => Ok(SheetField::Race),
            "class" => Ok(SheetField::Class),
            "details" | "notes" => Ok(SheetField::Details),
            "hp" | "ac" | "hp_ac" | "hpac" => Ok(SheetField::HpAc),
            other => Err(format!(
                "unknown sheet field '{other}' (expected name, race, class, details or hp)"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let sheet = CharacterSheet::default();
        assert_eq!(sheet.name, "Alistair");
        assert_eq!(sheet.get(SheetField::HpAc), "10 / 14");
    }

    #[test]
    fn test_set_and_system_block() {
        let mut sheet = CharacterSheet::default();
        sheet.set("class".parse().unwrap(), "Bard");
        let block = sheet.system_block();
        assert!(block.contains("- Class: Bard\n"));
        assert!(block.contains("- Name: Alistair\n"));
        assert!("wings".parse::<SheetField>().is_err());
    }
}

//! Dice rolling.
//!
//! Supports `NdS` rolls with an optional "drop lowest K" rule, written as
//! `4d6dl1`. Every die is uniform on `[1, S]`; results are sorted ascending
//! before the lowest `K` are dropped.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error type for dice parsing and rolling.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DiceError {
    #[error("Invalid dice notation: {0}")]
    InvalidNotation(String),
    #[error("Invalid die size: {0}")]
    InvalidDieSize(u32),
    #[error("No dice specified")]
    NoDice,
    #[error("Cannot drop {drop} dice when only rolling {count}")]
    InvalidDropCount { drop: u32, count: u32 },
    #[error("Too many dice: {count} (at most {max})")]
    TooManyDice { count: u32, max: u32 },
    #[error("Die too large: d{sides} (at most d{max})")]
    DieTooLarge { sides: u32, max: u32 },
}

/// Most dice a single request may roll.
pub const MAX_DICE: u32 = 100;
/// Largest die a request may name.
pub const MAX_SIDES: u32 = 1000;

/// The dice offered as one-click buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DieType {
    D4,
    D6,
    D8,
    D10,
    D12,
    D20,
}

impl DieType {
    /// Button order: d4, d6, d8, d10, d12, d20.
    pub const ALL: [DieType; 6] = [
        DieType::D4,
        DieType::D6,
        DieType::D8,
        DieType::D10,
        DieType::D12,
        DieType::D20,
    ];

    pub fn sides(&self) -> u32 {
        match self {
            DieType::D4 => 4,
            DieType::D6 => 6,
            DieType::D8 => 8,
            DieType::D10 => 10,
            DieType::D12 => 12,
            DieType::D20 => 20,
        }
    }

    /// A single roll of this die.
    pub fn request(&self) -> DiceRequest {
        DiceRequest {
            num_dice: 1,
            sides: self.sides(),
            drop_lowest: 0,
        }
    }
}

impl fmt::Display for DieType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "d{}", self.sides())
    }
}

/// What to roll: `num_dice` dice with `sides` faces, discarding the lowest
/// `drop_lowest` before summing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceRequest {
    pub num_dice: u32,
    pub sides: u32,
    pub drop_lowest: u32,
}

impl DiceRequest {
    /// The ability score method: four d6, drop the lowest.
    pub const ABILITY_SCORE: DiceRequest = DiceRequest {
        num_dice: 4,
        sides: 6,
        drop_lowest: 1,
    };

    /// Build and validate a request.
    pub fn new(num_dice: u32, sides: u32, drop_lowest: u32) -> Result<Self, DiceError> {
        let request = Self {
            num_dice,
            sides,
            drop_lowest,
        };
        request.validate()?;
        Ok(request)
    }

    fn validate(&self) -> Result<(), DiceError> {
        if self.num_dice == 0 {
            return Err(DiceError::NoDice);
        }
        if self.num_dice > MAX_DICE {
            return Err(DiceError::TooManyDice {
                count: self.num_dice,
                max: MAX_DICE,
            });
        }
        if self.sides == 0 {
            return Err(DiceError::InvalidDieSize(self.sides));
        }
        if self.sides > MAX_SIDES {
            return Err(DiceError::DieTooLarge {
                sides: self.sides,
                max: MAX_SIDES,
            });
        }
        if self.drop_lowest >= self.num_dice {
            return Err(DiceError::InvalidDropCount {
                drop: self.drop_lowest,
                count: self.num_dice,
            });
        }
        Ok(())
    }

    /// Parse notation like `d20`, `3d8`, or `4d6dl1`.
    pub fn parse(notation: &str) -> Result<Self, DiceError> {
        let notation: String = notation
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_lowercase();
        if notation.is_empty() {
            return Err(DiceError::NoDice);
        }

        let invalid = || DiceError::InvalidNotation(notation.clone());

        let d_pos = notation.find('d').ok_or_else(invalid)?;
        let count_str = &notation[..d_pos];
        let rest = &notation[d_pos + 1..];

        let num_dice: u32 = if count_str.is_empty() {
            1
        } else {
            count_str.parse().map_err(|_| invalid())?
        };

        let (sides_str, drop_lowest) = match rest.find("dl") {
            Some(dl_pos) => {
                let drop: u32 = rest[dl_pos + 2..].parse().map_err(|_| invalid())?;
                (&rest[..dl_pos], drop)
            }
            None => (rest, 0),
        };

        let sides: u32 = sides_str.parse().map_err(|_| invalid())?;

        Self::new(num_dice, sides, drop_lowest)
    }

    /// Short notation: `d20` for a single die, otherwise `3d8` or `4d6dl1`.
    pub fn notation(&self) -> String {
        if self.num_dice == 1 && self.drop_lowest == 0 {
            format!("d{}", self.sides)
        } else {
            self.to_string()
        }
    }

    /// Roll with a specific RNG (useful for testing).
    pub fn roll_with_rng<R: Rng>(&self, rng: &mut R) -> Result<RollResult, DiceError> {
        self.validate()?;
        let rolls: Vec<u32> = (0..self.num_dice)
            .map(|_| rng.gen_range(1..=self.sides))
            .collect();
        Ok(RollResult::from_rolls(*self, rolls))
    }
}

impl FromStr for DiceRequest {
    type Err = DiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DiceRequest::parse(s)
    }
}

impl fmt::Display for DiceRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}d{}", self.num_dice, self.sides)?;
        if self.drop_lowest > 0 {
            write!(f, "dl{}", self.drop_lowest)?;
        }
        Ok(())
    }
}

/// Complete result of a dice roll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollResult {
    pub request: DiceRequest,
    /// Every die rolled, sorted ascending.
    pub rolls: Vec<u32>,
    pub total: u32,
}

impl RollResult {
    /// Build a result from raw die values (any order).
    pub fn from_rolls(request: DiceRequest, mut rolls: Vec<u32>) -> Self {
        rolls.sort_unstable();
        let drop = (request.drop_lowest as usize).min(rolls.len());
        let total = rolls[drop..]
            .iter()
            .fold(0u32, |sum, r| sum.saturating_add(*r));
        Self {
            request,
            rolls,
            total,
        }
    }

    /// The dice discarded by the drop-lowest rule.
    pub fn dropped(&self) -> &[u32] {
        let drop = (self.request.drop_lowest as usize).min(self.rolls.len());
        &self.rolls[..drop]
    }

    /// The dice that count toward the total.
    pub fn kept(&self) -> &[u32] {
        let drop = (self.request.drop_lowest as usize).min(self.rolls.len());
        &self.rolls[drop..]
    }

    /// Human-readable trace, e.g. `Rolls: [2, 3, 5, 6] (Dropped lowest: [2]). Sum: 14`.
    pub fn trace(&self) -> String {
        if self.request.drop_lowest > 0 {
            format!(
                "Rolls: {:?} (Dropped lowest: {:?}). Sum: {}",
                self.rolls,
                self.dropped(),
                self.total
            )
        } else {
            format!("Rolls: {:?}. Sum: {}", self.rolls, self.total)
        }
    }

    /// Short headline, e.g. `d20 Roll: 17`, `3d8 Roll: 12` or `4d6 Drop Lowest: 14`.
    pub fn label(&self) -> String {
        if self.request.drop_lowest > 0 {
            format!(
                "{}d{} Drop Lowest: {}",
                self.request.num_dice, self.request.sides, self.total
            )
        } else if self.request.num_dice > 1 {
            format!(
                "{}d{} Roll: {}",
                self.request.num_dice, self.request.sides, self.total
            )
        } else {
            format!("d{} Roll: {}", self.request.sides, self.total)
        }
    }

    /// Dice breakdown with dropped dice in parentheses: `[(2), 3, 5, 6]`.
    pub fn breakdown(&self) -> String {
        let dropped = self.dropped().len();
        let shown: Vec<String> = self
            .rolls
            .iter()
            .enumerate()
            .map(|(i, r)| {
                if i < dropped {
                    format!("({r})")
                } else {
                    r.to_string()
                }
            })
            .collect();
        format!("[{}]", shown.join(", "))
    }

    /// The chat line a player sends to the DM after rolling.
    pub fn announcement(&self) -> String {
        format!(
            "I rolled a d{} and got a **{}**! (My current modifier is +0, so the total is {}). DM, what happens next?",
            self.request.sides, self.total, self.total
        )
    }
}

impl fmt::Display for RollResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.breakdown(), self.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn test_parse_simple() {
        let request = DiceRequest::parse("d20").unwrap();
        assert_eq!(request, DieType::D20.request());

        let request = DiceRequest::parse("3D8").unwrap();
        assert_eq!(request.num_dice, 3);
        assert_eq!(request.sides, 8);
        assert_eq!(request.drop_lowest, 0);
    }

    #[test]
    fn test_parse_drop_lowest() {
        let request = DiceRequest::parse("4d6 dl1").unwrap();
        assert_eq!(request, DiceRequest::ABILITY_SCORE);
        assert_eq!(request.to_string(), "4d6dl1");
    }

    #[test]
    fn test_parse_invalid() {
        assert_eq!(DiceRequest::parse(""), Err(DiceError::NoDice));
        assert!(matches!(
            DiceRequest::parse("banana"),
            Err(DiceError::InvalidNotation(_))
        ));
        assert_eq!(DiceRequest::parse("0d6"), Err(DiceError::NoDice));
        assert_eq!(DiceRequest::parse("2d0"), Err(DiceError::InvalidDieSize(0)));
        assert_eq!(
            DiceRequest::parse("2d6dl2"),
            Err(DiceError::InvalidDropCount { drop: 2, count: 2 })
        );
    }

    #[test]
    fn test_rolls_within_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        for sides in [1, 2, 4, 6, 13, 20, 100] {
            for num_dice in 1..=5 {
                let request = DiceRequest::new(num_dice, sides, 0).unwrap();
                let result = request.roll_with_rng(&mut rng).unwrap();
                assert_eq!(result.rolls.len(), num_dice as usize);
                assert!(result.rolls.iter().all(|r| (1..=sides).contains(r)));
            }
        }
    }

    #[test]
    fn test_drop_lowest_sums_highest() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..200 {
            let request = DiceRequest::new(5, 6, 2).unwrap();
            let result = request.roll_with_rng(&mut rng).unwrap();

            let mut highest = result.rolls.clone();
            highest.sort_unstable_by(|a, b| b.cmp(a));
            let expected: u32 = highest.iter().take(3).sum();

            assert_eq!(result.total, expected);
            assert_eq!(result.dropped().len(), 2);
            assert_eq!(result.kept().len(), 3);
        }
    }

    #[test]
    fn test_four_d6_drop_lowest_example() {
        let result = RollResult::from_rolls(DiceRequest::ABILITY_SCORE, vec![2, 5, 6, 3]);
        assert_eq!(result.rolls, vec![2, 3, 5, 6]);
        assert_eq!(result.dropped(), &[2]);
        assert_eq!(result.total, 14);
        assert_eq!(
            result.trace(),
            "Rolls: [2, 3, 5, 6] (Dropped lowest: [2]). Sum: 14"
        );
        assert_eq!(result.label(), "4d6 Drop Lowest: 14");
        assert_eq!(result.breakdown(), "[(2), 3, 5, 6]");
    }

    #[test]
    fn test_d20_reaches_both_bounds() {
        let mut rng = StdRng::seed_from_u64(2024);
        let request = DieType::D20.request();
        let seen: HashSet<u32> = (0..2000)
            .map(|_| request.roll_with_rng(&mut rng).unwrap().total)
            .collect();

        assert!(seen.iter().all(|v| (1..=20).contains(v)));
        assert!(seen.contains(&1));
        assert!(seen.contains(&20));
    }

    #[test]
    fn test_single_die_text() {
        let result = RollResult::from_rolls(DieType::D20.request(), vec![17]);
        assert_eq!(result.trace(), "Rolls: [17]. Sum: 17");
        assert_eq!(result.label(), "d20 Roll: 17");
        assert_eq!(
            result.announcement(),
            "I rolled a d20 and got a **17**! (My current modifier is +0, so the total is 17). DM, what happens next?"
        );
    }

    #[test]
    fn test_invalid_request_is_rejected_at_roll_time() {
        let request = DiceRequest {
            num_dice: 2,
            sides: 6,
            drop_lowest: 3,
        };
        let mut rng = StdRng::seed_from_u64(1);
        assert!(request.roll_with_rng(&mut rng).is_err());
    }

    #[test]
    fn test_oversized_requests_are_rejected() {
        assert_eq!(
            DiceRequest::parse("2d4294967295"),
            Err(DiceError::DieTooLarge {
                sides: u32::MAX,
                max: MAX_SIDES
            })
        );
        assert_eq!(
            DiceRequest::parse("4000000000d6"),
            Err(DiceError::TooManyDice {
                count: 4_000_000_000,
                max: MAX_DICE
            })
        );
        assert!(DiceRequest::parse("100d1000").is_ok());
        assert!(DiceRequest::parse("101d6").is_err());
        assert!(DiceRequest::parse("1d1001").is_err());

        // Built by hand, the request still fails before any die is rolled.
        let request = DiceRequest {
            num_dice: u32::MAX,
            sides: 6,
            drop_lowest: 0,
        };
        let mut rng = StdRng::seed_from_u64(3);
        assert!(request.roll_with_rng(&mut rng).is_err());
    }

    #[test]
    fn test_total_saturates_instead_of_overflowing() {
        let request = DiceRequest {
            num_dice: 2,
            sides: u32::MAX,
            drop_lowest: 0,
        };
        let result = RollResult::from_rolls(request, vec![u32::MAX, u32::MAX]);
        assert_eq!(result.total, u32::MAX);
    }

    #[test]
    fn test_notation() {
        assert_eq!(DieType::D20.request().notation(), "d20");
        assert_eq!(DiceRequest::new(3, 8, 0).unwrap().notation(), "3d8");
        assert_eq!(DiceRequest::ABILITY_SCORE.notation(), "4d6dl1");
    }

    #[test]
    fn test_die_types() {
        let sides: Vec<u32> = DieType::ALL.iter().map(|d| d.sides()).collect();
        assert_eq!(sides, vec![4, 6, 8, 10, 12, 20]);
        assert_eq!(DieType::D10.to_string(), "d10");
    }
}

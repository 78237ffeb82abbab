// src/types.rs

//! Shared vocabulary for procedures, the executor and its observers.
//!
//! All enums serialize in SCREAMING_SNAKE_CASE so documents and snapshots use
//! the same spelling race officers see on the signal board.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Identifier of a node in a procedure graph.
pub type NodeId = String;

/// Signal flags that can be displayed during a start sequence.
///
/// `Prep` is a placeholder: whenever a node raises it, the executor swaps in
/// the preparatory flag chosen by the operator for the current sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlagId {
    Class,
    P,
    I,
    Z,
    U,
    Black,
    X,
    FirstSub,
    Ap,
    N,
    S,
    C,
    L,
    Blue,
    Prep,
}

impl FlagId {
    pub const ALL: [FlagId; 15] = [
        FlagId::Class,
        FlagId::P,
        FlagId::I,
        FlagId::Z,
        FlagId::U,
        FlagId::Black,
        FlagId::X,
        FlagId::FirstSub,
        FlagId::Ap,
        FlagId::N,
        FlagId::S,
        FlagId::C,
        FlagId::L,
        FlagId::Blue,
        FlagId::Prep,
    ];

    /// Flags that may stay up once the race is underway (shortened course,
    /// finish line).
    pub fn is_result_marker(self) -> bool {
        matches!(self, FlagId::S | FlagId::Blue)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FlagId::Class => "CLASS",
            FlagId::P => "P",
            FlagId::I => "I",
            FlagId::Z => "Z",
            FlagId::U => "U",
            FlagId::Black => "BLACK",
            FlagId::X => "X",
            FlagId::FirstSub => "FIRST_SUB",
            FlagId::Ap => "AP",
            FlagId::N => "N",
            FlagId::S => "S",
            FlagId::C => "C",
            FlagId::L => "L",
            FlagId::Blue => "BLUE",
            FlagId::Prep => "PREP",
        }
    }
}

impl fmt::Display for FlagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FlagId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_uppercase();
        FlagId::ALL
            .into_iter()
            .find(|flag| flag.as_str() == wanted)
            .ok_or_else(|| format!("unknown flag: {s}"))
    }
}

/// Flag displayed alongside the class flag at the preparatory signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PrepFlag {
    #[default]
    P,
    I,
    Z,
    U,
    Black,
}

impl From<PrepFlag> for FlagId {
    fn from(flag: PrepFlag) -> Self {
        match flag {
            PrepFlag::P => FlagId::P,
            PrepFlag::I => FlagId::I,
            PrepFlag::Z => FlagId::Z,
            PrepFlag::U => FlagId::U,
            PrepFlag::Black => FlagId::Black,
        }
    }
}

impl TryFrom<FlagId> for PrepFlag {
    type Error = String;

    fn try_from(flag: FlagId) -> Result<Self, Self::Error> {
        match flag {
            FlagId::P => Ok(PrepFlag::P),
            FlagId::I => Ok(PrepFlag::I),
            FlagId::Z => Ok(PrepFlag::Z),
            FlagId::U => Ok(PrepFlag::U),
            FlagId::Black => Ok(PrepFlag::Black),
            other => Err(format!(
                "{other} is not a preparatory flag (expected P, I, Z, U or BLACK)"
            )),
        }
    }
}

impl FromStr for PrepFlag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PrepFlag::try_from(s.parse::<FlagId>()?)
    }
}

impl fmt::Display for PrepFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        FlagId::from(*self).fmt(f)
    }
}

/// Phase of the race as reported to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RaceStatus {
    #[default]
    Idle,
    Warning,
    Preparatory,
    OneMinute,
    Racing,
    Postponed,
    IndividualRecall,
    GeneralRecall,
    Abandoned,
    Finished,
}

impl RaceStatus {
    /// Statuses reached through an operator override rather than the clock.
    pub fn is_special(self) -> bool {
        matches!(
            self,
            RaceStatus::Postponed | RaceStatus::IndividualRecall | RaceStatus::GeneralRecall
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RaceStatus::Racing | RaceStatus::Abandoned | RaceStatus::Finished
        )
    }
}

impl fmt::Display for RaceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RaceStatus::Idle => "IDLE",
            RaceStatus::Warning => "WARNING",
            RaceStatus::Preparatory => "PREPARATORY",
            RaceStatus::OneMinute => "ONE_MINUTE",
            RaceStatus::Racing => "RACING",
            RaceStatus::Postponed => "POSTPONED",
            RaceStatus::IndividualRecall => "INDIVIDUAL_RECALL",
            RaceStatus::GeneralRecall => "GENERAL_RECALL",
            RaceStatus::Abandoned => "ABANDONED",
            RaceStatus::Finished => "FINISHED",
        };
        f.write_str(s)
    }
}

/// Acoustic signal played alongside a flag change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SoundSignal {
    #[default]
    None,
    OneShort,
    OneLong,
    TwoShort,
    ThreeShort,
}

impl SoundSignal {
    pub fn is_none(self) -> bool {
        self == SoundSignal::None
    }
}

impl fmt::Display for SoundSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SoundSignal::None => "NONE",
            SoundSignal::OneShort => "ONE_SHORT",
            SoundSignal::OneLong => "ONE_LONG",
            SoundSignal::TwoShort => "TWO_SHORT",
            SoundSignal::ThreeShort => "THREE_SHORT",
        };
        f.write_str(s)
    }
}

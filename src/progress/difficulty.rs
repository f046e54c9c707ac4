use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Replay-difficulty tier, from the base game through New Game +9.
///
/// Ordering is positional and drives previous/next navigation in the
/// progression views; it carries no numeric meaning beyond that. Serialized
/// as the tracker's historical strings (`base`, `ng-plus`, `ng-plus-2`, ...)
/// so existing saves keep parsing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DifficultyTier {
    #[default]
    #[serde(rename = "base")]
    Base,
    #[serde(rename = "ng-plus")]
    NgPlus,
    #[serde(rename = "ng-plus-2")]
    NgPlus2,
    #[serde(rename = "ng-plus-3")]
    NgPlus3,
    #[serde(rename = "ng-plus-4")]
    NgPlus4,
    #[serde(rename = "ng-plus-5")]
    NgPlus5,
    #[serde(rename = "ng-plus-6")]
    NgPlus6,
    #[serde(rename = "ng-plus-7")]
    NgPlus7,
    #[serde(rename = "ng-plus-8")]
    NgPlus8,
    #[serde(rename = "ng-plus-9")]
    NgPlus9,
}

impl DifficultyTier {
    /// All tiers in navigation order.
    pub const ALL: [DifficultyTier; 10] = [
        DifficultyTier::Base,
        DifficultyTier::NgPlus,
        DifficultyTier::NgPlus2,
        DifficultyTier::NgPlus3,
        DifficultyTier::NgPlus4,
        DifficultyTier::NgPlus5,
        DifficultyTier::NgPlus6,
        DifficultyTier::NgPlus7,
        DifficultyTier::NgPlus8,
        DifficultyTier::NgPlus9,
    ];

    /// The persisted string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            DifficultyTier::Base => "base",
            DifficultyTier::NgPlus => "ng-plus",
            DifficultyTier::NgPlus2 => "ng-plus-2",
            DifficultyTier::NgPlus3 => "ng-plus-3",
            DifficultyTier::NgPlus4 => "ng-plus-4",
            DifficultyTier::NgPlus5 => "ng-plus-5",
            DifficultyTier::NgPlus6 => "ng-plus-6",
            DifficultyTier::NgPlus7 => "ng-plus-7",
            DifficultyTier::NgPlus8 => "ng-plus-8",
            DifficultyTier::NgPlus9 => "ng-plus-9",
        }
    }

    /// Display label matching the in-game naming.
    pub fn label(&self) -> &'static str {
        match self {
            DifficultyTier::Base => "Base Level",
            DifficultyTier::NgPlus => "New Game +",
            DifficultyTier::NgPlus2 => "New Game ++",
            DifficultyTier::NgPlus3 => "New Game +3",
            DifficultyTier::NgPlus4 => "New Game +4",
            DifficultyTier::NgPlus5 => "New Game +5",
            DifficultyTier::NgPlus6 => "New Game +6",
            DifficultyTier::NgPlus7 => "New Game +7",
            DifficultyTier::NgPlus8 => "New Game +8",
            DifficultyTier::NgPlus9 => "New Game +9",
        }
    }

    /// Position within [`DifficultyTier::ALL`].
    pub fn position(&self) -> usize {
        *self as usize
    }

    /// The tier after this one, if any.
    pub fn next(&self) -> Option<DifficultyTier> {
        DifficultyTier::ALL.get(self.position() + 1).copied()
    }

    /// The tier before this one, if any.
    pub fn prev(&self) -> Option<DifficultyTier> {
        let position = self.position().checked_sub(1)?;
        DifficultyTier::ALL.get(position).copied()
    }
}

impl fmt::Display for DifficultyTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for strings that name no known difficulty tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownDifficulty(pub String);

impl fmt::Display for UnknownDifficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown difficulty tier: {}", self.0)
    }
}

impl std::error::Error for UnknownDifficulty {}

impl FromStr for DifficultyTier {
    type Err = UnknownDifficulty;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DifficultyTier::ALL
            .iter()
            .find(|tier| tier.as_str() == s)
            .copied()
            .ok_or_else(|| UnknownDifficulty(s.to_string()))
    }
}

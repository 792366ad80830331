//! Domain enumerations shared across imgvote crates
//!
//! The participating models form a closed set fixed at build time. A survey
//! deployment may enable a subset of them through configuration, but it
//! cannot add new ones at runtime: that would need a new catalog and a new
//! chunk partition anyway.

use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Image generation system that produced a candidate image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ModelName {
    #[serde(rename = "gpt5")]
    Gpt5,
    #[serde(rename = "gemini25")]
    Gemini25,
    #[serde(rename = "flux1_dev")]
    Flux1Dev,
    #[serde(rename = "flux1_krea")]
    Flux1Krea,
    #[serde(rename = "kolors")]
    Kolors,
}

impl ModelName {
    /// Every model known to this build, in canonical order
    pub const ALL: [ModelName; 5] = [
        ModelName::Gpt5,
        ModelName::Gemini25,
        ModelName::Flux1Dev,
        ModelName::Flux1Krea,
        ModelName::Kolors,
    ];

    /// Storage and wire identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelName::Gpt5 => "gpt5",
            ModelName::Gemini25 => "gemini25",
            ModelName::Flux1Dev => "flux1_dev",
            ModelName::Flux1Krea => "flux1_krea",
            ModelName::Kolors => "kolors",
        }
    }

    /// Human readable label used in reports
    pub fn display_name(&self) -> &'static str {
        match self {
            ModelName::Gpt5 => "gpt-5",
            ModelName::Gemini25 => "gemini-2.5",
            ModelName::Flux1Dev => "flux.1-dev",
            ModelName::Flux1Krea => "flux.1-krea",
            ModelName::Kolors => "kolors",
        }
    }
}

impl fmt::Display for ModelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModelName::ALL
            .iter()
            .copied()
            .find(|model| model.as_str() == s)
            .ok_or_else(|| Error::InvalidInput(format!("unknown model: {}", s)))
    }
}

/// Outcome of a single vote: one of the models, or a tie
///
/// `Tie` is only ever a vote outcome, never the source model of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Outcome {
    Model(ModelName),
    Tie,
}

impl Outcome {
    pub const TIE: &'static str = "tie";

    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Model(model) => model.as_str(),
            Outcome::Tie => Self::TIE,
        }
    }

    pub fn is_tie(&self) -> bool {
        matches!(self, Outcome::Tie)
    }

    /// Winning model, `None` for a tie
    pub fn model(&self) -> Option<ModelName> {
        match self {
            Outcome::Model(model) => Some(*model),
            Outcome::Tie => None,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Outcome {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == Self::TIE {
            return Ok(Outcome::Tie);
        }
        s.parse::<ModelName>()
            .map(Outcome::Model)
            .map_err(|_| Error::InvalidInput(format!("unknown vote outcome: {}", s)))
    }
}

impl TryFrom<String> for Outcome {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Outcome> for String {
    fn from(outcome: Outcome) -> Self {
        outcome.as_str().to_string()
    }
}

/// Session lifecycle state
///
/// `active` is the only non-terminal state. Transitions are
/// active → completed and active → abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Completed,
    Abandoned,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Active => "active",
            SessionStatus::Completed => "completed",
            SessionStatus::Abandoned => "abandoned",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionStatus::Active)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(SessionStatus::Active),
            "completed" => Ok(SessionStatus::Completed),
            "abandoned" => Ok(SessionStatus::Abandoned),
            other => Err(Error::InternalConsistency(format!(
                "unknown session status in storage: {}",
                other
            ))),
        }
    }
}

/// Which item representation a deployment votes on
///
/// Pair mode is the older form (a prompt with exactly two images and a
/// recorded left-side model); prompt mode shows every configured model's
/// image for a prompt at once. Both share the same core code path; the mode
/// selects the relations it reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VotingMode {
    Pair,
    #[default]
    Prompt,
}

impl VotingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            VotingMode::Pair => "pair",
            VotingMode::Prompt => "prompt",
        }
    }

    /// Relation holding the items themselves
    pub fn item_table(&self) -> &'static str {
        match self {
            VotingMode::Pair => "pairs",
            VotingMode::Prompt => "prompts",
        }
    }

    /// Join relation mapping chunks to items
    pub fn chunk_item_table(&self) -> &'static str {
        match self {
            VotingMode::Pair => "chunk_pairs",
            VotingMode::Prompt => "chunk_prompts",
        }
    }

    /// Relation holding votes
    pub fn vote_table(&self) -> &'static str {
        match self {
            VotingMode::Pair => "pair_votes",
            VotingMode::Prompt => "prompt_votes",
        }
    }

    /// Column naming the item in join and vote relations
    pub fn item_column(&self) -> &'static str {
        match self {
            VotingMode::Pair => "pair_id",
            VotingMode::Prompt => "prompt_id",
        }
    }
}

impl fmt::Display for VotingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VotingMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pair" => Ok(VotingMode::Pair),
            "prompt" => Ok(VotingMode::Prompt),
            other => Err(Error::Config(format!("unknown voting mode: {}", other))),
        }
    }
}

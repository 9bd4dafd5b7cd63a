use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    fmt,
    str::FromStr,
};

/// Points deducted from the rater for every rating.
pub const RATE_QUIZ_POINT_COST: i64 = 2;

/// A quiz needs at least this many options to be answerable.
pub const MIN_QUIZ_OPTIONS: usize = 2;

/// 20-byte account or contract address, rendered as lowercase `0x` hex.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct Address([u8; 20]);

impl Address {
    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// `0x123...cdef0` style short form used in lists.
    pub fn truncated(&self) -> String {
        let full = self.to_string();
        let head = &full[..5];
        let tail = &full[full.len() - 5..];
        format!("{head}...{tail}")
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = color_eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        let bytes = hex::decode(digits)
            .wrap_err_with(|| format!("Invalid hex in address '{s}'"))?;
        let bytes: [u8; 20] = bytes
            .try_into()
            .map_err(|raw: Vec<u8>| eyre!("Address '{s}' has {} bytes, expected 20", raw.len()))?;
        Ok(Self(bytes))
    }
}

impl TryFrom<String> for Address {
    type Error = color_eyre::Report;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Address> for String {
    fn from(value: Address) -> Self {
        value.to_string()
    }
}

/// Profile as reported by the contract. No display name means no profile.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct User {
    pub display_name: Option<String>,
    pub points: Option<i64>,
}

impl User {
    pub fn has_profile(&self) -> bool {
        self.display_name
            .as_deref()
            .is_some_and(|name| !name.is_empty())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Quiz {
    pub id: u64,
    pub question: String,
    pub options: Vec<String>,
    pub correct_option: usize,
    pub total_ratings: u64,
    pub positive_ratings: u64,
    pub number_of_responses: u64,
    pub creator: Address,
    pub user_has_answered: bool,
    pub user_has_rated: bool,
}

impl Quiz {
    pub fn negative_ratings(&self) -> u64 {
        self.total_ratings.saturating_sub(self.positive_ratings)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LeaderboardEntry {
    pub address: Address,
    pub display_name: String,
    pub points: u64,
}

/// Named events a confirmed transaction may carry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContractEvent {
    UserCreated { user: Address },
    QuizCreated { id: u64, creator: Address },
    PointsAwarded { user: Address, amount: u64 },
    QuizRated { id: u64, rater: Address, positive: bool },
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Receipt {
    pub events: Vec<ContractEvent>,
}

impl Receipt {
    pub fn new(events: Vec<ContractEvent>) -> Self {
        Self { events }
    }

    /// Total carried by `PointsAwarded` events, `None` when there are none.
    pub fn points_awarded(&self) -> Option<u64> {
        self.events
            .iter()
            .filter_map(|event| match event {
                ContractEvent::PointsAwarded { amount, .. } => Some(*amount),
                _ => None,
            })
            .reduce(|acc, amount| acc.saturating_add(amount))
    }
}

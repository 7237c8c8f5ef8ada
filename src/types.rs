//! Shared types for the bracket contest.
//!
//! The entry model is used by storage, the contest core and the API.
//! Winner state lives in the `(is_winner, won_at)` pair; [`EntryStatus`]
//! is the derived view of it.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::ser::{SerializeStruct, Serializer};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Contest entry
// ---------------------------------------------------------------------------

/// One participant's bracket guess.
///
/// Serialises with a derived `status` field next to the stored ones. The
/// field is ignored on deserialisation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ContestEntry {
    /// Store-assigned identifier.
    pub id: i64,
    pub account_number: String,
    pub account_name: String,
    /// Lower bound of the guessed price interval.
    pub lower_rate: Decimal,
    /// Upper bound of the guessed price interval.
    pub upper_rate: Decimal,
    pub is_winner: bool,
    /// Set exactly while `is_winner` is true.
    pub won_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl ContestEntry {
    /// Derived lifecycle state.
    pub fn status(&self) -> EntryStatus {
        if self.is_winner {
            EntryStatus::Active
        } else {
            EntryStatus::Open
        }
    }

    /// Mark this entry as the active winner as of `now`.
    pub fn promote(&mut self, now: DateTime<Utc>) {
        self.is_winner = true;
        self.won_at = Some(now);
    }

    /// Return this entry to open status, clearing the win timestamp.
    pub fn demote(&mut self) {
        self.is_winner = false;
        self.won_at = None;
    }

    /// Whether an active win was designated strictly before `cutoff`.
    ///
    /// Winners without a `won_at` never qualify.
    pub fn won_before(&self, cutoff: DateTime<Utc>) -> bool {
        self.is_winner && self.won_at.is_some_and(|t| t < cutoff)
    }
}

impl Serialize for ContestEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ContestEntry", 9)?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("account_number", &self.account_number)?;
        state.serialize_field("account_name", &self.account_name)?;
        state.serialize_field("lower_rate", &self.lower_rate)?;
        state.serialize_field("upper_rate", &self.upper_rate)?;
        state.serialize_field("is_winner", &self.is_winner)?;
        state.serialize_field("won_at", &self.won_at)?;
        state.serialize_field("created_at", &self.created_at)?;
        state.serialize_field("status", &self.status())?;
        state.end()
    }
}

impl fmt::Display for ContestEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} {} ({}) [{}, {}] {}",
            self.id,
            self.account_name,
            self.account_number,
            self.lower_rate,
            self.upper_rate,
            self.status(),
        )
    }
}

// ---------------------------------------------------------------------------
// Submission payload
// ---------------------------------------------------------------------------

/// A bracket submission before the store assigns it an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEntry {
    pub account_number: String,
    pub account_name: String,
    pub lower_rate: Decimal,
    pub upper_rate: Decimal,
}

impl NewEntry {
    pub fn new(
        account_number: impl Into<String>,
        account_name: impl Into<String>,
        lower_rate: Decimal,
        upper_rate: Decimal,
    ) -> Self {
        Self {
            account_number: account_number.into(),
            account_name: account_name.into(),
            lower_rate,
            upper_rate,
        }
    }

    /// Trim identifying fields and check they are non-empty.
    ///
    /// Inverted bounds (`lower_rate > upper_rate`) are accepted.
    pub fn normalized(self) -> Result<Self, String> {
        let account_number = self.account_number.trim().to_string();
        let account_name = self.account_name.trim().to_string();
        if account_number.is_empty() {
            return Err("account number must not be empty".to_string());
        }
        if account_name.is_empty() {
            return Err("account name must not be empty".to_string());
        }
        Ok(Self {
            account_number,
            account_name,
            ..self
        })
    }
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Winner state of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntryStatus {
    /// Eligible for selection.
    Open,
    /// The current winner.
    Active,
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryStatus::Open => write!(f, "OPEN"),
            EntryStatus::Active => write!(f, "ACTIVE"),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
impl ContestEntry {
    /// Build an open entry with the given id and bracket.
    pub fn sample(id: i64, lower: Decimal, upper: Decimal) -> Self {
        ContestEntry {
            id,
            account_number: format!("ACC-{id:04}"),
            account_name: format!("Participant {id}"),
            lower_rate: lower,
            upper_rate: upper,
            is_winner: false,
            won_at: None,
            created_at: Utc::now(),
        }
    }
}

use super::player::PlayerId;
use crate::error::GameError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// What a day vote can be cast for.
#[derive(Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub enum VoteKey {
    Player(PlayerId),
    Skip,
}

impl fmt::Display for VoteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VoteKey::Player(id) => id.fmt(f),
            VoteKey::Skip => f.write_str("skip"),
        }
    }
}

impl FromStr for VoteKey {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "skip" => Ok(VoteKey::Skip),
            other => other.parse().map(VoteKey::Player),
        }
    }
}

/// The result of counting the day's votes.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum DayOutcome {
    Skip,
    Lynch(PlayerId),
    /// Two or more keys share the top count; someone has to break the tie.
    Tie(Vec<VoteKey>),
}

/// Anonymous tally of the votes cast during a day.
#[derive(Clone, Serialize, Deserialize, Default, Debug)]
pub struct DayLedger {
    tally: BTreeMap<VoteKey, usize>,
}

impl DayLedger {
    /// Records one vote. Repeat votes from the same player are not detected.
    pub fn vote(&mut self, key: VoteKey) {
        *self.tally.entry(key).or_default() += 1;
    }

    /// Gets the number of votes cast for `key`.
    #[cfg(test)]
    pub fn count(&self, key: VoteKey) -> usize {
        self.tally.get(&key).copied().unwrap_or(0)
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.tally.is_empty()
    }

    pub fn clear(&mut self) {
        self.tally.clear();
    }

    /// Counts the votes without consuming them.
    pub fn finalize(&self) -> DayOutcome {
        let Some(max) = self.tally.values().copied().max() else {
            return DayOutcome::Skip;
        };
        let leaders: Vec<VoteKey> = self
            .tally
            .iter()
            .filter(|(_, count)| **count == max)
            .map(|(key, _)| *key)
            .collect();
        if leaders.len() > 1 {
            return DayOutcome::Tie(leaders);
        }
        match leaders[0] {
            VoteKey::Skip => DayOutcome::Skip,
            VoteKey::Player(id) => DayOutcome::Lynch(id),
        }
    }
}

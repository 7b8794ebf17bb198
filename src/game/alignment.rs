use super::player::Role;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The win-condition faction a role belongs to.
#[derive(Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Debug)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Town,
    Mafia,
    Neutral,
}

impl Alignment {
    /// Unassigned and unrecognised roles count as town.
    pub fn of(role: Option<&Role>) -> Self {
        match role {
            Some(Role::Mafia) => Alignment::Mafia,
            Some(Role::Jester) => Alignment::Neutral,
            _ => Alignment::Town,
        }
    }
}

impl fmt::Display for Alignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Alignment::Town => "town",
            Alignment::Mafia => "mafia",
            Alignment::Neutral => "neutral",
        })
    }
}

use super::alignment::Alignment;
use super::player::{Player, PlayerId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Debug)]
#[serde(rename_all = "lowercase")]
pub enum Winner {
    Town,
    Mafia,
}

impl fmt::Display for Winner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Winner::Town => "town",
            Winner::Mafia => "mafia",
        })
    }
}

/// Decides whether either faction has won. Neutral players count for neither side.
pub fn evaluate_winner(players: &BTreeMap<PlayerId, Player>) -> Option<Winner> {
    let alive = |alignment| {
        players
            .values()
            .filter(|p| p.alive && p.alignment() == alignment)
            .count()
    };
    let mafia = alive(Alignment::Mafia);
    let town = alive(Alignment::Town);

    if mafia == 0 {
        Some(Winner::Town)
    } else if mafia >= town {
        Some(Winner::Mafia)
    } else {
        None
    }
}

use super::alignment::Alignment;
use crate::error::GameError;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Identifies a player for the lifetime of the server process, rendered as `p<n>`.
#[derive(Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[serde(into = "String", try_from = "String")]
pub struct PlayerId(pub u32);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.0)
    }
}

impl FromStr for PlayerId {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.strip_prefix('p')
            .and_then(|n| n.parse().ok())
            .map(PlayerId)
            .ok_or_else(|| GameError::InvalidTarget(s.to_string()))
    }
}

impl From<PlayerId> for String {
    fn from(id: PlayerId) -> Self {
        id.to_string()
    }
}

impl TryFrom<String> for PlayerId {
    type Error = GameError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Hands out player ids. Clones share the same counter, so every room created
/// from one registry draws from a single sequence.
#[derive(Clone, Default, Debug)]
pub struct PlayerIds(Arc<AtomicU32>);

impl PlayerIds {
    pub fn next(&self) -> PlayerId {
        PlayerId(self.0.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

/// A game player.
#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub role: Option<Role>,
    pub alive: bool,
    pub self_heals_used: u32,
    pub link_partner: Option<PlayerId>,
}

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq, Debug)]
pub enum Role {
    Mafia,
    Doctor,
    Detective,
    Grandma,
    Cupid,
    Vigilante,
    Townsperson,
    Mayor,
    Jester,
    Unknown(String),
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Mafia => "mafia",
            Role::Doctor => "doctor",
            Role::Detective => "detective",
            Role::Grandma => "grandma",
            Role::Cupid => "cupid",
            Role::Vigilante => "vigilante",
            Role::Townsperson => "townsperson",
            Role::Mayor => "mayor",
            Role::Jester => "jester",
            Role::Unknown(name) => name,
        };
        f.write_str(name)
    }
}

impl From<&str> for Role {
    fn from(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "mafia" => Role::Mafia,
            "doctor" => Role::Doctor,
            "detective" => Role::Detective,
            "grandma" => Role::Grandma,
            "cupid" => Role::Cupid,
            "vigilante" => Role::Vigilante,
            "townsperson" => Role::Townsperson,
            "mayor" => Role::Mayor,
            "jester" => Role::Jester,
            other => Role::Unknown(other.to_string()),
        }
    }
}

impl Player {
    pub fn new(id: PlayerId, name: String) -> Self {
        Self {
            id,
            name,
            role: None,
            alive: true,
            self_heals_used: 0,
            link_partner: None,
        }
    }

    pub fn alignment(&self) -> Alignment {
        Alignment::of(self.role.as_ref())
    }

    pub fn is(&self, role: &Role) -> bool {
        self.role.as_ref() == Some(role)
    }

    pub fn is_alive_mafia(&self) -> bool {
        self.alive && self.is(&Role::Mafia)
    }
}

/// Deals a role to each of `num_players` seats, shuffled by `rng`.
pub fn assign_roles(num_players: usize, rng: &mut impl rand::Rng) -> Vec<Role> {
    let num_mafia = (num_players / 4).max(1);
    let mut roles = vec![Role::Mafia; num_mafia];
    let specials = [
        (0, Role::Doctor),
        (0, Role::Detective),
        (6, Role::Grandma),
        (7, Role::Cupid),
        (8, Role::Vigilante),
    ];
    for (min_players, role) in specials {
        if num_players >= min_players && roles.len() < num_players {
            roles.push(role);
        }
    }
    roles.resize(num_players, Role::Townsperson);
    roles.shuffle(rng);
    roles
}

use super::player::{Player, PlayerId, Role};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// The role actions submitted during a single night.
#[derive(Clone, Serialize, Deserialize, Default, Debug)]
pub struct NightLedger {
    /// Every mafia member's pick; repeated picks count towards the same target.
    pub mafia_targets: Vec<PlayerId>,
    pub protects: Vec<PlayerId>,
    pub armed_grandmas: BTreeSet<PlayerId>,
    pub vigilante_shots: Vec<PlayerId>,
}

impl NightLedger {
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    fn is_protected(&self, id: PlayerId) -> bool {
        self.protects.contains(&id)
    }

    fn mafia_votes_for(&self, id: PlayerId) -> usize {
        self.mafia_targets.iter().filter(|t| **t == id).count()
    }
}

/// One line of the night's narration, in the order it happened.
#[derive(Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Debug)]
pub enum NightEvent {
    VigilanteShot(PlayerId),
    VigilanteBlocked(PlayerId),
    MafiaKill(PlayerId),
    MafiaBlocked(PlayerId),
    /// The lone mafia member walked into the trap, but the grandma still died.
    GrandmaKilled(PlayerId),
    /// The grandma was targeted by two or more mafia members; nobody dies.
    GrandmaDoubleTargeted(PlayerId),
    GrandmaTrapKilledMafia(PlayerId),
    CupidDiedWith { cupid: PlayerId, partner: PlayerId },
}

impl fmt::Display for NightEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NightEvent::VigilanteShot(id) => write!(f, "vigilante:shot:{id}"),
            NightEvent::VigilanteBlocked(id) => write!(f, "vigilante:blocked:{id}"),
            NightEvent::MafiaKill(id) => write!(f, "mafia:kill:{id}"),
            NightEvent::MafiaBlocked(id) => write!(f, "mafia:blocked:{id}"),
            NightEvent::GrandmaKilled(id) => write!(f, "grandma:killed:{id}"),
            NightEvent::GrandmaDoubleTargeted(id) => write!(f, "grandma:doubletargeted:{id}"),
            NightEvent::GrandmaTrapKilledMafia(id) => write!(f, "grandma:trap_killed_mafia:{id}"),
            NightEvent::CupidDiedWith { cupid, partner } => {
                write!(f, "cupid:died_with:{cupid}:{partner}")
            }
        }
    }
}

/// The outcome of a night. Deaths are not yet applied to the players.
#[derive(Clone, PartialEq, Eq, Default, Debug)]
pub struct NightResolution {
    pub deaths: BTreeSet<PlayerId>,
    pub log: Vec<NightEvent>,
}

/// Works out who dies overnight.
///
/// Ledger entries naming players that are no longer in the room are skipped.
pub fn resolve_night(players: &BTreeMap<PlayerId, Player>, ledger: &NightLedger) -> NightResolution {
    let mut result = NightResolution::default();
    let is_alive = |id: &PlayerId| players.get(id).map_or(false, |p| p.alive);

    let mafia_target = mafia_choice(players, ledger);

    // Vigilante shots resolve before the mafia kill
    for &target in &ledger.vigilante_shots {
        if !is_alive(&target) {
            continue;
        }
        if ledger.is_protected(target) {
            result.log.push(NightEvent::VigilanteBlocked(target));
        } else {
            result.deaths.insert(target);
            result.log.push(NightEvent::VigilanteShot(target));
        }
    }

    if let Some(target) = mafia_target.filter(|t| is_alive(t)) {
        if ledger.armed_grandmas.contains(&target) {
            spring_trap(players, ledger, target, &mut result);
        } else if ledger.is_protected(target) {
            result.log.push(NightEvent::MafiaBlocked(target));
        } else {
            result.deaths.insert(target);
            result.log.push(NightEvent::MafiaKill(target));
        }
    }

    // Cupids follow their partner to the grave
    for cupid in players.values().filter(|p| p.alive && p.is(&Role::Cupid)) {
        let Some(partner) = cupid.link_partner else {
            continue;
        };
        if result.deaths.contains(&partner) && result.deaths.insert(cupid.id) {
            result.log.push(NightEvent::CupidDiedWith {
                cupid: cupid.id,
                partner,
            });
        }
    }

    result
}

/// The most-picked mafia target, breaking ties towards the lowest id.
fn mafia_choice(players: &BTreeMap<PlayerId, Player>, ledger: &NightLedger) -> Option<PlayerId> {
    let mut tally = BTreeMap::<PlayerId, usize>::new();
    for target in ledger.mafia_targets.iter().filter(|t| players.contains_key(t)) {
        *tally.entry(*target).or_default() += 1;
    }
    // `max_by_key` keeps the last maximum, so walk the ids in reverse
    tally
        .into_iter()
        .rev()
        .max_by_key(|(_, count)| *count)
        .map(|(id, _)| id)
}

fn spring_trap(
    players: &BTreeMap<PlayerId, Player>,
    ledger: &NightLedger,
    grandma: PlayerId,
    result: &mut NightResolution,
) {
    let alive_mafia: Vec<PlayerId> = players
        .values()
        .filter(|p| p.is_alive_mafia())
        .map(|p| p.id)
        .collect();

    if alive_mafia.len() == 1 {
        result.deaths.insert(grandma);
        result.log.push(NightEvent::GrandmaKilled(grandma));
    } else if ledger.mafia_votes_for(grandma) >= 2 {
        result.log.push(NightEvent::GrandmaDoubleTargeted(grandma));
    } else if let Some(&mafia) = alive_mafia.first() {
        result.deaths.insert(mafia);
        result.log.push(NightEvent::GrandmaTrapKilledMafia(mafia));
    }
}

use super::alignment::Alignment;
use super::player::{PlayerId, Role};
use super::{Phase, Room};
use crate::error::GameError;
use std::fmt;

/// A doctor may protect themselves this many times per game.
pub const MAX_SELF_HEALS: u32 = 1;

/// The first night on which the vigilante may shoot.
const VIGILANTE_FIRST_NIGHT: u32 = 2;

/// What a player asks their role to do during the night.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Operation {
    Protect,
    Arm,
    Link,
    Shoot,
    Inspect,
    Kill,
    Other(String),
}

impl From<&str> for Operation {
    fn from(name: &str) -> Self {
        match name {
            "protect" => Operation::Protect,
            "arm" => Operation::Arm,
            "link" => Operation::Link,
            "shoot" => Operation::Shoot,
            "inspect" => Operation::Inspect,
            "kill" => Operation::Kill,
            other => Operation::Other(other.to_string()),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Protect => "protect",
            Operation::Arm => "arm",
            Operation::Link => "link",
            Operation::Shoot => "shoot",
            Operation::Inspect => "inspect",
            Operation::Kill => "kill",
            Operation::Other(name) => name,
        })
    }
}

/// The result of a night action that passed validation.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum ActionOutcome {
    Protected,
    SelfHealDenied,
    Armed,
    /// A grandma did something other than arm her trap.
    Skipped,
    Linked,
    Aimed,
    FirstNightDenied,
    Targeted,
    Inspected {
        target: PlayerId,
        role: Option<Role>,
        alignment: Alignment,
    },
    Ignored {
        role: Role,
        operation: Operation,
    },
}

impl fmt::Display for ActionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionOutcome::Protected => f.write_str("doctor:protected"),
            ActionOutcome::SelfHealDenied => f.write_str("doctor:self_heal_denied"),
            ActionOutcome::Armed => f.write_str("grandma:armed"),
            ActionOutcome::Skipped => f.write_str("grandma:skip"),
            ActionOutcome::Linked => f.write_str("cupid:linked"),
            ActionOutcome::Aimed => f.write_str("vigilante:aimed"),
            ActionOutcome::FirstNightDenied => f.write_str("vigilante:first_night_denied"),
            ActionOutcome::Targeted => f.write_str("mafia:targeted"),
            ActionOutcome::Inspected {
                target,
                role,
                alignment,
            } => match role {
                Some(role) => write!(f, "detective:{target}:{role}:{alignment}"),
                None => write!(f, "detective:{target}:none:{alignment}"),
            },
            ActionOutcome::Ignored { role, operation } => write!(f, "ignored:{role}:{operation}"),
        }
    }
}

impl Room {
    /// Validates a night action and records it in the night ledger.
    ///
    /// The actor must be alive and actually hold `claimed`. The outcome is also queued as a
    /// notice; a detective's finding goes to the whole room.
    pub fn act(
        &mut self,
        player: PlayerId,
        claimed: &Role,
        operation: &Operation,
        target: Option<&str>,
    ) -> Result<ActionOutcome, GameError> {
        self.check_phase(self.phase == Phase::Night)?;
        let actor = self.players.get(&player).ok_or(GameError::PlayerNotFound)?;
        if !actor.alive || !actor.is(claimed) {
            log::debug!("{} may not act as {} in room {}", player, claimed, self.code);
            return Err(GameError::ForbiddenAction(player));
        }

        let outcome = match (claimed, operation) {
            (Role::Doctor, Operation::Protect) => {
                let target = self.target(target)?;
                self.protect(player, target)
            }
            (Role::Grandma, Operation::Arm) => {
                self.night.armed_grandmas.insert(player);
                ActionOutcome::Armed
            }
            (Role::Grandma, _) => ActionOutcome::Skipped,
            (Role::Cupid, Operation::Link) => {
                let target = self.target(target)?;
                self.link(player, target)?
            }
            (Role::Vigilante, Operation::Shoot) => {
                if self.night_index < VIGILANTE_FIRST_NIGHT {
                    ActionOutcome::FirstNightDenied
                } else {
                    let target = self.target(target)?;
                    self.night.vigilante_shots.push(target);
                    ActionOutcome::Aimed
                }
            }
            (Role::Detective, Operation::Inspect) => {
                let target = self.target(target)?;
                self.inspect(target)
            }
            (Role::Mafia, Operation::Kill) => {
                let target = self.target(target)?;
                self.night.mafia_targets.push(target);
                ActionOutcome::Targeted
            }
            (role, operation) => ActionOutcome::Ignored {
                role: role.clone(),
                operation: operation.clone(),
            },
        };

        self.notice(outcome.to_string());
        Ok(outcome)
    }

    /// Parses an action's target, which must name a player in this room.
    fn target(&self, target: Option<&str>) -> Result<PlayerId, GameError> {
        let target = target.ok_or(GameError::MissingTarget)?;
        let id = target.parse::<PlayerId>()?;
        if !self.players.contains_key(&id) {
            return Err(GameError::InvalidTarget(target.to_string()));
        }
        Ok(id)
    }

    fn protect(&mut self, doctor: PlayerId, target: PlayerId) -> ActionOutcome {
        if doctor == target {
            let Some(doctor) = self.players.get_mut(&doctor) else {
                return ActionOutcome::SelfHealDenied;
            };
            if doctor.self_heals_used >= MAX_SELF_HEALS {
                return ActionOutcome::SelfHealDenied;
            }
            doctor.self_heals_used += 1;
        }
        self.night.protects.push(target);
        ActionOutcome::Protected
    }

    /// Links cupid and `target` to each other, breaking any links either had before.
    fn link(&mut self, cupid: PlayerId, target: PlayerId) -> Result<ActionOutcome, GameError> {
        if cupid == target {
            return Err(GameError::InvalidTarget(target.to_string()));
        }
        self.unlink(cupid);
        self.unlink(target);
        for (a, b) in [(cupid, target), (target, cupid)] {
            if let Some(player) = self.players.get_mut(&a) {
                player.link_partner = Some(b);
            }
        }
        Ok(ActionOutcome::Linked)
    }

    fn inspect(&self, target: PlayerId) -> ActionOutcome {
        let player = &self.players[&target];
        ActionOutcome::Inspected {
            target,
            role: player.role.clone(),
            alignment: player.alignment(),
        }
    }
}

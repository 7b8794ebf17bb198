use crate::{
    error::GameError,
    game::{action::Operation, OutboundEvent, PlayerId, Role},
    session::{Command, RoomRegistry},
};
use rand::RngCore;
use serde::Deserialize;
use std::collections::HashMap;
use tokio::sync::broadcast::{self, error::RecvError};

/// A single connected player.
pub struct Client<'a> {
    registry: &'a RoomRegistry,
    player: PlayerId,
    room_code: String,
    updates: broadcast::Receiver<OutboundEvent>,
    left: bool,
}

/// A message sent by a game client to the server.
#[derive(Deserialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    AssignRoles { roles: HashMap<String, String> },
    Start { seed: Option<u64> },
    Action {
        role: String,
        operation: String,
        target: Option<String>,
    },
    Vote { target: String },
    TieBreak { target: String },
    ResolveNight,
    FinalizeDay,
    Chat { text: String },
    Leave,
}

impl<'a> Client<'a> {
    /// Joins a room, creating it if needed.
    pub fn join(registry: &'a RoomRegistry, room_code: &str, name: &str) -> Result<Self, GameError> {
        let joined = registry.join(room_code, name)?;
        Ok(Self {
            registry,
            player: joined.player,
            room_code: joined.code,
            updates: joined.updates,
            left: false,
        })
    }

    pub fn player(&self) -> PlayerId {
        self.player
    }

    pub fn room_code(&self) -> &str {
        &self.room_code
    }

    pub fn has_left(&self) -> bool {
        self.left
    }

    /// Turns a request into a command for this client's room and applies it.
    pub fn handle(&mut self, request: Request) {
        let room_code = self.room_code.clone();
        let command = match request {
            Request::AssignRoles { roles } => Command::AssignRoles {
                room_code,
                roles: roles
                    .iter()
                    .filter_map(|(id, role)| Some((id.parse::<PlayerId>().ok()?, Role::from(role.as_str()))))
                    .collect(),
            },
            Request::Start { seed } => Command::Start {
                room_code,
                seed: seed.unwrap_or_else(|| rand::thread_rng().next_u64()),
            },
            Request::Action {
                role,
                operation,
                target,
            } => Command::Action {
                player: self.player,
                claimed_role: Role::from(role.as_str()),
                operation: Operation::from(operation.as_str()),
                target,
            },
            Request::Vote { target } => Command::Vote { room_code, target },
            Request::TieBreak { target } => Command::TieBreak { room_code, target },
            Request::ResolveNight => Command::ResolveNight { room_code },
            Request::FinalizeDay => Command::FinalizeDay { room_code },
            Request::Chat { text } => Command::Chat {
                player: self.player,
                text,
            },
            Request::Leave => return self.leave(),
        };
        self.registry.execute(command);
    }

    /// Waits for the next event broadcast to the room, skipping this client's own chat.
    /// Returns `None` once the room's channel has closed.
    pub async fn next_event(&mut self) -> Option<OutboundEvent> {
        loop {
            match self.updates.recv().await {
                Ok(OutboundEvent::ChatRelay { from, .. }) if from == self.player => {}
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(missed)) => {
                    log::warn!("{} missed {} events", self.player, missed);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Leaves the room. Safe to call more than once.
    pub fn leave(&mut self) {
        if self.left {
            return;
        }
        self.left = true;
        self.registry.execute(Command::Leave {
            player: self.player,
        });
    }
}

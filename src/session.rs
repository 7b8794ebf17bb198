use crate::error::GameError;
use crate::game::action::Operation;
use crate::game::{OutboundEvent, PlayerId, PlayerIds, Role, Room};
use crate::time::iso8601;
use dashmap::DashMap;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;
use tokio::sync::broadcast;

/// How many undelivered events a slow client may fall behind by.
const EVENT_CHANNEL_SIZE: usize = 256;

/// The room code used when a client does not ask for one.
pub const DEFAULT_ROOM_CODE: &str = "ROOM";

/// A command from the transport layer.
#[derive(Clone, Debug)]
pub enum Command {
    Leave {
        player: PlayerId,
    },
    AssignRoles {
        room_code: String,
        roles: Vec<(PlayerId, Role)>,
    },
    Start {
        room_code: String,
        seed: u64,
    },
    Action {
        player: PlayerId,
        claimed_role: Role,
        operation: Operation,
        target: Option<String>,
    },
    Vote {
        room_code: String,
        target: String,
    },
    TieBreak {
        room_code: String,
        target: String,
    },
    ResolveNight {
        room_code: String,
    },
    FinalizeDay {
        room_code: String,
    },
    Chat {
        player: PlayerId,
        text: String,
    },
}

/// Manages all the rooms running on the server.
///
/// The map is sharded, so looking up one room never waits on commands running in another;
/// each room is then locked on its own while a command is applied.
#[derive(Default)]
pub struct RoomRegistry {
    rooms: DashMap<String, SessionHandle>,
    /// The room each connected player is in.
    players: DashMap<PlayerId, String>,
    ids: PlayerIds,
}

/// A single room, plus the channel its events are broadcast on.
pub struct Session {
    room: Room,
    events: broadcast::Sender<OutboundEvent>,
    created: SystemTime,
    /// Set once the room has been removed from the registry.
    closed: bool,
}

pub type SessionHandle = Arc<Mutex<Session>>;

/// A successful join: the new player's id and their feed of room events.
pub struct Joined {
    pub player: PlayerId,
    pub code: String,
    pub updates: broadcast::Receiver<OutboundEvent>,
}

/// A summary of a room for the HTTP API.
#[derive(Clone, Serialize, Debug)]
pub struct RoomSummary {
    pub code: String,
    pub id: String,
    pub players: usize,
    pub started: bool,
    pub night: u32,
    pub created: String,
}

impl RoomRegistry {
    /// Gets the room with the given code, creating it if it doesn't exist yet.
    pub fn get_or_create(&self, code: &str) -> SessionHandle {
        let code = normalize_code(code);
        self.rooms
            .entry(code.clone())
            .or_insert_with(|| {
                log::info!("Created room {}", code);
                Arc::new(Mutex::new(Session::new(Room::new(&code, self.ids.clone()))))
            })
            .clone()
    }

    pub fn find(&self, code: &str) -> Result<SessionHandle, GameError> {
        self.rooms
            .get(&normalize_code(code))
            .map(|session| session.clone())
            .ok_or(GameError::RoomNotFound)
    }

    /// Removes the room if nobody is left in it.
    pub fn remove_if_empty(&self, code: &str) {
        let code = normalize_code(code);
        let removed = self.rooms.remove_if(&code, |_, session| {
            let mut session = lock(session);
            if session.room.is_empty() {
                session.closed = true;
            }
            session.closed
        });
        if removed.is_some() {
            log::info!("Removed empty room {}", code);
        }
    }

    pub fn num_rooms(&self) -> usize {
        self.rooms.len()
    }

    /// Gets the code of the room a player is in.
    pub fn room_of(&self, player: PlayerId) -> Option<String> {
        self.players.get(&player).map(|code| code.clone())
    }

    pub fn summaries(&self) -> Vec<RoomSummary> {
        let handles: Vec<_> = self.rooms.iter().map(|r| r.value().clone()).collect();
        let mut summaries: Vec<_> = handles
            .iter()
            .map(|session| lock(session).summary())
            .collect();
        summaries.sort_by(|a, b| a.code.cmp(&b.code));
        summaries
    }

    /// Adds a player to a room, creating the room on first reference.
    ///
    /// The returned receiver is subscribed before the join is announced, so the new
    /// player sees their own arrival.
    pub fn join(&self, code: &str, name: &str) -> Result<Joined, GameError> {
        loop {
            let handle = self.get_or_create(code);
            let mut session = lock(&handle);
            // Lost a race with the room being removed; make a fresh one
            if session.closed {
                continue;
            }
            let updates = session.events.subscribe();
            let result = session.room.join(name);
            session.publish();
            let player = result?;
            let code = session.room.code().to_string();
            self.players.insert(player, code.clone());
            return Ok(Joined {
                player,
                code,
                updates,
            });
        }
    }

    /// Applies a command to the room it addresses.
    ///
    /// Rejected commands are reported to the room or dropped; they never fail the caller.
    pub fn execute(&self, command: Command) {
        match command {
            Command::Leave { player } => self.leave(player),
            Command::AssignRoles { room_code, roles } => {
                self.with_room(&room_code, |room| room.assign_roles(roles))
            }
            Command::Start { room_code, seed } => self.with_room(&room_code, |room| room.start(seed)),
            Command::Action {
                player,
                claimed_role,
                operation,
                target,
            } => self.with_player_room(player, |room| {
                room.act(player, &claimed_role, &operation, target.as_deref())
                    .map(|_| ())
            }),
            Command::Vote { room_code, target } => self.with_room(&room_code, |room| room.vote(&target)),
            Command::TieBreak { room_code, target } => {
                self.with_room(&room_code, |room| room.tie_break(&target))
            }
            Command::ResolveNight { room_code } => {
                self.with_room(&room_code, |room| room.resolve_night().map(|_| ()))
            }
            Command::FinalizeDay { room_code } => {
                self.with_room(&room_code, |room| room.finalize_day().map(|_| ()))
            }
            Command::Chat { player, text } => self.with_player_room(player, |room| room.chat(player, &text)),
        }
    }

    fn leave(&self, player: PlayerId) {
        let Some((_, code)) = self.players.remove(&player) else {
            log::debug!("{} left but was in no room", player);
            return;
        };
        self.with_room(&code, |room| room.leave(player));
        self.remove_if_empty(&code);
    }

    /// Applies a command to whichever room `player` is in.
    fn with_player_room<F>(&self, player: PlayerId, mutation: F)
    where
        F: FnOnce(&mut Room) -> Result<(), GameError>,
    {
        match self.room_of(player) {
            Some(code) => self.with_room(&code, mutation),
            None => log::debug!("ignoring command from {} who is in no room", player),
        }
    }

    fn with_room<F>(&self, code: &str, mutation: F)
    where
        F: FnOnce(&mut Room) -> Result<(), GameError>,
    {
        match self.find(code) {
            Ok(handle) => lock(&handle).mutate_room(mutation),
            Err(err) => log::debug!("ignoring command for room {}: {}", code, err),
        }
    }
}

impl Session {
    fn new(room: Room) -> Self {
        Self {
            room,
            events: broadcast::channel(EVENT_CHANNEL_SIZE).0,
            created: SystemTime::now(),
            closed: false,
        }
    }

    /// Performs a command on the room, then broadcasts whatever it produced.
    pub fn mutate_room<F>(&mut self, mutation: F)
    where
        F: FnOnce(&mut Room) -> Result<(), GameError>,
    {
        match mutation(&mut self.room) {
            Ok(()) => {}
            Err(err) if err.is_silent() => {
                log::debug!("room {} ignored a command: {}", self.room.code(), err);
            }
            Err(err) => {
                log::debug!("room {} rejected a command: {}", self.room.code(), err);
                self.room.report(&err);
            }
        }
        self.publish();
    }

    /// Sends the room's pending events to every subscriber, in order.
    fn publish(&mut self) {
        for event in self.room.take_events() {
            // Nobody listening is fine
            self.events.send(event).ok();
        }
    }

    fn summary(&self) -> RoomSummary {
        RoomSummary {
            code: self.room.code().to_string(),
            id: self.room.id().to_string(),
            players: self.room.num_players(),
            started: self.room.started(),
            night: self.room.night_index(),
            created: iso8601(self.created),
        }
    }
}

/// Room codes are matched case-insensitively.
pub fn normalize_code(code: &str) -> String {
    let code = code.trim().to_ascii_uppercase();
    if code.is_empty() {
        DEFAULT_ROOM_CODE.to_string()
    } else {
        code
    }
}

/// Locks a session, carrying on with the inner state if a previous holder panicked.
fn lock(session: &SessionHandle) -> MutexGuard<'_, Session> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn drain(updates: &mut broadcast::Receiver<OutboundEvent>) -> Vec<String> {
        let mut texts = vec![];
        while let Ok(event) = updates.try_recv() {
            if let Some(text) = event.notice_text() {
                texts.push(text.to_string());
            }
        }
        texts
    }

    #[test]
    fn join_creates_room_with_normalized_code() {
        let registry = RoomRegistry::default();

        let joined = registry.join(" abc", "Alex").unwrap();

        assert_eq!(joined.code, "ABC");
        assert_eq!(registry.num_rooms(), 1);
        assert!(registry.find("Abc").is_ok());
        assert_eq!(registry.room_of(joined.player), Some("ABC".to_string()));
    }

    #[test]
    fn empty_code_uses_default_room() {
        assert_eq!(normalize_code("  "), DEFAULT_ROOM_CODE);
    }

    #[test]
    fn joiner_sees_own_arrival() {
        let registry = RoomRegistry::default();

        let mut joined = registry.join("ABC", "Alex").unwrap();

        assert!(matches!(
            joined.updates.try_recv(),
            Ok(OutboundEvent::SystemNotice { text }) if text == "join:Alex"
        ));
        assert!(matches!(
            joined.updates.try_recv(),
            Ok(OutboundEvent::RoomSnapshot(view)) if view.players.len() == 1
        ));
    }

    #[test]
    fn player_ids_are_unique_across_rooms() {
        let registry = RoomRegistry::default();

        let a = registry.join("ABC", "Alex").unwrap().player;
        let b = registry.join("XYZ", "Bob").unwrap().player;

        assert_ne!(a, b);
    }

    #[test]
    fn last_leave_removes_room() {
        let registry = RoomRegistry::default();
        let alex = registry.join("ABC", "Alex").unwrap().player;
        let bob = registry.join("ABC", "Bob").unwrap().player;

        registry.execute(Command::Leave { player: alex });
        assert_eq!(registry.num_rooms(), 1);

        registry.execute(Command::Leave { player: bob });
        assert_eq!(registry.num_rooms(), 0);
        assert_eq!(registry.find("ABC").err(), Some(GameError::RoomNotFound));
        assert_eq!(registry.room_of(bob), None);

        // The code can be reused straight away
        let carol = registry.join("ABC", "Carol").unwrap();
        assert_eq!(carol.code, "ABC");
        assert_eq!(registry.num_rooms(), 1);
    }

    #[test]
    fn commands_for_unknown_rooms_are_ignored() {
        let registry = RoomRegistry::default();

        registry.execute(Command::ResolveNight {
            room_code: "NOPE".to_string(),
        });
        registry.execute(Command::Vote {
            room_code: "NOPE".to_string(),
            target: "p1".to_string(),
        });

        assert_eq!(registry.num_rooms(), 0);
    }

    #[test]
    fn validation_errors_are_reported_to_the_room() {
        let registry = RoomRegistry::default();
        let mut joined = registry.join("ABC", "Alex").unwrap();
        drain(&mut joined.updates);

        registry.execute(Command::Vote {
            room_code: "ABC".to_string(),
            target: "p1".to_string(),
        });

        assert_eq!(drain(&mut joined.updates), vec!["error:wrong_phase"]);
    }

    #[test]
    fn actions_from_unknown_players_are_dropped() {
        let registry = RoomRegistry::default();
        let mut joined = registry.join("ABC", "Alex").unwrap();
        drain(&mut joined.updates);

        registry.execute(Command::Action {
            player: PlayerId(404),
            claimed_role: Role::Mafia,
            operation: Operation::Kill,
            target: Some("p1".to_string()),
        });

        assert!(drain(&mut joined.updates).is_empty());
    }

    #[test]
    fn night_resolves_through_commands_in_order() {
        let registry = RoomRegistry::default();
        let mut updates = None;
        let mut ids = vec![];
        for name in ["Alex", "Bob", "Charlie", "David", "Ed"] {
            let joined = registry.join("ABC", name).unwrap();
            ids.push(joined.player);
            updates.get_or_insert(joined.updates);
        }
        let mut updates = updates.unwrap();
        let roles = ["mafia", "doctor", "townsperson", "detective", "townsperson"];
        registry.execute(Command::AssignRoles {
            room_code: "abc".to_string(),
            roles: ids.iter().copied().zip(roles.map(Role::from)).collect(),
        });
        drain(&mut updates);

        registry.execute(Command::Action {
            player: ids[1],
            claimed_role: Role::Doctor,
            operation: Operation::Protect,
            target: Some(ids[2].to_string()),
        });
        registry.execute(Command::Action {
            player: ids[2],
            claimed_role: Role::Mafia,
            operation: Operation::Kill,
            target: Some(ids[4].to_string()),
        });
        registry.execute(Command::Action {
            player: ids[0],
            claimed_role: Role::Mafia,
            operation: Operation::Kill,
            target: Some(ids[2].to_string()),
        });
        registry.execute(Command::ResolveNight {
            room_code: "ABC".to_string(),
        });

        assert_eq!(
            drain(&mut updates),
            vec![
                "doctor:protected".to_string(),
                format!("error:forbidden_action_by:{}", ids[2]),
                "mafia:targeted".to_string(),
                format!("mafia:blocked:{}", ids[2]),
                "phase:day:1".to_string(),
            ]
        );
    }

    #[test]
    fn joins_racing_room_removal_land_in_live_rooms() {
        let registry = RoomRegistry::default();

        thread::scope(|s| {
            for name in ["Alex", "Bob"] {
                let registry = &registry;
                s.spawn(move || {
                    for _ in 0..500 {
                        let joined = registry.join("ABC", name).unwrap();
                        let handle = registry.find("ABC").unwrap();
                        {
                            let session = lock(&handle);
                            assert!(!session.closed);
                            let view = session.room.snapshot();
                            assert!(view.players.iter().any(|p| p.id == joined.player));
                        }
                        assert_eq!(registry.room_of(joined.player), Some("ABC".to_string()));
                        registry.execute(Command::Leave {
                            player: joined.player,
                        });
                        assert_eq!(registry.room_of(joined.player), None);
                    }
                });
            }
        });

        assert_eq!(registry.num_rooms(), 0);
        assert!(registry.players.is_empty());
    }

    #[test]
    fn concurrent_votes_are_all_counted() {
        let registry = RoomRegistry::default();
        let mut updates = None;
        let mut ids = vec![];
        for name in ["Alex", "Bob", "Charlie", "David"] {
            let joined = registry.join("ABC", name).unwrap();
            ids.push(joined.player);
            updates.get_or_insert(joined.updates);
        }
        let mut updates = updates.unwrap();
        let roles = ["mafia", "townsperson", "townsperson", "townsperson"];
        registry.execute(Command::AssignRoles {
            room_code: "ABC".to_string(),
            roles: ids.iter().copied().zip(roles.map(Role::from)).collect(),
        });
        registry.execute(Command::ResolveNight {
            room_code: "ABC".to_string(),
        });
        drain(&mut updates);

        let ballots = [(ids[1].to_string(), 60), (ids[2].to_string(), 50), ("skip".to_string(), 40)];
        thread::scope(|s| {
            for (target, count) in &ballots {
                let registry = &registry;
                s.spawn(move || {
                    for _ in 0..*count {
                        registry.execute(Command::Vote {
                            room_code: "ABC".to_string(),
                            target: target.clone(),
                        });
                    }
                });
            }
        });
        registry.execute(Command::FinalizeDay {
            room_code: "ABC".to_string(),
        });

        let notices = drain(&mut updates);
        let recorded = notices.iter().filter(|n| *n == "vote:recorded").count();
        assert_eq!(recorded, 150);
        assert_eq!(notices[recorded], format!("day:lynch:{}", ids[1]));
    }
}

use self::night::{NightLedger, NightResolution};
pub use self::player::{PlayerId, PlayerIds, Role};
use self::player::Player;
pub use self::update::{OutboundEvent, PublicPlayer, RoomView};
use self::victory::{evaluate_winner, Winner};
use self::votes::{DayLedger, DayOutcome, VoteKey};
use crate::error::GameError;
use rand::distributions::Alphanumeric;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;

pub mod action;
mod alignment;
mod night;
mod player;
mod test;
mod update;
mod victory;
mod votes;

/// The fewest players that roles can be dealt to.
pub const MIN_PLAYERS: usize = 3;

/// A single game of Mafia, played by everyone who joined with the same room code.
///
/// Every mutation queues its notices in an outbox, which the owning session drains
/// and broadcasts once the command has been applied.
#[derive(Clone, Debug)]
pub struct Room {
    id: String,
    code: String,
    players: BTreeMap<PlayerId, Player>,
    phase: Phase,
    night_index: u32,
    night: NightLedger,
    day: DayLedger,
    ids: PlayerIds,
    outbox: Vec<OutboundEvent>,
}

/// Represents the current phase in the game loop.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Phase {
    Lobby,
    Night,
    Day {
        /// The keys that tied at the last attempt to finalize the day.
        tie: Option<Vec<VoteKey>>,
    },
    Ended(Winner),
}

impl Room {
    /// Creates an empty room. Player ids are drawn from `ids`.
    pub fn new(code: &str, ids: PlayerIds) -> Self {
        Self {
            id: random_id(),
            code: code.to_string(),
            players: BTreeMap::new(),
            phase: Phase::Lobby,
            night_index: 1,
            night: NightLedger::default(),
            day: DayLedger::default(),
            ids,
            outbox: vec![],
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn night_index(&self) -> u32 {
        self.night_index
    }

    pub fn started(&self) -> bool {
        self.phase != Phase::Lobby
    }

    pub fn num_players(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Removes and returns the events produced since the last call, oldest first.
    pub fn take_events(&mut self) -> Vec<OutboundEvent> {
        std::mem::take(&mut self.outbox)
    }

    /// Gets the public view of the room.
    pub fn snapshot(&self) -> RoomView {
        RoomView {
            id: self.id.clone(),
            code: self.code.clone(),
            players: self
                .players
                .values()
                .map(|p| PublicPlayer {
                    id: p.id,
                    name: p.name.clone(),
                })
                .collect(),
            started: self.started(),
        }
    }

    /// Adds a new player to the lobby.
    pub fn join(&mut self, name: &str) -> Result<PlayerId, GameError> {
        match self.phase {
            Phase::Lobby => {}
            Phase::Ended(_) => return Err(GameError::GameOver),
            _ => return Err(GameError::CannotJoinStartedGame),
        }

        let id = self.ids.next();
        self.players.insert(id, Player::new(id, name.to_string()));
        log::info!("{} joined room {} as {}", name, self.code, id);
        self.notice(format!("join:{name}"));
        self.broadcast_snapshot();
        Ok(id)
    }

    /// Removes a player. Anything they already submitted this phase stays in the ledgers.
    pub fn leave(&mut self, id: PlayerId) -> Result<(), GameError> {
        self.unlink(id);
        let player = self.players.remove(&id).ok_or(GameError::PlayerNotFound)?;
        log::info!("{} ({}) left room {}", player.name, id, self.code);
        self.notice(format!("leave:{}", player.name));
        self.broadcast_snapshot();
        Ok(())
    }

    /// Gives roles to the listed players and starts the first night.
    /// Ids that are not in the room are skipped.
    pub fn assign_roles<I>(&mut self, roles: I) -> Result<(), GameError>
    where
        I: IntoIterator<Item = (PlayerId, Role)>,
    {
        self.check_phase(self.phase == Phase::Lobby)?;
        for (id, role) in roles {
            match self.players.get_mut(&id) {
                Some(player) => player.role = Some(role),
                None => log::debug!("ignoring role for unknown player {}", id),
            }
        }
        self.begin_game();
        Ok(())
    }

    /// Deals a random set of roles and starts the first night.
    pub fn start(&mut self, seed: u64) -> Result<(), GameError> {
        self.check_phase(self.phase == Phase::Lobby)?;
        if self.players.len() < MIN_PLAYERS {
            return Err(GameError::TooFewPlayers);
        }
        let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(seed);
        let roles = player::assign_roles(self.players.len(), &mut rng);
        for (player, role) in self.players.values_mut().zip(roles) {
            player.role = Some(role);
        }
        self.begin_game();
        Ok(())
    }

    /// Resolves the night's actions, applies the deaths and moves on to the day.
    pub fn resolve_night(&mut self) -> Result<NightResolution, GameError> {
        self.check_phase(self.phase == Phase::Night)?;

        let resolution = night::resolve_night(&self.players, &self.night);
        for line in &resolution.log {
            self.notice(line.to_string());
        }
        for id in &resolution.deaths {
            self.kill(*id);
        }
        if self.check_game_over() {
            return Ok(resolution);
        }

        self.night.clear();
        let day = self.night_index;
        self.night_index += 1;
        self.phase = Phase::Day { tie: None };
        log::debug!("room {} entering day {}", self.code, day);
        self.notice(format!("phase:day:{day}"));
        Ok(resolution)
    }

    /// Records an anonymous vote for a player id or `skip`.
    pub fn vote(&mut self, target: &str) -> Result<(), GameError> {
        self.check_phase(matches!(self.phase, Phase::Day { .. }))?;
        let key = self.vote_key(target)?;
        self.day.vote(key);
        self.notice("vote:recorded");
        Ok(())
    }

    /// Counts the votes. A tie leaves the votes in place until [`Room::tie_break`] is called.
    pub fn finalize_day(&mut self) -> Result<DayOutcome, GameError> {
        self.check_phase(matches!(self.phase, Phase::Day { .. }))?;

        let outcome = self.day.finalize();
        match &outcome {
            DayOutcome::Tie(keys) => {
                let keys_text = keys.iter().map(|k| k.to_string()).collect::<Vec<_>>();
                self.notice(format!("day:tie:{}", keys_text.join(",")));
                self.phase = Phase::Day {
                    tie: Some(keys.clone()),
                };
                return Ok(outcome);
            }
            DayOutcome::Skip => self.notice("day:skip"),
            DayOutcome::Lynch(id) => {
                self.notice(format!("day:lynch:{id}"));
                self.kill(*id);
            }
        }
        self.end_day();
        Ok(outcome)
    }

    /// Settles the day with the given decision. The sender's privilege is not checked.
    pub fn tie_break(&mut self, target: &str) -> Result<(), GameError> {
        self.check_phase(matches!(self.phase, Phase::Day { .. }))?;
        let key = self.vote_key(target)?;
        if let Phase::Day { tie: Some(tied) } = &self.phase {
            log::debug!("room {} breaking a tie between {:?} with {}", self.code, tied, key);
        }
        self.notice(format!("day:tiebreak:{key}"));
        if let VoteKey::Player(id) = key {
            self.kill(id);
        }
        self.end_day();
        Ok(())
    }

    /// Passes a chat message from `player` through to the rest of the room.
    pub fn chat(&mut self, player: PlayerId, text: &str) -> Result<(), GameError> {
        self.check_phase(true)?;
        let sender = self.players.get(&player).ok_or(GameError::PlayerNotFound)?;
        let event = OutboundEvent::ChatRelay {
            from: player,
            name: sender.name.clone(),
            text: text.to_string(),
        };
        self.outbox.push(event);
        Ok(())
    }

    /// Tells the room that a command was rejected.
    pub fn report(&mut self, err: &GameError) {
        self.notice(format!("error:{err}"));
    }

    fn begin_game(&mut self) {
        log::info!("room {} started with {} players", self.code, self.players.len());
        self.phase = Phase::Night;
        self.broadcast_snapshot();
        self.begin_night();
    }

    fn begin_night(&mut self) {
        self.night.clear();
        self.phase = Phase::Night;
        log::debug!("room {} entering night {}", self.code, self.night_index);
        self.notice(format!("phase:night:{}", self.night_index));
    }

    fn end_day(&mut self) {
        self.day.clear();
        if !self.check_game_over() {
            self.begin_night();
        }
    }

    /// Ends the game if either side has won, returning `true` if it did.
    fn check_game_over(&mut self) -> bool {
        let Some(winner) = evaluate_winner(&self.players) else {
            return false;
        };
        log::info!("room {} won by {}", self.code, winner);
        self.phase = Phase::Ended(winner);
        self.notice(format!("winner:{winner}"));
        true
    }

    /// Parses a day vote, which must be `skip` or name a living player in this room.
    fn vote_key(&self, target: &str) -> Result<VoteKey, GameError> {
        let key = target.parse::<VoteKey>()?;
        if let VoteKey::Player(id) = key {
            if !self.players.get(&id).is_some_and(|p| p.alive) {
                return Err(GameError::InvalidTarget(target.to_string()));
            }
        }
        Ok(key)
    }

    fn kill(&mut self, id: PlayerId) {
        match self.players.get_mut(&id) {
            Some(player) => player.alive = false,
            None => log::warn!("room {} has no player {} to kill", self.code, id),
        }
    }

    /// Clears the link between `id` and its partner, on both sides.
    fn unlink(&mut self, id: PlayerId) {
        let partner = self
            .players
            .get_mut(&id)
            .and_then(|p| p.link_partner.take());
        if let Some(partner) = partner.and_then(|p| self.players.get_mut(&p)) {
            if partner.link_partner == Some(id) {
                partner.link_partner = None;
            }
        }
    }

    /// Fails with `GameOver` once the game has ended, or `WrongPhase` if `allowed` is false.
    fn check_phase(&self, allowed: bool) -> Result<(), GameError> {
        match self.phase {
            Phase::Ended(_) => Err(GameError::GameOver),
            _ if allowed => Ok(()),
            _ => Err(GameError::WrongPhase),
        }
    }

    fn notice(&mut self, text: impl Into<String>) {
        self.outbox.push(OutboundEvent::notice(text));
    }

    fn broadcast_snapshot(&mut self) {
        let snapshot = self.snapshot();
        self.outbox.push(OutboundEvent::RoomSnapshot(snapshot));
    }
}

fn random_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(char::from)
        .collect()
}

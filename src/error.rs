use crate::game::PlayerId;
use thiserror::Error;

/// The result of attempting to perform an invalid operation on a [Room](crate::game::Room)
/// or a [Session](crate::session::Session).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error("room_not_found")]
    RoomNotFound,
    #[error("player_not_found")]
    PlayerNotFound,
    #[error("cannot_join_started_game")]
    CannotJoinStartedGame,
    #[error("too_few_players")]
    TooFewPlayers,
    #[error("wrong_phase")]
    WrongPhase,
    #[error("game_over")]
    GameOver,
    #[error("forbidden_action_by:{0}")]
    ForbiddenAction(PlayerId),
    #[error("missing_target")]
    MissingTarget,
    #[error("invalid_target:{0}")]
    InvalidTarget(String),
}

impl GameError {
    /// Returns `true` if the error should be dropped silently rather than reported to the room.
    ///
    /// Unknown rooms and players turn control commands into no-ops, and a finished game
    /// ignores everything but departures.
    pub fn is_silent(&self) -> bool {
        matches!(
            self,
            GameError::RoomNotFound | GameError::PlayerNotFound | GameError::GameOver
        )
    }
}

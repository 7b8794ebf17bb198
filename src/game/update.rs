use super::player::PlayerId;
use serde::{Deserialize, Serialize};

/// A message for the transport layer to deliver to every client in the room.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundEvent {
    RoomSnapshot(RoomView),
    SystemNotice { text: String },
    /// A chat line, delivered to everyone but its sender.
    ChatRelay {
        from: PlayerId,
        name: String,
        text: String,
    },
}

/// The public view of a room. Roles, deaths and votes are never part of it.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq, Debug)]
pub struct RoomView {
    pub id: String,
    pub code: String,
    pub players: Vec<PublicPlayer>,
    pub started: bool,
}

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq, Debug)]
pub struct PublicPlayer {
    pub id: PlayerId,
    pub name: String,
}

impl OutboundEvent {
    pub fn notice(text: impl Into<String>) -> Self {
        OutboundEvent::SystemNotice { text: text.into() }
    }

    /// Gets the text of a system notice.
    #[cfg(test)]
    pub fn notice_text(&self) -> Option<&str> {
        match self {
            OutboundEvent::SystemNotice { text } => Some(text),
            _ => None,
        }
    }
}

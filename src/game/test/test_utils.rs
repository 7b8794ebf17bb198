//! Helpers for building rooms and player sets in a known state

use super::super::player::{Player, PlayerId, PlayerIds, Role};
use super::super::Room;
use std::collections::BTreeMap;

pub fn pid(n: u32) -> PlayerId {
    PlayerId(n)
}

/// The roles used by the standard five-player scenario, in join order.
pub fn standard_roles() -> Vec<Role> {
    vec![
        Role::Mafia,
        Role::Doctor,
        Role::Townsperson,
        Role::Detective,
        Role::Townsperson,
    ]
}

/// Creates a lobby in room "ABC" with players `p1..=pN`, discarding the join notices.
pub fn create_room(num_players: u32) -> Room {
    let mut room = Room::new("ABC", PlayerIds::default());
    for i in 1..=num_players {
        room.join(&format!("Player{}", i)).unwrap();
    }
    room.take_events();
    room
}

/// Creates a room in its first night where player `pN` holds `roles[N - 1]`.
pub fn create_room_with_roles(roles: &[Role]) -> Room {
    let mut room = create_room(roles.len() as u32);
    let assignment = roles
        .iter()
        .cloned()
        .enumerate()
        .map(|(i, role)| (pid(i as u32 + 1), role));
    room.assign_roles(assignment).unwrap();
    room.take_events();
    room
}

/// Creates the standard five-player room: p1 mafia, p2 doctor, p4 detective.
pub fn create_standard_room() -> Room {
    create_room_with_roles(&standard_roles())
}

/// Builds a player registry directly, for testing the pure resolvers.
pub fn players_with_roles(roles: &[Role]) -> BTreeMap<PlayerId, Player> {
    roles
        .iter()
        .enumerate()
        .map(|(i, role)| {
            let id = pid(i as u32 + 1);
            let mut player = Player::new(id, format!("Player{}", i + 1));
            player.role = Some(role.clone());
            (id, player)
        })
        .collect()
}

/// Drains the room's events, keeping only the text of system notices.
pub fn notices(room: &mut Room) -> Vec<String> {
    room.take_events()
        .iter()
        .filter_map(|e| e.notice_text().map(str::to_string))
        .collect()
}

/// Resolves the current night and skips the following day, landing in the next night.
pub fn advance_to_next_night(room: &mut Room) {
    room.resolve_night().unwrap();
    room.vote("skip").unwrap();
    room.finalize_day().unwrap();
    room.take_events();
}

pub fn is_alive(room: &Room, id: PlayerId) -> bool {
    room.players[&id].alive
}

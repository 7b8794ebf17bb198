//! Joining, leaving and the public room snapshot

use super::super::player::{PlayerIds, Role::*};
use super::super::update::{OutboundEvent, PublicPlayer};
use super::super::Room;
use super::test_utils::*;
use crate::error::GameError;

#[test]
fn test_join_allocates_fresh_ids() {
    let mut room = Room::new("ABC", PlayerIds::default());

    let alex = room.join("Alex").unwrap();
    let bob = room.join("Bob").unwrap();

    assert_eq!(alex, pid(1));
    assert_eq!(bob, pid(2));
    assert!(room.players[&alex].alive);
    assert_eq!(room.players[&alex].role, None);
}

#[test]
fn test_rooms_sharing_ids_never_collide() {
    let ids = PlayerIds::default();
    let mut first = Room::new("ABC", ids.clone());
    let mut second = Room::new("XYZ", ids);

    let a = first.join("Alex").unwrap();
    let b = second.join("Bob").unwrap();

    assert_ne!(a, b);
}

#[test]
fn test_join_broadcasts_snapshot() {
    let mut room = Room::new("ABC", PlayerIds::default());

    room.join("Alex").unwrap();

    let events = room.take_events();
    assert_eq!(events[0].notice_text(), Some("join:Alex"));
    let OutboundEvent::RoomSnapshot(view) = &events[1] else {
        panic!("expected a snapshot, got {:?}", events[1]);
    };
    assert_eq!(view.code, "ABC");
    assert_eq!(
        view.players,
        vec![PublicPlayer {
            id: pid(1),
            name: "Alex".to_string()
        }]
    );
    assert!(!view.started);
}

#[test]
fn test_snapshot_hides_roles() {
    let room = create_standard_room();

    let json = serde_json::to_value(OutboundEvent::RoomSnapshot(room.snapshot())).unwrap();

    assert_eq!(json["type"], "room_snapshot");
    assert_eq!(json["players"][0]["id"], "p1");
    assert_eq!(json["started"], true);
    let text = json["players"].to_string();
    assert!(!text.contains("role"));
    assert!(!text.contains("mafia"));
    assert!(!text.contains("alive"));
}

#[test]
fn test_cannot_join_started_game() {
    let mut room = create_standard_room();

    assert_eq!(room.join("Late"), Err(GameError::CannotJoinStartedGame));
    assert_eq!(room.num_players(), 5);
}

#[test]
fn test_leave_removes_player() {
    let mut room = create_room(3);

    room.leave(pid(2)).unwrap();

    assert_eq!(room.num_players(), 2);
    assert!(!room.players.contains_key(&pid(2)));
    assert_eq!(notices(&mut room), vec!["leave:Player2"]);
    assert_eq!(room.leave(pid(2)), Err(GameError::PlayerNotFound));
}

#[test]
fn test_leave_clears_link_partner() {
    let mut room = create_room_with_roles(&[Mafia, Cupid, Townsperson, Townsperson, Townsperson]);
    room.act(pid(2), &Cupid, &"link".into(), Some("p4")).unwrap();

    room.leave(pid(4)).unwrap();

    assert_eq!(room.players[&pid(2)].link_partner, None);
}

#[test]
fn test_assign_ignores_unknown_ids() {
    let mut room = create_room(3);

    room.assign_roles(vec![(pid(1), Mafia), (pid(77), Doctor)]).unwrap();

    assert_eq!(room.num_players(), 3);
    assert_eq!(room.players[&pid(1)].role, Some(Mafia));
}

#[test]
fn test_actions_of_departed_players_still_resolve() {
    let mut room = create_room_with_roles(&[Mafia, Doctor, Townsperson, Townsperson, Townsperson]);
    room.act(pid(2), &Doctor, &"protect".into(), Some("p3")).unwrap();
    room.act(pid(1), &Mafia, &"kill".into(), Some("p3")).unwrap();

    room.leave(pid(2)).unwrap();
    let resolution = room.resolve_night().unwrap();

    assert!(resolution.deaths.is_empty());
    assert!(is_alive(&room, pid(3)));
}

#[test]
fn test_targeting_departed_player_is_a_no_op() {
    let mut room = create_room_with_roles(&[Mafia, Townsperson, Townsperson, Townsperson]);
    room.act(pid(1), &Mafia, &"kill".into(), Some("p4")).unwrap();

    room.leave(pid(4)).unwrap();
    let resolution = room.resolve_night().unwrap();

    assert!(resolution.deaths.is_empty());
    assert!(resolution.log.is_empty());
}

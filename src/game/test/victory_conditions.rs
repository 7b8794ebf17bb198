//! Victory condition tests

use super::super::player::Role::*;
use super::super::victory::{evaluate_winner, Winner};
use super::super::Phase;
use super::test_utils::*;

#[test]
fn test_no_mafia_alive_town_wins() {
    let mut players = players_with_roles(&[Mafia, Townsperson, Townsperson]);
    players.get_mut(&pid(1)).unwrap().alive = false;

    assert_eq!(evaluate_winner(&players), Some(Winner::Town));
}

#[test]
fn test_mafia_parity_mafia_wins() {
    let players = players_with_roles(&[Mafia, Townsperson]);

    assert_eq!(evaluate_winner(&players), Some(Winner::Mafia));
}

#[test]
fn test_mafia_outnumbered_game_continues() {
    let players = players_with_roles(&[Mafia, Townsperson, Doctor, Detective]);

    assert_eq!(evaluate_winner(&players), None);
}

#[test]
fn test_dead_town_do_not_count() {
    let mut players = players_with_roles(&[Mafia, Mafia, Townsperson, Townsperson, Townsperson]);
    players.get_mut(&pid(5)).unwrap().alive = false;

    assert_eq!(evaluate_winner(&players), Some(Winner::Mafia));
}

#[test]
fn test_neutral_roles_are_not_counted() {
    let players = players_with_roles(&[Mafia, Townsperson, Jester]);

    assert_eq!(evaluate_winner(&players), Some(Winner::Mafia));
}

#[test]
fn test_unassigned_players_count_as_town() {
    let mut players = players_with_roles(&[Mafia, Townsperson, Townsperson]);
    players.get_mut(&pid(2)).unwrap().role = None;

    assert_eq!(evaluate_winner(&players), None);
}

#[test]
fn test_night_kill_reaching_parity_ends_game() {
    let mut room = create_room_with_roles(&[Mafia, Townsperson, Townsperson]);
    room.act(pid(1), &Mafia, &"kill".into(), Some("p2")).unwrap();
    room.take_events();

    room.resolve_night().unwrap();

    assert_eq!(room.phase(), &Phase::Ended(Winner::Mafia));
    assert_eq!(notices(&mut room), vec!["mafia:kill:p2", "winner:mafia"]);
}

#[test]
fn test_trap_killing_last_mafia_ends_game() {
    let mut room = create_room_with_roles(&[Mafia, Mafia, Grandma, Townsperson, Townsperson, Townsperson, Townsperson]);
    room.act(pid(3), &Grandma, &"arm".into(), None).unwrap();
    room.act(pid(1), &Mafia, &"kill".into(), Some("p3")).unwrap();
    room.resolve_night().unwrap();

    assert!(!is_alive(&room, pid(1)));
    assert_eq!(room.phase(), &Phase::Day { tie: None });

    room.vote("p2").unwrap();
    room.finalize_day().unwrap();

    assert_eq!(room.phase(), &Phase::Ended(Winner::Town));
}

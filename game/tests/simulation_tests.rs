//! End-to-end simulation tests exercising the public API the way the
//! server drives it: config load, joins, movement intents, ticks and
//! snapshots.

use game::config::game_from_str;
use game::geometry::{Direction, Vec2};
use game::map::MapId;
use game::snapshot;
use game::Game;

const CONFIG: &str = r#"{
    "defaultDogSpeed": 1.0,
    "defaultBagCapacity": 3,
    "lootGeneratorConfig": { "period": 5.0, "probability": 0.0 },
    "maps": [
        {
            "id": "town",
            "name": "Town",
            "roads": [
                { "x0": 0, "y0": 0, "x1": 20 },
                { "x0": 20, "y0": 0, "y1": 10 }
            ],
            "offices": [ { "id": "o0", "x": 10, "y": 0, "offsetX": 0, "offsetY": 0 } ],
            "lootTypes": [ { "value": 10 }, { "value": 20 } ]
        }
    ]
}"#;

fn town() -> MapId {
    MapId::new("town")
}

fn new_game() -> Game {
    game_from_str(CONFIG).expect("config must parse")
}

/// FULL GAME FLOW
mod game_flow_tests {
    use super::*;

    #[test]
    fn pickup_then_delivery_credits_the_score() {
        let mut game = new_game();
        let (token, _) = game.join("Pluto", &town()).unwrap();

        let session = game.session_mut(&town(), 0).unwrap();
        session.spawn_loot(0, Vec2::new(2.0, 0.0));
        session.spawn_loot(1, Vec2::new(4.0, 0.0));

        game.set_direction(&token, Some(Direction::East)).unwrap();

        // 6 seconds at speed 1: both loots are in the bag, office not yet.
        game.tick(6_000);
        let player = game.find_player_by_token(&token).unwrap();
        assert_eq!(player.bag().len(), 2);
        assert_eq!(player.score(), 0);

        // 6 more seconds: the dog crosses the office and delivers.
        game.tick(6_000);
        let player = game.find_player_by_token(&token).unwrap();
        assert!(player.bag().is_empty());
        assert_eq!(player.score(), 30);
    }

    #[test]
    fn dogs_stay_confined_to_roads_across_many_ticks() {
        let mut game = new_game();
        let (token, dog_id) = game.join("Pluto", &town()).unwrap();

        let directions = [
            Direction::East,
            Direction::North,
            Direction::East,
            Direction::South,
        ];
        for (step, dir) in directions.iter().cycle().take(40).enumerate() {
            game.set_direction(&token, Some(*dir)).unwrap();
            game.tick(700 + (step as u64 % 5) * 100);

            let session = game.session(&town(), 0).unwrap();
            let pos = session.dog(dog_id).unwrap().position();
            let map = game.find_map(&town()).unwrap();
            assert!(
                map.roads().iter().any(|road| road.contains(pos)),
                "dog escaped the road network at {:?} on step {}",
                pos,
                step
            );
        }
    }

    #[test]
    fn bag_capacity_is_never_exceeded() {
        let mut game = new_game();
        let (token, _) = game.join("Pluto", &town()).unwrap();

        let session = game.session_mut(&town(), 0).unwrap();
        for i in 0..6 {
            session.spawn_loot(0, Vec2::new(1.0 + i as f64, 0.0));
        }

        game.set_direction(&token, Some(Direction::East)).unwrap();
        game.tick(8_000);

        let player = game.find_player_by_token(&token).unwrap();
        assert_eq!(player.bag().len(), 3);
    }

    #[test]
    fn loot_is_conserved_across_a_tick() {
        let mut game = new_game();
        let (token, _) = game.join("Pluto", &town()).unwrap();

        let session = game.session_mut(&town(), 0).unwrap();
        session.spawn_loot(0, Vec2::new(2.0, 0.0));
        session.spawn_loot(1, Vec2::new(15.0, 0.0));

        game.set_direction(&token, Some(Direction::East)).unwrap();
        game.tick(5_000);

        let player = game.find_player_by_token(&token).unwrap();
        let on_ground = game.session(&town(), 0).unwrap().loot_count();
        // One picked up, one still lying ahead; nothing vanished.
        assert_eq!(player.bag().len() + on_ground, 2);
    }
}

/// IDLE RETIREMENT
mod retirement_tests {
    use super::*;

    #[test]
    fn idle_player_retires_after_fifteen_seconds_of_ticks() {
        let mut game = new_game();
        let (token, _) = game.join("Pluto", &town()).unwrap();

        let mut retired = Vec::new();
        for _ in 0..5 {
            retired.extend(game.tick(3_000));
        }

        assert_eq!(retired.len(), 1);
        assert_eq!(retired[0].name, "Pluto");
        assert_eq!(retired[0].play_ms, 15_000);
        assert!(game.find_player_by_token(&token).is_none());
        assert_eq!(game.session(&town(), 0).unwrap().dog_count(), 0);
    }

    #[test]
    fn movement_intent_resets_the_idle_clock() {
        let mut game = new_game();
        let (token, _) = game.join("Pluto", &town()).unwrap();

        game.tick(10_000);
        // Start moving just before the threshold, then stop again.
        game.set_direction(&token, Some(Direction::East)).unwrap();
        game.tick(10_000);
        game.set_direction(&token, None).unwrap();

        // The stop restarted the idle clock, so 10 more seconds is fine...
        assert!(game.tick(10_000).is_empty());
        // ...but five further seconds crosses the threshold.
        let retired = game.tick(5_000);
        assert_eq!(retired.len(), 1);
        assert_eq!(retired[0].play_ms, 35_000);
    }
}

/// SNAPSHOT ROUND-TRIP
mod snapshot_tests {
    use super::*;

    #[test]
    fn a_restarted_world_serves_the_same_state() {
        let mut game = new_game();
        let (token, dog_id) = game.join("Pluto", &town()).unwrap();
        game.session_mut(&town(), 0)
            .unwrap()
            .spawn_loot(1, Vec2::new(3.0, 0.0));
        game.set_direction(&token, Some(Direction::East)).unwrap();
        game.tick(4_000);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state");
        snapshot::save(&path, &game).unwrap();

        let mut restarted = new_game();
        assert!(snapshot::load(&path, &mut restarted).unwrap());

        let player = restarted.find_player_by_token(&token).unwrap();
        assert_eq!(player.dog_id(), dog_id);
        assert_eq!(player.bag().len(), 1);
        assert_eq!(player.bag()[0].kind(), 1);

        let dog = restarted
            .session(&town(), 0)
            .unwrap()
            .dog(dog_id)
            .unwrap();
        assert_eq!(dog.position(), Vec2::new(4.0, 0.0));
        assert_eq!(dog.direction(), Direction::East);

        // The restored world keeps simulating from where it left off.
        restarted.tick(1_000);
        let dog = restarted
            .session(&town(), 0)
            .unwrap()
            .dog(dog_id)
            .unwrap();
        assert_eq!(dog.position(), Vec2::new(5.0, 0.0));
    }
}

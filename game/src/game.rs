//! The authoritative world: maps, sessions, players and the tick engine.
//!
//! All mutation goes through [`Game`], which the server keeps behind a
//! single lock so joins, movement intents and ticks are observed in a
//! total order.

use std::collections::HashMap;

use log::{debug, info};
use rand::Rng;

use crate::collision::{find_gather_events, Gatherer, Item};
use crate::error::GameError;
use crate::geometry::{Direction, Vec2};
use crate::loot_gen::LootGenerator;
use crate::map::{Map, MapId, ROAD_HALF_WIDTH};
use crate::movement::make_move;
use crate::players::{Player, Players, Token};
use crate::session::{Dog, GameSession, Loot};

/// Collision width of a dog when gathering.
pub const PLAYER_WIDTH: f64 = 0.6;
/// Delivery radius of an office.
pub const BASE_WIDTH: f64 = 0.5;
/// Loot is collected on contact.
pub const LOOT_WIDTH: f64 = 0.0;
/// Idle time after which a player is retired, unless overridden by config.
pub const DEFAULT_RETIREMENT_MS: u64 = 15_000;

/// Scoreboard row produced when an idle player is retired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetiredPlayer {
    pub name: String,
    pub score: i64,
    pub play_ms: u64,
}

/// The whole game world plus its simulation entry points.
pub struct Game {
    maps: Vec<Map>,
    map_index: HashMap<MapId, usize>,
    sessions: HashMap<MapId, Vec<GameSession>>,
    players: Players,
    loot_gen: LootGenerator,
    retirement_ms: u64,
    random_spawn: bool,
    internal_ticker: bool,
}

impl Game {
    pub fn new(loot_gen: LootGenerator) -> Self {
        Self {
            maps: Vec::new(),
            map_index: HashMap::new(),
            sessions: HashMap::new(),
            players: Players::new(),
            loot_gen,
            retirement_ms: DEFAULT_RETIREMENT_MS,
            random_spawn: false,
            internal_ticker: false,
        }
    }

    pub fn add_map(&mut self, map: Map) -> Result<(), GameError> {
        if self.map_index.contains_key(map.id()) {
            return Err(GameError::DuplicateMap(map.id().as_str().to_string()));
        }
        self.map_index.insert(map.id().clone(), self.maps.len());
        self.maps.push(map);
        Ok(())
    }

    pub fn maps(&self) -> &[Map] {
        &self.maps
    }

    pub fn find_map(&self, id: &MapId) -> Option<&Map> {
        self.map_index.get(id).map(|&index| &self.maps[index])
    }

    pub fn set_random_spawn(&mut self) {
        self.random_spawn = true;
    }

    pub fn is_spawn_random(&self) -> bool {
        self.random_spawn
    }

    pub fn set_internal_ticker(&mut self) {
        self.internal_ticker = true;
    }

    pub fn is_ticker_internal(&self) -> bool {
        self.internal_ticker
    }

    pub fn set_retirement_ms(&mut self, retirement_ms: u64) {
        self.retirement_ms = retirement_ms;
    }

    pub fn players(&self) -> &Players {
        &self.players
    }

    pub fn session(&self, map_id: &MapId, index: usize) -> Option<&GameSession> {
        self.sessions.get(map_id)?.get(index)
    }

    pub fn sessions_by_map(&self) -> impl Iterator<Item = (&MapId, &[GameSession])> {
        self.sessions
            .iter()
            .map(|(id, sessions)| (id, sessions.as_slice()))
    }

    /// Index of the first session on this map with a free slot, opening a
    /// new session when every existing one is full. Sessions are never
    /// destroyed, so the index stays valid for the process lifetime.
    pub fn session_slot(&mut self, map_id: &MapId) -> usize {
        let sessions = self.sessions.entry(map_id.clone()).or_default();
        if let Some(index) = sessions.iter().position(|s| !s.is_full()) {
            return index;
        }
        sessions.push(GameSession::new(map_id.clone()));
        sessions.len() - 1
    }

    pub fn session_mut(&mut self, map_id: &MapId, index: usize) -> Option<&mut GameSession> {
        self.sessions.get_mut(map_id)?.get_mut(index)
    }

    /// Joins a new player onto a map and returns their token and dog id.
    pub fn join(&mut self, name: &str, map_id: &MapId) -> Result<(Token, u64), GameError> {
        let map = self
            .find_map(map_id)
            .ok_or_else(|| GameError::MapNotFound(map_id.as_str().to_string()))?;

        let spawn = if self.random_spawn {
            random_road_position(map)
        } else {
            deterministic_spawn(map)
        };

        let session_index = self.session_slot(map_id);
        let session = self
            .session_mut(map_id, session_index)
            .ok_or_else(|| GameError::MapNotFound(map_id.as_str().to_string()))?;
        let dog_id = session.add_dog(Dog::new(name, spawn));

        let token = self
            .players
            .add(Player::new(map_id.clone(), session_index, dog_id));
        info!("player {} joined map {} as dog {}", name, map_id, dog_id);
        Ok((token, dog_id))
    }

    /// Reattaches a restored player to the world under its original token.
    pub fn insert_restored_player(&mut self, player: Player, token: Token) {
        self.players.add_restored(player, token);
    }

    pub fn find_player_by_token(&self, token: &Token) -> Option<&Player> {
        self.players.find_by_token(token)
    }

    /// Name of the dog behind a player, for the roster endpoint.
    pub fn dog_name(&self, player: &Player) -> Option<&str> {
        self.session(player.map_id(), player.session_index())?
            .dog(player.dog_id())
            .map(Dog::name)
    }

    /// Applies a movement intent: `Some(direction)` starts the dog at map
    /// speed, `None` stops it. Also flips the player's idle clock.
    pub fn set_direction(
        &mut self,
        token: &Token,
        direction: Option<Direction>,
    ) -> Result<(), GameError> {
        let (map_id, session_index, dog_id) = {
            let player = self
                .players
                .find_by_token_mut(token)
                .ok_or(GameError::UnknownToken)?;
            match direction {
                Some(_) => player.mark_active(),
                None => player.mark_stopped(),
            }
            (
                player.map_id().clone(),
                player.session_index(),
                player.dog_id(),
            )
        };

        let speed = self
            .find_map(&map_id)
            .map(Map::dog_speed)
            .unwrap_or_default();
        if let Some(dog) = self
            .session_mut(&map_id, session_index)
            .and_then(|s| s.dog_mut(dog_id))
        {
            match direction {
                Some(dir) => {
                    dog.set_direction(dir);
                    dog.set_velocity(dir.velocity(speed));
                }
                None => dog.set_velocity(Vec2::ZERO),
            }
        }
        Ok(())
    }

    /// One simulation step. Retires idle players first, then advances each
    /// session (movement, pickups, deliveries, loot spawn). Returns the
    /// retired-player records for the caller to persist.
    pub fn tick(&mut self, delta_ms: u64) -> Vec<RetiredPlayer> {
        let retired = self.sweep_inactive(delta_ms);

        let Game {
            maps,
            map_index,
            sessions,
            players,
            loot_gen,
            ..
        } = self;

        for (map_id, session_list) in sessions.iter_mut() {
            let Some(&map_pos) = map_index.get(map_id) else {
                continue;
            };
            let map = &maps[map_pos];
            for session in session_list.iter_mut() {
                step_session(map, map_id, session, players, loot_gen, delta_ms);
            }
        }

        retired
    }

    /// Retires every player whose idle clock reaches the threshold:
    /// removes the dog and the player, and reports the scoreboard row.
    fn sweep_inactive(&mut self, delta_ms: u64) -> Vec<RetiredPlayer> {
        let mut retired = Vec::new();

        for dog_id in self.players.ids() {
            let Some(player) = self.players.get_mut(dog_id) else {
                continue;
            };

            if player.idle_ms().unwrap_or(0) + delta_ms >= self.retirement_ms {
                player.add_play_time(delta_ms);
                let score = player.score();
                let play_ms = player.play_ms();
                let map_id = player.map_id().clone();
                let session_index = player.session_index();

                let name = self
                    .session_mut(&map_id, session_index)
                    .and_then(|session| {
                        let name = session.dog(dog_id).map(|d| d.name().to_string());
                        session.remove_dog(dog_id);
                        name
                    })
                    .unwrap_or_default();

                self.players.remove(dog_id);
                info!("retired player {} with score {}", name, score);
                retired.push(RetiredPlayer {
                    name,
                    score,
                    play_ms,
                });
            } else {
                player.advance_time(delta_ms);
            }
        }

        retired
    }
}

/// Advances one session by `delta_ms`: moves every dog, resolves the
/// resulting crossings in time order, garbage-collects picked-up loot and
/// spawns new loot.
fn step_session(
    map: &Map,
    map_id: &MapId,
    session: &mut GameSession,
    players: &mut Players,
    loot_gen: &mut LootGenerator,
    delta_ms: u64,
) {
    let mut gatherers = Vec::with_capacity(session.dog_count());
    for dog in session.dogs_mut() {
        let start = dog.position();
        make_move(map, dog, delta_ms);
        gatherers.push(Gatherer {
            start,
            end: dog.position(),
            width: PLAYER_WIDTH,
        });
    }

    // Loot items come first so their indices match the session's loot
    // vector; office items follow.
    let loot_count = session.loot_count();
    let mut items: Vec<Item> = session
        .loots()
        .iter()
        .map(|loot| Item {
            position: loot.position(),
            width: LOOT_WIDTH,
        })
        .collect();
    items.extend(map.offices().iter().map(|office| Item {
        position: office.position().into(),
        width: BASE_WIDTH,
    }));

    for event in find_gather_events(&gatherers, &items) {
        let dog_id = session.dogs()[event.gatherer_id].id();
        let Some(player) = players.find_by_dog_and_map_mut(dog_id, map_id) else {
            continue;
        };

        if event.item_id < loot_count {
            let loot = &mut session.loots_mut()[event.item_id];
            if loot.is_collected() {
                continue;
            }
            // First come, first served; a full bag silently drops the loot.
            if player.bag().len() < map.bag_capacity() {
                loot.set_collected();
                player.take_loot(loot.clone());
            }
        } else {
            let gained: i64 = player
                .drain_bag()
                .iter()
                .map(|loot: &Loot| map.loot_value(loot.kind()))
                .sum();
            player.add_score(gained);
            debug!("dog {} delivered for {} points", dog_id, gained);
        }
    }

    session.sweep_collected();

    let spawned = loot_gen.generate(delta_ms, session.loot_count(), session.dog_count());
    for _ in 0..spawned {
        let kind = random_loot_kind(map);
        session.spawn_loot(kind, random_road_position(map));
    }
}

/// Deterministic spawn: the start point of the map's first road.
pub fn deterministic_spawn(map: &Map) -> Vec2 {
    map.roads()
        .first()
        .map(|road| road.start().into())
        .unwrap_or(Vec2::ZERO)
}

/// Uniform random position on a uniformly chosen road, rounded to two
/// decimal places on both axes.
pub fn random_road_position(map: &Map) -> Vec2 {
    let roads = map.roads();
    let mut rng = rand::thread_rng();
    let road = &roads[rng.gen_range(0..roads.len())];
    let across = round2(rng.gen_range(-ROAD_HALF_WIDTH..=ROAD_HALF_WIDTH));

    let (start, end) = (road.start(), road.end());
    let pos = if road.is_horizontal() {
        let (lo, hi) = (start.x.min(end.x), start.x.max(end.x));
        Vec2::new(
            rng.gen_range(f64::from(lo)..=f64::from(hi)),
            f64::from(start.y) + across,
        )
    } else {
        let (lo, hi) = (start.y.min(end.y), start.y.max(end.y));
        Vec2::new(
            f64::from(start.x) + across,
            rng.gen_range(f64::from(lo)..=f64::from(hi)),
        )
    };

    Vec2::new(round2(pos.x), round2(pos.y))
}

fn random_loot_kind(map: &Map) -> usize {
    let count = map.loot_type_count();
    if count <= 1 {
        return 0;
    }
    rand::thread_rng().gen_range(0..count)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Offset, Point};
    use crate::map::{Office, Road};
    use serde_json::json;

    fn town_map() -> Map {
        let mut map = Map::new(MapId::new("town"), "Town", 1.0, 3);
        map.add_road(Road::horizontal(Point { x: 0, y: 0 }, 20));
        map.set_loot_types(vec![json!({"value": 10}), json!({"value": 20})]);
        map
    }

    fn town_game() -> Game {
        let mut game = Game::new(LootGenerator::new(5000, 0.0));
        game.add_map(town_map()).unwrap();
        game
    }

    fn join(game: &mut Game) -> (Token, u64) {
        game.join("Pluto", &MapId::new("town")).unwrap()
    }

    #[test]
    fn duplicate_map_is_rejected() {
        let mut game = town_game();
        assert_eq!(
            game.add_map(town_map()),
            Err(GameError::DuplicateMap("town".to_string()))
        );
    }

    #[test]
    fn join_spawns_a_dog_on_the_first_road() {
        let mut game = town_game();
        let (token, dog_id) = join(&mut game);

        let player = game.find_player_by_token(&token).unwrap();
        assert_eq!(player.dog_id(), dog_id);

        let session = game.session(&MapId::new("town"), 0).unwrap();
        let dog = session.dog(dog_id).unwrap();
        assert_eq!(dog.position(), Vec2::new(0.0, 0.0));
        assert_eq!(game.dog_name(player), Some("Pluto"));
    }

    #[test]
    fn join_on_unknown_map_fails() {
        let mut game = town_game();
        assert_eq!(
            game.join("Pluto", &MapId::new("nowhere")),
            Err(GameError::MapNotFound("nowhere".to_string()))
        );
    }

    #[test]
    fn a_full_session_opens_a_second_one() {
        let mut game = town_game();
        let map_id = MapId::new("town");
        for i in 0..crate::session::MAX_DOGS_PER_SESSION {
            game.join(&format!("dog{i}"), &map_id).unwrap();
        }
        assert_eq!(game.session_slot(&map_id), 1);

        let (token, _) = join(&mut game);
        let player = game.find_player_by_token(&token).unwrap();
        assert_eq!(player.session_index(), 1);
    }

    #[test]
    fn movement_intent_sets_velocity_and_clears_idle() {
        let mut game = town_game();
        let (token, dog_id) = join(&mut game);

        game.set_direction(&token, Some(Direction::East)).unwrap();
        let player = game.find_player_by_token(&token).unwrap();
        assert_eq!(player.idle_ms(), None);
        let dog = game
            .session(&MapId::new("town"), 0)
            .unwrap()
            .dog(dog_id)
            .unwrap();
        assert_eq!(dog.velocity(), Vec2::new(1.0, 0.0));
        assert_eq!(dog.direction(), Direction::East);

        game.set_direction(&token, None).unwrap();
        let dog = game
            .session(&MapId::new("town"), 0)
            .unwrap()
            .dog(dog_id)
            .unwrap();
        assert_eq!(dog.velocity(), Vec2::ZERO);
        let player = game.find_player_by_token(&token).unwrap();
        assert_eq!(player.idle_ms(), Some(0));
    }

    #[test]
    fn unknown_token_is_reported() {
        let mut game = town_game();
        assert_eq!(
            game.set_direction(&Token::new("deadbeef"), None),
            Err(GameError::UnknownToken)
        );
    }

    #[test]
    fn tick_moves_dogs_and_picks_up_loot() {
        let mut game = town_game();
        let (token, _) = join(&mut game);
        let map_id = MapId::new("town");

        game.session_mut(&map_id, 0)
            .unwrap()
            .spawn_loot(1, Vec2::new(2.0, 0.0));

        game.set_direction(&token, Some(Direction::East)).unwrap();
        game.tick(4000);

        let player = game.find_player_by_token(&token).unwrap();
        assert_eq!(player.bag().len(), 1);
        assert_eq!(player.bag()[0].kind(), 1);
        // Picked-up loot is gone from the session the same tick.
        assert_eq!(game.session(&map_id, 0).unwrap().loot_count(), 0);
    }

    #[test]
    fn delivery_scores_the_whole_bag() {
        let mut map = town_map();
        map.add_office(Office::new(
            "o1",
            Point { x: 10, y: 0 },
            Offset { dx: 0, dy: 0 },
        ))
        .unwrap();
        let mut game = Game::new(LootGenerator::new(5000, 0.0));
        game.add_map(map).unwrap();
        let map_id = MapId::new("town");

        let (token, _) = join(&mut game);
        game.session_mut(&map_id, 0)
            .unwrap()
            .spawn_loot(0, Vec2::new(2.0, 0.0));
        game.session_mut(&map_id, 0)
            .unwrap()
            .spawn_loot(1, Vec2::new(4.0, 0.0));

        game.set_direction(&token, Some(Direction::East)).unwrap();
        game.tick(12_000);

        let player = game.find_player_by_token(&token).unwrap();
        assert!(player.bag().is_empty());
        assert_eq!(player.score(), 30);
    }

    #[test]
    fn bag_overflow_is_silently_dropped() {
        let mut game = Game::new(LootGenerator::new(5000, 0.0));
        let mut map = Map::new(MapId::new("town"), "Town", 1.0, 1);
        map.add_road(Road::horizontal(Point { x: 0, y: 0 }, 20));
        map.set_loot_types(vec![json!({"value": 10})]);
        game.add_map(map).unwrap();

        let map_id = MapId::new("town");
        let (token, _) = game.join("Pluto", &map_id).unwrap();
        game.session_mut(&map_id, 0)
            .unwrap()
            .spawn_loot(0, Vec2::new(2.0, 0.0));
        game.session_mut(&map_id, 0)
            .unwrap()
            .spawn_loot(0, Vec2::new(4.0, 0.0));

        game.set_direction(&token, Some(Direction::East)).unwrap();
        game.tick(6000);

        let player = game.find_player_by_token(&token).unwrap();
        assert_eq!(player.bag().len(), 1);
        // The second loot stayed on the ground.
        assert_eq!(game.session(&map_id, 0).unwrap().loot_count(), 1);
    }

    #[test]
    fn idle_player_is_retired_with_their_final_play_time() {
        let mut game = town_game();
        let (token, dog_id) = join(&mut game);
        let map_id = MapId::new("town");

        assert!(game.tick(10_000).is_empty());
        let retired = game.tick(5_000);
        assert_eq!(
            retired,
            vec![RetiredPlayer {
                name: "Pluto".to_string(),
                score: 0,
                play_ms: 15_000,
            }]
        );
        assert!(game.find_player_by_token(&token).is_none());
        assert!(game.session(&map_id, 0).unwrap().dog(dog_id).is_none());
    }

    #[test]
    fn moving_player_is_not_retired() {
        let mut game = town_game();
        let (token, _) = join(&mut game);
        game.set_direction(&token, Some(Direction::East)).unwrap();

        for _ in 0..4 {
            assert!(game.tick(5_000).is_empty());
        }
        assert!(game.find_player_by_token(&token).is_some());
    }

    #[test]
    fn loot_spawns_on_the_road_network() {
        let mut game = Game::new(LootGenerator::new(1000, 1.0));
        game.add_map(town_map()).unwrap();
        let map_id = MapId::new("town");
        let (_token, _) = game.join("Pluto", &map_id).unwrap();

        game.tick(1000);

        let session = game.session(&map_id, 0).unwrap();
        assert_eq!(session.loot_count(), 1);
        let map = game.find_map(&map_id).unwrap();
        let pos = session.loots()[0].position();
        assert!(map.roads().iter().any(|road| road.contains(pos)));
    }

    #[test]
    fn zero_delta_tick_is_a_no_op() {
        let mut game = town_game();
        let (token, dog_id) = join(&mut game);
        game.set_direction(&token, Some(Direction::East)).unwrap();

        assert!(game.tick(0).is_empty());
        let dog = game
            .session(&MapId::new("town"), 0)
            .unwrap()
            .dog(dog_id)
            .unwrap();
        assert_eq!(dog.position(), Vec2::new(0.0, 0.0));
        let player = game.find_player_by_token(&token).unwrap();
        assert_eq!(player.play_ms(), 0);
    }

    #[test]
    fn random_spawn_lands_on_a_road_with_two_decimals() {
        let map = town_map();
        for _ in 0..50 {
            let pos = random_road_position(&map);
            assert!(map.roads().iter().any(|road| road.contains(pos)));
            assert_approx(pos.x);
            assert_approx(pos.y);
        }
    }

    fn assert_approx(value: f64) {
        let scaled = value * 100.0;
        assert!((scaled - scaled.round()).abs() < 1e-9, "value {}", value);
    }
}

//! Player records, the live-player registry and its auth tokens.
//!
//! A player is the logical participant behind a dog. The registry keeps
//! three consistent views over the same live set: token -> player,
//! (map id, dog id) -> player, and iteration in join order. Players are
//! keyed by their dog id, which is process-wide monotonic, so a `BTreeMap`
//! over it naturally iterates in join order without any reindexing on
//! removal.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::map::MapId;
use crate::session::Loot;

/// 32-character lowercase-hex secret bound 1:1 to a live player.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Token(String);

impl Token {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Issues tokens from two independently seeded 64-bit generators; each
/// contributes 16 hex digits of the 32-character token.
#[derive(Debug)]
pub struct TokenGenerator {
    first: SmallRng,
    second: SmallRng,
}

/// Fresh generator seeded from entropy.
fn entropy_rng() -> SmallRng {
    let seed: u64 = rand::random();
    SmallRng::seed_from_u64(seed)
}

impl TokenGenerator {
    pub fn new() -> Self {
        Self {
            first: entropy_rng(),
            second: entropy_rng(),
        }
    }

    pub fn generate(&mut self) -> Token {
        Token(format!(
            "{:016x}{:016x}",
            self.first.gen::<u64>(),
            self.second.gen::<u64>()
        ))
    }
}

impl Default for TokenGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// A logical participant: dog handle, carried loot, score and timers.
#[derive(Debug)]
pub struct Player {
    map_id: MapId,
    session_index: usize,
    dog_id: u64,
    bag: Vec<Loot>,
    score: i64,
    play_ms: u64,
    idle_ms: Option<u64>,
}

impl Player {
    /// A freshly joined player; the dog spawns stationary, so the idle
    /// clock starts immediately.
    pub fn new(map_id: MapId, session_index: usize, dog_id: u64) -> Self {
        Self {
            map_id,
            session_index,
            dog_id,
            bag: Vec::new(),
            score: 0,
            play_ms: 0,
            idle_ms: Some(0),
        }
    }

    /// Rebuilds a player from snapshot state. `moving` tells whether the
    /// restored dog had a non-zero velocity, which decides the idle clock.
    pub fn restored(
        map_id: MapId,
        session_index: usize,
        dog_id: u64,
        bag: Vec<Loot>,
        score: i64,
        moving: bool,
    ) -> Self {
        Self {
            map_id,
            session_index,
            dog_id,
            bag,
            score,
            play_ms: 0,
            idle_ms: if moving { None } else { Some(0) },
        }
    }

    pub fn map_id(&self) -> &MapId {
        &self.map_id
    }

    pub fn session_index(&self) -> usize {
        self.session_index
    }

    pub fn dog_id(&self) -> u64 {
        self.dog_id
    }

    pub fn bag(&self) -> &[Loot] {
        &self.bag
    }

    pub fn take_loot(&mut self, loot: Loot) {
        self.bag.push(loot);
    }

    /// Empties the bag for delivery.
    pub fn drain_bag(&mut self) -> Vec<Loot> {
        std::mem::take(&mut self.bag)
    }

    pub fn score(&self) -> i64 {
        self.score
    }

    pub fn add_score(&mut self, delta: i64) {
        self.score += delta;
    }

    pub fn play_ms(&self) -> u64 {
        self.play_ms
    }

    pub fn idle_ms(&self) -> Option<u64> {
        self.idle_ms
    }

    /// Called when the player issues a movement intent.
    pub fn mark_active(&mut self) {
        self.idle_ms = None;
    }

    /// Called when the player stops their dog.
    pub fn mark_stopped(&mut self) {
        self.idle_ms = Some(0);
    }

    /// Advances both the play clock and, when idle, the idle clock.
    pub fn advance_time(&mut self, delta_ms: u64) {
        self.play_ms += delta_ms;
        if let Some(idle) = self.idle_ms.as_mut() {
            *idle += delta_ms;
        }
    }

    /// Advances only the play clock; used on the retirement path.
    pub fn add_play_time(&mut self, delta_ms: u64) {
        self.play_ms += delta_ms;
    }
}

/// Registry of all live players across every map and session.
#[derive(Debug, Default)]
pub struct Players {
    players: BTreeMap<u64, Player>,
    token_to_dog: HashMap<Token, u64>,
    dog_to_token: HashMap<u64, Token>,
    by_map_and_dog: HashMap<(MapId, u64), u64>,
    token_gen: TokenGenerator,
}

impl Players {
    pub fn new() -> Self {
        Self {
            players: BTreeMap::new(),
            token_to_dog: HashMap::new(),
            dog_to_token: HashMap::new(),
            by_map_and_dog: HashMap::new(),
            token_gen: TokenGenerator::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Registers a new player under a fresh token and returns it.
    pub fn add(&mut self, player: Player) -> Token {
        let token = self.token_gen.generate();
        self.register(player, token.clone());
        token
    }

    /// Re-registers a player restored from a snapshot under its original
    /// token.
    pub fn add_restored(&mut self, player: Player, token: Token) {
        self.register(player, token);
    }

    fn register(&mut self, player: Player, token: Token) {
        let dog_id = player.dog_id();
        let map_id = player.map_id().clone();
        self.token_to_dog.insert(token.clone(), dog_id);
        self.dog_to_token.insert(dog_id, token);
        self.by_map_and_dog.insert((map_id, dog_id), dog_id);
        self.players.insert(dog_id, player);
    }

    /// Removes a player from all three views.
    pub fn remove(&mut self, dog_id: u64) -> Option<Player> {
        let player = self.players.remove(&dog_id)?;
        if let Some(token) = self.dog_to_token.remove(&dog_id) {
            self.token_to_dog.remove(&token);
        }
        self.by_map_and_dog
            .remove(&(player.map_id().clone(), dog_id));
        Some(player)
    }

    pub fn find_by_token(&self, token: &Token) -> Option<&Player> {
        let dog_id = self.token_to_dog.get(token)?;
        self.players.get(dog_id)
    }

    pub fn find_by_token_mut(&mut self, token: &Token) -> Option<&mut Player> {
        let dog_id = *self.token_to_dog.get(token)?;
        self.players.get_mut(&dog_id)
    }

    pub fn find_by_dog_and_map(&self, dog_id: u64, map_id: &MapId) -> Option<&Player> {
        let dog_id = self.by_map_and_dog.get(&(map_id.clone(), dog_id))?;
        self.players.get(dog_id)
    }

    pub fn find_by_dog_and_map_mut(&mut self, dog_id: u64, map_id: &MapId) -> Option<&mut Player> {
        let dog_id = *self.by_map_and_dog.get(&(map_id.clone(), dog_id))?;
        self.players.get_mut(&dog_id)
    }

    pub fn get(&self, dog_id: u64) -> Option<&Player> {
        self.players.get(&dog_id)
    }

    pub fn get_mut(&mut self, dog_id: u64) -> Option<&mut Player> {
        self.players.get_mut(&dog_id)
    }

    pub fn token_of(&self, dog_id: u64) -> Option<&Token> {
        self.dog_to_token.get(&dog_id)
    }

    /// Live players in join order.
    pub fn iter(&self) -> impl Iterator<Item = (u64, &Player)> {
        self.players.iter().map(|(id, player)| (*id, player))
    }

    /// Dog ids of all live players, in join order.
    pub fn ids(&self) -> Vec<u64> {
        self.players.keys().copied().collect()
    }
}

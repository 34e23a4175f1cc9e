//! World snapshots for crash recovery.
//!
//! A snapshot is a self-contained bincode byte stream of every session
//! (dogs and ground loot, per map) plus every player (bag, score, token
//! and dog id, so restore can rejoin dogs to their players). Writes go to
//! a temp file that is atomically renamed over the target, so a crash
//! mid-save leaves the previous snapshot intact.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::SnapshotError;
use crate::game::Game;
use crate::geometry::{Direction, Vec2};
use crate::map::MapId;
use crate::players::{Player, Token};
use crate::session::{reserve_dog_ids_through, Dog, Loot};

#[derive(Debug, Serialize, Deserialize)]
struct DogRepr {
    name: String,
    position: Vec2,
    velocity: Vec2,
    direction: Direction,
    id: u64,
}

impl DogRepr {
    fn capture(dog: &Dog) -> Self {
        Self {
            name: dog.name().to_string(),
            position: dog.position(),
            velocity: dog.velocity(),
            direction: dog.direction(),
            id: dog.id(),
        }
    }

    fn restore(&self) -> Dog {
        Dog::restored(
            self.name.clone(),
            self.position,
            self.velocity,
            self.direction,
            self.id,
        )
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct LootRepr {
    kind: usize,
    position: Vec2,
    collected: bool,
}

impl LootRepr {
    fn capture(loot: &Loot) -> Self {
        Self {
            kind: loot.kind(),
            position: loot.position(),
            collected: loot.is_collected(),
        }
    }

    fn restore(&self) -> Loot {
        let mut loot = Loot::new(self.kind, self.position);
        if self.collected {
            loot.set_collected();
        }
        loot
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct PlayerRepr {
    bag: Vec<LootRepr>,
    score: i64,
    token: String,
    dog_id: u64,
}

#[derive(Debug, Serialize, Deserialize)]
struct SessionRepr {
    dogs: Vec<DogRepr>,
    loots: Vec<LootRepr>,
}

/// Serializable image of the whole world.
#[derive(Debug, Serialize, Deserialize)]
pub struct Snapshot {
    sessions: HashMap<String, Vec<SessionRepr>>,
    players: Vec<PlayerRepr>,
}

impl Snapshot {
    pub fn capture(game: &Game) -> Self {
        let mut sessions: HashMap<String, Vec<SessionRepr>> = HashMap::new();
        for (map_id, session_list) in game.sessions_by_map() {
            let reprs = session_list
                .iter()
                .map(|session| SessionRepr {
                    dogs: session.dogs().iter().map(DogRepr::capture).collect(),
                    loots: session.loots().iter().map(LootRepr::capture).collect(),
                })
                .collect();
            sessions.insert(map_id.as_str().to_string(), reprs);
        }

        let players = game
            .players()
            .iter()
            .filter_map(|(dog_id, player)| {
                let token = game.players().token_of(dog_id)?;
                Some(PlayerRepr {
                    bag: player.bag().iter().map(LootRepr::capture).collect(),
                    score: player.score(),
                    token: token.as_str().to_string(),
                    dog_id,
                })
            })
            .collect();

        Self { sessions, players }
    }

    /// Reinserts the captured sessions and players into a freshly loaded
    /// world. Maps must already be present from the config.
    pub fn restore(self, game: &mut Game) -> Result<(), SnapshotError> {
        let players_by_dog: HashMap<u64, PlayerRepr> = self
            .players
            .into_iter()
            .map(|player| (player.dog_id, player))
            .collect();

        let mut max_dog_id = None::<u64>;

        for (map_str, session_reprs) in self.sessions {
            let map_id = MapId::new(map_str);
            if game.find_map(&map_id).is_none() {
                return Err(SnapshotError::UnknownMap(map_id.as_str().to_string()));
            }

            for repr in session_reprs {
                let slot = game.session_slot(&map_id);
                let session = game
                    .session_mut(&map_id, slot)
                    .ok_or_else(|| SnapshotError::UnknownMap(map_id.as_str().to_string()))?;

                for loot in &repr.loots {
                    session.add_existing_loot(loot.restore());
                }

                let mut restored_players = Vec::with_capacity(repr.dogs.len());
                for dog_repr in &repr.dogs {
                    let dog = dog_repr.restore();
                    let moving = dog.is_moving();
                    max_dog_id = Some(max_dog_id.map_or(dog.id(), |m| m.max(dog.id())));

                    let player_repr = players_by_dog
                        .get(&dog.id())
                        .ok_or(SnapshotError::MissingPlayer(dog.id()))?;
                    let bag = player_repr.bag.iter().map(LootRepr::restore).collect();
                    let player = Player::restored(
                        map_id.clone(),
                        slot,
                        dog.id(),
                        bag,
                        player_repr.score,
                        moving,
                    );
                    session.add_dog(dog);
                    restored_players.push((player, Token::new(player_repr.token.clone())));
                }

                for (player, token) in restored_players {
                    game.insert_restored_player(player, token);
                }
            }
        }

        if let Some(max) = max_dog_id {
            reserve_dog_ids_through(max);
        }
        Ok(())
    }
}

/// Serializes the world to `<path>.tmp`, then atomically renames it over
/// `path`. A failed rename removes the temp file and leaves the previous
/// snapshot intact.
pub fn save(path: &Path, game: &Game) -> Result<(), SnapshotError> {
    let tmp_path = tmp_path_for(path);
    let bytes = bincode::serialize(&Snapshot::capture(game))?;
    fs::write(&tmp_path, bytes)?;

    if let Err(e) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        warn!("failed to move state file into place: {}", e);
    }
    Ok(())
}

/// Restores the world from `path`. A missing file is a cold start and
/// returns `Ok(false)`; a malformed file is an error for the boot path to
/// treat as fatal.
pub fn load(path: &Path, game: &mut Game) -> Result<bool, SnapshotError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e.into()),
    };

    let snapshot: Snapshot = bincode::deserialize(&bytes)?;
    snapshot.restore(game)?;
    info!("restored game state from {}", path.display());
    Ok(true)
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

/// Tick listener that snapshots the world every `period_ms` of simulated
/// time. A zero period disables periodic saves; the shutdown save is
/// driven separately through [`SnapshotListener::save_now`].
#[derive(Debug)]
pub struct SnapshotListener {
    path: PathBuf,
    period_ms: u64,
    since_save_ms: u64,
}

impl SnapshotListener {
    pub fn new(path: PathBuf, period_ms: u64) -> Self {
        Self {
            path,
            period_ms,
            since_save_ms: 0,
        }
    }

    /// Restores the world from this listener's state file, if present.
    pub fn restore(&self, game: &mut Game) -> Result<bool, SnapshotError> {
        load(&self.path, game)
    }

    pub fn on_tick(&mut self, delta_ms: u64, game: &Game) -> Result<(), SnapshotError> {
        if self.period_ms == 0 {
            return Ok(());
        }
        self.since_save_ms += delta_ms;
        if self.since_save_ms > self.period_ms {
            save(&self.path, game)?;
            self.since_save_ms = 0;
        }
        Ok(())
    }

    pub fn save_now(&self, game: &Game) -> Result<(), SnapshotError> {
        save(&self.path, game)
    }
}

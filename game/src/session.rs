//! In-world entities owned by a session: dogs and loot.
//!
//! Dog and loot ids are process-wide monotonic counters. Allocation only
//! ever happens on the game strand, but the counters are atomics so the
//! invariant does not silently depend on that.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::geometry::{Direction, Vec2};
use crate::map::MapId;

static NEXT_DOG_ID: AtomicU64 = AtomicU64::new(0);
static NEXT_LOOT_ID: AtomicU64 = AtomicU64::new(0);

fn next_dog_id() -> u64 {
    NEXT_DOG_ID.fetch_add(1, Ordering::Relaxed)
}

fn next_loot_id() -> u64 {
    NEXT_LOOT_ID.fetch_add(1, Ordering::Relaxed)
}

/// Moves the dog id counter past ids brought back by a snapshot restore,
/// so newly joined dogs cannot collide with restored ones.
pub fn reserve_dog_ids_through(max_seen: u64) {
    let mut current = NEXT_DOG_ID.load(Ordering::Relaxed);
    while current <= max_seen {
        match NEXT_DOG_ID.compare_exchange(
            current,
            max_seen + 1,
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => break,
            Err(observed) => current = observed,
        }
    }
}

/// Maximum number of dogs one session holds before a new session is
/// opened for the same map.
pub const MAX_DOGS_PER_SESSION: usize = 100;

/// A player's avatar in the world.
#[derive(Debug, Clone, PartialEq)]
pub struct Dog {
    name: String,
    position: Vec2,
    velocity: Vec2,
    direction: Direction,
    id: u64,
}

impl Dog {
    /// Spawns a stationary dog facing north with a fresh id.
    pub fn new(name: impl Into<String>, position: Vec2) -> Self {
        Self {
            name: name.into(),
            position,
            velocity: Vec2::ZERO,
            direction: Direction::North,
            id: next_dog_id(),
        }
    }

    /// Rebuilds a dog from snapshot state, keeping its original id.
    pub fn restored(
        name: impl Into<String>,
        position: Vec2,
        velocity: Vec2,
        direction: Direction,
        id: u64,
    ) -> Self {
        Self {
            name: name.into(),
            position,
            velocity,
            direction,
            id,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn set_position(&mut self, position: Vec2) {
        self.position = position;
    }

    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    pub fn set_velocity(&mut self, velocity: Vec2) {
        self.velocity = velocity;
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn set_direction(&mut self, direction: Direction) {
        self.direction = direction;
    }

    pub fn is_moving(&self) -> bool {
        self.velocity != Vec2::ZERO
    }
}

/// A pickup lying on a road, or carried in a player's bag once collected.
#[derive(Debug, Clone, PartialEq)]
pub struct Loot {
    id: u64,
    kind: usize,
    position: Vec2,
    collected: bool,
}

impl Loot {
    pub fn new(kind: usize, position: Vec2) -> Self {
        Self {
            id: next_loot_id(),
            kind,
            position,
            collected: false,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn kind(&self) -> usize {
        self.kind
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn is_collected(&self) -> bool {
        self.collected
    }

    pub fn set_collected(&mut self) {
        self.collected = true;
    }
}

/// A bounded group of dogs playing together on one map.
#[derive(Debug)]
pub struct GameSession {
    map_id: MapId,
    dogs: Vec<Dog>,
    loots: Vec<Loot>,
}

impl GameSession {
    pub fn new(map_id: MapId) -> Self {
        Self {
            map_id,
            dogs: Vec::new(),
            loots: Vec::new(),
        }
    }

    pub fn map_id(&self) -> &MapId {
        &self.map_id
    }

    pub fn dogs(&self) -> &[Dog] {
        &self.dogs
    }

    pub fn dogs_mut(&mut self) -> &mut [Dog] {
        &mut self.dogs
    }

    pub fn dog_count(&self) -> usize {
        self.dogs.len()
    }

    pub fn is_full(&self) -> bool {
        self.dogs.len() >= MAX_DOGS_PER_SESSION
    }

    pub fn add_dog(&mut self, dog: Dog) -> u64 {
        let id = dog.id();
        self.dogs.push(dog);
        id
    }

    pub fn dog(&self, id: u64) -> Option<&Dog> {
        self.dogs.iter().find(|dog| dog.id() == id)
    }

    pub fn dog_mut(&mut self, id: u64) -> Option<&mut Dog> {
        self.dogs.iter_mut().find(|dog| dog.id() == id)
    }

    /// Removes a retired dog; the remaining order is preserved.
    pub fn remove_dog(&mut self, id: u64) {
        self.dogs.retain(|dog| dog.id() != id);
    }

    pub fn loots(&self) -> &[Loot] {
        &self.loots
    }

    pub fn loots_mut(&mut self) -> &mut [Loot] {
        &mut self.loots
    }

    pub fn loot_count(&self) -> usize {
        self.loots.len()
    }

    pub fn spawn_loot(&mut self, kind: usize, position: Vec2) {
        self.loots.push(Loot::new(kind, position));
    }

    /// Reinserts a loot restored from a snapshot.
    pub fn add_existing_loot(&mut self, loot: Loot) {
        self.loots.push(loot);
    }

    /// Drops every loot collected during this tick.
    pub fn sweep_collected(&mut self) {
        self.loots.retain(|loot| !loot.is_collected());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dog_ids_are_monotonic() {
        let a = Dog::new("Rex", Vec2::ZERO);
        let b = Dog::new("Toby", Vec2::ZERO);
        assert!(b.id() > a.id());
    }

    #[test]
    fn new_dog_is_stationary_and_faces_north() {
        let dog = Dog::new("Rex", Vec2::new(1.0, 2.0));
        assert_eq!(dog.velocity(), Vec2::ZERO);
        assert_eq!(dog.direction(), Direction::North);
        assert!(!dog.is_moving());
    }

    #[test]
    fn reserve_dog_ids_skips_restored_range() {
        let restored = Dog::new("probe", Vec2::ZERO).id() + 50;
        reserve_dog_ids_through(restored);
        assert!(Dog::new("next", Vec2::ZERO).id() > restored);
    }

    #[test]
    fn session_tracks_capacity() {
        let mut session = GameSession::new(MapId::new("m1"));
        for i in 0..MAX_DOGS_PER_SESSION {
            assert!(!session.is_full(), "filled early at {}", i);
            session.add_dog(Dog::new(format!("dog{i}"), Vec2::ZERO));
        }
        assert!(session.is_full());
    }

    #[test]
    fn removing_a_dog_keeps_the_rest_in_order() {
        let mut session = GameSession::new(MapId::new("m1"));
        let a = session.add_dog(Dog::new("a", Vec2::ZERO));
        let b = session.add_dog(Dog::new("b", Vec2::ZERO));
        let c = session.add_dog(Dog::new("c", Vec2::ZERO));

        session.remove_dog(b);
        let ids: Vec<u64> = session.dogs().iter().map(Dog::id).collect();
        assert_eq!(ids, vec![a, c]);
    }

    #[test]
    fn collected_loot_is_swept() {
        let mut session = GameSession::new(MapId::new("m1"));
        session.spawn_loot(0, Vec2::new(1.0, 0.0));
        session.spawn_loot(1, Vec2::new(2.0, 0.0));
        session.loots_mut()[0].set_collected();

        session.sweep_collected();
        assert_eq!(session.loot_count(), 1);
        assert_eq!(session.loots()[0].kind(), 1);
    }
}

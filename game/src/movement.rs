//! Road-constrained dog movement.
//!
//! Dogs live inside the union of road walkable areas. A move either lands
//! inside one of the areas of the roads covering the dog's current cell,
//! or the dog is clamped to the furthest walkable edge ahead of it and
//! stopped.

use log::warn;

use crate::geometry::{Direction, Vec2};
use crate::map::Map;
use crate::session::Dog;

/// Advances one dog by `delta_ms`, clipping to the road network.
///
/// The candidate position is `pos + v * delta / 1000`. Candidate roads are
/// the ones covering `round(pos)`; by construction a dog always sits on at
/// least one of them. If the candidate position escapes every candidate
/// area, the dog stops at the furthest edge (among the roads it currently
/// stands on) along its facing axis. An adjacent road may extend further
/// than the one the dog entered on, which is why all candidates are
/// consulted before clipping.
pub fn make_move(map: &Map, dog: &mut Dog, delta_ms: u64) {
    let pos = dog.position();
    let vel = dog.velocity();
    let dt = delta_ms as f64 / 1000.0;
    let target = Vec2::new(pos.x + vel.x * dt, pos.y + vel.y * dt);

    let Some(road_ids) = map.roads_at(pos.nearest_cell()) else {
        // A dog off the road network means corrupted state; freeze it
        // rather than let it wander.
        warn!("dog {} is outside the road network at {:?}", dog.id(), pos);
        dog.set_velocity(Vec2::ZERO);
        return;
    };

    if road_ids
        .iter()
        .any(|&i| map.roads()[i].contains(target))
    {
        dog.set_position(target);
        return;
    }

    let mut clipped = pos;
    let standing_on = road_ids
        .iter()
        .map(|&i| &map.roads()[i])
        .filter(|road| road.contains(pos));

    match dog.direction() {
        Direction::North => {
            for road in standing_on {
                clipped.y = clipped.y.min(road.area().min.y);
            }
        }
        Direction::South => {
            for road in standing_on {
                clipped.y = clipped.y.max(road.area().max.y);
            }
        }
        Direction::West => {
            for road in standing_on {
                clipped.x = clipped.x.min(road.area().min.x);
            }
        }
        Direction::East => {
            for road in standing_on {
                clipped.x = clipped.x.max(road.area().max.x);
            }
        }
    }

    dog.set_position(clipped);
    dog.set_velocity(Vec2::ZERO);
}

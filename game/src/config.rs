//! World configuration loading.
//!
//! The config document is JSON: global defaults, the loot generator
//! settings and one entry per map. Parsing goes through serde into plain
//! document structs which are then validated and assembled into a
//! [`Game`].

use std::fs;
use std::path::Path;

use log::warn;
use serde::Deserialize;

use crate::error::ConfigError;
use crate::game::Game;
use crate::geometry::{Offset, Point, Rectangle, Size};
use crate::loot_gen::LootGenerator;
use crate::map::{Building, Map, MapId, Office, Road};

const DEFAULT_DOG_SPEED: f64 = 1.0;
const DEFAULT_BAG_CAPACITY: usize = 3;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WorldDoc {
    default_dog_speed: Option<f64>,
    default_bag_capacity: Option<usize>,
    loot_generator_config: Option<LootGenDoc>,
    dog_retirement_time: Option<f64>,
    maps: Vec<MapDoc>,
}

#[derive(Debug, Deserialize)]
struct LootGenDoc {
    /// Spawn period in seconds.
    period: f64,
    probability: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MapDoc {
    id: String,
    name: String,
    dog_speed: Option<f64>,
    bag_capacity: Option<usize>,
    roads: Vec<RoadDoc>,
    #[serde(default)]
    buildings: Vec<BuildingDoc>,
    #[serde(default)]
    offices: Vec<OfficeDoc>,
    loot_types: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RoadDoc {
    x0: i32,
    y0: i32,
    x1: Option<i32>,
    y1: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct BuildingDoc {
    x: i32,
    y: i32,
    w: i32,
    h: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OfficeDoc {
    id: String,
    x: i32,
    y: i32,
    offset_x: i32,
    offset_y: i32,
}

/// Loads and validates the world config from a file.
pub fn load_game(path: &Path) -> Result<Game, ConfigError> {
    let text = fs::read_to_string(path)?;
    game_from_str(&text)
}

/// Builds a [`Game`] from a config document held in memory.
pub fn game_from_str(text: &str) -> Result<Game, ConfigError> {
    let doc: WorldDoc = serde_json::from_str(text)?;

    if doc.maps.is_empty() {
        return Err(ConfigError::Invalid("empty maps array".to_string()));
    }

    let loot = doc
        .loot_generator_config
        .ok_or_else(|| ConfigError::Invalid("missing lootGeneratorConfig".to_string()))?;
    if loot.period <= 0.0 {
        return Err(ConfigError::Invalid(
            "loot generator period must be positive".to_string(),
        ));
    }
    if !(0.0..=1.0).contains(&loot.probability) {
        return Err(ConfigError::Invalid(
            "loot generator probability must be within [0, 1]".to_string(),
        ));
    }

    let default_speed = doc.default_dog_speed.unwrap_or(DEFAULT_DOG_SPEED);
    let default_capacity = doc.default_bag_capacity.unwrap_or_else(|| {
        warn!(
            "config has no defaultBagCapacity, falling back to {}",
            DEFAULT_BAG_CAPACITY
        );
        DEFAULT_BAG_CAPACITY
    });

    let mut game = Game::new(LootGenerator::new(
        (loot.period * 1000.0) as u64,
        loot.probability,
    ));

    if let Some(retirement) = doc.dog_retirement_time {
        game.set_retirement_ms((retirement * 1000.0) as u64);
    }

    for map_doc in doc.maps {
        let map = build_map(map_doc, default_speed, default_capacity)?;
        game.add_map(map)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
    }

    Ok(game)
}

fn build_map(doc: MapDoc, default_speed: f64, default_capacity: usize) -> Result<Map, ConfigError> {
    if doc.roads.is_empty() {
        return Err(ConfigError::Invalid(format!(
            "map {} has an empty roads array",
            doc.id
        )));
    }
    if doc.loot_types.is_empty() {
        return Err(ConfigError::Invalid(format!(
            "map {} has an empty lootTypes array",
            doc.id
        )));
    }

    let mut map = Map::new(
        MapId::new(doc.id.clone()),
        doc.name,
        doc.dog_speed.unwrap_or(default_speed),
        doc.bag_capacity.unwrap_or(default_capacity),
    );

    for road in doc.roads {
        let start = Point {
            x: road.x0,
            y: road.y0,
        };
        let road = match (road.x1, road.y1) {
            (Some(end_x), None) => Road::horizontal(start, end_x),
            (None, Some(end_y)) => Road::vertical(start, end_y),
            _ => {
                return Err(ConfigError::Invalid(format!(
                    "map {} has a road with neither or both of x1/y1",
                    doc.id
                )))
            }
        };
        map.add_road(road);
    }

    for building in doc.buildings {
        map.add_building(Building::new(Rectangle {
            position: Point {
                x: building.x,
                y: building.y,
            },
            size: Size {
                w: building.w,
                h: building.h,
            },
        }));
    }

    for office in doc.offices {
        map.add_office(Office::new(
            office.id,
            Point {
                x: office.x,
                y: office.y,
            },
            Offset {
                dx: office.offset_x,
                dy: office.offset_y,
            },
        ))
        .map_err(|e| ConfigError::Invalid(e.to_string()))?;
    }

    map.set_loot_types(doc.loot_types);
    Ok(map)
}

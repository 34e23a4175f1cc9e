//! Static map data: roads, buildings, delivery offices and the loot-type
//! catalog, plus the per-cell road index used by movement.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::GameError;
use crate::geometry::{Offset, Point, Rectangle, Vec2};

/// Half of the walkable corridor width around a road segment.
pub const ROAD_HALF_WIDTH: f64 = 0.4;

/// Unique map identifier from the world config.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MapId(String);

impl MapId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Walkable box of a road: the segment expanded by `ROAD_HALF_WIDTH` on
/// every side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoadArea {
    pub min: Vec2,
    pub max: Vec2,
}

impl RoadArea {
    pub fn contains(&self, pos: Vec2) -> bool {
        self.min.x <= pos.x && pos.x <= self.max.x && self.min.y <= pos.y && pos.y <= self.max.y
    }
}

/// Axis-aligned road segment between two lattice points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Road {
    start: Point,
    end: Point,
    area: RoadArea,
}

impl Road {
    pub fn horizontal(start: Point, end_x: i32) -> Self {
        Self::new(start, Point { x: end_x, y: start.y })
    }

    pub fn vertical(start: Point, end_y: i32) -> Self {
        Self::new(start, Point { x: start.x, y: end_y })
    }

    fn new(start: Point, end: Point) -> Self {
        let min = Vec2::new(
            f64::from(start.x.min(end.x)) - ROAD_HALF_WIDTH,
            f64::from(start.y.min(end.y)) - ROAD_HALF_WIDTH,
        );
        let max = Vec2::new(
            f64::from(start.x.max(end.x)) + ROAD_HALF_WIDTH,
            f64::from(start.y.max(end.y)) + ROAD_HALF_WIDTH,
        );
        Self {
            start,
            end,
            area: RoadArea { min, max },
        }
    }

    pub fn is_horizontal(&self) -> bool {
        self.start.y == self.end.y
    }

    pub fn is_vertical(&self) -> bool {
        self.start.x == self.end.x
    }

    pub fn start(&self) -> Point {
        self.start
    }

    pub fn end(&self) -> Point {
        self.end
    }

    pub fn area(&self) -> &RoadArea {
        &self.area
    }

    pub fn contains(&self, pos: Vec2) -> bool {
        self.area.contains(pos)
    }
}

/// Purely cosmetic obstacle; never blocks movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Building {
    bounds: Rectangle,
}

impl Building {
    pub fn new(bounds: Rectangle) -> Self {
        Self { bounds }
    }

    pub fn bounds(&self) -> &Rectangle {
        &self.bounds
    }
}

/// Delivery base where carried loot is converted into score.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Office {
    id: String,
    position: Point,
    offset: Offset,
}

impl Office {
    pub fn new(id: impl Into<String>, position: Point, offset: Offset) -> Self {
        Self {
            id: id.into(),
            position,
            offset,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn offset(&self) -> Offset {
        self.offset
    }
}

/// One game level: roads with their cell index, cosmetic buildings,
/// delivery offices and the loot-type catalog.
#[derive(Debug)]
pub struct Map {
    id: MapId,
    name: String,
    dog_speed: f64,
    bag_capacity: usize,
    roads: Vec<Road>,
    buildings: Vec<Building>,
    offices: Vec<Office>,
    office_index: HashMap<String, usize>,
    cell_to_roads: HashMap<Point, Vec<usize>>,
    loot_types: Vec<serde_json::Value>,
}

impl Map {
    pub fn new(id: MapId, name: impl Into<String>, dog_speed: f64, bag_capacity: usize) -> Self {
        Self {
            id,
            name: name.into(),
            dog_speed,
            bag_capacity,
            roads: Vec::new(),
            buildings: Vec::new(),
            offices: Vec::new(),
            office_index: HashMap::new(),
            cell_to_roads: HashMap::new(),
            loot_types: Vec::new(),
        }
    }

    pub fn id(&self) -> &MapId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dog_speed(&self) -> f64 {
        self.dog_speed
    }

    pub fn bag_capacity(&self) -> usize {
        self.bag_capacity
    }

    pub fn roads(&self) -> &[Road] {
        &self.roads
    }

    pub fn buildings(&self) -> &[Building] {
        &self.buildings
    }

    pub fn offices(&self) -> &[Office] {
        &self.offices
    }

    /// Adds a road and indexes every lattice cell the segment covers, so
    /// movement can look up candidate roads in O(1).
    pub fn add_road(&mut self, road: Road) {
        let index = self.roads.len();

        let (start, end) = (road.start(), road.end());
        if road.is_horizontal() {
            for x in start.x.min(end.x)..=start.x.max(end.x) {
                self.cell_to_roads
                    .entry(Point { x, y: start.y })
                    .or_default()
                    .push(index);
            }
        } else {
            for y in start.y.min(end.y)..=start.y.max(end.y) {
                self.cell_to_roads
                    .entry(Point { x: start.x, y })
                    .or_default()
                    .push(index);
            }
        }

        self.roads.push(road);
    }

    pub fn add_building(&mut self, building: Building) {
        self.buildings.push(building);
    }

    /// Office ids must be unique within a map.
    pub fn add_office(&mut self, office: Office) -> Result<(), GameError> {
        if self.office_index.contains_key(office.id()) {
            return Err(GameError::DuplicateOffice(office.id().to_string()));
        }
        self.office_index
            .insert(office.id().to_string(), self.offices.len());
        self.offices.push(office);
        Ok(())
    }

    /// Indices of the roads whose segment covers the given lattice cell.
    pub fn roads_at(&self, cell: Point) -> Option<&[usize]> {
        self.cell_to_roads.get(&cell).map(Vec::as_slice)
    }

    pub fn set_loot_types(&mut self, loot_types: Vec<serde_json::Value>) {
        self.loot_types = loot_types;
    }

    /// Raw loot-type catalog, echoed verbatim by the map API.
    pub fn loot_types(&self) -> &[serde_json::Value] {
        &self.loot_types
    }

    pub fn loot_type_count(&self) -> usize {
        self.loot_types.len()
    }

    /// Score value of a loot type, read at delivery time.
    pub fn loot_value(&self, kind: usize) -> i64 {
        self.loot_types
            .get(kind)
            .and_then(|t| t.get("value"))
            .and_then(serde_json::Value::as_i64)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_map() -> Map {
        Map::new(MapId::new("town"), "Town", 1.0, 3)
    }

    #[test]
    fn walkable_area_extends_half_width_past_the_segment() {
        let road = Road::horizontal(Point { x: 0, y: 0 }, 5);
        assert!(road.is_horizontal());
        assert_eq!(road.area().min, Vec2::new(-0.4, -0.4));
        assert_eq!(road.area().max, Vec2::new(5.4, 0.4));
        assert!(road.contains(Vec2::new(5.4, 0.4)));
        assert!(!road.contains(Vec2::new(5.5, 0.0)));
    }

    #[test]
    fn reversed_roads_normalize_their_area() {
        let road = Road::vertical(Point { x: 2, y: 7 }, 3);
        assert!(road.is_vertical());
        assert_eq!(road.area().min, Vec2::new(1.6, 2.6));
        assert_eq!(road.area().max, Vec2::new(2.4, 7.4));
    }

    #[test]
    fn every_covered_cell_is_indexed() {
        let mut map = test_map();
        map.add_road(Road::horizontal(Point { x: 0, y: 0 }, 3));
        map.add_road(Road::vertical(Point { x: 3, y: 0 }, 2));

        for x in 0..=3 {
            assert!(map.roads_at(Point { x, y: 0 }).is_some(), "cell ({x}, 0)");
        }
        // The corner cell belongs to both roads.
        assert_eq!(map.roads_at(Point { x: 3, y: 0 }), Some(&[0, 1][..]));
        assert_eq!(map.roads_at(Point { x: 4, y: 0 }), None);
    }

    #[test]
    fn duplicate_office_is_rejected() {
        let mut map = test_map();
        let office = Office::new("o1", Point { x: 0, y: 0 }, Offset { dx: 1, dy: 1 });
        map.add_office(office.clone()).unwrap();
        assert_eq!(
            map.add_office(office),
            Err(GameError::DuplicateOffice("o1".to_string()))
        );
        assert_eq!(map.offices().len(), 1);
    }

    #[test]
    fn loot_value_reads_the_catalog() {
        let mut map = test_map();
        map.set_loot_types(vec![
            json!({"name": "key", "value": 10}),
            json!({"name": "wallet", "value": 30}),
            json!({"name": "unvalued"}),
        ]);
        assert_eq!(map.loot_type_count(), 3);
        assert_eq!(map.loot_value(0), 10);
        assert_eq!(map.loot_value(1), 30);
        assert_eq!(map.loot_value(2), 0);
        assert_eq!(map.loot_value(9), 0);
    }
}

//! Static map data: roads, buildings, offices and per-map game parameters
//!
//! Maps are built once while the configuration is loaded and never change
//! afterwards. The world reads them to constrain movement, to place new dogs
//! and loot, and to know where loot can be handed in.

use rand::seq::SliceRandom;
use rand::Rng;
use shared::{Point, Road, Vec2};
use std::collections::HashSet;

/// Decorative rectangle; takes no part in the simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Building {
    pub position: Point,
    pub width: i32,
    pub height: i32,
}

/// Drop-off point where dogs turn their bag into score
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Office {
    pub id: String,
    pub position: Point,
    /// Drawing offset, only meaningful to clients.
    pub offset: Point,
}

#[derive(Debug, Clone)]
pub struct Map {
    id: String,
    name: String,
    roads: Vec<Road>,
    buildings: Vec<Building>,
    offices: Vec<Office>,
    office_ids: HashSet<String>,
    dog_speed: f64,
    bag_capacity: usize,
    loot_values: Vec<u64>,
}

impl Map {
    pub fn new(id: String, name: String, dog_speed: f64, bag_capacity: usize) -> Self {
        Self {
            id,
            name,
            roads: Vec::new(),
            buildings: Vec::new(),
            offices: Vec::new(),
            office_ids: HashSet::new(),
            dog_speed,
            bag_capacity,
            loot_values: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
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

    pub fn dog_speed(&self) -> f64 {
        self.dog_speed
    }

    pub fn bag_capacity(&self) -> usize {
        self.bag_capacity
    }

    pub fn add_road(&mut self, road: Road) {
        self.roads.push(road);
    }

    pub fn add_building(&mut self, building: Building) {
        self.buildings.push(building);
    }

    /// Adds an office unless one with the same id exists.
    ///
    /// Returns false when the office was rejected as a duplicate.
    pub fn add_office(&mut self, office: Office) -> bool {
        if !self.office_ids.insert(office.id.clone()) {
            return false;
        }
        self.offices.push(office);
        true
    }

    pub fn add_loot_type(&mut self, value: u64) {
        self.loot_values.push(value);
    }

    pub fn loot_type_count(&self) -> u32 {
        self.loot_values.len() as u32
    }

    /// Score value of a loot type, 0 for unknown types
    pub fn loot_value(&self, loot_type: u32) -> u64 {
        self.loot_values
            .get(loot_type as usize)
            .copied()
            .unwrap_or(0)
    }

    /// Where a newly joined dog appears.
    ///
    /// The first road's start, or a random road point when `randomize` is set.
    /// Maps without roads spawn at the origin.
    pub fn spawn_point<R: Rng + ?Sized>(&self, randomize: bool, rng: &mut R) -> Vec2 {
        if randomize {
            if let Some(point) = self.random_road_point(rng) {
                return point;
            }
        }

        self.roads
            .first()
            .map(|road| Vec2::from(road.start()))
            .unwrap_or(Vec2::ZERO)
    }

    /// Uniform integer point inside the bounding box of a random road
    pub fn random_road_point<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Vec2> {
        let road = self.roads.choose(rng)?;
        let (start, end) = road.ordered_ends();

        let x = rng.gen_range(start.x..=end.x);
        let y = rng.gen_range(start.y..=end.y);
        Some(Vec2::from(Point::new(x, y)))
    }
}

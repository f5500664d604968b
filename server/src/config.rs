//! Game configuration loading
//!
//! The configuration file is JSON. Only a missing or unreadable file, invalid
//! JSON, or a missing `maps` array abort loading. Everything else is lenient:
//! malformed scalars fall back to their defaults and malformed map entries are
//! skipped with a warning.

use crate::error::ConfigError;
use crate::map::{Building, Map, Office};
use log::{info, warn};
use serde_json::{Map as JsonObject, Value};
use shared::{Point, Road};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_DOG_SPEED: f64 = 1.0;
pub const DEFAULT_BAG_CAPACITY: usize = 3;
/// Seconds without movement before a dog retires.
pub const DEFAULT_RETIREMENT_SECS: f64 = 10.0;
pub const DEFAULT_LOOT_PERIOD_SECS: f64 = 5.0;
pub const DEFAULT_LOOT_PROBABILITY: f64 = 0.5;

/// Parameters of the loot generator shared by every map
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LootConfig {
    pub period: Duration,
    pub probability: f64,
}

impl Default for LootConfig {
    fn default() -> Self {
        Self {
            period: Duration::from_secs_f64(DEFAULT_LOOT_PERIOD_SECS),
            probability: DEFAULT_LOOT_PROBABILITY,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GameConfig {
    pub default_dog_speed: f64,
    pub default_bag_capacity: usize,
    pub dog_retirement_time: Duration,
    pub loot_config: LootConfig,
    pub maps: Vec<Map>,
}

/// Reads and parses the configuration file at `path`
pub fn load_game_config(path: &Path) -> Result<GameConfig, ConfigError> {
    let text =
        fs::read_to_string(path).map_err(|e| ConfigError::FileRead(path.to_path_buf(), e))?;
    let config = parse_game_config(&text, path)?;

    info!(
        "Loaded {} maps from {}",
        config.maps.len(),
        path.display()
    );
    Ok(config)
}

/// Parses configuration text; `origin` is only used in error messages
pub fn parse_game_config(text: &str, origin: &Path) -> Result<GameConfig, ConfigError> {
    let root: Value =
        serde_json::from_str(text).map_err(|e| ConfigError::Parse(origin.to_path_buf(), e))?;

    let maps_json = root
        .get("maps")
        .and_then(Value::as_array)
        .ok_or_else(|| ConfigError::MissingMaps(origin.to_path_buf()))?;

    let default_dog_speed = read_f64(&root, "defaultDogSpeed", DEFAULT_DOG_SPEED);
    let default_bag_capacity = read_usize(&root, "defaultBagCapacity", DEFAULT_BAG_CAPACITY);
    let retirement_secs = read_f64(&root, "dogRetirementTime", DEFAULT_RETIREMENT_SECS);

    let loot_config = match root.get("lootGeneratorConfig") {
        Some(loot_json) => LootConfig {
            period: seconds(read_f64(loot_json, "period", DEFAULT_LOOT_PERIOD_SECS)),
            probability: read_f64(loot_json, "probability", DEFAULT_LOOT_PROBABILITY)
                .clamp(0.0, 1.0),
        },
        None => {
            warn!("lootGeneratorConfig missing, using defaults");
            LootConfig::default()
        }
    };

    let mut maps = Vec::with_capacity(maps_json.len());
    let mut map_ids = HashSet::new();
    for map_json in maps_json {
        let Some(map) = parse_map(map_json, default_dog_speed, default_bag_capacity) else {
            continue;
        };
        if !map_ids.insert(map.id().to_string()) {
            warn!("Skipping duplicate map id {}", map.id());
            continue;
        }
        maps.push(map);
    }

    Ok(GameConfig {
        default_dog_speed,
        default_bag_capacity,
        dog_retirement_time: seconds(retirement_secs),
        loot_config,
        maps,
    })
}

fn seconds(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
}

fn read_f64(json: &Value, key: &str, default: f64) -> f64 {
    match json.get(key) {
        Some(value) => match value.as_f64() {
            Some(v) if v.is_finite() && v >= 0.0 => v,
            _ => {
                warn!("Invalid {} value {}, using {}", key, value, default);
                default
            }
        },
        None => default,
    }
}

fn read_usize(json: &Value, key: &str, default: usize) -> usize {
    match json.get(key) {
        Some(value) => match value.as_u64() {
            Some(v) => v as usize,
            None => {
                warn!("Invalid {} value {}, using {}", key, value, default);
                default
            }
        },
        None => default,
    }
}

fn read_i32(json: &JsonObject<String, Value>, key: &str) -> Option<i32> {
    json.get(key)?.as_i64().and_then(|v| i32::try_from(v).ok())
}

fn parse_map(json: &Value, default_speed: f64, default_capacity: usize) -> Option<Map> {
    let Some(object) = json.as_object() else {
        warn!("Skipping map entry that is not an object");
        return None;
    };
    let Some(id) = object.get("id").and_then(Value::as_str) else {
        warn!("Skipping map without id");
        return None;
    };
    let name = object.get("name").and_then(Value::as_str).unwrap_or(id);

    let mut map = Map::new(
        id.to_string(),
        name.to_string(),
        read_f64(json, "dogSpeed", default_speed),
        read_usize(json, "bagCapacity", default_capacity),
    );

    for road_json in array(object, "roads") {
        match parse_road(road_json) {
            Some(road) => map.add_road(road),
            None => warn!("Skipping malformed road {} on map {}", road_json, id),
        }
    }

    for building_json in array(object, "buildings") {
        match parse_building(building_json) {
            Some(building) => map.add_building(building),
            None => warn!("Skipping malformed building {} on map {}", building_json, id),
        }
    }

    for office_json in array(object, "offices") {
        match parse_office(office_json) {
            Some(office) => {
                let office_id = office.id.clone();
                if !map.add_office(office) {
                    warn!("Skipping duplicate office {} on map {}", office_id, id);
                }
            }
            None => warn!("Skipping malformed office {} on map {}", office_json, id),
        }
    }

    for loot_type in array(object, "lootTypes") {
        let value = loot_type.get("value").and_then(Value::as_u64).unwrap_or(0);
        map.add_loot_type(value);
    }

    Some(map)
}

fn array<'a>(object: &'a JsonObject<String, Value>, key: &str) -> &'a [Value] {
    object
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn parse_road(json: &Value) -> Option<Road> {
    let object = json.as_object()?;
    let start = Point::new(read_i32(object, "x0")?, read_i32(object, "y0")?);

    if let Some(end_x) = read_i32(object, "x1") {
        Some(Road::horizontal(start, end_x))
    } else {
        read_i32(object, "y1").map(|end_y| Road::vertical(start, end_y))
    }
}

fn parse_building(json: &Value) -> Option<Building> {
    let object = json.as_object()?;
    Some(Building {
        position: Point::new(read_i32(object, "x")?, read_i32(object, "y")?),
        width: read_i32(object, "w")?,
        height: read_i32(object, "h")?,
    })
}

fn parse_office(json: &Value) -> Option<Office> {
    let object = json.as_object()?;
    Some(Office {
        id: object.get("id")?.as_str()?.to_string(),
        position: Point::new(read_i32(object, "x")?, read_i32(object, "y")?),
        offset: Point::new(
            read_i32(object, "offsetX").unwrap_or(0),
            read_i32(object, "offsetY").unwrap_or(0),
        ),
    })
}

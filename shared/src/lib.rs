use serde::{Deserialize, Serialize};

pub mod collision;
pub mod geometry;
pub mod loot_gen;

pub use collision::{
    find_gather_events, try_collect_point, CollectionResult, Gatherer, GatheringEvent, Item,
    ItemGathererProvider, VecProvider,
};
pub use geometry::{
    corridor_borders, is_on_any_road, is_on_road, round_coord, segment_intersect, Point, Road,
    Segment, Vec2, ROAD_HALF_WIDTH,
};
pub use loot_gen::LootGenerator;

/// Sweep width of a dog when gathering.
pub const DOG_GATHER_WIDTH: f64 = 0.6;
pub const LOOT_WIDTH: f64 = 0.0;
pub const OFFICE_WIDTH: f64 = 0.0;
/// Upper bound on the page size of a records query.
pub const MAX_RECORDS_PAGE: u32 = 100;
/// Number of hex characters in an auth token.
pub const TOKEN_LENGTH: usize = 32;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum Packet {
    Join {
        map_id: String,
        user_name: String,
    },
    Move {
        token: String,
        /// One of `U`, `D`, `L`, `R` or empty to stop.
        direction: String,
    },
    Tick {
        time_delta: u64,
    },
    State {
        token: String,
    },
    Maps,
    Records {
        start: u32,
        max_items: Option<u32>,
    },

    Joined {
        token: String,
        player_id: u64,
    },
    Ack,
    GameState {
        players: Vec<PlayerView>,
        loot: Vec<LootView>,
    },
    MapList {
        maps: Vec<MapSummary>,
    },
    RecordList {
        records: Vec<RecordView>,
    },
    Rejected {
        code: String,
        message: String,
    },
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PlayerView {
    pub id: u64,
    pub name: String,
    pub position: Vec2,
    pub velocity: Vec2,
    /// Direction code, `U`/`D`/`L`/`R` or empty.
    pub direction: String,
    pub bag: Vec<BagItemView>,
    pub score: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct BagItemView {
    pub id: u64,
    pub loot_type: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct LootView {
    pub id: u64,
    pub loot_type: u32,
    pub position: Vec2,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MapSummary {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RecordView {
    pub name: String,
    pub score: u64,
    /// Seconds spent in game.
    pub play_time: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packet_serialization_join() {
        let packet = Packet::Join {
            map_id: "map1".to_string(),
            user_name: "Rex".to_string(),
        };
        let serialized = bincode::serialize(&packet).unwrap();
        let deserialized: Packet = bincode::deserialize(&serialized).unwrap();

        match deserialized {
            Packet::Join { map_id, user_name } => {
                assert_eq!(map_id, "map1");
                assert_eq!(user_name, "Rex");
            }
            _ => panic!("Wrong packet type after deserialization"),
        }
    }

    #[test]
    fn test_packet_serialization_game_state() {
        let packet = Packet::GameState {
            players: vec![PlayerView {
                id: 3,
                name: "Rex".to_string(),
                position: Vec2::new(1.5, 2.0),
                velocity: Vec2::new(0.0, -1.0),
                direction: "U".to_string(),
                bag: vec![BagItemView { id: 7, loot_type: 1 }],
                score: 42,
            }],
            loot: vec![LootView {
                id: 8,
                loot_type: 0,
                position: Vec2::new(4.0, 0.25),
            }],
        };

        let serialized = bincode::serialize(&packet).unwrap();
        let deserialized: Packet = bincode::deserialize(&serialized).unwrap();

        match deserialized {
            Packet::GameState { players, loot } => {
                assert_eq!(players.len(), 1);
                assert_eq!(players[0].bag[0].id, 7);
                assert_eq!(players[0].position, Vec2::new(1.5, 2.0));
                assert_eq!(loot[0].id, 8);
            }
            _ => panic!("Wrong packet type after deserialization"),
        }
    }

    #[test]
    fn test_packet_serialization_records_default_page() {
        let packet = Packet::Records {
            start: 10,
            max_items: None,
        };
        let serialized = bincode::serialize(&packet).unwrap();
        let deserialized: Packet = bincode::deserialize(&serialized).unwrap();
        assert_eq!(deserialized, packet);
    }

    #[test]
    fn test_rejected_packet_is_small() {
        let packet = Packet::Rejected {
            code: "invalidToken".to_string(),
            message: "Authorization header is missing".to_string(),
        };
        let serialized = bincode::serialize(&packet).unwrap();
        assert!(serialized.len() < 128);
    }
}

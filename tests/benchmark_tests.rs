//! Performance benchmarks for critical game systems

use bincode::{deserialize, serialize};
use server::config::parse_game_config;
use server::records::MemoryRecordSink;
use server::world::{World, WorldSettings};
use shared::{
    find_gather_events, segment_intersect, Gatherer, Item, LootView, Packet, PlayerView, Segment,
    Vec2, VecProvider,
};
use std::path::Path;
use std::time::{Duration, Instant};

const GRID_CONFIG: &str = r#"{
    "dogRetirementTime": 600.0,
    "lootGeneratorConfig": { "period": 1.0, "probability": 0.5 },
    "maps": [
        {
            "id": "grid",
            "name": "Grid",
            "lootTypes": [ { "value": 1 }, { "value": 2 }, { "value": 3 } ],
            "roads": [
                { "x0": 0, "y0": 0, "x1": 100 },
                { "x0": 0, "y0": 50, "x1": 100 },
                { "x0": 0, "y0": 100, "x1": 100 },
                { "x0": 0, "y0": 0, "y1": 100 },
                { "x0": 50, "y0": 0, "y1": 100 },
                { "x0": 100, "y0": 0, "y1": 100 }
            ],
            "offices": [ { "id": "hq", "x": 50, "y": 50, "offsetX": 0, "offsetY": 0 } ]
        }
    ]
}"#;

fn grid_world() -> World {
    let config = parse_game_config(GRID_CONFIG, Path::new("bench.json")).unwrap();
    let settings = WorldSettings {
        randomize_spawn_points: true,
        ..WorldSettings::default()
    };
    World::new(config, settings, Box::new(MemoryRecordSink::new()))
}

/// Benchmarks contact detection with many moving dogs and loot
#[test]
fn benchmark_gather_detection() {
    let mut provider = VecProvider::new();
    for i in 0..100 {
        let y = (i % 10) as f64;
        provider.add_gatherer(Gatherer {
            start: Vec2::new(0.0, y),
            end: Vec2::new(100.0, y),
            width: shared::DOG_GATHER_WIDTH,
            id: i,
        });
    }
    for i in 0..200 {
        provider.add_item(Item {
            position: Vec2::new((i % 100) as f64, (i % 10) as f64 + 0.3),
            width: shared::LOOT_WIDTH,
            id: i,
        });
    }

    let iterations = 100;
    let start = Instant::now();
    let mut events = 0;

    for _ in 0..iterations {
        events = find_gather_events(&provider).len();
    }

    let duration = start.elapsed();
    println!(
        "Gather detection: {} passes over 100x200 in {:?} ({:.2} μs/pass)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    assert!(events > 0);
    assert!(duration.as_millis() < 5000);
}

/// Benchmarks segment intersection used by movement
#[test]
fn benchmark_segment_intersection() {
    let horizontal = Segment::new(Vec2::new(-0.4, -0.4), Vec2::new(100.4, -0.4));
    let iterations = 100_000;
    let start = Instant::now();
    let mut hits = 0;

    for i in 0..iterations {
        let x = (i % 100) as f64;
        let walk = Segment::new(Vec2::new(x, 5.0), Vec2::new(x, -5.0));
        if segment_intersect(&horizontal, &walk).is_some() {
            hits += 1;
        }
    }

    let duration = start.elapsed();
    println!(
        "Segment intersection: {} iterations in {:?} ({:.2} ns/iter)",
        iterations,
        duration,
        duration.as_nanos() as f64 / iterations as f64
    );

    assert_eq!(hits, iterations);
    assert!(duration.as_millis() < 1000);
}

/// Benchmarks full world updates with a crowded session
#[test]
fn benchmark_world_update() {
    let mut world = grid_world();
    let directions = ["U", "D", "L", "R"];

    let tokens: Vec<_> = (0..200)
        .map(|i| world.join("grid", &format!("dog{}", i)).unwrap().token)
        .collect();
    for (i, token) in tokens.iter().enumerate() {
        world
            .move_player(token.as_str(), directions[i % directions.len()])
            .unwrap();
    }

    let iterations = 200;
    let start = Instant::now();

    for _ in 0..iterations {
        world.update(Duration::from_millis(50)).unwrap();
    }

    let duration = start.elapsed();
    println!(
        "World update: {} ticks with 200 dogs in {:?} ({:.2} μs/tick)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    assert_eq!(world.players().len(), 200);
    assert!(duration.as_millis() < 5000);
}

/// Benchmarks encoding of a large state reply
#[test]
fn benchmark_state_serialization() {
    let players: Vec<PlayerView> = (0..32)
        .map(|i| PlayerView {
            id: i,
            name: format!("dog{}", i),
            position: Vec2::new(i as f64, 0.0),
            velocity: Vec2::new(1.0, 0.0),
            direction: "R".to_string(),
            bag: Vec::new(),
            score: i * 10,
        })
        .collect();
    let loot: Vec<LootView> = (0..32)
        .map(|i| LootView {
            id: i,
            loot_type: (i % 3) as u32,
            position: Vec2::new(0.0, i as f64),
        })
        .collect();
    let packet = Packet::GameState { players, loot };

    let iterations = 10_000;
    let start = Instant::now();

    for _ in 0..iterations {
        let data = serialize(&packet).unwrap();
        let _: Packet = deserialize(&data).unwrap();
    }

    let duration = start.elapsed();
    println!(
        "State serialization: {} iterations in {:?} ({:.2} μs/iter)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    assert!(duration.as_millis() < 5000);
}

/// Benchmarks snapshot capture of a populated world
#[test]
fn benchmark_snapshot_capture() {
    let mut world = grid_world();
    for i in 0..100 {
        world.join("grid", &format!("dog{}", i)).unwrap();
    }
    for _ in 0..20 {
        world.update(Duration::from_millis(500)).unwrap();
    }

    let iterations = 100;
    let start = Instant::now();
    let mut dogs = 0;

    for _ in 0..iterations {
        dogs = world.snapshot().dogs.len();
    }

    let duration = start.elapsed();
    println!(
        "Snapshot capture: {} iterations in {:?} ({:.2} μs/iter)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    assert_eq!(dogs, 100);
    assert!(duration.as_millis() < 5000);
}

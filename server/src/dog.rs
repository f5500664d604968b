//! Dogs and the loot they carry

use serde::{Deserialize, Serialize};
use shared::Vec2;
use std::time::Duration;
use uuid::Uuid;

/// Moves after which an unchanged position alone no longer counts as idle.
const EARLY_IDLE_CHECKS: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Direction {
    #[default]
    Up,
    Down,
    Left,
    Right,
    /// Stopped by the player.
    None,
}

impl Direction {
    /// Parses a move command code; unknown codes yield `None` (the option)
    pub fn from_code(code: &str) -> Option<Direction> {
        match code {
            "U" => Some(Direction::Up),
            "D" => Some(Direction::Down),
            "L" => Some(Direction::Left),
            "R" => Some(Direction::Right),
            "" => Some(Direction::None),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Direction::Up => "U",
            Direction::Down => "D",
            Direction::Left => "L",
            Direction::Right => "R",
            Direction::None => "",
        }
    }

    /// Returns the velocity of a dog heading this way at `speed`.
    pub fn velocity(&self, speed: f64) -> Vec2 {
        match self {
            Direction::Up => Vec2::new(0.0, -speed),
            Direction::Down => Vec2::new(0.0, speed),
            Direction::Left => Vec2::new(-speed, 0.0),
            Direction::Right => Vec2::new(speed, 0.0),
            Direction::None => Vec2::ZERO,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Loot {
    pub id: u64,
    pub loot_type: u32,
    pub position: Vec2,
    pub value: u64,
}

#[derive(Debug, Clone)]
pub struct Dog {
    id: u64,
    uuid: Uuid,
    name: String,
    position: Vec2,
    velocity: Vec2,
    direction: Direction,
    score: u64,
    bag: Vec<Loot>,
    idle_checks: u32,
    /// Time spent idle since the dog last moved; `None` while it is active.
    idle_time: Option<Duration>,
    play_time: Duration,
}

impl Dog {
    /// New dog facing up and standing still
    pub fn new(id: u64, name: String, position: Vec2) -> Self {
        Self {
            id,
            uuid: Uuid::new_v4(),
            name,
            position,
            velocity: Vec2::ZERO,
            direction: Direction::Up,
            score: 0,
            bag: Vec::new(),
            idle_checks: 0,
            idle_time: None,
            play_time: Duration::ZERO,
        }
    }

    /// Rebuilds a dog from persisted fields
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        id: u64,
        uuid: Uuid,
        name: String,
        position: Vec2,
        velocity: Vec2,
        direction: Direction,
        score: u64,
        bag: Vec<Loot>,
        play_time: Duration,
    ) -> Self {
        Self {
            id,
            uuid,
            name,
            position,
            velocity,
            direction,
            score,
            bag,
            idle_checks: 0,
            idle_time: None,
            play_time,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn bag(&self) -> &[Loot] {
        &self.bag
    }

    pub fn idle_time(&self) -> Option<Duration> {
        self.idle_time
    }

    /// Whether the dog idled on its last check for at least `threshold`
    pub fn is_retirement_due(&self, threshold: Duration) -> bool {
        matches!(self.idle_time, Some(idle) if idle >= threshold)
    }

    pub fn play_time(&self) -> Duration {
        self.play_time
    }

    /// Sets position, rounded to three decimals.
    pub fn set_position(&mut self, position: Vec2) {
        self.position = position.rounded();
    }

    pub fn set_velocity(&mut self, velocity: Vec2) {
        self.velocity = velocity;
    }

    /// Applies a move command at the given map speed
    pub fn steer(&mut self, direction: Direction, speed: f64) {
        self.direction = direction;
        self.velocity = direction.velocity(speed);
    }

    pub fn is_bag_full(&self, capacity: usize) -> bool {
        self.bag.len() >= capacity
    }

    /// Puts loot into the bag unless it is already at `capacity`.
    ///
    /// Returns the loot back when the bag is full.
    pub fn pick_up(&mut self, loot: Loot, capacity: usize) -> Result<(), Loot> {
        if self.is_bag_full(capacity) {
            return Err(loot);
        }
        self.bag.push(loot);
        Ok(())
    }

    /// Empties the bag into the score and returns the points gained
    pub fn release_bag(&mut self) -> u64 {
        let gained: u64 = self.bag.drain(..).map(|loot| loot.value).sum();
        self.score += gained;
        gained
    }

    pub fn add_play_time(&mut self, time_delta: Duration) {
        self.play_time += time_delta;
    }

    /// Updates the idle timer after a tick and returns whether the dog idled.
    ///
    /// A dog idles when it is stopped, or when it has not moved during one of
    /// its first two checks.
    pub fn track_idle(&mut self, previous: Vec2, time_delta: Duration) -> bool {
        self.idle_checks = self.idle_checks.saturating_add(1);
        let idle = (self.idle_checks <= EARLY_IDLE_CHECKS && previous == self.position)
            || self.direction == Direction::None;

        self.idle_time = if idle {
            Some(self.idle_time.unwrap_or_default() + time_delta)
        } else {
            None
        };
        idle
    }
}

//! # Game World
//!
//! The world owns every piece of mutable game state: one session per map that
//! has ever been joined, the player registry, the entity id allocators and the
//! record sink that receives retired players.
//!
//! ## Update Order
//!
//! Each call to [`World::update`] runs, for every session in id order:
//! 1. Play time bookkeeping for every dog
//! 2. Road-constrained movement
//! 3. Loot pickup and office deposit in the order dogs reached them
//! 4. Idle bookkeeping
//! 5. Loot generation
//!
//! After all sessions, dogs idle for at least the retirement time are retired
//! in dog id order and their records pushed to the sink. Finally the world is
//! persisted: after every update in testing mode (no periodic ticker), or
//! when a save has been requested otherwise.
//!
//! ## Single Writer
//!
//! The world is not synchronized. All mutations go through `&mut self`, and
//! the server drives it from one task so joins, moves, ticks and saves are
//! totally ordered.

use crate::config::{GameConfig, LootConfig};
use crate::dog::{Direction, Dog, Loot};
use crate::error::{GameError, PersistenceError};
use crate::ids::IdAllocator;
use crate::map::Map;
use crate::players::{PlayerRegistry, Token};
use crate::records::{page_size, PlayerRecord, RecordSink};
use crate::session::GameSession;
use crate::snapshot::{DogRepr, LootRepr, PlayerRepr, SessionRepr, WorldSnapshot};
use log::{debug, info, warn};
use shared::{BagItemView, LootGenerator, LootView, MapSummary, PlayerView, Vec2};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::time::Duration;

/// Runtime options chosen on the command line
#[derive(Debug, Clone, Default)]
pub struct WorldSettings {
    /// Period of the automatic ticker; `None` means manual ticks (testing mode).
    pub tick_period: Option<Duration>,
    pub save_period: Option<Duration>,
    pub state_file: Option<PathBuf>,
    pub randomize_spawn_points: bool,
}

/// Result of a successful join
#[derive(Debug, Clone, PartialEq)]
pub struct JoinOutcome {
    pub token: Token,
    pub player_id: u64,
}

/// What happened during one update
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateReport {
    /// Records emitted for dogs retired this update.
    pub retired: Vec<PlayerRecord>,
    pub loot_spawned: u32,
    /// Whether the world was written to the state file.
    pub saved: bool,
}

pub struct World {
    maps: Vec<Map>,
    map_index: HashMap<String, usize>,
    sessions: BTreeMap<u64, GameSession>,
    session_by_map: HashMap<String, u64>,
    players: PlayerRegistry,
    loot_config: LootConfig,
    retirement_time: Duration,
    settings: WorldSettings,
    dog_ids: IdAllocator,
    loot_ids: IdAllocator,
    session_ids: IdAllocator,
    records: Box<dyn RecordSink>,
    save_requested: bool,
    rearm_save: bool,
}

impl World {
    pub fn new(config: GameConfig, settings: WorldSettings, records: Box<dyn RecordSink>) -> Self {
        let mut maps = Vec::with_capacity(config.maps.len());
        let mut map_index = HashMap::new();
        for map in config.maps {
            if map_index.contains_key(map.id()) {
                warn!("Ignoring duplicate map {}", map.id());
                continue;
            }
            map_index.insert(map.id().to_string(), maps.len());
            maps.push(map);
        }

        Self {
            maps,
            map_index,
            sessions: BTreeMap::new(),
            session_by_map: HashMap::new(),
            players: PlayerRegistry::new(),
            loot_config: config.loot_config,
            retirement_time: config.dog_retirement_time,
            settings,
            dog_ids: IdAllocator::starting_at(0),
            loot_ids: IdAllocator::starting_at(0),
            session_ids: IdAllocator::starting_at(1),
            records,
            save_requested: false,
            rearm_save: false,
        }
    }

    pub fn settings(&self) -> &WorldSettings {
        &self.settings
    }

    /// Manual ticks are only accepted without a periodic ticker
    pub fn is_testing_mode(&self) -> bool {
        self.settings.tick_period.is_none()
    }

    pub fn maps(&self) -> &[Map] {
        &self.maps
    }

    pub fn find_map(&self, map_id: &str) -> Option<&Map> {
        self.map_index.get(map_id).map(|&index| &self.maps[index])
    }

    pub fn map_summaries(&self) -> Vec<MapSummary> {
        self.maps
            .iter()
            .map(|map| MapSummary {
                id: map.id().to_string(),
                name: map.name().to_string(),
            })
            .collect()
    }

    pub fn sessions(&self) -> impl Iterator<Item = &GameSession> {
        self.sessions.values()
    }

    pub fn session_for_map(&self, map_id: &str) -> Option<&GameSession> {
        self.session_by_map
            .get(map_id)
            .and_then(|id| self.sessions.get(id))
    }

    pub fn find_dog(&self, dog_id: u64) -> Option<&Dog> {
        self.sessions.values().find_map(|session| session.dog(dog_id))
    }

    /// Finds loot lying in a session or carried in a bag
    pub fn find_loot(&self, loot_id: u64) -> Option<&Loot> {
        self.sessions.values().find_map(|session| {
            session.loot(loot_id).or_else(|| {
                session
                    .dogs()
                    .flat_map(|dog| dog.bag().iter())
                    .find(|loot| loot.id == loot_id)
            })
        })
    }

    pub fn players(&self) -> &PlayerRegistry {
        &self.players
    }

    /// Adds a dog for `user_name` to the map's session, creating the session
    /// on first join.
    pub fn join(&mut self, map_id: &str, user_name: &str) -> Result<JoinOutcome, GameError> {
        if user_name.is_empty() {
            return Err(GameError::InvalidArgument("Invalid name".to_string()));
        }
        let map_index = *self
            .map_index
            .get(map_id)
            .ok_or_else(|| GameError::MapNotFound(map_id.to_string()))?;
        let map = &self.maps[map_index];

        let mut rng = rand::thread_rng();
        let position = map.spawn_point(self.settings.randomize_spawn_points, &mut rng);
        let dog = Dog::new(self.dog_ids.allocate(), user_name.to_string(), position);
        let dog_id = dog.id();

        let session_id = *self
            .session_by_map
            .entry(map_id.to_string())
            .or_insert_with(|| self.session_ids.allocate());
        let session = self.sessions.entry(session_id).or_insert_with(|| {
            info!("Opened session {} for map {}", session_id, map_id);
            GameSession::new(session_id, map_id.to_string())
        });
        session.add_dog(dog);

        let player = self.players.add_player(dog_id, session_id, &mut rng);
        info!(
            "{} joined map {} as player {} at ({}, {})",
            user_name, map_id, player.id, position.x, position.y
        );

        Ok(JoinOutcome {
            token: player.token.clone(),
            player_id: player.id,
        })
    }

    /// Steers the caller's dog according to a direction code
    pub fn move_player(&mut self, raw_token: &str, code: &str) -> Result<(), GameError> {
        let player = self.players.authorize(raw_token)?;
        let direction = Direction::from_code(code)
            .ok_or_else(|| GameError::InvalidArgument("Failed to parse action".to_string()))?;
        let (dog_id, session_id) = (player.dog_id, player.session_id);

        let session = self
            .sessions
            .get_mut(&session_id)
            .ok_or(GameError::UnknownToken)?;
        let speed = self
            .map_index
            .get(session.map_id())
            .map(|&index| self.maps[index].dog_speed())
            .unwrap_or(0.0);
        let dog = session.dog_mut(dog_id).ok_or(GameError::UnknownToken)?;

        dog.steer(direction, speed);
        debug!("Dog {} heading {:?}", dog_id, direction);
        Ok(())
    }

    /// Applies a manual tick of `time_delta_ms` milliseconds
    pub fn tick(&mut self, time_delta_ms: u64) -> Result<UpdateReport, GameError> {
        if !self.is_testing_mode() {
            return Err(GameError::TickingDisabled);
        }
        self.update(Duration::from_millis(time_delta_ms))
    }

    /// Advances the whole world by `time_delta`
    pub fn update(&mut self, time_delta: Duration) -> Result<UpdateReport, GameError> {
        let generator = LootGenerator::new(self.loot_config.period, self.loot_config.probability);
        let mut rng = rand::thread_rng();
        let mut report = UpdateReport::default();

        for session in self.sessions.values_mut() {
            let map = match self.map_index.get(session.map_id()) {
                Some(&index) => &self.maps[index],
                None => {
                    warn!("Session {} has no map {}", session.id(), session.map_id());
                    continue;
                }
            };

            session.update(map, time_delta);
            report.loot_spawned +=
                session.spawn_loot(map, &generator, time_delta, &mut self.loot_ids, &mut rng);
        }

        report.retired = self.retire_idle_dogs()?;

        if self.is_testing_mode() {
            report.saved = self.save_state()?;
        } else if self.save_requested {
            self.save_requested = false;
            self.rearm_save = true;
            report.saved = self.save_state()?;
        }

        Ok(report)
    }

    fn retire_idle_dogs(&mut self) -> Result<Vec<PlayerRecord>, GameError> {
        let retirement_time = self.retirement_time;
        let mut retiring: Vec<(u64, u64)> = self
            .sessions
            .values()
            .flat_map(|session| {
                session
                    .dogs()
                    .filter(move |dog| dog.is_retirement_due(retirement_time))
                    .map(move |dog| (dog.id(), session.id()))
            })
            .collect();
        retiring.sort_unstable();

        let mut retired = Vec::with_capacity(retiring.len());
        for (dog_id, session_id) in retiring {
            let session = self
                .sessions
                .get_mut(&session_id)
                .ok_or(GameError::DogNotFound(dog_id))?;
            let dog = session.dog(dog_id).ok_or(GameError::DogNotFound(dog_id))?;

            let record = PlayerRecord {
                uuid: dog.uuid(),
                name: dog.name().to_string(),
                score: dog.score(),
                play_time_ms: dog.play_time().as_millis() as u64,
            };
            self.records.save_record(record.clone())?;

            session.remove_dog(dog_id);
            self.players.remove_by_dog(dog_id);
            info!(
                "Dog {} ({}) retired with score {} after {} ms",
                dog_id, record.name, record.score, record.play_time_ms
            );
            retired.push(record);
        }

        Ok(retired)
    }

    /// Marks the world for saving on the next update
    pub fn request_save(&mut self) {
        self.save_requested = true;
    }

    /// True once after an update consumed a save request
    pub fn take_save_rearm(&mut self) -> bool {
        std::mem::take(&mut self.rearm_save)
    }

    /// Writes the world to the state file, if one is configured
    pub fn save_state(&self) -> Result<bool, PersistenceError> {
        match &self.settings.state_file {
            Some(path) => {
                self.snapshot().save_to(path)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Restores the state file if it exists
    pub fn load_state(&mut self) -> Result<bool, PersistenceError> {
        let Some(path) = self.settings.state_file.clone() else {
            return Ok(false);
        };
        if !path.exists() {
            info!("No state file at {}, starting empty", path.display());
            return Ok(false);
        }

        let snapshot = WorldSnapshot::load_from(&path)?;
        self.restore(snapshot)?;
        Ok(true)
    }

    pub fn snapshot(&self) -> WorldSnapshot {
        let mut snapshot = WorldSnapshot::default();

        for session in self.sessions.values() {
            snapshot
                .loot
                .extend(session.loot_items().map(LootRepr::from));
            for dog in session.dogs() {
                snapshot.loot.extend(dog.bag().iter().map(LootRepr::from));
                snapshot.dogs.push(DogRepr::from(dog));
            }
            snapshot.sessions.push(SessionRepr {
                id: session.id(),
                map_id: session.map_id().to_string(),
                loot: session.loot_items().map(|loot| loot.id).collect(),
                dogs: session.dogs().map(|dog| dog.id()).collect(),
            });
        }

        snapshot.players = self
            .players
            .players()
            .into_iter()
            .map(PlayerRepr::from)
            .collect();
        snapshot
    }

    /// Rebuilds sessions and players from a snapshot.
    ///
    /// The world must not have any sessions yet. On error nothing changes.
    pub fn restore(&mut self, snapshot: WorldSnapshot) -> Result<(), PersistenceError> {
        if !self.sessions.is_empty() || !self.players.is_empty() {
            return Err(PersistenceError::WorldNotEmpty);
        }

        let mut loot_ids = self.loot_ids.clone();
        let mut dog_ids = self.dog_ids.clone();
        let mut session_ids = self.session_ids.clone();

        let mut loot_pool = HashMap::new();
        for repr in &snapshot.loot {
            if loot_pool.insert(repr.id, repr.restore()).is_some() {
                return Err(PersistenceError::DuplicateLoot(repr.id));
            }
            loot_ids.advance_next(repr.id);
        }

        let mut dog_pool = HashMap::new();
        for repr in &snapshot.dogs {
            let dog = repr.restore(|id| loot_pool.remove(&id))?;
            if dog_pool.insert(repr.id, dog).is_some() {
                return Err(PersistenceError::DuplicateDog(repr.id));
            }
            dog_ids.advance_next(repr.id);
        }

        let mut sessions = BTreeMap::new();
        let mut session_by_map = HashMap::new();
        for repr in &snapshot.sessions {
            if !self.map_index.contains_key(&repr.map_id) {
                return Err(PersistenceError::MissingMap(repr.map_id.clone()));
            }
            if session_by_map.contains_key(&repr.map_id) || sessions.contains_key(&repr.id) {
                return Err(PersistenceError::DuplicateSession(repr.map_id.clone()));
            }

            let mut session = GameSession::new(repr.id, repr.map_id.clone());
            for dog_id in &repr.dogs {
                let dog = dog_pool
                    .remove(dog_id)
                    .ok_or(PersistenceError::MissingDog(*dog_id))?;
                session.add_dog(dog);
            }
            for loot_id in &repr.loot {
                let loot = loot_pool
                    .remove(loot_id)
                    .ok_or(PersistenceError::MissingLoot(*loot_id))?;
                session.add_loot(loot);
            }

            session_ids.advance_next(repr.id);
            session_by_map.insert(repr.map_id.clone(), repr.id);
            sessions.insert(repr.id, session);
        }

        let mut players = PlayerRegistry::new();
        for repr in &snapshot.players {
            let player = repr.restore()?;
            let session = sessions
                .get(&player.session_id)
                .ok_or(PersistenceError::MissingSession(player.session_id))?;
            if session.dog(player.dog_id).is_none() {
                return Err(PersistenceError::MissingDog(player.dog_id));
            }
            players.restore_player(player);
        }

        if !dog_pool.is_empty() || !loot_pool.is_empty() {
            warn!(
                "Dropping {} dogs and {} loot not owned by any session",
                dog_pool.len(),
                loot_pool.len()
            );
        }

        info!(
            "Restored {} sessions, {} dogs, {} players",
            sessions.len(),
            snapshot.dogs.len(),
            players.len()
        );

        self.sessions = sessions;
        self.session_by_map = session_by_map;
        self.players = players;
        self.loot_ids = loot_ids;
        self.dog_ids = dog_ids;
        self.session_ids = session_ids;
        Ok(())
    }

    /// Drops a loot item of `loot_type` into the map's session.
    ///
    /// Returns the new loot id, or `None` if nobody has joined the map yet.
    pub fn add_loot(&mut self, map_id: &str, loot_type: u32, position: Vec2) -> Option<u64> {
        let map = self.find_map(map_id)?;
        let value = map.loot_value(loot_type);
        let session_id = *self.session_by_map.get(map_id)?;
        let session = self.sessions.get_mut(&session_id)?;

        let id = self.loot_ids.allocate();
        session.add_loot(Loot {
            id,
            loot_type,
            position,
            value,
        });
        Some(id)
    }

    /// Players and free loot of the caller's session
    pub fn game_state(&self, raw_token: &str) -> Result<(Vec<PlayerView>, Vec<LootView>), GameError> {
        let caller = self.players.authorize(raw_token)?;
        let session = self
            .sessions
            .get(&caller.session_id)
            .ok_or(GameError::UnknownToken)?;

        let players = self
            .players
            .players()
            .into_iter()
            .filter(|player| player.session_id == session.id())
            .filter_map(|player| {
                let dog = session.dog(player.dog_id)?;
                Some(PlayerView {
                    id: player.id,
                    name: dog.name().to_string(),
                    position: dog.position(),
                    velocity: dog.velocity(),
                    direction: dog.direction().code().to_string(),
                    bag: dog
                        .bag()
                        .iter()
                        .map(|loot| BagItemView {
                            id: loot.id,
                            loot_type: loot.loot_type,
                        })
                        .collect(),
                    score: dog.score(),
                })
            })
            .collect();

        let loot = session
            .loot_items()
            .map(|loot| LootView {
                id: loot.id,
                loot_type: loot.loot_type,
                position: loot.position,
            })
            .collect();

        Ok((players, loot))
    }

    /// A page of retirement records
    pub fn records(&self, start: u32, max_items: Option<u32>) -> Result<Vec<PlayerRecord>, GameError> {
        let limit = page_size(max_items)?;
        Ok(self.records.top_records(start, limit)?)
    }
}

//! Flat snapshot records of the world and their file encoding
//!
//! A snapshot lists every loot item (free or carried), every dog, every
//! session and every player as plain records that refer to each other by id.
//! Restoring rebuilds the graph in the order loot, dogs, sessions, players;
//! a reference to anything not yet rebuilt is an error.

use crate::dog::{Direction, Dog, Loot};
use crate::error::PersistenceError;
use crate::players::{Player, Token};
use log::info;
use serde::{Deserialize, Serialize};
use shared::Vec2;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LootRepr {
    pub id: u64,
    pub loot_type: u32,
    pub position: Vec2,
    pub value: u64,
}

impl From<&Loot> for LootRepr {
    fn from(loot: &Loot) -> Self {
        Self {
            id: loot.id,
            loot_type: loot.loot_type,
            position: loot.position,
            value: loot.value,
        }
    }
}

impl LootRepr {
    pub fn restore(&self) -> Loot {
        Loot {
            id: self.id,
            loot_type: self.loot_type,
            position: self.position,
            value: self.value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DogRepr {
    pub id: u64,
    pub uuid: Uuid,
    pub name: String,
    pub position: Vec2,
    pub velocity: Vec2,
    pub direction: Direction,
    pub score: u64,
    /// Ids of the loot in the bag, in pickup order.
    pub bag: Vec<u64>,
    pub play_time_ms: u64,
}

impl From<&Dog> for DogRepr {
    fn from(dog: &Dog) -> Self {
        Self {
            id: dog.id(),
            uuid: dog.uuid(),
            name: dog.name().to_string(),
            position: dog.position(),
            velocity: dog.velocity(),
            direction: dog.direction(),
            score: dog.score(),
            bag: dog.bag().iter().map(|loot| loot.id).collect(),
            play_time_ms: dog.play_time().as_millis() as u64,
        }
    }
}

impl DogRepr {
    /// Rebuilds the dog, resolving bag ids through `take_loot`
    pub fn restore<F>(&self, mut take_loot: F) -> Result<Dog, PersistenceError>
    where
        F: FnMut(u64) -> Option<Loot>,
    {
        let bag = self
            .bag
            .iter()
            .map(|id| take_loot(*id).ok_or(PersistenceError::MissingLoot(*id)))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Dog::restore(
            self.id,
            self.uuid,
            self.name.clone(),
            self.position,
            self.velocity,
            self.direction,
            self.score,
            bag,
            Duration::from_millis(self.play_time_ms),
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRepr {
    pub id: u64,
    pub map_id: String,
    pub loot: Vec<u64>,
    pub dogs: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRepr {
    pub id: u64,
    pub dog_id: u64,
    pub session_id: u64,
    pub token: String,
}

impl From<&Player> for PlayerRepr {
    fn from(player: &Player) -> Self {
        Self {
            id: player.id,
            dog_id: player.dog_id,
            session_id: player.session_id,
            token: player.token.as_str().to_string(),
        }
    }
}

impl PlayerRepr {
    pub fn restore(&self) -> Result<Player, PersistenceError> {
        let token = Token::parse(&self.token).map_err(|_| PersistenceError::BadToken(self.id))?;
        Ok(Player {
            id: self.id,
            dog_id: self.dog_id,
            session_id: self.session_id,
            token,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub loot: Vec<LootRepr>,
    pub dogs: Vec<DogRepr>,
    pub sessions: Vec<SessionRepr>,
    pub players: Vec<PlayerRepr>,
}

impl WorldSnapshot {
    /// Writes the snapshot next to `path` and renames it into place
    pub fn save_to(&self, path: &Path) -> Result<(), PersistenceError> {
        let data = bincode::serialize(self).map_err(PersistenceError::Encode)?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| PersistenceError::FileWrite(parent.to_path_buf(), e))?;
            }
        }

        let temp = temp_path(path);
        fs::write(&temp, data).map_err(|e| PersistenceError::FileWrite(temp.clone(), e))?;
        fs::rename(&temp, path)
            .map_err(|e| PersistenceError::FileRename(temp.clone(), path.to_path_buf(), e))?;

        info!(
            "Saved {} sessions, {} dogs, {} loot to {}",
            self.sessions.len(),
            self.dogs.len(),
            self.loot.len(),
            path.display()
        );
        Ok(())
    }

    pub fn load_from(path: &Path) -> Result<Self, PersistenceError> {
        let data = fs::read(path).map_err(|e| PersistenceError::FileRead(path.to_path_buf(), e))?;
        bincode::deserialize(&data).map_err(|e| PersistenceError::Decode(path.to_path_buf(), e))
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

//! Error types for the game server

use std::{io::Error as IoError, path::PathBuf};
use thiserror::Error;

/// Errors raised while loading the game configuration file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    FileRead(PathBuf, IoError),

    #[error("Failed to parse config file {0}: {1}")]
    Parse(PathBuf, serde_json::Error),

    #[error("Config file {0} has no maps array")]
    MissingMaps(PathBuf),
}

/// Errors raised while writing or restoring a world snapshot
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Failed to read state file {0}: {1}")]
    FileRead(PathBuf, IoError),

    #[error("Failed to write state file {0}: {1}")]
    FileWrite(PathBuf, IoError),

    #[error("Failed to rename state file from {0} to {1}: {2}")]
    FileRename(PathBuf, PathBuf, IoError),

    #[error("Failed to encode snapshot: {0}")]
    Encode(bincode::Error),

    #[error("Failed to decode state file {0}: {1}")]
    Decode(PathBuf, bincode::Error),

    #[error("Snapshot references unknown loot {0}")]
    MissingLoot(u64),

    #[error("Snapshot references unknown dog {0}")]
    MissingDog(u64),

    #[error("Snapshot references unknown session {0}")]
    MissingSession(u64),

    #[error("Snapshot references unknown map {0}")]
    MissingMap(String),

    #[error("Loot {0} appears more than once in snapshot")]
    DuplicateLoot(u64),

    #[error("Dog {0} appears more than once in snapshot")]
    DuplicateDog(u64),

    #[error("Map {0} has more than one session in snapshot")]
    DuplicateSession(String),

    #[error("Snapshot holds malformed token for player {0}")]
    BadToken(u64),

    #[error("Cannot restore into a world that already has sessions")]
    WorldNotEmpty,
}

/// Errors raised by a record sink
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("Failed to read records file {0}: {1}")]
    FileRead(PathBuf, IoError),

    #[error("Failed to write records file {0}: {1}")]
    FileWrite(PathBuf, IoError),

    #[error("Failed to encode records: {0}")]
    Encode(serde_json::Error),

    #[error("Failed to decode records file {0}: {1}")]
    Decode(PathBuf, serde_json::Error),

    #[error("Requested {0} records, at most {1} allowed")]
    LimitExceeded(u32, u32),
}

/// Errors returned by world operations
#[derive(Debug, Error)]
pub enum GameError {
    #[error("Map {0} not found")]
    MapNotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Authorization token is malformed")]
    InvalidToken,

    #[error("Player token has not been found")]
    UnknownToken,

    #[error("Manual ticks are disabled while the periodic ticker runs")]
    TickingDisabled,

    #[error("Dog {0} scheduled for retirement does not exist")]
    DogNotFound(u64),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error(transparent)]
    Records(#[from] RecordError),
}

impl GameError {
    /// Stable code sent to clients in rejections
    pub fn code(&self) -> &'static str {
        match self {
            GameError::MapNotFound(_) => "mapNotFound",
            GameError::InvalidArgument(_) => "invalidArgument",
            GameError::InvalidToken => "invalidToken",
            GameError::UnknownToken => "unknownToken",
            GameError::TickingDisabled => "badRequest",
            GameError::Records(RecordError::LimitExceeded(..)) => "invalidArgument",
            GameError::DogNotFound(_) | GameError::Persistence(_) | GameError::Records(_) => {
                "internalError"
            }
        }
    }

    /// Whether the world can no longer be trusted after this error
    pub fn is_fatal(&self) -> bool {
        matches!(self, GameError::DogNotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_codes() {
        assert_eq!(GameError::MapNotFound("m".into()).code(), "mapNotFound");
        assert_eq!(GameError::InvalidArgument("x".into()).code(), "invalidArgument");
        assert_eq!(GameError::InvalidToken.code(), "invalidToken");
        assert_eq!(GameError::UnknownToken.code(), "unknownToken");
        assert_eq!(GameError::TickingDisabled.code(), "badRequest");
    }

    #[test]
    fn test_record_limit_is_client_error() {
        let err = GameError::from(RecordError::LimitExceeded(101, 100));
        assert_eq!(err.code(), "invalidArgument");
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_only_missing_evictee_is_fatal() {
        assert!(GameError::DogNotFound(3).is_fatal());
        assert!(!GameError::UnknownToken.is_fatal());
        assert!(!GameError::from(PersistenceError::MissingDog(1)).is_fatal());
    }

    #[test]
    fn test_error_messages() {
        let err = PersistenceError::MissingMap("town".to_string());
        assert_eq!(err.to_string(), "Snapshot references unknown map town");

        let err = GameError::from(PersistenceError::MissingLoot(9));
        assert_eq!(err.to_string(), "Snapshot references unknown loot 9");
    }
}

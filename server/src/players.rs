//! Player registry mapping auth tokens to dogs
//!
//! This module handles the server-side bookkeeping of joined players:
//! - Token issuance when a player joins a map
//! - Token validation and lookup for every authorized request
//! - Removal of players whose dog has retired
//!
//! A player owns no simulation state. It only remembers which dog it steers
//! and which session that dog lives in.

use crate::error::GameError;
use crate::ids::IdAllocator;
use log::info;
use rand::Rng;
use shared::TOKEN_LENGTH;
use std::collections::HashMap;
use std::fmt;

/// Opaque auth token of exactly 32 hex characters
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Token(String);

impl Token {
    /// Generates a fresh random token
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let value: u128 = rng.gen();
        Token(format!("{:032x}", value))
    }

    /// Validates the token format
    ///
    /// Returns `InvalidToken` unless the text is exactly 32 hex digits.
    pub fn parse(text: &str) -> Result<Self, GameError> {
        if text.len() != TOKEN_LENGTH || !text.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(GameError::InvalidToken);
        }
        Ok(Token(text.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A joined player and the dog it controls
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    /// Unique player identifier assigned by the registry
    pub id: u64,
    /// Dog steered by this player
    pub dog_id: u64,
    /// Session the dog lives in
    pub session_id: u64,
    /// Token presented by the client on every request
    pub token: Token,
}

/// Manages all joined players and their tokens
///
/// Players are indexed both by id and by token so authorized requests resolve
/// in one lookup. Player ids start at 0 and are never reused.
#[derive(Debug, Default)]
pub struct PlayerRegistry {
    /// Players indexed by their unique ID
    players: HashMap<u64, Player>,
    /// Token to player ID index
    tokens: HashMap<Token, u64>,
    /// Player id source
    ids: IdAllocator,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new player for the dog and issues its token
    pub fn add_player<R: Rng + ?Sized>(&mut self, dog_id: u64, session_id: u64, rng: &mut R) -> &Player {
        let mut token = Token::generate(rng);
        while self.tokens.contains_key(&token) {
            token = Token::generate(rng);
        }

        let id = self.ids.allocate();
        info!("Player {} joined with dog {}", id, dog_id);
        self.insert(Player {
            id,
            dog_id,
            session_id,
            token,
        })
    }

    /// Inserts a player rebuilt from a snapshot, advancing the id watermark
    pub fn restore_player(&mut self, player: Player) -> &Player {
        self.ids.advance_next(player.id);
        self.insert(player)
    }

    fn insert(&mut self, player: Player) -> &Player {
        let id = player.id;
        self.tokens.insert(player.token.clone(), id);
        self.players.entry(id).or_insert(player)
    }

    /// Looks up the player owning a token
    pub fn find_by_token(&self, token: &Token) -> Option<&Player> {
        self.tokens.get(token).and_then(|id| self.players.get(id))
    }

    /// Parses and resolves a raw token in one step
    ///
    /// Returns `InvalidToken` for malformed text and `UnknownToken` when no
    /// player holds it.
    pub fn authorize(&self, raw_token: &str) -> Result<&Player, GameError> {
        let token = Token::parse(raw_token)?;
        self.find_by_token(&token).ok_or(GameError::UnknownToken)
    }

    pub fn find_by_dog(&self, dog_id: u64) -> Option<&Player> {
        self.players.values().find(|p| p.dog_id == dog_id)
    }

    /// Removes the player steering the given dog
    pub fn remove_by_dog(&mut self, dog_id: u64) -> Option<Player> {
        let id = self.find_by_dog(dog_id)?.id;
        let player = self.players.remove(&id)?;
        self.tokens.remove(&player.token);
        info!("Player {} left with dog {}", player.id, dog_id);
        Some(player)
    }

    /// Players ordered by id
    pub fn players(&self) -> Vec<&Player> {
        let mut players: Vec<&Player> = self.players.values().collect();
        players.sort_by_key(|p| p.id);
        players
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

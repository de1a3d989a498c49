//! Matchmaking: waiting queue and the lobby task that pairs players

pub mod queue;
pub mod service;

pub use service::{LobbyError, LobbyHandle, MatchmakingService};

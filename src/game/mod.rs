//! Game simulation modules

pub mod constants;
pub mod r#match;
pub mod physics;
pub mod rules;
pub mod snapshot;
pub mod state;

pub use r#match::{ConnectionId, ConnectionTx, GameMatch, MatchRegistry};
pub use state::{Intent, Side};

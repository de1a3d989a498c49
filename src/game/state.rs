//! Match state and player intents

use serde::{Deserialize, Serialize};

use super::constants::{ARENA_HEIGHT, ARENA_WIDTH, SERVE_DELAY_SECS};

/// Which end of the arena a player defends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn opponent(self) -> Self {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    /// Sign of x-velocity for a ball travelling toward this side
    pub fn direction(self) -> f64 {
        match self {
            Side::Left => -1.0,
            Side::Right => 1.0,
        }
    }

    pub fn random() -> Self {
        if rand::random::<bool>() {
            Side::Left
        } else {
            Side::Right
        }
    }
}

/// Ball kinematics
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ball {
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
}

impl Ball {
    /// Stationary ball at arena center
    pub fn centered() -> Self {
        Self {
            x: ARENA_WIDTH / 2.0,
            y: ARENA_HEIGHT / 2.0,
            vx: 0.0,
            vy: 0.0,
        }
    }

    pub fn speed(&self) -> f64 {
        self.vx.hypot(self.vy)
    }
}

/// Serve state of the ball
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ServePhase {
    /// Ball frozen at center; launches toward `toward` once `countdown` runs out
    Serving { toward: Side, countdown: f64 },
    Rallying,
}

/// Authoritative state of one match.
///
/// Replaced wholesale by [`super::physics::step`] every tick. The match is over
/// exactly when `winner` is set.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchState {
    pub ball: Ball,
    pub left_paddle_y: f64,
    pub right_paddle_y: f64,
    pub score_left: u32,
    pub score_right: u32,
    pub serve: ServePhase,
    pub winner: Option<Side>,
    pub game_time: f64,
    pub last_paddle_hit_time: f64,
}

impl MatchState {
    /// Fresh match with the first serve toward `serve_toward`, or a random side
    pub fn new(serve_toward: Option<Side>) -> Self {
        Self {
            ball: Ball::centered(),
            left_paddle_y: ARENA_HEIGHT / 2.0,
            right_paddle_y: ARENA_HEIGHT / 2.0,
            score_left: 0,
            score_right: 0,
            serve: ServePhase::Serving {
                toward: serve_toward.unwrap_or_else(Side::random),
                countdown: SERVE_DELAY_SECS,
            },
            winner: None,
            game_time: 0.0,
            last_paddle_hit_time: -1.0,
        }
    }

    pub fn is_game_over(&self) -> bool {
        self.winner.is_some()
    }

    pub fn is_serving(&self) -> bool {
        matches!(self.serve, ServePhase::Serving { .. })
    }

    pub fn paddle_y(&self, side: Side) -> f64 {
        match side {
            Side::Left => self.left_paddle_y,
            Side::Right => self.right_paddle_y,
        }
    }
}

/// A side's desired paddle motion for the coming tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Intent {
    /// Directional keys held
    Hold { up: bool, down: bool },
    /// Absolute paddle position (touch / pointer tracking)
    TrackTarget { y: f64 },
}

impl Intent {
    pub const NEUTRAL: Intent = Intent::Hold {
        up: false,
        down: false,
    };

    /// Build from an input payload whose fields may all be absent.
    /// A target, when present, wins over the directional flags.
    pub fn from_parts(up: Option<bool>, down: Option<bool>, target_y: Option<f64>) -> Self {
        match target_y {
            Some(y) if y.is_finite() => Intent::TrackTarget { y },
            _ => Intent::Hold {
                up: up.unwrap_or(false),
                down: down.unwrap_or(false),
            },
        }
    }
}

impl Default for Intent {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

/// Both sides' intents for one tick
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Intents {
    pub left: Intent,
    pub right: Intent,
}

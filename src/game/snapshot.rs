//! Snapshot building for network transmission

use serde::{Deserialize, Serialize};

use super::state::{MatchState, ServePhase, Side};

/// Flat wire form of [`MatchState`], the shape clients render from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStateView {
    pub ball_x: f64,
    pub ball_y: f64,
    pub ball_vx: f64,
    pub ball_vy: f64,
    pub left_paddle_y: f64,
    pub right_paddle_y: f64,
    pub score_left: u32,
    pub score_right: u32,
    pub serving: bool,
    /// +1 toward the right paddle, -1 toward the left; absent while rallying
    pub serve_direction: Option<i8>,
    pub serve_countdown_remaining: f64,
    pub game_over: bool,
    pub winner: Option<Side>,
    pub game_time: f64,
    pub last_paddle_hit_time: f64,
}

impl From<&MatchState> for GameStateView {
    fn from(state: &MatchState) -> Self {
        let (serving, serve_direction, serve_countdown_remaining) = match state.serve {
            ServePhase::Serving { toward, countdown } => {
                let direction = match toward {
                    Side::Left => -1,
                    Side::Right => 1,
                };
                (true, Some(direction), countdown)
            }
            ServePhase::Rallying => (false, None, 0.0),
        };

        Self {
            ball_x: state.ball.x,
            ball_y: state.ball.y,
            ball_vx: state.ball.vx,
            ball_vy: state.ball.vy,
            left_paddle_y: state.left_paddle_y,
            right_paddle_y: state.right_paddle_y,
            score_left: state.score_left,
            score_right: state.score_right,
            serving,
            serve_direction,
            serve_countdown_remaining,
            game_over: state.is_game_over(),
            winner: state.winner,
            game_time: state.game_time,
            last_paddle_hit_time: state.last_paddle_hit_time,
        }
    }
}

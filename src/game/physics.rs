//! Ball and paddle physics
//!
//! [`step`] is a pure function: it takes the current state by reference and
//! returns the next one. Order within a step is paddles, serve countdown, ball
//! integration, walls, paddle contact, goals.

use rand::Rng;

use super::constants::{
    ARENA_WIDTH, BALL_ANGLE_VARIATION, BALL_PADDLE_SEPARATION, BALL_SIZE, BALL_SPEED,
    BALL_SPEED_INCREASE, BOTTOM_WALL, HALF_PADDLE_HEIGHT, LEFT_PADDLE_BACK, LEFT_PADDLE_FRONT,
    PADDLE_HIT_COOLDOWN_SECS, PADDLE_MAX_Y, PADDLE_MIN_Y, PADDLE_SPEED, RIGHT_PADDLE_BACK,
    RIGHT_PADDLE_FRONT, SERVE_DELAY_SECS, TOP_WALL,
};
use super::rules::winner;
use super::state::{Ball, Intent, Intents, MatchState, ServePhase, Side};

/// How ball/paddle contact is detected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CollisionMode {
    /// Overlap test on the post-integration position only. A fast ball can
    /// pass through a paddle between two ticks.
    #[allow(dead_code)]
    Discrete,
    /// Test the segment travelled during the tick against the paddle face.
    #[default]
    Swept,
}

/// A ball/paddle contact found during a step
#[derive(Debug, Clone, Copy, PartialEq)]
struct PaddleContact {
    side: Side,
    /// Ball center height at the moment of contact
    hit_y: f64,
}

impl CollisionMode {
    fn detect(self, before: &Ball, after: &Ball, state: &MatchState) -> Option<PaddleContact> {
        // Only the paddle the ball is heading toward can be hit
        let side = if after.vx < 0.0 {
            Side::Left
        } else if after.vx > 0.0 {
            Side::Right
        } else {
            return None;
        };
        let paddle_y = state.paddle_y(side);

        let hit_y = match self {
            CollisionMode::Discrete => discrete_contact(after, side)?,
            CollisionMode::Swept => swept_contact(before, after, side)?,
        };

        if (hit_y - paddle_y).abs() <= HALF_PADDLE_HEIGHT {
            Some(PaddleContact { side, hit_y })
        } else {
            None
        }
    }
}

/// Height of the ball if it currently overlaps the paddle slab on `side`
fn discrete_contact(ball: &Ball, side: Side) -> Option<f64> {
    let overlaps = match side {
        Side::Left => ball.x - BALL_SIZE <= LEFT_PADDLE_FRONT && ball.x + BALL_SIZE >= LEFT_PADDLE_BACK,
        Side::Right => {
            ball.x + BALL_SIZE >= RIGHT_PADDLE_FRONT && ball.x - BALL_SIZE <= RIGHT_PADDLE_BACK
        }
    };
    overlaps.then_some(ball.y)
}

/// Height of the ball where its leading edge crosses the paddle face on `side`
/// during this tick. A ball whose edge was already past the face when the tick
/// started crossed it earlier and cannot be hit, even if the paddle has since
/// moved over it.
fn swept_contact(before: &Ball, after: &Ball, side: Side) -> Option<f64> {
    // Distances of the leading edge in front of the face, positive = not yet reached
    let (gap_before, gap_after) = match side {
        Side::Left => (
            before.x - BALL_SIZE - LEFT_PADDLE_FRONT,
            after.x - BALL_SIZE - LEFT_PADDLE_FRONT,
        ),
        Side::Right => (
            RIGHT_PADDLE_FRONT - (before.x + BALL_SIZE),
            RIGHT_PADDLE_FRONT - (after.x + BALL_SIZE),
        ),
    };

    if gap_before < 0.0 || gap_after > 0.0 {
        return None;
    }

    let travelled = gap_before - gap_after;
    let t = if travelled > 0.0 {
        gap_before / travelled
    } else {
        0.0
    };

    Some(before.y + (after.y - before.y) * t.clamp(0.0, 1.0))
}

/// Advance `state` by `dt` seconds using the production collision test.
///
/// `serve_angle` replaces the random launch angle; production passes `None`.
pub fn step(state: &MatchState, intents: &Intents, dt: f64, serve_angle: Option<f64>) -> MatchState {
    step_with_mode(state, intents, dt, serve_angle, CollisionMode::Swept)
}

/// [`step`] with an explicit collision test
pub fn step_with_mode(
    state: &MatchState,
    intents: &Intents,
    dt: f64,
    serve_angle: Option<f64>,
    mode: CollisionMode,
) -> MatchState {
    let mut s = state.clone();

    s.game_time += dt;
    s.left_paddle_y = move_paddle(s.left_paddle_y, intents.left, dt);
    s.right_paddle_y = move_paddle(s.right_paddle_y, intents.right, dt);

    if s.is_game_over() {
        return s;
    }

    if let ServePhase::Serving { toward, countdown } = s.serve {
        let countdown = countdown - dt;
        if countdown > 0.0 {
            s.serve = ServePhase::Serving { toward, countdown };
            s.ball = Ball::centered();
            return s;
        }

        let angle = serve_angle.unwrap_or_else(random_serve_angle);
        s.ball = Ball {
            vx: toward.direction() * BALL_SPEED * angle.cos(),
            vy: BALL_SPEED * angle.sin(),
            ..Ball::centered()
        };
        s.serve = ServePhase::Rallying;
    }

    let before = s.ball;
    s.ball.x += s.ball.vx * dt;
    s.ball.y += s.ball.vy * dt;
    reflect_off_walls(&mut s.ball);

    let cooldown_ok = s.game_time - s.last_paddle_hit_time >= PADDLE_HIT_COOLDOWN_SECS;
    if cooldown_ok {
        if let Some(contact) = mode.detect(&before, &s.ball, &s) {
            bounce_off_paddle(&mut s, contact);
            return s;
        }
    }

    if s.ball.x < 0.0 {
        score_goal(&mut s, Side::Right);
    } else if s.ball.x > ARENA_WIDTH {
        score_goal(&mut s, Side::Left);
    }

    s
}

fn move_paddle(y: f64, intent: Intent, dt: f64) -> f64 {
    let moved = match intent {
        Intent::TrackTarget { y: target } if target.is_finite() => target,
        Intent::TrackTarget { .. } => y,
        Intent::Hold { up: true, .. } => y - PADDLE_SPEED * dt,
        Intent::Hold { down: true, .. } => y + PADDLE_SPEED * dt,
        Intent::Hold { .. } => y,
    };
    moved.clamp(PADDLE_MIN_Y, PADDLE_MAX_Y)
}

fn random_serve_angle() -> f64 {
    rand::thread_rng().gen_range(-BALL_ANGLE_VARIATION..=BALL_ANGLE_VARIATION)
}

fn reflect_off_walls(ball: &mut Ball) {
    if ball.y - BALL_SIZE <= TOP_WALL {
        ball.y = TOP_WALL + BALL_SIZE;
        ball.vy = ball.vy.abs();
    }
    if ball.y + BALL_SIZE >= BOTTOM_WALL {
        ball.y = BOTTOM_WALL - BALL_SIZE;
        ball.vy = -ball.vy.abs();
    }
}

fn bounce_off_paddle(s: &mut MatchState, contact: PaddleContact) {
    s.last_paddle_hit_time = s.game_time;

    let paddle_y = s.paddle_y(contact.side);
    let speed = s.ball.speed().max(BALL_SPEED) * BALL_SPEED_INCREASE;
    let offset = ((contact.hit_y - paddle_y) / HALF_PADDLE_HEIGHT).clamp(-1.0, 1.0);
    let angle = offset * BALL_ANGLE_VARIATION;
    let away = contact.side.opponent().direction();

    s.ball.x = match contact.side {
        Side::Left => LEFT_PADDLE_FRONT + BALL_SIZE + BALL_PADDLE_SEPARATION,
        Side::Right => RIGHT_PADDLE_FRONT - BALL_SIZE - BALL_PADDLE_SEPARATION,
    };
    s.ball.y = contact.hit_y;
    s.ball.vx = away * speed * angle.cos();
    s.ball.vy = speed * angle.sin();
}

fn score_goal(s: &mut MatchState, scorer: Side) {
    match scorer {
        Side::Left => s.score_left += 1,
        Side::Right => s.score_right += 1,
    }
    s.ball = Ball::centered();

    if let Some(side) = winner(s.score_left, s.score_right) {
        s.winner = Some(side);
        return;
    }

    s.serve = ServePhase::Serving {
        toward: scorer.opponent(),
        countdown: SERVE_DELAY_SECS,
    };
}

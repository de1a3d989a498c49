//! Arena and gameplay tuning
//!
//! All lengths are arena units, all speeds arena units per second.

/// Arena width
pub const ARENA_WIDTH: f64 = 800.0;
/// Arena height
pub const ARENA_HEIGHT: f64 = 600.0;

pub const PADDLE_WIDTH: f64 = 20.0;
pub const PADDLE_HEIGHT: f64 = 100.0;
/// Distance from the arena edge to each paddle's center line
pub const PADDLE_PADDING: f64 = 40.0;
pub const PADDLE_SPEED: f64 = 600.0;
/// Paddle centers are kept within `[margin, height - margin]`
pub const PADDLE_CLAMP_MARGIN: f64 = 70.0;

/// Ball radius
pub const BALL_SIZE: f64 = 16.0;
/// Launch speed, and the floor applied before every paddle speed-up
pub const BALL_SPEED: f64 = 500.0;
pub const BALL_SPEED_INCREASE: f64 = 1.1;
/// Max deflection off a paddle, and max random serve angle (radians)
pub const BALL_ANGLE_VARIATION: f64 = 0.3;
/// Gap kept between ball and paddle face after a hit
pub const BALL_PADDLE_SEPARATION: f64 = 2.0;

/// Thickness of the top and bottom walls
pub const WALL_HEIGHT: f64 = 20.0;

pub const PADDLE_HIT_COOLDOWN_SECS: f64 = 0.1;
pub const SERVE_DELAY_SECS: f64 = 0.5;

pub const POINTS_TO_WIN: u32 = 11;

pub const HALF_PADDLE_WIDTH: f64 = PADDLE_WIDTH / 2.0;
pub const HALF_PADDLE_HEIGHT: f64 = PADDLE_HEIGHT / 2.0;
pub const PADDLE_MIN_Y: f64 = PADDLE_CLAMP_MARGIN;
pub const PADDLE_MAX_Y: f64 = ARENA_HEIGHT - PADDLE_CLAMP_MARGIN;

/// Playfield boundaries (inner faces of the walls)
pub const TOP_WALL: f64 = WALL_HEIGHT / 2.0;
pub const BOTTOM_WALL: f64 = ARENA_HEIGHT - WALL_HEIGHT / 2.0;

/// Paddle faces along x
pub const LEFT_PADDLE_FRONT: f64 = PADDLE_PADDING + HALF_PADDLE_WIDTH;
pub const LEFT_PADDLE_BACK: f64 = PADDLE_PADDING - HALF_PADDLE_WIDTH;
pub const RIGHT_PADDLE_FRONT: f64 = ARENA_WIDTH - PADDLE_PADDING - HALF_PADDLE_WIDTH;
pub const RIGHT_PADDLE_BACK: f64 = ARENA_WIDTH - PADDLE_PADDING + HALF_PADDLE_WIDTH;

//! Win condition

use super::constants::POINTS_TO_WIN;
use super::state::Side;

/// Winner for the given scores, if any. Left is checked first, so it also
/// wins the (externally forced) case where both sides reached the threshold.
pub fn winner(score_left: u32, score_right: u32) -> Option<Side> {
    if score_left >= POINTS_TO_WIN {
        Some(Side::Left)
    } else if score_right >= POINTS_TO_WIN {
        Some(Side::Right)
    } else {
        None
    }
}

//! Maps raw progress onto the percentage label and the ring angle.
//!
//! Forward runs show work done. Rollback runs report work done as well, but
//! the display shows work remaining, so the ring unwinds from full to empty.

use crate::model::{Direction, ProgressSample};

/// What the surface shows for one progress sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    pub text: String,
    /// Whole degrees, `0..=360`.
    pub angle: u16,
}

/// Percent of a full turn, truncated to whole degrees.
pub fn angle_for(percentage: u32) -> u16 {
    (percentage.min(100) * 360 / 100) as u16
}

pub fn project(sample: ProgressSample) -> Projection {
    let done = sample.percentage.min(100);
    let shown = match sample.direction {
        Direction::Forward => done,
        Direction::Rollback => 100 - done,
    };
    Projection {
        text: format!("{shown}%"),
        angle: angle_for(shown),
    }
}

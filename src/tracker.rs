use crate::bbox::{BBox, Ltrb};
use crate::frame::GrayImage;

/// Single object appearance tracker owned by exactly one live track.
///
/// Every update returns a quality score: the higher it is, the better the
/// predicted position still matches the learned appearance.
pub trait CorrelationTracker {
    /// Follows the object on `image` using only the learned appearance.
    fn update(&mut self, image: GrayImage<'_>) -> f64;

    /// Moves to `guess` first, then updates on `image` from there.
    fn update_guided(&mut self, image: GrayImage<'_>, guess: &BBox<Ltrb>) -> f64;

    fn position(&self) -> BBox<Ltrb>;
}

/// Creates a tracker seeded at `bbox` on `image`.
pub trait TrackerFactory {
    type Tracker: CorrelationTracker;

    fn start(&self, image: GrayImage<'_>, bbox: &BBox<Ltrb>) -> Self::Tracker;
}

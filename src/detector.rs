use tracing::warn;

use crate::detection::Detection;
use crate::error::Error;
use crate::frame::{Frame, GrayImage};
use crate::track::Track;
use crate::Tracking;

/// Per-frame object detector
pub trait Detector {
    fn detect(&mut self, image: GrayImage<'_>) -> Result<Vec<Detection>, Error>;
}

/// Feeds `(index, image)` frames through `detector` into `tracker` and
/// closes the stream at the end.
///
/// Empty planes are skipped. Detections under the tracker's
/// `min_detection_confidence` never reach it. On error the tracker keeps
/// whatever it finished so far.
pub fn run<'a, I, D, T>(frames: I, detector: &mut D, tracker: &mut T) -> Result<Vec<Track>, Error>
where
    I: IntoIterator<Item = (u32, GrayImage<'a>)>,
    D: Detector + ?Sized,
    T: Tracking + ?Sized,
{
    for (index, image) in frames {
        if image.is_empty() {
            warn!("frame {} is empty, skipping", index);
            continue;
        }

        let min_confidence = tracker.config().min_detection_confidence;
        let mut detections = detector.detect(image)?;
        detections.retain(|d| d.confidence >= min_confidence);

        tracker.update(&Frame::new(index, image, detections))?;
    }

    Ok(tracker.finish())
}

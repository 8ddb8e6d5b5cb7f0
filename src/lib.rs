pub mod bbox;
pub mod config;
pub mod detection;
pub mod detector;
pub mod error;
pub mod frame;
pub mod ncc;
pub mod scene;
pub mod track;
pub mod tracker;

pub use config::TrackerConfig;
pub use detection::Detection;
pub use frame::Frame;
pub use track::Track;

use error::Error;
use scene::Scene;
use tracing::info;
use tracker::TrackerFactory;

pub trait Tracking {
    fn update(&mut self, frame: &Frame<'_>) -> Result<(), Error>;

    /// Thresholds this tracker was built with
    fn config(&self) -> &TrackerConfig;

    /// Tracks finished so far, before end of stream
    fn finished(&self) -> &[Track];

    /// Closes the stream, returning every kept track ordered by start frame
    fn finish(&mut self) -> Vec<Track>;
}

pub struct MultiTracker<F: TrackerFactory> {
    scene: Scene<F>,
    finished: Vec<Track>,
    last_index: Option<u32>,
}

impl<F: TrackerFactory> MultiTracker<F> {
    pub fn new(config: TrackerConfig, factory: F) -> Result<Self, Error> {
        config.validate()?;

        Ok(Self {
            scene: Scene::new(config, factory),
            finished: Vec::new(),
            last_index: None,
        })
    }

    #[inline]
    pub fn scene(&self) -> &Scene<F> {
        &self.scene
    }
}

impl<F: TrackerFactory> crate::Tracking for MultiTracker<F> {
    fn update(&mut self, frame: &Frame<'_>) -> Result<(), Error> {
        let (width, height) = frame.dims();
        if width == 0 || height == 0 {
            return Err(Error::FrameSize { width, height });
        }

        if let Some(previous) = self.last_index {
            if frame.index <= previous {
                return Err(Error::FrameOrder {
                    previous,
                    current: frame.index,
                });
            }
        }

        self.last_index = Some(frame.index);
        let terminated = self.scene.update(frame);
        self.finished.extend(terminated);

        Ok(())
    }

    #[inline]
    fn config(&self) -> &TrackerConfig {
        self.scene.config()
    }

    #[inline]
    fn finished(&self) -> &[Track] {
        &self.finished
    }

    fn finish(&mut self) -> Vec<Track> {
        let mut tracks = std::mem::take(&mut self.finished);
        tracks.extend(self.scene.finish());
        tracks.sort_by_key(|t| (t.start_frame, t.track_id));

        info!(
            "stream closed after frame {:?}: {} tracks kept",
            self.last_index,
            tracks.len()
        );

        tracks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bbox::{BBox, Ltrb};
    use crate::frame::GrayImage;
    use crate::tracker::CorrelationTracker;
    use ndarray::Array2;

    struct Still(BBox<Ltrb>);

    impl CorrelationTracker for Still {
        fn update(&mut self, _image: GrayImage<'_>) -> f64 {
            10.0
        }

        fn update_guided(&mut self, _image: GrayImage<'_>, guess: &BBox<Ltrb>) -> f64 {
            self.0 = *guess;
            10.0
        }

        fn position(&self) -> BBox<Ltrb> {
            self.0
        }
    }

    struct StillFactory;

    impl TrackerFactory for StillFactory {
        type Tracker = Still;

        fn start(&self, _image: GrayImage<'_>, bbox: &BBox<Ltrb>) -> Still {
            Still(*bbox)
        }
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = TrackerConfig {
            min_detection_confidence: -0.1,
            ..Default::default()
        };

        assert!(MultiTracker::new(config, StillFactory).is_err());
    }

    #[test]
    fn test_frame_order_enforced() {
        let image = Array2::<u8>::zeros((10, 10));
        let mut tracker = MultiTracker::new(TrackerConfig::default(), StillFactory).unwrap();

        tracker.update(&Frame::new(3, image.view(), vec![])).unwrap();
        let err = tracker
            .update(&Frame::new(3, image.view(), vec![]))
            .unwrap_err();

        assert!(matches!(
            err,
            Error::FrameOrder {
                previous: 3,
                current: 3
            }
        ));
    }

    #[test]
    fn test_empty_frame_rejected() {
        let image = Array2::<u8>::zeros((0, 10));
        let mut tracker = MultiTracker::new(TrackerConfig::default(), StillFactory).unwrap();

        let err = tracker
            .update(&Frame::new(0, image.view(), vec![]))
            .unwrap_err();
        assert!(matches!(err, Error::FrameSize { width: 10, height: 0 }));
    }

    #[test]
    fn test_finish_orders_by_start_frame() {
        let image = Array2::<u8>::zeros((100, 100));
        let mut tracker = MultiTracker::new(TrackerConfig::default(), StillFactory).unwrap();

        for index in 0..6 {
            let mut dets = vec![];
            if index == 0 {
                dets.push(Detection::ltwh(60, 60, 10, 10, 0.7));
            }
            if index == 1 {
                dets.push(Detection::ltwh(0, 0, 10, 10, 0.8));
            }
            tracker
                .update(&Frame::new(index, image.view(), dets))
                .unwrap();
        }

        let tracks = tracker.finish();
        let starts: Vec<_> = tracks.iter().map(|t| t.start_frame).collect();
        assert_eq!(starts, vec![0, 1]);
        assert!(tracks.iter().all(|t| t.stop_frame == 5));
        assert!(tracker.scene().participants().is_empty());
    }
}

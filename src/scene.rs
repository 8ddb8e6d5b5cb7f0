use std::collections::BTreeMap;

use tracing::{debug, trace};

use crate::bbox::{similarity, BBox, Ltrb};
use crate::config::TrackerConfig;
use crate::frame::Frame;
use crate::track::{Location, Track};
use crate::tracker::{CorrelationTracker, TrackerFactory};
use crate::Detection;

/// View over the elements of a slice still available for claiming
pub struct IndexedSlice<'a, T> {
    pub slice: &'a [T],
    idxs: Vec<usize>,
}

impl<'a, T> IndexedSlice<'a, T> {
    pub fn new(slice: &'a [T]) -> Self {
        Self {
            slice,
            idxs: (0..slice.len()).collect(),
        }
    }

    #[inline]
    pub fn get_index(&self, idx: usize) -> usize {
        self.idxs[idx]
    }

    /// Takes the element at `idx` out of the view, keeping the order of the rest.
    /// Returns its index in the underlying slice.
    #[inline]
    pub fn remove(&mut self, idx: usize) -> usize {
        self.idxs.remove(idx)
    }

    /// Yields `(index in the underlying slice, element)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (usize, &'a T)> + '_ {
        let slice = self.slice;
        self.idxs.iter().map(move |&i| (i, &slice[i]))
    }
}

/// Position (within `dets`) of the detection most similar to `last`.
///
/// A degenerate `last` matches nothing. Candidates below `min_similarity`
/// never qualify; a later candidate must be strictly better to replace the
/// current best, so ties go to the first one.
pub fn find_best_match(
    last: &BBox<Ltrb>,
    dets: &IndexedSlice<'_, Detection>,
    min_similarity: f32,
) -> Option<usize> {
    if last.is_empty() {
        return None;
    }

    let mut best: Option<(usize, f32)> = None;

    for (pos, (_, det)) in dets.iter().enumerate() {
        let score = similarity(last, &det.bbox);

        if score < min_similarity {
            continue;
        }

        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((pos, score)),
        }
    }

    best.map(|(pos, _)| pos)
}

#[derive(Debug)]
pub struct Participant<T> {
    pub id: u32,
    pub tracker: T,
    pub frame_locations: BTreeMap<u32, Location>,
    pub start_frame: u32,
    pub stop_frame: u32,
    pub confidence: f32,
    /// Set when the current frame's update was guided by a detection
    pub updated: bool,
    /// Index into the current frame's detections claimed by this track
    pub matched: Option<usize>,
    pub frames_since_last_detection: u32,
}

impl<T: CorrelationTracker> Participant<T> {
    pub fn new(id: u32, tracker: T, index: u32, det: &Detection) -> Self {
        let mut frame_locations = BTreeMap::new();
        frame_locations.insert(
            index,
            Location {
                bbox: det.bbox,
                confidence: det.confidence,
            },
        );

        Self {
            id,
            tracker,
            frame_locations,
            start_frame: index,
            stop_frame: index,
            confidence: det.confidence,
            updated: false,
            matched: None,
            frames_since_last_detection: 0,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.frame_locations.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frame_locations.is_empty()
    }

    #[inline]
    pub fn last_bbox(&self) -> Option<&BBox<Ltrb>> {
        self.frame_locations.values().next_back().map(|l| &l.bbox)
    }

    pub fn push(&mut self, index: u32, location: Location) {
        self.confidence = self.confidence.max(location.confidence);
        self.stop_frame = index;
        self.frame_locations.insert(index, location);
    }

    fn overlaps(&self, bbox: &BBox<Ltrb>) -> bool {
        self.last_bbox().map_or(false, |last| last.overlaps(bbox))
    }

    pub fn into_track(self) -> Track {
        let stop_frame = self
            .frame_locations
            .keys()
            .next_back()
            .copied()
            .unwrap_or(self.stop_frame);

        Track {
            track_id: self.id,
            start_frame: self.start_frame,
            stop_frame,
            confidence: self.confidence,
            frame_locations: self.frame_locations,
        }
    }
}

/// Owns the live tracks and moves them through their lifecycle frame by frame
pub struct Scene<F: TrackerFactory> {
    config: TrackerConfig,
    factory: F,
    participants: Vec<Participant<F::Tracker>>,
    next_id: u32,
}

impl<F: TrackerFactory> Scene<F> {
    pub fn new(config: TrackerConfig, factory: F) -> Self {
        Self {
            config,
            factory,
            participants: Vec::with_capacity(16),
            next_id: 1,
        }
    }

    #[inline]
    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    #[inline]
    pub fn participants(&self) -> &[Participant<F::Tracker>] {
        &self.participants
    }

    /// Runs one frame: continues or terminates every live track, then seeds
    /// new tracks from detections nobody claimed. Returns the tracks that
    /// terminated on this frame and are long enough to keep.
    pub fn update(&mut self, frame: &Frame<'_>) -> Vec<Track> {
        let (fw, fh) = frame.dims();
        let min_similarity = self.config.min_track_object_similarity;
        let min_correlation = self.config.min_update_correlation;
        let growth = self.config.bbox_growth_rate;

        let mut available = IndexedSlice::new(&frame.detections);
        let mut finished = Vec::new();
        let mut live = Vec::with_capacity(self.participants.len() + frame.detections.len());

        for mut p in std::mem::take(&mut self.participants) {
            p.updated = false;
            p.matched = None;

            let best = p
                .last_bbox()
                .and_then(|last| find_best_match(last, &available, min_similarity));

            let (quality, confidence) = match best {
                Some(pos) => {
                    let idx = available.remove(pos);
                    let det = &frame.detections[idx];
                    let guess = det.bbox.grow(growth).clamp(fw, fh);

                    p.updated = true;
                    p.matched = Some(idx);
                    p.frames_since_last_detection = 0;

                    (p.tracker.update_guided(frame.image, &guess), det.confidence)
                }
                None => {
                    p.frames_since_last_detection += 1;

                    (p.tracker.update(frame.image), 0.0)
                }
            };

            trace!(
                "track {} frame {}: quality {:.3}, guided {}",
                p.id,
                frame.index,
                quality,
                p.updated
            );

            if quality >= min_correlation {
                let bbox = p.tracker.position();
                p.push(frame.index, Location { bbox, confidence });
                live.push(p);
            } else if p.len() > self.config.min_track_length {
                debug!(
                    "track {} terminated at frame {} with {} locations",
                    p.id,
                    frame.index,
                    p.len()
                );
                finished.push(p.into_track());
            } else {
                debug!(
                    "track {} discarded at frame {}: {} locations",
                    p.id,
                    frame.index,
                    p.len()
                );
            }
        }

        for (idx, det) in available.iter() {
            if live.iter().any(|p| p.overlaps(&det.bbox)) {
                trace!(
                    "detection {} on frame {} overlaps a live track",
                    idx,
                    frame.index
                );
                continue;
            }

            let tracker = self.factory.start(frame.image, &det.bbox);
            let id = self.next_id;
            self.next_id += 1;

            debug!("track {} started at frame {}", id, frame.index);
            live.push(Participant::new(id, tracker, frame.index, det));
        }

        self.participants = live;

        finished
    }

    /// Closes every live track at end of stream, keeping the long enough ones.
    pub fn finish(&mut self) -> Vec<Track> {
        let min_len = self.config.min_track_length;

        std::mem::take(&mut self.participants)
            .into_iter()
            .filter(|p| {
                let keep = p.len() > min_len;
                debug!("track {} flushed, kept: {}", p.id, keep);
                keep
            })
            .map(Participant::into_track)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::GrayImage;
    use ndarray::Array2;

    #[derive(Debug)]
    struct Fixed {
        pos: BBox<Ltrb>,
    }

    impl CorrelationTracker for Fixed {
        fn update(&mut self, _image: GrayImage<'_>) -> f64 {
            10.0
        }

        fn update_guided(&mut self, _image: GrayImage<'_>, guess: &BBox<Ltrb>) -> f64 {
            self.pos = *guess;
            10.0
        }

        fn position(&self) -> BBox<Ltrb> {
            self.pos
        }
    }

    struct FixedFactory;

    impl TrackerFactory for FixedFactory {
        type Tracker = Fixed;

        fn start(&self, _image: GrayImage<'_>, bbox: &BBox<Ltrb>) -> Fixed {
            Fixed { pos: *bbox }
        }
    }

    fn det(x: i32, y: i32, w: i32, h: i32) -> Detection {
        Detection::ltwh(x, y, w, h, 0.9)
    }

    #[test]
    fn test_best_match_prefers_highest() {
        let last = BBox::ltwh(10, 10, 20, 20).as_ltrb();
        let dets = [det(14, 14, 20, 20), det(11, 11, 20, 20), det(80, 80, 5, 5)];
        let slice = IndexedSlice::new(&dets);

        assert_eq!(find_best_match(&last, &slice, 0.5), Some(1));
    }

    #[test]
    fn test_best_match_ties_go_first() {
        let last = BBox::ltwh(10, 10, 20, 20).as_ltrb();
        let dets = [det(12, 12, 20, 20), det(8, 8, 20, 20)];
        let slice = IndexedSlice::new(&dets);

        assert_eq!(find_best_match(&last, &slice, 0.5), Some(0));
    }

    #[test]
    fn test_best_match_threshold_inclusive() {
        // 10x20 of a 20x20 footprint
        let last = BBox::ltwh(0, 0, 20, 20).as_ltrb();
        let dets = [det(10, 0, 20, 20)];
        let slice = IndexedSlice::new(&dets);

        assert_eq!(find_best_match(&last, &slice, 0.5), Some(0));
        assert_eq!(find_best_match(&last, &slice, 0.51), None);
    }

    #[test]
    fn test_best_match_skips_claimed() {
        let last = BBox::ltwh(10, 10, 20, 20).as_ltrb();
        let dets = [det(10, 10, 20, 20), det(12, 12, 20, 20)];
        let mut slice = IndexedSlice::new(&dets);

        assert_eq!(slice.remove(0), 0);
        let pos = find_best_match(&last, &slice, 0.5).unwrap();
        assert_eq!(slice.get_index(pos), 1);
    }

    #[test]
    fn test_best_match_degenerate_track() {
        let last = BBox::ltrb(10, 10, 9, 9);
        let dets = [det(0, 0, 50, 50)];
        let slice = IndexedSlice::new(&dets);

        assert_eq!(find_best_match(&last, &slice, 0.0), None);
    }

    #[test]
    fn test_one_detection_one_claimant() {
        let image = Array2::<u8>::zeros((100, 100));
        let mut scene = Scene::new(TrackerConfig::default(), FixedFactory);

        // two tracks far enough apart to both be seeded
        scene.update(&Frame::new(
            0,
            image.view(),
            vec![det(10, 10, 20, 20), det(31, 10, 20, 20)],
        ));
        assert_eq!(scene.participants().len(), 2);

        // the detection covers 100% of the first and 95% of the second track
        scene.update(&Frame::new(1, image.view(), vec![det(10, 10, 40, 20)]));

        let claims: Vec<_> = scene.participants().iter().map(|p| p.matched).collect();
        assert_eq!(claims, vec![Some(0), None]);
        assert!(scene.participants()[0].updated);
        assert_eq!(scene.participants()[1].frames_since_last_detection, 1);
    }

    #[test]
    fn test_ids_are_sequential() {
        let image = Array2::<u8>::zeros((100, 100));
        let mut scene = Scene::new(TrackerConfig::default(), FixedFactory);

        scene.update(&Frame::new(
            0,
            image.view(),
            vec![det(0, 0, 10, 10), det(50, 50, 10, 10)],
        ));

        let ids: Vec<_> = scene.participants().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }
}

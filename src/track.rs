use serde_derive::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::bbox::{BBox, Ltrb};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Location {
    pub bbox: BBox<Ltrb>,
    pub confidence: f32,
}

/// A finished track: frame index -> location, plus the max confidence seen
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Track {
    pub track_id: u32,
    pub start_frame: u32,
    pub stop_frame: u32,
    pub confidence: f32,
    pub frame_locations: BTreeMap<u32, Location>,
}

impl Track {
    #[inline]
    pub fn len(&self) -> usize {
        self.frame_locations.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frame_locations.is_empty()
    }
}

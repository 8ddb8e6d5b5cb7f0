use serde_derive::{Deserialize, Serialize};

use crate::bbox::{BBox, Ltrb};

/// Contains the pixel bbox of an object found on one frame and its confidence in [0, 1]
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub bbox: BBox<Ltrb>,
    #[serde(rename = "p")]
    pub confidence: f32,
}

impl Detection {
    #[inline]
    pub fn new(bbox: BBox<Ltrb>, confidence: f32) -> Self {
        Self { bbox, confidence }
    }

    #[inline]
    pub fn ltwh(left: i32, top: i32, width: i32, height: i32, confidence: f32) -> Self {
        Self::new(BBox::ltwh(left, top, width, height).as_ltrb(), confidence)
    }
}

use ndarray::ArrayView2;

use crate::detection::Detection;

/// Grayscale intensity plane, indexed `[[row, col]]`
pub type GrayImage<'a> = ArrayView2<'a, u8>;

pub struct Frame<'a> {
    pub index: u32,
    pub image: GrayImage<'a>,
    pub detections: Vec<Detection>,
}

impl<'a> Frame<'a> {
    #[inline]
    pub fn new(index: u32, image: GrayImage<'a>, detections: Vec<Detection>) -> Self {
        Self {
            index,
            image,
            detections,
        }
    }

    /// (width, height) in pixels
    #[inline]
    pub fn dims(&self) -> (usize, usize) {
        let (rows, cols) = self.image.dim();
        (cols, rows)
    }
}

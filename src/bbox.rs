use serde_derive::{Deserialize, Serialize};
use std::marker::PhantomData;

pub trait BBoxFormat: std::fmt::Debug {}

/// Left-top-width-height format, contains left top corner and width-height
#[derive(Serialize, Deserialize, Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct Ltwh;
impl BBoxFormat for Ltwh {}

/// Left-top-right-bottom format, contains left top and right bottom corners.
/// Both corners are inclusive pixel coordinates, so a single pixel box has
/// `left == right` and `top == bottom`.
#[derive(Serialize, Deserialize, Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct Ltrb;
impl BBoxFormat for Ltrb {}

#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
#[serde(transparent)]
pub struct BBox<F: BBoxFormat>([i32; 4], #[serde(skip)] PhantomData<F>);

impl<F: BBoxFormat> BBox<F> {
    #[inline]
    pub fn as_slice(&self) -> &[i32; 4] {
        &self.0
    }
}

impl BBox<Ltwh> {
    #[inline]
    pub fn ltwh(left: i32, top: i32, width: i32, height: i32) -> Self {
        BBox([left, top, width, height], PhantomData)
    }

    #[inline(always)]
    pub fn left(&self) -> i32 {
        self.0[0]
    }

    #[inline(always)]
    pub fn top(&self) -> i32 {
        self.0[1]
    }

    #[inline(always)]
    pub fn width(&self) -> i32 {
        self.0[2]
    }

    #[inline(always)]
    pub fn height(&self) -> i32 {
        self.0[3]
    }

    #[inline]
    pub fn as_ltrb(&self) -> BBox<Ltrb> {
        self.into()
    }
}

impl BBox<Ltrb> {
    #[inline]
    pub fn ltrb(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        BBox([left, top, right, bottom], PhantomData)
    }

    /// Rounds sub-pixel corners to the nearest pixel.
    #[inline]
    pub fn rounded(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self::ltrb(
            left.round() as i32,
            top.round() as i32,
            right.round() as i32,
            bottom.round() as i32,
        )
    }

    #[inline]
    pub fn as_ltwh(&self) -> BBox<Ltwh> {
        self.into()
    }

    #[inline(always)]
    pub fn left(&self) -> i32 {
        self.0[0]
    }

    #[inline(always)]
    pub fn top(&self) -> i32 {
        self.0[1]
    }

    #[inline(always)]
    pub fn right(&self) -> i32 {
        self.0[2]
    }

    #[inline(always)]
    pub fn bottom(&self) -> i32 {
        self.0[3]
    }

    #[inline]
    pub fn width(&self) -> i32 {
        span(self.left(), self.right())
    }

    #[inline]
    pub fn height(&self) -> i32 {
        span(self.top(), self.bottom())
    }

    #[inline]
    pub fn area(&self) -> i64 {
        self.width() as i64 * self.height() as i64
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.area() == 0
    }

    #[inline]
    pub fn intersect(&self, other: &BBox<Ltrb>) -> BBox<Ltrb> {
        Self::ltrb(
            self.left().max(other.left()),
            self.top().max(other.top()),
            self.right().min(other.right()),
            self.bottom().min(other.bottom()),
        )
    }

    #[inline]
    pub fn intersection_area(&self, other: &BBox<Ltrb>) -> i64 {
        self.intersect(other).area()
    }

    /// True when the boxes share at least one pixel.
    #[inline]
    pub fn overlaps(&self, other: &BBox<Ltrb>) -> bool {
        self.intersection_area(other) > 0
    }

    /// Expands every edge outward by `floor(dim * rate / 2)` of its axis.
    pub fn grow(&self, rate: f32) -> BBox<Ltrb> {
        let dx = (self.width() as f32 * rate / 2.0).floor() as i32;
        let dy = (self.height() as f32 * rate / 2.0).floor() as i32;

        Self::ltrb(
            self.left().saturating_sub(dx),
            self.top().saturating_sub(dy),
            self.right().saturating_add(dx),
            self.bottom().saturating_add(dy),
        )
    }

    /// Clamps each edge independently into `[0, dim - 1]` of its axis.
    pub fn clamp(&self, frame_width: usize, frame_height: usize) -> BBox<Ltrb> {
        let max_x = (frame_width as i32 - 1).max(0);
        let max_y = (frame_height as i32 - 1).max(0);

        Self::ltrb(
            self.left().clamp(0, max_x),
            self.top().clamp(0, max_y),
            self.right().clamp(0, max_x),
            self.bottom().clamp(0, max_y),
        )
    }
}

impl<'a> From<&'a BBox<Ltwh>> for BBox<Ltrb> {
    #[inline]
    fn from(v: &'a BBox<Ltwh>) -> Self {
        Self(
            [
                v.0[0],
                v.0[1],
                v.0[0].saturating_add(v.0[2].saturating_sub(1)),
                v.0[1].saturating_add(v.0[3].saturating_sub(1)),
            ],
            PhantomData,
        )
    }
}

impl<'a> From<&'a BBox<Ltrb>> for BBox<Ltwh> {
    #[inline]
    fn from(v: &'a BBox<Ltrb>) -> Self {
        Self([v.0[0], v.0[1], v.width(), v.height()], PhantomData)
    }
}

/// Inclusive pixel count between two edges, saturated into `[0, i32::MAX]`
#[inline]
fn span(from: i32, to: i32) -> i32 {
    (to as i64 - from as i64 + 1).clamp(0, i32::MAX as i64) as i32
}

/// Share of `track`'s area covered by `candidate`.
///
/// Deliberately asymmetric: it measures how much of the last known track
/// footprint a candidate recovers. A degenerate `track` yields 0.
pub fn similarity(track: &BBox<Ltrb>, candidate: &BBox<Ltrb>) -> f32 {
    let area = track.area();
    if area <= 0 {
        return 0.0;
    }

    track.intersection_area(candidate) as f32 / area as f32
}

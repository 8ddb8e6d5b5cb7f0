//! Template tracker driven by normalized cross-correlation.
//!
//! The object is resampled into a fixed square template. Each update
//! resamples a padded search window at the same scale, correlates the
//! template against every integer offset and moves to the response peak.
//! The peak-to-sidelobe ratio of the response is reported as quality.

use nalgebra as na;
use ndarray::{s, Array2};
use serde_derive::{Deserialize, Serialize};

use crate::bbox::{BBox, Ltrb};
use crate::frame::GrayImage;
use crate::tracker::{CorrelationTracker, TrackerFactory};

const EPS: f64 = 1e-9;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct NccParams {
    /// Side of the square template in samples
    pub template_size: usize,
    /// Search margin on each side, as a fraction of the template side
    pub search_padding: f32,
    pub learning_rate: f32,
    /// Response cells within this radius of the peak are not sidelobe
    pub sidelobe_exclusion: usize,
}

impl Default for NccParams {
    fn default() -> Self {
        Self {
            template_size: 32,
            search_padding: 0.5,
            learning_rate: 0.125,
            sidelobe_exclusion: 2,
        }
    }
}

impl NccParams {
    #[inline]
    fn radius(&self) -> usize {
        (self.template_size as f32 * self.search_padding.max(0.0)).round() as usize
    }
}

impl TrackerFactory for NccParams {
    type Tracker = NccTracker;

    fn start(&self, image: GrayImage<'_>, bbox: &BBox<Ltrb>) -> NccTracker {
        NccTracker::new(self.clone(), image, bbox)
    }
}

#[derive(Debug, Clone)]
pub struct NccTracker {
    params: NccParams,
    center: na::Point2<f32>,
    size: na::Vector2<f32>,
    template: Array2<f32>,
}

impl NccTracker {
    pub fn new(mut params: NccParams, image: GrayImage<'_>, bbox: &BBox<Ltrb>) -> Self {
        params.template_size = params.template_size.max(4);
        params.learning_rate = params.learning_rate.clamp(0.0, 1.0);

        let mut tracker = Self {
            params,
            center: na::Point2::origin(),
            size: na::Vector2::zeros(),
            template: Array2::zeros((0, 0)),
        };

        tracker.place(bbox);
        tracker.template = normalize(tracker.extract(image, 0));
        tracker
    }

    fn place(&mut self, bbox: &BBox<Ltrb>) {
        self.center = na::Point2::new(
            (bbox.left() + bbox.right()) as f32 / 2.0,
            (bbox.top() + bbox.bottom()) as f32 / 2.0,
        );
        self.size = na::Vector2::new(bbox.width().max(1) as f32, bbox.height().max(1) as f32);
    }

    #[inline]
    fn scale(&self) -> na::Vector2<f32> {
        self.size / self.params.template_size as f32
    }

    /// Samples the current box grown by `margin` template cells per side.
    fn extract(&self, image: GrayImage<'_>, margin: usize) -> Array2<f32> {
        let n = self.params.template_size + 2 * margin;
        let scale = self.scale();
        let origin = self.center - self.size / 2.0 - scale * margin as f32;

        Array2::from_shape_fn((n, n), |(i, j)| {
            sample(
                &image,
                origin.x + (j as f32 + 0.5) * scale.x,
                origin.y + (i as f32 + 0.5) * scale.y,
            )
        })
    }

    fn response(&self, search: &Array2<f32>) -> Array2<f64> {
        let n = self.params.template_size;
        let steps = search.nrows() + 1 - n;
        let count = (n * n) as f64;
        let (sum, sq_sum) = integrals(search);

        Array2::from_shape_fn((steps, steps), |(dy, dx)| {
            let total = box_sum(&sum, dy, dx, n);
            let var = box_sum(&sq_sum, dy, dx, n) - total * total / count;

            if var <= EPS {
                return 0.0;
            }

            let window = search.slice(s![dy..dy + n, dx..dx + n]);
            let dot: f64 = self
                .template
                .iter()
                .zip(window.iter())
                .map(|(&a, &b)| a as f64 * b as f64)
                .sum();

            dot / var.sqrt()
        })
    }

    fn correlate(&mut self, image: GrayImage<'_>) -> f64 {
        let r = self.params.radius();
        let search = self.extract(image, r);
        let response = self.response(&search);

        let mut peak = (0, 0, f64::NEG_INFINITY);
        for ((y, x), &v) in response.indexed_iter() {
            if v > peak.2 {
                peak = (y, x, v);
            }
        }

        let (py, px, _) = peak;
        let quality = peak_to_sidelobe(&response, py, px, self.params.sidelobe_exclusion);

        let shift = na::Vector2::new(px as f32 - r as f32, py as f32 - r as f32)
            .component_mul(&self.scale());
        self.center += shift;

        let fresh = normalize(self.extract(image, 0));
        let lr = self.params.learning_rate;
        let blended = &self.template * (1.0 - lr) + &fresh * lr;
        self.template = normalize(blended);

        quality
    }
}

impl CorrelationTracker for NccTracker {
    #[inline]
    fn update(&mut self, image: GrayImage<'_>) -> f64 {
        self.correlate(image)
    }

    fn update_guided(&mut self, image: GrayImage<'_>, guess: &BBox<Ltrb>) -> f64 {
        self.place(guess);
        self.correlate(image)
    }

    fn position(&self) -> BBox<Ltrb> {
        let half = (self.size - na::Vector2::repeat(1.0)) / 2.0;

        BBox::rounded(
            self.center.x - half.x,
            self.center.y - half.y,
            self.center.x + half.x,
            self.center.y + half.y,
        )
    }
}

/// Bilinear sample at pixel-center coordinates, replicating the border
fn sample(image: &GrayImage<'_>, x: f32, y: f32) -> f32 {
    let (rows, cols) = image.dim();
    if rows == 0 || cols == 0 {
        return 0.0;
    }

    let x = x.clamp(0.0, (cols - 1) as f32);
    let y = y.clamp(0.0, (rows - 1) as f32);
    let (x0, y0) = (x.floor() as usize, y.floor() as usize);
    let (x1, y1) = ((x0 + 1).min(cols - 1), (y0 + 1).min(rows - 1));
    let (fx, fy) = (x - x0 as f32, y - y0 as f32);

    let px = |r: usize, c: usize| image[[r, c]] as f32;
    let top = px(y0, x0) * (1.0 - fx) + px(y0, x1) * fx;
    let bottom = px(y1, x0) * (1.0 - fx) + px(y1, x1) * fx;

    top * (1.0 - fy) + bottom * fy
}

/// Zero mean, unit norm. Flat patches become all zeros.
fn normalize(mut patch: Array2<f32>) -> Array2<f32> {
    let mean = patch.mean().unwrap_or(0.0);
    patch.mapv_inplace(|v| v - mean);

    let norm = patch.iter().map(|&v| v as f64 * v as f64).sum::<f64>().sqrt();
    if norm <= EPS {
        patch.fill(0.0);
    } else {
        patch.mapv_inplace(|v| (v as f64 / norm) as f32);
    }

    patch
}

/// Summed area tables of values and squared values, one row/col larger
fn integrals(patch: &Array2<f32>) -> (Array2<f64>, Array2<f64>) {
    let (rows, cols) = patch.dim();
    let mut sum = Array2::<f64>::zeros((rows + 1, cols + 1));
    let mut sq_sum = Array2::<f64>::zeros((rows + 1, cols + 1));

    for i in 0..rows {
        for j in 0..cols {
            let v = patch[[i, j]] as f64;
            sum[[i + 1, j + 1]] = v + sum[[i, j + 1]] + sum[[i + 1, j]] - sum[[i, j]];
            sq_sum[[i + 1, j + 1]] =
                v * v + sq_sum[[i, j + 1]] + sq_sum[[i + 1, j]] - sq_sum[[i, j]];
        }
    }

    (sum, sq_sum)
}

#[inline]
fn box_sum(table: &Array2<f64>, y: usize, x: usize, n: usize) -> f64 {
    table[[y + n, x + n]] - table[[y, x + n]] - table[[y + n, x]] + table[[y, x]]
}

fn peak_to_sidelobe(response: &Array2<f64>, py: usize, px: usize, exclusion: usize) -> f64 {
    let peak = response[[py, px]];
    let mut count = 0.0;
    let mut sum = 0.0;
    let mut sq_sum = 0.0;

    for ((y, x), &v) in response.indexed_iter() {
        if y.abs_diff(py) <= exclusion && x.abs_diff(px) <= exclusion {
            continue;
        }

        count += 1.0;
        sum += v;
        sq_sum += v * v;
    }

    if count < 1.0 {
        return 0.0;
    }

    let mean = sum / count;
    let std = (sq_sum / count - mean * mean).max(0.0).sqrt();
    if std <= EPS {
        return 0.0;
    }

    (peak - mean) / std
}

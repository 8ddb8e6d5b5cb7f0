#![allow(dead_code)]

use corrtrack::bbox::{BBox, Ltrb};
use corrtrack::frame::GrayImage;
use corrtrack::tracker::{CorrelationTracker, TrackerFactory};
use corrtrack::Detection;
use ndarray::Array2;

/// Tracker whose quality is the value of the frame's top-left pixel.
/// It stays put on blind updates and jumps to the guess on guided ones.
#[derive(Debug)]
pub struct Scripted {
    pub pos: BBox<Ltrb>,
}

impl CorrelationTracker for Scripted {
    fn update(&mut self, image: GrayImage<'_>) -> f64 {
        image[[0, 0]] as f64
    }

    fn update_guided(&mut self, image: GrayImage<'_>, guess: &BBox<Ltrb>) -> f64 {
        self.pos = *guess;
        image[[0, 0]] as f64
    }

    fn position(&self) -> BBox<Ltrb> {
        self.pos
    }
}

pub struct ScriptedFactory;

impl TrackerFactory for ScriptedFactory {
    type Tracker = Scripted;

    fn start(&self, _image: GrayImage<'_>, bbox: &BBox<Ltrb>) -> Scripted {
        Scripted { pos: *bbox }
    }
}

/// Blank `width` x `height` frame reporting `quality` to scripted trackers
pub fn frame(width: usize, height: usize, quality: u8) -> Array2<u8> {
    let mut image = Array2::zeros((height, width));
    image[[0, 0]] = quality;
    image
}

pub fn det(x: i32, y: i32, w: i32, h: i32, confidence: f32) -> Detection {
    Detection::ltwh(x, y, w, h, confidence)
}

pub fn xywh(x: i32, y: i32, w: i32, h: i32) -> BBox<Ltrb> {
    BBox::ltwh(x, y, w, h).as_ltrb()
}

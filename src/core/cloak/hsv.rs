//! 8-bit HSV conversion
//!
//! Hue is stored on a 0..=179 scale (degrees / 2) so it fits a byte; saturation
//! and value use the full 0..=255 range.

use super::frame::Frame;
use once_cell::sync::Lazy;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

pub const HUE_MAX: u8 = 179;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hsv {
    pub h: u8,
    pub s: u8,
    pub v: u8,
}

const HSV_SHIFT: i32 = 12;
const HSV_ROUND: i32 = 1 << (HSV_SHIFT - 1);

struct DivTables {
    sat: [i32; 256],
    hue: [i32; 256],
}

// Fixed-point reciprocals, entry 0 unused.
static DIV_TABLES: Lazy<DivTables> = Lazy::new(|| {
    let mut sat = [0i32; 256];
    let mut hue = [0i32; 256];
    for i in 1..256 {
        sat[i] = ((255 << HSV_SHIFT) as f64 / i as f64).round_ties_even() as i32;
        hue[i] = ((180 << HSV_SHIFT) as f64 / (6.0 * i as f64)).round_ties_even() as i32;
    }
    DivTables { sat, hue }
});

impl Hsv {
    /// Integer conversion, bit-exact with OpenCV's 8-bit `COLOR_BGR2HSV`.
    pub fn from_bgr([b, g, r]: [u8; 3]) -> Self {
        let tables = &*DIV_TABLES;
        let (b, g, r) = (b as i32, g as i32, r as i32);
        let v = b.max(g).max(r);
        let diff = v - b.min(g).min(r);

        let s = (diff * tables.sat[v as usize] + HSV_ROUND) >> HSV_SHIFT;

        let sector = if v == r {
            g - b
        } else if v == g {
            b - r + 2 * diff
        } else {
            r - g + 4 * diff
        };
        let mut h = (sector * tables.hue[diff as usize] + HSV_ROUND) >> HSV_SHIFT;
        if h < 0 {
            h += HUE_MAX as i32 + 1;
        }

        Hsv {
            h: h as u8,
            s: s as u8,
            v: v as u8,
        }
    }
}

/// Inclusive HSV bounds.
///
/// When `hue_low > hue_high` the hue interval wraps through 179 -> 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HsvRange {
    pub hue_low: u8,
    pub hue_high: u8,
    pub sat_low: u8,
    pub sat_high: u8,
    pub val_low: u8,
    pub val_high: u8,
}

impl HsvRange {
    pub fn contains(&self, px: Hsv) -> bool {
        let hue_ok = if self.hue_low <= self.hue_high {
            px.h >= self.hue_low && px.h <= self.hue_high
        } else {
            px.h >= self.hue_low || px.h <= self.hue_high
        };

        hue_ok
            && px.s >= self.sat_low
            && px.s <= self.sat_high
            && px.v >= self.val_low
            && px.v <= self.val_high
    }

    pub fn wraps(&self) -> bool {
        self.hue_low > self.hue_high
    }
}

/// A frame converted to HSV, one triple per pixel.
#[derive(Debug, Clone)]
pub struct HsvFrame {
    width: u32,
    height: u32,
    pixels: Vec<Hsv>,
}

impl HsvFrame {
    pub fn from_frame(frame: &Frame) -> Self {
        let pixels = frame
            .data()
            .par_chunks_exact(3)
            .map(|px| Hsv::from_bgr([px[0], px[1], px[2]]))
            .collect();

        Self {
            width: frame.width(),
            height: frame.height(),
            pixels,
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn pixels(&self) -> &[Hsv] {
        &self.pixels
    }

    pub fn get(&self, x: u32, y: u32) -> Hsv {
        self.pixels[y as usize * self.width as usize + x as usize]
    }
}

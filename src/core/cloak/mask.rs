//! Binary color mask and its morphological cleanup
//!
//! Set pixels are stored as 255, unset as 0, in an `image::GrayImage` so the
//! mask can be inspected with regular image tooling.

use super::hsv::{HsvFrame, HsvRange};
use image::{GrayImage, Luma};
use rayon::prelude::*;

pub const SET: u8 = 255;
pub const UNSET: u8 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Morph {
    Erode,
    Dilate,
}

impl Morph {
    fn identity(self) -> u8 {
        match self {
            Morph::Erode => SET,
            Morph::Dilate => UNSET,
        }
    }

    fn combine(self, acc: u8, v: u8) -> u8 {
        match self {
            Morph::Erode => acc.min(v),
            Morph::Dilate => acc.max(v),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Mask {
    image: GrayImage,
}

impl Mask {
    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            image: GrayImage::new(width, height),
        }
    }

    pub fn full(width: u32, height: u32) -> Self {
        Self {
            image: GrayImage::from_pixel(width, height, Luma([SET])),
        }
    }

    /// 颜色阈值：HSV 三通道均落在闭区间内则置位
    pub fn in_range(hsv: &HsvFrame, range: &HsvRange) -> Self {
        let (width, height) = hsv.dimensions();
        let mut image = GrayImage::new(width, height);

        let out: &mut [u8] = &mut image;
        out.par_iter_mut()
            .zip(hsv.pixels().par_iter())
            .for_each(|(m, px)| {
                *m = if range.contains(*px) { SET } else { UNSET };
            });

        Self { image }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn as_image(&self) -> &GrayImage {
        &self.image
    }

    pub fn as_raw(&self) -> &[u8] {
        self.image.as_raw()
    }

    pub fn is_set(&self, x: u32, y: u32) -> bool {
        self.image.get_pixel(x, y).0[0] != UNSET
    }

    pub fn set(&mut self, x: u32, y: u32, on: bool) {
        self.image
            .put_pixel(x, y, Luma([if on { SET } else { UNSET }]));
    }

    pub fn count_set(&self) -> usize {
        self.image.as_raw().iter().filter(|&&v| v != UNSET).count()
    }

    /// Fraction of set pixels, 0.0 for an empty grid.
    pub fn coverage(&self) -> f32 {
        let total = self.image.as_raw().len();
        if total == 0 {
            return 0.0;
        }
        self.count_set() as f32 / total as f32
    }

    pub fn complement(&self) -> Mask {
        let (width, height) = self.dimensions();
        let mut image = GrayImage::new(width, height);

        let out: &mut [u8] = &mut image;
        out.par_iter_mut()
            .zip(self.image.as_raw().par_iter())
            .for_each(|(dst, &src)| *dst = !src);

        Mask { image }
    }

    /// Shrink set regions: a pixel survives only if every in-bounds pixel of
    /// the `kernel` x `kernel` square around it is set.
    pub fn erode(&self, kernel: u32) -> Mask {
        self.morph(kernel, Morph::Erode)
    }

    /// Grow set regions: a pixel becomes set if any in-bounds pixel of the
    /// `kernel` x `kernel` square around it is set.
    pub fn dilate(&self, kernel: u32) -> Mask {
        self.morph(kernel, Morph::Dilate)
    }

    /// Erosion followed by dilation. Removes specks smaller than the kernel.
    pub fn open(&self, kernel: u32) -> Mask {
        self.erode(kernel).dilate(kernel)
    }

    // Square structuring elements are separable: a row pass then a column pass
    // over the clipped windows gives the same result as the full 2-D window.
    fn morph(&self, kernel: u32, op: Morph) -> Mask {
        let (width, height) = self.dimensions();
        let radius = (kernel / 2) as usize;
        if radius == 0 || width == 0 || height == 0 {
            return self.clone();
        }

        let w = width as usize;
        let h = height as usize;
        let src = self.image.as_raw();
        let identity = op.identity();

        let mut rows = vec![UNSET; w * h];
        rows.par_chunks_exact_mut(w)
            .zip(src.par_chunks_exact(w))
            .for_each(|(dst, line)| {
                for x in 0..w {
                    let lo = x.saturating_sub(radius);
                    let hi = (x + radius).min(w - 1);
                    dst[x] = line[lo..=hi].iter().fold(identity, |acc, &v| op.combine(acc, v));
                }
            });

        let mut image = GrayImage::new(width, height);
        let out: &mut [u8] = &mut image;
        out.par_chunks_exact_mut(w)
            .enumerate()
            .for_each(|(y, dst)| {
                let lo = y.saturating_sub(radius);
                let hi = (y + radius).min(h - 1);
                for (x, cell) in dst.iter_mut().enumerate() {
                    *cell = (lo..=hi).fold(identity, |acc, yy| op.combine(acc, rows[yy * w + x]));
                }
            });

        Mask { image }
    }
}

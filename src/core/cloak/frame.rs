use super::error::CloakError;
use image::{Rgb, RgbImage};
use rayon::prelude::*;
use std::time::Duration;

const CHANNELS: usize = 3;

/// 帧数据结构
///
/// Interleaved 8-bit BGR, row-major, the channel order cameras hand out.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    width: u32,
    height: u32,
    data: Vec<u8>,
    timestamp: Duration,
    frame_number: u64,
}

impl Frame {
    pub fn from_bgr(width: u32, height: u32, data: Vec<u8>) -> Result<Self, CloakError> {
        let expected = width as usize * height as usize * CHANNELS;
        if data.len() != expected {
            return Err(CloakError::InvalidFrame {
                width,
                height,
                expected,
                actual: data.len(),
            });
        }

        Ok(Self {
            width,
            height,
            data,
            timestamp: Duration::ZERO,
            frame_number: 0,
        })
    }

    /// Solid frame, mostly for synthetic sources.
    pub fn filled(width: u32, height: u32, bgr: [u8; 3]) -> Self {
        let data = bgr
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * CHANNELS)
            .collect();
        Self {
            width,
            height,
            data,
            timestamp: Duration::ZERO,
            frame_number: 0,
        }
    }

    pub fn with_sequence(mut self, timestamp_ms: u64, frame_number: u64) -> Self {
        self.timestamp = Duration::from_millis(timestamp_ms);
        self.frame_number = frame_number;
        self
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    pub fn timestamp(&self) -> Duration {
        self.timestamp
    }

    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// BGR triple at (x, y).
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        let idx = (y as usize * self.width as usize + x as usize) * CHANNELS;
        [self.data[idx], self.data[idx + 1], self.data[idx + 2]]
    }

    pub fn put_pixel(&mut self, x: u32, y: u32, bgr: [u8; 3]) {
        let idx = (y as usize * self.width as usize + x as usize) * CHANNELS;
        self.data[idx..idx + CHANNELS].copy_from_slice(&bgr);
    }

    pub(crate) fn row_stride(&self) -> usize {
        self.width as usize * CHANNELS
    }

    /// 水平翻转（镜像）
    pub fn mirror_in_place(&mut self) {
        let width = self.width as usize;
        if width < 2 {
            return;
        }
        let stride = self.row_stride();

        self.data.par_chunks_exact_mut(stride).for_each(|row| {
            for x in 0..width / 2 {
                let left = x * CHANNELS;
                let right = (width - 1 - x) * CHANNELS;
                for c in 0..CHANNELS {
                    row.swap(left + c, right + c);
                }
            }
        });
    }

    pub fn mirrored(&self) -> Frame {
        let mut copy = self.clone();
        copy.mirror_in_place();
        copy
    }

    pub fn from_rgb_image(img: &RgbImage) -> Self {
        let (width, height) = img.dimensions();
        let data = img
            .pixels()
            .flat_map(|Rgb([r, g, b])| [*b, *g, *r])
            .collect();
        Self {
            width,
            height,
            data,
            timestamp: Duration::ZERO,
            frame_number: 0,
        }
    }

    pub fn to_rgb_image(&self) -> RgbImage {
        RgbImage::from_fn(self.width, self.height, |x, y| {
            let [b, g, r] = self.pixel(x, y);
            Rgb([r, g, b])
        })
    }
}

/// 帧元数据（轻量级，用于日志）
#[derive(Debug, Clone, Copy)]
pub struct FrameInfo {
    pub width: u32,
    pub height: u32,
    pub timestamp_ms: u64,
    pub frame_number: u64,
}

impl FrameInfo {
    pub fn from_frame(frame: &Frame) -> Self {
        Self {
            width: frame.width,
            height: frame.height,
            timestamp_ms: frame.timestamp.as_millis() as u64,
            frame_number: frame.frame_number,
        }
    }
}

use super::config::CloakConfig;
use super::error::CloakError;
use super::frame::{Frame, FrameInfo};
use super::hsv::HsvFrame;
use super::mask::Mask;
use log::debug;
use rayon::prelude::*;

/// Result of compositing one live frame.
#[derive(Debug, Clone)]
pub struct Composite {
    pub output: Frame,
    /// Final mask after cleanup; set where the background shows through.
    pub mask: Mask,
}

impl Composite {
    pub fn coverage(&self) -> f32 {
        self.mask.coverage()
    }
}

/// 帧合成器：按颜色把实时帧中的斗篷区域替换为背景
#[derive(Debug, Clone)]
pub struct FrameCompositor {
    background: Frame,
    config: CloakConfig,
}

impl FrameCompositor {
    /// `background` is expected to be mirrored already, as returned by
    /// background capture.
    pub fn new(config: CloakConfig, background: Frame) -> Self {
        Self { background, config }
    }

    pub fn background(&self) -> &Frame {
        &self.background
    }

    pub fn config(&self) -> &CloakConfig {
        &self.config
    }

    /// Mask of pixels matching the target color, after opening and dilation.
    pub fn build_mask(&self, frame: &Frame) -> Mask {
        let hsv = HsvFrame::from_frame(frame);
        let raw = Mask::in_range(&hsv, &self.config.color_range);
        self.refine(raw)
    }

    // Opening runs before dilation.
    fn refine(&self, mut mask: Mask) -> Mask {
        let kernel = self.config.kernel_size;
        for _ in 0..self.config.open_iterations {
            mask = mask.open(kernel);
        }
        for _ in 0..self.config.dilate_iterations {
            mask = mask.dilate(kernel);
        }
        mask
    }

    pub fn composite(&self, live: &Frame) -> Result<Composite, CloakError> {
        if live.dimensions() != self.background.dimensions() {
            return Err(CloakError::DimensionMismatch {
                expected: self.background.dimensions(),
                actual: live.dimensions(),
            });
        }

        let frame = live.mirrored();
        let mask = self.build_mask(&frame);
        let keep = mask.complement();
        let output = Self::blend(&self.background, &mask, &frame, &keep)?;

        debug!(
            "🧥 composited {:?}, coverage {:.3}",
            FrameInfo::from_frame(live),
            mask.coverage()
        );

        Ok(Composite { output, mask })
    }

    // Background where `mask` is set plus live pixels where `keep` is set. The
    // two masks are disjoint, so the saturating add never mixes colors.
    fn blend(background: &Frame, mask: &Mask, live: &Frame, keep: &Mask) -> Result<Frame, CloakError> {
        let (width, height) = live.dimensions();
        let stride = live.row_stride();
        if stride == 0 || height == 0 {
            return Frame::from_bgr(width, height, Vec::new());
        }

        let mut data = vec![0u8; live.data().len()];
        let mask_rows = mask.as_raw().par_chunks_exact(width as usize);
        let keep_rows = keep.as_raw().par_chunks_exact(width as usize);

        data.par_chunks_exact_mut(stride)
            .zip(background.data().par_chunks_exact(stride))
            .zip(live.data().par_chunks_exact(stride))
            .zip(mask_rows.zip(keep_rows))
            .for_each(|(((out, bg), fg), (m, k))| {
                for x in 0..width as usize {
                    for c in 0..3 {
                        let i = x * 3 + c;
                        let from_bg = bg[i] & m[x];
                        let from_fg = fg[i] & k[x];
                        out[i] = from_bg.saturating_add(from_fg);
                    }
                }
            });

        Frame::from_bgr(width, height, data)
            .map(|f| f.with_sequence(live.timestamp().as_millis() as u64, live.frame_number()))
    }
}

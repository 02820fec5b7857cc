//! 隐身斗篷入口

use crate::core::cloak::{
    capture_background, CloakConfig, CloakError, Composite, Display, Frame, FrameCompositor,
    Session, SessionReport, StopReason, VideoDevice,
};
use image::RgbImage;
use log::{debug, error, info};
use std::thread;

/// Invisible cloak effect bound to one video device.
///
/// ```no_run
/// # #[cfg(feature = "opencv")]
/// # fn demo() -> Result<(), invisible_cloak::core::cloak::CloakError> {
/// use invisible_cloak::api::cloak::InvisibleCloak;
/// use invisible_cloak::core::cloak::{CloakConfig, HighGuiDisplay, OpenCvDevice};
///
/// let mut cloak = InvisibleCloak::create(OpenCvDevice, CloakConfig::default())?;
/// let report = cloak.run(HighGuiDisplay::new())?;
/// println!("{} frames", report.frames_composited);
/// # Ok(())
/// # }
/// ```
pub struct InvisibleCloak<V: VideoDevice> {
    device: V,
    config: CloakConfig,
    compositor: Option<FrameCompositor>,
}

impl<V: VideoDevice> InvisibleCloak<V> {
    pub fn create(device: V, config: CloakConfig) -> Result<Self, CloakError> {
        config.validate()?;
        info!(
            "🧥 InvisibleCloak: created for camera {} (hue {}..={})",
            config.camera_index, config.color_range.hue_low, config.color_range.hue_high
        );
        Ok(Self {
            device,
            config,
            compositor: None,
        })
    }

    pub fn config(&self) -> &CloakConfig {
        &self.config
    }

    /// Capture (or re-capture) the reference background.
    pub fn capture_background(&mut self) -> Result<&Frame, CloakError> {
        let background = capture_background(&self.device, &self.config)?;
        let compositor = self
            .compositor
            .insert(FrameCompositor::new(self.config.clone(), background));
        Ok(compositor.background())
    }

    /// Use an already mirrored frame as the background.
    pub fn use_background(&mut self, background: Frame) {
        debug!(
            "Background set externally ({}x{})",
            background.width(),
            background.height()
        );
        self.compositor = Some(FrameCompositor::new(self.config.clone(), background));
    }

    pub fn background(&self) -> Option<&Frame> {
        self.compositor.as_ref().map(|c| c.background())
    }

    pub fn composite(&self, live: &Frame) -> Result<Composite, CloakError> {
        self.compositor
            .as_ref()
            .ok_or(CloakError::NoBackground)?
            .composite(live)
    }

    /// Same as [`composite`](Self::composite) for callers holding RGB images.
    pub fn composite_rgb(&self, live: &RgbImage) -> Result<RgbImage, CloakError> {
        let composite = self.composite(&Frame::from_rgb_image(live))?;
        Ok(composite.output.to_rgb_image())
    }

    /// Capture the background if needed, then run the live loop on a freshly
    /// opened source until it is cancelled or the camera stops delivering.
    pub fn run<D: Display>(&mut self, display: D) -> Result<SessionReport, CloakError> {
        if self.compositor.is_none() {
            self.capture_background()?;
        }
        let compositor = self.compositor.clone().ok_or(CloakError::NoBackground)?;

        info!("📷 Opening camera {} for live feed", self.config.camera_index);
        let source = match self.device.open(self.config.camera_index) {
            Ok(source) => source,
            Err(e) => {
                error!("❌ Live feed unavailable: {}", e);
                return Ok(SessionReport {
                    reason: StopReason::FrameReadFailed,
                    frames_composited: 0,
                    mean_coverage: 0.0,
                });
            }
        };
        if !self.config.warmup().is_zero() {
            thread::sleep(self.config.warmup());
        }

        Session::new(compositor, source, display).run()
    }
}

impl<V: VideoDevice> Drop for InvisibleCloak<V> {
    fn drop(&mut self) {
        info!("🗑️ InvisibleCloak: released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cloak::{RecordingDisplay, ScriptedDevice, ScriptedSource};
    use image::Rgb;

    const BLUE: [u8; 3] = [200, 43, 43];
    const GRAY: [u8; 3] = [128, 128, 128];

    fn fast_config() -> CloakConfig {
        CloakConfig {
            warmup_ms: 0,
            retry_delay_ms: 0,
            ..Default::default()
        }
    }

    #[test]
    fn test_create_rejects_invalid_config() {
        let config = CloakConfig {
            kernel_size: 2,
            ..fast_config()
        };
        assert!(InvisibleCloak::create(ScriptedDevice::new(Vec::new()), config).is_err());
    }

    #[test]
    fn test_composite_without_background() {
        let cloak = InvisibleCloak::create(ScriptedDevice::new(Vec::new()), fast_config()).unwrap();
        let err = cloak.composite(&Frame::filled(4, 4, GRAY)).unwrap_err();
        assert!(matches!(err, CloakError::NoBackground));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_full_run_uses_two_sources() {
        let background = Frame::filled(16, 16, GRAY);
        let device = ScriptedDevice::new(vec![
            None,
            Some(background.clone()),
            Some(Frame::filled(16, 16, BLUE)),
            Some(Frame::filled(16, 16, BLUE)),
        ]);
        let display = RecordingDisplay::new(vec![None, Some(' ')]);
        let log = display.log();

        let mut cloak = InvisibleCloak::create(device.clone(), fast_config()).unwrap();
        let report = cloak.run(display).unwrap();

        assert_eq!(report.reason, StopReason::Cancelled);
        assert_eq!(report.frames_composited, 2);
        assert_eq!(device.opened(), 2);
        assert_eq!(device.released(), 2);
        assert!(log.is_closed());
        for shown in log.shown() {
            assert_eq!(shown.data(), background.data());
        }
    }

    #[test]
    fn test_run_aborts_when_background_fails() {
        let device = ScriptedDevice::new(Vec::new());
        let display = RecordingDisplay::new(Vec::new());
        let log = display.log();

        let mut cloak = InvisibleCloak::create(device.clone(), fast_config()).unwrap();
        let err = cloak.run(display).unwrap_err();

        assert!(matches!(err, CloakError::CaptureInit { attempts: 30 }));
        assert_eq!(device.opened(), 1);
        assert_eq!(device.released(), 1);
        assert_eq!(log.shown_count(), 0);
        assert!(log.is_closed());
    }

    #[test]
    fn test_composite_rgb_replaces_blue() {
        let mut cloak =
            InvisibleCloak::create(ScriptedDevice::new(Vec::new()), fast_config()).unwrap();
        cloak.use_background(Frame::filled(6, 6, [0, 255, 0]));

        // RGB blue, matching BGR [200, 43, 43].
        let live = RgbImage::from_pixel(6, 6, Rgb([43, 43, 200]));
        let out = cloak.composite_rgb(&live).unwrap();
        assert!(out.pixels().all(|p| *p == Rgb([0, 255, 0])));
    }

    #[test]
    fn test_recapture_replaces_background() {
        let device = ScriptedDevice::new(vec![
            Some(Frame::filled(4, 4, GRAY)),
            Some(Frame::filled(4, 4, [10, 10, 10])),
        ]);
        let mut cloak = InvisibleCloak::create(device.clone(), fast_config()).unwrap();

        assert_eq!(cloak.capture_background().unwrap().pixel(0, 0), GRAY);
        assert_eq!(cloak.capture_background().unwrap().pixel(0, 0), [10, 10, 10]);
        assert_eq!(device.released(), 2);
    }

    /// Opens fine once for the background, then refuses.
    struct OneShotDevice {
        inner: ScriptedDevice,
        opens: std::cell::Cell<u32>,
    }

    impl VideoDevice for OneShotDevice {
        type Source = ScriptedSource;

        fn open(&self, index: i32) -> Result<ScriptedSource, CloakError> {
            let n = self.opens.get();
            self.opens.set(n + 1);
            if n == 0 {
                self.inner.open(index)
            } else {
                Err(CloakError::Device(format!("camera {} unavailable", index)))
            }
        }
    }

    #[test]
    fn test_unavailable_camera_exits_as_capture_failure() {
        let display = RecordingDisplay::new(Vec::new());
        let mut cloak =
            InvisibleCloak::create(ScriptedDevice::unavailable(), fast_config()).unwrap();

        let err = cloak.run(display).unwrap_err();
        assert!(matches!(err, CloakError::CaptureInit { .. }));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_live_open_failure_ends_session() {
        let inner = ScriptedDevice::new(vec![Some(Frame::filled(4, 4, GRAY))]);
        let device = OneShotDevice {
            inner: inner.clone(),
            opens: std::cell::Cell::new(0),
        };
        let display = RecordingDisplay::new(Vec::new());
        let log = display.log();

        let mut cloak = InvisibleCloak::create(device, fast_config()).unwrap();
        let report = cloak.run(display).unwrap();

        assert_eq!(report.reason, StopReason::FrameReadFailed);
        assert_eq!(report.frames_composited, 0);
        assert_eq!(report.exit_code(), 1);
        assert_eq!(inner.released(), 1);
        assert!(log.is_closed());
    }
}

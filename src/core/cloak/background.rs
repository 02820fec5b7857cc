use super::config::CloakConfig;
use super::error::CloakError;
use super::frame::Frame;
use super::source::{FrameSource, VideoDevice};
use log::{debug, error, info, warn};
use std::thread;

/// Capture the reference background from its own, short-lived source.
///
/// Reads until the first frame arrives, up to `background_attempts` times,
/// pausing `retry_delay_ms` after each miss. The returned frame is mirrored.
/// The source is released before returning, on success and on failure.
pub fn capture_background<D: VideoDevice>(
    device: &D,
    config: &CloakConfig,
) -> Result<Frame, CloakError> {
    info!("📷 Opening camera {} for background capture", config.camera_index);
    let mut source = match device.open(config.camera_index) {
        Ok(source) => source,
        Err(e) => {
            error!("❌ Camera {} is not accessible: {}", config.camera_index, e);
            return Err(CloakError::CaptureInit { attempts: 0 });
        }
    };

    if !config.warmup().is_zero() {
        debug!("Waiting {:?} for sensor warm-up", config.warmup());
        thread::sleep(config.warmup());
    }

    let captured = read_first_frame(&mut source, config);
    drop(source);
    debug!("Background source released");

    match captured? {
        Some((attempt, frame)) => {
            info!(
                "✅ Background captured successfully ({}x{}, attempt {})",
                frame.width(),
                frame.height(),
                attempt
            );
            Ok(frame.mirrored())
        }
        None => {
            error!(
                "❌ Could not capture a background frame after {} attempts",
                config.background_attempts
            );
            Err(CloakError::CaptureInit {
                attempts: config.background_attempts,
            })
        }
    }
}

fn read_first_frame<S: FrameSource>(
    source: &mut S,
    config: &CloakConfig,
) -> Result<Option<(u32, Frame)>, CloakError> {
    for attempt in 1..=config.background_attempts {
        if let Some(frame) = source.read_frame()? {
            return Ok(Some((attempt, frame)));
        }
        warn!(
            "⚠️ Background read {}/{} returned no frame",
            attempt, config.background_attempts
        );
        if !config.retry_delay().is_zero() {
            thread::sleep(config.retry_delay());
        }
    }
    Ok(None)
}

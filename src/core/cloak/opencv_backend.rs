//! OpenCV camera (videoio) and window (highgui) collaborators

use super::error::CloakError;
use super::frame::Frame;
use super::source::{Display, FrameSource, VideoDevice};
use log::{debug, info, warn};
use opencv::core::{Mat, Scalar, CV_8UC3};
use opencv::prelude::*;
use opencv::{highgui, videoio};
use std::time::{Duration, Instant};

fn device_err(context: &str, e: opencv::Error) -> CloakError {
    CloakError::Device(format!("{}: {}", context, e))
}

fn display_err(context: &str, e: opencv::Error) -> CloakError {
    CloakError::Display(format!("{}: {}", context, e))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OpenCvDevice;

impl VideoDevice for OpenCvDevice {
    type Source = OpenCvCamera;

    fn open(&self, index: i32) -> Result<OpenCvCamera, CloakError> {
        OpenCvCamera::open(index)
    }
}

pub struct OpenCvCamera {
    index: i32,
    capture: videoio::VideoCapture,
    opened_at: Instant,
    frame_counter: u64,
}

impl OpenCvCamera {
    pub fn open(index: i32) -> Result<Self, CloakError> {
        let capture = videoio::VideoCapture::new(index, videoio::CAP_ANY)
            .map_err(|e| device_err("open camera", e))?;
        let opened = capture
            .is_opened()
            .map_err(|e| device_err("query camera", e))?;
        if !opened {
            return Err(CloakError::Device(format!("camera {} could not be opened", index)));
        }

        info!("📷 Camera {} opened", index);
        Ok(Self {
            index,
            capture,
            opened_at: Instant::now(),
            frame_counter: 0,
        })
    }
}

impl FrameSource for OpenCvCamera {
    fn read_frame(&mut self) -> Result<Option<Frame>, CloakError> {
        let mut mat = Mat::default();
        let ok = self
            .capture
            .read(&mut mat)
            .map_err(|e| device_err("read frame", e))?;
        if !ok || mat.empty() {
            return Ok(None);
        }
        if mat.typ() != CV_8UC3 {
            return Err(CloakError::Device(format!(
                "unsupported frame type {}, expected 8-bit BGR",
                mat.typ()
            )));
        }
        if !mat.is_continuous() {
            mat = mat.try_clone().map_err(|e| device_err("copy frame", e))?;
        }

        let data = mat
            .data_bytes()
            .map_err(|e| device_err("frame bytes", e))?
            .to_vec();
        let frame = Frame::from_bgr(mat.cols() as u32, mat.rows() as u32, data)?;

        self.frame_counter += 1;
        let elapsed_ms = self.opened_at.elapsed().as_millis() as u64;
        Ok(Some(frame.with_sequence(elapsed_ms, self.frame_counter)))
    }
}

impl Drop for OpenCvCamera {
    fn drop(&mut self) {
        if let Err(e) = self.capture.release() {
            warn!("⚠️ Camera {} release failed: {}", self.index, e);
        } else {
            info!("🗑️ Camera {} released", self.index);
        }
    }
}

/// highgui window. All windows are destroyed on drop.
#[derive(Debug, Default)]
pub struct HighGuiDisplay {
    windows: Vec<String>,
}

impl HighGuiDisplay {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Display for HighGuiDisplay {
    fn show(&mut self, title: &str, frame: &Frame) -> Result<(), CloakError> {
        if !self.windows.iter().any(|w| w == title) {
            highgui::named_window(title, highgui::WINDOW_AUTOSIZE)
                .map_err(|e| display_err("create window", e))?;
            debug!("Window {:?} created", title);
            self.windows.push(title.to_string());
        }

        let mut mat = Mat::new_rows_cols_with_default(
            frame.height() as i32,
            frame.width() as i32,
            CV_8UC3,
            Scalar::all(0.0),
        )
        .map_err(|e| display_err("allocate image", e))?;
        mat.data_bytes_mut()
            .map_err(|e| display_err("image bytes", e))?
            .copy_from_slice(frame.data());

        highgui::imshow(title, &mat).map_err(|e| display_err("show image", e))
    }

    fn poll_key(&mut self, wait: Duration) -> Result<Option<char>, CloakError> {
        let delay = wait.as_millis().clamp(1, i32::MAX as u128) as i32;
        let key = highgui::wait_key(delay).map_err(|e| display_err("poll key", e))?;
        if key < 0 {
            return Ok(None);
        }
        Ok(Some(((key & 0xFF) as u8) as char))
    }
}

impl Drop for HighGuiDisplay {
    fn drop(&mut self) {
        if self.windows.is_empty() {
            return;
        }
        if let Err(e) = highgui::destroy_all_windows() {
            warn!("⚠️ Closing windows failed: {}", e);
        } else {
            info!("🗑️ Windows closed");
        }
    }
}

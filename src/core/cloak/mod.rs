//! 隐身斗篷 - 用静态背景替换实时画面中指定颜色的区域
//!
//! Flow:
//! 1. Background capture - grab one mirrored reference frame, then release the camera
//! 2. Per frame - mirror, HSV threshold, open + dilate the mask, swap in background pixels
//! 3. Session - explicit RUNNING/STOPPED state machine around read/show/poll

pub mod background;
pub mod compositor;
pub mod config;
pub mod error;
pub mod frame;
pub mod hsv;
pub mod mask;
#[cfg(feature = "opencv")]
pub mod opencv_backend;
pub mod session;
pub mod source;

pub use background::capture_background;
pub use compositor::{Composite, FrameCompositor};
pub use config::CloakConfig;
pub use error::CloakError;
pub use frame::{Frame, FrameInfo};
pub use hsv::{Hsv, HsvFrame, HsvRange};
pub use mask::Mask;
#[cfg(feature = "opencv")]
pub use opencv_backend::{HighGuiDisplay, OpenCvCamera, OpenCvDevice};
pub use session::{Session, SessionEvent, SessionReport, SessionState, StopReason};
pub use source::{
    Display, DisplayLog, FrameSource, RecordingDisplay, ScriptedDevice, ScriptedSource,
    VideoDevice,
};

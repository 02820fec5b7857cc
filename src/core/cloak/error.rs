use thiserror::Error;

#[derive(Debug, Error)]
pub enum CloakError {
    #[error("Could not capture a background frame after {attempts} attempts, ensure the camera is accessible")]
    CaptureInit { attempts: u32 },
    #[error("No background captured yet")]
    NoBackground,
    #[error("Could not read frame from camera")]
    FrameRead,
    #[error("Frame size mismatch: expected {expected:?}, got {actual:?}")]
    DimensionMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },
    #[error("Invalid frame buffer: {width}x{height} needs {expected} bytes, got {actual}")]
    InvalidFrame {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
    #[error("Video device error: {0}")]
    Device(String),
    #[error("Display error: {0}")]
    Display(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Config parse error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CloakError {
    /// Process exit status for this error.
    ///
    /// 0 is reserved for a session cancelled from the keyboard and 1 for a live
    /// stream that stopped delivering frames.
    pub fn exit_code(&self) -> i32 {
        match self {
            CloakError::FrameRead => 1,
            CloakError::CaptureInit { .. } | CloakError::NoBackground => 2,
            _ => 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_distinct() {
        let capture = CloakError::CaptureInit { attempts: 30 };
        let read = CloakError::FrameRead;
        let device = CloakError::Device("busy".into());

        assert_eq!(read.exit_code(), 1);
        assert_eq!(capture.exit_code(), 2);
        assert_eq!(device.exit_code(), 3);
    }

    #[test]
    fn test_capture_message_mentions_attempts() {
        let err = CloakError::CaptureInit { attempts: 30 };
        assert!(err.to_string().contains("30 attempts"));
    }
}

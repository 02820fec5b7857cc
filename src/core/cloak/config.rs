use super::error::CloakError;
use super::hsv::{HsvRange, HUE_MAX};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloakConfig {
    /// Video device identifier passed to the camera backend.
    pub camera_index: i32,
    /// Target cloak color.
    pub color_range: HsvRange,
    /// Edge of the square structuring element, odd.
    pub kernel_size: u32,
    pub open_iterations: u32,
    pub dilate_iterations: u32,
    /// Background capture attempt budget.
    pub background_attempts: u32,
    pub retry_delay_ms: u64,
    /// Sensor grace period after a device is opened.
    pub warmup_ms: u64,
    pub window_title: String,
    pub poll_interval_ms: u64,
    pub cancel_key: char,
}

impl Default for CloakConfig {
    fn default() -> Self {
        Self {
            camera_index: 0,
            color_range: HsvRange {
                hue_low: 100,
                hue_high: 140,
                sat_low: 40,
                sat_high: 255,
                val_low: 40,
                val_high: 255,
            },
            kernel_size: 3,
            open_iterations: 1,
            dilate_iterations: 1,
            background_attempts: 30,
            retry_delay_ms: 100,
            warmup_ms: 3000,
            window_title: "Invisible Cloak".to_string(),
            poll_interval_ms: 1,
            cancel_key: ' ',
        }
    }
}

impl CloakConfig {
    pub fn blue() -> Self {
        Self::default()
    }

    pub fn green() -> Self {
        Self {
            color_range: HsvRange {
                hue_low: 40,
                hue_high: 80,
                sat_low: 50,
                sat_high: 255,
                val_low: 50,
                val_high: 255,
            },
            ..Self::default()
        }
    }

    /// Red straddles hue 0, so the range wraps.
    pub fn red() -> Self {
        Self {
            color_range: HsvRange {
                hue_low: 170,
                hue_high: 10,
                sat_low: 120,
                sat_high: 255,
                val_low: 70,
                val_high: 255,
            },
            ..Self::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, CloakError> {
        let config: CloakConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, CloakError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<(), CloakError> {
        if self.kernel_size == 0 || self.kernel_size % 2 == 0 {
            return Err(CloakError::InvalidConfig(format!(
                "kernel_size must be odd, got {}",
                self.kernel_size
            )));
        }
        if self.background_attempts == 0 {
            return Err(CloakError::InvalidConfig(
                "background_attempts must be at least 1".to_string(),
            ));
        }
        let range = &self.color_range;
        if range.hue_low > HUE_MAX || range.hue_high > HUE_MAX {
            return Err(CloakError::InvalidConfig(format!(
                "hue bounds must be within 0..={}, got {}..={}",
                HUE_MAX, range.hue_low, range.hue_high
            )));
        }
        if range.sat_low > range.sat_high || range.val_low > range.val_high {
            return Err(CloakError::InvalidConfig(
                "saturation/value lower bound exceeds upper bound".to_string(),
            ));
        }
        Ok(())
    }

    pub fn warmup(&self) -> Duration {
        Duration::from_millis(self.warmup_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

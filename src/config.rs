//! Runtime configuration, loadable from JSON.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;

use crate::detect::{FILE_DETECTION_TIMEOUT, STREAM_DETECTION_TIMEOUT};
use crate::foundation::core::Facing;
use crate::foundation::error::{BitterError, BitterResult};
use crate::warp::engine::clamp_intensity;
use crate::warp::styles::WarpStyle;

/// Style and intensity applied to every detected face.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct WarpSettings {
    pub style: WarpStyle,
    pub intensity: f32,
}

impl Default for WarpSettings {
    fn default() -> Self {
        Self {
            style: WarpStyle::Droop,
            intensity: 1.0,
        }
    }
}

/// Encoder parameters for recordings and video tasks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EncodeConfig {
    pub bitrate: u32,
    pub frame_rate: u32,
}

impl Default for EncodeConfig {
    fn default() -> Self {
        Self {
            bitrate: 4_000_000,
            frame_rate: 30,
        }
    }
}

/// Top-level configuration for a streaming session and file tasks.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub warp: WarpSettings,
    pub encode: EncodeConfig,
    pub facing: Facing,
    pub stream_detection_timeout_ms: u64,
    pub file_detection_timeout_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            warp: WarpSettings::default(),
            encode: EncodeConfig::default(),
            facing: Facing::Front,
            stream_detection_timeout_ms: STREAM_DETECTION_TIMEOUT.as_millis() as u64,
            file_detection_timeout_ms: FILE_DETECTION_TIMEOUT.as_millis() as u64,
        }
    }
}

impl PipelineConfig {
    pub fn from_json(json: &str) -> BitterResult<Self> {
        let cfg: Self = serde_json::from_str(json)
            .map_err(|e| BitterError::validation(format!("invalid config JSON: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_path(path: &Path) -> BitterResult<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read config file '{}'", path.display()))?;
        Self::from_json(&text)
    }

    pub fn validate(&self) -> BitterResult<()> {
        clamp_intensity(self.warp.intensity)?;
        if self.encode.bitrate == 0 || self.encode.frame_rate == 0 {
            return Err(BitterError::validation(
                "encode bitrate and frame_rate must be non-zero",
            ));
        }
        if self.stream_detection_timeout_ms == 0 || self.file_detection_timeout_ms == 0 {
            return Err(BitterError::validation("detection timeouts must be non-zero"));
        }
        Ok(())
    }

    pub fn stream_detection_timeout(&self) -> Duration {
        Duration::from_millis(self.stream_detection_timeout_ms)
    }

    pub fn file_detection_timeout(&self) -> Duration {
        Duration::from_millis(self.file_detection_timeout_ms)
    }
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;

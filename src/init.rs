//! One-time platform capability probing.

use std::sync::OnceLock;

use crate::encode::{is_ffmpeg_on_path, is_ffprobe_on_path};
use crate::foundation::error::{BitterError, BitterResult};

/// What the host can do, probed once.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Capabilities {
    pub ffmpeg: bool,
    pub ffprobe: bool,
    pub media_feature: bool,
}

impl Capabilities {
    pub fn video(&self) -> bool {
        self.media_feature && self.ffmpeg && self.ffprobe
    }
}

/// Lazily initialized capability state, owned by whoever owns the effects.
#[derive(Debug, Default)]
pub struct InitState {
    caps: OnceLock<Capabilities>,
}

impl InitState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capabilities(caps: Capabilities) -> Self {
        let state = Self::default();
        let _ = state.caps.set(caps);
        state
    }

    pub fn capabilities(&self) -> Capabilities {
        *self.caps.get_or_init(|| {
            let caps = Capabilities {
                ffmpeg: is_ffmpeg_on_path(),
                ffprobe: is_ffprobe_on_path(),
                media_feature: cfg!(feature = "media-ffmpeg"),
            };
            tracing::info!(?caps, "platform capabilities probed");
            caps
        })
    }

    pub fn is_initialized(&self) -> bool {
        self.caps.get().is_some()
    }

    pub fn require_video(&self) -> BitterResult<()> {
        let caps = self.capabilities();
        if !caps.media_feature {
            return Err(BitterError::unsupported(
                "video processing requires the 'media-ffmpeg' feature",
            ));
        }
        if !caps.video() {
            return Err(BitterError::unsupported(
                "video processing requires ffmpeg and ffprobe on PATH",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../tests/unit/init.rs"]
mod tests;

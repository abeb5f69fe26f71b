//! Recording: encoder/container contracts, the encode state machine and the ffmpeg backend.

use std::path::Path;

use crate::foundation::error::BitterResult;

pub mod codec;
/// System-`ffmpeg` implementation of [`codec::MediaBackend`].
#[cfg(feature = "media-ffmpeg")]
pub mod ffmpeg;
pub mod pipeline;

pub fn is_ffmpeg_on_path() -> bool {
    is_tool_on_path("ffmpeg")
}

pub fn is_ffprobe_on_path() -> bool {
    is_tool_on_path("ffprobe")
}

fn is_tool_on_path(tool: &str) -> bool {
    std::process::Command::new(tool)
        .arg("-version")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

pub fn ensure_parent_dir(path: &Path) -> BitterResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

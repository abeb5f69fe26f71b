//! Source video probing and streaming decode.

use std::path::{Path, PathBuf};

use crate::encode::codec::FrameRate;
use crate::foundation::core::Frame;
use crate::foundation::error::{BitterError, BitterResult};

/// Properties of a source video as reported by `ffprobe`.
#[derive(Clone, Debug, PartialEq)]
pub struct VideoInfo {
    pub source_path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub fps_num: u32,
    pub fps_den: u32,
    pub duration_sec: f64,
    pub nb_frames: Option<u64>,
    pub has_audio: bool,
}

impl VideoInfo {
    pub fn fps(&self) -> f64 {
        FrameRate::new(self.fps_num, self.fps_den).as_f64()
    }

    pub fn frame_rate(&self) -> Option<FrameRate> {
        let rate = FrameRate::new(self.fps_num, self.fps_den);
        rate.is_valid().then_some(rate)
    }

    pub fn estimated_frames(&self) -> u64 {
        match self.nb_frames {
            Some(n) if n > 0 => n,
            _ => (self.duration_sec * self.fps()).round().max(0.0) as u64,
        }
    }

    pub fn timestamp_us(&self, index: u64) -> u64 {
        FrameRate::new(self.fps_num, self.fps_den).timestamp_us(index)
    }
}

/// Sequential reader of upright RGBA8 frames.
pub trait VideoSource: Send {
    fn info(&self) -> &VideoInfo;

    fn next_frame(&mut self) -> BitterResult<Option<Frame>>;
}

/// Opens [`VideoSource`]s for file tasks.
pub trait VideoSourceFactory: Send + Sync {
    fn open(&self, path: &Path) -> BitterResult<Box<dyn VideoSource>>;
}

/// [`VideoSourceFactory`] producing [`FfmpegVideoSource`]s.
#[cfg(feature = "media-ffmpeg")]
#[derive(Clone, Copy, Debug, Default)]
pub struct FfmpegVideoSourceFactory;

#[cfg(feature = "media-ffmpeg")]
impl VideoSourceFactory for FfmpegVideoSourceFactory {
    fn open(&self, path: &Path) -> BitterResult<Box<dyn VideoSource>> {
        Ok(Box::new(FfmpegVideoSource::open(path)?))
    }
}

#[cfg_attr(not(feature = "media-ffmpeg"), allow(dead_code))]
pub(crate) fn parse_ff_ratio(s: &str) -> Option<(u32, u32)> {
    let mut parts = s.split('/');
    let a = parts.next()?.parse::<u32>().ok()?;
    let b = parts.next()?.parse::<u32>().ok()?;
    if b == 0 {
        return None;
    }
    Some((a, b))
}

#[derive(serde::Deserialize)]
struct ProbeSideData {
    rotation: Option<f64>,
}

#[derive(serde::Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    nb_frames: Option<String>,
    #[serde(default)]
    tags: std::collections::HashMap<String, String>,
    #[serde(default)]
    side_data_list: Vec<ProbeSideData>,
}

#[derive(serde::Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

#[derive(serde::Deserialize)]
struct ProbeOut {
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[cfg_attr(not(feature = "media-ffmpeg"), allow(dead_code))]
pub(crate) fn parse_probe_json(source_path: &Path, json: &[u8]) -> BitterResult<VideoInfo> {
    let parsed: ProbeOut = serde_json::from_slice(json)
        .map_err(|e| BitterError::decode(format!("ffprobe json parse failed: {e}")))?;
    let video = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| BitterError::decode("no video stream found"))?;
    let width = video
        .width
        .ok_or_else(|| BitterError::decode("missing video width from ffprobe"))?;
    let height = video
        .height
        .ok_or_else(|| BitterError::decode("missing video height from ffprobe"))?;
    let (fps_num, fps_den) = parse_ff_ratio(video.r_frame_rate.as_deref().unwrap_or("0/1"))
        .filter(|(n, _)| *n > 0)
        .ok_or_else(|| BitterError::decode("invalid video r_frame_rate"))?;

    let rotation = video
        .side_data_list
        .iter()
        .find_map(|d| d.rotation)
        .or_else(|| video.tags.get("rotate").and_then(|r| r.parse::<f64>().ok()))
        .unwrap_or(0.0);
    let quarter_turns = ((rotation / 90.0).round() as i64).rem_euclid(4);
    let (width, height) = if quarter_turns % 2 == 1 {
        (height, width)
    } else {
        (width, height)
    };

    Ok(VideoInfo {
        source_path: source_path.to_path_buf(),
        width,
        height,
        fps_num,
        fps_den,
        duration_sec: parsed
            .format
            .as_ref()
            .and_then(|f| f.duration.as_ref())
            .and_then(|s| s.parse::<f64>().ok())
            .unwrap_or(0.0),
        nb_frames: video.nb_frames.as_ref().and_then(|s| s.parse().ok()),
        has_audio: parsed
            .streams
            .iter()
            .any(|s| s.codec_type.as_deref() == Some("audio")),
    })
}

#[cfg(feature = "media-ffmpeg")]
pub fn probe_video(source_path: &Path) -> BitterResult<VideoInfo> {
    let out = std::process::Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_streams",
            "-show_format",
        ])
        .arg(source_path)
        .output()
        .map_err(|e| BitterError::decode(format!("failed to run ffprobe: {e}")))?;
    if !out.status.success() {
        return Err(BitterError::decode(format!(
            "ffprobe failed for '{}': {}",
            source_path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }
    parse_probe_json(source_path, &out.stdout)
}

#[cfg(not(feature = "media-ffmpeg"))]
pub fn probe_video(_source_path: &Path) -> BitterResult<VideoInfo> {
    Err(BitterError::unsupported(
        "video processing requires the 'media-ffmpeg' feature",
    ))
}

/// Streams RGBA8 frames out of a system `ffmpeg` decode process.
#[cfg(feature = "media-ffmpeg")]
pub struct FfmpegVideoSource {
    info: VideoInfo,
    child: std::process::Child,
    stdout: std::process::ChildStdout,
    index: u64,
    frame_len: usize,
}

#[cfg(feature = "media-ffmpeg")]
impl FfmpegVideoSource {
    pub fn open(path: &Path) -> BitterResult<Self> {
        use std::process::{Command, Stdio};

        let info = probe_video(path)?;
        let mut child = Command::new("ffmpeg")
            .args(["-v", "error", "-i"])
            .arg(path)
            .args(["-an", "-f", "rawvideo", "-pix_fmt", "rgba", "pipe:1"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| BitterError::decode(format!("failed to run ffmpeg for video decode: {e}")))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| BitterError::decode("failed to open ffmpeg stdout (unexpected)"))?;
        let frame_len = info.width as usize * info.height as usize * 4;
        if frame_len == 0 {
            return Err(BitterError::decode(
                "decoded video frame size is zero (invalid source dimensions)",
            ));
        }
        Ok(Self {
            info,
            child,
            stdout,
            index: 0,
            frame_len,
        })
    }
}

#[cfg(feature = "media-ffmpeg")]
impl VideoSource for FfmpegVideoSource {
    fn info(&self) -> &VideoInfo {
        &self.info
    }

    fn next_frame(&mut self) -> BitterResult<Option<Frame>> {
        use std::io::Read as _;

        let mut buf = vec![0u8; self.frame_len];
        let mut filled = 0;
        while filled < buf.len() {
            match self.stdout.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
                Err(e) => {
                    return Err(BitterError::decode(format!("ffmpeg video read failed: {e}")));
                }
            }
        }
        if filled == 0 {
            let status = self
                .child
                .wait()
                .map_err(|e| BitterError::decode(format!("failed to wait for ffmpeg: {e}")))?;
            if !status.success() {
                return Err(BitterError::decode(format!(
                    "ffmpeg video decode failed for '{}' with status {status}",
                    self.info.source_path.display()
                )));
            }
            return Ok(None);
        }
        if filled < buf.len() {
            return Err(BitterError::decode(format!(
                "truncated video frame: got {filled} bytes, expected {}",
                buf.len()
            )));
        }

        let ts = self.info.timestamp_us(self.index);
        self.index += 1;
        Ok(Some(
            Frame::rgba8(self.info.width, self.info.height, buf)?.with_timestamp(ts),
        ))
    }
}

#[cfg(feature = "media-ffmpeg")]
impl Drop for FfmpegVideoSource {
    fn drop(&mut self) {
        if let Ok(None) = self.child.try_wait() {
            let _ = self.child.kill();
        }
        let _ = self.child.wait();
    }
}

#[cfg(test)]
#[path = "../tests/unit/media.rs"]
mod tests;

use std::io::{Read, Write as _};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::{Arc, mpsc};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::encode::codec::{
    AudioPassthrough, ContainerWriter, EncodedPacket, EncoderConfig, EncoderOutput, MediaBackend,
    PacketFlags, TrackFormat, VideoEncoder,
};
use crate::encode::{ensure_parent_dir, is_ffmpeg_on_path};
use crate::foundation::core::PixelFormat;
use crate::foundation::error::{BitterError, BitterResult};
use crate::frame::convert::ChromaLayout;

const AVC_MIME: &str = "video/avc";
const STDOUT_CHUNK: usize = 64 * 1024;

type StderrDrain = JoinHandle<std::io::Result<Vec<u8>>>;

/// Spawned `ffmpeg` with a writable stdin and a background stderr reader.
struct FfmpegChild {
    child: Child,
    stdin: Option<ChildStdin>,
    stderr_drain: Option<StderrDrain>,
}

impl FfmpegChild {
    fn spawn(mut cmd: Command, pipe_stdout: bool) -> BitterResult<Self> {
        if !is_ffmpeg_on_path() {
            return Err(BitterError::unsupported(
                "ffmpeg is required for video encoding, but was not found on PATH",
            ));
        }
        cmd.stdin(Stdio::piped())
            .stdout(if pipe_stdout {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stderr(Stdio::piped());
        let mut child = cmd.spawn().map_err(|e| {
            BitterError::encode(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| BitterError::encode("failed to open ffmpeg stdin (unexpected)"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| BitterError::encode("failed to open ffmpeg stderr (unexpected)"))?;
        let stderr_drain = std::thread::spawn(move || {
            let mut stderr_bytes = Vec::new();
            stderr.read_to_end(&mut stderr_bytes)?;
            Ok(stderr_bytes)
        });

        Ok(Self {
            child,
            stdin: Some(stdin),
            stderr_drain: Some(stderr_drain),
        })
    }

    fn write(&mut self, bytes: &[u8]) -> BitterResult<()> {
        let Some(stdin) = self.stdin.as_mut() else {
            return Err(BitterError::encode("ffmpeg input is already closed"));
        };
        stdin
            .write_all(bytes)
            .map_err(|e| BitterError::encode(format!("failed to write to ffmpeg stdin: {e}")))
    }

    fn close_input(&mut self) {
        drop(self.stdin.take());
    }

    fn finish(&mut self) -> BitterResult<()> {
        self.close_input();
        let status = self.child.wait().map_err(|e| {
            BitterError::encode(format!("failed to wait for ffmpeg to finish: {e}"))
        })?;
        let stderr_bytes = match self.stderr_drain.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| BitterError::encode("ffmpeg stderr drain thread panicked"))?
                .map_err(|e| BitterError::encode(format!("ffmpeg stderr read failed: {e}")))?,
            None => Vec::new(),
        };
        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr_bytes);
            return Err(BitterError::encode(format!(
                "ffmpeg exited with status {}: {}",
                status,
                stderr.trim()
            )));
        }
        Ok(())
    }

    fn kill(&mut self) {
        self.close_input();
        if let Ok(None) = self.child.try_wait() {
            let _ = self.child.kill();
        }
        let _ = self.child.wait();
    }
}

/// H.264 encoder backed by a system `ffmpeg` process.
///
/// Raw I420 frames go to stdin; the Annex B elementary stream is read from stdout on a helper
/// thread and surfaced as packets. The first poll always reports the output format.
pub struct FfmpegEncoder {
    config: EncoderConfig,
    proc: Option<FfmpegChild>,
    chunks: mpsc::Receiver<std::io::Result<Vec<u8>>>,
    format_sent: bool,
    eos_sent: bool,
    last_ts: u64,
}

impl FfmpegEncoder {
    pub fn new(config: EncoderConfig) -> BitterResult<Self> {
        config.validate()?;
        let mut cmd = Command::new("ffmpeg");
        cmd.args([
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "yuv420p",
            "-s",
            &format!("{}x{}", config.width, config.height),
            "-r",
            &config.frame_rate.to_string(),
            "-i",
            "pipe:0",
            "-an",
            "-c:v",
            "libx264",
            "-b:v",
            &config.bitrate.to_string(),
            "-pix_fmt",
            "yuv420p",
            "-f",
            "h264",
            "pipe:1",
        ]);
        let mut proc = FfmpegChild::spawn(cmd, true)?;
        let mut stdout = proc
            .child
            .stdout
            .take()
            .ok_or_else(|| BitterError::encode("failed to open ffmpeg stdout (unexpected)"))?;

        let (tx, chunks) = mpsc::channel();
        std::thread::spawn(move || {
            let mut buf = vec![0u8; STDOUT_CHUNK];
            loop {
                match stdout.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => {
                        if tx.send(Ok(buf[..n].to_vec())).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        let _ = tx.send(Err(e));
                        break;
                    }
                }
            }
        });

        Ok(Self {
            config,
            proc: Some(proc),
            chunks,
            format_sent: false,
            eos_sent: false,
            last_ts: 0,
        })
    }
}

impl VideoEncoder for FfmpegEncoder {
    fn input_layout(&self) -> ChromaLayout {
        ChromaLayout::I420
    }

    fn input_capacity(&self) -> usize {
        PixelFormat::I420.frame_len(self.config.width, self.config.height)
    }

    fn queue_input(&mut self, data: &[u8], timestamp_us: u64) -> BitterResult<()> {
        let proc = self
            .proc
            .as_mut()
            .ok_or_else(|| BitterError::encode("ffmpeg encoder is released"))?;
        proc.write(data)?;
        self.last_ts = timestamp_us;
        Ok(())
    }

    fn queue_end_of_stream(&mut self) -> BitterResult<()> {
        if let Some(proc) = self.proc.as_mut() {
            proc.close_input();
        }
        Ok(())
    }

    fn dequeue_output(&mut self, timeout: Duration) -> BitterResult<EncoderOutput> {
        if !self.format_sent {
            self.format_sent = true;
            return Ok(EncoderOutput::FormatChanged(TrackFormat {
                mime: AVC_MIME.to_string(),
                width: self.config.width,
                height: self.config.height,
                frame_rate: self.config.frame_rate,
            }));
        }
        if self.eos_sent {
            return Ok(EncoderOutput::TryAgainLater);
        }
        match self.chunks.recv_timeout(timeout) {
            Ok(Ok(data)) => Ok(EncoderOutput::Packet(EncodedPacket {
                data,
                timestamp_us: self.last_ts,
                flags: PacketFlags::default(),
            })),
            Ok(Err(e)) => Err(BitterError::encode(format!(
                "failed to read ffmpeg output: {e}"
            ))),
            Err(mpsc::RecvTimeoutError::Timeout) => Ok(EncoderOutput::TryAgainLater),
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                if let Some(mut proc) = self.proc.take() {
                    proc.finish()?;
                }
                self.eos_sent = true;
                Ok(EncoderOutput::Packet(EncodedPacket {
                    data: Vec::new(),
                    timestamp_us: self.last_ts,
                    flags: PacketFlags {
                        end_of_stream: true,
                        ..PacketFlags::default()
                    },
                }))
            }
        }
    }

    fn release(&mut self) {
        if let Some(mut proc) = self.proc.take() {
            proc.kill();
        }
    }
}

impl Drop for FfmpegEncoder {
    fn drop(&mut self) {
        self.release();
    }
}

/// MP4 writer that remuxes an H.264 elementary stream through `ffmpeg -c copy`.
pub struct FfmpegMuxer {
    output: PathBuf,
    format: Option<TrackFormat>,
    proc: Option<FfmpegChild>,
}

impl FfmpegMuxer {
    pub fn new(output: impl Into<PathBuf>) -> Self {
        Self {
            output: output.into(),
            format: None,
            proc: None,
        }
    }
}

impl ContainerWriter for FfmpegMuxer {
    fn add_track(&mut self, format: &TrackFormat) -> BitterResult<usize> {
        if self.proc.is_some() {
            return Err(BitterError::encode("cannot add a track after start"));
        }
        if self.format.is_some() {
            return Err(BitterError::encode("ffmpeg muxer supports a single video track"));
        }
        if format.mime != AVC_MIME {
            return Err(BitterError::unsupported(format!(
                "ffmpeg muxer cannot store '{}'",
                format.mime
            )));
        }
        self.format = Some(format.clone());
        Ok(0)
    }

    fn start(&mut self) -> BitterResult<()> {
        let format = self
            .format
            .as_ref()
            .ok_or_else(|| BitterError::encode("muxer started without a track"))?;
        ensure_parent_dir(&self.output)?;
        let mut cmd = Command::new("ffmpeg");
        cmd.args([
            "-y",
            "-loglevel",
            "error",
            "-f",
            "h264",
            "-r",
            &format.frame_rate.to_string(),
            "-i",
            "pipe:0",
            "-c",
            "copy",
            "-movflags",
            "+faststart",
        ])
        .arg(&self.output);
        self.proc = Some(FfmpegChild::spawn(cmd, false)?);
        Ok(())
    }

    fn write_sample(&mut self, track: usize, packet: &EncodedPacket) -> BitterResult<()> {
        if track != 0 {
            return Err(BitterError::encode(format!("unknown track {track}")));
        }
        let proc = self
            .proc
            .as_mut()
            .ok_or_else(|| BitterError::encode("ffmpeg muxer not started"))?;
        proc.write(&packet.data)
    }

    fn finish(&mut self) -> BitterResult<()> {
        let mut proc = self
            .proc
            .take()
            .ok_or_else(|| BitterError::encode("ffmpeg muxer not started"))?;
        proc.finish()
    }
}

impl Drop for FfmpegMuxer {
    fn drop(&mut self) {
        if let Some(mut proc) = self.proc.take() {
            proc.kill();
        }
    }
}

/// Copies video from one file and audio from another with `-c copy`.
#[derive(Clone, Copy, Debug, Default)]
pub struct FfmpegAudioPassthrough;

impl AudioPassthrough for FfmpegAudioPassthrough {
    fn merge(&self, video: &Path, audio_source: &Path, output: &Path) -> BitterResult<()> {
        ensure_parent_dir(output)?;
        let out = Command::new("ffmpeg")
            .args(["-y", "-loglevel", "error", "-i"])
            .arg(video)
            .arg("-i")
            .arg(audio_source)
            .args([
                "-map",
                "0:v:0",
                "-map",
                "1:a:0?",
                "-c",
                "copy",
                "-movflags",
                "+faststart",
            ])
            .arg(output)
            .output()
            .map_err(|e| BitterError::encode(format!("failed to run ffmpeg for audio merge: {e}")))?;
        if !out.status.success() {
            return Err(BitterError::encode(format!(
                "ffmpeg audio merge failed for '{}': {}",
                output.display(),
                String::from_utf8_lossy(&out.stderr).trim()
            )));
        }
        Ok(())
    }
}

/// [`MediaBackend`] built on the system `ffmpeg` binary.
#[derive(Clone, Copy, Debug, Default)]
pub struct FfmpegBackend;

impl MediaBackend for FfmpegBackend {
    fn create_encoder(&self, config: &EncoderConfig) -> BitterResult<Box<dyn VideoEncoder>> {
        Ok(Box::new(FfmpegEncoder::new(*config)?))
    }

    fn create_writer(&self, output: &Path) -> BitterResult<Box<dyn ContainerWriter>> {
        Ok(Box::new(FfmpegMuxer::new(output)))
    }

    fn audio_passthrough(&self) -> Option<Arc<dyn AudioPassthrough>> {
        Some(Arc::new(FfmpegAudioPassthrough))
    }
}

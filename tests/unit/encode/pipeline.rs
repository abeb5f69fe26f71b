use std::collections::VecDeque;

use parking_lot::Mutex;

use super::*;
use crate::encode::codec::{AudioPassthrough, PacketFlags, TrackFormat};
use crate::foundation::error::ErrorCode;
use crate::frame::convert::ChromaLayout;

#[derive(Default)]
struct Log {
    samples: Vec<EncodedPacket>,
    started: bool,
    finished: bool,
    released: bool,
    merged: Option<(PathBuf, PathBuf, PathBuf)>,
    track: Option<TrackFormat>,
}

#[derive(Clone, Copy, Default)]
struct Script {
    capacity_override: Option<usize>,
    fail_writer: bool,
    data_before_format: bool,
    double_format: bool,
    nv12: bool,
}

struct FakeEncoder {
    log: Arc<Mutex<Log>>,
    script: Script,
    config: EncoderConfig,
    pending: VecDeque<EncoderOutput>,
    formats_sent: u32,
}

fn data_packet(ts: u64) -> EncoderOutput {
    EncoderOutput::Packet(EncodedPacket {
        data: vec![0xAB; 8],
        timestamp_us: ts,
        flags: PacketFlags::default(),
    })
}

fn track_format(config: &EncoderConfig) -> EncoderOutput {
    EncoderOutput::FormatChanged(TrackFormat {
        mime: "video/avc".into(),
        width: config.width,
        height: config.height,
        frame_rate: config.frame_rate,
    })
}

impl VideoEncoder for FakeEncoder {
    fn input_layout(&self) -> ChromaLayout {
        if self.script.nv12 {
            ChromaLayout::Nv12
        } else {
            ChromaLayout::I420
        }
    }

    fn input_capacity(&self) -> usize {
        self.script
            .capacity_override
            .unwrap_or_else(|| PixelFormat::I420.frame_len(self.config.width, self.config.height))
    }

    fn queue_input(&mut self, _data: &[u8], timestamp_us: u64) -> BitterResult<()> {
        if self.formats_sent == 0 {
            if self.script.data_before_format {
                self.pending.push_back(data_packet(timestamp_us));
            }
            self.pending.push_back(track_format(&self.config));
            self.pending.push_back(EncoderOutput::Packet(EncodedPacket {
                data: vec![0, 0, 0, 1, 0x67],
                timestamp_us,
                flags: PacketFlags {
                    codec_config: true,
                    ..PacketFlags::default()
                },
            }));
            self.formats_sent += 1;
        } else if self.script.double_format && self.formats_sent == 1 {
            self.pending.push_back(track_format(&self.config));
            self.formats_sent += 1;
        }
        self.pending.push_back(data_packet(timestamp_us));
        Ok(())
    }

    fn queue_end_of_stream(&mut self) -> BitterResult<()> {
        self.pending.push_back(EncoderOutput::Packet(EncodedPacket {
            data: Vec::new(),
            timestamp_us: 0,
            flags: PacketFlags {
                end_of_stream: true,
                ..PacketFlags::default()
            },
        }));
        Ok(())
    }

    fn dequeue_output(&mut self, _timeout: Duration) -> BitterResult<EncoderOutput> {
        Ok(self
            .pending
            .pop_front()
            .unwrap_or(EncoderOutput::TryAgainLater))
    }

    fn release(&mut self) {
        self.log.lock().released = true;
    }
}

struct FakeWriter {
    log: Arc<Mutex<Log>>,
    path: PathBuf,
}

impl ContainerWriter for FakeWriter {
    fn add_track(&mut self, format: &TrackFormat) -> BitterResult<usize> {
        self.log.lock().track = Some(format.clone());
        Ok(0)
    }

    fn start(&mut self) -> BitterResult<()> {
        self.log.lock().started = true;
        Ok(())
    }

    fn write_sample(&mut self, _track: usize, packet: &EncodedPacket) -> BitterResult<()> {
        self.log.lock().samples.push(packet.clone());
        Ok(())
    }

    fn finish(&mut self) -> BitterResult<()> {
        std::fs::write(&self.path, b"video").map_err(|e| BitterError::encode(e.to_string()))?;
        self.log.lock().finished = true;
        Ok(())
    }
}

struct FakePassthrough(Arc<Mutex<Log>>);

impl AudioPassthrough for FakePassthrough {
    fn merge(&self, video: &Path, audio_source: &Path, output: &Path) -> BitterResult<()> {
        std::fs::copy(video, output).map_err(|e| BitterError::encode(e.to_string()))?;
        self.0.lock().merged = Some((
            video.to_path_buf(),
            audio_source.to_path_buf(),
            output.to_path_buf(),
        ));
        Ok(())
    }
}

struct FakeBackend {
    log: Arc<Mutex<Log>>,
    script: Script,
}

impl MediaBackend for FakeBackend {
    fn create_encoder(&self, config: &EncoderConfig) -> BitterResult<Box<dyn VideoEncoder>> {
        Ok(Box::new(FakeEncoder {
            log: self.log.clone(),
            script: self.script,
            config: *config,
            pending: VecDeque::new(),
            formats_sent: 0,
        }))
    }

    fn create_writer(&self, output: &Path) -> BitterResult<Box<dyn ContainerWriter>> {
        if self.script.fail_writer {
            return Err(BitterError::unsupported("no muxer"));
        }
        Ok(Box::new(FakeWriter {
            log: self.log.clone(),
            path: output.to_path_buf(),
        }))
    }

    fn audio_passthrough(&self) -> Option<Arc<dyn AudioPassthrough>> {
        Some(Arc::new(FakePassthrough(self.log.clone())))
    }
}

fn setup(script: Script) -> (tempfile::TempDir, Arc<Mutex<Log>>, EncodePipeline) {
    let dir = tempfile::tempdir().unwrap();
    let log = Arc::new(Mutex::new(Log::default()));
    let backend = Arc::new(FakeBackend {
        log: log.clone(),
        script,
    });
    let pipeline = EncodePipeline::new(backend, dir.path().join("out/clip.mp4"));
    (dir, log, pipeline)
}

fn frame() -> Frame {
    Frame::rgba8(4, 4, vec![200; 64]).unwrap()
}

#[test]
fn full_session_writes_samples_after_format_and_finishes() {
    let (_dir, log, mut p) = setup(Script::default());
    assert_eq!(p.state(), EncodeState::Idle);
    p.configure(4, 4, 1_000_000, FrameRate::whole(30)).unwrap();
    assert_eq!(p.state(), EncodeState::Configured);

    for i in 0..3u64 {
        p.feed(&frame(), i * 33_333).unwrap();
        p.drain(false).unwrap();
    }
    assert_eq!(p.state(), EncodeState::Encoding);
    p.stop().unwrap();

    assert_eq!(p.state(), EncodeState::Stopped);
    let stats = p.stats();
    assert_eq!(stats.frames_fed, 3);
    assert_eq!(stats.samples_written, 3);
    assert_eq!(stats.codec_config_discarded, 1);
    assert_eq!(stats.dropped_before_start, 0);

    let log = log.lock();
    assert!(log.started && log.finished && log.released);
    assert!(log.samples.iter().all(|s| !s.flags.codec_config && !s.data.is_empty()));
    assert!(p.output().exists());
}

#[test]
fn timestamps_must_strictly_increase() {
    let (_dir, _log, mut p) = setup(Script::default());
    p.configure(4, 4, 1_000_000, FrameRate::whole(30)).unwrap();
    p.feed(&frame(), 100).unwrap();
    let err = p.feed(&frame(), 100).unwrap_err();
    assert!(matches!(err, BitterError::Validation(_)));
    assert!(p.feed(&frame(), 50).is_err());
    assert_eq!(p.state(), EncodeState::Encoding);
    p.feed(&frame(), 101).unwrap();
}

#[test]
fn frames_larger_than_input_capacity_are_rejected_not_truncated() {
    let (_dir, log, mut p) = setup(Script {
        capacity_override: Some(10),
        ..Script::default()
    });
    p.configure(4, 4, 1_000_000, FrameRate::whole(30)).unwrap();
    let err = p.feed(&frame(), 0).unwrap_err();
    assert!(matches!(err, BitterError::Validation(_)));
    assert_eq!(p.stats().frames_rejected, 1);
    assert_eq!(p.stats().frames_fed, 0);
    assert_eq!(p.state(), EncodeState::Configured);
    assert!(log.lock().samples.is_empty());
}

#[test]
fn configure_failure_releases_everything_and_reports_encode_failed() {
    let (_dir, log, mut p) = setup(Script {
        fail_writer: true,
        ..Script::default()
    });
    let err = p.configure(4, 4, 1_000_000, FrameRate::whole(30)).unwrap_err();
    assert_eq!(err.code(), ErrorCode::EncodeFailed);
    assert_eq!(p.state(), EncodeState::Stopped);
    assert!(log.lock().released);
    assert!(p.feed(&frame(), 0).is_err());
}

#[test]
fn invalid_dimensions_fail_configuration() {
    let (_dir, _log, mut p) = setup(Script::default());
    let err = p.configure(5, 4, 1_000_000, FrameRate::whole(30)).unwrap_err();
    assert_eq!(err.code(), ErrorCode::EncodeFailed);
    assert_eq!(p.state(), EncodeState::Stopped);
}

#[test]
fn fractional_frame_rate_reaches_the_track_unrounded() {
    let (_dir, log, mut p) = setup(Script::default());
    let ntsc = FrameRate::new(30000, 1001);
    p.configure(4, 4, 1_000_000, ntsc).unwrap();
    assert_eq!(p.config().unwrap().frame_rate, ntsc);
    p.feed(&frame(), 0).unwrap();
    p.feed(&frame(), ntsc.timestamp_us(1)).unwrap();
    p.drain(false).unwrap();
    assert_eq!(log.lock().track.as_ref().unwrap().frame_rate, ntsc);
    assert_eq!(ntsc.to_string(), "30000/1001");
    assert_eq!(ntsc.timestamp_us(30), 1_001_000);
}

#[test]
fn zero_denominator_frame_rate_fails_configuration() {
    let (_dir, _log, mut p) = setup(Script::default());
    let err = p.configure(4, 4, 1_000_000, FrameRate::new(30, 0)).unwrap_err();
    assert_eq!(err.code(), ErrorCode::EncodeFailed);
    assert_eq!(p.state(), EncodeState::Stopped);
}

#[test]
fn data_before_format_is_dropped_and_counted() {
    let (_dir, log, mut p) = setup(Script {
        data_before_format: true,
        ..Script::default()
    });
    p.configure(4, 4, 1_000_000, FrameRate::whole(30)).unwrap();
    p.feed(&frame(), 0).unwrap();
    p.drain(false).unwrap();
    assert_eq!(p.stats().dropped_before_start, 1);
    assert_eq!(p.stats().samples_written, 1);
    assert_eq!(log.lock().samples.len(), 1);
}

#[test]
fn second_format_change_is_fatal() {
    let (_dir, log, mut p) = setup(Script {
        double_format: true,
        ..Script::default()
    });
    p.configure(4, 4, 1_000_000, FrameRate::whole(30)).unwrap();
    p.feed(&frame(), 0).unwrap();
    p.drain(false).unwrap();
    p.feed(&frame(), 1).unwrap();
    let err = p.drain(false).unwrap_err();
    assert_eq!(err.code(), ErrorCode::EncodeFailed);
    assert_eq!(p.state(), EncodeState::Stopped);
    assert!(log.lock().released);
}

#[test]
fn feeding_before_configure_is_rejected() {
    let (_dir, _log, mut p) = setup(Script::default());
    assert!(p.feed(&frame(), 0).is_err());
    assert_eq!(p.state(), EncodeState::Idle);
    p.stop().unwrap();
    assert_eq!(p.state(), EncodeState::Stopped);
}

#[test]
fn nv12_encoders_receive_the_same_sized_buffer() {
    let (_dir, _log, mut p) = setup(Script {
        nv12: true,
        ..Script::default()
    });
    p.configure(4, 4, 1_000_000, FrameRate::whole(30)).unwrap();
    p.feed(&frame(), 0).unwrap();
    assert_eq!(p.stats().frames_fed, 1);
}

#[test]
fn audio_source_goes_through_a_temporary_video_file() {
    let (dir, log, p) = setup(Script::default());
    let source = dir.path().join("source.mp4");
    let mut p = p.with_audio_source(&source);
    p.configure(4, 4, 1_000_000, FrameRate::whole(30)).unwrap();
    p.feed(&frame(), 0).unwrap();
    p.stop().unwrap();

    let (video, audio, output) = log.lock().merged.clone().unwrap();
    assert_ne!(video, output);
    assert_eq!(video.parent(), output.parent());
    assert_eq!(audio, source);
    assert!(output.exists());
    assert!(!video.exists());
}

#[test]
fn abort_removes_partial_output() {
    let (_dir, log, mut p) = setup(Script::default());
    p.configure(4, 4, 1_000_000, FrameRate::whole(30)).unwrap();
    p.feed(&frame(), 0).unwrap();
    std::fs::write(p.output(), b"partial").unwrap();
    p.abort();
    assert_eq!(p.state(), EncodeState::Stopped);
    assert!(!p.output().exists());
    assert!(log.lock().released);
}

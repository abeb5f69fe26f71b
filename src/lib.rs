//! Bitterface warps faces in live camera frames, still images and video files.
//!
//! A landmark detector finds faces; their contours are normalized onto a fixed 68-point layout and
//! a style-specific set of displacement operators is resampled over the frame. The crate is
//! organised around three entry points:
//!
//! - [`PipelineOrchestrator`] runs a live capture session: latest-only frame hand-off, bounded
//!   detection, warp, render and optional recording
//! - [`EffectRegistry`] dispatches file-level image and video jobs to a [`MediaEffect`] such as
//!   [`BitterFaceEffect`], reporting through the [`task`] event protocol
//! - [`WarpEngine`] applies a style to a single frame
//!
//! Video decode and encode go through the system `ffmpeg`/`ffprobe` binaries and require the
//! `media-ffmpeg` feature.
#![forbid(unsafe_code)]

mod foundation;

pub mod config;
pub mod detect;
pub mod effect;
pub mod encode;
pub mod frame;
pub mod init;
pub mod landmarks;
pub mod media;
pub mod pipeline;
pub mod task;
pub mod warp;

pub use crate::foundation::core::{Facing, Frame, PixelFormat, Point, Rect, Rotation, Vec2};
pub use crate::foundation::error::{BitterError, BitterResult, ErrorCode};

pub use crate::config::{EncodeConfig, PipelineConfig, WarpSettings};
pub use crate::detect::{
    ContourFileDetector, DetectionOutcome, DetectionWorker, LandmarkDetector,
};
pub use crate::effect::bitter_face::BitterFaceEffect;
pub use crate::effect::{EffectKey, EffectRegistry, ImageRequest, MediaEffect, VideoRequest};
pub use crate::encode::codec::FrameRate;
pub use crate::init::{Capabilities, InitState};
pub use crate::landmarks::normalize::{ContourKind, NativeContours};
pub use crate::landmarks::scheme::LandmarkSet;
pub use crate::pipeline::orchestrator::{PipelineOrchestrator, StatsSnapshot};
pub use crate::task::{CancelToken, EventSink, TaskEvent, TaskId, TaskReporter};
pub use crate::warp::engine::WarpEngine;
pub use crate::warp::styles::WarpStyle;

use std::path::{Path, PathBuf};
use std::sync::{Arc, mpsc};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

use bitterface::landmarks::synthetic::synthetic_face_contours;
use bitterface::{
    BitterFaceEffect, ContourFileDetector, EffectKey, EffectRegistry, ImageRequest, InitState,
    PipelineConfig, Point, TaskEvent, TaskId, TaskReporter, VideoRequest, WarpStyle,
};

#[derive(Parser, Debug)]
#[command(name = "bitterface", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Warp every face in a still image (PNG or JPEG output).
    Image(ImageArgs),
    /// Warp every face in a video file (requires the `media-ffmpeg` feature and `ffmpeg` on PATH).
    Video(VideoArgs),
    /// Write a synthetic frontal face as contour JSON, usable with `--contours`.
    ContoursTemplate(TemplateArgs),
}

#[derive(Parser, Debug)]
struct WarpArgs {
    /// Contour JSON exported from a face detector (one face or an array of faces).
    #[arg(long)]
    contours: Option<PathBuf>,

    /// Pipeline configuration JSON.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Style id: 0 identity, 1 droop, 2 compress, 3 raise.
    #[arg(long)]
    style: Option<u8>,

    /// Warp strength in [0, 3].
    #[arg(long)]
    intensity: Option<f32>,
}

#[derive(Parser, Debug)]
struct ImageArgs {
    /// Input image.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output path; `.png`, `.jpg` or `.jpeg`.
    #[arg(long)]
    out: PathBuf,

    #[command(flatten)]
    warp: WarpArgs,
}

#[derive(Parser, Debug)]
struct VideoArgs {
    /// Input video.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output MP4 path.
    #[arg(long)]
    out: PathBuf,

    /// Target bitrate in bits per second (defaults to the configured one).
    #[arg(long)]
    bitrate: Option<u32>,

    /// Drop the source audio track.
    #[arg(long, default_value_t = false)]
    no_audio: bool,

    #[command(flatten)]
    warp: WarpArgs,
}

#[derive(Parser, Debug)]
struct TemplateArgs {
    /// Output JSON path.
    #[arg(long)]
    out: PathBuf,

    /// Face centre x in pixels.
    #[arg(long, default_value_t = 320.0)]
    center_x: f64,

    /// Face centre y in pixels.
    #[arg(long, default_value_t = 240.0)]
    center_y: f64,

    /// Face width in pixels.
    #[arg(long, default_value_t = 200.0)]
    width: f64,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Image(args) => cmd_image(args),
        Command::Video(args) => cmd_video(args),
        Command::ContoursTemplate(args) => cmd_template(args),
    }
}

struct Session {
    config: PipelineConfig,
    registry: EffectRegistry,
    key: EffectKey,
}

fn session(args: &WarpArgs) -> anyhow::Result<Session> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_path(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(style) = args.style {
        config.warp.style = WarpStyle::try_from(style)?;
    }
    if let Some(intensity) = args.intensity {
        config.warp.intensity = intensity;
    }
    config.validate()?;

    let detector = match &args.contours {
        Some(path) => ContourFileDetector::from_path(path)?,
        None => {
            tracing::warn!("no --contours given; output will match the input");
            ContourFileDetector::default()
        }
    };
    let effect = BitterFaceEffect::new(&config, Arc::new(detector), Arc::new(InitState::new()));
    let key = EffectKey::new(BitterFaceEffect::KEY);
    let mut registry = EffectRegistry::new();
    registry.register(key.clone(), Arc::new(effect));
    Ok(Session {
        config,
        registry,
        key,
    })
}

fn reporter() -> (TaskReporter, mpsc::Receiver<TaskEvent>) {
    let (tx, rx) = mpsc::channel();
    let sink = move |task: TaskId, event: TaskEvent| {
        if let TaskEvent::Progress { progress } = event {
            eprint!("\r{task}: {:>5.1}%", progress * 100.0);
        } else {
            let _ = tx.send(event);
        }
    };
    (TaskReporter::new(TaskId::next(), Arc::new(sink)), rx)
}

fn outcome(rx: &mpsc::Receiver<TaskEvent>) -> anyhow::Result<PathBuf> {
    match rx.try_recv().context("task ended without a terminal event")? {
        TaskEvent::Completed { output } => Ok(output),
        TaskEvent::Error { code, message } => anyhow::bail!("{code}: {message}"),
        TaskEvent::Progress { .. } => anyhow::bail!("unexpected progress event after completion"),
    }
}

fn cmd_image(args: ImageArgs) -> anyhow::Result<()> {
    let s = session(&args.warp)?;
    let request = ImageRequest {
        input: args.in_path,
        output: args.out,
        warp: s.config.warp,
    };
    let (reporter, rx) = reporter();
    s.registry.process_image(&s.key, &request, reporter);
    let out = outcome(&rx)?;
    eprintln!("wrote {}", out.display());
    Ok(())
}

fn cmd_video(args: VideoArgs) -> anyhow::Result<()> {
    let s = session(&args.warp)?;
    let mut encode = s.config.encode;
    if let Some(bitrate) = args.bitrate {
        encode.bitrate = bitrate;
    }
    let request = VideoRequest {
        input: args.in_path,
        output: args.out,
        warp: s.config.warp,
        encode,
        keep_audio: !args.no_audio,
    };
    let (reporter, rx) = reporter();
    s.registry.process_video(&s.key, &request, reporter);
    eprintln!();
    let out = outcome(&rx)?;
    eprintln!("wrote {}", out.display());
    Ok(())
}

fn cmd_template(args: TemplateArgs) -> anyhow::Result<()> {
    anyhow::ensure!(
        args.width.is_finite() && args.width > 0.0,
        "--width must be a positive number"
    );
    let face = synthetic_face_contours(Point::new(args.center_x, args.center_y), args.width);
    write_json(&args.out, &face)?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn write_json(path: &Path, value: &impl serde::Serialize) -> anyhow::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    let f = std::fs::File::create(path)
        .with_context(|| format!("create '{}'", path.display()))?;
    serde_json::to_writer_pretty(f, value)
        .with_context(|| format!("write json '{}'", path.display()))?;
    Ok(())
}

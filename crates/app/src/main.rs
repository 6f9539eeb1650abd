mod sink;
mod synthetic;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use framegate_core::{AudioStreamParams, CaptureSession, SessionParams, VideoStreamParams};
use framegate_foundation::{Fps, ReadError, StreamConfig};
use framegate_telemetry::{FpsTracker, MetricsSnapshot};

use crate::sink::{RawVideoSink, WavSink};
use crate::synthetic::{SyntheticBackend, SyntheticConfig};

const STATS_INTERVAL: Duration = Duration::from_secs(5);

/// Runs a synthetic camera and microphone through the capture pipeline
/// and reads the resulting packet stream, optionally writing it to disk.
#[derive(Parser, Debug)]
#[command(name = "framegate", version, about)]
struct Cli {
    /// How long to run, in seconds
    #[arg(short, long, default_value = "10")]
    duration: u64,

    /// TOML config file; flags given here override it
    #[arg(short, long, env = "FRAMEGATE_CONFIG")]
    config: Option<PathBuf>,

    /// Output frame rate, as "30" or "30000/1001"
    #[arg(long, value_parser = parse_fps)]
    target_fps: Option<Fps>,

    /// Delivery rate of the synthetic camera [default: 30]
    #[arg(long)]
    camera_fps: Option<u32>,

    /// Timestamp wobble as a percentage of the frame period [default: 0]
    #[arg(long)]
    jitter_pct: Option<u32>,

    /// Write audio.wav and raw grayscale frames into this directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Run without the video lane
    #[arg(long)]
    no_video: bool,

    /// Run without the audio lane
    #[arg(long)]
    no_audio: bool,
}

/// Optional TOML file mirroring the CLI knobs. Values resolve
/// defaults < file < command line.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    stream: StreamConfig,
    camera_fps: Option<u32>,
    jitter_pct: Option<u32>,
}

fn parse_fps(s: &str) -> Result<Fps, String> {
    let parse = |part: &str| {
        part.trim()
            .parse::<u32>()
            .map_err(|e| format!("invalid frame rate '{}': {}", s, e))
    };
    let fps = match s.split_once('/') {
        Some((num, den)) => Fps::new(parse(num)?, parse(den)?),
        None => Fps::whole(parse(s)?),
    };
    if fps.num == 0 || fps.den == 0 {
        return Err(format!("invalid frame rate '{}': must be positive", s));
    }
    Ok(fps)
}

fn load_file_config(path: &Path) -> anyhow::Result<FileConfig> {
    let text =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("failed to parse {}", path.display()))
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}

fn log_snapshot(snap: &MetricsSnapshot) {
    tracing::info!(
        video_packets = snap.video_packets,
        audio_packets = snap.audio_packets,
        video_depth = snap.video_depth,
        audio_depth = snap.audio_depth,
        suppressed = snap.video_suppressed,
        duplicated = snap.video_duplicated,
        evicted = snap.video_evicted + snap.audio_evicted,
        preroll_dropped = snap.audio_preroll_dropped,
        lost = snap.total_lost(),
        "pipeline stats"
    );
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();

    if cli.no_video && cli.no_audio {
        anyhow::bail!("nothing to capture with both lanes disabled");
    }

    let file = match &cli.config {
        Some(path) => load_file_config(path)?,
        None => FileConfig::default(),
    };

    let mut stream_cfg = file.stream;
    if cli.target_fps.is_some() {
        stream_cfg.target_fps = cli.target_fps;
    }

    let synth_cfg = SyntheticConfig {
        camera_fps: cli.camera_fps.or(file.camera_fps).unwrap_or(30),
        jitter_pct: cli.jitter_pct.or(file.jitter_pct).unwrap_or(0),
        ..Default::default()
    };

    let params = SessionParams {
        video: (!cli.no_video).then_some(VideoStreamParams {
            width: synth_cfg.width,
            height: synth_cfg.height,
        }),
        audio: (!cli.no_audio).then_some(AudioStreamParams::s16(
            synth_cfg.channels,
            synth_cfg.sample_rate,
            // The synthetic microphone delivers planar blocks.
            false,
        )),
    };

    tracing::info!(
        duration_s = cli.duration,
        camera_fps = synth_cfg.camera_fps,
        jitter_pct = synth_cfg.jitter_pct,
        target_fps = ?stream_cfg.target_fps,
        "starting synthetic capture"
    );

    let mut session = CaptureSession::open(
        SyntheticBackend::boxed(synth_cfg.clone()),
        params,
        stream_cfg,
    )?;

    let video_index = session.stream_info().video_index;
    let audio_index = session.stream_info().audio_index;

    let mut wav_sink = None;
    let mut video_sink = None;
    if let Some(dir) = &cli.output_dir {
        fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
        if audio_index.is_some() {
            wav_sink = Some(WavSink::create(
                &dir.join("audio.wav"),
                synth_cfg.channels,
                synth_cfg.sample_rate,
            )?);
        }
        if video_index.is_some() {
            let name = format!("video_{}x{}.gray", synth_cfg.width, synth_cfg.height);
            video_sink = Some(RawVideoSink::create(&dir.join(name))?);
        }
    }

    let deadline = Instant::now() + Duration::from_secs(cli.duration);
    let mut last_stats = Instant::now();
    let mut video_rate = FpsTracker::new();

    while Instant::now() < deadline {
        let packet = match session.read_packet() {
            Ok(packet) => packet,
            Err(ReadError::Closed) => break,
            Err(e) => {
                tracing::error!(error = %e, "packet read failed");
                continue;
            }
        };

        if Some(packet.stream_index) == video_index {
            if let Some(fps) = video_rate.tick() {
                tracing::debug!("video emission rate: {:.1} fps", fps);
            }
            if let Some(sink) = video_sink.as_mut() {
                sink.write_packet(&packet)?;
            }
        } else if let Some(sink) = wav_sink.as_mut() {
            sink.write_packet(&packet)?;
        }

        if last_stats.elapsed() >= STATS_INTERVAL {
            log_snapshot(&session.metrics().snapshot());
            last_stats = Instant::now();
        }
    }

    session.close();
    log_snapshot(&session.metrics().snapshot());

    if let Some(sink) = video_sink {
        let frames = sink.finalize()?;
        tracing::info!(frames, "video file finalized");
    }
    if let Some(sink) = wav_sink {
        sink.finalize()?;
        tracing::info!("wav file finalized");
    }

    Ok(())
}

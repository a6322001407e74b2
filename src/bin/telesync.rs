use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use telesync::{
    ActivitySource as _, JsonActivitySource, Pipeline, PipelineConfig, PipelineInput,
    RequestContext, build_trackpoints, is_tool_available, parse_instant, probe_video,
    spawn_retention_sweep, sweep_once, validate_activity_id,
};

#[derive(Parser, Debug)]
#[command(name = "telesync", version, about = "Overlay activity telemetry onto video")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Composite the full overlay onto a video (requires `ffmpeg` and `ffprobe` on PATH).
    Process(JobArgs),
    /// Render a short, low-quality preview of the overlay.
    Preview(JobArgs),
    /// Locate the video on the activity and print the trackpoint nearest to its start.
    Sync(JobArgs),
    /// Print the metadata extracted from a video.
    Probe(ProbeArgs),
    /// Delete expired files from the output directory once.
    Sweep(SweepArgs),
}

#[derive(Args, Debug)]
struct ToolArgs {
    /// Transient directory for overlay frames.
    #[arg(long)]
    overlay_dir: Option<PathBuf>,

    /// Directory receiving composited videos.
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// ffmpeg binary.
    #[arg(long)]
    ffmpeg: Option<PathBuf>,

    /// ffprobe binary.
    #[arg(long)]
    ffprobe: Option<PathBuf>,

    /// Accept a video that starts outside the activity's time range.
    #[arg(long)]
    allow_outside_activity: bool,
}

#[derive(Args, Debug)]
struct JobArgs {
    /// Directory holding `<activity-id>.json` activity documents.
    #[arg(long)]
    activities: PathBuf,

    /// Activity id.
    #[arg(long)]
    activity: String,

    /// Source video.
    #[arg(long)]
    video: PathBuf,

    /// Video start on the activity-local clock, e.g. `2024-05-01 10:00:00`.
    /// Defaults to the capture time recorded in the video.
    #[arg(long)]
    start: Option<String>,

    #[command(flatten)]
    tools: ToolArgs,
}

#[derive(Args, Debug)]
struct ProbeArgs {
    /// Video to inspect.
    #[arg(long)]
    video: PathBuf,

    #[command(flatten)]
    tools: ToolArgs,
}

#[derive(Args, Debug)]
struct SweepArgs {
    /// Remove files at least this many hours old (default 24).
    #[arg(long)]
    max_age_hours: Option<u64>,

    #[command(flatten)]
    tools: ToolArgs,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.cmd {
        Command::Process(args) => cmd_job(args, Job::Process).await,
        Command::Preview(args) => cmd_job(args, Job::Preview).await,
        Command::Sync(args) => cmd_job(args, Job::Sync).await,
        Command::Probe(args) => cmd_probe(args).await,
        Command::Sweep(args) => cmd_sweep(args).await,
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_from_env("TELESYNC_LOG"))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(tools: ToolArgs) -> anyhow::Result<PipelineConfig> {
    let mut cfg = PipelineConfig::from_env()?;
    if let Some(dir) = tools.overlay_dir {
        cfg.overlay_dir = dir;
    }
    if let Some(dir) = tools.output_dir {
        cfg.output_dir = dir;
    }
    if let Some(bin) = tools.ffmpeg {
        cfg.ffmpeg_bin = bin;
    }
    if let Some(bin) = tools.ffprobe {
        cfg.ffprobe_bin = bin;
    }
    if tools.allow_outside_activity {
        cfg.require_video_in_activity = false;
    }
    cfg.validate()?;
    Ok(cfg)
}

fn require_tools(cfg: &PipelineConfig, job: Job) -> anyhow::Result<()> {
    let bins = match job {
        Job::Sync => vec![&cfg.ffprobe_bin],
        Job::Process | Job::Preview => vec![&cfg.ffmpeg_bin, &cfg.ffprobe_bin],
    };
    for bin in bins {
        anyhow::ensure!(
            is_tool_available(bin),
            "'{}' is required but could not be run (is it installed and on PATH?)",
            bin.display()
        );
    }
    Ok(())
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let s = serde_json::to_string_pretty(value).context("serialize result")?;
    println!("{s}");
    Ok(())
}

#[derive(Clone, Copy, Debug)]
enum Job {
    Process,
    Preview,
    Sync,
}

async fn cmd_job(args: JobArgs, job: Job) -> anyhow::Result<()> {
    validate_activity_id(&args.activity)?;
    let video_start = args
        .start
        .as_deref()
        .map(|raw| {
            parse_instant(raw).with_context(|| format!("unrecognized --start timestamp '{raw}'"))
        })
        .transpose()?;
    let cfg = load_config(args.tools)?;

    let data = JsonActivitySource::new(&args.activities)
        .fetch(&args.activity)
        .await?;
    let trackpoints = build_trackpoints(&data.activity, &data.streams)?;
    require_tools(&cfg, job)?;

    let retention = (!matches!(job, Job::Sync)).then(|| {
        spawn_retention_sweep(
            &cfg.output_dir,
            cfg.retention_max_age,
            cfg.retention_interval,
        )
    });
    let pipeline = Pipeline::new(cfg)?;
    let ctx = RequestContext::new(&data.activity.id);

    let cancel = ctx.cancel.clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, cancelling");
            cancel.cancel();
        }
    });

    let input = PipelineInput {
        activity: &data.activity,
        trackpoints: &trackpoints,
        video_path: &args.video,
        video_start,
    };
    let res = match job {
        Job::Process => pipeline.process(&ctx, input).await.map(serde_json::to_value),
        Job::Preview => pipeline.preview(&ctx, input).await.map(serde_json::to_value),
        Job::Sync => pipeline.sync(&ctx, input).await.map(serde_json::to_value),
    };

    interrupt.abort();
    if let Some(retention) = retention {
        retention.shutdown().await;
    }
    print_json(&res?.context("serialize result")?)
}

async fn cmd_probe(args: ProbeArgs) -> anyhow::Result<()> {
    let cfg = load_config(args.tools)?;
    let info = probe_video(&cfg.ffprobe_bin, &args.video).await?;
    print_json(&info)
}

#[derive(Serialize)]
struct SweepReport {
    dir: PathBuf,
    removed: usize,
}

async fn cmd_sweep(args: SweepArgs) -> anyhow::Result<()> {
    let cfg = load_config(args.tools)?;
    let max_age = args
        .max_age_hours
        .map(|h| std::time::Duration::from_secs(h.saturating_mul(3600)))
        .unwrap_or(cfg.retention_max_age);
    let removed = sweep_once(&cfg.output_dir, max_age).await;
    print_json(&SweepReport {
        dir: cfg.output_dir,
        removed,
    })
}

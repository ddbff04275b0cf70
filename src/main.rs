use clap::{Parser, ValueEnum};
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::sync::atomic::Ordering;

use ringmark::detection::build_standard_pipeline;
use ringmark::{
    AnalysisScheduler, Config, EventSink, ImageSequenceSource, JsonLinesSink, LogSink,
    MarkerAnalyzer, MarkerCatalog, MarkerDetector, Runner, Stabilizer,
};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SinkKind {
    /// One JSON object per event
    Json,
    /// Log events only
    Log,
}

#[derive(Parser)]
#[command(name = "ringmark")]
#[command(about = "Detect ring markers in recorded color/depth frames")]
struct Cli {
    /// Directory with color_*.png and matching 16-bit depth_*.png frames
    #[arg(value_name = "FRAMES_DIR")]
    frames_dir: PathBuf,

    /// JSON config file (missing fields use defaults)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// JSON marker catalog, e.g. {"1": "Chair"}; overrides the config's catalog
    #[arg(long, value_name = "FILE")]
    catalog: Option<PathBuf>,

    /// Where events go
    #[arg(long, value_enum, default_value_t = SinkKind::Json)]
    sink: SinkKind,

    /// Write JSON events to this file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Meters per raw depth unit
    #[arg(long, default_value_t = 0.001)]
    depth_scale: f32,

    /// Override the per-marker cooldown in seconds
    #[arg(long)]
    cooldown: Option<f64>,

    /// Stop after this many analyzed frames
    #[arg(long)]
    max_frames: Option<u64>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Save intermediate preprocessing images to directory (must be empty)
    #[arg(long, value_name = "DIR")]
    debug_out: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(path) = &args.catalog {
        config.catalog = MarkerCatalog::load(path)?;
    }
    if let Some(cooldown) = args.cooldown {
        config.stabilizer.cooldown_secs = cooldown;
    }
    config.validate()?;

    // The only fatal failure: the stream cannot be opened
    let source = ImageSequenceSource::open(&args.frames_dir, args.depth_scale)?;
    log::info!("Opened {} frame(s) from {}", source.len(), args.frames_dir.display());

    let mut preprocessing = build_standard_pipeline(&config.preprocessing);
    if let Some(debug_dir) = args.debug_out {
        preprocessing = preprocessing.with_debug(debug_dir)?;
    }
    log::debug!("Preprocessing: {}", preprocessing.step_names().join(" -> "));

    let detector = MarkerDetector::from_config(&config).with_preprocessing(preprocessing);
    let scheduler = AnalysisScheduler::new().add_analyzer(Box::new(MarkerAnalyzer::new(
        detector,
        Stabilizer::from_params(&config.stabilizer),
    )));

    let sink: Box<dyn EventSink> = match (args.sink, &args.output) {
        (SinkKind::Log, _) => Box::new(LogSink),
        (SinkKind::Json, Some(path)) => Box::new(JsonLinesSink::new(BufWriter::new(File::create(path)?))),
        (SinkKind::Json, None) => Box::new(JsonLinesSink::new(std::io::stdout())),
    };

    let mut runner = Runner::new(Box::new(source), scheduler, sink).with_max_frames(args.max_frames);

    let stop = runner.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("Interrupt received, finishing current frame");
            stop.store(true, Ordering::Relaxed);
        }
    });

    let summary = tokio::task::spawn_blocking(move || runner.run()).await?;

    log::info!(
        "Run finished: {} frame(s) analyzed, {} skipped, {} event(s), {} sink failure(s)",
        summary.frames_analyzed,
        summary.frames_skipped,
        summary.events_emitted,
        summary.sink_failures
    );
    for (name, stats) in &summary.analyzers {
        let rate = if stats.frames_processed == 0 {
            0.0
        } else {
            stats.frames_with_detection as f64 / stats.frames_processed as f64 * 100.0
        };
        log::info!(
            "{}: detected on {} out of {} frames ({:.1}%)",
            name,
            stats.frames_with_detection,
            stats.frames_processed,
            rate
        );
    }

    Ok(())
}

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use mood_tracker::journal::DEFAULT_SOURCE;
use mood_tracker::{
    append_log_entry, ensure_log_file, get_daily_summary, get_recent_entries,
    save_annotated_frame, save_distribution_chart, BackendAvailability, CameraCapture, Capability,
    Config, DailySummary, EmotionAnalyzer, EmotionResult, Frame, LogRecord,
};

/// Max characters of a backend error shown in the status table
const STATUS_DETAIL_CHARS: usize = 200;

/// Source label for detections from image files
const IMAGE_SOURCE: &str = "image";

/// Journal facial emotions from a camera or image files
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file (default: ~/.moodtracker/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emotion log CSV, overriding the config
    #[arg(long, global = true)]
    log: Option<PathBuf>,

    /// Backend priority, comma-separated (e.g. "fer,deepface")
    #[arg(long, global = true, value_delimiter = ',')]
    backends: Option<Vec<String>>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show which emotion backends are available
    Backends,

    /// Analyze one image file and log the result
    Analyze {
        /// Image to analyze (JPEG or PNG)
        image: PathBuf,

        /// Source label written to the log
        #[arg(long, default_value = IMAGE_SOURCE)]
        source: String,

        /// Also write a copy of the image marked with the detected emotion
        #[arg(long, value_name = "OUT")]
        annotate: Option<PathBuf>,
    },

    /// Capture one camera frame, analyze it and log the result
    Capture,

    /// Capture, analyze and log in a loop until Ctrl+C
    Watch {
        /// Seconds between captures
        #[arg(short, long)]
        interval: Option<u64>,

        /// Stop after this many capture attempts
        #[arg(long)]
        max_scans: Option<usize>,

        /// Skip regenerating the chart after each scan
        #[arg(long)]
        no_chart: bool,
    },

    /// Show the daily summary and regenerate the chart
    Summary {
        /// Day to summarise (YYYY-MM-DD, UTC). Defaults to today
        #[arg(short, long)]
        date: Option<NaiveDate>,

        /// Skip regenerating the chart
        #[arg(long)]
        no_chart: bool,
    },

    /// Show the most recent log entries
    Recent {
        /// Number of entries
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Write the default config if missing and print the active config
    Config,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => Config::default_config_path()?,
    };
    let mut config = Config::load(&config_path)?;
    if let Some(log) = &args.log {
        config.log_path = log.clone();
    }
    if let Some(backends) = &args.backends {
        config.backend_priority = backends.clone();
    }
    debug!("Config: {:?}", config);

    match args.command {
        Command::Backends => {
            let availability = BackendAvailability::probe(&config);
            print_backend_status(&availability);
            Ok(())
        }
        Command::Analyze {
            image,
            source,
            annotate,
        } => run_analyze(&config, &image, &source, annotate.as_deref()),
        Command::Capture => run_capture(&config),
        Command::Watch {
            interval,
            max_scans,
            no_chart,
        } => run_watch(
            &config,
            Duration::from_secs(interval.unwrap_or(config.poll_interval_secs).max(1)),
            max_scans,
            !no_chart,
        ),
        Command::Summary { date, no_chart } => run_summary(&config, date, !no_chart),
        Command::Recent { limit } => run_recent(&config, limit.unwrap_or(config.recent_limit)),
        Command::Config => run_config(&config, &config_path),
    }
}

/// Probe backends once and build the analyzer, or explain why we can't
fn build_analyzer(config: &Config) -> Result<EmotionAnalyzer> {
    let availability = BackendAvailability::probe(config);
    match EmotionAnalyzer::new(config, &availability) {
        Ok(analyzer) => Ok(analyzer),
        Err(e) => {
            error!("{}", e);
            eprintln!("\nNo emotion detection backend available.\n");
            print_backend_status(&availability);
            eprintln!("\nStart the DeepFace service (`deepface api`) at {}", config.deepface_url);
            eprintln!(
                "or build with `--features fer` and place the model at {:?}",
                config.fer_model_path
            );
            Err(e.into())
        }
    }
}

fn run_analyze(
    config: &Config,
    image: &Path,
    source: &str,
    annotate: Option<&Path>,
) -> Result<()> {
    ensure_log_file(&config.log_path)?;
    let mut analyzer = build_analyzer(config)?;

    let frame = Frame::open(image)?;
    info!("Analyzing {:?} with {}", image, analyzer.backend_kind());

    match analyzer.analyze(&frame) {
        Some(result) => {
            record_result(config, &result, source)?;
            if let Some(out) = annotate {
                save_annotated_frame(&frame, &result, out)?;
                println!("Annotated: {}", out.display());
            }
            Ok(())
        }
        None => {
            println!("No face detected. Please try again with better lighting.");
            Ok(())
        }
    }
}

fn run_capture(config: &Config) -> Result<()> {
    ensure_log_file(&config.log_path)?;
    let camera = CameraCapture::new(config.capture_command.clone())?;
    let mut analyzer = build_analyzer(config)?;

    let frame = camera.capture().context("Camera capture failed")?;
    match analyzer.analyze(&frame) {
        Some(result) => record_result(config, &result, DEFAULT_SOURCE),
        None => {
            println!("No face detected. Please try again with better lighting.");
            Ok(())
        }
    }
}

fn run_watch(
    config: &Config,
    interval: Duration,
    max_scans: Option<usize>,
    render_chart: bool,
) -> Result<()> {
    ensure_log_file(&config.log_path)?;
    let camera = CameraCapture::new(config.capture_command.clone())?;
    let mut analyzer = build_analyzer(config)?;
    info!("Capture command: {}", camera.command().join(" "));

    let stop_flag = Arc::new(AtomicBool::new(false));
    install_ctrlc_handler(stop_flag.clone());

    println!("\nWatching... Press Ctrl+C to stop.\n");
    info!(
        "Polling every {}s with {}",
        interval.as_secs(),
        analyzer.backend_kind()
    );

    let mut attempts = 0usize;
    let mut logged = 0usize;

    while !stop_flag.load(Ordering::SeqCst) {
        attempts += 1;

        match camera.capture() {
            Ok(frame) => match analyzer.analyze(&frame) {
                Some(result) => {
                    record_result(config, &result, DEFAULT_SOURCE)?;
                    logged += 1;

                    let summary = get_daily_summary(&config.log_path, None)?;
                    println!(
                        "  today: {} scans, mostly {}",
                        summary.total_scans,
                        summary.dominant_emotion.as_deref().unwrap_or("-")
                    );
                    if render_chart {
                        save_distribution_chart(&summary.distribution, &config.chart_path)?;
                    }
                }
                None => debug!("No face in frame {}", attempts),
            },
            Err(e) => warn!("Capture failed: {}", e),
        }

        if max_scans.is_some_and(|max| attempts >= max) {
            break;
        }

        // Sleep in small increments so we can stop quickly
        let mut elapsed = Duration::ZERO;
        let tick = Duration::from_millis(250);
        while elapsed < interval && !stop_flag.load(Ordering::SeqCst) {
            std::thread::sleep(tick);
            elapsed += tick;
        }
    }

    println!("\n--- Watch Summary ---");
    println!("Captures: {}", attempts);
    println!("Logged: {}", logged);
    info!("Watch stopped");
    Ok(())
}

fn run_summary(config: &Config, date: Option<NaiveDate>, render_chart: bool) -> Result<()> {
    let summary = get_daily_summary(&config.log_path, date)?;
    print_summary(&summary);

    // Empty days render the no-data frame
    if render_chart {
        save_distribution_chart(&summary.distribution, &config.chart_path)?;
        println!("\nChart: {}", config.chart_path.display());
    }
    Ok(())
}

fn run_recent(config: &Config, limit: usize) -> Result<()> {
    let recent = get_recent_entries(&config.log_path, limit)?;
    if recent.is_empty() {
        println!("No entries yet. Start by analyzing a photo!");
        return Ok(());
    }
    print_recent(&recent);
    Ok(())
}

fn run_config(config: &Config, config_path: &Path) -> Result<()> {
    if !config_path.exists() {
        config.save(config_path)?;
        info!("Wrote default config to {:?}", config_path);
    }
    println!("# {}", config_path.display());
    println!(
        "{}",
        serde_json::to_string_pretty(config).context("Failed to serialize config")?
    );
    Ok(())
}

fn record_result(config: &Config, result: &EmotionResult, source: &str) -> Result<()> {
    append_log_entry(&config.log_path, result, source)?;
    println!(
        "Logged: {} ({:.1}%)",
        result.dominant_emotion,
        result.confidence * 100.0
    );
    Ok(())
}

fn install_ctrlc_handler(stop_flag: Arc<AtomicBool>) {
    let spawned = std::thread::Builder::new()
        .name("ctrlc".to_string())
        .spawn(move || {
            let rt = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt,
                Err(e) => {
                    warn!("Failed to create signal runtime: {}", e);
                    return;
                }
            };
            rt.block_on(async {
                tokio::signal::ctrl_c().await.ok();
            });
            info!("Received Ctrl+C, stopping...");
            stop_flag.store(true, Ordering::SeqCst);
        });
    if let Err(e) = spawned {
        warn!("Failed to install Ctrl+C handler: {}", e);
    }
}

fn print_backend_status(availability: &BackendAvailability) {
    println!("Backend status:\n");
    for capability in availability.capabilities() {
        match capability {
            Capability::Available(kind) => println!("  - {:<9} available", kind.as_str()),
            Capability::Unavailable { kind, reason } => {
                let detail: String = reason.chars().take(STATUS_DETAIL_CHARS).collect();
                println!("  - {:<9} unavailable ({})", kind.as_str(), detail);
            }
        }
    }
}

fn print_summary(summary: &DailySummary) {
    println!("--- Summary for {} (UTC) ---", summary.target_date);
    if summary.total_scans == 0 {
        println!("No data logged for this day.");
        return;
    }

    println!("Total detections: {}", summary.total_scans);
    if let Some(dominant) = &summary.dominant_emotion {
        println!("Dominant emotion: {}", dominant);
    }
    if let Some(avg) = summary.average_confidence {
        println!("Average confidence: {:.1}%", avg * 100.0);
    }

    println!("\nDistribution:");
    for (emotion, share) in &summary.distribution {
        println!("  {:<10} {:>5.1}%", emotion, share * 100.0);
    }
}

fn print_recent(records: &[LogRecord]) {
    println!("{:<10} {:<10} {:>10}  {}", "time", "emotion", "confidence", "source");
    for record in records {
        println!(
            "{:<10} {:<10} {:>9.1}%  {}",
            record.timestamp.format("%H:%M:%S").to_string(),
            record.emotion,
            record.confidence * 100.0,
            record.source
        );
    }
}

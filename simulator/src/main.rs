use anyhow::Context;
use clap::Parser;
use radarcore::config::{RadarConfig, RadarParameters};
use radarcore::engine::{LibRadarEngine, RadarEngine, SyntheticEngine};
use radarcore::processing::RadarPipeline;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use tokio::runtime::Builder as TokioBuilder;
use tokio::signal;

mod bridge;
mod generator;

use bridge::RecordBridge;
use generator::GeneratorConfig;

#[derive(Parser)]
#[command(author, version, about = "Offline frame driver for the mmWave radar processing core")]
struct Args {
    /// Load radar parameters from a JSON configuration file
    #[arg(long)]
    radar_config: Option<PathBuf>,
    /// Number of synthetic frames to run
    #[arg(long, default_value_t = 8)]
    frames: u64,
    /// Target frame rate (0 = unlimited)
    #[arg(long, default_value_t = 0.0)]
    frame_rate: f64,
    /// Bind the native libradar module at this path instead of using the
    /// built-in synthetic engine
    #[arg(long)]
    engine_lib: Option<PathBuf>,
    /// Keep producing frames until Ctrl+C instead of a fixed count
    #[arg(long, default_value_t = false)]
    stream: bool,
    /// Append a run summary to this report file
    #[arg(long, default_value = "tools/data/radar_run.log")]
    report: PathBuf,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = match args.radar_config.as_ref() {
        Some(path) => RadarConfig::load(path).context("loading radar config")?,
        None => RadarConfig::default(),
    };
    let params = RadarParameters::from_config(&config).context("validating radar parameters")?;

    let engine: Box<dyn RadarEngine> = match args.engine_lib.as_ref() {
        Some(path) => Box::new(LibRadarEngine::load(path).context("binding libradar")?),
        None => Box::new(SyntheticEngine::default()),
    };

    let mut pipeline = RadarPipeline::start(params.clone(), engine, args.frame_rate)
        .context("starting radar pipeline")?;

    let bridge = RecordBridge::serve();
    let generator_config = GeneratorConfig::default();

    let stop = Arc::new(AtomicBool::new(false));
    if args.stream {
        let stop_flag = stop.clone();
        thread::spawn(move || {
            let runtime = TokioBuilder::new_current_thread()
                .enable_all()
                .build()
                .expect("failed to build signal runtime");
            runtime.block_on(async move {
                if signal::ctrl_c().await.is_ok() {
                    stop_flag.store(true, Ordering::SeqCst);
                }
            });
        });
        println!("Streaming frames until Ctrl+C...");
    }

    let mut produced = 0u64;
    let mut rejected = 0u64;
    let mut last_record = None;
    let mut frame_index = 0u64;
    loop {
        if args.stream {
            if stop.load(Ordering::SeqCst) {
                break;
            }
        } else if frame_index >= args.frames {
            break;
        }

        let mut frame = generator::build_frame(&params, &generator_config, frame_index)
            .context("building synthetic frame")?;
        match pipeline.process_frame(&mut frame) {
            Ok(processed) => {
                if let Some(record) = processed.record {
                    bridge.publish(&record, pipeline.stats());
                    last_record = Some(record);
                }
                produced += 1;
            }
            Err(err) => {
                rejected += 1;
                log::warn!("frame {} rejected: {}", frame_index, err);
            }
        }
        frame_index += 1;
    }

    let stats = pipeline.stats();
    let average_ms = stats
        .average_frame_time
        .map(|avg| avg.as_secs_f64() * 1000.0)
        .unwrap_or(0.0);
    println!(
        "Run complete -> frames {}, rejected {}, total {:.3}s, avg {:.3}ms",
        produced,
        rejected,
        stats.total_processing_time.as_secs_f64(),
        average_ms
    );
    if let Some(record) = last_record.as_ref() {
        println!(
            "Last frame {} -> {} points, {} clusters, {} tracked objects",
            record.frame_id,
            record.point_count(),
            record.cluster_count(),
            record.track_count()
        );
    }

    let report = format!(
        "frames={} rejected={} total_time_s={:.3} avg_ms={:.3}\n",
        produced,
        rejected,
        stats.total_processing_time.as_secs_f64(),
        average_ms
    );
    if let Some(parent) = args.report.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&args.report)?;
    file.write_all(report.as_bytes())?;

    pipeline.stop();
    Ok(())
}

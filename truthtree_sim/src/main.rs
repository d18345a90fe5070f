//! TruthTree CLI
//!
//! Build and prune decay trees for a file of events or for generated showers.

use clap::Parser;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;
use truthtree_core::{BuildConfig, OrphanPolicy, SceneOptions};
use truthtree_sim::{
    load_events, BatchSummary, ColumnarEvent, EventRunner, RerunLogger, RunConfig, ShowerGenerator,
    TruthExport,
};

/// TruthTree decay tree builder
#[derive(Parser, Debug)]
#[command(name = "truthtree")]
#[command(about = "Build and prune simulated decay trees", long_about = None)]
struct Args {
    /// Columnar JSON event file
    #[arg(short, long, conflicts_with = "generate")]
    input: Option<String>,

    /// Number of synthetic events to generate instead of reading a file
    #[arg(short, long)]
    generate: Option<usize>,

    /// Master seed for generated events (0 = random from time)
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Produce separate views for the two endcaps
    #[arg(long)]
    split_endcaps: bool,

    /// Mirror the negative endcap onto positive z
    #[arg(long, requires = "split_endcaps")]
    flip: bool,

    /// Orphan hit policy (reject, drop)
    #[arg(long, default_value = "reject")]
    orphans: String,

    /// Skip boundary-to-centroid segments in scenes
    #[arg(long)]
    no_tracks: bool,

    /// Export processed events to a JSON file
    #[arg(long)]
    export: Option<String>,

    /// Also write merge maps as JavaScript (next to the export, or to stdout)
    #[arg(long)]
    js_mergemap: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON output for CI parsing
    #[arg(long)]
    json: bool,

    /// Stream scenes to a Rerun viewer
    #[arg(long)]
    visualize: bool,
}

fn log_to_rerun(logger: &RerunLogger, summary: &BatchSummary) {
    for result in &summary.results {
        logger.set_event(result.index);
        logger.log_stats(&result.stats);
        for view in &result.views {
            if let Some(scene) = &view.scene {
                logger.log_scene(view.label, scene);
            }
        }
        if let Some(reason) = &result.failure_reason {
            logger.log_event(&format!("events/{}", result.index), reason);
        }
    }
}

fn main() {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    if !args.json {
        info!("TruthTree v{}", env!("CARGO_PKG_VERSION"));
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    let orphan_policy: OrphanPolicy = args.orphans.parse().unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        eprintln!("Available policies: reject, drop");
        std::process::exit(1);
    });

    // Determine base seed
    let seed = if args.seed == 0 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(1)
    } else {
        args.seed
    };

    let (events, source, export_seed): (Vec<ColumnarEvent>, String, Option<u64>) =
        match (&args.input, args.generate) {
            (Some(path), _) => match load_events(path) {
                Ok(events) => {
                    info!("Loaded {} events from {}", events.len(), path);
                    (events, path.clone(), None)
                }
                Err(e) => {
                    error!("Failed to read {}: {}", path, e);
                    std::process::exit(1);
                }
            },
            (None, Some(count)) => {
                info!("Generating {} events (seed={})", count, seed);
                let generator = ShowerGenerator::with_defaults(seed);
                (generator.generate_batch(count), "generated".to_string(), Some(seed))
            }
            (None, None) => {
                eprintln!("Error: either --input <file> or --generate <n> is required");
                std::process::exit(1);
            }
        };

    let config = RunConfig {
        build: BuildConfig { orphan_policy },
        scene: SceneOptions {
            draw_tracks: !args.no_tracks,
            ..Default::default()
        },
        split_endcaps: args.split_endcaps,
        flip: args.flip,
        ..Default::default()
    };
    let runner = EventRunner::new(config);
    let summary = runner.run_batch(&events);

    if args.visualize {
        let logger = RerunLogger::new("truthtree");
        if logger.is_enabled() {
            log_to_rerun(&logger, &summary);
        }
    }

    if args.export.is_some() || args.js_mergemap {
        let mut export = TruthExport::new(&source, export_seed)
            .with_endcaps(args.split_endcaps, args.flip);
        export.add_batch(&summary);

        if let Some(path) = &args.export {
            match export.write_to_file(path) {
                Ok(()) => info!("Exported {} events to {}", export.events.len(), path),
                Err(e) => {
                    error!("Failed to write export: {:?}", e);
                    std::process::exit(1);
                }
            }
        }

        if args.js_mergemap {
            match &args.export {
                Some(path) => {
                    let js_path = format!("{}.js", path.trim_end_matches(".json"));
                    if let Err(e) = export.write_js_to_file(&js_path) {
                        error!("Failed to write merge maps: {:?}", e);
                        std::process::exit(1);
                    }
                    info!("Wrote merge maps to {}", js_path);
                }
                None => print!("{}", export.merge_maps_js()),
            }
        }
    }

    // Summary
    let total = summary.total();
    let failed = summary.failed();

    if args.json {
        // JSON output for CI parsing
        let report = serde_json::json!({
            "source": source,
            "total": total,
            "passed": summary.passed(),
            "failed": failed,
            "results": summary.results.iter().map(|r| {
                serde_json::json!({
                    "event": r.index,
                    "passed": r.passed,
                    "tracks": r.stats.input_tracks,
                    "hits": r.stats.input_hits,
                    "retained": r.stats.retained_tracks,
                    "pruned": r.stats.pruned_tracks,
                    "dropped_hits": r.stats.dropped_hits,
                    "max_depth": r.stats.max_depth,
                    "energy": r.stats.total_energy,
                    "failure_reason": r.failure_reason,
                })
            }).collect::<Vec<_>>(),
        });
        match serde_json::to_string_pretty(&report) {
            Ok(text) => println!("{}", text),
            Err(e) => error!("Failed to encode summary: {}", e),
        }
    } else {
        for result in &summary.results {
            if result.passed {
                info!(
                    "✓ event {} | {} tracks -> {} retained | {} hits | {:.3} GeV",
                    result.index,
                    result.stats.input_tracks,
                    result.stats.retained_tracks,
                    result.stats.input_hits,
                    result.stats.total_energy
                );
            }
        }

        info!("");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

        if failed == 0 {
            info!("✅ All {} events processed", total);
        } else {
            error!("❌ {}/{} events failed!", failed, total);
            for result in summary.failures() {
                error!(
                    "  - event {}: {}",
                    result.index,
                    result.failure_reason.as_deref().unwrap_or("unknown")
                );
            }
        }
    }

    // Exit with proper code for CI
    if failed > 0 {
        std::process::exit(1);
    }
}

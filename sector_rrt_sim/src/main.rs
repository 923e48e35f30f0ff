//! Sector RRT scene runner
//!
//! Plans a path through a YAML scene and optionally writes a JSON report.
//!
//! Usage:
//!   cargo run -p sector_rrt_sim -- --config configs/scene.yaml
//!   cargo run -p sector_rrt_sim -- --advisor none --seed 7 --output out/report.json
//!
//! Per-iteration tracing:
//!   RUST_LOG=sector_rrt_algo=trace cargo run -p sector_rrt_sim

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use sector_rrt_algo::path_planning::CancelToken;
use sector_rrt_sim::scene::AdvisorKind;
use sector_rrt_sim::{SceneConfig, SceneRunner};
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Sector-biased RRT planner
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Scene file path
    #[arg(short, long, default_value = "configs/scene.yaml")]
    config: PathBuf,

    /// Override the random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Override the advisor
    #[arg(long, value_enum)]
    advisor: Option<AdvisorKind>,

    /// Override the iteration budget
    #[arg(long)]
    max_iterations: Option<usize>,

    /// Write the JSON report here
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    match run(args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> sector_rrt_sim::Result<bool> {
    let mut scene = SceneConfig::load(&args.config)?;
    if let Some(seed) = args.seed {
        scene.rrt_params.seed = Some(seed);
    }
    if let Some(kind) = args.advisor {
        scene.advisor.kind = kind;
    }
    if let Some(max_iterations) = args.max_iterations {
        scene.rrt_params.max_iterations = max_iterations;
    }
    if let Some(output) = args.output {
        scene.output.report_path = Some(output.to_string_lossy().into_owned());
    }

    let runner = SceneRunner::new(scene);
    cancel_on_signal(runner.cancel_token())?;

    let report = runner.run()?;
    if let Some(ratio) = report.optimality_ratio() {
        info!("Optimality ratio {:.3}", ratio);
    }
    Ok(report.success)
}

/// Cancel planning on SIGINT/SIGTERM
fn cancel_on_signal(token: CancelToken) -> std::io::Result<()> {
    let mut signals = Signals::new([SIGINT, SIGTERM])?;
    std::thread::Builder::new()
        .name("signal-handler".to_string())
        .spawn(move || {
            if let Some(sig) = signals.forever().next() {
                info!("Received signal {}, cancelling", sig);
                token.cancel();
            }
        })?;
    Ok(())
}

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use msgthread::config::{load_config, ManagerConfig};
use msgthread::manager::Manager;
use msgthread::workers::AccumulatorWorker;

/// msgthread-demo - spins up worker threads behind the bi-directional queue
#[derive(Parser)]
#[command(name = "msgthread-demo")]
#[command(author = "Keith Bugeja <keith.bugeja@um.edu.mt>")]
#[command(version = "0.1.0")]
#[command(about = "Demonstrates offloading blocking work onto msgthread workers")]
struct Cli {
    /// Configuration file path. If omitted, a single default accumulator worker runs.
    #[arg(short, long)]
    config: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Number of messages to push through the accumulator worker
    #[arg(short = 'n', long, default_value_t = 100_000)]
    messages: i64,
}

fn main() {
    let cli = Cli::parse();
    msgthread::logging::init_logging(&cli.log_level);

    let config = match cli.config {
        Some(path) => match load_config(&path) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::error!("failed to load config from '{path}': {e}");
                std::process::exit(1);
            }
        },
        None => ManagerConfig::default(),
    };

    tracing::info!(
        heartbeat_interval_ms = config.heartbeat_interval_ms,
        configured_threads = config.threads.len(),
        "starting demo"
    );

    let manager = Arc::new(Manager::new());
    let worker = AccumulatorWorker::spawn("accumulator", &manager);

    for i in 0..cli.messages {
        worker.add(i);
    }

    std::thread::sleep(Duration::from_millis(200));
    worker.report_via_output();
    worker.retrieve_report();

    worker.stop();
    worker.join().expect("worker thread panicked");

    println!("final total: {}", worker.snapshot());
}

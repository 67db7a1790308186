use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use hwsnap::*;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

/// Hardware and OS inventory snapshots with JSON and HTML export.
#[derive(Debug, Parser)]
#[command(name = "hwsnap", version = version::VERSION)]
struct Cli {
    /// Config file (defaults to config.toml in the working directory).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Write the snapshot as pretty JSON to this path.
    #[arg(long, value_name = "PATH")]
    json: Option<PathBuf>,
    /// Write a rendered HTML report to this path.
    #[arg(long, value_name = "PATH")]
    report: Option<PathBuf>,
    /// Hardware-monitor report file to read SPD timings from.
    #[arg(long, value_name = "PATH")]
    spd_report: Option<PathBuf>,
    /// decode-dimms output file to read SPD timings from.
    #[arg(long, value_name = "PATH")]
    decode_dimms: Option<PathBuf>,
    /// Keep running and refresh snapshots on an interval.
    #[arg(long)]
    watch: bool,
    /// Seconds between full refreshes in watch mode.
    #[arg(long, value_name = "SECS")]
    interval_secs: Option<u64>,
    /// Seconds between GPU-only refreshes in watch mode.
    #[arg(long, value_name = "SECS")]
    gpu_interval_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    let mut app_config = config::AppConfig::load(cli.config.as_deref())?;
    if let Some(secs) = cli.interval_secs {
        app_config.gather.interval_secs = secs;
    }
    if let Some(secs) = cli.gpu_interval_secs {
        app_config.gather.gpu_interval_secs = secs;
    }
    if let Some(path) = &cli.spd_report {
        app_config.spd.report_path = Some(path.clone());
    }
    if let Some(path) = &cli.decode_dimms {
        app_config.spd.decode_dimms_path = Some(path.clone());
    }
    // The override variable is resolved once here; collectors only ever
    // see paths.
    if let Some(path) = std::env::var_os("HWSNAP_SPD_REPORT") {
        if !path.is_empty() {
            app_config.spd.env_report_path = Some(PathBuf::from(path));
        }
    }
    app_config.validate()?;

    let aggregator = Arc::new(aggregator::Aggregator::new(app_config.spd.clone()));
    let snapshot = aggregator.gather().await;
    print_summary(&snapshot);

    if let Some(path) = &cli.json {
        export::save_json(&snapshot, path)?;
        tracing::info!(path = %path.display(), "snapshot written");
    }
    if let Some(path) = &cli.report {
        export::save_report(&snapshot, path)?;
        tracing::info!(path = %path.display(), "report written");
    }

    if cli.watch {
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
        let worker_handle = worker::spawn(
            worker::WorkerDeps {
                aggregator: aggregator.clone(),
                shutdown_rx,
            },
            worker::WorkerConfig {
                interval_secs: app_config.gather.interval_secs,
                gpu_interval_secs: app_config.gather.gpu_interval_secs,
                json_path: cli.json.clone(),
                report_path: cli.report.clone(),
            },
        );
        tracing::info!(
            interval_secs = app_config.gather.interval_secs,
            gpu_interval_secs = app_config.gather.gpu_interval_secs,
            "watching"
        );
        wait_for_shutdown().await;
        tracing::info!("Received shutdown signal");
        let _ = shutdown_tx.send(());
        let _ = worker_handle.await;
    }

    Ok(())
}

fn print_summary(snapshot: &models::SystemSnapshot) {
    let os = &snapshot.os;
    println!("{} {} on {}", os.system, os.release, os.node);
    let cpu = &snapshot.cpu;
    match cpu.count_physical {
        Some(cores) => println!(
            "cpu: {} ({} cores / {} threads)",
            cpu.brand, cores, cpu.count_logical
        ),
        None => println!("cpu: {} ({} threads)", cpu.brand, cpu.count_logical),
    }
    let memory = &snapshot.memory;
    println!(
        "memory: {} used of {} ({}%)",
        export::human_bytes(memory.used),
        export::human_bytes(memory.total),
        memory.percent
    );
    if let Some(board) = &snapshot.motherboard_bios.motherboard {
        let label = format!(
            "{} {}",
            board.manufacturer.as_deref().unwrap_or(""),
            board.product.as_deref().unwrap_or("")
        );
        if !label.trim().is_empty() {
            println!("board: {}", label.trim());
        }
    }
    for gpu in &snapshot.gpus {
        let name = gpu.name.as_deref().unwrap_or("unknown");
        match gpu.memory_total_bytes {
            Some(total) => println!(
                "gpu [{}]: {} ({})",
                gpu.source.as_str(),
                name,
                export::human_bytes(total)
            ),
            None => println!("gpu [{}]: {}", gpu.source.as_str(), name),
        }
    }
    println!("network: {} interface(s)", snapshot.network.len());
}

async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        let mut sigterm = match tokio::signal::unix::signal(
            tokio::signal::unix::SignalKind::terminate(),
        ) {
            Ok(s) => s,
            Err(_) => {
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

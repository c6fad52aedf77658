// SPDX-License-Identifier: MPL-2.0

use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tokio::sync::mpsc;

use netstat_monitor::config::{DataPaths, SettingsStore};
use netstat_monitor::history::HistoryLog;
use netstat_monitor::monitor::bandwidth::{SystemCounters, format_speed};
use netstat_monitor::monitor::connection_info::SystemConnectionInfo;
use netstat_monitor::monitor::connectivity::{DEFAULT_ENDPOINT, DEFAULT_TIMEOUT};
use netstat_monitor::monitor::{
    BandwidthEstimator, ByteCounterSource, ConnectionInfoSource, HttpProber, Monitor, Probe,
    ProbeOutcome,
};
use netstat_monitor::notifications::{DesktopNotifier, LogNotifier, Notifier};
use netstat_monitor::presentation::{ConsolePresenter, Presenter};
use netstat_monitor::scheduler::{MonitorHandle, Scheduler};

#[derive(Parser)]
#[command(name = "netstat-monitor", version, about = "Monitor internet connectivity, latency and bandwidth")]
struct Cli {
    /// Directory holding config.json and history.json (default: ~/.netstat-monitor)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the monitoring loop (default)
    Run(RunArgs),
    /// Probe once and print the connection details
    Check(ProbeArgs),
    /// Show the connection history
    History {
        /// Number of entries to show, most recent first
        #[arg(long, default_value_t = 20)]
        limit: usize,
        /// Delete all stored entries
        #[arg(long)]
        clear: bool,
    },
}

#[derive(Args)]
struct ProbeArgs {
    /// URL expected to answer 204 No Content
    #[arg(long, default_value = DEFAULT_ENDPOINT)]
    endpoint: String,
    /// Probe timeout in milliseconds
    #[arg(long, default_value_t = 5000)]
    timeout_ms: u64,
}

impl Default for ProbeArgs {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout_ms: u64::try_from(DEFAULT_TIMEOUT.as_millis()).unwrap_or(5000),
        }
    }
}

#[derive(Args, Default)]
struct RunArgs {
    #[command(flatten)]
    probe: ProbeArgs,
    /// Log connection changes instead of sending desktop notifications
    #[arg(long)]
    no_notify: bool,
}

/// Keys understood by the interactive loop.
enum Key {
    Refresh,
    TogglePause,
    History,
    Quit,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let paths = match cli.data_dir {
        Some(dir) => DataPaths::new(dir),
        None => DataPaths::from_home()?,
    };

    match cli.command.unwrap_or_else(|| Commands::Run(RunArgs::default())) {
        Commands::Run(args) => run(&paths, args).await,
        Commands::Check(args) => check(args).await,
        Commands::History { limit, clear } => {
            let mut history = HistoryLog::open(paths.history_file());
            if clear {
                history.clear()?;
            }
            println!("{}\n\n{}", history.formatted(limit), history.stats());
            Ok(())
        }
    }
}

async fn run(paths: &DataPaths, args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let settings = SettingsStore::open(paths.config_file()).settings().clone();
    let period = settings.check_period();

    let prober = HttpProber::new(
        args.probe.endpoint,
        Duration::from_millis(args.probe.timeout_ms),
    )?;
    let notifier: Box<dyn Notifier + Send> = if args.no_notify {
        Box::new(LogNotifier)
    } else {
        Box::new(DesktopNotifier)
    };

    let monitor = Monitor::new(
        prober,
        SystemConnectionInfo::new(),
        Box::new(SystemCounters::new()),
        notifier,
        HistoryLog::open(paths.history_file()),
        settings,
    );
    let (scheduler, handle) = Scheduler::new(monitor, Box::new(ConsolePresenter), period);

    println!("Keys: [r] refresh  [p] pause/resume  [h] history  [q] quit");
    let controls = tokio::spawn(control_loop(handle, paths.history_file()));
    scheduler.run().await;
    controls.abort();
    Ok(())
}

/// Translate keyboard input and Ctrl-C into scheduler commands.
async fn control_loop(handle: MonitorHandle, history_path: PathBuf) {
    let (keys_tx, mut keys) = mpsc::channel(4);

    // Blocking stdin reads get their own thread so they never hold up shutdown
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            let key = match line.trim() {
                "r" => Key::Refresh,
                "p" => Key::TogglePause,
                "h" => Key::History,
                "q" => Key::Quit,
                _ => continue,
            };
            if keys_tx.blocking_send(key).is_err() {
                break;
            }
        }
    });

    let mut presenter = ConsolePresenter;
    let mut paused = false;
    loop {
        let key = tokio::select! {
            key = keys.recv() => key,
            _ = tokio::signal::ctrl_c() => Some(Key::Quit),
        };

        match key {
            Some(Key::Refresh) => {
                if let Some(snapshot) = handle.refresh_now().await {
                    presenter.alert("Refresh Complete", &format!("Status: {}", snapshot.state));
                }
            }
            Some(Key::TogglePause) => {
                paused = !paused;
                if paused {
                    handle.pause().await;
                } else {
                    handle.resume().await;
                }
            }
            Some(Key::History) => show_history(&mut presenter, &history_path),
            // stdin closed: keep monitoring until Ctrl-C
            None => {
                let _ = tokio::signal::ctrl_c().await;
                handle.shutdown().await;
                return;
            }
            Some(Key::Quit) => {
                handle.shutdown().await;
                return;
            }
        }
    }
}

fn show_history(presenter: &mut impl Presenter, path: &Path) {
    let history = HistoryLog::open(path);
    let message = format!("{}\n\n{}", history.formatted(50), history.stats());
    presenter.alert("Connection History", &message);
}

async fn check(args: ProbeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let prober = HttpProber::new(args.endpoint, Duration::from_millis(args.timeout_ms))?;

    let outcome = prober.check_connection().await;
    if !outcome.is_connected() {
        println!("Status: Disconnected");
        if let ProbeOutcome::Failed(e) = &outcome {
            println!("Reason: {}", e);
        }
        return Ok(());
    }

    println!("Status: Connected");
    match prober.measure_latency().await {
        Some(ms) => println!("Latency: {}ms", ms),
        None => println!("Latency: --"),
    }

    let info = SystemConnectionInfo::new().lookup().await;
    println!("Connection: {}", info.display());
    if let Some(ip) = info.local_ip {
        println!("Local IP: {}", ip);
    }
    if let Some(ip) = prober.external_ip().await {
        println!("External IP: {}", ip);
    }

    let mut counters = SystemCounters::new();
    let mut estimator = BandwidthEstimator::new();
    estimator.sample(counters.read());
    tokio::time::sleep(Duration::from_secs(1)).await;
    let rates = estimator.sample(counters.read());
    println!("Download: {}", format_speed(rates.download_mbps));
    println!("Upload: {}", format_speed(rates.upload_mbps));

    let (sent_gb, received_gb) = counters.total_usage();
    println!("Total sent: {:.2} GB", sent_gb);
    println!("Total received: {:.2} GB", received_gb);
    Ok(())
}

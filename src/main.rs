use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use futures_util::StreamExt;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_stream::wrappers::BroadcastStream;

use memwatch::api::ApiClient;
use memwatch::config::Config;
use memwatch::monitor::Monitor;
use memwatch::types::{AlertEvent, Notice, NoticeLevel, ProcessSample, Snapshot};
use memwatch::view::{self, SortDirection, SortField, ViewParams};
use memwatch::MonitorError;

#[derive(Parser, Debug)]
#[clap(about = "Live terminal dashboard for host process memory/CPU usage")]
struct Args {
    /// Base URL of the monitor backend
    #[clap(long, default_value = "http://127.0.0.1:8000")]
    url: String,

    /// TOML config file with connection/polling/alert settings
    #[clap(long)]
    config: Option<PathBuf>,

    /// HTTP fallback poll interval in milliseconds (500-10000)
    #[clap(long)]
    interval_ms: Option<u64>,

    /// Memory percentage above which a process alerts (1-50)
    #[clap(long)]
    memory_threshold: Option<f32>,

    /// CPU percentage above which a row is highlighted (1-100)
    #[clap(long)]
    cpu_threshold: Option<f32>,

    /// Minimum seconds between repeated alerts for one pid (5-60)
    #[clap(long)]
    debounce_secs: Option<u64>,

    /// Disable threshold alerting entirely
    #[clap(long)]
    no_alerts: bool,

    /// Filter matched against process name, pid, and username
    #[clap(long, default_value = "")]
    filter: String,

    /// Sort field
    #[clap(long, value_enum, default_value = "memory_percent")]
    sort: SortField,

    /// Sort direction
    #[clap(long, value_enum, default_value = "desc")]
    direction: SortDirection,

    /// Show only the top N processes (0 = all)
    #[clap(long, default_value_t = 20)]
    top: usize,

    /// Follow one pid: show its detail line and history under the table
    #[clap(long)]
    select: Option<u32>,

    /// Disable colorized output
    #[clap(long)]
    no_color: bool,

    #[clap(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// Fetch one snapshot over HTTP, print the table, and exit
    Snapshot,
    /// Print a process's recorded memory/CPU history
    History { pid: u32 },
    /// Terminate a process by pid
    Kill {
        pid: u32,
        /// Skip the confirmation prompt
        #[clap(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if args.no_color {
        colored::control::set_override(false);
    }

    let config = build_config(&args)?;
    let view = ViewParams {
        filter: args.filter.clone(),
        sort_field: args.sort,
        direction: args.direction,
        top_n: args.top,
    };

    match args.command.clone() {
        Some(Command::Snapshot) => run_snapshot(&config, &view).await,
        Some(Command::History { pid }) => run_history(&config, pid).await,
        Some(Command::Kill { pid, yes }) => run_kill(config, &view, pid, yes).await,
        None => run_watch(config, view, args.select).await,
    }
}

fn build_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    config.connection.base_url = args.url.clone();
    if let Some(interval_ms) = args.interval_ms {
        config.polling.interval_ms = interval_ms;
    }
    if let Some(threshold) = args.memory_threshold {
        config.alerts.memory_threshold = threshold;
    }
    if let Some(threshold) = args.cpu_threshold {
        config.alerts.cpu_threshold = threshold;
    }
    if let Some(debounce) = args.debounce_secs {
        config.alerts.alert_debounce_secs = debounce;
    }
    if args.no_alerts {
        config.alerts.enable_alerts = false;
    }
    config.clamp();
    Ok(config)
}

async fn run_snapshot(config: &Config, view: &ViewParams) -> Result<()> {
    let api = ApiClient::new(&config.connection.base_url, config.request_timeout())?;
    let payload = api.fetch_snapshot(view.top_n, view.sort_field).await?;
    let snapshot = Snapshot::from_payload(1, payload);
    print_table(&snapshot, view, config);
    Ok(())
}

async fn run_history(config: &Config, pid: u32) -> Result<()> {
    let api = ApiClient::new(&config.connection.base_url, config.request_timeout())?;
    match api.fetch_history(pid).await {
        Ok(points) => {
            if points.is_empty() {
                println!("no history recorded for pid {pid} yet");
                return Ok(());
            }
            println!("{:<20} {:>7} {:>7}", "TIME", "MEM%", "CPU%");
            for point in points {
                println!(
                    "{:<20} {:>7.2} {:>7.2}",
                    format_epoch(point.timestamp),
                    point.memory_percent,
                    point.cpu_percent
                );
            }
            Ok(())
        }
        Err(MonitorError::HistoryNotAvailable) => {
            println!("history is not collected by this backend");
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

async fn run_kill(config: Config, view: &ViewParams, pid: u32, yes: bool) -> Result<()> {
    if !yes && !confirm(&format!("Terminate process {pid}?"))? {
        println!("aborted");
        return Ok(());
    }

    let mut monitor = Monitor::start(config, view)?;
    match monitor.commands.terminate(pid).await {
        Ok(message) => println!("{}", message.green()),
        Err(err) => {
            eprintln!("{}", err.to_string().red());
            monitor.shutdown();
            std::process::exit(1);
        }
    }
    monitor.shutdown();
    Ok(())
}

async fn run_watch(config: Config, view: ViewParams, select: Option<u32>) -> Result<()> {
    let mut monitor = Monitor::start(config.clone(), &view)?;
    if let Some(pid) = select {
        let _ = monitor.session.select(pid);
    }

    let mut snapshots = BroadcastStream::new(monitor.store.subscribe());

    loop {
        tokio::select! {
            frame = snapshots.next() => match frame {
                Some(Ok(snapshot)) => {
                    render(&snapshot, &view, &config, &monitor);
                }
                Some(Err(_)) => {} // lagged behind; next frame catches us up
                None => break,
            },
            Some(alert) = monitor.alerts.recv() => print_alert(&alert),
            Some(notice) = monitor.notices.recv() => print_notice(&notice),
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    monitor.shutdown();
    Ok(())
}

fn render(snapshot: &Arc<Snapshot>, view: &ViewParams, config: &Config, monitor: &Monitor) {
    let state = format!("{:?}", monitor.transport.state()).to_lowercase();
    let channel = if monitor.transport.is_connected() {
        "push".to_string()
    } else {
        format!("polling ({state})")
    };
    let memory = &snapshot.system_memory;
    println!(
        "\n[{}] seq={} mem {:.1}% used ({} / {} MB available) via {}",
        chrono::Local::now().format("%H:%M:%S"),
        snapshot.sequence,
        memory.percent(),
        memory.available / (1024 * 1024),
        memory.total / (1024 * 1024),
        channel
    );
    print_table(snapshot, view, config);

    if let Some(pid) = monitor.session.selected() {
        let history = monitor.session.history();
        match snapshot.processes.iter().find(|p| p.pid == pid) {
            Some(p) => println!(
                "selected: {} (pid {}) user={} status={} started={} history_points={}",
                p.name, p.pid, p.username, p.status, p.start_time,
                history.len()
            ),
            None => println!("selected: pid {pid} (not in current snapshot)"),
        }
    }
}

fn print_table(snapshot: &Snapshot, view: &ViewParams, config: &Config) {
    let rows = view::project(snapshot, view);
    println!(
        "{:<8} {:<22} {:<12} {:<10} {:>9} {:>7} {:>7}",
        "PID", "NAME", "USER", "STATUS", "RSS_MB", "MEM%", "CPU%"
    );
    for p in rows {
        println!("{}", format_row(&p, config));
    }
}

fn format_row(p: &ProcessSample, config: &Config) -> String {
    let mem = format!("{:>7.2}", p.memory_percent);
    let mem = if p.memory_percent > config.alerts.memory_threshold {
        mem.red().to_string()
    } else {
        mem
    };
    let cpu = format!("{:>7.2}", p.cpu_percent);
    let cpu = if p.cpu_percent > config.alerts.cpu_threshold {
        cpu.yellow().to_string()
    } else {
        cpu
    };
    format!(
        "{:<8} {:<22} {:<12} {:<10} {:>9.1} {} {}",
        p.pid,
        truncate(&p.name, 22),
        truncate(&p.username, 12),
        truncate(&p.status, 10),
        p.memory_rss_mb,
        mem,
        cpu
    )
}

fn print_alert(alert: &AlertEvent) {
    println!(
        "{}",
        format!(
            "ALERT: {} (pid {}) is using {:.2}% of memory",
            alert.name, alert.pid, alert.memory_percent
        )
        .red()
        .bold()
    );
}

fn print_notice(notice: &Notice) {
    let line = format!("notice: {}", notice.message);
    match notice.level {
        NoticeLevel::Error => eprintln!("{}", line.red()),
        NoticeLevel::Warning => eprintln!("{}", line.yellow()),
        NoticeLevel::Info => eprintln!("{line}"),
    }
}

fn confirm(prompt: &str) -> Result<bool> {
    eprint!("{prompt} [y/N] ");
    std::io::stderr().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(matches!(line.trim(), "y" | "Y" | "yes"))
}

fn format_epoch(timestamp: i64) -> String {
    chrono::DateTime::from_timestamp(timestamp, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

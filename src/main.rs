use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use colored::*;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clawtop::core::dashboard::{
    collect_once, default_sources, DashboardRuntime, DEFAULT_SCHEDULER_TICK,
};
use clawtop::ui::dashboard_tui::{run_dashboard, DashboardAppConfig};
use clawtop::ui::{snapshot_sections, SnapshotSection};
use clawtop::{init_logging, DashboardConfig, LogTarget};

fn build_cli() -> Command {
    Command::new("clawtop")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Live terminal dashboard for OpenClaw agents")
        .long_about(
            "Live terminal dashboard for OpenClaw agents\n\n\
             Paths come from OPENCLAW_DIR, WORKSPACE_DIR (or OPENCLAW_WORKSPACE) and OPENCLAW_AGENT.\n\n\
             KEYS:\n    q, Esc, Ctrl+C    Quit\n    r                 Refresh every source now\n    ?                 Toggle help",
        )
        .arg(
            Arg::new("interval")
                .long("interval")
                .value_name("SOURCE=SECS")
                .help("Override a source's refresh interval, e.g. sessions=15 (repeatable)")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("tick-ms")
                .long("tick-ms")
                .value_name("MS")
                .help("Screen redraw interval in milliseconds")
                .value_parser(clap::value_parser!(u64).range(10..))
                .default_value("1000"),
        )
        .arg(
            Arg::new("once")
                .long("once")
                .help("Collect every source once, print a text snapshot and exit")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("log-file")
                .long("log-file")
                .value_name("PATH")
                .help("Append log records to this file while the dashboard runs")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Log at debug level")
                .action(ArgAction::SetTrue),
        )
}

fn main() -> Result<()> {
    let matches = build_cli().get_matches();

    let once = matches.get_flag("once");
    let verbose = matches.get_flag("verbose");
    let log_target = match matches.get_one::<PathBuf>("log-file") {
        Some(path) => LogTarget::File(path.clone()),
        None if once => LogTarget::Stderr,
        None => LogTarget::Disabled,
    };
    init_logging(log_target, verbose).context("Failed to initialize logging")?;

    let config = load_config(&matches)?;

    if once {
        run_once(&config)
    } else {
        run_tui(&config, &matches)
    }
}

fn load_config(matches: &ArgMatches) -> Result<DashboardConfig> {
    let mut config = DashboardConfig::from_env().context("Failed to resolve configuration")?;

    if let Some(overrides) = matches.get_many::<String>("interval") {
        for arg in overrides {
            config
                .intervals
                .apply_override(arg)
                .with_context(|| format!("Invalid --interval '{}'", arg))?;
        }
    }

    config.validate().context("Invalid configuration")?;
    log::info!(
        "OpenClaw dir {}, agent '{}'",
        config.openclaw_dir.display(),
        config.agent_id
    );
    Ok(config)
}

const INTERRUPT_POLL: Duration = Duration::from_millis(100);

fn run_once(config: &DashboardConfig) -> Result<()> {
    let interrupted = Arc::new(AtomicBool::new(false));
    let interrupted_clone = interrupted.clone();
    ctrlc::set_handler(move || {
        interrupted_clone.store(true, Ordering::SeqCst);
    })
    .map_err(|e| anyhow::anyhow!("Failed to set Ctrl+C handler: {}", e))?;

    let sources = default_sources(config)?;
    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name("collect-once".to_string())
        .spawn(move || {
            let _ = tx.send(collect_once(sources));
        })
        .context("Failed to start collection thread")?;

    let Some(collected) = await_collection(&rx, &interrupted)? else {
        log::info!("Interrupted before collection finished");
        return Ok(());
    };
    let cache = collected.context("Failed to collect metrics")?;

    let now_ms = chrono::Utc::now().timestamp_millis();
    for section in snapshot_sections(&cache.get_all(), now_ms, config.ascii_sparklines) {
        print_section(&section);
    }
    Ok(())
}

/// Wait for the collection thread, giving up as soon as Ctrl+C is seen.
/// Fetches left running are abandoned with the process.
fn await_collection<T>(rx: &Receiver<T>, interrupted: &AtomicBool) -> Result<Option<T>> {
    loop {
        if interrupted.load(Ordering::SeqCst) {
            return Ok(None);
        }
        match rx.recv_timeout(INTERRUPT_POLL) {
            Ok(value) => return Ok(Some(value)),
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                anyhow::bail!("Collection thread exited without a result")
            }
        }
    }
}

fn print_section(section: &SnapshotSection) {
    let title = section.source_id.to_uppercase();
    match section.status.as_deref() {
        None => println!("{}", title.bold().cyan()),
        Some("loading") => println!("{} {}", title.bold().cyan(), "(loading)".dimmed()),
        Some(status) if status.starts_with("stale") => {
            println!("{} {}", title.bold().cyan(), format!("({})", status).yellow())
        }
        Some(status) => println!("{} {}", title.bold().cyan(), format!("({})", status).red()),
    }

    if let Some(error) = &section.error {
        println!("  {}", error.red().dimmed());
    }
    for line in &section.lines {
        println!("  {}", line);
    }
    println!();
}

fn run_tui(config: &DashboardConfig, matches: &ArgMatches) -> Result<()> {
    let tick_ms = matches.get_one::<u64>("tick-ms").copied().unwrap_or(1000);

    // Raw mode delivers Ctrl+C as a key; the handler covers signals sent
    // before the terminal is set up or from outside.
    let interrupted = Arc::new(AtomicBool::new(false));
    let interrupted_clone = interrupted.clone();
    ctrlc::set_handler(move || {
        interrupted_clone.store(true, Ordering::SeqCst);
    })
    .map_err(|e| anyhow::anyhow!("Failed to set Ctrl+C handler: {}", e))?;

    let sources = default_sources(config)?;
    let runtime = DashboardRuntime::start(sources, DEFAULT_SCHEDULER_TICK)
        .context("Failed to start refresh scheduler")?;

    let app_config = DashboardAppConfig {
        tick_ms,
        ascii_sparklines: config.ascii_sparklines,
    };
    let result = run_dashboard(&runtime, app_config, &interrupted);

    runtime.shutdown();
    result.context("Dashboard failed")
}

use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::{info, warn};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use threadlab::CancellationToken;
use threadlab::demos::{
    self, CallReport, CounterReport, FlagReport, InterruptReport, JoinReport, OnceReport, ReadMode, SleepOutcome,
    SleepReport, SpawnReport, WaitReport,
};

mod cli;
mod config;

use cli::Cli;
use cli::commands::Commands;
use config::Config;

fn setup_logging(config: &Config) -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("threadlab")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("threadlab.log");

    // Setup env_logger with file output
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    let default_filter = config.log_level.as_deref().unwrap_or("info");
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

/// Print a report as JSON or through its human-readable renderer
fn emit<T: Serialize>(cli: &Cli, report: &T, render: impl FnOnce(&T)) -> Result<()> {
    if cli.json {
        println!("{}", serde_json::to_string_pretty(report).context("Failed to serialize report")?);
    } else {
        render(report);
    }
    Ok(())
}

fn run_application(cli: &Cli, config: &Config) -> Result<()> {
    info!("Starting application");

    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
    }

    match &cli.command {
        None => handle_wait_command(cli, config, false, true, None, None),
        Some(Commands::Wait {
            racy,
            both,
            producer_ms,
            consumer_ms,
        }) => handle_wait_command(cli, config, *racy, *both, *producer_ms, *consumer_ms),
        Some(Commands::Interrupt { after_ms }) => handle_interrupt_command(cli, config, *after_ms),
        Some(Commands::Sleep { no_cancel, dir }) => handle_sleep_command(cli, config, *no_cancel, dir.as_ref()),
        Some(Commands::Join) => handle_join_command(cli, config),
        Some(Commands::Spawn { count }) => handle_spawn_command(cli, config, *count),
        Some(Commands::Call) => handle_call_command(cli, config),
        Some(Commands::Counter { strategy, threads }) => {
            let threads = config.counter_threads(*threads)?;
            let report = demos::counter::count(*strategy, threads, config.counter.increments)
                .context("Counter demo failed")?;
            emit(cli, &report, render_counter)
        }
        Some(Commands::Flag) => {
            let report = demos::flag::spin_until_stopped(Duration::from_millis(config.flag.run_ms))
                .context("Flag demo failed")?;
            emit(cli, &report, render_flag)
        }
        Some(Commands::Once { unguarded, threads }) => {
            let threads = config.once_threads(*threads)?;
            let report = demos::once::race_to_init(
                Commands::init_mode(*unguarded),
                threads,
                Duration::from_millis(config.once.init_delay_ms),
            )
            .context("Once demo failed")?;
            emit(cli, &report, render_once)
        }
    }
}

fn handle_wait_command(
    cli: &Cli,
    config: &Config,
    racy: bool,
    both: bool,
    producer_ms: Option<u64>,
    consumer_ms: Option<u64>,
) -> Result<()> {
    let timing = config.wait.timing_with(producer_ms, consumer_ms);
    if !timing.consumer_first() {
        warn!("Consumer delay is not shorter than producer delay; the race will not show");
        println!(
            "{}",
            "Consumer runs after the producer: the racy read will see the value".yellow()
        );
    }

    let modes = match (racy, both) {
        (_, true) => vec![ReadMode::Racy, ReadMode::Rendezvous],
        (true, false) => vec![ReadMode::Racy],
        (false, false) => vec![ReadMode::Rendezvous],
    };

    let token = CancellationToken::new();
    let mut reports = Vec::with_capacity(modes.len());
    for mode in modes {
        let report = demos::wait_notify::run(mode, &timing, &token).context(format!("{} wait demo failed", mode))?;
        reports.push(report);
    }

    emit(cli, &reports, |reports| reports.iter().for_each(render_wait))
}

fn handle_interrupt_command(cli: &Cli, config: &Config, after_ms: Option<u64>) -> Result<()> {
    let after = Duration::from_millis(after_ms.unwrap_or(config.interrupt.interrupt_after_ms));
    let report = demos::interrupt::count_until_interrupted(
        config.interrupt.limit,
        Duration::from_micros(config.interrupt.step_us),
        after,
    )
    .context("Interrupt demo failed")?;
    emit(cli, &report, render_interrupt)
}

fn handle_sleep_command(cli: &Cli, config: &Config, no_cancel: bool, dir: Option<&PathBuf>) -> Result<()> {
    let dir = dir.unwrap_or(&config.sleep.scratch_dir);
    let cancel_after = if no_cancel {
        None
    } else {
        config.sleep.cancel_after_ms.map(Duration::from_millis)
    };
    let report = demos::sleep::sleep_with_cleanup(
        dir,
        config.sleep.files,
        Duration::from_millis(config.sleep.sleep_ms),
        cancel_after,
    )
    .context(format!("Sleep demo failed in {}", dir.display()))?;
    emit(cli, &report, render_sleep)
}

fn handle_join_command(cli: &Cli, config: &Config) -> Result<()> {
    let report =
        demos::lifecycle::join_worker(Duration::from_millis(config.join.delay_ms)).context("Join demo failed")?;
    emit(cli, &report, render_join)
}

fn handle_spawn_command(cli: &Cli, config: &Config, count: usize) -> Result<()> {
    let report =
        demos::lifecycle::spawn_from_factory(&config.join.spawn_prefix, count).context("Spawn demo failed")?;
    emit(cli, &report, render_spawn)
}

fn handle_call_command(cli: &Cli, config: &Config) -> Result<()> {
    let report = demos::lifecycle::call_with_result(Duration::from_millis(config.join.delay_ms), "Hello from callable")
        .context("Call demo failed")?;
    emit(cli, &report, render_call)
}

fn render_wait(report: &WaitReport) {
    let label = format!("[{}]", report.mode);
    match &report.observed {
        Some(value) => println!("{} name is {} ({}ms)", label.green(), value, report.consumer_elapsed_ms),
        None => println!(
            "{} name is {} ({}ms)",
            label.red(),
            "<absent>".red(),
            report.consumer_elapsed_ms
        ),
    }
}

fn render_interrupt(report: &InterruptReport) {
    if report.interrupted {
        println!("{} after {} of {} steps", "Interrupted!".yellow(), report.counted, report.limit);
    } else {
        println!("{} all {} steps", "Finished".green(), report.limit);
    }
}

fn render_sleep(report: &SleepReport) {
    match report.outcome {
        SleepOutcome::Completed => println!(
            "{} processed {} file(s) after {}ms",
            "Completed:".green(),
            report.processed,
            report.elapsed_ms
        ),
        SleepOutcome::Cancelled => println!(
            "{} removed {} of {} file(s) after {}ms",
            "Cancelled:".yellow(),
            report.removed,
            report.created,
            report.elapsed_ms
        ),
    }
}

fn render_join(report: &JoinReport) {
    for event in &report.events {
        println!("{}", event);
    }
}

fn render_spawn(report: &SpawnReport) {
    for name in &report.names {
        println!("Thread {} start!", name.cyan());
    }
}

fn render_call(report: &CallReport) {
    println!("{} ({}ms)", report.value, report.elapsed_ms);
}

fn render_counter(report: &CounterReport) {
    let line = format!("[{}] x = {} (expected {})", report.strategy, report.actual, report.expected);
    if report.lost() == 0 {
        println!("{}", line.green());
    } else {
        println!("{} {} lost", line.red(), report.lost());
    }
}

fn render_flag(report: &FlagReport) {
    println!("{} after {} spins", "Stopped".green(), report.spins);
}

fn render_once(report: &OnceReport) {
    println!(
        "{} threads, {} initialization(s), {} instance(s) kept",
        report.threads, report.initializations, report.distinct_instances
    );
}

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    setup_logging(&config).context("Failed to setup logging")?;

    info!("Starting with config from: {:?}", cli.config);

    // Run the main application logic
    run_application(&cli, &config).context("Application failed")?;

    Ok(())
}

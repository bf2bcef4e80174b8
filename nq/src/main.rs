//! nq - run workloads through a keyed task queue

use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use tracing::{debug, info};

use namedqueue::cli::{Cli, Command, OutputFormat};
use namedqueue::config::Config;
use namedqueue::{NamedQueue, RunReport, SleepProcessor, Workload, run_workload};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level).map(|s| s.to_uppercase()) {
        Some(s) => match s.as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .try_init()
        .map_err(|e| eyre::eyre!("Failed to install subscriber: {}", e))?;

    debug!(?level, "Logging initialized");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Run {
            workload,
            concurrency,
            format,
        } => {
            let mut queue_config = config.queue.clone();
            if let Some(concurrency) = concurrency {
                queue_config.concurrency = concurrency;
            }
            let workload = Workload::load(&workload)?;
            info!(
                jobs = workload.jobs.len(),
                concurrency = queue_config.effective_concurrency(),
                "Running workload"
            );

            let queue = NamedQueue::new(SleepProcessor, queue_config);
            let report = run_workload(&queue, workload).await?;
            print_report(&report, &format)
        }
        Command::Config => {
            print!("{}", serde_yaml::to_string(&config).context("Failed to serialize config")?);
            Ok(())
        }
    }
}

fn print_report(report: &RunReport, format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(report)?);
        }
        OutputFormat::Text => {
            for result in &report.results {
                let key = result.key.as_deref().unwrap_or("<no key>");
                if result.ok {
                    println!("{} {} {}", "✓".green(), key.cyan(), result.message);
                } else {
                    println!("{} {} {}", "✗".red(), key.cyan(), result.message.red());
                }
            }

            let stats = &report.stats;
            println!();
            println!("{}", "Queue statistics".bold());
            println!("  Processed:       {}", stats.total_processed);
            println!("  Duplicate calls: {}", stats.duplicate_task_calls);
            println!("  Max concurrent:  {}", stats.max_concurrent);
            println!("  Avg wait:        {:.1}ms", stats.avg_wait_ms);

            let mut keys: Vec<_> = stats.per_key.iter().collect();
            keys.sort_by(|a, b| a.0.cmp(b.0));
            for (key, key_stats) in keys {
                println!(
                    "  {:<16} runs={} avg={:.1}ms",
                    key.yellow(),
                    key_stats.count,
                    key_stats.avg_processing_ms
                );
            }
        }
    }
    Ok(())
}

use clap::{ArgAction, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use link_health::cache::LinkHealthCache;
use link_health::config::{ConfigLoader, MonitorConfig};
use link_health::metrics::snapshot::MetricsSnapshot;
use link_health::probe::HttpProbe;
use link_health::scheduler::CheckScheduler;
use link_health::stats::summarize;
use link_health::{server, target::TargetProvider};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "link-health")]
#[command(version = "0.1.0")]
#[command(
    about = "Concurrent link health monitor with a stale-while-revalidate cache",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve cached check results over HTTP
    Serve {
        /// Path to the configuration file (JSON/YAML/TOML)
        #[arg(short, long)]
        config: PathBuf,

        /// Base URL for relative targets (overrides the config)
        #[arg(long)]
        base_url: Option<String>,

        /// Maximum simultaneous probes (overrides the config)
        #[arg(long)]
        concurrency: Option<usize>,
    },
    /// Run one check cycle and write the report
    Run {
        /// Path to the configuration file (JSON/YAML/TOML)
        #[arg(short, long)]
        config: PathBuf,

        /// Base URL for relative targets (overrides the config)
        #[arg(long)]
        base_url: Option<String>,

        /// Maximum simultaneous probes (overrides the config)
        #[arg(long)]
        concurrency: Option<usize>,

        /// Show progress bars on stderr (`--progress false` to disable)
        #[arg(short, long, action = ArgAction::Set, default_value_t = true)]
        progress: bool,
    },
    /// Validate a configuration file
    Check {
        /// Path to the configuration file
        #[arg(short, long)]
        config: PathBuf,
    },
}

fn load_config(path: &Path, concurrency: Option<usize>) -> anyhow::Result<MonitorConfig> {
    log::info!("Loading config from {:?}", path);
    let mut config = ConfigLoader::load(path)?;
    if let Some(concurrency) = concurrency {
        config.concurrency = concurrency.max(1);
    }
    log::info!("Loaded monitor: {} ({} targets)", config.name, config.targets.len());
    Ok(config)
}

fn init_plain_logger(logger: env_logger::Logger) -> anyhow::Result<()> {
    let filter = logger.filter();
    log::set_boxed_logger(Box::new(logger))?;
    log::set_max_level(filter);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if std::env::var("RUST_LOG").is_err() {
        unsafe { std::env::set_var("RUST_LOG", "info"); }
    }
    let cli = Cli::parse();
    let logger = env_logger::Builder::from_default_env().build();
    let multi = Arc::new(indicatif::MultiProgress::new());

    match cli.command {
        Commands::Serve { config, base_url, concurrency } => {
            init_plain_logger(logger)?;

            let config_data = load_config(&config, concurrency)?;
            let provider = ConfigLoader::create_provider(&config_data, base_url.as_deref())?;
            let probe = HttpProbe::new(ConfigLoader::request_timeout(&config_data))?;
            let cache = LinkHealthCache::new(
                Arc::new(provider),
                Arc::new(probe),
                CheckScheduler::new(config_data.concurrency, None),
                ConfigLoader::staleness(&config_data),
            );

            let _refresh_task = config_data
                .refresh_interval_secs
                .map(|secs| cache.spawn_periodic_refresh(Duration::from_secs(secs)));

            let listener = tokio::net::TcpListener::bind(&config_data.bind).await?;
            server::serve(listener, cache).await?;
        }
        Commands::Run { config, base_url, concurrency, progress } => {
            if progress {
                let filter = logger.filter();
                indicatif_log_bridge::LogWrapper::new((*multi).clone(), logger).try_init()?;
                log::set_max_level(filter);
            } else {
                init_plain_logger(logger)?;
            }

            let config_data = load_config(&config, concurrency)?;
            let provider = ConfigLoader::create_provider(&config_data, base_url.as_deref())?;
            let probe = Arc::new(HttpProbe::new(ConfigLoader::request_timeout(&config_data))?);
            let scheduler = CheckScheduler::new(config_data.concurrency, None);
            let mut output =
                ConfigLoader::create_output(&config_data, progress.then(|| multi.clone()))?;

            let mut progress_bar: Option<ProgressBar> = None;
            let mut _progress_task = None;
            if progress {
                let pb = multi.add(ProgressBar::new(provider.len() as u64));
                pb.set_style(ProgressStyle::default_bar()
                    .template(
                        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] \
                         {pos}/{len} ({eta}) {msg}",
                    )?
                    .progress_chars("#>-"));

                let mut metrics_rx = scheduler.watch_metrics();
                let pb_clone = pb.clone();
                progress_bar = Some(pb);
                _progress_task = Some(tokio::spawn(async move {
                    while metrics_rx.changed().await.is_ok() {
                        let snapshot: MetricsSnapshot = metrics_rx.borrow().clone();
                        pb_clone.set_position(snapshot.probes_completed);
                        pb_clone.set_message(format!(
                            "In flight: {} | Broken: {} | Avg: {}ms",
                            snapshot.probes_in_flight,
                            snapshot.probes_broken,
                            snapshot.avg_response_time_ms
                        ));
                    }
                }));
            }

            log::info!("Starting link check...");
            let results = scheduler.check_all(provider.list_targets()?, probe).await;
            let stats = summarize(&results);

            if let Some(task) = _progress_task {
                task.abort();
            }
            if let Some(pb) = progress_bar {
                pb.set_style(ProgressStyle::default_bar()
                    .template("✅ [{elapsed_precise}] [{bar:40.green/blue}] {pos}/{len} {msg}")?
                    .progress_chars("#>-"));
                pb.finish_with_message(format!(
                    "Broken: {} | Avg: {:.1}ms - Completed",
                    stats.broken, stats.avg_response_time
                ));
            }

            for result in &results {
                output.write(result).await?;
            }
            output.close(&stats).await?;

            println!("\n✅ Link Check Completed:");
            println!("   Links Checked: {}", stats.total);
            println!("   Healthy: {}", stats.healthy);
            println!("   Redirected: {}", stats.redirected);
            println!("   Broken: {}", stats.broken);
            println!("   Average Response Time: {:.1}ms", stats.avg_response_time);

            if stats.broken > 0 {
                std::process::exit(1);
            }
        }
        Commands::Check { config } => {
            match ConfigLoader::load(&config).and_then(|cfg| {
                let targets = ConfigLoader::resolve_targets(&cfg, None)?;
                Ok((cfg, targets))
            }) {
                Ok((cfg, targets)) => {
                    println!("✅ Config is valid:");
                    println!("   Name: {}", cfg.name);
                    println!("   Targets: {}", targets.len());
                    println!("   Concurrency: {}", cfg.concurrency);
                    println!("   Request timeout: {}ms", cfg.request_timeout_ms);
                    println!("   Staleness: {}s", cfg.staleness_secs);
                }
                Err(e) => {
                    eprintln!("❌ Config error: {}", e);
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_progress(args: &[&str]) -> bool {
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Commands::Run { progress, .. } => progress,
            _ => panic!("expected the run command"),
        }
    }

    #[test]
    fn progress_defaults_on_and_can_be_disabled() {
        assert!(run_progress(&["link-health", "run", "-c", "links.yaml"]));
        assert!(run_progress(&["link-health", "run", "-c", "links.yaml", "--progress", "true"]));
        assert!(!run_progress(&["link-health", "run", "-c", "links.yaml", "--progress", "false"]));
    }
}

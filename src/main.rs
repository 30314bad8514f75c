use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use circle_signals::config::{DEFAULT_RECENT_LIMIT, DEFAULT_WINDOW_DAYS};
use circle_signals::dashboard::DashboardPeriod;
use circle_signals::models::{DateWindow, Group, Signal};
use circle_signals::report::{self, CircleSection};
use circle_signals::response::SignalsListResponse;
use circle_signals::{
    activity_for_group, dashboard_for_group, recent_signals, rhythms_for_group, signals_for_group,
    PrefetchedStats, SignalConfig, StatsSnapshot,
};

mod db;

#[derive(Parser)]
#[command(name = "circle-signals")]
#[command(about = "Co-activity signals for GitHub commit circles", long_about = None)]
struct Cli {
    /// Trailing days of commit statistics to compare
    #[arg(long, global = true, env = "SIGNAL_WINDOW_DAYS", default_value_t = DEFAULT_WINDOW_DAYS)]
    window_days: i64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load a sample circle with a week of commits
    Seed,
    /// Import daily commit statistics from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Show signals for one circle
    Signals {
        #[arg(long)]
        account: Uuid,
        #[arg(long)]
        circle: Uuid,
        #[arg(long)]
        json: bool,
    },
    /// Show the most recent signals across every circle of an account
    Recent {
        #[arg(long)]
        account: Uuid,
        #[arg(long, env = "SIGNAL_RECENT_LIMIT", default_value_t = DEFAULT_RECENT_LIMIT)]
        limit: usize,
        #[arg(long)]
        json: bool,
    },
    /// Show the weekly commit rhythm of a circle
    Rhythm {
        #[arg(long)]
        account: Uuid,
        #[arg(long)]
        circle: Uuid,
        #[arg(long)]
        json: bool,
    },
    /// Show commit totals for a circle over the last week or this month
    Dashboard {
        #[arg(long)]
        account: Uuid,
        #[arg(long)]
        circle: Uuid,
        /// Cover the current month instead of the trailing window
        #[arg(long)]
        monthly: bool,
        #[arg(long)]
        json: bool,
    },
    /// Show a circle's recent commits, newest first
    Activity {
        #[arg(long)]
        account: Uuid,
        #[arg(long)]
        circle: Uuid,
        #[arg(long)]
        json: bool,
    },
    /// Generate a markdown report
    Report {
        #[arg(long)]
        account: Uuid,
        #[arg(long, env = "SIGNAL_RECENT_LIMIT", default_value_t = DEFAULT_RECENT_LIMIT)]
        limit: usize,
        #[arg(long, default_value = "signals.md")]
        out: PathBuf,
    },
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
}

/// Loads every circle's statistics separately so one failed fetch only costs that circle.
async fn prefetch_stats(pool: &PgPool, groups: &[Group], window: DateWindow) -> PrefetchedStats {
    let mut stats = PrefetchedStats::default();
    for group in groups {
        let members = group.member_keys();
        let batch = db::fetch_commit_stats(pool, &members, window)
            .await
            .map_err(|err| {
                warn!(circle = %group.id, error = %err, "failed to load commit statistics");
                format!("{err:#}")
            });
        stats.insert(members, batch);
    }
    stats
}

async fn load_circle(pool: &PgPool, circle: Uuid) -> anyhow::Result<Group> {
    db::fetch_group(pool, circle)
        .await?
        .with_context(|| format!("circle {circle} not found"))
}

fn print_signals(signals: &[Signal], json: bool) -> anyhow::Result<()> {
    if json {
        let body = serde_json::to_string_pretty(&SignalsListResponse::from(signals))?;
        println!("{body}");
        return Ok(());
    }

    if signals.is_empty() {
        println!("No signals found for this window.");
        return Ok(());
    }

    for signal in signals {
        let peers: Vec<&str> = signal.peers.iter().map(|peer| peer.name.as_str()).collect();
        match signal.group_name.as_deref() {
            Some(circle) => println!(
                "- {} [{}] {} with {} in {}",
                signal.date,
                signal.kind,
                signal.detail,
                peers.join(", "),
                circle
            ),
            None => println!(
                "- {} [{}] {} with {}",
                signal.date,
                signal.kind,
                signal.detail,
                peers.join(", ")
            ),
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a production Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    let today = Utc::now().date_naive();

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let circle_id = db::seed(&pool, today).await?;
            println!("Seed data inserted into circle {circle_id}.");
        }
        Commands::Import { csv } => {
            let imported = db::import_csv(&pool, &csv).await?;
            println!("Imported {imported} commit stat rows from {}.", csv.display());
        }
        Commands::Signals {
            account,
            circle,
            json,
        } => {
            let window = SignalConfig::new(cli.window_days, DEFAULT_RECENT_LIMIT).window_ending(today);
            let group = load_circle(&pool, circle).await?;
            let stats = db::fetch_commit_stats(&pool, &group.member_keys(), window)
                .await
                .context("failed to load commit statistics")?;
            let source = StatsSnapshot::new(stats);
            let signals = signals_for_group(&source, &group, account, window)?;
            info!(circle = %group.id, signals = signals.len(), "circle signals ready");
            print_signals(&signals, json)?;
        }
        Commands::Recent {
            account,
            limit,
            json,
        } => {
            let config = SignalConfig::new(cli.window_days, limit);
            let window = config.window_ending(today);
            let groups = db::fetch_groups_for_account(&pool, account).await?;
            let source = prefetch_stats(&pool, &groups, window).await;
            let signals = recent_signals(&source, &groups, account, window, config.recent_limit)?;
            info!(circles = groups.len(), signals = signals.len(), "recent signals ready");
            print_signals(&signals, json)?;
        }
        Commands::Rhythm {
            account,
            circle,
            json,
        } => {
            let window = SignalConfig::new(cli.window_days, DEFAULT_RECENT_LIMIT).window_ending(today);
            let group = load_circle(&pool, circle).await?;
            let source = prefetch_stats(&pool, std::slice::from_ref(&group), window).await;
            let rhythms = rhythms_for_group(&source, &group, account, window)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&rhythms)?);
            } else {
                println!("Weekly rhythm for {} ({}):", group.name, window);
                for rhythm in &rhythms {
                    println!(
                        "- {} {} across {} active days",
                        rhythm.github_username,
                        rhythm.pattern.label(),
                        rhythm.weekly_rhythm.active_days()
                    );
                }
            }
        }
        Commands::Dashboard {
            account,
            circle,
            monthly,
            json,
        } => {
            let period = if monthly {
                DashboardPeriod::Monthly
            } else {
                DashboardPeriod::Weekly
            };
            let window = period.window(today, cli.window_days);
            let group = load_circle(&pool, circle).await?;
            let source = prefetch_stats(&pool, std::slice::from_ref(&group), window).await;
            let dashboard = dashboard_for_group(&source, &group, account, period, window)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&dashboard)?);
            } else {
                println!("Commits in {} ({}):", group.name, window);
                for stats in std::iter::once(&dashboard.my_stats).chain(&dashboard.peers) {
                    let top_repo = stats
                        .repo_stats
                        .first()
                        .map(|repo| repo.repository.as_str())
                        .unwrap_or("-");
                    println!(
                        "- {} {} commits on {} days (top: {})",
                        stats.github_username,
                        stats.total_commits,
                        stats.daily_stats.len(),
                        top_repo
                    );
                }
            }
        }
        Commands::Activity {
            account,
            circle,
            json,
        } => {
            let window = SignalConfig::new(cli.window_days, DEFAULT_RECENT_LIMIT).window_ending(today);
            let group = load_circle(&pool, circle).await?;
            let source = prefetch_stats(&pool, std::slice::from_ref(&group), window).await;
            let activities = activity_for_group(&source, &group, account, window)?;
            info!(circle = %group.id, items = activities.len(), "activity stream ready");

            if json {
                println!("{}", serde_json::to_string_pretty(&activities)?);
            } else if activities.is_empty() {
                println!("No commits found for this window.");
            } else {
                for item in &activities {
                    println!(
                        "- {} {} pushed {} commits to {}",
                        item.date, item.github_username, item.commit_count, item.repository
                    );
                }
            }
        }
        Commands::Report {
            account,
            limit,
            out,
        } => {
            let config = SignalConfig::new(cli.window_days, limit);
            let window = config.window_ending(today);
            let label = db::fetch_account_label(&pool, account)
                .await?
                .unwrap_or_else(|| account.to_string());
            let groups = db::fetch_groups_for_account(&pool, account).await?;
            let source = prefetch_stats(&pool, &groups, window).await;
            let recent = recent_signals(&source, &groups, account, window, config.recent_limit)?;

            let mut per_circle = Vec::new();
            for group in &groups {
                let signals = signals_for_group(&source, group, account, window);
                let rhythms = rhythms_for_group(&source, group, account, window);
                match (signals, rhythms) {
                    (Ok(signals), Ok(rhythms)) => per_circle.push((group, signals, rhythms)),
                    (Err(err), _) | (_, Err(err)) if err.is_skippable() => {
                        warn!(circle = %group.id, error = %err, "leaving circle out of report");
                    }
                    (Err(err), _) | (_, Err(err)) => return Err(err.into()),
                }
            }

            let sections: Vec<CircleSection<'_>> = per_circle
                .iter()
                .map(|(group, signals, rhythms)| CircleSection {
                    name: &group.name,
                    signals,
                    rhythms,
                })
                .collect();
            let output = report::build_report(&label, window, &recent, &sections);
            std::fs::write(&out, output)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}

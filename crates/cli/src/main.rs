//! Lanekeeper - operator console and composition root
//!
//! Wires the SQLite store, token issuer, auth and notification ports into
//! the queue service and exposes the user/operator operations as
//! subcommands. Every action resolves to a printed message, including the
//! nothing-to-do paths.

mod notifier;
mod settings;

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tabled::{Table, Tabled};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use lanekeeper_core::application::QueueService;
use lanekeeper_core::domain::{LaneId, Ticket, TicketStatus, UserProfile};
use lanekeeper_core::error::AppError;
use lanekeeper_core::port::auth::StaticOperatorSet;
use lanekeeper_core::port::time_provider::SystemTimeProvider;
use lanekeeper_core::port::token_issuer::UuidTokenIssuer;
use lanekeeper_infra_sqlite::{create_pool, run_migrations, SqliteTicketRepository};

use notifier::ConsoleNotifier;
use settings::Settings;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "lanekeeper")]
#[command(about = "Lanekeeper dispatch console", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run migrations, seed the configured lanes and report readiness
    Init,

    /// Join a lane as a user
    Join {
        /// Lane id
        #[arg(short, long)]
        lane: LaneId,

        /// External user id
        #[arg(short, long)]
        user: String,

        /// Display name
        #[arg(short, long, default_value = "")]
        name: String,

        /// Delivery address for dispatch notices (defaults to the user id)
        #[arg(short, long)]
        address: Option<String>,
    },

    /// Withdraw from the queue
    Leave {
        /// External user id
        #[arg(short, long)]
        user: String,
    },

    /// Show the caller's active ticket and waiting rank
    Position {
        /// External user id
        #[arg(short, long)]
        user: String,
    },

    /// List waiting tickets in a lane (operator)
    List {
        /// Lane id
        #[arg(short, long)]
        lane: LaneId,

        /// Maximum tickets to show
        #[arg(long, default_value = "30")]
        limit: i64,
    },

    /// Call the next waiting ticket (operator)
    CallNext {
        /// Lane id
        #[arg(short, long)]
        lane: LaneId,
    },

    /// Mark the longest-called ticket absent (operator)
    NoShow {
        /// Lane id
        #[arg(short, long)]
        lane: LaneId,
    },

    /// Serve the longest-confirmed ticket (operator)
    Serve {
        /// Lane id
        #[arg(short, long)]
        lane: LaneId,
    },

    /// Confirm a called ticket by token (operator)
    Confirm {
        /// Confirmation token
        token: String,

        /// Operator external id presenting the token
        #[arg(short, long, env = "LANEKEEPER_OPERATOR")]
        operator: String,
    },

    /// Created/confirmed counts for a calendar day
    Stats {
        /// Day as YYYY-MM-DD (default: today, UTC)
        #[arg(short, long)]
        day: Option<String>,

        /// Restrict to one lane
        #[arg(short, long)]
        lane: Option<LaneId>,
    },
}

#[derive(Tabled)]
struct WaitingRow {
    #[tabled(rename = "Pos")]
    position: usize,
    #[tabled(rename = "Ticket")]
    ticket_id: i64,
    #[tabled(rename = "User")]
    user_id: i64,
    #[tabled(rename = "Since")]
    since: String,
}

fn init_logging() {
    let log_format = std::env::var("LANEKEEPER_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("lanekeeper=info"))
        .expect("Failed to create env filter");

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty())
                .init();
        }
    }
}

fn format_millis(millis: i64) -> String {
    match DateTime::<Utc>::from_timestamp_millis(millis) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => millis.to_string(),
    }
}

fn colored_status(status: TicketStatus) -> colored::ColoredString {
    let text = status.to_string();
    match status {
        TicketStatus::Waiting => text.yellow(),
        TicketStatus::Called => text.cyan(),
        TicketStatus::Confirmed | TicketStatus::Served => text.green(),
        TicketStatus::Canceled | TicketStatus::NoShow => text.red(),
    }
}

fn describe(ticket: &Ticket) -> String {
    format!(
        "ticket #{} (lane {}, {})",
        ticket.id,
        ticket.lane_id,
        colored_status(ticket.status)
    )
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();
    let settings = Settings::from_env()?;

    info!(version = VERSION, db_path = %settings.db_path, "Starting lanekeeper console");

    let pool = create_pool(&settings.db_path)
        .await
        .context("DB pool creation failed")?;
    run_migrations(&pool).await.context("Migration failed")?;

    // DI wiring
    let repo = Arc::new(SqliteTicketRepository::new(pool));
    let token_issuer = Arc::new(UuidTokenIssuer::new(settings.engine.token_ttl_ms));
    let auth = Arc::new(StaticOperatorSet::new(settings.engine.operators.clone()));
    let service = QueueService::new(
        repo,
        token_issuer,
        Arc::new(ConsoleNotifier),
        auth,
        Arc::new(SystemTimeProvider),
        settings.engine.clone(),
    );

    service.ensure_lanes().await?;

    match cli.command {
        Commands::Init => {
            println!(
                "{} database ready, {} lane(s) seeded",
                "ok:".green().bold(),
                settings.engine.lanes.len()
            );
        }

        Commands::Join {
            lane,
            user,
            name,
            address,
        } => {
            let profile = UserProfile::new(
                user.clone(),
                address.unwrap_or_else(|| user.clone()),
                name,
            );
            let ticket = service.enqueue(lane, &profile).await?;
            match ticket.status {
                TicketStatus::Waiting => {
                    let position = service
                        .position(&user)
                        .await?
                        .and_then(|p| p.position)
                        .unwrap_or(0);
                    println!(
                        "joined lane {}: {}, waiting position {}",
                        ticket.lane_id,
                        describe(&ticket),
                        position
                    );
                }
                _ => println!("already active: {}", describe(&ticket)),
            }
        }

        Commands::Leave { user } => {
            if service.leave(&user).await? {
                println!("left the queue");
            } else {
                println!("no active ticket to cancel");
            }
        }

        Commands::Position { user } => match service.position(&user).await? {
            Some(info) => match info.position {
                Some(position) => {
                    println!("{}, waiting position {}", describe(&info.ticket), position)
                }
                None => println!("{}", describe(&info.ticket)),
            },
            None => println!("no active ticket"),
        },

        Commands::List { lane, limit } => {
            let tickets = service.list_waiting(lane, limit).await?;
            if tickets.is_empty() {
                println!("lane {}: queue is empty", lane);
            } else {
                let rows: Vec<WaitingRow> = tickets
                    .iter()
                    .enumerate()
                    .map(|(idx, t)| WaitingRow {
                        position: idx + 1,
                        ticket_id: t.id,
                        user_id: t.user_id,
                        since: format_millis(t.created_at),
                    })
                    .collect();
                println!("lane {}: {} waiting", lane, tickets.len());
                println!("{}", Table::new(rows));
            }
        }

        Commands::CallNext { lane } => match service.call_next(lane).await? {
            Some(ticket) => println!("called {}", describe(&ticket)),
            None => println!("lane {}: queue is empty", lane),
        },

        Commands::NoShow { lane } => match service.mark_no_show(lane).await? {
            Some(ticket) => println!("marked absent: {}", describe(&ticket)),
            None => println!("lane {}: nothing is currently called", lane),
        },

        Commands::Serve { lane } => match service.serve_confirmed(lane).await? {
            Some(ticket) => println!("served {}", describe(&ticket)),
            None => println!("lane {}: nothing confirmed to serve", lane),
        },

        Commands::Confirm { token, operator } => {
            match service.confirm_by_token(&token, &operator).await {
                Ok(ticket) => println!("confirmed {}", describe(&ticket)),
                Err(AppError::InvalidOrExpiredToken) => {
                    eprintln!("{} ticket not found / expired / invalid state", "error:".red());
                    std::process::exit(1);
                }
                Err(AppError::Unauthorized(msg)) => {
                    eprintln!("{} {}", "error:".red(), msg);
                    std::process::exit(1);
                }
                Err(e) => return Err(e.into()),
            }
        }

        Commands::Stats { day, lane } => {
            let day = match day {
                Some(raw) => NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
                    .context("day must be YYYY-MM-DD")?,
                None => Utc::now().date_naive(),
            };

            match lane {
                Some(lane_id) => {
                    let stats = service.day_stats(day, Some(lane_id)).await?;
                    println!(
                        "{} lane {}: created={}, confirmed={}",
                        day, lane_id, stats.created, stats.confirmed
                    );
                }
                None => {
                    for lane in &settings.engine.lanes {
                        let stats = service.day_stats(day, Some(lane.id)).await?;
                        println!(
                            "{} {}: created={}, confirmed={}",
                            day, lane.title, stats.created, stats.confirmed
                        );
                    }
                    let total = service.day_stats(day, None).await?;
                    println!(
                        "{} total: created={}, confirmed={}",
                        day, total.created, total.confirmed
                    );
                }
            }
        }
    }

    Ok(())
}

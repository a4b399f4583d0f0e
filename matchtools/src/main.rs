use std::path::PathBuf;

use anyhow::{anyhow, Result};
use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use connect_common::ConnectId;
use log::*;
use match_engine::{
    events::EventProducers,
    queue_objects::BatchOutcome,
    BatchApi,
    EngineConfig,
    LedgerApi,
    MatchApi,
    QueueApi,
    SqliteDatabase,
};

mod formatting;
mod hooks;
mod seed;

use crate::{
    formatting::{format_candidates, format_inconsistent_pairs, format_ledger},
    hooks::logging_event_handlers,
    seed::SeedFile,
};

#[derive(Parser, Debug)]
#[command(version = "0.1.0", about = "Operator tools for the Connect matching engine")]
pub struct Arguments {
    /// Overrides CONNECT_DATABASE_URL
    #[arg(short = 'd', long = "database")]
    database_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    #[clap(name = "migrate", about = "Create the database if necessary and run the migrations")]
    Migrate,
    #[clap(name = "seed", about = "Load profiles and blocks from a JSON file")]
    Seed {
        /// Path to the seed file
        file: PathBuf,
    },
    #[clap(name = "batch", about = "Generate daily batches for one user, or for every active user")]
    Batch(BatchParams),
    #[clap(name = "queue", about = "Show the next candidates in a user's delivery queue")]
    Queue(QueueParams),
    #[clap(name = "ledger", about = "Show a user's action ledger")]
    Ledger {
        #[arg(short = 'u', long = "user")]
        user: String,
    },
    #[clap(name = "audit", about = "List matches and conversations that are missing their counterpart")]
    Audit,
}

#[derive(Debug, Args)]
pub struct BatchParams {
    /// Only generate the batch for this user
    #[arg(short = 'u', long = "user")]
    user: Option<String>,
    /// The batch date, as YYYY-MM-DD. Defaults to today (UTC)
    #[arg(short = 't', long = "date")]
    date: Option<NaiveDate>,
}

#[derive(Debug, Args)]
pub struct QueueParams {
    #[arg(short = 'u', long = "user")]
    user: String,
    /// How many candidates to show. Defaults to CONNECT_QUEUE_PULL_SIZE
    #[arg(short = 'n', long = "limit")]
    limit: Option<usize>,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    env_logger::init();
    let cli = Arguments::parse();
    let mut config = EngineConfig::from_env_or_default();
    if let Some(url) = cli.database_url {
        config = config.with_database_url(&url);
    }
    if let Err(e) = run(cli.command, config).await {
        eprintln!("{e:#}");
        std::process::exit(1);
    }
}

async fn run(command: Command, config: EngineConfig) -> Result<()> {
    match command {
        Command::Migrate => migrate(config).await,
        Command::Seed { file } => seed_database(config, file).await,
        Command::Batch(params) => run_batches(config, params).await,
        Command::Queue(params) => print_queue(config, params).await,
        Command::Ledger { user } => print_ledger(config, user).await,
        Command::Audit => audit(config).await,
    }
}

async fn connect(config: &EngineConfig) -> Result<SqliteDatabase> {
    let db = SqliteDatabase::new_with_config(config).await?;
    debug!("🗃️ Connected to {}", db.url());
    Ok(db)
}

async fn migrate(config: EngineConfig) -> Result<()> {
    let db = connect(&config.with_auto_migrate(true)).await?;
    println!("Database at {} is up to date", db.url());
    db.close().await;
    Ok(())
}

async fn seed_database(config: EngineConfig, file: PathBuf) -> Result<()> {
    let seed = SeedFile::from_path(&file)?;
    let db = connect(&config).await?;
    for profile in &seed.profiles {
        db.upsert_profile(profile).await?;
    }
    for block in &seed.blocks {
        db.block_user(&block.blocker, &block.blocked).await?;
    }
    println!("Seeded {} profiles and {} blocks from {}", seed.profiles.len(), seed.blocks.len(), file.display());
    db.close().await;
    Ok(())
}

async fn run_batches(config: EngineConfig, params: BatchParams) -> Result<()> {
    let db = connect(&config).await?;
    let handlers = logging_event_handlers(config.event_buffer_size);
    let producers = handlers.producers();
    let events = tokio::spawn(handlers.run_to_completion());
    let result = generate_batches(&db, producers, config.daily_batch_size, params).await;
    // the API and its producers are gone, so the handlers stop once the queued events are logged
    events.await?;
    db.close().await;
    result
}

async fn generate_batches(
    db: &SqliteDatabase,
    producers: EventProducers,
    batch_size: usize,
    params: BatchParams,
) -> Result<()> {
    let date = params.date.unwrap_or_else(|| Utc::now().date_naive());
    let api = BatchApi::new(db.clone(), producers).with_batch_size(batch_size);
    match params.user {
        Some(user) => {
            let user = ConnectId::from(user);
            match api.generate_daily_batch(&user, date).await? {
                BatchOutcome::Generated(n) => println!("Generated {n} candidates for {user} on {date}"),
                BatchOutcome::AlreadyPresent => println!("{user} already has a batch for {date}"),
            }
        },
        None => {
            let summary = api.run_daily_batches(date).await?;
            println!(
                "Batches for {date}: {} generated, {} already present, {} failed",
                summary.generated, summary.already_present, summary.failed
            );
        },
    }
    Ok(())
}

async fn print_queue(config: EngineConfig, params: QueueParams) -> Result<()> {
    let pull_size = config.queue_pull_size;
    let db = connect(&config).await?;
    let api = QueueApi::new(db.clone(), EventProducers::default()).with_pull_size(pull_size);
    let user = ConnectId::from(params.user);
    let candidates = api.get_next(&user, params.limit).await?;
    println!("Next candidates for {user}");
    println!("{}", format_candidates(&candidates));
    db.close().await;
    Ok(())
}

async fn print_ledger(config: EngineConfig, user: String) -> Result<()> {
    let db = connect(&config).await?;
    let api = LedgerApi::new(db.clone(), EventProducers::default());
    let user = ConnectId::from(user);
    let record = api.ledger(&user).await?.ok_or_else(|| anyhow!("{user} has no ledger yet"))?;
    println!("{}", format_ledger(&record)?);
    db.close().await;
    Ok(())
}

async fn audit(config: EngineConfig) -> Result<()> {
    let db = connect(&config).await?;
    let api = MatchApi::new(db.clone(), EventProducers::default());
    let pairs = api.audit_consistency().await?;
    println!("{}", format_inconsistent_pairs(&pairs));
    db.close().await;
    Ok(())
}

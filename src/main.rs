use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;

use vfootball::config::AppConfig;
use vfootball::fixtures::parse_fixtures_json;
use vfootball::league_names::{category_id, display_name, known_leagues, standardize_league_name};
use vfootball::refresh::{refresh_league, sweep_fixtures};
use vfootball::report::{format_prediction, format_table};
use vfootball::result_feed::{collect_events, parse_result_pages};
use vfootball::store::MatchStore;

#[derive(Debug, Parser)]
#[command(author, version, about = "Virtual football league tables and predictions", long_about = None)]
struct Cli {
    /// SQLite database path (overrides VFOOTBALL_DB)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Store results from a saved results-API response and rebuild the table
    Ingest {
        /// League the pages were fetched for
        league: String,
        /// JSON file holding one page or an array of pages
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Load upcoming fixtures from a JSON array
    Schedule {
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Print the stored standings of a league
    Table {
        league: String,
        #[arg(long)]
        json: bool,
    },
    /// Predict a fixture from recent form
    Predict {
        league: String,
        home: String,
        away: String,
        #[arg(long)]
        json: bool,
    },
    /// List leagues with results or fixtures on record, or the known ones
    Leagues,
    /// List scheduled fixtures of a league and whether each can be predicted
    Fixtures {
        league: String,
        #[arg(short, long, default_value_t = 50)]
        limit: usize,
        #[arg(long)]
        json: bool,
    },
    /// Mark started and finished fixtures and drop stale ones
    Sweep,
}

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = AppConfig::from_env();
    if let Some(db) = cli.db {
        config.db_path = db;
    }

    let mut store = MatchStore::open(&config.db_path)
        .with_context(|| format!("open database {}", config.db_path.display()))?;

    match cli.command {
        Commands::Ingest { league, file } => {
            let raw = fs::read_to_string(&file)
                .with_context(|| format!("read {}", file.display()))?;
            let pages = parse_result_pages(&raw)?;
            let events = collect_events(pages);
            let summary = refresh_league(&mut store, &league, &events)?;
            println!(
                "{}: {} events, {} valid, {} rejected, {} stored, {} teams",
                summary.league,
                summary.received,
                summary.valid,
                summary.rejected(),
                summary.stored,
                summary.table.len()
            );
            print!("{}", format_table(&summary.league, &summary.table));
        }
        Commands::Schedule { file } => {
            let raw = fs::read_to_string(&file)
                .with_context(|| format!("read {}", file.display()))?;
            let fixtures = parse_fixtures_json(&raw)?;
            let n = store.upsert_scheduled(&fixtures)?;
            info!(count = n, "fixtures loaded");
            println!("{n} fixtures stored");
        }
        Commands::Table { league, json } => {
            let league = standardize_league_name(&league);
            let table = store.load_league_table(&league)?;
            if json {
                let body = json!({
                    "league": league,
                    "league_display": display_name(&league),
                    "table": table,
                });
                println!("{}", serde_json::to_string_pretty(&body)?);
            } else {
                print!("{}", format_table(&league, &table));
            }
        }
        Commands::Predict {
            league,
            home,
            away,
            json,
        } => {
            let league = standardize_league_name(&league);
            let prediction = config.predictor().predict(&store, &home, &away, &league)?;
            if json {
                let body = json!({
                    "prediction": prediction,
                    "formatted": format_prediction(prediction.as_ref()),
                });
                println!("{}", serde_json::to_string_pretty(&body)?);
            } else {
                println!("{}", format_prediction(prediction.as_ref()));
            }
        }
        Commands::Leagues => {
            let mut leagues = store.leagues()?;
            if leagues.is_empty() {
                leagues = known_leagues().map(str::to_string).collect();
            }
            for league in leagues {
                println!(
                    "{league}\t{}\t{}",
                    display_name(&league),
                    category_id(&league).unwrap_or("-")
                );
            }
        }
        Commands::Fixtures { league, limit, json } => {
            let league = standardize_league_name(&league);
            let listing = store.fixture_listing(&league, limit)?;
            if json {
                let body = json!({
                    "matches": listing,
                    "league_display": display_name(&league),
                    "league_standardized": league,
                });
                println!("{}", serde_json::to_string_pretty(&body)?);
            } else {
                for f in &listing {
                    println!(
                        "{}\t{} vs {}\t{}\t{}",
                        f.event_id,
                        f.home_team,
                        f.away_team,
                        f.match_time,
                        f.prediction_note()
                    );
                }
            }
        }
        Commands::Sweep => {
            let summary = sweep_fixtures(&store, Utc::now())?;
            println!(
                "{} fixtures started, {} finished, {} pruned",
                summary.started, summary.finished, summary.pruned
            );
        }
    }

    Ok(())
}

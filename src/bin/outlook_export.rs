use std::path::PathBuf;

use anyhow::{Context, Result};

use transfer_outlook::export::export_estimates;
use transfer_outlook::logging;
use transfer_outlook::market_trends::market_report;
use transfer_outlook::source::{TableSource, flag_value};
use transfer_outlook::{Engine, EngineConfig};

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    logging::init();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let tables = TableSource::resolve(&args)?
        .load()
        .context("load historical tables")?;
    let out = flag_value(&args, "--out")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("transfer_outlook.xlsx"));
    let club_filter = flag_value(&args, "--club").and_then(|v| v.parse::<u32>().ok());
    let league_filter = flag_value(&args, "--league");

    let player_ids = tables
        .players
        .iter()
        .filter(|p| club_filter.is_none_or(|id| p.current_club_id == Some(id)))
        .filter(|p| {
            league_filter
                .as_deref()
                .is_none_or(|league| p.current_league_id.as_deref() == Some(league))
        })
        .map(|p| p.player_id)
        .collect::<Vec<_>>();

    let engine = Engine::from_tables(tables, EngineConfig::load());
    let snapshot = engine.snapshot();
    let responses = engine.estimate_many(&player_ids);
    let leagues = market_report(&snapshot.tables().transfers, snapshot.clubs());

    let report = export_estimates(&out, &snapshot, &responses, &leagues)?;
    println!("Export complete: {}", out.display());
    println!("Players: {}", report.players);
    println!("Destinations: {}", report.destinations);
    println!("Leagues: {}", report.leagues);
    if !report.errors.is_empty() {
        println!("Errors: {}", report.errors.len());
        for err in report.errors.iter().take(6) {
            println!("   - {err}");
        }
    }
    Ok(())
}

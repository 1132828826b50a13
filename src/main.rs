use std::collections::HashSet;

use anyhow::{Context, Result, anyhow};
use tracing::info;

use transfer_outlook::logging;
use transfer_outlook::source::TableSource;
use transfer_outlook::{Engine, EngineConfig};

const VALUE_FLAGS: &[&str] = &["--data", "--db"];

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    logging::init();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let player_ids = parse_player_ids(&args);
    if player_ids.is_empty() {
        return Err(anyhow!(
            "usage: transfer_outlook (--data DIR | --db FILE) PLAYER_ID... [--pretty]"
        ));
    }
    let pretty = args.iter().any(|a| a == "--pretty");

    let source = TableSource::resolve(&args)?;
    let tables = source.load().context("load historical tables")?;
    let config = EngineConfig::load();
    info!(reference_date = %config.reference_date, players = player_ids.len(), "estimating");
    let engine = Engine::from_tables(tables, config);

    for response in engine.estimate_many(&player_ids) {
        let json = if pretty {
            serde_json::to_string_pretty(&response)
        } else {
            serde_json::to_string(&response)
        }
        .context("serialize estimate")?;
        println!("{json}");
    }
    Ok(())
}

fn parse_player_ids(args: &[String]) -> Vec<u32> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    let mut skip_next = false;
    for arg in args {
        if skip_next {
            skip_next = false;
            continue;
        }
        if VALUE_FLAGS.contains(&arg.as_str()) {
            skip_next = true;
            continue;
        }
        for part in arg.split([',', ' ']) {
            if let Ok(id) = part.trim().parse::<u32>()
                && seen.insert(id)
            {
                out.push(id);
            }
        }
    }
    out
}

use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};

use transfer_outlook::logging;
use transfer_outlook::source::flag_value;
use transfer_outlook::store;
use transfer_outlook::tables::Tables;

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    logging::init();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let data_dir = flag_value(&args, "--data")
        .or_else(|| std::env::var("OUTLOOK_DATA_DIR").ok())
        .map(PathBuf::from)
        .ok_or_else(|| anyhow!("usage: outlook_ingest --data DIR --db FILE"))?;
    let db_path = flag_value(&args, "--db")
        .or_else(|| std::env::var("OUTLOOK_DB").ok())
        .map(PathBuf::from)
        .context("unable to resolve sqlite path")?;

    let tables = Tables::load_csv_dir(&data_dir)?;
    let mut conn = store::open_db(&db_path)?;
    store::write_tables(&mut conn, &tables)?;

    println!("Ingest complete");
    println!("DB: {}", db_path.display());
    println!("Players: {}", tables.players.len());
    println!("Clubs: {}", tables.clubs.len());
    println!("Transfers: {}", tables.transfers.len());
    println!("Valuations: {}", tables.valuations.len());
    println!("Appearances: {}", tables.appearances.len());
    Ok(())
}

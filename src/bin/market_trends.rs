use std::path::PathBuf;

use anyhow::Result;

use transfer_outlook::logging;
use transfer_outlook::market_trends::{market_report, write_report_csv};
use transfer_outlook::source::{TableSource, flag_value};
use transfer_outlook::tables::ClubDirectory;

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    logging::init();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let tables = TableSource::resolve(&args)?.load()?;
    let out = flag_value(&args, "--out")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("market_trends.csv"));

    let clubs = ClubDirectory::from_clubs(&tables.clubs);
    let rows = market_report(&tables.transfers, &clubs);
    write_report_csv(&out, &rows)?;

    println!("Market report: {} leagues -> {}", rows.len(), out.display());
    for row in rows.iter().take(10) {
        println!(
            "  {:<6} trend={:>5.2} invest={:>5.2} bought={:.0} sold={:.0}",
            row.league_id,
            row.market_trend_score,
            row.investment_score,
            row.total_bought,
            row.total_sold
        );
    }
    Ok(())
}

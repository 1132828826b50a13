use std::path::Path;

use anyhow::{Context, Result};
use rust_xlsxwriter::{Workbook, Worksheet};

use crate::engine::EstimateResponse;
use crate::market_trends::LeagueMarketRow;
use crate::models::EstimateSource;
use crate::snapshot::Snapshot;
use crate::tables::MarketValue;

pub struct ExportReport {
    pub players: usize,
    pub destinations: usize,
    pub leagues: usize,
    pub errors: Vec<String>,
}

pub fn export_estimates(
    path: &Path,
    snapshot: &Snapshot,
    responses: &[EstimateResponse],
    leagues: &[LeagueMarketRow],
) -> Result<ExportReport> {
    let mut errors = Vec::new();

    let mut estimate_rows = vec![vec![
        "Player ID".to_string(),
        "Player".to_string(),
        "Club".to_string(),
        "League".to_string(),
        "Market Value".to_string(),
        "Transfer Probability".to_string(),
        "Probability Source".to_string(),
        "Top Destination".to_string(),
    ]];
    let mut destination_rows = vec![vec![
        "Player ID".to_string(),
        "Rank".to_string(),
        "Club".to_string(),
        "Club ID".to_string(),
        "Score".to_string(),
        "Source".to_string(),
    ]];

    for response in responses {
        let estimate = match response {
            EstimateResponse::Estimate(estimate) => estimate,
            EstimateResponse::Error(err) => {
                errors.push(format!("player {}: {}", err.player_id, err.error));
                continue;
            }
        };
        let player = snapshot.player(estimate.player_id);
        estimate_rows.push(vec![
            estimate.player_id.to_string(),
            player.map(|p| p.name.clone()).unwrap_or_default(),
            player
                .map(|p| p.current_club_name.clone())
                .unwrap_or_default(),
            player
                .and_then(|p| p.current_league_id.clone())
                .unwrap_or_default(),
            match estimate.market_value {
                MarketValue::Known(v) => format!("{v:.0}"),
                MarketValue::Unknown => String::new(),
            },
            format!("{:.2}", estimate.transfer_probability),
            source_label(&estimate.probability_source),
            estimate
                .likely_destinations
                .iter()
                .next()
                .map(|d| d.club_name.clone())
                .unwrap_or_default(),
        ]);
        for (rank, d) in estimate.likely_destinations.iter().enumerate() {
            destination_rows.push(vec![
                estimate.player_id.to_string(),
                (rank + 1).to_string(),
                d.club_name.clone(),
                opt_to_string(d.club_id),
                format!("{:.2}", d.score),
                source_label(&estimate.destination_source),
            ]);
        }
    }

    let mut league_rows = vec![vec![
        "League".to_string(),
        "Clubs".to_string(),
        "Total Bought".to_string(),
        "Total Sold".to_string(),
        "Net Spending".to_string(),
        "Investment".to_string(),
        "Attractiveness".to_string(),
        "Net Score".to_string(),
        "Market Trend".to_string(),
    ]];
    for row in leagues {
        league_rows.push(vec![
            row.league_id.clone(),
            row.n_clubs.to_string(),
            format!("{:.0}", row.total_bought),
            format!("{:.0}", row.total_sold),
            format!("{:.0}", row.net_spending),
            format!("{:.2}", row.investment_score),
            format!("{:.2}", row.attractiveness_score),
            format!("{:.2}", row.net_score),
            format!("{:.2}", row.market_trend_score),
        ]);
    }

    let mut workbook = Workbook::new();
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Estimates")?;
        write_rows(sheet, &estimate_rows)?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Destinations")?;
        write_rows(sheet, &destination_rows)?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Leagues")?;
        write_rows(sheet, &league_rows)?;
    }

    workbook
        .save(path)
        .with_context(|| format!("failed writing workbook to {}", path.display()))?;

    Ok(ExportReport {
        players: estimate_rows.len().saturating_sub(1),
        destinations: destination_rows.len().saturating_sub(1),
        leagues: league_rows.len().saturating_sub(1),
        errors,
    })
}

fn source_label(source: &EstimateSource) -> String {
    match source {
        EstimateSource::Heuristic => "heuristic".to_string(),
        EstimateSource::Model => "model".to_string(),
    }
}

fn opt_to_string<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn write_rows(worksheet: &mut Worksheet, rows: &[Vec<String>]) -> Result<()> {
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, value) in row.iter().enumerate() {
            worksheet
                .write_string(row_idx as u32, col_idx as u16, value)
                .with_context(|| format!("write cell ({row_idx},{col_idx})"))?;
        }
    }
    Ok(())
}

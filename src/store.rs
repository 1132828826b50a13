use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::{Connection, Row, params};
use tracing::info;

use crate::tables::{
    AppearanceRecord, Club, Player, Tables, TransferRecord, ValuationRecord, parse_date,
};

pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    let conn =
        Connection::open(path).with_context(|| format!("open sqlite db {}", path.display()))?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS players (
            row_id INTEGER PRIMARY KEY AUTOINCREMENT,
            player_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            nationality TEXT NULL,
            current_club_id INTEGER NULL,
            current_club_name TEXT NOT NULL,
            current_league_id TEXT NULL,
            contract_expiration_date TEXT NULL,
            date_of_birth TEXT NULL,
            position TEXT NULL,
            height_in_cm REAL NULL
        );
        CREATE INDEX IF NOT EXISTS idx_players_player ON players(player_id);

        CREATE TABLE IF NOT EXISTS clubs (
            row_id INTEGER PRIMARY KEY AUTOINCREMENT,
            club_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            league_id TEXT NULL
        );
        CREATE TABLE IF NOT EXISTS transfers (
            row_id INTEGER PRIMARY KEY AUTOINCREMENT,
            player_id INTEGER NOT NULL,
            transfer_date TEXT NULL,
            from_club_id INTEGER NULL,
            to_club_id INTEGER NULL,
            from_club_name TEXT NOT NULL,
            to_club_name TEXT NOT NULL,
            fee REAL NULL
        );
        CREATE INDEX IF NOT EXISTS idx_transfers_player ON transfers(player_id);
        CREATE INDEX IF NOT EXISTS idx_transfers_from ON transfers(from_club_id);

        CREATE TABLE IF NOT EXISTS valuations (
            row_id INTEGER PRIMARY KEY AUTOINCREMENT,
            player_id INTEGER NOT NULL,
            date TEXT NULL,
            market_value REAL NULL
        );
        CREATE INDEX IF NOT EXISTS idx_valuations_player ON valuations(player_id);

        CREATE TABLE IF NOT EXISTS appearances (
            row_id INTEGER PRIMARY KEY AUTOINCREMENT,
            player_id INTEGER NOT NULL,
            date TEXT NULL,
            goals INTEGER NOT NULL,
            assists INTEGER NOT NULL,
            minutes_played INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_appearances_player ON appearances(player_id);
        "#,
    )
    .context("create sqlite schema")?;
    Ok(())
}

/// Replaces every table's content with `tables`, in one transaction. Rows
/// keep their input order, duplicates included.
pub fn write_tables(conn: &mut Connection, tables: &Tables) -> Result<()> {
    let tx = conn.transaction().context("begin write transaction")?;
    tx.execute_batch(
        "DELETE FROM players; DELETE FROM clubs; DELETE FROM transfers;
         DELETE FROM valuations; DELETE FROM appearances;",
    )
    .context("clear tables")?;

    {
        let mut stmt = tx.prepare(
            "INSERT INTO players(player_id, name, nationality, current_club_id, current_club_name,
                 current_league_id, contract_expiration_date, date_of_birth, position, height_in_cm)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        )?;
        for p in &tables.players {
            stmt.execute(params![
                p.player_id,
                p.name,
                p.nationality,
                p.current_club_id,
                p.current_club_name,
                p.current_league_id,
                date_text(p.contract_expiration_date),
                date_text(p.date_of_birth),
                p.position,
                p.height_in_cm,
            ])
            .with_context(|| format!("insert player {}", p.player_id))?;
        }

        let mut stmt =
            tx.prepare("INSERT INTO clubs(club_id, name, league_id) VALUES (?1, ?2, ?3)")?;
        for c in &tables.clubs {
            stmt.execute(params![c.club_id, c.name, c.league_id])
                .with_context(|| format!("insert club {}", c.club_id))?;
        }

        let mut stmt = tx.prepare(
            "INSERT INTO transfers(player_id, transfer_date, from_club_id, to_club_id, from_club_name, to_club_name, fee)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;
        for t in &tables.transfers {
            stmt.execute(params![
                t.player_id,
                date_text(t.transfer_date),
                t.from_club_id,
                t.to_club_id,
                t.from_club_name,
                t.to_club_name,
                t.fee.filter(|f| f.is_finite()),
            ])
            .context("insert transfer")?;
        }

        let mut stmt =
            tx.prepare("INSERT INTO valuations(player_id, date, market_value) VALUES (?1, ?2, ?3)")?;
        for v in &tables.valuations {
            stmt.execute(params![
                v.player_id,
                date_text(v.date),
                v.market_value.filter(|m| m.is_finite()),
            ])
            .context("insert valuation")?;
        }

        let mut stmt = tx.prepare(
            "INSERT INTO appearances(player_id, date, goals, assists, minutes_played)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        for a in &tables.appearances {
            stmt.execute(params![
                a.player_id,
                date_text(a.date),
                a.goals,
                a.assists,
                a.minutes_played,
            ])
            .context("insert appearance")?;
        }
    }

    tx.commit().context("commit write transaction")?;
    info!(
        players = tables.players.len(),
        transfers = tables.transfers.len(),
        "wrote tables to sqlite"
    );
    Ok(())
}

pub fn load_tables(conn: &Connection) -> Result<Tables> {
    let players = query_all(
        conn,
        "SELECT player_id, name, nationality, current_club_id, current_club_name, current_league_id,
                contract_expiration_date, date_of_birth, position, height_in_cm
         FROM players ORDER BY row_id",
        |row| {
            Ok(Player {
                player_id: row.get(0)?,
                name: row.get(1)?,
                nationality: row.get(2)?,
                current_club_id: row.get(3)?,
                current_club_name: row.get(4)?,
                current_league_id: row.get(5)?,
                contract_expiration_date: date_col(row, 6)?,
                date_of_birth: date_col(row, 7)?,
                position: row.get(8)?,
                height_in_cm: row.get(9)?,
            })
        },
    )
    .context("load players")?;

    let clubs = query_all(
        conn,
        "SELECT club_id, name, league_id FROM clubs ORDER BY row_id",
        |row| {
            Ok(Club {
                club_id: row.get(0)?,
                name: row.get(1)?,
                league_id: row.get(2)?,
            })
        },
    )
    .context("load clubs")?;

    let transfers = query_all(
        conn,
        "SELECT player_id, transfer_date, from_club_id, to_club_id, from_club_name, to_club_name, fee
         FROM transfers ORDER BY row_id",
        |row| {
            Ok(TransferRecord {
                player_id: row.get(0)?,
                transfer_date: date_col(row, 1)?,
                from_club_id: row.get(2)?,
                to_club_id: row.get(3)?,
                from_club_name: row.get(4)?,
                to_club_name: row.get(5)?,
                fee: row.get(6)?,
            })
        },
    )
    .context("load transfers")?;

    let valuations = query_all(
        conn,
        "SELECT player_id, date, market_value FROM valuations ORDER BY row_id",
        |row| {
            Ok(ValuationRecord {
                player_id: row.get(0)?,
                date: date_col(row, 1)?,
                market_value: row.get(2)?,
            })
        },
    )
    .context("load valuations")?;

    let appearances = query_all(
        conn,
        "SELECT player_id, date, goals, assists, minutes_played FROM appearances ORDER BY row_id",
        |row| {
            Ok(AppearanceRecord {
                player_id: row.get(0)?,
                date: date_col(row, 1)?,
                goals: row.get(2)?,
                assists: row.get(3)?,
                minutes_played: row.get(4)?,
            })
        },
    )
    .context("load appearances")?;

    Ok(Tables {
        players,
        clubs,
        transfers,
        valuations,
        appearances,
    })
}

fn query_all<T>(
    conn: &Connection,
    sql: &str,
    map: impl FnMut(&Row<'_>) -> rusqlite::Result<T>,
) -> Result<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map([], map)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

fn date_text(date: Option<NaiveDate>) -> Option<String> {
    date.map(|d| d.format("%Y-%m-%d").to_string())
}

fn date_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<NaiveDate>> {
    let raw: Option<String> = row.get(idx)?;
    Ok(raw.as_deref().and_then(parse_date))
}

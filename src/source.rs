use std::env;
use std::path::PathBuf;

use anyhow::{Result, anyhow};

use crate::store;
use crate::tables::Tables;

/// Where the historical tables come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableSource {
    CsvDir(PathBuf),
    Sqlite(PathBuf),
}

impl TableSource {
    /// `--data DIR` / `--db FILE` (or `--data=DIR`), then `OUTLOOK_DATA_DIR` /
    /// `OUTLOOK_DB`.
    pub fn resolve(args: &[String]) -> Result<Self> {
        if let Some(dir) = flag_value(args, "--data") {
            return Ok(TableSource::CsvDir(PathBuf::from(dir)));
        }
        if let Some(db) = flag_value(args, "--db") {
            return Ok(TableSource::Sqlite(PathBuf::from(db)));
        }
        if let Some(dir) = non_empty_env("OUTLOOK_DATA_DIR") {
            return Ok(TableSource::CsvDir(PathBuf::from(dir)));
        }
        if let Some(db) = non_empty_env("OUTLOOK_DB") {
            return Ok(TableSource::Sqlite(PathBuf::from(db)));
        }
        Err(anyhow!(
            "no table source: pass --data DIR or --db FILE (or set OUTLOOK_DATA_DIR / OUTLOOK_DB)"
        ))
    }

    pub fn load(&self) -> Result<Tables> {
        match self {
            TableSource::CsvDir(dir) => Tables::load_csv_dir(dir),
            TableSource::Sqlite(path) => {
                if !path.exists() {
                    return Err(anyhow!("sqlite db {} does not exist", path.display()));
                }
                let conn = store::open_db(path)?;
                store::load_tables(&conn)
            }
        }
    }
}

/// Value of `--name VALUE` or `--name=VALUE`.
pub fn flag_value(args: &[String], name: &str) -> Option<String> {
    let prefix = format!("{name}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(raw) = arg.strip_prefix(&prefix) {
            let trimmed = raw.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == name
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            return Some(next.trim().to_string());
        }
    }
    None
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn flag_value_forms() {
        assert_eq!(
            flag_value(&args(&["--data", "in/"]), "--data"),
            Some("in/".to_string())
        );
        assert_eq!(
            flag_value(&args(&["12", "--db=x.sqlite"]), "--db"),
            Some("x.sqlite".to_string())
        );
        assert_eq!(flag_value(&args(&["--db"]), "--db"), None);
        assert_eq!(flag_value(&args(&["--db="]), "--db"), None);
    }

    #[test]
    fn explicit_flags_win() {
        let src = TableSource::resolve(&args(&["--db", "a.sqlite"])).unwrap();
        assert_eq!(src, TableSource::Sqlite(PathBuf::from("a.sqlite")));
    }
}

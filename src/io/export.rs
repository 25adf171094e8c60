//! CSV writers.
//!
//! Rows are written with `csv`'s serde support, so a struct's field order
//! is its column order.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use atomic_write_file::AtomicWriteFile;
use serde::Serialize;

/// Write `rows` as CSV with a header row.
pub fn write_csv<T: Serialize, W: Write>(writer: W, rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for row in rows {
        wtr.serialize(row).context("Failed to write CSV row")?;
    }
    wtr.flush().context("Failed to flush CSV output")?;
    Ok(())
}

/// Write `rows` to `path` atomically; the file is replaced only once every
/// row has been written.
pub fn write_csv_file<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
    }
    let mut file = AtomicWriteFile::open(path)
        .with_context(|| format!("Failed to open atomic write file at {}", path.display()))?;
    write_csv(&mut file, rows).with_context(|| format!("Failed to write {}", path.display()))?;
    file.commit()
        .with_context(|| format!("Failed to save {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::{Engine, FactorRegistry, Game, Params, PipelineConfig, TeamRating};

    fn priced() -> Vec<crate::pricing::LineOutput> {
        let engine = Engine::new(
            Params::default(),
            &PipelineConfig::default(),
            &FactorRegistry::with_builtin(),
        )
        .unwrap();
        let ratings = vec![TeamRating::new("KC", 5.0), TeamRating::new("BUF", 3.0)];
        let schedule = vec![Game::new(1, "2024-09-05", "KC", "BUF").at_neutral_site(true)];
        engine.price_schedule(&schedule, &ratings).unwrap()
    }

    #[test]
    fn test_lines_header_order() {
        let mut out = Vec::new();
        write_csv(&mut out, &priced()).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "week,date,away,home,neutral,model_spread_home,model_total,home_team_total,\
away_team_total,home_win_prob,away_win_prob,ml_home,ml_away"
        );
        let row = lines.next().unwrap();
        assert!(row.starts_with("1,2024-09-05,BUF,KC,1,2.0,44.0,23.0,21.0,"));
    }

    #[test]
    fn test_write_csv_file_replaces_atomically() {
        let path = std::env::temp_dir().join(format!("nfl-lines-export-{}.csv", std::process::id()));
        write_csv_file(&path, &priced()).unwrap();
        write_csv_file(&path, &priced()).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 2);
        std::fs::remove_file(&path).ok();
    }
}

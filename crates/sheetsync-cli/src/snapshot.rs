//! Offline sheet snapshots
//!
//! A snapshot is the JSON form of a [`MemoryGateway`]: every sheet with its
//! columns and rows. Commands run against it exactly as they would against
//! the remote service.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{Context, Result};
use sheetsync_core::MemoryGateway;

pub fn load(path: &Path) -> Result<MemoryGateway> {
    let file =
        File::open(path).with_context(|| format!("failed to open snapshot {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("invalid snapshot {}", path.display()))
}

pub fn save(gateway: &MemoryGateway, path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("failed to write snapshot {}", path.display()))?;
    serde_json::to_writer_pretty(file, gateway)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sheetsync_core::{Cell, Column, ColumnType, Row, Sheet};

    #[test]
    fn saved_snapshot_loads_back() {
        let mut sheet = Sheet::new(5, "Calendar");
        sheet.columns = vec![Column::new(1, "Event", ColumnType::TextNumber).primary()];
        sheet.rows = vec![Row::new().with_cell(Cell::new(1, "Summit"))];
        let gateway = MemoryGateway::new().with_sheet(sheet);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sheets.json");
        save(&gateway, &path).unwrap();
        let loaded = load(&path).unwrap();

        assert_eq!(loaded.sheets(), gateway.sheets());
    }

    #[test]
    fn missing_snapshot_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(&dir.path().join("absent.json")).unwrap_err();
        assert!(err.to_string().starts_with("failed to open snapshot"));
    }
}

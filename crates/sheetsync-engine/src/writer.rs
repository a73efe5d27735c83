//! Calendar sheet writer
//!
//! A calendar sheet is fully regenerated on every run: all existing rows are
//! deleted, then the computed entries are added in one batch. The first
//! column receives the entry name, the second its start date and, when the
//! sheet has one, the third its end date. Each row's background and taskbar
//! take the entry color.

use sheetsync_core::{
    CalendarEntry, Cell, FetchOptions, Format, NewRow, Sheet, SheetGateway, SheetId,
};
use tracing::{info, instrument, warn};

use crate::{EngineError, Result};

/// Outcome of regenerating one calendar sheet
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WriteReport {
    /// Rows deleted before writing
    pub cleared: usize,
    /// Rows written
    pub written: usize,
    /// Entries without a name or start date
    pub dropped: usize,
}

/// Replace the contents of calendar sheet `sheet_id` with `entries`
#[instrument(level = "info", skip(gateway, entries), fields(entries = entries.len()))]
pub fn write_calendar<G>(
    gateway: &mut G,
    sheet_id: SheetId,
    entries: &[CalendarEntry],
) -> Result<WriteReport>
where
    G: SheetGateway + ?Sized,
{
    let sheet = gateway.get_sheet(sheet_id, FetchOptions::default())?;
    let rows = build_rows(&sheet, entries)?;
    let cleared = clear_rows(gateway, &sheet)?;

    let written = rows.len();
    if rows.is_empty() {
        warn!(sheet_id, "no rows written");
    } else {
        gateway.add_rows(sheet_id, &rows)?;
        info!(sheet_id, written, "wrote rows");
    }

    Ok(WriteReport {
        cleared,
        written,
        dropped: entries.len() - written,
    })
}

/// Delete every row of `sheet`, returning how many ids were sent
///
/// Deleting a parent removes its descendants, so a top-level fetch suffices.
pub fn clear_rows<G>(gateway: &mut G, sheet: &Sheet) -> Result<usize>
where
    G: SheetGateway + ?Sized,
{
    let ids: Vec<_> = sheet.rows.iter().filter_map(|r| r.id).collect();
    if ids.is_empty() {
        warn!(sheet_id = sheet.id, "no rows cleared");
        return Ok(0);
    }
    gateway.delete_rows(sheet.id, &ids)?;
    info!(sheet_id = sheet.id, cleared = ids.len(), "cleared rows");
    Ok(ids.len())
}

/// Rows for every writable entry, in entry order
pub fn build_rows(sheet: &Sheet, entries: &[CalendarEntry]) -> Result<Vec<NewRow>> {
    let (name_col, start_col) = match sheet.columns.as_slice() {
        [name, start, ..] => (name.id, start.id),
        columns => {
            return Err(EngineError::CalendarLayout {
                sheet_id: sheet.id,
                found: columns.len(),
            })
        }
    };
    let end_col = sheet.columns.get(2).map(|c| c.id);

    let rows = entries
        .iter()
        .filter(|entry| entry.is_writable())
        .map(|entry| {
            let mut row = NewRow::to_bottom()
                .with_format(Format::filled(entry.color))
                .with_cell(Cell::new(name_col, entry.name.as_str()))
                .with_cell(Cell::new(start_col, entry.start.as_str()));
            if let Some(end_col) = end_col {
                if !entry.end.is_empty() {
                    row = row.with_cell(Cell::new(end_col, entry.end.as_str()));
                }
            }
            row
        })
        .collect();
    Ok(rows)
}

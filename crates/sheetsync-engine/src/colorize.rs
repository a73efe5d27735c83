//! Hierarchy colorizer
//!
//! Re-applies one background color per tree level of a map sheet:
//!
//! | Row | Color |
//! |-----|-------|
//! | `FY` row with children | [`ColorScheme::populated_year`] |
//! | `FY` row without children | [`ColorScheme::empty_year`] |
//! | n-th quarter row | `quarters[n].quarter` |
//! | event under the n-th quarter | `quarters[n].event` |
//!
//! Each updated row carries its full cell list with the color on every cell
//! and on the row, so running the pass again yields the same formatting.

use serde::{Deserialize, Serialize};
use sheetsync_core::{
    palette, Cell, ColorIndex, FetchOptions, Format, Row, RowUpdate, Sheet, SheetGateway, SheetId,
};
use tracing::{debug, info, instrument, warn};

use crate::hierarchy::YEAR_PREFIX;
use crate::Result;

/// Colors of a quarter row and of the events beneath it
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuarterColors {
    pub quarter: ColorIndex,
    pub event: ColorIndex,
}

impl QuarterColors {
    pub const fn new(quarter: ColorIndex, event: ColorIndex) -> Self {
        Self { quarter, event }
    }
}

/// Palette indices used per tree level
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorScheme {
    pub empty_year: ColorIndex,
    pub populated_year: ColorIndex,
    pub quarters: [QuarterColors; 4],
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self {
            empty_year: palette::WHITE,
            populated_year: 21,
            quarters: [
                QuarterColors::new(12, 5),
                QuarterColors::new(14, 7),
                QuarterColors::new(15, 8),
                QuarterColors::new(16, 9),
            ],
        }
    }
}

/// Walks the FY → quarter → event tree and recolors it
#[derive(Clone, Debug, Default)]
pub struct Colorizer {
    scheme: ColorScheme,
}

impl Colorizer {
    pub fn new(scheme: ColorScheme) -> Self {
        Self { scheme }
    }

    pub fn scheme(&self) -> &ColorScheme {
        &self.scheme
    }

    /// Updates recoloring every grouping row of `sheet` and its descendants
    pub fn plan(&self, sheet: &Sheet) -> Vec<RowUpdate> {
        let Some(primary) = sheet.primary_column().map(|c| c.id) else {
            return Vec::new();
        };

        let mut updates = Vec::new();
        for year_row in sheet.top_level_rows() {
            let Some(year_id) = year_row.id else { continue };
            let is_year = year_row
                .value(primary)
                .as_text()
                .is_some_and(|name| name.starts_with(YEAR_PREFIX));
            if !is_year {
                continue;
            }

            let year_color = if sheet.has_children(year_id) {
                self.scheme.populated_year
            } else {
                self.scheme.empty_year
            };
            updates.extend(recolor(year_row, year_color));

            for (index, quarter_row) in sheet.children_of(year_id).enumerate() {
                let Some(colors) = self.scheme.quarters.get(index) else {
                    warn!(year_id, row_id = ?quarter_row.id, "year row has more than four children");
                    continue;
                };
                updates.extend(recolor(quarter_row, colors.quarter));

                let Some(quarter_id) = quarter_row.id else { continue };
                for event_row in sheet.children_of(quarter_id) {
                    updates.extend(recolor(event_row, colors.event));
                }
            }
        }
        updates
    }

    /// Recolor the hierarchy of `sheet_id`, returning the number of rows updated
    #[instrument(level = "info", skip(self, gateway))]
    pub fn colorize<G>(&self, gateway: &mut G, sheet_id: SheetId) -> Result<usize>
    where
        G: SheetGateway + ?Sized,
    {
        let sheet = gateway.get_sheet(sheet_id, FetchOptions::full())?;
        debug!(sheet_id, version = ?sheet.version, "fetched hierarchy");

        let updates = self.plan(&sheet);
        if updates.is_empty() {
            info!(sheet_id, "nothing to colorize");
            return Ok(0);
        }
        gateway.update_rows(sheet_id, &updates)?;
        info!(sheet_id, rows = updates.len(), "colorized rows");
        Ok(updates.len())
    }
}

/// `row` with every cell and the row itself set to background `color`
fn recolor(row: &Row, color: ColorIndex) -> Option<RowUpdate> {
    let id = row.id?;
    let format = Format::background(color);
    let mut update = RowUpdate::new(id).with_format(format);
    for cell in &row.cells {
        update.set_cell(Cell::new(cell.column_id, cell.value.clone()).with_format(format));
    }
    Some(update)
}

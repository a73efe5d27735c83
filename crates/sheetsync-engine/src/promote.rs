//! Request → map promotion
//!
//! Moves pending rows of a request sheet into the fiscal hierarchy of a map
//! sheet. Each pending row is:
//!
//! 1. classified into a [`FiscalPeriod`] from its start date,
//! 2. given an `FY<yy>` group with `Q1`..`Q4` children if the year is new,
//!    or the missing quarters of a year row left incomplete by an earlier
//!    failure,
//! 3. copied cell by cell into every destination column of the same title,
//! 4. inserted among the quarter's events in start date order with the
//!    request flag set,
//! 5. marked done in the request sheet.
//!
//! Rows whose status is anything but the pending value are skipped, which
//! makes promotion safe to re-run. A failure stops only the row it happens
//! on; it is logged and counted in the [`PromotionReport`]. After a live run
//! the whole hierarchy is recolored once; a coloring failure is recorded in
//! the report rather than discarding it.

use serde::{Deserialize, Serialize};
use sheetsync_core::{
    Cell, ColumnId, FetchOptions, FiscalCalendar, FiscalPeriod, NewRow, Row, RowId, RowUpdate,
    SheetGateway, SheetId,
};
use tracing::{debug, error, info, instrument};

use crate::colorize::{ColorScheme, Colorizer};
use crate::hierarchy::{sort_date, FiscalGroups};
use crate::lookup::ColumnMap;
use crate::preview;
use crate::{EngineError, Result};

/// Column names and status values used by promotion
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromoteRules {
    pub status_column: String,
    /// Status of a row waiting to be promoted
    pub pending_status: String,
    /// Status written back once the row is promoted
    pub done_status: String,
    /// Destination column holding `FY`/`Q` labels
    pub name_column: String,
    pub start_column: String,
    /// Destination checkbox marking rows that came from a request
    pub flag_column: String,
}

impl Default for PromoteRules {
    fn default() -> Self {
        Self {
            status_column: "TechX Status".into(),
            pending_status: "Yellow".into(),
            done_status: "Green".into(),
            name_column: "Event Name".into(),
            start_column: "Event Start Date".into(),
            flag_column: "TechX Service Request".into(),
        }
    }
}

/// Counts from one promotion run
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PromotionReport {
    /// Rows read from the request sheet
    pub examined: usize,
    /// Rows with the pending status
    pub eligible: usize,
    /// Rows added to the map sheet
    pub promoted: usize,
    /// Rows previewed without writing
    pub simulated: usize,
    /// Rows whose processing stopped with an error
    pub failed: usize,
    /// New fiscal year groups
    pub groups_created: usize,
    /// Recoloring after the run failed
    pub colorize_failed: bool,
}

/// Column ids resolved once per run
struct Columns {
    source: ColumnMap,
    destination: ColumnMap,
    status: ColumnId,
    source_start: ColumnId,
    name: ColumnId,
    start: ColumnId,
    flag: ColumnId,
}

/// Promotes request rows into the fiscal hierarchy of a map sheet
#[derive(Clone, Debug, Default)]
pub struct Promoter {
    rules: PromoteRules,
    calendar: FiscalCalendar,
    colorizer: Colorizer,
    simulate: bool,
}

impl Promoter {
    pub fn new(rules: PromoteRules) -> Self {
        Self {
            rules,
            ..Self::default()
        }
    }

    pub fn with_calendar(mut self, calendar: FiscalCalendar) -> Self {
        self.calendar = calendar;
        self
    }

    pub fn with_colors(mut self, scheme: ColorScheme) -> Self {
        self.colorizer = Colorizer::new(scheme);
        self
    }

    /// Only preview eligible rows; nothing is written to either sheet
    pub fn simulate(mut self, simulate: bool) -> Self {
        self.simulate = simulate;
        self
    }

    pub fn rules(&self) -> &PromoteRules {
        &self.rules
    }

    /// Promote every pending row of `source` into `destination`
    ///
    /// Missing columns fail the run before anything is written. Failures of
    /// individual rows are logged and counted instead.
    #[instrument(level = "info", skip(self, gateway), fields(simulate = self.simulate))]
    pub fn promote<G>(
        &self,
        gateway: &mut G,
        source: SheetId,
        destination: SheetId,
    ) -> Result<PromotionReport>
    where
        G: SheetGateway + ?Sized,
    {
        let request = gateway.get_sheet(source, FetchOptions::full())?;
        let columns = self.resolve_columns(gateway, source, destination)?;

        let map = gateway.get_sheet(destination, FetchOptions::full())?;
        debug!(
            source_version = ?request.version,
            destination_version = ?map.version,
            "fetched sheets"
        );
        let mut groups = FiscalGroups::build(&map, columns.name, columns.start);
        debug!(years = ?groups.year_labels().collect::<Vec<_>>(), "found fiscal years");

        let [titles, ids] = preview::heading(&columns.source);
        debug!("{titles}");
        debug!("{ids}");

        let mut report = PromotionReport::default();
        for row in &request.rows {
            report.examined += 1;
            let status = row.value(columns.status).as_text().unwrap_or_default();
            if status != self.rules.pending_status {
                debug!(row_id = ?row.id, %status, "row not pending");
                continue;
            }
            report.eligible += 1;

            if let Err(err) =
                self.promote_row(gateway, destination, &columns, &mut groups, row, &mut report)
            {
                error!(row_id = ?row.id, error = %err, "failed to promote row");
                report.failed += 1;
            }
        }

        info!("{} rows moved", report.promoted);
        if self.simulate {
            info!(simulated = report.simulated, "simulation complete, no sheet was changed");
        } else {
            info!("colorizing rows");
            if let Err(err) = self.colorizer.colorize(gateway, destination) {
                error!(error = %err, "colorizing failed");
                report.colorize_failed = true;
            }
        }
        info!(?report, "promotion complete");
        Ok(report)
    }

    fn resolve_columns<G>(
        &self,
        gateway: &mut G,
        source: SheetId,
        destination: SheetId,
    ) -> Result<Columns>
    where
        G: SheetGateway + ?Sized,
    {
        let source = ColumnMap::new(source, &gateway.get_columns(source)?);
        let destination = ColumnMap::new(destination, &gateway.get_columns(destination)?);
        Ok(Columns {
            status: source.require(&self.rules.status_column)?,
            source_start: source.require(&self.rules.start_column)?,
            name: destination.require(&self.rules.name_column)?,
            start: destination.require(&self.rules.start_column)?,
            flag: destination.require(&self.rules.flag_column)?,
            source,
            destination,
        })
    }

    fn promote_row<G>(
        &self,
        gateway: &mut G,
        destination: SheetId,
        columns: &Columns,
        groups: &mut FiscalGroups,
        row: &Row,
        report: &mut PromotionReport,
    ) -> Result<()>
    where
        G: SheetGateway + ?Sized,
    {
        let start = row
            .value(columns.source_start)
            .as_text()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| EngineError::MissingValue {
                row_id: row.id,
                column: self.rules.start_column.clone(),
            })?;
        let period = self.calendar.classify_str(start.trim())?;
        debug!("{}", preview::row_line(row, period));

        if self.simulate {
            debug!(row_id = ?row.id, %period, "simulation: row would be promoted and marked done");
            report.simulated += 1;
            return Ok(());
        }

        if !groups.contains_year(period) {
            let year_id = self.add_year(gateway, destination, columns.name, period)?;
            groups.insert_year(period, year_id);
            report.groups_created += 1;
        }
        if groups.quarter(period).is_none() {
            self.add_quarters(gateway, destination, columns.name, groups, period)?;
            let map = gateway.get_sheet(destination, FetchOptions::full())?;
            *groups = FiscalGroups::build(&map, columns.name, columns.start);
        }
        let quarter = groups.quarter(period).ok_or(EngineError::MissingQuarter {
            year: period.year,
            quarter: period.quarter,
        })?;

        let mut new_row = map_cells(row, &columns.source, &columns.destination);
        let date = sort_date(new_row.value(columns.start));
        new_row.placement = quarter.placement_for(date);
        new_row.set_cell(Cell::new(columns.flag, true));
        debug!(row_id = ?row.id, %period, placement = ?new_row.placement, "sending row");

        let created = gateway.add_rows(destination, std::slice::from_ref(&new_row))?;
        let new_id = created
            .first()
            .and_then(|r| r.id)
            .ok_or(EngineError::MissingRowId(destination))?;
        if let Some(quarter) = groups.quarter_mut(period) {
            quarter.record_insert(new_row.placement, new_id, date);
        }
        report.promoted += 1;

        self.mark_done(gateway, columns, row)
    }

    /// Append an `FY<yy>` row to the bottom of the sheet, returning its id
    fn add_year<G>(
        &self,
        gateway: &mut G,
        destination: SheetId,
        name: ColumnId,
        period: FiscalPeriod,
    ) -> Result<RowId>
    where
        G: SheetGateway + ?Sized,
    {
        let label = period.year_label();
        let year = NewRow::to_bottom().with_cell(Cell::new(name, label.as_str()));
        let created = gateway.add_rows(destination, &[year])?;
        let year_id = created
            .first()
            .and_then(|r| r.id)
            .ok_or(EngineError::MissingRowId(destination))?;
        info!(year = %label, row_id = year_id, "added fiscal year group");
        Ok(year_id)
    }

    /// Add the quarter rows missing under the year of `period`
    ///
    /// Quarters sharing a placement go out in one request, so a new year
    /// gets all four in a single call.
    fn add_quarters<G>(
        &self,
        gateway: &mut G,
        destination: SheetId,
        name: ColumnId,
        groups: &FiscalGroups,
        period: FiscalPeriod,
    ) -> Result<()>
    where
        G: SheetGateway + ?Sized,
    {
        let missing = groups.missing_quarters(period);
        let mut batch: Vec<NewRow> = Vec::new();
        for (i, (quarter, placement)) in missing.iter().enumerate() {
            let mut row = NewRow::to_bottom().with_cell(Cell::new(name, quarter.quarter_label()));
            row.placement = *placement;
            batch.push(row);
            let next = missing.get(i + 1).map(|(_, next)| next);
            if next != Some(placement) {
                gateway.add_rows(destination, &batch)?;
                batch.clear();
            }
        }
        info!(
            year = %period.year_label(),
            quarters = ?missing.iter().map(|(q, _)| q.quarter_label()).collect::<Vec<_>>(),
            "added quarter rows"
        );
        Ok(())
    }

    /// Rewrite the source row with its status set to the done value
    fn mark_done<G>(&self, gateway: &mut G, columns: &Columns, row: &Row) -> Result<()>
    where
        G: SheetGateway + ?Sized,
    {
        let source = columns.source.sheet_id();
        let mut update = RowUpdate::from_row(row).ok_or(EngineError::MissingRowId(source))?;
        update.set_cell(Cell::new(columns.status, self.rules.done_status.as_str()));
        gateway.update_rows(source, &[update])?;
        debug!(
            row_id = ?row.id,
            column = %self.rules.status_column,
            value = %self.rules.done_status,
            "updated status"
        );
        Ok(())
    }
}

/// A new row holding `row`'s values under the destination columns of the same title
///
/// Empty cells and columns missing from the destination are left out.
/// Multi-value cells keep their structured value.
pub fn map_cells(row: &Row, source: &ColumnMap, destination: &ColumnMap) -> NewRow {
    let mut new_row = NewRow::to_bottom();
    for cell in &row.cells {
        if cell.value.is_empty() {
            continue;
        }
        let Some(target) = source
            .title(cell.column_id)
            .and_then(|title| destination.get(title))
        else {
            continue;
        };
        new_row.set_cell(Cell::new(target, cell.value.clone()));
    }
    new_row
}

//! Row filtering and transformation
//!
//! Turns the rows of a source sheet into [`CalendarEntry`] values. Two source
//! shapes exist:
//!
//! - **Map sheets**: a FY → quarter → event tree of venue bookings. Only
//!   confirmed event rows qualify; the assigned staff is appended to the name.
//! - **Intake sheets**: flat form submissions separated by `Q1 FY24`-style
//!   label rows. Canceled events are prefixed and long product names are
//!   shortened.
//!
//! Each qualifying event draws one color from the run's [`ColorCycle`]. Its
//! primary entry and the entries derived from extra date columns share it.

use std::collections::BTreeMap;

use regex::Regex;
use serde::{Deserialize, Serialize};
use sheetsync_core::{CalendarEntry, ColorCycle, ColorIndex, Column, ColumnId, Row, Sheet};
use tracing::debug;

use crate::lookup::ColumnMap;
use crate::Result;

/// Source-sheet specific conversion of rows into calendar entries
pub trait RowTransform {
    /// Short label used in logs
    fn kind(&self) -> &'static str;

    /// All entries for `sheet`, drawing colors from `colors`
    fn entries(&self, sheet: &Sheet, colors: &mut ColorCycle) -> Result<Vec<CalendarEntry>>;
}

// ============================================================================
// Rules
// ============================================================================

/// Column names and sentinels for map sheets
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapRules {
    pub name_column: String,
    pub status_column: String,
    /// Status value of a confirmed event
    pub confirmed_status: String,
    pub staff_column: String,
    pub start_column: String,
    pub end_column: String,
    /// Names matching this are grouping rows, not events
    pub structural_pattern: String,
    /// Display label per extra date column title
    pub extra_date_labels: BTreeMap<String, String>,
}

impl Default for MapRules {
    fn default() -> Self {
        Self {
            name_column: "Event Name".into(),
            status_column: "TechX Status".into(),
            confirmed_status: "Green".into(),
            staff_column: "TechX Resource".into(),
            start_column: "Event Start Date".into(),
            end_column: "Event End Date".into(),
            structural_pattern: r"^Q[1-4]".into(),
            extra_date_labels: BTreeMap::from([
                ("JLL Hand over date".to_string(), "JLL Hand Over".to_string()),
                ("Move In Date".to_string(), "Setup Start".to_string()),
            ]),
        }
    }
}

/// Column names, markers and name substitutions for intake sheets
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntakeRules {
    pub name_column: String,
    pub state_column: String,
    /// Substring of the state marking a canceled event
    pub canceled_marker: String,
    pub start_column: String,
    pub end_column: String,
    /// Names matching this are quarter separator rows
    pub separator_pattern: String,
    /// Literal substitutions applied in order to names and column labels
    pub replacements: Vec<(String, String)>,
}

impl Default for IntakeRules {
    fn default() -> Self {
        Self {
            name_column: "Event Name".into(),
            state_column: "Event State & Type".into(),
            canceled_marker: "Canceled".into(),
            start_column: "Event Start Date".into(),
            end_column: "Event End Date".into(),
            separator_pattern: r"^Q[1-4] FY\d{2}".into(),
            replacements: vec![
                ("Cisco Live".into(), "CL".into()),
                ("Cisco ".into(), String::new()),
                ("Partner Summit".into(), "PS".into()),
                ("Date".into(), String::new()),
            ],
        }
    }
}

// ============================================================================
// Shared helpers
// ============================================================================

/// Visible date columns other than the start and end columns
fn extra_date_columns(sheet: &Sheet, start: ColumnId, end: ColumnId) -> Vec<&Column> {
    sheet
        .columns
        .iter()
        .filter(|c| c.is_date() && !c.hidden && c.id != start && c.id != end)
        .collect()
}

fn text(row: &Row, column: ColumnId) -> String {
    row.value(column).as_text().unwrap_or_default()
}

/// `"<event> | <label>"`, or empty when the event has no name
fn derived_name(event: &str, label: &str) -> String {
    if event.is_empty() {
        String::new()
    } else {
        format!("{event} | {label}")
    }
}

fn push_event(
    out: &mut Vec<CalendarEntry>,
    row: &Row,
    name: String,
    base: &str,
    dates: (ColumnId, ColumnId),
    extras: &[(ColumnId, String)],
    color: ColorIndex,
) {
    let (start, end) = dates;
    out.push(CalendarEntry::new(name, text(row, start), text(row, end), color));
    for (column, label) in extras {
        out.push(CalendarEntry::new(
            derived_name(base, label),
            text(row, *column),
            "",
            color,
        ));
    }
}

/// Apply `replacements` in order, each one to the already substituted name
pub fn shorten_name(name: &str, replacements: &[(String, String)]) -> String {
    let mut name = name.to_string();
    for (original, new) in replacements {
        if !original.is_empty() && name.contains(original.as_str()) {
            let replaced = name.replace(original.as_str(), new);
            debug!(%name, %original, %new, result = %replaced, "shortened event name");
            name = replaced;
        }
    }
    name
}

// ============================================================================
// Map sheets
// ============================================================================

/// Transform for the FY/quarter map sheet
#[derive(Clone, Debug)]
pub struct MapTransform {
    rules: MapRules,
    structural: Regex,
}

impl MapTransform {
    pub fn new(rules: MapRules) -> Result<Self> {
        let structural = Regex::new(&rules.structural_pattern)?;
        Ok(Self { rules, structural })
    }

    pub fn rules(&self) -> &MapRules {
        &self.rules
    }
}

impl RowTransform for MapTransform {
    fn kind(&self) -> &'static str {
        "map"
    }

    fn entries(&self, sheet: &Sheet, colors: &mut ColorCycle) -> Result<Vec<CalendarEntry>> {
        let columns = ColumnMap::from_sheet(sheet);
        let name_col = columns.require(&self.rules.name_column)?;
        let status_col = columns.require(&self.rules.status_column)?;
        let staff_col = columns.require(&self.rules.staff_column)?;
        let start_col = columns.require(&self.rules.start_column)?;
        let end_col = columns.require(&self.rules.end_column)?;

        let extras: Vec<(ColumnId, String)> = extra_date_columns(sheet, start_col, end_col)
            .into_iter()
            .map(|c| {
                let label = self
                    .rules
                    .extra_date_labels
                    .get(&c.title)
                    .cloned()
                    .unwrap_or_else(|| c.title.trim().to_string());
                (c.id, label)
            })
            .collect();
        debug!(
            columns = sheet.columns.len(),
            date_columns = extras.len(),
            rows = sheet.rows.len(),
            "processing map sheet"
        );

        let mut out = Vec::new();
        for row in &sheet.rows {
            let event = row
                .cell(name_col)
                .and_then(|c| c.display_text())
                .unwrap_or_default();
            if event.is_empty() || row.parent_id.is_none() || self.structural.is_match(&event) {
                debug!(%event, "non-event row");
                continue;
            }
            if row.value(status_col).as_text().as_deref() != Some(self.rules.confirmed_status.as_str()) {
                debug!(%event, "unconfirmed event");
                continue;
            }

            debug!(%event, "processing event");
            let color = colors.next_color();
            let staff = text(row, staff_col);
            let staff = staff.trim_matches('"');
            let name = if staff.is_empty() {
                debug!(%event, "no staff assigned");
                event.clone()
            } else {
                debug!(%event, %staff, "staff assigned");
                format!("{event} | {staff}")
            };
            push_event(&mut out, row, name, &event, (start_col, end_col), &extras, color);
        }
        Ok(out)
    }
}

// ============================================================================
// Intake sheets
// ============================================================================

/// Transform for the intake form sheet
#[derive(Clone, Debug)]
pub struct IntakeTransform {
    rules: IntakeRules,
    separator: Regex,
}

impl IntakeTransform {
    pub fn new(rules: IntakeRules) -> Result<Self> {
        let separator = Regex::new(&rules.separator_pattern)?;
        Ok(Self { rules, separator })
    }

    pub fn rules(&self) -> &IntakeRules {
        &self.rules
    }
}

impl RowTransform for IntakeTransform {
    fn kind(&self) -> &'static str {
        "intake"
    }

    fn entries(&self, sheet: &Sheet, colors: &mut ColorCycle) -> Result<Vec<CalendarEntry>> {
        let columns = ColumnMap::from_sheet(sheet);
        let name_col = columns.require(&self.rules.name_column)?;
        let state_col = columns.require(&self.rules.state_column)?;
        let start_col = columns.require(&self.rules.start_column)?;
        let end_col = columns.require(&self.rules.end_column)?;

        let extras: Vec<(ColumnId, String)> = extra_date_columns(sheet, start_col, end_col)
            .into_iter()
            .map(|c| {
                let label = shorten_name(&c.title, &self.rules.replacements);
                // trimmed, unlike the raw title: "Booth Date" yields "Booth", not "Booth "
                (c.id, label.trim().to_string())
            })
            .collect();
        debug!(
            columns = sheet.columns.len(),
            date_columns = extras.len(),
            rows = sheet.rows.len(),
            "processing intake sheet"
        );

        let mut out = Vec::new();
        for row in &sheet.rows {
            let mut event = text(row, name_col);
            if self.separator.is_match(&event) {
                debug!(%event, "separator row");
                continue;
            }
            let state = text(row, state_col);
            if !event.is_empty() && state.contains(self.rules.canceled_marker.as_str()) {
                debug!(%event, "canceled event");
                event = format!("(Canceled) {event}");
            }

            debug!(%event, "processing event");
            let color = colors.next_color();
            let event = shorten_name(&event, &self.rules.replacements);
            push_event(&mut out, row, event.clone(), &event, (start_col, end_col), &extras, color);
        }
        Ok(out)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sheetsync_core::{Cell, ColumnType};

    const NAME: ColumnId = 1;
    const STATUS: ColumnId = 2;
    const STAFF: ColumnId = 3;
    const START: ColumnId = 4;
    const END: ColumnId = 5;
    const MOVE_IN: ColumnId = 6;
    const HIDDEN: ColumnId = 7;

    fn map_sheet(rows: Vec<Row>) -> Sheet {
        let mut sheet = Sheet::new(1, "Map");
        sheet.columns = vec![
            Column::new(NAME, "Event Name", ColumnType::TextNumber).primary(),
            Column::new(STATUS, "TechX Status", ColumnType::Picklist),
            Column::new(STAFF, "TechX Resource", ColumnType::TextNumber),
            Column::new(START, "Event Start Date", ColumnType::Date),
            Column::new(END, "Event End Date", ColumnType::Date),
            Column::new(MOVE_IN, "Move In Date", ColumnType::Date),
            Column::new(HIDDEN, "Internal Date", ColumnType::Date).hidden(),
        ];
        sheet.rows = rows;
        sheet
    }

    fn event(id: i64, name: &str, status: &str) -> Row {
        Row::new()
            .with_id(id)
            .child_of(100)
            .with_cell(Cell::new(NAME, name).with_display(name))
            .with_cell(Cell::new(STATUS, status))
            .with_cell(Cell::new(START, "2024-02-01"))
            .with_cell(Cell::new(END, "2024-02-03"))
    }

    fn map_entries(rows: Vec<Row>) -> Vec<CalendarEntry> {
        let transform = MapTransform::new(MapRules::default()).unwrap();
        transform
            .entries(&map_sheet(rows), &mut ColorCycle::new())
            .unwrap()
    }

    #[test]
    fn map_confirmed_event_with_staff_and_extra_date() {
        let row = event(1, "Summit", "Green")
            .with_cell(Cell::new(STAFF, "\"Dana\""))
            .with_cell(Cell::new(MOVE_IN, "2024-01-30"));
        assert_eq!(
            map_entries(vec![row]),
            vec![
                CalendarEntry::new("Summit | Dana", "2024-02-01", "2024-02-03", 4),
                CalendarEntry::new("Summit | Setup Start", "2024-01-30", "", 4),
            ]
        );
    }

    #[test]
    fn map_skips_unconfirmed_structural_and_top_level_rows() {
        let mut top_level = event(3, "Orphan", "Green");
        top_level.parent_id = None;
        let rows = vec![
            event(1, "Summit", "Yellow"),
            event(2, "Q3", "Green"),
            top_level,
            event(4, "", "Green"),
        ];
        assert!(map_entries(rows).is_empty());
    }

    #[test]
    fn map_events_without_dates_keep_empty_strings() {
        let mut row = event(1, "Summit", "Green");
        row.cells.retain(|c| c.column_id != START && c.column_id != END);
        assert_eq!(
            map_entries(vec![row]),
            vec![
                CalendarEntry::new("Summit", "", "", 4),
                CalendarEntry::new("Summit | Setup Start", "", "", 4),
            ]
        );
    }

    #[test]
    fn each_event_draws_the_next_color() {
        let entries = map_entries(vec![event(1, "A", "Green"), event(2, "B", "Green")]);
        let colors: Vec<u8> = entries.iter().map(|e| e.color).collect();
        assert_eq!(colors, vec![4, 4, 5, 5]);
    }

    #[test]
    fn map_requires_its_columns() {
        let mut sheet = map_sheet(vec![]);
        sheet.columns.retain(|c| c.id != STAFF);
        let transform = MapTransform::new(MapRules::default()).unwrap();
        assert!(transform.entries(&sheet, &mut ColorCycle::new()).is_err());
    }

    fn intake_sheet(rows: Vec<Row>) -> Sheet {
        let mut sheet = Sheet::new(2, "Intake");
        sheet.columns = vec![
            Column::new(NAME, "Event Name", ColumnType::TextNumber).primary(),
            Column::new(STATUS, "Event State & Type", ColumnType::Picklist),
            Column::new(START, "Event Start Date", ColumnType::Date),
            Column::new(END, "Event End Date", ColumnType::Date),
            Column::new(MOVE_IN, "Cisco Booth Date", ColumnType::Date),
        ];
        sheet.rows = rows;
        sheet
    }

    fn intake_entries(rows: Vec<Row>) -> Vec<CalendarEntry> {
        let transform = IntakeTransform::new(IntakeRules::default()).unwrap();
        transform
            .entries(&intake_sheet(rows), &mut ColorCycle::new())
            .unwrap()
    }

    #[test]
    fn intake_separator_rows_emit_nothing() {
        let row = Row::new().with_id(1).with_cell(Cell::new(NAME, "Q1 FY24"));
        assert!(intake_entries(vec![row]).is_empty());
    }

    #[test]
    fn intake_canceled_and_shortened() {
        let row = Row::new()
            .with_id(1)
            .with_cell(Cell::new(NAME, "Cisco Live Amsterdam"))
            .with_cell(Cell::new(STATUS, "Canceled - Virtual"))
            .with_cell(Cell::new(START, "2024-02-05"))
            .with_cell(Cell::new(MOVE_IN, "2024-02-01"));
        assert_eq!(
            intake_entries(vec![row]),
            vec![
                CalendarEntry::new("(Canceled) CL Amsterdam", "2024-02-05", "", 4),
                CalendarEntry::new("(Canceled) CL Amsterdam | Booth", "2024-02-01", "", 4),
            ]
        );
    }

    #[test]
    fn intake_extra_date_labels_are_trimmed() {
        let mut sheet = intake_sheet(vec![Row::new()
            .with_id(1)
            .with_cell(Cell::new(NAME, "Summit"))
            .with_cell(Cell::new(STATUS, "Planned"))
            .with_cell(Cell::new(START, "2024-02-05"))
            .with_cell(Cell::new(90, "2024-01-20"))]);
        sheet.columns.retain(|c| c.id != MOVE_IN);
        sheet
            .columns
            .push(Column::new(90, "Partner Summit Date", ColumnType::Date));

        let transform = IntakeTransform::new(IntakeRules::default()).unwrap();
        let entries = transform.entries(&sheet, &mut ColorCycle::new()).unwrap();
        assert_eq!(
            entries[1],
            CalendarEntry::new("Summit | PS", "2024-01-20", "", 4)
        );
    }

    #[test]
    fn intake_rows_without_name_produce_unwritable_entries() {
        let row = Row::new()
            .with_id(1)
            .with_cell(Cell::new(STATUS, "Canceled"))
            .with_cell(Cell::new(START, "2024-02-05"))
            .with_cell(Cell::new(MOVE_IN, "2024-02-01"));
        let entries = intake_entries(vec![row]);
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| !e.is_writable()));
    }

    #[test]
    fn replacements_rescan_substituted_text() {
        let replacements = vec![
            ("Cisco Live".to_string(), "CL".to_string()),
            ("CL ".to_string(), "CL-".to_string()),
        ];
        assert_eq!(shorten_name("Cisco Live Vegas", &replacements), "CL-Vegas");
        assert_eq!(
            shorten_name("Partner Summit Date", &IntakeRules::default().replacements),
            "PS "
        );
    }

    #[test]
    fn invalid_pattern_is_reported() {
        let rules = MapRules {
            structural_pattern: "(".into(),
            ..MapRules::default()
        };
        assert!(MapTransform::new(rules).is_err());
    }
}

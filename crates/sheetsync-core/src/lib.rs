//! # sheetsync-core
//!
//! Core domain model and traits for the sheetsync calendar tooling.
//!
//! This crate provides:
//! - Sheet types: `Sheet`, `Column`, `Row`, `Cell`, `CellValue`, `Format`
//! - Write-side types: `NewRow`, `RowUpdate`, `Placement`
//! - The `SheetGateway` trait every remote or in-process sheet store implements
//! - The fiscal calendar classifier ([`fiscal`]) and presentation palette ([`palette`])
//! - An in-memory gateway ([`memory`]) for tests and offline snapshots
//!
//! ## Example
//!
//! ```rust
//! use sheetsync_core::{Cell, ColumnType, Column, MemoryGateway, NewRow, Sheet, SheetGateway};
//!
//! let mut sheet = Sheet::new(1, "Calendar");
//! sheet.columns.push(Column::new(10, "Event", ColumnType::TextNumber).primary());
//!
//! let mut gateway = MemoryGateway::new().with_sheet(sheet);
//! let created = gateway
//!     .add_rows(1, &[NewRow::to_bottom().with_cell(Cell::new(10, "Launch"))])
//!     .unwrap();
//! assert_eq!(created.len(), 1);
//! ```

pub mod fiscal;
pub mod memory;
pub mod palette;

pub use fiscal::{FiscalCalendar, FiscalError, FiscalPeriod, FiscalYear, QuarterRange};
pub use memory::MemoryGateway;
pub use palette::{ColorCycle, ColorIndex};

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Type Aliases
// ============================================================================

/// Remote identifier of a sheet
pub type SheetId = i64;

/// Remote identifier of a row
pub type RowId = i64;

/// Remote identifier of a column
pub type ColumnId = i64;

// ============================================================================
// Columns
// ============================================================================

/// Column type tag as reported by the remote service
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ColumnType {
    TextNumber,
    Date,
    Datetime,
    AbstractDatetime,
    Checkbox,
    Picklist,
    MultiPicklist,
    ContactList,
    MultiContactList,
    Duration,
    Predecessor,
    /// A tag this crate does not model explicitly
    Other(String),
}

impl ColumnType {
    /// Parse a remote type tag such as `DATE` or `TEXT_NUMBER`
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "TEXT_NUMBER" => ColumnType::TextNumber,
            "DATE" => ColumnType::Date,
            "DATETIME" => ColumnType::Datetime,
            "ABSTRACT_DATETIME" => ColumnType::AbstractDatetime,
            "CHECKBOX" => ColumnType::Checkbox,
            "PICKLIST" => ColumnType::Picklist,
            "MULTI_PICKLIST" => ColumnType::MultiPicklist,
            "CONTACT_LIST" => ColumnType::ContactList,
            "MULTI_CONTACT_LIST" => ColumnType::MultiContactList,
            "DURATION" => ColumnType::Duration,
            "PREDECESSOR" => ColumnType::Predecessor,
            other => ColumnType::Other(other.to_string()),
        }
    }

    /// The remote type tag for this column type
    pub fn as_tag(&self) -> &str {
        match self {
            ColumnType::TextNumber => "TEXT_NUMBER",
            ColumnType::Date => "DATE",
            ColumnType::Datetime => "DATETIME",
            ColumnType::AbstractDatetime => "ABSTRACT_DATETIME",
            ColumnType::Checkbox => "CHECKBOX",
            ColumnType::Picklist => "PICKLIST",
            ColumnType::MultiPicklist => "MULTI_PICKLIST",
            ColumnType::ContactList => "CONTACT_LIST",
            ColumnType::MultiContactList => "MULTI_CONTACT_LIST",
            ColumnType::Duration => "DURATION",
            ColumnType::Predecessor => "PREDECESSOR",
            ColumnType::Other(tag) => tag,
        }
    }
}

impl From<String> for ColumnType {
    fn from(tag: String) -> Self {
        ColumnType::from_tag(&tag)
    }
}

impl From<ColumnType> for String {
    fn from(column_type: ColumnType) -> Self {
        column_type.as_tag().to_string()
    }
}

/// A named, typed column of a sheet
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Remote identifier
    pub id: ColumnId,
    /// Column title (unique within a sheet)
    pub title: String,
    /// Type tag
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    /// Hidden columns are skipped when looking for extra date columns
    #[serde(default)]
    pub hidden: bool,
    /// The sheet's primary column
    #[serde(default)]
    pub primary: bool,
    /// Position within the sheet
    #[serde(default)]
    pub index: usize,
}

impl Column {
    pub fn new(id: ColumnId, title: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            id,
            title: title.into(),
            column_type,
            hidden: false,
            primary: false,
            index: 0,
        }
    }

    /// Mark as the primary column
    pub fn primary(mut self) -> Self {
        self.primary = true;
        self
    }

    /// Mark as hidden
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn is_date(&self) -> bool {
        self.column_type == ColumnType::Date
    }
}

// ============================================================================
// Cells
// ============================================================================

/// The value held by a cell.
///
/// Scalars and the structured multi-value form are distinct variants so that
/// copying a cell never has to probe for an object type.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    /// Structured multi-select value
    MultiPicklist(Vec<String>),
}

static EMPTY_VALUE: CellValue = CellValue::Empty;

impl CellValue {
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(text) => text.is_empty(),
            CellValue::MultiPicklist(values) => values.is_empty(),
            CellValue::Number(_) | CellValue::Bool(_) => false,
        }
    }

    /// True for the structured multi-value variant
    pub fn is_structured(&self) -> bool {
        matches!(self, CellValue::MultiPicklist(_))
    }

    /// Borrow the text of a `Text` value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Render the value as text, `None` when empty.
    ///
    /// Integral numbers render without a fractional part and multi-values
    /// are joined with `", "`.
    pub fn as_text(&self) -> Option<String> {
        if self.is_empty() {
            return None;
        }
        match self {
            CellValue::Empty => None,
            CellValue::Text(text) => Some(text.clone()),
            CellValue::Number(n) if n.fract() == 0.0 && n.is_finite() => {
                Some(format!("{}", *n as i64))
            }
            CellValue::Number(n) => Some(n.to_string()),
            CellValue::Bool(b) => Some(b.to_string()),
            CellValue::MultiPicklist(values) => Some(values.join(", ")),
        }
    }
}

impl From<&str> for CellValue {
    fn from(text: &str) -> Self {
        CellValue::Text(text.to_string())
    }
}

impl From<String> for CellValue {
    fn from(text: String) -> Self {
        CellValue::Text(text)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Bool(b)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<Vec<String>> for CellValue {
    fn from(values: Vec<String>) -> Self {
        CellValue::MultiPicklist(values)
    }
}

/// A single cell of a row
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub column_id: ColumnId,
    #[serde(default)]
    pub value: CellValue,
    /// Formatted value computed by the remote service (read-only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<Format>,
}

impl Cell {
    pub fn new(column_id: ColumnId, value: impl Into<CellValue>) -> Self {
        Self {
            column_id,
            value: value.into(),
            display_value: None,
            format: None,
        }
    }

    pub fn empty(column_id: ColumnId) -> Self {
        Self::new(column_id, CellValue::Empty)
    }

    pub fn with_display(mut self, display: impl Into<String>) -> Self {
        self.display_value = Some(display.into());
        self
    }

    pub fn with_format(mut self, format: Format) -> Self {
        self.format = Some(format);
        self
    }

    /// Display value when present, otherwise the rendered raw value
    pub fn display_text(&self) -> Option<String> {
        match &self.display_value {
            Some(display) if !display.is_empty() => Some(display.clone()),
            _ => self.value.as_text(),
        }
    }
}

// ============================================================================
// Formatting
// ============================================================================

/// Number of positions in a remote format descriptor
pub const FORMAT_DESCRIPTOR_FIELDS: usize = 17;
const BACKGROUND_POSITION: usize = 9;
const TASKBAR_POSITION: usize = 10;

/// Row or cell presentation, limited to the fields this tool manages.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Format {
    /// Palette index for the background color
    pub background: Option<ColorIndex>,
    /// Palette index for the Gantt taskbar color
    pub taskbar: Option<ColorIndex>,
}

impl Format {
    /// Background color only
    pub fn background(color: ColorIndex) -> Self {
        Self {
            background: Some(color),
            taskbar: None,
        }
    }

    /// Background and taskbar in the same color
    pub fn filled(color: ColorIndex) -> Self {
        Self {
            background: Some(color),
            taskbar: Some(color),
        }
    }

    /// Encode as a remote descriptor such as `",,,,,,,,,12,,,,,,,"`
    pub fn descriptor(&self) -> String {
        let mut fields = vec![String::new(); FORMAT_DESCRIPTOR_FIELDS];
        if let Some(bg) = self.background {
            fields[BACKGROUND_POSITION] = bg.to_string();
        }
        if let Some(bar) = self.taskbar {
            fields[TASKBAR_POSITION] = bar.to_string();
        }
        fields.join(",")
    }

    /// Decode the fields this tool manages from a remote descriptor.
    ///
    /// Unknown or malformed positions are ignored.
    pub fn parse(descriptor: &str) -> Self {
        let fields: Vec<&str> = descriptor.split(',').collect();
        let field = |pos: usize| fields.get(pos).and_then(|f| f.trim().parse().ok());
        Self {
            background: field(BACKGROUND_POSITION),
            taskbar: field(TASKBAR_POSITION),
        }
    }
}

// ============================================================================
// Rows and Sheets
// ============================================================================

/// A row of a sheet; `parent_id` places it in the sheet's tree
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Row {
    /// Absent until the row is persisted
    #[serde(default)]
    pub id: Option<RowId>,
    #[serde(default)]
    pub parent_id: Option<RowId>,
    #[serde(default)]
    pub cells: Vec<Cell>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<Format>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expanded: Option<bool>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(mut self, id: RowId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn child_of(mut self, parent_id: RowId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn with_cell(mut self, cell: Cell) -> Self {
        self.set_cell(cell);
        self
    }

    pub fn is_top_level(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Cell for the given column, if the row carries one
    pub fn cell(&self, column_id: ColumnId) -> Option<&Cell> {
        self.cells.iter().find(|c| c.column_id == column_id)
    }

    /// Value for the given column (`Empty` when the row has no such cell)
    pub fn value(&self, column_id: ColumnId) -> &CellValue {
        self.cell(column_id).map_or(&EMPTY_VALUE, |c| &c.value)
    }

    /// Replace the cell for `cell.column_id`, or append it
    pub fn set_cell(&mut self, cell: Cell) {
        match self.cells.iter_mut().find(|c| c.column_id == cell.column_id) {
            Some(existing) => *existing = cell,
            None => self.cells.push(cell),
        }
    }
}

/// A remote sheet snapshot; rows are in display order
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Sheet {
    pub id: SheetId,
    #[serde(default)]
    pub name: String,
    /// Remote version counter at fetch time
    #[serde(default)]
    pub version: Option<i64>,
    #[serde(default)]
    pub columns: Vec<Column>,
    #[serde(default)]
    pub rows: Vec<Row>,
}

impl Sheet {
    pub fn new(id: SheetId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn column_by_title(&self, title: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.title == title)
    }

    /// The flagged primary column, falling back to the first column
    pub fn primary_column(&self) -> Option<&Column> {
        self.columns
            .iter()
            .find(|c| c.primary)
            .or_else(|| self.columns.first())
    }

    pub fn row(&self, id: RowId) -> Option<&Row> {
        self.rows.iter().find(|r| r.id == Some(id))
    }

    pub fn top_level_rows(&self) -> impl Iterator<Item = &Row> {
        self.rows.iter().filter(|r| r.is_top_level())
    }

    /// Direct children of `parent_id`, in display order
    pub fn children_of(&self, parent_id: RowId) -> impl Iterator<Item = &Row> {
        self.rows
            .iter()
            .filter(move |r| r.parent_id == Some(parent_id))
    }

    pub fn has_children(&self, parent_id: RowId) -> bool {
        self.children_of(parent_id).next().is_some()
    }
}

// ============================================================================
// Write Requests
// ============================================================================

/// Where a new row lands in the sheet tree
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Placement {
    /// Last top-level row
    ToBottom,
    /// Child of `parent_id`, as last (`to_bottom`) or first child
    Parent { parent_id: RowId, to_bottom: bool },
    /// Directly above `sibling_id`, sharing its parent
    SiblingAbove { sibling_id: RowId },
}

/// A row to be created
#[derive(Clone, Debug, PartialEq)]
pub struct NewRow {
    pub placement: Placement,
    pub cells: Vec<Cell>,
    pub format: Option<Format>,
}

impl NewRow {
    pub fn new(placement: Placement) -> Self {
        Self {
            placement,
            cells: Vec::new(),
            format: None,
        }
    }

    pub fn to_bottom() -> Self {
        Self::new(Placement::ToBottom)
    }

    /// Last child of `parent_id`
    pub fn under(parent_id: RowId) -> Self {
        Self::new(Placement::Parent {
            parent_id,
            to_bottom: true,
        })
    }

    pub fn above(sibling_id: RowId) -> Self {
        Self::new(Placement::SiblingAbove { sibling_id })
    }

    pub fn with_cell(mut self, cell: Cell) -> Self {
        self.cells.push(cell);
        self
    }

    pub fn with_format(mut self, format: Format) -> Self {
        self.format = Some(format);
        self
    }

    pub fn value(&self, column_id: ColumnId) -> &CellValue {
        self.cells
            .iter()
            .find(|c| c.column_id == column_id)
            .map_or(&EMPTY_VALUE, |c| &c.value)
    }

    /// Replace the cell for `cell.column_id`, or append it
    pub fn set_cell(&mut self, cell: Cell) {
        match self.cells.iter_mut().find(|c| c.column_id == cell.column_id) {
            Some(existing) => *existing = cell,
            None => self.cells.push(cell),
        }
    }
}

/// A partial update of an existing row: listed cells replace the stored ones
#[derive(Clone, Debug, PartialEq)]
pub struct RowUpdate {
    pub id: RowId,
    pub cells: Vec<Cell>,
    pub format: Option<Format>,
}

impl RowUpdate {
    pub fn new(id: RowId) -> Self {
        Self {
            id,
            cells: Vec::new(),
            format: None,
        }
    }

    /// An update rewriting every cell of `row`; `None` if the row has no id
    pub fn from_row(row: &Row) -> Option<Self> {
        let id = row.id?;
        Some(Self {
            id,
            cells: row
                .cells
                .iter()
                .map(|c| Cell::new(c.column_id, c.value.clone()))
                .collect(),
            format: None,
        })
    }

    pub fn with_format(mut self, format: Format) -> Self {
        self.format = Some(format);
        self
    }

    /// Replace the cell for `cell.column_id`, or append it
    pub fn set_cell(&mut self, cell: Cell) {
        match self.cells.iter_mut().find(|c| c.column_id == cell.column_id) {
            Some(existing) => *existing = cell,
            None => self.cells.push(cell),
        }
    }
}

/// Optional payload when fetching a sheet
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FetchOptions {
    /// Return structured multi-values instead of their text rendering
    pub include_object_values: bool,
    /// Return child rows as well as top-level rows
    pub include_descendants: bool,
}

impl FetchOptions {
    pub fn full() -> Self {
        Self {
            include_object_values: true,
            include_descendants: true,
        }
    }
}

// ============================================================================
// Calendar Entries
// ============================================================================

/// One line of a generated calendar sheet.
///
/// `start` and `end` carry the remote date strings unchanged and are empty
/// when the source row had no value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEntry {
    pub name: String,
    pub start: String,
    pub end: String,
    pub color: ColorIndex,
}

impl CalendarEntry {
    pub fn new(
        name: impl Into<String>,
        start: impl Into<String>,
        end: impl Into<String>,
        color: ColorIndex,
    ) -> Self {
        Self {
            name: name.into(),
            start: start.into(),
            end: end.into(),
            color,
        }
    }

    /// Only entries with a name and a start date reach a calendar sheet
    pub fn is_writable(&self) -> bool {
        !self.name.is_empty() && !self.start.is_empty()
    }
}

// ============================================================================
// Gateway
// ============================================================================

/// Read/write access to remote sheets.
///
/// Implementations are passed explicitly to every operation; there is no
/// process-wide session.
pub trait SheetGateway {
    /// Fetch a sheet's columns and rows
    fn get_sheet(&mut self, sheet_id: SheetId, options: FetchOptions) -> Result<Sheet, GatewayError>;

    /// Fetch a sheet's full column list
    fn get_columns(&mut self, sheet_id: SheetId) -> Result<Vec<Column>, GatewayError>;

    /// Create rows, returning them with their new ids
    fn add_rows(&mut self, sheet_id: SheetId, rows: &[NewRow]) -> Result<Vec<Row>, GatewayError>;

    /// Apply partial updates to existing rows
    fn update_rows(
        &mut self,
        sheet_id: SheetId,
        rows: &[RowUpdate],
    ) -> Result<Vec<Row>, GatewayError>;

    /// Delete rows (and their descendants)
    fn delete_rows(&mut self, sheet_id: SheetId, ids: &[RowId]) -> Result<(), GatewayError>;
}

// ============================================================================
// Errors
// ============================================================================

/// Failure talking to a sheet store
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Sheet not found: {0}")]
    SheetNotFound(SheetId),

    #[error("Row {row_id} not found in sheet {sheet_id}")]
    RowNotFound { sheet_id: SheetId, row_id: RowId },

    #[error("Write to sheet {sheet_id} rejected: {reason}")]
    Rejected { sheet_id: SheetId, reason: String },

    #[error("API error {code} (HTTP {status}): {message}")]
    Api {
        status: u16,
        code: i64,
        message: String,
    },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Malformed response: {0}")]
    Decode(String),
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn format_descriptor_positions() {
        assert_eq!(Format::filled(7).descriptor(), ",,,,,,,,,7,7,,,,,,");
        assert_eq!(Format::background(12).descriptor(), ",,,,,,,,,12,,,,,,,");
        assert_eq!(Format::default().descriptor(), ",".repeat(16));
    }

    #[test]
    fn format_parse_reads_background_and_taskbar() {
        assert_eq!(Format::parse(",,,,,,,,,21,,,,,,"), Format::background(21));
        assert_eq!(Format::parse(",,1,,,,,,,5,5,,,,,,"), Format::filled(5));
        assert_eq!(Format::parse(""), Format::default());
    }

    #[test]
    fn cell_value_text_rendering() {
        assert_eq!(CellValue::Number(3.0).as_text().as_deref(), Some("3"));
        assert_eq!(CellValue::Number(2.5).as_text().as_deref(), Some("2.5"));
        assert_eq!(CellValue::from("").as_text(), None);
        assert_eq!(
            CellValue::from(vec!["A".to_string(), "B".to_string()])
                .as_text()
                .as_deref(),
            Some("A, B")
        );
        assert!(CellValue::MultiPicklist(vec![]).is_structured());
        assert!(!CellValue::from("x").is_structured());
    }

    #[test]
    fn row_value_defaults_to_empty() {
        let row = Row::new().with_id(1).with_cell(Cell::new(5, "x"));
        assert_eq!(row.value(5), &CellValue::from("x"));
        assert_eq!(row.value(6), &CellValue::Empty);
    }

    #[test]
    fn set_cell_replaces_existing_column() {
        let mut row = Row::new().with_cell(Cell::new(5, "Yellow"));
        row.set_cell(Cell::new(5, "Green"));
        assert_eq!(row.cells.len(), 1);
        assert_eq!(row.value(5).as_str(), Some("Green"));
    }

    #[test]
    fn row_update_carries_all_cells_without_formats() {
        let row = Row::new()
            .with_id(9)
            .with_cell(Cell::new(1, "a").with_format(Format::background(3)))
            .with_cell(Cell::new(2, vec!["x".to_string()]));
        let update = RowUpdate::from_row(&row).unwrap();
        assert_eq!(update.id, 9);
        assert_eq!(update.cells.len(), 2);
        assert!(update.cells.iter().all(|c| c.format.is_none()));
        assert!(update.cells[1].value.is_structured());
        assert!(RowUpdate::from_row(&Row::new()).is_none());
    }

    #[test]
    fn column_type_tags_round_trip() {
        for tag in ["DATE", "TEXT_NUMBER", "MULTI_PICKLIST", "CHECKBOX", "WEIRD"] {
            assert_eq!(ColumnType::from_tag(tag).as_tag(), tag);
        }
        let column: Column =
            serde_json::from_str(r#"{"id": 1, "title": "Start", "type": "DATE"}"#).unwrap();
        assert!(column.is_date());
    }

    #[test]
    fn sheet_tree_navigation() {
        let mut sheet = Sheet::new(1, "Map");
        sheet.columns.push(Column::new(10, "Event Name", ColumnType::TextNumber));
        sheet.rows = vec![
            Row::new().with_id(1),
            Row::new().with_id(2).child_of(1),
            Row::new().with_id(3).child_of(1),
            Row::new().with_id(4),
        ];
        let children: Vec<_> = sheet.children_of(1).filter_map(|r| r.id).collect();
        assert_eq!(children, vec![2, 3]);
        assert_eq!(sheet.top_level_rows().count(), 2);
        assert!(!sheet.has_children(4));
        assert_eq!(sheet.primary_column().map(|c| c.id), Some(10));
    }

    #[test]
    fn calendar_entry_writability() {
        assert!(CalendarEntry::new("Launch", "2024-01-01", "", 4).is_writable());
        assert!(!CalendarEntry::new("", "2024-01-01", "", 4).is_writable());
        assert!(!CalendarEntry::new("Launch", "", "", 4).is_writable());
    }
}

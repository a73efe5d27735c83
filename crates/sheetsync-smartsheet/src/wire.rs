//! Smartsheet API 2.0 JSON shapes
//!
//! Responses decode into the `Wire*` types and convert into the core model;
//! writes convert from the core model into the request bodies. Field names
//! follow the API's camelCase.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sheetsync_core::{
    Cell, CellValue, Column, ColumnType, Format, NewRow, Placement, Row, RowUpdate, Sheet,
};

/// `objectType` of a multi-select picklist value
pub const MULTI_PICKLIST: &str = "MULTI_PICKLIST";

/// Value sent for cells that are rewritten without content
pub const BLANK_VALUE: &str = " ";

// ============================================================================
// Responses
// ============================================================================

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireSheet {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: Option<i64>,
    #[serde(default)]
    pub columns: Vec<WireColumn>,
    #[serde(default)]
    pub rows: Vec<WireRow>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireColumn {
    pub id: i64,
    #[serde(default)]
    pub index: usize,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "type", default)]
    pub column_type: String,
    #[serde(default)]
    pub primary: bool,
    #[serde(default)]
    pub hidden: bool,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireRow {
    pub id: i64,
    #[serde(default)]
    pub parent_id: Option<i64>,
    #[serde(default)]
    pub expanded: Option<bool>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub cells: Vec<WireCell>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireCell {
    pub column_id: i64,
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub display_value: Option<String>,
    #[serde(default)]
    pub object_value: Option<Value>,
    #[serde(default)]
    pub format: Option<String>,
}

/// Envelope of row-writing calls
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireResult<T> {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub result_code: i64,
    pub result: Option<T>,
    #[serde(default)]
    pub version: Option<i64>,
}

/// Paged list, as returned by the column listing
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WirePage<T> {
    #[serde(default)]
    pub total_count: usize,
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

/// Error body returned with non-2xx responses
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireError {
    #[serde(default)]
    pub error_code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub ref_id: Option<String>,
}

impl From<WireColumn> for Column {
    fn from(column: WireColumn) -> Self {
        Self {
            id: column.id,
            title: column.title,
            column_type: ColumnType::from_tag(&column.column_type),
            hidden: column.hidden,
            primary: column.primary,
            index: column.index,
        }
    }
}

impl From<WireCell> for Cell {
    fn from(cell: WireCell) -> Self {
        let value = match cell.object_value.as_ref().and_then(multi_picklist_values) {
            Some(values) => CellValue::MultiPicklist(values),
            None => cell.value.map_or(CellValue::Empty, scalar),
        };
        Self {
            column_id: cell.column_id,
            value,
            display_value: cell.display_value,
            format: cell.format.as_deref().map(Format::parse),
        }
    }
}

impl From<WireRow> for Row {
    fn from(row: WireRow) -> Self {
        Self {
            id: Some(row.id),
            parent_id: row.parent_id,
            cells: row.cells.into_iter().map(Cell::from).collect(),
            format: row.format.as_deref().map(Format::parse),
            expanded: row.expanded,
        }
    }
}

impl From<WireSheet> for Sheet {
    fn from(sheet: WireSheet) -> Self {
        Self {
            id: sheet.id,
            name: sheet.name,
            version: sheet.version,
            columns: sheet.columns.into_iter().map(Column::from).collect(),
            rows: sheet.rows.into_iter().map(Row::from).collect(),
        }
    }
}

fn scalar(value: Value) -> CellValue {
    match value {
        Value::Null => CellValue::Empty,
        Value::Bool(b) => CellValue::Bool(b),
        Value::Number(n) => n.as_f64().map_or(CellValue::Empty, CellValue::Number),
        Value::String(s) => CellValue::Text(s),
        other => CellValue::Text(other.to_string()),
    }
}

/// Values of a `MULTI_PICKLIST` object value; other object types yield `None`
fn multi_picklist_values(object: &Value) -> Option<Vec<String>> {
    if object.get("objectType")?.as_str()? != MULTI_PICKLIST {
        return None;
    }
    let values = object
        .get("values")?
        .as_array()?
        .iter()
        .filter_map(|v| v.as_str().map(str::to_string))
        .collect();
    Some(values)
}

// ============================================================================
// Requests
// ============================================================================

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WireObjectValue {
    pub object_type: &'static str,
    pub values: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingCell {
    pub column_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_value: Option<WireObjectValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    pub strict: bool,
    pub override_validation: bool,
}

impl From<&Cell> for OutgoingCell {
    fn from(cell: &Cell) -> Self {
        let (value, object_value) = match &cell.value {
            CellValue::Empty => (Some(Value::from(BLANK_VALUE)), None),
            CellValue::Text(text) if text.is_empty() => (Some(Value::from(BLANK_VALUE)), None),
            CellValue::Text(text) => (Some(Value::from(text.as_str())), None),
            CellValue::Number(n) => (Some(Value::from(*n)), None),
            CellValue::Bool(b) => (Some(Value::from(*b)), None),
            CellValue::MultiPicklist(values) => (
                None,
                Some(WireObjectValue {
                    object_type: MULTI_PICKLIST,
                    values: values.clone(),
                }),
            ),
        };
        Self {
            column_id: cell.column_id,
            value,
            object_value,
            format: cell.format.map(|f| f.descriptor()),
            strict: false,
            override_validation: true,
        }
    }
}

/// Body item of `POST /sheets/{id}/rows`
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingNewRow {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_bottom: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sibling_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub above: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    pub cells: Vec<OutgoingCell>,
}

impl From<&NewRow> for OutgoingNewRow {
    fn from(row: &NewRow) -> Self {
        let (to_bottom, parent_id, sibling_id, above) = match row.placement {
            Placement::ToBottom => (Some(true), None, None, None),
            Placement::Parent {
                parent_id,
                to_bottom,
            } => (Some(to_bottom), Some(parent_id), None, None),
            Placement::SiblingAbove { sibling_id } => (None, None, Some(sibling_id), Some(true)),
        };
        Self {
            to_bottom,
            parent_id,
            sibling_id,
            above,
            format: row.format.map(|f| f.descriptor()),
            cells: row.cells.iter().map(OutgoingCell::from).collect(),
        }
    }
}

/// Body item of `PUT /sheets/{id}/rows`
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingUpdate {
    pub id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    pub cells: Vec<OutgoingCell>,
}

impl From<&RowUpdate> for OutgoingUpdate {
    fn from(update: &RowUpdate) -> Self {
        Self {
            id: update.id,
            format: update.format.map(|f| f.descriptor()),
            cells: update.cells.iter().map(OutgoingCell::from).collect(),
        }
    }
}

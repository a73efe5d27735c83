//! Column name lookups
//!
//! Built once from a column list at the start of an operation and never
//! refreshed while it runs.

use std::collections::HashMap;

use sheetsync_core::{CellValue, Column, ColumnId, Row, Sheet, SheetId};

use crate::{EngineError, Result};

/// Title ↔ id mapping for one sheet's columns
#[derive(Clone, Debug, Default)]
pub struct ColumnMap {
    sheet_id: SheetId,
    by_title: HashMap<String, ColumnId>,
    ordered: Vec<(ColumnId, String)>,
}

impl ColumnMap {
    pub fn new(sheet_id: SheetId, columns: &[Column]) -> Self {
        let mut by_title = HashMap::with_capacity(columns.len());
        let mut ordered = Vec::with_capacity(columns.len());
        for column in columns {
            by_title.insert(column.title.clone(), column.id);
            ordered.push((column.id, column.title.clone()));
        }
        Self {
            sheet_id,
            by_title,
            ordered,
        }
    }

    pub fn from_sheet(sheet: &Sheet) -> Self {
        Self::new(sheet.id, &sheet.columns)
    }

    pub fn sheet_id(&self) -> SheetId {
        self.sheet_id
    }

    pub fn get(&self, title: &str) -> Option<ColumnId> {
        self.by_title.get(title).copied()
    }

    /// Id of a column the operation cannot do without
    pub fn require(&self, title: &str) -> Result<ColumnId> {
        self.get(title).ok_or_else(|| EngineError::MissingColumn {
            sheet_id: self.sheet_id,
            column: title.to_string(),
        })
    }

    pub fn title(&self, id: ColumnId) -> Option<&str> {
        self.ordered
            .iter()
            .find(|(column_id, _)| *column_id == id)
            .map(|(_, title)| title.as_str())
    }

    /// `(id, title)` pairs in sheet order
    pub fn columns(&self) -> impl Iterator<Item = (ColumnId, &str)> {
        self.ordered.iter().map(|(id, title)| (*id, title.as_str()))
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    /// Value of `row` in the column titled `title`
    pub fn value<'r>(&self, row: &'r Row, title: &str) -> Result<&'r CellValue> {
        Ok(row.value(self.require(title)?))
    }
}

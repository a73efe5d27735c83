//! In-memory sheet store
//!
//! `MemoryGateway` keeps sheets in process and applies writes with the same
//! placement rules as the remote service: rows are stored in display order,
//! a parent always precedes its descendants, and new children are placed
//! relative to their parent's subtree. It serializes to a JSON-friendly
//! snapshot so whole sheet sets can be loaded from and saved to disk.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{
    Cell, CellValue, Column, FetchOptions, GatewayError, NewRow, Placement, Row, RowId,
    RowUpdate, Sheet, SheetGateway, SheetId,
};

/// Sheet store backed by process memory
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MemoryGateway {
    #[serde(default)]
    sheets: Vec<Sheet>,
    #[serde(default)]
    next_row_id: RowId,
    #[serde(skip)]
    rejected: BTreeSet<SheetId>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sheet(mut self, sheet: Sheet) -> Self {
        self.insert_sheet(sheet);
        self
    }

    /// Add or replace a sheet. Rows without ids are assigned fresh ones.
    pub fn insert_sheet(&mut self, mut sheet: Sheet) {
        let highest = sheet.rows.iter().filter_map(|r| r.id).max().unwrap_or(0);
        self.next_row_id = self.next_row_id.max(highest + 1);
        for row in &mut sheet.rows {
            if row.id.is_none() {
                row.id = Some(self.allocate_row_id());
            }
        }
        match self.sheets.iter_mut().find(|s| s.id == sheet.id) {
            Some(existing) => *existing = sheet,
            None => self.sheets.push(sheet),
        }
    }

    pub fn sheet(&self, sheet_id: SheetId) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.id == sheet_id)
    }

    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }

    /// Make every subsequent write to `sheet_id` fail with `Rejected`
    pub fn reject_writes(&mut self, sheet_id: SheetId) {
        self.rejected.insert(sheet_id);
    }

    pub fn accept_writes(&mut self, sheet_id: SheetId) {
        self.rejected.remove(&sheet_id);
    }

    fn allocate_row_id(&mut self) -> RowId {
        self.next_row_id = self.next_row_id.max(1);
        let id = self.next_row_id;
        self.next_row_id += 1;
        id
    }

    fn sheet_ref(&self, sheet_id: SheetId) -> Result<&Sheet, GatewayError> {
        self.sheet(sheet_id)
            .ok_or(GatewayError::SheetNotFound(sheet_id))
    }

    fn writable_sheet(&self, sheet_id: SheetId) -> Result<&Sheet, GatewayError> {
        let sheet = self.sheet_ref(sheet_id)?;
        if self.rejected.contains(&sheet_id) {
            return Err(GatewayError::Rejected {
                sheet_id,
                reason: "writes disabled".into(),
            });
        }
        Ok(sheet)
    }

    fn sheet_mut(&mut self, sheet_id: SheetId) -> Result<&mut Sheet, GatewayError> {
        self.sheets
            .iter_mut()
            .find(|s| s.id == sheet_id)
            .ok_or(GatewayError::SheetNotFound(sheet_id))
    }
}

fn position(rows: &[Row], id: RowId) -> Option<usize> {
    rows.iter().position(|r| r.id == Some(id))
}

fn depth(rows: &[Row], index: usize) -> usize {
    let mut depth = 0;
    let mut parent = rows[index].parent_id;
    while let Some(parent_id) = parent {
        depth += 1;
        parent = rows
            .iter()
            .find(|r| r.id == Some(parent_id))
            .and_then(|r| r.parent_id);
    }
    depth
}

/// Index just past the last descendant of the row at `index`
fn subtree_end(rows: &[Row], index: usize) -> usize {
    let own = depth(rows, index);
    let mut end = index + 1;
    while end < rows.len() && depth(rows, end) > own {
        end += 1;
    }
    end
}

fn check_cells(sheet: &Sheet, cells: &[Cell]) -> Result<(), GatewayError> {
    for cell in cells {
        if !sheet.columns.iter().any(|c| c.id == cell.column_id) {
            return Err(GatewayError::Rejected {
                sheet_id: sheet.id,
                reason: format!("column {} does not exist", cell.column_id),
            });
        }
    }
    Ok(())
}

fn check_row(sheet: &Sheet, row_id: RowId) -> Result<(), GatewayError> {
    if sheet.row(row_id).is_none() {
        return Err(GatewayError::RowNotFound {
            sheet_id: sheet.id,
            row_id,
        });
    }
    Ok(())
}

fn bump_version(sheet: &mut Sheet) {
    sheet.version = Some(sheet.version.unwrap_or(0) + 1);
}

impl SheetGateway for MemoryGateway {
    fn get_sheet(&mut self, sheet_id: SheetId, options: FetchOptions) -> Result<Sheet, GatewayError> {
        let mut sheet = self.sheet_ref(sheet_id)?.clone();
        if !options.include_descendants {
            sheet.rows.retain(Row::is_top_level);
        }
        if !options.include_object_values {
            for cell in sheet.rows.iter_mut().flat_map(|r| r.cells.iter_mut()) {
                if let CellValue::MultiPicklist(values) = &cell.value {
                    let text = values.join(", ");
                    cell.value = CellValue::Text(text);
                }
            }
        }
        Ok(sheet)
    }

    fn get_columns(&mut self, sheet_id: SheetId) -> Result<Vec<Column>, GatewayError> {
        Ok(self.sheet_ref(sheet_id)?.columns.clone())
    }

    fn add_rows(&mut self, sheet_id: SheetId, rows: &[NewRow]) -> Result<Vec<Row>, GatewayError> {
        let sheet = self.writable_sheet(sheet_id)?;
        for new_row in rows {
            check_cells(sheet, &new_row.cells)?;
            match new_row.placement {
                Placement::ToBottom => {}
                Placement::Parent { parent_id, .. } => check_row(sheet, parent_id)?,
                Placement::SiblingAbove { sibling_id } => check_row(sheet, sibling_id)?,
            }
        }

        let mut created = Vec::with_capacity(rows.len());
        for new_row in rows {
            let id = self.allocate_row_id();
            let sheet = self.sheet_mut(sheet_id)?;
            let (parent_id, index) = match new_row.placement {
                Placement::ToBottom => (None, sheet.rows.len()),
                Placement::Parent {
                    parent_id,
                    to_bottom,
                } => {
                    let at = position(&sheet.rows, parent_id)
                        .ok_or(GatewayError::RowNotFound { sheet_id, row_id: parent_id })?;
                    let index = if to_bottom {
                        subtree_end(&sheet.rows, at)
                    } else {
                        at + 1
                    };
                    (Some(parent_id), index)
                }
                Placement::SiblingAbove { sibling_id } => {
                    let at = position(&sheet.rows, sibling_id)
                        .ok_or(GatewayError::RowNotFound { sheet_id, row_id: sibling_id })?;
                    (sheet.rows[at].parent_id, at)
                }
            };
            let row = Row {
                id: Some(id),
                parent_id,
                cells: new_row.cells.clone(),
                format: new_row.format,
                expanded: Some(true),
            };
            sheet.rows.insert(index, row.clone());
            created.push(row);
        }

        if !created.is_empty() {
            bump_version(self.sheet_mut(sheet_id)?);
        }
        Ok(created)
    }

    fn update_rows(
        &mut self,
        sheet_id: SheetId,
        rows: &[RowUpdate],
    ) -> Result<Vec<Row>, GatewayError> {
        let sheet = self.writable_sheet(sheet_id)?;
        for update in rows {
            check_row(sheet, update.id)?;
            check_cells(sheet, &update.cells)?;
        }

        let sheet = self.sheet_mut(sheet_id)?;
        let mut updated = Vec::with_capacity(rows.len());
        for update in rows {
            let Some(row) = sheet.rows.iter_mut().find(|r| r.id == Some(update.id)) else {
                continue;
            };
            for cell in &update.cells {
                row.set_cell(cell.clone());
            }
            if update.format.is_some() {
                row.format = update.format;
            }
            updated.push(row.clone());
        }
        if !updated.is_empty() {
            bump_version(sheet);
        }
        Ok(updated)
    }

    fn delete_rows(&mut self, sheet_id: SheetId, ids: &[RowId]) -> Result<(), GatewayError> {
        let sheet = self.writable_sheet(sheet_id)?;
        for &id in ids {
            check_row(sheet, id)?;
        }

        let sheet = self.sheet_mut(sheet_id)?;
        let mut doomed: BTreeSet<RowId> = ids.iter().copied().collect();
        for row in &sheet.rows {
            if let (Some(id), Some(parent)) = (row.id, row.parent_id) {
                if doomed.contains(&parent) {
                    doomed.insert(id);
                }
            }
        }
        sheet
            .rows
            .retain(|r| r.id.map_or(true, |id| !doomed.contains(&id)));
        if !ids.is_empty() {
            bump_version(sheet);
        }
        Ok(())
    }
}

//! Fixed-width preview lines for promotion runs

use sheetsync_core::{FiscalPeriod, Row};

use crate::lookup::ColumnMap;

/// Width of one preview column
pub const COLUMN_WIDTH: usize = 24;

/// `item` cut to `width - 2` characters (marked with `..` when cut) and padded to `width`
pub fn column_format(item: &str, width: usize) -> String {
    let keep = width.saturating_sub(2);
    let mut out: String = item.chars().take(keep).collect();
    if item.chars().count() > keep {
        out.push_str("..");
    }
    format!("{out:<width$}")
}

/// Column titles followed by `FY/Quarter`, then the column ids
pub fn heading(columns: &ColumnMap) -> [String; 2] {
    let titles = columns
        .columns()
        .map(|(_, title)| column_format(title, COLUMN_WIDTH))
        .chain(std::iter::once("FY/Quarter".to_string()))
        .collect::<Vec<_>>()
        .join(" ");
    let ids = columns
        .columns()
        .map(|(id, _)| format!("{:<COLUMN_WIDTH$}", id))
        .collect::<Vec<_>>()
        .join(" ");
    [titles, ids]
}

/// Every cell of `row` followed by the period it classifies into
pub fn row_line(row: &Row, period: FiscalPeriod) -> String {
    row.cells
        .iter()
        .map(|cell| column_format(&cell.display_text().unwrap_or_default(), COLUMN_WIDTH))
        .chain(std::iter::once(period.to_string()))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sheetsync_core::{Cell, Column, ColumnType};

    #[test]
    fn short_values_are_padded() {
        assert_eq!(column_format("Summit", 10), "Summit    ");
        assert_eq!(column_format("Summit", COLUMN_WIDTH).len(), COLUMN_WIDTH);
    }

    #[test]
    fn long_values_are_cut() {
        assert_eq!(column_format("Partner Summit Barcelona", 10), "Partner ..");
        // exactly width - 2 characters is not cut
        assert_eq!(column_format("12345678", 10), "12345678  ");
    }

    #[test]
    fn heading_lines() {
        let columns = ColumnMap::new(
            1,
            &[
                Column::new(11, "Name", ColumnType::TextNumber),
                Column::new(12, "Start", ColumnType::Date),
            ],
        );
        let [titles, ids] = heading(&columns);
        assert_eq!(titles, format!("{:<24} {:<24} FY/Quarter", "Name", "Start"));
        assert_eq!(ids, format!("{:<24} {:<24}", 11, 12));
    }

    #[test]
    fn row_line_ends_with_period() {
        let row = Row::new()
            .with_cell(Cell::new(11, "Summit"))
            .with_cell(Cell::new(12, "2021-09-01"));
        let line = row_line(&row, FiscalPeriod::new(22, 1));
        assert!(line.starts_with("Summit "));
        assert!(line.ends_with("2021-09-01               FY22 Q1"));
    }
}

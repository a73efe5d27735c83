//! Fiscal grouping rows of a map sheet
//!
//! A map sheet is a three level tree: `FY<yy>` rows at the top, `Q1`..`Q4`
//! rows beneath each of them, and event rows beneath the quarters. Events
//! within a quarter are kept in ascending start date order.
//!
//! [`FiscalGroups`] is built once from a fetched sheet and updated in place
//! as rows are inserted. It is only rebuilt from a fresh fetch after new
//! grouping rows are created.
//!
//! A year row may lack some or all of its quarters, for instance when an
//! earlier run failed between creating the two. Such a year is still a known
//! group; [`FiscalGroups::missing_quarters`] says where its absent quarter
//! rows belong so they are added under the existing year row.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use sheetsync_core::{fiscal, CellValue, ColumnId, FiscalPeriod, Placement, RowId, Sheet};

/// Prefix of a fiscal year grouping row
pub const YEAR_PREFIX: &str = "FY";

/// Quarter rows under every fiscal year row
pub const QUARTERS: u8 = 4;

/// Ordering key of a row's start date
///
/// Rows without a date sort last, rows whose date cannot be parsed sort first.
pub fn sort_date(value: &CellValue) -> NaiveDate {
    match value.as_text() {
        None => NaiveDate::MAX,
        Some(text) if text.trim().is_empty() => NaiveDate::MAX,
        Some(text) => fiscal::parse_date(text.trim()).unwrap_or(NaiveDate::MIN),
    }
}

/// A quarter row and its event children in sheet order
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QuarterGroup {
    pub row_id: RowId,
    pub children: Vec<(RowId, NaiveDate)>,
}

impl QuarterGroup {
    pub fn new(row_id: RowId) -> Self {
        Self {
            row_id,
            children: Vec::new(),
        }
    }

    /// Where a new event dated `date` goes
    ///
    /// Directly above the first child dated strictly later, otherwise last
    /// under the quarter.
    pub fn placement_for(&self, date: NaiveDate) -> Placement {
        match self.children.iter().find(|(_, existing)| *existing > date) {
            Some((sibling_id, _)) => Placement::SiblingAbove {
                sibling_id: *sibling_id,
            },
            None => Placement::Parent {
                parent_id: self.row_id,
                to_bottom: true,
            },
        }
    }

    /// Track a row inserted with `placement`
    pub fn record_insert(&mut self, placement: Placement, row_id: RowId, date: NaiveDate) {
        let index = match placement {
            Placement::SiblingAbove { sibling_id } => self
                .children
                .iter()
                .position(|(id, _)| *id == sibling_id)
                .unwrap_or(self.children.len()),
            _ => self.children.len(),
        };
        self.children.insert(index, (row_id, date));
    }
}

/// A fiscal year row and its quarters by label
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct YearGroup {
    pub row_id: RowId,
    pub quarters: BTreeMap<String, QuarterGroup>,
}

/// Every fiscal year group of a map sheet, keyed by `FY<yy>` label
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FiscalGroups {
    years: BTreeMap<String, YearGroup>,
}

impl FiscalGroups {
    /// Read the grouping rows of `sheet`
    ///
    /// `name_col` holds the grouping labels and `start_col` the event dates.
    pub fn build(sheet: &Sheet, name_col: ColumnId, start_col: ColumnId) -> Self {
        let mut years = BTreeMap::new();
        for year_row in sheet.top_level_rows() {
            let Some(year_id) = year_row.id else { continue };
            let Some(label) = year_row.value(name_col).as_text() else {
                continue;
            };
            let label = label.trim();
            if !label.starts_with(YEAR_PREFIX) {
                continue;
            }

            let mut quarters = BTreeMap::new();
            for quarter_row in sheet.children_of(year_id) {
                let (Some(quarter_id), Some(quarter_label)) =
                    (quarter_row.id, quarter_row.value(name_col).as_text())
                else {
                    continue;
                };
                let children = sheet
                    .children_of(quarter_id)
                    .filter_map(|event| Some((event.id?, sort_date(event.value(start_col)))))
                    .collect();
                quarters.insert(
                    quarter_label.trim().to_string(),
                    QuarterGroup {
                        row_id: quarter_id,
                        children,
                    },
                );
            }
            // duplicate labels: the first row wins unless only a later one has quarters
            let replace = years.get(label).map_or(true, |existing: &YearGroup| {
                existing.quarters.is_empty() && !quarters.is_empty()
            });
            if replace {
                years.insert(
                    label.to_string(),
                    YearGroup {
                        row_id: year_id,
                        quarters,
                    },
                );
            }
        }
        Self { years }
    }

    /// Track a year row created before any of its quarters
    pub fn insert_year(&mut self, period: FiscalPeriod, row_id: RowId) {
        self.years
            .entry(period.year_label())
            .or_insert_with(|| YearGroup {
                row_id,
                quarters: BTreeMap::new(),
            });
    }

    /// Quarters absent from the year of `period`, in order, each with the
    /// placement that keeps `Q1`..`Q4` in sequence
    ///
    /// A missing quarter goes directly above the next existing one, otherwise
    /// last under the year. Empty when the year itself is unknown.
    pub fn missing_quarters(&self, period: FiscalPeriod) -> Vec<(FiscalPeriod, Placement)> {
        let Some(year) = self.year(period) else {
            return Vec::new();
        };
        let existing = |q: u8| {
            year.quarters
                .get(&FiscalPeriod::new(period.year, q).quarter_label())
        };
        (1..=QUARTERS)
            .filter(|q| existing(*q).is_none())
            .map(|q| {
                let placement = match (q + 1..=QUARTERS).find_map(existing) {
                    Some(next) => Placement::SiblingAbove {
                        sibling_id: next.row_id,
                    },
                    None => Placement::Parent {
                        parent_id: year.row_id,
                        to_bottom: true,
                    },
                };
                (FiscalPeriod::new(period.year, q), placement)
            })
            .collect()
    }

    pub fn contains_year(&self, period: FiscalPeriod) -> bool {
        self.years.contains_key(&period.year_label())
    }

    pub fn year(&self, period: FiscalPeriod) -> Option<&YearGroup> {
        self.years.get(&period.year_label())
    }

    pub fn quarter(&self, period: FiscalPeriod) -> Option<&QuarterGroup> {
        self.year(period)?.quarters.get(&period.quarter_label())
    }

    pub fn quarter_mut(&mut self, period: FiscalPeriod) -> Option<&mut QuarterGroup> {
        self.years
            .get_mut(&period.year_label())?
            .quarters
            .get_mut(&period.quarter_label())
    }

    /// Year labels in sorted order
    pub fn year_labels(&self) -> impl Iterator<Item = &str> {
        self.years.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.years.len()
    }

    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sheetsync_core::{Cell, Column, ColumnType, Row};

    fn date(s: &str) -> NaiveDate {
        fiscal::parse_date(s).unwrap()
    }

    #[test]
    fn sort_date_sentinels() {
        assert_eq!(sort_date(&CellValue::Empty), NaiveDate::MAX);
        assert_eq!(sort_date(&CellValue::from("  ")), NaiveDate::MAX);
        assert_eq!(sort_date(&CellValue::from("next spring")), NaiveDate::MIN);
        assert_eq!(sort_date(&CellValue::from("2024-03-01")), date("2024-03-01"));
    }

    #[test]
    fn placement_goes_above_first_later_sibling() {
        let group = QuarterGroup {
            row_id: 5,
            children: vec![(6, date("2024-01-10")), (7, date("2024-03-01"))],
        };
        assert_eq!(
            group.placement_for(date("2024-02-01")),
            Placement::SiblingAbove { sibling_id: 7 }
        );
    }

    #[test]
    fn placement_falls_back_to_the_bottom() {
        let mut group = QuarterGroup::new(5);
        assert_eq!(
            group.placement_for(date("2024-02-01")),
            Placement::Parent {
                parent_id: 5,
                to_bottom: true
            }
        );
        group.children.push((6, date("2024-02-01")));
        // equal dates do not move ahead of the existing row
        assert_eq!(
            group.placement_for(date("2024-02-01")),
            Placement::Parent {
                parent_id: 5,
                to_bottom: true
            }
        );
    }

    #[test]
    fn undated_rows_sort_last_and_garbage_first() {
        let group = QuarterGroup {
            row_id: 5,
            children: vec![(6, NaiveDate::MIN), (7, NaiveDate::MAX)],
        };
        assert_eq!(
            group.placement_for(date("2024-02-01")),
            Placement::SiblingAbove { sibling_id: 7 }
        );
    }

    #[test]
    fn record_insert_keeps_sheet_order() {
        let mut group = QuarterGroup {
            row_id: 5,
            children: vec![(6, date("2024-01-10")), (7, date("2024-03-01"))],
        };
        group.record_insert(
            Placement::SiblingAbove { sibling_id: 7 },
            8,
            date("2024-02-01"),
        );
        group.record_insert(group.placement_for(date("2024-04-01")), 9, date("2024-04-01"));
        let ids: Vec<_> = group.children.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![6, 8, 7, 9]);
    }

    #[test]
    fn build_reads_year_and_quarter_rows() {
        let mut sheet = Sheet::new(1, "Map");
        sheet.columns = vec![
            Column::new(1, "Event Name", ColumnType::TextNumber).primary(),
            Column::new(2, "Event Start Date", ColumnType::Date),
        ];
        sheet.rows = vec![
            Row::new().with_id(100).with_cell(Cell::new(1, "FY24")),
            Row::new().with_id(101).child_of(100).with_cell(Cell::new(1, "Q1")),
            Row::new()
                .with_id(102)
                .child_of(101)
                .with_cell(Cell::new(1, "Summit"))
                .with_cell(Cell::new(2, "2023-09-04")),
            Row::new().with_id(103).child_of(100).with_cell(Cell::new(1, "Q2")),
            Row::new().with_id(200).with_cell(Cell::new(1, "Archive")),
        ];

        let groups = FiscalGroups::build(&sheet, 1, 2);
        assert_eq!(groups.year_labels().collect::<Vec<_>>(), vec!["FY24"]);

        let q1 = groups.quarter(FiscalPeriod::new(24, 1)).unwrap();
        assert_eq!(q1.row_id, 101);
        assert_eq!(q1.children, vec![(102, date("2023-09-04"))]);
        assert!(groups.quarter(FiscalPeriod::new(24, 2)).unwrap().children.is_empty());
        assert!(groups.quarter(FiscalPeriod::new(24, 3)).is_none());
        assert!(!groups.contains_year(FiscalPeriod::new(25, 1)));
    }

    fn map_of(rows: Vec<Row>) -> Sheet {
        let mut sheet = Sheet::new(1, "Map");
        sheet.columns = vec![Column::new(1, "Event Name", ColumnType::TextNumber).primary()];
        sheet.rows = rows;
        sheet
    }

    fn labelled(id: RowId, text: &str) -> Row {
        Row::new().with_id(id).with_cell(Cell::new(1, text))
    }

    #[test]
    fn year_without_quarters_needs_all_four_at_the_bottom() {
        let groups = FiscalGroups::build(&map_of(vec![labelled(100, "FY22")]), 1, 2);
        let period = FiscalPeriod::new(22, 3);

        assert!(groups.contains_year(period));
        assert!(groups.quarter(period).is_none());
        let under_year = Placement::Parent {
            parent_id: 100,
            to_bottom: true,
        };
        assert_eq!(
            groups.missing_quarters(period),
            (1..=4)
                .map(|q| (FiscalPeriod::new(22, q), under_year))
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn gaps_are_filled_above_the_next_quarter() {
        let groups = FiscalGroups::build(
            &map_of(vec![
                labelled(100, "FY22"),
                labelled(101, "Q1").child_of(100),
                labelled(103, "Q3").child_of(100),
            ]),
            1,
            2,
        );

        assert_eq!(
            groups.missing_quarters(FiscalPeriod::new(22, 1)),
            vec![
                (
                    FiscalPeriod::new(22, 2),
                    Placement::SiblingAbove { sibling_id: 103 }
                ),
                (
                    FiscalPeriod::new(22, 4),
                    Placement::Parent {
                        parent_id: 100,
                        to_bottom: true
                    }
                ),
            ]
        );
        assert!(groups.missing_quarters(FiscalPeriod::new(23, 1)).is_empty());
    }

    #[test]
    fn inserted_year_is_known_before_its_quarters() {
        let mut groups = FiscalGroups::default();
        let period = FiscalPeriod::new(22, 1);
        groups.insert_year(period, 100);
        groups.insert_year(period, 200);

        assert!(groups.contains_year(period));
        assert_eq!(groups.year(period).unwrap().row_id, 100);
        assert_eq!(groups.missing_quarters(period).len(), 4);
    }

    #[test]
    fn duplicate_year_rows_prefer_the_one_with_quarters() {
        let groups = FiscalGroups::build(
            &map_of(vec![
                labelled(100, "FY22"),
                labelled(200, "FY22"),
                labelled(201, "Q1").child_of(200),
                labelled(300, "FY22"),
                labelled(400, "FY23"),
                labelled(500, "FY23"),
            ]),
            1,
            2,
        );

        assert_eq!(groups.len(), 2);
        assert_eq!(groups.year(FiscalPeriod::new(22, 1)).unwrap().row_id, 200);
        assert_eq!(groups.year(FiscalPeriod::new(23, 1)).unwrap().row_id, 400);
    }
}

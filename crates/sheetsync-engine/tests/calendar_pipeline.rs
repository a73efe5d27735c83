//! Integration tests for calendar generation
//!
//! Source sheets are run through the map, intake and combined entry points
//! into calendar sheets held by a `MemoryGateway`, then read back.

use pretty_assertions::assert_eq;
use sheetsync_core::{palette, Cell, Column, ColumnType, MemoryGateway, Row, Sheet};
use sheetsync_engine::{
    combined_calendar, intake_calendar, map_calendar, IntakeRules, MapRules, SheetPair,
    WriteReport,
};

const MAP: i64 = 1;
const INTAKE: i64 = 2;
const CALENDAR: i64 = 3;

fn map_sheet() -> Sheet {
    let mut sheet = Sheet::new(MAP, "Venue Map");
    sheet.columns = vec![
        Column::new(11, "Event Name", ColumnType::TextNumber).primary(),
        Column::new(12, "TechX Status", ColumnType::Picklist),
        Column::new(13, "TechX Resource", ColumnType::ContactList),
        Column::new(14, "Event Start Date", ColumnType::Date),
        Column::new(15, "Event End Date", ColumnType::Date),
        Column::new(16, "Move In Date", ColumnType::Date),
    ];
    sheet.rows = vec![
        Row::new().with_id(100).with_cell(Cell::new(11, "FY24")),
        Row::new().with_id(101).child_of(100).with_cell(Cell::new(11, "Q1")),
        Row::new()
            .with_id(102)
            .child_of(101)
            .with_cell(Cell::new(11, "Summit"))
            .with_cell(Cell::new(12, "Green"))
            .with_cell(Cell::new(13, "\"Ana\""))
            .with_cell(Cell::new(14, "2023-09-04"))
            .with_cell(Cell::new(15, "2023-09-06"))
            .with_cell(Cell::new(16, "2023-09-02")),
        Row::new()
            .with_id(103)
            .child_of(101)
            .with_cell(Cell::new(11, "Tentative"))
            .with_cell(Cell::new(12, "Yellow"))
            .with_cell(Cell::new(14, "2023-09-10")),
        Row::new()
            .with_id(104)
            .child_of(101)
            .with_cell(Cell::new(11, "Offsite"))
            .with_cell(Cell::new(12, "Green"))
            .with_cell(Cell::new(14, "2023-10-01")),
    ];
    sheet
}

fn intake_sheet() -> Sheet {
    let mut sheet = Sheet::new(INTAKE, "Intake");
    sheet.columns = vec![
        Column::new(21, "Event Name", ColumnType::TextNumber).primary(),
        Column::new(22, "Event State & Type", ColumnType::Picklist),
        Column::new(23, "Event Start Date", ColumnType::Date),
        Column::new(24, "Event End Date", ColumnType::Date),
    ];
    sheet.rows = vec![
        Row::new().with_cell(Cell::new(21, "Q1 FY24")),
        Row::new()
            .with_cell(Cell::new(21, "Partner Summit Rome"))
            .with_cell(Cell::new(22, "Canceled - Physical"))
            .with_cell(Cell::new(23, "2023-11-14"))
            .with_cell(Cell::new(24, "2023-11-16")),
        Row::new()
            .with_cell(Cell::new(21, "No dates yet"))
            .with_cell(Cell::new(22, "Planned - Virtual")),
    ];
    sheet
}

fn calendar_sheet(stale_rows: usize) -> Sheet {
    let mut sheet = Sheet::new(CALENDAR, "Calendar");
    sheet.columns = vec![
        Column::new(31, "Event", ColumnType::TextNumber).primary(),
        Column::new(32, "Start", ColumnType::Date),
        Column::new(33, "End", ColumnType::Date),
    ];
    sheet.rows = (0..stale_rows)
        .map(|i| Row::new().with_cell(Cell::new(31, format!("stale {i}"))))
        .collect();
    sheet
}

/// `(name, start, end)` of every calendar row, in order
fn read_back(gateway: &MemoryGateway) -> Vec<(String, String, String)> {
    gateway
        .sheet(CALENDAR)
        .unwrap()
        .rows
        .iter()
        .map(|r| {
            let text = |c: i64| r.value(c).as_text().unwrap_or_default();
            (text(31), text(32), text(33))
        })
        .collect()
}

fn entry(name: &str, start: &str, end: &str) -> (String, String, String) {
    (name.into(), start.into(), end.into())
}

#[test]
fn map_calendar_round_trip() {
    let mut gateway = MemoryGateway::new()
        .with_sheet(map_sheet())
        .with_sheet(calendar_sheet(3));

    let report = map_calendar(&mut gateway, SheetPair::new(MAP, CALENDAR), &MapRules::default())
        .unwrap();

    assert_eq!(
        report,
        WriteReport {
            cleared: 3,
            written: 3,
            dropped: 1
        }
    );
    // "Offsite | Setup Start" has no start date and is dropped
    assert_eq!(
        read_back(&gateway),
        vec![
            entry("Summit | Ana", "2023-09-04", "2023-09-06"),
            entry("Summit | Setup Start", "2023-09-02", ""),
            entry("Offsite", "2023-10-01", ""),
        ]
    );
}

#[test]
fn written_colors_come_from_the_assignable_palette() {
    let mut gateway = MemoryGateway::new()
        .with_sheet(map_sheet())
        .with_sheet(calendar_sheet(0));

    map_calendar(&mut gateway, SheetPair::new(MAP, CALENDAR), &MapRules::default()).unwrap();

    let rows = &gateway.sheet(CALENDAR).unwrap().rows;
    let colors: Vec<_> = rows
        .iter()
        .map(|r| r.format.and_then(|f| f.background).unwrap())
        .collect();
    assert!(colors.iter().all(|c| palette::is_assignable(*c)));
    // an event and its extra date entry share a color, the next event draws a new one
    assert_eq!(colors[0], colors[1]);
    assert_ne!(colors[1], colors[2]);
    assert_eq!(rows[0].format.unwrap().taskbar, Some(colors[0]));
}

#[test]
fn unconfirmed_map_rows_emit_nothing() {
    let mut sheet = map_sheet();
    for row in &mut sheet.rows {
        row.set_cell(Cell::new(12, "Red"));
    }
    let mut gateway = MemoryGateway::new()
        .with_sheet(sheet)
        .with_sheet(calendar_sheet(1));

    let report = map_calendar(&mut gateway, SheetPair::new(MAP, CALENDAR), &MapRules::default())
        .unwrap();

    assert_eq!(report.written, 0);
    assert!(read_back(&gateway).is_empty());
}

#[test]
fn intake_calendar_skips_separators_and_marks_cancellations() {
    let mut gateway = MemoryGateway::new()
        .with_sheet(intake_sheet())
        .with_sheet(calendar_sheet(0));

    let report = intake_calendar(
        &mut gateway,
        SheetPair::new(INTAKE, CALENDAR),
        &IntakeRules::default(),
    )
    .unwrap();

    assert_eq!(
        report,
        WriteReport {
            cleared: 0,
            written: 1,
            dropped: 1
        }
    );
    assert_eq!(
        read_back(&gateway),
        vec![entry("(Canceled) PS Rome", "2023-11-14", "2023-11-16")]
    );
}

#[test]
fn combined_calendar_lists_map_then_intake() {
    let mut gateway = MemoryGateway::new()
        .with_sheet(map_sheet())
        .with_sheet(intake_sheet())
        .with_sheet(calendar_sheet(2));

    let report = combined_calendar(
        &mut gateway,
        MAP,
        INTAKE,
        CALENDAR,
        &MapRules::default(),
        &IntakeRules::default(),
    )
    .unwrap();

    assert_eq!(report.cleared, 2);
    let names: Vec<_> = read_back(&gateway).into_iter().map(|(name, _, _)| name).collect();
    assert_eq!(
        names,
        vec![
            "Summit | Ana",
            "Summit | Setup Start",
            "Offsite",
            "(Canceled) PS Rome"
        ]
    );

    // each source starts its own color cycle
    let rows = &gateway.sheet(CALENDAR).unwrap().rows;
    assert_eq!(rows[0].format, rows[3].format);
}

#[test]
fn rerunning_replaces_rather_than_appends() {
    let mut gateway = MemoryGateway::new()
        .with_sheet(map_sheet())
        .with_sheet(calendar_sheet(0));
    let pair = SheetPair::new(MAP, CALENDAR);

    map_calendar(&mut gateway, pair, &MapRules::default()).unwrap();
    let first = read_back(&gateway);
    let report = map_calendar(&mut gateway, pair, &MapRules::default()).unwrap();

    assert_eq!(report.cleared, first.len());
    assert_eq!(read_back(&gateway), first);
}

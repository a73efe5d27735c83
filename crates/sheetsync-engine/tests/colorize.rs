//! Integration tests for the hierarchy colorizer

use pretty_assertions::assert_eq;
use sheetsync_core::{
    Cell, CellValue, Column, ColumnType, Format, MemoryGateway, Row, Sheet, SheetGateway,
};
use sheetsync_engine::colorize::QuarterColors;
use sheetsync_engine::{ColorScheme, Colorizer};

const MAP: i64 = 7;

fn hierarchy() -> Sheet {
    let mut sheet = Sheet::new(MAP, "Event Map");
    sheet.columns = vec![
        Column::new(1, "Event Name", ColumnType::TextNumber).primary(),
        Column::new(2, "Services", ColumnType::MultiPicklist),
        Column::new(3, "Notes", ColumnType::TextNumber),
    ];
    sheet.rows = vec![
        Row::new().with_id(10).with_cell(Cell::new(1, "FY24")),
        Row::new().with_id(11).child_of(10).with_cell(Cell::new(1, "Q1")),
        Row::new()
            .with_id(12)
            .child_of(11)
            .with_cell(Cell::new(1, "Summit"))
            .with_cell(Cell::new(2, vec!["AV".to_string(), "Wifi".to_string()]))
            .with_cell(Cell::new(3, "bring badges")),
        Row::new().with_id(13).child_of(10).with_cell(Cell::new(1, "Q2")),
        Row::new().with_id(14).child_of(10).with_cell(Cell::new(1, "Q3")),
        Row::new()
            .with_id(15)
            .child_of(14)
            .with_cell(Cell::new(1, "Kickoff")),
        Row::new().with_id(16).child_of(10).with_cell(Cell::new(1, "Q4")),
        Row::new().with_id(20).with_cell(Cell::new(1, "FY25")),
        Row::new().with_id(30).with_cell(Cell::new(1, "Parking lot")),
    ];
    sheet
}

fn backgrounds(gateway: &MemoryGateway) -> Vec<(i64, Option<u8>)> {
    gateway
        .sheet(MAP)
        .unwrap()
        .rows
        .iter()
        .map(|r| (r.id.unwrap(), r.format.and_then(|f| f.background)))
        .collect()
}

#[test]
fn every_level_gets_its_color() {
    let mut gateway = MemoryGateway::new().with_sheet(hierarchy());

    let updated = Colorizer::default().colorize(&mut gateway, MAP).unwrap();

    assert_eq!(updated, 8);
    assert_eq!(
        backgrounds(&gateway),
        vec![
            (10, Some(21)),
            (11, Some(12)),
            (12, Some(5)),
            (13, Some(14)),
            (14, Some(15)),
            (15, Some(8)),
            (16, Some(16)),
            (20, Some(2)),
            (30, None),
        ]
    );
}

#[test]
fn colorizing_twice_is_stable() {
    let mut gateway = MemoryGateway::new().with_sheet(hierarchy());
    let colorizer = Colorizer::default();

    colorizer.colorize(&mut gateway, MAP).unwrap();
    let first = gateway.sheet(MAP).unwrap().rows.clone();
    colorizer.colorize(&mut gateway, MAP).unwrap();
    let second = gateway.sheet(MAP).unwrap().rows.clone();

    assert_eq!(first, second);
}

#[test]
fn cell_values_survive_recoloring() {
    let mut gateway = MemoryGateway::new().with_sheet(hierarchy());

    Colorizer::default().colorize(&mut gateway, MAP).unwrap();

    let sheet = gateway.get_sheet(MAP, Default::default()).unwrap();
    let summit = gateway.sheet(MAP).unwrap().row(12).unwrap();
    assert_eq!(
        summit.value(2),
        &CellValue::MultiPicklist(vec!["AV".into(), "Wifi".into()])
    );
    assert_eq!(summit.value(3).as_str(), Some("bring badges"));
    assert_eq!(summit.cell(3).unwrap().format, Some(Format::background(5)));
    assert_eq!(sheet.rows.len(), 9);
}

#[test]
fn custom_scheme() {
    let scheme = ColorScheme {
        empty_year: 30,
        populated_year: 31,
        quarters: [
            QuarterColors::new(32, 33),
            QuarterColors::new(34, 35),
            QuarterColors::new(36, 37),
            QuarterColors::new(38, 39),
        ],
    };
    let mut gateway = MemoryGateway::new().with_sheet(hierarchy());

    Colorizer::new(scheme).colorize(&mut gateway, MAP).unwrap();

    let colors = backgrounds(&gateway);
    assert_eq!(colors[0], (10, Some(31)));
    assert_eq!(colors[2], (12, Some(33)));
    assert_eq!(colors[7], (20, Some(30)));
}

#[test]
fn rejected_update_surfaces_as_error() {
    let mut gateway = MemoryGateway::new().with_sheet(hierarchy());
    gateway.reject_writes(MAP);

    assert!(Colorizer::default().colorize(&mut gateway, MAP).is_err());
    assert!(backgrounds(&gateway).iter().all(|(_, c)| c.is_none()));
}

//! Calendar generation entry points
//!
//! Each entry point reads its source sheet(s), runs the matching
//! [`RowTransform`] with a fresh color cycle, and regenerates the destination
//! calendar through [`write_calendar`].

use serde::{Deserialize, Serialize};
use sheetsync_core::{CalendarEntry, ColorCycle, FetchOptions, SheetGateway, SheetId};
use tracing::{debug, info, instrument};

use crate::transform::{IntakeRules, IntakeTransform, MapRules, MapTransform, RowTransform};
use crate::writer::{write_calendar, WriteReport};
use crate::Result;

/// Source and destination sheet ids of one task
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetPair {
    pub source: SheetId,
    pub destination: SheetId,
}

impl SheetPair {
    pub fn new(source: SheetId, destination: SheetId) -> Self {
        Self {
            source,
            destination,
        }
    }
}

/// Fetch `source` and run `transform` over it with its own color cycle
pub fn collect_entries<G>(
    gateway: &mut G,
    source: SheetId,
    transform: &dyn RowTransform,
) -> Result<Vec<CalendarEntry>>
where
    G: SheetGateway + ?Sized,
{
    let sheet = gateway.get_sheet(source, FetchOptions::full())?;
    debug!(
        sheet_id = source,
        version = ?sheet.version,
        kind = transform.kind(),
        "fetched source sheet"
    );
    let mut colors = ColorCycle::new();
    let entries = transform.entries(&sheet, &mut colors)?;
    info!(
        sheet_id = source,
        kind = transform.kind(),
        entries = entries.len(),
        "collected calendar entries"
    );
    Ok(entries)
}

/// Regenerate the intake calendar
#[instrument(level = "info", skip(gateway, rules), fields(source = pair.source, destination = pair.destination))]
pub fn intake_calendar<G>(gateway: &mut G, pair: SheetPair, rules: &IntakeRules) -> Result<WriteReport>
where
    G: SheetGateway + ?Sized,
{
    let transform = IntakeTransform::new(rules.clone())?;
    let entries = collect_entries(gateway, pair.source, &transform)?;
    write_calendar(gateway, pair.destination, &entries)
}

/// Regenerate the map calendar
#[instrument(level = "info", skip(gateway, rules), fields(source = pair.source, destination = pair.destination))]
pub fn map_calendar<G>(gateway: &mut G, pair: SheetPair, rules: &MapRules) -> Result<WriteReport>
where
    G: SheetGateway + ?Sized,
{
    let transform = MapTransform::new(rules.clone())?;
    let entries = collect_entries(gateway, pair.source, &transform)?;
    write_calendar(gateway, pair.destination, &entries)
}

/// Regenerate a calendar holding the map entries followed by the intake entries
#[instrument(level = "info", skip(gateway, map_rules, intake_rules))]
pub fn combined_calendar<G>(
    gateway: &mut G,
    map_source: SheetId,
    intake_source: SheetId,
    destination: SheetId,
    map_rules: &MapRules,
    intake_rules: &IntakeRules,
) -> Result<WriteReport>
where
    G: SheetGateway + ?Sized,
{
    let map = MapTransform::new(map_rules.clone())?;
    let intake = IntakeTransform::new(intake_rules.clone())?;

    let mut entries = collect_entries(gateway, map_source, &map)?;
    entries.extend(collect_entries(gateway, intake_source, &intake)?);
    write_calendar(gateway, destination, &entries)
}

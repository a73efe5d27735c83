//! # sheetsync-engine
//!
//! Decision logic for keeping the events calendars and the fiscal map sheet
//! in sync.
//!
//! This crate provides:
//! - Row filtering and transformation of intake and map sheets into
//!   [`CalendarEntry`] values ([`transform`])
//! - Clearing and rewriting calendar sheets ([`writer`])
//! - The calendar entry points wiring both together ([`calendars`])
//! - Promotion of request rows into the FY/quarter hierarchy ([`promote`])
//! - Re-coloring of that hierarchy ([`colorize`])
//!
//! Every operation takes the sheet gateway as an explicit argument and keeps
//! its lookup structures (column maps, fiscal groups, color cycles) local to
//! the call.
//!
//! ## Example
//!
//! ```rust,ignore
//! use sheetsync_core::MemoryGateway;
//! use sheetsync_engine::calendars::{map_calendar, SheetPair};
//! use sheetsync_engine::transform::MapRules;
//!
//! let mut gateway = MemoryGateway::new();
//! let report = map_calendar(&mut gateway, SheetPair::new(1, 2), &MapRules::default())?;
//! println!("wrote {} rows", report.written);
//! ```

pub mod calendars;
pub mod colorize;
pub mod hierarchy;
pub mod lookup;
pub mod preview;
pub mod promote;
pub mod transform;
pub mod writer;

pub use calendars::{combined_calendar, intake_calendar, map_calendar, SheetPair};
pub use colorize::{ColorScheme, Colorizer};
pub use lookup::ColumnMap;
pub use promote::{PromoteRules, Promoter, PromotionReport};
pub use transform::{IntakeRules, IntakeTransform, MapRules, MapTransform, RowTransform};
pub use writer::{write_calendar, WriteReport};

pub use sheetsync_core::CalendarEntry;

use sheetsync_core::{FiscalError, GatewayError, RowId, SheetId};
use thiserror::Error;

/// Convenient alias for engine results
pub type Result<T, E = EngineError> = std::result::Result<T, E>;

/// Errors that stop an operation (or, during promotion, a single row)
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("Sheet {sheet_id} has no column named '{column}'")]
    MissingColumn { sheet_id: SheetId, column: String },

    #[error("Calendar sheet {sheet_id} needs a name and a date column, found {found} column(s)")]
    CalendarLayout { sheet_id: SheetId, found: usize },

    #[error(transparent)]
    Fiscal(#[from] FiscalError),

    #[error("Row {row_id:?} has no value in '{column}'")]
    MissingValue { row_id: Option<RowId>, column: String },

    #[error("FY{year} has no Q{quarter} grouping row")]
    MissingQuarter { year: u16, quarter: u8 },

    #[error("Sheet {0} returned a created row without an id")]
    MissingRowId(SheetId),

    #[error("Invalid row pattern: {0}")]
    Pattern(#[from] regex::Error),
}

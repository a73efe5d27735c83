//! Fiscal calendar classification
//!
//! Maps calendar dates to fiscal periods using a hand-maintained table of
//! quarter date ranges. Fiscal years here start in late July or early August,
//! so a date such as 2021-09-01 belongs to FY22 Q1.
//!
//! ```rust
//! use chrono::NaiveDate;
//! use sheetsync_core::fiscal::{FiscalCalendar, FiscalPeriod};
//!
//! let calendar = FiscalCalendar::builtin();
//! let date = NaiveDate::from_ymd_opt(2021, 9, 1).unwrap();
//! assert_eq!(calendar.classify(date), FiscalPeriod::new(22, 1));
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Date format used by sheet date cells
pub const DATE_FORMAT: &str = "%Y-%m-%d";

// ============================================================================
// Types
// ============================================================================

/// A fiscal year and quarter (1..=4)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FiscalPeriod {
    pub year: u16,
    pub quarter: u8,
}

impl FiscalPeriod {
    pub const fn new(year: u16, quarter: u8) -> Self {
        Self { year, quarter }
    }

    /// Label of the grouping row for the year, e.g. `FY22`
    pub fn year_label(&self) -> String {
        format!("FY{}", self.year)
    }

    /// Label of the grouping row for the quarter, e.g. `Q1`
    pub fn quarter_label(&self) -> String {
        format!("Q{}", self.quarter)
    }
}

impl std::fmt::Display for FiscalPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FY{} Q{}", self.year, self.quarter)
    }
}

/// Inclusive date range of one fiscal quarter
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuarterRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl QuarterRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Days between start and end
    pub fn duration_days(&self) -> i64 {
        (self.end - self.start).num_days()
    }
}

/// One fiscal year and its four quarters, in order
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiscalYear {
    pub year: u16,
    pub quarters: [QuarterRange; 4],
}

/// Validation and parsing failures
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FiscalError {
    #[error("Fiscal calendar has no years")]
    Empty,

    #[error("FY{year} Q{quarter} ends before it starts")]
    InvertedRange { year: u16, quarter: u8 },

    #[error("FY{year} leaves no room for the fallback year")]
    YearOutOfRange { year: u16 },

    #[error("FY{year} is defined more than once")]
    DuplicateYear { year: u16 },

    #[error("{first} overlaps {second}")]
    Overlap {
        first: FiscalPeriod,
        second: FiscalPeriod,
    },

    #[error("Invalid date '{0}' (expected YYYY-MM-DD)")]
    InvalidDate(String),
}

/// Parse a sheet date string (`YYYY-MM-DD`)
pub fn parse_date(value: &str) -> Result<NaiveDate, FiscalError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|_| FiscalError::InvalidDate(value.to_string()))
}

// ============================================================================
// Calendar
// ============================================================================

/// Validated table of fiscal quarter ranges.
///
/// Ranges never overlap, so classification is a pure function of the date.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FiscalCalendar {
    years: Vec<FiscalYear>,
}

impl FiscalCalendar {
    /// Build a calendar, rejecting empty tables, inverted and overlapping ranges
    ///
    /// The highest year must stay below `u16::MAX` so the fallback period
    /// after it is representable.
    pub fn new(mut years: Vec<FiscalYear>) -> Result<Self, FiscalError> {
        if years.is_empty() {
            return Err(FiscalError::Empty);
        }
        years.sort_by_key(|y| y.year);
        if let Some(last) = years.last().filter(|y| y.year == u16::MAX) {
            return Err(FiscalError::YearOutOfRange { year: last.year });
        }

        let mut ranges: Vec<(FiscalPeriod, QuarterRange)> = Vec::with_capacity(years.len() * 4);
        for (i, fy) in years.iter().enumerate() {
            if i > 0 && years[i - 1].year == fy.year {
                return Err(FiscalError::DuplicateYear { year: fy.year });
            }
            for (q, range) in fy.quarters.iter().enumerate() {
                let period = FiscalPeriod::new(fy.year, q as u8 + 1);
                if range.start > range.end {
                    return Err(FiscalError::InvertedRange {
                        year: period.year,
                        quarter: period.quarter,
                    });
                }
                ranges.push((period, *range));
            }
        }

        ranges.sort_by_key(|(_, range)| range.start);
        for pair in ranges.windows(2) {
            let (first, a) = pair[0];
            let (second, b) = pair[1];
            if b.start <= a.end {
                return Err(FiscalError::Overlap { first, second });
            }
        }

        Ok(Self { years })
    }

    /// The FY20..FY27 table in use by the events team. FY27 is an estimate.
    pub fn builtin() -> Self {
        fn q(start: (i32, u32, u32), end: (i32, u32, u32)) -> QuarterRange {
            let date = |(y, m, d): (i32, u32, u32)| {
                NaiveDate::from_ymd_opt(y, m, d).expect("valid builtin fiscal date")
            };
            QuarterRange::new(date(start), date(end))
        }

        let years = vec![
            FiscalYear {
                year: 20,
                quarters: [
                    q((2019, 7, 28), (2019, 10, 26)),
                    q((2019, 10, 27), (2020, 1, 25)),
                    q((2020, 1, 26), (2020, 4, 25)),
                    q((2020, 4, 26), (2020, 7, 25)),
                ],
            },
            FiscalYear {
                year: 21,
                quarters: [
                    q((2020, 7, 26), (2020, 10, 24)),
                    q((2020, 10, 25), (2021, 1, 23)),
                    q((2021, 1, 24), (2021, 5, 1)),
                    q((2021, 5, 2), (2021, 7, 31)),
                ],
            },
            FiscalYear {
                year: 22,
                quarters: [
                    q((2021, 8, 1), (2021, 10, 24)),
                    q((2021, 10, 25), (2022, 1, 23)),
                    q((2022, 1, 24), (2022, 5, 1)),
                    q((2022, 5, 2), (2022, 7, 31)),
                ],
            },
            FiscalYear {
                year: 23,
                quarters: [
                    q((2022, 8, 1), (2022, 10, 29)),
                    q((2022, 10, 30), (2023, 1, 28)),
                    q((2023, 1, 29), (2023, 4, 29)),
                    q((2023, 4, 30), (2023, 7, 29)),
                ],
            },
            FiscalYear {
                year: 24,
                quarters: [
                    q((2023, 7, 30), (2023, 10, 28)),
                    q((2023, 10, 29), (2024, 1, 27)),
                    q((2024, 1, 28), (2024, 4, 27)),
                    q((2024, 4, 28), (2024, 7, 27)),
                ],
            },
            FiscalYear {
                year: 25,
                quarters: [
                    q((2024, 7, 28), (2024, 10, 27)),
                    q((2024, 10, 28), (2025, 2, 2)),
                    q((2025, 2, 3), (2025, 4, 28)),
                    q((2025, 4, 29), (2025, 7, 26)),
                ],
            },
            FiscalYear {
                year: 26,
                quarters: [
                    q((2025, 7, 27), (2025, 10, 25)),
                    q((2025, 10, 26), (2026, 1, 24)),
                    q((2026, 1, 25), (2026, 4, 25)),
                    q((2026, 4, 26), (2026, 7, 25)),
                ],
            },
            FiscalYear {
                year: 27,
                quarters: [
                    q((2026, 7, 26), (2026, 10, 25)),
                    q((2026, 10, 26), (2027, 1, 24)),
                    q((2027, 1, 25), (2027, 4, 25)),
                    q((2027, 4, 26), (2027, 7, 25)),
                ],
            },
        ];

        Self { years }
    }

    pub fn years(&self) -> &[FiscalYear] {
        &self.years
    }

    /// Highest configured fiscal year
    pub fn last_year(&self) -> u16 {
        self.years.last().map_or(0, |y| y.year)
    }

    /// Fiscal period containing `date`.
    ///
    /// Dates outside every configured range land in Q1 of the year after the
    /// last configured one.
    pub fn classify(&self, date: NaiveDate) -> FiscalPeriod {
        for fy in &self.years {
            for (q, range) in fy.quarters.iter().enumerate() {
                if range.contains(date) {
                    return FiscalPeriod::new(fy.year, q as u8 + 1);
                }
            }
        }
        FiscalPeriod::new(self.last_year().saturating_add(1), 1)
    }

    /// Classify a `YYYY-MM-DD` string
    pub fn classify_str(&self, value: &str) -> Result<FiscalPeriod, FiscalError> {
        parse_date(value).map(|date| self.classify(date))
    }

    pub fn quarter_range(&self, period: FiscalPeriod) -> Option<&QuarterRange> {
        let fy = self.years.iter().find(|y| y.year == period.year)?;
        fy.quarters.get(usize::from(period.quarter).checked_sub(1)?)
    }
}

impl Default for FiscalCalendar {
    fn default() -> Self {
        Self::builtin()
    }
}

// ============================================================================
// Tests
// ============================================================================

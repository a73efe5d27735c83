//! TOML configuration
//!
//! Every section is optional. Sheet ids live in one section per task; rule
//! sections override individual column names and sentinels and fall back to
//! the engine defaults for anything left out.
//!
//! ```toml
//! [smartsheet]
//! token_env = "SMARTSHEET_ACCESS_TOKEN"
//!
//! [map_calendar]
//! source = 4583173393803140
//! destination = 1128612578453380
//!
//! [[fiscal.years]]
//! year = 28
//! quarters = [
//!     ["2027-07-25", "2027-10-23"],
//!     ["2027-10-24", "2028-01-22"],
//!     ["2028-01-23", "2028-04-22"],
//!     ["2028-04-23", "2028-07-29"],
//! ]
//! ```

use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use sheetsync_core::fiscal::{FiscalCalendar, FiscalYear, QuarterRange};
use sheetsync_core::SheetId;
use sheetsync_engine::{ColorScheme, IntakeRules, MapRules, PromoteRules, SheetPair};
use sheetsync_smartsheet::{ClientConfig, DEFAULT_BASE_URL};

/// Config file used when neither `--config` nor `SHEETSYNC_CONFIG` is given
pub const DEFAULT_CONFIG_FILE: &str = "sheetsync.toml";

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub smartsheet: SmartsheetSection,
    pub logging: LoggingSection,
    pub intake_calendar: Option<SheetPair>,
    pub map_calendar: Option<SheetPair>,
    pub request_to_map: Option<SheetPair>,
    pub combined_calendar: Option<CombinedSection>,
    pub fiscal: FiscalSection,
    pub rules: RulesSection,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SmartsheetSection {
    pub base_url: String,
    pub change_agent: String,
    /// Environment variable holding the API access token
    pub token_env: String,
}

impl Default for SmartsheetSection {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            change_agent: "sheetsync".to_string(),
            token_env: "SMARTSHEET_ACCESS_TOKEN".to_string(),
        }
    }
}

impl SmartsheetSection {
    /// Client settings, reading the token from the configured variable
    pub fn client_config(&self) -> Result<ClientConfig> {
        let token = std::env::var(&self.token_env)
            .with_context(|| format!("API token not set (expected in ${})", self.token_env))?;
        if token.trim().is_empty() {
            bail!("API token in ${} is empty", self.token_env);
        }
        Ok(ClientConfig::new(token.trim())
            .with_base_url(&self.base_url)
            .with_change_agent(&self.change_agent))
    }
}

/// Optional log files, in addition to stderr
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingSection {
    /// Receives everything at debug level and above
    pub debug_file: Option<PathBuf>,
    /// Receives everything at info level and above
    pub info_file: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CombinedSection {
    pub map_source: SheetId,
    pub intake_source: SheetId,
    pub destination: SheetId,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FiscalSection {
    /// Replaces the built-in table when non-empty
    pub years: Vec<FiscalYearEntry>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FiscalYearEntry {
    pub year: u16,
    /// `[start, end]` per quarter, as `YYYY-MM-DD` strings
    pub quarters: Vec<[NaiveDate; 2]>,
}

impl FiscalSection {
    pub fn calendar(&self) -> Result<FiscalCalendar> {
        if self.years.is_empty() {
            return Ok(FiscalCalendar::builtin());
        }
        let years = self
            .years
            .iter()
            .map(FiscalYearEntry::to_year)
            .collect::<Result<Vec<_>>>()?;
        FiscalCalendar::new(years).context("invalid [fiscal] table")
    }
}

impl FiscalYearEntry {
    fn to_year(&self) -> Result<FiscalYear> {
        let ranges: Vec<QuarterRange> = self
            .quarters
            .iter()
            .map(|[start, end]| QuarterRange::new(*start, *end))
            .collect();
        let found = ranges.len();
        let quarters: [QuarterRange; 4] = ranges
            .try_into()
            .map_err(|_| anyhow!("FY{} needs 4 quarters, found {found}", self.year))?;
        Ok(FiscalYear {
            year: self.year,
            quarters,
        })
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RulesSection {
    pub map: MapRules,
    pub intake: IntakeRules,
    pub promote: PromoteRules,
    pub colors: ColorScheme,
}

impl Config {
    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load `path`; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn intake_calendar(&self) -> Result<SheetPair> {
        self.intake_calendar
            .ok_or_else(|| missing_section("intake_calendar"))
    }

    pub fn map_calendar(&self) -> Result<SheetPair> {
        self.map_calendar.ok_or_else(|| missing_section("map_calendar"))
    }

    pub fn request_to_map(&self) -> Result<SheetPair> {
        self.request_to_map
            .ok_or_else(|| missing_section("request_to_map"))
    }

    pub fn combined_calendar(&self) -> Result<CombinedSection> {
        self.combined_calendar
            .ok_or_else(|| missing_section("combined_calendar"))
    }
}

fn missing_section(name: &str) -> anyhow::Error {
    anyhow!("config has no [{name}] section")
}

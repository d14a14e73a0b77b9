use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::error::{Error, Result};

/// Set columns that can distinguish one investment series from another.
pub const DEFAULT_GROUPING_COLUMNS: &[&str] = &[
    "Future",
    "Scenario",
    "REGION",
    "TECHNOLOGY",
    "FUEL",
    "EMISSION",
    "MODE_OF_OPERATION",
    "TIMESLICE",
    "STORAGE",
    "SEASON",
    "DAYTYPE",
    "DAILYTIMEBRACKET",
];

/// Grouping preferred whenever all of its columns carry investment data.
pub const PRIMARY_GROUPING: &[&str] = &["Future", "Scenario", "REGION", "TECHNOLOGY"];

/// Annualization settings. Every field has a default so a config file only
/// needs the values it changes.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub discount_rate: f64,
    /// Years over which each investment is repaid.
    pub asset_lifetime: u32,
    pub input_file: PathBuf,
    pub capital_column: String,
    pub new_column: String,
    pub year_column: String,
    pub grouping_columns: Vec<String>,
    pub primary_grouping: Vec<String>,
    pub verbose: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            discount_rate: 0.0639,
            asset_lifetime: 15,
            input_file: PathBuf::from("RELAC_TX_Combined_Inputs_Outputs.csv"),
            capital_column: "CapitalInvestment".to_string(),
            new_column: "CapitalInvestmentAnnualized".to_string(),
            year_column: "YEAR".to_string(),
            grouping_columns: DEFAULT_GROUPING_COLUMNS.iter().map(|c| c.to_string()).collect(),
            primary_grouping: PRIMARY_GROUPING.iter().map(|c| c.to_string()).collect(),
            verbose: true,
        }
    }
}

impl Settings {
    /// Reads a TOML settings file. Missing keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {path:?}: {e}")))?;
        Ok(toml::from_str(&text)?)
    }

    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        path.map_or_else(|| Ok(Self::default()), Self::load)
    }
}

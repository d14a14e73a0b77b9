//! Post-processing of OSeMOSYS result tables.
//!
//! The main transform annualizes the `CapitalInvestment` column of a combined
//! result file: each investment is spread over the asset lifetime with the
//! capital recovery factor and overlapping payments are summed per investment
//! series. Smaller helpers merge per-parameter result files and sort CSV
//! folders.

pub mod annualize;
pub mod concat;
pub mod config;
pub mod crf;
pub mod error;
pub mod grouping;
pub mod report;
pub mod sort;
pub mod table;

pub use annualize::{Annualized, Investment, annualize, annualize_file, annualize_table};
pub use config::Settings;
pub use crf::capital_recovery_factor;
pub use error::{Error, Result};
pub use table::Table;

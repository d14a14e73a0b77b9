use log::{debug, info, warn};

/// Running statistics of one numeric column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnStats {
    pub count: usize,
    pub missing: usize,
    pub sum: f64,
    pub max: Option<f64>,
    pub positive: usize,
}

impl ColumnStats {
    pub fn from_values(values: impl IntoIterator<Item = Option<f64>>) -> Self {
        let mut stats = Self::default();
        for value in values {
            stats.add(value);
        }
        stats
    }

    fn add(&mut self, value: Option<f64>) {
        let Some(value) = value else {
            self.missing += 1;
            return;
        };

        self.count += 1;
        self.sum += value;
        self.max = Some(self.max.map_or(value, |max| max.max(value)));
        if value > 0.0 {
            self.positive += 1;
        }
    }

    /// Mean of the non-missing values.
    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SampleRow {
    pub group: String,
    pub year: i32,
    pub capital: Option<f64>,
    pub annualized: f64,
}

/// What a run did, for the log.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub rows: usize,
    pub groups: usize,
    pub grouping_columns: Vec<String>,
    pub crf: f64,
    /// Decimal places the output was rounded to, `None` when left unrounded.
    pub decimal_places: Option<usize>,
    pub capital_column: String,
    pub new_column: String,
    pub capital: ColumnStats,
    pub annualized: ColumnStats,
    /// First rows with a positive annualized value.
    pub samples: Vec<SampleRow>,
}

impl Summary {
    /// Annualized total over invested total. Exceeds the CRF whenever payment
    /// windows overlap.
    pub fn ratio(&self) -> Option<f64> {
        (self.capital.sum > 0.0 && self.annualized.sum > 0.0)
            .then(|| self.annualized.sum / self.capital.sum)
    }

    pub fn log(&self) {
        info!("Processed {} rows in {} groups", self.rows, self.groups);
        info!("Grouping columns: {}", self.grouping_columns.join(", "));
        info!("Missing values in {}: {}", self.capital_column, self.capital.missing);
        info!("Missing values in {}: {}", self.new_column, self.annualized.missing);
        log_stats(&self.capital_column, &self.capital);
        log_stats(&self.new_column, &self.annualized);

        if let Some(ratio) = self.ratio() {
            info!("Ratio annualized sum / capital sum: {ratio:.2} (CRF {:.4})", self.crf);
        }

        if self.annualized.sum == 0.0 {
            warn!("All annualized values are zero, check that the grouping columns fit the data");
        }

        for sample in &self.samples {
            debug!(
                "  {} {}: {} = {}, {} = {:.2}",
                sample.group,
                sample.year,
                self.capital_column,
                sample.capital.map_or_else(|| "NaN".to_string(), |c| format!("{c:.2}")),
                self.new_column,
                sample.annualized
            );
        }
    }
}

fn log_stats(name: &str, stats: &ColumnStats) {
    info!(
        "{name}: sum {:.2}, mean {:.2}, max {:.2}, {} positive",
        stats.sum,
        stats.mean().unwrap_or(f64::NAN),
        stats.max.unwrap_or(f64::NAN),
        stats.positive
    );
}

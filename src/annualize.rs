//! Capital investment annualization.
//!
//! Every investment is turned into a constant yearly payment
//! (`investment * CRF`) that runs for the asset lifetime, starting in the year
//! of the investment. Payments of investments made by the same series in
//! different years overlap and are summed, so the new column holds the total
//! capital cost carried in each year.

use std::collections::BTreeMap;

use log::{debug, info};

use crate::{
    config::Settings,
    crf::capital_recovery_factor,
    error::{Error, Result},
    grouping::{GroupKey, GroupingRequest, effective_grouping, group_rows},
    report::{ColumnStats, SampleRow, Summary},
    table::{ColumnIndex, Table, decimal_places, format_number, parse_number},
};

const SAMPLE_ROWS: usize = 10;

/// Groups whose payments are logged in detail.
const DETAILED_GROUPS: usize = 3;

/// One row of an investment series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Investment {
    pub year: i32,
    pub amount: Option<f64>,
}

/// Sums, for every year of the series, the payments of all investments whose
/// repayment window `[year, year + lifetime - 1]` covers it.
///
/// Payments only land on years present in `records`. If no record carries an
/// amount, every year maps to `None`; otherwise missing amounts count as zero.
/// Records sharing a year share one entry.
pub fn annualize(records: &[Investment], crf: f64, lifetime: u32) -> BTreeMap<i32, Option<f64>> {
    if records.iter().all(|r| r.amount.is_none()) {
        return records.iter().map(|r| (r.year, None)).collect();
    }

    let mut totals: BTreeMap<i32, f64> = records.iter().map(|r| (r.year, 0.0)).collect();

    let mut ordered: Vec<&Investment> = records.iter().collect();
    ordered.sort_by_key(|r| r.year);

    for record in ordered {
        let amount = record.amount.unwrap_or(0.0);
        if amount <= 0.0 {
            continue;
        }

        let payment = amount * crf;
        let last_year = i64::from(record.year) + i64::from(lifetime) - 1;
        let last_year = i32::try_from(last_year).unwrap_or(i32::MAX);
        for (_, total) in totals.range_mut(record.year..=last_year) {
            *total += payment;
        }
    }

    totals.into_iter().map(|(year, total)| (year, Some(total))).collect()
}

/// The augmented table and what it took to build it.
#[derive(Debug, Clone)]
pub struct Annualized {
    pub table: Table,
    pub summary: Summary,
}

/// Adds (or replaces) the annualized column on a copy of `table`.
pub fn annualize_table(table: &Table, settings: &Settings) -> Result<Annualized> {
    let capital = table.column(&settings.capital_column)?;
    let year = table.column(&settings.year_column)?;
    for column in [&settings.capital_column, &settings.year_column] {
        if *column == settings.new_column {
            return Err(Error::InvalidParameter {
                name: "new column name",
                reason: format!("\"{column}\" would overwrite an input column"),
            });
        }
    }

    let crf = capital_recovery_factor(settings.discount_rate, settings.asset_lifetime)?;
    info!("Capital recovery factor: {crf:.6}");
    info!("  each unit invested becomes a payment of {crf:.4} per year");

    let investments = parse_investments(table, capital, &settings.capital_column)?;
    let years = parse_years(table, year, &settings.year_column)?;
    if let (Some(first), Some(last)) = (years.iter().min(), years.iter().max()) {
        info!("Years {first} - {last}");
    }

    let mut excluded = vec![capital, year];
    excluded.extend(table.find_column(&settings.new_column));
    let key_columns = effective_grouping(
        table,
        &investments,
        GroupingRequest {
            candidates: &settings.grouping_columns,
            primary: &settings.primary_grouping,
            excluded: &excluded,
        },
    )?;

    let groups = group_rows(table, &key_columns);
    info!("Processing {} rows in {} groups", table.len(), groups.len());

    let mut annualized = vec![None; table.len()];
    for (n, (key, rows)) in groups.iter().enumerate() {
        let records: Vec<Investment> = rows
            .iter()
            .map(|&row| Investment { year: years[row], amount: investments[row] })
            .collect();
        let by_year = annualize(&records, crf, settings.asset_lifetime);

        if n < DETAILED_GROUPS {
            log_group(key, &records, &by_year, crf);
        }

        for &row in rows {
            annualized[row] = by_year.get(&years[row]).copied().flatten();
        }
    }

    let decimals = table.column_cells(capital).map(decimal_places).max().unwrap_or(0);
    let rounding = (decimals > 0).then_some(decimals);
    if let Some(decimals) = rounding {
        for value in annualized.iter_mut().flatten() {
            *value = round_to(*value, decimals);
        }
    }

    let mut augmented = table.clone();
    let cells = annualized.iter().copied().map(format_number).collect();
    augmented.set_column(&settings.new_column, cells);

    let samples = annualized
        .iter()
        .copied()
        .enumerate()
        .filter_map(|(row, value)| value.filter(|v| *v > 0.0).map(|v| (row, v)))
        .take(SAMPLE_ROWS)
        .map(|(row, value)| SampleRow {
            group: key_columns
                .iter()
                .map(|c| table.cell(row, c.index))
                .collect::<Vec<_>>()
                .join("/"),
            year: years[row],
            capital: investments[row],
            annualized: value,
        })
        .collect();

    let summary = Summary {
        rows: table.len(),
        groups: groups.len(),
        grouping_columns: key_columns.into_iter().map(|c| c.name).collect(),
        crf,
        decimal_places: rounding,
        capital_column: settings.capital_column.clone(),
        new_column: settings.new_column.clone(),
        capital: ColumnStats::from_values(investments.iter().copied()),
        annualized: ColumnStats::from_values(annualized.iter().copied()),
        samples,
    };

    Ok(Annualized { table: augmented, summary })
}

/// Reads `settings.input_file`, annualizes it and writes it back in place.
pub fn annualize_file(settings: &Settings) -> Result<Annualized> {
    let path = &settings.input_file;
    info!(
        "Annualizing {path:?} at a {}% discount rate over {} years",
        settings.discount_rate * 100.0,
        settings.asset_lifetime
    );

    let table = Table::read(path)?;
    info!("Loaded {} rows and {} columns", table.len(), table.headers().len());

    let result = annualize_table(&table, settings)?;

    result.table.write(path)?;
    info!("Saved {} to {path:?}", settings.new_column);
    result.summary.log();

    Ok(result)
}

fn parse_investments(table: &Table, column: ColumnIndex, name: &str) -> Result<Vec<Option<f64>>> {
    table
        .column_cells(column)
        .enumerate()
        .map(|(row, cell)| {
            parse_number(cell).map_err(|_| invalid_value(row, name, cell, "a number"))
        })
        .collect()
}

fn parse_years(table: &Table, column: ColumnIndex, name: &str) -> Result<Vec<i32>> {
    table
        .column_cells(column)
        .enumerate()
        .map(|(row, cell)| parse_year(cell).ok_or_else(|| invalid_value(row, name, cell, "a year")))
        .collect()
}

/// `row` is zero based; the error counts data rows from one.
fn invalid_value(row: usize, column: &str, value: &str, expected: &'static str) -> Error {
    Error::InvalidValue {
        row: row + 1,
        column: column.to_string(),
        value: value.to_string(),
        expected,
    }
}

/// Accepts integral values, also when written as floats ("2025.0").
fn parse_year(cell: &str) -> Option<i32> {
    let cell = cell.trim();
    if let Ok(year) = cell.parse() {
        return Some(year);
    }

    let value: f64 = cell.parse().ok()?;
    let in_range = value >= f64::from(i32::MIN) && value <= f64::from(i32::MAX);
    (value.fract() == 0.0 && in_range).then_some(value as i32)
}

/// Rounds half away from zero. pandas rounds ties to even, so a tie such as
/// `0.125` at two places gives `0.13` here and `0.12` there.
fn round_to(value: f64, decimals: usize) -> f64 {
    let scale = 10f64.powi(decimals.min(15) as i32);
    (value * scale).round() / scale
}

fn log_group(
    key: &GroupKey,
    records: &[Investment],
    by_year: &BTreeMap<i32, Option<f64>>,
    crf: f64,
) {
    let key: Vec<&str> = key.iter().map(|v| v.as_deref().unwrap_or("NaN")).collect();
    debug!("  Group {key:?}");

    if by_year.values().all(Option::is_none) {
        debug!("    all investments missing, output kept missing");
        return;
    }

    for record in records.iter().filter(|r| r.amount.is_some_and(|a| a > 0.0)) {
        let amount = record.amount.unwrap_or_default();
        debug!("    {}: investment {amount:.2} -> payment {:.2}", record.year, amount * crf);
    }
    for (year, total) in by_year {
        if let Some(total) = total.filter(|t| *t > 0.0) {
            debug!("    {year}: {total:.2}");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use float_cmp::assert_approx_eq;

    use super::*;

    fn settings(discount_rate: f64, asset_lifetime: u32) -> Settings {
        Settings { discount_rate, asset_lifetime, ..Settings::default() }
    }

    fn table(data: &str) -> Table {
        Table::from_reader(data.as_bytes(), b',', Path::new("test.csv")).unwrap()
    }

    fn output_column(annualized: &Annualized) -> Vec<&str> {
        let column = annualized.table.column("CapitalInvestmentAnnualized").unwrap();
        annualized.table.column_cells(column).collect()
    }

    fn invest(year: i32, amount: f64) -> Investment {
        Investment { year, amount: Some(amount) }
    }

    #[test]
    fn single_investment_pays_over_its_window() {
        let mut records: Vec<_> = (2025..=2036).map(|y| invest(y, 0.0)).collect();
        records[0] = invest(2025, 1000.0);

        let crf = capital_recovery_factor(0.05, 10).unwrap();
        let by_year = annualize(&records, crf, 10);

        for year in 2025..=2034 {
            assert_approx_eq!(f64, by_year[&year].unwrap(), 129.504_574_965_46, epsilon = 1e-9);
        }
        assert_eq!(by_year[&2035], Some(0.0));
        assert_eq!(by_year[&2036], Some(0.0));
    }

    #[test]
    fn overlapping_windows_accumulate() {
        let records: Vec<_> = (2025..=2032)
            .map(|y| match y {
                2025 | 2027 => invest(y, 500.0),
                _ => invest(y, 0.0),
            })
            .collect();
        let crf = capital_recovery_factor(0.05, 5).unwrap();
        let payment = 500.0 * crf;

        let by_year = annualize(&records, crf, 5);
        assert_approx_eq!(f64, by_year[&2026].unwrap(), payment);
        assert_approx_eq!(f64, by_year[&2027].unwrap(), 2.0 * payment);
        assert_approx_eq!(f64, by_year[&2029].unwrap(), 2.0 * payment);
        assert_approx_eq!(f64, by_year[&2030].unwrap(), payment);
        assert_approx_eq!(f64, by_year[&2031].unwrap(), payment);
        assert_eq!(by_year[&2032], Some(0.0));
    }

    #[test]
    fn superposition_of_investments() {
        let crf = capital_recovery_factor(0.0639, 15).unwrap();
        let a = [invest(2020, 300.0), invest(2030, 0.0), invest(2040, 0.0)];
        let b = [invest(2020, 0.0), invest(2030, 700.0), invest(2040, 0.0)];
        let both = [invest(2020, 300.0), invest(2030, 700.0), invest(2040, 0.0)];

        let a = annualize(&a, crf, 15);
        let b = annualize(&b, crf, 15);
        let both = annualize(&both, crf, 15);
        for year in [2020, 2030, 2040] {
            let expected = a[&year].unwrap() + b[&year].unwrap();
            assert_approx_eq!(f64, both[&year].unwrap(), expected);
        }
    }

    #[test]
    fn payments_skip_absent_years() {
        let records = [invest(2020, 400.0), invest(2025, 0.0), invest(2030, 0.0)];
        let by_year = annualize(&records, 0.25, 4);
        assert_eq!(by_year[&2020], Some(100.0));
        assert_eq!(by_year[&2025], Some(0.0));
        assert_eq!(by_year.len(), 3);
    }

    #[test]
    fn zero_rate_splits_evenly() {
        let records: Vec<_> = (2020..=2024)
            .map(|y| invest(y, if y == 2020 { 400.0 } else { 0.0 }))
            .collect();
        let crf = capital_recovery_factor(0.0, 4).unwrap();
        let by_year = annualize(&records, crf, 4);
        for year in 2020..=2023 {
            assert_eq!(by_year[&year], Some(100.0));
        }
        assert_eq!(by_year[&2024], Some(0.0));
    }

    #[test]
    fn all_missing_stays_missing() {
        let records = [
            Investment { year: 2020, amount: None },
            Investment { year: 2021, amount: None },
        ];
        let by_year = annualize(&records, 0.5, 2);
        assert_eq!(by_year.values().copied().collect::<Vec<_>>(), [None, None]);
    }

    #[test]
    fn missing_counts_as_zero_next_to_numbers() {
        let records = [
            Investment { year: 2020, amount: None },
            Investment { year: 2021, amount: Some(10.0) },
        ];
        let by_year = annualize(&records, 0.5, 2);
        assert_eq!(by_year[&2020], Some(0.0));
        assert_eq!(by_year[&2021], Some(5.0));
    }

    #[test]
    fn input_order_does_not_matter() {
        let sorted = [invest(2020, 100.0), invest(2021, 50.0), invest(2022, 0.0)];
        let shuffled = [sorted[2], sorted[0], sorted[1]];
        assert_eq!(annualize(&sorted, 0.3, 2), annualize(&shuffled, 0.3, 2));
    }

    #[test]
    fn long_lifetimes_do_not_overflow() {
        let records = [invest(i32::MAX - 1, 10.0), invest(i32::MAX, 0.0)];
        let by_year = annualize(&records, 0.1, u32::MAX);
        assert_eq!(by_year[&i32::MAX], Some(1.0));
    }

    #[test]
    fn table_scenario_single_investment() {
        let t = table(
            "TECHNOLOGY,YEAR,CapitalInvestment\n\
             X,2025,1000.25\n\
             X,2026,0\n\
             X,2034,0\n\
             X,2035,0\n",
        );
        let result = annualize_table(&t, &settings(0.05, 10)).unwrap();
        assert_eq!(output_column(&result), ["129.54", "129.54", "129.54", "0"]);
        assert_eq!(result.summary.decimal_places, Some(2));
        assert_eq!(result.summary.groups, 1);
        assert_eq!(result.summary.grouping_columns, ["TECHNOLOGY"]);
    }

    #[test]
    fn integer_investments_are_not_rounded() {
        let t = table("TECHNOLOGY,YEAR,CapitalInvestment\nX,2025,1000\n");
        let result = annualize_table(&t, &settings(0.05, 10)).unwrap();
        let value: f64 = output_column(&result)[0].parse().unwrap();
        assert_approx_eq!(f64, value, 129.504_574_965_46, epsilon = 1e-9);
        assert_eq!(result.summary.decimal_places, None);
    }

    #[test]
    fn groups_are_annualized_separately() {
        let t = table(
            "REGION,TECHNOLOGY,YEAR,CapitalInvestment\n\
             R1,A,2020,400.0\n\
             R1,B,2020,\n\
             R1,A,2021,\n\
             R1,B,2021,\n\
             R1,C,2020,800.5\n\
             R1,C,2021,0\n",
        );
        let result = annualize_table(&t, &settings(0.0, 2)).unwrap();
        assert_eq!(output_column(&result), ["200", "", "200", "", "400.3", "400.3"]);
        assert_eq!(result.summary.annualized.missing, 2);
        assert_eq!(result.summary.capital.missing, 3);
    }

    #[test]
    fn rerun_replaces_existing_column() {
        let t = table("TECHNOLOGY,YEAR,CapitalInvestment\nX,2020,10.5\nX,2021,0\n");
        let first = annualize_table(&t, &settings(0.0, 2)).unwrap();
        let second = annualize_table(&first.table, &settings(0.0, 2)).unwrap();
        assert_eq!(first.table, second.table);
        assert_eq!(second.table.headers().len(), 4);
    }

    #[test]
    fn missing_columns_are_reported() {
        let t = table("TECHNOLOGY,YEAR\nX,2020\n");
        assert!(matches!(
            annualize_table(&t, &Settings::default()),
            Err(Error::MissingColumn { column, .. }) if column == "CapitalInvestment"
        ));

        let t = table("TECHNOLOGY,CapitalInvestment\nX,1\n");
        assert!(matches!(
            annualize_table(&t, &Settings::default()),
            Err(Error::MissingColumn { column, .. }) if column == "YEAR"
        ));
    }

    #[test]
    fn bad_values_abort() {
        let t = table("TECHNOLOGY,YEAR,CapitalInvestment\nX,2020,1\nX,soon,1\n");
        assert!(matches!(
            annualize_table(&t, &Settings::default()),
            Err(Error::InvalidValue { row: 2, expected: "a year", .. })
        ));

        let t = table("TECHNOLOGY,YEAR,CapitalInvestment\nX,2020,1\nX,,1\n");
        assert!(matches!(
            annualize_table(&t, &Settings::default()),
            Err(Error::InvalidValue { row: 2, expected: "a year", .. })
        ));

        let t = table("TECHNOLOGY,YEAR,CapitalInvestment\nX,2020,lots\n");
        assert!(matches!(
            annualize_table(&t, &Settings::default()),
            Err(Error::InvalidValue { row: 1, expected: "a number", .. })
        ));
    }

    #[test]
    fn invalid_parameters_abort() {
        let t = table("TECHNOLOGY,YEAR,CapitalInvestment\nX,2020,1\n");
        assert!(matches!(
            annualize_table(&t, &settings(0.05, 0)),
            Err(Error::InvalidParameter { .. })
        ));
        assert!(matches!(
            annualize_table(&t, &settings(-0.05, 10)),
            Err(Error::InvalidParameter { .. })
        ));

        let clash = Settings { new_column: "CapitalInvestment".into(), ..Settings::default() };
        assert!(matches!(annualize_table(&t, &clash), Err(Error::InvalidParameter { .. })));
    }

    #[test]
    fn years_may_be_written_as_floats() {
        assert_eq!(parse_year("2025"), Some(2025));
        assert_eq!(parse_year("2025.0"), Some(2025));
        assert_eq!(parse_year("2025.5"), None);
        assert_eq!(parse_year(""), None);
        assert_eq!(parse_year("1e12"), None);
    }

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(round_to(129.504_574, 2), 129.5);
        assert_eq!(round_to(0.125, 1), 0.1);
        assert_eq!(round_to(2.5, 0), 3.0);
    }
}

//! CSV persistence for price history
//!
//! One row per timestamp, header row with column names, ISO date as the
//! index column. NaN indicator cells are written as empty strings and read
//! back as NaN, so undefined values survive a round trip unhidden.

use chrono::NaiveDate;
use log::info;
use std::collections::HashMap;
use std::path::Path;

use crate::error::{InsightError, Result};
use crate::models::{IndicatorSet, PriceBar, PriceSeries};

const OHLCV_HEADER: [&str; 6] = ["timestamp", "open", "high", "low", "close", "volume"];

/// Save one series as OHLCV rows.
pub fn save_to_csv<P: AsRef<Path>>(series: &PriceSeries, path: P) -> Result<()> {
    let path = path.as_ref();
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(OHLCV_HEADER)?;
    for bar in &series.bars {
        writer.write_record(&[
            bar.timestamp.to_string(),
            format_cell(bar.open),
            format_cell(bar.high),
            format_cell(bar.low),
            format_cell(bar.close),
            format_cell(bar.volume),
        ])?;
    }
    writer.flush()?;
    info!(
        "saved {} bars for {} to {}",
        series.len(),
        series.symbol,
        path.display()
    );
    Ok(())
}

/// Save a series with its indicator columns appended after OHLCV.
///
/// Indicator columns come out in sorted name order and must share the series
/// index.
pub fn save_with_indicators<P: AsRef<Path>>(
    series: &PriceSeries,
    indicators: &IndicatorSet,
    path: P,
) -> Result<()> {
    if indicators.len() != series.len() {
        return Err(InsightError::Computation(format!(
            "indicator set covers {} rows, series has {}",
            indicators.len(),
            series.len()
        )));
    }

    let path = path.as_ref();
    let mut writer = csv::Writer::from_path(path)?;

    let mut header: Vec<&str> = OHLCV_HEADER.to_vec();
    header.extend(indicators.names());
    writer.write_record(&header)?;

    for (i, bar) in series.bars.iter().enumerate() {
        let mut row = vec![
            bar.timestamp.to_string(),
            format_cell(bar.open),
            format_cell(bar.high),
            format_cell(bar.low),
            format_cell(bar.close),
            format_cell(bar.volume),
        ];
        for (_, column) in indicators.iter() {
            row.push(format_cell(column[i]));
        }
        writer.write_record(&row)?;
    }
    writer.flush()?;
    info!(
        "saved {} bars with {} indicator columns to {}",
        series.len(),
        indicators.names().count(),
        path.display()
    );
    Ok(())
}

/// Save several series, one file per symbol.
///
/// Files are named `{stem}_{symbol}.csv` with `-` mapped to `_`, so a base
/// path of `data/prices.csv` and symbol `BTC-USD` lands in
/// `data/prices_BTC_USD.csv`.
pub fn save_many_to_csv<P: AsRef<Path>>(
    data: &HashMap<String, PriceSeries>,
    base_path: P,
) -> Result<()> {
    let stem = base_path.as_ref().with_extension("");
    for (symbol, series) in data {
        let path = format!("{}_{}.csv", stem.display(), symbol.replace('-', "_"));
        save_to_csv(series, path)?;
    }
    Ok(())
}

/// Load a series saved by [`save_to_csv`] or [`save_with_indicators`].
///
/// Only the six OHLCV columns are read back; the symbol is taken from the
/// file stem. Appended indicator columns are ignored.
pub fn load_from_csv<P: AsRef<Path>>(path: P) -> Result<PriceSeries> {
    let path = path.as_ref();
    let symbol = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut reader = csv::Reader::from_path(path)?;
    let mut bars = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.len() < OHLCV_HEADER.len() {
            return Err(InsightError::Computation(format!(
                "malformed CSV row: expected at least {} fields, got {}",
                OHLCV_HEADER.len(),
                record.len()
            )));
        }
        let timestamp: NaiveDate = record[0].parse().map_err(|e| {
            InsightError::Computation(format!("bad timestamp {:?}: {}", &record[0], e))
        })?;
        bars.push(PriceBar {
            timestamp,
            open: parse_cell(&record[1])?,
            high: parse_cell(&record[2])?,
            low: parse_cell(&record[3])?,
            close: parse_cell(&record[4])?,
            volume: parse_cell(&record[5])?,
        });
    }
    Ok(PriceSeries::new(symbol, bars))
}

fn format_cell(value: f64) -> String {
    if value.is_nan() {
        String::new()
    } else {
        value.to_string()
    }
}

fn parse_cell(field: &str) -> Result<f64> {
    if field.is_empty() {
        return Ok(f64::NAN);
    }
    field
        .parse()
        .map_err(|e| InsightError::Computation(format!("bad numeric field {:?}: {}", field, e)))
}

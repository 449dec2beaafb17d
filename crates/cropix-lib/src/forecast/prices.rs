//! Historical weekly crop price table

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use std::io::Read;
use std::path::Path;

/// Date-indexed multi-crop price table, oldest row first
#[derive(Debug, Clone)]
pub struct PriceTable {
    crops: Vec<String>,
    dates: Vec<NaiveDate>,
    rows: Vec<Vec<f64>>,
}

impl PriceTable {
    pub fn load(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open price data {}", path.display()))?;
        Self::from_reader(file).with_context(|| format!("Invalid price data {}", path.display()))
    }

    /// Parse CSV with a `Date` column followed by one column per crop
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

        let headers = csv.headers().context("Missing CSV header")?.clone();
        let date_index = headers
            .iter()
            .position(|h| h == "Date")
            .context("CSV header has no Date column")?;
        let crops: Vec<String> = headers
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != date_index)
            .map(|(_, h)| h.to_string())
            .collect();
        if crops.is_empty() {
            anyhow::bail!("CSV has no crop columns");
        }

        let mut dates = Vec::new();
        let mut rows = Vec::new();

        for (line, record) in csv.records().enumerate() {
            let record = record.with_context(|| format!("Malformed CSV record {}", line + 1))?;
            let date_field = record.get(date_index).unwrap_or_default();
            dates.push(
                parse_date(date_field)
                    .with_context(|| format!("Bad date '{}' in record {}", date_field, line + 1))?,
            );

            let mut row = Vec::with_capacity(crops.len());
            for (i, field) in record.iter().enumerate() {
                if i == date_index {
                    continue;
                }
                let value: f64 = field
                    .parse()
                    .with_context(|| format!("Bad price '{}' in record {}", field, line + 1))?;
                row.push(value);
            }
            if row.len() != crops.len() {
                anyhow::bail!("Record {} has {} prices, expected {}", line + 1, row.len(), crops.len());
            }
            rows.push(row);
        }

        Ok(Self { crops, dates, rows })
    }

    pub fn crops(&self) -> &[String] {
        &self.crops
    }

    pub fn crop_index(&self, crop: &str) -> Option<usize> {
        self.crops.iter().position(|c| c == crop)
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }
}

fn parse_date(value: &str) -> Result<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(date);
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .map(|dt| dt.date())
        .context("Expected YYYY-MM-DD")
}

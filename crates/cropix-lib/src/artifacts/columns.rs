//! Tabular column schemas
//!
//! The tabular regressors were trained on frames mixing numeric and
//! categorical columns. The schema file records the training column order
//! and the one-hot vocabulary of each categorical column so a request can
//! be encoded into the exact feature row the exported model expects.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// One training column
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Column {
    Numeric { name: String },
    Categorical { name: String, categories: Vec<String> },
}

impl Column {
    pub fn name(&self) -> &str {
        match self {
            Column::Numeric { name } | Column::Categorical { name, .. } => name,
        }
    }

    fn width(&self) -> usize {
        match self {
            Column::Numeric { .. } => 1,
            Column::Categorical { categories, .. } => categories.len(),
        }
    }
}

/// Raw cell value of a request row
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Number(f64),
    Text(String),
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

impl From<i32> for Cell {
    fn from(value: i32) -> Self {
        Cell::Number(value as f64)
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

/// Ordered column schema for one tabular model
#[derive(Debug, Clone, Deserialize)]
pub struct ColumnSchema {
    pub columns: Vec<Column>,
}

impl ColumnSchema {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read column schema {}", path.display()))?;
        let schema: ColumnSchema =
            serde_json::from_str(&content).context("Failed to parse column schema")?;
        if schema.columns.is_empty() {
            anyhow::bail!("Column schema {} lists no columns", path.display());
        }
        Ok(schema)
    }

    /// Number of encoded features
    pub fn width(&self) -> usize {
        self.columns.iter().map(Column::width).sum()
    }

    /// Encode one request row into the model's feature vector
    ///
    /// Unknown categories encode to an all-zero block.
    pub fn encode(&self, row: &HashMap<&str, Cell>) -> Result<Vec<f32>, String> {
        let mut features = Vec::with_capacity(self.width());

        for column in &self.columns {
            let cell = row
                .get(column.name())
                .ok_or_else(|| format!("missing column {}", column.name()))?;

            match (column, cell) {
                (Column::Numeric { .. }, Cell::Number(value)) => features.push(*value as f32),
                (Column::Numeric { name }, Cell::Text(text)) => {
                    let value: f64 = text
                        .trim()
                        .parse()
                        .map_err(|_| format!("{} must be numeric, got '{}'", name, text))?;
                    features.push(value as f32);
                }
                (Column::Categorical { categories, .. }, cell) => {
                    let label = match cell {
                        Cell::Text(text) => text.trim().to_string(),
                        Cell::Number(value) => value.to_string(),
                    };
                    features.extend(
                        categories
                            .iter()
                            .map(|c| if *c == label { 1.0 } else { 0.0 }),
                    );
                }
            }
        }

        Ok(features)
    }
}

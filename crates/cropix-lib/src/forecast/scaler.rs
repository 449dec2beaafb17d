//! Per-column min-max scaling to [0, 1]

/// Min-max scaler fitted column by column
#[derive(Debug, Clone)]
pub struct MinMaxScaler {
    min: Vec<f64>,
    scale: Vec<f64>,
}

impl MinMaxScaler {
    /// Fit on row-major data; every row must have the same width
    ///
    /// Returns `None` for an empty table. Constant columns get a range of 1
    /// so they transform to zero instead of dividing by zero.
    pub fn fit(rows: &[Vec<f64>]) -> Option<Self> {
        let width = rows.first()?.len();
        let mut min = vec![f64::INFINITY; width];
        let mut max = vec![f64::NEG_INFINITY; width];

        for row in rows {
            for (j, value) in row.iter().enumerate().take(width) {
                min[j] = min[j].min(*value);
                max[j] = max[j].max(*value);
            }
        }

        let scale = min
            .iter()
            .zip(&max)
            .map(|(lo, hi)| {
                let range = hi - lo;
                if range == 0.0 || !range.is_finite() {
                    1.0
                } else {
                    range
                }
            })
            .collect();

        Some(Self { min, scale })
    }

    pub fn width(&self) -> usize {
        self.min.len()
    }

    pub fn transform_row(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(self.min.iter().zip(&self.scale))
            .map(|(x, (lo, range))| (x - lo) / range)
            .collect()
    }

    pub fn inverse_transform_row(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(self.min.iter().zip(&self.scale))
            .map(|(x, (lo, range))| x * range + lo)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Vec<Vec<f64>> {
        vec![
            vec![1800.0, 2100.0, 5.0],
            vec![1900.0, 2050.0, 5.0],
            vec![2000.0, 2300.0, 5.0],
            vec![1850.0, 2200.0, 5.0],
        ]
    }

    #[test]
    fn test_transform_maps_extremes_to_unit_range() {
        let scaler = MinMaxScaler::fit(&table()).unwrap();
        assert_eq!(scaler.transform_row(&[1800.0, 2300.0, 5.0]), vec![0.0, 1.0, 0.0]);
        assert_eq!(scaler.transform_row(&[1900.0, 2050.0, 5.0]), vec![0.5, 0.0, 0.0]);
    }

    #[test]
    fn test_round_trip_reproduces_window() {
        let rows = table();
        let scaler = MinMaxScaler::fit(&rows).unwrap();
        for row in &rows {
            let back = scaler.inverse_transform_row(&scaler.transform_row(row));
            for (a, b) in row.iter().zip(&back) {
                assert!((a - b).abs() < 1e-9, "{} != {}", a, b);
            }
        }
    }

    #[test]
    fn test_constant_column_transforms_to_zero() {
        let scaler = MinMaxScaler::fit(&table()).unwrap();
        assert_eq!(scaler.transform_row(&[1800.0, 2100.0, 5.0])[2], 0.0);
        assert_eq!(scaler.inverse_transform_row(&[0.0, 0.0, 0.0])[2], 5.0);
    }

    #[test]
    fn test_empty_table_has_no_scaler() {
        assert!(MinMaxScaler::fit(&[]).is_none());
    }
}

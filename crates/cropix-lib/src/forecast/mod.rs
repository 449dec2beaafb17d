//! Autoregressive market price forecasting
//!
//! A sequence model predicts next week's scaled prices for every crop from
//! the last [`WINDOW_SIZE`] weeks. Multi-week forecasts feed each prediction
//! back into the window, so errors compound with the horizon and no
//! uncertainty estimate is produced.

mod prices;
mod scaler;
mod window;

pub use prices::PriceTable;
pub use scaler::MinMaxScaler;
pub use window::{RollingForecast, RollingForecaster};

/// Weeks of history the sequence model was trained on
pub const WINDOW_SIZE: usize = 8;

/// Default upper bound for `weeks_to_forecast`
pub const DEFAULT_MAX_FORECAST_WEEKS: u32 = 52;

//! One-shot command implementations shared by the subcommands and the menu

pub mod market;
pub mod predict;
pub mod weather;

use anyhow::Result;
use cropix_lib::{FertilizerRequest, MarketRequest, SoilRequest, WeatherRequest, YieldRequest};
use std::path::PathBuf;

use crate::output::OutputFormat;
use crate::session::Session;

/// A fully specified prediction
pub enum Action {
    Yield(YieldRequest),
    Disease(PathBuf),
    Fertilizer(FertilizerRequest),
    Market(MarketRequest),
    Soil(SoilRequest),
    Weather(WeatherRequest),
}

/// Run an action, loading the models only when it needs them
pub async fn run(session: &mut Session, action: Action, format: OutputFormat) -> Result<()> {
    let ctx = match action {
        Action::Weather(request) => return weather::forecast(session.weather(), request, format).await,
        _ => session.models()?,
    };

    match action {
        Action::Yield(request) => predict::predict_yield(&ctx, request, format).await,
        Action::Disease(path) => predict::detect_disease(&ctx, path, format).await,
        Action::Fertilizer(request) => predict::recommend_fertilizer(&ctx, request, format).await,
        Action::Market(request) => market::forecast(&ctx, request, format).await,
        Action::Soil(request) => predict::recommend_soil(&ctx, request, format).await,
        Action::Weather(request) => weather::forecast(ctx.weather(), request, format).await,
    }
}

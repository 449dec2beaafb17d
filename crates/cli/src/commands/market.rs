//! Market price forecast command

use anyhow::Result;
use cropix_lib::{MarketRequest, ServiceContext};
use tabled::Tabled;

use crate::output::{print_info, print_json, print_table, print_warning, OutputFormat};
use crate::session::Session;

#[derive(Tabled)]
struct PriceRow {
    #[tabled(rename = "Week")]
    week: usize,
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Price (Rs/quintal)")]
    price: String,
}

pub async fn forecast(ctx: &ServiceContext, request: MarketRequest, format: OutputFormat) -> Result<()> {
    let response = ctx.forecast_market_prices(request).await?;

    match format {
        OutputFormat::Json => print_json(&response)?,
        OutputFormat::Table => {
            for (crop, series) in &response.forecast {
                if series.is_empty() {
                    print_warning(&format!("No weeks requested for {}", crop));
                    continue;
                }
                print_info(&format!("Forecasted prices for {}", crop));
                let rows = series
                    .iter()
                    .enumerate()
                    .map(|(i, (date, price))| PriceRow {
                        week: i + 1,
                        date: date.clone(),
                        price: format!("{:.2}", price),
                    })
                    .collect();
                print_table::<PriceRow>(rows);
            }
        }
    }
    Ok(())
}

/// List forecastable crops; reads only the price table
pub fn list_crops(session: &Session, format: OutputFormat) -> Result<()> {
    let crops = session.market_crops()?;
    match format {
        OutputFormat::Json => print_json(&crops)?,
        OutputFormat::Table => println!("Available crops: {}", crops.join(", ")),
    }
    Ok(())
}

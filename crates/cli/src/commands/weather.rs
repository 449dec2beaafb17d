//! Weather forecast command

use anyhow::Result;
use cropix_lib::{WeatherProxy, WeatherRequest};
use tabled::Tabled;

use crate::output::{print_info, print_json, print_table, OutputFormat};

#[derive(Tabled)]
struct ForecastRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Min °C")]
    min: String,
    #[tabled(rename = "Max °C")]
    max: String,
    #[tabled(rename = "Avg °C")]
    avg: String,
    #[tabled(rename = "Humidity %")]
    humidity: String,
    #[tabled(rename = "Rain %")]
    rain: String,
    #[tabled(rename = "Condition")]
    condition: String,
}

pub async fn forecast(proxy: &WeatherProxy, request: WeatherRequest, format: OutputFormat) -> Result<()> {
    let response = proxy.forecast(&request).await?;

    match format {
        OutputFormat::Json => print_json(&response)?,
        OutputFormat::Table => {
            let place = response.city_name.as_deref().unwrap_or(&request.city);
            print_info(&format!("{}-day forecast for {}", response.forecast.len(), place));
            let rows = response
                .forecast
                .into_iter()
                .map(|p| ForecastRow {
                    date: p.date,
                    min: format!("{:.1}", p.min_temp_c),
                    max: format!("{:.1}", p.max_temp_c),
                    avg: format!("{:.1}", p.avg_temp_c),
                    humidity: format!("{:.0}", p.avg_humidity),
                    rain: format!("{:.0}", p.chance_of_rain),
                    condition: p.condition,
                })
                .collect();
            print_table::<ForecastRow>(rows);
        }
    }
    Ok(())
}

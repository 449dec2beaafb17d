//! Yield, soil, disease, and fertilizer commands

use anyhow::Result;
use cropix_lib::{FertilizerRequest, ServiceContext, SoilRequest, YieldRequest};
use std::path::PathBuf;
use tabled::Tabled;

use crate::output::{
    capitalize, color_confidence, disease_label, print_info, print_json, print_success, print_table,
    OutputFormat,
};

#[derive(Tabled)]
struct NutrientRow {
    #[tabled(rename = "Nutrient")]
    nutrient: &'static str,
    #[tabled(rename = "Current")]
    current: String,
    #[tabled(rename = "Recommended")]
    recommended: String,
}

pub async fn predict_yield(ctx: &ServiceContext, request: YieldRequest, format: OutputFormat) -> Result<()> {
    let area = request.Area;
    let crop = request.Crop.clone();
    let response = ctx.predict_crop_yield(request).await?;

    match format {
        OutputFormat::Json => print_json(&response)?,
        OutputFormat::Table => {
            print_success(&format!(
                "Predicted yield for {}: {:.2} tonnes per hectare",
                crop, response.predicted_yield
            ));
            print_info(&format!(
                "Estimated total production: {:.2} tonnes over {} hectares",
                total_production(response.predicted_yield, area),
                area
            ));
        }
    }
    Ok(())
}

/// Yield per hectare scaled to the whole planted area
pub fn total_production(yield_per_hectare: f64, area: f64) -> f64 {
    yield_per_hectare * area
}

pub async fn recommend_soil(ctx: &ServiceContext, request: SoilRequest, format: OutputFormat) -> Result<()> {
    let response = ctx.recommend_soil_crop(request).await?;

    match format {
        OutputFormat::Json => print_json(&response)?,
        OutputFormat::Table => print_success(&format!(
            "Recommended crop: {}",
            capitalize(&response.recommended_crop)
        )),
    }
    Ok(())
}

pub async fn detect_disease(ctx: &ServiceContext, image: PathBuf, format: OutputFormat) -> Result<()> {
    let response = ctx.detect_disease_file(image).await?;

    match format {
        OutputFormat::Json => print_json(&response)?,
        OutputFormat::Table => {
            print_success(&format!(
                "Detected: {}",
                disease_label(&response.predicted_disease)
            ));
            println!("  Confidence: {}", color_confidence(response.confidence));
        }
    }
    Ok(())
}

pub async fn recommend_fertilizer(
    ctx: &ServiceContext,
    request: FertilizerRequest,
    format: OutputFormat,
) -> Result<()> {
    let current = [request.Current_N, request.Current_P, request.Current_K];
    let crop = request.Crop.clone();
    let response = ctx.recommend_fertilizer(request).await?;

    match format {
        OutputFormat::Json => print_json(&response)?,
        OutputFormat::Table => {
            print_info(&format!("Fertilizer recommendation for {}", crop));
            let recommended = [
                response.recommended_N,
                response.recommended_P,
                response.recommended_K,
            ];
            let rows = ["Nitrogen (N)", "Phosphorus (P)", "Potassium (K)"]
                .into_iter()
                .zip(current.iter().zip(recommended.iter()))
                .map(|(nutrient, (c, r))| NutrientRow {
                    nutrient,
                    current: format!("{:.2}", c),
                    recommended: format!("{:.2}", r),
                })
                .collect();
            print_table::<NutrientRow>(rows);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_production() {
        assert!((total_production(2.5, 120.0) - 300.0).abs() < 1e-9);
        assert_eq!(total_production(3.1, 0.0), 0.0);
    }
}

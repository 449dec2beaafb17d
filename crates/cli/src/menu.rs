//! Interactive numbered menu
//!
//! Prompts are generic over the reader and writer so the retry loops can be
//! driven from memory in tests. Reaching end of input ends the session.

use anyhow::Result;
use cropix_lib::{FertilizerRequest, MarketRequest, SoilRequest, WeatherRequest, YieldRequest};
use std::fmt::Display;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

use crate::commands::{self, Action};
use crate::output::{print_error, OutputFormat};
use crate::session::Session;

/// Weather day limit when no provider is configured
const FALLBACK_MAX_DAYS: u32 = 14;

const WEATHER_CHOICE: u32 = 6;
const EXIT_CHOICE: u32 = 7;

/// Standard input was closed while a prompt was waiting
#[derive(Debug, Error)]
#[error("Input closed")]
pub struct InputClosed;

pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn say(&mut self, line: impl Display) -> Result<()> {
        writeln!(self.output, "{}", line)?;
        Ok(())
    }

    fn read_line(&mut self, prompt: &str) -> Result<String> {
        write!(self.output, "{}", prompt)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(InputClosed.into());
        }
        Ok(line.trim().to_string())
    }

    /// Non-empty free text
    pub fn text(&mut self, prompt: &str) -> Result<String> {
        loop {
            let line = self.read_line(prompt)?;
            if !line.is_empty() {
                return Ok(line);
            }
            self.say("[Error] Please enter a value.")?;
        }
    }

    /// Any value parsing as `T`
    pub fn parse<T: FromStr>(&mut self, prompt: &str, error: &str) -> Result<T> {
        loop {
            match self.read_line(prompt)?.parse::<T>() {
                Ok(value) => return Ok(value),
                Err(_) => self.say(error)?,
            }
        }
    }

    /// Finite floating point number
    pub fn number(&mut self, prompt: &str) -> Result<f64> {
        loop {
            let value: f64 = self.parse(prompt, "[Error] Invalid input. Please enter a valid number.")?;
            if value.is_finite() {
                return Ok(value);
            }
            self.say("[Error] Invalid input. Please enter a valid number.")?;
        }
    }

    pub fn whole_number(&mut self, prompt: &str) -> Result<i32> {
        self.parse(prompt, "[Error] Invalid input. Please enter a valid whole number.")
    }

    /// Whole number within `min..=max`
    pub fn whole_number_in(&mut self, prompt: &str, min: u32, max: u32) -> Result<u32> {
        loop {
            let value: u32 = self.parse(prompt, "[Error] Invalid input. Please enter a valid whole number.")?;
            if (min..=max).contains(&value) {
                return Ok(value);
            }
            self.say(format!("[Error] Please enter a number between {} and {}.", min, max))?;
        }
    }

    /// One of `options`, matched case-insensitively and returned in its listed spelling
    pub fn choice(&mut self, prompt: &str, options: &[String]) -> Result<String> {
        loop {
            let line = self.read_line(prompt)?;
            if let Some(found) = options.iter().find(|o| o.eq_ignore_ascii_case(&line)) {
                return Ok(found.clone());
            }
            self.say("[Error] Invalid crop name. Please choose from the list above.")?;
        }
    }

    #[cfg(test)]
    pub fn into_output(self) -> W {
        self.output
    }
}

const MENU: &str = "
=============================================
              CROPIX Interface
=============================================
1. Predict Crop Yield
2. Detect Plant Disease from Image
3. Recommend Fertilizer
4. Forecast Crop Market Prices
5. Recommend Crop based on Soil
6. Get Weather Forecast
7. Exit
---------------------------------------------";

pub async fn run<R: BufRead, W: Write>(
    session: &mut Session,
    format: OutputFormat,
    prompter: &mut Prompter<R, W>,
) -> Result<()> {
    match menu_loop(session, format, prompter).await {
        Err(e) if e.is::<InputClosed>() => {
            prompter.say("\nInput closed. Exiting CROPIX.")?;
            Ok(())
        }
        other => other,
    }
}

async fn menu_loop<R: BufRead, W: Write>(
    session: &mut Session,
    format: OutputFormat,
    prompter: &mut Prompter<R, W>,
) -> Result<()> {
    loop {
        prompter.say(MENU)?;
        let choice = prompter.whole_number_in("Enter your choice (1-7): ", 1, EXIT_CHOICE)?;
        if choice == EXIT_CHOICE {
            prompter.say("Exiting CROPIX. Goodbye!")?;
            return Ok(());
        }

        // Missing model files are reported before asking for any input
        if choice != WEATHER_CHOICE {
            if let Err(e) = session.models() {
                print_error(&format!("{:#}", e));
                continue;
            }
        }

        let action = match prompt_action(choice, session, prompter) {
            Ok(action) => action,
            Err(e) if e.is::<cropix_lib::CropixError>() => {
                print_error(&e.to_string());
                continue;
            }
            Err(e) => return Err(e),
        };

        if let Err(e) = commands::run(session, action, format).await {
            print_error(&format!("{:#}", e));
        }
    }
}

/// Prompt for the fields of menu option `choice` (1 to 6)
fn prompt_action<R: BufRead, W: Write>(
    choice: u32,
    session: &Session,
    p: &mut Prompter<R, W>,
) -> Result<Action> {
    let action = match choice {
        1 => {
            p.say("\n--- Crop Yield Prediction ---")?;
            let crop = p.text("Enter Crop Name (e.g., Rice, Wheat): ")?;
            let crop_year = p.whole_number("Enter Crop Year (e.g., 2020): ")?;
            let season = p.text("Enter Season (e.g., Kharif, Rabi): ")?;
            let area = p.number("Enter Area in Hectares: ")?;
            let annual_rainfall = p.number("Enter Annual Rainfall (in mm): ")?;
            let fertilizer = p.number("Enter total Fertilizer usage (in tonnes): ")?;
            let pesticide = p.number("Enter total Pesticide usage (in tonnes): ")?;
            Action::Yield(YieldRequest {
                Crop: crop,
                Season: season,
                Area: area,
                Fertilizer: fertilizer,
                Crop_Year: crop_year,
                Pesticide: pesticide,
                Annual_Rainfall: annual_rainfall,
            })
        }
        2 => {
            p.say("\n--- Plant Disease Detection ---")?;
            Action::Disease(PathBuf::from(
                p.text("Enter the full path to the plant image file: ")?,
            ))
        }
        3 => {
            p.say("\n--- Fertilizer Recommendation ---")?;
            Action::Fertilizer(FertilizerRequest {
                Crop: p.text("Enter Crop Name (e.g., Rice, Wheat): ")?,
                Current_N: p.number("Enter current Nitrogen (N) level in soil (kg/hectare): ")?,
                Current_P: p.number("Enter current Phosphorus (P) level in soil (kg/hectare): ")?,
                Current_K: p.number("Enter current Potassium (K) level in soil (kg/hectare): ")?,
            })
        }
        4 => {
            p.say("\n--- Crop Market Price Forecast ---")?;
            let crops = session.market_crops()?;
            p.say("Available crops for forecasting:")?;
            p.say(crops.join(", "))?;
            let crop_name = p.choice("Enter the crop name you want to forecast: ", &crops)?;
            let weeks_to_forecast = p.whole_number_in(
                "Enter the number of weeks to forecast ahead: ",
                0,
                session.settings().max_forecast_weeks,
            )?;
            Action::Market(MarketRequest {
                crop_name,
                weeks_to_forecast,
            })
        }
        5 => {
            p.say("\n--- Soil-based Crop Recommendation ---")?;
            Action::Soil(SoilRequest {
                N: p.number("Enter Nitrogen (N) level in soil: ")?,
                P: p.number("Enter Phosphorus (P) level in soil: ")?,
                K: p.number("Enter Potassium (K) level in soil: ")?,
                temperature: p.number("Enter average temperature (°C): ")?,
                humidity: p.number("Enter average humidity (%): ")?,
                ph: p.number("Enter soil pH value: ")?,
                rainfall: p.number("Enter average rainfall (mm): ")?,
            })
        }
        _ => {
            p.say("\n--- Weather Forecast ---")?;
            let max = session.weather().max_days().unwrap_or(FALLBACK_MAX_DAYS);
            let city = p.text("Enter the city for the weather forecast: ")?;
            let days = p.whole_number_in(
                &format!("Enter number of days to forecast (1-{}): ", max),
                1,
                max,
            )?;
            Action::Weather(WeatherRequest { city, days })
        }
    };
    Ok(action)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn prompter(input: &str) -> Prompter<Cursor<Vec<u8>>, Vec<u8>> {
        Prompter::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    fn transcript(p: Prompter<Cursor<Vec<u8>>, Vec<u8>>) -> String {
        String::from_utf8(p.into_output()).unwrap()
    }

    #[test]
    fn test_number_retries_until_valid() {
        let mut p = prompter("abc\ninf\n42.5\n");
        assert_eq!(p.number("Area: ").unwrap(), 42.5);

        let out = transcript(p);
        assert_eq!(out.matches("Please enter a valid number").count(), 2);
    }

    #[test]
    fn test_whole_number_rejects_fractions() {
        let mut p = prompter("2020.5\n2021\n");
        assert_eq!(p.whole_number("Year: ").unwrap(), 2021);
        assert!(transcript(p).contains("valid whole number"));
    }

    #[test]
    fn test_range_is_enforced() {
        let mut p = prompter("0\n15\n7\n");
        assert_eq!(p.whole_number_in("Days: ", 1, 14).unwrap(), 7);
        assert_eq!(
            transcript(p).matches("between 1 and 14").count(),
            2
        );
    }

    #[test]
    fn test_choice_reprompts_and_keeps_listed_spelling() {
        let crops = vec!["Wheat".to_string(), "Soybean".to_string()];
        let mut p = prompter("Cotton\nsoybean\n");
        assert_eq!(p.choice("Crop: ", &crops).unwrap(), "Soybean");
        assert!(transcript(p).contains("Invalid crop name"));
    }

    #[test]
    fn test_blank_text_is_rejected() {
        let mut p = prompter("\n   \nIndore\n");
        assert_eq!(p.text("City: ").unwrap(), "Indore");
    }

    #[test]
    fn test_end_of_input_stops() {
        let mut p = prompter("");
        let err = p.number("Area: ").unwrap_err();
        assert!(err.is::<InputClosed>());
        assert_eq!(err.to_string(), "Input closed");
    }

    /// Session over an empty model directory and no weather key
    fn session_without_models() -> (tempfile::TempDir, Session) {
        let dir = tempfile::TempDir::new().unwrap();
        let session = Session::new(
            cropix_lib::ServiceSettings {
                model_dir: dir.path().join("models"),
                price_data_path: dir.path().join("prices.csv"),
                ..cropix_lib::ServiceSettings::default()
            },
            &cropix_lib::WeatherSettings::default(),
        )
        .unwrap();
        (dir, session)
    }

    #[tokio::test]
    async fn test_closed_input_ends_session_cleanly() {
        let (_dir, mut session) = session_without_models();
        let mut p = prompter("");
        run(&mut session, OutputFormat::Table, &mut p).await.unwrap();
        assert!(transcript(p).contains("Input closed. Exiting CROPIX."));
    }

    #[tokio::test]
    async fn test_model_options_fail_before_prompting() {
        let (_dir, mut session) = session_without_models();
        let mut p = prompter("1\n7\n");
        run(&mut session, OutputFormat::Table, &mut p).await.unwrap();

        let out = transcript(p);
        assert!(!out.contains("Crop Yield Prediction"));
        assert!(out.contains("Goodbye"));
    }

    #[tokio::test]
    async fn test_weather_option_needs_no_models() {
        let (_dir, mut session) = session_without_models();
        let mut p = prompter("6\nIndore\n3\n7\n");
        run(&mut session, OutputFormat::Table, &mut p).await.unwrap();

        let out = transcript(p);
        assert!(out.contains("--- Weather Forecast ---"));
        assert!(out.contains("Enter number of days to forecast (1-14): "));
        assert!(out.contains("Goodbye"));
    }
}

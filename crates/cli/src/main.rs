//! Cropix CLI
//!
//! Runs the trained models locally. Without a subcommand it starts the
//! interactive menu.

mod commands;
mod config;
mod menu;
mod output;
mod session;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{market, Action};
use cropix_lib::{FertilizerRequest, MarketRequest, SoilRequest, WeatherRequest, YieldRequest};
use session::Session;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Cropix crop intelligence CLI
#[derive(Parser)]
#[command(name = "cropix")]
#[command(author, version, about = "CLI for the Cropix crop prediction models", long_about = None)]
pub struct Cli {
    /// Directory holding the trained model files
    #[arg(long, env = "CROPIX_MODEL_DIR")]
    pub model_dir: Option<PathBuf>,

    /// Weekly crop price CSV used for market forecasts
    #[arg(long, env = "CROPIX_PRICE_DATA")]
    pub price_data: Option<PathBuf>,

    /// Weather provider API key
    #[arg(long, env = "WEATHER_API_KEY", hide_env_values = true)]
    pub weather_api_key: Option<String>,

    /// Weather provider (weatherapi, openweather_onecall, openweather_3hourly)
    #[arg(long, env = "CROPIX_WEATHER_PROVIDER")]
    pub weather_provider: Option<String>,

    /// Output format
    #[arg(long, short)]
    pub format: Option<output::OutputFormat>,

    /// Enable verbose output
    #[arg(long, short)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Interactive numbered menu (default)
    Menu,

    /// Predict crop yield in tonnes per hectare
    Yield {
        #[arg(long)]
        crop: String,
        #[arg(long)]
        season: String,
        /// Planted area in hectares
        #[arg(long)]
        area: f64,
        /// Total fertilizer used, in tonnes
        #[arg(long)]
        fertilizer: f64,
        #[arg(long)]
        crop_year: i32,
        /// Total pesticide used, in tonnes
        #[arg(long)]
        pesticide: f64,
        /// Annual rainfall in mm
        #[arg(long)]
        annual_rainfall: f64,
    },

    /// Recommend a crop from soil and climate readings
    Soil {
        #[arg(long)]
        n: f64,
        #[arg(long)]
        p: f64,
        #[arg(long)]
        k: f64,
        #[arg(long)]
        temperature: f64,
        #[arg(long)]
        humidity: f64,
        #[arg(long)]
        ph: f64,
        #[arg(long)]
        rainfall: f64,
    },

    /// Detect plant disease from a leaf image
    Disease {
        /// Path to the image file
        image: PathBuf,
    },

    /// Recommend N, P, K amounts for a crop
    Fertilizer {
        #[arg(long)]
        crop: String,
        /// Current nitrogen level (kg/hectare)
        #[arg(long)]
        n: f64,
        /// Current phosphorus level (kg/hectare)
        #[arg(long)]
        p: f64,
        /// Current potassium level (kg/hectare)
        #[arg(long)]
        k: f64,
    },

    /// Forecast weekly market prices
    Market {
        /// Crop column of the price table
        #[arg(long)]
        crop: Option<String>,
        #[arg(long, default_value_t = 4)]
        weeks: u32,
        /// List the crops available for forecasting
        #[arg(long, conflicts_with = "crop")]
        list: bool,
    },

    /// Daily weather forecast for a city
    Weather {
        city: String,
        #[arg(long, default_value_t = 3)]
        days: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let file_config = config::Config::load()?;
    let overrides = config::Overrides {
        model_dir: cli.model_dir.clone(),
        price_data: cli.price_data.clone(),
        weather_api_key: cli.weather_api_key.clone(),
        weather_provider: cli.weather_provider.clone(),
        format: cli.format,
    };
    let format = file_config.format(&overrides);

    let mut session = Session::new(
        file_config.service_settings(&overrides),
        &file_config.weather_settings(&overrides)?,
    )?;

    let result = match cli.command.unwrap_or(Commands::Menu) {
        Commands::Menu => {
            let stdin = std::io::stdin();
            let mut prompter = menu::Prompter::new(stdin.lock(), std::io::stdout());
            menu::run(&mut session, format, &mut prompter).await
        }
        command => match into_action(command) {
            Some(action) => commands::run(&mut session, action, format).await,
            None => market::list_crops(&session, format),
        },
    };

    if let Err(e) = result {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}

/// The prediction a subcommand asks for; `None` when it only lists crops
fn into_action(command: Commands) -> Option<Action> {
    let action = match command {
        Commands::Menu | Commands::Market { list: true, .. } | Commands::Market { crop: None, .. } => {
            return None
        }
        Commands::Yield {
            crop,
            season,
            area,
            fertilizer,
            crop_year,
            pesticide,
            annual_rainfall,
        } => Action::Yield(YieldRequest {
            Crop: crop,
            Season: season,
            Area: area,
            Fertilizer: fertilizer,
            Crop_Year: crop_year,
            Pesticide: pesticide,
            Annual_Rainfall: annual_rainfall,
        }),
        Commands::Soil {
            n,
            p,
            k,
            temperature,
            humidity,
            ph,
            rainfall,
        } => Action::Soil(SoilRequest {
            N: n,
            P: p,
            K: k,
            temperature,
            humidity,
            ph,
            rainfall,
        }),
        Commands::Disease { image } => Action::Disease(image),
        Commands::Fertilizer { crop, n, p, k } => Action::Fertilizer(FertilizerRequest {
            Crop: crop,
            Current_N: n,
            Current_P: p,
            Current_K: k,
        }),
        Commands::Market {
            crop: Some(crop_name),
            weeks,
            ..
        } => Action::Market(MarketRequest {
            crop_name,
            weeks_to_forecast: weeks,
        }),
        Commands::Weather { city, days } => Action::Weather(WeatherRequest { city, days }),
    };
    Some(action)
}

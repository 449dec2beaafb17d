//! HTTP API: prediction routes plus health checks and Prometheus metrics

use axum::{
    extract::State,
    http::{HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use cropix_lib::{
    health::{ComponentStatus, HealthRegistry},
    CropixError, DiseaseRequest, FertilizerRequest, MarketRequest, ServiceContext, SoilRequest,
    WeatherRequest, YieldRequest,
};
use prometheus::{Encoder, TextEncoder};
use serde::Serialize;
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub context: ServiceContext,
    pub health_registry: HealthRegistry,
}

impl AppState {
    pub fn new(context: ServiceContext, health_registry: HealthRegistry) -> Self {
        Self {
            context,
            health_registry,
        }
    }
}

/// Error half of a prediction response
///
/// Client-side problems are reported in a 200 `{error}` body, which is what
/// the web client checks for. Faults become 500s. Disease failures also
/// carry their `kind`.
pub struct ApiError(pub CropixError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if self.0.is_reportable() {
            StatusCode::OK
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };

        let body = match &self.0 {
            CropixError::Disease(e) => json!({ "error": e.message, "kind": e.kind.as_str() }),
            other => json!({ "error": other.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

async fn respond<T, F>(work: F) -> Result<Json<T>, ApiError>
where
    T: Serialize,
    F: Future<Output = Result<T, CropixError>>,
{
    work.await.map(Json).map_err(ApiError)
}

async fn root() -> impl IntoResponse {
    Json(json!({ "message": "Welcome to the CROPIX API!" }))
}

async fn predict_crop_yield(
    State(state): State<Arc<AppState>>,
    Json(request): Json<YieldRequest>,
) -> impl IntoResponse {
    respond(state.context.predict_crop_yield(request)).await
}

async fn recommend_soil_crop(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SoilRequest>,
) -> impl IntoResponse {
    respond(state.context.recommend_soil_crop(request)).await
}

async fn detect_disease(
    State(state): State<Arc<AppState>>,
    Json(request): Json<DiseaseRequest>,
) -> impl IntoResponse {
    respond(state.context.detect_disease(request)).await
}

async fn weather_forecast(
    State(state): State<Arc<AppState>>,
    Json(request): Json<WeatherRequest>,
) -> impl IntoResponse {
    respond(state.context.weather_forecast(request)).await
}

async fn recommend_fertilizer(
    State(state): State<Arc<AppState>>,
    Json(request): Json<FertilizerRequest>,
) -> impl IntoResponse {
    respond(state.context.recommend_fertilizer(request)).await
}

async fn forecast_market_prices(
    State(state): State<Arc<AppState>>,
    Json(request): Json<MarketRequest>,
) -> impl IntoResponse {
    respond(state.context.forecast_market_prices(request)).await
}

/// Health check response - 200 while operational, 503 when a component is unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state
        .health_registry
        .check_price_data(&state.context.settings().price_data_path)
        .await;
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy | ComponentStatus::Degraded => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - 200 once startup finished, 503 before
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

fn cors_layer(origins: &[String]) -> anyhow::Result<CorsLayer> {
    let origins = origins
        .iter()
        .map(|o| HeaderValue::from_str(o).map_err(|e| anyhow::anyhow!("Invalid CORS origin '{}': {}", o, e)))
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any))
}

/// Create the API router
///
/// Prediction routes answer both with and without the trailing slash.
pub fn create_router(state: Arc<AppState>, cors_origins: &[String]) -> anyhow::Result<Router> {
    let mut router = Router::new()
        .route("/", get(root))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics));

    let predictions: [(&str, axum::routing::MethodRouter<Arc<AppState>>); 7] = [
        ("/predict_crop_yield", post(predict_crop_yield)),
        ("/recommend_soil_crop", post(recommend_soil_crop)),
        ("/detect_disease", post(detect_disease)),
        ("/weather_forecast_lstm", post(weather_forecast)),
        ("/weather_forecast", post(weather_forecast)),
        ("/recommend_fertilizer", post(recommend_fertilizer)),
        ("/forecast_market_prices", post(forecast_market_prices)),
    ];
    for (path, handler) in predictions {
        router = router
            .route(path, handler.clone())
            .route(&format!("{}/", path), handler);
    }

    Ok(router
        .layer(cors_layer(cors_origins)?)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

/// Start the API server and run until `shutdown` resolves
pub async fn serve(
    port: u16,
    app: Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}

//! REST API endpoints for the nimbus-service.
//!
//! # Concurrency
//!
//! Handlers lock `state.app` for the duration of one operation. A weather
//! refresh holds the lock while the provider is called, so concurrent
//! requests queue behind it. The cache worker is not behind the app lock;
//! `/sw/*` requests run concurrently with each other and with app requests.
//!
//! ## Error Handling
//!
//! All endpoints return structured JSON errors via [`AppError`]:
//! `{"error": "message"}` with a 4xx status for client errors and 500 for
//! storage failures.

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Body,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::warn;

use nimbus_core::{HistorySummary, WeatherOutcome, app::NO_LOCATION_MESSAGE};
use nimbus_types::{HistoryEntry, Location, Period, Photo};
use nimbus_worker::{CacheWorker, FetchRequest, RequestMode, WorkerMessage, WorkerStatus};

use crate::state::AppState;

/// Header naming the cache strategy that answered a `/sw/fetch` request.
pub const STRATEGY_HEADER: &str = "x-cache-strategy";

/// Create the API router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/health", get(health))
        // Weather
        .route("/api/weather", get(get_weather))
        .route("/api/weather/refresh", post(refresh_weather))
        .route("/api/location", put(update_location))
        .route("/api/visibility", put(update_visibility))
        // History
        .route("/api/history", get(get_history))
        .route("/api/history/summary", get(get_history_summary))
        // Gallery
        .route("/api/photos", get(list_photos).post(add_photo))
        .route("/api/photos/{id}", delete(delete_photo))
        // Offline cache worker
        .route("/sw/fetch", get(sw_fetch))
        .route("/sw/message", post(sw_message))
        .route("/sw/status", get(sw_status))
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

/// Health check endpoint.
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: OffsetDateTime::now_utc(),
    })
}

/// What the weather view shows.
#[derive(Debug, Serialize)]
pub struct WeatherResponse {
    pub provider: String,
    pub location: Option<Location>,
    pub weather: Option<WeatherOutcome>,
    pub description: Option<String>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_updated: Option<OffsetDateTime>,
    pub status: Option<String>,
    pub online: bool,
}

async fn get_weather(State(state): State<Arc<AppState>>) -> Json<WeatherResponse> {
    let app = state.app.lock().await;
    let view = app.state();
    Json(WeatherResponse {
        provider: app.provider_name().to_string(),
        location: view.location,
        weather: view.weather.clone(),
        description: view.weather.as_ref().map(WeatherOutcome::description),
        last_updated: view.weather.as_ref().and_then(WeatherOutcome::last_updated),
        status: view.status.clone(),
        online: view.online,
    })
}

/// Fetch weather for the current location now.
///
/// # Errors
///
/// Returns 400 when no location is known yet.
async fn refresh_weather(
    State(state): State<Arc<AppState>>,
) -> Result<Json<WeatherOutcome>, AppError> {
    let mut app = state.app.lock().await;
    app.on_refresh()
        .await
        .map(Json)
        .ok_or_else(|| AppError::BadRequest(NO_LOCATION_MESSAGE.to_string()))
}

/// Request body for a location update.
#[derive(Debug, Deserialize)]
pub struct LocationRequest {
    pub latitude: f64,
    pub longitude: f64,
}

/// Result of a location update.
#[derive(Debug, Serialize)]
pub struct LocationResponse {
    /// Whether the position moved past the change threshold.
    pub changed: bool,
    pub location: Option<Location>,
    /// Weather fetched for the new position.
    pub weather: Option<WeatherOutcome>,
}

async fn update_location(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LocationRequest>,
) -> Result<Json<LocationResponse>, AppError> {
    let location = Location::new(request.latitude, request.longitude)
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let mut app = state.app.lock().await;
    let weather = app.set_location(location).await;
    Ok(Json(LocationResponse {
        changed: weather.is_some(),
        location: app.state().location,
        weather,
    }))
}

/// Request body for a visibility change.
#[derive(Debug, Deserialize, Serialize)]
pub struct VisibilityRequest {
    pub visible: bool,
}

async fn update_visibility(
    State(state): State<Arc<AppState>>,
    Json(request): Json<VisibilityRequest>,
) -> Json<VisibilityRequest> {
    state.app.lock().await.set_visible(request.visible);
    Json(request)
}

/// Query parameters for history endpoints.
#[derive(Debug, Deserialize, Default)]
pub struct HistoryQuery {
    /// `day`, `week` or `month` (default `day`).
    pub period: Option<String>,
}

impl HistoryQuery {
    /// The requested period.
    pub fn period(&self) -> Result<Period, AppError> {
        match &self.period {
            None => Ok(Period::default()),
            Some(raw) => raw
                .parse()
                .map_err(|e: nimbus_types::ParseError| AppError::BadRequest(e.to_string())),
        }
    }
}

/// History entries for a period.
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub period: Period,
    pub count: usize,
    pub entries: Vec<HistoryEntry>,
}

async fn get_history(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, AppError> {
    let period = query.period()?;
    let entries = state.app.lock().await.history(period).await;
    Ok(Json(HistoryResponse {
        period,
        count: entries.len(),
        entries,
    }))
}

async fn get_history_summary(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistorySummary>, AppError> {
    let period = query.period()?;
    Ok(Json(state.app.lock().await.history_summary(period).await))
}

async fn list_photos(State(state): State<Arc<AppState>>) -> Json<Vec<Photo>> {
    Json(state.app.lock().await.photos().await)
}

/// Request body for a new photo.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoRequest {
    /// Image data URL (`data:image/jpeg;base64,...`).
    pub image_data: String,
}

async fn add_photo(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PhotoRequest>,
) -> Result<impl IntoResponse, AppError> {
    let photo = state.app.lock().await.add_photo(request.image_data).await?;
    Ok((StatusCode::CREATED, Json(photo)))
}

async fn delete_photo(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Photo>, AppError> {
    Ok(Json(state.app.lock().await.delete_photo(&id).await?))
}

fn worker(state: &AppState) -> Result<&CacheWorker, AppError> {
    state
        .worker
        .as_ref()
        .ok_or_else(|| AppError::NotFound("Cache worker is disabled".to_string()))
}

/// Query parameters for `/sw/fetch`.
#[derive(Debug, Deserialize)]
pub struct FetchQuery {
    pub url: String,
    #[serde(default)]
    pub mode: RequestMode,
}

/// Route a request through the cache worker.
///
/// The response carries the status, content type and body the worker
/// produced, plus an [`STRATEGY_HEADER`] naming the strategy used.
async fn sw_fetch(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FetchQuery>,
) -> Result<Response, AppError> {
    let worker = worker(&state)?;
    let outcome = worker
        .handle_fetch(FetchRequest {
            url: query.url,
            mode: query.mode,
        })
        .await
        .map_err(|e| AppError::BadGateway(e.to_string()))?;

    let status = StatusCode::from_u16(outcome.response.status)
        .map_err(|e| AppError::Internal(e.to_string()))?;
    let mut builder = Response::builder()
        .status(status)
        .header(STRATEGY_HEADER, outcome.strategy.to_string());
    if let Some(content_type) = &outcome.response.content_type {
        builder = builder.header(header::CONTENT_TYPE, content_type.as_str());
    }
    builder
        .body(Body::from(outcome.response.body))
        .map_err(|e| AppError::Internal(e.to_string()))
}

/// Result of posting a worker message.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    /// Number of clients the message was rebroadcast to.
    pub delivered: usize,
}

/// Post a message to the cache worker.
///
/// `OFFLINE_STATUS` also updates the app's connectivity flag.
async fn sw_message(
    State(state): State<Arc<AppState>>,
    Json(message): Json<serde_json::Value>,
) -> Result<Json<MessageResponse>, AppError> {
    let worker = worker(&state)?;
    if let Some(WorkerMessage::OfflineStatus(offline)) = WorkerMessage::parse(&message) {
        state.app.lock().await.set_online(!offline);
    }
    Ok(Json(MessageResponse {
        delivered: worker.handle_message(&message),
    }))
}

async fn sw_status(State(state): State<Arc<AppState>>) -> Result<Json<WorkerStatus>, AppError> {
    Ok(Json(worker(&state)?.status().await))
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    BadRequest(String),
    Forbidden(String),
    Conflict(String),
    BadGateway(String),
    Internal(String),
}

impl From<nimbus_core::Error> for AppError {
    fn from(e: nimbus_core::Error) -> Self {
        use nimbus_core::Error;

        let message = e.to_string();
        match e {
            Error::PhotoNotFound(_) => AppError::NotFound(message),
            Error::InvalidImage(_) | Error::Parse(_) | Error::NoLocation => {
                AppError::BadRequest(message)
            }
            Error::PermissionDenied(_) => AppError::Forbidden(message),
            Error::CameraBusy(_) | Error::NoActiveStream => AppError::Conflict(message),
            _ => {
                warn!("Request failed: {}", message);
                AppError::Internal(message)
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = serde_json::json!({
            "error": message,
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex as StdMutex;

    use super::*;
    use async_trait::async_trait;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tokio::sync::Mutex;
    use tower::ServiceExt;

    use nimbus_core::{
        App, AppComponents, FixedGeolocator, LogNotifier, Simulator, StaticPermissions,
        TestPatternCamera,
    };
    use nimbus_store::Store;
    use nimbus_worker::{FetchResponse, Network, WorkerConfig};

    use crate::config::Config;

    const ORIGIN: &str = "https://nimbus.test/";

    /// Serves the app shell; everything else is unreachable.
    #[derive(Default)]
    struct ShellNetwork {
        routes: StdMutex<HashMap<String, FetchResponse>>,
    }

    #[async_trait]
    impl Network for ShellNetwork {
        async fn fetch(&self, request: &FetchRequest) -> nimbus_worker::Result<FetchResponse> {
            self.routes
                .lock()
                .unwrap()
                .get(&request.url)
                .cloned()
                .ok_or_else(|| nimbus_worker::Error::network("unreachable"))
        }
    }

    fn shell_network() -> Arc<ShellNetwork> {
        let network = ShellNetwork::default();
        for url in nimbus_worker::resolve_manifest(ORIGIN, &nimbus_worker::DEFAULT_MANIFEST)
            .unwrap()
        {
            network.routes.lock().unwrap().insert(
                url.clone(),
                FetchResponse::new(200, Some("text/html"), url.into_bytes()),
            );
        }
        Arc::new(network)
    }

    fn create_test_state() -> Arc<AppState> {
        let components = AppComponents {
            store: Arc::new(Mutex::new(Store::open_in_memory().unwrap())),
            provider: Arc::new(Simulator::seeded(42)),
            permissions: Arc::new(StaticPermissions::granted()),
            geolocator: Arc::new(FixedGeolocator::unavailable()),
            camera: Arc::new(TestPatternCamera::new(16, 16)),
            notifier: Arc::new(LogNotifier),
        };
        let app = App::new(components, Default::default());
        let worker = CacheWorker::new(
            WorkerConfig {
                origin: ORIGIN.to_string(),
                skip_waiting: true,
                ..WorkerConfig::default()
            },
            shell_network(),
        );
        AppState::new(app, Some(worker), Config::default())
    }

    async fn response_body(response: Response) -> String {
        let body = response.into_body();
        let bytes = body.collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn response_json(response: Response) -> serde_json::Value {
        serde_json::from_str(&response_body(response).await).unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = router().with_state(create_test_state());
        let response = app.oneshot(get("/api/health")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert_eq!(json["status"], "ok");
        assert!(json["version"].is_string());
        assert!(json["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_weather_before_location() {
        let state = create_test_state();
        let response = router()
            .with_state(Arc::clone(&state))
            .oneshot(get("/api/weather"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert_eq!(json["provider"], "simulator");
        assert!(json["location"].is_null());
        assert!(json["weather"].is_null());

        let response = router()
            .with_state(state)
            .oneshot(json_request("POST", "/api/weather/refresh", serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = response_json(response).await;
        assert_eq!(json["error"], "Please enable location first");
    }

    #[tokio::test]
    async fn test_location_update_fetches_weather() {
        let state = create_test_state();
        let response = router()
            .with_state(Arc::clone(&state))
            .oneshot(json_request(
                "PUT",
                "/api/location",
                serde_json::json!({"latitude": 59.33, "longitude": 18.06}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert_eq!(json["changed"], true);
        assert_eq!(json["weather"]["status"], "fresh");

        // Jitter below the threshold does not refetch.
        let response = router()
            .with_state(Arc::clone(&state))
            .oneshot(json_request(
                "PUT",
                "/api/location",
                serde_json::json!({"latitude": 59.3305, "longitude": 18.06}),
            ))
            .await
            .unwrap();
        let json = response_json(response).await;
        assert_eq!(json["changed"], false);
        assert!(json["weather"].is_null());

        let response = router()
            .with_state(state)
            .oneshot(get("/api/weather"))
            .await
            .unwrap();
        let json = response_json(response).await;
        assert_eq!(json["weather"]["status"], "fresh");
        assert!(json["description"].as_str().unwrap().contains("°C"));
        assert!(json["last_updated"].is_string());
    }

    #[tokio::test]
    async fn test_invalid_location() {
        let response = router()
            .with_state(create_test_state())
            .oneshot(json_request(
                "PUT",
                "/api/location",
                serde_json::json!({"latitude": 91.0, "longitude": 0.0}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_history_records_first_fetch() {
        let state = create_test_state();
        state
            .app
            .lock()
            .await
            .set_location(Location::new(1.0, 2.0).unwrap())
            .await;

        let response = router()
            .with_state(Arc::clone(&state))
            .oneshot(get("/api/history?period=week"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert_eq!(json["period"], "week");
        assert_eq!(json["count"], 1);

        let response = router()
            .with_state(state)
            .oneshot(get("/api/history/summary"))
            .await
            .unwrap();
        let json = response_json(response).await;
        assert_eq!(json["count"], 1);
        assert!(json["dominant"].is_string());
    }

    #[tokio::test]
    async fn test_history_unknown_period() {
        let response = router()
            .with_state(create_test_state())
            .oneshot(get("/api/history?period=year"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_photo_lifecycle() {
        let state = create_test_state();

        let response = router()
            .with_state(Arc::clone(&state))
            .oneshot(json_request(
                "POST",
                "/api/photos",
                serde_json::json!({"imageData": "data:image/jpeg;base64,/9j/4AAQ"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let photo = response_json(response).await;
        let id = photo["id"].as_str().unwrap().to_string();
        assert_eq!(photo["imageData"], "data:image/jpeg;base64,/9j/4AAQ");

        let response = router()
            .with_state(Arc::clone(&state))
            .oneshot(get("/api/photos"))
            .await
            .unwrap();
        assert_eq!(response_json(response).await.as_array().unwrap().len(), 1);

        let response = router()
            .with_state(Arc::clone(&state))
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri(format!("/api/photos/{id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = router()
            .with_state(state)
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri(format!("/api/photos/{id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json = response_json(response).await;
        assert!(json["error"].as_str().unwrap().contains("Photo not found"));
    }

    #[tokio::test]
    async fn test_add_photo_rejects_non_image() {
        let response = router()
            .with_state(create_test_state())
            .oneshot(json_request(
                "POST",
                "/api/photos",
                serde_json::json!({"imageData": "hello"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_visibility() {
        let state = create_test_state();
        let response = router()
            .with_state(Arc::clone(&state))
            .oneshot(json_request(
                "PUT",
                "/api/visibility",
                serde_json::json!({"visible": false}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(!state.app.lock().await.state().visible);
    }

    #[tokio::test]
    async fn test_sw_fetch_passthrough_then_cached() {
        let state = create_test_state();

        let response = router()
            .with_state(Arc::clone(&state))
            .oneshot(get("/sw/fetch?url=./index.html"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[STRATEGY_HEADER], "passthrough");

        state.worker.as_ref().unwrap().start().await.unwrap();

        let response = router()
            .with_state(Arc::clone(&state))
            .oneshot(get("/sw/fetch?url=./about&mode=navigate"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[STRATEGY_HEADER], "cache-first");
        assert_eq!(response.headers()["content-type"], "text/html");
        assert_eq!(
            response_body(response).await,
            "https://nimbus.test/index.html"
        );

        let response = router()
            .with_state(state)
            .oneshot(get(
                "/sw/fetch?url=https%3A%2F%2Fapi.tomorrow.io%2Fv4%2Fweather%2Frealtime",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.headers()[STRATEGY_HEADER], "network-first");
        let json = response_json(response).await;
        assert_eq!(json["error"], "NetworkError");
    }

    #[tokio::test]
    async fn test_sw_fetch_unreachable_before_active() {
        let response = router()
            .with_state(create_test_state())
            .oneshot(get("/sw/fetch?url=./missing.js"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_sw_status() {
        let state = create_test_state();
        state.worker.as_ref().unwrap().start().await.unwrap();

        let response = router()
            .with_state(state)
            .oneshot(get("/sw/status"))
            .await
            .unwrap();
        let json = response_json(response).await;
        assert_eq!(json["state"], "active");
        assert_eq!(json["caches"][0]["name"], "weather-app-v1");
        assert_eq!(json["caches"][0]["entries"], 7);
    }

    #[tokio::test]
    async fn test_sw_message_rebroadcasts_offline_status() {
        let state = create_test_state();
        let mut client = state.worker.as_ref().unwrap().subscribe();

        let response = router()
            .with_state(Arc::clone(&state))
            .oneshot(json_request(
                "POST",
                "/sw/message",
                serde_json::json!({"type": "OFFLINE_STATUS", "payload": true}),
            ))
            .await
            .unwrap();
        assert_eq!(response_json(response).await["delivered"], 1);
        assert_eq!(
            client.recv().await.unwrap(),
            WorkerMessage::OfflineStatus(true)
        );
        assert!(!state.app.lock().await.state().online);

        let response = router()
            .with_state(state)
            .oneshot(json_request(
                "POST",
                "/sw/message",
                serde_json::json!({"type": "CLEAR_CACHE"}),
            ))
            .await
            .unwrap();
        assert_eq!(response_json(response).await["delivered"], 0);
    }

    #[tokio::test]
    async fn test_sw_disabled() {
        let state = AppState::from_config(
            Config {
                worker: crate::config::WorkerSettings {
                    enabled: false,
                    ..Default::default()
                },
                ..Default::default()
            },
            Store::open_in_memory().unwrap(),
        )
        .unwrap();
        let response = router()
            .with_state(state)
            .oneshot(get("/sw/status"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_invalid_json_body() {
        let response = router()
            .with_state(create_test_state())
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri("/api/location")
                    .header("content-type", "application/json")
                    .body(Body::from("not json"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(response.status().is_client_error());
    }
}

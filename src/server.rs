//! HTTP API.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/docs/sync` | Idempotent upsert of one documentation record |
//! | `GET`  | `/docs/{id}` | Read back a stored document and its platforms |
//! | `GET`  | `/oauth/config` | Public OAuth client configuration |
//! | `POST` | `/contact` | Contact-form intake |
//! | `POST` | `/band-name` | Delegates to the `band_name` capability |
//! | `POST` | `/rapper-name` | Delegates to the `rapper_name` capability |
//! | `POST` | `/chat` | Delegates to the `chat` capability |
//! | `GET`  | `/stream-status` | Delegates to the `stream_status` capability |
//! | `POST` | `/newsletter/sync` | Delegates to the `newsletter_sync` capability |
//! | `GET`  | `/capabilities` | Names of the registered capabilities |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! The caller's site is read from the `X-Site-Id` header, falling back to
//! `server.default_site`.
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "invalid_site", "message": "...", "retryable": false } }
//! ```
//!
//! Error codes: `invalid_site` (400), `bad_request` (400), `not_found` (404),
//! `persistence_error` (409/500), `missing_post_type` (500),
//! `render_error` (500), `term_creation_failed` (500), `partial_write` (500,
//! body also carries `id`), `capability_unavailable` (501),
//! `capability_error` (502).

use axum::{
    extract::{rejection::JsonRejection, FromRequest, Path, Request, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

use crate::app::Gateway;
use crate::capabilities::{names, CapabilityRegistry};
use crate::config::Config;
use crate::error::SyncError;
use crate::models::{ContactReceipt, ContactSubmission, DocumentRecord, DocumentView, SyncOutcome};
use crate::oauth::{public_config, PublicOAuthConfig};
use crate::store::DocumentRepository;
use crate::tenant::SiteContext;

/// Header naming the caller's site.
pub const SITE_HEADER: &str = "x-site-id";

/// Starts the gateway with only the capabilities declared in the config.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    run_server_with_capabilities(config, CapabilityRegistry::new()).await
}

/// Starts the gateway with additional in-process capabilities.
///
/// Binds to `[server].bind` and serves until the process is terminated.
///
/// # Example
///
/// ```rust,no_run
/// use content_gateway::capabilities::CapabilityRegistry;
/// use content_gateway::server::run_server_with_capabilities;
///
/// # async fn example(config: &content_gateway::config::Config) -> anyhow::Result<()> {
/// let mut capabilities = CapabilityRegistry::new();
/// // capabilities.register(Arc::new(MyBandNameGenerator::new()));
/// run_server_with_capabilities(config, capabilities).await?;
/// # Ok(())
/// # }
/// ```
pub async fn run_server_with_capabilities(
    config: &Config,
    capabilities: CapabilityRegistry,
) -> anyhow::Result<()> {
    let gateway = Gateway::connect(config, capabilities).await?;
    serve(gateway).await
}

/// Serves an already wired gateway on `[server].bind`.
pub async fn serve(gateway: Gateway) -> anyhow::Result<()> {
    if gateway.capabilities.is_empty() {
        info!("no capabilities registered; pass-through routes will answer 501");
    }
    for name in gateway.capabilities.names() {
        info!(capability = %name, "capability registered");
    }
    if gateway.is_ephemeral() {
        warn!("serving from an in-memory store; nothing will be persisted");
    }

    let bind = gateway.config.server.bind.clone();
    let app = router(gateway);

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    info!(bind = %bind, "gateway listening");
    axum::serve(listener, app).await?;

    Ok(())
}

/// Registers every route against the wired gateway.
pub fn router(gateway: Gateway) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/docs/sync", post(handle_docs_sync))
        .route("/docs/{id}", get(handle_docs_get))
        .route("/oauth/config", get(handle_oauth_config))
        .route("/contact", post(handle_contact))
        .route("/band-name", post(handle_band_name))
        .route("/rapper-name", post(handle_rapper_name))
        .route("/chat", post(handle_chat))
        .route("/stream-status", get(handle_stream_status))
        .route("/newsletter/sync", post(handle_newsletter_sync))
        .route("/capabilities", get(handle_list_capabilities))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(gateway)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
    retryable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<i64>,
}

/// Converts a [`SyncError`] into the JSON error contract.
struct AppError(SyncError);

impl From<SyncError> for AppError {
    fn from(err: SyncError) -> Self {
        AppError(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.0.status();
        let code = self.0.code();
        if status.is_server_error() {
            error!(code, error = %self.0, "request failed");
        } else {
            warn!(code, error = %self.0, "request rejected");
        }

        let id = match &self.0 {
            SyncError::PartialWrite { id, .. } => Some(*id),
            _ => None,
        };
        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.0.to_string(),
                retryable: self.0.is_retryable(),
                id,
            },
        };
        (status, Json(body)).into_response()
    }
}

fn site_context(config: &Config, headers: &HeaderMap) -> SiteContext {
    match headers.get(SITE_HEADER) {
        None => SiteContext::resolve(config, None),
        Some(value) => match value.to_str().ok().and_then(|v| v.trim().parse::<i64>().ok()) {
            Some(id) => SiteContext::resolve(config, Some(id)),
            None => SiteContext::unknown(),
        },
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError(SyncError::Validation(format!(
            "invalid request body: {}",
            rejection.body_text()
        )))
    }
}

/// `Json` extractor whose rejections use the error envelope.
///
/// Covers a missing content type, malformed JSON and bodies that do not
/// match `T`, all as `bad_request`.
struct JsonBody<T>(T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(JsonBody(value))
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ Documentation sync ============

/// Handler for `POST /docs/sync`.
///
/// Returns `{ success, action, id }` where `action` is `created`, `updated`
/// or `skipped`.
async fn handle_docs_sync(
    State(gateway): State<Gateway>,
    headers: HeaderMap,
    JsonBody(record): JsonBody<DocumentRecord>,
) -> Result<Json<SyncOutcome>, AppError> {
    let ctx = site_context(&gateway.config, &headers);
    let outcome = gateway.controller.sync(&ctx, record).await?;
    Ok(Json(outcome))
}

/// Handler for `GET /docs/{id}`.
async fn handle_docs_get(
    State(gateway): State<Gateway>,
    Path(id): Path<i64>,
) -> Result<Json<DocumentView>, AppError> {
    let documents = gateway.controller.documents();
    let document = documents
        .get(id)
        .await
        .map_err(SyncError::from)?
        .ok_or_else(|| SyncError::NotFound(format!("no document with id {}", id)))?;
    let platforms = documents.terms_of(id).await.map_err(SyncError::from)?;
    Ok(Json(DocumentView {
        document,
        platforms,
    }))
}

// ============ OAuth ============

async fn handle_oauth_config(
    State(gateway): State<Gateway>,
) -> Result<Json<PublicOAuthConfig>, AppError> {
    Ok(Json(public_config(gateway.config.oauth.as_ref())?))
}

// ============ Contact ============

async fn handle_contact(
    State(gateway): State<Gateway>,
    JsonBody(submission): JsonBody<ContactSubmission>,
) -> Result<(StatusCode, Json<ContactReceipt>), AppError> {
    let receipt = gateway.contact.submit(submission).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

// ============ Capability pass-through ============

#[derive(Serialize)]
struct CapabilityListResponse {
    capabilities: Vec<String>,
}

async fn handle_list_capabilities(State(gateway): State<Gateway>) -> Json<CapabilityListResponse> {
    Json(CapabilityListResponse {
        capabilities: gateway.capabilities.names(),
    })
}

/// Resolves `name` and wraps its answer as `{ "result": ... }`.
async fn dispatch(gateway: &Gateway, name: &str, params: Value) -> Result<Json<Value>, AppError> {
    let result = gateway.capabilities.invoke(name, params).await?;
    Ok(Json(serde_json::json!({ "result": result })))
}

async fn handle_band_name(
    State(gateway): State<Gateway>,
    JsonBody(params): JsonBody<Value>,
) -> Result<Json<Value>, AppError> {
    dispatch(&gateway, names::BAND_NAME, params).await
}

async fn handle_rapper_name(
    State(gateway): State<Gateway>,
    JsonBody(params): JsonBody<Value>,
) -> Result<Json<Value>, AppError> {
    dispatch(&gateway, names::RAPPER_NAME, params).await
}

async fn handle_chat(
    State(gateway): State<Gateway>,
    JsonBody(params): JsonBody<Value>,
) -> Result<Json<Value>, AppError> {
    dispatch(&gateway, names::CHAT, params).await
}

async fn handle_stream_status(State(gateway): State<Gateway>) -> Result<Json<Value>, AppError> {
    dispatch(&gateway, names::STREAM_STATUS, Value::Object(Default::default())).await
}

async fn handle_newsletter_sync(
    State(gateway): State<Gateway>,
    JsonBody(params): JsonBody<Value>,
) -> Result<Json<Value>, AppError> {
    dispatch(&gateway, names::NEWSLETTER_SYNC, params).await
}

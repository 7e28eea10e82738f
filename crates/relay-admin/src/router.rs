use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use relay_core::AppState;
use relay_storage::{NewComposite, NewModel, NewProvider, SettingValue, Storage, StorageError, setting_keys};
use serde::Deserialize;
use serde_json::json;

use crate::jwt::{JwtSettings, extract_session_cookie};

#[derive(Clone)]
pub struct AdminState {
    pub app: Arc<AppState>,
    pub storage: Arc<dyn Storage>,
    pub jwt: Arc<JwtSettings>,
}

pub fn router(app: Arc<AppState>, storage: Arc<dyn Storage>, jwt: JwtSettings) -> Router {
    let state = AdminState {
        app,
        storage,
        jwt: Arc::new(jwt),
    };

    let protected = Router::new()
        .route("/providers", get(list_providers).post(create_provider))
        .route(
            "/providers/{id}",
            put(update_provider).delete(delete_provider),
        )
        .route("/models", get(list_models).post(create_model))
        .route("/models/{id}", put(update_model).delete(delete_model))
        .route("/composites", get(list_composites).post(create_composite))
        .route(
            "/composites/{id}",
            put(update_composite).delete(delete_composite),
        )
        .route("/settings", get(list_settings))
        .route("/settings/{key}", put(set_setting))
        .route_layer(middleware::from_fn_with_state(state.clone(), admin_auth));

    Router::new()
        .route("/login", post(login))
        .merge(protected)
        .with_state(state)
}

async fn admin_auth(
    State(state): State<AdminState>,
    headers: HeaderMap,
    req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let cookie = headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok());
    let token = extract_session_cookie(cookie).ok_or(StatusCode::UNAUTHORIZED)?;
    if state.jwt.verify(&token) {
        Ok(next.run(req).await)
    } else {
        Err(StatusCode::UNAUTHORIZED)
    }
}

#[derive(Deserialize)]
struct LoginRequest {
    api_key: String,
}

async fn login(State(state): State<AdminState>, Json(body): Json<LoginRequest>) -> Response {
    let configured = state
        .storage
        .get_setting(setting_keys::API_KEY)
        .await
        .ok()
        .flatten()
        .and_then(|v| v.as_str().map(str::to_string));

    match configured {
        Some(expected) if expected == body.api_key => match state.jwt.issue() {
            Ok(token) => (
                StatusCode::OK,
                [(header::SET_COOKIE, state.jwt.cookie_header(&token))],
                Json(json!({ "ok": true })),
            )
                .into_response(),
            Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": "failed to issue session"}))).into_response(),
        },
        _ => (StatusCode::UNAUTHORIZED, Json(json!({"error": "invalid api_key"}))).into_response(),
    }
}

fn storage_error_response(err: StorageError) -> Response {
    let status = match &err {
        StorageError::NameTaken(_) | StorageError::ProviderInUse(_, _) | StorageError::ModelInUse(_) => {
            StatusCode::CONFLICT
        }
        StorageError::NotFound(_) => StatusCode::NOT_FOUND,
        StorageError::InvalidSetting(_, _) => StatusCode::BAD_REQUEST,
        StorageError::Db(_) | StorageError::Serde(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({ "error": err.to_string() }))).into_response()
}

async fn list_providers(State(state): State<AdminState>) -> Response {
    match state.storage.list_providers().await {
        Ok(providers) => Json(providers).into_response(),
        Err(err) => storage_error_response(err),
    }
}

#[derive(Deserialize)]
struct ProviderRequest {
    name: String,
    api_key: String,
    base_url: String,
    request_path: String,
    format: String,
    #[serde(default)]
    proxy_enabled: bool,
    #[serde(default = "default_true")]
    valid: bool,
}

fn default_true() -> bool {
    true
}

impl ProviderRequest {
    fn into_new(self) -> Result<NewProvider, Response> {
        let format = self
            .format
            .parse()
            .map_err(|e: String| (StatusCode::BAD_REQUEST, Json(json!({ "error": e }))).into_response())?;
        Ok(NewProvider {
            name: self.name,
            api_key: self.api_key,
            base_url: self.base_url,
            request_path: self.request_path,
            format,
            proxy_enabled: self.proxy_enabled,
            valid: self.valid,
        })
    }
}

async fn create_provider(State(state): State<AdminState>, Json(body): Json<ProviderRequest>) -> Response {
    let input = match body.into_new() {
        Ok(input) => input,
        Err(resp) => return resp,
    };
    match state.storage.create_provider(input).await {
        Ok(provider) => (StatusCode::CREATED, Json(provider)).into_response(),
        Err(err) => storage_error_response(err),
    }
}

async fn update_provider(
    State(state): State<AdminState>,
    Path(id): Path<i64>,
    Json(body): Json<ProviderRequest>,
) -> Response {
    let input = match body.into_new() {
        Ok(input) => input,
        Err(resp) => return resp,
    };
    match state.storage.update_provider(id, input).await {
        Ok(provider) => Json(provider).into_response(),
        Err(err) => storage_error_response(err),
    }
}

async fn delete_provider(State(state): State<AdminState>, Path(id): Path<i64>) -> Response {
    match state.storage.delete_provider(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => storage_error_response(err),
    }
}

async fn list_models(State(state): State<AdminState>) -> Response {
    match state.storage.list_models().await {
        Ok(models) => Json(models).into_response(),
        Err(err) => storage_error_response(err),
    }
}

#[derive(Deserialize)]
struct ModelRequest {
    name: String,
    model_id: String,
    provider_id: i64,
    model_type: String,
    format: String,
    #[serde(default)]
    origin_reasoning: bool,
    #[serde(default)]
    origin_output: bool,
    #[serde(default = "default_true")]
    valid: bool,
}

impl ModelRequest {
    fn into_new(self) -> Result<NewModel, Response> {
        let model_type = self
            .model_type
            .parse()
            .map_err(|e: String| (StatusCode::BAD_REQUEST, Json(json!({ "error": e }))).into_response())?;
        let format = self
            .format
            .parse()
            .map_err(|e: String| (StatusCode::BAD_REQUEST, Json(json!({ "error": e }))).into_response())?;
        Ok(NewModel {
            name: self.name,
            model_id: self.model_id,
            provider_id: self.provider_id,
            model_type,
            format,
            origin_reasoning: self.origin_reasoning,
            origin_output: self.origin_output,
            valid: self.valid,
        })
    }
}

async fn create_model(State(state): State<AdminState>, Json(body): Json<ModelRequest>) -> Response {
    let input = match body.into_new() {
        Ok(input) => input,
        Err(resp) => return resp,
    };
    match state.storage.create_model(input).await {
        Ok(model) => (StatusCode::CREATED, Json(model)).into_response(),
        Err(err) => storage_error_response(err),
    }
}

async fn update_model(
    State(state): State<AdminState>,
    Path(id): Path<i64>,
    Json(body): Json<ModelRequest>,
) -> Response {
    let input = match body.into_new() {
        Ok(input) => input,
        Err(resp) => return resp,
    };
    match state.storage.update_model(id, input).await {
        Ok(model) => Json(model).into_response(),
        Err(err) => storage_error_response(err),
    }
}

async fn delete_model(State(state): State<AdminState>, Path(id): Path<i64>) -> Response {
    match state.storage.delete_model(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => storage_error_response(err),
    }
}

async fn list_composites(State(state): State<AdminState>) -> Response {
    match state.storage.list_composites().await {
        Ok(composites) => Json(composites).into_response(),
        Err(err) => storage_error_response(err),
    }
}

#[derive(Deserialize)]
struct CompositeRequest {
    name: String,
    reasoner_model_id: i64,
    general_model_id: i64,
    #[serde(default = "default_true")]
    valid: bool,
}

impl From<CompositeRequest> for NewComposite {
    fn from(req: CompositeRequest) -> Self {
        NewComposite {
            name: req.name,
            reasoner_model_id: req.reasoner_model_id,
            general_model_id: req.general_model_id,
            valid: req.valid,
        }
    }
}

async fn create_composite(State(state): State<AdminState>, Json(body): Json<CompositeRequest>) -> Response {
    match state.storage.create_composite(body.into()).await {
        Ok(composite) => (StatusCode::CREATED, Json(composite)).into_response(),
        Err(err) => storage_error_response(err),
    }
}

async fn update_composite(
    State(state): State<AdminState>,
    Path(id): Path<i64>,
    Json(body): Json<CompositeRequest>,
) -> Response {
    match state.storage.update_composite(id, body.into()).await {
        Ok(composite) => Json(composite).into_response(),
        Err(err) => storage_error_response(err),
    }
}

async fn delete_composite(State(state): State<AdminState>, Path(id): Path<i64>) -> Response {
    match state.storage.delete_composite(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => storage_error_response(err),
    }
}

async fn list_settings(State(state): State<AdminState>) -> Response {
    match state.storage.list_settings().await {
        Ok(settings) => Json(
            settings
                .into_iter()
                .map(|(key, value)| json!({ "key": key, "value": value }))
                .collect::<Vec<_>>(),
        )
        .into_response(),
        Err(err) => storage_error_response(err),
    }
}

#[derive(Deserialize)]
struct SetSettingRequest {
    value: SettingValue,
}

async fn set_setting(
    State(state): State<AdminState>,
    Path(key): Path<String>,
    Json(body): Json<SetSettingRequest>,
) -> Response {
    match state.storage.set_setting(&key, body.value).await {
        Ok(()) => {
            if key == setting_keys::TCP_CONNECTOR_LIMIT
                || key == setting_keys::TCP_CONNECTOR_LIMIT_PER_HOST
                || key == setting_keys::TCP_KEEPALIVE_TIMEOUT
            {
                state.app.reload_http_client().await;
            }
            StatusCode::NO_CONTENT.into_response()
        }
        Err(err) => storage_error_response(err),
    }
}

//! HTTP Handlers

use std::sync::Arc;

use axum::{
    Form, Json,
    extract::{Query, RawQuery, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::{Deserialize, Serialize};

use gateway_module::{
    AdminStatusMessage, AdminStatusParams, CallbackHandler, CallbackOutcome, CaptureParams,
    CaptureResult, ConfigSchema, GatewayConfig, GatewayError, HostPlatform, HostedPageRequest,
    Invoice, MODULE_NAME, MetaData, RemoteInputParams, RemoteUpdateParams, SubmitRequest,
};

use crate::state::AppState;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub gateway_configured: bool,
    pub module_active: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct ViewInvoiceQuery {
    pub id: u64,
}

type ApiError = (StatusCode, Json<ErrorResponse>);
type PageError = (StatusCode, String);

fn status_for(error: &GatewayError) -> StatusCode {
    match error {
        GatewayError::ModuleNotActivated => StatusCode::SERVICE_UNAVAILABLE,
        GatewayError::InvalidHash => StatusCode::FORBIDDEN,
        GatewayError::InvoiceNotFound(_) | GatewayError::PayMethodNotFound(_) => {
            StatusCode::NOT_FOUND
        }
        GatewayError::InvoiceNotPayable(_) | GatewayError::DuplicateTransaction(_) => {
            StatusCode::CONFLICT
        }
        GatewayError::Parse(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn page_error(error: &GatewayError) -> PageError {
    let status = status_for(error);
    if status.is_server_error() {
        tracing::error!("Gateway error: {}", error);
    } else {
        tracing::warn!("Gateway request rejected: {}", error);
    }
    (status, error.user_message().to_string())
}

fn api_error(error: &GatewayError) -> ApiError {
    let (status, message) = page_error(error);
    (
        status,
        Json(ErrorResponse {
            error: message,
            code: "GATEWAY_ERROR".into(),
        }),
    )
}

fn gateway_config(state: &AppState) -> Result<Arc<GatewayConfig>, ApiError> {
    state.gateway.clone().ok_or_else(|| {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse {
                error: "Gateway not configured".into(),
                code: "GATEWAY_DISABLED".into(),
            }),
        )
    })
}

// ============================================================================
// Host-facing module API
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let module_active = matches!(
        state.host.gateway_variables(MODULE_NAME).await,
        Ok(Some(vars)) if vars.active
    );

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        gateway_configured: state.gateway.is_some(),
        module_active,
    })
}

pub async fn module_metadata() -> Json<MetaData> {
    Json(gateway_module::metadata())
}

pub async fn module_config() -> Json<ConfigSchema> {
    Json(gateway_module::config_schema())
}

/// Build the new payment / new card form
pub async fn remote_input_form(
    State(state): State<AppState>,
    Json(params): Json<RemoteInputParams>,
) -> Result<Html<String>, ApiError> {
    let config = gateway_config(&state)?;
    gateway_module::remote_input(&config, &params)
        .map(Html)
        .map_err(|e| api_error(&e))
}

/// Build the card update form
pub async fn remote_update_form(
    State(state): State<AppState>,
    Json(params): Json<RemoteUpdateParams>,
) -> Result<Html<String>, ApiError> {
    let config = gateway_config(&state)?;
    gateway_module::remote_update(&config, &params)
        .map(Html)
        .map_err(|e| api_error(&e))
}

/// Charge a stored token
pub async fn capture_payment(
    State(state): State<AppState>,
    Json(params): Json<CaptureParams>,
) -> Result<Json<CaptureResult>, ApiError> {
    let config = gateway_config(&state)?;
    Ok(Json(gateway_module::capture(&config, &params)))
}

/// Admin invoice banner
pub async fn admin_status(Json(params): Json<AdminStatusParams>) -> Json<Option<AdminStatusMessage>> {
    Json(gateway_module::admin_status_message(&params))
}

// ============================================================================
// Gateway-hosted demo pages
// ============================================================================

/// Hosted card page shown inside the host's iframe
pub async fn hosted_page(
    State(state): State<AppState>,
    Form(request): Form<HostedPageRequest>,
) -> Result<Html<String>, PageError> {
    let config = state
        .gateway
        .as_ref()
        .ok_or_else(|| page_error(&GatewayError::ModuleNotActivated))?;

    let today = chrono::Utc::now().date_naive();
    gateway_module::render_hosted_page(config, &request, today)
        .map(Html)
        .map_err(|e| page_error(&e))
}

/// Card form submission: issue a token and bounce back to the host
pub async fn submit_card(
    State(state): State<AppState>,
    Form(request): Form<SubmitRequest>,
) -> Result<Redirect, PageError> {
    let config = state
        .gateway
        .as_ref()
        .ok_or_else(|| page_error(&GatewayError::ModuleNotActivated))?;

    let redirect = gateway_module::process_submission(config, &request).map_err(|e| page_error(&e))?;
    Ok(Redirect::to(&redirect.location))
}

// ============================================================================
// Host callback
// ============================================================================

/// Callback reached by browser redirect (query string)
pub async fn gateway_callback(State(state): State<AppState>, RawQuery(query): RawQuery) -> Response {
    dispatch_callback(&state, query.as_deref().unwrap_or_default()).await
}

/// Callback reached by form post
pub async fn gateway_callback_form(State(state): State<AppState>, body: String) -> Response {
    dispatch_callback(&state, &body).await
}

async fn dispatch_callback(state: &AppState, query: &str) -> Response {
    let handler = CallbackHandler::new(state.host.clone());
    match handler.handle_query(query).await {
        Ok(outcome @ CallbackOutcome::Redirect { .. }) => match outcome.location(&state.system_url) {
            Some(location) => Redirect::to(&location).into_response(),
            None => StatusCode::OK.into_response(),
        },
        Ok(CallbackOutcome::Message(message)) => message.into_response(),
        Ok(CallbackOutcome::Ignored) => StatusCode::OK.into_response(),
        Err(e) => page_error(&e).into_response(),
    }
}

/// Demo invoice view the payment callback redirects to
pub async fn view_invoice(
    State(state): State<AppState>,
    Query(query): Query<ViewInvoiceQuery>,
) -> Result<Json<Invoice>, ApiError> {
    state
        .host
        .invoice(query.id)
        .await
        .map(Json)
        .ok_or_else(|| api_error(&GatewayError::InvoiceNotFound(query.id)))
}

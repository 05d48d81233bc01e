//! Router

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use gateway_module::{CALLBACK_PATH, HOSTED_PAGE_PATH, SUBMIT_PATH};

use crate::handlers::{
    admin_status, capture_payment, gateway_callback, gateway_callback_form, health_check,
    hosted_page, module_config, module_metadata, remote_input_form, remote_update_form,
    submit_card, view_invoice,
};
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health & info
        .route("/health", get(health_check))
        .route("/api/gateway/metadata", get(module_metadata))
        .route("/api/gateway/config", get(module_config))

        // Module functions called by the host
        .route("/api/gateway/remoteinput", post(remote_input_form))
        .route("/api/gateway/remoteupdate", post(remote_update_form))
        .route("/api/gateway/capture", post(capture_payment))
        .route("/api/gateway/adminstatusmsg", post(admin_status))

        // Gateway-hosted card page
        .route(&format!("/{HOSTED_PAGE_PATH}"), post(hosted_page))
        .route(&format!("/demo/{SUBMIT_PATH}"), post(submit_card))

        // Host callback and invoice view
        .route(
            &format!("/{CALLBACK_PATH}"),
            get(gateway_callback).post(gateway_callback_form),
        )
        .route("/viewinvoice", get(view_invoice))

        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

//! Remote input gateway demo server
//!
//! Axum-based server playing both sides of the round trip: the host's
//! module API and callback, and the gateway's hosted card page.

mod handlers;
mod routes;
mod state;

use std::sync::Arc;

use rust_decimal_macros::dec;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gateway_module::{GatewayConfig, Invoice, MODULE_NAME, MemoryHost};

use crate::state::AppState;

const DEMO_INVOICE_ID: u64 = 1;
const DEMO_CLIENT_ID: u64 = 1;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment
    dotenvy::dotenv().ok();

    let host = Arc::new(MemoryHost::new());

    // Gateway credentials
    let gateway = match GatewayConfig::from_env() {
        Ok(config) => {
            host.activate_gateway(MODULE_NAME, config.clone()).await;
            tracing::info!(
                test_mode = config.test_mode,
                verify_hash = config.verify_hash,
                "✓ Gateway module activated"
            );
            Some(Arc::new(config))
        }
        Err(e) => {
            tracing::warn!("⚠ Gateway not configured - module inactive: {}", e);
            tracing::warn!("  Set GATEWAY_API_USERNAME and GATEWAY_API_PASSWORD in .env");
            None
        }
    };

    let mut system_url = std::env::var("SYSTEM_URL").unwrap_or_else(|_| "http://localhost:3000/".into());
    if !system_url.ends_with('/') {
        system_url.push('/');
    }

    // Demo invoice to pay against
    host.insert_invoice(Invoice::new(DEMO_INVOICE_ID, DEMO_CLIENT_ID, dec!(10.00), "USD"))
        .await;

    let state = AppState {
        host,
        gateway,
        system_url: system_url.clone(),
    };
    let app = routes::router(state);

    // Start server
    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("🚀 remote input gateway demo running on http://{}", addr);
    tracing::info!("   system URL: {}", system_url);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health                       - Health check");
    tracing::info!("  GET  /api/gateway/metadata         - Module metadata");
    tracing::info!("  GET  /api/gateway/config           - Admin settings schema");
    tracing::info!("  POST /api/gateway/remoteinput      - Payment / new card form");
    tracing::info!("  POST /api/gateway/remoteupdate     - Card update form");
    tracing::info!("  POST /api/gateway/capture          - Charge stored token");
    tracing::info!("  POST /api/gateway/adminstatusmsg   - Admin invoice banner");
    tracing::info!("  POST /demo/remote-iframe-demo      - Hosted card page");
    tracing::info!("  POST /demo/submit-handler          - Card submission");
    tracing::info!("  GET  /modules/gateways/callback/remoteinputgateway - Host callback");
    tracing::info!("  GET  /viewinvoice?id=N             - Invoice view");
    tracing::info!("");

    axum::serve(listener, app).await?;

    Ok(())
}

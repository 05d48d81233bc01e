//! Application State

use std::sync::Arc;

use gateway_module::{GatewayConfig, MemoryHost};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// In-memory billing platform the callback writes into
    pub host: Arc<MemoryHost>,

    /// Gateway credentials (optional - None if not configured)
    pub gateway: Option<Arc<GatewayConfig>>,

    /// Public base URL of this server, ending in `/`
    pub system_url: String,
}

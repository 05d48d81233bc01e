//! # gateway-module
//!
//! Sample "remote input" payment gateway module for a billing platform.
//!
//! ## Remote Input Flow
//!
//! Card details are typed into a page hosted by the gateway, shown inside
//! an iframe on the host. The host only ever sees a token.
//!
//! ```text
//! ┌─────────────┐  remote_input   ┌──────────────────┐  submit   ┌────────────────┐
//! │    Host     │────────────────▶│  Hosted card     │──────────▶│ Submit handler │
//! │  (invoice)  │  hidden fields  │  page (iframe)   │           │ (issues token) │
//! └─────────────┘   + hash        └──────────────────┘           └───────┬────────┘
//!        ▲                                                               │ redirect
//!        │            ┌─────────────────────────┐                        │ + hash
//!        └────────────│   Callback dispatcher   │◀───────────────────────┘
//!   payment / card    │ payment | create | update│
//!                     └─────────────────────────┘
//! ```
//!
//! Both legs carry a SHA-1 verification hash over
//! `api_username|customer_id|invoice_id|amount|currency|secret|token`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use gateway_module::{CallbackHandler, CallbackRequest, MemoryHost, request_log};
//!
//! let host = Arc::new(MemoryHost::new());
//! let handler = CallbackHandler::new(host);
//!
//! let request = CallbackRequest::from_query(query)?;
//! let outcome = handler.handle(&request, &request_log(query)).await?;
//! ```

mod callback;
mod config;
mod error;
mod forms;
mod hash;
mod host;
mod hosted;
mod module;
mod params;

pub use callback::{
    CREATE_FAILED, CREATE_SUCCESS, CallbackHandler, CallbackOutcome, CallbackRequest,
    PAYMENT_FAILED_TEMPLATE, UPDATE_FAILED, UPDATE_SUCCESS, request_log,
};
pub use config::{GatewayConfig, MODULE_NAME, parse_flag};
pub use error::{GatewayError, Result};
pub use forms::{
    CALLBACK_PATH, HOSTED_PAGE_PATH, HiddenField, remote_input, remote_input_fields,
    remote_update, remote_update_fields,
};
pub use hash::{HashInput, VerificationHash};
pub use host::{
    GatewayVariables, HostPlatform, Invoice, InvoicePayment, InvoiceStatus, MemoryHost,
    PayMethod, RequestLog, SentMessage, TransactionLogEntry,
};
pub use hosted::{
    HostedPageRequest, RedirectQuery, SUBMIT_PATH, SubmitRedirect, SubmitRequest,
    process_submission, render_hosted_page,
};
pub use module::{
    AdminStatusMessage, CaptureResult, CaptureStatus, ConfigField, ConfigSchema, FieldType,
    MetaData, StatusKind, admin_status_message, capture, config_schema, metadata,
};
pub use params::{
    Action, AdminStatusParams, CaptureParams, CardSummary, ClientDetails, RemoteInputParams,
    RemoteUpdateParams, SystemParams, join_url,
};

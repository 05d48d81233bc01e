//! Host Callback Handling
//!
//! Finalizes a round trip once the hosted page redirects back: records the
//! payment, stores or replaces the card token, and tells the browser what
//! happened.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::MODULE_NAME;
use crate::error::{GatewayError, Result};
use crate::hash::HashInput;
use crate::host::{GatewayVariables, HostPlatform, RequestLog};
use crate::params::{Action, CardSummary, join_url, lenient, truthy};

pub const CREATE_SUCCESS: &str = "Create successful.";
pub const CREATE_FAILED: &str = "Create failed. Please try again.";
pub const UPDATE_SUCCESS: &str = "Update successful.";
pub const UPDATE_FAILED: &str = "Update failed. Please try again.";

/// Email template sent when a payment attempt is declined
pub const PAYMENT_FAILED_TEMPLATE: &str = "Credit Card Payment Failed";

/// Parameters returned by the hosted page redirect
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CallbackRequest {
    #[serde(deserialize_with = "truthy")]
    pub success: bool,
    pub action: Action,
    #[serde(deserialize_with = "lenient")]
    pub invoice_id: u64,
    #[serde(deserialize_with = "lenient")]
    pub customer_id: u64,
    #[serde(deserialize_with = "lenient")]
    pub amount: Decimal,
    #[serde(deserialize_with = "lenient")]
    pub fees: Decimal,
    pub currency: String,
    pub transaction_id: String,
    pub card_token: String,
    pub card_type: String,
    pub card_last_four: String,
    pub card_expiry_date: String,
    pub verification_hash: String,
    /// Local identifier threaded through the round trip (pay method id on update)
    pub custom_reference: String,
}

impl CallbackRequest {
    /// Parse a form-encoded query string or body
    pub fn from_query(query: &str) -> Result<Self> {
        serde_urlencoded::from_str(query).map_err(|e| GatewayError::Parse(e.to_string()))
    }

    /// Pay method id carried in `custom_reference`; 0 when absent or not a number
    pub fn pay_method_id(&self) -> u64 {
        self.custom_reference.trim().parse().unwrap_or(0)
    }

    /// Success as reported, but only when a token came back with it
    ///
    /// The hash does not cover `success`, so a declined redirect (signed
    /// over an empty token) must never count as accepted.
    pub fn is_accepted(&self) -> bool {
        self.success && !self.card_token.trim().is_empty()
    }

    pub fn card(&self) -> CardSummary {
        CardSummary {
            card_type: self.card_type.clone(),
            last_four: self.card_last_four.clone(),
            expiry_date: self.card_expiry_date.clone(),
            token: self.card_token.clone(),
        }
    }

    fn hash_input<'a>(&'a self, api_username: &'a str) -> HashInput<'a> {
        HashInput {
            api_username,
            customer_id: self.customer_id,
            invoice_id: self.invoice_id,
            amount: self.amount,
            currency: &self.currency,
            token: &self.card_token,
        }
    }
}

/// Decode raw request fields for the gateway log
pub fn request_log(query: &str) -> RequestLog {
    serde_urlencoded::from_str(query).unwrap_or_default()
}

/// What the browser should see after the callback
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// Send the client back to the invoice with a success or failure notice
    Redirect { invoice_id: u64, success: bool },

    /// Plain message shown inside the iframe
    Message(String),

    /// Unrecognized action, nothing done
    Ignored,
}

impl CallbackOutcome {
    /// Invoice page URL for a redirect outcome
    pub fn location(&self, system_url: &str) -> Option<String> {
        match self {
            CallbackOutcome::Redirect { invoice_id, success } => {
                let notice = if *success { "paymentsuccess" } else { "paymentfailed" };
                Some(format!(
                    "{}?id={invoice_id}&{notice}=true",
                    join_url(system_url, "viewinvoice")
                ))
            }
            _ => None,
        }
    }
}

/// Callback handler
pub struct CallbackHandler<H: HostPlatform + ?Sized> {
    host: Arc<H>,
    module: String,
}

impl<H: HostPlatform + ?Sized> CallbackHandler<H> {
    pub fn new(host: Arc<H>) -> Self {
        Self::for_module(host, MODULE_NAME)
    }

    pub fn for_module(host: Arc<H>, module: impl Into<String>) -> Self {
        Self {
            host,
            module: module.into(),
        }
    }

    /// Process a callback
    ///
    /// `raw` is what gets written to the gateway log, untouched.
    pub async fn handle(&self, request: &CallbackRequest, raw: &RequestLog) -> Result<CallbackOutcome> {
        let vars = self.active_gateway().await?;
        self.process(&vars, request, raw).await
    }

    /// Parse and process a form-encoded query string or body
    ///
    /// A request that does not parse is still written to the gateway log.
    pub async fn handle_query(&self, query: &str) -> Result<CallbackOutcome> {
        let vars = self.active_gateway().await?;
        let raw = request_log(query);

        match CallbackRequest::from_query(query) {
            Ok(request) => self.process(&vars, &request, &raw).await,
            Err(e) => {
                self.log(&vars, &raw, "Invalid Request").await;
                tracing::warn!(error = %e, "Malformed gateway callback");
                Err(e)
            }
        }
    }

    async fn active_gateway(&self) -> Result<GatewayVariables> {
        self.host
            .gateway_variables(&self.module)
            .await?
            .filter(|v| v.active)
            .ok_or(GatewayError::ModuleNotActivated)
    }

    async fn process(
        &self,
        vars: &GatewayVariables,
        request: &CallbackRequest,
        raw: &RequestLog,
    ) -> Result<CallbackOutcome> {
        if vars.config.verify_hash {
            let verified = request
                .hash_input(&vars.config.api_username)
                .verify(&vars.config.api_password, &request.verification_hash);

            if let Err(e) = verified {
                self.log(vars, raw, "Invalid Hash").await;
                return Err(e);
            }
        }

        tracing::info!(
            action = %request.action,
            success = request.success,
            invoice_id = request.invoice_id,
            customer_id = request.customer_id,
            "Processing gateway callback"
        );

        let accepted = request.is_accepted();
        if request.success && !accepted {
            tracing::warn!(
                action = %request.action,
                invoice_id = request.invoice_id,
                "Success reported without a card token, treating as declined"
            );
        }

        match request.action {
            Action::Payment => self.payment(vars, request, accepted, raw).await,
            Action::Create => Ok(self.create(vars, request, accepted, raw).await),
            Action::Update => Ok(self.update(vars, request, accepted, raw).await),
            Action::Unknown => {
                tracing::debug!("Unhandled callback action");
                Ok(CallbackOutcome::Ignored)
            }
        }
    }

    async fn payment(
        &self,
        vars: &GatewayVariables,
        request: &CallbackRequest,
        accepted: bool,
        raw: &RequestLog,
    ) -> Result<CallbackOutcome> {
        if !accepted {
            self.log(vars, raw, "Failed").await;
            self.host
                .send_message(PAYMENT_FAILED_TEMPLATE, request.invoice_id)
                .await?;

            tracing::warn!(invoice_id = request.invoice_id, "Payment failed");

            return Ok(CallbackOutcome::Redirect {
                invoice_id: request.invoice_id,
                success: false,
            });
        }

        let invoice_id = self
            .host
            .check_invoice_id(request.invoice_id, &vars.payment_method)
            .await?;
        self.host.check_transaction_id(&request.transaction_id).await?;

        self.log(vars, raw, "Success").await;

        let pay_method_id = self.host.save_remote_card(invoice_id, &request.card()).await?;
        self.host
            .add_invoice_payment(
                invoice_id,
                &request.transaction_id,
                request.amount,
                request.fees,
                &self.module,
            )
            .await?;

        tracing::info!(
            invoice_id,
            pay_method_id,
            transaction_id = %request.transaction_id,
            amount = %request.amount,
            "Payment applied"
        );

        Ok(CallbackOutcome::Redirect {
            invoice_id,
            success: true,
        })
    }

    async fn create(
        &self,
        vars: &GatewayVariables,
        request: &CallbackRequest,
        accepted: bool,
        raw: &RequestLog,
    ) -> CallbackOutcome {
        if !accepted {
            self.log(vars, raw, "Create Failed").await;
            return CallbackOutcome::Message(CREATE_FAILED.into());
        }

        match self
            .host
            .create_card_pay_method(request.customer_id, &self.module, &request.card())
            .await
        {
            Ok(pay_method_id) => {
                self.log(vars, raw, "Create Success").await;
                tracing::info!(customer_id = request.customer_id, pay_method_id, "Pay method created");
                CallbackOutcome::Message(CREATE_SUCCESS.into())
            }
            Err(e) => {
                self.log(vars, raw, &e.to_string()).await;
                tracing::warn!(customer_id = request.customer_id, error = %e, "Pay method create failed");
                CallbackOutcome::Message(CREATE_FAILED.into())
            }
        }
    }

    async fn update(
        &self,
        vars: &GatewayVariables,
        request: &CallbackRequest,
        accepted: bool,
        raw: &RequestLog,
    ) -> CallbackOutcome {
        if !accepted {
            self.log(vars, raw, "Update Failed").await;
            return CallbackOutcome::Message(UPDATE_FAILED.into());
        }

        let pay_method_id = request.pay_method_id();
        match self
            .host
            .update_card_pay_method(
                request.customer_id,
                pay_method_id,
                &request.card_expiry_date,
                &request.card_token,
            )
            .await
        {
            Ok(()) => {
                self.log(vars, raw, "Update Success").await;
                tracing::info!(customer_id = request.customer_id, pay_method_id, "Pay method updated");
                CallbackOutcome::Message(UPDATE_SUCCESS.into())
            }
            Err(e) => {
                self.log(vars, raw, &e.to_string()).await;
                tracing::warn!(customer_id = request.customer_id, pay_method_id, error = %e, "Pay method update failed");
                CallbackOutcome::Message(UPDATE_FAILED.into())
            }
        }
    }

    /// Write to the gateway log; a failing log never aborts the callback
    async fn log(&self, vars: &GatewayVariables, raw: &RequestLog, status: &str) {
        if let Err(e) = self
            .host
            .log_transaction(&vars.payment_method, raw, status)
            .await
        {
            tracing::warn!(status, error = %e, "Failed to write gateway log");
        }
    }
}

//! Module Descriptor
//!
//! Metadata, configuration schema, token capture and the admin status
//! banner: the functions the host calls without rendering any markup.

use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::GatewayConfig;
use crate::params::{AdminStatusParams, CaptureParams};

pub const DISPLAY_NAME: &str = "Sample Remote Input Gateway Module";
pub const API_VERSION: &str = "1.1";

/// Module capabilities reported to the host
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MetaData {
    pub display_name: String,
    pub api_version: String,
    /// Card numbers are never stored by the host
    pub no_local_cc: bool,
}

pub fn metadata() -> MetaData {
    MetaData {
        display_name: DISPLAY_NAME.into(),
        api_version: API_VERSION.into(),
        no_local_cc: true,
    }
}

/// Admin setting field types the host knows how to render
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Password,
    YesNo,
    Dropdown,
    Radio,
    Textarea,
}

/// One admin setting
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConfigField {
    pub name: String,
    pub friendly_name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    pub description: String,
    /// Choices for dropdown and radio fields
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

impl ConfigField {
    fn new(name: &str, friendly_name: &str, field_type: FieldType, description: &str) -> Self {
        Self {
            name: name.into(),
            friendly_name: friendly_name.into(),
            field_type,
            size: None,
            default: None,
            description: description.into(),
            options: Vec::new(),
        }
    }

    fn sized(mut self, size: u32) -> Self {
        self.size = Some(size);
        self.default = Some(String::new());
        self
    }
}

/// Admin settings form definition
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConfigSchema {
    pub friendly_name: String,
    pub fields: Vec<ConfigField>,
}

impl ConfigSchema {
    pub fn field(&self, name: &str) -> Option<&ConfigField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

pub fn config_schema() -> ConfigSchema {
    ConfigSchema {
        friendly_name: DISPLAY_NAME.into(),
        fields: vec![
            ConfigField::new(
                "apiUsername",
                "API Username",
                FieldType::Text,
                "Enter your API Username here",
            )
            .sized(25),
            ConfigField::new(
                "apiPassword",
                "API Password",
                FieldType::Password,
                "Enter your API Password here",
            )
            .sized(25),
            ConfigField::new(
                "testMode",
                "Test Mode",
                FieldType::YesNo,
                "Tick to enable test mode",
            ),
        ],
    }
}

/// Outcome class of a capture attempt
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureStatus {
    Success,
    Declined,
    Error,
}

/// Result handed back to the host after charging a token
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CaptureResult {
    pub status: CaptureStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fee: Option<Decimal>,
    /// Returned only when the processor rotated the token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decline_message: Option<String>,
    /// Recorded in the host gateway log
    pub raw_data: serde_json::Value,
}

impl CaptureResult {
    pub fn declined(message: impl Into<String>, raw_data: serde_json::Value) -> Self {
        Self {
            status: CaptureStatus::Declined,
            transaction_id: None,
            fee: None,
            gateway_id: None,
            decline_message: Some(message.into()),
            raw_data,
        }
    }

    pub fn error(raw_data: serde_json::Value) -> Self {
        Self {
            status: CaptureStatus::Error,
            transaction_id: None,
            fee: None,
            gateway_id: None,
            decline_message: None,
            raw_data,
        }
    }
}

/// Charge the stored remote token for an invoice
///
/// The processor call is simulated: a positive amount against a non-empty
/// token succeeds and the token comes back rotated.
pub fn capture(config: &GatewayConfig, params: &CaptureParams) -> CaptureResult {
    let Some(token) = params.gateway_id.as_deref().filter(|t| !t.is_empty()) else {
        tracing::info!(invoice_id = params.invoice_id, "Capture declined: no remote token");
        return CaptureResult::declined("No Remote Token", serde_json::Value::Null);
    };

    tracing::info!(
        invoice_id = params.invoice_id,
        amount = %params.amount,
        currency = %params.currency,
        test_mode = config.test_mode,
        "Capturing against remote token"
    );

    capture_result(simulate_charge(token, params))
}

fn simulate_charge(token: &str, params: &CaptureParams) -> serde_json::Value {
    if params.amount <= Decimal::ZERO {
        return serde_json::json!({
            "success": false,
            "decline_reason": "Invalid amount",
            "invoice_number": params.invoice_id,
            "amount": params.amount,
        });
    }

    serde_json::json!({
        "success": true,
        "transaction_id": "ABC123",
        "fee": "1.23",
        "token": issue_token(),
        "previous_token": token,
        "invoice_number": params.invoice_id,
        "amount": params.amount,
        "currency": params.currency,
    })
}

/// Map a processor response onto the host's capture result
fn capture_result(response: serde_json::Value) -> CaptureResult {
    match response["success"].as_bool() {
        Some(true) => {
            let Some(transaction_id) = response["transaction_id"].as_str().map(String::from) else {
                tracing::error!("Processor accepted the charge without a transaction id");
                return CaptureResult::error(response);
            };

            CaptureResult {
                status: CaptureStatus::Success,
                transaction_id: Some(transaction_id),
                fee: response["fee"].as_str().and_then(|f| f.parse().ok()),
                gateway_id: response["token"].as_str().map(String::from),
                decline_message: None,
                raw_data: response,
            }
        }
        Some(false) => {
            let reason = response["decline_reason"]
                .as_str()
                .unwrap_or("Declined")
                .to_string();
            tracing::info!(reason = %reason, "Capture declined by processor");
            CaptureResult::declined(reason, response)
        }
        None => {
            tracing::error!("Unrecognised processor response");
            CaptureResult::error(response)
        }
    }
}

/// Issue a fake processor token: `abc` followed by six digits
pub(crate) fn issue_token() -> String {
    format!("abc{}", rand::rng().random_range(100_000..=999_999))
}

/// Fake processor transaction id: six digits
pub(crate) fn issue_transaction_id() -> String {
    rand::rng().random_range(100_000..=999_999).to_string()
}

/// Severity of the admin banner
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusKind {
    Info,
    Success,
    Error,
}

/// Banner shown on the admin invoice page
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AdminStatusMessage {
    #[serde(rename = "type")]
    pub kind: StatusKind,
    pub title: String,
    pub msg: String,
}

pub fn admin_status_message(params: &AdminStatusParams) -> Option<AdminStatusMessage> {
    let token = params.gateway_id.as_deref().filter(|t| !t.is_empty())?;

    Some(AdminStatusMessage {
        kind: StatusKind::Info,
        title: "Token Gateway Profile".into(),
        msg: format!(
            "This customer has a Remote Token storing their card details for automated \
             recurring billing with ID {token}"
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn capture_params(token: Option<&str>) -> CaptureParams {
        CaptureParams {
            gateway_id: token.map(String::from),
            card_cvv: None,
            invoice_id: 42,
            description: "Invoice #42".into(),
            amount: dec!(10.00),
            currency: "USD".into(),
            client: Default::default(),
        }
    }

    #[test]
    fn test_metadata() {
        let meta = metadata();
        assert_eq!(meta.display_name, "Sample Remote Input Gateway Module");
        assert_eq!(meta.api_version, "1.1");
        assert!(meta.no_local_cc);
    }

    #[test]
    fn test_config_schema() {
        let schema = config_schema();
        assert_eq!(schema.fields.len(), 3);
        assert_eq!(schema.field("apiPassword").unwrap().field_type, FieldType::Password);
        assert_eq!(schema.field("testMode").unwrap().field_type, FieldType::YesNo);

        let json = serde_json::to_value(&schema).unwrap();
        assert_eq!(json["fields"][0]["type"], "text");
        assert_eq!(json["fields"][2]["type"], "yesno");
        assert_eq!(json["fields"][0]["size"], 25);
    }

    #[test]
    fn test_capture_requires_token() {
        let config = GatewayConfig::new("merchant", "secret");
        for token in [None, Some("")] {
            let result = capture(&config, &capture_params(token));
            assert_eq!(result.status, CaptureStatus::Declined);
            assert_eq!(result.decline_message.as_deref(), Some("No Remote Token"));
            assert!(result.transaction_id.is_none());
        }
    }

    #[test]
    fn test_capture_success() {
        let config = GatewayConfig::new("merchant", "secret");
        let result = capture(&config, &capture_params(Some("abc123456")));

        assert_eq!(result.status, CaptureStatus::Success);
        assert_eq!(result.transaction_id.as_deref(), Some("ABC123"));
        assert_eq!(result.fee, Some(dec!(1.23)));

        let token = result.gateway_id.unwrap();
        assert!(token.starts_with("abc"));
        assert_eq!(token.len(), 9);
    }

    #[test]
    fn test_capture_declined_by_processor() {
        let config = GatewayConfig::new("merchant", "secret");
        let mut params = capture_params(Some("abc123456"));
        params.amount = dec!(0);

        let result = capture(&config, &params);
        assert_eq!(result.status, CaptureStatus::Declined);
        assert_eq!(result.decline_message.as_deref(), Some("Invalid amount"));
        assert!(result.gateway_id.is_none());
        assert_eq!(result.raw_data["success"], false);
    }

    #[test]
    fn test_capture_result_mapping() {
        let declined = capture_result(serde_json::json!({ "success": false }));
        assert_eq!(declined.status, CaptureStatus::Declined);
        assert_eq!(declined.decline_message.as_deref(), Some("Declined"));

        let garbled = capture_result(serde_json::json!({ "status": "??" }));
        assert_eq!(garbled.status, CaptureStatus::Error);
        assert!(garbled.transaction_id.is_none());

        let incomplete = capture_result(serde_json::json!({ "success": true }));
        assert_eq!(incomplete.status, CaptureStatus::Error);

        let json = serde_json::to_value(&garbled).unwrap();
        assert_eq!(json["status"], "error");
    }

    #[test]
    fn test_admin_status_message() {
        let mut params = AdminStatusParams::default();
        assert!(admin_status_message(&params).is_none());

        params.gateway_id = Some("abc654321".into());
        let message = admin_status_message(&params).unwrap();
        assert_eq!(message.kind, StatusKind::Info);
        assert_eq!(message.title, "Token Gateway Profile");
        assert!(message.msg.ends_with("with ID abc654321"));
    }

    #[test]
    fn test_issued_ids() {
        let id = issue_transaction_id();
        assert_eq!(id.len(), 6);
        assert!(id.chars().all(|c| c.is_ascii_digit()));
    }
}

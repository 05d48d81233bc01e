//! Typed parameter records handed to the module by the host

use std::fmt::Display;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

/// What the hosted page is asked to do, echoed back to the callback
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Payment,
    Create,
    Update,
    #[default]
    #[serde(other)]
    Unknown,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Payment => "payment",
            Action::Create => "create",
            Action::Update => "update",
            Action::Unknown => "unknown",
        }
    }

    /// Charge when there is something to pay, otherwise just store a card
    pub fn for_amount(amount: Decimal) -> Self {
        if amount > Decimal::ZERO {
            Action::Payment
        } else {
            Action::Create
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Client (customer) details
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientDetails {
    pub id: u64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub address1: String,
    pub address2: String,
    pub city: String,
    pub state: String,
    pub postcode: String,
    pub country: String,
    pub phone_number: String,
}

/// Host installation details
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemParams {
    pub company_name: String,
    /// Base URL of the host
    pub system_url: String,
    pub return_url: String,
    pub lang_pay_now: String,
    pub module_display_name: String,
    pub module_name: String,
    pub host_version: String,
}

impl SystemParams {
    /// Join a relative path onto the system URL
    pub fn url(&self, path: &str) -> String {
        join_url(&self.system_url, path)
    }
}

/// Join a relative path onto a base URL with exactly one `/` between them
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Parameters for building the new payment / new card form
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RemoteInputParams {
    pub invoice_id: u64,
    #[serde(default)]
    pub description: String,
    pub amount: Decimal,
    pub currency: String,
    pub client: ClientDetails,
    pub system: SystemParams,
}

/// Parameters for building the card update form
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RemoteUpdateParams {
    /// Token currently stored for the pay method
    pub gateway_id: String,
    pub pay_method_id: u64,
    pub client: ClientDetails,
    pub system: SystemParams,
}

/// Parameters for charging a stored token
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CaptureParams {
    #[serde(default)]
    pub gateway_id: Option<String>,
    #[serde(default)]
    pub card_cvv: Option<String>,
    pub invoice_id: u64,
    #[serde(default)]
    pub description: String,
    pub amount: Decimal,
    pub currency: String,
    #[serde(default)]
    pub client: ClientDetails,
}

/// Parameters for the admin invoice status banner
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminStatusParams {
    pub gateway_id: Option<String>,
    pub invoice_id: u64,
    pub user_id: u64,
    pub date: Option<chrono::NaiveDate>,
    pub due_date: Option<chrono::NaiveDate>,
    pub status: String,
}

/// Card details the host stores against a pay method
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardSummary {
    pub card_type: String,
    pub last_four: String,
    /// `MMYY`
    pub expiry_date: String,
    pub token: String,
}

/// Deserialize a form or query value, treating an empty string as the default
pub(crate) fn lenient<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr + Default,
    T::Err: Display,
{
    let raw = String::deserialize(deserializer)?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(T::default());
    }

    trimmed.parse().map_err(serde::de::Error::custom)
}

/// Deserialize a loose boolean flag (`1`, `true`, `yes`, `on`)
pub(crate) fn truthy<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(crate::config::parse_flag(&raw))
}

/// Serialize a boolean as `1` / `0`
pub(crate) fn as_flag<S>(value: &bool, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(if *value { "1" } else { "0" })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_parsing() {
        #[derive(Deserialize)]
        struct Probe {
            #[serde(default)]
            action: Action,
        }

        let probe: Probe = serde_urlencoded::from_str("action=update").unwrap();
        assert_eq!(probe.action, Action::Update);
        let probe: Probe = serde_urlencoded::from_str("action=refund").unwrap();
        assert_eq!(probe.action, Action::Unknown);
        let probe: Probe = serde_urlencoded::from_str("").unwrap();
        assert_eq!(probe.action, Action::Unknown);
    }

    #[test]
    fn test_join_url() {
        assert_eq!(join_url("http://host/", "demo/page"), "http://host/demo/page");
        assert_eq!(join_url("http://host", "/demo/page"), "http://host/demo/page");
    }

    #[derive(Deserialize)]
    struct Probe {
        #[serde(default, deserialize_with = "lenient")]
        id: u64,
        #[serde(default, deserialize_with = "truthy")]
        flag: bool,
    }

    #[test]
    fn test_lenient_fields() {
        let probe: Probe = serde_urlencoded::from_str("id=&flag=1").unwrap();
        assert_eq!(probe.id, 0);
        assert!(probe.flag);

        let probe: Probe = serde_urlencoded::from_str("id=42").unwrap();
        assert_eq!(probe.id, 42);
        assert!(!probe.flag);

        assert!(serde_urlencoded::from_str::<Probe>("id=abc").is_err());
    }
}

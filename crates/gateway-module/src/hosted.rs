//! Hosted Card Page
//!
//! The gateway side of the round trip: renders the card form shown inside
//! the host's iframe, then turns the submitted form into a redirect back to
//! the host callback. Card numbers and CVVs stop here; only the last four
//! digits travel onward.

use askama::Template;
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::GatewayConfig;
use crate::error::{GatewayError, Result};
use crate::hash::HashInput;
use crate::module::{issue_token, issue_transaction_id};
use crate::params::{Action, as_flag, lenient};

/// Relative action of the hosted form
pub const SUBMIT_PATH: &str = "submit-handler";

const CARD_TYPES: [&str; 4] = ["Visa", "MasterCard", "American Express", "Discover"];
const EXPIRY_YEARS_AHEAD: i32 = 12;

/// Form posted by the host's remote input / remote update form
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HostedPageRequest {
    pub api_username: String,
    pub action: Action,
    #[serde(deserialize_with = "lenient")]
    pub invoice_id: u64,
    #[serde(deserialize_with = "lenient")]
    pub amount: Decimal,
    pub currency: String,
    #[serde(deserialize_with = "lenient")]
    pub customer_id: u64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub address1: String,
    pub address2: String,
    pub city: String,
    pub state: String,
    pub postcode: String,
    pub country: String,
    pub phonenumber: String,
    pub return_url: String,
    /// Existing token, only present for updates
    pub card_token: String,
    pub custom_reference: String,
    pub verification_hash: String,
}

impl HostedPageRequest {
    fn hash_input(&self) -> HashInput<'_> {
        HashInput {
            api_username: &self.api_username,
            customer_id: self.customer_id,
            invoice_id: self.invoice_id,
            amount: self.amount,
            currency: &self.currency,
            token: &self.card_token,
        }
    }
}

#[derive(Clone, Debug)]
struct CarriedField {
    name: &'static str,
    value: String,
}

#[derive(Clone, Debug)]
struct BillingField {
    label: &'static str,
    name: &'static str,
    value: String,
    required: bool,
}

#[derive(Template)]
#[template(path = "hosted_page.html")]
struct HostedPage<'a> {
    title: &'a str,
    button_label: &'a str,
    submit_action: &'a str,
    carried: Vec<CarriedField>,
    billing: Vec<BillingField>,
    card_types: &'a [&'a str],
    months: Vec<String>,
    years: Vec<String>,
}

/// Render the card entry page
///
/// With verification on, a tampered inbound form is refused before
/// anything is shown.
pub fn render_hosted_page(
    config: &GatewayConfig,
    request: &HostedPageRequest,
    today: NaiveDate,
) -> Result<String> {
    if config.verify_hash {
        request
            .hash_input()
            .verify(&config.api_password, &request.verification_hash)?;
    }

    let (title, button_label) = match request.action {
        Action::Payment => (
            "Make a payment".to_string(),
            format!("Pay {} {} Now", request.amount, request.currency),
        ),
        _ => ("Add/Update card details".to_string(), "Save Changes".to_string()),
    };

    let carried = vec![
        CarriedField { name: "action", value: request.action.to_string() },
        CarriedField { name: "api_username", value: request.api_username.clone() },
        CarriedField { name: "card_token", value: request.card_token.clone() },
        CarriedField { name: "invoice_id", value: request.invoice_id.to_string() },
        CarriedField { name: "amount", value: request.amount.to_string() },
        CarriedField { name: "currency", value: request.currency.clone() },
        CarriedField { name: "customer_id", value: request.customer_id.to_string() },
        CarriedField { name: "return_url", value: request.return_url.clone() },
        CarriedField { name: "custom_reference", value: request.custom_reference.clone() },
    ];

    let billing = vec![
        billing_field("First Name", "first_name", &request.first_name, true),
        billing_field("Last Name", "last_name", &request.last_name, true),
        billing_field("Address 1", "address1", &request.address1, true),
        billing_field("Address 2", "address2", &request.address2, false),
        billing_field("City", "city", &request.city, true),
        billing_field("State", "state", &request.state, true),
        billing_field("Postcode", "postcode", &request.postcode, true),
        billing_field("Country", "country", &request.country, true),
    ];

    tracing::info!(
        action = %request.action,
        invoice_id = request.invoice_id,
        customer_id = request.customer_id,
        "Rendering hosted card page"
    );

    Ok(HostedPage {
        title: &title,
        button_label: &button_label,
        submit_action: SUBMIT_PATH,
        carried,
        billing,
        card_types: &CARD_TYPES,
        months: expiry_months(),
        years: expiry_years(today),
    }
    .render()?)
}

fn billing_field(label: &'static str, name: &'static str, value: &str, required: bool) -> BillingField {
    BillingField {
        label,
        name,
        value: value.to_string(),
        required,
    }
}

fn expiry_months() -> Vec<String> {
    (1..=12).map(|m| format!("{m:02}")).collect()
}

/// Two-digit years from this year through twelve years ahead
fn expiry_years(today: NaiveDate) -> Vec<String> {
    let current = today.year() % 100;
    (0..=EXPIRY_YEARS_AHEAD)
        .map(|offset| format!("{:02}", (current + offset) % 100))
        .collect()
}

/// Form posted by the hosted card page
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct SubmitRequest {
    pub api_username: String,
    pub action: Action,
    #[serde(deserialize_with = "lenient")]
    pub invoice_id: u64,
    #[serde(deserialize_with = "lenient")]
    pub amount: Decimal,
    pub currency: String,
    #[serde(deserialize_with = "lenient")]
    pub customer_id: u64,
    pub card_token: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub address1: String,
    pub address2: String,
    pub city: String,
    pub state: String,
    pub postcode: String,
    pub country: String,
    pub phonenumber: String,
    pub card_type: String,
    pub card_number: String,
    pub card_exp_month: String,
    pub card_exp_year: String,
    pub card_cvv: String,
    pub custom_reference: String,
    pub return_url: String,
}

impl std::fmt::Debug for SubmitRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubmitRequest")
            .field("action", &self.action)
            .field("invoice_id", &self.invoice_id)
            .field("amount", &self.amount)
            .field("currency", &self.currency)
            .field("customer_id", &self.customer_id)
            .field("card_type", &self.card_type)
            .field("card_number", &"<redacted>")
            .field("card_cvv", &"<redacted>")
            .field("custom_reference", &self.custom_reference)
            .field("return_url", &self.return_url)
            .finish_non_exhaustive()
    }
}

/// Result parameters appended to the host callback URL, in wire order
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RedirectQuery {
    #[serde(serialize_with = "as_flag")]
    pub success: bool,
    pub action: Action,
    pub invoice_id: u64,
    pub customer_id: u64,
    pub amount: Decimal,
    pub currency: String,
    pub transaction_id: String,
    pub card_token: String,
    pub card_type: String,
    pub card_last_four: String,
    pub card_expiry_date: String,
    pub custom_reference: String,
    pub verification_hash: String,
}

/// Where the browser goes after the card form is submitted
#[derive(Clone, Debug)]
pub struct SubmitRedirect {
    pub location: String,
    pub query: RedirectQuery,
}

/// Validate the card, issue a token and build the callback redirect
///
/// The processor is simulated: any well-formed card number is accepted.
pub fn process_submission(config: &GatewayConfig, request: &SubmitRequest) -> Result<SubmitRedirect> {
    if request.return_url.trim().is_empty() {
        return Err(GatewayError::Parse("return_url is required".into()));
    }

    let digits = card_digits(&request.card_number);
    let accepted = digits.as_deref().is_some_and(|d| (12..=19).contains(&d.len()));

    let (transaction_id, card_token, card_last_four) = match digits.as_deref() {
        Some(d) if accepted => (
            issue_transaction_id(),
            issue_token(),
            d[d.len() - 4..].to_string(),
        ),
        _ => (String::new(), String::new(), String::new()),
    };

    let verification_hash = HashInput {
        api_username: &config.api_username,
        customer_id: request.customer_id,
        invoice_id: request.invoice_id,
        amount: request.amount,
        currency: &request.currency,
        token: &card_token,
    }
    .digest(&config.api_password)
    .into_string();

    let query = RedirectQuery {
        success: accepted,
        action: request.action,
        invoice_id: request.invoice_id,
        customer_id: request.customer_id,
        amount: request.amount,
        currency: request.currency.clone(),
        transaction_id,
        card_token,
        card_type: request.card_type.clone(),
        card_last_four,
        card_expiry_date: format!(
            "{}{}",
            two_digits(&request.card_exp_month),
            two_digits(&request.card_exp_year)
        ),
        custom_reference: request.custom_reference.clone(),
        verification_hash,
    };

    let separator = if request.return_url.contains('?') { '&' } else { '?' };
    let location = format!(
        "{}{}{}",
        request.return_url,
        separator,
        serde_urlencoded::to_string(&query)?
    );

    if accepted {
        tracing::info!(
            action = %query.action,
            invoice_id = query.invoice_id,
            customer_id = query.customer_id,
            "Card accepted, redirecting to host"
        );
    } else {
        tracing::warn!(
            action = %query.action,
            invoice_id = query.invoice_id,
            customer_id = query.customer_id,
            "Card rejected, redirecting to host"
        );
    }

    Ok(SubmitRedirect { location, query })
}

/// Strip spaces and dashes; `None` if anything else is not a digit
fn card_digits(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(|c| !matches!(c, ' ' | '-')).collect();
    (!digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())).then_some(digits)
}

/// Last two characters, zero-padded (`2031` → `31`, `3` → `03`)
fn two_digits(raw: &str) -> String {
    let chars: Vec<char> = raw.trim().chars().collect();
    let tail: String = chars[chars.len().saturating_sub(2)..].iter().collect();
    format!("{tail:0>2}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn config() -> GatewayConfig {
        GatewayConfig::new("merchant", "sharedsecret")
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    fn page_request(action: Action) -> HostedPageRequest {
        let mut request = HostedPageRequest {
            api_username: "merchant".into(),
            action,
            invoice_id: 42,
            amount: dec!(10.00),
            currency: "USD".into(),
            customer_id: 7,
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            return_url: "https://billing.example.com/callback".into(),
            ..Default::default()
        };
        request.verification_hash = request.hash_input().digest("sharedsecret").into_string();
        request
    }

    fn submit_request(card_number: &str) -> SubmitRequest {
        SubmitRequest {
            api_username: "merchant".into(),
            action: Action::Payment,
            invoice_id: 42,
            amount: dec!(10.00),
            currency: "USD".into(),
            customer_id: 7,
            card_type: "Visa".into(),
            card_number: card_number.into(),
            card_exp_month: "3".into(),
            card_exp_year: "2031".into(),
            card_cvv: "123".into(),
            return_url: "https://billing.example.com/callback".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_payment_page() {
        let html = render_hosted_page(&config(), &page_request(Action::Payment), today()).unwrap();

        assert!(html.contains("<title>Make a payment</title>"));
        assert!(html.contains("Pay 10.00 USD Now"));
        assert!(html.contains(r#"name="invoice_id" value="42""#));
        assert!(html.contains(r#"name="first_name" class="form-control" value="Ada" required"#));
        assert!(html.contains("<option>American Express</option>"));
        assert!(html.contains("<option>01</option>"));
        assert!(html.contains("<option>26</option>"));
        assert!(html.contains("<option>38</option>"));
        assert!(!html.contains("<option>39</option>"));
    }

    #[test]
    fn test_card_page() {
        let html = render_hosted_page(&config(), &page_request(Action::Create), today()).unwrap();
        assert!(html.contains("Update card details</title>"));
        assert!(html.contains("Save Changes"));
    }

    #[test]
    fn test_tampered_request_rejected() {
        let mut request = page_request(Action::Payment);
        request.amount = dec!(0.01);

        assert!(matches!(
            render_hosted_page(&config(), &request, today()),
            Err(GatewayError::InvalidHash)
        ));

        let lax = config().with_verify_hash(false);
        assert!(render_hosted_page(&lax, &request, today()).is_ok());
    }

    #[test]
    fn test_page_escapes_values() {
        let mut request = page_request(Action::Create);
        request.city = "<script>alert(1)</script>".into();

        let html = render_hosted_page(&config(), &request, today()).unwrap();
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_submission_redirect() {
        let redirect = process_submission(&config(), &submit_request("4111 1111 1111 1111")).unwrap();
        let query = &redirect.query;

        assert!(query.success);
        assert_eq!(query.card_last_four, "1111");
        assert_eq!(query.card_expiry_date, "0331");
        assert_eq!(query.transaction_id.len(), 6);
        assert!(query.card_token.starts_with("abc"));

        assert!(redirect.location.starts_with("https://billing.example.com/callback?success=1&action=payment&invoice_id=42"));
        assert!(!redirect.location.contains("4111111111111111"));
        assert!(!redirect.location.contains("card_cvv"));

        let expected = HashInput {
            api_username: "merchant",
            customer_id: 7,
            invoice_id: 42,
            amount: dec!(10.00),
            currency: "USD",
            token: &query.card_token,
        }
        .digest("sharedsecret");
        assert_eq!(query.verification_hash, expected.as_str());
    }

    #[test]
    fn test_invalid_card_declined() {
        for number in ["", "1234", "4111-abcd-1111-1111"] {
            let redirect = process_submission(&config(), &submit_request(number)).unwrap();
            assert!(!redirect.query.success, "{number}");
            assert!(redirect.query.card_token.is_empty());
            assert!(redirect.location.contains("success=0"));
        }
    }

    #[test]
    fn test_return_url_with_query() {
        let mut request = submit_request("4111111111111111");
        request.return_url = "https://billing.example.com/cb?x=1".into();

        let redirect = process_submission(&config(), &request).unwrap();
        assert!(redirect.location.starts_with("https://billing.example.com/cb?x=1&success=1"));

        request.return_url = String::new();
        assert!(process_submission(&config(), &request).is_err());
    }

    #[test]
    fn test_debug_redacts_card() {
        let rendered = format!("{:?}", submit_request("4111111111111111"));
        assert!(!rendered.contains("4111111111111111"));
        assert!(!rendered.contains("123"));
    }

    #[test]
    fn test_two_digits() {
        assert_eq!(two_digits("3"), "03");
        assert_eq!(two_digits("12"), "12");
        assert_eq!(two_digits("2031"), "31");
        assert_eq!(two_digits(""), "00");
    }
}

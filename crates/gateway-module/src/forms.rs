//! Outbound Form Builders
//!
//! Build the hidden-field forms the host drops into its page to open the
//! hosted card page. Values pass through askama, so every one of them is
//! HTML-escaped.

use askama::Template;
use rust_decimal::Decimal;

use crate::config::GatewayConfig;
use crate::error::Result;
use crate::hash::HashInput;
use crate::params::{Action, ClientDetails, RemoteInputParams, RemoteUpdateParams, SystemParams};

/// Path of the hosted card page, relative to the system URL
pub const HOSTED_PAGE_PATH: &str = "demo/remote-iframe-demo";

/// Path of the callback endpoint, relative to the system URL
pub const CALLBACK_PATH: &str = "modules/gateways/callback/remoteinputgateway";

/// A single `<input type="hidden">`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HiddenField {
    pub name: &'static str,
    pub value: String,
}

impl HiddenField {
    fn new(name: &'static str, value: impl ToString) -> Self {
        Self {
            name,
            value: value.to_string(),
        }
    }
}

#[derive(Template)]
#[template(path = "remote_input.html")]
struct RemoteInputForm<'a> {
    form_action: &'a str,
    fields: &'a [HiddenField],
}

#[derive(Template)]
#[template(path = "remote_update.html")]
struct RemoteUpdateForm<'a> {
    form_action: &'a str,
    fields: &'a [HiddenField],
}

/// Hidden fields for a new payment or a new stored card
pub fn remote_input_fields(config: &GatewayConfig, params: &RemoteInputParams) -> Vec<HiddenField> {
    let action = Action::for_amount(params.amount);
    let hash = HashInput {
        api_username: &config.api_username,
        customer_id: params.client.id,
        invoice_id: params.invoice_id,
        amount: params.amount,
        currency: &params.currency,
        token: "",
    }
    .digest(&config.api_password);

    let mut fields = vec![
        HiddenField::new("action", action.as_str()),
        HiddenField::new("api_username", &config.api_username),
        HiddenField::new("invoice_id", params.invoice_id),
        HiddenField::new("amount", params.amount),
        HiddenField::new("currency", &params.currency),
    ];
    fields.extend(client_fields(&params.client));
    fields.push(HiddenField::new("return_url", callback_url(&params.system)));
    fields.push(HiddenField::new("verification_hash", hash));
    fields
}

/// Hidden fields for replacing the card behind an existing token
///
/// Nothing is charged: amount, currency and invoice are zeroed and the
/// existing token is bound into the hash.
pub fn remote_update_fields(config: &GatewayConfig, params: &RemoteUpdateParams) -> Vec<HiddenField> {
    let hash = HashInput {
        api_username: &config.api_username,
        customer_id: params.client.id,
        invoice_id: 0,
        amount: Decimal::ZERO,
        currency: "",
        token: &params.gateway_id,
    }
    .digest(&config.api_password);

    let mut fields = vec![
        HiddenField::new("api_username", &config.api_username),
        HiddenField::new("card_token", &params.gateway_id),
        HiddenField::new("action", Action::Update.as_str()),
        HiddenField::new("invoice_id", 0),
        HiddenField::new("amount", 0),
        HiddenField::new("currency", ""),
    ];
    fields.extend(client_fields(&params.client));
    fields.push(HiddenField::new("return_url", callback_url(&params.system)));
    fields.push(HiddenField::new("verification_hash", hash));
    // Lets the callback find the pay method being updated
    fields.push(HiddenField::new("custom_reference", params.pay_method_id));
    fields
}

/// Render the new payment / new card form
pub fn remote_input(config: &GatewayConfig, params: &RemoteInputParams) -> Result<String> {
    let fields = remote_input_fields(config, params);
    let form_action = params.system.url(HOSTED_PAGE_PATH);

    tracing::debug!(
        invoice_id = params.invoice_id,
        customer_id = params.client.id,
        action = %Action::for_amount(params.amount).as_str(),
        "Building remote input form"
    );

    Ok(RemoteInputForm {
        form_action: &form_action,
        fields: &fields,
    }
    .render()?)
}

/// Render the card update form and its target iframe
pub fn remote_update(config: &GatewayConfig, params: &RemoteUpdateParams) -> Result<String> {
    let fields = remote_update_fields(config, params);
    let form_action = params.system.url(HOSTED_PAGE_PATH);

    tracing::debug!(
        customer_id = params.client.id,
        pay_method_id = params.pay_method_id,
        "Building remote update form"
    );

    Ok(RemoteUpdateForm {
        form_action: &form_action,
        fields: &fields,
    }
    .render()?)
}

fn callback_url(system: &SystemParams) -> String {
    system.url(CALLBACK_PATH)
}

fn client_fields(client: &ClientDetails) -> [HiddenField; 11] {
    [
        HiddenField::new("customer_id", client.id),
        HiddenField::new("first_name", &client.first_name),
        HiddenField::new("last_name", &client.last_name),
        HiddenField::new("email", &client.email),
        HiddenField::new("address1", &client.address1),
        HiddenField::new("address2", &client.address2),
        HiddenField::new("city", &client.city),
        HiddenField::new("state", &client.state),
        HiddenField::new("postcode", &client.postcode),
        HiddenField::new("country", &client.country),
        HiddenField::new("phonenumber", &client.phone_number),
    ]
}

//! Host Platform
//!
//! The billing platform functions this module calls into. Invoice lookup,
//! payment recording and pay method storage all live on the host side.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::config::GatewayConfig;
use crate::error::{GatewayError, Result};
use crate::params::CardSummary;

/// Raw request fields, written verbatim to the gateway log
pub type RequestLog = BTreeMap<String, String>;

/// Gateway settings as stored by the host
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GatewayVariables {
    /// Module name recorded against payments and log entries
    pub payment_method: String,

    /// Whether an admin has activated the module
    pub active: bool,

    pub config: GatewayConfig,
}

/// Host platform trait (Strategy pattern)
///
/// Every call is fallible; callers decide whether a failure aborts the
/// request or is reported back to the user.
#[async_trait]
pub trait HostPlatform: Send + Sync {
    /// Fetch the stored configuration for a gateway module
    async fn gateway_variables(&self, module: &str) -> Result<Option<GatewayVariables>>;

    /// Validate that an invoice exists and can take a payment
    async fn check_invoice_id(&self, invoice_id: u64, gateway: &str) -> Result<u64>;

    /// Fail if a payment with this transaction id was already recorded
    async fn check_transaction_id(&self, transaction_id: &str) -> Result<()>;

    /// Append an entry to the gateway transaction log
    async fn log_transaction(&self, gateway: &str, data: &RequestLog, status: &str) -> Result<()>;

    /// Store the card token against the client owning the invoice
    async fn save_remote_card(&self, invoice_id: u64, card: &CardSummary) -> Result<u64>;

    /// Apply a payment to an invoice
    async fn add_invoice_payment(
        &self,
        invoice_id: u64,
        transaction_id: &str,
        amount: Decimal,
        fees: Decimal,
        gateway: &str,
    ) -> Result<()>;

    /// Send a templated email related to an entity
    async fn send_message(&self, template: &str, related_id: u64) -> Result<()>;

    /// Create a new card pay method for a client, returning its id
    async fn create_card_pay_method(
        &self,
        client_id: u64,
        gateway: &str,
        card: &CardSummary,
    ) -> Result<u64>;

    /// Replace the expiry and token of an existing card pay method
    async fn update_card_pay_method(
        &self,
        client_id: u64,
        pay_method_id: u64,
        expiry_date: &str,
        token: &str,
    ) -> Result<()>;
}

/// Invoice lifecycle
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Unpaid,
    Paid,
    Cancelled,
}

/// A payment applied to an invoice
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InvoicePayment {
    pub transaction_id: String,
    pub amount: Decimal,
    pub fees: Decimal,
    pub gateway: String,
    pub received_at: DateTime<Utc>,
}

/// Invoice record
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Invoice {
    pub id: u64,
    pub client_id: u64,
    pub total: Decimal,
    pub currency: String,
    pub status: InvoiceStatus,
    pub payments: Vec<InvoicePayment>,
}

impl Invoice {
    pub fn new(id: u64, client_id: u64, total: Decimal, currency: impl Into<String>) -> Self {
        Self {
            id,
            client_id,
            total,
            currency: currency.into(),
            status: InvoiceStatus::Unpaid,
            payments: Vec::new(),
        }
    }

    /// Sum of all payments received
    pub fn amount_paid(&self) -> Decimal {
        self.payments.iter().map(|p| p.amount).sum()
    }

    /// Remaining balance
    pub fn balance(&self) -> Decimal {
        (self.total - self.amount_paid()).max(Decimal::ZERO)
    }
}

/// Stored card credential
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PayMethod {
    pub id: u64,
    pub client_id: u64,
    pub gateway: String,
    pub card: CardSummary,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Gateway log entry
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransactionLogEntry {
    pub gateway: String,
    pub data: RequestLog,
    pub status: String,
    pub logged_at: DateTime<Utc>,
}

/// Email sent through the host
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SentMessage {
    pub template: String,
    pub related_id: u64,
}

/// In-memory host platform (for development and tests)
pub struct MemoryHost {
    gateways: RwLock<HashMap<String, GatewayVariables>>,
    invoices: RwLock<HashMap<u64, Invoice>>,
    pay_methods: RwLock<HashMap<u64, PayMethod>>,
    next_pay_method_id: AtomicU64,
    transaction_log: RwLock<Vec<TransactionLogEntry>>,
    messages: RwLock<Vec<SentMessage>>,
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryHost {
    pub fn new() -> Self {
        Self {
            gateways: RwLock::new(HashMap::new()),
            invoices: RwLock::new(HashMap::new()),
            pay_methods: RwLock::new(HashMap::new()),
            next_pay_method_id: AtomicU64::new(1),
            transaction_log: RwLock::new(Vec::new()),
            messages: RwLock::new(Vec::new()),
        }
    }

    /// Register a module as active with the given settings
    pub async fn activate_gateway(&self, module: &str, config: GatewayConfig) {
        self.gateways.write().await.insert(
            module.to_string(),
            GatewayVariables {
                payment_method: module.to_string(),
                active: true,
                config,
            },
        );
    }

    /// Switch a module off while keeping its settings
    pub async fn deactivate_gateway(&self, module: &str) {
        if let Some(vars) = self.gateways.write().await.get_mut(module) {
            vars.active = false;
        }
    }

    /// Add or replace an invoice
    pub async fn insert_invoice(&self, invoice: Invoice) {
        self.invoices.write().await.insert(invoice.id, invoice);
    }

    pub async fn invoice(&self, id: u64) -> Option<Invoice> {
        self.invoices.read().await.get(&id).cloned()
    }

    pub async fn pay_method(&self, id: u64) -> Option<PayMethod> {
        self.pay_methods.read().await.get(&id).cloned()
    }

    /// All pay methods stored for a client, oldest first
    pub async fn pay_methods_for(&self, client_id: u64) -> Vec<PayMethod> {
        let mut methods: Vec<_> = self
            .pay_methods
            .read()
            .await
            .values()
            .filter(|m| m.client_id == client_id)
            .cloned()
            .collect();
        methods.sort_by_key(|m| m.id);
        methods
    }

    pub async fn pay_method_count(&self) -> usize {
        self.pay_methods.read().await.len()
    }

    /// Number of payments applied across all invoices
    pub async fn payment_count(&self) -> usize {
        self.invoices
            .read()
            .await
            .values()
            .map(|i| i.payments.len())
            .sum()
    }

    pub async fn transaction_log(&self) -> Vec<TransactionLogEntry> {
        self.transaction_log.read().await.clone()
    }

    pub async fn messages(&self) -> Vec<SentMessage> {
        self.messages.read().await.clone()
    }

    async fn insert_pay_method(&self, client_id: u64, gateway: &str, card: &CardSummary) -> u64 {
        let id = self.next_pay_method_id.fetch_add(1, Ordering::SeqCst);
        let now = Utc::now();

        self.pay_methods.write().await.insert(
            id,
            PayMethod {
                id,
                client_id,
                gateway: gateway.to_string(),
                card: card.clone(),
                created_at: now,
                updated_at: now,
            },
        );

        id
    }
}

#[async_trait]
impl HostPlatform for MemoryHost {
    async fn gateway_variables(&self, module: &str) -> Result<Option<GatewayVariables>> {
        Ok(self.gateways.read().await.get(module).cloned())
    }

    async fn check_invoice_id(&self, invoice_id: u64, gateway: &str) -> Result<u64> {
        let invoices = self.invoices.read().await;
        let invoice = invoices
            .get(&invoice_id)
            .ok_or(GatewayError::InvoiceNotFound(invoice_id))?;

        if invoice.status != InvoiceStatus::Unpaid {
            tracing::warn!(invoice_id, gateway, status = ?invoice.status, "Invoice not payable");
            return Err(GatewayError::InvoiceNotPayable(invoice_id));
        }

        Ok(invoice.id)
    }

    async fn check_transaction_id(&self, transaction_id: &str) -> Result<()> {
        let seen = self
            .invoices
            .read()
            .await
            .values()
            .flat_map(|i| &i.payments)
            .any(|p| p.transaction_id == transaction_id);

        if seen {
            return Err(GatewayError::DuplicateTransaction(transaction_id.to_string()));
        }
        Ok(())
    }

    async fn log_transaction(&self, gateway: &str, data: &RequestLog, status: &str) -> Result<()> {
        self.transaction_log.write().await.push(TransactionLogEntry {
            gateway: gateway.to_string(),
            data: data.clone(),
            status: status.to_string(),
            logged_at: Utc::now(),
        });
        Ok(())
    }

    async fn save_remote_card(&self, invoice_id: u64, card: &CardSummary) -> Result<u64> {
        if card.token.is_empty() {
            return Err(GatewayError::Host("Remote token is required".into()));
        }

        let client_id = self
            .invoices
            .read()
            .await
            .get(&invoice_id)
            .map(|i| i.client_id)
            .ok_or(GatewayError::InvoiceNotFound(invoice_id))?;

        let gateway = crate::config::MODULE_NAME;
        Ok(self.insert_pay_method(client_id, gateway, card).await)
    }

    async fn add_invoice_payment(
        &self,
        invoice_id: u64,
        transaction_id: &str,
        amount: Decimal,
        fees: Decimal,
        gateway: &str,
    ) -> Result<()> {
        let mut invoices = self.invoices.write().await;
        let invoice = invoices
            .get_mut(&invoice_id)
            .ok_or(GatewayError::InvoiceNotFound(invoice_id))?;

        if invoice
            .payments
            .iter()
            .any(|p| p.transaction_id == transaction_id)
        {
            return Err(GatewayError::DuplicateTransaction(transaction_id.to_string()));
        }

        invoice.payments.push(InvoicePayment {
            transaction_id: transaction_id.to_string(),
            amount,
            fees,
            gateway: gateway.to_string(),
            received_at: Utc::now(),
        });

        if invoice.balance().is_zero() {
            invoice.status = InvoiceStatus::Paid;
        }

        Ok(())
    }

    async fn send_message(&self, template: &str, related_id: u64) -> Result<()> {
        self.messages.write().await.push(SentMessage {
            template: template.to_string(),
            related_id,
        });
        Ok(())
    }

    async fn create_card_pay_method(
        &self,
        client_id: u64,
        gateway: &str,
        card: &CardSummary,
    ) -> Result<u64> {
        if client_id == 0 {
            return Err(GatewayError::Host("Client ID not found".into()));
        }
        if card.token.is_empty() {
            return Err(GatewayError::Host("Remote token is required".into()));
        }

        Ok(self.insert_pay_method(client_id, gateway, card).await)
    }

    async fn update_card_pay_method(
        &self,
        client_id: u64,
        pay_method_id: u64,
        expiry_date: &str,
        token: &str,
    ) -> Result<()> {
        let mut methods = self.pay_methods.write().await;
        let method = methods
            .get_mut(&pay_method_id)
            .filter(|m| m.client_id == client_id)
            .ok_or(GatewayError::PayMethodNotFound(pay_method_id))?;

        method.card.expiry_date = expiry_date.to_string();
        method.card.token = token.to_string();
        method.updated_at = Utc::now();

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn card(token: &str) -> CardSummary {
        CardSummary {
            card_type: "Visa".into(),
            last_four: "1111".into(),
            expiry_date: "1230".into(),
            token: token.into(),
        }
    }

    #[tokio::test]
    async fn test_invoice_paid_in_full() {
        let host = MemoryHost::new();
        host.insert_invoice(Invoice::new(42, 7, dec!(10.00), "USD")).await;

        assert_eq!(host.check_invoice_id(42, "gw").await.unwrap(), 42);
        host.add_invoice_payment(42, "T1", dec!(10.00), dec!(0), "gw")
            .await
            .unwrap();

        let invoice = host.invoice(42).await.unwrap();
        assert_eq!(invoice.status, InvoiceStatus::Paid);
        assert!(matches!(
            host.check_invoice_id(42, "gw").await,
            Err(GatewayError::InvoiceNotPayable(42))
        ));
    }

    #[tokio::test]
    async fn test_partial_payment_stays_unpaid() {
        let host = MemoryHost::new();
        host.insert_invoice(Invoice::new(1, 7, dec!(25.00), "USD")).await;
        host.add_invoice_payment(1, "T1", dec!(10.00), dec!(0.50), "gw")
            .await
            .unwrap();

        let invoice = host.invoice(1).await.unwrap();
        assert_eq!(invoice.status, InvoiceStatus::Unpaid);
        assert_eq!(invoice.balance(), dec!(15.00));
        assert!(matches!(
            host.add_invoice_payment(1, "T1", dec!(1.00), dec!(0), "gw").await,
            Err(GatewayError::DuplicateTransaction(_))
        ));
    }

    #[tokio::test]
    async fn test_check_transaction_id() {
        let host = MemoryHost::new();
        host.insert_invoice(Invoice::new(1, 7, dec!(25.00), "USD")).await;
        assert!(host.check_transaction_id("T1").await.is_ok());

        host.add_invoice_payment(1, "T1", dec!(10.00), dec!(0), "gw")
            .await
            .unwrap();
        assert!(matches!(
            host.check_transaction_id("T1").await,
            Err(GatewayError::DuplicateTransaction(id)) if id == "T1"
        ));
        assert!(host.check_transaction_id("T2").await.is_ok());
    }

    #[tokio::test]
    async fn test_remote_card_requires_token() {
        let host = MemoryHost::new();
        host.insert_invoice(Invoice::new(1, 7, dec!(25.00), "USD")).await;

        assert!(host.save_remote_card(1, &card("")).await.is_err());
        assert_eq!(host.pay_method_count().await, 0);
        assert!(host.save_remote_card(1, &card("abc1")).await.is_ok());
    }

    #[tokio::test]
    async fn test_unknown_invoice() {
        let host = MemoryHost::new();
        assert!(matches!(
            host.check_invoice_id(99, "gw").await,
            Err(GatewayError::InvoiceNotFound(99))
        ));
        assert!(host.save_remote_card(99, &card("abc1")).await.is_err());
    }

    #[tokio::test]
    async fn test_pay_method_lifecycle() {
        let host = MemoryHost::new();
        let id = host.create_card_pay_method(7, "gw", &card("abc1")).await.unwrap();

        host.update_card_pay_method(7, id, "0131", "abc2").await.unwrap();
        let method = host.pay_method(id).await.unwrap();
        assert_eq!(method.card.token, "abc2");
        assert_eq!(method.card.expiry_date, "0131");
        assert_eq!(method.card.last_four, "1111");

        // Another client's pay method is not visible
        assert!(matches!(
            host.update_card_pay_method(8, id, "0131", "abc3").await,
            Err(GatewayError::PayMethodNotFound(_))
        ));
        assert!(host.create_card_pay_method(0, "gw", &card("abc4")).await.is_err());
        assert_eq!(host.pay_methods_for(7).await.len(), 1);
    }

    #[tokio::test]
    async fn test_gateway_activation() {
        let host = MemoryHost::new();
        assert!(host.gateway_variables("gw").await.unwrap().is_none());

        host.activate_gateway("gw", GatewayConfig::new("user", "secret")).await;
        assert!(host.gateway_variables("gw").await.unwrap().unwrap().active);

        host.deactivate_gateway("gw").await;
        assert!(!host.gateway_variables("gw").await.unwrap().unwrap().active);
    }
}

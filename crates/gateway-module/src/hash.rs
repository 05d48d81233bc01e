//! Verification Hash
//!
//! SHA-1 digest over a fixed, `|`-joined field list plus the shared secret.
//! Producer and verifier must join the fields in exactly this order:
//!
//! ```text
//! api_username | customer_id | invoice_id | amount | currency | secret | token
//! ```

use rust_decimal::Decimal;
use sha1::{Digest, Sha1};

use crate::error::{GatewayError, Result};

const DELIMITER: &str = "|";

/// Hex-encoded verification digest
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerificationHash(String);

impl VerificationHash {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for VerificationHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The semantic fields covered by the hash
#[derive(Clone, Debug)]
pub struct HashInput<'a> {
    pub api_username: &'a str,
    pub customer_id: u64,
    pub invoice_id: u64,
    pub amount: Decimal,
    pub currency: &'a str,
    /// Empty for new payments and cards; the stored token otherwise
    pub token: &'a str,
}

impl HashInput<'_> {
    /// Compute the digest with the shared secret
    pub fn digest(&self, secret: &str) -> VerificationHash {
        let customer_id = self.customer_id.to_string();
        let invoice_id = self.invoice_id.to_string();
        let amount = self.amount.to_string();

        let joined = [
            self.api_username,
            customer_id.as_str(),
            invoice_id.as_str(),
            amount.as_str(),
            self.currency,
            secret,
            self.token,
        ]
        .join(DELIMITER);

        VerificationHash(hex::encode(Sha1::digest(joined.as_bytes())))
    }

    /// Check a supplied hash against the recomputed one
    pub fn verify(&self, secret: &str, supplied: &str) -> Result<()> {
        let expected = self.digest(secret);
        if constant_time_eq(expected.as_str().as_bytes(), supplied.trim().as_bytes()) {
            Ok(())
        } else {
            tracing::warn!(
                customer_id = self.customer_id,
                invoice_id = self.invoice_id,
                "Verification hash mismatch"
            );
            Err(GatewayError::InvalidHash)
        }
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn input() -> HashInput<'static> {
        HashInput {
            api_username: "merchant",
            customer_id: 7,
            invoice_id: 42,
            amount: dec!(10.00),
            currency: "USD",
            token: "",
        }
    }

    #[test]
    fn test_known_digest() {
        // sha1("merchant|7|42|10.00|USD|sharedsecret|")
        let expected = hex::encode(Sha1::digest(b"merchant|7|42|10.00|USD|sharedsecret|"));
        assert_eq!(input().digest("sharedsecret").as_str(), expected);
        assert_eq!(expected.len(), 40);
    }

    #[test]
    fn test_digest_is_deterministic() {
        assert_eq!(input().digest("s3cret"), input().digest("s3cret"));
    }

    #[test]
    fn test_every_field_changes_digest() {
        let base = input().digest("s3cret");

        let variants = [
            HashInput { api_username: "other", ..input() },
            HashInput { customer_id: 8, ..input() },
            HashInput { invoice_id: 43, ..input() },
            HashInput { amount: dec!(10.01), ..input() },
            HashInput { currency: "EUR", ..input() },
            HashInput { token: "abc123456", ..input() },
        ];
        for variant in variants {
            assert_ne!(variant.digest("s3cret"), base, "{variant:?}");
        }
        assert_ne!(input().digest("other-secret"), base);
    }

    #[test]
    fn test_verify() {
        let hash = input().digest("s3cret");
        assert!(input().verify("s3cret", hash.as_str()).is_ok());
        assert!(matches!(
            input().verify("s3cret", "deadbeef"),
            Err(GatewayError::InvalidHash)
        ));
        assert!(matches!(
            input().verify("wrong", hash.as_str()),
            Err(GatewayError::InvalidHash)
        ));
        assert!(input().verify("s3cret", "").is_err());
    }
}

//! Funds-transfer collaborator client.
//!
//! Executes the actual money movement for a merchant payout batch. Every
//! transfer carries a deterministic idempotency key derived from the batch,
//! so a retried request after a timeout or crash cannot move money twice.

use crate::config::TransferConfig;
use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use reqwest::Client;
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Client for the external transfer provider.
#[derive(Clone)]
pub struct TransferClient {
    client: Client,
    config: TransferConfig,
}

/// Request to create a transfer.
#[derive(Debug, Serialize)]
pub struct CreateTransferRequest {
    /// Merchant account the funds go to.
    pub merchant_id: Uuid,
    /// Amount in major units.
    pub amount: Decimal,
    /// Currency code (e.g., "EUR").
    pub currency: String,
    /// Provider-side deduplication key for this batch.
    pub idempotency_key: String,
}

/// Receipt returned by the transfer provider.
#[derive(Debug, Clone, Deserialize)]
pub struct TransferReceipt {
    /// Provider transfer identifier, stamped onto paid payout items.
    pub id: String,
    /// Transfer status as reported by the provider.
    pub status: String,
}

/// Provider error response body.
#[derive(Debug, Deserialize)]
struct TransferError {
    error: String,
}

impl TransferClient {
    pub fn new(config: TransferConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// Whether provider credentials are configured.
    pub fn is_configured(&self) -> bool {
        !self.config.api_base_url.is_empty() && !self.config.api_key.expose_secret().is_empty()
    }

    /// Deterministic idempotency key for a merchant payout batch. Re-running
    /// the same `(merchant, cutoff)` batch produces the same key, which the
    /// provider deduplicates.
    pub fn idempotency_key(merchant_id: Uuid, cutoff: NaiveDate) -> String {
        format!("payout-{}-{}", merchant_id, cutoff)
    }

    /// Execute a transfer for one merchant payout batch.
    pub async fn create_transfer(
        &self,
        merchant_id: Uuid,
        amount: Decimal,
        cutoff: NaiveDate,
    ) -> Result<TransferReceipt> {
        if !self.is_configured() {
            return Err(anyhow!("Transfer provider credentials not configured"));
        }

        let request = CreateTransferRequest {
            merchant_id,
            amount,
            currency: "EUR".to_string(),
            idempotency_key: Self::idempotency_key(merchant_id, cutoff),
        };

        let url = format!("{}/transfers", self.config.api_base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(self.config.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| anyhow!("Transfer request failed: {}", e))?;

        if response.status().is_success() {
            response
                .json::<TransferReceipt>()
                .await
                .map_err(|e| anyhow!("Failed to parse transfer receipt: {}", e))
        } else {
            let status = response.status();
            let detail = response
                .json::<TransferError>()
                .await
                .map(|e| e.error)
                .unwrap_or_else(|_| "unknown provider error".to_string());
            Err(anyhow!("Transfer provider returned {}: {}", status, detail))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::Secret;

    fn test_config() -> TransferConfig {
        TransferConfig {
            api_base_url: "https://transfers.test/v1".to_string(),
            api_key: Secret::new("test_key".to_string()),
        }
    }

    #[test]
    fn test_is_configured() {
        let client = TransferClient::new(test_config());
        assert!(client.is_configured());

        let empty_config = TransferConfig {
            api_base_url: "".to_string(),
            api_key: Secret::new("".to_string()),
        };
        let client = TransferClient::new(empty_config);
        assert!(!client.is_configured());
    }

    #[test]
    fn test_idempotency_key_is_deterministic() {
        let merchant_id = Uuid::nil();
        let cutoff = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let key = TransferClient::idempotency_key(merchant_id, cutoff);
        assert_eq!(
            key,
            "payout-00000000-0000-0000-0000-000000000000-2024-03-15"
        );
        assert_eq!(key, TransferClient::idempotency_key(merchant_id, cutoff));
    }
}

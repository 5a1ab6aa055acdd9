//! Payout Notification Boundary
//!
//! The core emits fire-and-forget payout notices; delivery is an
//! external collaborator's job and a delivery failure never touches
//! settlement state.

use async_trait::async_trait;
use mart_common::Paise;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Notification delivery error
#[derive(Debug, Error)]
pub enum NotifyError {
    /// Downstream delivery failed
    #[error("notification delivery failed: {0}")]
    Delivery(String),
}

/// Payout-processed notice sent to the merchant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayoutNotice {
    /// Merchant being paid
    pub merchant_id: Uuid,
    /// Payout amount in paise
    pub amount_paise: Paise,
    /// Masked bank reference
    pub masked_account: String,
    /// Settlement reference (invoice number)
    pub settlement_reference: String,
}

/// Outbound notification channel for payout events
#[async_trait]
pub trait PayoutNotifier: Send + Sync {
    /// Deliver a payout-processed notice
    async fn payout_processed(&self, notice: PayoutNotice) -> Result<(), NotifyError>;
}

/// Tracing-backed notifier used when no email collaborator is wired in
pub struct LogNotifier;

#[async_trait]
impl PayoutNotifier for LogNotifier {
    async fn payout_processed(&self, notice: PayoutNotice) -> Result<(), NotifyError> {
        tracing::info!(
            "payout processed: merchant={} amount={} account={} ref={}",
            notice.merchant_id,
            notice.amount_paise,
            notice.masked_account,
            notice.settlement_reference
        );
        Ok(())
    }
}

//! Payout Batcher
//!
//! For an invoiced cycle, nets each merchant's paid order value against
//! their platform invoice and creates one payout batch per invoice. An
//! existing batch for the same (merchant, invoice) pair means a previous
//! run already settled it - skip, never double-pay.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use mart_common::{mask_account, Merchant, Paise};
use mart_ledger::{EntryDraft, EntryStatus, EntryType, Ledger, OrderBook};

use crate::cycles::SettlementCycle;
use crate::invoicing::{InvoiceGenerator, InvoiceStatus, PlatformInvoice};
use crate::notify::{PayoutNotice, PayoutNotifier};
use crate::SettleError;

/// Payout batch status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PayoutStatus {
    /// Created, awaiting gateway execution
    Pending,
    /// Submitted to the gateway
    Processing,
    /// Confirmed by the gateway
    Completed,
    /// Gateway failure
    Failed,
}

/// Payout batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayoutBatch {
    /// Batch id
    pub id: Uuid,
    /// Merchant being paid
    pub merchant_id: Uuid,
    /// Cycle the batch settles
    pub cycle_id: Uuid,
    /// Platform invoice netted against
    pub platform_invoice_id: Uuid,
    /// Net payout amount in paise
    pub total_paise: Paise,
    /// Batch status
    pub status: PayoutStatus,
    /// Gateway payout reference, once processed
    pub gateway_payout_id: Option<String>,
    /// When the gateway confirmed the payout
    pub processed_at: Option<DateTime<Utc>>,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
}

/// Payout batcher
pub struct PayoutBatcher {
    orders: Arc<OrderBook>,
    invoicing: Arc<InvoiceGenerator>,
    ledger: Arc<Ledger>,
    notifier: Arc<dyn PayoutNotifier>,
    batches: Arc<RwLock<HashMap<Uuid, PayoutBatch>>>,
}

impl PayoutBatcher {
    /// Create a batcher
    pub fn new(
        orders: Arc<OrderBook>,
        invoicing: Arc<InvoiceGenerator>,
        ledger: Arc<Ledger>,
        notifier: Arc<dyn PayoutNotifier>,
    ) -> Self {
        Self {
            orders,
            invoicing,
            ledger,
            notifier,
            batches: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Existing batch for a (merchant, invoice) pair - the double-payout
    /// guard.
    pub fn existing_for(&self, merchant_id: Uuid, invoice_id: Uuid) -> Option<PayoutBatch> {
        self.batches
            .read()
            .values()
            .find(|b| b.merchant_id == merchant_id && b.platform_invoice_id == invoice_id)
            .cloned()
    }

    /// Net one merchant's invoice against their paid orders in the cycle
    /// period and create the payout batch.
    ///
    /// Returns `Ok(None)` for the skip cases: invoice cancelled, batch
    /// already exists, or a non-positive net amount.
    pub async fn settle_invoice(
        &self,
        merchant: &Merchant,
        invoice: &PlatformInvoice,
        cycle: &SettlementCycle,
    ) -> Result<Option<PayoutBatch>, SettleError> {
        if invoice.status == InvoiceStatus::Cancelled {
            return Ok(None);
        }
        if self.existing_for(invoice.merchant_id, invoice.id).is_some() {
            tracing::debug!(
                "payout batch already exists for merchant {} invoice {}",
                invoice.merchant_id,
                invoice.id
            );
            return Ok(None);
        }

        let net_payable =
            self.orders
                .net_payable_in_period(invoice.merchant_id, cycle.period_start, cycle.period_end);
        let payout_amount = net_payable - invoice.total;
        if payout_amount <= 0 {
            tracing::debug!(
                "non-positive payout {} for merchant {}, skipping",
                payout_amount,
                invoice.merchant_id
            );
            return Ok(None);
        }

        let batch = PayoutBatch {
            id: Uuid::new_v4(),
            merchant_id: invoice.merchant_id,
            cycle_id: cycle.id,
            platform_invoice_id: invoice.id,
            total_paise: payout_amount,
            status: PayoutStatus::Pending,
            gateway_payout_id: None,
            processed_at: None,
            created_at: Utc::now(),
        };
        self.batches.write().insert(batch.id, batch.clone());
        self.invoicing.mark_paid(invoice.id)?;

        // Best-effort notification; a delivery failure must not affect
        // settlement state or the rest of the cycle run.
        let notice = PayoutNotice {
            merchant_id: invoice.merchant_id,
            amount_paise: payout_amount,
            masked_account: merchant
                .bank_account
                .as_deref()
                .map(mask_account)
                .unwrap_or_default(),
            settlement_reference: invoice.invoice_number.clone(),
        };
        if let Err(e) = self.notifier.payout_processed(notice).await {
            tracing::warn!("payout notification failed for merchant {}: {e}", invoice.merchant_id);
        }

        Ok(Some(batch))
    }

    /// Gateway webhook: record the processed payout and its ledger entry.
    pub fn mark_processed(
        &self,
        batch_id: Uuid,
        gateway_payout_id: &str,
    ) -> Result<PayoutBatch, SettleError> {
        let batch = {
            let mut batches = self.batches.write();
            let batch = batches
                .get_mut(&batch_id)
                .ok_or_else(|| SettleError::Payout(format!("batch not found: {batch_id}")))?;
            if batch.status == PayoutStatus::Completed || batch.status == PayoutStatus::Failed {
                return Err(SettleError::Payout(format!(
                    "batch {batch_id} is {:?}, cannot process",
                    batch.status
                )));
            }
            batch.status = PayoutStatus::Completed;
            batch.gateway_payout_id = Some(gateway_payout_id.into());
            batch.processed_at = Some(Utc::now());
            batch.clone()
        };

        self.ledger.record(EntryDraft {
            merchant_id: batch.merchant_id,
            order_id: None,
            entry_type: EntryType::PayoutProcessed,
            amount_paise: batch.total_paise,
            description: format!("payout processed via gateway ref {gateway_payout_id}"),
            status: EntryStatus::Completed,
        });
        Ok(batch)
    }

    /// Gateway webhook: record a failed payout attempt.
    pub fn mark_failed(&self, batch_id: Uuid) -> Result<PayoutBatch, SettleError> {
        let mut batches = self.batches.write();
        let batch = batches
            .get_mut(&batch_id)
            .ok_or_else(|| SettleError::Payout(format!("batch not found: {batch_id}")))?;
        if batch.status == PayoutStatus::Completed {
            return Err(SettleError::Payout(format!(
                "batch {batch_id} already completed"
            )));
        }
        batch.status = PayoutStatus::Failed;
        Ok(batch.clone())
    }

    /// Batches for a merchant
    pub fn for_merchant(&self, merchant_id: Uuid) -> Vec<PayoutBatch> {
        self.batches
            .read()
            .values()
            .filter(|b| b.merchant_id == merchant_id)
            .cloned()
            .collect()
    }

    /// Batches in a cycle
    pub fn for_cycle(&self, cycle_id: Uuid) -> Vec<PayoutBatch> {
        self.batches
            .read()
            .values()
            .filter(|b| b.cycle_id == cycle_id)
            .cloned()
            .collect()
    }
}

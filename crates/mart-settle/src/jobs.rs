//! Scheduled Job Entry Points
//!
//! The weekly invoice job and the weekly payout job. Both are plain
//! functions an external trigger (cron, HTTP) invokes; both are
//! idempotent, and a merchant that fails mid-loop never stops the rest
//! of the run.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::cycles::{current_period, CycleStatus};
use crate::{SettleError, SettlementPlatform};

/// Per-run outcome counts for a scheduled job
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSummary {
    /// Merchants processed successfully
    pub succeeded: usize,
    /// Merchants skipped (nothing billable, already done, non-positive payout)
    pub skipped: usize,
    /// Merchants that errored; logged and passed over
    pub failed: usize,
}

impl SettlementPlatform {
    /// Weekly invoice job: close the current Friday-Thursday cycle and
    /// generate one platform invoice per merchant with billable fees.
    ///
    /// `today` is the civil date at the trigger (deployments pass the
    /// Asia/Kolkata date). Re-running for the same period is a no-op
    /// once the cycle is Invoiced or Paid.
    pub fn run_invoice_job(&self, today: NaiveDate) -> Result<JobSummary, SettleError> {
        let (start, end) = current_period(today);
        let cycle = self.cycles.open_for_period(start, end);
        if cycle.status != CycleStatus::Draft {
            tracing::info!(
                "cycle {} for {start}..{end} already {:?}, invoice job is a no-op",
                cycle.id,
                cycle.status
            );
            return Ok(JobSummary::default());
        }

        let mut summary = JobSummary::default();
        for merchant in self.merchants.all() {
            match self.invoicing.generate(&merchant, &cycle, today) {
                Ok(Some(invoice)) => {
                    tracing::info!(
                        "issued invoice {} to merchant {} for {}",
                        invoice.invoice_number,
                        merchant.id,
                        invoice.total
                    );
                    summary.succeeded += 1;
                }
                Ok(None) => summary.skipped += 1,
                Err(e) => {
                    tracing::warn!("invoice generation failed for merchant {}: {e}", merchant.id);
                    summary.failed += 1;
                }
            }
        }

        self.cycles.mark_invoiced(cycle.id)?;
        Ok(summary)
    }

    /// Weekly payout job: pick the most recent Invoiced cycle, net each
    /// non-cancelled invoice against the merchant's paid orders, create
    /// payout batches and advance the cycle to Paid.
    ///
    /// Re-running finds no Invoiced cycle and no-ops.
    pub async fn run_payout_job(&self) -> Result<JobSummary, SettleError> {
        let Some(cycle) = self.cycles.latest_invoiced() else {
            tracing::info!("no invoiced cycle pending, payout job is a no-op");
            return Ok(JobSummary::default());
        };

        let mut summary = JobSummary::default();
        for invoice in self.invoicing.for_cycle(cycle.id) {
            let Some(merchant) = self.merchants.get(invoice.merchant_id) else {
                tracing::warn!("invoice {} references unknown merchant", invoice.id);
                summary.failed += 1;
                continue;
            };
            match self.payouts.settle_invoice(&merchant, &invoice, &cycle).await {
                Ok(Some(batch)) => {
                    tracing::info!(
                        "created payout batch {} of {} for merchant {}",
                        batch.id,
                        batch.total_paise,
                        merchant.id
                    );
                    summary.succeeded += 1;
                }
                Ok(None) => summary.skipped += 1,
                Err(e) => {
                    tracing::warn!("payout failed for merchant {}: {e}", merchant.id);
                    summary.failed += 1;
                }
            }
        }

        self.cycles.mark_paid(cycle.id)?;
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use crate::invoicing::InvoiceStatus;
    use crate::notify::{NotifyError, PayoutNotice, PayoutNotifier};
    use crate::payouts::PayoutStatus;
    use mart_ledger::{EntryStatus, EntryType};

    struct FailingNotifier {
        attempts: AtomicUsize,
    }

    #[async_trait]
    impl PayoutNotifier for FailingNotifier {
        async fn payout_processed(&self, _notice: PayoutNotice) -> Result<(), NotifyError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(NotifyError::Delivery("smtp down".into()))
        }
    }

    fn today() -> chrono::NaiveDate {
        Utc::now().date_naive()
    }

    /// One merchant, two paid orders under default fees.
    fn platform_with_activity() -> (SettlementPlatform, uuid::Uuid) {
        let platform = SettlementPlatform::new();
        let merchant = platform.merchants.register("Kanpur Textiles", "09 - Uttar Pradesh");
        platform.merchants.set_bank_account(merchant.id, "004512349876");

        // Rs 100 order: fee 700, net 9300
        let order = platform.create_order(merchant.id, 10_000).unwrap();
        platform.confirm_payment(order.id).unwrap();
        // Rs 2000 order: fee capped at 2500, net 197500
        let order = platform.create_order(merchant.id, 200_000).unwrap();
        platform.confirm_payment(order.id).unwrap();

        (platform, merchant.id)
    }

    #[test]
    fn test_order_flow_stamps_and_promotes_ledger() {
        let (platform, merchant) = platform_with_activity();

        let entries = platform.ledger.for_merchant(merchant);
        let fees: i64 = entries
            .iter()
            .filter(|e| e.entry_type == EntryType::PlatformFee)
            .map(|e| e.amount_paise)
            .sum();
        assert_eq!(fees, 700 + 2_500);
        assert!(entries
            .iter()
            .filter(|e| e.entry_type != EntryType::PayoutProcessed)
            .all(|e| e.status == EntryStatus::Completed));

        // unpriced merchant fails the whole order, no guessed default
        assert!(platform.create_order(uuid::Uuid::new_v4(), 5_000).is_err());
    }

    #[test]
    fn test_invoice_job_idempotent() {
        let (platform, merchant) = platform_with_activity();

        let first = platform.run_invoice_job(today()).unwrap();
        assert_eq!(first.succeeded, 1);
        assert_eq!(first.failed, 0);

        // Rs 32 fee + 18% GST (576) = 3776 paise invoiced
        let invoices = platform.invoicing.for_merchant(merchant);
        assert_eq!(invoices.len(), 1);
        assert_eq!(invoices[0].subtotal, 3_200);
        assert_eq!(invoices[0].gst_amount, 576);
        assert_eq!(invoices[0].total, 3_776);

        // second run: cycle already Invoiced, nothing new
        let second = platform.run_invoice_job(today()).unwrap();
        assert_eq!(second, JobSummary::default());
        assert_eq!(platform.invoicing.for_merchant(merchant).len(), 1);
    }

    #[test]
    fn test_invoice_job_skips_idle_merchants() {
        let (platform, _) = platform_with_activity();
        platform.merchants.register("Idle Store", "27");

        let summary = platform.run_invoice_job(today()).unwrap();
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.skipped, 1);
    }

    #[tokio::test]
    async fn test_payout_job_nets_and_idempotent() {
        let (platform, merchant) = platform_with_activity();
        platform.run_invoice_job(today()).unwrap();

        let first = platform.run_payout_job().await.unwrap();
        assert_eq!(first.succeeded, 1);

        let batches = platform.payouts.for_merchant(merchant);
        assert_eq!(batches.len(), 1);
        // net payable (9300 + 197500) minus invoice total 3776
        assert_eq!(batches[0].total_paise, 206_800 - 3_776);
        assert_eq!(batches[0].status, PayoutStatus::Pending);

        // invoice flipped to Paid, cycle to Paid
        let invoice = platform.invoicing.for_merchant(merchant).remove(0);
        assert_eq!(invoice.status, InvoiceStatus::Paid);
        assert!(platform.cycles.latest_invoiced().is_none());

        // second run: no invoiced cycle left
        let second = platform.run_payout_job().await.unwrap();
        assert_eq!(second, JobSummary::default());
        assert_eq!(platform.payouts.for_merchant(merchant).len(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_invoice_skips_payout() {
        let (platform, merchant) = platform_with_activity();
        platform.run_invoice_job(today()).unwrap();

        let invoice = platform.invoicing.for_merchant(merchant).remove(0);
        platform.invoicing.cancel(invoice.id).unwrap();

        let summary = platform.run_payout_job().await.unwrap();
        assert_eq!(summary.succeeded, 0);
        assert_eq!(summary.skipped, 1);
        assert!(platform.payouts.for_merchant(merchant).is_empty());
    }

    #[tokio::test]
    async fn test_non_positive_payout_skipped() {
        let platform = SettlementPlatform::new();
        let merchant = platform.merchants.register("Thin Margin", "09");
        // fee-heavy: Rs 1 order, fee eats the whole gross
        let order = platform.create_order(merchant.id, 100).unwrap();
        platform.confirm_payment(order.id).unwrap();

        platform.run_invoice_job(today()).unwrap();
        let summary = platform.run_payout_job().await.unwrap();

        // net payable 0 < invoice total: skip, but the cycle still closes
        assert_eq!(summary.succeeded, 0);
        assert_eq!(summary.skipped, 1);
        assert!(platform.cycles.latest_invoiced().is_none());
        assert!(platform.payouts.for_merchant(merchant.id).is_empty());
    }

    #[tokio::test]
    async fn test_notification_failure_does_not_abort_run() {
        let notifier = Arc::new(FailingNotifier {
            attempts: AtomicUsize::new(0),
        });
        let platform = SettlementPlatform::with_notifier(notifier.clone());

        let a = platform.merchants.register("Store A", "09");
        let b = platform.merchants.register("Store B", "27");
        for merchant in [a.id, b.id] {
            let order = platform.create_order(merchant, 50_000).unwrap();
            platform.confirm_payment(order.id).unwrap();
        }

        platform.run_invoice_job(today()).unwrap();
        let summary = platform.run_payout_job().await.unwrap();

        // both merchants settled despite every notification failing
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 0);
        assert_eq!(notifier.attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_gateway_confirmation_records_ledger_entry() {
        let (platform, merchant) = platform_with_activity();
        platform.run_invoice_job(today()).unwrap();
        platform.run_payout_job().await.unwrap();

        let batch = platform.payouts.for_merchant(merchant).remove(0);
        let processed = platform
            .payouts
            .mark_processed(batch.id, "pout_00042")
            .unwrap();
        assert_eq!(processed.status, PayoutStatus::Completed);
        assert!(processed.processed_at.is_some());

        let processed_entries: Vec<_> = platform
            .ledger
            .for_merchant(merchant)
            .into_iter()
            .filter(|e| e.entry_type == EntryType::PayoutProcessed)
            .collect();
        assert_eq!(processed_entries.len(), 1);
        assert_eq!(processed_entries[0].amount_paise, batch.total_paise);

        // double confirmation is rejected
        assert!(platform.payouts.mark_processed(batch.id, "pout_00042").is_err());
    }
}

//! OpenMart Settlement - Weekly fee settlement pipeline
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                      SETTLEMENT PIPELINE                             │
//! │                                                                      │
//! │  order created ─► fee resolver ─► fee stamped on order               │
//! │  payment webhook ─► ledger entries promoted to COMPLETED             │
//! │                                                                      │
//! │  ┌────────────┐   ┌────────────┐   ┌────────────┐   ┌────────────┐  │
//! │  │   Cycle    │   │  Invoice   │   │  Platform  │   │   Payout   │  │
//! │  │  Manager   │─► │  Numbering │─► │  Invoices  │─► │  Batcher   │  │
//! │  │ (Fri-Thu)  │   │  (atomic)  │   │ (GST split)│   │ (netting)  │  │
//! │  └────────────┘   └────────────┘   └────────────┘   └────────────┘  │
//! │                                                                      │
//! │  cycle: DRAFT ─► INVOICED ─► PAID   (forward-only, idempotent jobs)  │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The two jobs ([`SettlementPlatform::run_invoice_job`] and
//! [`SettlementPlatform::run_payout_job`]) are plain idempotent entry
//! points; cron/HTTP triggering is the caller's concern and there are no
//! internal timers.

#![warn(missing_docs)]

pub mod cycles;
pub mod invoicing;
pub mod jobs;
pub mod notify;
pub mod numbering;
pub mod payouts;

pub use cycles::{current_period, CycleManager, CycleStatus, SettlementCycle};
pub use invoicing::{
    FeeTotals, InvoiceGenerator, InvoiceLineItem, InvoiceRenderPayload, InvoiceStatus,
    PlatformInvoice, TaxType,
};
pub use jobs::JobSummary;
pub use notify::{LogNotifier, PayoutNotice, PayoutNotifier};
pub use numbering::{BillingProfile, InvoiceNumbering};
pub use payouts::{PayoutBatch, PayoutBatcher, PayoutStatus};

use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use mart_common::{MerchantDirectory, Paise};
use mart_fees::{platform_fee, FeeError, FeeResolver, PackageRegistry};
use mart_ledger::{
    EntryDraft, EntryStatus, EntryType, Ledger, LedgerError, Order, OrderBook,
};

/// Settlement error types
#[derive(Debug, Error)]
pub enum SettleError {
    /// Cycle state machine violation
    #[error("cycle error: {0}")]
    Cycle(String),

    /// Invoice generation/transition failure
    #[error("invoice error: {0}")]
    Invoice(String),

    /// Payout batching failure
    #[error("payout error: {0}")]
    Payout(String),

    /// Fee resolution failure
    #[error(transparent)]
    Fee(#[from] FeeError),

    /// Ledger failure
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Settlement platform facade wiring the engines together
pub struct SettlementPlatform {
    /// Merchant directory
    pub merchants: Arc<MerchantDirectory>,
    /// Pricing package registry
    pub packages: Arc<PackageRegistry>,
    /// Fee config resolver
    pub fees: Arc<FeeResolver>,
    /// Append-only ledger
    pub ledger: Arc<Ledger>,
    /// Order book
    pub orders: Arc<OrderBook>,
    /// Settlement cycle manager
    pub cycles: Arc<CycleManager>,
    /// Billing profile + invoice numbering
    pub numbering: Arc<InvoiceNumbering>,
    /// Platform invoice generator
    pub invoicing: Arc<InvoiceGenerator>,
    /// Payout batcher
    pub payouts: Arc<PayoutBatcher>,
}

impl SettlementPlatform {
    /// Create a platform with the tracing-backed notifier
    pub fn new() -> Self {
        Self::with_notifier(Arc::new(LogNotifier))
    }

    /// Create a platform with a custom payout notifier
    pub fn with_notifier(notifier: Arc<dyn PayoutNotifier>) -> Self {
        let merchants = Arc::new(MerchantDirectory::new());
        let packages = Arc::new(PackageRegistry::new());
        let fees = Arc::new(FeeResolver::new(merchants.clone(), packages.clone()));
        let ledger = Arc::new(Ledger::new());
        let orders = Arc::new(OrderBook::new());
        let cycles = Arc::new(CycleManager::new());
        let numbering = Arc::new(InvoiceNumbering::new(BillingProfile::default()));
        let invoicing = Arc::new(InvoiceGenerator::new(ledger.clone(), numbering.clone()));
        let payouts = Arc::new(PayoutBatcher::new(
            orders.clone(),
            invoicing.clone(),
            ledger.clone(),
            notifier,
        ));
        Self {
            merchants,
            packages,
            fees,
            ledger,
            orders,
            cycles,
            numbering,
            invoicing,
            payouts,
        }
    }

    /// Create an order: resolve the merchant's effective fee config,
    /// stamp gross/fee/net, and record the pending gross and fee ledger
    /// entries awaiting payment confirmation.
    pub fn create_order(&self, merchant_id: Uuid, gross_paise: Paise) -> Result<Order, SettleError> {
        let config = self.fees.effective_config(merchant_id)?;
        let fee = platform_fee(gross_paise, &config.fee_config());
        let order = self.orders.create(merchant_id, gross_paise, fee);

        self.ledger.record(EntryDraft {
            merchant_id,
            order_id: Some(order.id),
            entry_type: EntryType::GrossOrderValue,
            amount_paise: order.gross_paise,
            description: format!("gross order value for order {}", order.id),
            status: EntryStatus::Pending,
        });
        self.ledger.record(EntryDraft {
            merchant_id,
            order_id: Some(order.id),
            entry_type: EntryType::PlatformFee,
            amount_paise: order.platform_fee_paise,
            description: format!("platform fee for order {}", order.id),
            status: EntryStatus::Pending,
        });

        Ok(order)
    }

    /// Payment webhook: mark the order paid, promote its pending ledger
    /// entries to Completed, and record the payout obligation.
    pub fn confirm_payment(&self, order_id: Uuid) -> Result<Order, SettleError> {
        let order = self.orders.mark_paid(order_id)?;

        for entry in self.ledger.for_order(order_id) {
            if entry.status == EntryStatus::Pending || entry.status == EntryStatus::Processing {
                self.ledger.complete(entry.id)?;
            }
        }

        self.ledger.record(EntryDraft {
            merchant_id: order.merchant_id,
            order_id: Some(order.id),
            entry_type: EntryType::OrderPayout,
            amount_paise: order.net_payable_paise,
            description: format!("net payable for order {}", order.id),
            status: EntryStatus::Completed,
        });

        Ok(order)
    }

    /// Reconciliation hook for a failed payment: fail the order's
    /// pending ledger entries.
    pub fn fail_payment(&self, order_id: Uuid) -> Result<(), SettleError> {
        for entry in self.ledger.for_order(order_id) {
            if entry.status == EntryStatus::Pending || entry.status == EntryStatus::Processing {
                self.ledger.advance_status(entry.id, EntryStatus::Failed)?;
            }
        }
        Ok(())
    }
}

impl Default for SettlementPlatform {
    fn default() -> Self {
        Self::new()
    }
}

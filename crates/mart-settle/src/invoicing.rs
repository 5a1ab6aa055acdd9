//! Platform Invoice Generator
//!
//! Aggregates a merchant's completed platform-fee ledger entries over a
//! cycle period into one tax invoice: subtotal, GST (CGST+SGST when the
//! merchant shares the platform's state, IGST otherwise) and total, with
//! line items. One invoice per (merchant, cycle); a zero billable amount
//! produces no invoice at all.

use chrono::NaiveDate;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use mart_common::{gst_on, split_gst, state_code, Merchant, Paise};
use mart_ledger::Ledger;

use crate::cycles::SettlementCycle;
use crate::numbering::InvoiceNumbering;
use crate::SettleError;

/// Invoice status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvoiceStatus {
    /// Issued; immutable except for status transitions
    Issued,
    /// Settled by a payout batch
    Paid,
    /// Cancelled; skipped by payout netting
    Cancelled,
}

/// Intra-state vs inter-state GST split
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaxType {
    /// Same state: CGST + SGST, each half of the GST amount
    CgstSgst,
    /// Different state: IGST, the full GST amount
    Igst,
}

/// Aggregated fee totals for a period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeTotals {
    /// Sum of completed platform-fee entries
    pub platform_fee: Paise,
    /// GST on that fee
    pub gst_amount: Paise,
    /// Fee plus GST
    pub total: Paise,
}

/// Tax invoice line item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceLineItem {
    /// Line description
    pub description: String,
    /// SAC code
    pub sac_code: String,
    /// Always 1 for the aggregate period fee
    pub quantity: u32,
    /// Unit price in paise
    pub unit_price: Paise,
    /// Line amount in paise
    pub amount: Paise,
    /// GST rate in percent
    pub gst_rate: Decimal,
    /// GST amount in paise
    pub gst_amount: Paise,
    /// Line total in paise
    pub total_amount: Paise,
}

/// Platform tax invoice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformInvoice {
    /// Invoice id
    pub id: Uuid,
    /// Billed merchant
    pub merchant_id: Uuid,
    /// Settlement cycle this invoice belongs to
    pub cycle_id: Uuid,
    /// Allocated invoice number, unique
    pub invoice_number: String,
    /// Invoice date
    pub invoice_date: NaiveDate,
    /// Currency code
    pub currency: String,
    /// Fee subtotal in paise
    pub subtotal: Paise,
    /// GST amount in paise
    pub gst_amount: Paise,
    /// Subtotal plus GST
    pub total: Paise,
    /// Intra/inter-state split
    pub tax_type: TaxType,
    /// Invoice status
    pub status: InvoiceStatus,
    /// Line items
    pub line_items: Vec<InvoiceLineItem>,
}

/// Party block on the render payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceParty {
    /// Legal name
    pub name: String,
    /// GSTIN, if registered
    pub gstin: Option<String>,
    /// State string
    pub state: String,
    /// Two-digit state code
    pub state_code: String,
}

/// Fully-resolved data object handed to the external PDF renderer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceRenderPayload {
    /// Invoice number
    pub invoice_number: String,
    /// Invoice date
    pub invoice_date: NaiveDate,
    /// Supplier (the platform)
    pub supplier: InvoiceParty,
    /// Recipient (the merchant)
    pub recipient: InvoiceParty,
    /// Line items
    pub line_items: Vec<InvoiceLineItem>,
    /// Fee totals
    pub totals: FeeTotals,
    /// Split type
    pub tax_type: TaxType,
    /// CGST component (zero for IGST invoices)
    pub cgst: Paise,
    /// SGST component (zero for IGST invoices)
    pub sgst: Paise,
    /// IGST component (zero for intra-state invoices)
    pub igst: Paise,
}

/// Platform invoice generator
pub struct InvoiceGenerator {
    ledger: Arc<Ledger>,
    numbering: Arc<InvoiceNumbering>,
    invoices: Arc<RwLock<HashMap<Uuid, PlatformInvoice>>>,
}

impl InvoiceGenerator {
    /// Create a generator over the ledger and numbering allocator
    pub fn new(ledger: Arc<Ledger>, numbering: Arc<InvoiceNumbering>) -> Self {
        Self {
            ledger,
            numbering,
            invoices: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Aggregate a merchant's completed platform fees for a period and
    /// compute GST on top.
    pub fn fees_for_period(
        &self,
        merchant_id: Uuid,
        period_start: NaiveDate,
        period_end: NaiveDate,
        gst_rate_percent: Decimal,
    ) -> FeeTotals {
        let platform_fee = self
            .ledger
            .completed_fees_in_period(merchant_id, period_start, period_end);
        let gst_amount = gst_on(platform_fee, gst_rate_percent);
        FeeTotals {
            platform_fee,
            gst_amount,
            total: platform_fee + gst_amount,
        }
    }

    /// Generate the platform invoice for a merchant and cycle.
    ///
    /// Returns `Ok(None)` when nothing is billable (zero fees) or when
    /// an invoice for this (merchant, cycle) already exists - both are
    /// skips, not failures, so the invoice job stays retry-safe.
    pub fn generate(
        &self,
        merchant: &Merchant,
        cycle: &SettlementCycle,
        invoice_date: NaiveDate,
    ) -> Result<Option<PlatformInvoice>, SettleError> {
        if self.for_merchant_cycle(merchant.id, cycle.id).is_some() {
            tracing::debug!(
                "invoice already exists for merchant {} in cycle {}",
                merchant.id,
                cycle.id
            );
            return Ok(None);
        }

        let profile = self.numbering.profile();
        let totals = self.fees_for_period(
            merchant.id,
            cycle.period_start,
            cycle.period_end,
            profile.default_gst_rate,
        );
        if totals.platform_fee == 0 {
            return Ok(None);
        }

        let supplier_code = state_code(&profile.state);
        let recipient_code = state_code(&merchant.registered_state);
        let tax_type = if supplier_code == recipient_code {
            TaxType::CgstSgst
        } else {
            TaxType::Igst
        };

        let invoice_number = self.numbering.allocate_platform(invoice_date);
        let line_item = InvoiceLineItem {
            description: format!(
                "Platform fees {} to {}",
                cycle.period_start, cycle.period_end
            ),
            sac_code: profile.default_sac_code.clone(),
            quantity: 1,
            unit_price: totals.platform_fee,
            amount: totals.platform_fee,
            gst_rate: profile.default_gst_rate,
            gst_amount: totals.gst_amount,
            total_amount: totals.total,
        };

        let invoice = PlatformInvoice {
            id: Uuid::new_v4(),
            merchant_id: merchant.id,
            cycle_id: cycle.id,
            invoice_number,
            invoice_date,
            currency: "INR".into(),
            subtotal: totals.platform_fee,
            gst_amount: totals.gst_amount,
            total: totals.total,
            tax_type,
            status: InvoiceStatus::Issued,
            line_items: vec![line_item],
        };
        self.invoices.write().insert(invoice.id, invoice.clone());
        Ok(Some(invoice))
    }

    /// Get an invoice
    pub fn get(&self, id: Uuid) -> Option<PlatformInvoice> {
        self.invoices.read().get(&id).cloned()
    }

    /// Invoice for an exact (merchant, cycle) pair
    pub fn for_merchant_cycle(&self, merchant_id: Uuid, cycle_id: Uuid) -> Option<PlatformInvoice> {
        self.invoices
            .read()
            .values()
            .find(|i| i.merchant_id == merchant_id && i.cycle_id == cycle_id)
            .cloned()
    }

    /// All invoices in a cycle
    pub fn for_cycle(&self, cycle_id: Uuid) -> Vec<PlatformInvoice> {
        self.invoices
            .read()
            .values()
            .filter(|i| i.cycle_id == cycle_id)
            .cloned()
            .collect()
    }

    /// Invoices for a merchant
    pub fn for_merchant(&self, merchant_id: Uuid) -> Vec<PlatformInvoice> {
        self.invoices
            .read()
            .values()
            .filter(|i| i.merchant_id == merchant_id)
            .cloned()
            .collect()
    }

    /// Mark an issued invoice paid (payout batch created)
    pub fn mark_paid(&self, id: Uuid) -> Result<PlatformInvoice, SettleError> {
        self.transition(id, InvoiceStatus::Paid)
    }

    /// Cancel an issued invoice so payout netting skips the merchant
    pub fn cancel(&self, id: Uuid) -> Result<PlatformInvoice, SettleError> {
        self.transition(id, InvoiceStatus::Cancelled)
    }

    fn transition(&self, id: Uuid, to: InvoiceStatus) -> Result<PlatformInvoice, SettleError> {
        let mut invoices = self.invoices.write();
        let invoice = invoices
            .get_mut(&id)
            .ok_or_else(|| SettleError::Invoice(format!("invoice not found: {id}")))?;
        if invoice.status != InvoiceStatus::Issued {
            return Err(SettleError::Invoice(format!(
                "invoice {id} is {:?}, cannot move to {to:?}",
                invoice.status
            )));
        }
        invoice.status = to;
        Ok(invoice.clone())
    }

    /// Build the structured payload the external PDF renderer consumes
    pub fn render_payload(&self, id: Uuid, merchant: &Merchant) -> Option<InvoiceRenderPayload> {
        let invoice = self.get(id)?;
        let profile = self.numbering.profile();
        let (cgst, sgst, igst) = match invoice.tax_type {
            TaxType::CgstSgst => {
                let (cgst, sgst) = split_gst(invoice.gst_amount);
                (cgst, sgst, 0)
            }
            TaxType::Igst => (0, 0, invoice.gst_amount),
        };
        Some(InvoiceRenderPayload {
            invoice_number: invoice.invoice_number.clone(),
            invoice_date: invoice.invoice_date,
            supplier: InvoiceParty {
                name: profile.legal_name.clone(),
                gstin: Some(profile.gstin.clone()),
                state: profile.state.clone(),
                state_code: state_code(&profile.state),
            },
            recipient: InvoiceParty {
                name: merchant.name.clone(),
                gstin: merchant.gstin.clone(),
                state: merchant.registered_state.clone(),
                state_code: state_code(&merchant.registered_state),
            },
            line_items: invoice.line_items.clone(),
            totals: FeeTotals {
                platform_fee: invoice.subtotal,
                gst_amount: invoice.gst_amount,
                total: invoice.total,
            },
            tax_type: invoice.tax_type,
            cgst,
            sgst,
            igst,
        })
    }

    /// Export an invoice as JSON
    pub fn export_json(&self, id: Uuid) -> Option<String> {
        self.get(id)
            .and_then(|i| serde_json::to_string_pretty(&i).ok())
    }
}

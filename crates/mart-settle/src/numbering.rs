//! Invoice Number Allocator
//!
//! Strictly increasing, gap-free invoice numbers from a stored counter
//! and format template. Every allocation is a single read-modify-write
//! under one write lock, so concurrent callers can never observe the
//! same number. A format missing the `{NNNNN}` token silently falls back
//! to the default template: invoice numbering must never block order
//! completion.

use chrono::{Datelike, NaiveDate};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Default series template used when a stored format is unusable
pub const DEFAULT_SERIES_FORMAT: &str = "{PREFIX}/{FY}/{NNNNN}";

/// Platform legal/tax identity plus the invoice-numbering counter
/// (singleton).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingProfile {
    /// Platform legal name
    pub legal_name: String,
    /// Platform GSTIN
    pub gstin: String,
    /// Registered address
    pub address: String,
    /// Registered state string; carries the supplier state code
    pub state: String,
    /// Invoice number prefix
    pub invoice_prefix: String,
    /// Next number to allocate
    pub invoice_next_number: u64,
    /// Zero-padding width for the sequence component
    pub invoice_padding: usize,
    /// Series template with {PREFIX}/{FY}/{YYYY}/{NNNNN} tokens
    pub series_format: String,
    /// Default SAC code stamped on platform fee line items
    pub default_sac_code: String,
    /// Default GST rate in percent
    pub default_gst_rate: Decimal,
}

impl Default for BillingProfile {
    fn default() -> Self {
        Self {
            legal_name: "OpenMart Technologies Pvt Ltd".into(),
            gstin: "09AAACO1234A1Z5".into(),
            address: "Sector 62, Noida".into(),
            state: "09 - Uttar Pradesh".into(),
            invoice_prefix: "OM".into(),
            invoice_next_number: 1,
            invoice_padding: 5,
            series_format: DEFAULT_SERIES_FORMAT.into(),
            default_sac_code: "998599".into(),
            default_gst_rate: Decimal::from(18),
        }
    }
}

/// Per-merchant invoice series (store-settings counter row)
#[derive(Debug, Clone, Serialize, Deserialize)]
struct MerchantSeries {
    prefix: String,
    next_number: u64,
    padding: usize,
    series_format: String,
    last_allocated_year: Option<i32>,
}

impl Default for MerchantSeries {
    fn default() -> Self {
        Self {
            prefix: "INV".into(),
            next_number: 1,
            padding: 4,
            series_format: DEFAULT_SERIES_FORMAT.into(),
            last_allocated_year: None,
        }
    }
}

/// Indian financial year label for a date, e.g. "2025-26"
fn financial_year(date: NaiveDate) -> String {
    let start = if date.month() >= 4 {
        date.year()
    } else {
        date.year() - 1
    };
    format!("{}-{:02}", start, (start + 1) % 100)
}

/// Render a series template. Falls back to [`DEFAULT_SERIES_FORMAT`]
/// when the template omits the `{NNNNN}` sequence token, which would
/// otherwise produce non-unique numbers.
fn render(format: &str, prefix: &str, number: u64, padding: usize, date: NaiveDate) -> String {
    let template = if format.contains("{NNNNN}") {
        format
    } else {
        tracing::warn!("series format {:?} has no {{NNNNN}} token, using default", format);
        DEFAULT_SERIES_FORMAT
    };
    template
        .replace("{PREFIX}", prefix)
        .replace("{FY}", &financial_year(date))
        .replace("{YYYY}", &date.year().to_string())
        .replace("{NNNNN}", &format!("{:0width$}", number, width = padding))
}

/// Invoice number allocator over the billing profile and per-merchant
/// series counters.
pub struct InvoiceNumbering {
    profile: Arc<RwLock<BillingProfile>>,
    merchant_series: Arc<RwLock<HashMap<Uuid, MerchantSeries>>>,
}

impl InvoiceNumbering {
    /// Create an allocator over a billing profile
    pub fn new(profile: BillingProfile) -> Self {
        Self {
            profile: Arc::new(RwLock::new(profile)),
            merchant_series: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Snapshot of the billing profile
    pub fn profile(&self) -> BillingProfile {
        self.profile.read().clone()
    }

    /// Replace the stored series format (admin surface)
    pub fn set_series_format(&self, format: &str) {
        self.profile.write().series_format = format.into();
    }

    /// Allocate the next platform invoice number. Read, render and
    /// increment happen inside one write-lock critical section.
    pub fn allocate_platform(&self, date: NaiveDate) -> String {
        let mut profile = self.profile.write();
        let number = render(
            &profile.series_format,
            &profile.invoice_prefix,
            profile.invoice_next_number,
            profile.invoice_padding,
            date,
        );
        profile.invoice_next_number += 1;
        number
    }

    /// Allocate the next per-order invoice number for a merchant. The
    /// sequence resets to 1 when the calendar year of the last
    /// allocation differs from `date`'s year.
    pub fn allocate_merchant(&self, merchant_id: Uuid, date: NaiveDate) -> String {
        let mut all = self.merchant_series.write();
        let series = all.entry(merchant_id).or_default();

        if series.last_allocated_year.is_some_and(|y| y != date.year()) {
            series.next_number = 1;
        }
        let number = render(
            &series.series_format,
            &series.prefix,
            series.next_number,
            series.padding,
            date,
        );
        series.next_number += 1;
        series.last_allocated_year = Some(date.year());
        number
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_financial_year_boundaries() {
        assert_eq!(financial_year(date(2026, 4, 1)), "2026-27");
        assert_eq!(financial_year(date(2026, 3, 31)), "2025-26");
        assert_eq!(financial_year(date(2026, 8, 20)), "2026-27");
    }

    #[test]
    fn test_platform_sequence_and_format() {
        let numbering = InvoiceNumbering::new(BillingProfile::default());
        let d = date(2026, 8, 20);
        assert_eq!(numbering.allocate_platform(d), "OM/2026-27/00001");
        assert_eq!(numbering.allocate_platform(d), "OM/2026-27/00002");
    }

    #[test]
    fn test_malformed_format_falls_back() {
        let numbering = InvoiceNumbering::new(BillingProfile::default());
        numbering.set_series_format("{PREFIX}-{FY}");

        let d = date(2026, 8, 20);
        assert_eq!(numbering.allocate_platform(d), "OM/2026-27/00001");
        assert_eq!(numbering.allocate_platform(d), "OM/2026-27/00002");
    }

    #[test]
    fn test_custom_format_tokens() {
        let numbering = InvoiceNumbering::new(BillingProfile {
            series_format: "{PREFIX}/{YYYY}/{NNNNN}".into(),
            invoice_prefix: "PLAT".into(),
            invoice_padding: 3,
            ..Default::default()
        });
        assert_eq!(numbering.allocate_platform(date(2026, 1, 5)), "PLAT/2026/001");
    }

    #[test]
    fn test_merchant_series_yearly_reset() {
        let numbering = InvoiceNumbering::new(BillingProfile::default());
        let merchant = Uuid::new_v4();

        assert_eq!(
            numbering.allocate_merchant(merchant, date(2025, 12, 30)),
            "INV/2025-26/0001"
        );
        assert_eq!(
            numbering.allocate_merchant(merchant, date(2025, 12, 31)),
            "INV/2025-26/0002"
        );
        // calendar year changed: sequence restarts at 1
        assert_eq!(
            numbering.allocate_merchant(merchant, date(2026, 1, 2)),
            "INV/2025-26/0001"
        );
    }

    #[test]
    fn test_merchant_series_isolated_per_merchant() {
        let numbering = InvoiceNumbering::new(BillingProfile::default());
        let d = date(2026, 8, 20);
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        numbering.allocate_merchant(a, d);
        let second_a = numbering.allocate_merchant(a, d);
        let first_b = numbering.allocate_merchant(b, d);
        assert!(second_a.ends_with("0002"));
        assert!(first_b.ends_with("0001"));
    }

    #[test]
    fn test_concurrent_allocations_distinct_and_gapless() {
        let numbering = Arc::new(InvoiceNumbering::new(BillingProfile::default()));
        let d = date(2026, 8, 20);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let numbering = numbering.clone();
                std::thread::spawn(move || {
                    (0..25)
                        .map(|_| numbering.allocate_platform(d))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut numbers: Vec<String> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        numbers.sort();
        numbers.dedup();
        assert_eq!(numbers.len(), 200);
        assert_eq!(numbering.profile().invoice_next_number, 201);
    }
}

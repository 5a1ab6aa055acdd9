//! OpenMart Common - Shared merchant and money primitives
//!
//! Everything downstream of the storefront speaks in two vocabularies:
//! merchants (who owes whom) and paise (how much). This crate owns both:
//!
//! - **Money**: all amounts are integer paise (`i64`). Decimal arithmetic
//!   appears only at the GST boundary and is rounded straight back to
//!   integer paise. IEEE floats never touch a monetary value.
//! - **Merchants**: the directory of merchant profiles consumed by fee
//!   resolution (overrides, package assignment) and by invoice generation
//!   (registered state, GSTIN, bank reference).

#![warn(missing_docs)]

pub mod merchants;
pub mod money;

pub use merchants::{FeeOverride, Merchant, MerchantDirectory, PayoutFrequency};
pub use money::{gst_on, mask_account, split_gst, state_code, Paise, DEFAULT_STATE_CODE};

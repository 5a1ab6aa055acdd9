//! OpenMart Ledger - Append-only settlement ledger and order book
//!
//! The ledger is the source of truth for invoice aggregation: every
//! monetary event (gross order value, platform fee, payout obligation,
//! processed payout) lands here once and is never deleted. Status moves
//! forward only; regressing a completed entry fails loudly because it
//! signals a bug, not a recoverable condition.
//!
//! The order book carries the per-order gross/fee/net stamps the payout
//! batcher nets over.

#![warn(missing_docs)]

pub mod ledger;
pub mod orders;

pub use ledger::{EntryDraft, EntryStatus, EntryType, Ledger, LedgerEntry};
pub use orders::{Order, OrderBook, OrderStage, PaymentStatus};

use thiserror::Error;
use uuid::Uuid;

/// Ledger error types
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Ledger entry missing
    #[error("ledger entry not found: {0}")]
    EntryNotFound(Uuid),

    /// Status may only move forward
    #[error("invalid ledger transition: {from:?} -> {to:?}")]
    InvalidTransition {
        /// Current status
        from: ledger::EntryStatus,
        /// Rejected target status
        to: ledger::EntryStatus,
    },

    /// Order missing from the order book
    #[error("order not found: {0}")]
    OrderNotFound(Uuid),
}

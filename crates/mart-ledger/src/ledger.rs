//! Settlement Ledger

use chrono::{DateTime, NaiveDate, Utc};
use mart_common::Paise;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::LedgerError;

/// Monetary event type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryType {
    /// Gross order value received from the buyer
    GrossOrderValue,
    /// Platform fee owed by the merchant
    PlatformFee,
    /// Net amount owed to the merchant for an order
    OrderPayout,
    /// Payout executed through the gateway
    PayoutProcessed,
}

/// Entry lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryStatus {
    /// Awaiting payment confirmation
    Pending,
    /// Payment confirmation in flight
    Processing,
    /// Final; never mutated again
    Completed,
    /// Terminal failure
    Failed,
}

impl EntryStatus {
    fn rank(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Processing => 1,
            Self::Completed => 2,
            Self::Failed => 2,
        }
    }

    /// Whether a transition to `next` is a legal forward move
    pub fn can_advance_to(self, next: EntryStatus) -> bool {
        match (self, next) {
            (Self::Completed | Self::Failed, _) => false,
            (_, Self::Failed) => true,
            (from, to) => to.rank() > from.rank(),
        }
    }
}

/// Immutable ledger entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Entry id
    pub id: Uuid,
    /// Merchant the event belongs to
    pub merchant_id: Uuid,
    /// Linked order, when the event is order-scoped
    pub order_id: Option<Uuid>,
    /// Event type
    pub entry_type: EntryType,
    /// Amount in paise, signed per type semantics
    pub amount_paise: Paise,
    /// Lifecycle status
    pub status: EntryStatus,
    /// Human-readable description
    pub description: String,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
}

/// Input for [`Ledger::record`]
#[derive(Debug, Clone)]
pub struct EntryDraft {
    /// Merchant the event belongs to
    pub merchant_id: Uuid,
    /// Linked order
    pub order_id: Option<Uuid>,
    /// Event type
    pub entry_type: EntryType,
    /// Amount in paise
    pub amount_paise: Paise,
    /// Human-readable description
    pub description: String,
    /// Initial status: fee entries recorded synchronously with order
    /// confirmation start Completed; entries awaiting the payment
    /// webhook start Pending.
    pub status: EntryStatus,
}

/// Append-only ledger
pub struct Ledger {
    entries: Arc<RwLock<Vec<LedgerEntry>>>,
}

impl Ledger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Append an entry
    pub fn record(&self, draft: EntryDraft) -> LedgerEntry {
        let entry = LedgerEntry {
            id: Uuid::new_v4(),
            merchant_id: draft.merchant_id,
            order_id: draft.order_id,
            entry_type: draft.entry_type,
            amount_paise: draft.amount_paise,
            status: draft.status,
            description: draft.description,
            created_at: Utc::now(),
        };
        self.entries.write().push(entry.clone());
        entry
    }

    /// Get an entry
    pub fn get(&self, id: Uuid) -> Option<LedgerEntry> {
        self.entries
            .read()
            .iter()
            .find(|e| e.id == id)
            .cloned()
    }

    /// Advance an entry's status; forward-only.
    pub fn advance_status(&self, id: Uuid, next: EntryStatus) -> Result<LedgerEntry, LedgerError> {
        let mut entries = self.entries.write();
        let entry = entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or(LedgerError::EntryNotFound(id))?;
        if !entry.status.can_advance_to(next) {
            return Err(LedgerError::InvalidTransition {
                from: entry.status,
                to: next,
            });
        }
        entry.status = next;
        Ok(entry.clone())
    }

    /// Promote a pending entry through Processing to Completed, the path
    /// the payment webhook takes.
    pub fn complete(&self, id: Uuid) -> Result<LedgerEntry, LedgerError> {
        let current = self.get(id).ok_or(LedgerError::EntryNotFound(id))?;
        if current.status == EntryStatus::Pending {
            self.advance_status(id, EntryStatus::Processing)?;
        }
        self.advance_status(id, EntryStatus::Completed)
    }

    /// Entries for a merchant, append order preserved
    pub fn for_merchant(&self, merchant_id: Uuid) -> Vec<LedgerEntry> {
        self.entries
            .read()
            .iter()
            .filter(|e| e.merchant_id == merchant_id)
            .cloned()
            .collect()
    }

    /// Entries linked to an order
    pub fn for_order(&self, order_id: Uuid) -> Vec<LedgerEntry> {
        self.entries
            .read()
            .iter()
            .filter(|e| e.order_id == Some(order_id))
            .cloned()
            .collect()
    }

    /// Sum of Completed PlatformFee entries for a merchant inside the
    /// period (dates inclusive). One pass under a single read lock so
    /// invoice aggregation sees a consistent snapshot.
    pub fn completed_fees_in_period(
        &self,
        merchant_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Paise {
        self.entries
            .read()
            .iter()
            .filter(|e| {
                e.merchant_id == merchant_id
                    && e.entry_type == EntryType::PlatformFee
                    && e.status == EntryStatus::Completed
                    && {
                        let d = e.created_at.date_naive();
                        d >= from && d <= to
                    }
            })
            .map(|e| e.amount_paise)
            .sum()
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

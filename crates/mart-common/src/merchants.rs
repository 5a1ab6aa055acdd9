//! Merchant Directory

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Merchant profile (the subset the settlement core reads)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Merchant {
    /// Merchant id
    pub id: Uuid,
    /// Display name
    pub name: String,
    /// Registered state string, carries the GST state code
    pub registered_state: String,
    /// Merchant GSTIN, if registered
    pub gstin: Option<String>,
    /// Settlement bank reference (masked before it leaves the core)
    pub bank_account: Option<String>,
    /// Assigned pricing package
    pub package_id: Option<Uuid>,
    /// Direct fee overrides, each field optional
    pub fee_override: FeeOverride,
    /// How often payouts run for this merchant
    pub payout_frequency: PayoutFrequency,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
}

/// Per-merchant fee override; a `None` field falls through to the
/// assigned package and then to platform defaults.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct FeeOverride {
    /// Fee rate in basis points
    pub percentage_bps: Option<i64>,
    /// Flat fee in paise
    pub flat_paise: Option<i64>,
    /// Upper bound on the total fee in paise
    pub max_cap_paise: Option<i64>,
}

/// Payout cadence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PayoutFrequency {
    /// Settled every weekly cycle
    Weekly,
    /// Settled every second cycle
    Fortnightly,
    /// Settled monthly
    Monthly,
}

/// Merchant directory
pub struct MerchantDirectory {
    merchants: Arc<RwLock<HashMap<Uuid, Merchant>>>,
}

impl MerchantDirectory {
    /// Create an empty directory
    pub fn new() -> Self {
        Self {
            merchants: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register a merchant
    pub fn register(&self, name: &str, registered_state: &str) -> Merchant {
        let merchant = Merchant {
            id: Uuid::new_v4(),
            name: name.into(),
            registered_state: registered_state.into(),
            gstin: None,
            bank_account: None,
            package_id: None,
            fee_override: FeeOverride::default(),
            payout_frequency: PayoutFrequency::Weekly,
            created_at: Utc::now(),
        };
        self.merchants.write().insert(merchant.id, merchant.clone());
        merchant
    }

    /// Get a merchant
    pub fn get(&self, id: Uuid) -> Option<Merchant> {
        self.merchants.read().get(&id).cloned()
    }

    /// All merchants
    pub fn all(&self) -> Vec<Merchant> {
        self.merchants.read().values().cloned().collect()
    }

    /// Set the direct fee override
    pub fn set_fee_override(&self, id: Uuid, fee_override: FeeOverride) -> bool {
        match self.merchants.write().get_mut(&id) {
            Some(m) => {
                m.fee_override = fee_override;
                true
            }
            None => false,
        }
    }

    /// Assign (or clear) a pricing package
    pub fn assign_package(&self, id: Uuid, package_id: Option<Uuid>) -> bool {
        match self.merchants.write().get_mut(&id) {
            Some(m) => {
                m.package_id = package_id;
                true
            }
            None => false,
        }
    }

    /// Set the settlement bank reference
    pub fn set_bank_account(&self, id: Uuid, account: &str) -> bool {
        match self.merchants.write().get_mut(&id) {
            Some(m) => {
                m.bank_account = Some(account.into());
                true
            }
            None => false,
        }
    }

    /// Set the merchant GSTIN
    pub fn set_gstin(&self, id: Uuid, gstin: &str) -> bool {
        match self.merchants.write().get_mut(&id) {
            Some(m) => {
                m.gstin = Some(gstin.into());
                true
            }
            None => false,
        }
    }
}

impl Default for MerchantDirectory {
    fn default() -> Self {
        Self::new()
    }
}

//! Fee Config Resolver
//!
//! Resolves the effective fee configuration for a merchant: per field,
//! first non-null wins across merchant override -> assigned package ->
//! platform defaults. Resolution reads current state on every call;
//! admins change overrides between requests and correctness beats
//! latency here.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use mart_common::{FeeOverride, MerchantDirectory, PayoutFrequency};

use crate::calculator::{
    FeeConfig, DEFAULT_FEE_FLAT_PAISE, DEFAULT_FEE_MAX_CAP_PAISE, DEFAULT_FEE_PERCENTAGE_BPS,
};
use crate::packages::{PackageRegistry, PricingPackage};
use crate::FeeError;

/// Platform default fee settings (admin-mutable singleton)
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PlatformFeeDefaults {
    /// Default fee rate in basis points
    pub percentage_bps: i64,
    /// Default flat fee in paise
    pub flat_paise: i64,
    /// Default fee cap in paise; `None` leaves fees uncapped
    pub max_cap_paise: Option<i64>,
}

impl Default for PlatformFeeDefaults {
    fn default() -> Self {
        Self {
            percentage_bps: DEFAULT_FEE_PERCENTAGE_BPS,
            flat_paise: DEFAULT_FEE_FLAT_PAISE,
            max_cap_paise: Some(DEFAULT_FEE_MAX_CAP_PAISE),
        }
    }
}

/// Resolved effective configuration for a merchant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectiveFeeConfig {
    /// Resolved fee rate in basis points
    pub percentage_bps: Option<i64>,
    /// Resolved flat fee in paise
    pub flat_paise: Option<i64>,
    /// Resolved fee cap in paise
    pub max_cap_paise: Option<i64>,
    /// Merchant payout cadence
    pub payout_frequency: PayoutFrequency,
    /// Package that contributed, if any
    pub package_id: Option<Uuid>,
    /// Name of that package
    pub package_name: Option<String>,
}

impl EffectiveFeeConfig {
    /// View as calculator input
    pub fn fee_config(&self) -> FeeConfig {
        FeeConfig {
            percentage_bps: self.percentage_bps,
            flat_paise: self.flat_paise,
            max_cap_paise: self.max_cap_paise,
        }
    }
}

/// Ordered per-field merge: override, then package, then defaults.
pub fn merge_defaults(
    overrides: &FeeOverride,
    package: Option<&PricingPackage>,
    defaults: &PlatformFeeDefaults,
) -> FeeConfig {
    FeeConfig {
        percentage_bps: overrides
            .percentage_bps
            .or(package.and_then(|p| p.variable_fee_bps))
            .or(Some(defaults.percentage_bps)),
        flat_paise: overrides
            .flat_paise
            .or(package.and_then(|p| p.fixed_fee_paise))
            .or(Some(defaults.flat_paise)),
        max_cap_paise: overrides.max_cap_paise.or(defaults.max_cap_paise),
    }
}

/// Fee config resolver
pub struct FeeResolver {
    merchants: Arc<MerchantDirectory>,
    packages: Arc<PackageRegistry>,
    defaults: Arc<RwLock<PlatformFeeDefaults>>,
}

impl FeeResolver {
    /// Create a resolver over the given directory and registry
    pub fn new(merchants: Arc<MerchantDirectory>, packages: Arc<PackageRegistry>) -> Self {
        Self {
            merchants,
            packages,
            defaults: Arc::new(RwLock::new(PlatformFeeDefaults::default())),
        }
    }

    /// Replace the platform default settings
    pub fn set_defaults(&self, defaults: PlatformFeeDefaults) {
        *self.defaults.write() = defaults;
    }

    /// Current platform default settings
    pub fn defaults(&self) -> PlatformFeeDefaults {
        *self.defaults.read()
    }

    /// Resolve the effective fee configuration for a merchant.
    ///
    /// An unknown merchant is an input error surfaced to the caller;
    /// a merchant with neither override nor resolvable package falls
    /// back fully to platform defaults with `package_name = None`.
    pub fn effective_config(&self, merchant_id: Uuid) -> Result<EffectiveFeeConfig, FeeError> {
        let merchant = self
            .merchants
            .get(merchant_id)
            .ok_or(FeeError::MerchantNotFound(merchant_id))?;

        let package = merchant
            .package_id
            .and_then(|id| self.packages.resolvable(id));
        if let (Some(assigned), None) = (merchant.package_id, package.as_ref()) {
            tracing::debug!("assigned package {} not resolvable, falling through", assigned);
        }

        let defaults = *self.defaults.read();
        let merged = merge_defaults(&merchant.fee_override, package.as_ref(), &defaults);

        Ok(EffectiveFeeConfig {
            percentage_bps: merged.percentage_bps,
            flat_paise: merged.flat_paise,
            max_cap_paise: merged.max_cap_paise,
            payout_frequency: merchant.payout_frequency,
            package_id: package.as_ref().map(|p| p.id),
            package_name: package.map(|p| p.name),
        })
    }
}

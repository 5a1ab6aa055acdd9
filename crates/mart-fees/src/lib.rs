//! OpenMart Fees - Platform fee calculation and config resolution
//!
//! Two halves, deliberately separated:
//!
//! - [`calculator`] is pure arithmetic: gross paise in, fee paise out,
//!   no state, safe to call from the order hot path.
//! - [`config`] resolves the *effective* fee configuration for a merchant
//!   by merging, per field, merchant override -> assigned pricing
//!   package -> platform defaults. Resolution is a separate read step so
//!   the calculator never touches the override/package tables itself.

#![warn(missing_docs)]

pub mod calculator;
pub mod config;
pub mod packages;

pub use calculator::{net_payable, platform_fee, platform_fee_default, FeeConfig};
pub use config::{merge_defaults, EffectiveFeeConfig, FeeResolver, PlatformFeeDefaults};
pub use packages::{PackageLifecycle, PackageRegistry, PricingPackage};

use thiserror::Error;
use uuid::Uuid;

/// Fee resolution error types
#[derive(Debug, Error)]
pub enum FeeError {
    /// Merchant missing from the directory; callers must abort rather
    /// than proceed on a guessed default.
    #[error("merchant not found: {0}")]
    MerchantNotFound(Uuid),

    /// Pricing package missing from the registry
    #[error("package not found: {0}")]
    PackageNotFound(Uuid),

    /// Pricing package fields are frozen once published
    #[error("published package cannot be edited: {0}")]
    PackageLocked(Uuid),
}

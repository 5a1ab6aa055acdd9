//! Fee Calculator
//!
//! Pure integer arithmetic over paise. The percentage component uses
//! floor division in basis points; no floating point anywhere.

use mart_common::Paise;
use serde::{Deserialize, Serialize};

/// Platform default fee rate: 2%
pub const DEFAULT_FEE_PERCENTAGE_BPS: i64 = 200;
/// Platform default flat fee: Rs 5
pub const DEFAULT_FEE_FLAT_PAISE: i64 = 500;
/// Platform default fee cap: Rs 25
pub const DEFAULT_FEE_MAX_CAP_PAISE: i64 = 2500;

/// Effective fee configuration as consumed by the calculator.
///
/// A `None` percentage or flat field contributes nothing; a `None` cap
/// means uncapped.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct FeeConfig {
    /// Fee rate in basis points (1/100 of a percent)
    pub percentage_bps: Option<i64>,
    /// Flat fee in paise
    pub flat_paise: Option<i64>,
    /// Upper bound on the total fee in paise
    pub max_cap_paise: Option<i64>,
}

impl FeeConfig {
    /// Platform default configuration (2% + Rs 5 flat, capped at Rs 25)
    pub const fn platform_default() -> Self {
        Self {
            percentage_bps: Some(DEFAULT_FEE_PERCENTAGE_BPS),
            flat_paise: Some(DEFAULT_FEE_FLAT_PAISE),
            max_cap_paise: Some(DEFAULT_FEE_MAX_CAP_PAISE),
        }
    }
}

/// Platform fee for a gross order amount under a fee configuration.
///
/// `raw = floor(gross * bps / 10000) + flat`, capped by `max_cap_paise`
/// when set, then clamped to `[0, gross]` - the fee never exceeds the
/// order and is never negative. Negative gross is a defensive clamp to
/// zero, not an error.
pub fn platform_fee(gross_paise: Paise, config: &FeeConfig) -> Paise {
    if gross_paise <= 0 {
        return 0;
    }

    let bps = config.percentage_bps.unwrap_or(0).max(0);
    let flat = config.flat_paise.unwrap_or(0).max(0);

    // Widen for the product; a sane bps keeps the result well inside i64.
    let percentage = (gross_paise as i128 * bps as i128) / 10_000;
    let percentage = i64::try_from(percentage).unwrap_or(i64::MAX);

    let mut fee = percentage.saturating_add(flat);
    if let Some(cap) = config.max_cap_paise {
        fee = fee.min(cap.max(0));
    }
    fee.clamp(0, gross_paise)
}

/// Platform fee under the platform default configuration
pub fn platform_fee_default(gross_paise: Paise) -> Paise {
    platform_fee(gross_paise, &FeeConfig::platform_default())
}

/// Net amount payable to the merchant: `max(0, gross - fee)`
pub fn net_payable(gross_paise: Paise, config: &FeeConfig) -> Paise {
    (gross_paise - platform_fee(gross_paise, config)).max(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_default_config_scenario() {
        // Rs 100: 2% = 200 + flat 500, cap not hit
        assert_eq!(platform_fee_default(10_000), 700);
    }

    #[test]
    fn test_cap_scenario() {
        // Rs 2000: 2% = 4000 + 500 = 4500, capped at 2500
        assert_eq!(platform_fee_default(200_000), 2_500);
    }

    #[test]
    fn test_fee_exceeds_gross_scenario() {
        // Rs 1: raw fee 502 clamped down to the gross amount
        assert_eq!(platform_fee_default(100), 100);
    }

    #[test]
    fn test_fractional_paise_floors() {
        // floor(10050 * 200 / 10000) = 201, +500
        assert_eq!(platform_fee_default(10_050), 701);
    }

    #[test]
    fn test_negative_and_zero_gross_clamp() {
        assert_eq!(platform_fee_default(0), 0);
        assert_eq!(platform_fee_default(-5_000), 0);
        assert_eq!(net_payable(-5_000, &FeeConfig::platform_default()), 0);
    }

    #[test]
    fn test_null_fields() {
        let percentage_only = FeeConfig {
            percentage_bps: Some(250),
            flat_paise: None,
            max_cap_paise: None,
        };
        assert_eq!(platform_fee(10_000, &percentage_only), 250);

        let flat_only = FeeConfig {
            percentage_bps: None,
            flat_paise: Some(300),
            max_cap_paise: None,
        };
        assert_eq!(platform_fee(10_000, &flat_only), 300);

        // all null: free
        assert_eq!(platform_fee(10_000, &FeeConfig::default()), 0);
    }

    #[test]
    fn test_uncapped() {
        let config = FeeConfig {
            percentage_bps: Some(200),
            flat_paise: Some(500),
            max_cap_paise: None,
        };
        assert_eq!(platform_fee(200_000, &config), 4_500);
    }

    proptest! {
        #[test]
        fn fee_bounded_by_gross(
            gross in -1_000_000i64..1_000_000_000,
            bps in proptest::option::of(0i64..10_000),
            flat in proptest::option::of(0i64..100_000),
            cap in proptest::option::of(0i64..1_000_000),
        ) {
            let config = FeeConfig { percentage_bps: bps, flat_paise: flat, max_cap_paise: cap };
            let fee = platform_fee(gross, &config);
            prop_assert!(fee >= 0);
            prop_assert!(fee <= gross.max(0));
        }

        #[test]
        fn net_plus_fee_reconstructs_gross(
            gross in 0i64..1_000_000_000,
            bps in proptest::option::of(0i64..10_000),
            flat in proptest::option::of(0i64..100_000),
            cap in proptest::option::of(0i64..1_000_000),
        ) {
            let config = FeeConfig { percentage_bps: bps, flat_paise: flat, max_cap_paise: cap };
            let fee = platform_fee(gross, &config);
            let net = net_payable(gross, &config);
            prop_assert!(net >= 0);
            prop_assert_eq!(net + fee, gross);
        }

        #[test]
        fn fee_is_idempotent(gross in 0i64..1_000_000_000) {
            prop_assert_eq!(platform_fee_default(gross), platform_fee_default(gross));
        }
    }
}

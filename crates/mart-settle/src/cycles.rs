//! Settlement Cycle Manager
//!
//! One cycle per fixed Friday-Thursday week. Status only moves forward
//! (Draft -> Invoiced -> Paid); a cycle never reverts, which is what
//! makes both weekly jobs safe to re-trigger.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc, Weekday};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::SettleError;

/// Cycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CycleStatus {
    /// Created lazily by the invoice job
    Draft,
    /// Fee invoices generated for the period
    Invoiced,
    /// Payouts executed, invoices marked paid
    Paid,
}

/// Weekly settlement cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementCycle {
    /// Cycle id
    pub id: Uuid,
    /// Friday the period opens on
    pub period_start: NaiveDate,
    /// Thursday the period closes on (inclusive)
    pub period_end: NaiveDate,
    /// Cycle status
    pub status: CycleStatus,
    /// Set when the invoice job finished for this cycle
    pub invoice_generated_at: Option<DateTime<Utc>>,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
}

/// Current cycle boundaries for a given civil date: walk to the nearest
/// Thursday (today if today is Thursday, else the next one) as the
/// period end; the period start is six days earlier, always a Friday.
///
/// The caller supplies `today` in the deployment's settlement timezone.
pub fn current_period(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let target = Weekday::Thu.num_days_from_monday();
    let current = today.weekday().num_days_from_monday();
    let days_ahead = (target + 7 - current) % 7;
    let end = today + Duration::days(days_ahead as i64);
    (end - Duration::days(6), end)
}

/// Settlement cycle manager
pub struct CycleManager {
    cycles: Arc<RwLock<HashMap<Uuid, SettlementCycle>>>,
}

impl CycleManager {
    /// Create an empty manager
    pub fn new() -> Self {
        Self {
            cycles: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Find the cycle for an exact period
    pub fn find_period(&self, start: NaiveDate, end: NaiveDate) -> Option<SettlementCycle> {
        self.cycles
            .read()
            .values()
            .find(|c| c.period_start == start && c.period_end == end)
            .cloned()
    }

    /// Find or lazily create the cycle for a period; uniqueness on the
    /// (start, end) pair.
    pub fn open_for_period(&self, start: NaiveDate, end: NaiveDate) -> SettlementCycle {
        let mut cycles = self.cycles.write();
        if let Some(existing) = cycles
            .values()
            .find(|c| c.period_start == start && c.period_end == end)
        {
            return existing.clone();
        }
        let cycle = SettlementCycle {
            id: Uuid::new_v4(),
            period_start: start,
            period_end: end,
            status: CycleStatus::Draft,
            invoice_generated_at: None,
            created_at: Utc::now(),
        };
        cycles.insert(cycle.id, cycle.clone());
        cycle
    }

    /// Get a cycle
    pub fn get(&self, id: Uuid) -> Option<SettlementCycle> {
        self.cycles.read().get(&id).cloned()
    }

    /// Advance a Draft cycle to Invoiced
    pub fn mark_invoiced(&self, id: Uuid) -> Result<SettlementCycle, SettleError> {
        let mut cycles = self.cycles.write();
        let cycle = cycles
            .get_mut(&id)
            .ok_or_else(|| SettleError::Cycle(format!("cycle not found: {id}")))?;
        if cycle.status != CycleStatus::Draft {
            return Err(SettleError::Cycle(format!(
                "cycle {id} is {:?}, cannot invoice",
                cycle.status
            )));
        }
        cycle.status = CycleStatus::Invoiced;
        cycle.invoice_generated_at = Some(Utc::now());
        Ok(cycle.clone())
    }

    /// Advance an Invoiced cycle to Paid
    pub fn mark_paid(&self, id: Uuid) -> Result<SettlementCycle, SettleError> {
        let mut cycles = self.cycles.write();
        let cycle = cycles
            .get_mut(&id)
            .ok_or_else(|| SettleError::Cycle(format!("cycle not found: {id}")))?;
        if cycle.status != CycleStatus::Invoiced {
            return Err(SettleError::Cycle(format!(
                "cycle {id} is {:?}, cannot pay",
                cycle.status
            )));
        }
        cycle.status = CycleStatus::Paid;
        Ok(cycle.clone())
    }

    /// The single most recent Invoiced cycle (latest period end), the
    /// one the payout job operates on.
    pub fn latest_invoiced(&self) -> Option<SettlementCycle> {
        self.cycles
            .read()
            .values()
            .filter(|c| c.status == CycleStatus::Invoiced)
            .max_by_key(|c| c.period_end)
            .cloned()
    }
}

impl Default for CycleManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_period_from_each_weekday() {
        // 2026-08-20 is a Thursday
        let thursday = date(2026, 8, 20);
        assert_eq!(thursday.weekday(), Weekday::Thu);

        // Thursday maps to itself
        assert_eq!(current_period(thursday), (date(2026, 8, 14), thursday));
        // Monday of the same week maps to that Thursday
        assert_eq!(current_period(date(2026, 8, 17)), (date(2026, 8, 14), thursday));
        // Friday rolls over to the next Thursday
        assert_eq!(
            current_period(date(2026, 8, 21)),
            (date(2026, 8, 21), date(2026, 8, 27))
        );
        // period start is always a Friday
        let (start, end) = current_period(date(2026, 8, 23));
        assert_eq!(start.weekday(), Weekday::Fri);
        assert_eq!(end.weekday(), Weekday::Thu);
    }

    #[test]
    fn test_open_for_period_is_idempotent() {
        let manager = CycleManager::new();
        let (start, end) = current_period(date(2026, 8, 17));

        let first = manager.open_for_period(start, end);
        let second = manager.open_for_period(start, end);
        assert_eq!(first.id, second.id);
    }

    #[test]
    fn test_forward_only_transitions() {
        let manager = CycleManager::new();
        let cycle = manager.open_for_period(date(2026, 8, 14), date(2026, 8, 20));

        assert!(manager.mark_paid(cycle.id).is_err());
        let invoiced = manager.mark_invoiced(cycle.id).unwrap();
        assert!(invoiced.invoice_generated_at.is_some());
        // cannot invoice twice
        assert!(manager.mark_invoiced(cycle.id).is_err());
        manager.mark_paid(cycle.id).unwrap();
        assert!(manager.mark_paid(cycle.id).is_err());
    }

    #[test]
    fn test_latest_invoiced_picks_newest_period() {
        let manager = CycleManager::new();
        let older = manager.open_for_period(date(2026, 8, 7), date(2026, 8, 13));
        let newer = manager.open_for_period(date(2026, 8, 14), date(2026, 8, 20));
        manager.mark_invoiced(older.id).unwrap();
        manager.mark_invoiced(newer.id).unwrap();

        assert_eq!(manager.latest_invoiced().map(|c| c.id), Some(newer.id));

        manager.mark_paid(newer.id).unwrap();
        assert_eq!(manager.latest_invoiced().map(|c| c.id), Some(older.id));
    }
}

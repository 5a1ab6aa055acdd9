//! Order Book
//!
//! Orders are stamped with gross, platform fee and net payable once at
//! creation and stay immutable apart from payment/stage transitions.

use chrono::{DateTime, NaiveDate, Utc};
use mart_common::Paise;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::LedgerError;

/// Payment state of an order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    /// Awaiting gateway confirmation
    Pending,
    /// Confirmed by the gateway webhook
    Paid,
    /// Refunded after payment
    Refunded,
}

/// Fulfilment stage of an order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStage {
    /// Placed by the buyer
    Created,
    /// Accepted by the merchant
    Confirmed,
    /// Shipped/delivered
    Fulfilled,
    /// Cancelled; excluded from payout netting
    Cancelled,
}

/// Order (the settlement-relevant subset)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Order id
    pub id: Uuid,
    /// Merchant the order belongs to
    pub merchant_id: Uuid,
    /// Gross amount in paise
    pub gross_paise: Paise,
    /// Platform fee stamped at creation
    pub platform_fee_paise: Paise,
    /// Net payable stamped at creation: gross - fee
    pub net_payable_paise: Paise,
    /// Payment state
    pub payment_status: PaymentStatus,
    /// Fulfilment stage
    pub stage: OrderStage,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
}

/// Order book
pub struct OrderBook {
    orders: Arc<RwLock<HashMap<Uuid, Order>>>,
}

impl OrderBook {
    /// Create an empty order book
    pub fn new() -> Self {
        Self {
            orders: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Stamp and store an order. The fee is clamped into `[0, gross]`
    /// so `net = gross - fee` can never go negative.
    pub fn create(&self, merchant_id: Uuid, gross_paise: Paise, fee_paise: Paise) -> Order {
        let gross = gross_paise.max(0);
        let fee = fee_paise.clamp(0, gross);
        let order = Order {
            id: Uuid::new_v4(),
            merchant_id,
            gross_paise: gross,
            platform_fee_paise: fee,
            net_payable_paise: gross - fee,
            payment_status: PaymentStatus::Pending,
            stage: OrderStage::Created,
            created_at: Utc::now(),
        };
        self.orders.write().insert(order.id, order.clone());
        order
    }

    /// Get an order
    pub fn get(&self, id: Uuid) -> Option<Order> {
        self.orders.read().get(&id).cloned()
    }

    /// Mark an order paid (payment webhook)
    pub fn mark_paid(&self, id: Uuid) -> Result<Order, LedgerError> {
        let mut orders = self.orders.write();
        let order = orders.get_mut(&id).ok_or(LedgerError::OrderNotFound(id))?;
        order.payment_status = PaymentStatus::Paid;
        if order.stage == OrderStage::Created {
            order.stage = OrderStage::Confirmed;
        }
        Ok(order.clone())
    }

    /// Cancel an order
    pub fn cancel(&self, id: Uuid) -> Result<Order, LedgerError> {
        let mut orders = self.orders.write();
        let order = orders.get_mut(&id).ok_or(LedgerError::OrderNotFound(id))?;
        order.stage = OrderStage::Cancelled;
        Ok(order.clone())
    }

    /// Orders for a merchant
    pub fn for_merchant(&self, merchant_id: Uuid) -> Vec<Order> {
        self.orders
            .read()
            .values()
            .filter(|o| o.merchant_id == merchant_id)
            .cloned()
            .collect()
    }

    /// Sum of net payable over a merchant's paid, non-cancelled orders
    /// created inside the period (dates inclusive).
    pub fn net_payable_in_period(&self, merchant_id: Uuid, from: NaiveDate, to: NaiveDate) -> Paise {
        self.orders
            .read()
            .values()
            .filter(|o| {
                o.merchant_id == merchant_id
                    && o.payment_status == PaymentStatus::Paid
                    && o.stage != OrderStage::Cancelled
                    && {
                        let d = o.created_at.date_naive();
                        d >= from && d <= to
                    }
            })
            .map(|o| o.net_payable_paise)
            .sum()
    }
}

impl Default for OrderBook {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_stamp_invariants() {
        let book = OrderBook::new();
        let merchant = Uuid::new_v4();

        let order = book.create(merchant, 10_000, 700);
        assert_eq!(order.net_payable_paise, 9_300);

        // fee above gross clamps down
        let order = book.create(merchant, 100, 502);
        assert_eq!(order.platform_fee_paise, 100);
        assert_eq!(order.net_payable_paise, 0);
    }

    #[test]
    fn test_netting_excludes_unpaid_and_cancelled() {
        let book = OrderBook::new();
        let merchant = Uuid::new_v4();
        let today = Utc::now().date_naive();

        let paid = book.create(merchant, 10_000, 700);
        book.mark_paid(paid.id).unwrap();

        // unpaid
        book.create(merchant, 5_000, 600);

        // paid then cancelled
        let cancelled = book.create(merchant, 8_000, 660);
        book.mark_paid(cancelled.id).unwrap();
        book.cancel(cancelled.id).unwrap();

        assert_eq!(
            book.net_payable_in_period(merchant, today - Duration::days(6), today),
            9_300
        );
    }

    #[test]
    fn test_unknown_order_errors() {
        let book = OrderBook::new();
        assert!(matches!(
            book.mark_paid(Uuid::new_v4()),
            Err(LedgerError::OrderNotFound(_))
        ));
    }
}

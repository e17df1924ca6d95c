use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cache::CacheValue;
use super::errors::OrderError;
use super::value_objects::{Delivery, Item, Payment};

// ============================================================================
// Order Aggregate
// ============================================================================
//
// The order header plus its delivery, payment and items, treated as one unit.
// Orders are created once from an inbound message and never updated.
//
// ============================================================================

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Order {
    pub order_uid: String,
    pub track_number: String,
    pub entry: String,
    pub delivery: Delivery,
    pub payment: Payment,
    pub items: Vec<Item>,
    pub locale: String,
    pub internal_signature: String,
    pub customer_id: String,
    pub delivery_service: String,
    pub shardkey: String,
    pub sm_id: i64,
    pub date_created: Option<DateTime<Utc>>,
    pub oof_shard: String,
}

impl Order {
    /// Decode an order from its JSON wire representation.
    pub fn from_json(payload: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(payload)
    }

    /// Check the fields every persisted order must carry.
    pub fn validate(&self) -> Result<(), OrderError> {
        if self.order_uid.is_empty() {
            return Err(OrderError::MissingOrderUid);
        }
        if self.delivery.name.is_empty() {
            return Err(OrderError::MissingDeliveryName);
        }
        if self.delivery.phone.is_empty() {
            return Err(OrderError::MissingDeliveryPhone);
        }
        if self.payment.transaction.is_empty() {
            return Err(OrderError::MissingPaymentTransaction);
        }

        Ok(())
    }
}

/// An order without an identity carries nothing worth caching.
impl CacheValue for Order {
    fn is_nil(&self) -> bool {
        self.order_uid.is_empty()
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

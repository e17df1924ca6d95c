use serde::{Deserialize, Serialize};

// ============================================================================
// Order Value Objects
// ============================================================================
//
// Sub-entities owned by an order. On the wire they are nested objects; in the
// store each one lives in its own table keyed by the owning `order_uid`, which
// is why the key never appears in the JSON representation.
//
// Missing fields decode to their zero value, unknown fields are ignored.
//
// ============================================================================

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq, sqlx::FromRow)]
#[serde(default)]
pub struct Delivery {
    pub name: String,
    pub phone: String,
    pub zip: String,
    pub city: String,
    pub address: String,
    pub region: String,
    pub email: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq, sqlx::FromRow)]
#[serde(default)]
pub struct Payment {
    pub transaction: String,
    pub request_id: String,
    pub currency: String,
    pub provider: String,
    pub amount: i64,
    pub payment_dt: i64,
    pub bank: String,
    pub delivery_cost: i64,
    pub goods_total: i64,
    pub custom_fee: i64,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq, sqlx::FromRow)]
#[serde(default)]
pub struct Item {
    pub chrt_id: i64,
    pub track_number: String,
    pub price: i64,
    pub rid: String,
    pub name: String,
    pub sale: i64,
    pub size: String,
    pub total_price: i64,
    pub nm_id: i64,
    pub brand: String,
    pub status: i64,
}

// ============================================================================
// Unit Tests
// ============================================================================

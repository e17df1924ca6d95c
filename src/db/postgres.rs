use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::domain::order::{Delivery, Item, Order, Payment};
use super::{OrderRepository, PersistOutcome, StoreError};

// ============================================================================
// PostgreSQL Order Repository
// ============================================================================
//
// One order = one transaction over four tables:
//
//   orders      (header, primary key order_uid)
//   deliveries  (1:1, order_uid FK)
//   payments    (1:1, order_uid FK)
//   items       (1:N, order_uid FK)
//
// The transaction guard rolls back when dropped, so every early return via `?`
// discards whatever was written before the failing statement.
//
// ============================================================================

const INSERT_ORDER: &str = "INSERT INTO orders (
        order_uid, track_number, entry, locale, internal_signature, customer_id,
        delivery_service, shardkey, sm_id, date_created, oof_shard
    ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
    ON CONFLICT (order_uid) DO NOTHING";

const INSERT_DELIVERY: &str = "INSERT INTO deliveries (
        order_uid, name, phone, zip, city, address, region, email
    ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)";

const INSERT_PAYMENT: &str = "INSERT INTO payments (
        order_uid, \"transaction\", request_id, currency, provider, amount,
        payment_dt, bank, delivery_cost, goods_total, custom_fee
    ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)";

const INSERT_ITEM: &str = "INSERT INTO items (
        order_uid, chrt_id, track_number, price, rid, name, sale, size,
        total_price, nm_id, brand, status
    ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)";

const SELECT_ORDER_COLUMNS: &str = "SELECT
        o.order_uid, o.track_number, o.entry, o.locale, o.internal_signature,
        o.customer_id, o.delivery_service, o.shardkey, o.sm_id, o.date_created,
        o.oof_shard,
        d.name, d.phone, d.zip, d.city, d.address, d.region, d.email,
        p.\"transaction\", p.request_id, p.currency, p.provider, p.amount,
        p.payment_dt, p.bank, p.delivery_cost, p.goods_total, p.custom_fee
    FROM orders o
    JOIN deliveries d ON d.order_uid = o.order_uid
    JOIN payments p ON p.order_uid = o.order_uid";

const ITEM_COLUMNS: &str = "chrt_id, track_number, price, rid, name, sale, size,
        total_price, nm_id, brand, status";

/// Header joined with its delivery and payment rows.
#[derive(sqlx::FromRow)]
struct OrderRow {
    order_uid: String,
    track_number: String,
    entry: String,
    locale: String,
    internal_signature: String,
    customer_id: String,
    delivery_service: String,
    shardkey: String,
    sm_id: i64,
    date_created: Option<DateTime<Utc>>,
    oof_shard: String,
    #[sqlx(flatten)]
    delivery: Delivery,
    #[sqlx(flatten)]
    payment: Payment,
}

impl OrderRow {
    fn into_order(self, items: Vec<Item>) -> Order {
        Order {
            order_uid: self.order_uid,
            track_number: self.track_number,
            entry: self.entry,
            delivery: self.delivery,
            payment: self.payment,
            items,
            locale: self.locale,
            internal_signature: self.internal_signature,
            customer_id: self.customer_id,
            delivery_service: self.delivery_service,
            shardkey: self.shardkey,
            sm_id: self.sm_id,
            date_created: self.date_created,
            oof_shard: self.oof_shard,
        }
    }
}

#[derive(sqlx::FromRow)]
struct OwnedItemRow {
    order_uid: String,
    #[sqlx(flatten)]
    item: Item,
}

#[derive(Clone)]
pub struct PgOrderRepository {
    pool: PgPool,
}

impl PgOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(
        url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(url)
            .await?;

        Ok(Self::new(pool))
    }

    /// Apply the bundled schema in `migrations/`.
    pub async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl OrderRepository for PgOrderRepository {
    async fn persist_order(&self, order: &Order) -> Result<PersistOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(INSERT_ORDER)
            .bind(&order.order_uid)
            .bind(&order.track_number)
            .bind(&order.entry)
            .bind(&order.locale)
            .bind(&order.internal_signature)
            .bind(&order.customer_id)
            .bind(&order.delivery_service)
            .bind(&order.shardkey)
            .bind(order.sm_id)
            .bind(order.date_created)
            .bind(&order.oof_shard)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if inserted == 0 {
            tx.rollback().await?;
            return Ok(PersistOutcome::Duplicate);
        }

        let delivery = &order.delivery;
        sqlx::query(INSERT_DELIVERY)
            .bind(&order.order_uid)
            .bind(&delivery.name)
            .bind(&delivery.phone)
            .bind(&delivery.zip)
            .bind(&delivery.city)
            .bind(&delivery.address)
            .bind(&delivery.region)
            .bind(&delivery.email)
            .execute(&mut *tx)
            .await?;

        let payment = &order.payment;
        sqlx::query(INSERT_PAYMENT)
            .bind(&order.order_uid)
            .bind(&payment.transaction)
            .bind(&payment.request_id)
            .bind(&payment.currency)
            .bind(&payment.provider)
            .bind(payment.amount)
            .bind(payment.payment_dt)
            .bind(&payment.bank)
            .bind(payment.delivery_cost)
            .bind(payment.goods_total)
            .bind(payment.custom_fee)
            .execute(&mut *tx)
            .await?;

        for item in &order.items {
            sqlx::query(INSERT_ITEM)
                .bind(&order.order_uid)
                .bind(item.chrt_id)
                .bind(&item.track_number)
                .bind(item.price)
                .bind(&item.rid)
                .bind(&item.name)
                .bind(item.sale)
                .bind(&item.size)
                .bind(item.total_price)
                .bind(item.nm_id)
                .bind(&item.brand)
                .bind(item.status)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        tracing::debug!(
            order_uid = %order.order_uid,
            item_count = order.items.len(),
            "Committed order transaction"
        );

        Ok(PersistOutcome::Inserted)
    }

    async fn find_order(&self, order_uid: &str) -> Result<Option<Order>, StoreError> {
        let query = format!("{SELECT_ORDER_COLUMNS} WHERE o.order_uid = $1");
        let Some(row) = sqlx::query_as::<_, OrderRow>(&query)
            .bind(order_uid)
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };

        let items_query =
            format!("SELECT {ITEM_COLUMNS} FROM items WHERE order_uid = $1 ORDER BY id");
        let items = sqlx::query_as::<_, Item>(&items_query)
            .bind(order_uid)
            .fetch_all(&self.pool)
            .await?;

        Ok(Some(row.into_order(items)))
    }

    async fn recent_orders(&self, limit: i64) -> Result<Vec<Order>, StoreError> {
        let query = format!("{SELECT_ORDER_COLUMNS} ORDER BY o.stored_at DESC LIMIT $1");
        let rows = sqlx::query_as::<_, OrderRow>(&query)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let uids: Vec<String> = rows.iter().map(|row| row.order_uid.clone()).collect();
        let items_query = format!(
            "SELECT order_uid, {ITEM_COLUMNS} FROM items WHERE order_uid = ANY($1) ORDER BY id"
        );
        let item_rows = sqlx::query_as::<_, OwnedItemRow>(&items_query)
            .bind(&uids)
            .fetch_all(&self.pool)
            .await?;

        let mut items_by_order: HashMap<String, Vec<Item>> = HashMap::new();
        for row in item_rows {
            items_by_order.entry(row.order_uid).or_default().push(row.item);
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let items = items_by_order.remove(&row.order_uid).unwrap_or_default();
                row.into_order(items)
            })
            .collect())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

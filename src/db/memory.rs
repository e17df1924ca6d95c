use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::order::{Delivery, Item, Order, Payment};
use super::{OrderRepository, PersistOutcome, StoreError};

// ============================================================================
// In-Memory Order Repository (tests only)
// ============================================================================
//
// Mirrors the four-table layout. Each persist stages its rows and applies them
// only on "commit", so an injected failure at any step leaves nothing behind.
//
// ============================================================================

/// Step of the persist sequence at which an injected failure fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FailPoint {
    Header,
    Delivery,
    Payment,
    Item,
    Commit,
}

#[derive(Default)]
struct Tables {
    orders: Vec<Order>,
    deliveries: Vec<(String, Delivery)>,
    payments: Vec<(String, Payment)>,
    items: Vec<(String, Item)>,
}

#[derive(Default)]
pub(crate) struct InMemoryOrderRepository {
    tables: Mutex<Tables>,
    planned_failures: Mutex<VecDeque<FailPoint>>,
    permanent_failures: Mutex<bool>,
    fail_reads: Mutex<bool>,
    persist_delay: Mutex<Option<Duration>>,
    panic_on: Mutex<Option<String>>,
    persist_calls: AtomicUsize,
    find_calls: AtomicUsize,
}

impl InMemoryOrderRepository {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Queue failures for the next persist calls, one per call, in order.
    pub(crate) fn fail_next_persists(&self, points: impl IntoIterator<Item = FailPoint>) {
        self.planned_failures.lock().unwrap().extend(points);
    }

    /// Make injected failures non-retryable.
    pub(crate) fn use_permanent_failures(&self) {
        *self.permanent_failures.lock().unwrap() = true;
    }

    pub(crate) fn fail_reads(&self, fail: bool) {
        *self.fail_reads.lock().unwrap() = fail;
    }

    pub(crate) fn delay_persists(&self, delay: Duration) {
        *self.persist_delay.lock().unwrap() = Some(delay);
    }

    pub(crate) fn panic_on_order(&self, order_uid: &str) {
        *self.panic_on.lock().unwrap() = Some(order_uid.to_string());
    }

    /// Store an order directly, bypassing injected failures.
    pub(crate) fn seed(&self, order: Order) {
        let mut tables = self.tables.lock().unwrap();
        Self::apply(&mut tables, order);
    }

    pub(crate) fn persist_calls(&self) -> usize {
        self.persist_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn find_calls(&self) -> usize {
        self.find_calls.load(Ordering::SeqCst)
    }

    /// Row counts as (orders, deliveries, payments, items).
    pub(crate) fn row_counts(&self) -> (usize, usize, usize, usize) {
        let tables = self.tables.lock().unwrap();
        (
            tables.orders.len(),
            tables.deliveries.len(),
            tables.payments.len(),
            tables.items.len(),
        )
    }

    pub(crate) fn contains(&self, order_uid: &str) -> bool {
        let tables = self.tables.lock().unwrap();
        tables.orders.iter().any(|order| order.order_uid == order_uid)
    }

    fn apply(tables: &mut Tables, order: Order) {
        let uid = order.order_uid.clone();
        tables.deliveries.push((uid.clone(), order.delivery.clone()));
        tables.payments.push((uid.clone(), order.payment.clone()));
        for item in &order.items {
            tables.items.push((uid.clone(), item.clone()));
        }
        tables.orders.push(order);
    }

    fn injected_error(&self, point: FailPoint) -> StoreError {
        if *self.permanent_failures.lock().unwrap() {
            StoreError::Database(sqlx::Error::Decode(format!("rejected at {point:?}").into()))
        } else {
            StoreError::Database(sqlx::Error::PoolTimedOut)
        }
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn persist_order(&self, order: &Order) -> Result<PersistOutcome, StoreError> {
        self.persist_calls.fetch_add(1, Ordering::SeqCst);

        let delay = *self.persist_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.panic_on.lock().unwrap().as_deref() == Some(order.order_uid.as_str()) {
            panic!("injected panic for {}", order.order_uid);
        }

        let failure = self.planned_failures.lock().unwrap().pop_front();
        let mut tables = self.tables.lock().unwrap();

        if failure == Some(FailPoint::Header) {
            return Err(self.injected_error(FailPoint::Header));
        }
        if tables.orders.iter().any(|existing| existing.order_uid == order.order_uid) {
            return Ok(PersistOutcome::Duplicate);
        }

        // Staged rows are dropped on any early return.
        let staged = order.clone();
        for point in [FailPoint::Delivery, FailPoint::Payment] {
            if failure == Some(point) {
                return Err(self.injected_error(point));
            }
        }
        if failure == Some(FailPoint::Item) && !staged.items.is_empty() {
            return Err(self.injected_error(FailPoint::Item));
        }
        if failure == Some(FailPoint::Commit) {
            return Err(self.injected_error(FailPoint::Commit));
        }

        Self::apply(&mut tables, staged);
        Ok(PersistOutcome::Inserted)
    }

    async fn find_order(&self, order_uid: &str) -> Result<Option<Order>, StoreError> {
        self.find_calls.fetch_add(1, Ordering::SeqCst);

        if *self.fail_reads.lock().unwrap() {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }

        let tables = self.tables.lock().unwrap();
        Ok(tables
            .orders
            .iter()
            .find(|order| order.order_uid == order_uid)
            .cloned())
    }

    async fn recent_orders(&self, limit: i64) -> Result<Vec<Order>, StoreError> {
        if *self.fail_reads.lock().unwrap() {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }

        let tables = self.tables.lock().unwrap();
        Ok(tables
            .orders
            .iter()
            .rev()
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        if *self.fail_reads.lock().unwrap() {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

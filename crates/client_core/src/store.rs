//! In-memory cache of the last full order fetch.

use shared::domain::{Order, OrderId, OrderStatus, StatusSummary, StretchData};
use tracing::{error, info};

use crate::{backend::OrderBackend, error::ClientError};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LoadState {
    #[default]
    Idle,
    Loaded,
    Failed(String),
}

#[derive(Debug, Default)]
pub struct OrderStore {
    orders: Vec<Order>,
    load_state: LoadState,
    revision: u64,
}

impl OrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetches every order and replaces the cache wholesale. A failed fetch
    /// keeps whatever was cached before and records the error; there is no
    /// retry.
    pub async fn load(&mut self, backend: &dyn OrderBackend) -> Result<usize, ClientError> {
        match backend.fetch_orders().await {
            Ok(orders) => {
                let count = orders.len();
                self.replace(orders);
                info!(count, "orders loaded");
                Ok(count)
            }
            Err(err) => {
                error!(error = %err, "failed to load orders");
                self.load_state = LoadState::Failed(err.to_string());
                Err(err)
            }
        }
    }

    pub fn replace(&mut self, orders: Vec<Order>) {
        self.orders = orders;
        self.load_state = LoadState::Loaded;
        self.revision += 1;
    }

    /// Patches the status of exactly one order. Returns the previous status,
    /// or `None` when the id is not cached.
    pub fn update_status(&mut self, order_id: &OrderId, status: OrderStatus) -> Option<OrderStatus> {
        let order = self.orders.iter_mut().find(|o| &o.order_id == order_id)?;
        let previous = order.order_status;
        order.order_status = status;
        self.revision += 1;
        Some(previous)
    }

    /// Swaps in a fresh copy of an order the backend echoed back. Returns the
    /// cached copy it replaced, or `None` when the id is not cached.
    pub fn replace_order(&mut self, order: Order) -> Option<Order> {
        let slot = self.orders.iter_mut().find(|o| o.order_id == order.order_id)?;
        self.revision += 1;
        Some(std::mem::replace(slot, order))
    }

    pub fn set_measurements(&mut self, order_id: &OrderId, measurements: StretchData) -> bool {
        let Some(order) = self.orders.iter_mut().find(|o| &o.order_id == order_id) else {
            return false;
        };
        order.stretch_data = Some(measurements);
        self.revision += 1;
        true
    }

    pub fn remove(&mut self, order_id: &OrderId) -> Option<Order> {
        let index = self.orders.iter().position(|o| &o.order_id == order_id)?;
        self.revision += 1;
        Some(self.orders.remove(index))
    }

    pub fn get(&self, order_id: &OrderId) -> Option<&Order> {
        self.orders.iter().find(|o| &o.order_id == order_id)
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn load_state(&self) -> &LoadState {
        &self.load_state
    }

    /// Bumped on every mutation; lets views tell whether a derived list is stale.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn summary(&self) -> StatusSummary {
        StatusSummary::from_orders(&self.orders)
    }
}

#[cfg(test)]
#[path = "tests/store_tests.rs"]
mod tests;

//! Guarded status changes: confirmation, in-flight tracking and rollback.

use std::collections::HashMap;

use shared::domain::{ActionAvailability, Order, OrderId, OrderStatus};
use thiserror::Error;

use crate::error::ClientError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationPrompt {
    pub order_id: OrderId,
    pub message: String,
}

impl ConfirmationPrompt {
    pub fn status_change(order_id: &OrderId, target: OrderStatus) -> Self {
        Self {
            order_id: order_id.clone(),
            message: format!("Mark order {order_id} as {target}?"),
        }
    }

    pub fn deletion(order_id: &OrderId) -> Self {
        Self {
            order_id: order_id.clone(),
            message: format!("Delete order {order_id}? This cannot be undone."),
        }
    }
}

/// Blocking user confirmation; returning `false` aborts with no side effect.
pub trait Confirm {
    fn confirm(&mut self, prompt: &ConfirmationPrompt) -> bool;
}

/// Confirms everything. Used for `--yes` style invocations.
pub struct AlwaysConfirm;

impl Confirm for AlwaysConfirm {
    fn confirm(&mut self, _prompt: &ConfirmationPrompt) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionPhase {
    InFlight,
    Committed,
    RolledBack,
}

/// Snapshot taken when a transition is accepted; carries what a rollback
/// restores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTransition {
    pub order_id: OrderId,
    /// Backend key the status request is addressed to.
    pub record_id: OrderId,
    pub previous: OrderStatus,
    pub target: OrderStatus,
}

#[derive(Debug, Error)]
pub enum TransitionError {
    #[error("status change declined")]
    Declined,
    #[error("order {0} is not loaded")]
    UnknownOrder(OrderId),
    #[error("a status change for order {0} is already in flight")]
    AlreadyInFlight(OrderId),
    #[error("order cannot move from {from} to {to}")]
    NotAllowed { from: OrderStatus, to: OrderStatus },
    #[error(transparent)]
    Backend(#[from] ClientError),
}

/// Rows with a request outstanding. Their action buttons are all disabled
/// until the request settles.
#[derive(Debug, Default)]
pub struct InFlight {
    pending: HashMap<OrderId, PendingTransition>,
}

impl InFlight {
    pub fn contains(&self, order_id: &OrderId) -> bool {
        self.pending.contains_key(order_id)
    }

    /// Validates and records a transition away from the order's current status.
    pub fn begin(
        &mut self,
        order: &Order,
        target: OrderStatus,
    ) -> Result<PendingTransition, TransitionError> {
        let order_id = &order.order_id;
        let current = order.order_status;
        if self.contains(order_id) {
            return Err(TransitionError::AlreadyInFlight(order_id.clone()));
        }
        if !current.allows(target) {
            return Err(TransitionError::NotAllowed {
                from: current,
                to: target,
            });
        }
        let pending = PendingTransition {
            order_id: order_id.clone(),
            record_id: order.record_key().clone(),
            previous: current,
            target,
        };
        self.pending.insert(order_id.clone(), pending.clone());
        Ok(pending)
    }

    pub fn settle(&mut self, order_id: &OrderId) -> Option<PendingTransition> {
        self.pending.remove(order_id)
    }

    /// Button state for a row: the status projection, or everything disabled
    /// while a request for the row is outstanding.
    pub fn availability(&self, order_id: &OrderId, status: OrderStatus) -> ActionAvailability {
        if self.contains(order_id) {
            ActionAvailability::all_disabled()
        } else {
            ActionAvailability::for_status(status)
        }
    }
}

#[cfg(test)]
#[path = "tests/transition_tests.rs"]
mod tests;

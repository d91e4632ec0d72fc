//! The order list view-model: store, filters, pagination and status actions.

use std::sync::Arc;

use chrono::NaiveDate;
use shared::domain::{
    ActionAvailability, Order, OrderId, OrderStatus, StatusAction, StatusSummary, StretchData,
};
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::{
    backend::OrderBackend,
    error::{ClientError, ErrorCategory},
    filter::{filter_positions, FilterCriteria, FulfillmentFilter, StatusFilter},
    pagination::Pagination,
    store::{LoadState, OrderStore},
    transition::{
        Confirm, ConfirmationPrompt, InFlight, PendingTransition, TransitionError,
        TransitionPhase,
    },
};

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error(ErrorCategory),
}

#[derive(Debug, Clone, PartialEq)]
pub enum BoardEvent {
    Loaded {
        count: usize,
    },
    LoadFailed {
        message: String,
        category: ErrorCategory,
    },
    TransitionSettled {
        order_id: OrderId,
        phase: TransitionPhase,
        status: OrderStatus,
    },
    OrderDeleted {
        order_id: OrderId,
    },
    /// The backend rejected the token; the holder must drop it.
    SessionExpired,
    Notice {
        kind: NoticeKind,
        message: String,
    },
}

/// One rendered page of the filtered list.
#[derive(Debug)]
pub struct PageView<'a> {
    pub rows: Vec<&'a Order>,
    pub page: usize,
    pub size: usize,
    pub total_pages: usize,
    pub total: usize,
}

pub struct OrderBoard {
    backend: Arc<dyn OrderBackend>,
    store: OrderStore,
    criteria: FilterCriteria,
    pagination: Pagination,
    in_flight: InFlight,
    visible: Vec<usize>,
    events: broadcast::Sender<BoardEvent>,
}

impl OrderBoard {
    pub fn new(backend: Arc<dyn OrderBackend>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            backend,
            store: OrderStore::new(),
            criteria: FilterCriteria::default(),
            pagination: Pagination::default(),
            in_flight: InFlight::default(),
            visible: Vec::new(),
            events,
        }
    }

    pub fn with_criteria(mut self, criteria: FilterCriteria) -> Self {
        self.criteria = criteria;
        self.refresh();
        self
    }

    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = pagination;
        self.refresh();
        self
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<BoardEvent> {
        self.events.subscribe()
    }

    pub fn backend(&self) -> &Arc<dyn OrderBackend> {
        &self.backend
    }

    pub fn store(&self) -> &OrderStore {
        &self.store
    }

    pub fn load_state(&self) -> &LoadState {
        self.store.load_state()
    }

    pub async fn load(&mut self) -> Result<usize, ClientError> {
        let result = self.store.load(self.backend.as_ref()).await;
        match &result {
            Ok(count) => self.emit(BoardEvent::Loaded { count: *count }),
            Err(err) => {
                self.report_auth_failure(err);
                self.emit(BoardEvent::LoadFailed {
                    message: err.to_string(),
                    category: err.category(false),
                });
            }
        }
        self.refresh();
        result
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    pub fn set_criteria(&mut self, criteria: FilterCriteria) {
        self.criteria = criteria;
        self.refresh();
    }

    pub fn set_status_filter(&mut self, status: StatusFilter) {
        self.criteria.status = status;
        self.refresh();
    }

    pub fn set_fulfillment_filter(&mut self, fulfillment: FulfillmentFilter) {
        self.criteria.fulfillment = fulfillment;
        self.refresh();
    }

    pub fn set_search_text(&mut self, search_text: impl Into<String>) {
        self.criteria.search_text = search_text.into();
        self.refresh();
    }

    pub fn set_date(&mut self, date: Option<NaiveDate>) {
        self.criteria.date = date;
        self.refresh();
    }

    pub fn pagination(&self) -> Pagination {
        self.pagination
    }

    pub fn set_page(&mut self, page: usize) {
        self.pagination.set_page(page);
        self.pagination.clamp(self.visible.len());
    }

    pub fn set_page_size(&mut self, size: usize) {
        self.pagination.set_size(size);
    }

    /// Filtered orders in store order.
    pub fn visible(&self) -> Vec<&Order> {
        let orders = self.store.orders();
        self.visible.iter().map(|&index| &orders[index]).collect()
    }

    pub fn visible_len(&self) -> usize {
        self.visible.len()
    }

    pub fn page_view(&self) -> PageView<'_> {
        let orders = self.store.orders();
        let total = self.visible.len();
        let rows = self
            .pagination
            .slice(&self.visible)
            .iter()
            .map(|&index| &orders[index])
            .collect();
        PageView {
            rows,
            page: self.pagination.page(),
            size: self.pagination.size(),
            total_pages: self.pagination.total_pages(total),
            total,
        }
    }

    pub fn availability(&self, order_id: &OrderId) -> Option<ActionAvailability> {
        let order = self.store.get(order_id)?;
        Some(self.in_flight.availability(order_id, order.order_status))
    }

    pub fn phase(&self, order_id: &OrderId) -> Option<TransitionPhase> {
        self.in_flight
            .contains(order_id)
            .then_some(TransitionPhase::InFlight)
    }

    pub fn summary(&self) -> StatusSummary {
        self.store.summary()
    }

    /// Confirms the change and disables the row's actions. Nothing is sent yet.
    pub fn begin_transition(
        &mut self,
        order_id: &OrderId,
        target: OrderStatus,
        confirm: &mut dyn Confirm,
    ) -> Result<PendingTransition, TransitionError> {
        let order = self
            .store
            .get(order_id)
            .ok_or_else(|| TransitionError::UnknownOrder(order_id.clone()))?;
        let current = order.order_status;
        if self.in_flight.contains(order_id) {
            return Err(TransitionError::AlreadyInFlight(order_id.clone()));
        }
        if !current.allows(target) {
            return Err(TransitionError::NotAllowed {
                from: current,
                to: target,
            });
        }
        if !confirm.confirm(&ConfirmationPrompt::status_change(order_id, target)) {
            info!(order_id = %order_id, status = %target, "status change declined");
            return Err(TransitionError::Declined);
        }
        self.in_flight.begin(order, target)
    }

    pub async fn submit(&self, pending: &PendingTransition) -> Result<Option<Order>, ClientError> {
        self.backend
            .update_status(&pending.record_id, &pending.order_id, pending.target)
            .await
    }

    /// Commits or rolls back a transition once its request has settled.
    ///
    /// An echoed record replaces the cached one when it is the same order and
    /// already carries the target status; otherwise only the status is patched.
    pub fn complete_transition(
        &mut self,
        pending: PendingTransition,
        result: Result<Option<Order>, ClientError>,
    ) -> Result<OrderStatus, TransitionError> {
        self.in_flight.settle(&pending.order_id);
        match result {
            Ok(echo) => {
                let applied = match echo {
                    Some(order)
                        if order.order_id == pending.order_id
                            && order.order_status == pending.target =>
                    {
                        self.store.replace_order(order).is_some()
                    }
                    _ => self
                        .store
                        .update_status(&pending.order_id, pending.target)
                        .is_some(),
                };
                if !applied {
                    warn!(
                        order_id = %pending.order_id,
                        status = %pending.target,
                        "status updated for an order no longer in the list"
                    );
                    self.refresh();
                    return Ok(pending.target);
                }
                info!(
                    order_id = %pending.order_id,
                    status = %pending.target,
                    "order status updated"
                );
                self.emit(BoardEvent::TransitionSettled {
                    order_id: pending.order_id.clone(),
                    phase: TransitionPhase::Committed,
                    status: pending.target,
                });
                self.emit(BoardEvent::Notice {
                    kind: NoticeKind::Success,
                    message: format!(
                        "Order {} marked as {}",
                        pending.order_id, pending.target
                    ),
                });
                self.refresh();
                Ok(pending.target)
            }
            Err(err) => {
                error!(
                    order_id = %pending.order_id,
                    status = %pending.target,
                    error = %err,
                    "order status update failed"
                );
                let current = self.store.get(&pending.order_id).map(|o| o.order_status);
                if current.is_some_and(|status| status != pending.previous) {
                    self.store
                        .update_status(&pending.order_id, pending.previous);
                    self.refresh();
                }
                self.report_auth_failure(&err);
                self.emit(BoardEvent::TransitionSettled {
                    order_id: pending.order_id.clone(),
                    phase: TransitionPhase::RolledBack,
                    status: pending.previous,
                });
                self.emit(BoardEvent::Notice {
                    kind: NoticeKind::Error(err.category(true)),
                    message: format!("Could not update order {}: {err}", pending.order_id),
                });
                Err(TransitionError::Backend(err))
            }
        }
    }

    pub async fn transition(
        &mut self,
        order_id: &OrderId,
        target: OrderStatus,
        confirm: &mut dyn Confirm,
    ) -> Result<OrderStatus, TransitionError> {
        let pending = self.begin_transition(order_id, target, confirm)?;
        let result = self.submit(&pending).await;
        self.complete_transition(pending, result)
    }

    pub async fn apply_action(
        &mut self,
        order_id: &OrderId,
        action: StatusAction,
        confirm: &mut dyn Confirm,
    ) -> Result<OrderStatus, TransitionError> {
        self.transition(order_id, action.target(), confirm).await
    }

    /// Deletes on the backend first; the row leaves the store only once the
    /// backend has confirmed.
    pub async fn delete(
        &mut self,
        order_id: &OrderId,
        confirm: &mut dyn Confirm,
    ) -> Result<Order, TransitionError> {
        if self.store.get(order_id).is_none() {
            return Err(TransitionError::UnknownOrder(order_id.clone()));
        }
        if self.in_flight.contains(order_id) {
            return Err(TransitionError::AlreadyInFlight(order_id.clone()));
        }
        if !confirm.confirm(&ConfirmationPrompt::deletion(order_id)) {
            return Err(TransitionError::Declined);
        }

        if let Err(err) = self.backend.delete_order(order_id).await {
            error!(order_id = %order_id, error = %err, "order delete failed");
            self.report_auth_failure(&err);
            self.emit(BoardEvent::Notice {
                kind: NoticeKind::Error(err.category(true)),
                message: format!("Could not delete order {order_id}: {err}"),
            });
            return Err(TransitionError::Backend(err));
        }

        let removed = self
            .store
            .remove(order_id)
            .ok_or_else(|| TransitionError::UnknownOrder(order_id.clone()))?;
        info!(order_id = %order_id, "order deleted");
        self.emit(BoardEvent::OrderDeleted {
            order_id: order_id.clone(),
        });
        self.emit(BoardEvent::Notice {
            kind: NoticeKind::Success,
            message: format!("Order {order_id} deleted"),
        });
        self.refresh();
        Ok(removed)
    }

    /// Saves tailoring measurements for one order and patches the cached copy.
    pub async fn update_measurements(
        &mut self,
        order_id: &OrderId,
        measurements: StretchData,
    ) -> Result<(), ClientError> {
        if let Err(err) = self
            .backend
            .update_measurements(order_id, &measurements)
            .await
        {
            error!(order_id = %order_id, error = %err, "measurement update failed");
            self.report_auth_failure(&err);
            self.emit(BoardEvent::Notice {
                kind: NoticeKind::Error(err.category(true)),
                message: format!("Could not save measurements for order {order_id}: {err}"),
            });
            return Err(err);
        }

        let cached = self.store.set_measurements(order_id, measurements);
        info!(order_id = %order_id, cached, "measurements updated");
        self.emit(BoardEvent::Notice {
            kind: NoticeKind::Success,
            message: format!("Measurements saved for order {order_id}"),
        });
        Ok(())
    }

    pub async fn order_detail(&self, order_id: &OrderId) -> Result<Order, ClientError> {
        self.backend.fetch_order(order_id).await
    }

    pub async fn total_fulfilled_sales(&self) -> Result<f64, ClientError> {
        self.backend.total_fulfilled_sales().await
    }

    pub async fn total_sales_on(&self, date: NaiveDate) -> Result<f64, ClientError> {
        self.backend.total_sales_on(date).await
    }

    fn refresh(&mut self) {
        self.visible = filter_positions(self.store.orders(), &self.criteria);
        self.pagination.clamp(self.visible.len());
    }

    fn report_auth_failure(&self, err: &ClientError) {
        if err.requires_reauth() {
            warn!("backend rejected the session token");
            self.emit(BoardEvent::SessionExpired);
        }
    }

    fn emit(&self, event: BoardEvent) {
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
#[path = "tests/board_tests.rs"]
mod tests;

//! Client-side view-model for the order administration console.
//!
//! [`OrderBoard`] owns the cached order list and derives everything the list
//! view shows from it: the filtered subset, the current page and the per-row
//! action buttons. Status changes go through a confirm, send, then commit or
//! roll back cycle so a failed request never leaves a row disabled.
//!
//! All state lives on one logical thread; the board is driven through
//! `&mut self` and never shared.

pub mod backend;
pub mod board;
pub mod error;
pub mod filter;
pub mod pagination;
pub mod session;
pub mod store;
pub mod transition;

pub use backend::{BackendOptions, HttpOrderBackend, OrderBackend};
pub use board::{BoardEvent, NoticeKind, OrderBoard, PageView};
pub use error::{ClientError, ErrorCategory};
pub use filter::{filter_orders, FilterCriteria, FulfillmentFilter, StatusFilter};
pub use pagination::{Pagination, DEFAULT_PAGE_SIZE};
pub use session::TokenStore;
pub use store::{LoadState, OrderStore};
pub use transition::{
    AlwaysConfirm, Confirm, ConfirmationPrompt, PendingTransition, TransitionError,
    TransitionPhase,
};

#[cfg(test)]
#[path = "tests/fixtures.rs"]
pub(crate) mod fixtures;

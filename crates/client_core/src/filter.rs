//! Derives the visible subset of the order list from the active criteria.

use std::{fmt, str::FromStr};

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, TimeZone, Utc};
use shared::domain::{Order, OrderStatus};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    Only(OrderStatus),
}

impl StatusFilter {
    pub fn matches(self, status: OrderStatus) -> bool {
        match self {
            Self::All => true,
            Self::Only(wanted) => wanted == status,
        }
    }
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        s.parse::<OrderStatus>()
            .map(Self::Only)
            .map_err(|err| err.to_string())
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("All"),
            Self::Only(status) => write!(f, "{status}"),
        }
    }
}

/// Fulfilment is a derived boolean view of the status, not a second axis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FulfillmentFilter {
    #[default]
    All,
    Fullfilled,
    UnFullfilled,
}

impl FulfillmentFilter {
    pub fn matches(self, status: OrderStatus) -> bool {
        match self {
            Self::All => true,
            Self::Fullfilled => status.is_fulfilled(),
            Self::UnFullfilled => !status.is_fulfilled(),
        }
    }
}

impl FromStr for FulfillmentFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "fulfilled" | "fullfilled" => Ok(Self::Fullfilled),
            "unfulfilled" | "unfullfilled" => Ok(Self::UnFullfilled),
            other => Err(format!("unknown fulfillment filter '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterCriteria {
    pub status: StatusFilter,
    pub fulfillment: FulfillmentFilter,
    /// Case-sensitive substring of the order id.
    pub search_text: String,
    pub date: Option<NaiveDate>,
    /// Offset whose calendar day the date filter compares against.
    pub offset: FixedOffset,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            status: StatusFilter::All,
            fulfillment: FulfillmentFilter::All,
            search_text: String::new(),
            date: None,
            offset: utc_offset(),
        }
    }
}

impl FilterCriteria {
    pub fn with_offset(mut self, offset: FixedOffset) -> Self {
        self.offset = offset;
        self
    }

    /// Selects the calendar day containing `instant`; time of day is dropped.
    pub fn with_date_at(mut self, instant: DateTime<Utc>) -> Self {
        self.date = Some(local_day(instant, &self.offset));
        self
    }

    pub fn matches(&self, order: &Order) -> bool {
        self.status.matches(order.order_status)
            && self.fulfillment.matches(order.order_status)
            && (self.search_text.is_empty()
                || order.order_id.as_str().contains(self.search_text.as_str()))
            && self
                .date
                .map_or(true, |day| local_day(order.order_date, &self.offset) == day)
    }

    pub fn is_unfiltered(&self) -> bool {
        self.status == StatusFilter::All
            && self.fulfillment == FulfillmentFilter::All
            && self.search_text.is_empty()
            && self.date.is_none()
    }
}

/// Orders passing every predicate, in store order.
pub fn filter_orders<'a>(orders: &'a [Order], criteria: &FilterCriteria) -> Vec<&'a Order> {
    if orders.is_empty() {
        return Vec::new();
    }
    orders.iter().filter(|order| criteria.matches(order)).collect()
}

/// Same as [`filter_orders`] but yields store positions.
pub fn filter_positions(orders: &[Order], criteria: &FilterCriteria) -> Vec<usize> {
    if orders.is_empty() {
        return Vec::new();
    }
    orders
        .iter()
        .enumerate()
        .filter(|(_, order)| criteria.matches(order))
        .map(|(index, _)| index)
        .collect()
}

pub fn local_day(instant: DateTime<Utc>, offset: &FixedOffset) -> NaiveDate {
    offset.from_utc_datetime(&instant.naive_utc()).date_naive()
}

fn utc_offset() -> FixedOffset {
    Utc.fix()
}

#[cfg(test)]
#[path = "tests/filter_tests.rs"]
mod tests;

use serde::{Deserialize, Serialize};

use crate::domain::{Order, OrderId, OrderStatus, StretchData};

/// `GET billing-details`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrdersEnvelope {
    #[serde(default)]
    pub result: Vec<Order>,
}

/// `GET get-order-by-orderId/{orderId}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderEnvelope {
    pub order: Order,
}

/// `PUT billing-status/{orderId}`. Older backend builds read `newStatus`,
/// newer ones `orderStatus`; both carry the same value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdateRequest {
    pub order_id: OrderId,
    pub order_status: OrderStatus,
    pub new_status: OrderStatus,
}

impl StatusUpdateRequest {
    pub fn new(order_id: OrderId, status: OrderStatus) -> Self {
        Self {
            order_id,
            order_status: status,
            new_status: status,
        }
    }
}

/// `PUT billing-details/{orderId}`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasurementsUpdateRequest {
    pub stretch_data: StretchData,
}

/// Echo of a status update. The record is optional; anything unrecognised
/// falls through to `Other`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum StatusUpdateResponse {
    Result { result: Order },
    Order { order: Order },
    Bare(Order),
    Other(serde_json::Value),
}

impl StatusUpdateResponse {
    pub fn into_order(self) -> Option<Order> {
        match self {
            Self::Result { result } => Some(result),
            Self::Order { order } => Some(order),
            Self::Bare(order) => Some(order),
            Self::Other(_) => None,
        }
    }
}

/// `GET total-sales/fulfilled` and `GET total-sales-of-date/{date}`.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
pub enum SalesTotal {
    Bare(f64),
    Wrapped {
        #[serde(alias = "totalSales", alias = "total", alias = "result")]
        total_sales: f64,
    },
}

impl SalesTotal {
    pub fn amount(self) -> f64 {
        match self {
            Self::Bare(amount) => amount,
            Self::Wrapped { total_sales } => total_sales,
        }
    }
}

/// `POST verify-token`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenVerification {
    pub code: u16,
    #[serde(default)]
    pub is_valid: bool,
}

impl TokenVerification {
    pub fn is_accepted(&self) -> bool {
        self.code == 200 && self.is_valid
    }
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;

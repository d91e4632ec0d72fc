use std::{collections::BTreeMap, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::Value;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                deserializer.deserialize_any(OpaqueIdVisitor).map(Self)
            }
        }
    };
}

/// Accepts ids emitted either as JSON strings or as bare integers.
struct OpaqueIdVisitor;

impl<'de> de::Visitor<'de> for OpaqueIdVisitor {
    type Value = String;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a string or integer identifier")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Ok(v.to_string())
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
        Ok(v)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Ok(v.to_string())
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(v.to_string())
    }
}

id_newtype!(OrderId);
id_newtype!(ProductId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    Pending,
    Dispatched,
    Fullfilled,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 4] = [
        OrderStatus::Pending,
        OrderStatus::Dispatched,
        OrderStatus::Fullfilled,
        OrderStatus::Cancelled,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Dispatched => "Dispatched",
            Self::Fullfilled => "Fullfilled",
            Self::Cancelled => "Cancelled",
        }
    }

    pub fn is_fulfilled(self) -> bool {
        self == Self::Fullfilled
    }

    /// No transition leaves a cancelled order.
    pub fn is_terminal(self) -> bool {
        self == Self::Cancelled
    }

    /// Whether the console may move an order from `self` to `target`.
    ///
    /// The action projection is the only guard besides terminality, so the
    /// buttons a row shows and the transitions it accepts never disagree for
    /// a live order.
    pub fn allows(self, target: OrderStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        match StatusAction::for_target(target) {
            Some(action) => ActionAvailability::for_status(self).is_enabled(action),
            None => false,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown order status '{}'", self.0)
    }
}

impl std::error::Error for UnknownStatus {}

impl FromStr for OrderStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "dispatched" => Ok(Self::Dispatched),
            "fullfilled" | "fulfilled" => Ok(Self::Fullfilled),
            "cancelled" | "canceled" => Ok(Self::Cancelled),
            _ => Err(UnknownStatus(s.to_string())),
        }
    }
}

/// Per-row action buttons of the order list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusAction {
    Dispatch,
    Fulfill,
    Cancel,
}

impl StatusAction {
    pub const fn target(self) -> OrderStatus {
        match self {
            Self::Dispatch => OrderStatus::Dispatched,
            Self::Fulfill => OrderStatus::Fullfilled,
            Self::Cancel => OrderStatus::Cancelled,
        }
    }

    pub fn for_target(status: OrderStatus) -> Option<Self> {
        match status {
            OrderStatus::Pending => None,
            OrderStatus::Dispatched => Some(Self::Dispatch),
            OrderStatus::Fullfilled => Some(Self::Fulfill),
            OrderStatus::Cancelled => Some(Self::Cancel),
        }
    }
}

/// Which action buttons are enabled for a row. Always derived from the
/// order's status on read; never stored next to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionAvailability {
    pub dispatch: bool,
    pub fulfill: bool,
    pub cancel: bool,
}

impl ActionAvailability {
    pub fn for_status(status: OrderStatus) -> Self {
        Self {
            dispatch: !matches!(status, OrderStatus::Dispatched | OrderStatus::Fullfilled),
            fulfill: status != OrderStatus::Fullfilled,
            cancel: status != OrderStatus::Cancelled,
        }
    }

    pub fn all_disabled() -> Self {
        Self {
            dispatch: false,
            fulfill: false,
            cancel: false,
        }
    }

    pub fn is_enabled(&self, action: StatusAction) -> bool {
        match action {
            StatusAction::Dispatch => self.dispatch,
            StatusAction::Fulfill => self.fulfill,
            StatusAction::Cancel => self.cancel,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub product_id: ProductId,
    #[serde(default)]
    pub title: String,
    pub quantity: u32,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stitched_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount: Option<f64>,
    #[serde(default)]
    pub is_stitching: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stretch_data: Vec<StretchData>,
}

impl LineItem {
    pub fn unit_price(&self) -> f64 {
        self.price + self.stitched_price.unwrap_or(0.0)
    }

    /// `discount` is carried for display only; the backend prices lines
    /// without it.
    pub fn line_total(&self) -> f64 {
        self.unit_price() * f64::from(self.quantity)
    }
}

/// Tailoring measurements for a stitched garment. Sections are free-form on
/// the backend, so values stay as raw JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StretchData {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub kameez: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub shalwar: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fit_preferences: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownMeasurement(pub String);

impl fmt::Display for UnknownMeasurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown measurement '{}' (expected kameez.<field>, shalwar.<field>, \
             fitPreferences.<field>, height or weight)",
            self.0
        )
    }
}

impl std::error::Error for UnknownMeasurement {}

impl StretchData {
    pub fn is_empty(&self) -> bool {
        self.kameez.is_empty()
            && self.shalwar.is_empty()
            && self.fit_preferences.is_empty()
            && self.height.is_none()
            && self.weight.is_none()
    }

    /// Sets one measurement addressed as `section.field`, or `height`/`weight`.
    /// Values are stored as strings, the way the backend's edit form sends them.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), UnknownMeasurement> {
        let value = Value::String(value.trim().to_string());
        let Some((section, field)) = key.split_once('.') else {
            match key {
                "height" => self.height = Some(value),
                "weight" => self.weight = Some(value),
                _ => return Err(UnknownMeasurement(key.to_string())),
            }
            return Ok(());
        };
        let map = match section {
            "kameez" if !field.is_empty() => &mut self.kameez,
            "shalwar" if !field.is_empty() => &mut self.shalwar,
            "fitPreferences" if !field.is_empty() => &mut self.fit_preferences,
            _ => return Err(UnknownMeasurement(key.to_string())),
        };
        map.insert(field.to_string(), value);
        Ok(())
    }

    /// Non-empty sections with their display titles.
    pub fn sections(&self) -> impl Iterator<Item = (&'static str, &BTreeMap<String, Value>)> {
        [
            ("Kameez", &self.kameez),
            ("Shalwar", &self.shalwar),
            ("Fit preferences", &self.fit_preferences),
        ]
        .into_iter()
        .filter(|(_, map)| !map.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Storage key assigned by the backend. Status updates are addressed by
    /// it; everything else uses `order_id`.
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub record_id: Option<OrderId>,
    pub order_id: OrderId,
    pub order_date: DateTime<Utc>,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(alias = "status")]
    pub order_status: OrderStatus,
    #[serde(default)]
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apartment: Option<String>,
    #[serde(default)]
    pub post_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_information: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cash_on_delivery: Option<bool>,
    #[serde(default)]
    pub products: Vec<LineItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stretch_data: Option<StretchData>,
}

impl Order {
    /// Path key for `billing-status`; falls back to the display id for
    /// backends that do not expose `_id`.
    pub fn record_key(&self) -> &OrderId {
        self.record_id.as_ref().unwrap_or(&self.order_id)
    }

    pub fn customer_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    pub fn total_price(&self) -> f64 {
        self.products.iter().map(LineItem::line_total).sum()
    }

    pub fn availability(&self) -> ActionAvailability {
        ActionAvailability::for_status(self.order_status)
    }
}

/// Per-status order counts shown on the dashboard cards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusSummary {
    pub total: usize,
    pub pending: usize,
    pub dispatched: usize,
    pub fulfilled: usize,
    pub cancelled: usize,
}

impl StatusSummary {
    pub fn from_orders<'a>(orders: impl IntoIterator<Item = &'a Order>) -> Self {
        let mut summary = Self::default();
        for order in orders {
            summary.total += 1;
            match order.order_status {
                OrderStatus::Pending => summary.pending += 1,
                OrderStatus::Dispatched => summary.dispatched += 1,
                OrderStatus::Fullfilled => summary.fulfilled += 1,
                OrderStatus::Cancelled => summary.cancelled += 1,
            }
        }
        summary
    }

    pub fn count(&self, status: OrderStatus) -> usize {
        match status {
            OrderStatus::Pending => self.pending,
            OrderStatus::Dispatched => self.dispatched,
            OrderStatus::Fullfilled => self.fulfilled,
            OrderStatus::Cancelled => self.cancelled,
        }
    }
}

#[cfg(test)]
#[path = "tests/domain_tests.rs"]
mod tests;

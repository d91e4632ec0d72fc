use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use shared::{
    domain::{Order, OrderId, OrderStatus, StretchData},
    protocol::{
        MeasurementsUpdateRequest, OrderEnvelope, OrdersEnvelope, SalesTotal,
        StatusUpdateRequest, StatusUpdateResponse, TokenVerification,
    },
};
use tracing::{debug, warn};
use url::Url;

use crate::error::ClientError;

/// REST surface of the order backend consumed by the console.
#[async_trait]
pub trait OrderBackend: Send + Sync {
    async fn fetch_orders(&self) -> Result<Vec<Order>, ClientError>;
    async fn fetch_order(&self, order_id: &OrderId) -> Result<Order, ClientError>;
    /// `record_id` addresses the request path; `order_id` travels in the
    /// body. Returns the echoed record when the backend sends one back.
    async fn update_status(
        &self,
        record_id: &OrderId,
        order_id: &OrderId,
        status: OrderStatus,
    ) -> Result<Option<Order>, ClientError>;
    async fn update_measurements(
        &self,
        order_id: &OrderId,
        measurements: &StretchData,
    ) -> Result<(), ClientError>;
    async fn delete_order(&self, order_id: &OrderId) -> Result<(), ClientError>;
    async fn total_fulfilled_sales(&self) -> Result<f64, ClientError>;
    async fn total_sales_on(&self, date: NaiveDate) -> Result<f64, ClientError>;
    async fn verify_token(&self) -> Result<bool, ClientError>;
}

#[derive(Debug, Clone)]
pub struct BackendOptions {
    pub base_url: String,
    pub token: Option<String>,
    /// `None` leaves the transport default in place.
    pub request_timeout: Option<Duration>,
}

impl BackendOptions {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
            request_timeout: None,
        }
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.trim().is_empty());
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }
}

pub struct HttpOrderBackend {
    http: Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpOrderBackend {
    pub fn new(options: BackendOptions) -> Result<Self, ClientError> {
        let base_url = normalize_base_url(&options.base_url)?;
        let mut builder = Client::builder();
        if let Some(timeout) = options.request_timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            http: builder.build()?,
            base_url,
            token: options.token,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        self.base_url
            .join(path)
            .map_err(|source| ClientError::InvalidUrl {
                url: format!("{}{path}", self.base_url),
                source,
            })
    }

    fn order_endpoint(&self, prefix: &str, order_id: &OrderId) -> Result<Url, ClientError> {
        let mut url = self.endpoint(prefix)?;
        if url.cannot_be_a_base() {
            return Err(ClientError::Validation(format!(
                "backend url {url} cannot take a path"
            )));
        }
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.push(order_id.as_str());
        }
        Ok(url)
    }

    async fn get_order_json<T: DeserializeOwned>(
        &self,
        prefix: &str,
        order_id: &OrderId,
    ) -> Result<T, ClientError> {
        let url = self.order_endpoint(prefix, order_id)?;
        debug!(%url, "GET");
        let response = self.send(self.http.get(url), Some(order_id)).await?;
        Ok(response.json().await?)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(
        &self,
        request: RequestBuilder,
        order_id: Option<&OrderId>,
    ) -> Result<Response, ClientError> {
        let response = self.authorized(request).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        warn!(status = status.as_u16(), "order backend returned an error");
        Err(ClientError::from_api(status.as_u16(), &body, order_id))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let url = self.endpoint(path)?;
        debug!(%url, "GET");
        let response = self.send(self.http.get(url), None).await?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl OrderBackend for HttpOrderBackend {
    async fn fetch_orders(&self) -> Result<Vec<Order>, ClientError> {
        let envelope: OrdersEnvelope = self.get_json("billing-details").await?;
        Ok(envelope.result)
    }

    async fn fetch_order(&self, order_id: &OrderId) -> Result<Order, ClientError> {
        let envelope: OrderEnvelope = self
            .get_order_json("get-order-by-orderId", order_id)
            .await?;
        Ok(envelope.order)
    }

    async fn update_status(
        &self,
        record_id: &OrderId,
        order_id: &OrderId,
        status: OrderStatus,
    ) -> Result<Option<Order>, ClientError> {
        let url = self.order_endpoint("billing-status", record_id)?;
        debug!(%url, %status, "PUT");
        let response = self
            .send(
                self.http
                    .put(url)
                    .json(&StatusUpdateRequest::new(order_id.clone(), status)),
                Some(order_id),
            )
            .await?;

        let body = response.bytes().await?;
        if body.is_empty() {
            return Ok(None);
        }
        Ok(serde_json::from_slice::<StatusUpdateResponse>(&body)
            .ok()
            .and_then(StatusUpdateResponse::into_order))
    }

    async fn update_measurements(
        &self,
        order_id: &OrderId,
        measurements: &StretchData,
    ) -> Result<(), ClientError> {
        let url = self.order_endpoint("billing-details", order_id)?;
        debug!(%url, "PUT measurements");
        let body = MeasurementsUpdateRequest {
            stretch_data: measurements.clone(),
        };
        self.send(self.http.put(url).json(&body), Some(order_id))
            .await?;
        Ok(())
    }

    async fn delete_order(&self, order_id: &OrderId) -> Result<(), ClientError> {
        let url = self.order_endpoint("billing-details", order_id)?;
        debug!(%url, "DELETE");
        self.send(self.http.delete(url), Some(order_id)).await?;
        Ok(())
    }

    async fn total_fulfilled_sales(&self) -> Result<f64, ClientError> {
        let total: SalesTotal = self.get_json("total-sales/fulfilled").await?;
        Ok(total.amount())
    }

    async fn total_sales_on(&self, date: NaiveDate) -> Result<f64, ClientError> {
        let total: SalesTotal = self
            .get_json(&format!("total-sales-of-date/{}", date.format("%Y-%m-%d")))
            .await?;
        Ok(total.amount())
    }

    async fn verify_token(&self) -> Result<bool, ClientError> {
        if self.token.is_none() {
            return Ok(false);
        }
        let url = self.endpoint("verify-token")?;
        let response = self
            .send(self.http.post(url).json(&serde_json::json!({})), None)
            .await;
        match response {
            Ok(response) => {
                let verification: TokenVerification = response.json().await?;
                Ok(verification.is_accepted())
            }
            Err(ClientError::Unauthorized(_)) => Ok(false),
            Err(err) => Err(err),
        }
    }
}

/// Joins relative paths under the configured prefix, so the base must end
/// with a slash.
fn normalize_base_url(raw: &str) -> Result<Url, ClientError> {
    let trimmed = raw.trim();
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    };
    Url::parse(&with_slash).map_err(|source| ClientError::InvalidUrl {
        url: raw.to_string(),
        source,
    })
}

#[cfg(test)]
#[path = "tests/backend_tests.rs"]
mod tests;

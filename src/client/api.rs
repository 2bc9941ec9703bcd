use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::dto::{AdminOrderQuery, OrderView};
use crate::models::order::OrderStatus;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Réponse non-2xx, avec le message `error` renvoyé par le serveur
    #[error("{message} ({status})")]
    Api { status: u16, message: String },

    #[error("Invalid token: {0}")]
    InvalidToken(String),
}

/// Source des commandes pour l'écran admin
#[async_trait]
pub trait OrderFeed: Send + Sync {
    async fn search_orders(&self, filters: &AdminOrderQuery) -> Result<Vec<OrderView>, ClientError>;

    async fn update_order_status(
        &self,
        order_id: &str,
        status: OrderStatus,
    ) -> Result<OrderView, ClientError>;
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Serialize)]
struct StatusBody {
    status: OrderStatus,
}

/// Client HTTP authentifié vers `/api`
#[derive(Clone)]
pub struct MarketplaceClient {
    client: reqwest::Client,
    base_url: String,
}

impl MarketplaceClient {
    pub fn new(base_url: &str, token: &str) -> Result<Self, ClientError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| ClientError::InvalidToken(e.to_string()))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Seuls les filtres non vides deviennent des paramètres de requête
    pub fn admin_order_params(filters: &AdminOrderQuery) -> Vec<(&'static str, String)> {
        [
            ("pickupLocationId", &filters.pickup_location_id),
            ("orderId", &filters.order_id),
            ("email", &filters.email),
        ]
        .into_iter()
        .filter_map(|(key, value)| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(|v| (key, v.to_string()))
        })
        .collect()
    }

    fn search_request(&self, filters: &AdminOrderQuery) -> reqwest::RequestBuilder {
        self.client
            .get(format!("{}/api/admin/orders", self.base_url))
            .query(&Self::admin_order_params(filters))
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let message = response
            .json::<ErrorBody>()
            .await
            .map(|body| body.error)
            .unwrap_or_else(|_| status.canonical_reason().unwrap_or("Request failed").to_string());

        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl OrderFeed for MarketplaceClient {
    async fn search_orders(&self, filters: &AdminOrderQuery) -> Result<Vec<OrderView>, ClientError> {
        let response = self.search_request(filters).send().await?;
        Self::handle_response(response).await
    }

    async fn update_order_status(
        &self,
        order_id: &str,
        status: OrderStatus,
    ) -> Result<OrderView, ClientError> {
        let response = self
            .client
            .patch(format!("{}/api/admin/orders/{}", self.base_url, order_id))
            .json(&StatusBody { status })
            .send()
            .await?;

        Self::handle_response(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_non_empty_filters_become_params() {
        let filters = AdminOrderQuery {
            pickup_location_id: Some("loc-1".to_string()),
            order_id: Some("   ".to_string()),
            email: Some(" jane ".to_string()),
        };

        let params = MarketplaceClient::admin_order_params(&filters);
        assert_eq!(
            params,
            vec![("pickupLocationId", "loc-1".to_string()), ("email", "jane".to_string())]
        );
        assert!(MarketplaceClient::admin_order_params(&AdminOrderQuery::default()).is_empty());
    }

    #[test]
    fn test_search_request_url() {
        let client = MarketplaceClient::new("http://localhost:8080/", "token").unwrap();
        let filters = AdminOrderQuery {
            order_id: Some("ab12".to_string()),
            ..Default::default()
        };

        let request = client.search_request(&filters).build().unwrap();
        assert_eq!(request.url().as_str(), "http://localhost:8080/api/admin/orders?orderId=ab12");

        let unfiltered = client.search_request(&AdminOrderQuery::default()).build().unwrap();
        assert_eq!(unfiltered.url().as_str(), "http://localhost:8080/api/admin/orders");
    }

    #[test]
    fn test_invalid_token_is_rejected() {
        assert!(matches!(
            MarketplaceClient::new("http://localhost", "bad\ntoken"),
            Err(ClientError::InvalidToken(_))
        ));
    }
}

// libs/appointment-cell/src/services/gateway.rs
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use tracing::debug;

use shared_gateway::GatewayClient;
use shared_models::auth::IdentityProvider;
use shared_models::error::GatewayError;

use crate::models::{AppointmentFilter, StatusAction};

/// Contract of the remote appointment collection.
///
/// Responses are returned untouched; callers run them through the normalizer.
#[async_trait]
pub trait AppointmentGateway: Send + Sync {
    async fn list(&self, filter: &AppointmentFilter) -> Result<Value, GatewayError>;

    async fn fetch(&self, id: &str) -> Result<Value, GatewayError>;

    async fn create(&self, body: Value) -> Result<Value, GatewayError>;

    async fn update(&self, id: &str, body: Value) -> Result<Value, GatewayError>;

    async fn delete(&self, id: &str) -> Result<Value, GatewayError>;

    async fn transition(&self, id: &str, action: StatusAction, body: Value) -> Result<Value, GatewayError>;
}

/// `AppointmentGateway` over the clinic's REST API (`/appointments`).
pub struct RestAppointmentGateway {
    client: GatewayClient,
    identity: Arc<dyn IdentityProvider>,
}

impl RestAppointmentGateway {
    pub fn new(client: GatewayClient, identity: Arc<dyn IdentityProvider>) -> Self {
        Self { client, identity }
    }

    fn token(&self) -> Option<&str> {
        self.identity.bearer_token()
    }

    fn item_path(id: &str) -> String {
        format!("/appointments/{}", urlencoding::encode(id))
    }
}

#[async_trait]
impl AppointmentGateway for RestAppointmentGateway {
    async fn list(&self, filter: &AppointmentFilter) -> Result<Value, GatewayError> {
        let query = filter.to_query();
        debug!("Listing appointments with {} filter params", query.len());

        self.client
            .request_with_query(Method::GET, "/appointments", &query, self.token(), None)
            .await
    }

    async fn fetch(&self, id: &str) -> Result<Value, GatewayError> {
        self.client
            .request(Method::GET, &Self::item_path(id), self.token(), None)
            .await
    }

    async fn create(&self, body: Value) -> Result<Value, GatewayError> {
        self.client
            .request(Method::POST, "/appointments", self.token(), Some(body))
            .await
    }

    async fn update(&self, id: &str, body: Value) -> Result<Value, GatewayError> {
        self.client
            .request(Method::PUT, &Self::item_path(id), self.token(), Some(body))
            .await
    }

    async fn delete(&self, id: &str) -> Result<Value, GatewayError> {
        self.client
            .request(Method::DELETE, &Self::item_path(id), self.token(), None)
            .await
    }

    async fn transition(&self, id: &str, action: StatusAction, body: Value) -> Result<Value, GatewayError> {
        let path = format!("{}/{}", Self::item_path(id), action.path_segment());

        self.client
            .request(Method::PATCH, &path, self.token(), Some(body))
            .await
    }
}

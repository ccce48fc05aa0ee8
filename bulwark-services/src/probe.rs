use async_trait::async_trait;
use bulwark_resilience::{HealthProbe, ProbeError};
use std::sync::Arc;

use crate::client::ServiceClient;

/// Exposes a client's `health_check` to the health monitor
pub struct ServiceProbe<C: ?Sized> {
    client: Arc<C>,
}

impl<C: ServiceClient + ?Sized> ServiceProbe<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl<C: ServiceClient + ?Sized + 'static> HealthProbe for ServiceProbe<C> {
    async fn check(&self) -> Result<bool, ProbeError> {
        self.client.health_check().await.map_err(Into::into)
    }
}

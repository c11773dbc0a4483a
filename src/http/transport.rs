use std::sync::Arc;

use async_trait::async_trait;
use mockall::automock;
use reqwest::Url;
use tracing::debug;

use crate::eval::context::ExecutionContext;

use super::factory::{ClientFactory, RequestFactory};
use super::types::{FragmentResponse, LoaderResult};

/// The terminal call of the loader pipeline.
#[automock]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, uri: &Url, context: &ExecutionContext) -> LoaderResult<FragmentResponse>;
}

/// Sends requests built by a [`RequestFactory`] with clients handed out by a
/// [`ClientFactory`].
#[derive(Clone)]
pub struct ReqwestTransport {
    request_factory: Arc<dyn RequestFactory>,
    client_factory: Arc<dyn ClientFactory>,
}

impl ReqwestTransport {
    pub fn new(
        request_factory: Arc<dyn RequestFactory>,
        client_factory: Arc<dyn ClientFactory>,
    ) -> Self {
        Self {
            request_factory,
            client_factory,
        }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, uri: &Url, context: &ExecutionContext) -> LoaderResult<FragmentResponse> {
        let request = self.request_factory.create(uri, context)?;
        let client = self.client_factory.client_for(uri)?;
        debug!("sending {} {}", request.method(), request.url());
        let response = client.execute(request).await?;
        FragmentResponse::from_response(response).await
    }
}

use std::sync::Arc;

use mockall::automock;
use reqwest::header::{HeaderName, HeaderValue};
use reqwest::Url;
use tracing::{debug, error};

use crate::config::LoaderConfig;
use crate::eval::context::ExecutionContext;

use super::factory::{DefaultRequestFactory, PooledClientFactory};
use super::interceptor::{Interceptor, Next};
use super::interceptors::{RetryInterceptor, RewriteInterceptor, TimeoutInterceptor};
use super::transport::{ReqwestTransport, Transport};
use super::types::{FragmentResponse, LoaderError, LoaderResult};

/// Receives every failed load, once, before the error is returned.
#[automock]
pub trait ErrorSink: Send + Sync {
    fn load_failed(&self, uri: &Url, error: &LoaderError);
}

/// Reports failed loads through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingErrorSink;

impl ErrorSink for TracingErrorSink {
    fn load_failed(&self, uri: &Url, error: &LoaderError) {
        error!(uri = %uri, "Error when loading '{}': {}", uri, error);
    }
}

/// Fetches fragments through an ordered chain of interceptors.
///
/// Interceptors wrap the transport in registration order: the first one
/// registered sees every request first and every response last.
#[derive(Clone)]
pub struct HttpLoader {
    transport: Arc<dyn Transport>,
    interceptors: Arc<[Arc<dyn Interceptor>]>,
    error_sink: Arc<dyn ErrorSink>,
}

impl HttpLoader {
    pub fn new(
        transport: Arc<dyn Transport>,
        interceptors: Vec<Arc<dyn Interceptor>>,
        error_sink: Arc<dyn ErrorSink>,
    ) -> Self {
        Self {
            transport,
            interceptors: interceptors.into(),
            error_sink,
        }
    }

    pub fn builder(transport: Arc<dyn Transport>) -> HttpLoaderBuilder {
        HttpLoaderBuilder::new(transport)
    }

    /// A reqwest-backed loader with the interceptors `config` enables,
    /// registered as rewrite, retry, timeout (so the timeout bounds each
    /// attempt, not the sum of them).
    pub fn from_config(config: &LoaderConfig) -> LoaderResult<Self> {
        let forwarded_headers = config
            .forwarded_headers
            .iter()
            .map(|name| {
                HeaderName::try_from(name.as_str()).map_err(|e| {
                    LoaderError::Configuration(format!("invalid forwarded header '{}': {}", name, e))
                })
            })
            .collect::<LoaderResult<Vec<_>>>()?;
        let user_agent = config
            .user_agent
            .as_deref()
            .map(HeaderValue::from_str)
            .transpose()
            .map_err(|e| LoaderError::Configuration(format!("invalid user agent: {}", e)))?;

        let transport = ReqwestTransport::new(
            Arc::new(DefaultRequestFactory::new(forwarded_headers, user_agent)),
            Arc::new(PooledClientFactory::new(config.pool_idle_timeout)),
        );

        let mut builder = HttpLoader::builder(Arc::new(transport));
        if !config.rewrites.is_empty() {
            builder = builder.interceptor(RewriteInterceptor::from_config(&config.rewrites)?);
        }
        if config.retry.attempts > 1 {
            builder = builder.interceptor(RetryInterceptor::new(
                config.retry.attempts,
                config.retry.delay,
            ));
        }
        if let Some(timeout) = config.timeout {
            builder = builder.interceptor(TimeoutInterceptor::new(timeout));
        }
        Ok(builder.build())
    }

    pub fn with_error_sink(mut self, error_sink: Arc<dyn ErrorSink>) -> Self {
        self.error_sink = error_sink;
        self
    }

    pub fn interceptor_count(&self) -> usize {
        self.interceptors.len()
    }

    /// Loads `uri`. A response outside 2xx is a [`LoaderError::RequestFailed`].
    /// Every failure is reported to the error sink with `uri` and then
    /// returned unchanged.
    #[tracing::instrument(skip(self, uri, context), fields(uri = %uri))]
    pub async fn get(&self, uri: &Url, context: &ExecutionContext) -> LoaderResult<FragmentResponse> {
        let result = self
            .execute(uri, context)
            .await
            .and_then(|response| ensure_success(uri, response));

        match result {
            Ok(response) => {
                debug!("loaded {} ({} bytes)", uri, response.body().len());
                Ok(response)
            }
            Err(e) => {
                self.error_sink.load_failed(uri, &e);
                Err(e)
            }
        }
    }

    async fn execute(&self, uri: &Url, context: &ExecutionContext) -> LoaderResult<FragmentResponse> {
        Next::new(&self.interceptors, self.transport.as_ref())
            .run(uri, context)
            .await
    }
}

fn ensure_success(uri: &Url, response: FragmentResponse) -> LoaderResult<FragmentResponse> {
    if response.is_success() {
        Ok(response)
    } else {
        Err(LoaderError::RequestFailed {
            uri: uri.clone(),
            status: response.status(),
        })
    }
}

pub struct HttpLoaderBuilder {
    transport: Arc<dyn Transport>,
    interceptors: Vec<Arc<dyn Interceptor>>,
    error_sink: Arc<dyn ErrorSink>,
}

impl HttpLoaderBuilder {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            interceptors: Vec::new(),
            error_sink: Arc::new(TracingErrorSink),
        }
    }

    /// Appends an interceptor. Earlier registrations wrap later ones.
    pub fn interceptor(mut self, interceptor: impl Interceptor + 'static) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    pub fn shared_interceptor(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    pub fn error_sink(mut self, error_sink: Arc<dyn ErrorSink>) -> Self {
        self.error_sink = error_sink;
        self
    }

    pub fn build(self) -> HttpLoader {
        HttpLoader::new(self.transport, self.interceptors, self.error_sink)
    }
}

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;

use crate::eval::context::ExecutionContext;
use crate::http::interceptor::{Interceptor, Next};
use crate::http::types::{FragmentResponse, LoaderError, LoaderResult};

/// Bounds the time spent in the rest of the pipeline.
#[derive(Debug, Clone)]
pub struct TimeoutInterceptor {
    timeout: Duration,
}

impl TimeoutInterceptor {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl Interceptor for TimeoutInterceptor {
    async fn handle(
        &self,
        uri: &Url,
        context: &ExecutionContext,
        next: Next<'_>,
    ) -> LoaderResult<FragmentResponse> {
        tokio::time::timeout(self.timeout, next.run(uri, context))
            .await
            .map_err(|_| LoaderError::Timeout {
                uri: uri.clone(),
                timeout: self.timeout,
            })?
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;
    use crate::http::loader::HttpLoader;
    use crate::http::transport::Transport;

    struct SlowTransport(Duration);

    #[async_trait]
    impl Transport for SlowTransport {
        async fn send(&self, _uri: &Url, _context: &ExecutionContext) -> LoaderResult<FragmentResponse> {
            tokio::time::sleep(self.0).await;
            Ok(FragmentResponse::ok("late"))
        }
    }

    fn uri() -> Url {
        Url::parse("http://origin.local/slow").unwrap()
    }

    #[tokio::test]
    async fn test_times_out_slow_transport() {
        let loader = HttpLoader::builder(Arc::new(SlowTransport(Duration::from_secs(10))))
            .interceptor(TimeoutInterceptor::new(Duration::from_millis(50)))
            .build();

        let result = loader.get(&uri(), &ExecutionContext::new()).await;
        assert!(matches!(
            result,
            Err(LoaderError::Timeout { timeout, .. }) if timeout == Duration::from_millis(50)
        ));
    }

    #[tokio::test]
    async fn test_passes_fast_responses() {
        let loader = HttpLoader::builder(Arc::new(SlowTransport(Duration::from_millis(5))))
            .interceptor(TimeoutInterceptor::new(Duration::from_secs(5)))
            .build();

        let response = loader.get(&uri(), &ExecutionContext::new()).await.unwrap();
        assert_eq!(response.body(), "late");
    }
}

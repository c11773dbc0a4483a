use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use tracing::warn;

use crate::eval::context::ExecutionContext;
use crate::http::interceptor::{Interceptor, Next};
use crate::http::types::{FragmentResponse, LoaderResult};

/// Sends the request again on transient failures: transport errors,
/// timeouts from inner stages and 5xx responses.
#[derive(Debug, Clone)]
pub struct RetryInterceptor {
    attempts: u32,
    delay: Duration,
}

impl RetryInterceptor {
    /// `attempts` counts the first try; values below 1 are treated as 1.
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            delay,
        }
    }
}

fn should_retry(result: &LoaderResult<FragmentResponse>) -> bool {
    match result {
        Ok(response) => response.status().is_server_error(),
        Err(e) => e.is_transient(),
    }
}

#[async_trait]
impl Interceptor for RetryInterceptor {
    async fn handle(
        &self,
        uri: &Url,
        context: &ExecutionContext,
        next: Next<'_>,
    ) -> LoaderResult<FragmentResponse> {
        let mut attempt = 1;
        loop {
            let result = next.run(uri, context).await;
            if attempt >= self.attempts || !should_retry(&result) {
                return result;
            }
            warn!(
                "attempt {}/{} for {} failed, retrying in {:?}",
                attempt, self.attempts, uri, self.delay
            );
            attempt += 1;
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
        }
    }
}

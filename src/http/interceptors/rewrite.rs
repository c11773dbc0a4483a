use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::Url;
use tracing::debug;

use crate::eval::context::ExecutionContext;
use crate::http::interceptor::{Interceptor, Next};
use crate::http::types::{FragmentResponse, LoaderError, LoaderResult};

/// Sends fragments of selected hosts to another origin, keeping path and
/// query. Typical use is routing public fragment URLs to an internal backend.
#[derive(Debug, Clone, Default)]
pub struct RewriteInterceptor {
    origins: HashMap<String, Url>,
}

impl RewriteInterceptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, host: impl Into<String>, origin: Url) -> Self {
        self.origins.insert(host.into(), origin);
        self
    }

    /// Builds the interceptor from a `host -> origin URL` map.
    pub fn from_config(rewrites: &HashMap<String, String>) -> LoaderResult<Self> {
        rewrites
            .iter()
            .try_fold(Self::new(), |interceptor, (host, origin)| {
                let origin = Url::parse(origin).map_err(|e| LoaderError::Configuration(format!(
                    "invalid rewrite origin '{}' for {}: {}",
                    origin, host, e
                )))?;
                Ok(interceptor.route(host.as_str(), origin))
            })
    }

    /// The request path is appended to the origin's own path and the query is
    /// carried over. Scheme, host and port always come from the origin.
    fn rewrite(&self, uri: &Url) -> Option<Url> {
        let origin = uri.host_str().and_then(|host| self.origins.get(host))?;
        let mut rewritten = origin.clone();
        let path = format!("{}{}", origin.path().trim_end_matches('/'), uri.path());
        rewritten.set_path(&path);
        rewritten.set_query(uri.query());
        rewritten.set_fragment(None);
        Some(rewritten)
    }
}

#[async_trait]
impl Interceptor for RewriteInterceptor {
    async fn handle(
        &self,
        uri: &Url,
        context: &ExecutionContext,
        next: Next<'_>,
    ) -> LoaderResult<FragmentResponse> {
        match self.rewrite(uri) {
            Some(rewritten) => {
                debug!("rewrote {} to {}", uri, rewritten);
                next.run(&rewritten, context).await
            }
            None => next.run(uri, context).await,
        }
    }
}

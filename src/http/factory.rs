use std::time::Duration;

use dashmap::DashMap;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use reqwest::{Client, Method, Request, Url};
use tracing::debug;

use crate::eval::context::ExecutionContext;

use super::types::LoaderResult;

/// Builds the outgoing request for a fragment.
pub trait RequestFactory: Send + Sync {
    fn create(&self, uri: &Url, context: &ExecutionContext) -> LoaderResult<Request>;
}

impl<F> RequestFactory for F
where
    F: Fn(&Url, &ExecutionContext) -> LoaderResult<Request> + Send + Sync,
{
    fn create(&self, uri: &Url, context: &ExecutionContext) -> LoaderResult<Request> {
        self(uri, context)
    }
}

/// Hands out the client a fragment request is sent with.
pub trait ClientFactory: Send + Sync {
    fn client_for(&self, uri: &Url) -> LoaderResult<Client>;
}

impl<F> ClientFactory for F
where
    F: Fn(&Url) -> LoaderResult<Client> + Send + Sync,
{
    fn client_for(&self, uri: &Url) -> LoaderResult<Client> {
        self(uri)
    }
}

/// `GET` request carrying the headers of the incoming request that are
/// listed in `forwarded_headers`.
#[derive(Debug, Clone, Default)]
pub struct DefaultRequestFactory {
    forwarded_headers: Vec<HeaderName>,
    user_agent: Option<HeaderValue>,
}

impl DefaultRequestFactory {
    pub fn new(forwarded_headers: Vec<HeaderName>, user_agent: Option<HeaderValue>) -> Self {
        Self {
            forwarded_headers,
            user_agent,
        }
    }
}

impl RequestFactory for DefaultRequestFactory {
    fn create(&self, uri: &Url, context: &ExecutionContext) -> LoaderResult<Request> {
        let mut headers = HeaderMap::new();
        for name in &self.forwarded_headers {
            for value in context.headers().get_all(name) {
                headers.append(name.clone(), value.clone());
            }
        }
        if let Some(user_agent) = &self.user_agent {
            headers.insert(USER_AGENT, user_agent.clone());
        }

        let mut request = Request::new(Method::GET, uri.clone());
        *request.headers_mut() = headers;
        Ok(request)
    }
}

/// Reuses one client per origin (`scheme://host:port`).
#[derive(Debug, Default)]
pub struct PooledClientFactory {
    clients: DashMap<String, Client>,
    pool_idle_timeout: Option<Duration>,
}

impl PooledClientFactory {
    pub fn new(pool_idle_timeout: Option<Duration>) -> Self {
        Self {
            clients: DashMap::new(),
            pool_idle_timeout,
        }
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

fn origin_key(uri: &Url) -> String {
    format!(
        "{}://{}:{}",
        uri.scheme(),
        uri.host_str().unwrap_or_default(),
        uri.port_or_known_default().unwrap_or_default()
    )
}

impl ClientFactory for PooledClientFactory {
    fn client_for(&self, uri: &Url) -> LoaderResult<Client> {
        let key = origin_key(uri);
        if let Some(client) = self.clients.get(&key) {
            return Ok(client.clone());
        }

        let client = Client::builder()
            .pool_idle_timeout(self.pool_idle_timeout)
            .build()?;
        debug!("created client for {}", key);
        // A concurrent caller may have won the race; keep whichever landed first.
        Ok(self.clients.entry(key).or_insert(client).clone())
    }
}

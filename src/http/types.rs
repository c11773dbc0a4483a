use std::time::Duration;

use reqwest::header::HeaderMap;
use reqwest::{Response, StatusCode, Url};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("Request to {uri} failed with status {status}")]
    RequestFailed { uri: Url, status: StatusCode },
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Request to {uri} timed out after {timeout:?}")]
    Timeout { uri: Url, timeout: Duration },
    #[error("Invalid uri '{uri}': {message}")]
    InvalidUri { uri: String, message: String },
    #[error("Interceptor error: {0}")]
    Interceptor(String),
    #[error("Invalid loader configuration: {0}")]
    Configuration(String),
}

impl LoaderError {
    /// Failures that may go away when the same request is sent again.
    pub fn is_transient(&self) -> bool {
        match self {
            LoaderError::Transport(_) | LoaderError::Timeout { .. } => true,
            LoaderError::RequestFailed { status, .. } => status.is_server_error(),
            LoaderError::InvalidUri { .. }
            | LoaderError::Interceptor(_)
            | LoaderError::Configuration(_) => false,
        }
    }
}

pub type LoaderResult<T> = Result<T, LoaderError>;

/// A fetched fragment, fully read into memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: String,
}

impl FragmentResponse {
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    pub fn ok(body: impl Into<String>) -> Self {
        Self::new(StatusCode::OK, body)
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub async fn from_response(response: Response) -> LoaderResult<Self> {
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await?;
        Ok(Self {
            status,
            headers,
            body,
        })
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn into_body(self) -> String {
        self.body
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

#[cfg(test)]
mod tests {
    use reqwest::header::{HeaderValue, CACHE_CONTROL};

    use super::*;

    #[test]
    fn test_response_builders() {
        let mut headers = HeaderMap::new();
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("max-age=60"));

        let response = FragmentResponse::new(StatusCode::NOT_FOUND, "missing")
            .with_headers(headers)
            .with_body("gone");

        assert!(!response.is_success());
        assert_eq!(response.headers().get(CACHE_CONTROL).unwrap(), "max-age=60");
        assert_eq!(response.into_body(), "gone");
        assert!(FragmentResponse::ok("").is_success());
    }

    #[test]
    fn test_transient_errors() {
        let uri = Url::parse("http://origin.local/").unwrap();
        assert!(LoaderError::RequestFailed {
            uri: uri.clone(),
            status: StatusCode::BAD_GATEWAY,
        }
        .is_transient());
        assert!(!LoaderError::RequestFailed {
            uri,
            status: StatusCode::NOT_FOUND,
        }
        .is_transient());
        assert!(!LoaderError::Configuration("bad".to_string()).is_transient());
    }
}

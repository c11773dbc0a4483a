use reqwest::header::{HeaderMap, HeaderName, HeaderValue, COOKIE, HOST};
use reqwest::Url;
use url::form_urlencoded;

/// Request-scoped state the core reads from: the incoming request's headers,
/// its query string and the URL relative `src` attributes resolve against.
///
/// The context is owned by the caller and never mutated by resolvers or the
/// loader. Interceptors that need a different context build a new one.
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    headers: HeaderMap,
    query: Option<String>,
    base_url: Option<Url>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a context from the URL of the page being processed. The query
    /// string is taken from the URL and the URL becomes the base for relative
    /// includes.
    pub fn from_page_url(url: Url) -> Self {
        Self {
            headers: HeaderMap::new(),
            query: url.query().map(str::to_string),
            base_url: Some(url),
        }
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = Some(base_url);
        self
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    /// First value of `name`, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Host of the request, from the `Host` header or the base URL.
    pub fn host(&self) -> Option<String> {
        self.headers
            .get(HOST)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .or_else(|| {
                self.base_url
                    .as_ref()
                    .and_then(|url| url.host_str().map(str::to_string))
            })
    }

    /// Looks up a cookie sent with the request. All `Cookie` headers are
    /// searched; the first matching pair wins.
    pub fn cookie(&self, name: &str) -> Option<String> {
        self.headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|header| header.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.to_string())
    }

    /// Looks up a query string parameter. Names and values are
    /// form-urlencoded decoded (`%20` and `+` become spaces).
    pub fn query_param(&self, name: &str) -> Option<String> {
        let query = self.query.as_deref()?;
        form_urlencoded::parse(query.as_bytes())
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    }
}

//! Variable resolution.
//!
//! A [`VariableResolvers`] set maps variable names to resolvers. A name with
//! no registered resolver is undefined, which is a valid comparison operand
//! and not an error.

use std::collections::HashMap;
use std::sync::Arc;

use reqwest::header::{HeaderName, ACCEPT_LANGUAGE, COOKIE, REFERER, USER_AGENT};
use thiserror::Error;

use crate::ast::VariableExpression;
use crate::eval::context::ExecutionContext;

pub const HTTP_COOKIE: &str = "HTTP_COOKIE";
pub const HTTP_HOST: &str = "HTTP_HOST";
pub const HTTP_REFERER: &str = "HTTP_REFERER";
pub const HTTP_USER_AGENT: &str = "HTTP_USER_AGENT";
pub const HTTP_ACCEPT_LANGUAGE: &str = "HTTP_ACCEPT_LANGUAGE";
pub const HTTP_HEADER: &str = "HTTP_HEADER";
pub const QUERY_STRING: &str = "QUERY_STRING";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("Variable {0} requires a key")]
    MissingKey(String),
    #[error("Failed to resolve {variable}: {message}")]
    Failed { variable: String, message: String },
}

pub type ResolveResult<T> = Result<T, ResolveError>;

/// Produces the current value of a variable.
///
/// Implementations capture the execution context they read from; the whole
/// variable expression is passed so a resolver can act on its key.
#[mockall::automock]
pub trait VariableResolver: Send + Sync {
    /// Returns `Ok(None)` when the variable has no value for this request.
    fn try_get_value(&self, variable: &VariableExpression) -> ResolveResult<Option<String>>;
}

#[derive(Clone, Default)]
pub struct VariableResolvers {
    resolvers: HashMap<String, Arc<dyn VariableResolver>>,
}

impl VariableResolvers {
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard request variables, all read from `context`.
    pub fn standard(context: Arc<ExecutionContext>) -> Self {
        let header = |name: HeaderName| HeaderResolver::fixed(context.clone(), name.as_str());
        Self::new()
            .register(HTTP_COOKIE, CookieResolver::new(context.clone()))
            .register(HTTP_HOST, HostResolver::new(context.clone()))
            .register(HTTP_REFERER, header(REFERER))
            .register(HTTP_USER_AGENT, header(USER_AGENT))
            .register(
                HTTP_ACCEPT_LANGUAGE,
                AcceptLanguageResolver::new(context.clone()),
            )
            .register(HTTP_HEADER, HeaderResolver::keyed(context.clone()))
            .register(QUERY_STRING, QueryStringResolver::new(context.clone()))
    }

    pub fn register(
        mut self,
        name: impl Into<String>,
        resolver: impl VariableResolver + 'static,
    ) -> Self {
        self.resolvers.insert(name.into(), Arc::new(resolver));
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, resolver: Arc<dyn VariableResolver>) {
        self.resolvers.insert(name.into(), resolver);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn VariableResolver>> {
        self.resolvers.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.resolvers.contains_key(name)
    }

    /// Resolves `variable`, yielding `None` when no resolver is registered
    /// for its name.
    pub fn resolve_value(&self, variable: &VariableExpression) -> ResolveResult<Option<String>> {
        match self.resolvers.get(&variable.name) {
            Some(resolver) => resolver.try_get_value(variable),
            None => Ok(None),
        }
    }
}

impl std::fmt::Debug for VariableResolvers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.resolvers.keys().collect();
        names.sort();
        f.debug_struct("VariableResolvers")
            .field("names", &names)
            .finish()
    }
}

/// `$(HTTP_COOKIE{name})` yields one cookie, `$(HTTP_COOKIE)` the raw header.
pub struct CookieResolver {
    context: Arc<ExecutionContext>,
}

impl CookieResolver {
    pub fn new(context: Arc<ExecutionContext>) -> Self {
        Self { context }
    }
}

impl VariableResolver for CookieResolver {
    fn try_get_value(&self, variable: &VariableExpression) -> ResolveResult<Option<String>> {
        Ok(match &variable.key {
            Some(name) => self.context.cookie(name),
            None => self.context.header(COOKIE.as_str()).map(str::to_string),
        })
    }
}

pub struct HostResolver {
    context: Arc<ExecutionContext>,
}

impl HostResolver {
    pub fn new(context: Arc<ExecutionContext>) -> Self {
        Self { context }
    }
}

impl VariableResolver for HostResolver {
    fn try_get_value(&self, _variable: &VariableExpression) -> ResolveResult<Option<String>> {
        Ok(self.context.host())
    }
}

/// Reads a request header. A fixed resolver always reads the same header; a
/// keyed one (`$(HTTP_HEADER{x-device})`) reads the header named by the key.
pub struct HeaderResolver {
    context: Arc<ExecutionContext>,
    header: Option<String>,
}

impl HeaderResolver {
    pub fn fixed(context: Arc<ExecutionContext>, header: impl Into<String>) -> Self {
        Self {
            context,
            header: Some(header.into()),
        }
    }

    pub fn keyed(context: Arc<ExecutionContext>) -> Self {
        Self {
            context,
            header: None,
        }
    }
}

impl VariableResolver for HeaderResolver {
    fn try_get_value(&self, variable: &VariableExpression) -> ResolveResult<Option<String>> {
        let name = self
            .header
            .as_deref()
            .or(variable.key.as_deref())
            .ok_or_else(|| ResolveError::MissingKey(variable.name.clone()))?;
        Ok(self.context.header(name).map(str::to_string))
    }
}

/// `$(HTTP_ACCEPT_LANGUAGE{en})` is `"true"` when the request accepts that
/// language; without a key the raw header is returned.
pub struct AcceptLanguageResolver {
    context: Arc<ExecutionContext>,
}

impl AcceptLanguageResolver {
    pub fn new(context: Arc<ExecutionContext>) -> Self {
        Self { context }
    }
}

impl VariableResolver for AcceptLanguageResolver {
    fn try_get_value(&self, variable: &VariableExpression) -> ResolveResult<Option<String>> {
        let header = self.context.header(ACCEPT_LANGUAGE.as_str());
        let Some(language) = &variable.key else {
            return Ok(header.map(str::to_string));
        };

        let accepted = header
            .map(|header| {
                header
                    .split(',')
                    .filter_map(acceptable_tag)
                    .any(|tag| {
                        tag.eq_ignore_ascii_case(language)
                            || tag
                                .split('-')
                                .next()
                                .is_some_and(|primary| primary.eq_ignore_ascii_case(language))
                    })
            })
            .unwrap_or(false);
        Ok(Some(accepted.to_string()))
    }
}

/// Language tag of one `Accept-Language` item, unless its weight is `q=0`
/// (explicitly not acceptable).
fn acceptable_tag(item: &str) -> Option<&str> {
    let mut parts = item.split(';').map(str::trim);
    let tag = parts.next().filter(|tag| !tag.is_empty())?;
    let rejected = parts
        .filter_map(|param| param.strip_prefix("q="))
        .any(|weight| weight.parse::<f32>().is_ok_and(|q| q <= 0.0));
    (!rejected).then_some(tag)
}

/// `$(QUERY_STRING{param})` yields one parameter, `$(QUERY_STRING)` the raw query.
pub struct QueryStringResolver {
    context: Arc<ExecutionContext>,
}

impl QueryStringResolver {
    pub fn new(context: Arc<ExecutionContext>) -> Self {
        Self { context }
    }
}

impl VariableResolver for QueryStringResolver {
    fn try_get_value(&self, variable: &VariableExpression) -> ResolveResult<Option<String>> {
        Ok(match &variable.key {
            Some(param) => self.context.query_param(param),
            None => self.context.query().map(str::to_string),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderValue, HOST};

    fn standard() -> VariableResolvers {
        let context = ExecutionContext::new()
            .with_header(COOKIE, HeaderValue::from_static("tier=gold; id=42"))
            .with_header(HOST, HeaderValue::from_static("www.example.com"))
            .with_header(
                ACCEPT_LANGUAGE,
                HeaderValue::from_static("da, en-GB;q=0.8, en;q=0.7"),
            )
            .with_header(
                HeaderName::from_static("x-device"),
                HeaderValue::from_static("mobile"),
            )
            .with_query("page=3&sort=asc");
        VariableResolvers::standard(Arc::new(context))
    }

    fn resolve(resolvers: &VariableResolvers, variable: VariableExpression) -> Option<String> {
        resolvers.resolve_value(&variable).unwrap()
    }

    #[test]
    fn test_unregistered_variable_is_undefined() {
        let resolvers = VariableResolvers::new();
        assert_eq!(resolve(&resolvers, VariableExpression::new("NOPE")), None);
    }

    #[test]
    fn test_insert_replaces_resolver() {
        let mut resolvers = standard();
        assert!(resolvers.contains(HTTP_HOST));
        assert!(!resolvers.contains("SITE"));

        let mut fixed = MockVariableResolver::new();
        fixed
            .expect_try_get_value()
            .returning(|_| Ok(Some("edge.example.com".to_string())));
        let fixed: Arc<dyn VariableResolver> = Arc::new(fixed);
        resolvers.insert(HTTP_HOST, fixed.clone());
        resolvers.insert("SITE", fixed);

        assert!(resolvers.contains("SITE"));
        let host = resolvers.get(HTTP_HOST).unwrap();
        assert_eq!(
            host.try_get_value(&VariableExpression::new(HTTP_HOST)).unwrap().as_deref(),
            Some("edge.example.com")
        );
        assert!(resolvers.get("NOPE").is_none());
    }

    #[test]
    fn test_standard_variables() {
        let resolvers = standard();

        assert_eq!(
            resolve(&resolvers, VariableExpression::with_key(HTTP_COOKIE, "tier")).as_deref(),
            Some("gold")
        );
        assert_eq!(
            resolve(&resolvers, VariableExpression::new(HTTP_COOKIE)).as_deref(),
            Some("tier=gold; id=42")
        );
        assert_eq!(
            resolve(&resolvers, VariableExpression::new(HTTP_HOST)).as_deref(),
            Some("www.example.com")
        );
        assert_eq!(
            resolve(&resolvers, VariableExpression::with_key(QUERY_STRING, "sort")).as_deref(),
            Some("asc")
        );
        assert_eq!(
            resolve(&resolvers, VariableExpression::with_key(HTTP_HEADER, "x-device")).as_deref(),
            Some("mobile")
        );
        assert_eq!(resolve(&resolvers, VariableExpression::new(HTTP_REFERER)), None);
    }

    #[test]
    fn test_accept_language() {
        let resolvers = standard();
        let accepts = |lang: &str| {
            resolve(
                &resolvers,
                VariableExpression::with_key(HTTP_ACCEPT_LANGUAGE, lang),
            )
        };

        assert_eq!(accepts("en").as_deref(), Some("true"));
        assert_eq!(accepts("en-GB").as_deref(), Some("true"));
        assert_eq!(accepts("da").as_deref(), Some("true"));
        assert_eq!(accepts("fr").as_deref(), Some("false"));
    }

    #[test]
    fn test_accept_language_zero_weight_is_refused() {
        let context = ExecutionContext::new().with_header(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static("fr;q=0.9, en;q=0, de; q=0.000"),
        );
        let resolvers = VariableResolvers::standard(Arc::new(context));
        let accepts = |lang: &str| {
            resolve(
                &resolvers,
                VariableExpression::with_key(HTTP_ACCEPT_LANGUAGE, lang),
            )
        };

        assert_eq!(accepts("fr").as_deref(), Some("true"));
        assert_eq!(accepts("en").as_deref(), Some("false"));
        assert_eq!(accepts("de").as_deref(), Some("false"));
    }

    #[test]
    fn test_keyed_header_requires_key() {
        let resolvers = standard();
        let result = resolvers.resolve_value(&VariableExpression::new(HTTP_HEADER));
        assert_eq!(result, Err(ResolveError::MissingKey(HTTP_HEADER.to_string())));
    }

    #[test]
    fn test_resolver_receives_whole_variable() {
        let mut resolver = MockVariableResolver::new();
        resolver
            .expect_try_get_value()
            .withf(|variable| variable.key.as_deref() == Some("3"))
            .times(1)
            .returning(|_| Ok(Some("third".to_string())));

        let resolvers = VariableResolvers::new().register("LIST", resolver);
        assert_eq!(
            resolve(&resolvers, VariableExpression::with_key("LIST", "3")).as_deref(),
            Some("third")
        );
    }
}

//! Executes include directives: decide, fetch, fall back.

use futures::future::join_all;
use reqwest::Url;
use thiserror::Error;
use tracing::{debug, warn};

use crate::ast::BooleanExpression;
use crate::config::EsiConfig;
use crate::eval::context::ExecutionContext;
use crate::eval::evaluator::{EvalError, ExpressionEvaluator};
use crate::http::{HttpLoader, LoaderError, LoaderResult};
use crate::parser::{IncludeDirective, OnError};
use crate::resolver::VariableResolvers;

#[derive(Debug, Error)]
pub enum IncludeError {
    #[error("Condition failed: {0}")]
    Eval(#[from] EvalError),
    #[error("Include failed: {0}")]
    Load(#[from] LoaderError),
}

pub type IncludeResult<T> = Result<T, IncludeError>;

#[derive(Clone)]
pub struct IncludeExecutor {
    loader: HttpLoader,
    evaluator: ExpressionEvaluator,
}

impl IncludeExecutor {
    pub fn new(loader: HttpLoader, evaluator: ExpressionEvaluator) -> Self {
        Self { loader, evaluator }
    }

    pub fn from_config(config: &EsiConfig) -> LoaderResult<Self> {
        Ok(Self::new(
            HttpLoader::from_config(&config.loader)?,
            ExpressionEvaluator::new(config.collation),
        ))
    }

    pub fn loader(&self) -> &HttpLoader {
        &self.loader
    }

    /// Runs one include.
    ///
    /// Returns `Ok(None)` when `condition` is false. Otherwise fetches `src`,
    /// then `alt` if `src` failed. When both fail the last error is returned,
    /// or empty content if the directive says `onerror="continue"`.
    #[tracing::instrument(skip_all, fields(src = directive.src()))]
    pub async fn execute(
        &self,
        directive: &IncludeDirective,
        condition: Option<&BooleanExpression>,
        resolvers: &VariableResolvers,
        context: &ExecutionContext,
    ) -> IncludeResult<Option<String>> {
        if let Some(condition) = condition {
            if !self.evaluator.evaluate(condition, resolvers)? {
                debug!("condition is false, skipping include");
                return Ok(None);
            }
        }

        let result = match (self.fetch(directive.src(), context).await, directive.alt()) {
            (Err(e), Some(alt)) => {
                warn!("include of {} failed ({}), trying alt {}", directive.src(), e, alt);
                self.fetch(alt, context).await
            }
            (result, _) => result,
        };

        match result {
            Ok(body) => Ok(Some(body)),
            Err(e) if directive.on_error() == OnError::Continue => {
                warn!("include of {} failed, continuing: {}", directive.src(), e);
                Ok(Some(String::new()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Fetches unconditional includes concurrently. Results keep the order of
    /// `directives`.
    pub async fn execute_all(
        &self,
        directives: &[IncludeDirective],
        resolvers: &VariableResolvers,
        context: &ExecutionContext,
    ) -> Vec<IncludeResult<Option<String>>> {
        join_all(
            directives
                .iter()
                .map(|directive| self.execute(directive, None, resolvers, context)),
        )
        .await
    }

    async fn fetch(&self, src: &str, context: &ExecutionContext) -> LoaderResult<String> {
        let uri = resolve_uri(src, context)?;
        let response = self.loader.get(&uri, context).await?;
        Ok(response.into_body())
    }
}

/// Resolves `src` against the context's base URL when it is relative.
pub fn resolve_uri(src: &str, context: &ExecutionContext) -> LoaderResult<Url> {
    let invalid = |message: String| LoaderError::InvalidUri {
        uri: src.to_string(),
        message,
    };
    match (Url::parse(src), context.base_url()) {
        (Ok(uri), _) => Ok(uri),
        (Err(_), Some(base)) => base.join(src).map_err(|e| invalid(e.to_string())),
        (Err(e), None) => Err(invalid(e.to_string())),
    }
}

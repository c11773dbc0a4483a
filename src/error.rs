use thiserror::Error;

use crate::config::ConfigError;
use crate::eval::evaluator::EvalError;
use crate::expression::ExpressionParseError;
use crate::http::LoaderError;
use crate::include::IncludeError;
use crate::parser::ParseError;
use crate::resolver::ResolveError;

#[derive(Error, Debug)]
pub enum Error {
    // directives
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("Expression error: {0}")]
    Expression(#[from] ExpressionParseError),
    // evaluation
    #[error("Eval error: {0}")]
    Eval(#[from] EvalError),
    #[error("Resolve error: {0}")]
    Resolve(#[from] ResolveError),
    // loading
    #[error("Loader error: {0}")]
    Loader(#[from] LoaderError),
    #[error("Include error: {0}")]
    Include(#[from] IncludeError),
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type EsiResult<T> = Result<T, Error>;

impl Error {
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Error::Internal(message.into())
    }
}

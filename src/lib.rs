//! # esi-core: Edge Side Include processing core
//!
//! The three parts of an ESI processor that carry real logic:
//!
//! ```text
//! (tag, attributes, body) → Directive Parser → IncludeDirective
//!                                                   │
//!                     test expression → Evaluator ──┤ (skip when false)
//!                                                   ▼
//!                                 HTTP Loader (interceptors → transport)
//! ```
//!
//! ## Directives
//! The [`parser`] module turns a tokenized ESI tag into a typed
//! [`parser::Directive`]. Tokenizing markup is left to the caller.
//!
//! ## Conditions
//! [`expression::parse_expression`] reads the text of a `test` attribute
//! into an [`ast::BooleanExpression`]. The [`eval`] module evaluates it
//! against request variables looked up through [`resolver`]s. Mixed `&`/`|`
//! chains are folded strictly left to right.
//!
//! ## Loading
//! [`http::HttpLoader`] fetches fragments through an ordered chain of
//! [`http::Interceptor`]s around a reqwest transport.
//! [`include::IncludeExecutor`] ties the three together, adding `alt`
//! fallback and `onerror="continue"`.

pub mod ast;
pub mod config;
pub mod error;
pub mod eval;
pub mod expression;
pub mod http;
pub mod include;
pub mod parser;
pub mod resolver;

// Re-exports
pub use ast::*;
pub use error::*;
pub use eval::collation::Collation;
pub use eval::context::ExecutionContext;
pub use eval::evaluator::{evaluate, EvalError, ExpressionEvaluator};

//! Conditional evaluation.
//!
//! # Components
//!
//! ## Execution Context
//! Request-scoped state (headers, cookies, query string, base URL) that
//! resolvers read from. Owned by the caller and never mutated here.
//!
//! ## Collation
//! The single ordering used by every comparison operator.
//!
//! ## Expression Evaluator
//! Folds a [`crate::ast::BooleanExpression`] to a `bool`, resolving
//! variables through a [`crate::resolver::VariableResolvers`] set.

pub mod collation;
pub mod context;
pub mod evaluator;

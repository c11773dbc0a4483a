use std::cmp::Ordering;

use thiserror::Error;
use tracing::trace;

use crate::ast::{
    BooleanExpression, BooleanOperator, ComparisonExpression, ComparisonOperator, GroupExpression,
    ValueExpression,
};
use crate::resolver::{ResolveError, VariableResolvers};

use super::collation::Collation;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EvalError {
    #[error("Resolve error: {0}")]
    Resolve(#[from] ResolveError),
}

pub type EvalResult<T> = Result<T, EvalError>;

/// Evaluates conditional expressions.
///
/// Groups are folded left to right without operator precedence, starting
/// from `true`:
/// - an `And` entry is skipped once the accumulator is `false`;
/// - an `Or` entry ends the whole group once the accumulator is `true`;
/// - any other entry is evaluated and folded with `&=` or `|=`.
///
/// So `a & b | c & d` stops at `| c` whenever `a & b` holds, and the trailing
/// `& d` is never looked at.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpressionEvaluator {
    collation: Collation,
}

impl ExpressionEvaluator {
    pub fn new(collation: Collation) -> Self {
        Self { collation }
    }

    pub fn collation(&self) -> Collation {
        self.collation
    }

    pub fn evaluate(
        &self,
        expression: &BooleanExpression,
        resolvers: &VariableResolvers,
    ) -> EvalResult<bool> {
        match expression {
            BooleanExpression::Comparison(comparison) => {
                self.eval_comparison(comparison, resolvers)
            }
            BooleanExpression::Group(group) => self.eval_group(group, resolvers),
        }
    }

    fn eval_group(&self, group: &GroupExpression, resolvers: &VariableResolvers) -> EvalResult<bool> {
        let mut accumulator = true;
        for (index, entry) in group.entries.iter().enumerate() {
            if index == 0 {
                accumulator = self.evaluate(&entry.expression, resolvers)?;
                continue;
            }
            match entry.operator {
                BooleanOperator::And if !accumulator => {
                    trace!("skipping entry {} of group", index);
                    continue;
                }
                BooleanOperator::Or if accumulator => {
                    trace!("group short-circuited at entry {}", index);
                    break;
                }
                BooleanOperator::And => accumulator &= self.evaluate(&entry.expression, resolvers)?,
                BooleanOperator::Or => accumulator |= self.evaluate(&entry.expression, resolvers)?,
            }
        }
        Ok(accumulator)
    }

    fn eval_comparison(
        &self,
        comparison: &ComparisonExpression,
        resolvers: &VariableResolvers,
    ) -> EvalResult<bool> {
        let left = Self::eval_value(&comparison.left, resolvers)?;
        let right = Self::eval_value(&comparison.right, resolvers)?;
        let ordering = self.collation.compare(left.as_deref(), right.as_deref());

        Ok(match comparison.operator {
            ComparisonOperator::Equal => ordering == Ordering::Equal,
            ComparisonOperator::NotEqual => ordering != Ordering::Equal,
            ComparisonOperator::GreaterThan => ordering == Ordering::Greater,
            ComparisonOperator::GreaterOrEqual => ordering != Ordering::Less,
            ComparisonOperator::LessThan => ordering == Ordering::Less,
            ComparisonOperator::LessOrEqual => ordering != Ordering::Greater,
        })
    }

    fn eval_value(
        value: &ValueExpression,
        resolvers: &VariableResolvers,
    ) -> EvalResult<Option<String>> {
        match value {
            ValueExpression::Constant(constant) => Ok(Some(constant.clone())),
            ValueExpression::Variable(variable) => Ok(resolvers.resolve_value(variable)?),
        }
    }
}

/// Evaluates `expression` with ordinal collation.
pub fn evaluate(expression: &BooleanExpression, resolvers: &VariableResolvers) -> EvalResult<bool> {
    ExpressionEvaluator::default().evaluate(expression, resolvers)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
    use std::sync::Arc;

    use proptest::prelude::*;

    use super::*;
    use crate::ast::VariableExpression;
    use crate::resolver::{MockVariableResolver, ResolveResult, VariableResolver};

    fn cmp(left: ValueExpression, operator: ComparisonOperator, right: ValueExpression) -> BooleanExpression {
        ComparisonExpression::new(left, operator, right).into()
    }

    fn constant(value: &str) -> ValueExpression {
        ValueExpression::constant(value)
    }

    fn truthy() -> BooleanExpression {
        cmp(constant("a"), ComparisonOperator::Equal, constant("a"))
    }

    fn falsy() -> BooleanExpression {
        cmp(constant("a"), ComparisonOperator::Equal, constant("b"))
    }

    /// Comparison that fails if it is ever evaluated.
    fn exploding() -> BooleanExpression {
        cmp(
            ValueExpression::variable("BOOM"),
            ComparisonOperator::Equal,
            constant("x"),
        )
    }

    fn exploding_resolvers() -> VariableResolvers {
        let mut resolver = MockVariableResolver::new();
        resolver.expect_try_get_value().never();
        VariableResolvers::new().register("BOOM", resolver)
    }

    struct FailingResolver;

    impl VariableResolver for FailingResolver {
        fn try_get_value(&self, variable: &VariableExpression) -> ResolveResult<Option<String>> {
            Err(ResolveError::Failed {
                variable: variable.name.clone(),
                message: "evaluated".to_string(),
            })
        }
    }

    fn compare(left: &str, operator: ComparisonOperator, right: &str) -> bool {
        evaluate(&cmp(constant(left), operator, constant(right)), &VariableResolvers::new()).unwrap()
    }

    #[test]
    fn test_comparison_operators() {
        use ComparisonOperator::*;
        assert!(compare("a", Equal, "a"));
        assert!(compare("a", NotEqual, "b"));
        assert!(compare("b", GreaterThan, "a"));
        assert!(compare("a", LessThan, "b"));
        assert!(!compare("a", GreaterThan, "a"));
        assert!(!compare("a", LessThan, "a"));
        assert!(compare("a", GreaterOrEqual, "a"));
        assert!(compare("a", LessOrEqual, "a"));
        // lexicographic, not numeric
        assert!(compare("10", LessThan, "9"));
    }

    #[test]
    fn test_or_flips_false_accumulator() {
        let group = GroupExpression::starting_with(truthy())
            .and(falsy())
            .or(truthy());
        assert!(evaluate(&group.into(), &VariableResolvers::new()).unwrap());
    }

    #[test]
    fn test_or_stops_whole_group_once_true() {
        // true | <never evaluated> & <never evaluated>
        let group = GroupExpression::starting_with(truthy())
            .or(exploding())
            .and(exploding());
        assert!(evaluate(&group.into(), &exploding_resolvers()).unwrap());

        // The trailing `& false` is not applied either: this is not
        // `(true | x) & false`.
        let group = GroupExpression::starting_with(truthy())
            .or(truthy())
            .and(falsy());
        assert!(evaluate(&group.into(), &VariableResolvers::new()).unwrap());
    }

    #[test]
    fn test_and_skips_after_false() {
        let group = GroupExpression::starting_with(falsy()).and(exploding());
        assert!(!evaluate(&group.into(), &exploding_resolvers()).unwrap());
    }

    #[test]
    fn test_fold_is_left_to_right() {
        // false & x | true  ==  (false & x) | true
        let group = GroupExpression::starting_with(falsy())
            .and(exploding())
            .or(truthy());
        assert!(evaluate(&group.into(), &exploding_resolvers()).unwrap());

        // true & false | false  ==  false
        let group = GroupExpression::starting_with(truthy())
            .and(falsy())
            .or(falsy());
        assert!(!evaluate(&group.into(), &VariableResolvers::new()).unwrap());
    }

    #[test]
    fn test_first_operator_is_ignored() {
        let group = GroupExpression::new().push(BooleanOperator::Or, falsy());
        assert!(!evaluate(&group.into(), &VariableResolvers::new()).unwrap());

        let group = GroupExpression::new().push(BooleanOperator::Or, truthy());
        assert!(evaluate(&group.into(), &VariableResolvers::new()).unwrap());
    }

    #[test]
    fn test_empty_group_is_true() {
        assert!(evaluate(&GroupExpression::new().into(), &VariableResolvers::new()).unwrap());
    }

    #[test]
    fn test_nested_groups() {
        // false | (true & true)
        let inner = GroupExpression::starting_with(truthy()).and(truthy());
        let group = GroupExpression::starting_with(falsy()).or(inner);
        assert!(evaluate(&group.into(), &VariableResolvers::new()).unwrap());
    }

    #[test]
    fn test_undefined_variables() {
        let resolvers = VariableResolvers::new();
        let undefined = || ValueExpression::variable("UNDEFINED");

        let both = cmp(undefined(), ComparisonOperator::Equal, undefined());
        assert!(evaluate(&both, &resolvers).unwrap());

        let empty = cmp(undefined(), ComparisonOperator::Equal, constant(""));
        assert!(!evaluate(&empty, &resolvers).unwrap());

        let less = cmp(undefined(), ComparisonOperator::LessThan, constant(""));
        assert!(evaluate(&less, &resolvers).unwrap());
    }

    #[test]
    fn test_resolver_error_is_surfaced() {
        let resolvers = VariableResolvers::new().register("BAD", FailingResolver);
        let expression = cmp(ValueExpression::variable("BAD"), ComparisonOperator::Equal, constant(""));
        assert!(matches!(
            evaluate(&expression, &resolvers),
            Err(EvalError::Resolve(ResolveError::Failed { .. }))
        ));
    }

    #[test]
    fn test_resolver_called_once_per_operand() {
        struct Counting(Arc<AtomicUsize>);
        impl VariableResolver for Counting {
            fn try_get_value(&self, _: &VariableExpression) -> ResolveResult<Option<String>> {
                self.0.fetch_add(1, AtomicOrdering::SeqCst);
                Ok(Some("gold".to_string()))
            }
        }

        let calls = Arc::new(AtomicUsize::new(0));
        let resolvers = VariableResolvers::new().register("TIER", Counting(calls.clone()));
        let expression = cmp(
            ValueExpression::variable("TIER"),
            ComparisonOperator::Equal,
            ValueExpression::variable("TIER"),
        );
        assert!(evaluate(&expression, &resolvers).unwrap());
        assert_eq!(calls.load(AtomicOrdering::SeqCst), 2);
    }

    #[test]
    fn test_ignore_case_collation() {
        let evaluator = ExpressionEvaluator::new(Collation::IgnoreCase);
        let expression = cmp(constant("GOLD"), ComparisonOperator::Equal, constant("gold"));
        assert!(evaluator.evaluate(&expression, &VariableResolvers::new()).unwrap());
    }

    proptest! {
        #[test]
        fn prop_equal_is_reflexive(a in ".*") {
            prop_assert!(compare(&a, ComparisonOperator::Equal, &a));
        }

        #[test]
        fn prop_greater_mirrors_less(a in ".{0,8}", b in ".{0,8}") {
            prop_assert_eq!(
                compare(&a, ComparisonOperator::GreaterThan, &b),
                compare(&b, ComparisonOperator::LessThan, &a)
            );
        }

        #[test]
        fn prop_not_equal_negates_equal(a in "[a-c]{0,3}", b in "[a-c]{0,3}") {
            prop_assert_eq!(
                compare(&a, ComparisonOperator::NotEqual, &b),
                !compare(&a, ComparisonOperator::Equal, &b)
            );
        }

        #[test]
        fn prop_or_equal_includes_ties(a in "[A-Za-z]{0,4}", b in "[A-Za-z]{0,4}") {
            let evaluator = ExpressionEvaluator::new(Collation::IgnoreCase);
            let check = |op| evaluator
                .evaluate(&cmp(constant(&a), op, constant(&b)), &VariableResolvers::new())
                .unwrap();
            prop_assert_eq!(
                check(ComparisonOperator::GreaterOrEqual),
                check(ComparisonOperator::GreaterThan) || check(ComparisonOperator::Equal)
            );
            prop_assert_eq!(
                check(ComparisonOperator::LessOrEqual),
                check(ComparisonOperator::LessThan) || check(ComparisonOperator::Equal)
            );
        }
    }
}

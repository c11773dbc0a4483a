use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// String ordering shared by all comparison operators.
///
/// An undefined operand (`None`) orders before every defined value, the
/// empty string included, and is equal only to another undefined operand.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Collation {
    /// Unicode scalar value order.
    #[default]
    Ordinal,
    /// Ordinal order after Unicode lowercasing.
    IgnoreCase,
}

impl Collation {
    pub fn compare(&self, left: Option<&str>, right: Option<&str>) -> Ordering {
        match (left, right) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(left), Some(right)) => self.compare_str(left, right),
        }
    }

    fn compare_str(&self, left: &str, right: &str) -> Ordering {
        match self {
            Collation::Ordinal => left.cmp(right),
            Collation::IgnoreCase => left
                .chars()
                .flat_map(char::to_lowercase)
                .cmp(right.chars().flat_map(char::to_lowercase)),
        }
    }
}

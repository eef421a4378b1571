//! Typed reads over JSON cells.

use std::cmp::Ordering;
use std::fmt::{Display, Formatter};

use serde_json::Value;

/// Read a cell as an integer.
///
/// Integral floats (`2023.0`) count as integers; anything else is `None`.
pub(crate) fn as_integer(value: &Value) -> Option<i64> {
    let Value::Number(number) = value else {
        return None;
    };
    if let Some(value) = number.as_i64() {
        return Some(value);
    }
    number
        .as_f64()
        .filter(|value| value.fract() == 0.0 && value.abs() < i64::MAX as f64)
        .map(|value| value as i64)
}

/// Read a cell as a float. Non-numeric cells are `None`.
pub(crate) fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        _ => None,
    }
}

/// Grouping key of one cell.
///
/// Keys compare by type first, so SQL NULL and the text `"null"` (or the
/// number `1` and the text `"1"`) stay in separate groups even though their
/// labels coincide. Numbers sort before text, text before booleans, and
/// NULL comes last.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum GroupKey {
    Number(NumberKey),
    Text(String),
    Bool(bool),
    Other(String),
    Null,
}

impl GroupKey {
    pub(crate) fn of(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::String(text) => Self::Text(text.clone()),
            Value::Bool(flag) => Self::Bool(*flag),
            Value::Number(number) => match NumberKey::of(number) {
                Some(key) => Self::Number(key),
                None => Self::Other(number.to_string()),
            },
            other => Self::Other(other.to_string()),
        }
    }

    /// Display label of the group.
    pub(crate) fn label(&self) -> String {
        match self {
            Self::Number(number) => number.to_string(),
            Self::Text(text) | Self::Other(text) => text.clone(),
            Self::Bool(flag) => flag.to_string(),
            Self::Null => String::from("null"),
        }
    }
}

/// Totally ordered numeric key; `1` and `1.0` are the same key.
///
/// Integers stay exact, so keys above 2^53 never merge. Floats are kept
/// only when they are fractional or outside the `i64` range.
#[derive(Debug, Clone, Copy)]
pub(crate) enum NumberKey {
    Integer(i128),
    Float(f64),
}

impl NumberKey {
    fn of(number: &serde_json::Number) -> Option<Self> {
        if let Some(value) = number.as_i64() {
            return Some(Self::Integer(i128::from(value)));
        }
        if let Some(value) = number.as_u64() {
            return Some(Self::Integer(i128::from(value)));
        }
        let value = number.as_f64()?;
        Some(match as_integer(&Value::from(value)) {
            Some(integer) => Self::Integer(i128::from(integer)),
            None => Self::Float(value),
        })
    }
}

impl PartialEq for NumberKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other).is_eq()
    }
}

impl Eq for NumberKey {}

impl PartialOrd for NumberKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for NumberKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Integer(left), Self::Integer(right)) => left.cmp(right),
            (Self::Float(left), Self::Float(right)) => left.total_cmp(right),
            (Self::Integer(left), Self::Float(right)) => integer_against_float(*left, *right),
            (Self::Float(left), Self::Integer(right)) => {
                integer_against_float(*right, *left).reverse()
            }
        }
    }
}

// A float key is fractional (exactly between two integers) or an integral
// value beyond the `i64` range, which sorts past every integer key.
fn integer_against_float(integer: i128, float: f64) -> Ordering {
    if float.fract() != 0.0 {
        return (integer as f64).total_cmp(&float);
    }
    if float.is_sign_positive() {
        Ordering::Less
    } else {
        Ordering::Greater
    }
}

impl Display for NumberKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Integer(integer) => write!(f, "{integer}"),
            Self::Float(float) => write!(f, "{float}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn integral_floats_read_as_integers() {
        assert_eq!(as_integer(&json!(2023)), Some(2023));
        assert_eq!(as_integer(&json!(2023.0)), Some(2023));
        assert_eq!(as_integer(&json!(2023.5)), None);
        assert_eq!(as_integer(&json!("2023")), None);
    }

    #[test]
    fn labels_keep_strings_bare() {
        assert_eq!(GroupKey::of(&json!("Recharge")).label(), "Recharge");
        assert_eq!(GroupKey::of(&json!(3)).label(), "3");
        assert_eq!(GroupKey::of(&json!(3.0)).label(), "3");
        assert_eq!(GroupKey::of(&json!(2.5)).label(), "2.5");
        assert_eq!(GroupKey::of(&Value::Null).label(), "null");
    }

    #[test]
    fn keys_of_different_types_never_collide() {
        assert_ne!(GroupKey::of(&Value::Null), GroupKey::of(&json!("null")));
        assert_ne!(GroupKey::of(&json!(1)), GroupKey::of(&json!("1")));
        assert_ne!(GroupKey::of(&json!(true)), GroupKey::of(&json!("true")));
        assert_eq!(GroupKey::of(&json!(1)), GroupKey::of(&json!(1.0)));
        assert_eq!(GroupKey::of(&json!(0.0)), GroupKey::of(&json!(-0.0)));
    }

    #[test]
    fn null_sorts_after_every_other_key() {
        let mut keys = [json!("b"), Value::Null, json!("null"), json!(7), json!("a")]
            .iter()
            .map(GroupKey::of)
            .collect::<Vec<_>>();
        keys.sort();
        let labels = keys.iter().map(GroupKey::label).collect::<Vec<_>>();
        assert_eq!(labels, vec!["7", "a", "b", "null", "null"]);
        assert_eq!(keys[3], GroupKey::Text("null".to_string()));
        assert_eq!(keys[4], GroupKey::Null);
    }

    #[test]
    fn large_integers_keep_distinct_keys() {
        let above = GroupKey::of(&json!(9_007_199_254_740_993_i64));
        let below = GroupKey::of(&json!(9_007_199_254_740_992_i64));
        assert_ne!(above, below);
        assert!(below < above);
        assert_eq!(above.label(), "9007199254740993");

        let huge = GroupKey::of(&json!(u64::MAX));
        assert!(GroupKey::of(&json!(i64::MAX)) < huge);
        assert_eq!(huge.label(), u64::MAX.to_string());
    }

    #[test]
    fn fractional_keys_sort_between_integers() {
        let mut keys = [json!(3), json!(2.5), json!(2), json!(-0.5)]
            .iter()
            .map(GroupKey::of)
            .collect::<Vec<_>>();
        keys.sort();
        let labels = keys.iter().map(GroupKey::label).collect::<Vec<_>>();
        assert_eq!(labels, vec!["-0.5", "2", "2.5", "3"]);
    }
}

//! Column default values.

use serde::{Deserialize, Serialize};

/// Default value of a column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DefaultValue {
    /// Integer literal.
    Int(i64),
    /// Decimal literal, kept as written.
    Decimal(String),
    /// Boolean literal.
    Bool(bool),
    /// String literal (also used for enum variants).
    String(String),
    /// Binary literal.
    Bytes(Vec<u8>),
    /// An SQL expression evaluated at insert time, such as `now()`.
    Expression(String),
    /// The next value of a sequence.
    Sequence(String),
}

impl DefaultValue {
    /// Structural equality used by the differ.
    ///
    /// Same variant and equal payload, except that decimals compare with
    /// trailing fractional zeros removed, expressions compare with whitespace
    /// runs collapsed and redundant outer parentheses stripped, and any two
    /// sequence defaults are equal.
    pub fn same_as(&self, other: &DefaultValue) -> bool {
        match (self, other) {
            (DefaultValue::Decimal(a), DefaultValue::Decimal(b)) => {
                normalize_decimal(a) == normalize_decimal(b)
            }
            (DefaultValue::Decimal(a), DefaultValue::Int(b))
            | (DefaultValue::Int(b), DefaultValue::Decimal(a)) => {
                normalize_decimal(a) == b.to_string()
            }
            (DefaultValue::Expression(a), DefaultValue::Expression(b)) => {
                normalize_expression(a) == normalize_expression(b)
            }
            (DefaultValue::Sequence(_), DefaultValue::Sequence(_)) => true,
            (a, b) => a == b,
        }
    }

    /// Whether this default draws from a sequence.
    pub fn is_sequence(&self) -> bool {
        matches!(self, DefaultValue::Sequence(_))
    }
}

fn normalize_decimal(value: &str) -> String {
    let value = value.trim();
    match value.split_once('.') {
        Some((whole, fraction)) => {
            let fraction = fraction.trim_end_matches('0');
            if fraction.is_empty() {
                whole.to_string()
            } else {
                format!("{whole}.{fraction}")
            }
        }
        None => value.to_string(),
    }
}

fn normalize_expression(expr: &str) -> String {
    let mut collapsed = expr.split_whitespace().collect::<Vec<_>>().join(" ");
    while let Some(inner) = strip_outer_parens(&collapsed) {
        collapsed = inner.trim().to_string();
    }
    collapsed
}

/// Returns the inner text when the whole expression is wrapped in one pair of
/// parentheses.
fn strip_outer_parens(expr: &str) -> Option<&str> {
    let inner = expr.strip_prefix('(')?.strip_suffix(')')?;
    let mut depth = 0i32;
    for ch in inner.chars() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return None;
                }
            }
            _ => {}
        }
    }
    (depth == 0).then_some(inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decimal_equality_ignores_trailing_zeros() {
        let a = DefaultValue::Decimal("1.50".into());
        let b = DefaultValue::Decimal("1.5".into());
        assert!(a.same_as(&b));
        assert!(DefaultValue::Decimal("2.0".into()).same_as(&DefaultValue::Int(2)));
        assert!(!DefaultValue::Decimal("2.5".into()).same_as(&DefaultValue::Int(2)));
    }

    #[test]
    fn test_expression_equality_normalizes_whitespace() {
        let a = DefaultValue::Expression("(now())".into());
        let b = DefaultValue::Expression("now()".into());
        assert!(a.same_as(&b));

        let a = DefaultValue::Expression("lower( 'A' )".into());
        let b = DefaultValue::Expression("lower(  'A'  )".into());
        assert!(a.same_as(&b));

        let a = DefaultValue::Expression("(a) + (b)".into());
        let b = DefaultValue::Expression("a) + (b".into());
        assert!(!a.same_as(&b));
    }

    #[test]
    fn test_sequences_are_equal() {
        let a = DefaultValue::Sequence("users_id_seq".into());
        let b = DefaultValue::Sequence("other_seq".into());
        assert!(a.same_as(&b));
    }

    #[test]
    fn test_different_variants_differ() {
        assert!(!DefaultValue::String("1".into()).same_as(&DefaultValue::Int(1)));
        assert!(!DefaultValue::Bool(true).same_as(&DefaultValue::Bool(false)));
    }
}

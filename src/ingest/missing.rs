//! The single "is this cell missing?" predicate.
//!
//! Readers hand the same token list to polars so numeric columns containing
//! `NA` still parse as numbers. Inference, statistics and the insert path all
//! call [`is_missing`] rather than matching on [`Value::Missing`] directly,
//! so NaN floats and NA tokens that survive parsing are treated identically.

use super::table::Value;

/// Strings read as missing. The empty string is absent: a `Text("")` value
/// is data. Whether an empty *field* is missing is the reader's call.
pub const NA_TOKENS: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

pub fn is_na_token(s: &str) -> bool {
    NA_TOKENS.contains(&s)
}

pub fn is_missing(value: &Value) -> bool {
    match value {
        Value::Missing => true,
        Value::Float(f) => f.is_nan(),
        Value::Text(s) => is_na_token(s),
        Value::Integer(_) | Value::Boolean(_) | Value::Timestamp(_) => false,
    }
}

/// Number of missing cells in a column.
pub fn count_missing(values: &[Value]) -> usize {
    values.iter().filter(|v| is_missing(v)).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_markers() {
        assert!(is_missing(&Value::Missing));
        assert!(is_missing(&Value::Float(f64::NAN)));
        assert!(is_missing(&Value::Text("NA".to_owned())));
        assert!(is_missing(&Value::Text("<NA>".to_owned())));
    }

    #[test]
    fn test_legitimate_values_are_not_missing() {
        assert!(!is_missing(&Value::Integer(0)));
        assert!(!is_missing(&Value::Float(0.0)));
        assert!(!is_missing(&Value::Boolean(false)));
        assert!(!is_missing(&Value::Text(String::new())));
        assert!(!is_missing(&Value::Text("Nathan".to_owned())));
        // NA tokens match exactly, not after trimming
        assert!(!is_missing(&Value::Text(" NA".to_owned())));
    }

    #[test]
    fn test_count_missing() {
        let values = vec![
            Value::Missing,
            Value::Text("x".to_owned()),
            Value::Float(f64::NAN),
        ];
        assert_eq!(count_missing(&values), 2);
    }
}

//! Best-effort scalar parsing for text sources.

use crate::scalar::Scalar;

/// Parse a raw text cell into the most specific scalar it supports:
/// empty -> null, then integer, float, boolean, and finally string.
pub fn parse_scalar(raw: &str) -> Scalar {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Scalar::Null;
    }
    if let Ok(v) = trimmed.parse::<i64>() {
        return Scalar::Int(v);
    }
    if let Ok(v) = trimmed.parse::<f64>() {
        return Scalar::Float(v);
    }
    match trimmed {
        "true" | "True" | "TRUE" => Scalar::Bool(true),
        "false" | "False" | "FALSE" => Scalar::Bool(false),
        _ => Scalar::Str(trimmed.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scalar_kinds() {
        assert_eq!(parse_scalar(""), Scalar::Null);
        assert_eq!(parse_scalar("  "), Scalar::Null);
        assert_eq!(parse_scalar("42"), Scalar::Int(42));
        assert_eq!(parse_scalar("-3"), Scalar::Int(-3));
        assert_eq!(parse_scalar("3.5"), Scalar::Float(3.5));
        assert_eq!(parse_scalar("True"), Scalar::Bool(true));
        assert_eq!(parse_scalar("hello"), Scalar::Str("hello".into()));
    }
}

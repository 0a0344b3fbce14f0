//! The addressing mini-language used in free-form action fields.
//!
//! `t[X]` names table X, `c[Y]` names column Y of the active table, and
//! `t[X]c[Y]` names column Y of table X. Resolution is pure textual
//! substitution, applied in a fixed order so the qualified form is
//! rewritten before the bare forms.

use crate::error::{ActionError, Result};

/// Quote a name as a single-quoted string literal.
pub fn quote(name: &str) -> String {
    let escaped = name.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{escaped}'")
}

/// Rewrite an addressing expression into statement syntax. With
/// `is_sq_expr == false` the text passes through untouched. Bracket text
/// that matches none of the three forms is left as-is and surfaces as a
/// parse error at replay time, not here.
pub fn resolve(expr: &str, active_table: Option<&str>, is_sq_expr: bool) -> Result<String> {
    if !is_sq_expr {
        return Ok(expr.to_string());
    }
    // Qualified t[X]c[Y] first, so the c[ pass below only sees bare columns.
    let expr = expr.replace("]c[", "][");
    let expr = if expr.contains("c[") {
        let active = active_table.ok_or(ActionError::NoActiveTable)?;
        expr.replace("c[", &format!("tables[{}][", quote(active)))
    } else {
        expr
    };
    Ok(expr.replace("t[", "tables["))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_column_uses_active_table() {
        let out = resolve("c['Age'] * 2", Some("people"), true).unwrap();
        assert_eq!(out, "tables['people']['Age'] * 2");
    }

    #[test]
    fn test_qualified_column() {
        let out = resolve("t['other']c['Age']", Some("people"), true).unwrap();
        assert_eq!(out, "tables['other']['Age']");
    }

    #[test]
    fn test_bare_table() {
        let out = resolve("t['other']", None, true).unwrap();
        assert_eq!(out, "tables['other']");
    }

    #[test]
    fn test_raw_passthrough() {
        let out = resolve("c['Age'] + t['x']", None, false).unwrap();
        assert_eq!(out, "c['Age'] + t['x']");
    }

    #[test]
    fn test_bare_column_without_active_table_errors() {
        let err = resolve("c['Age']", None, true).unwrap_err();
        assert!(matches!(err, ActionError::NoActiveTable));
    }

    #[test]
    fn test_substitution_order_qualified_before_bare() {
        // Without the ]c[ pass first, the c[ pass would mangle this.
        let out = resolve("t['a']c['x'] + c['y']", Some("b"), true).unwrap();
        assert_eq!(out, "tables['a']['x'] + tables['b']['y']");
    }

    #[test]
    fn test_quote_escapes() {
        assert_eq!(quote("it's"), r"'it\'s'");
    }
}

//! Parameter declarations and submitted parameter values.

use indexmap::IndexMap;

use crate::error::{ActionError, Result};

/// Declaration of one action parameter.
#[derive(Debug, Clone, Copy)]
pub struct ParamSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub required: bool,
    pub default: Option<&'static str>,
    /// Non-empty for select-style parameters; the submitted value must be
    /// one of these.
    pub allowed: &'static [&'static str],
}

impl ParamSpec {
    pub const fn required(name: &'static str, label: &'static str) -> Self {
        Self {
            name,
            label,
            required: true,
            default: None,
            allowed: &[],
        }
    }

    pub const fn optional(name: &'static str, label: &'static str) -> Self {
        Self {
            name,
            label,
            required: false,
            default: None,
            allowed: &[],
        }
    }

    pub const fn select(
        name: &'static str,
        label: &'static str,
        allowed: &'static [&'static str],
    ) -> Self {
        Self {
            name,
            label,
            required: true,
            default: None,
            allowed,
        }
    }

    pub const fn with_default(mut self, default: &'static str) -> Self {
        self.default = Some(default);
        self.required = false;
        self
    }
}

/// String-keyed parameter values as submitted. Blank values count as
/// absent, the way empty form fields do.
#[derive(Debug, Clone, Default)]
pub struct Params(IndexMap<String, String>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    /// Value for display contexts, `?` when absent.
    pub fn display(&self, name: &str) -> &str {
        self.get(name).unwrap_or("?")
    }

    pub fn require(&self, name: &str) -> Result<&str> {
        self.get(name)
            .ok_or_else(|| ActionError::MissingField(name.to_string()))
    }

    /// Required numeric field, returned as its trimmed source text so the
    /// user's spelling survives into the generated statement.
    pub fn require_number(&self, name: &str) -> Result<&str> {
        let raw = self.require(name)?.trim();
        raw.parse::<f64>()
            .map_err(|_| ActionError::generate(format!("{name} must be a number, got {raw:?}")))?;
        Ok(raw)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for Params {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Validate submitted values against the declared specs: required fields
/// must be present (the error names the field), select fields must hold an
/// allowed value, and declared defaults fill in for absent fields.
pub fn validate(specs: &[ParamSpec], params: &mut Params) -> Result<()> {
    for spec in specs {
        match params.get(spec.name) {
            None => {
                if let Some(default) = spec.default {
                    params.set(spec.name, default);
                } else if spec.required {
                    return Err(ActionError::MissingField(spec.name.to_string()));
                }
            }
            Some(value) => {
                if !spec.allowed.is_empty() && !spec.allowed.contains(&value) {
                    return Err(ActionError::InvalidValue {
                        field: spec.name.to_string(),
                        value: value.to_string(),
                        allowed: spec.allowed.join(", "),
                    });
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPECS: &[ParamSpec] = &[
        ParamSpec::required("table_name", "Table"),
        ParamSpec::select("how", "How", &["inner", "outer"]).with_default("inner"),
    ];

    #[test]
    fn test_missing_required_names_the_field() {
        let mut params = Params::new();
        let err = validate(SPECS, &mut params).unwrap_err();
        assert!(matches!(err, ActionError::MissingField(f) if f == "table_name"));
    }

    #[test]
    fn test_default_fills_absent_select() {
        let mut params = Params::new().with("table_name", "t");
        validate(SPECS, &mut params).unwrap();
        assert_eq!(params.get("how"), Some("inner"));
    }

    #[test]
    fn test_disallowed_select_value() {
        let mut params = Params::new().with("table_name", "t").with("how", "sideways");
        let err = validate(SPECS, &mut params).unwrap_err();
        assert!(matches!(err, ActionError::InvalidValue { field, .. } if field == "how"));
    }

    #[test]
    fn test_blank_counts_as_absent() {
        let mut params = Params::new().with("table_name", "  ");
        let err = validate(SPECS, &mut params).unwrap_err();
        assert!(matches!(err, ActionError::MissingField(_)));
    }
}

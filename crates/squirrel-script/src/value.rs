//! Runtime values for the evaluator.

use squirrel_model::{Column, Scalar, Table};

use crate::ast::Expr;
use crate::error::{Result, ScriptError};

/// A value produced while evaluating an expression.
#[derive(Debug, Clone)]
pub enum Value {
    Scalar(Scalar),
    List(Vec<Value>),
    /// Association list; literal order is preserved.
    Dict(Vec<(Value, Value)>),
    /// A detached column, the element-wise unit of the language.
    Series(Column),
    Table(Table),
    /// Intermediate group-by handle awaiting `.agg(..)`.
    Grouped { table: Table, keys: Vec<String> },
    Lambda { param: String, body: Box<Expr> },
    /// The ambient `tables` binding.
    Env,
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Scalar(s) => s.kind_name(),
            Self::List(_) => "list",
            Self::Dict(_) => "dict",
            Self::Series(_) => "series",
            Self::Table(_) => "table",
            Self::Grouped { .. } => "grouped table",
            Self::Lambda { .. } => "lambda",
            Self::Env => "tables",
        }
    }

    pub fn null() -> Self {
        Self::Scalar(Scalar::Null)
    }

    pub fn into_scalar(self) -> Result<Scalar> {
        match self {
            Self::Scalar(s) => Ok(s),
            other => Err(ScriptError::eval(format!(
                "expected a scalar value, got {}",
                other.type_name()
            ))),
        }
    }

    pub fn into_table(self) -> Result<Table> {
        match self {
            Self::Table(t) => Ok(t),
            other => Err(ScriptError::eval(format!(
                "expected a table, got {}",
                other.type_name()
            ))),
        }
    }

    pub fn into_series(self) -> Result<Column> {
        match self {
            Self::Series(col) => Ok(col),
            other => Err(ScriptError::eval(format!(
                "expected a column, got {}",
                other.type_name()
            ))),
        }
    }

    pub fn as_str(&self) -> Result<&str> {
        match self {
            Self::Scalar(Scalar::Str(s)) => Ok(s),
            other => Err(ScriptError::eval(format!(
                "expected a string, got {}",
                other.type_name()
            ))),
        }
    }

    pub fn as_bool(&self) -> Result<bool> {
        match self {
            Self::Scalar(Scalar::Bool(b)) => Ok(*b),
            other => Err(ScriptError::eval(format!(
                "expected a boolean, got {}",
                other.type_name()
            ))),
        }
    }

    pub fn as_usize(&self) -> Result<usize> {
        match self {
            Self::Scalar(Scalar::Int(v)) if *v >= 0 => Ok(*v as usize),
            other => Err(ScriptError::eval(format!(
                "expected a non-negative integer, got {}",
                other.type_name()
            ))),
        }
    }

    pub fn as_i64(&self) -> Result<i64> {
        match self {
            Self::Scalar(Scalar::Int(v)) => Ok(*v),
            other => Err(ScriptError::eval(format!(
                "expected an integer, got {}",
                other.type_name()
            ))),
        }
    }

    /// Column name lists accept either one name or a list of names.
    pub fn into_name_list(self) -> Result<Vec<String>> {
        match self {
            Self::Scalar(Scalar::Str(s)) => Ok(vec![s]),
            Self::List(items) => items
                .into_iter()
                .map(|item| match item {
                    Self::Scalar(Scalar::Str(s)) => Ok(s),
                    other => Err(ScriptError::eval(format!(
                        "expected a column name, got {}",
                        other.type_name()
                    ))),
                })
                .collect(),
            other => Err(ScriptError::eval(format!(
                "expected a column name or list of names, got {}",
                other.type_name()
            ))),
        }
    }

    /// Dict whose keys and values are both strings (rename and agg maps).
    pub fn into_string_map(self) -> Result<Vec<(String, String)>> {
        match self {
            Self::Dict(entries) => entries
                .into_iter()
                .map(|(k, v)| {
                    let key = k.as_str()?.to_string();
                    let value = v.as_str()?.to_string();
                    Ok((key, value))
                })
                .collect(),
            other => Err(ScriptError::eval(format!(
                "expected a dict, got {}",
                other.type_name()
            ))),
        }
    }

    /// Dict whose keys and values are scalars (replace maps).
    pub fn into_scalar_map(self) -> Result<Vec<(Scalar, Scalar)>> {
        match self {
            Self::Dict(entries) => entries
                .into_iter()
                .map(|(k, v)| Ok((k.into_scalar()?, v.into_scalar()?)))
                .collect(),
            other => Err(ScriptError::eval(format!(
                "expected a dict, got {}",
                other.type_name()
            ))),
        }
    }
}

impl From<Scalar> for Value {
    fn from(s: Scalar) -> Self {
        Self::Scalar(s)
    }
}

impl From<Column> for Value {
    fn from(c: Column) -> Self {
        Self::Series(c)
    }
}

impl From<Table> for Value {
    fn from(t: Table) -> Self {
        Self::Table(t)
    }
}

//! Free functions available to log entries.

use chrono::{NaiveDate, NaiveDateTime};
use indexmap::IndexMap;
use squirrel_model::{Column, Scalar, Table};

use crate::error::{Result, ScriptError};
use crate::eval::{CallArgs, Context};
use crate::value::Value;

pub fn call(ctx: &mut Context<'_>, name: &str, args: CallArgs) -> Result<Value> {
    match name {
        "load_table" => load_table(ctx, args),
        "from_rows" => from_rows(args),
        "merge" => merge(args),
        "concat" => concat(args),
        "to_datetime" => to_datetime(ctx, args),
        "cut" => cut(ctx, args),
        other => Err(ScriptError::eval(format!("unknown function: {other}"))),
    }
}

fn load_table(ctx: &mut Context<'_>, mut args: CallArgs) -> Result<Value> {
    let path = args.next_pos("path")?.as_str()?.to_string();
    args.finish("load_table")?;
    let table = ctx.load(&path)?;
    tracing::debug!(%path, rows = table.n_rows(), "loaded table");
    Ok(Value::Table(table))
}

fn from_rows(mut args: CallArgs) -> Result<Value> {
    let rows = args.next_pos("rows")?;
    args.finish("from_rows")?;
    let Value::List(items) = rows else {
        return Err(ScriptError::eval("from_rows expects a list of dicts"));
    };
    let mut converted: Vec<IndexMap<String, Scalar>> = Vec::with_capacity(items.len());
    for item in items {
        let Value::Dict(entries) = item else {
            return Err(ScriptError::eval("from_rows expects a list of dicts"));
        };
        let mut row = IndexMap::new();
        for (key, value) in entries {
            row.insert(key.as_str()?.to_string(), value.into_scalar()?);
        }
        converted.push(row);
    }
    Ok(Value::Table(Table::from_rows(&converted)))
}

fn merge(mut args: CallArgs) -> Result<Value> {
    let left = args.next_pos("left table")?.into_table()?;
    let right = args.next_pos("right table")?.into_table()?;
    let on = args
        .kw("on")
        .ok_or_else(|| ScriptError::eval("merge requires on=<column>"))?
        .as_str()?
        .to_string();
    let how = match args.kw("how") {
        Some(v) => v.as_str()?.to_string(),
        None => "inner".to_string(),
    };
    args.finish("merge")?;
    join_tables(&left, &right, &on, &how).map(Value::Table)
}

/// Row-wise union: columns are unioned in first-seen order, missing cells
/// are null, and the implicit row index is reset.
fn concat(mut args: CallArgs) -> Result<Value> {
    let tables = args.next_pos("tables")?;
    args.finish("concat")?;
    let Value::List(items) = tables else {
        return Err(ScriptError::eval("concat expects a list of tables"));
    };
    let tables = items
        .into_iter()
        .map(Value::into_table)
        .collect::<Result<Vec<_>>>()?;

    let mut names: Vec<String> = Vec::new();
    for table in &tables {
        for name in table.column_names() {
            if !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
    }
    let mut out = Table::new();
    for name in &names {
        let mut values = Vec::new();
        for table in &tables {
            match table.column(name) {
                Ok(col) => values.extend(col.values.iter().cloned()),
                Err(_) => values.extend(std::iter::repeat_n(Scalar::Null, table.n_rows())),
            }
        }
        out.set_column(name, Column::new(values))?;
    }
    Ok(Value::Table(out))
}

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%m/%d/%Y"];

/// Parse one scalar into a datetime. Nulls pass through; existing
/// datetimes are kept.
pub fn parse_datetime(value: &Scalar) -> Result<Scalar> {
    match value {
        Scalar::Null => Ok(Scalar::Null),
        Scalar::DateTime(_) => Ok(value.clone()),
        Scalar::Str(raw) => {
            let raw = raw.trim();
            for fmt in DATETIME_FORMATS {
                if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
                    return Ok(Scalar::DateTime(dt));
                }
            }
            for fmt in DATE_FORMATS {
                if let Ok(date) = NaiveDate::parse_from_str(raw, fmt) {
                    if let Some(dt) = date.and_hms_opt(0, 0, 0) {
                        return Ok(Scalar::DateTime(dt));
                    }
                }
            }
            Err(ScriptError::eval(format!(
                "cannot parse datetime from {raw:?}"
            )))
        }
        other => Err(ScriptError::eval(format!(
            "cannot convert {} to datetime",
            other.kind_name()
        ))),
    }
}

fn to_datetime(ctx: &mut Context<'_>, mut args: CallArgs) -> Result<Value> {
    let value = args.next_pos("value")?;
    args.finish("to_datetime")?;
    match value {
        Value::Series(col) => {
            let mut out = Vec::with_capacity(col.len());
            for v in &col.values {
                ctx.check_deadline()?;
                out.push(parse_datetime(v)?);
            }
            Ok(Value::Series(Column::new(out)))
        }
        Value::Scalar(s) => Ok(Value::Scalar(parse_datetime(&s)?)),
        other => Err(ScriptError::eval(format!(
            "to_datetime expects a column or scalar, got {}",
            other.type_name()
        ))),
    }
}

/// Bucket numeric values into labeled, right-inclusive ranges
/// `(bins[i], bins[i+1]]`; out-of-range values become null.
fn cut(ctx: &mut Context<'_>, mut args: CallArgs) -> Result<Value> {
    let col = args.next_pos("column")?.into_series()?;
    let bins = args
        .kw("bins")
        .ok_or_else(|| ScriptError::eval("cut requires bins=[..]"))?;
    let labels = args
        .kw("labels")
        .ok_or_else(|| ScriptError::eval("cut requires labels=[..]"))?;
    args.finish("cut")?;

    let Value::List(bin_items) = bins else {
        return Err(ScriptError::eval("cut bins must be a list of numbers"));
    };
    let bins = bin_items
        .into_iter()
        .map(|v| {
            v.into_scalar()?
                .as_f64()
                .ok_or_else(|| ScriptError::eval("cut bins must be numeric"))
        })
        .collect::<Result<Vec<f64>>>()?;
    let Value::List(label_items) = labels else {
        return Err(ScriptError::eval("cut labels must be a list"));
    };
    let labels = label_items
        .into_iter()
        .map(Value::into_scalar)
        .collect::<Result<Vec<Scalar>>>()?;

    if bins.len() < 2 {
        return Err(ScriptError::eval("cut requires at least two bin edges"));
    }
    if labels.len() != bins.len() - 1 {
        return Err(ScriptError::eval(format!(
            "cut: {} labels for {} intervals",
            labels.len(),
            bins.len() - 1
        )));
    }

    let mut out = Vec::with_capacity(col.len());
    for value in &col.values {
        ctx.check_deadline()?;
        let Some(x) = value.as_f64() else {
            out.push(Scalar::Null);
            continue;
        };
        let mut bucket = Scalar::Null;
        for i in 0..bins.len() - 1 {
            if x > bins[i] && x <= bins[i + 1] {
                bucket = labels[i].clone();
                break;
            }
        }
        out.push(bucket);
    }
    Ok(Value::Series(Column::new(out)))
}

/// Inner/left/right/outer join on one key column. Preserves left row
/// order (right order for unmatched right rows); overlapping non-key
/// column names are suffixed `_x` / `_y`.
fn join_tables(left: &Table, right: &Table, on: &str, how: &str) -> Result<Table> {
    left.column(on)?;
    right.column(on)?;
    if !matches!(how, "inner" | "left" | "right" | "outer") {
        return Err(ScriptError::eval(format!("merge: invalid how: {how}")));
    }

    let overlap: Vec<String> = left
        .column_names()
        .filter(|name| *name != on && right.has_column(name))
        .map(str::to_string)
        .collect();
    let out_name = |name: &str, suffix: &str| {
        if overlap.iter().any(|o| o == name) {
            format!("{name}{suffix}")
        } else {
            name.to_string()
        }
    };

    let left_key = left.column(on)?;
    let right_key = right.column(on)?;
    let n_left = left.n_rows();
    let n_right = right.n_rows();

    // (left row, right row) pairs; None marks the null side.
    let mut pairs: Vec<(Option<usize>, Option<usize>)> = Vec::new();
    let mut right_matched = vec![false; n_right];
    for i in 0..n_left {
        let key = &left_key.values[i];
        let mut matched = false;
        if !key.is_null() {
            for j in 0..n_right {
                if right_key.values[j] == *key {
                    pairs.push((Some(i), Some(j)));
                    right_matched[j] = true;
                    matched = true;
                }
            }
        }
        if !matched && matches!(how, "left" | "outer") {
            pairs.push((Some(i), None));
        }
    }
    if matches!(how, "right" | "outer") {
        for (j, matched) in right_matched.iter().enumerate() {
            if !matched {
                pairs.push((None, Some(j)));
            }
        }
    }

    let mut out = Table::new();
    let pick = |col: &Column, idx: Option<usize>| {
        idx.map_or(Scalar::Null, |i| col.values[i].clone())
    };
    // Key column first, filled from whichever side is present.
    let key_values: Vec<Scalar> = pairs
        .iter()
        .map(|&(li, rj)| match li {
            Some(i) => left_key.values[i].clone(),
            None => pick(right_key, rj),
        })
        .collect();
    out.set_column(on, Column::new(key_values))?;
    for (name, col) in left.columns() {
        if name == on {
            continue;
        }
        let values = pairs.iter().map(|&(li, _)| pick(col, li)).collect();
        out.set_column(&out_name(name, "_x"), Column::new(values))?;
    }
    for (name, col) in right.columns() {
        if name == on {
            continue;
        }
        let values = pairs.iter().map(|&(_, rj)| pick(col, rj)).collect();
        out.set_column(&out_name(name, "_y"), Column::new(values))?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::execute;
    use squirrel_model::TableEnv;

    fn run(env: &mut TableEnv, src: &str) {
        let mut ctx = Context::new(env);
        execute(src, &mut ctx).unwrap();
    }

    fn ints(table: &Table, col: &str) -> Vec<i64> {
        table
            .column(col)
            .unwrap()
            .values
            .iter()
            .map(|v| match v {
                Scalar::Int(x) => *x,
                other => panic!("expected int, got {other:?}"),
            })
            .collect()
    }

    #[test]
    fn test_from_rows() {
        let mut env = TableEnv::new();
        run(
            &mut env,
            "tables['t'] = from_rows([{'a': 1, 'b': 'x'}, {'a': 2, 'b': 'y'}])",
        );
        assert_eq!(ints(&env["t"], "a"), vec![1, 2]);
    }

    #[test]
    fn test_inner_merge() {
        let mut env = TableEnv::new();
        run(
            &mut env,
            "tables['l'] = from_rows([{'k': 1, 'a': 10}, {'k': 2, 'a': 20}, {'k': 3, 'a': 30}])",
        );
        run(
            &mut env,
            "tables['r'] = from_rows([{'k': 2, 'b': 200}, {'k': 3, 'b': 300}, {'k': 9, 'b': 900}])",
        );
        run(
            &mut env,
            "tables['m'] = merge(tables['l'], tables['r'], on='k', how='inner')",
        );
        assert_eq!(ints(&env["m"], "k"), vec![2, 3]);
        assert_eq!(ints(&env["m"], "a"), vec![20, 30]);
        assert_eq!(ints(&env["m"], "b"), vec![200, 300]);
    }

    #[test]
    fn test_left_merge_fills_nulls() {
        let mut env = TableEnv::new();
        run(&mut env, "tables['l'] = from_rows([{'k': 1, 'a': 10}])");
        run(&mut env, "tables['r'] = from_rows([{'k': 2, 'b': 200}])");
        run(
            &mut env,
            "tables['m'] = merge(tables['l'], tables['r'], on='k', how='left')",
        );
        assert_eq!(env["m"].n_rows(), 1);
        assert!(env["m"].column("b").unwrap().values[0].is_null());
    }

    #[test]
    fn test_outer_merge_keeps_both_sides() {
        let mut env = TableEnv::new();
        run(&mut env, "tables['l'] = from_rows([{'k': 1, 'a': 10}])");
        run(&mut env, "tables['r'] = from_rows([{'k': 2, 'b': 200}])");
        run(
            &mut env,
            "tables['m'] = merge(tables['l'], tables['r'], on='k', how='outer')",
        );
        assert_eq!(env["m"].n_rows(), 2);
        assert_eq!(ints(&env["m"], "k"), vec![1, 2]);
    }

    #[test]
    fn test_concat_unions_columns() {
        let mut env = TableEnv::new();
        run(&mut env, "tables['a'] = from_rows([{'x': 1}])");
        run(&mut env, "tables['b'] = from_rows([{'x': 2, 'y': 3}])");
        run(
            &mut env,
            "tables['c'] = concat([tables['a'], tables['b']])",
        );
        assert_eq!(ints(&env["c"], "x"), vec![1, 2]);
        assert!(env["c"].column("y").unwrap().values[0].is_null());
    }

    #[test]
    fn test_cut_buckets_values() {
        let mut env = TableEnv::new();
        run(
            &mut env,
            "tables['t'] = from_rows([{'v': 5}, {'v': 15}, {'v': 50}])",
        );
        run(
            &mut env,
            "tables['t']['bucket'] = cut(tables['t']['v'], bins=[0, 10, 20], labels=['low', 'high'])",
        );
        let col = env["t"].column("bucket").unwrap();
        assert_eq!(col.values[0], Scalar::Str("low".into()));
        assert_eq!(col.values[1], Scalar::Str("high".into()));
        assert!(col.values[2].is_null());
    }

    #[test]
    fn test_to_datetime_parses_dates() {
        let mut env = TableEnv::new();
        run(&mut env, "tables['t'] = from_rows([{'d': '2024-01-02'}])");
        run(
            &mut env,
            "tables['t']['d'] = to_datetime(tables['t']['d'])",
        );
        let col = env["t"].column("d").unwrap();
        assert!(matches!(col.values[0], Scalar::DateTime(_)));
    }

    #[test]
    fn test_unknown_function() {
        let mut env = TableEnv::new();
        let mut ctx = Context::new(&mut env);
        let err = execute("tables['t'] = evil()", &mut ctx).unwrap_err();
        assert!(err.to_string().contains("unknown function"));
    }
}

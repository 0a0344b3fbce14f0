//! Methods on table values.

use squirrel_model::{Column, Scalar, Table};

use crate::error::{Result, ScriptError};
use crate::eval::{apply_lambda, CallArgs, Context};
use crate::value::Value;

pub fn call(ctx: &mut Context<'_>, table: Table, name: &str, args: CallArgs) -> Result<Value> {
    match name {
        "drop" => drop_columns(table, args),
        "rename" => rename(table, args),
        "filter" => filter(table, args),
        "sort_values" => sort_values(ctx, table, args),
        "groupby" => groupby(table, args),
        "nlargest" => n_extreme(ctx, table, args, true),
        "nsmallest" => n_extreme(ctx, table, args, false),
        "dropna" => dropna(table, args),
        "head" => head(table, args),
        other => Err(ScriptError::eval(format!(
            "no method {other} on a table"
        ))),
    }
}

/// Methods on a `.groupby(..)` result.
pub fn call_grouped(
    ctx: &mut Context<'_>,
    table: Table,
    keys: &[String],
    name: &str,
    args: CallArgs,
) -> Result<Value> {
    match name {
        "agg" => agg(ctx, table, keys, args),
        other => Err(ScriptError::eval(format!(
            "no method {other} on a grouped table"
        ))),
    }
}

fn drop_columns(mut table: Table, mut args: CallArgs) -> Result<Value> {
    let columns = args.pos_or_kw("columns")?.into_name_list()?;
    args.finish("drop")?;
    for name in &columns {
        table.drop_column(name)?;
    }
    Ok(Value::Table(table))
}

fn rename(mut table: Table, mut args: CallArgs) -> Result<Value> {
    let mapping = args.pos_or_kw("columns")?.into_string_map()?;
    args.finish("rename")?;
    for (old, new) in &mapping {
        table.rename_column(old, new)?;
    }
    Ok(Value::Table(table))
}

/// Keep rows where the mask column is true. Nulls count as false.
fn filter(table: Table, mut args: CallArgs) -> Result<Value> {
    let mask = args.next_pos("mask")?.into_series()?;
    args.finish("filter")?;
    if mask.len() != table.n_rows() {
        return Err(ScriptError::eval(format!(
            "filter mask length {} does not match {} rows",
            mask.len(),
            table.n_rows()
        )));
    }
    let mask: Vec<bool> = mask
        .values
        .iter()
        .map(|v| match v {
            Scalar::Bool(b) => Ok(*b),
            Scalar::Null => Ok(false),
            other => Err(ScriptError::eval(format!(
                "filter mask must be boolean, got {}",
                other.kind_name()
            ))),
        })
        .collect::<Result<_>>()?;
    Ok(Value::Table(table.filter_mask(&mask)))
}

fn sort_values(ctx: &mut Context<'_>, table: Table, mut args: CallArgs) -> Result<Value> {
    let by = args.pos_or_kw("by")?.into_name_list()?;
    let ascending = match args.kw("ascending") {
        Some(v) => v.as_bool()?,
        None => true,
    };
    let key = args.kw("key");
    args.finish("sort_values")?;
    if by.is_empty() {
        return Err(ScriptError::eval("sort_values: empty column list"));
    }
    if key.is_some() && by.len() != 1 {
        return Err(ScriptError::eval(
            "sort_values: key= requires a single sort column",
        ));
    }

    // Precompute per-row sort keys so the comparator stays pure.
    let n = table.n_rows();
    let mut row_keys: Vec<Vec<Scalar>> = vec![Vec::with_capacity(by.len()); n];
    for name in &by {
        let col = table.column(name)?;
        for (i, value) in col.values.iter().enumerate() {
            ctx.check_deadline()?;
            let keyed = match &key {
                Some(lambda) => {
                    apply_lambda(ctx, lambda, Value::Scalar(value.clone()))?.into_scalar()?
                }
                None => value.clone(),
            };
            row_keys[i].push(keyed);
        }
    }

    let mut indices: Vec<usize> = (0..n).collect();
    indices.sort_by(|&a, &b| {
        let ord = row_keys[a]
            .iter()
            .zip(&row_keys[b])
            .map(|(x, y)| x.sort_cmp(y))
            .find(|ord| ord.is_ne())
            .unwrap_or(std::cmp::Ordering::Equal);
        if ascending { ord } else { ord.reverse() }
    });
    Ok(Value::Table(table.take_rows(&indices)))
}

fn groupby(table: Table, mut args: CallArgs) -> Result<Value> {
    let keys = args.pos_or_kw("by")?.into_name_list()?;
    args.finish("groupby")?;
    for key in &keys {
        table.column(key)?;
    }
    Ok(Value::Grouped { table, keys })
}

/// Aggregate a grouped table. Accepts either a single function name
/// (applied to every non-key column) or a column-to-function dict. Groups
/// appear sorted by key; the output has the key columns followed by one
/// column per aggregation.
fn agg(ctx: &mut Context<'_>, table: Table, keys: &[String], mut args: CallArgs) -> Result<Value> {
    let spec = match args.next_pos("aggregation")? {
        Value::Scalar(Scalar::Str(func)) => table
            .column_names()
            .filter(|name| !keys.iter().any(|k| k == name))
            .map(|name| (name.to_string(), func.clone()))
            .collect(),
        other => other.into_string_map()?,
    };
    args.finish("agg")?;
    for (col, _) in &spec {
        table.column(col)?;
    }

    let key_cols: Vec<&Column> = keys
        .iter()
        .map(|k| table.column(k))
        .collect::<squirrel_model::Result<_>>()?;
    let mut groups: Vec<(Vec<Scalar>, Vec<usize>)> = Vec::new();
    for i in 0..table.n_rows() {
        ctx.check_deadline()?;
        let group_key: Vec<Scalar> = key_cols.iter().map(|c| c.values[i].clone()).collect();
        match groups.iter_mut().find(|(k, _)| *k == group_key) {
            Some((_, rows)) => rows.push(i),
            None => groups.push((group_key, vec![i])),
        }
    }
    groups.sort_by(|(a, _), (b, _)| {
        a.iter()
            .zip(b)
            .map(|(x, y)| x.sort_cmp(y))
            .find(|ord| ord.is_ne())
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut out = Table::new();
    for (pos, key) in keys.iter().enumerate() {
        let values = groups.iter().map(|(k, _)| k[pos].clone()).collect();
        out.set_column(key, Column::new(values))?;
    }
    for (col_name, func) in &spec {
        let col = table.column(col_name)?;
        let values = groups
            .iter()
            .map(|(_, rows)| {
                let cells: Vec<&Scalar> = rows.iter().map(|&i| &col.values[i]).collect();
                aggregate(func, &cells)
            })
            .collect::<Result<_>>()?;
        out.set_column(col_name, Column::new(values))?;
    }
    Ok(Value::Table(out))
}

fn aggregate(func: &str, cells: &[&Scalar]) -> Result<Scalar> {
    let non_null: Vec<&Scalar> = cells.iter().copied().filter(|v| !v.is_null()).collect();
    match func {
        "count" => Ok(Scalar::Int(non_null.len() as i64)),
        "first" => Ok(non_null.first().map_or(Scalar::Null, |v| (*v).clone())),
        "last" => Ok(non_null.last().map_or(Scalar::Null, |v| (*v).clone())),
        "min" | "max" => {
            let mut best: Option<&Scalar> = None;
            for &v in &non_null {
                best = Some(match best {
                    None => v,
                    Some(b) => {
                        let ord = v.sort_cmp(b);
                        if (func == "min") == ord.is_lt() && ord.is_ne() { v } else { b }
                    }
                });
            }
            Ok(best.cloned().unwrap_or(Scalar::Null))
        }
        "sum" => {
            if non_null.is_empty() {
                return Ok(Scalar::Int(0));
            }
            if non_null.iter().all(|v| matches!(v, Scalar::Int(_))) {
                let mut total: i64 = 0;
                for v in &non_null {
                    if let Scalar::Int(x) = v {
                        total = total
                            .checked_add(*x)
                            .ok_or_else(|| ScriptError::eval("integer overflow in sum"))?;
                    }
                }
                return Ok(Scalar::Int(total));
            }
            let total: f64 = non_null.iter().filter_map(|v| v.as_f64()).sum();
            Ok(Scalar::Float(total))
        }
        "mean" => {
            let nums: Vec<f64> = non_null.iter().filter_map(|v| v.as_f64()).collect();
            if nums.is_empty() {
                return Ok(Scalar::Null);
            }
            Ok(Scalar::Float(nums.iter().sum::<f64>() / nums.len() as f64))
        }
        "std" => {
            let nums: Vec<f64> = non_null.iter().filter_map(|v| v.as_f64()).collect();
            if nums.len() < 2 {
                return Ok(Scalar::Null);
            }
            let mean = nums.iter().sum::<f64>() / nums.len() as f64;
            let var =
                nums.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (nums.len() - 1) as f64;
            Ok(Scalar::Float(var.sqrt()))
        }
        other => Err(ScriptError::eval(format!(
            "unknown aggregation: {other}"
        ))),
    }
}

/// Top/bottom `n` rows by one column. Null cells never qualify. `keep`
/// controls boundary ties: `first` and `last` pick by row order, `all`
/// keeps every tied row even beyond `n`.
fn n_extreme(
    ctx: &mut Context<'_>,
    table: Table,
    mut args: CallArgs,
    largest: bool,
) -> Result<Value> {
    let method = if largest { "nlargest" } else { "nsmallest" };
    let n = args.pos_or_kw("n")?.as_usize()?;
    let column = args.pos_or_kw("columns")?.as_str()?.to_string();
    let keep = match args.kw("keep") {
        Some(v) => v.as_str()?.to_string(),
        None => "first".to_string(),
    };
    args.finish(method)?;
    if !matches!(keep.as_str(), "first" | "last" | "all") {
        return Err(ScriptError::eval(format!("{method}: invalid keep: {keep}")));
    }

    let col = table.column(&column)?;
    let mut indices: Vec<usize> = (0..table.n_rows())
        .filter(|&i| !col.values[i].is_null())
        .collect();
    ctx.check_deadline_now()?;
    if keep == "last" {
        indices.reverse();
    }
    // Stable sort keeps row order (or reversed order for keep='last')
    // among equal cells.
    indices.sort_by(|&a, &b| {
        let ord = col.values[a].sort_cmp(&col.values[b]);
        if largest { ord.reverse() } else { ord }
    });

    let selected: Vec<usize> = if keep == "all" && indices.len() > n && n > 0 {
        let boundary = col.values[indices[n - 1]].clone();
        indices
            .into_iter()
            .enumerate()
            .take_while(|&(rank, i)| rank < n || col.values[i] == boundary)
            .map(|(_, i)| i)
            .collect()
    } else {
        indices.into_iter().take(n).collect()
    };
    Ok(Value::Table(table.take_rows(&selected)))
}

fn dropna(table: Table, mut args: CallArgs) -> Result<Value> {
    let subset = match args.kw("subset") {
        Some(v) => v.into_name_list()?,
        None => table.column_names().map(str::to_string).collect(),
    };
    args.finish("dropna")?;
    let cols = subset
        .iter()
        .map(|name| table.column(name))
        .collect::<squirrel_model::Result<Vec<_>>>()?;
    let mask: Vec<bool> = (0..table.n_rows())
        .map(|i| cols.iter().all(|c| !c.values[i].is_null()))
        .collect();
    Ok(Value::Table(table.filter_mask(&mask)))
}

fn head(table: Table, mut args: CallArgs) -> Result<Value> {
    let n = match args.opt_pos() {
        Some(v) => v.as_usize()?,
        None => 5,
    };
    args.finish("head")?;
    let indices: Vec<usize> = (0..table.n_rows().min(n)).collect();
    Ok(Value::Table(table.take_rows(&indices)))
}

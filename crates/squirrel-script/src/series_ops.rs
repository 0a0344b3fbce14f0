//! Methods on column values: casts, cleaning, math and string transforms,
//! plus scalar reductions.

use regex::Regex;
use squirrel_model::{parse_scalar, Column, Scalar};

use crate::error::{Result, ScriptError};
use crate::eval::{CallArgs, Context};
use crate::funcs::parse_datetime;
use crate::value::Value;

pub fn call(ctx: &mut Context<'_>, col: Column, name: &str, args: CallArgs) -> Result<Value> {
    match name {
        "astype" => astype(ctx, col, args),
        "replace" => replace(ctx, col, args),
        "fillna" => fillna(col, args),
        "interpolate" => interpolate(col, args),
        "diff" => diff(col, args),
        "abs" => map_numeric(ctx, col, args, "abs", f64::abs),
        "round" => round(ctx, col, args),
        "log" => map_numeric(ctx, col, args, "log", f64::ln),
        "sqrt" => map_numeric(ctx, col, args, "sqrt", f64::sqrt),
        "isin" => isin(ctx, col, args),
        "min" | "max" | "sum" | "mean" | "std" | "count" => reduce(col, name, args),
        _ if name.starts_with("str.") => str_method(ctx, col, &name[4..], args),
        other => Err(ScriptError::eval(format!(
            "no method {other} on a column"
        ))),
    }
}

fn astype(ctx: &mut Context<'_>, col: Column, mut args: CallArgs) -> Result<Value> {
    let target = args.next_pos("target type")?.as_str()?.to_string();
    args.finish("astype")?;
    let mut out = Vec::with_capacity(col.len());
    for v in &col.values {
        ctx.check_deadline()?;
        out.push(cast_scalar(v, &target)?);
    }
    Ok(Value::Series(Column::new(out)))
}

fn cast_scalar(v: &Scalar, target: &str) -> Result<Scalar> {
    if v.is_null() {
        return Ok(Scalar::Null);
    }
    match target {
        "int" => match v {
            Scalar::Int(x) => Ok(Scalar::Int(*x)),
            Scalar::Float(x) => Ok(Scalar::Int(*x as i64)),
            Scalar::Bool(b) => Ok(Scalar::Int(i64::from(*b))),
            Scalar::Str(s) => s
                .trim()
                .parse::<i64>()
                .map(Scalar::Int)
                .map_err(|_| ScriptError::eval(format!("cannot cast {s:?} to int"))),
            other => Err(ScriptError::eval(format!(
                "cannot cast {} to int",
                other.kind_name()
            ))),
        },
        "float" => v
            .as_f64()
            .map(Scalar::Float)
            .or_else(|| match v {
                Scalar::Str(s) => s.trim().parse::<f64>().ok().map(Scalar::Float),
                _ => None,
            })
            .ok_or_else(|| {
                ScriptError::eval(format!("cannot cast {} to float", v.kind_name()))
            }),
        "str" | "string" => Ok(Scalar::Str(v.to_string())),
        "bool" => match v {
            Scalar::Bool(b) => Ok(Scalar::Bool(*b)),
            Scalar::Int(x) => Ok(Scalar::Bool(*x != 0)),
            other => Err(ScriptError::eval(format!(
                "cannot cast {} to bool",
                other.kind_name()
            ))),
        },
        "datetime" => parse_datetime(v),
        other => Err(ScriptError::eval(format!("unknown type: {other}"))),
    }
}

/// Map cells through a replacement dict. A string map key that does not
/// match directly is re-parsed, so `{'2': 'two'}` also hits integer cells.
fn replace(ctx: &mut Context<'_>, col: Column, mut args: CallArgs) -> Result<Value> {
    let mapping = args.next_pos("replacement dict")?.into_scalar_map()?;
    args.finish("replace")?;
    let mapping: Vec<(Scalar, Scalar, Scalar)> = mapping
        .into_iter()
        .map(|(k, v)| {
            let coerced = match &k {
                Scalar::Str(s) => parse_scalar(s),
                other => other.clone(),
            };
            (k, coerced, v)
        })
        .collect();
    let mut out = Vec::with_capacity(col.len());
    for cell in &col.values {
        ctx.check_deadline()?;
        let hit = mapping
            .iter()
            .find(|(key, coerced, _)| cell == key || cell == coerced);
        out.push(match hit {
            Some((_, _, replacement)) => replacement.clone(),
            None => cell.clone(),
        });
    }
    Ok(Value::Series(Column::new(out)))
}

fn fillna(col: Column, mut args: CallArgs) -> Result<Value> {
    let fill = args.next_pos("fill value")?.into_scalar()?;
    args.finish("fillna")?;
    let out = col
        .values
        .into_iter()
        .map(|v| if v.is_null() { fill.clone() } else { v })
        .collect();
    Ok(Value::Series(out))
}

/// Linear interpolation over null runs between two numeric neighbors.
/// Leading nulls stay null; trailing nulls take the last known value.
fn interpolate(col: Column, args: CallArgs) -> Result<Value> {
    args.finish("interpolate")?;
    let mut out = col.values.clone();
    let known: Vec<(usize, f64)> = col
        .values
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.as_f64().map(|x| (i, x)))
        .collect();
    if known.is_empty() {
        return Ok(Value::Series(col));
    }
    for window in known.windows(2) {
        let (lo_idx, lo) = window[0];
        let (hi_idx, hi) = window[1];
        for i in lo_idx + 1..hi_idx {
            if out[i].is_null() {
                let t = (i - lo_idx) as f64 / (hi_idx - lo_idx) as f64;
                out[i] = Scalar::Float(lo + t * (hi - lo));
            }
        }
    }
    let (last_idx, last) = *known.last().unwrap_or(&(0, 0.0));
    for cell in out.iter_mut().skip(last_idx + 1) {
        if cell.is_null() {
            *cell = Scalar::Float(last);
        }
    }
    Ok(Value::Series(Column::new(out)))
}

/// Difference against the cell `periods` rows back; the first `periods`
/// cells are null.
fn diff(col: Column, mut args: CallArgs) -> Result<Value> {
    let periods = match args.kw("periods").or_else(|| args.opt_pos()) {
        Some(v) => v.as_usize()?,
        None => 1,
    };
    args.finish("diff")?;
    let mut out = Vec::with_capacity(col.len());
    for (i, v) in col.values.iter().enumerate() {
        let prev = i.checked_sub(periods).map(|j| &col.values[j]);
        out.push(match (prev.and_then(Scalar::as_f64), v.as_f64()) {
            (Some(p), Some(c)) => Scalar::Float(c - p),
            _ => Scalar::Null,
        });
    }
    Ok(Value::Series(Column::new(out)))
}

/// Element-wise numeric map. Integers keep their type through `abs`;
/// everything else goes through f64 (so `log` of a non-positive value is
/// NaN rather than an error).
fn map_numeric(
    ctx: &mut Context<'_>,
    col: Column,
    args: CallArgs,
    method: &str,
    f: fn(f64) -> f64,
) -> Result<Value> {
    args.finish(method)?;
    let mut out = Vec::with_capacity(col.len());
    for v in &col.values {
        ctx.check_deadline()?;
        out.push(match v {
            Scalar::Null => Scalar::Null,
            Scalar::Int(x) if method == "abs" => Scalar::Int(x.abs()),
            _ => match v.as_f64() {
                Some(x) => Scalar::Float(f(x)),
                None => {
                    return Err(ScriptError::eval(format!(
                        "{method} applied to {}",
                        v.kind_name()
                    )));
                }
            },
        });
    }
    Ok(Value::Series(Column::new(out)))
}

fn round(ctx: &mut Context<'_>, col: Column, mut args: CallArgs) -> Result<Value> {
    let digits = match args.opt_pos() {
        Some(v) => v.as_i64()?,
        None => 0,
    };
    args.finish("round")?;
    let factor = 10f64.powi(digits as i32);
    let mut out = Vec::with_capacity(col.len());
    for v in &col.values {
        ctx.check_deadline()?;
        out.push(match v {
            Scalar::Null => Scalar::Null,
            Scalar::Int(x) => Scalar::Int(*x),
            Scalar::Float(x) => Scalar::Float((x * factor).round() / factor),
            other => {
                return Err(ScriptError::eval(format!(
                    "round applied to {}",
                    other.kind_name()
                )));
            }
        });
    }
    Ok(Value::Series(Column::new(out)))
}

fn isin(ctx: &mut Context<'_>, col: Column, mut args: CallArgs) -> Result<Value> {
    let candidates = args.next_pos("candidate list")?;
    args.finish("isin")?;
    let Value::List(items) = candidates else {
        return Err(ScriptError::eval("isin expects a list"));
    };
    let candidates = items
        .into_iter()
        .map(Value::into_scalar)
        .collect::<Result<Vec<_>>>()?;
    let mut out = Vec::with_capacity(col.len());
    for v in &col.values {
        ctx.check_deadline()?;
        let hit = !v.is_null() && candidates.iter().any(|c| c == v);
        out.push(Scalar::Bool(hit));
    }
    Ok(Value::Series(Column::new(out)))
}

/// Scalar reductions over the non-null cells.
fn reduce(col: Column, func: &str, args: CallArgs) -> Result<Value> {
    args.finish(func)?;
    let non_null: Vec<&Scalar> = col.values.iter().filter(|v| !v.is_null()).collect();
    let result = match func {
        "count" => Scalar::Int(non_null.len() as i64),
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
            best.cloned().unwrap_or(Scalar::Null)
        }
        "sum" => {
            if non_null.iter().all(|v| matches!(v, Scalar::Int(_))) {
                let mut total: i64 = 0;
                for v in &non_null {
                    if let Scalar::Int(x) = v {
                        total = total
                            .checked_add(*x)
                            .ok_or_else(|| ScriptError::eval("integer overflow in sum"))?;
                    }
                }
                Scalar::Int(total)
            } else {
                Scalar::Float(non_null.iter().filter_map(|v| v.as_f64()).sum())
            }
        }
        "mean" => {
            let nums: Vec<f64> = non_null.iter().filter_map(|v| v.as_f64()).collect();
            if nums.is_empty() {
                Scalar::Null
            } else {
                Scalar::Float(nums.iter().sum::<f64>() / nums.len() as f64)
            }
        }
        "std" => {
            let nums: Vec<f64> = non_null.iter().filter_map(|v| v.as_f64()).collect();
            if nums.len() < 2 {
                Scalar::Null
            } else {
                let mean = nums.iter().sum::<f64>() / nums.len() as f64;
                let var = nums.iter().map(|x| (x - mean).powi(2)).sum::<f64>()
                    / (nums.len() - 1) as f64;
                Scalar::Float(var.sqrt())
            }
        }
        _ => unreachable!("reduce called with unknown function"),
    };
    Ok(Value::Scalar(result))
}

/// `str.*` namespace. Non-string cells become null instead of failing, so
/// a mixed column survives a text cleanup step.
fn str_method(ctx: &mut Context<'_>, col: Column, name: &str, mut args: CallArgs) -> Result<Value> {
    let transform: Box<dyn Fn(&str) -> Result<String>> = match name {
        "upper" => Box::new(|s| Ok(s.to_uppercase())),
        "lower" => Box::new(|s| Ok(s.to_lowercase())),
        "strip" => Box::new(|s| Ok(s.trim().to_string())),
        "lstrip" => Box::new(|s| Ok(s.trim_start().to_string())),
        "rstrip" => Box::new(|s| Ok(s.trim_end().to_string())),
        "capitalize" => Box::new(|s| Ok(capitalize(s))),
        "title" => Box::new(|s| {
            Ok(s.split(' ')
                .map(capitalize)
                .collect::<Vec<_>>()
                .join(" "))
        }),
        "replace" => {
            let pattern = args.next_pos("pattern")?.as_str()?.to_string();
            let replacement = args.next_pos("replacement")?.as_str()?.to_string();
            let use_regex = match args.kw("regex") {
                Some(v) => v.as_bool()?,
                None => false,
            };
            if use_regex {
                let re = Regex::new(&pattern)
                    .map_err(|e| ScriptError::eval(format!("invalid pattern: {e}")))?;
                Box::new(move |s: &str| Ok(re.replace_all(s, replacement.as_str()).into_owned()))
            } else {
                Box::new(move |s: &str| Ok(s.replace(&pattern, &replacement)))
            }
        }
        other => {
            return Err(ScriptError::eval(format!(
                "no method str.{other} on a column"
            )));
        }
    };
    args.finish(&format!("str.{name}"))?;

    let mut out = Vec::with_capacity(col.len());
    for v in &col.values {
        ctx.check_deadline()?;
        out.push(match v {
            Scalar::Str(s) => Scalar::Str(transform(s)?),
            _ => Scalar::Null,
        });
    }
    Ok(Value::Series(Column::new(out)))
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}

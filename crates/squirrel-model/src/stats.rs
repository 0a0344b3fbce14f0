//! On-demand per-column statistics for the presentation layer.
//!
//! Computed fresh on every call; the engine never caches these.

use serde::Serialize;

use crate::scalar::Scalar;
use crate::table::Column;

/// Summary statistics for one column.
#[derive(Debug, Clone, Serialize)]
pub struct ColumnStats {
    /// Dominant non-null scalar kind, or "empty".
    pub dtype: String,
    pub len: usize,
    pub null_count: usize,
    pub numeric: Option<NumericStats>,
    pub text: Option<TextStats>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NumericStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// Sample standard deviation (n - 1 denominator); 0 for a single value.
    pub std: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TextStats {
    pub min_len: usize,
    pub max_len: usize,
    pub mean_len: f64,
    pub empty_count: usize,
}

/// Compute statistics for a column: numeric stats when it holds numbers,
/// length stats when it holds strings, both absent otherwise.
pub fn column_stats(column: &Column) -> ColumnStats {
    let dtype = dominant_kind(column);
    let numeric = numeric_stats(column);
    let text = text_stats(column);
    ColumnStats {
        dtype,
        len: column.len(),
        null_count: column.null_count(),
        numeric,
        text,
    }
}

fn dominant_kind(column: &Column) -> String {
    let mut counts: Vec<(&'static str, usize)> = Vec::new();
    for value in &column.values {
        if value.is_null() {
            continue;
        }
        let kind = value.kind_name();
        match counts.iter_mut().find(|(k, _)| *k == kind) {
            Some((_, n)) => *n += 1,
            None => counts.push((kind, 1)),
        }
    }
    counts
        .into_iter()
        .max_by_key(|(_, n)| *n)
        .map_or_else(|| "empty".to_string(), |(k, _)| k.to_string())
}

fn numeric_stats(column: &Column) -> Option<NumericStats> {
    let mut values = column.numeric_values();
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let n = values.len();
    let mean = values.iter().sum::<f64>() / n as f64;
    let std = if n > 1 {
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
        var.sqrt()
    } else {
        0.0
    };
    Some(NumericStats {
        min: values[0],
        max: values[n - 1],
        mean,
        std,
        q25: quantile(&values, 0.25),
        median: quantile(&values, 0.5),
        q75: quantile(&values, 0.75),
    })
}

fn text_stats(column: &Column) -> Option<TextStats> {
    let lengths: Vec<usize> = column
        .values
        .iter()
        .filter_map(|v| match v {
            Scalar::Str(s) => Some(s.chars().count()),
            _ => None,
        })
        .collect();
    if lengths.is_empty() {
        return None;
    }
    let empty_count = lengths.iter().filter(|&&len| len == 0).count();
    Some(TextStats {
        min_len: *lengths.iter().min().unwrap_or(&0),
        max_len: *lengths.iter().max().unwrap_or(&0),
        mean_len: lengths.iter().sum::<usize>() as f64 / lengths.len() as f64,
        empty_count,
    })
}

/// Linear-interpolated quantile over an already sorted slice.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.len() == 1 {
        return sorted[0];
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

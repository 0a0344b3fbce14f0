//! The built-in action kinds.
//!
//! Each definition pairs parameter declarations with a label function (the
//! trailer text) and a statement generator. Free-form fields (column
//! values, filter domains, custom code) go through the addressing resolver
//! unless the action is marked raw.

use crate::addressing::{quote, resolve};
use crate::catalog::KindDef;
use crate::error::{ActionError, Result};
use crate::params::{ParamSpec, Params};

const VALUE_TYPES: &[&str] = &["sq_expr", "raw"];

pub(crate) static KINDS: &[KindDef] = &[
    KindDef {
        name: "CreateTable",
        params: &[
            ParamSpec::required("table_name", "Table name"),
            ParamSpec::select("source_type", "Source type", &["data_source", "other_table"]),
            ParamSpec::optional("source_path", "Data source path"),
            ParamSpec::optional("source_table", "Source table"),
        ],
        describe: |p| {
            let from = p
                .get("source_path")
                .or_else(|| p.get("source_table"))
                .unwrap_or("?");
            format!("Create table {} from {}", p.display("table_name"), from)
        },
        generate: |p| {
            let table = quote(p.require("table_name")?);
            match p.require("source_type")? {
                "data_source" => {
                    let path = quote(p.require("source_path")?);
                    Ok(format!("tables[{table}] = load_table({path})"))
                }
                _ => {
                    let source = quote(p.require("source_table")?);
                    Ok(format!("tables[{table}] = tables[{source}]"))
                }
            }
        },
    },
    KindDef {
        name: "AddColumn",
        params: &[
            ParamSpec::required("table_name", "Table name"),
            ParamSpec::required("col_name", "Column name"),
            ParamSpec::required("col_value", "Column value"),
            ParamSpec::select("value_type", "Value type", VALUE_TYPES).with_default("sq_expr"),
        ],
        describe: |p| {
            format!(
                "Add column {} on table {}",
                p.display("col_name"),
                p.display("table_name")
            )
        },
        generate: |p| {
            let table = p.require("table_name")?;
            let value = resolve(
                p.require("col_value")?,
                Some(table),
                p.get("value_type") != Some("raw"),
            )?;
            Ok(format!(
                "tables[{}][{}] = {value}",
                quote(table),
                quote(p.require("col_name")?)
            ))
        },
    },
    KindDef {
        name: "AddRow",
        params: &[
            ParamSpec::required("table_name", "Table name"),
            ParamSpec::required("new_rows", "New rows"),
        ],
        describe: |p| format!("Add rows in table {}", p.display("table_name")),
        generate: |p| {
            let table = quote(p.require("table_name")?);
            let rows = p.require("new_rows")?;
            Ok(format!(
                "tables[{table}] = concat([tables[{table}], from_rows({rows})])"
            ))
        },
    },
    KindDef {
        name: "DeleteRow",
        params: &[
            ParamSpec::required("table_name", "Table name"),
            ParamSpec::required("domain", "Domain"),
        ],
        describe: |p| {
            format!(
                "Delete rows where {} in table {}",
                p.display("domain"),
                p.display("table_name")
            )
        },
        generate: |p| {
            let table = p.require("table_name")?;
            let domain = resolve(p.require("domain")?, Some(table), true)?;
            let table = quote(table);
            Ok(format!(
                "tables[{table}] = tables[{table}].filter(!({domain}))"
            ))
        },
    },
    KindDef {
        name: "KeepRow",
        params: &[
            ParamSpec::required("table_name", "Table name"),
            ParamSpec::required("domain", "Domain"),
        ],
        describe: |p| {
            format!(
                "Keep rows where {} in table {}",
                p.display("domain"),
                p.display("table_name")
            )
        },
        generate: |p| {
            let table = p.require("table_name")?;
            let domain = resolve(p.require("domain")?, Some(table), true)?;
            let table = quote(table);
            Ok(format!("tables[{table}] = tables[{table}].filter({domain})"))
        },
    },
    KindDef {
        name: "DropColumn",
        params: &[
            ParamSpec::required("table_name", "Table name"),
            ParamSpec::required("col_name", "Column name"),
        ],
        describe: |p| {
            format!(
                "Delete column {} on table {}",
                p.display("col_name"),
                p.display("table_name")
            )
        },
        generate: |p| {
            let table = quote(p.require("table_name")?);
            let col = quote(p.require("col_name")?);
            Ok(format!(
                "tables[{table}] = tables[{table}].drop(columns=[{col}])"
            ))
        },
    },
    KindDef {
        name: "RenameColumn",
        params: &[
            ParamSpec::required("table_name", "Table name"),
            ParamSpec::required("col_name", "Column name"),
            ParamSpec::required("new_col_name", "New column name"),
        ],
        describe: |p| {
            format!(
                "Rename column {} to {} in table {}",
                p.display("col_name"),
                p.display("new_col_name"),
                p.display("table_name")
            )
        },
        generate: |p| {
            let table = quote(p.require("table_name")?);
            let old = quote(p.require("col_name")?);
            let new = quote(p.require("new_col_name")?);
            Ok(format!(
                "tables[{table}] = tables[{table}].rename(columns={{{old}: {new}}})"
            ))
        },
    },
    KindDef {
        name: "ChangeType",
        params: &[
            ParamSpec::required("table_name", "Table name"),
            ParamSpec::required("col_name", "Column name"),
            ParamSpec::select(
                "new_type",
                "New type",
                &["int", "float", "string", "bool", "datetime"],
            ),
        ],
        describe: |p| {
            format!(
                "Change type of column {} to {} in table {}",
                p.display("col_name"),
                p.display("new_type"),
                p.display("table_name")
            )
        },
        generate: |p| {
            let table = quote(p.require("table_name")?);
            let col = quote(p.require("col_name")?);
            let new_type = p.require("new_type")?;
            if new_type == "datetime" {
                Ok(format!(
                    "tables[{table}][{col}] = to_datetime(tables[{table}][{col}])"
                ))
            } else {
                Ok(format!(
                    "tables[{table}][{col}] = tables[{table}][{col}].astype('{new_type}')"
                ))
            }
        },
    },
    KindDef {
        name: "SortColumn",
        params: &[
            ParamSpec::required("table_name", "Table name"),
            ParamSpec::required("col_name", "Column name"),
            ParamSpec::select(
                "sort_order",
                "Sort order",
                &["ascending", "descending", "custom"],
            ),
            ParamSpec::optional("sort_key", "Sort key"),
        ],
        describe: |p| {
            let col = p.display("col_name");
            let table = p.display("table_name");
            match p.get("sort_order") {
                Some("ascending") => format!("Sort(asc) {col} of table {table}"),
                Some("descending") => format!("Sort(desc) {col} of table {table}"),
                _ => format!("Sort {col} of table {table} with custom key"),
            }
        },
        generate: |p| {
            let table = quote(p.require("table_name")?);
            let col = quote(p.require("col_name")?);
            let tail = match p.require("sort_order")? {
                "ascending" => "ascending=True".to_string(),
                "descending" => "ascending=False".to_string(),
                _ => format!("key=lambda x: {}", p.require("sort_key")?),
            };
            Ok(format!(
                "tables[{table}] = tables[{table}].sort_values(by=[{col}], {tail})"
            ))
        },
    },
    KindDef {
        name: "GroupBy",
        params: &[
            ParamSpec::required("table_name", "Table name"),
            ParamSpec::required("groupby", "Group by"),
            ParamSpec::required("agg", "Aggregation"),
        ],
        describe: |p| {
            format!(
                "Group by {} in table {}",
                p.display("groupby"),
                p.display("table_name")
            )
        },
        generate: |p| {
            let table = quote(p.require("table_name")?);
            // A leading bracket means the user already wrote a literal.
            let groupby = p.require("groupby")?;
            let groupby = if groupby.starts_with('[') {
                groupby.to_string()
            } else {
                quote(groupby)
            };
            let agg = p.require("agg")?;
            let agg = if agg.starts_with('{') {
                agg.to_string()
            } else {
                quote(agg)
            };
            Ok(format!(
                "tables[{table}] = tables[{table}].groupby({groupby}).agg({agg})"
            ))
        },
    },
    KindDef {
        name: "MergeTables",
        params: &[
            ParamSpec::required("table_name", "Table name"),
            ParamSpec::required("table2", "Table to merge"),
            ParamSpec::required("on", "On column"),
            ParamSpec::select("how", "How", &["inner", "outer", "left", "right"])
                .with_default("inner"),
        ],
        describe: |p| {
            format!(
                "Merge table {} with {}",
                p.display("table_name"),
                p.display("table2")
            )
        },
        generate: |p| {
            let table = quote(p.require("table_name")?);
            let other = quote(p.require("table2")?);
            let on = quote(p.require("on")?);
            let how = p.require("how")?;
            Ok(format!(
                "tables[{table}] = merge(tables[{table}], tables[{other}], on={on}, how='{how}')"
            ))
        },
    },
    KindDef {
        name: "ConcatenateTables",
        params: &[
            ParamSpec::required("table_name", "Table name"),
            ParamSpec::required("table2", "Table to concatenate"),
        ],
        describe: |p| {
            format!(
                "Concatenate table {} with {}",
                p.display("table_name"),
                p.display("table2")
            )
        },
        generate: |p| {
            let table = quote(p.require("table_name")?);
            let other = quote(p.require("table2")?);
            Ok(format!(
                "tables[{table}] = concat([tables[{table}], tables[{other}]])"
            ))
        },
    },
    KindDef {
        name: "NLargest",
        params: &[
            ParamSpec::required("table_name", "Table name"),
            ParamSpec::required("col_name", "Column name"),
            ParamSpec::required("n", "N"),
            ParamSpec::select("keep", "Keep", &["first", "last", "all"]).with_default("first"),
        ],
        describe: |p| {
            format!(
                "Get {} largest values in column {} of table {}",
                p.display("n"),
                p.display("col_name"),
                p.display("table_name")
            )
        },
        generate: |p| top_n_statement(p, "nlargest"),
    },
    KindDef {
        name: "NSmallest",
        params: &[
            ParamSpec::required("table_name", "Table name"),
            ParamSpec::required("col_name", "Column name"),
            ParamSpec::required("n", "N"),
            ParamSpec::select("keep", "Keep", &["first", "last", "all"]).with_default("first"),
        ],
        describe: |p| {
            format!(
                "Get {} smallest values in column {} of table {}",
                p.display("n"),
                p.display("col_name"),
                p.display("table_name")
            )
        },
        generate: |p| top_n_statement(p, "nsmallest"),
    },
    KindDef {
        name: "NormalizeColumn",
        params: &[
            ParamSpec::required("table_name", "Table name"),
            ParamSpec::required("col_name", "Column name"),
            ParamSpec::select("method", "Method", &["min_max", "z_score"]),
        ],
        describe: |p| {
            let method = match p.get("method") {
                Some("z_score") => "Z Score",
                _ => "Min-Max",
            };
            format!(
                "Normalize column {} in table {} with {method}",
                p.display("col_name"),
                p.display("table_name")
            )
        },
        generate: |p| {
            let cell = cell_ref(p)?;
            match p.require("method")? {
                "min_max" => Ok(format!(
                    "{cell} = ({cell} - {cell}.min()) / ({cell}.max() - {cell}.min())"
                )),
                _ => Ok(format!("{cell} = ({cell} - {cell}.mean()) / {cell}.std()")),
            }
        },
    },
    KindDef {
        name: "HandleMissingValues",
        params: &[
            ParamSpec::required("table_name", "Table name"),
            ParamSpec::required("col_name", "Column name"),
            ParamSpec::select("action", "Action", &["delete", "replace", "interpolate"]),
            ParamSpec::optional("replace_value", "Replace value"),
        ],
        describe: |p| {
            let col = p.display("col_name");
            let table = p.display("table_name");
            match p.get("action") {
                Some("replace") => format!(
                    "Replace missing values with {} in column {col} of table {table}",
                    p.display("replace_value")
                ),
                Some("interpolate") => {
                    format!("Interpolate missing values in column {col} of table {table}")
                }
                _ => format!("Delete rows with missing values in column {col} of table {table}"),
            }
        },
        generate: |p| {
            let table = quote(p.require("table_name")?);
            let col = quote(p.require("col_name")?);
            let cell = cell_ref(p)?;
            match p.require("action")? {
                "delete" => Ok(format!(
                    "tables[{table}] = tables[{table}].dropna(subset=[{col}])"
                )),
                "replace" => {
                    let value = p.require("replace_value")?;
                    Ok(format!("{cell} = {cell}.fillna({value})"))
                }
                _ => Ok(format!("{cell} = {cell}.interpolate()")),
            }
        },
    },
    KindDef {
        name: "ReplaceInCell",
        params: &[
            ParamSpec::required("table_name", "Table name"),
            ParamSpec::required("col_name", "Column name"),
            ParamSpec::select("action", "Action", &["whitespace", "regex"]),
            ParamSpec::optional("pattern", "Pattern"),
            ParamSpec::optional("replacement", "Replacement"),
        ],
        describe: |p| {
            format!(
                "Replace values in cell in column {} of table {}",
                p.display("col_name"),
                p.display("table_name")
            )
        },
        generate: |p| {
            let cell = cell_ref(p)?;
            let pattern = match p.require("action")? {
                "whitespace" => quote("\\s+"),
                _ => quote(p.require("pattern")?),
            };
            let replacement = quote(p.get("replacement").unwrap_or(""));
            Ok(format!(
                "{cell} = {cell}.str.replace({pattern}, {replacement}, regex=True)"
            ))
        },
    },
    KindDef {
        name: "FormatString",
        params: &[
            ParamSpec::required("table_name", "Table name"),
            ParamSpec::required("col_name", "Column name"),
            ParamSpec::select(
                "operation",
                "Operation",
                &["upper", "lower", "title", "capitalize", "strip", "lstrip", "rstrip"],
            ),
        ],
        describe: |p| {
            format!(
                "Format string({}) in column {} of table {}",
                p.display("operation"),
                p.display("col_name"),
                p.display("table_name")
            )
        },
        generate: |p| {
            let cell = cell_ref(p)?;
            let operation = p.require("operation")?;
            Ok(format!("{cell} = {cell}.str.{operation}()"))
        },
    },
    KindDef {
        name: "MathOperations",
        params: &[
            ParamSpec::required("table_name", "Table name"),
            ParamSpec::required("col_name", "Column name"),
            ParamSpec::select("operation", "Operation", &["log", "sqrt", "abs", "round"]),
            ParamSpec::optional("decimals", "Decimals"),
        ],
        describe: |p| {
            format!(
                "Apply {} operation to column {} of table {}",
                p.display("operation"),
                p.display("col_name"),
                p.display("table_name")
            )
        },
        generate: |p| {
            let cell = cell_ref(p)?;
            match p.require("operation")? {
                "round" => {
                    let decimals = match p.get("decimals") {
                        Some(_) => p.require_number("decimals")?,
                        None => "0",
                    };
                    Ok(format!("{cell} = {cell}.round({decimals})"))
                }
                op => Ok(format!("{cell} = {cell}.{op}()")),
            }
        },
    },
    KindDef {
        name: "ColDiff",
        params: &[
            ParamSpec::required("table_name", "Table name"),
            ParamSpec::required("col_name", "Column name"),
            ParamSpec::optional("periods", "Periods").with_default("1"),
        ],
        describe: |p| {
            format!(
                "Calculate difference of column {} of table {}",
                p.display("col_name"),
                p.display("table_name")
            )
        },
        generate: |p| {
            let table = quote(p.require("table_name")?);
            let col_name = p.require("col_name")?;
            let target = quote(&format!("{col_name}-diff"));
            let col = quote(col_name);
            let periods = p.require_number("periods")?;
            Ok(format!(
                "tables[{table}][{target}] = tables[{table}][{col}].diff(periods={periods})"
            ))
        },
    },
    KindDef {
        name: "CutValues",
        params: &[
            ParamSpec::required("table_name", "Table name"),
            ParamSpec::required("col_name", "Column name"),
            ParamSpec::required("cut_values", "Cut values"),
            ParamSpec::required("cut_labels", "Cut labels"),
        ],
        describe: |p| {
            format!(
                "Cut values in column {} of table {}",
                p.display("col_name"),
                p.display("table_name")
            )
        },
        generate: |p| {
            let cell = cell_ref(p)?;
            let bins = p
                .require("cut_values")?
                .split(',')
                .map(|v| {
                    let v = v.trim();
                    v.parse::<f64>().map(|_| v).map_err(|_| {
                        ActionError::generate(format!("cut_values must be numbers, got {v:?}"))
                    })
                })
                .collect::<Result<Vec<_>>>()?
                .join(", ");
            let labels = p
                .require("cut_labels")?
                .split(',')
                .map(|l| quote(l.trim()))
                .collect::<Vec<_>>()
                .join(", ");
            Ok(format!(
                "{cell} = cut({cell}, bins=[{bins}], labels=[{labels}])"
            ))
        },
    },
    KindDef {
        name: "ReplaceVals",
        params: &[
            ParamSpec::required("table_name", "Table name"),
            ParamSpec::required("col_name", "Column name"),
            ParamSpec::required("replace_vals", "Replace values"),
        ],
        describe: |p| {
            format!(
                "Replace values in column {} of table {}",
                p.display("col_name"),
                p.display("table_name")
            )
        },
        generate: |p| {
            let cell = cell_ref(p)?;
            let mapping = p.require("replace_vals")?;
            if !mapping.starts_with('{') {
                return Err(ActionError::generate(
                    "replace_vals must be a dict literal, e.g. {'old': 'new'}",
                ));
            }
            Ok(format!("{cell} = {cell}.replace({mapping})"))
        },
    },
    KindDef {
        name: "RemoveUnderOver",
        params: &[
            ParamSpec::required("table_name", "Table name"),
            ParamSpec::required("col_name", "Column name"),
            ParamSpec::required("lower_bound", "Lower bound"),
            ParamSpec::required("upper_bound", "Upper bound"),
        ],
        describe: |p| {
            format!(
                "Remove vals out of [{}, {}] in column {} of table {}",
                p.display("lower_bound"),
                p.display("upper_bound"),
                p.display("col_name"),
                p.display("table_name")
            )
        },
        generate: |p| {
            let table = quote(p.require("table_name")?);
            let cell = cell_ref(p)?;
            let lo = p.require_number("lower_bound")?;
            let hi = p.require_number("upper_bound")?;
            Ok(format!(
                "tables[{table}] = tables[{table}].filter(({cell} >= {lo}) & ({cell} <= {hi}))"
            ))
        },
    },
    KindDef {
        name: "CustomAction",
        params: &[
            ParamSpec::required("custom_name", "Action name"),
            ParamSpec::required("code", "Code"),
            ParamSpec::select("code_type", "Code type", VALUE_TYPES).with_default("sq_expr"),
            ParamSpec::optional("table_name", "Active table"),
        ],
        describe: |p| format!("Custom action '{}'", p.display("custom_name")),
        generate: |p| {
            resolve(
                p.require("code")?,
                p.get("table_name"),
                p.get("code_type") != Some("raw"),
            )
        },
    },
];

/// `tables['T']['C']`, the most common generated fragment.
fn cell_ref(p: &Params) -> Result<String> {
    Ok(format!(
        "tables[{}][{}]",
        quote(p.require("table_name")?),
        quote(p.require("col_name")?)
    ))
}

fn top_n_statement(p: &Params, method: &str) -> Result<String> {
    let table = quote(p.require("table_name")?);
    let col = quote(p.require("col_name")?);
    let n = p.require("n")?.trim();
    n.parse::<usize>()
        .map_err(|_| ActionError::generate(format!("n must be a non-negative integer, got {n:?}")))?;
    let keep = p.require("keep")?;
    Ok(format!(
        "tables[{table}] = tables[{table}].{method}({n}, {col}, keep='{keep}')"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;

    fn r#gen(kind: &str, pairs: &[(&str, &str)]) -> String {
        let params = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Catalog::builtin()
            .instantiate(kind, params)
            .unwrap()
            .generate()
            .unwrap()
    }

    #[test]
    fn test_create_table_from_source() {
        let code = r#gen(
            "CreateTable",
            &[
                ("table_name", "people"),
                ("source_type", "data_source"),
                ("source_path", "sources/people"),
            ],
        );
        assert_eq!(code, "tables['people'] = load_table('sources/people')");
    }

    #[test]
    fn test_add_column_resolves_addressing() {
        let code = r#gen(
            "AddColumn",
            &[
                ("table_name", "t"),
                ("col_name", "double"),
                ("col_value", "c['x'] * 2"),
            ],
        );
        assert_eq!(code, "tables['t']['double'] = tables['t']['x'] * 2");
    }

    #[test]
    fn test_keep_row_wraps_domain() {
        let code = r#gen(
            "KeepRow",
            &[("table_name", "t"), ("domain", "c['age'] > 30")],
        );
        assert_eq!(
            code,
            "tables['t'] = tables['t'].filter(tables['t']['age'] > 30)"
        );
    }

    #[test]
    fn test_delete_row_negates_domain() {
        let code = r#gen(
            "DeleteRow",
            &[("table_name", "t"), ("domain", "c['age'] > 30")],
        );
        assert_eq!(
            code,
            "tables['t'] = tables['t'].filter(!(tables['t']['age'] > 30))"
        );
    }

    #[test]
    fn test_change_type_datetime_path() {
        let code = r#gen(
            "ChangeType",
            &[
                ("table_name", "t"),
                ("col_name", "d"),
                ("new_type", "datetime"),
            ],
        );
        assert_eq!(code, "tables['t']['d'] = to_datetime(tables['t']['d'])");
    }

    #[test]
    fn test_sort_custom_key() {
        let code = r#gen(
            "SortColumn",
            &[
                ("table_name", "t"),
                ("col_name", "v"),
                ("sort_order", "custom"),
                ("sort_key", "-x"),
            ],
        );
        assert_eq!(
            code,
            "tables['t'] = tables['t'].sort_values(by=['v'], key=lambda x: -x)"
        );
    }

    #[test]
    fn test_groupby_literal_passthrough() {
        let code = r#gen(
            "GroupBy",
            &[
                ("table_name", "t"),
                ("groupby", "['a', 'b']"),
                ("agg", "{'v': 'sum'}"),
            ],
        );
        assert_eq!(
            code,
            "tables['t'] = tables['t'].groupby(['a', 'b']).agg({'v': 'sum'})"
        );
    }

    #[test]
    fn test_groupby_bare_names_are_quoted() {
        let code = r#gen(
            "GroupBy",
            &[("table_name", "t"), ("groupby", "g"), ("agg", "mean")],
        );
        assert_eq!(code, "tables['t'] = tables['t'].groupby('g').agg('mean')");
    }

    #[test]
    fn test_nlargest() {
        let code = r#gen(
            "NLargest",
            &[
                ("table_name", "t"),
                ("col_name", "v"),
                ("n", "3"),
                ("keep", "all"),
            ],
        );
        assert_eq!(code, "tables['t'] = tables['t'].nlargest(3, 'v', keep='all')");
    }

    #[test]
    fn test_normalize_min_max() {
        let code = r#gen(
            "NormalizeColumn",
            &[
                ("table_name", "t"),
                ("col_name", "v"),
                ("method", "min_max"),
            ],
        );
        assert_eq!(
            code,
            "tables['t']['v'] = (tables['t']['v'] - tables['t']['v'].min()) \
             / (tables['t']['v'].max() - tables['t']['v'].min())"
        );
    }

    #[test]
    fn test_replace_in_cell_whitespace() {
        let code = r#gen(
            "ReplaceInCell",
            &[
                ("table_name", "t"),
                ("col_name", "v"),
                ("action", "whitespace"),
                ("replacement", "_"),
            ],
        );
        assert_eq!(
            code,
            "tables['t']['v'] = tables['t']['v'].str.replace('\\s+', '_', regex=True)"
        );
    }

    #[test]
    fn test_col_diff_writes_suffixed_column() {
        let code = r#gen(
            "ColDiff",
            &[("table_name", "t"), ("col_name", "v"), ("periods", "2")],
        );
        assert_eq!(
            code,
            "tables['t']['v-diff'] = tables['t']['v'].diff(periods=2)"
        );
    }

    #[test]
    fn test_cut_values() {
        let code = r#gen(
            "CutValues",
            &[
                ("table_name", "t"),
                ("col_name", "v"),
                ("cut_values", "0, 10, 20"),
                ("cut_labels", "low,high"),
            ],
        );
        assert_eq!(
            code,
            "tables['t']['v'] = cut(tables['t']['v'], bins=[0, 10, 20], labels=['low', 'high'])"
        );
    }

    #[test]
    fn test_missing_conditional_field_names_it() {
        let params = Params::new()
            .with("table_name", "t")
            .with("col_name", "v")
            .with("action", "replace");
        let err = Catalog::builtin()
            .instantiate("HandleMissingValues", params)
            .unwrap()
            .generate()
            .unwrap_err();
        assert!(matches!(err, ActionError::MissingField(f) if f == "replace_value"));
    }

    #[test]
    fn test_quoting_of_awkward_names() {
        let code = r#gen(
            "DropColumn",
            &[("table_name", "it's"), ("col_name", "a b")],
        );
        assert_eq!(
            code,
            "tables['it\\'s'] = tables['it\\'s'].drop(columns=['a b'])"
        );
    }
}

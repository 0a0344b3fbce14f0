//! Statement evaluation against a mutable table environment.
//!
//! The evaluator is a straight-line fold: no loops, no user definitions, no
//! host escape. Every capability it exposes is enumerated in `funcs`,
//! `table_ops` and `series_ops`.

use std::time::Instant;

use squirrel_model::{Column, Scalar, Table, TableEnv};

use crate::ast::{Args, BinOp, Expr, Lit, Stmt, UnOp};
use crate::error::{Result, ScriptError};
use crate::parser::parse_program;
use crate::value::Value;
use crate::{funcs, series_ops, table_ops};

/// Resolves `load_table(..)` paths into tables. Implemented by the ingest
/// layer; the evaluator itself never touches the filesystem.
pub trait TableLoader {
    fn load_table(&self, path: &str) -> Result<Table>;
}

/// Evaluation context: the table environment plus optional collaborators.
pub struct Context<'a> {
    pub env: &'a mut TableEnv,
    loader: Option<&'a dyn TableLoader>,
    deadline: Option<Instant>,
    tick: u32,
}

impl<'a> Context<'a> {
    pub fn new(env: &'a mut TableEnv) -> Self {
        Self {
            env,
            loader: None,
            deadline: None,
            tick: 0,
        }
    }

    #[must_use]
    pub fn with_loader(mut self, loader: &'a dyn TableLoader) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Abort evaluation once this instant passes. Checked at statement
    /// boundaries and periodically inside element-wise loops.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn load(&self, path: &str) -> Result<Table> {
        match self.loader {
            Some(loader) => loader.load_table(path),
            None => Err(ScriptError::eval("no table loader configured")),
        }
    }

    /// Cheap periodic deadline check for hot loops.
    pub fn check_deadline(&mut self) -> Result<()> {
        self.tick = self.tick.wrapping_add(1);
        if self.tick % 1024 != 0 {
            return Ok(());
        }
        self.check_deadline_now()
    }

    pub fn check_deadline_now(&self) -> Result<()> {
        if let Some(deadline) = self.deadline {
            if Instant::now() > deadline {
                return Err(ScriptError::DeadlineExceeded);
            }
        }
        Ok(())
    }
}

/// Evaluated call arguments with take-style accessors. Every method must
/// drain what it understands and call [`CallArgs::finish`], so an
/// unrecognized argument is an error rather than silently ignored.
pub struct CallArgs {
    positional: std::collections::VecDeque<Value>,
    keywords: Vec<(String, Value)>,
}

impl CallArgs {
    pub fn next_pos(&mut self, what: &str) -> Result<Value> {
        self.positional
            .pop_front()
            .ok_or_else(|| ScriptError::eval(format!("missing argument: {what}")))
    }

    pub fn opt_pos(&mut self) -> Option<Value> {
        self.positional.pop_front()
    }

    /// Remove and return a keyword argument.
    pub fn kw(&mut self, name: &str) -> Option<Value> {
        let idx = self.keywords.iter().position(|(k, _)| k == name)?;
        Some(self.keywords.remove(idx).1)
    }

    /// Positional first, keyword as fallback.
    pub fn pos_or_kw(&mut self, name: &str) -> Result<Value> {
        if let Some(value) = self.positional.pop_front() {
            return Ok(value);
        }
        self.kw(name)
            .ok_or_else(|| ScriptError::eval(format!("missing argument: {name}")))
    }

    pub fn finish(self, method: &str) -> Result<()> {
        if let Some(value) = self.positional.front() {
            return Err(ScriptError::eval(format!(
                "{method}: unexpected extra argument of type {}",
                value.type_name()
            )));
        }
        if let Some((name, _)) = self.keywords.first() {
            return Err(ScriptError::eval(format!(
                "{method}: unknown argument: {name}"
            )));
        }
        Ok(())
    }
}

/// Parse and execute a full source string.
pub fn execute(source: &str, ctx: &mut Context<'_>) -> Result<()> {
    let stmts = parse_program(source)?;
    execute_program(&stmts, ctx)
}

/// Execute already-parsed statements in order.
pub fn execute_program(stmts: &[Stmt], ctx: &mut Context<'_>) -> Result<()> {
    for stmt in stmts {
        ctx.check_deadline_now()?;
        exec_stmt(stmt, ctx)?;
    }
    Ok(())
}

fn exec_stmt(stmt: &Stmt, ctx: &mut Context<'_>) -> Result<()> {
    match stmt {
        Stmt::Assign { target, value } => {
            let value = eval_expr(value, ctx, &[])?;
            assign(target, value, ctx)
        }
        Stmt::Expr(expr) => {
            eval_expr(expr, ctx, &[])?;
            Ok(())
        }
    }
}

fn assign(target: &Expr, value: Value, ctx: &mut Context<'_>) -> Result<()> {
    let Expr::Index { recv, index } = target else {
        return Err(ScriptError::eval(
            "assignment target must be tables[..] or tables[..][..]",
        ));
    };
    match recv.as_ref() {
        // tables['T'] = <table>
        Expr::Ident(name) if name == "tables" => {
            let table_name = eval_expr(index, ctx, &[])?.as_str()?.to_string();
            let table = value.into_table()?;
            tracing::debug!(table = %table_name, rows = table.n_rows(), "assign table");
            ctx.env.insert(table_name, table);
            Ok(())
        }
        // tables['T']['C'] = <scalar | series | list>
        Expr::Index {
            recv: env_expr,
            index: table_index,
        } if matches!(env_expr.as_ref(), Expr::Ident(name) if name == "tables") => {
            let table_name = eval_expr(table_index, ctx, &[])?.as_str()?.to_string();
            let col_name = eval_expr(index, ctx, &[])?.as_str()?.to_string();
            let table = ctx
                .env
                .get_mut(&table_name)
                .ok_or_else(|| ScriptError::UnknownTable(table_name.clone()))?;
            let column = match value {
                Value::Series(col) => col,
                Value::Scalar(s) => Column::new(vec![s; table.n_rows()]),
                Value::List(items) => items
                    .into_iter()
                    .map(Value::into_scalar)
                    .collect::<Result<Column>>()?,
                other => {
                    return Err(ScriptError::eval(format!(
                        "cannot assign {} to a column",
                        other.type_name()
                    )));
                }
            };
            table.set_column(&col_name, column)?;
            Ok(())
        }
        _ => Err(ScriptError::eval(
            "assignment target must be tables[..] or tables[..][..]",
        )),
    }
}

/// Local bindings (only lambda parameters at present).
pub type Locals<'v> = [(String, Value)];

pub fn eval_expr(expr: &Expr, ctx: &mut Context<'_>, locals: &Locals<'_>) -> Result<Value> {
    match expr {
        Expr::Literal(lit) => Ok(match lit {
            Lit::Int(v) => Value::Scalar(Scalar::Int(*v)),
            Lit::Float(v) => Value::Scalar(Scalar::Float(*v)),
            Lit::Str(v) => Value::Scalar(Scalar::Str(v.clone())),
            Lit::Bool(v) => Value::Scalar(Scalar::Bool(*v)),
            Lit::Null => Value::null(),
        }),
        Expr::Ident(name) => {
            if name == "tables" {
                return Ok(Value::Env);
            }
            locals
                .iter()
                .rev()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.clone())
                .ok_or_else(|| ScriptError::eval(format!("unknown name: {name}")))
        }
        Expr::List(items) => items
            .iter()
            .map(|item| eval_expr(item, ctx, locals))
            .collect::<Result<Vec<_>>>()
            .map(Value::List),
        Expr::Dict(entries) => entries
            .iter()
            .map(|(k, v)| Ok((eval_expr(k, ctx, locals)?, eval_expr(v, ctx, locals)?)))
            .collect::<Result<Vec<_>>>()
            .map(Value::Dict),
        Expr::Lambda { param, body } => Ok(Value::Lambda {
            param: param.clone(),
            body: body.clone(),
        }),
        Expr::Unary { op, expr } => {
            let value = eval_expr(expr, ctx, locals)?;
            unary_value(ctx, *op, value)
        }
        Expr::Binary { op, lhs, rhs } => {
            let lhs = eval_expr(lhs, ctx, locals)?;
            let rhs = eval_expr(rhs, ctx, locals)?;
            binary_values(ctx, *op, lhs, rhs)
        }
        Expr::Index { recv, index } => {
            let recv = eval_expr(recv, ctx, locals)?;
            let index = eval_expr(index, ctx, locals)?;
            index_value(ctx, recv, index)
        }
        Expr::Call { name, args } => {
            let args = eval_args(args, ctx, locals)?;
            funcs::call(ctx, name, args)
        }
        Expr::MethodCall { recv, name, args } => {
            let recv = eval_expr(recv, ctx, locals)?;
            let args = eval_args(args, ctx, locals)?;
            match recv {
                Value::Table(table) => table_ops::call(ctx, table, name, args),
                Value::Grouped { table, keys } => table_ops::call_grouped(ctx, table, &keys, name, args),
                Value::Series(col) => series_ops::call(ctx, col, name, args),
                other => Err(ScriptError::eval(format!(
                    "no method {name} on {}",
                    other.type_name()
                ))),
            }
        }
    }
}

fn eval_args(args: &Args, ctx: &mut Context<'_>, locals: &Locals<'_>) -> Result<CallArgs> {
    let positional = args
        .positional
        .iter()
        .map(|a| eval_expr(a, ctx, locals))
        .collect::<Result<std::collections::VecDeque<_>>>()?;
    let keywords = args
        .keywords
        .iter()
        .map(|(name, a)| Ok((name.clone(), eval_expr(a, ctx, locals)?)))
        .collect::<Result<Vec<_>>>()?;
    Ok(CallArgs {
        positional,
        keywords,
    })
}

/// Apply a lambda value to one argument (sort keys).
pub fn apply_lambda(ctx: &mut Context<'_>, lambda: &Value, arg: Value) -> Result<Value> {
    let Value::Lambda { param, body } = lambda else {
        return Err(ScriptError::eval(format!(
            "expected a lambda, got {}",
            lambda.type_name()
        )));
    };
    let locals = [(param.clone(), arg)];
    eval_expr(body, ctx, &locals)
}

fn index_value(ctx: &mut Context<'_>, recv: Value, index: Value) -> Result<Value> {
    match recv {
        Value::Env => {
            let name = index.as_str()?;
            ctx.env
                .get(name)
                .cloned()
                .map(Value::Table)
                .ok_or_else(|| ScriptError::UnknownTable(name.to_string()))
        }
        Value::Table(table) => {
            let name = index.as_str()?;
            Ok(Value::Series(table.column(name)?.clone()))
        }
        Value::List(items) => {
            let idx = index.as_usize()?;
            items
                .get(idx)
                .cloned()
                .ok_or_else(|| ScriptError::eval(format!("list index out of range: {idx}")))
        }
        Value::Dict(entries) => {
            let key = index.into_scalar()?;
            entries
                .into_iter()
                .find(|(k, _)| matches!(k, Value::Scalar(s) if *s == key))
                .map(|(_, v)| v)
                .ok_or_else(|| ScriptError::eval(format!("dict key not found: {key}")))
        }
        other => Err(ScriptError::eval(format!(
            "cannot index into {}",
            other.type_name()
        ))),
    }
}

pub fn unary_value(ctx: &mut Context<'_>, op: UnOp, value: Value) -> Result<Value> {
    match value {
        Value::Series(col) => {
            let mut out = Vec::with_capacity(col.len());
            for v in &col.values {
                ctx.check_deadline()?;
                out.push(scalar_unary(op, v)?);
            }
            Ok(Value::Series(Column::new(out)))
        }
        Value::Scalar(s) => Ok(Value::Scalar(scalar_unary(op, &s)?)),
        other => Err(ScriptError::eval(format!(
            "cannot apply unary operator to {}",
            other.type_name()
        ))),
    }
}

fn scalar_unary(op: UnOp, v: &Scalar) -> Result<Scalar> {
    match op {
        UnOp::Neg => match v {
            Scalar::Int(x) => Ok(Scalar::Int(-x)),
            Scalar::Float(x) => Ok(Scalar::Float(-x)),
            Scalar::Null => Ok(Scalar::Null),
            other => Err(ScriptError::eval(format!(
                "cannot negate {}",
                other.kind_name()
            ))),
        },
        UnOp::Not => match v {
            Scalar::Bool(b) => Ok(Scalar::Bool(!b)),
            // A null predicate cell is false, so its negation holds.
            Scalar::Null => Ok(Scalar::Bool(true)),
            other => Err(ScriptError::eval(format!(
                "cannot apply 'not' to {}",
                other.kind_name()
            ))),
        },
    }
}

pub fn binary_values(ctx: &mut Context<'_>, op: BinOp, lhs: Value, rhs: Value) -> Result<Value> {
    match (lhs, rhs) {
        (Value::Series(a), Value::Series(b)) => {
            if a.len() != b.len() {
                return Err(ScriptError::eval(format!(
                    "column length mismatch in element-wise operation: {} vs {}",
                    a.len(),
                    b.len()
                )));
            }
            let mut out = Vec::with_capacity(a.len());
            for (x, y) in a.values.iter().zip(&b.values) {
                ctx.check_deadline()?;
                out.push(scalar_binary(op, x, y)?);
            }
            Ok(Value::Series(Column::new(out)))
        }
        (Value::Series(a), Value::Scalar(s)) => {
            let mut out = Vec::with_capacity(a.len());
            for x in &a.values {
                ctx.check_deadline()?;
                out.push(scalar_binary(op, x, &s)?);
            }
            Ok(Value::Series(Column::new(out)))
        }
        (Value::Scalar(s), Value::Series(b)) => {
            let mut out = Vec::with_capacity(b.len());
            for y in &b.values {
                ctx.check_deadline()?;
                out.push(scalar_binary(op, &s, y)?);
            }
            Ok(Value::Series(Column::new(out)))
        }
        (Value::Scalar(a), Value::Scalar(b)) => Ok(Value::Scalar(scalar_binary(op, &a, &b)?)),
        (lhs, rhs) => Err(ScriptError::eval(format!(
            "unsupported operand types: {} and {}",
            lhs.type_name(),
            rhs.type_name()
        ))),
    }
}

/// Scalar operator semantics. Nulls propagate through arithmetic; in
/// comparisons a null operand makes `==`, `<`, etc. false and `!=` true,
/// matching predicate behavior over missing cells.
fn scalar_binary(op: BinOp, a: &Scalar, b: &Scalar) -> Result<Scalar> {
    match op {
        BinOp::And | BinOp::Or => {
            let x = scalar_truth(a)?;
            let y = scalar_truth(b)?;
            Ok(Scalar::Bool(if op == BinOp::And { x && y } else { x || y }))
        }
        BinOp::Eq => Ok(Scalar::Bool(!a.is_null() && !b.is_null() && a == b)),
        BinOp::Ne => Ok(Scalar::Bool(a.is_null() || b.is_null() || a != b)),
        BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
            if a.is_null() || b.is_null() {
                return Ok(Scalar::Bool(false));
            }
            let ord = compare_scalars(a, b)?;
            let holds = match op {
                BinOp::Lt => ord.is_lt(),
                BinOp::Le => ord.is_le(),
                BinOp::Gt => ord.is_gt(),
                _ => ord.is_ge(),
            };
            Ok(Scalar::Bool(holds))
        }
        BinOp::Add => {
            if a.is_null() || b.is_null() {
                return Ok(Scalar::Null);
            }
            if let (Scalar::Str(x), Scalar::Str(y)) = (a, b) {
                return Ok(Scalar::Str(format!("{x}{y}")));
            }
            numeric_binary(op, a, b)
        }
        BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Rem => {
            if a.is_null() || b.is_null() {
                return Ok(Scalar::Null);
            }
            numeric_binary(op, a, b)
        }
    }
}

fn scalar_truth(v: &Scalar) -> Result<bool> {
    match v {
        Scalar::Bool(b) => Ok(*b),
        Scalar::Null => Ok(false),
        other => Err(ScriptError::eval(format!(
            "boolean operator applied to {}",
            other.kind_name()
        ))),
    }
}

fn compare_scalars(a: &Scalar, b: &Scalar) -> Result<std::cmp::Ordering> {
    let comparable = matches!(
        (a, b),
        (Scalar::Str(_), Scalar::Str(_))
            | (Scalar::Bool(_), Scalar::Bool(_))
            | (Scalar::DateTime(_), Scalar::DateTime(_))
    ) || (a.as_f64().is_some() && b.as_f64().is_some());
    if !comparable {
        return Err(ScriptError::eval(format!(
            "cannot compare {} with {}",
            a.kind_name(),
            b.kind_name()
        )));
    }
    Ok(a.sort_cmp(b))
}

fn numeric_binary(op: BinOp, a: &Scalar, b: &Scalar) -> Result<Scalar> {
    if let (Scalar::Int(x), Scalar::Int(y)) = (a, b) {
        // Integer arithmetic stays integer but must not wrap or panic;
        // overflow is an evaluation error the replay driver can contain.
        match op {
            BinOp::Add => return checked_int(x.checked_add(*y), "+"),
            BinOp::Sub => return checked_int(x.checked_sub(*y), "-"),
            BinOp::Mul => return checked_int(x.checked_mul(*y), "*"),
            BinOp::Rem => {
                return if *y == 0 {
                    Err(ScriptError::eval("modulo by zero"))
                } else {
                    checked_int(x.checked_rem(*y), "%")
                };
            }
            // Division always widens to float.
            BinOp::Div => {}
            _ => {}
        }
    }
    let (x, y) = match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => (x, y),
        _ => {
            return Err(ScriptError::eval(format!(
                "arithmetic on non-numeric values: {} and {}",
                a.kind_name(),
                b.kind_name()
            )));
        }
    };
    let out = match op {
        BinOp::Add => x + y,
        BinOp::Sub => x - y,
        BinOp::Mul => x * y,
        BinOp::Div => x / y,
        BinOp::Rem => x % y,
        _ => unreachable!("non-arithmetic op in numeric_binary"),
    };
    Ok(Scalar::Float(out))
}

fn checked_int(value: Option<i64>, op: &str) -> Result<Scalar> {
    value
        .map(Scalar::Int)
        .ok_or_else(|| ScriptError::eval(format!("integer overflow in {op}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env_with_table() -> TableEnv {
        let mut table = Table::new();
        table
            .set_column(
                "x",
                Column::new(vec![Scalar::Int(1), Scalar::Int(2), Scalar::Int(3)]),
            )
            .unwrap();
        let mut env = TableEnv::new();
        env.insert("t".to_string(), table);
        env
    }

    fn run(env: &mut TableEnv, src: &str) -> Result<()> {
        let mut ctx = Context::new(env);
        execute(src, &mut ctx)
    }

    #[test]
    fn test_scalar_column_assignment_broadcasts() {
        let mut env = env_with_table();
        run(&mut env, "tables['t']['y'] = 10").unwrap();
        let col = env["t"].column("y").unwrap();
        assert_eq!(col.values, vec![Scalar::Int(10); 3]);
    }

    #[test]
    fn test_elementwise_arithmetic() {
        let mut env = env_with_table();
        run(&mut env, "tables['t']['y'] = tables['t']['x'] * 2 + 1").unwrap();
        let col = env["t"].column("y").unwrap();
        assert_eq!(
            col.values,
            vec![Scalar::Int(3), Scalar::Int(5), Scalar::Int(7)]
        );
    }

    #[test]
    fn test_table_alias_assignment() {
        let mut env = env_with_table();
        run(&mut env, "tables['u'] = tables['t']").unwrap();
        assert_eq!(env["u"], env["t"]);
    }

    #[test]
    fn test_unknown_table_error() {
        let mut env = env_with_table();
        let err = run(&mut env, "tables['u'] = tables['missing']").unwrap_err();
        assert!(matches!(err, ScriptError::UnknownTable(name) if name == "missing"));
    }

    #[test]
    fn test_comparison_with_null_is_false() {
        assert_eq!(
            scalar_binary(BinOp::Lt, &Scalar::Null, &Scalar::Int(1)).unwrap(),
            Scalar::Bool(false)
        );
        assert_eq!(
            scalar_binary(BinOp::Ne, &Scalar::Null, &Scalar::Int(1)).unwrap(),
            Scalar::Bool(true)
        );
    }

    #[test]
    fn test_division_widens_to_float() {
        assert_eq!(
            scalar_binary(BinOp::Div, &Scalar::Int(3), &Scalar::Int(2)).unwrap(),
            Scalar::Float(1.5)
        );
    }

    #[test]
    fn test_integer_overflow_is_an_error() {
        let err = scalar_binary(
            BinOp::Add,
            &Scalar::Int(i64::MAX),
            &Scalar::Int(1),
        )
        .unwrap_err();
        assert!(err.to_string().contains("overflow"));
        assert!(scalar_binary(BinOp::Sub, &Scalar::Int(i64::MIN), &Scalar::Int(1)).is_err());
        assert!(scalar_binary(BinOp::Mul, &Scalar::Int(i64::MAX), &Scalar::Int(2)).is_err());
        assert!(scalar_binary(BinOp::Rem, &Scalar::Int(i64::MIN), &Scalar::Int(-1)).is_err());
    }

    #[test]
    fn test_elementwise_overflow_fails_the_statement() {
        let mut table = Table::new();
        table
            .set_column("x", Column::new(vec![Scalar::Int(i64::MAX)]))
            .unwrap();
        let mut env = TableEnv::new();
        env.insert("t".to_string(), table);
        let err = run(&mut env, "tables['t']['y'] = tables['t']['x'] + 1").unwrap_err();
        assert!(err.to_string().contains("overflow"));
        assert!(!env["t"].has_column("y"));
    }

    #[test]
    fn test_string_concatenation() {
        assert_eq!(
            scalar_binary(BinOp::Add, &"a".into(), &"b".into()).unwrap(),
            Scalar::Str("ab".into())
        );
    }

    #[test]
    fn test_deadline_aborts() {
        let mut env = env_with_table();
        let past = Instant::now() - std::time::Duration::from_secs(1);
        let mut ctx = Context::new(&mut env).with_deadline(past);
        let err = execute("tables['t']['y'] = 1", &mut ctx).unwrap_err();
        assert!(matches!(err, ScriptError::DeadlineExceeded));
    }
}

//! Statement and expression AST.

/// One logical statement: an assignment into the `tables` environment or a
/// bare expression (custom actions may be pure calls).
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Assign { target: Expr, value: Expr },
    Expr(Expr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Lit {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    Null,
}

/// Call arguments: positional expressions followed by `name=expr` keywords.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
    pub positional: Vec<Expr>,
    pub keywords: Vec<(String, Expr)>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Lit),
    Ident(String),
    List(Vec<Expr>),
    Dict(Vec<(Expr, Expr)>),
    Lambda {
        param: String,
        body: Box<Expr>,
    },
    Unary {
        op: UnOp,
        expr: Box<Expr>,
    },
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Index {
        recv: Box<Expr>,
        index: Box<Expr>,
    },
    /// Free function call, e.g. `load_table('path')`.
    Call {
        name: String,
        args: Args,
    },
    /// Method call; the name may be dotted for namespaced methods
    /// (`str.upper`).
    MethodCall {
        recv: Box<Expr>,
        name: String,
        args: Args,
    },
}

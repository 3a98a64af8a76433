//! WHERE-clause expressions.
//!
//! Expressions render to SQL with bound parameters appended to a caller's
//! parameter list, so placeholders stay numbered across a whole statement.

use sqlbase_core::{Dialect, Value, quote_ident};

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `=`
    Eq,
    /// `<>`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `LIKE`
    Like,
    /// `AND`
    And,
    /// `OR`
    Or,
}

impl BinaryOp {
    /// SQL text of the operator.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            BinaryOp::Eq => "=",
            BinaryOp::Ne => "<>",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Like => "LIKE",
            BinaryOp::And => "AND",
            BinaryOp::Or => "OR",
        }
    }
}

/// A boolean or value expression usable in a WHERE clause.
///
/// # Example
///
/// ```ignore
/// let clause = Expr::col("make")
///     .eq("chevy")
///     .and(Expr::col("year").ge(1998));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Column reference.
    Column(String),
    /// Bound value.
    Value(Value),
    /// `left op right`.
    Binary {
        /// Left operand.
        left: Box<Expr>,
        /// Operator.
        op: BinaryOp,
        /// Right operand.
        right: Box<Expr>,
    },
    /// `expr IS [NOT] NULL`.
    IsNull {
        /// Operand.
        expr: Box<Expr>,
        /// `IS NOT NULL` when true.
        negated: bool,
    },
    /// `expr [NOT] IN (...)`.
    In {
        /// Operand.
        expr: Box<Expr>,
        /// Candidate values.
        values: Vec<Value>,
        /// `NOT IN` when true.
        negated: bool,
    },
    /// `NOT expr`.
    Not(Box<Expr>),
    /// Raw SQL, inserted verbatim.
    Raw(String),
}

impl Expr {
    /// Reference a column.
    pub fn col(name: impl Into<String>) -> Self {
        Expr::Column(name.into())
    }

    /// A bound value.
    pub fn value(value: impl Into<Value>) -> Self {
        Expr::Value(value.into())
    }

    /// Raw SQL fragment. Never pass untrusted input.
    pub fn raw(sql: impl Into<String>) -> Self {
        Expr::Raw(sql.into())
    }

    fn binary(self, op: BinaryOp, right: Expr) -> Self {
        Expr::Binary {
            left: Box::new(self),
            op,
            right: Box::new(right),
        }
    }

    /// `self = value`. A NULL value renders as `IS NULL`.
    pub fn eq(self, value: impl Into<Value>) -> Self {
        let value = value.into();
        if value.is_null() {
            return self.is_null();
        }
        self.binary(BinaryOp::Eq, Expr::Value(value))
    }

    /// `self <> value`. A NULL value renders as `IS NOT NULL`.
    pub fn ne(self, value: impl Into<Value>) -> Self {
        let value = value.into();
        if value.is_null() {
            return self.is_not_null();
        }
        self.binary(BinaryOp::Ne, Expr::Value(value))
    }

    /// `self < value`.
    pub fn lt(self, value: impl Into<Value>) -> Self {
        self.binary(BinaryOp::Lt, Expr::value(value))
    }

    /// `self <= value`.
    pub fn le(self, value: impl Into<Value>) -> Self {
        self.binary(BinaryOp::Le, Expr::value(value))
    }

    /// `self > value`.
    pub fn gt(self, value: impl Into<Value>) -> Self {
        self.binary(BinaryOp::Gt, Expr::value(value))
    }

    /// `self >= value`.
    pub fn ge(self, value: impl Into<Value>) -> Self {
        self.binary(BinaryOp::Ge, Expr::value(value))
    }

    /// `self LIKE pattern`.
    pub fn like(self, pattern: impl Into<String>) -> Self {
        self.binary(BinaryOp::Like, Expr::Value(Value::Text(pattern.into())))
    }

    /// `self IS NULL`.
    pub fn is_null(self) -> Self {
        Expr::IsNull {
            expr: Box::new(self),
            negated: false,
        }
    }

    /// `self IS NOT NULL`.
    pub fn is_not_null(self) -> Self {
        Expr::IsNull {
            expr: Box::new(self),
            negated: true,
        }
    }

    /// `self IN (values)`.
    pub fn in_list<I, V>(self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Expr::In {
            expr: Box::new(self),
            values: values.into_iter().map(Into::into).collect(),
            negated: false,
        }
    }

    /// `self NOT IN (values)`.
    pub fn not_in<I, V>(self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Expr::In {
            expr: Box::new(self),
            values: values.into_iter().map(Into::into).collect(),
            negated: true,
        }
    }

    /// `self AND other`.
    pub fn and(self, other: Expr) -> Self {
        self.binary(BinaryOp::And, other)
    }

    /// `self OR other`.
    pub fn or(self, other: Expr) -> Self {
        self.binary(BinaryOp::Or, other)
    }

    /// `NOT expr`.
    pub fn not(expr: Expr) -> Self {
        Expr::Not(Box::new(expr))
    }

    /// AND together all expressions; `None` when there are none.
    pub fn all<I: IntoIterator<Item = Expr>>(exprs: I) -> Option<Expr> {
        exprs.into_iter().reduce(Expr::and)
    }

    /// Equality on every `(column, value)` pair, ANDed together.
    pub fn all_eq<S: AsRef<str>>(criteria: &[(S, Value)]) -> Option<Expr> {
        Expr::all(
            criteria
                .iter()
                .map(|(col, value)| Expr::col(col.as_ref()).eq(value.clone())),
        )
    }

    /// Column names referenced by this expression.
    pub fn columns(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expr::Column(name) => out.push(name),
            Expr::Binary { left, right, .. } => {
                left.collect_columns(out);
                right.collect_columns(out);
            }
            Expr::IsNull { expr, .. } | Expr::In { expr, .. } | Expr::Not(expr) => {
                expr.collect_columns(out);
            }
            Expr::Value(_) | Expr::Raw(_) => {}
        }
    }

    /// Render to SQL, appending bound values to `params`.
    pub fn build(&self, dialect: Dialect, params: &mut Vec<Value>) -> String {
        match self {
            Expr::Column(name) => quote_ident(dialect, name),
            Expr::Value(value) => {
                params.push(value.clone());
                dialect.placeholder(params.len())
            }
            Expr::Binary { left, op, right } => {
                let l = left.build(dialect, params);
                let r = right.build(dialect, params);
                match op {
                    BinaryOp::And | BinaryOp::Or => format!("({l} {} {r})", op.as_sql()),
                    _ => format!("{l} {} {r}", op.as_sql()),
                }
            }
            Expr::IsNull { expr, negated } => {
                let e = expr.build(dialect, params);
                if *negated {
                    format!("{e} IS NOT NULL")
                } else {
                    format!("{e} IS NULL")
                }
            }
            Expr::In {
                expr,
                values,
                negated,
            } => {
                if values.is_empty() {
                    return if *negated { "1 = 1" } else { "1 = 0" }.to_string();
                }
                let e = expr.build(dialect, params);
                let placeholders: Vec<String> = values
                    .iter()
                    .map(|v| {
                        params.push(v.clone());
                        dialect.placeholder(params.len())
                    })
                    .collect();
                let keyword = if *negated { "NOT IN" } else { "IN" };
                format!("{e} {keyword} ({})", placeholders.join(", "))
            }
            Expr::Not(expr) => format!("NOT ({})", expr.build(dialect, params)),
            Expr::Raw(sql) => sql.clone(),
        }
    }
}

use crate::error::Span;
use crate::value::Value;

/// Expression tree
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Literal value (string, number, boolean, null)
    Literal { value: Value, span: Span },

    /// `$name`
    Variable { name: String, span: Span },

    /// `[a, b]`
    Array { items: Vec<Expr>, span: Span },

    /// `{"key": value}`
    Map { entries: Vec<(String, Expr)>, span: Span },

    /// `object.property`
    Member {
        object: Box<Expr>,
        property: String,
        span: Span,
    },

    /// `object[index]`
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
        span: Span,
    },

    /// Builtin function call
    Call {
        function: String,
        arguments: Vec<Expr>,
        span: Span,
    },

    Unary {
        operator: UnaryOp,
        operand: Box<Expr>,
        span: Span,
    },

    Binary {
        left: Box<Expr>,
        operator: BinaryOp,
        right: Box<Expr>,
        span: Span,
    },

    /// `condition ? then : otherwise`
    Conditional {
        condition: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
        span: Span,
    },

    /// `target = value`, `target += value`, `target -= value`
    Assign {
        target: Box<Expr>,
        operator: AssignOp,
        value: Box<Expr>,
        span: Span,
    },

    /// `++target`, `target--`
    Update {
        target: Box<Expr>,
        increment: bool,
        prefix: bool,
        span: Span,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Negate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Equals,
    NotEquals,
    StrictEquals,
    StrictNotEquals,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    And,
    Or,
    Coalesce,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Modulo => "%",
            BinaryOp::Equals => "==",
            BinaryOp::NotEquals => "!=",
            BinaryOp::StrictEquals => "===",
            BinaryOp::StrictNotEquals => "!==",
            BinaryOp::LessThan => "<",
            BinaryOp::LessThanOrEqual => "<=",
            BinaryOp::GreaterThan => ">",
            BinaryOp::GreaterThanOrEqual => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::Coalesce => "??",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Set,
    Add,
    Subtract,
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Literal { span, .. }
            | Expr::Variable { span, .. }
            | Expr::Array { span, .. }
            | Expr::Map { span, .. }
            | Expr::Member { span, .. }
            | Expr::Index { span, .. }
            | Expr::Call { span, .. }
            | Expr::Unary { span, .. }
            | Expr::Binary { span, .. }
            | Expr::Conditional { span, .. }
            | Expr::Assign { span, .. }
            | Expr::Update { span, .. } => span.clone(),
        }
    }

    /// Value of a literal string expression
    pub fn as_str_literal(&self) -> Option<&str> {
        match self {
            Expr::Literal {
                value: Value::String(s),
                ..
            } => Some(s),
            _ => None,
        }
    }

    pub fn is_place(&self) -> bool {
        matches!(
            self,
            Expr::Variable { .. } | Expr::Member { .. } | Expr::Index { .. }
        )
    }
}

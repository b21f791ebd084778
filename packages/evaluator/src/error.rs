use crate::session::StackDepths;
use mortar_common::CommonError;
use mortar_compiler::CompileError;
use std::path::PathBuf;
use thiserror::Error;

pub type Span = std::ops::Range<usize>;

pub type EvalResult<T> = Result<T, EvalError>;

pub type RenderResult<T> = Result<T, RenderError>;

/// Errors raised while parsing or evaluating an expression
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("Syntax error at {span:?}: {message}")]
    SyntaxError { message: String, span: Span },

    #[error("Variable '${name}' not found at {span:?}")]
    VariableNotFound { name: String, span: Span },

    #[error("Member '{name}' not found at {span:?}")]
    MemberNotFound { name: String, span: Span },

    #[error("Unknown function '{name}' at {span:?}")]
    UnknownFunction { name: String, span: Span },

    #[error("Division by zero at {span:?}")]
    DivisionByZero { span: Span },

    #[error("Invalid operands for operator {operator} at {span:?}: {details}")]
    InvalidOperands {
        operator: String,
        details: String,
        span: Span,
    },

    #[error("Type error at {span:?}: {message}")]
    TypeError { message: String, span: Span },

    #[error("Invalid assignment target at {span:?}")]
    InvalidAssignment { span: Span },
}

impl EvalError {
    /// Lookup failures that `??` and `default()` turn into null
    pub fn is_undefined(&self) -> bool {
        matches!(
            self,
            EvalError::VariableNotFound { .. } | EvalError::MemberNotFound { .. }
        )
    }

    pub fn type_error(message: impl Into<String>, span: Span) -> Self {
        EvalError::TypeError {
            message: message.into(),
            span,
        }
    }
}

/// Errors reading a compiled template into a program
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProgramError {
    #[error("Unterminated tag opened at {offset}")]
    UnterminatedTag { offset: usize },

    #[error("Unexpected '{tag}' at {offset}")]
    UnexpectedTag { tag: String, offset: usize },

    #[error("'{block}' opened at {offset} is never closed")]
    UnclosedBlock { block: String, offset: usize },

    #[error("Invalid tag at {offset}: {source}")]
    InvalidTag {
        offset: usize,
        #[source]
        source: EvalError,
    },
}

/// Errors raised while rendering
#[derive(Error, Debug)]
pub enum RenderError {
    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Program(#[from] ProgramError),

    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error("View not found: {}", path.display())]
    ViewNotFound { path: PathBuf },

    #[error("Nothing to pop from the {stack} stack")]
    StackUnderflow { stack: &'static str },

    #[error("Render finished with open stacks: {depths}")]
    StackImbalance { depths: StackDepths },

    #[error("'{operation}' used outside of a component or layout")]
    NoActiveFragment { operation: &'static str },

    #[error("Component '{alias}' nested deeper than {depth} levels")]
    RecursionLimit { alias: String, depth: usize },

    #[error("Loop exceeded {limit} iterations")]
    IterationLimit { limit: usize },

    #[error("Invalid render data: {message}")]
    InvalidData { message: String },
}

impl From<CommonError> for RenderError {
    fn from(error: CommonError) -> Self {
        match error {
            CommonError::ViewNotFound { path } => RenderError::ViewNotFound { path },
        }
    }
}

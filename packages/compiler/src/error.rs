use mortar_parser::ParseError;
use thiserror::Error;

pub type CompileResult<T> = Result<T, CompileError>;

/// Errors that can occur while lowering a node tree
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    #[error("Required argument not defined: {attribute}")]
    MissingArgument { attribute: String },

    #[error("Argument passed to attribute which does not support arguments: {attribute} = '{value}'")]
    UnexpectedArgument { attribute: String, value: String },

    #[error("Unbalanced arguments for helper @{name} at {pos}")]
    UnbalancedHelperArguments { name: String, pos: usize },

    #[error("{name}() is reserved for component markup and cannot be used in {{{{ }}}}")]
    ReservedCall { name: String },

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
}

impl CompileError {
    pub fn missing_argument(attribute: impl Into<String>) -> Self {
        Self::MissingArgument {
            attribute: attribute.into(),
        }
    }

    pub fn unexpected_argument(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self::UnexpectedArgument {
            attribute: attribute.into(),
            value: value.into(),
        }
    }
}

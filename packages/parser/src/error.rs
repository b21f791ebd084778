use thiserror::Error;

pub type ParseResult<T> = Result<T, ParseError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Attempted to parse empty template")]
    EmptyTemplate,

    #[error("Template has no root element")]
    NoRootElement,

    #[error("Template must only have one root element, found {count}")]
    MultipleRoots { count: usize },

    #[error("Unexpected closing tag </{found}> at {pos}: expected {expected}")]
    UnexpectedClosingTag {
        pos: usize,
        expected: String,
        found: String,
    },

    #[error("Element <{tag}> opened at {pos} is never closed")]
    UnclosedElement { pos: usize, tag: String },

    #[error("Unterminated comment at {pos}")]
    UnterminatedComment { pos: usize },

    #[error("Invalid syntax at {pos}: {message}")]
    InvalidSyntax { pos: usize, message: String },
}

impl ParseError {
    pub fn unexpected_closing_tag(
        pos: usize,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Self::UnexpectedClosingTag {
            pos,
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub fn unclosed_element(pos: usize, tag: impl Into<String>) -> Self {
        Self::UnclosedElement {
            pos,
            tag: tag.into(),
        }
    }

    pub fn invalid_syntax(pos: usize, message: impl Into<String>) -> Self {
        Self::InvalidSyntax {
            pos,
            message: message.into(),
        }
    }

    /// Byte offset the error points at, if it has one
    pub fn pos(&self) -> Option<usize> {
        match self {
            ParseError::UnexpectedClosingTag { pos, .. }
            | ParseError::UnclosedElement { pos, .. }
            | ParseError::UnterminatedComment { pos }
            | ParseError::InvalidSyntax { pos, .. } => Some(*pos),
            ParseError::EmptyTemplate
            | ParseError::NoRootElement
            | ParseError::MultipleRoots { .. } => None,
        }
    }
}

/// Pretty-print errors with source context using ariadne
#[cfg(feature = "pretty-errors")]
pub mod pretty {
    use super::ParseError;
    use ariadne::{Color, Label, Report, ReportKind, Source};

    pub fn format_error(error: &ParseError, filename: &str, source: &str) -> String {
        let start = error
            .pos()
            .unwrap_or(0)
            .min(source.len().saturating_sub(1));
        let end = (start + 1).min(source.len()).max(start);

        let label = match error {
            ParseError::UnexpectedClosingTag { expected, .. } => format!("expected {}", expected),
            ParseError::UnclosedElement { tag, .. } => format!("<{}> opened here", tag),
            ParseError::UnterminatedComment { .. } => "comment starts here".to_string(),
            ParseError::InvalidSyntax { message, .. } => message.clone(),
            other => other.to_string(),
        };

        let mut output = Vec::new();
        let report = Report::build(ReportKind::Error, filename, start)
            .with_message(error.to_string())
            .with_label(
                Label::new((filename, start..end))
                    .with_color(Color::Red)
                    .with_message(label),
            )
            .finish();

        if report
            .write((filename, Source::from(source)), &mut output)
            .is_err()
        {
            return error.to_string();
        }

        String::from_utf8(output).unwrap_or_else(|_| error.to_string())
    }
}

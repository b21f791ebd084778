pub mod ast;
pub mod error;
pub mod id_generator;
pub mod parser;

pub use ast::{next_sibling, previous_sibling, Attributes, Child, ChildRef, Cursor, Node};
pub use error::{ParseError, ParseResult};
pub use id_generator::IDGenerator;
pub use parser::{parse_with_path, Parser};

/// Document path used to seed keys when markup has no file behind it
pub const INLINE_DOCUMENT: &str = "inline";

/// Parse markup into its top-level nodes
pub fn parse(markup: &str) -> ParseResult<Vec<Node>> {
    parse_with_path(markup, INLINE_DOCUMENT)
}

/// Parse markup that must consist of exactly one root element
pub fn parse_root(markup: &str) -> ParseResult<Node> {
    let mut nodes = parse(markup)?;
    if nodes.len() > 1 {
        return Err(ParseError::MultipleRoots { count: nodes.len() });
    }
    nodes.pop().ok_or(ParseError::NoRootElement)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_root_single() {
        let node = parse_root("<div><span>Text</span></div>").unwrap();
        assert_eq!(node.kind(), "div");
    }

    #[test]
    fn test_parse_root_rejects_siblings() {
        let err = parse_root("<div></div><p></p>").unwrap_err();
        assert_eq!(err, ParseError::MultipleRoots { count: 2 });
    }

    #[test]
    fn test_parse_accepts_siblings() {
        let nodes = parse("<div></div><p></p>").unwrap();
        assert_eq!(nodes.len(), 2);
    }
}

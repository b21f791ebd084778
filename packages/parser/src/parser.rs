use crate::ast::{Attributes, Child, Node, KEY_ATTRIBUTE};
use crate::error::{ParseError, ParseResult};
use crate::id_generator::IDGenerator;
use regex::Regex;
use std::sync::OnceLock;
use tracing::{debug, instrument};

/// Elements that never have content and may be written without a closing tag
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Elements whose content is kept as raw text
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

fn self_closing_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r#"<([A-Za-z][A-Za-z0-9_:.\-]*)((?:\s+[^\s"'=<>/]+(?:\s*=\s*(?:"[^"]*"|'[^']*'|[^\s"'=<>`/]+))?)*)\s*/>"#,
        )
        .expect("self-closing tag pattern is valid")
    })
}

/// Markup with every `<x ... />` rewritten to `<x ...></x>`.
///
/// Keeps enough bookkeeping to map offsets in the rewritten text back to the
/// input the caller handed in.
#[derive(Debug)]
struct Normalized {
    text: String,
    /// (offset in `text` after a rewrite, cumulative length difference)
    shifts: Vec<(usize, isize)>,
}

impl Normalized {
    fn new(markup: &str) -> Self {
        let mut text = String::with_capacity(markup.len());
        let mut shifts = Vec::new();
        let mut last = 0;

        for captures in self_closing_pattern().captures_iter(markup) {
            let (Some(whole), Some(name)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            let head = captures.get(2).map_or("", |m| m.as_str());

            text.push_str(&markup[last..whole.start()]);
            text.push('<');
            text.push_str(name.as_str());
            text.push_str(head);
            text.push_str("></");
            text.push_str(name.as_str());
            text.push('>');

            shifts.push((text.len(), text.len() as isize - whole.end() as isize));
            last = whole.end();
        }
        text.push_str(&markup[last..]);

        Self { text, shifts }
    }

    fn original_offset(&self, pos: usize) -> usize {
        let shift = self
            .shifts
            .iter()
            .take_while(|(at, _)| *at <= pos)
            .last()
            .map_or(0, |(_, shift)| *shift);

        (pos as isize - shift).max(0) as usize
    }
}

/// Element that has been opened but not yet closed
struct OpenElement {
    kind: String,
    attributes: Attributes,
    children: Vec<Child>,
    start: usize,
}

/// Hand-written scanner producing a node tree from markup
pub struct Parser<'a> {
    source: &'a str,
    pos: usize,
    ids: IDGenerator,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str, ids: IDGenerator) -> Self {
        Self {
            source,
            pos: 0,
            ids,
        }
    }

    /// Parse every top-level node in the source
    pub fn parse(mut self) -> ParseResult<Vec<Node>> {
        let mut stack: Vec<OpenElement> = Vec::new();
        let mut roots: Vec<Child> = Vec::new();

        while !self.is_at_end() {
            if self.starts_with("<!--") {
                self.skip_comment()?;
            } else if self.starts_with("</") {
                let start = self.pos;
                let name = self.parse_closing_tag()?;
                let open = match stack.pop() {
                    Some(open) => open,
                    None => {
                        return Err(ParseError::unexpected_closing_tag(
                            start,
                            "no open element",
                            name,
                        ))
                    }
                };
                if open.kind != name {
                    return Err(ParseError::unexpected_closing_tag(
                        start,
                        format!("</{}>", open.kind),
                        name,
                    ));
                }
                let node = self.finish(open.kind, open.attributes, open.children);
                push_child(&mut stack, &mut roots, Child::Node(node));
            } else if self.starts_with("<!") || self.starts_with("<?") {
                self.skip_declaration()?;
            } else if self.at_open_tag() {
                let start = self.pos;
                let (kind, attributes) = self.parse_open_tag()?;

                if is_void(&kind) {
                    self.skip_redundant_close(&kind);
                    let node = self.finish(kind, attributes, Vec::new());
                    push_child(&mut stack, &mut roots, Child::Node(node));
                } else if is_raw_text(&kind) {
                    let text = self.parse_raw_text(&kind, start)?;
                    let children = if text.trim().is_empty() {
                        Vec::new()
                    } else {
                        vec![Child::Text(text)]
                    };
                    let node = self.finish(kind, attributes, children);
                    push_child(&mut stack, &mut roots, Child::Node(node));
                } else {
                    stack.push(OpenElement {
                        kind,
                        attributes,
                        children: Vec::new(),
                        start,
                    });
                }
            } else {
                let text = self.parse_text();
                if !text.trim().is_empty() {
                    push_child(&mut stack, &mut roots, Child::Text(text));
                }
            }
        }

        if let Some(open) = stack.pop() {
            return Err(ParseError::unclosed_element(open.start, open.kind));
        }

        let nodes = roots
            .into_iter()
            .map(|child| match child {
                Child::Node(node) => node,
                Child::Text(text) => {
                    let key = self.ids.new_id();
                    Node::with_key(key, "", Attributes::new(), vec![Child::Text(text)])
                }
            })
            .collect();

        Ok(nodes)
    }

    fn finish(&mut self, kind: String, attributes: Attributes, children: Vec<Child>) -> Node {
        let key = match attributes.get(KEY_ATTRIBUTE) {
            Some(Some(key)) => key.to_string(),
            _ => self.ids.new_id(),
        };
        Node::with_key(key, kind, attributes, children)
    }

    fn skip_comment(&mut self) -> ParseResult<()> {
        let start = self.pos;
        match self.source[self.pos + 4..].find("-->") {
            Some(end) => {
                self.pos += 4 + end + 3;
                Ok(())
            }
            None => Err(ParseError::UnterminatedComment { pos: start }),
        }
    }

    /// `<!DOCTYPE ...>` and processing instructions carry nothing we keep
    fn skip_declaration(&mut self) -> ParseResult<()> {
        let start = self.pos;
        match self.source[self.pos..].find('>') {
            Some(end) => {
                self.pos += end + 1;
                Ok(())
            }
            None => Err(ParseError::invalid_syntax(start, "unterminated declaration")),
        }
    }

    fn parse_closing_tag(&mut self) -> ParseResult<String> {
        let start = self.pos;
        self.pos += 2;
        let name = self.read_tag_name();
        self.skip_whitespace();

        if self.peek() != Some(b'>') {
            return Err(ParseError::invalid_syntax(
                start,
                format!("expected '>' to close </{}", name),
            ));
        }
        self.pos += 1;

        Ok(name)
    }

    fn parse_open_tag(&mut self) -> ParseResult<(String, Attributes)> {
        let start = self.pos;
        self.pos += 1;
        let kind = self.read_tag_name();
        let mut attributes = Attributes::new();

        loop {
            self.skip_whitespace();
            match self.peek() {
                None => {
                    return Err(ParseError::invalid_syntax(
                        start,
                        format!("unexpected end of input in <{}>", kind),
                    ))
                }
                Some(b'>') => {
                    self.pos += 1;
                    break;
                }
                Some(b'/') if self.peek_at(1) == Some(b'>') => {
                    // only reachable for a tag the normalizer could not rewrite
                    self.pos += 2;
                    break;
                }
                Some(b'/') => self.pos += 1,
                Some(_) => {
                    let (name, value) = self.parse_attribute(&kind)?;
                    // re-inserting keeps the first position and takes the last value
                    attributes.insert(name, value);
                }
            }
        }

        Ok((kind, attributes))
    }

    fn parse_attribute(&mut self, tag: &str) -> ParseResult<(String, Option<String>)> {
        let start = self.pos;
        while let Some(byte) = self.peek() {
            if byte.is_ascii_whitespace() || matches!(byte, b'=' | b'>' | b'"' | b'\'') {
                break;
            }
            if byte == b'/' && self.peek_at(1) == Some(b'>') {
                break;
            }
            self.pos += 1;
        }

        if self.pos == start {
            return Err(ParseError::invalid_syntax(
                start,
                format!("unexpected character in <{}>", tag),
            ));
        }
        let name = self.source[start..self.pos].to_string();

        let before_value = self.pos;
        self.skip_whitespace();
        if self.peek() != Some(b'=') {
            self.pos = before_value;
            return Ok((name, None));
        }
        self.pos += 1;
        self.skip_whitespace();

        let value = match self.peek() {
            Some(quote @ (b'"' | b'\'')) => {
                let value_start = self.pos + 1;
                match self.source[value_start..].find(quote as char) {
                    Some(len) => {
                        self.pos = value_start + len + 1;
                        &self.source[value_start..value_start + len]
                    }
                    None => {
                        return Err(ParseError::invalid_syntax(
                            self.pos,
                            format!("unterminated value for attribute {}", name),
                        ))
                    }
                }
            }
            _ => {
                let value_start = self.pos;
                while let Some(byte) = self.peek() {
                    if byte.is_ascii_whitespace() || byte == b'>' {
                        break;
                    }
                    self.pos += 1;
                }
                &self.source[value_start..self.pos]
            }
        };

        let value = if value.trim().is_empty() {
            None
        } else {
            Some(value.to_string())
        };

        Ok((name, value))
    }

    fn parse_raw_text(&mut self, kind: &str, start: usize) -> ParseResult<String> {
        let closing = format!("</{}", kind.to_ascii_lowercase());
        let rest = self.source[self.pos..].to_ascii_lowercase();

        let Some(len) = rest.find(&closing) else {
            return Err(ParseError::unclosed_element(start, kind));
        };

        let text = self.source[self.pos..self.pos + len].to_string();
        self.pos += len;

        let name = self.parse_closing_tag()?;
        if !name.eq_ignore_ascii_case(kind) {
            return Err(ParseError::unexpected_closing_tag(
                self.pos,
                format!("</{}>", kind),
                name,
            ));
        }

        Ok(text)
    }

    /// Void elements written as `<br />` come out of normalization as
    /// `<br></br>`; swallow the explicit close.
    fn skip_redundant_close(&mut self, kind: &str) {
        let closing = format!("</{}>", kind);
        if self.starts_with(&closing) {
            self.pos += closing.len();
        }
    }

    fn parse_text(&mut self) -> String {
        let start = self.pos;
        self.pos += 1;
        while !self.is_at_end() {
            if self.peek() == Some(b'<')
                && (self.at_open_tag()
                    || self.starts_with("</")
                    || self.starts_with("<!")
                    || self.starts_with("<?"))
            {
                break;
            }
            self.pos += 1;
        }
        // tag boundaries are ASCII, so this never splits a character
        self.source[start..self.pos].to_string()
    }

    fn at_open_tag(&self) -> bool {
        self.peek() == Some(b'<') && self.peek_at(1).is_some_and(|b| b.is_ascii_alphabetic())
    }

    fn read_tag_name(&mut self) -> String {
        let start = self.pos;
        while let Some(byte) = self.peek() {
            if byte.is_ascii_alphanumeric() || matches!(byte, b'_' | b':' | b'.' | b'-') {
                self.pos += 1;
            } else {
                break;
            }
        }
        self.source[start..self.pos].to_string()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn starts_with(&self, pattern: &str) -> bool {
        self.source[self.pos..].starts_with(pattern)
    }

    fn peek(&self) -> Option<u8> {
        self.source.as_bytes().get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.source.as_bytes().get(self.pos + offset).copied()
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.source.len()
    }
}

fn push_child(stack: &mut [OpenElement], roots: &mut Vec<Child>, child: Child) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(child),
        None => roots.push(child),
    }
}

fn is_void(kind: &str) -> bool {
    VOID_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(kind))
}

fn is_raw_text(kind: &str) -> bool {
    RAW_TEXT_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(kind))
}

/// Parse markup into its top-level nodes, with keys seeded by `path`
#[instrument(skip(markup), fields(len = markup.len()))]
pub fn parse_with_path(markup: &str, path: &str) -> ParseResult<Vec<Node>> {
    if markup.trim().is_empty() {
        return Err(ParseError::EmptyTemplate);
    }

    let normalized = Normalized::new(markup);
    let nodes = Parser::new(&normalized.text, IDGenerator::new(path))
        .parse()
        .map_err(|error| relocate(error, &normalized))?;

    if nodes.is_empty() {
        return Err(ParseError::NoRootElement);
    }

    debug!(roots = nodes.len(), "parsed markup");
    Ok(nodes)
}

/// Point error offsets at the caller's markup instead of the normalized copy
fn relocate(error: ParseError, normalized: &Normalized) -> ParseError {
    let at = |pos: usize| normalized.original_offset(pos);
    match error {
        ParseError::UnexpectedClosingTag {
            pos,
            expected,
            found,
        } => ParseError::UnexpectedClosingTag {
            pos: at(pos),
            expected,
            found,
        },
        ParseError::UnclosedElement { pos, tag } => ParseError::UnclosedElement { pos: at(pos), tag },
        ParseError::UnterminatedComment { pos } => ParseError::UnterminatedComment { pos: at(pos) },
        ParseError::InvalidSyntax { pos, message } => ParseError::InvalidSyntax {
            pos: at(pos),
            message,
        },
        other => other,
    }
}

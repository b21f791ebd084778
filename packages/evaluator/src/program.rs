//! Reader for the compiled template form.
//!
//! Compiled templates are literal text interleaved with `<%= expr %>`,
//! `<%@ helper(args) %>` and `<% statement %>` tags. Block statements
//! (`if`/`endif`, `startFragment`/`renderFragment`, ...) must pair up; the
//! reader turns them into a nested [`Op`] tree so a well-formed program can
//! only ever push and pop the runtime stacks in matching order.

use crate::error::{EvalError, ProgramError, Span};
use crate::expr::Expr;
use crate::expr_parser::{
    parse_arguments, parse_expression, parse_for_header, parse_foreach_header, ForHeader, ForeachHeader,
};
use crate::fragment::FragmentKind;
use std::mem;

/// One executable step
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    Text(String),

    /// `<%= expr %>`
    Echo(Expr),

    /// `<%@ name(args) %>`
    Helper { name: String, arguments: Vec<Expr> },

    /// Expression evaluated for its side effects
    Eval(Expr),

    If {
        branches: Vec<(Expr, Vec<Op>)>,
        otherwise: Option<Vec<Op>>,
    },

    For { header: ForHeader, body: Vec<Op> },

    Foreach { header: ForeachHeader, body: Vec<Op> },

    /// Component or layout invocation; the body fills its templates
    Fragment {
        kind: FragmentKind,
        alias: String,
        attributes: Expr,
        body: Vec<Op>,
    },

    /// Caller content for the named slot of the active fragment
    Template { name: String, body: Vec<Op> },

    /// Slot of the active fragment; the body is the default content
    Slot { name: String, body: Vec<Op> },
}

/// A compiled template read into ops
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    ops: Vec<Op>,
}

impl Program {
    pub fn parse(source: &str) -> Result<Self, ProgramError> {
        let mut builder = Builder::new();
        let mut text = String::new();
        let mut pos = 0;

        while let Some(found) = source[pos..].find("<%") {
            let start = pos + found;
            text.push_str(&source[pos..start]);

            if source[start..].starts_with("<%%") {
                text.push_str("<%");
                pos = start + 3;
                continue;
            }

            let end = tag_end(source, start).ok_or(ProgramError::UnterminatedTag { offset: start })?;
            builder.text(mem::take(&mut text));
            builder.tag(&source[start + 2..end - 2], start)?;
            pos = end;
        }

        text.push_str(&source[pos..]);
        builder.text(text);
        builder.finish()
    }

    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Offset just past the `%>` closing the tag at `start`
fn tag_end(source: &str, start: usize) -> Option<usize> {
    let bytes = source.as_bytes();
    let mut pos = start + 2;
    while pos < bytes.len() {
        match bytes[pos] {
            quote @ (b'"' | b'\'') => {
                pos += 1;
                while pos < bytes.len() && bytes[pos] != quote {
                    pos += if bytes[pos] == b'\\' { 2 } else { 1 };
                }
                pos += 1;
            }
            b'%' if bytes.get(pos + 1) == Some(&b'>') => return Some(pos + 2),
            _ => pos += 1,
        }
    }
    None
}

enum BlockKind {
    Root,
    If {
        branches: Vec<(Expr, Vec<Op>)>,
        /// `None` once the `else` branch is open
        condition: Option<Expr>,
    },
    For(ForHeader),
    Foreach(ForeachHeader),
    Fragment {
        kind: FragmentKind,
        alias: String,
        attributes: Expr,
    },
    Template(String),
    Slot(String),
}

impl BlockKind {
    fn opener(&self) -> &'static str {
        match self {
            BlockKind::Root => "program",
            BlockKind::If { .. } => "if",
            BlockKind::For(_) => "for",
            BlockKind::Foreach(_) => "foreach",
            BlockKind::Fragment { kind, .. } => kind.start_call(),
            BlockKind::Template(_) => "startTemplate",
            BlockKind::Slot(_) => "startSlot",
        }
    }
}

struct Block {
    kind: BlockKind,
    offset: usize,
    body: Vec<Op>,
}

/// Stack of open blocks while reading
struct Builder {
    blocks: Vec<Block>,
}

impl Builder {
    fn new() -> Self {
        Self {
            blocks: vec![Block {
                kind: BlockKind::Root,
                offset: 0,
                body: Vec::new(),
            }],
        }
    }

    fn current(&mut self) -> &mut Block {
        let last = self.blocks.len() - 1;
        &mut self.blocks[last]
    }

    fn push_op(&mut self, op: Op) {
        self.current().body.push(op);
    }

    fn text(&mut self, text: String) {
        if text.is_empty() {
            return;
        }
        let body = &mut self.current().body;
        if let Some(Op::Text(previous)) = body.last_mut() {
            previous.push_str(&text);
        } else {
            body.push(Op::Text(text));
        }
    }

    fn open(&mut self, kind: BlockKind, offset: usize) {
        self.blocks.push(Block {
            kind,
            offset,
            body: Vec::new(),
        });
    }

    fn tag(&mut self, inner: &str, offset: usize) -> Result<(), ProgramError> {
        let invalid = |source: EvalError| ProgramError::InvalidTag { offset, source };

        if let Some(expr) = inner.strip_prefix('=') {
            let expr = parse_expression(expr.trim()).map_err(invalid)?;
            if let Some(closer) = closing_call(&expr) {
                return self.close(closer, offset);
            }
            self.push_op(Op::Echo(expr));
            return Ok(());
        }

        if let Some(call) = inner.strip_prefix('@') {
            let (name, arguments) = split_helper(call.trim(), offset)?;
            self.push_op(Op::Helper { name, arguments });
            return Ok(());
        }

        self.statement(inner.trim(), offset)
    }

    fn statement(&mut self, statement: &str, offset: usize) -> Result<(), ProgramError> {
        let invalid = |source: EvalError| ProgramError::InvalidTag { offset, source };

        match statement {
            "else" => return self.open_else(offset),
            "endif" | "endfor" | "endforeach" => return self.close(statement, offset),
            _ => {}
        }

        if let Some(rest) = keyword(statement, "elseif") {
            let condition = parse_expression(parenthesized(rest, offset)?).map_err(invalid)?;
            return self.open_elseif(condition, offset);
        }
        if let Some(rest) = keyword(statement, "if") {
            let condition = parse_expression(parenthesized(rest, offset)?).map_err(invalid)?;
            self.open(
                BlockKind::If {
                    branches: Vec::new(),
                    condition: Some(condition),
                },
                offset,
            );
            return Ok(());
        }
        if let Some(rest) = keyword(statement, "foreach") {
            let header = parse_foreach_header(parenthesized(rest, offset)?).map_err(invalid)?;
            self.open(BlockKind::Foreach(header), offset);
            return Ok(());
        }
        if let Some(rest) = keyword(statement, "for") {
            let header = parse_for_header(parenthesized(rest, offset)?).map_err(invalid)?;
            self.open(BlockKind::For(header), offset);
            return Ok(());
        }

        let expr = parse_expression(statement).map_err(invalid)?;
        if let Some(closer) = closing_call(&expr) {
            return self.close(closer, offset);
        }

        let (function, arguments, span) = match expr {
            Expr::Call {
                function,
                arguments,
                span,
            } => (function, arguments, span),
            other => {
                self.push_op(Op::Eval(other));
                return Ok(());
            }
        };

        let kind = match function.as_str() {
            "startFragment" => BlockKind::Fragment {
                kind: FragmentKind::Component,
                alias: string_argument(&function, &arguments, &span).map_err(invalid)?,
                attributes: attributes_argument(arguments, span),
            },
            "startLayout" => BlockKind::Fragment {
                kind: FragmentKind::Layout,
                alias: string_argument(&function, &arguments, &span).map_err(invalid)?,
                attributes: attributes_argument(arguments, span),
            },
            "startTemplate" => BlockKind::Template(string_argument(&function, &arguments, &span).map_err(invalid)?),
            "startSlot" => BlockKind::Slot(string_argument(&function, &arguments, &span).map_err(invalid)?),
            _ => {
                self.push_op(Op::Eval(Expr::Call {
                    function,
                    arguments,
                    span,
                }));
                return Ok(());
            }
        };

        self.open(kind, offset);
        Ok(())
    }

    fn open_elseif(&mut self, next: Expr, offset: usize) -> Result<(), ProgramError> {
        let block = self.current();
        match &mut block.kind {
            BlockKind::If { branches, condition } => {
                let Some(previous) = condition.replace(next) else {
                    return Err(unexpected("elseif", offset));
                };
                branches.push((previous, mem::take(&mut block.body)));
                Ok(())
            }
            _ => Err(unexpected("elseif", offset)),
        }
    }

    fn open_else(&mut self, offset: usize) -> Result<(), ProgramError> {
        let block = self.current();
        match &mut block.kind {
            BlockKind::If { branches, condition } => {
                let Some(previous) = condition.take() else {
                    return Err(unexpected("else", offset));
                };
                branches.push((previous, mem::take(&mut block.body)));
                Ok(())
            }
            _ => Err(unexpected("else", offset)),
        }
    }

    /// Close the innermost block with `closer`, which must match its opener
    fn close(&mut self, closer: &str, offset: usize) -> Result<(), ProgramError> {
        let matches = match &self.current().kind {
            BlockKind::Root => false,
            BlockKind::If { .. } => closer == "endif",
            BlockKind::For(_) => closer == "endfor",
            BlockKind::Foreach(_) => closer == "endforeach",
            BlockKind::Fragment { kind, .. } => closer == kind.render_call(),
            BlockKind::Template(_) => closer == "endTemplate",
            BlockKind::Slot(_) => closer == "renderSlot",
        };
        if !matches {
            return Err(unexpected(closer, offset));
        }

        let Some(block) = self.blocks.pop() else {
            return Err(unexpected(closer, offset));
        };
        let body = block.body;
        let op = match block.kind {
            BlockKind::Root => return Err(unexpected(closer, offset)),
            BlockKind::If {
                mut branches,
                condition,
            } => match condition {
                Some(condition) => {
                    branches.push((condition, body));
                    Op::If {
                        branches,
                        otherwise: None,
                    }
                }
                None => Op::If {
                    branches,
                    otherwise: Some(body),
                },
            },
            BlockKind::For(header) => Op::For { header, body },
            BlockKind::Foreach(header) => Op::Foreach { header, body },
            BlockKind::Fragment {
                kind,
                alias,
                attributes,
            } => Op::Fragment {
                kind,
                alias,
                attributes,
                body,
            },
            BlockKind::Template(name) => Op::Template { name, body },
            BlockKind::Slot(name) => Op::Slot { name, body },
        };

        self.push_op(op);
        Ok(())
    }

    fn finish(mut self) -> Result<Program, ProgramError> {
        if self.blocks.len() > 1 {
            let block = &self.blocks[self.blocks.len() - 1];
            return Err(ProgramError::UnclosedBlock {
                block: block.kind.opener().to_string(),
                offset: block.offset,
            });
        }

        let ops = self.blocks.pop().map(|root| root.body).unwrap_or_default();
        Ok(Program { ops })
    }
}

fn unexpected(tag: &str, offset: usize) -> ProgramError {
    ProgramError::UnexpectedTag {
        tag: tag.to_string(),
        offset,
    }
}

/// Name of the block a zero-argument call like `renderSlot()` closes
fn closing_call(expr: &Expr) -> Option<&'static str> {
    let Expr::Call {
        function,
        arguments,
        ..
    } = expr
    else {
        return None;
    };
    if !arguments.is_empty() {
        return None;
    }
    ["renderFragment", "renderLayout", "renderSlot", "endTemplate"]
        .into_iter()
        .find(|closer| *closer == function.as_str())
}

/// Rest of `statement` after `word`, if it starts with that whole word
fn keyword<'s>(statement: &'s str, word: &str) -> Option<&'s str> {
    let rest = statement.strip_prefix(word)?;
    match rest.chars().next() {
        Some(c) if c.is_alphanumeric() || c == '_' => None,
        _ => Some(rest),
    }
}

/// Inside of `( ... )`
fn parenthesized(rest: &str, offset: usize) -> Result<&str, ProgramError> {
    let rest = rest.trim();
    rest.strip_prefix('(')
        .and_then(|inner| inner.strip_suffix(')'))
        .ok_or_else(|| ProgramError::InvalidTag {
            offset,
            source: EvalError::SyntaxError {
                message: "expected a parenthesized header".to_string(),
                span: 0..rest.len(),
            },
        })
}

/// `name(args)` or bare `name` of a helper tag
fn split_helper(call: &str, offset: usize) -> Result<(String, Vec<Expr>), ProgramError> {
    let name_len = call
        .find(|c: char| !(c.is_alphanumeric() || c == '_'))
        .unwrap_or(call.len());
    let (name, rest) = call.split_at(name_len);

    let arguments = if rest.trim().is_empty() {
        Vec::new()
    } else {
        parse_arguments(parenthesized(rest, offset)?)
            .map_err(|source| ProgramError::InvalidTag { offset, source })?
    };

    Ok((name.to_string(), arguments))
}

fn string_argument(function: &str, arguments: &[Expr], span: &Span) -> Result<String, EvalError> {
    arguments
        .first()
        .and_then(Expr::as_str_literal)
        .map(str::to_string)
        .ok_or_else(|| EvalError::type_error(format!("{}() expects a string name", function), span.clone()))
}

fn attributes_argument(arguments: Vec<Expr>, span: Span) -> Expr {
    arguments.into_iter().nth(1).unwrap_or(Expr::Map {
        entries: Vec::new(),
        span,
    })
}

use crate::compiler::{CompilerPass, Next};
use crate::context::CompilerContext;
use crate::error::{CompileError, CompileResult};
use mortar_parser::{Child, Node};
use regex::Regex;
use std::sync::OnceLock;

fn interpolation_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\{\{\s*(.+?)\s*\}\}(\r?\n)?").expect("interpolation pattern is valid")
    })
}

/// Piece of a text run split around `{{ }}` expressions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    Literal(&'a str),
    Expression(&'a str),
}

impl<'a> Segment<'a> {
    pub fn literal(&self) -> Option<&'a str> {
        match self {
            Segment::Literal(text) => Some(text),
            Segment::Expression(_) => None,
        }
    }
}

/// Split `value` into literal text and `{{ expr }}` expressions.
///
/// `@{{ expr }}` is kept as the literal `{{ expr }}`. One line break right
/// after an expression is dropped.
pub fn segments(value: &str) -> Vec<Segment<'_>> {
    let mut parts = Vec::new();
    let mut last = 0;

    for captures in interpolation_pattern().captures_iter(value) {
        let (Some(whole), Some(expr)) = (captures.get(0), captures.get(1)) else {
            continue;
        };

        if value[last..whole.start()].ends_with('@') {
            push_literal(&mut parts, &value[last..whole.start() - 1]);
            push_literal(&mut parts, whole.as_str());
        } else {
            push_literal(&mut parts, &value[last..whole.start()]);
            parts.push(Segment::Expression(expr.as_str()));
        }
        last = whole.end();
    }
    push_literal(&mut parts, &value[last..]);

    parts
}

fn push_literal<'a>(parts: &mut Vec<Segment<'a>>, text: &'a str) {
    if !text.is_empty() {
        parts.push(Segment::Literal(text));
    }
}

/// Zero-argument calls that close component, layout, template and slot
/// blocks in compiled output
const RESERVED_CALLS: [&str; 4] = ["renderFragment", "renderLayout", "renderSlot", "endTemplate"];

fn reserved_call(expr: &str) -> Option<&'static str> {
    let core = expr.trim_matches(|c: char| c == '(' || c == ')' || c.is_whitespace());
    if !expr.contains('(') {
        return None;
    }
    RESERVED_CALLS.into_iter().find(|name| *name == core)
}

/// Rewrite `{{ expr }}` into echo tags and escape literal `<%`
pub fn interpolate(value: &str) -> CompileResult<String> {
    let mut output = String::with_capacity(value.len());
    for part in segments(value) {
        match part {
            Segment::Literal(text) => output.push_str(&text.replace("<%", "<%%")),
            Segment::Expression(expr) => {
                if let Some(name) = reserved_call(expr) {
                    return Err(CompileError::ReservedCall {
                        name: name.to_string(),
                    });
                }
                output.push_str("<%= ");
                output.push_str(expr);
                output.push_str(" %>");
            }
        }
    }
    Ok(output)
}

/// Interpolates the text children and attribute values of a node.
///
/// Child nodes are left alone; they get their own turn in the pipeline.
pub struct InterpolationPass;

impl CompilerPass for InterpolationPass {
    fn name(&self) -> &'static str {
        "interpolation"
    }

    fn visit(&self, ctx: &CompilerContext<'_>, node: &mut Node, next: Next<'_>) -> CompileResult<String> {
        for child in node.children.iter_mut() {
            if let Child::Text(text) = child {
                *text = interpolate(text)?;
            }
        }

        for (_, value) in node.attributes.iter_mut() {
            if let Some(value) = value {
                *value = interpolate(value)?;
            }
        }

        next.run(ctx, node)
    }
}

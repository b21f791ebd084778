mod attributes;
mod fragments;
mod interpolation;
mod layouts;
mod slots;
mod templates;

pub use attributes::AttributesPass;
pub use fragments::FragmentsPass;
pub use interpolation::{interpolate, segments, InterpolationPass, Segment};
pub use layouts::LayoutsPass;
pub use slots::SlotsPass;
pub use templates::TemplatesPass;

use crate::compiler::CompilerPass;
use mortar_parser::{Attributes, Child, Node};

/// Passes in the order they run for every node
pub fn default_passes() -> Vec<Box<dyn CompilerPass>> {
    vec![
        Box::new(AttributesPass),
        Box::new(LayoutsPass),
        Box::new(FragmentsPass),
        Box::new(SlotsPass),
        Box::new(TemplatesPass),
        Box::new(InterpolationPass),
    ]
}

/// Name given by the first `#name` attribute, `default` otherwise
pub(crate) fn block_name(node: &Node) -> String {
    node.attributes
        .names()
        .find_map(|name| name.strip_prefix('#'))
        .map(|name| name.trim_start_matches('#'))
        .filter(|name| !name.is_empty())
        .unwrap_or("default")
        .to_string()
}

/// Move loose children of a component or layout into a `<template>`.
///
/// Any text child forces wrapping; otherwise an existing `template` child
/// means the caller already split the content into blocks.
pub(crate) fn wrap_in_template(node: &mut Node) {
    let mut wrap = true;
    for child in &node.children {
        match child {
            Child::Text(_) => break,
            Child::Node(child) if child.kind() == "template" => {
                wrap = false;
                break;
            }
            Child::Node(_) => {}
        }
    }

    if wrap {
        let children = node.remove_all_children();
        node.add_child(Node::element("template", Attributes::new(), children));
    }
}

/// Quote `value` as a string literal for the compiled form
pub(crate) fn string_literal(value: &str) -> String {
    let mut literal = String::with_capacity(value.len() + 2);
    literal.push('"');
    for c in value.chars() {
        match c {
            '"' => literal.push_str("\\\""),
            '\\' => literal.push_str("\\\\"),
            '\n' => literal.push_str("\\n"),
            '\r' => literal.push_str("\\r"),
            '\t' => literal.push_str("\\t"),
            c => literal.push(c),
        }
    }
    literal.push('"');
    literal
}

/// Map literal handed to `startFragment` / `startLayout`
pub(crate) fn attribute_map(attributes: &Attributes) -> String {
    let entries: Vec<String> = attributes
        .iter()
        .map(|(name, value)| format!("{}: {}", string_literal(name), attribute_value(value)))
        .collect();

    format!("{{{}}}", entries.join(", "))
}

fn attribute_value(value: Option<&str>) -> String {
    let Some(value) = value else {
        return "true".to_string();
    };

    let parts = segments(value);
    match parts.as_slice() {
        [Segment::Expression(expr)] => format!("({})", expr),
        parts if parts.iter().any(|part| matches!(part, Segment::Expression(_))) => {
            // a leading string literal keeps `+` a concatenation
            let mut terms = Vec::with_capacity(parts.len() + 1);
            if !matches!(parts.first(), Some(Segment::Literal(_))) {
                terms.push(string_literal(""));
            }
            for part in parts {
                terms.push(match part {
                    Segment::Literal(text) => string_literal(text),
                    Segment::Expression(expr) => format!("({})", expr),
                });
            }
            terms.join(" + ")
        }
        parts => {
            let text: String = parts.iter().filter_map(Segment::literal).collect();
            string_literal(&text)
        }
    }
}

use super::{attribute_map, string_literal, wrap_in_template};
use crate::compiler::{CompilerPass, Next};
use crate::context::CompilerContext;
use crate::error::CompileResult;
use mortar_common::LAYOUT_PREFIX;
use mortar_parser::Node;
use tracing::debug;

/// Expands `<x-layout::name>` into a layout invocation
pub struct LayoutsPass;

impl CompilerPass for LayoutsPass {
    fn name(&self) -> &'static str {
        "layouts"
    }

    fn visit(&self, ctx: &CompilerContext<'_>, node: &mut Node, next: Next<'_>) -> CompileResult<String> {
        if !node.kind().starts_with(LAYOUT_PREFIX) {
            return next.run(ctx, node);
        }

        debug!(alias = node.kind(), "expanding layout");
        wrap_in_template(node);

        let body = ctx.compiler.compile_nodes(&mut node.children)?;
        let data = attribute_map(&node.attributes);

        Ok(format!(
            "<% startLayout({}, {}) %>{}<%= renderLayout() %>",
            string_literal(node.kind()),
            data,
            body
        ))
    }
}

use super::{attribute_map, string_literal, wrap_in_template};
use crate::compiler::{CompilerPass, Next};
use crate::context::CompilerContext;
use crate::error::CompileResult;
use mortar_common::ALIAS_PREFIX;
use mortar_parser::Node;
use tracing::debug;

/// Expands `<x-name>` component tags into a fragment invocation.
///
/// The body only fills the fragment's slots; the runtime keeps track of which
/// fragment is active, so nothing here saves or restores it.
pub struct FragmentsPass;

impl CompilerPass for FragmentsPass {
    fn name(&self) -> &'static str {
        "fragments"
    }

    fn visit(&self, ctx: &CompilerContext<'_>, node: &mut Node, next: Next<'_>) -> CompileResult<String> {
        if !node.kind().starts_with(ALIAS_PREFIX) {
            return next.run(ctx, node);
        }

        debug!(alias = node.kind(), "expanding component");
        let data = attribute_map(&node.attributes);
        wrap_in_template(node);

        let body = ctx.compiler.compile_nodes(&mut node.children)?;

        Ok(format!(
            "<% startFragment({}, {}) %>{}<%= renderFragment() %>",
            string_literal(node.kind()),
            data,
            body
        ))
    }
}

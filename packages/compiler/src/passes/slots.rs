use super::{block_name, string_literal};
use crate::compiler::{CompilerPass, Next};
use crate::context::CompilerContext;
use crate::error::CompileResult;
use mortar_parser::Node;

/// `<slot #name>default</slot>` inside a component or layout body
pub struct SlotsPass;

impl CompilerPass for SlotsPass {
    fn name(&self) -> &'static str {
        "slots"
    }

    fn visit(&self, ctx: &CompilerContext<'_>, node: &mut Node, next: Next<'_>) -> CompileResult<String> {
        if node.kind() != "slot" {
            return next.run(ctx, node);
        }

        let name = block_name(node);
        let content = ctx.compiler.compile_nodes(&mut node.children)?;

        Ok(format!(
            "<% startSlot({}) %>{}<%= renderSlot() %>",
            string_literal(&name),
            content
        ))
    }
}

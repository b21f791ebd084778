use super::{block_name, string_literal};
use crate::compiler::{CompilerPass, Next};
use crate::context::CompilerContext;
use crate::error::CompileResult;
use mortar_parser::Node;

/// `<template #name>` blocks that fill a slot of the enclosing invocation
pub struct TemplatesPass;

impl CompilerPass for TemplatesPass {
    fn name(&self) -> &'static str {
        "templates"
    }

    fn visit(&self, ctx: &CompilerContext<'_>, node: &mut Node, next: Next<'_>) -> CompileResult<String> {
        if node.kind() != "template" {
            return next.run(ctx, node);
        }

        let name = block_name(node);
        let content = ctx.compiler.compile_nodes(&mut node.children)?;

        Ok(format!(
            "<% startTemplate({}) %>{}<% endTemplate() %>",
            string_literal(&name),
            content
        ))
    }
}

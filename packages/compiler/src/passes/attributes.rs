use crate::compiler::{CompilerPass, Next};
use crate::context::CompilerContext;
use crate::directives::{ArgumentPolicy, BODY_MARKER};
use crate::error::{CompileError, CompileResult};
use mortar_parser::Node;
use tracing::debug;

/// Applies directive attributes, nesting them in attribute order
pub struct AttributesPass;

impl CompilerPass for AttributesPass {
    fn name(&self) -> &'static str {
        "attributes"
    }

    fn visit(&self, ctx: &CompilerContext<'_>, node: &mut Node, next: Next<'_>) -> CompileResult<String> {
        let directives = ctx.compiler.directives();
        let matched: Vec<String> = node
            .attributes
            .names()
            .filter(|name| directives.contains(name))
            .map(str::to_string)
            .collect();

        let mut result = BODY_MARKER.to_string();
        for attribute in matched {
            let Some(entry) = directives.get(&attribute) else {
                continue;
            };
            let value = node.attribute(&attribute).flatten().map(str::to_string);

            match (entry.policy, &value) {
                (ArgumentPolicy::Required, None) => {
                    return Err(CompileError::missing_argument(attribute));
                }
                (ArgumentPolicy::None, Some(value)) => {
                    return Err(CompileError::unexpected_argument(attribute, value.as_str()));
                }
                _ => {}
            }

            debug!(attribute = %attribute, kind = node.kind(), "applying directive");
            let replacement = entry.directive.expand(ctx, entry.name, value.as_deref());
            result = result.replacen(BODY_MARKER, &replacement, 1);

            node.remove_attribute(&attribute);
        }

        let body = next.run(ctx, node)?;
        Ok(result.replacen(BODY_MARKER, &body, 1))
    }
}

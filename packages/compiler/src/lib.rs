pub mod compiler;
pub mod context;
pub mod directives;
pub mod error;
pub mod helpers;
pub mod passes;

pub use compiler::{Compiler, CompilerPass, Next};
pub use context::{CompileOptions, CompilerContext, DEFAULT_DIRECTIVE_PREFIX};
pub use directives::{ArgumentPolicy, Directive, DirectiveTable, BODY_MARKER};
pub use error::{CompileError, CompileResult};
pub use helpers::expand_helpers;

/// Compile markup with the default options
pub fn compile(markup: &str) -> CompileResult<String> {
    Compiler::new().compile(markup)
}

use crate::compiler::Compiler;
use mortar_parser::Node;

/// Prefix of the built-in directive attributes (`:if`, `:foreach`, ...)
pub const DEFAULT_DIRECTIVE_PREFIX: &str = ":";

/// Options for template compilation
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Sigil in front of directive attribute names
    pub directive_prefix: String,
    /// Rewrite `@name(...)` helper tags in the compiled output
    pub expand_helpers: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            directive_prefix: DEFAULT_DIRECTIVE_PREFIX.to_string(),
            expand_helpers: true,
        }
    }
}

/// State handed to every pass while one node is compiled
#[derive(Clone, Copy)]
pub struct CompilerContext<'a> {
    pub compiler: &'a Compiler,
    /// Node directly after the one being compiled, if that entry is a node
    pub next_sibling: Option<&'a Node>,
}

impl<'a> CompilerContext<'a> {
    pub fn new(compiler: &'a Compiler, next_sibling: Option<&'a Node>) -> Self {
        Self {
            compiler,
            next_sibling,
        }
    }

    pub fn options(&self) -> &'a CompileOptions {
        self.compiler.options()
    }
}

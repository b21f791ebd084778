use crate::context::{CompileOptions, CompilerContext};
use crate::directives::DirectiveTable;
use crate::error::CompileResult;
use crate::helpers::expand_helpers;
use crate::passes::default_passes;
use mortar_parser::{parse_with_path, Child, Node, INLINE_DOCUMENT};
use tracing::{debug, instrument};

/// One step of the per-node pipeline.
///
/// A pass either handles the node itself or hands it on unchanged (or
/// mutated) through `next`.
pub trait CompilerPass: Send + Sync {
    fn name(&self) -> &'static str;

    fn visit(&self, ctx: &CompilerContext<'_>, node: &mut Node, next: Next<'_>) -> CompileResult<String>;
}

/// The passes that have not run yet for the current node
#[derive(Clone, Copy)]
pub struct Next<'a> {
    passes: &'a [Box<dyn CompilerPass>],
}

impl<'a> Next<'a> {
    pub fn new(passes: &'a [Box<dyn CompilerPass>]) -> Self {
        Self { passes }
    }

    /// Continue with the following pass, or render the node once none are left
    pub fn run(self, ctx: &CompilerContext<'_>, node: &mut Node) -> CompileResult<String> {
        match self.passes.split_first() {
            Some((pass, rest)) => pass.visit(ctx, node, Next::new(rest)),
            None => ctx.compiler.render(ctx, node),
        }
    }
}

/// Lowers node trees into the compiled template form
pub struct Compiler {
    options: CompileOptions,
    directives: DirectiveTable,
    passes: Vec<Box<dyn CompilerPass>>,
}

impl Compiler {
    pub fn new() -> Self {
        Self::with_options(CompileOptions::default())
    }

    pub fn with_options(options: CompileOptions) -> Self {
        Self::with_passes(options, default_passes())
    }

    /// Compiler running a custom pass list, in order
    pub fn with_passes(options: CompileOptions, passes: Vec<Box<dyn CompilerPass>>) -> Self {
        let directives = DirectiveTable::new(&options.directive_prefix);
        Self {
            options,
            directives,
            passes,
        }
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    pub fn directives(&self) -> &DirectiveTable {
        &self.directives
    }

    pub fn pass_names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|pass| pass.name()).collect()
    }

    /// Parse and compile markup
    pub fn compile(&self, markup: &str) -> CompileResult<String> {
        self.compile_with_path(markup, INLINE_DOCUMENT)
    }

    /// Parse and compile markup read from `path`
    #[instrument(skip(self, markup), fields(len = markup.len()))]
    pub fn compile_with_path(&self, markup: &str, path: &str) -> CompileResult<String> {
        let nodes = parse_with_path(markup, path)?;
        self.compile_tree(nodes)
    }

    /// Compile already parsed top-level nodes
    pub fn compile_tree(&self, nodes: Vec<Node>) -> CompileResult<String> {
        let mut roots: Vec<Child> = nodes.into_iter().map(Child::Node).collect();
        let compiled = self.compile_nodes(&mut roots)?;

        if !self.options.expand_helpers {
            return Ok(compiled);
        }
        expand_helpers(&compiled)
    }

    /// Compile a sequence of siblings; text runs go through the pipeline as
    /// transparent nodes.
    pub fn compile_nodes(&self, children: &mut [Child]) -> CompileResult<String> {
        let mut output = String::new();
        for_each_with_next(children, |child, next| {
            match child {
                Child::Node(node) => output.push_str(&self.compile_node(node, next)?),
                Child::Text(text) => {
                    let mut node = Node::with_key(
                        String::new(),
                        "",
                        Default::default(),
                        vec![Child::Text(text.clone())],
                    );
                    output.push_str(&self.compile_node(&mut node, None)?);
                }
            }
            Ok(())
        })?;
        Ok(output)
    }

    /// Run one node through every pass
    pub fn compile_node(&self, node: &mut Node, next_sibling: Option<&Node>) -> CompileResult<String> {
        let ctx = CompilerContext::new(self, next_sibling);
        Next::new(&self.passes).run(&ctx, node)
    }

    /// Terminal step: serialize the node as markup, compiling child nodes
    pub fn render(&self, _ctx: &CompilerContext<'_>, node: &mut Node) -> CompileResult<String> {
        let attributes = render_attributes(node);
        let mut content = String::new();
        for_each_with_next(&mut node.children, |child, next| {
            match child {
                Child::Text(text) => content.push_str(text),
                Child::Node(child) => content.push_str(&self.compile_node(child, next)?),
            }
            Ok(())
        })?;

        if node.is_transparent() {
            return Ok(content);
        }

        let kind = node.kind();
        if content.trim().is_empty() {
            debug!(kind, "empty element rendered self-closing");
            return Ok(format!("<{}{} />", kind, attributes));
        }

        Ok(format!("<{}{}>{}</{}>", kind, attributes, content, kind))
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

/// ` a="x" b=""`, or nothing when there are no attributes
fn render_attributes(node: &Node) -> String {
    node.attributes
        .iter()
        .map(|(name, value)| format!(" {}=\"{}\"", name, value.unwrap_or_default()))
        .collect()
}

/// Visit each child along with the node right after it
fn for_each_with_next<F>(children: &mut [Child], mut f: F) -> CompileResult<()>
where
    F: FnMut(&mut Child, Option<&Node>) -> CompileResult<()>,
{
    for index in 0..children.len() {
        let (head, tail) = children.split_at_mut(index + 1);
        let next = tail.first().and_then(Child::as_node);
        f(&mut head[index], next)?;
    }
    Ok(())
}

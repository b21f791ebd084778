use crate::error::{RenderError, RenderResult};
use crate::evaluator::EvalContext;
use crate::executor::Executor;
use crate::fragment::{FragmentId, FragmentKind};
use crate::helpers::{Helper, HelperRegistry};
use crate::program::Program;
use crate::session::Session;
use crate::value::Value;
use mortar_common::{read_view, FileSystem, RealFileSystem, ViewKind, ViewResolver};
use mortar_compiler::Compiler;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::{debug, instrument};

/// Runtime limits and caching
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RenderOptions {
    /// Deepest allowed component/layout nesting
    pub max_depth: usize,

    /// Iterations a single `for` loop may run
    pub max_iterations: usize,

    /// Keep compiled component, layout and view programs keyed by path
    pub cache: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            max_depth: 64,
            max_iterations: 100_000,
            cache: true,
        }
    }
}

/// Compiles and renders markup, resolving components and layouts through a
/// [`ViewResolver`].
pub struct Renderer {
    resolver: ViewResolver,
    fs: Box<dyn FileSystem>,
    compiler: Compiler,
    helpers: HelperRegistry,
    options: RenderOptions,
    cache: RefCell<HashMap<PathBuf, Rc<Program>>>,
}

impl Renderer {
    /// Renderer reading views from disk below `base_path`
    pub fn new(base_path: impl AsRef<Path>) -> Self {
        Self::with_resolver(ViewResolver::new(base_path), RealFileSystem)
    }

    pub fn with_resolver(resolver: ViewResolver, fs: impl FileSystem + 'static) -> Self {
        Self {
            resolver,
            fs: Box::new(fs),
            compiler: Compiler::new(),
            helpers: HelperRegistry::new(),
            options: RenderOptions::default(),
            cache: RefCell::new(HashMap::new()),
        }
    }

    pub fn with_options(mut self, options: RenderOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_compiler(mut self, compiler: Compiler) -> Self {
        self.compiler = compiler;
        self.clear_cache();
        self
    }

    pub fn register_helper(&mut self, helper: impl Helper + 'static) {
        self.helpers.register(helper);
    }

    pub fn helpers(&self) -> &HelperRegistry {
        &self.helpers
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    pub fn resolver(&self) -> &ViewResolver {
        &self.resolver
    }

    pub fn compiler(&self) -> &Compiler {
        &self.compiler
    }

    pub fn cached_programs(&self) -> usize {
        self.cache.borrow().len()
    }

    pub fn clear_cache(&self) {
        self.cache.borrow_mut().clear();
    }

    /// Compile markup into its intermediate form without rendering it
    pub fn compile(&self, markup: &str) -> RenderResult<String> {
        Ok(self.compiler.compile(markup)?)
    }

    /// Render markup against `data`, which must be a JSON object or null
    pub fn render(&self, markup: &str, data: serde_json::Value) -> RenderResult<String> {
        let mut session = Session::new();
        self.render_in(&mut session, markup, data)
    }

    /// Render markup using an existing session
    #[instrument(skip(self, session, markup, data), fields(len = markup.len()))]
    pub fn render_in(&self, session: &mut Session, markup: &str, data: serde_json::Value) -> RenderResult<String> {
        let mut context = context_from_data(data)?;
        let compiled = self.compiler.compile(markup)?;
        let program = Program::parse(&compiled)?;
        self.render_top_level(session, &program, &mut context)
    }

    /// Render the view source at `path`
    pub fn render_file(&self, path: impl AsRef<Path>, data: serde_json::Value) -> RenderResult<String> {
        let path = path.as_ref();
        debug!(path = %path.display(), "render file");

        let mut context = context_from_data(data)?;
        let program = self.load_program(path)?;
        let mut session = Session::new();
        self.render_top_level(&mut session, &program, &mut context)
    }

    /// Render a view by name, e.g. `login.index`
    pub fn render_view(&self, alias: &str, data: serde_json::Value) -> RenderResult<String> {
        let path = self.resolver.resolve_view(alias);
        self.render_file(path, data)
    }

    /// Render the innermost fragment as a component and pop it
    pub fn render_fragment(&self, session: &mut Session) -> RenderResult<String> {
        self.render_invocation(session, FragmentKind::Component)
    }

    /// Render the innermost fragment as a layout and pop it
    pub fn render_layout(&self, session: &mut Session) -> RenderResult<String> {
        self.render_invocation(session, FragmentKind::Layout)
    }

    /// Output of helper `name`; unknown helpers render nothing
    pub fn render_helper(&self, name: &str, args: &[Value]) -> String {
        match self.helpers.render(name, args) {
            Some(output) => output,
            None => {
                debug!(helper = name, "unknown helper, rendering nothing");
                String::new()
            }
        }
    }

    fn render_top_level(
        &self,
        session: &mut Session,
        program: &Program,
        context: &mut EvalContext,
    ) -> RenderResult<String> {
        let entry = session.depths();
        let output = self.render_unit(session, program, context, None)?;

        let depths = session.depths();
        if depths != entry {
            session.truncate(entry);
            return Err(RenderError::StackImbalance { depths });
        }
        Ok(output)
    }

    /// Run one compiled unit into its own buffer, restoring every stack to
    /// its entry depth when the unit fails.
    fn render_unit(
        &self,
        session: &mut Session,
        program: &Program,
        context: &mut EvalContext,
        active: Option<FragmentId>,
    ) -> RenderResult<String> {
        let depths = session.depths();
        session.begin_capture();

        let executor = Executor::new(self);
        if let Err(err) = executor.execute(program.ops(), session, context, active) {
            session.truncate(depths);
            return Err(err);
        }

        let output = session.end_capture()?;
        let after = session.depths();
        if after != depths {
            session.truncate(depths);
            return Err(RenderError::StackImbalance { depths: after });
        }

        Ok(output.trim_start().to_string())
    }

    fn render_invocation(&self, session: &mut Session, kind: FragmentKind) -> RenderResult<String> {
        let id = session.current_fragment()?;
        let fragment = session
            .fragment(id)
            .ok_or(RenderError::StackUnderflow { stack: "fragment" })?;

        let alias = fragment.alias.clone();
        let mut context = EvalContext::from_object(fragment.attributes.clone());
        context.set_variable("slots", fragment.slots_value());
        let view_kind = match kind {
            FragmentKind::Component => {
                context.set_variable("component", Value::String(alias.clone()));
                ViewKind::Component
            }
            FragmentKind::Layout => ViewKind::Layout,
        };

        let depth = session.enter_component();
        if depth > self.options.max_depth {
            session.leave_component();
            return Err(RenderError::RecursionLimit {
                alias,
                depth: self.options.max_depth,
            });
        }

        let path = self.resolver.resolve(&alias, view_kind);
        let result = self
            .load_program(&path)
            .and_then(|program| self.render_unit(session, &program, &mut context, Some(id)));
        session.leave_component();

        let output = result?;
        session.finish_fragment()?;
        Ok(output)
    }

    /// Compiled program for the view at `path`, from the cache when enabled
    fn load_program(&self, path: &Path) -> RenderResult<Rc<Program>> {
        if self.options.cache {
            if let Some(program) = self.cache.borrow().get(path) {
                debug!(path = %path.display(), "program cache hit");
                return Ok(Rc::clone(program));
            }
        }

        let source = read_view(path, self.fs.as_ref())?;
        let compiled = self
            .compiler
            .compile_with_path(&source, &path.to_string_lossy())?;
        let program = Rc::new(Program::parse(&compiled)?);

        if self.options.cache {
            self.cache
                .borrow_mut()
                .insert(path.to_path_buf(), Rc::clone(&program));
        }
        Ok(program)
    }
}

fn context_from_data(data: serde_json::Value) -> RenderResult<EvalContext> {
    match Value::from(data) {
        Value::Object(map) => Ok(EvalContext::from_object(map)),
        Value::Null => Ok(EvalContext::new()),
        other => Err(RenderError::InvalidData {
            message: format!("expected an object of variables, got {}", other.type_name()),
        }),
    }
}

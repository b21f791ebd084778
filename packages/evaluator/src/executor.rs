use crate::error::{RenderError, RenderResult};
use crate::evaluator::{EvalContext, Evaluator};
use crate::expr::Expr;
use crate::fragment::{FragmentId, FragmentKind};
use crate::program::Op;
use crate::renderer::Renderer;
use crate::session::Session;
use crate::value::Value;
use std::collections::BTreeMap;
use tracing::{debug, instrument};

/// Runs program ops, writing output into the session's capture buffers.
///
/// `active` is the fragment that template and slot blocks attach to: the
/// invocation whose body is running, or the component whose own source is
/// being rendered.
pub struct Executor<'r> {
    renderer: &'r Renderer,
}

impl<'r> Executor<'r> {
    pub fn new(renderer: &'r Renderer) -> Self {
        Self { renderer }
    }

    pub fn execute(
        &self,
        ops: &[Op],
        session: &mut Session,
        context: &mut EvalContext,
        active: Option<FragmentId>,
    ) -> RenderResult<()> {
        for op in ops {
            self.execute_op(op, session, context, active)?;
        }
        Ok(())
    }

    fn execute_op(
        &self,
        op: &Op,
        session: &mut Session,
        context: &mut EvalContext,
        active: Option<FragmentId>,
    ) -> RenderResult<()> {
        match op {
            Op::Text(text) => session.write(text),

            Op::Echo(expr) => {
                let value = evaluate(context, expr)?;
                session.write(&value.to_string())
            }

            Op::Eval(expr) => evaluate(context, expr).map(|_| ()),

            Op::Helper { name, arguments } => {
                let args = arguments
                    .iter()
                    .map(|argument| evaluate(context, argument))
                    .collect::<RenderResult<Vec<_>>>()?;
                let output = self.renderer.render_helper(name, &args);
                session.write(&output)
            }

            Op::If {
                branches,
                otherwise,
            } => {
                for (condition, body) in branches {
                    if evaluate(context, condition)?.is_truthy() {
                        return self.execute(body, session, context, active);
                    }
                }
                match otherwise {
                    Some(body) => self.execute(body, session, context, active),
                    None => Ok(()),
                }
            }

            Op::For { header, body } => {
                if let Some(init) = &header.init {
                    evaluate(context, init)?;
                }

                let limit = self.renderer.options().max_iterations;
                let mut iterations = 0;
                loop {
                    if let Some(condition) = &header.condition {
                        if !evaluate(context, condition)?.is_truthy() {
                            break;
                        }
                    }
                    iterations += 1;
                    if iterations > limit {
                        return Err(RenderError::IterationLimit { limit });
                    }

                    self.execute(body, session, context, active)?;

                    if let Some(step) = &header.step {
                        evaluate(context, step)?;
                    }
                }
                Ok(())
            }

            Op::Foreach { header, body } => {
                let entries: Vec<(Value, Value)> = match evaluate(context, &header.iterable)? {
                    Value::Array(items) => items
                        .into_iter()
                        .enumerate()
                        .map(|(index, item)| (Value::Number(index as f64), item))
                        .collect(),
                    Value::Object(map) => map.into_iter().map(|(key, item)| (Value::String(key), item)).collect(),
                    Value::Null => Vec::new(),
                    other => {
                        return Err(RenderError::InvalidData {
                            message: format!("cannot iterate over a {}", other.type_name()),
                        })
                    }
                };

                for (key, item) in entries {
                    if let Some(name) = &header.key {
                        context.set_variable(name.as_str(), key);
                    }
                    context.set_variable(header.value.as_str(), item);
                    self.execute(body, session, context, active)?;
                }
                Ok(())
            }

            Op::Fragment {
                kind,
                alias,
                attributes,
                body,
            } => self.invoke(*kind, alias, attributes, body, session, context),

            Op::Template { name, body } => {
                let fragment = active.ok_or(RenderError::NoActiveFragment {
                    operation: "startTemplate",
                })?;
                session.start_template(fragment, name);
                self.execute(body, session, context, active)?;
                session.end_template()
            }

            Op::Slot { name, body } => {
                let fragment = active.ok_or(RenderError::NoActiveFragment { operation: "startSlot" })?;
                session.start_slot(fragment, name);
                self.execute(body, session, context, active)?;
                let content = session.render_slot()?;
                session.write(&content)
            }
        }
    }

    /// Push the fragment, fill its templates from `body`, then render it
    #[instrument(skip(self, attributes, body, session, context))]
    fn invoke(
        &self,
        kind: FragmentKind,
        alias: &str,
        attributes: &Expr,
        body: &[Op],
        session: &mut Session,
        context: &mut EvalContext,
    ) -> RenderResult<()> {
        let attributes = match evaluate(context, attributes)? {
            Value::Object(map) => map,
            Value::Null => BTreeMap::new(),
            other => {
                return Err(RenderError::InvalidData {
                    message: format!("attributes of '{}' must be a map, got {}", alias, other.type_name()),
                })
            }
        };

        let id = match kind {
            FragmentKind::Component => session.start_fragment(alias, attributes),
            FragmentKind::Layout => session.start_layout(alias, attributes),
        };
        self.execute(body, session, context, Some(id))?;

        let output = match kind {
            FragmentKind::Component => self.renderer.render_fragment(session)?,
            FragmentKind::Layout => self.renderer.render_layout(session)?,
        };
        debug!(alias, len = output.len(), "fragment rendered");
        session.write(&output)
    }
}

fn evaluate(context: &mut EvalContext, expr: &Expr) -> RenderResult<Value> {
    Ok(Evaluator::new(context).evaluate(expr)?)
}

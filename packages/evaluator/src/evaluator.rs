use crate::builtins;
use crate::error::{EvalError, EvalResult, Span};
use crate::expr::{AssignOp, BinaryOp, Expr, UnaryOp};
use crate::expr_parser::parse_expression;
use crate::value::Value;
use std::collections::{BTreeMap, HashMap};
use tracing::warn;

/// Variables visible to one compiled unit
#[derive(Debug, Clone, Default)]
pub struct EvalContext {
    variables: HashMap<String, Value>,
}

impl EvalContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context whose variables are the entries of `map`
    pub fn from_object(map: BTreeMap<String, Value>) -> Self {
        Self {
            variables: map.into_iter().collect(),
        }
    }

    pub fn get_variable(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    pub fn set_variable(&mut self, name: impl Into<String>, value: Value) {
        self.variables.insert(name.into(), value);
    }

    pub fn has_variable(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }
}

/// Evaluates expressions against a context; assignments write back into it
pub struct Evaluator<'c> {
    context: &'c mut EvalContext,
}

/// Step of an assignment path below the root variable
enum PathKey {
    Field(String),
    Position(usize),
}

impl<'c> Evaluator<'c> {
    pub fn new(context: &'c mut EvalContext) -> Self {
        Self { context }
    }

    /// Parse and evaluate `source`
    pub fn evaluate_source(&mut self, source: &str) -> EvalResult<Value> {
        let expr = parse_expression(source)?;
        self.evaluate(&expr)
    }

    pub fn evaluate(&mut self, expr: &Expr) -> EvalResult<Value> {
        match expr {
            Expr::Literal { value, .. } => Ok(value.clone()),

            Expr::Variable { name, span } => self.context.get_variable(name).cloned().ok_or_else(|| {
                EvalError::VariableNotFound {
                    name: name.clone(),
                    span: span.clone(),
                }
            }),

            Expr::Array { items, .. } => {
                let items = items
                    .iter()
                    .map(|item| self.evaluate(item))
                    .collect::<EvalResult<Vec<_>>>()?;
                Ok(Value::Array(items))
            }

            Expr::Map { entries, .. } => {
                let mut map = BTreeMap::new();
                for (key, value) in entries {
                    map.insert(key.clone(), self.evaluate(value)?);
                }
                Ok(Value::Object(map))
            }

            Expr::Member {
                object,
                property,
                span,
            } => {
                let object = self.evaluate(object)?;
                member(&object, property, span)
            }

            Expr::Index {
                object,
                index,
                span,
            } => {
                let object = self.evaluate(object)?;
                let index = self.evaluate(index)?;
                lookup(&object, &index, span)
            }

            Expr::Call {
                function,
                arguments,
                span,
            } => {
                if !builtins::is_builtin(function) {
                    return Err(EvalError::UnknownFunction {
                        name: function.clone(),
                        span: span.clone(),
                    });
                }

                let mut args = Vec::with_capacity(arguments.len());
                for (position, argument) in arguments.iter().enumerate() {
                    // default() tolerates an undefined first argument
                    let value = if function == "default" && position == 0 {
                        self.evaluate_or_null(argument)?
                    } else {
                        self.evaluate(argument)?
                    };
                    args.push(value);
                }
                builtins::call(function, args, span.clone())
            }

            Expr::Unary {
                operator, operand, ..
            } => {
                let value = self.evaluate(operand)?;
                match operator {
                    UnaryOp::Not => Ok(Value::Bool(!value.is_truthy())),
                    UnaryOp::Negate => {
                        let n = number_operand("-", &value, &expr.span())?;
                        Ok(Value::Number(-n))
                    }
                }
            }

            Expr::Binary {
                left,
                operator,
                right,
                span,
            } => self.evaluate_binary(left, *operator, right, span),

            Expr::Conditional {
                condition,
                then,
                otherwise,
                ..
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.evaluate(then)
                } else {
                    self.evaluate(otherwise)
                }
            }

            Expr::Assign {
                target,
                operator,
                value,
                span,
            } => {
                let value = self.evaluate(value)?;
                let value = match operator {
                    AssignOp::Set => value,
                    AssignOp::Add => add(&self.evaluate(target)?, &value, span)?,
                    AssignOp::Subtract => {
                        let current = self.evaluate(target)?;
                        arithmetic(BinaryOp::Subtract, &current, &value, span)?
                    }
                };
                self.assign(target, value.clone())?;
                Ok(value)
            }

            Expr::Update {
                target,
                increment,
                prefix,
                span,
            } => {
                let current = self.evaluate(target)?;
                let old = number_operand(if *increment { "++" } else { "--" }, &current, span)?;
                let new = if *increment { old + 1.0 } else { old - 1.0 };
                self.assign(target, Value::Number(new))?;
                Ok(Value::Number(if *prefix { new } else { old }))
            }
        }
    }

    /// Null instead of an error when the expression names something undefined
    fn evaluate_or_null(&mut self, expr: &Expr) -> EvalResult<Value> {
        match self.evaluate(expr) {
            Err(err) if err.is_undefined() => Ok(Value::Null),
            result => result,
        }
    }

    fn evaluate_binary(&mut self, left: &Expr, operator: BinaryOp, right: &Expr, span: &Span) -> EvalResult<Value> {
        match operator {
            BinaryOp::And => {
                let result = self.evaluate(left)?.is_truthy() && self.evaluate(right)?.is_truthy();
                return Ok(Value::Bool(result));
            }
            BinaryOp::Or => {
                let result = self.evaluate(left)?.is_truthy() || self.evaluate(right)?.is_truthy();
                return Ok(Value::Bool(result));
            }
            BinaryOp::Coalesce => {
                let value = self.evaluate_or_null(left)?;
                if value.is_null() {
                    return self.evaluate(right);
                }
                return Ok(value);
            }
            _ => {}
        }

        let left = self.evaluate(left)?;
        let right = self.evaluate(right)?;

        match operator {
            BinaryOp::Add => add(&left, &right, span),
            BinaryOp::Subtract | BinaryOp::Multiply | BinaryOp::Divide | BinaryOp::Modulo => {
                arithmetic(operator, &left, &right, span)
            }
            BinaryOp::Equals => Ok(Value::Bool(left.loose_eq(&right))),
            BinaryOp::NotEquals => Ok(Value::Bool(!left.loose_eq(&right))),
            BinaryOp::StrictEquals => Ok(Value::Bool(left == right)),
            BinaryOp::StrictNotEquals => Ok(Value::Bool(left != right)),
            BinaryOp::LessThan
            | BinaryOp::LessThanOrEqual
            | BinaryOp::GreaterThan
            | BinaryOp::GreaterThanOrEqual => {
                let ordering = left.compare(&right).ok_or_else(|| EvalError::InvalidOperands {
                    operator: operator.symbol().to_string(),
                    details: format!("cannot compare {} with {}", left.type_name(), right.type_name()),
                    span: span.clone(),
                })?;
                Ok(Value::Bool(match operator {
                    BinaryOp::LessThan => ordering.is_lt(),
                    BinaryOp::LessThanOrEqual => ordering.is_le(),
                    BinaryOp::GreaterThan => ordering.is_gt(),
                    _ => ordering.is_ge(),
                }))
            }
            // evaluated lazily above
            BinaryOp::And => Ok(Value::Bool(left.is_truthy() && right.is_truthy())),
            BinaryOp::Or => Ok(Value::Bool(left.is_truthy() || right.is_truthy())),
            BinaryOp::Coalesce => Ok(if left.is_null() { right } else { left }),
        }
    }

    /// Store `value` at the place `target` names, creating containers on the way
    fn assign(&mut self, target: &Expr, value: Value) -> EvalResult<()> {
        let mut path = Vec::new();
        let mut cursor = target;

        let root = loop {
            match cursor {
                Expr::Variable { name, .. } => break name,
                Expr::Member {
                    object, property, ..
                } => {
                    path.push(PathKey::Field(property.clone()));
                    cursor = object;
                }
                Expr::Index {
                    object,
                    index,
                    span,
                } => {
                    let key = match self.evaluate(index)? {
                        Value::Number(n) if n >= 0.0 && n.fract() == 0.0 => PathKey::Position(n as usize),
                        Value::String(s) => PathKey::Field(s),
                        other => {
                            return Err(EvalError::type_error(
                                format!("cannot use a {} as an index", other.type_name()),
                                span.clone(),
                            ))
                        }
                    };
                    path.push(key);
                    cursor = object;
                }
                other => return Err(EvalError::InvalidAssignment { span: other.span() }),
            }
        };

        let span = target.span();
        let mut slot = self
            .context
            .variables
            .entry(root.clone())
            .or_insert(Value::Null);

        for key in path.into_iter().rev() {
            slot = match key {
                PathKey::Field(field) => {
                    if slot.is_null() {
                        *slot = Value::Object(BTreeMap::new());
                    }
                    match slot {
                        Value::Object(map) => map.entry(field).or_insert(Value::Null),
                        other => {
                            return Err(EvalError::type_error(
                                format!("cannot set field '{}' on a {}", field, other.type_name()),
                                span,
                            ))
                        }
                    }
                }
                PathKey::Position(position) => {
                    if slot.is_null() {
                        *slot = Value::Array(Vec::new());
                    }
                    let fits = matches!(&*slot, Value::Array(items) if position <= items.len());
                    if !fits {
                        return Err(EvalError::type_error(
                            format!("cannot set index {} on a {}", position, slot.type_name()),
                            span,
                        ));
                    }
                    match slot {
                        Value::Array(items) => {
                            if position == items.len() {
                                items.push(Value::Null);
                            }
                            &mut items[position]
                        }
                        other => {
                            return Err(EvalError::type_error(
                                format!("cannot set index {} on a {}", position, other.type_name()),
                                span,
                            ))
                        }
                    }
                }
            };
        }

        *slot = value;
        Ok(())
    }
}

fn member(object: &Value, property: &str, span: &Span) -> EvalResult<Value> {
    match object {
        Value::Object(map) => map.get(property).cloned().ok_or_else(|| EvalError::MemberNotFound {
            name: property.to_string(),
            span: span.clone(),
        }),
        Value::Null => Err(EvalError::MemberNotFound {
            name: property.to_string(),
            span: span.clone(),
        }),
        other => {
            warn!(property, kind = other.type_name(), "member access on non-object");
            Err(EvalError::type_error(
                format!("cannot read '{}' of a {}", property, other.type_name()),
                span.clone(),
            ))
        }
    }
}

fn lookup(object: &Value, index: &Value, span: &Span) -> EvalResult<Value> {
    let not_found = || EvalError::MemberNotFound {
        name: index.to_string(),
        span: span.clone(),
    };

    match (object, index) {
        (Value::Object(map), key) => map.get(&key.to_string()).cloned().ok_or_else(not_found),
        (Value::Array(items), Value::Number(n)) if *n >= 0.0 && n.fract() == 0.0 => {
            items.get(*n as usize).cloned().ok_or_else(not_found)
        }
        (Value::String(s), Value::Number(n)) if *n >= 0.0 && n.fract() == 0.0 => s
            .chars()
            .nth(*n as usize)
            .map(|c| Value::String(c.to_string()))
            .ok_or_else(not_found),
        (Value::Null, _) => Err(not_found()),
        (other, index) => Err(EvalError::type_error(
            format!("cannot index a {} with a {}", other.type_name(), index.type_name()),
            span.clone(),
        )),
    }
}

/// `+` concatenates as soon as either side is a string
fn add(left: &Value, right: &Value, span: &Span) -> EvalResult<Value> {
    match (left, right) {
        (Value::String(_), _) | (_, Value::String(_)) => Ok(Value::String(format!("{}{}", left, right))),
        (Value::Array(a), Value::Array(b)) => Ok(Value::Array(a.iter().chain(b).cloned().collect())),
        _ => arithmetic(BinaryOp::Add, left, right, span),
    }
}

fn arithmetic(operator: BinaryOp, left: &Value, right: &Value, span: &Span) -> EvalResult<Value> {
    let (Some(a), Some(b)) = (numeric(left), numeric(right)) else {
        return Err(EvalError::InvalidOperands {
            operator: operator.symbol().to_string(),
            details: format!("expected numbers, got {} and {}", left.type_name(), right.type_name()),
            span: span.clone(),
        });
    };

    let result = match operator {
        BinaryOp::Add => a + b,
        BinaryOp::Subtract => a - b,
        BinaryOp::Multiply => a * b,
        BinaryOp::Divide | BinaryOp::Modulo if b == 0.0 => {
            return Err(EvalError::DivisionByZero { span: span.clone() })
        }
        BinaryOp::Divide => a / b,
        _ => a % b,
    };
    Ok(Value::Number(result))
}

/// Arithmetic accepts numbers, numeric strings, booleans and null
fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Array(_) | Value::Object(_) => None,
        other => other.as_number(),
    }
}

fn number_operand(operator: &str, value: &Value, span: &Span) -> EvalResult<f64> {
    numeric(value).ok_or_else(|| EvalError::InvalidOperands {
        operator: operator.to_string(),
        details: format!("expected a number, got {}", value.type_name()),
        span: span.clone(),
    })
}

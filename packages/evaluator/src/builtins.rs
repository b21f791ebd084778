//! Functions callable from template expressions

use crate::error::{EvalError, EvalResult, Span};
use crate::value::Value;

/// Longest sequence `range()` will build
pub const MAX_RANGE_LEN: usize = 100_000;

pub const BUILTINS: &[&str] = &[
    "count", "upper", "lower", "trim", "join", "range", "escape", "json", "default",
];

pub fn is_builtin(name: &str) -> bool {
    BUILTINS.contains(&name)
}

/// Call builtin `name` with already evaluated arguments
pub fn call(name: &str, args: Vec<Value>, span: Span) -> EvalResult<Value> {
    let call = Call { name, args, span };

    match name {
        "count" => call.count(),
        "upper" => Ok(Value::String(call.text(0)?.to_uppercase())),
        "lower" => Ok(Value::String(call.text(0)?.to_lowercase())),
        "trim" => Ok(Value::String(call.text(0)?.trim().to_string())),
        "join" => call.join(),
        "range" => call.range(),
        "escape" => Ok(Value::String(escape_html(&call.text(0)?))),
        "json" => Ok(Value::String(call.arg(0)?.to_json().to_string())),
        "default" => call.default(),
        _ => Err(EvalError::UnknownFunction {
            name: name.to_string(),
            span: call.span,
        }),
    }
}

struct Call<'a> {
    name: &'a str,
    args: Vec<Value>,
    span: Span,
}

impl<'a> Call<'a> {
    fn arg(&self, index: usize) -> EvalResult<&Value> {
        self.args.get(index).ok_or_else(|| {
            EvalError::type_error(
                format!("{}() expects at least {} argument(s)", self.name, index + 1),
                self.span.clone(),
            )
        })
    }

    fn text(&self, index: usize) -> EvalResult<String> {
        Ok(self.arg(index)?.to_string())
    }

    fn number(&self, index: usize) -> EvalResult<f64> {
        let value = self.arg(index)?;
        value.as_number().ok_or_else(|| {
            EvalError::type_error(
                format!("{}() expects a number, got {}", self.name, value.type_name()),
                self.span.clone(),
            )
        })
    }

    fn count(&self) -> EvalResult<Value> {
        let len = match self.arg(0)? {
            Value::Null => 0,
            Value::Array(items) => items.len(),
            Value::Object(map) => map.len(),
            Value::String(s) => s.chars().count(),
            other => {
                return Err(EvalError::type_error(
                    format!("count() cannot count a {}", other.type_name()),
                    self.span.clone(),
                ))
            }
        };
        Ok(Value::Number(len as f64))
    }

    /// `join(items, separator = "")`
    fn join(&self) -> EvalResult<Value> {
        let separator = match self.args.get(1) {
            Some(value) => value.to_string(),
            None => String::new(),
        };
        let parts: Vec<String> = match self.arg(0)? {
            Value::Array(items) => items.iter().map(Value::to_string).collect(),
            Value::Object(map) => map.values().map(Value::to_string).collect(),
            other => vec![other.to_string()],
        };
        Ok(Value::String(parts.join(&separator)))
    }

    /// `range(start, end, step = 1)`, both ends inclusive
    fn range(&self) -> EvalResult<Value> {
        let start = self.number(0)?;
        let end = self.number(1)?;
        let step = match self.args.get(2) {
            Some(_) => self.number(2)?.abs(),
            None => 1.0,
        };
        if step == 0.0 || !step.is_finite() || !start.is_finite() || !end.is_finite() {
            return Err(EvalError::type_error("range() needs a finite, non-zero step", self.span.clone()));
        }

        let len = ((end - start).abs() / step).floor() as usize + 1;
        if len > MAX_RANGE_LEN {
            return Err(EvalError::type_error(
                format!("range() would produce {} items, the limit is {}", len, MAX_RANGE_LEN),
                self.span.clone(),
            ));
        }

        let direction = if end < start { -1.0 } else { 1.0 };
        let items = (0..len)
            .map(|i| Value::Number(start + direction * step * i as f64))
            .collect();
        Ok(Value::Array(items))
    }

    /// `default(value, fallback)`: fallback when value is null or empty
    fn default(&self) -> EvalResult<Value> {
        let value = self.arg(0)?;
        let fallback = self.arg(1)?;
        let missing = match value {
            Value::Null => true,
            Value::String(s) => s.is_empty(),
            _ => false,
        };
        Ok(if missing { fallback.clone() } else { value.clone() })
    }
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#039;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

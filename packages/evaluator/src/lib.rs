//! # Mortar Evaluator
//!
//! Runs compiled templates.
//!
//! The compiler lowers markup into text interleaved with `<% ... %>` tags.
//! This crate reads that form into a [`Program`], evaluates the embedded
//! expressions with a small expression language, and drives the
//! fragment/template/slot stacks of a [`Session`] so that components and
//! layouts can receive caller content.
//!
//! ## Usage
//!
//! ```no_run
//! use mortar_evaluator::Renderer;
//! use serde_json::json;
//!
//! let renderer = Renderer::new("/srv/site");
//! let html = renderer
//!     .render("<p :if=\"$user\">Hi {{ $user.name }}</p>", json!({"user": {"name": "Ada"}}))
//!     .unwrap();
//! assert_eq!(html, "<p>Hi Ada</p>");
//! ```
//!
//! ## Stack discipline
//!
//! Every compiled unit (the top-level markup and each component or layout
//! source) records the stack depths of its session on entry. When the unit
//! fails, everything it pushed is dropped before the error propagates, so
//! a failed render never leaves open fragments, templates, slots or capture
//! buffers behind.

pub mod builtins;
pub mod error;
pub mod evaluator;
pub mod executor;
pub mod expr;
pub mod expr_parser;
pub mod fragment;
pub mod helpers;
pub mod lexer;
pub mod program;
pub mod renderer;
pub mod session;
pub mod value;

#[cfg(test)]
mod tests_render;

#[cfg(test)]
mod tests_stacks;

pub use error::{EvalError, EvalResult, ProgramError, RenderError, RenderResult, Span};
pub use evaluator::{EvalContext, Evaluator};
pub use expr::Expr;
pub use expr_parser::parse_expression;
pub use fragment::{Fragment, FragmentId, FragmentKind};
pub use helpers::{Helper, HelperRegistry};
pub use program::{Op, Program};
pub use renderer::{RenderOptions, Renderer};
pub use session::{Session, StackDepths};
pub use value::Value;

pub mod compile;
pub mod init;
pub mod render;

pub use compile::{compile, CompileArgs};
pub use init::{init, InitArgs};
pub use render::{render, RenderArgs};

use anyhow::anyhow;
use mortar_compiler::CompileError;
use mortar_evaluator::RenderError;
use mortar_parser::error::pretty;

/// Markup parse errors get a source excerpt; everything else is shown as is
pub(crate) fn describe_compile_error(err: CompileError, file_name: &str, source: &str) -> anyhow::Error {
    match err {
        CompileError::Parse(parse) => anyhow!("\n{}", pretty::format_error(&parse, file_name, source)),
        other => anyhow!(other),
    }
}

pub(crate) fn describe_render_error(err: RenderError, file_name: &str, source: &str) -> anyhow::Error {
    match err {
        RenderError::Compile(compile) => describe_compile_error(compile, file_name, source),
        other => anyhow!(other),
    }
}

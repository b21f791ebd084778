use super::describe_compile_error;
use crate::config::Config;
use anyhow::{anyhow, Result};
use clap::Args;
use colored::Colorize;
use mortar_compiler::Compiler;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Extension of files written by `mortar compile`
pub const COMPILED_EXTENSION: &str = ".compiled";

#[derive(Debug, Args)]
pub struct CompileArgs {
    /// Directory to compile (defaults to the configured views directory)
    pub path: Option<String>,

    /// Output to stdout instead of files
    #[arg(long)]
    pub stdout: bool,

    /// Output directory (overrides config)
    #[arg(short, long)]
    pub out_dir: Option<String>,
}

/// Counts reported once every file has been attempted
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CompileSummary {
    pub compiled: usize,
    pub failed: usize,
}

pub fn compile(args: CompileArgs, cwd: &str) -> Result<()> {
    let summary = compile_views(&args, cwd)?;

    if summary.failed > 0 {
        return Err(anyhow!("{} of {} views failed to compile", summary.failed, summary.compiled + summary.failed));
    }
    Ok(())
}

pub fn compile_views(args: &CompileArgs, cwd: &str) -> Result<CompileSummary> {
    let config = Config::load(cwd)?;
    let src_dir = match &args.path {
        Some(path) => PathBuf::from(cwd).join(path),
        None => config.get_views_dir(cwd),
    };

    if !src_dir.exists() {
        return Err(anyhow!("Views directory does not exist: {}", src_dir.display()));
    }

    let extension = &config.views.extension;
    let views = find_view_files(&src_dir, extension);
    let mut summary = CompileSummary::default();

    if views.is_empty() {
        eprintln!("{} No {} files found in {}", "⚠️".yellow(), extension, src_dir.display());
        return Ok(summary);
    }

    eprintln!("{}", "🔨 Compiling Mortar views...".bright_blue().bold());
    let compiler = config.compiler();
    let out_dir = PathBuf::from(cwd).join(args.out_dir.as_deref().unwrap_or(&config.out_dir));

    for view in &views {
        let relative = view.strip_prefix(&src_dir).unwrap_or(view);
        match compile_file(&compiler, view, relative, extension, args.stdout, &out_dir) {
            Ok(destination) => {
                summary.compiled += 1;
                eprintln!("  {} {} → {}", "✓".green(), relative.display(), destination);
            }
            Err(e) => {
                summary.failed += 1;
                eprintln!("  {} {} - {}", "✗".red(), relative.display(), e.to_string().red());
            }
        }
    }

    eprintln!();
    if summary.failed == 0 {
        eprintln!("{} Compiled {} views", "✅".green(), summary.compiled);
    } else {
        eprintln!(
            "{} Compiled {} views, {} errors",
            "⚠️".yellow(),
            summary.compiled,
            summary.failed
        );
    }

    Ok(summary)
}

fn find_view_files(dir: &Path, extension: &str) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| path.to_string_lossy().ends_with(extension))
        .collect();
    files.sort();
    files
}

fn compile_file(
    compiler: &Compiler,
    file_path: &Path,
    relative: &Path,
    extension: &str,
    stdout: bool,
    out_dir: &Path,
) -> Result<String> {
    let source = fs::read_to_string(file_path)?;
    let file_name = file_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown");

    let output = compiler
        .compile_with_path(&source, &relative.to_string_lossy())
        .map_err(|e| describe_compile_error(e, file_name, &source))?;

    if stdout {
        println!("{}", output);
        return Ok("stdout".to_string());
    }

    let relative = relative.to_string_lossy();
    let stem = relative.strip_suffix(extension).unwrap_or(&relative);
    let output_file = out_dir.join(format!("{}{}", stem, COMPILED_EXTENSION));
    debug!(path = %output_file.display(), "writing compiled view");

    if let Some(parent) = output_file.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&output_file, output)?;

    Ok(output_file.display().to_string())
}

use super::describe_render_error;
use crate::config::Config;
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use mortar_common::{read_view, RealFileSystem, ViewKind};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Args)]
pub struct RenderArgs {
    /// View name (`login.index`) or path to a view file
    pub view: String,

    /// JSON file with the variables to render against
    #[arg(short, long)]
    pub data: Option<PathBuf>,

    /// Write the HTML to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub fn render(args: RenderArgs, cwd: &str) -> Result<()> {
    let html = render_to_string(&args, cwd)?;

    match &args.output {
        Some(output) => {
            let output = PathBuf::from(cwd).join(output);
            if let Some(parent) = output.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&output, html)?;
            eprintln!("{} {} → {}", "✓".green(), args.view, output.display());
        }
        None => println!("{}", html),
    }
    Ok(())
}

pub fn render_to_string(args: &RenderArgs, cwd: &str) -> Result<String> {
    let config = Config::load(cwd)?;
    let renderer = config.renderer(cwd);

    let (path, source) = match view_file(&args.view, cwd) {
        Some(path) => {
            let source = read_view(&path, &RealFileSystem)?;
            (path, source)
        }
        None => renderer
            .resolver()
            .load(&args.view, ViewKind::View, &RealFileSystem)?,
    };
    debug!(path = %path.display(), "rendering view");

    let data = match &args.data {
        Some(data) => load_data(&PathBuf::from(cwd).join(data))?,
        None => serde_json::Value::Null,
    };

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown");
    renderer
        .render(&source, data)
        .map_err(|e| describe_render_error(e, file_name, &source))
}

/// An existing file is rendered directly; anything else is a view name
fn view_file(view: &str, cwd: &str) -> Option<PathBuf> {
    let candidate = PathBuf::from(cwd).join(view);
    candidate.is_file().then_some(candidate)
}

fn load_data(path: &Path) -> Result<serde_json::Value> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Cannot read data file {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn project() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        let views = dir.path().join("app/views");
        fs::create_dir_all(views.join("components")).unwrap();
        fs::write(
            views.join("components/greeting.view.html"),
            "<p>Hello <slot>world</slot></p>",
        )
        .unwrap();
        fs::write(
            views.join("home.view.html"),
            "<main><x-greeting>{{ $name }}</x-greeting></main>",
        )
        .unwrap();
        fs::write(views.join("about.view.html"), "<p>About {{ $name ?? 'us' }}</p>").unwrap();
        fs::write(dir.path().join("data.json"), r#"{"name": "Ada"}"#).unwrap();
        dir
    }

    fn args(view: &str, data: Option<&str>) -> RenderArgs {
        RenderArgs {
            view: view.to_string(),
            data: data.map(PathBuf::from),
            output: None,
        }
    }

    #[test]
    fn test_renders_view_by_name() {
        let dir = project();
        let cwd = dir.path().display().to_string();

        let html = render_to_string(&args("home", Some("data.json")), &cwd).unwrap();
        assert_eq!(html, "<main><p>Hello Ada</p></main>");
    }

    #[test]
    fn test_renders_view_by_path() {
        let dir = project();
        let cwd = dir.path().display().to_string();

        let html = render_to_string(&args("app/views/about.view.html", None), &cwd).unwrap();
        assert_eq!(html, "<p>About us</p>");

        let html = render_to_string(&args("app/views/about.view.html", Some("data.json")), &cwd).unwrap();
        assert_eq!(html, "<p>About Ada</p>");
    }

    #[test]
    fn test_component_file_is_not_a_view() {
        let dir = project();
        let cwd = dir.path().display().to_string();

        let err = render_to_string(&args("app/views/components/greeting.view.html", None), &cwd).unwrap_err();
        assert!(err.to_string().contains("startSlot"), "{}", err);
    }

    #[test]
    fn test_writes_output_file() {
        let dir = project();
        let cwd = dir.path().display().to_string();

        let mut args = args("home", Some("data.json"));
        args.output = Some(PathBuf::from("public/index.html"));
        render(args, &cwd).unwrap();

        let written = fs::read_to_string(dir.path().join("public/index.html")).unwrap();
        assert_eq!(written, "<main><p>Hello Ada</p></main>");
    }

    #[test]
    fn test_missing_view() {
        let dir = project();
        let cwd = dir.path().display().to_string();

        let err = render_to_string(&args("nowhere", None), &cwd).unwrap_err();
        assert!(err.to_string().starts_with("View not found"));
    }

    #[test]
    fn test_missing_data_file() {
        let dir = project();
        let cwd = dir.path().display().to_string();

        let err = render_to_string(&args("home", Some("missing.json")), &cwd).unwrap_err();
        assert!(err.to_string().contains("Cannot read data file"));
    }
}

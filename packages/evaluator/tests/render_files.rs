use mortar_evaluator::{RenderError, Renderer};
use serde_json::json;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn project() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();

    write(
        root,
        "app/views/components/button.view.html",
        r#"<button type="{{ $type }}"><slot #icon></slot><slot>Default Button</slot></button>"#,
    );
    write(
        root,
        "app/views/layouts/default.view.html",
        "<html><head><title>{{ $title ?? 'Example Title' }}</title></head><body><slot></slot></body></html>",
    );
    write(
        root,
        "app/views/home.view.html",
        concat!(
            "<x-layout::default>\n",
            "  <ul><li :foreach=\"$links as $link\">{{ $link }}</li></ul>\n",
            "  <x-button type=\"submit\">Go</x-button>\n",
            "</x-layout::default>\n"
        ),
    );
    dir
}

#[test]
fn renders_view_from_disk() {
    let dir = project();
    let renderer = Renderer::new(dir.path());

    let output = renderer
        .render_view("home", json!({"links": ["a", "b"]}))
        .unwrap();

    assert!(output.starts_with("<html><head><title>Example Title</title></head><body><ul>"));
    assert!(output.contains("<li>a</li><li>b</li>"));
    assert!(output.contains(r#"<button type="submit">Go</button>"#));
    assert!(output.ends_with("</body></html>"));
}

#[test]
fn renders_file_by_path() {
    let dir = project();
    let renderer = Renderer::new(dir.path());
    let path = dir.path().join("app/views/components/button.view.html");

    let output = renderer.render_file(&path, json!({"type": "reset"})).unwrap();
    assert_eq!(output, r#"<button type="reset">Default Button</button>"#);
}

#[test]
fn edits_are_seen_once_the_cache_is_cleared() {
    let dir = project();
    let renderer = Renderer::new(dir.path());

    let before = renderer.render(r#"<x-button type="a" />"#, json!({})).unwrap();
    assert_eq!(before, r#"<button type="a">Default Button</button>"#);

    write(
        dir.path(),
        "app/views/components/button.view.html",
        r#"<a role="button" data-type="{{ $type }}"><slot></slot></a>"#,
    );
    let cached = renderer.render(r#"<x-button type="a" />"#, json!({})).unwrap();
    assert_eq!(cached, before);

    renderer.clear_cache();
    let after = renderer.render(r#"<x-button type="a" />"#, json!({})).unwrap();
    assert_eq!(after, r#"<a role="button" data-type="a"></a>"#);
}

#[test]
fn missing_file_is_view_not_found() {
    let dir = project();
    let renderer = Renderer::new(dir.path());

    let err = renderer.render_file("invalid-file", json!({})).unwrap_err();
    assert!(matches!(err, RenderError::ViewNotFound { .. }));
    assert!(err.to_string().contains("invalid-file"));
}

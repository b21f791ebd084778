//! Stack bookkeeping across successful and failing renders

use crate::{EvalError, RenderError, RenderOptions, Renderer, Session};
use mortar_common::{MockFileSystem, ViewResolver};
use serde_json::json;
use std::collections::BTreeMap;

fn renderer() -> Renderer {
    let fs = MockFileSystem::new()
        .with_file(
            "/site/app/views/components/panel.view.html",
            r#"<section><header><slot #header></slot></header><x-label text="{{ $title }}"><slot></slot></x-label></section>"#,
        )
        .with_file(
            "/site/app/views/components/label.view.html",
            "<em>{{ $text }}</em>",
        )
        .with_file(
            "/site/app/views/components/broken.view.html",
            "<p><slot></slot>{{ 1 / 0 }}</p>",
        )
        .with_file(
            "/site/app/views/components/recursive.view.html",
            "<div><x-recursive /></div>",
        )
        .with_file(
            "/site/app/views/layouts/page.view.html",
            "<body><x-panel title=\"Inner\"><slot></slot></x-panel></body>",
        );
    Renderer::with_resolver(ViewResolver::new("/site"), fs)
}

#[test]
fn test_nested_render_leaves_stacks_empty() {
    let renderer = renderer();
    let mut session = Session::new();

    let output = renderer
        .render_in(
            &mut session,
            r#"<x-panel title="Stats"><template #header><h1>Header</h1></template><template>ignored</template></x-panel>"#,
            json!({}),
        )
        .unwrap();

    assert_eq!(output, "<section><header><h1>Header</h1></header><em>Stats</em></section>");
    assert!(session.depths().is_empty());
    assert_eq!(session.nesting(), 0);
}

#[test]
fn test_layout_wrapping_components() {
    let renderer = renderer();
    let mut session = Session::new();

    let output = renderer
        .render_in(&mut session, "<x-layout::page>body</x-layout::page>", json!({}))
        .unwrap();

    assert_eq!(output, "<body><section><header></header><em>Inner</em></section></body>");
    assert!(session.depths().is_empty());
}

#[test]
fn test_failing_component_unwinds() {
    let renderer = renderer();
    let mut session = Session::new();

    let err = renderer
        .render_in(&mut session, "<div><x-broken>content</x-broken></div>", json!({}))
        .unwrap_err();

    assert!(matches!(err, RenderError::Eval(EvalError::DivisionByZero { .. })));
    assert!(session.depths().is_empty());
    assert_eq!(session.nesting(), 0);
}

#[test]
fn test_failing_template_body_unwinds() {
    let renderer = renderer();
    let mut session = Session::new();

    let err = renderer
        .render_in(&mut session, r#"<x-panel title="t">{{ $nope }}</x-panel>"#, json!({}))
        .unwrap_err();

    assert!(matches!(err, RenderError::Eval(EvalError::VariableNotFound { .. })));
    assert!(session.depths().is_empty());
}

#[test]
fn test_session_is_reusable_after_failure() {
    let renderer = renderer();
    let mut session = Session::new();

    assert!(renderer.render_in(&mut session, "<x-broken />", json!({})).is_err());

    let output = renderer
        .render_in(&mut session, r#"<x-label text="ok" />"#, json!({}))
        .unwrap();
    assert_eq!(output, "<em>ok</em>");
    assert!(session.depths().is_empty());
}

#[test]
fn test_recursion_limit() {
    let renderer = renderer().with_options(RenderOptions {
        max_depth: 4,
        ..RenderOptions::default()
    });
    let mut session = Session::new();

    let err = renderer.render_in(&mut session, "<x-recursive />", json!({})).unwrap_err();

    match err {
        RenderError::RecursionLimit { alias, depth } => {
            assert_eq!(alias, "x-recursive");
            assert_eq!(depth, 4);
        }
        other => panic!("expected RecursionLimit, got {:?}", other),
    }
    assert!(session.depths().is_empty());
    assert_eq!(session.nesting(), 0);
}

#[test]
fn test_iteration_limit() {
    let renderer = renderer().with_options(RenderOptions {
        max_iterations: 10,
        ..RenderOptions::default()
    });

    let err = renderer
        .render(r#"<p :for="$i = 0; true; $i++">{{ $i }}</p>"#, json!({}))
        .unwrap_err();
    assert!(matches!(err, RenderError::IterationLimit { limit: 10 }));

    let output = renderer
        .render(r#"<i :for="$i = 0; $i < 10; $i++">.</i>"#, json!({}))
        .unwrap();
    assert_eq!(output.matches("<i>").count(), 10);
}

#[test]
fn test_slot_outside_component() {
    let err = renderer().render("<slot>fallback</slot>", json!({})).unwrap_err();
    assert!(matches!(err, RenderError::NoActiveFragment { operation: "startSlot" }));
}

#[test]
fn test_template_outside_component() {
    let mut session = Session::new();
    let err = renderer()
        .render_in(&mut session, "<div><template #a>x</template></div>", json!({}))
        .unwrap_err();

    assert!(matches!(err, RenderError::NoActiveFragment { operation: "startTemplate" }));
    assert!(session.depths().is_empty());
}

#[test]
fn test_data_must_be_an_object() {
    let err = renderer().render("<p />", json!([1, 2])).unwrap_err();
    assert!(matches!(err, RenderError::InvalidData { .. }));
    assert!(err.to_string().contains("array"));
}

#[test]
fn test_missing_nested_component_unwinds() {
    let fs = MockFileSystem::new().with_file(
        "/site/app/views/components/outer.view.html",
        "<div><x-inner /></div>",
    );
    let renderer = Renderer::with_resolver(ViewResolver::new("/site"), fs);
    let mut session = Session::new();

    let err = renderer.render_in(&mut session, "<x-outer />", json!({})).unwrap_err();

    assert!(matches!(err, RenderError::ViewNotFound { .. }));
    assert!(session.depths().is_empty());
}

#[test]
fn test_render_inside_open_fragment_keeps_caller_entries() {
    let renderer = renderer();
    let mut session = Session::new();
    session.begin_capture();
    let outer = session.start_fragment("x-outer", BTreeMap::new());
    let entry = session.depths();

    let output = renderer
        .render_in(&mut session, r#"<p><x-label text="inner" /></p>"#, json!({}))
        .unwrap();
    assert_eq!(output, "<p><em>inner</em></p>");
    assert_eq!(session.depths(), entry);

    assert!(renderer
        .render_in(&mut session, "<x-broken>content</x-broken>", json!({}))
        .is_err());
    assert_eq!(session.depths(), entry);
    assert_eq!(session.current_fragment().unwrap(), outer);
}

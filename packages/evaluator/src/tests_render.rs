use crate::{Helper, RenderError, RenderOptions, Renderer, Value};
use mortar_common::{MockFileSystem, ViewResolver};
use serde_json::json;

const BUTTON: &str =
    r#"<button type="{{ $type }}"><slot #icon></slot><slot>Default Button</slot></button>"#;

const DEFAULT_LAYOUT: &str =
    "<html><head><title>Example Title</title></head><body><slot></slot></body></html>";

const TITLED_LAYOUT: &str =
    "<html><head><title>{{ $title }}</title></head><body><slot></slot></body></html>";

const NAVBAR_LAYOUT: &str = concat!(
    "<html><head><title>Example Title</title></head>",
    "<body><slot #navbar></slot><slot>Default Content</slot></body></html>"
);

fn fixtures() -> MockFileSystem {
    MockFileSystem::new()
        .with_file("/app/app/views/components/button.view.html", BUTTON)
        .with_file(
            "/app/app/views/components/badge.view.html",
            r#"<span class="badge">{{ $component }}: <slot>none</slot></span>"#,
        )
        .with_file(
            "/app/app/views/components/card.view.html",
            r#"<div class="card"><h2><slot #title>Untitled</slot></h2><x-button type="{{ $kind }}">Open</x-button></div>"#,
        )
        .with_file(
            "/app/app/views/components/shop/price.view.html",
            "<b>{{ $amount }} {{ default($currency, 'EUR') }}</b>",
        )
        .with_file(
            "/app/app/views/components/named.view.html",
            "<i>{{ join($slots, ',') }}</i>",
        )
        .with_file("/app/app/views/layouts/default.view.html", DEFAULT_LAYOUT)
        .with_file("/app/app/views/layouts/titled.view.html", TITLED_LAYOUT)
        .with_file("/app/app/views/layouts/navbar.view.html", NAVBAR_LAYOUT)
        .with_file(
            "/app/app/views/login/index.view.html",
            "<x-layout::titled title=\"Login\"><form>{{ $user }}</form></x-layout::titled>",
        )
}

fn renderer() -> Renderer {
    Renderer::with_resolver(ViewResolver::new("/app"), fixtures())
}

fn renders(markup: &str, data: serde_json::Value, expected: &str) {
    let output = renderer().render(markup, data).expect("render failed");
    assert_eq!(output, expected, "rendering {}", markup);
}

#[test]
fn test_renders_plain_markup() {
    renders("<div></div>", json!({}), "<div />");
    renders("<span>{{ 'Hello' }}</span>", json!({}), "<span>Hello</span>");
    renders(r#"<input type="{{ 'button' }}" />"#, json!({}), r#"<input type="button" />"#);
}

#[test]
fn test_renders_variables() {
    renders(
        r#"<a href="/users/{{ $user.id }}">{{ upper($user.name) }}</a>"#,
        json!({"user": {"id": 7, "name": "ada"}}),
        r#"<a href="/users/7">ADA</a>"#,
    );
}

#[test]
fn test_null_data_is_an_empty_scope() {
    renders("<p>{{ $missing ?? 'fallback' }}</p>", serde_json::Value::Null, "<p>fallback</p>");
}

#[test]
fn test_renders_conditionals() {
    let markup = concat!(
        "<div>",
        r#"<span :if="$counter === 0">Counter is 0</span>"#,
        r#"<span :else-if="$counter === 1">Counter is 1</span>"#,
        r#"<span :else>Counter is 2</span>"#,
        "</div>"
    );

    renders(markup, json!({"counter": 0}), "<div><span>Counter is 0</span></div>");
    renders(markup, json!({"counter": 1}), "<div><span>Counter is 1</span></div>");
    renders(markup, json!({"counter": 2}), "<div><span>Counter is 2</span></div>");
}

#[test]
fn test_if_else() {
    let markup = r#"<div><span :if="$counter === 0">Zero</span><span :else>Other</span></div>"#;

    renders(markup, json!({"counter": 0}), "<div><span>Zero</span></div>");
    renders(markup, json!({"counter": 5}), "<div><span>Other</span></div>");
}

#[test]
fn test_undefined_condition_is_falsy() {
    renders(r#"<p :if="$flag">shown</p><p :else>hidden</p>"#, json!({}), "<p>hidden</p>");
}

#[test]
fn test_renders_for_loops() {
    renders(
        r#"<span :for="$i = 1; $i <= 3; $i++">Item {{ $i }}</span>"#,
        json!({}),
        "<span>Item 1</span><span>Item 2</span><span>Item 3</span>",
    );
}

#[test]
fn test_renders_foreach_loops() {
    renders(
        r#"<span :foreach="$items as $item">Item {{ $item }}</span>"#,
        json!({"items": [1, 2, 3]}),
        "<span>Item 1</span><span>Item 2</span><span>Item 3</span>",
    );
}

#[test]
fn test_foreach_with_keys() {
    renders(
        r#"<li :foreach="$prices as $name => $price">{{ $name }}={{ $price }}</li>"#,
        json!({"prices": {"apple": 1.5, "pear": 2}}),
        "<li>apple=1.5</li><li>pear=2</li>",
    );
    renders(
        r#"<li :foreach="$items as $i => $item">{{ $i + 1 }}. {{ $item }}</li>"#,
        json!({"items": ["a", "b"]}),
        "<li>1. a</li><li>2. b</li>",
    );
}

#[test]
fn test_foreach_over_null_renders_nothing() {
    renders(r#"<ul><li :foreach="$items as $item">{{ $item }}</li></ul>"#, json!({"items": null}), "<ul></ul>");
}

#[test]
fn test_renders_components() {
    renders(
        r#"<x-button type="default" />"#,
        json!({}),
        r#"<button type="default">Default Button</button>"#,
    );
    renders(
        "<x-button type='danger' />",
        json!({}),
        r#"<button type="danger">Default Button</button>"#,
    );
}

#[test]
fn test_renders_component_with_slot_content() {
    renders(
        r#"<x-button type="default">Button Text</x-button>"#,
        json!({}),
        r#"<button type="default">Button Text</button>"#,
    );
}

#[test]
fn test_renders_component_with_explicit_template() {
    renders(
        r#"<x-button type="default"><template>Button Text</template></x-button>"#,
        json!({}),
        r#"<button type="default">Button Text</button>"#,
    );
}

#[test]
fn test_renders_component_with_named_template() {
    renders(
        r#"<x-button type="default"><template #icon><p>Icon</p></template></x-button>"#,
        json!({}),
        r#"<button type="default"><p>Icon</p>Default Button</button>"#,
    );
}

#[test]
fn test_component_attributes_are_evaluated_by_caller() {
    renders(
        r#"<x-button type="{{ $kind }}">{{ $label }}</x-button>"#,
        json!({"kind": "submit", "label": "Save"}),
        r#"<button type="submit">Save</button>"#,
    );
}

#[test]
fn test_component_scope() {
    renders("<x-badge>new</x-badge>", json!({}), r#"<span class="badge">x-badge: new</span>"#);
    renders("<x-badge />", json!({}), r#"<span class="badge">x-badge: none</span>"#);
}

#[test]
fn test_component_does_not_see_caller_variables() {
    let err = renderer()
        .render("<x-shop.price />", json!({"amount": 3}))
        .unwrap_err();
    assert!(matches!(
        err,
        RenderError::Eval(crate::EvalError::VariableNotFound { ref name, .. }) if name == "amount"
    ));
}

#[test]
fn test_dotted_component_alias() {
    renders(
        r#"<x-shop.price amount="{{ 4 }}" currency="USD" />"#,
        json!({}),
        "<b>4 USD</b>",
    );
}

#[test]
fn test_slots_variable() {
    renders(
        "<x-named><template #a>1</template><template #b>2</template></x-named>",
        json!({}),
        "<i>1,2</i>",
    );
}

#[test]
fn test_nested_components() {
    renders(
        r#"<x-card kind="link"><template #title>Docs</template></x-card>"#,
        json!({}),
        r#"<div class="card"><h2>Docs</h2><button type="link">Open</button></div>"#,
    );
    renders(
        r#"<x-card kind="link" />"#,
        json!({}),
        r#"<div class="card"><h2>Untitled</h2><button type="link">Open</button></div>"#,
    );
}

#[test]
fn test_component_inside_loop() {
    renders(
        r#"<x-button :foreach="$types as $type" type="{{ $type }}">{{ $type }}</x-button>"#,
        json!({"types": ["a", "b"]}),
        r#"<button type="a">a</button><button type="b">b</button>"#,
    );
}

#[test]
fn test_renders_default_layout() {
    renders(
        "<x-layout::default>\n<h1>Title</h1>\n</x-layout::default>",
        json!({}),
        "<html><head><title>Example Title</title></head><body><h1>Title</h1></body></html>",
    );
}

#[test]
fn test_renders_layout_with_attributes() {
    renders(
        "<x-layout::titled title=\"Testing\">\n<h1>Title</h1>\n</x-layout::titled>",
        json!({}),
        "<html><head><title>Testing</title></head><body><h1>Title</h1></body></html>",
    );
}

#[test]
fn test_renders_layout_with_named_template() {
    renders(
        "<x-layout::navbar><template #navbar><h1>Navigation</h1></template></x-layout::navbar>",
        json!({}),
        "<html><head><title>Example Title</title></head><body><h1>Navigation</h1>Default Content</body></html>",
    );
}

#[test]
fn test_renders_layout_with_named_and_default_templates() {
    renders(
        concat!(
            "<x-layout::navbar>",
            "<template #navbar><h1>Navigation</h1></template>",
            "<template><h1>Custom Title</h1></template>",
            "</x-layout::navbar>"
        ),
        json!({}),
        concat!(
            "<html><head><title>Example Title</title></head>",
            "<body><h1>Navigation</h1><h1>Custom Title</h1></body></html>"
        ),
    );
}

#[test]
fn test_layout_scope_has_no_component_variable() {
    let fs = MockFileSystem::new().with_file(
        "/app/app/views/layouts/bare.view.html",
        "<main>{{ $component ?? 'layout' }}</main>",
    );
    let renderer = Renderer::with_resolver(ViewResolver::new("/app"), fs);

    assert_eq!(
        renderer.render("<x-layout::bare />", json!({})).unwrap(),
        "<main>layout</main>"
    );
}

#[test]
fn test_render_view_by_name() {
    let output = renderer()
        .render_view("login.index", json!({"user": "ada"}))
        .unwrap();
    assert_eq!(
        output,
        "<html><head><title>Login</title></head><body><form>ada</form></body></html>"
    );
}

#[test]
fn test_missing_component() {
    let err = renderer().render("<x-missing />", json!({})).unwrap_err();
    match err {
        RenderError::ViewNotFound { path } => {
            assert_eq!(path.to_string_lossy(), "/app/app/views/components/missing.view.html");
        }
        other => panic!("expected ViewNotFound, got {:?}", other),
    }
}

#[test]
fn test_missing_view_file() {
    let err = renderer().render_file("invalid-file", json!({})).unwrap_err();
    assert!(matches!(err, RenderError::ViewNotFound { .. }));
}

#[test]
fn test_block_closer_in_component_body_is_rejected() {
    let err = renderer()
        .render("<x-button>{{ renderSlot() }}</x-button><p>after</p>", json!({}))
        .unwrap_err();
    assert!(matches!(
        err,
        RenderError::Compile(mortar_compiler::CompileError::ReservedCall { .. })
    ));
}

#[test]
fn test_builtin_helpers() {
    renders(
        r#"<head>@keywords("rust", "templates")@robots</head>"#,
        json!({}),
        r#"<head><meta name="keywords" content="rust, templates" /><meta name="robots" content="" /></head>"#,
    );
    renders(
        r#"<head>@description($summary)</head>"#,
        json!({"summary": "A shop"}),
        r#"<head><meta name="description" content="A shop" /></head>"#,
    );
}

#[test]
fn test_helpers_after_empty_script_and_style() {
    renders(
        r#"<head><script src="app.js"></script>@description("Shop")</head>"#,
        json!({}),
        r#"<head><script src="app.js" /><meta name="description" content="Shop" /></head>"#,
    );
    renders(
        r#"<head><style></style>@robots("noindex")</head>"#,
        json!({}),
        r#"<head><style /><meta name="robots" content="noindex" /></head>"#,
    );
}

#[test]
fn test_unknown_helper_renders_nothing() {
    renders("<p>[@analytics()]</p>", json!({}), "<p>[]</p>");
    renders("<p>mail@analytics.dev</p>", json!({}), "<p>mail@analytics.dev</p>");
}

struct Greeting;

impl Helper for Greeting {
    fn tag(&self) -> &str {
        "greet"
    }

    fn render(&self, args: &[Value]) -> String {
        let name = args.first().map(Value::to_string).unwrap_or_default();
        format!("Hello, {}!", name)
    }
}

#[test]
fn test_custom_helper() {
    let mut renderer = renderer();
    renderer.register_helper(Greeting);

    assert_eq!(
        renderer.render(r#"<p>@greet("Ada")</p>"#, json!({})).unwrap(),
        "<p>Hello, Ada!</p>"
    );
}

#[test]
fn test_escape_builtin() {
    renders(
        "<p>{{ escape($input) }}</p>",
        json!({"input": "<b>\"hi\" & 'bye'</b>"}),
        "<p>&lt;b&gt;&quot;hi&quot; &amp; &#039;bye&#039;&lt;/b&gt;</p>",
    );
}

#[test]
fn test_expression_builtins() {
    renders(
        "<p>{{ count($items) }} {{ join(range(1, 3), '-') }} {{ json($items) }}</p>",
        json!({"items": ["a", "b"]}),
        r#"<p>2 1-2-3 ["a","b"]</p>"#,
    );
}

#[test]
fn test_programs_are_cached_by_path() {
    let renderer = renderer();
    renderer.render(r#"<x-button type="a" /><x-button type="b" />"#, json!({})).unwrap();
    assert_eq!(renderer.cached_programs(), 1);

    renderer.render(r#"<x-card kind="c" />"#, json!({})).unwrap();
    assert_eq!(renderer.cached_programs(), 2);

    renderer.clear_cache();
    assert_eq!(renderer.cached_programs(), 0);
}

#[test]
fn test_cache_can_be_disabled() {
    let renderer = renderer().with_options(RenderOptions {
        cache: false,
        ..RenderOptions::default()
    });

    let output = renderer.render(r#"<x-button type="a" />"#, json!({})).unwrap();
    assert_eq!(output, r#"<button type="a">Default Button</button>"#);
    assert_eq!(renderer.cached_programs(), 0);
}

#[test]
fn test_compile_only() {
    assert_eq!(
        renderer().compile("<p>{{ $name }}</p>").unwrap(),
        "<p><%= $name %></p>"
    );
}

use mortar_parser::{parse, Child, Cursor, ParseError};

#[test]
fn fails_given_empty_template() {
    assert_eq!(parse("").unwrap_err(), ParseError::EmptyTemplate);
    assert_eq!(parse(" \n\t ").unwrap_err(), ParseError::EmptyTemplate);
}

#[test]
fn fails_given_only_comments() {
    assert_eq!(
        parse("<!-- nothing here -->").unwrap_err(),
        ParseError::NoRootElement
    );
}

#[test]
fn returns_node_of_same_html_type() {
    let nodes = parse("<div></div>").unwrap();

    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[0].kind(), "div");
}

#[test]
fn returns_node_with_text_child_content() {
    let nodes = parse("<span>Text</span>").unwrap();

    assert_eq!(nodes[0].kind(), "span");
    assert!(nodes[0].has_children());
    assert_eq!(nodes[0].children[0].as_text(), Some("Text"));
}

#[test]
fn returns_node_with_node_child_content() {
    let nodes = parse("<div><span>Text</span></div>").unwrap();

    let span = nodes[0].children[0].as_node().unwrap();
    assert_eq!(nodes[0].kind(), "div");
    assert_eq!(span.kind(), "span");
    assert_eq!(span.children[0].as_text(), Some("Text"));
}

#[test]
fn returns_attributes_from_node() {
    let nodes = parse("<span style='red'>Text</span>").unwrap();

    assert_eq!(nodes[0].attribute("style"), Some(Some("red")));
}

#[test]
fn returns_last_duplicate_attribute() {
    let nodes = parse("<span style='red' class='a' style='green'>Text</span>").unwrap();

    assert_eq!(nodes[0].attribute("style"), Some(Some("green")));
    assert_eq!(nodes[0].attributes.names().collect::<Vec<_>>(), vec!["style", "class"]);
}

#[test]
fn skips_comments() {
    let nodes = parse("<div><!-- Some comment --></div>").unwrap();

    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[0].kind(), "div");
    assert!(nodes[0].children.is_empty());
}

#[test]
fn skips_empty_text_nodes() {
    let nodes = parse("<div>\t</div>").unwrap();

    assert_eq!(nodes.len(), 1);
    assert!(nodes[0].children.is_empty());
}

#[test]
fn keeps_mixed_content_in_order() {
    let nodes = parse("<p>Hello <b>World</b>!</p>").unwrap();
    let children = &nodes[0].children;

    assert_eq!(children.len(), 3);
    assert_eq!(children[0].as_text(), Some("Hello "));
    assert!(matches!(&children[1], Child::Node(node) if node.kind() == "b"));
    assert_eq!(children[2].as_text(), Some("!"));
}

#[test]
fn parses_directive_and_slot_attributes() {
    let nodes = parse(
        r#"<x-layout::navbar><template #navbar><h1 :if="$a === 'b'">Nav</h1></template></x-layout::navbar>"#,
    )
    .unwrap();

    let template = nodes[0].children[0].as_node().unwrap();
    let heading = template.children[0].as_node().unwrap();
    assert_eq!(nodes[0].kind(), "x-layout::navbar");
    assert_eq!(template.attribute("#navbar"), Some(None));
    assert_eq!(heading.attribute(":if"), Some(Some("$a === 'b'")));
}

#[test]
fn siblings_are_derived_from_the_parent() {
    let nodes = parse("<div><p :if=\"$a\"></p><p :else></p></div>").unwrap();
    let root = Cursor::new(&nodes[0]);
    let children = root.children();

    let next = children[0].next_sibling().unwrap();
    assert!(next.node().has_attribute(":else"));
    assert_eq!(next.parent().unwrap().node().key(), nodes[0].key());
}

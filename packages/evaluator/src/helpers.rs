//! Helper tags (`@description(...)`, `@keywords(...)`, `@robots(...)`)

use crate::value::Value;
use std::collections::BTreeMap;

/// A named snippet producer callable as `@tag(args)` from markup
pub trait Helper {
    fn tag(&self) -> &str;

    fn render(&self, args: &[Value]) -> String;
}

pub struct HelperRegistry {
    helpers: BTreeMap<String, Box<dyn Helper>>,
}

impl HelperRegistry {
    /// Registry without any helpers
    pub fn empty() -> Self {
        Self {
            helpers: BTreeMap::new(),
        }
    }

    /// Registry with the built-in meta tag helpers
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register(Description);
        registry.register(Keywords);
        registry.register(Robots);
        registry
    }

    /// Add `helper`, replacing any helper with the same tag
    pub fn register(&mut self, helper: impl Helper + 'static) {
        self.helpers.insert(helper.tag().to_string(), Box::new(helper));
    }

    pub fn get(&self, tag: &str) -> Option<&dyn Helper> {
        self.helpers.get(tag).map(|helper| helper.as_ref())
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.helpers.contains_key(tag)
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.helpers.keys().map(String::as_str)
    }

    /// Output of helper `tag`, or `None` when nothing is registered under it
    pub fn render(&self, tag: &str, args: &[Value]) -> Option<String> {
        self.get(tag).map(|helper| helper.render(args))
    }
}

impl Default for HelperRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// `<meta name="description" content="..." />`
pub struct Description;

impl Helper for Description {
    fn tag(&self) -> &str {
        "description"
    }

    fn render(&self, args: &[Value]) -> String {
        let content = args.first().map(Value::to_string).unwrap_or_default();
        meta("description", &content)
    }
}

/// `<meta name="keywords" content="a, b" />`
pub struct Keywords;

impl Helper for Keywords {
    fn tag(&self) -> &str {
        "keywords"
    }

    fn render(&self, args: &[Value]) -> String {
        meta("keywords", &flatten(args).join(", "))
    }
}

/// `<meta name="robots" content="noindex, nofollow" />`
pub struct Robots;

impl Helper for Robots {
    fn tag(&self) -> &str {
        "robots"
    }

    fn render(&self, args: &[Value]) -> String {
        meta("robots", &flatten(args).join(", "))
    }
}

fn meta(name: &str, content: &str) -> String {
    format!(r#"<meta name="{}" content="{}" />"#, name, content)
}

/// Arguments as strings; arrays contribute their items
fn flatten(args: &[Value]) -> Vec<String> {
    let mut items = Vec::new();
    for arg in args {
        match arg {
            Value::Array(values) => items.extend(values.iter().map(Value::to_string)),
            other => items.push(other.to_string()),
        }
    }
    items
}

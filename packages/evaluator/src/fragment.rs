use crate::value::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Handle of a fragment inside a [`Session`](crate::session::Session)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FragmentId(pub(crate) usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentKind {
    Component,
    Layout,
}

impl FragmentKind {
    pub fn start_call(self) -> &'static str {
        match self {
            FragmentKind::Component => "startFragment",
            FragmentKind::Layout => "startLayout",
        }
    }

    pub fn render_call(self) -> &'static str {
        match self {
            FragmentKind::Component => "renderFragment",
            FragmentKind::Layout => "renderLayout",
        }
    }
}

impl fmt::Display for FragmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FragmentKind::Component => write!(f, "component"),
            FragmentKind::Layout => write!(f, "layout"),
        }
    }
}

/// One component or layout invocation
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    pub alias: String,
    pub kind: FragmentKind,
    /// Attribute values from the invocation site
    pub attributes: BTreeMap<String, Value>,
    /// Rendered caller content per template name
    pub slots: BTreeMap<String, String>,
}

impl Fragment {
    pub fn new(alias: impl Into<String>, kind: FragmentKind, attributes: BTreeMap<String, Value>) -> Self {
        Self {
            alias: alias.into(),
            kind,
            attributes,
            slots: BTreeMap::new(),
        }
    }

    pub fn assign_slot(&mut self, name: impl Into<String>, content: impl Into<String>) {
        self.slots.insert(name.into(), content.into());
    }

    /// Caller content for `name`, if any was given
    pub fn slot(&self, name: &str) -> Option<&str> {
        self.slots
            .get(name)
            .map(String::as_str)
            .filter(|content| !content.is_empty())
    }

    /// `slots` variable bound inside the fragment's own source
    pub fn slots_value(&self) -> Value {
        Value::Object(
            self.slots
                .iter()
                .map(|(name, content)| (name.clone(), Value::String(content.clone())))
                .collect(),
        )
    }
}

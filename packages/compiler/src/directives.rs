//! Attribute directives (`:if`, `:else-if`, `:else`, `:for`, `:foreach`).
//!
//! A directive turns one attribute into a template wrapped around the
//! compiled node. The template holds a single [`BODY_MARKER`] where the node
//! (and any directives applied after this one) ends up.

use crate::context::CompilerContext;
use std::collections::HashMap;

/// Placeholder for the wrapped node inside a directive template
pub const BODY_MARKER: &str = "<!-- [[ BODY-CONTENT ]] -->";

/// Whether a directive attribute takes a value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentPolicy {
    /// Supplying a value is an error
    None,
    Optional,
    /// Omitting the value is an error
    Required,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Directive {
    Conditional,
    Loop,
}

impl Directive {
    pub const ALL: [Directive; 2] = [Directive::Conditional, Directive::Loop];

    /// Attribute names handled by this directive, without the sigil
    pub fn attributes(self) -> &'static [(&'static str, ArgumentPolicy)] {
        match self {
            Directive::Conditional => &[
                ("if", ArgumentPolicy::Required),
                ("else-if", ArgumentPolicy::Required),
                ("else", ArgumentPolicy::None),
            ],
            Directive::Loop => &[
                ("for", ArgumentPolicy::Required),
                ("foreach", ArgumentPolicy::Required),
            ],
        }
    }

    /// Template for `name` (sigil stripped) containing one body marker
    pub fn expand(self, ctx: &CompilerContext<'_>, name: &str, value: Option<&str>) -> String {
        let value = value.unwrap_or_default();
        let (prologue, epilogue) = match (self, name) {
            (Directive::Conditional, "if") => (format!("<% if (({}) ?? false) %>", value), "<% endif %>"),
            (Directive::Conditional, "else-if") => {
                (format!("<% elseif (({}) ?? false) %>", value), "<% endif %>")
            }
            (Directive::Conditional, _) => ("<% else %>".to_string(), "<% endif %>"),
            (Directive::Loop, "for") => (format!("<% for ({}) %>", value), "<% endfor %>"),
            (Directive::Loop, _) => (format!("<% foreach ({}) %>", value), "<% endforeach %>"),
        };

        let epilogue = match self {
            Directive::Conditional if !closes_conditional(ctx) => "",
            _ => epilogue,
        };

        format!("{}{}{}", prologue, BODY_MARKER, epilogue)
    }
}

/// The chain ends here unless the next sibling continues it
fn closes_conditional(ctx: &CompilerContext<'_>) -> bool {
    let Some(next) = ctx.next_sibling else {
        return true;
    };

    let prefix = &ctx.options().directive_prefix;
    !next.attributes.names().any(|name| {
        name.strip_prefix(prefix.as_str())
            .is_some_and(|name| name == "else-if" || name == "else")
    })
}

/// Registered directive attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectiveEntry {
    pub directive: Directive,
    /// Attribute name without the sigil
    pub name: &'static str,
    pub policy: ArgumentPolicy,
}

/// Lookup from full attribute name to its directive, built once per compiler
#[derive(Debug, Clone)]
pub struct DirectiveTable {
    entries: HashMap<String, DirectiveEntry>,
}

impl DirectiveTable {
    pub fn new(prefix: &str) -> Self {
        let mut entries = HashMap::new();
        for directive in Directive::ALL {
            for &(name, policy) in directive.attributes() {
                entries.insert(
                    format!("{}{}", prefix, name),
                    DirectiveEntry {
                        directive,
                        name,
                        policy,
                    },
                );
            }
        }
        Self { entries }
    }

    pub fn get(&self, attribute: &str) -> Option<&DirectiveEntry> {
        self.entries.get(attribute)
    }

    pub fn contains(&self, attribute: &str) -> bool {
        self.entries.contains_key(attribute)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

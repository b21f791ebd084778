//! Render-time stack machine.
//!
//! A [`Session`] lives for one top-level render call. It owns four LIFO
//! stacks:
//!
//! - fragments, pushed by `start_fragment`/`start_layout` and dropped once
//!   the component or layout has rendered (a [`FragmentId`] is the
//!   fragment's position on this stack);
//! - template blocks, `{name, fragment}` pairs closed by `end_template`;
//! - slots, `{name, fragment}` pairs closed by `render_slot`;
//! - capture buffers, the output targets of the compiled unit, template or
//!   slot currently running.

use crate::error::{RenderError, RenderResult};
use crate::fragment::{Fragment, FragmentId, FragmentKind};
use crate::value::Value;
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// Stack heights at one point of a render
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StackDepths {
    pub fragments: usize,
    pub templates: usize,
    pub slots: usize,
    pub buffers: usize,
}

impl StackDepths {
    pub fn is_empty(&self) -> bool {
        *self == StackDepths::default()
    }
}

impl fmt::Display for StackDepths {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "fragments={}, templates={}, slots={}, buffers={}",
            self.fragments, self.templates, self.slots, self.buffers
        )
    }
}

#[derive(Debug, Clone)]
struct Frame {
    name: String,
    fragment: FragmentId,
}

#[derive(Debug, Default)]
pub struct Session {
    fragments: Vec<Fragment>,
    template_stack: Vec<Frame>,
    slot_stack: Vec<Frame>,
    buffers: Vec<String>,
    nesting: usize,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depths(&self) -> StackDepths {
        StackDepths {
            fragments: self.fragments.len(),
            templates: self.template_stack.len(),
            slots: self.slot_stack.len(),
            buffers: self.buffers.len(),
        }
    }

    /// Drop every entry pushed since `depths` was taken
    pub fn truncate(&mut self, depths: StackDepths) {
        let current = self.depths();
        if current != depths {
            debug!(from = %current, to = %depths, "unwinding render stacks");
        }
        self.fragments.truncate(depths.fragments);
        self.template_stack.truncate(depths.templates);
        self.slot_stack.truncate(depths.slots);
        self.buffers.truncate(depths.buffers);
    }

    pub fn fragment(&self, id: FragmentId) -> Option<&Fragment> {
        self.fragments.get(id.0)
    }

    pub fn start_fragment(&mut self, alias: &str, attributes: BTreeMap<String, Value>) -> FragmentId {
        self.push_fragment(Fragment::new(alias, FragmentKind::Component, attributes))
    }

    pub fn start_layout(&mut self, alias: &str, attributes: BTreeMap<String, Value>) -> FragmentId {
        self.push_fragment(Fragment::new(alias, FragmentKind::Layout, attributes))
    }

    fn push_fragment(&mut self, fragment: Fragment) -> FragmentId {
        let id = FragmentId(self.fragments.len());
        debug!(alias = %fragment.alias, kind = %fragment.kind, depth = id.0 + 1, "start fragment");
        self.fragments.push(fragment);
        id
    }

    /// Innermost fragment that has not rendered yet
    pub fn current_fragment(&self) -> RenderResult<FragmentId> {
        match self.fragments.len() {
            0 => Err(RenderError::StackUnderflow { stack: "fragment" }),
            len => Ok(FragmentId(len - 1)),
        }
    }

    /// Pop the innermost fragment once it has rendered
    pub fn finish_fragment(&mut self) -> RenderResult<Fragment> {
        self.fragments
            .pop()
            .ok_or(RenderError::StackUnderflow { stack: "fragment" })
    }

    /// Capture caller content for template `name` of `fragment`
    pub fn start_template(&mut self, fragment: FragmentId, name: &str) {
        self.template_stack.push(Frame {
            name: name.to_string(),
            fragment,
        });
        self.begin_capture();
    }

    /// Stop capturing and store the trimmed content on the fragment
    pub fn end_template(&mut self) -> RenderResult<()> {
        let frame = self
            .template_stack
            .pop()
            .ok_or(RenderError::StackUnderflow { stack: "template" })?;
        let content = self.end_capture()?;

        if let Some(fragment) = self.fragments.get_mut(frame.fragment.0) {
            debug!(alias = %fragment.alias, template = %frame.name, "assign template");
            fragment.assign_slot(frame.name, content.trim());
        }
        Ok(())
    }

    /// Capture the default body of slot `name` of `fragment`
    pub fn start_slot(&mut self, fragment: FragmentId, name: &str) {
        self.slot_stack.push(Frame {
            name: name.to_string(),
            fragment,
        });
        self.begin_capture();
    }

    /// Stop capturing; caller content wins over the captured default
    pub fn render_slot(&mut self) -> RenderResult<String> {
        let frame = self
            .slot_stack
            .pop()
            .ok_or(RenderError::StackUnderflow { stack: "slot" })?;
        let default = self.end_capture()?;

        let provided = self
            .fragment(frame.fragment)
            .and_then(|fragment| fragment.slot(&frame.name))
            .map(str::to_string);
        Ok(provided.unwrap_or_else(|| default.trim().to_string()))
    }

    pub fn begin_capture(&mut self) {
        self.buffers.push(String::new());
    }

    pub fn end_capture(&mut self) -> RenderResult<String> {
        self.buffers
            .pop()
            .ok_or(RenderError::StackUnderflow { stack: "buffer" })
    }

    /// Append to the innermost capture buffer
    pub fn write(&mut self, text: &str) -> RenderResult<()> {
        let buffer = self
            .buffers
            .last_mut()
            .ok_or(RenderError::StackUnderflow { stack: "buffer" })?;
        buffer.push_str(text);
        Ok(())
    }

    /// Component nesting of the call in progress
    pub fn nesting(&self) -> usize {
        self.nesting
    }

    pub(crate) fn enter_component(&mut self) -> usize {
        self.nesting += 1;
        self.nesting
    }

    pub(crate) fn leave_component(&mut self) {
        self.nesting = self.nesting.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_assigns_trimmed_content() {
        let mut session = Session::new();
        let id = session.start_fragment("x-card", BTreeMap::new());

        session.start_template(id, "title");
        session.write("  Hello  ").unwrap();
        session.end_template().unwrap();

        assert_eq!(session.fragment(id).unwrap().slot("title"), Some("Hello"));
        assert_eq!(session.finish_fragment().unwrap().alias, "x-card");
        assert!(session.depths().is_empty());
        assert!(session.fragment(id).is_none());
    }

    #[test]
    fn test_finished_fragments_are_released() {
        let mut session = Session::new();
        let outer = session.start_fragment("x-list", BTreeMap::new());

        for _ in 0..1_000 {
            let item = session.start_fragment("x-item", BTreeMap::new());
            assert_eq!(session.current_fragment().unwrap(), item);
            session.finish_fragment().unwrap();
        }

        assert_eq!(session.depths().fragments, 1);
        assert_eq!(session.current_fragment().unwrap(), outer);
        assert_eq!(session.fragment(outer).unwrap().alias, "x-list");
    }

    #[test]
    fn test_slot_prefers_caller_content() {
        let mut session = Session::new();
        let id = session.start_fragment("x-button", BTreeMap::new());
        session.start_template(id, "default");
        session.write("Save").unwrap();
        session.end_template().unwrap();

        session.start_slot(id, "default");
        session.write("Default Button").unwrap();
        assert_eq!(session.render_slot().unwrap(), "Save");

        session.start_slot(id, "icon");
        session.write(" fallback ").unwrap();
        assert_eq!(session.render_slot().unwrap(), "fallback");
    }

    #[test]
    fn test_empty_caller_content_falls_back() {
        let mut session = Session::new();
        let id = session.start_fragment("x-button", BTreeMap::new());
        session.start_template(id, "default");
        session.write("   ").unwrap();
        session.end_template().unwrap();

        session.start_slot(id, "default");
        session.write("Default Button").unwrap();
        assert_eq!(session.render_slot().unwrap(), "Default Button");
    }

    #[test]
    fn test_underflow() {
        let mut session = Session::new();
        assert!(matches!(session.end_template(), Err(RenderError::StackUnderflow { stack: "template" })));
        assert!(matches!(session.render_slot(), Err(RenderError::StackUnderflow { stack: "slot" })));
        assert!(matches!(session.finish_fragment(), Err(RenderError::StackUnderflow { stack: "fragment" })));
        assert!(matches!(session.write("x"), Err(RenderError::StackUnderflow { stack: "buffer" })));
    }

    #[test]
    fn test_truncate_restores_depths() {
        let mut session = Session::new();
        session.begin_capture();
        let before = session.depths();

        let id = session.start_layout("x-layout::default", BTreeMap::new());
        session.start_template(id, "default");
        session.start_slot(id, "nav");
        assert_eq!(
            session.depths(),
            StackDepths {
                fragments: 1,
                templates: 1,
                slots: 1,
                buffers: 3
            }
        );

        session.truncate(before);
        assert_eq!(session.depths(), before);
        assert_eq!(before.to_string(), "fragments=0, templates=0, slots=0, buffers=1");
    }
}

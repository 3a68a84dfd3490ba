//! Scripted in-memory backend for engine tests.
//!
//! Elements are registered with the exact selector strings the code under
//! test will query, plus a behavior describing how they react to
//! interaction. Every operation is recorded so tests can assert on the
//! precise sequence of backend calls.

#![allow(dead_code)]

use async_trait::async_trait;
use formpilot_engine::backend::{
    Backend, BackendError, ElementSnapshot, ElementState, NavigationResult, NodeId,
};
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    Navigate(String),
    Click(NodeId),
    ClickJs(NodeId),
    SynthesizeClick(NodeId),
    Type(NodeId, String),
    Press(NodeId, String),
    Clear(NodeId),
    Focus(NodeId),
    ScrollIntoView(NodeId),
    SelectOption(NodeId, String),
    SetFiles(NodeId, String),
    DispatchChange(NodeId),
    ForceVisible(NodeId),
    Script(String),
    ScrollToBottom,
    ScrollToTop,
}

#[derive(Debug, Clone)]
pub enum Behavior {
    /// Reacts to nothing.
    Inert,
    /// `clear` empties the value, `type_text` appends to it.
    TextInput,
    /// Ignores all input; the value never changes.
    StubbornTextInput,
    /// `set_files` stores a fakepath value.
    FileInput,
    /// Natural and programmatic clicks toggle `checked`.
    Checkbox,
    /// Clicking checks this radio and unchecks its group.
    Radio { group: String },
    /// `select_option` marks the matching option child selected.
    SelectControl,
    /// Keyboard-driven widget: opens on click, commits on Enter only when
    /// the typed text is in `commit_on`.
    Combobox {
        commit_on: Vec<String>,
        committed_label: String,
        typed: String,
    },
    /// Clicking advances the backend to the next page of elements.
    NextButton,
    /// Refuses natural clicks when `fail_natural` is set.
    ClickTarget { fail_natural: bool },
}

#[derive(Debug, Clone)]
pub struct El {
    tag: String,
    text: Option<String>,
    value: Option<String>,
    attrs: HashMap<String, String>,
    visible: bool,
    disabled: bool,
    checked: bool,
    selected: bool,
    expanded: Option<bool>,
    selectors: Vec<String>,
    parent: Option<NodeId>,
    /// `Some(step)` restricts the element to one wizard step.
    page: Option<usize>,
    /// Present in the document only while the referenced element reports
    /// an expanded popup.
    present_if_expanded: Option<NodeId>,
    behavior: Behavior,
}

impl El {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            text: None,
            value: None,
            attrs: HashMap::new(),
            visible: true,
            disabled: false,
            checked: false,
            selected: false,
            expanded: None,
            selectors: Vec::new(),
            parent: None,
            page: None,
            present_if_expanded: None,
            behavior: Behavior::Inert,
        }
    }

    pub fn sel(mut self, selector: &str) -> Self {
        self.selectors.push(selector.to_string());
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = Some(text.to_string());
        self
    }

    pub fn value(mut self, value: &str) -> Self {
        self.value = Some(value.to_string());
        self
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.insert(name.to_string(), value.to_string());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    pub fn checked(mut self) -> Self {
        self.checked = true;
        self
    }

    pub fn expanded(mut self, value: bool) -> Self {
        self.expanded = Some(value);
        self
    }

    pub fn parent(mut self, node: NodeId) -> Self {
        self.parent = Some(node);
        self
    }

    pub fn page(mut self, step: usize) -> Self {
        self.page = Some(step);
        self
    }

    pub fn present_if_expanded(mut self, owner: NodeId) -> Self {
        self.present_if_expanded = Some(owner);
        self
    }

    pub fn behavior(mut self, behavior: Behavior) -> Self {
        self.behavior = behavior;
        self
    }
}

struct MockElement {
    node: NodeId,
    el: El,
}

#[derive(Default)]
pub struct MockBackend {
    elements: Vec<MockElement>,
    pub ops: Vec<Op>,
    pub current_page: usize,
    next_node: NodeId,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            elements: Vec::new(),
            ops: Vec::new(),
            current_page: 0,
            next_node: 0,
        }
    }

    pub fn add(&mut self, el: El) -> NodeId {
        self.next_node += 1;
        let node = self.next_node;
        self.elements.push(MockElement { node, el });
        node
    }

    pub fn clicks_on(&self, node: NodeId) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, Op::Click(n) | Op::ClickJs(n) if *n == node))
            .count()
    }

    pub fn typed_into(&self, node: NodeId) -> Vec<&str> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                Op::Type(n, text) if *n == node => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn value_of(&self, node: NodeId) -> Option<String> {
        self.get(node).and_then(|m| m.el.value.clone())
    }

    fn get(&self, node: NodeId) -> Option<&MockElement> {
        self.elements.iter().find(|m| m.node == node)
    }

    fn get_mut(&mut self, node: NodeId) -> Option<&mut MockElement> {
        self.elements.iter_mut().find(|m| m.node == node)
    }

    fn present(&self, m: &MockElement) -> bool {
        if m.el.page.is_some_and(|p| p != self.current_page) {
            return false;
        }
        if let Some(owner) = m.el.present_if_expanded {
            return self
                .get(owner)
                .is_some_and(|o| o.el.expanded == Some(true));
        }
        true
    }

    fn snapshot(&self, m: &MockElement) -> ElementSnapshot {
        ElementSnapshot {
            node: m.node,
            tag: m.el.tag.clone(),
            text: m.el.text.clone(),
            value: m.el.value.clone(),
            attributes: m.el.attrs.clone(),
            state: ElementState {
                visible: m.el.visible,
                disabled: m.el.disabled,
                checked: m.el.checked,
                selected: m.el.selected,
                expanded: m.el.expanded,
            },
        }
    }

    fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = self.get(node).and_then(|m| m.el.parent);
        while let Some(p) = current {
            if p == ancestor {
                return true;
            }
            current = self.get(p).and_then(|m| m.el.parent);
        }
        false
    }

    fn apply_click(&mut self, node: NodeId) {
        let behavior = match self.get(node) {
            Some(m) => m.el.behavior.clone(),
            None => return,
        };
        match behavior {
            Behavior::Checkbox => {
                if let Some(m) = self.get_mut(node) {
                    m.el.checked = !m.el.checked;
                }
            }
            Behavior::Radio { group } => {
                for m in &mut self.elements {
                    if let Behavior::Radio { group: g } = &m.el.behavior
                        && *g == group
                    {
                        m.el.checked = m.node == node;
                    }
                }
            }
            Behavior::Combobox { .. } => {
                if let Some(m) = self.get_mut(node) {
                    m.el.expanded = Some(true);
                }
            }
            Behavior::NextButton => {
                self.current_page += 1;
            }
            _ => {}
        }
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn navigate(&mut self, url: &str) -> Result<NavigationResult, BackendError> {
        self.ops.push(Op::Navigate(url.to_string()));
        Ok(NavigationResult {
            url: url.to_string(),
            title: "Mock".to_string(),
        })
    }

    async fn query(&mut self, selector: &str) -> Result<Vec<ElementSnapshot>, BackendError> {
        Ok(self
            .elements
            .iter()
            .filter(|m| self.present(m) && m.el.selectors.iter().any(|s| s == selector))
            .map(|m| self.snapshot(m))
            .collect())
    }

    async fn query_within(
        &mut self,
        node: NodeId,
        selector: &str,
    ) -> Result<Vec<ElementSnapshot>, BackendError> {
        Ok(self
            .elements
            .iter()
            .filter(|m| {
                self.present(m)
                    && self.is_ancestor(node, m.node)
                    && m.el.selectors.iter().any(|s| s == selector)
            })
            .map(|m| self.snapshot(m))
            .collect())
    }

    async fn parent(&mut self, node: NodeId) -> Result<Option<ElementSnapshot>, BackendError> {
        Ok(self
            .get(node)
            .and_then(|m| m.el.parent)
            .and_then(|p| self.get(p))
            .map(|m| self.snapshot(m)))
    }

    async fn closest(
        &mut self,
        node: NodeId,
        selector: &str,
    ) -> Result<Option<ElementSnapshot>, BackendError> {
        let mut current = Some(node);
        while let Some(n) = current {
            let Some(m) = self.get(n) else { break };
            if m.el.selectors.iter().any(|s| s == selector) {
                return Ok(Some(self.snapshot(m)));
            }
            current = m.el.parent;
        }
        Ok(None)
    }

    async fn refresh(&mut self, node: NodeId) -> Result<Option<ElementSnapshot>, BackendError> {
        Ok(self
            .get(node)
            .filter(|m| self.present(m))
            .map(|m| self.snapshot(m)))
    }

    async fn click(&mut self, node: NodeId) -> Result<(), BackendError> {
        self.ops.push(Op::Click(node));
        if let Some(m) = self.get(node)
            && let Behavior::ClickTarget { fail_natural: true } = m.el.behavior
        {
            return Err(BackendError::Script("click intercepted".into()));
        }
        self.apply_click(node);
        Ok(())
    }

    async fn click_js(&mut self, node: NodeId) -> Result<(), BackendError> {
        self.ops.push(Op::ClickJs(node));
        self.apply_click(node);
        Ok(())
    }

    async fn synthesize_click(&mut self, node: NodeId) -> Result<(), BackendError> {
        self.ops.push(Op::SynthesizeClick(node));
        self.apply_click(node);
        Ok(())
    }

    async fn type_text(&mut self, node: NodeId, text: &str) -> Result<(), BackendError> {
        self.ops.push(Op::Type(node, text.to_string()));
        let Some(m) = self.get_mut(node) else {
            return Ok(());
        };
        match &mut m.el.behavior {
            Behavior::TextInput => {
                let mut value = m.el.value.take().unwrap_or_default();
                value.push_str(text);
                m.el.value = Some(value);
            }
            Behavior::Combobox { typed, .. } => {
                typed.push_str(text);
            }
            _ => {}
        }
        Ok(())
    }

    async fn press_key(&mut self, node: NodeId, key: &str) -> Result<(), BackendError> {
        self.ops.push(Op::Press(node, key.to_string()));
        let Some(m) = self.get_mut(node) else {
            return Ok(());
        };
        if key == "Enter"
            && let Behavior::Combobox {
                commit_on,
                committed_label,
                typed,
            } = &mut m.el.behavior
        {
            if commit_on.iter().any(|c| c == typed) {
                m.el.value = Some(committed_label.clone());
                m.el.expanded = Some(false);
            } else {
                m.el.value = Some(String::new());
            }
            typed.clear();
        }
        Ok(())
    }

    async fn clear(&mut self, node: NodeId) -> Result<(), BackendError> {
        self.ops.push(Op::Clear(node));
        if let Some(m) = self.get_mut(node) {
            match &mut m.el.behavior {
                Behavior::TextInput => m.el.value = Some(String::new()),
                Behavior::Combobox { typed, .. } => {
                    typed.clear();
                    m.el.value = Some(String::new());
                }
                _ => {}
            }
        }
        Ok(())
    }

    async fn focus(&mut self, node: NodeId) -> Result<(), BackendError> {
        self.ops.push(Op::Focus(node));
        Ok(())
    }

    async fn scroll_into_view(&mut self, node: NodeId) -> Result<(), BackendError> {
        self.ops.push(Op::ScrollIntoView(node));
        Ok(())
    }

    async fn select_option(&mut self, node: NodeId, value: &str) -> Result<(), BackendError> {
        self.ops.push(Op::SelectOption(node, value.to_string()));
        if let Some(m) = self.get_mut(node) {
            m.el.value = Some(value.to_string());
        }
        let children: Vec<NodeId> = self
            .elements
            .iter()
            .filter(|m| m.el.parent == Some(node) && m.el.tag == "option")
            .map(|m| m.node)
            .collect();
        for child in children {
            if let Some(m) = self.get_mut(child) {
                m.el.selected = m.el.attrs.get("value").map(String::as_str) == Some(value);
            }
        }
        Ok(())
    }

    async fn set_files(&mut self, node: NodeId, path: &Path) -> Result<(), BackendError> {
        self.ops.push(Op::SetFiles(node, path.display().to_string()));
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if let Some(m) = self.get_mut(node)
            && matches!(m.el.behavior, Behavior::FileInput)
        {
            m.el.value = Some(format!("C:\\fakepath\\{}", file_name));
        }
        Ok(())
    }

    async fn dispatch_change(&mut self, node: NodeId) -> Result<(), BackendError> {
        self.ops.push(Op::DispatchChange(node));
        Ok(())
    }

    async fn force_visible(&mut self, node: NodeId) -> Result<(), BackendError> {
        self.ops.push(Op::ForceVisible(node));
        if let Some(m) = self.get_mut(node) {
            m.el.visible = true;
        }
        Ok(())
    }

    async fn execute_script(&mut self, script: &str) -> Result<serde_json::Value, BackendError> {
        self.ops.push(Op::Script(script.to_string()));
        Ok(serde_json::Value::Null)
    }

    async fn page_height(&mut self) -> Result<f64, BackendError> {
        Ok(1000.0)
    }

    async fn scroll_to_bottom(&mut self) -> Result<(), BackendError> {
        self.ops.push(Op::ScrollToBottom);
        Ok(())
    }

    async fn scroll_to_top(&mut self) -> Result<(), BackendError> {
        self.ops.push(Op::ScrollToTop);
        Ok(())
    }
}

//! The browser-session seam.
//!
//! The engine never talks to a browser directly; everything goes through
//! the [`Backend`] trait, which models an already-connected automation
//! session: element lookup by CSS selector, interaction primitives, and
//! script injection for auxiliary DOM queries. Backends assign a numeric
//! handle to every element they return; handles stay valid until the next
//! navigation.

use async_trait::async_trait;
pub use formpilot_common::error::BackendError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Backend-assigned element handle.
pub type NodeId = u64;

#[derive(Debug, Clone)]
pub struct NavigationResult {
    pub url: String,
    pub title: String,
}

/// Point-in-time view of one DOM element.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementSnapshot {
    pub node: NodeId,
    /// Lowercase tag name ("input", "select", ...).
    pub tag: String,
    #[serde(default)]
    pub text: Option<String>,
    /// Current value for form controls.
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub attributes: HashMap<String, String>,
    #[serde(default)]
    pub state: ElementState,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ElementState {
    /// Rendered with non-zero dimensions and not display:none /
    /// visibility:hidden.
    pub visible: bool,
    pub disabled: bool,
    pub checked: bool,
    pub selected: bool,
    /// `aria-expanded`, when the element reports one.
    pub expanded: Option<bool>,
}

impl ElementSnapshot {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn id_attr(&self) -> Option<&str> {
        self.attr("id").filter(|s| !s.is_empty())
    }

    pub fn is_interactable(&self) -> bool {
        self.state.visible && !self.state.disabled
    }

    pub fn is_required(&self) -> bool {
        self.attributes.contains_key("required") || self.attr("aria-required") == Some("true")
    }

    /// Trimmed visible text, if any.
    pub fn text_trimmed(&self) -> Option<&str> {
        self.text.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

/// An already-connected browser session.
///
/// Provisioning, anti-detection and process lifecycle are the backend's
/// concern; the engine only requires the operations below. All methods
/// take `&mut self`: a session is driven by exactly one scanner or engine
/// at a time.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn navigate(&mut self, url: &str) -> Result<NavigationResult, BackendError>;

    /// All elements currently matching `selector`, in document order.
    async fn query(&mut self, selector: &str) -> Result<Vec<ElementSnapshot>, BackendError>;

    /// Elements matching `selector` among the descendants of `node`.
    async fn query_within(
        &mut self,
        node: NodeId,
        selector: &str,
    ) -> Result<Vec<ElementSnapshot>, BackendError>;

    async fn parent(&mut self, node: NodeId) -> Result<Option<ElementSnapshot>, BackendError>;

    /// Nearest ancestor (including `node` itself) matching `selector`.
    async fn closest(
        &mut self,
        node: NodeId,
        selector: &str,
    ) -> Result<Option<ElementSnapshot>, BackendError>;

    /// Re-read the current state of a previously returned element.
    /// `None` once the element has left the document.
    async fn refresh(&mut self, node: NodeId) -> Result<Option<ElementSnapshot>, BackendError>;

    /// Natural click (trusted input event).
    async fn click(&mut self, node: NodeId) -> Result<(), BackendError>;

    /// Programmatic click dispatched directly on the element.
    async fn click_js(&mut self, node: NodeId) -> Result<(), BackendError>;

    /// Simulated pointerdown/mousedown/mouseup/click event sequence, for
    /// targets that intercept natural clicks.
    async fn synthesize_click(&mut self, node: NodeId) -> Result<(), BackendError>;

    /// Type text into the element (focuses it first).
    async fn type_text(&mut self, node: NodeId, text: &str) -> Result<(), BackendError>;

    /// Press a named key ("Enter", "Escape", "Tab") with the element
    /// focused.
    async fn press_key(&mut self, node: NodeId, key: &str) -> Result<(), BackendError>;

    /// Clear the element's current value.
    async fn clear(&mut self, node: NodeId) -> Result<(), BackendError>;

    async fn focus(&mut self, node: NodeId) -> Result<(), BackendError>;

    async fn scroll_into_view(&mut self, node: NodeId) -> Result<(), BackendError>;

    /// Select an option of a native `<select>` by underlying value, firing
    /// a change event.
    async fn select_option(&mut self, node: NodeId, value: &str) -> Result<(), BackendError>;

    /// Assign a local file to a file input.
    async fn set_files(&mut self, node: NodeId, path: &Path) -> Result<(), BackendError>;

    /// Dispatch a bubbling `change` event on the element. Some widgets only
    /// react to the event, not to the value assignment itself.
    async fn dispatch_change(&mut self, node: NodeId) -> Result<(), BackendError>;

    /// Style-mutate a hidden element until it accepts interaction (used for
    /// file inputs buried in styled upload widgets).
    async fn force_visible(&mut self, node: NodeId) -> Result<(), BackendError> {
        let _ = node;
        Err(BackendError::NotSupported("force_visible".into()))
    }

    /// Evaluate a script in the page and return its JSON result.
    async fn execute_script(&mut self, script: &str) -> Result<serde_json::Value, BackendError>;

    /// Current scrollable document height in pixels.
    async fn page_height(&mut self) -> Result<f64, BackendError> {
        let value = self
            .execute_script("document.body ? document.body.scrollHeight : 0")
            .await?;
        Ok(value.as_f64().unwrap_or(0.0))
    }

    async fn scroll_to_bottom(&mut self) -> Result<(), BackendError> {
        self.execute_script("window.scrollTo(0, document.body.scrollHeight)")
            .await?;
        Ok(())
    }

    async fn scroll_to_top(&mut self) -> Result<(), BackendError> {
        self.execute_script("window.scrollTo(0, 0)").await?;
        Ok(())
    }
}

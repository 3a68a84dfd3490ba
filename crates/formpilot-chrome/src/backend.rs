//! `Backend` implementation over a CDP-driven Chromium.
//!
//! DOM lookups and programmatic interaction go through the injected helper
//! script (`helper.js`), which keeps a page-side element registry addressed
//! by numeric handles. Trusted input — clicks, typing, key presses — is
//! dispatched through the CDP `Input` domain so widgets that distinguish
//! synthetic events from real ones behave as they would for a user.

use crate::cdp::CdpClient;
use crate::inject::ensure_helper;
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::dom::SetFileInputFilesParams;
use chromiumoxide::cdp::browser_protocol::input::{
    DispatchKeyEventParams, DispatchKeyEventType, DispatchMouseEventParams,
    DispatchMouseEventType, InsertTextParams, MouseButton,
};
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use formpilot_engine::backend::{
    Backend, BackendError, ElementSnapshot, NavigationResult, NodeId,
};
use std::path::Path;

pub struct ChromeBackend {
    client: Option<CdpClient>,
    visible: bool,
}

impl ChromeBackend {
    pub fn new() -> Self {
        Self {
            client: None,
            visible: false,
        }
    }

    pub fn new_with_visibility(visible: bool) -> Self {
        Self {
            client: None,
            visible,
        }
    }

    pub async fn launch(&mut self) -> Result<(), BackendError> {
        tracing::info!("Launching Chromium backend...");
        let client = CdpClient::launch(self.visible)
            .await
            .map_err(|e| BackendError::Other(e.to_string()))?;
        self.client = Some(client);
        Ok(())
    }

    pub async fn close(&mut self) -> Result<(), BackendError> {
        if let Some(client) = self.client.take() {
            client
                .close()
                .await
                .map_err(|e| BackendError::Other(e.to_string()))?;
        }
        Ok(())
    }

    fn client(&mut self) -> Result<&mut CdpClient, BackendError> {
        self.client.as_mut().ok_or(BackendError::NotReady)
    }

    /// Evaluate a helper call and return its JSON result.
    async fn call(&mut self, expr: String) -> Result<serde_json::Value, BackendError> {
        let client = self.client()?;
        ensure_helper(&client.page)
            .await
            .map_err(|e| BackendError::Script(e.to_string()))?;
        let result = client
            .page
            .evaluate(expr.as_str())
            .await
            .map_err(|e| BackendError::Script(e.to_string()))?;
        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }

    async fn call_snapshots(&mut self, expr: String) -> Result<Vec<ElementSnapshot>, BackendError> {
        let value = self.call(expr).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn call_snapshot(
        &mut self,
        expr: String,
    ) -> Result<Option<ElementSnapshot>, BackendError> {
        let value = self.call(expr).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Viewport-space center of an element, for trusted mouse input.
    async fn center_of(&mut self, node: NodeId) -> Result<(f64, f64), BackendError> {
        let value = self
            .call(format!("window.__formpilot.center({node})"))
            .await?;
        let x = value.get("x").and_then(serde_json::Value::as_f64);
        let y = value.get("y").and_then(serde_json::Value::as_f64);
        match (x, y) {
            (Some(x), Some(y)) => Ok((x, y)),
            _ => Err(BackendError::Script(format!(
                "element {node} has left the document"
            ))),
        }
    }

    async fn mouse_event(
        &mut self,
        kind: DispatchMouseEventType,
        x: f64,
        y: f64,
    ) -> Result<(), BackendError> {
        let params = DispatchMouseEventParams::builder()
            .r#type(kind)
            .x(x)
            .y(y)
            .button(MouseButton::Left)
            .click_count(1)
            .build()
            .map_err(|e| BackendError::Other(format!("Failed to build mouse event: {:?}", e)))?;
        let client = self.client()?;
        client
            .page
            .execute(params)
            .await
            .map_err(|e| BackendError::Script(format!("mouse event failed: {}", e)))?;
        Ok(())
    }

    async fn key_event(
        &mut self,
        kind: DispatchKeyEventType,
        key: &str,
    ) -> Result<(), BackendError> {
        let mut builder = DispatchKeyEventParams::builder().r#type(kind.clone()).key(key);
        if let Some(code) = virtual_key_code(key) {
            builder = builder.windows_virtual_key_code(code);
        }
        // Chromium only emits keypress semantics for keys carrying text.
        if key == "Enter" && matches!(kind, DispatchKeyEventType::KeyDown) {
            builder = builder.text("\r");
        }
        let params = builder
            .build()
            .map_err(|e| BackendError::Other(format!("Failed to build key event: {:?}", e)))?;
        let client = self.client()?;
        client
            .page
            .execute(params)
            .await
            .map_err(|e| BackendError::Script(format!("key event failed: {}", e)))?;
        Ok(())
    }

    async fn expect_true(&mut self, expr: String, what: &str) -> Result<(), BackendError> {
        let value = self.call(expr).await?;
        if value.as_bool() == Some(true) {
            Ok(())
        } else {
            Err(BackendError::Script(format!(
                "{what}: element has left the document"
            )))
        }
    }
}

impl Default for ChromeBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn virtual_key_code(key: &str) -> Option<i64> {
    match key {
        "Enter" => Some(13),
        "Escape" => Some(27),
        "Tab" => Some(9),
        "Backspace" => Some(8),
        _ => None,
    }
}

fn json_str(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

#[async_trait]
impl Backend for ChromeBackend {
    async fn navigate(&mut self, url: &str) -> Result<NavigationResult, BackendError> {
        let client = self.client()?;
        tracing::info!("Navigating to: {}", url);
        client
            .page
            .goto(url)
            .await
            .map_err(|e| BackendError::Navigation(e.to_string()))?;

        let title = client
            .page
            .get_title()
            .await
            .unwrap_or_default()
            .unwrap_or_default();
        let url = client
            .page
            .url()
            .await
            .map_err(|e| BackendError::Navigation(e.to_string()))?
            .unwrap_or_default();
        Ok(NavigationResult { url, title })
    }

    async fn query(&mut self, selector: &str) -> Result<Vec<ElementSnapshot>, BackendError> {
        self.call_snapshots(format!("window.__formpilot.query({})", json_str(selector)))
            .await
    }

    async fn query_within(
        &mut self,
        node: NodeId,
        selector: &str,
    ) -> Result<Vec<ElementSnapshot>, BackendError> {
        self.call_snapshots(format!(
            "window.__formpilot.queryWithin({node}, {})",
            json_str(selector)
        ))
        .await
    }

    async fn parent(&mut self, node: NodeId) -> Result<Option<ElementSnapshot>, BackendError> {
        self.call_snapshot(format!("window.__formpilot.parentOf({node})"))
            .await
    }

    async fn closest(
        &mut self,
        node: NodeId,
        selector: &str,
    ) -> Result<Option<ElementSnapshot>, BackendError> {
        self.call_snapshot(format!(
            "window.__formpilot.closest({node}, {})",
            json_str(selector)
        ))
        .await
    }

    async fn refresh(&mut self, node: NodeId) -> Result<Option<ElementSnapshot>, BackendError> {
        self.call_snapshot(format!("window.__formpilot.refresh({node})"))
            .await
    }

    async fn click(&mut self, node: NodeId) -> Result<(), BackendError> {
        let (x, y) = self.center_of(node).await?;
        self.mouse_event(DispatchMouseEventType::MousePressed, x, y)
            .await?;
        self.mouse_event(DispatchMouseEventType::MouseReleased, x, y)
            .await
    }

    async fn click_js(&mut self, node: NodeId) -> Result<(), BackendError> {
        self.expect_true(format!("window.__formpilot.clickJs({node})"), "clickJs")
            .await
    }

    async fn synthesize_click(&mut self, node: NodeId) -> Result<(), BackendError> {
        self.expect_true(
            format!("window.__formpilot.pointerClick({node})"),
            "pointerClick",
        )
        .await
    }

    async fn type_text(&mut self, node: NodeId, text: &str) -> Result<(), BackendError> {
        self.focus(node).await?;
        let params = InsertTextParams::new(text.to_string());
        let client = self.client()?;
        client
            .page
            .execute(params)
            .await
            .map_err(|e| BackendError::Script(format!("insertText failed: {}", e)))?;
        Ok(())
    }

    async fn press_key(&mut self, node: NodeId, key: &str) -> Result<(), BackendError> {
        self.focus(node).await?;
        self.key_event(DispatchKeyEventType::KeyDown, key).await?;
        self.key_event(DispatchKeyEventType::KeyUp, key).await
    }

    async fn clear(&mut self, node: NodeId) -> Result<(), BackendError> {
        self.expect_true(format!("window.__formpilot.clearNode({node})"), "clear")
            .await
    }

    async fn focus(&mut self, node: NodeId) -> Result<(), BackendError> {
        self.expect_true(format!("window.__formpilot.focusNode({node})"), "focus")
            .await
    }

    async fn scroll_into_view(&mut self, node: NodeId) -> Result<(), BackendError> {
        self.expect_true(
            format!("window.__formpilot.scrollIntoView({node})"),
            "scrollIntoView",
        )
        .await
    }

    async fn select_option(&mut self, node: NodeId, value: &str) -> Result<(), BackendError> {
        self.expect_true(
            format!(
                "window.__formpilot.selectOption({node}, {})",
                json_str(value)
            ),
            "selectOption",
        )
        .await
    }

    async fn set_files(&mut self, node: NodeId, path: &Path) -> Result<(), BackendError> {
        // The helper hands the element back as a remote object; file
        // assignment must go through the DOM domain, scripts cannot do it.
        let client = self.client()?;
        ensure_helper(&client.page)
            .await
            .map_err(|e| BackendError::Script(e.to_string()))?;
        let params = EvaluateParams::builder()
            .expression(format!("window.__formpilot.handle({node})"))
            .build()
            .map_err(|e| BackendError::Other(format!("Failed to build evaluation: {:?}", e)))?;
        let result = client
            .page
            .evaluate(params)
            .await
            .map_err(|e| BackendError::Script(e.to_string()))?;
        let object_id = result.object().object_id.clone().ok_or_else(|| {
            BackendError::Script(format!("element {node} is not a live file input"))
        })?;

        let set = SetFileInputFilesParams::builder()
            .files(vec![path.display().to_string()])
            .object_id(object_id)
            .build()
            .map_err(|e| BackendError::Other(format!("Failed to build file params: {:?}", e)))?;
        client
            .page
            .execute(set)
            .await
            .map_err(|e| BackendError::Script(format!("setFileInputFiles failed: {}", e)))?;
        Ok(())
    }

    async fn dispatch_change(&mut self, node: NodeId) -> Result<(), BackendError> {
        self.expect_true(
            format!("window.__formpilot.dispatchChange({node})"),
            "dispatchChange",
        )
        .await
    }

    async fn force_visible(&mut self, node: NodeId) -> Result<(), BackendError> {
        self.expect_true(
            format!("window.__formpilot.forceVisible({node})"),
            "forceVisible",
        )
        .await
    }

    async fn execute_script(&mut self, script: &str) -> Result<serde_json::Value, BackendError> {
        let client = self.client()?;
        let result = client
            .page
            .evaluate(script)
            .await
            .map_err(|e| BackendError::Script(e.to_string()))?;
        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }
}

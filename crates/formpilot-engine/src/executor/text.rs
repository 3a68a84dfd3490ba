//! Single-line and multi-line text fields.

use crate::backend::Backend;
use crate::executor::{ActionExecutor, bring_into_view};
use crate::locator;
use crate::pacing::Pacing;
use crate::verifier;
use async_trait::async_trait;
use formpilot_common::error::FillError;
use formpilot_common::plan::{Action, ActionValue, FieldKind};

/// Clears the field, types the value, and confirms the observed value
/// equals the intended one byte for byte. A near-miss (truncated input,
/// input masks rewriting the text) is a failure, not a partial success.
pub struct TextExecutor {
    kind: FieldKind,
}

impl TextExecutor {
    pub fn single_line() -> Self {
        Self {
            kind: FieldKind::Text,
        }
    }

    pub fn multi_line() -> Self {
        Self {
            kind: FieldKind::Textarea,
        }
    }
}

#[async_trait]
impl ActionExecutor for TextExecutor {
    async fn attempt(
        &self,
        backend: &mut dyn Backend,
        action: &Action,
        pacing: &Pacing,
    ) -> Result<(), FillError> {
        let value = action
            .text_value()
            .ok_or_else(|| FillError::Decode(format!("text action '{}' has no value", action.id)))?
            .to_string();

        let element = locator::locate(backend, &action.selector, pacing).await?;
        bring_into_view(backend, &element, pacing).await?;

        backend.clear(element.node).await?;
        backend.type_text(element.node, &value).await?;
        tokio::time::sleep(pacing.settle).await;

        let expected = ActionValue::Text(value.clone());
        if verifier::verify(backend, &action.selector, self.kind, &expected).await? {
            Ok(())
        } else {
            let observed = backend
                .refresh(element.node)
                .await?
                .and_then(|s| s.value)
                .unwrap_or_default();
            Err(FillError::VerificationMismatch(format!(
                "expected '{}', got '{}'",
                value, observed
            )))
        }
    }
}

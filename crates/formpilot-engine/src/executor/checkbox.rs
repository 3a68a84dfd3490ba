//! Checkbox toggling.

use crate::backend::Backend;
use crate::executor::{ActionExecutor, bring_into_view};
use crate::locator;
use crate::pacing::Pacing;
use async_trait::async_trait;
use formpilot_common::error::FillError;
use formpilot_common::plan::Action;

/// Idempotent: the box is clicked only when its current state differs from
/// the desired one, so re-running an already-satisfied action performs no
/// interaction and still succeeds.
pub struct CheckboxExecutor;

#[async_trait]
impl ActionExecutor for CheckboxExecutor {
    async fn attempt(
        &self,
        backend: &mut dyn Backend,
        action: &Action,
        pacing: &Pacing,
    ) -> Result<(), FillError> {
        let desired = action.flag_value().ok_or_else(|| {
            FillError::Decode(format!("checkbox action '{}' has no boolean value", action.id))
        })?;

        let element = locator::locate(backend, &action.selector, pacing).await?;
        bring_into_view(backend, &element, pacing).await?;

        if element.state.checked != desired {
            if backend.click(element.node).await.is_err() {
                backend.click_js(element.node).await?;
            }
            tokio::time::sleep(pacing.settle).await;
        }

        let final_state = backend
            .refresh(element.node)
            .await?
            .map(|s| s.state.checked)
            .unwrap_or(!desired);
        if final_state == desired {
            Ok(())
        } else {
            Err(FillError::VerificationMismatch(format!(
                "checkbox state mismatch: expected {}, got {}",
                desired, final_state
            )))
        }
    }
}

//! Generic click targets (submit/apply/next buttons).

use crate::backend::{Backend, ElementSnapshot};
use crate::executor::{ActionExecutor, bring_into_view};
use crate::locator;
use crate::pacing::Pacing;
use async_trait::async_trait;
use formpilot_common::error::FillError;
use formpilot_common::plan::Action;
use tokio::time::sleep;

/// Canonical submit-control text fragments used for heuristic discovery
/// when the addressed element refuses a natural click.
const SUBMIT_FRAGMENTS: &[&str] = &["submit", "apply", "finish"];

/// Click with a fallback ladder: natural click, heuristic discovery of a
/// plausible submit control, simulated pointer sequence, programmatic
/// click. Success is optimistic — there is no positive verification of a
/// click's effect beyond the absence of an error.
pub struct ClickExecutor;

impl ClickExecutor {
    fn selector_hints_submit(selector: &str) -> bool {
        let lower = selector.to_lowercase();
        lower.contains("submit") || lower.contains("apply")
    }

    fn looks_like_submit(snapshot: &ElementSnapshot) -> bool {
        let text = snapshot
            .text_trimmed()
            .or_else(|| snapshot.attr("value"))
            .unwrap_or("")
            .to_lowercase();
        SUBMIT_FRAGMENTS.iter().any(|frag| text.contains(frag))
    }

    async fn discover_submit_control(
        &self,
        backend: &mut dyn Backend,
    ) -> Result<Option<ElementSnapshot>, FillError> {
        let mut candidates = backend.query("button").await?;
        candidates.extend(backend.query("input[type=\"submit\"]").await?);
        Ok(candidates
            .into_iter()
            .find(|c| c.state.visible && Self::looks_like_submit(c)))
    }
}

#[async_trait]
impl ActionExecutor for ClickExecutor {
    async fn attempt(
        &self,
        backend: &mut dyn Backend,
        action: &Action,
        pacing: &Pacing,
    ) -> Result<(), FillError> {
        let mut element = locator::locate(backend, &action.selector, pacing).await?;
        bring_into_view(backend, &element, pacing).await?;

        if backend.click(element.node).await.is_err() {
            // The natural click was intercepted. When the selector names a
            // submit/apply control, a semantically equivalent button may be
            // clickable where the addressed one is not.
            if Self::selector_hints_submit(&action.selector)
                && let Some(found) = self.discover_submit_control(backend).await?
            {
                tracing::debug!(action = %action.id, "falling back to discovered submit control");
                element = found;
            }

            if backend.synthesize_click(element.node).await.is_err() {
                backend.click_js(element.node).await?;
            }
        }

        // Allow navigation or DOM mutation to settle before reporting.
        sleep(pacing.post_click_settle).await;
        Ok(())
    }
}

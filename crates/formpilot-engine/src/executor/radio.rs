//! Radio group selection.

use crate::backend::{Backend, ElementSnapshot};
use crate::executor::{ActionExecutor, bring_into_view};
use crate::locator;
use crate::pacing::Pacing;
use async_trait::async_trait;
use formpilot_common::error::FillError;
use formpilot_common::plan::Action;

/// Resolves the whole group through the shared `name` attribute, matches
/// the desired option first by exact value and then by associated label
/// text, and selects it with a natural click (programmatic fallback when
/// intercepted).
pub struct RadioExecutor;

impl RadioExecutor {
    async fn choose(
        &self,
        backend: &mut dyn Backend,
        target: &ElementSnapshot,
        pacing: &Pacing,
    ) -> Result<(), FillError> {
        bring_into_view(backend, target, pacing).await?;
        if backend.click(target.node).await.is_err() {
            backend.click_js(target.node).await?;
        }
        tokio::time::sleep(pacing.settle).await;
        Ok(())
    }

    /// The chosen radio must report itself selected and no sibling may.
    async fn confirm_sole_selection(
        &self,
        backend: &mut dyn Backend,
        group_selector: &str,
        chosen: &ElementSnapshot,
    ) -> Result<(), FillError> {
        let group = backend.query(group_selector).await?;
        let chosen_checked = group
            .iter()
            .find(|r| r.node == chosen.node)
            .is_some_and(|r| r.state.checked);
        let sibling_checked = group
            .iter()
            .any(|r| r.node != chosen.node && r.state.checked);

        if chosen_checked && !sibling_checked {
            Ok(())
        } else {
            Err(FillError::VerificationMismatch(
                "radio button not selected after click".into(),
            ))
        }
    }

    async fn label_matches(
        &self,
        backend: &mut dyn Backend,
        radio: &ElementSnapshot,
        wanted: &str,
    ) -> Result<bool, FillError> {
        let Some(id) = radio.id_attr() else {
            return Ok(false);
        };
        let labels = backend.query(&format!("label[for=\"{}\"]", id)).await?;
        let wanted = wanted.to_lowercase();
        Ok(labels
            .iter()
            .filter_map(ElementSnapshot::text_trimmed)
            .any(|text| text.to_lowercase().contains(&wanted)))
    }
}

#[async_trait]
impl ActionExecutor for RadioExecutor {
    async fn attempt(
        &self,
        backend: &mut dyn Backend,
        action: &Action,
        pacing: &Pacing,
    ) -> Result<(), FillError> {
        let wanted = action
            .text_value()
            .ok_or_else(|| FillError::Decode(format!("radio action '{}' has no value", action.id)))?
            .to_string();

        let anchor = locator::locate(backend, &action.selector, pacing).await?;

        let Some(name) = anchor.attr("name").map(str::to_string) else {
            // A lone radio outside any group: just select it.
            self.choose(backend, &anchor, pacing).await?;
            let refreshed = backend.refresh(anchor.node).await?;
            return if refreshed.is_some_and(|s| s.state.checked) {
                Ok(())
            } else {
                Err(FillError::VerificationMismatch(
                    "radio button not selected after click".into(),
                ))
            };
        };

        let group_selector = format!("input[type=\"radio\"][name=\"{}\"]", name);
        let group = backend.query(&group_selector).await?;

        // Exact value match first.
        if let Some(radio) = group
            .iter()
            .find(|r| r.attr("value") == Some(wanted.as_str()))
        {
            self.choose(backend, radio, pacing).await?;
            return self
                .confirm_sole_selection(backend, &group_selector, radio)
                .await;
        }

        // Then case-insensitive substring match on the visible label.
        for radio in &group {
            if self.label_matches(backend, radio, &wanted).await? {
                self.choose(backend, radio, pacing).await?;
                return self
                    .confirm_sole_selection(backend, &group_selector, radio)
                    .await;
            }
        }

        Err(FillError::VerificationMismatch(format!(
            "no radio button in group '{}' matches value '{}'",
            name, wanted
        )))
    }
}

//! Virtualized/ARIA combobox selection, keyboard-driven.
//!
//! The options of these widgets are not present in the document until the
//! control is opened, and are rendered lazily once it is — so they cannot
//! be clicked reliably. The whole interaction goes through the keyboard:
//! open, type to let the widget's own filtering narrow the candidates, and
//! confirm with Enter.

use crate::backend::{Backend, ElementSnapshot};
use crate::executor::{ActionExecutor, bring_into_view};
use crate::locator;
use crate::pacing::Pacing;
use crate::verifier;
use async_trait::async_trait;
use formpilot_common::error::FillError;
use formpilot_common::plan::{Action, ActionValue, FieldKind};
use tokio::time::{Instant, sleep};

pub struct ComboboxExecutor;

/// Shortened form used on the second tier: full official names ("United
/// States of America") are often not the widget's internal option label,
/// but their first word or leading characters filter down to it.
fn prefix_of(value: &str) -> &str {
    match value.split_whitespace().next() {
        Some(word) if value.contains(' ') => word,
        _ => {
            let end = value
                .char_indices()
                .nth(6)
                .map(|(i, _)| i)
                .unwrap_or(value.len());
            &value[..end]
        }
    }
}

impl ComboboxExecutor {
    /// Poll for the widget reporting `aria-expanded="true"`; re-click once
    /// if the first click did not open it.
    async fn ensure_open(
        &self,
        backend: &mut dyn Backend,
        node: crate::backend::NodeId,
        pacing: &Pacing,
    ) -> Result<(), FillError> {
        backend.click(node).await?;

        let deadline = Instant::now() + pacing.confirm_window;
        loop {
            let expanded = backend
                .refresh(node)
                .await?
                .and_then(|s| s.state.expanded);
            if expanded == Some(true) {
                return Ok(());
            }
            if Instant::now() >= deadline {
                break;
            }
            sleep(pacing.poll_interval).await;
        }

        backend.click(node).await?;
        sleep(pacing.settle).await;
        Ok(())
    }

    async fn type_and_confirm(
        &self,
        backend: &mut dyn Backend,
        node: crate::backend::NodeId,
        text: &str,
        pacing: &Pacing,
    ) -> Result<(), FillError> {
        backend.type_text(node, text).await?;
        // Let the widget filter the option list before confirming.
        sleep(pacing.settle).await;
        backend.press_key(node, "Enter").await?;
        sleep(pacing.settle).await;
        Ok(())
    }

    /// The filtered option the widget reports as highlighted, if any.
    async fn active_option_text(
        &self,
        backend: &mut dyn Backend,
        snapshot: &ElementSnapshot,
    ) -> Result<Option<String>, FillError> {
        let Some(active_id) = snapshot.attr("aria-activedescendant") else {
            return Ok(None);
        };
        let matches = backend.query(&format!("[id=\"{}\"]", active_id)).await?;
        Ok(matches
            .first()
            .and_then(ElementSnapshot::text_trimmed)
            .map(str::to_string))
    }
}

#[async_trait]
impl ActionExecutor for ComboboxExecutor {
    async fn attempt(
        &self,
        backend: &mut dyn Backend,
        action: &Action,
        pacing: &Pacing,
    ) -> Result<(), FillError> {
        let wanted = action
            .text_value()
            .ok_or_else(|| {
                FillError::Decode(format!("combobox action '{}' has no value", action.id))
            })?
            .to_string();

        let mut element = locator::locate(backend, &action.selector, pacing).await?;

        // The selector may address a styled wrapper; the live control is the
        // combobox-role input inside it.
        if element.attr("role") != Some("combobox") {
            let inner = backend
                .query_within(element.node, "input[role=\"combobox\"]")
                .await?;
            element = inner.into_iter().next().ok_or_else(|| {
                FillError::NotInteractable(format!(
                    "'{}' is not a combobox and contains none",
                    action.selector
                ))
            })?;
        }

        bring_into_view(backend, &element, pacing).await?;
        backend.clear(element.node).await?;

        self.ensure_open(backend, element.node, pacing).await?;
        self.type_and_confirm(backend, element.node, &wanted, pacing)
            .await?;

        // Characteristic of locale/country-style lists: the full text
        // filtered everything out, the popup stays open with nothing set.
        // Clear and retry with a shortened prefix before re-confirming.
        let after = backend.refresh(element.node).await?;
        let open_and_empty = after.as_ref().is_some_and(|s| {
            s.state.expanded == Some(true) && s.value.as_deref().unwrap_or("").is_empty()
        });
        if open_and_empty {
            backend.clear(element.node).await?;
            sleep(pacing.settle).await;
            self.type_and_confirm(backend, element.node, prefix_of(&wanted), pacing)
                .await?;
        }

        let expected = ActionValue::Text(wanted.clone());
        if verifier::verify(backend, &action.selector, FieldKind::Combobox, &expected).await? {
            return Ok(());
        }

        if let Some(current) = backend.refresh(element.node).await?
            && let Some(active) = self.active_option_text(backend, &current).await?
            && active.to_lowercase().contains(&wanted.to_lowercase())
        {
            return Ok(());
        }

        // Close the popup so the next attempt starts from a clean state.
        let _ = backend.press_key(element.node, "Escape").await;
        Err(FillError::VerificationMismatch(format!(
            "could not verify selection of '{}'",
            wanted
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::prefix_of;

    #[test]
    fn multi_word_values_shorten_to_first_word() {
        assert_eq!(prefix_of("United States"), "United");
    }

    #[test]
    fn single_word_values_shorten_to_six_chars() {
        assert_eq!(prefix_of("Liechtenstein"), "Liecht");
        assert_eq!(prefix_of("Chad"), "Chad");
    }
}

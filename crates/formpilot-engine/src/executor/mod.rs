//! Per-kind action executors.
//!
//! Every executor follows the same outer algorithm: locate the element
//! within the wait window, bring it into view, apply the kind-specific
//! interaction, verify the observed state, and retry the whole attempt
//! under the bounded policy. The retry loop lives in the provided
//! [`ActionExecutor::apply`] method; executors implement one `attempt`.

mod checkbox;
mod click;
mod combobox;
mod file;
mod radio;
mod select;
mod text;

pub use checkbox::CheckboxExecutor;
pub use click::ClickExecutor;
pub use combobox::ComboboxExecutor;
pub use file::FileExecutor;
pub use radio::RadioExecutor;
pub use select::SelectExecutor;
pub use text::TextExecutor;

use crate::backend::{Backend, ElementSnapshot};
use crate::pacing::Pacing;
use async_trait::async_trait;
use formpilot_common::error::FillError;
use formpilot_common::plan::{Action, FieldKind};
use std::collections::HashMap;
use tokio::time::sleep;

#[async_trait]
pub trait ActionExecutor: Send + Sync {
    /// One attempt at applying the action. Called repeatedly by [`apply`].
    async fn attempt(
        &self,
        backend: &mut dyn Backend,
        action: &Action,
        pacing: &Pacing,
    ) -> Result<(), FillError>;

    /// Apply the action under the retry policy: retryable errors consume an
    /// attempt and back off briefly; configuration and decode errors are
    /// surfaced immediately.
    async fn apply(
        &self,
        backend: &mut dyn Backend,
        action: &Action,
        pacing: &Pacing,
    ) -> Result<(), FillError> {
        let max = pacing.retry.max_attempts.max(1);
        let mut last_err = None;

        for attempt in 1..=max {
            match self.attempt(backend, action, pacing).await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_retryable() && attempt < max => {
                    tracing::debug!(
                        action = %action.id,
                        attempt,
                        error = %e,
                        "attempt failed, retrying"
                    );
                    last_err = Some(e);
                    sleep(pacing.retry.backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
        // Unreachable in practice: the loop returns on the final attempt.
        Err(last_err.unwrap_or_else(|| FillError::NotFound(action.selector.clone())))
    }
}

/// Scroll the element into view and let it settle.
pub(crate) async fn bring_into_view(
    backend: &mut dyn Backend,
    snapshot: &ElementSnapshot,
    pacing: &Pacing,
) -> Result<(), FillError> {
    backend.scroll_into_view(snapshot.node).await?;
    sleep(pacing.settle).await;
    Ok(())
}

/// Maps every field kind to its executor. Kinds are validated against the
/// registry before a plan runs; a missing registration is a configuration
/// error for the whole plan.
pub struct ExecutorRegistry {
    executors: HashMap<FieldKind, Box<dyn ActionExecutor>>,
}

impl ExecutorRegistry {
    pub fn empty() -> Self {
        Self {
            executors: HashMap::new(),
        }
    }

    pub fn register(&mut self, kind: FieldKind, executor: Box<dyn ActionExecutor>) {
        self.executors.insert(kind, executor);
    }

    pub fn get(&self, kind: FieldKind) -> Option<&dyn ActionExecutor> {
        self.executors.get(&kind).map(|executor| &**executor)
    }

    pub fn supports(&self, kind: FieldKind) -> bool {
        self.executors.contains_key(&kind)
    }
}

impl Default for ExecutorRegistry {
    /// The full closed taxonomy.
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(FieldKind::Text, Box::new(TextExecutor::single_line()));
        registry.register(FieldKind::Textarea, Box::new(TextExecutor::multi_line()));
        registry.register(FieldKind::File, Box::new(FileExecutor));
        registry.register(FieldKind::Radio, Box::new(RadioExecutor));
        registry.register(FieldKind::Checkbox, Box::new(CheckboxExecutor));
        registry.register(FieldKind::Select, Box::new(SelectExecutor));
        registry.register(FieldKind::Combobox, Box::new(ComboboxExecutor));
        registry.register(FieldKind::Click, Box::new(ClickExecutor));
        registry
    }
}

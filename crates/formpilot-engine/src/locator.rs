//! Selector resolution with a bounded wait.
//!
//! This is the single suspension point every executor inherits: a fixed
//! interval poll against [`Backend::query`] up to the configured wait
//! window. Transient absence (element not yet rendered) is tolerated;
//! exceeding the window fails with `NotFound` or `NotInteractable`.

use crate::backend::{Backend, ElementSnapshot};
use crate::pacing::Pacing;
use formpilot_common::error::FillError;
use tokio::time::{Instant, sleep};

/// Resolve `selector` to a single visible, enabled element.
///
/// The addressing scheme does not guarantee uniqueness; when several
/// interactable elements match, the first one in document order wins and a
/// warning names the collision.
pub async fn locate<B: Backend + ?Sized>(
    backend: &mut B,
    selector: &str,
    pacing: &Pacing,
) -> Result<ElementSnapshot, FillError> {
    let deadline = Instant::now() + pacing.wait_window;
    let mut saw_match = false;

    loop {
        let matches = backend.query(selector).await?;
        saw_match |= !matches.is_empty();

        let interactable: Vec<ElementSnapshot> = matches
            .into_iter()
            .filter(ElementSnapshot::is_interactable)
            .collect();

        if let Some(first) = interactable.first() {
            if interactable.len() > 1 {
                tracing::warn!(
                    selector,
                    matches = interactable.len(),
                    "ambiguous selector, acting on first match"
                );
            }
            return Ok(first.clone());
        }

        if Instant::now() >= deadline {
            return Err(if saw_match {
                FillError::NotInteractable(selector.to_string())
            } else {
                FillError::NotFound(selector.to_string())
            });
        }
        sleep(pacing.poll_interval).await;
    }
}

/// Resolve `selector` to any present element, visible or not.
///
/// File inputs are routinely hidden inside styled upload widgets, so the
/// file executor waits for presence only and forces visibility afterwards.
pub async fn locate_present<B: Backend + ?Sized>(
    backend: &mut B,
    selector: &str,
    pacing: &Pacing,
) -> Result<ElementSnapshot, FillError> {
    let deadline = Instant::now() + pacing.wait_window;

    loop {
        let matches = backend.query(selector).await?;
        if let Some(first) = matches.first() {
            return Ok(first.clone());
        }
        if Instant::now() >= deadline {
            return Err(FillError::NotFound(selector.to_string()));
        }
        sleep(pacing.poll_interval).await;
    }
}

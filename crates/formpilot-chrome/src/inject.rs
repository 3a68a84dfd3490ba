//! Helper-script injection with retry around navigation races.

use chromiumoxide::Page;
use std::error::Error;
use std::time::Duration;

const HELPER_JS: &str = include_str!("helper.js");

/// Retries for context errors while the page is navigating.
const MAX_CONTEXT_RETRIES: u32 = 10;
const CONTEXT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Whether an error indicates the page context is unavailable (e.g. during
/// navigation).
pub fn is_context_error(err: &str) -> bool {
    err.contains("Cannot find context")
        || err.contains("Execution context was destroyed")
        || err.contains("-32000")
}

/// Make sure the helper is present in the current document, re-injecting
/// after navigations.
pub async fn ensure_helper(page: &Page) -> Result<(), Box<dyn Error + Send + Sync>> {
    let mut last_error = None;

    for attempt in 0..MAX_CONTEXT_RETRIES {
        match try_ensure(page).await {
            Ok(()) => return Ok(()),
            Err(e) => {
                let err_str = e.to_string();
                if is_context_error(&err_str) {
                    tracing::debug!(
                        "helper injection context error (attempt {}/{}), retrying",
                        attempt + 1,
                        MAX_CONTEXT_RETRIES
                    );
                    last_error = Some(err_str);
                    tokio::time::sleep(CONTEXT_RETRY_DELAY).await;
                    continue;
                }
                return Err(err_str.into());
            }
        }
    }

    Err(last_error
        .unwrap_or_else(|| "helper injection failed after retries".to_string())
        .into())
}

async fn try_ensure(page: &Page) -> Result<(), Box<dyn Error + Send + Sync>> {
    let is_loaded: bool = page
        .evaluate("typeof window.__formpilot !== 'undefined'")
        .await
        .map_err(|e| format!("Failed to check helper status: {}", e))?
        .into_value()
        .map_err(|e| format!("Failed to get bool value: {}", e))?;

    if !is_loaded {
        page.evaluate(HELPER_JS)
            .await
            .map_err(|e| format!("Failed to inject helper.js: {}", e))?;
    }

    Ok(())
}

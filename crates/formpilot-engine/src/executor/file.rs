//! File uploads.
//!
//! Accepts either a filesystem path or an inline `data:` URI with a
//! base64 payload. Inline payloads are materialized into a temporary
//! directory whose lifetime is tied to the attempt, so the artifact is
//! removed on every exit path — success, failure or panic.

use crate::backend::Backend;
use crate::executor::ActionExecutor;
use crate::locator;
use crate::pacing::Pacing;
use crate::verifier;
use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use formpilot_common::error::FillError;
use formpilot_common::plan::{Action, ActionValue, FieldKind};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio::time::sleep;

pub struct FileExecutor;

#[derive(Debug)]
enum FilePayload {
    Existing(PathBuf),
    Materialized {
        // Held for its Drop: removes the directory and the file inside.
        _dir: TempDir,
        path: PathBuf,
    },
}

impl FilePayload {
    fn path(&self) -> &Path {
        match self {
            FilePayload::Existing(p) => p,
            FilePayload::Materialized { path, .. } => path,
        }
    }
}

fn extension_for(media_type: &str) -> &'static str {
    if media_type.contains("word") {
        ".docx"
    } else if media_type.contains("text") {
        ".txt"
    } else {
        // Generic document extension when the media type is unknown.
        ".pdf"
    }
}

fn resolve_payload(value: &str, file_name: Option<&str>) -> Result<FilePayload, FillError> {
    if let Some(rest) = value.strip_prefix("data:") {
        let Some((media_type, encoded)) = rest.split_once(";base64,") else {
            return Err(FillError::Decode(
                "data URI is missing a ';base64,' separator".into(),
            ));
        };
        let bytes = BASE64
            .decode(encoded.trim())
            .map_err(|e| FillError::Decode(e.to_string()))?;

        let suffix = extension_for(media_type);
        let mut name = file_name.unwrap_or("upload").to_string();
        if !name.ends_with(suffix) {
            name.push_str(suffix);
        }

        let dir = TempDir::new()?;
        let path = dir.path().join(name);
        std::fs::write(&path, bytes)?;
        return Ok(FilePayload::Materialized { _dir: dir, path });
    }

    let path = PathBuf::from(value);
    if !path.exists() {
        return Err(FillError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("file not found: {}", value),
        )));
    }
    Ok(FilePayload::Existing(std::fs::canonicalize(path)?))
}

/// Well-known upload-widget ids to try when the given selector fails.
fn fallback_selectors(selector: &str) -> &'static [&'static str] {
    let lower = selector.to_lowercase();
    if lower.contains("resume") {
        &["#resume", "#resume_upload", "#file_resume"]
    } else if lower.contains("cover") {
        &["#cover_letter", "#cover_letter_upload", "#file_cover_letter"]
    } else {
        &[]
    }
}

#[async_trait]
impl ActionExecutor for FileExecutor {
    async fn attempt(
        &self,
        backend: &mut dyn Backend,
        action: &Action,
        pacing: &Pacing,
    ) -> Result<(), FillError> {
        let value = action
            .text_value()
            .ok_or_else(|| FillError::Decode(format!("file action '{}' has no value", action.id)))?
            .to_string();
        let payload = resolve_payload(&value, action.file_name.as_deref())?;

        // File inputs are routinely hidden inside styled wrappers, so only
        // presence is awaited; visibility is forced afterwards.
        let element = match locator::locate_present(backend, &action.selector, pacing).await {
            Ok(el) => el,
            Err(FillError::NotFound(_)) => {
                let mut found = None;
                for candidate in fallback_selectors(&action.selector) {
                    if let Some(el) = backend.query(candidate).await?.into_iter().next() {
                        tracing::debug!(selector = candidate, "file input found via fallback id");
                        found = Some(el);
                        break;
                    }
                }
                found.ok_or_else(|| FillError::NotFound(action.selector.clone()))?
            }
            Err(e) => return Err(e),
        };

        if let Err(e) = backend.force_visible(element.node).await {
            tracing::debug!(error = %e, "could not force file input visible");
        }
        sleep(pacing.settle).await;

        backend.set_files(element.node, payload.path()).await?;
        sleep(pacing.settle).await;

        // Some upload widgets only start processing on an explicit change
        // event, not on the file assignment itself.
        backend.dispatch_change(element.node).await?;
        sleep(pacing.post_click_settle).await;

        let expected = ActionValue::Text(value);
        if verifier::verify(backend, &action.selector, FieldKind::File, &expected).await?
            || backend
                .refresh(element.node)
                .await?
                .and_then(|s| s.value)
                .is_some_and(|v| !v.is_empty())
        {
            Ok(())
        } else {
            Err(FillError::VerificationMismatch(
                "file input still empty after upload".into(),
            ))
        }
    }
}

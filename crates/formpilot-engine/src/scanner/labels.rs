//! Label resolution.
//!
//! A field that cannot be named cannot be reasoned about downstream, so
//! label resolution is the gate every discovered control passes through.
//! The chain is an ordered list of independent sources tried until one
//! yields text; adding a source means adding a variant, not another nested
//! branch.

use crate::backend::{Backend, BackendError, ElementSnapshot};
use regex::Regex;
use std::sync::LazyLock;

/// Reject accidentally captured paragraph text.
const MAX_LABEL_LEN: usize = 300;
/// Radio option labels are short by nature.
const MAX_OPTION_LABEL_LEN: usize = 100;

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Collapse runs of whitespace and trim; `None` when nothing is left.
pub fn normalize(raw: &str) -> Option<String> {
    let collapsed = WHITESPACE.replace_all(raw.trim(), " ").into_owned();
    (!collapsed.is_empty()).then_some(collapsed)
}

/// One way of finding the human-readable label of a form control, in the
/// order the chain tries them.
#[derive(Debug, Clone, Copy)]
enum LabelSource {
    /// Explicit `aria-label` attribute.
    AriaLabel,
    /// `aria-labelledby` reference resolved to the target elements' text.
    AriaLabelledBy,
    /// A `<label for="...">` bound by the control's id.
    BoundLabel,
    /// An enclosing `<label>` ancestor.
    EnclosingLabel,
    /// A label-styled descendant of the parent element.
    NearbyText,
}

const CHAIN: &[LabelSource] = &[
    LabelSource::AriaLabel,
    LabelSource::AriaLabelledBy,
    LabelSource::BoundLabel,
    LabelSource::EnclosingLabel,
    LabelSource::NearbyText,
];

/// Resolve the question text for a control; `None` means the field should
/// be skipped.
pub async fn resolve_label<B: Backend + ?Sized>(
    backend: &mut B,
    element: &ElementSnapshot,
) -> Result<Option<String>, BackendError> {
    for source in CHAIN {
        if let Some(label) = try_source(backend, element, *source).await? {
            return Ok(Some(label));
        }
    }
    Ok(None)
}

async fn try_source<B: Backend + ?Sized>(
    backend: &mut B,
    element: &ElementSnapshot,
    source: LabelSource,
) -> Result<Option<String>, BackendError> {
    match source {
        LabelSource::AriaLabel => Ok(element.attr("aria-label").and_then(normalize)),
        LabelSource::AriaLabelledBy => {
            let Some(ids) = element.attr("aria-labelledby") else {
                return Ok(None);
            };
            let mut parts = Vec::new();
            for id in ids.split_whitespace() {
                let matches = backend.query(&format!("[id=\"{}\"]", id)).await?;
                if let Some(text) = matches.first().and_then(ElementSnapshot::text_trimmed) {
                    parts.push(text.to_string());
                }
            }
            Ok(normalize(&parts.join(" ")))
        }
        LabelSource::BoundLabel => {
            let Some(id) = element.id_attr() else {
                return Ok(None);
            };
            let labels = backend.query(&format!("label[for=\"{}\"]", id)).await?;
            Ok(labels
                .first()
                .and_then(ElementSnapshot::text_trimmed)
                .and_then(normalize))
        }
        LabelSource::EnclosingLabel => {
            let enclosing = backend.closest(element.node, "label").await?;
            Ok(enclosing
                .as_ref()
                .and_then(ElementSnapshot::text_trimmed)
                .and_then(normalize))
        }
        LabelSource::NearbyText => {
            let Some(parent) = backend.parent(element.node).await? else {
                return Ok(None);
            };
            let candidates = backend
                .query_within(parent.node, "label, [class*=\"label\"], [class*=\"question\"]")
                .await?;
            Ok(candidates
                .iter()
                .filter_map(ElementSnapshot::text_trimmed)
                .find(|text| text.len() < MAX_LABEL_LEN)
                .and_then(normalize))
        }
    }
}

/// Label of a single radio option, as opposed to the group-level question.
pub async fn radio_option_label<B: Backend + ?Sized>(
    backend: &mut B,
    radio: &ElementSnapshot,
) -> Result<Option<String>, BackendError> {
    if let Some(enclosing) = backend.closest(radio.node, "label").await?
        && let Some(text) = enclosing.text_trimmed()
    {
        return Ok(normalize(text));
    }

    if let Some(id) = radio.id_attr() {
        let labels = backend.query(&format!("label[for=\"{}\"]", id)).await?;
        if let Some(text) = labels.first().and_then(ElementSnapshot::text_trimmed) {
            return Ok(normalize(text));
        }
    }

    let Some(parent) = backend.parent(radio.node).await? else {
        return Ok(None);
    };
    let siblings = backend
        .query_within(parent.node, "span, div, label")
        .await?;
    Ok(siblings
        .iter()
        .filter_map(ElementSnapshot::text_trimmed)
        .find(|text| text.len() < MAX_OPTION_LABEL_LEN)
        .and_then(normalize))
}

#[cfg(test)]
mod tests {
    use super::normalize;

    #[test]
    fn normalize_collapses_whitespace() {
        assert_eq!(
            normalize("  First\n   name \t *").as_deref(),
            Some("First name *")
        );
    }

    #[test]
    fn normalize_rejects_blank() {
        assert_eq!(normalize("   \n\t "), None);
    }
}

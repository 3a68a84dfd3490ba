//! Page exploration.
//!
//! The scanner drives a single page session through a fixed pipeline:
//! trigger lazy-loaded content, classify fields by DOM shape (physically
//! opening virtualized dropdowns to enumerate their options), traverse
//! multi-step wizards, and emit a normalized question list. Per-field
//! problems are logged and skipped; only navigation-level failures abort
//! a scan.

pub mod labels;
pub mod selectors;

use crate::backend::{Backend, BackendError, ElementSnapshot, NodeId};
use crate::pacing::Pacing;
use formpilot_common::plan::{FieldKind, Question, ScanReport};
use std::collections::HashSet;
use tokio::time::{Instant, sleep};

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
}

const TEXT_INPUT_SELECTORS: &[&str] = &[
    "input[type=\"text\"]",
    "input[type=\"email\"]",
    "input[type=\"tel\"]",
    "input[type=\"number\"]",
    "input[type=\"url\"]",
    // Inputs without a type attribute default to text.
    "input:not([type])",
];

/// Containers that mark a text input as the inner input of a custom
/// dropdown rather than a free-text field.
const DROPDOWN_CONTAINER_SELECTOR: &str =
    "[class*=\"select__\"], [class*=\"dropdown\"], [role=\"combobox\"]";

const CUSTOM_DROPDOWN_SELECTORS: &[&str] = &[
    "[role=\"combobox\"]",
    "[aria-haspopup=\"listbox\"]",
    ".select__control",
    "[class*=\"dropdown\"]",
];

/// Tried in order until one yields visible option text; custom widgets
/// render their popups under wildly different markup.
const OPTION_CONTAINER_SELECTORS: &[&str] = &[
    "[role=\"option\"]",
    "li[role=\"option\"]",
    ".select__option",
    "[id*=\"option\"]",
    "[class*=\"option\"]",
    "li[data-value]",
];

/// Styled upload-widget containers wrapping a hidden file input.
const UPLOAD_WIDGET_SELECTORS: &[&str] = &[
    "div[data-source=\"resume\"]",
    "div[data-source=\"cover_letter\"]",
    "div[class*=\"field\"][id*=\"resume\"]",
    "div[class*=\"field\"][id*=\"cover\"]",
    "#resume_section",
    "#cover_letter_section",
];

const PLACEHOLDER_OPTIONS: &[&str] = &["select...", "choose...", "--", "please select"];

/// Upper bound on wizard traversal, so a decoy control that perpetually
/// matches a next-button heuristic cannot loop forever.
const MAX_STEPS: usize = 10;

/// Cap on lazy-load scroll iterations; height stabilization is the natural
/// terminator, the cap defends against infinite-scroll pages.
const MAX_SCROLL_ROUNDS: usize = 20;

fn is_placeholder_option(text: &str) -> bool {
    let trimmed = text.trim();
    trimmed.is_empty() || PLACEHOLDER_OPTIONS.contains(&trimmed.to_lowercase().as_str())
}

/// A failing pass is logged and skipped; the rest of the scan goes on.
fn log_pass(name: &str, result: Result<(), BackendError>) {
    if let Err(e) = result {
        tracing::warn!(pass = name, error = %e, "scan pass failed");
    }
}

/// Accumulator for one scan session. Owned by the scanner and passed
/// through explicitly, so independent sessions never share state.
#[derive(Debug, Default)]
struct ScanSession {
    questions: Vec<Question>,
    seen_selectors: HashSet<String>,
    processed_radio_groups: HashSet<String>,
    seen_file_labels: HashSet<String>,
}

impl ScanSession {
    /// Append unless a question with the same selector was already
    /// recorded (re-scans of a stable page must add nothing).
    fn push(&mut self, question: Question) {
        if self.seen_selectors.insert(question.selector.clone()) {
            tracing::debug!(
                label = %question.question_text,
                kind = %question.field_kind,
                "found field"
            );
            self.questions.push(question);
        }
    }
}

pub struct FormScanner<'a, B: Backend + ?Sized> {
    backend: &'a mut B,
    pacing: Pacing,
    session: ScanSession,
}

impl<'a, B: Backend + ?Sized> FormScanner<'a, B> {
    pub fn new(backend: &'a mut B, pacing: Pacing) -> Self {
        Self {
            backend,
            pacing,
            session: ScanSession::default(),
        }
    }

    /// Scan an entire application form, including wizard steps.
    pub async fn scan(mut self, url: &str) -> Result<ScanReport, ScanError> {
        url::Url::parse(url).map_err(|e| ScanError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        tracing::info!(url, "starting form scan");
        self.backend.navigate(url).await?;
        sleep(self.pacing.post_click_settle).await;

        self.elicit_lazy_content().await?;

        log_pass("text inputs", self.scan_text_inputs().await);
        log_pass("textareas", self.scan_textareas().await);
        log_pass("file inputs", self.scan_file_inputs().await);
        log_pass("native selects", self.scan_native_selects().await);
        log_pass("custom dropdowns", self.scan_custom_dropdowns().await);
        log_pass("radio groups", self.scan_radio_groups().await);
        log_pass("checkboxes", self.scan_checkboxes().await);

        self.traverse_steps().await;

        let total = self.session.questions.len();
        tracing::info!(total, "scan complete");
        Ok(ScanReport {
            url: url.to_string(),
            questions: self.session.questions,
            total,
        })
    }

    /// Scroll to the bottom until the page height stops growing, then
    /// return to the top.
    async fn elicit_lazy_content(&mut self) -> Result<(), BackendError> {
        let mut last_height = self.backend.page_height().await?;

        for _ in 0..MAX_SCROLL_ROUNDS {
            self.backend.scroll_to_bottom().await?;

            // Poll for growth instead of sleeping a fixed beat; a stable
            // height within the window ends the loop.
            let deadline = Instant::now() + self.pacing.confirm_window;
            let mut new_height;
            loop {
                new_height = self.backend.page_height().await?;
                if new_height > last_height || Instant::now() >= deadline {
                    break;
                }
                sleep(self.pacing.poll_interval).await;
            }

            if new_height <= last_height {
                break;
            }
            last_height = new_height;
        }

        self.backend.scroll_to_top().await?;
        sleep(self.pacing.settle).await;
        Ok(())
    }

    async fn is_inside_dropdown(&mut self, node: NodeId) -> Result<bool, BackendError> {
        Ok(self
            .backend
            .closest(node, DROPDOWN_CONTAINER_SELECTOR)
            .await?
            .is_some())
    }

    async fn scan_text_inputs(&mut self) -> Result<(), BackendError> {
        for selector in TEXT_INPUT_SELECTORS {
            let inputs = self.backend.query(selector).await?;
            for input in inputs {
                if !input.is_interactable() {
                    continue;
                }
                // A combobox's internal text input is not a text field.
                if self.is_inside_dropdown(input.node).await? {
                    continue;
                }
                let Some(label) = labels::resolve_label(self.backend, &input).await? else {
                    continue;
                };
                self.session.push(Question {
                    question_text: label,
                    field_kind: FieldKind::Text,
                    options: None,
                    required: input.is_required(),
                    selector: selectors::css_for(&input),
                });
            }
        }
        Ok(())
    }

    async fn scan_textareas(&mut self) -> Result<(), BackendError> {
        let areas = self.backend.query("textarea").await?;
        for area in areas {
            if !area.is_interactable() {
                continue;
            }
            let Some(label) = labels::resolve_label(self.backend, &area).await? else {
                continue;
            };
            self.session.push(Question {
                question_text: label,
                field_kind: FieldKind::Textarea,
                options: None,
                required: area.is_required(),
                selector: selectors::css_for(&area),
            });
        }
        Ok(())
    }

    /// File inputs come in two shapes: a plain `<input type="file">`
    /// (often hidden, so visibility is not required) and vendor upload
    /// widgets wrapping one inside a styled container.
    async fn scan_file_inputs(&mut self) -> Result<(), BackendError> {
        let inputs = self.backend.query("input[type=\"file\"]").await?;
        for input in inputs {
            let label = match labels::resolve_label(self.backend, &input).await? {
                Some(label) => Some(label),
                None => self.file_label_fallback(&input).await?,
            };
            let Some(label) = label else { continue };
            if !self.session.seen_file_labels.insert(label.clone()) {
                continue;
            }
            self.session.push(Question {
                question_text: label,
                field_kind: FieldKind::File,
                options: None,
                required: input.is_required(),
                selector: selectors::css_for(&input),
            });
        }

        self.scan_upload_widgets().await
    }

    async fn file_label_fallback(
        &mut self,
        input: &ElementSnapshot,
    ) -> Result<Option<String>, BackendError> {
        // A label-styled element inside the enclosing field container.
        if let Some(container) = self
            .backend
            .closest(input.node, "div[class*=\"field\"]")
            .await?
        {
            let candidates = self
                .backend
                .query_within(container.node, "label, [class*=\"label\"]")
                .await?;
            if let Some(text) = candidates
                .iter()
                .filter_map(ElementSnapshot::text_trimmed)
                .next()
            {
                return Ok(labels::normalize(text));
            }
        }

        // Identifier heuristics as a last resort.
        Ok(match input.id_attr().map(str::to_lowercase) {
            Some(id) if id.contains("resume") => Some("Resume/CV".to_string()),
            Some(id) if id.contains("cover") => Some("Cover Letter".to_string()),
            _ => None,
        })
    }

    async fn scan_upload_widgets(&mut self) -> Result<(), BackendError> {
        for widget_selector in UPLOAD_WIDGET_SELECTORS {
            let sections = self.backend.query(widget_selector).await?;
            for section in sections {
                if !section.state.visible {
                    continue;
                }

                let heading = self
                    .backend
                    .query_within(section.node, "label, [class*=\"label\"], h3, h4")
                    .await?;
                let label = heading
                    .iter()
                    .filter_map(ElementSnapshot::text_trimmed)
                    .next()
                    .and_then(labels::normalize)
                    .or_else(|| {
                        let lower = widget_selector.to_lowercase();
                        if lower.contains("resume") {
                            Some("Resume/CV".to_string())
                        } else if lower.contains("cover") {
                            Some("Cover Letter".to_string())
                        } else {
                            None
                        }
                    });
                let Some(label) = label else { continue };
                if !self.session.seen_file_labels.insert(label.clone()) {
                    continue;
                }

                let inner = self
                    .backend
                    .query_within(section.node, "input[type=\"file\"]")
                    .await?;
                let selector = match inner.first() {
                    Some(input) => selectors::css_for(input),
                    None => match section.id_attr() {
                        Some(id) => format!("#{} input[type=\"file\"]", id),
                        None => continue,
                    },
                };

                let lowered = label.to_lowercase();
                let required = label.contains('*') || lowered.contains("required");
                self.session.push(Question {
                    question_text: label,
                    field_kind: FieldKind::File,
                    options: None,
                    required,
                    selector,
                });
            }
        }
        Ok(())
    }

    async fn scan_native_selects(&mut self) -> Result<(), BackendError> {
        let selects = self.backend.query("select").await?;
        for select in selects {
            if !select.is_interactable() {
                continue;
            }
            let Some(label) = labels::resolve_label(self.backend, &select).await? else {
                continue;
            };

            let options: Vec<String> = self
                .backend
                .query_within(select.node, "option")
                .await?
                .iter()
                .filter_map(ElementSnapshot::text_trimmed)
                .filter(|text| !is_placeholder_option(text))
                .map(str::to_string)
                .collect();

            // A select offering no real answer space is noise, not a field.
            if options.is_empty() {
                tracing::debug!(label = %label, "skipping select with no real options");
                continue;
            }

            self.session.push(Question {
                question_text: label,
                field_kind: FieldKind::Select,
                options: Some(options),
                required: select.is_required(),
                selector: selectors::css_for(&select),
            });
        }
        Ok(())
    }

    /// Virtualized dropdowns must be physically opened: their options are
    /// absent from the document until interaction.
    async fn scan_custom_dropdowns(&mut self) -> Result<(), BackendError> {
        for dropdown_selector in CUSTOM_DROPDOWN_SELECTORS {
            let dropdowns = self.backend.query(dropdown_selector).await?;
            for dropdown in dropdowns {
                if !dropdown.is_interactable() {
                    continue;
                }
                let Some(label) = labels::resolve_label(self.backend, &dropdown).await? else {
                    continue;
                };

                let options = self.open_and_collect_options(dropdown.node).await?;
                if options.is_empty() {
                    tracing::debug!(label = %label, "dropdown yielded no options, dropping");
                    continue;
                }

                self.session.push(Question {
                    question_text: label,
                    field_kind: FieldKind::Combobox,
                    options: Some(options),
                    required: dropdown.is_required(),
                    selector: selectors::css_for(&dropdown),
                });
            }
        }
        Ok(())
    }

    async fn open_and_collect_options(
        &mut self,
        node: NodeId,
    ) -> Result<Vec<String>, BackendError> {
        self.backend.scroll_into_view(node).await?;
        sleep(self.pacing.settle).await;

        if let Err(e) = self.backend.click(node).await {
            tracing::debug!(error = %e, "could not open dropdown");
            return Ok(Vec::new());
        }

        // Poll for the popup to render rather than sleeping a fixed beat.
        let deadline = Instant::now() + self.pacing.confirm_window;
        let mut options: Vec<String> = Vec::new();
        loop {
            for option_selector in OPTION_CONTAINER_SELECTORS {
                let rendered = self.backend.query(option_selector).await?;
                for option in rendered {
                    if !option.state.visible {
                        continue;
                    }
                    if let Some(text) = option.text_trimmed()
                        && !options.iter().any(|o| o == text)
                    {
                        options.push(text.to_string());
                    }
                }
                if !options.is_empty() {
                    break;
                }
            }
            if !options.is_empty() || Instant::now() >= deadline {
                break;
            }
            sleep(self.pacing.poll_interval).await;
        }

        // Close the popup (click elsewhere) so it cannot swallow the next
        // probe's clicks.
        if let Some(body) = self.backend.query("body").await?.into_iter().next() {
            let _ = self.backend.click(body.node).await;
        }
        sleep(self.pacing.settle).await;

        Ok(options)
    }

    async fn scan_radio_groups(&mut self) -> Result<(), BackendError> {
        let radios = self.backend.query("input[type=\"radio\"]").await?;
        for radio in radios {
            let Some(name) = radio.attr("name").map(str::to_string) else {
                continue;
            };
            if !self.session.processed_radio_groups.insert(name.clone()) {
                continue;
            }

            let group_selector = format!("input[type=\"radio\"][name=\"{}\"]", name);
            let group = self.backend.query(&group_selector).await?;
            let Some(first) = group.first().cloned() else {
                continue;
            };

            let Some(group_label) = labels::resolve_label(self.backend, &first).await? else {
                continue;
            };

            let mut options = Vec::new();
            for member in &group {
                if let Some(option_label) =
                    labels::radio_option_label(self.backend, member).await?
                    // An option label equal to the group label is noise
                    // from a shared container, not a real choice.
                    && option_label != group_label
                    && !options.contains(&option_label)
                {
                    options.push(option_label);
                }
            }
            if options.is_empty() {
                continue;
            }

            self.session.push(Question {
                question_text: group_label,
                field_kind: FieldKind::Radio,
                options: Some(options),
                required: first.is_required(),
                selector: group_selector,
            });
        }
        Ok(())
    }

    async fn scan_checkboxes(&mut self) -> Result<(), BackendError> {
        let checkboxes = self.backend.query("input[type=\"checkbox\"]").await?;
        for checkbox in checkboxes {
            if !checkbox.is_interactable() {
                continue;
            }
            let Some(label) = labels::resolve_label(self.backend, &checkbox).await? else {
                continue;
            };
            self.session.push(Question {
                question_text: label,
                field_kind: FieldKind::Checkbox,
                // Checkboxes are inherently binary, whatever the
                // surrounding markup says.
                options: Some(vec!["Yes".to_string(), "No".to_string()]),
                required: checkbox.is_required(),
                selector: selectors::css_for(&checkbox),
            });
        }
        Ok(())
    }

    /// Click through "next"/"continue" controls and re-classify each step.
    /// File scanning is assumed single-step and not repeated.
    async fn traverse_steps(&mut self) {
        for step in 1..MAX_STEPS {
            let next = match self.find_next_control().await {
                Ok(Some(next)) => next,
                Ok(None) => break,
                Err(e) => {
                    tracing::debug!(error = %e, "multi-step probing ended");
                    break;
                }
            };

            tracing::info!(step = step + 1, "multi-step form, advancing");
            if self.backend.scroll_into_view(next.node).await.is_err() {
                break;
            }
            sleep(self.pacing.settle).await;
            if self.backend.click(next.node).await.is_err() {
                break;
            }
            sleep(self.pacing.post_click_settle).await;

            log_pass("text inputs", self.scan_text_inputs().await);
            log_pass("textareas", self.scan_textareas().await);
            log_pass("native selects", self.scan_native_selects().await);
            log_pass("custom dropdowns", self.scan_custom_dropdowns().await);
            log_pass("radio groups", self.scan_radio_groups().await);
            log_pass("checkboxes", self.scan_checkboxes().await);
        }
    }

    /// Prioritized next-control heuristics, first hit wins.
    async fn find_next_control(&mut self) -> Result<Option<ElementSnapshot>, BackendError> {
        let buttons = self.backend.query("button").await?;
        if let Some(button) = buttons.iter().find(|b| {
            b.state.visible
                && b.text_trimmed().is_some_and(|t| {
                    let lower = t.to_lowercase();
                    lower.contains("next") || lower.contains("continue")
                })
        }) {
            return Ok(Some(button.clone()));
        }

        let submits = self.backend.query("input[type=\"submit\"]").await?;
        if let Some(submit) = submits.iter().find(|s| {
            s.state.visible
                && s.attr("value")
                    .is_some_and(|v| v.to_lowercase().contains("next"))
        }) {
            return Ok(Some(submit.clone()));
        }

        for convention in ["[data-testid*=\"next\"]", ".next-button"] {
            let matches = self.backend.query(convention).await?;
            if let Some(hit) = matches.iter().find(|m| m.state.visible) {
                return Ok(Some(hit.clone()));
            }
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::is_placeholder_option;

    #[test]
    fn placeholder_texts_are_filtered() {
        assert!(is_placeholder_option("Select..."));
        assert!(is_placeholder_option("  choose...  "));
        assert!(is_placeholder_option("--"));
        assert!(is_placeholder_option("Please select"));
        assert!(is_placeholder_option(""));
        assert!(!is_placeholder_option("United States"));
    }
}

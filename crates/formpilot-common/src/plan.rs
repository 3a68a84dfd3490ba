//! Shared data model for the scan and fill pipelines.
//!
//! The scanner emits [`Question`]s and the execution engine consumes
//! [`Action`]s; both sides share the [`FieldKind`] taxonomy and the selector
//! addressing scheme, which is the contract between the two halves.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Closed set of field kinds understood by both the scanner and the engine.
///
/// Every kind has exactly one executor and one verification strategy; an
/// `Action` whose kind has no registered executor is a configuration error,
/// not a per-action failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Single-line text input (text/email/tel/number/url).
    Text,
    /// Multi-line `<textarea>`.
    Textarea,
    /// File upload input.
    File,
    /// Radio button group addressed by a shared `name` attribute.
    Radio,
    Checkbox,
    /// Native `<select>` element.
    Select,
    /// Virtualized/ARIA combobox whose options are absent until opened.
    Combobox,
    /// Generic click target (submit/apply buttons and the like).
    Click,
}

impl FieldKind {
    /// Whether an action of this kind needs a value to be meaningful.
    /// Valueless actions of value-carrying kinds are skipped, not failed.
    pub fn needs_value(self) -> bool {
        !matches!(self, FieldKind::Click)
    }
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FieldKind::Text => "text",
            FieldKind::Textarea => "textarea",
            FieldKind::File => "file",
            FieldKind::Radio => "radio",
            FieldKind::Checkbox => "checkbox",
            FieldKind::Select => "select",
            FieldKind::Combobox => "combobox",
            FieldKind::Click => "click",
        };
        f.write_str(name)
    }
}

/// A fillable question discovered on a page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub question_text: String,
    pub field_kind: FieldKind,
    /// Answer space for select/combobox/radio/checkbox kinds. Never an empty
    /// vector: fields with no enumerable options are dropped by the scanner.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    pub required: bool,
    /// Best-effort stable address: id-based, then name-based, then
    /// tag+class. Uniqueness is not guaranteed by construction.
    pub selector: String,
}

/// Scanner output for one page session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    pub url: String,
    pub questions: Vec<Question>,
    pub total: usize,
}

/// The value applied by an action: text for most kinds, a flag for
/// checkboxes (and occasionally radios addressed by boolean).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ActionValue {
    Flag(bool),
    Text(String),
}

impl ActionValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ActionValue::Text(s) => Some(s),
            ActionValue::Flag(_) => None,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self {
            ActionValue::Flag(b) => Some(*b),
            ActionValue::Text(_) => None,
        }
    }
}

/// One step of a fill plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    pub id: String,
    pub kind: FieldKind,
    pub selector: String,
    #[serde(default)]
    pub value: Option<ActionValue>,
    #[serde(default)]
    pub required: bool,
    /// Caller-supplied name for inline file payloads.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

impl Action {
    pub fn text_value(&self) -> Option<&str> {
        self.value.as_ref().and_then(ActionValue::as_text)
    }

    pub fn flag_value(&self) -> Option<bool> {
        self.value.as_ref().and_then(ActionValue::as_flag)
    }
}

/// An ordered fill plan addressing a single page. Actions execute in listed
/// order; the order is caller-supplied and respected as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FillPlan {
    pub target_url: String,
    pub actions: Vec<Action>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    Success,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    Failed,
}

/// Aggregated outcome of executing a fill plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub status: RunStatus,
    /// Per-action status keyed by action id. BTreeMap keeps serialized
    /// reports deterministic.
    pub results: BTreeMap<String, ActionStatus>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub errors: BTreeMap<String, String>,
}

impl ExecutionReport {
    pub fn status_of(&self, action_id: &str) -> Option<ActionStatus> {
        self.results.get(action_id).copied()
    }
}

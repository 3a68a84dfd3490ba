//! Post-hoc field verification.
//!
//! Stateless and independent of which executor wrote the value: the field
//! is re-queried by selector and its observed state compared against the
//! intent. Executors call this after applying; callers may invoke it again
//! after a run.

use crate::backend::{Backend, BackendError, ElementSnapshot};
use formpilot_common::plan::{ActionValue, FieldKind};

/// Check that the field addressed by `selector` reflects `expected`.
///
/// Dispatch is by field kind:
/// - text kinds compare for exact value equality;
/// - file inputs only check for a non-empty file reference (content
///   equality is not observable client-side);
/// - radio/checkbox compare checked-state against a flag, or merely require
///   checked-state when the expectation is descriptive text;
/// - select/combobox accept a case-insensitive value-substring match, the
///   combobox additionally accepting a reported-closed popup as a proxy for
///   a committed selection;
/// - anything else verifies as presence-only, a deliberately permissive
///   default that avoids false negatives outside the closed taxonomy.
pub async fn verify<B: Backend + ?Sized>(
    backend: &mut B,
    selector: &str,
    kind: FieldKind,
    expected: &ActionValue,
) -> Result<bool, BackendError> {
    let Some(snapshot) = backend.query(selector).await?.into_iter().next() else {
        return Ok(false);
    };
    Ok(matches_expectation(&snapshot, kind, expected))
}

pub(crate) fn matches_expectation(
    snapshot: &ElementSnapshot,
    kind: FieldKind,
    expected: &ActionValue,
) -> bool {
    match kind {
        FieldKind::Text | FieldKind::Textarea => match expected {
            ActionValue::Text(want) => snapshot.value.as_deref() == Some(want.as_str()),
            ActionValue::Flag(_) => false,
        },
        FieldKind::File => snapshot.value.as_deref().is_some_and(|v| !v.is_empty()),
        FieldKind::Radio | FieldKind::Checkbox => match expected {
            ActionValue::Flag(want) => snapshot.state.checked == *want,
            // Descriptive text: the executor already chose the element;
            // all that can be checked here is that it is selected.
            ActionValue::Text(_) => snapshot.state.checked,
        },
        FieldKind::Select | FieldKind::Combobox => {
            let text_match = match expected {
                ActionValue::Text(want) => snapshot
                    .value
                    .as_deref()
                    .is_some_and(|v| v.to_lowercase().contains(&want.to_lowercase())),
                ActionValue::Flag(_) => false,
            };
            if text_match {
                return true;
            }
            kind == FieldKind::Combobox && snapshot.state.expanded == Some(false)
        }
        FieldKind::Click => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ElementState;

    fn input(value: Option<&str>, state: ElementState) -> ElementSnapshot {
        ElementSnapshot {
            node: 1,
            tag: "input".into(),
            text: None,
            value: value.map(str::to_string),
            attributes: Default::default(),
            state,
        }
    }

    #[test]
    fn text_requires_exact_equality() {
        let snap = input(Some("Ada"), ElementState::default());
        assert!(matches_expectation(
            &snap,
            FieldKind::Text,
            &ActionValue::Text("Ada".into())
        ));
        // A near-miss is a failure, not a partial success.
        assert!(!matches_expectation(
            &snap,
            FieldKind::Text,
            &ActionValue::Text("Ada ".into())
        ));
    }

    #[test]
    fn file_checks_non_empty_only() {
        let full = input(Some("C:\\fakepath\\resume.pdf"), ElementState::default());
        let empty = input(Some(""), ElementState::default());
        let want = ActionValue::Text("resume.pdf".into());
        assert!(matches_expectation(&full, FieldKind::File, &want));
        assert!(!matches_expectation(&empty, FieldKind::File, &want));
    }

    #[test]
    fn combobox_accepts_closed_popup_as_commit() {
        let snap = input(
            Some(""),
            ElementState {
                expanded: Some(false),
                ..Default::default()
            },
        );
        assert!(matches_expectation(
            &snap,
            FieldKind::Combobox,
            &ActionValue::Text("United States".into())
        ));
    }

    #[test]
    fn dropdown_substring_is_case_insensitive() {
        let snap = input(Some("United States of America"), ElementState::default());
        assert!(matches_expectation(
            &snap,
            FieldKind::Select,
            &ActionValue::Text("united states".into())
        ));
    }

    #[test]
    fn checkbox_compares_flag() {
        let checked = input(
            None,
            ElementState {
                checked: true,
                ..Default::default()
            },
        );
        assert!(matches_expectation(
            &checked,
            FieldKind::Checkbox,
            &ActionValue::Flag(true)
        ));
        assert!(!matches_expectation(
            &checked,
            FieldKind::Checkbox,
            &ActionValue::Flag(false)
        ));
    }
}

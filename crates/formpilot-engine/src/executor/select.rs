//! Native `<select>` dropdowns.

use crate::backend::{Backend, ElementSnapshot};
use crate::executor::{ActionExecutor, bring_into_view};
use crate::locator;
use crate::pacing::Pacing;
use async_trait::async_trait;
use formpilot_common::error::FillError;
use formpilot_common::plan::Action;

/// Match order: exact visible text, exact underlying value, then
/// case-insensitive substring over visible text. Multiple substring hits
/// are broken by string similarity so "United States" beats
/// "United States Minor Outlying Islands" for the input "United States".
pub struct SelectExecutor;

struct OptionEntry {
    text: String,
    value: String,
}

impl SelectExecutor {
    fn pick<'a>(options: &'a [OptionEntry], wanted: &str) -> Option<&'a OptionEntry> {
        if let Some(hit) = options.iter().find(|o| o.text == wanted) {
            return Some(hit);
        }
        if let Some(hit) = options.iter().find(|o| o.value == wanted) {
            return Some(hit);
        }

        let wanted_lower = wanted.to_lowercase();
        options
            .iter()
            .filter(|o| o.text.to_lowercase().contains(&wanted_lower))
            .max_by(|a, b| {
                let sa = strsim::jaro_winkler(&a.text.to_lowercase(), &wanted_lower);
                let sb = strsim::jaro_winkler(&b.text.to_lowercase(), &wanted_lower);
                sa.partial_cmp(&sb).unwrap_or(std::cmp::Ordering::Equal)
            })
    }
}

#[async_trait]
impl ActionExecutor for SelectExecutor {
    async fn attempt(
        &self,
        backend: &mut dyn Backend,
        action: &Action,
        pacing: &Pacing,
    ) -> Result<(), FillError> {
        let wanted = action
            .text_value()
            .ok_or_else(|| {
                FillError::Decode(format!("select action '{}' has no value", action.id))
            })?
            .to_string();

        let element = locator::locate(backend, &action.selector, pacing).await?;
        bring_into_view(backend, &element, pacing).await?;

        let options: Vec<OptionEntry> = backend
            .query_within(element.node, "option")
            .await?
            .iter()
            .map(|o| OptionEntry {
                text: o.text_trimmed().unwrap_or_default().to_string(),
                value: o
                    .attr("value")
                    .map(str::to_string)
                    .unwrap_or_else(|| o.text_trimmed().unwrap_or_default().to_string()),
            })
            .collect();

        let Some(chosen) = Self::pick(&options, &wanted) else {
            return Err(FillError::VerificationMismatch(format!(
                "no option found matching '{}'",
                wanted
            )));
        };
        let (chosen_text, chosen_value) = (chosen.text.clone(), chosen.value.clone());

        backend.select_option(element.node, &chosen_value).await?;
        tokio::time::sleep(pacing.settle).await;

        let selected = backend
            .query_within(element.node, "option")
            .await?
            .into_iter()
            .find(|o| o.state.selected);
        let confirmed = selected.is_some_and(|o| {
            o.text_trimmed() == Some(chosen_text.as_str()) || o.attr("value") == Some(&chosen_value)
        });

        if confirmed {
            Ok(())
        } else {
            Err(FillError::VerificationMismatch(format!(
                "option '{}' was not selected",
                chosen_text
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> Vec<OptionEntry> {
        [
            ("United States", "US"),
            ("United States Minor Outlying Islands", "UM"),
            ("Canada", "CA"),
        ]
        .into_iter()
        .map(|(t, v)| OptionEntry {
            text: t.into(),
            value: v.into(),
        })
        .collect()
    }

    #[test]
    fn exact_text_wins() {
        let opts = options();
        let hit = SelectExecutor::pick(&opts, "United States").unwrap();
        assert_eq!(hit.value, "US");
    }

    #[test]
    fn exact_value_beats_substring() {
        let opts = options();
        let hit = SelectExecutor::pick(&opts, "UM").unwrap();
        assert_eq!(hit.text, "United States Minor Outlying Islands");
    }

    #[test]
    fn substring_prefers_closest_text() {
        let opts = options();
        let hit = SelectExecutor::pick(&opts, "united states").unwrap();
        assert_eq!(hit.value, "US");
    }

    #[test]
    fn no_match_is_none() {
        assert!(SelectExecutor::pick(&options(), "Germany").is_none());
    }
}

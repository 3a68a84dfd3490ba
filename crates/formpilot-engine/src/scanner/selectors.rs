//! Best-effort stable selector generation for discovered elements.
//!
//! Preference order: id, name attribute, tag plus leading classes, bare
//! tag. Uniqueness is not guaranteed by construction; execution-time
//! ambiguity is handled (and flagged) by the locator.

use crate::backend::ElementSnapshot;

/// Whether an id needs the `[id="..."]` attribute form instead of `#id`.
/// Ids minted by form builders routinely contain brackets, dots or colons,
/// none of which survive unescaped in a `#` selector.
fn needs_attribute_form(id: &str) -> bool {
    let mut chars = id.chars();
    match chars.next() {
        None => return true,
        Some(first) if first.is_ascii_digit() => return true,
        Some(first) if !(first.is_ascii_alphanumeric() || first == '-' || first == '_') => {
            return true;
        }
        Some(_) => {}
    }
    !id.chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn is_simple_class(class: &str) -> bool {
    !class.is_empty()
        && class
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

pub fn css_for(snapshot: &ElementSnapshot) -> String {
    if let Some(id) = snapshot.id_attr() {
        return if needs_attribute_form(id) {
            format!("[id=\"{}\"]", id)
        } else {
            format!("#{}", id)
        };
    }

    if let Some(name) = snapshot.attr("name").filter(|n| !n.is_empty()) {
        return format!("{}[name=\"{}\"]", snapshot.tag, name);
    }

    let classes: Vec<&str> = snapshot
        .attr("class")
        .unwrap_or("")
        .split_whitespace()
        .filter(|c| is_simple_class(c))
        .take(2)
        .collect();
    if classes.is_empty() {
        snapshot.tag.clone()
    } else {
        format!("{}.{}", snapshot.tag, classes.join("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn snapshot(tag: &str, attrs: &[(&str, &str)]) -> ElementSnapshot {
        ElementSnapshot {
            node: 1,
            tag: tag.into(),
            text: None,
            value: None,
            attributes: attrs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>(),
            state: Default::default(),
        }
    }

    #[test]
    fn plain_id_uses_hash_form() {
        let snap = snapshot("input", &[("id", "first_name")]);
        assert_eq!(css_for(&snap), "#first_name");
    }

    #[test]
    fn special_id_uses_attribute_form() {
        let snap = snapshot("input", &[("id", "question[123].answer")]);
        assert_eq!(css_for(&snap), "[id=\"question[123].answer\"]");
    }

    #[test]
    fn leading_digit_uses_attribute_form() {
        let snap = snapshot("input", &[("id", "4a-field")]);
        assert_eq!(css_for(&snap), "[id=\"4a-field\"]");
    }

    #[test]
    fn name_fallback() {
        let snap = snapshot("select", &[("name", "country")]);
        assert_eq!(css_for(&snap), "select[name=\"country\"]");
    }

    #[test]
    fn class_fallback_takes_two() {
        let snap = snapshot("input", &[("class", "form-control input-lg extra")]);
        assert_eq!(css_for(&snap), "input.form-control.input-lg");
    }

    #[test]
    fn bare_tag_when_nothing_else() {
        let snap = snapshot("textarea", &[]);
        assert_eq!(css_for(&snap), "textarea");
    }
}

//! crates/module_assistant_core/src/markup.rs
//!
//! Small HTML helpers used when rendering generated section bodies.

use regex::Regex;
use std::sync::OnceLock;

fn id_attributes() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"\bid="([A-Za-z][\w.:-]*)""#).expect("valid regex"))
}

/// Escapes text for inclusion in HTML element content or attributes.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Suffixes every element id in the fragment, and every reference to one,
/// so that a template skeleton can be duplicated across sections on the
/// same page without id collisions.
///
/// References rewritten alongside `id="x"`: `href="#x"`, `data-target`,
/// `data-bs-target`, `aria-labelledby`, `aria-controls`, and label `for`.
pub fn ensure_unique_ids(html: &str, suffix: &str) -> String {
    let ids: Vec<String> = id_attributes()
        .captures_iter(html)
        .map(|captures| captures[1].to_owned())
        .collect();

    let mut rewritten = html.to_owned();
    for id in ids {
        let unique = format!("{id}-{suffix}");
        for (pattern, replacement) in [
            (format!(r#"id="{id}""#), format!(r#"id="{unique}""#)),
            (format!(r##"href="#{id}""##), format!(r##"href="#{unique}""##)),
            (
                format!(r##"data-target="#{id}""##),
                format!(r##"data-target="#{unique}""##),
            ),
            (
                format!(r##"data-bs-target="#{id}""##),
                format!(r##"data-bs-target="#{unique}""##),
            ),
            (
                format!(r#"aria-labelledby="{id}""#),
                format!(r#"aria-labelledby="{unique}""#),
            ),
            (
                format!(r#"aria-controls="{id}""#),
                format!(r#"aria-controls="{unique}""#),
            ),
            (format!(r#"for="{id}""#), format!(r#"for="{unique}""#)),
        ] {
            rewritten = rewritten.replace(&pattern, &replacement);
        }
    }
    rewritten
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_html_special_characters() {
        assert_eq!(
            escape_html(r#"<b>"Fish & Chips"</b>"#),
            "&lt;b&gt;&quot;Fish &amp; Chips&quot;&lt;/b&gt;"
        );
    }

    #[test]
    fn suffixes_ids_and_their_references() {
        let html = r##"<div id="acc1"><a href="#acc1" aria-controls="acc1">open</a></div>"##;
        let unique = ensure_unique_ids(html, "sec3");
        assert!(unique.contains(r#"id="acc1-sec3""#));
        assert!(unique.contains(r##"href="#acc1-sec3""##));
        assert!(unique.contains(r#"aria-controls="acc1-sec3""#));
        assert!(!unique.contains(r#"id="acc1""#));
    }

    #[test]
    fn distinct_ids_do_not_cross_contaminate() {
        let html = r#"<div id="a"></div><div id="ab"></div>"#;
        let unique = ensure_unique_ids(html, "s1");
        assert!(unique.contains(r#"id="a-s1""#));
        assert!(unique.contains(r#"id="ab-s1""#));
    }

    #[test]
    fn html_without_ids_is_untouched() {
        let html = "<p>plain</p>";
        assert_eq!(ensure_unique_ids(html, "s1"), html);
    }
}

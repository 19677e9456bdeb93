//! crates/module_assistant_core/src/summary.rs
//!
//! Produces the short human summary shown on the preview screen: the
//! AI-supplied overview when one exists, otherwise a deterministic count
//! of what the plan would create.

use crate::outline::ModuleOutline;

/// Summarizes a validated outline for the approval preview.
///
/// Returns the empty string only when the outline has no summary and
/// nothing countable.
pub fn summarize(outline: &ModuleOutline) -> String {
    if let Some(summary) = outline.summary() {
        return summary.to_owned();
    }
    fallback_summary(outline)
}

/// Readable fallback when the AI description is unavailable.
fn fallback_summary(outline: &ModuleOutline) -> String {
    match outline {
        ModuleOutline::Themes { themes, .. } => {
            if themes.is_empty() {
                return String::new();
            }
            let weeks: usize = themes.iter().map(|theme| theme.weeks.len()).sum();
            format!(
                "The plan creates {} themed sections spanning approximately {} delivery weeks.",
                themes.len(),
                weeks
            )
        }
        ModuleOutline::Sections { sections, .. } => {
            if sections.is_empty() {
                return String::new();
            }
            let outline_items: usize = sections
                .iter()
                .map(|section| {
                    section
                        .outline
                        .iter()
                        .filter(|entry| !entry.trim().is_empty())
                        .count()
                })
                .sum();
            format!(
                "The plan creates {} weekly sections with around {} suggested activities and resources.",
                sections.len(),
                outline_items
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{SectionPlan, StructureType, ThemePlan, WeekPlan};
    use serde_json::json;

    #[test]
    fn ai_supplied_summary_wins() {
        let value = json!({"summary": "Four weeks of SQL", "sections": [{"summary": ""}]});
        let outline = ModuleOutline::from_value(&value, StructureType::Weekly).unwrap();
        assert_eq!(summarize(&outline), "Four weeks of SQL");
    }

    #[test]
    fn weekly_fallback_counts_sections_and_bullets() {
        let outline = ModuleOutline::Sections {
            summary: None,
            sections: vec![
                SectionPlan {
                    outline: vec!["Read intro".into(), "  ".into(), "Do exercise".into()],
                    ..Default::default()
                },
                SectionPlan {
                    outline: vec!["Review".into()],
                    ..Default::default()
                },
            ],
        };
        assert_eq!(
            summarize(&outline),
            "The plan creates 2 weekly sections with around 3 suggested activities and resources."
        );
    }

    #[test]
    fn theme_fallback_counts_themes_and_weeks() {
        let outline = ModuleOutline::Themes {
            summary: None,
            themes: vec![
                ThemePlan {
                    weeks: vec![WeekPlan::default(), WeekPlan::default()],
                    ..Default::default()
                },
                ThemePlan {
                    weeks: vec![WeekPlan::default()],
                    ..Default::default()
                },
            ],
        };
        assert_eq!(
            summarize(&outline),
            "The plan creates 2 themed sections spanning approximately 3 delivery weeks."
        );
    }

    #[test]
    fn empty_outline_summarizes_to_empty_string() {
        let outline = ModuleOutline::Sections {
            summary: None,
            sections: Vec::new(),
        };
        assert_eq!(summarize(&outline), "");
    }
}

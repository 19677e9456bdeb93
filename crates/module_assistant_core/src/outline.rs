//! crates/module_assistant_core/src/outline.rs
//!
//! The contract for the AI response: a tagged union over the requested
//! structure type, with a validating parse as the only way in from
//! untrusted backend output.
//!
//! The parse is tolerant at the entry level (non-object entries in the
//! top-level array are skipped) but strict at the top level: a response
//! whose shape does not match the requested structure type is a
//! validation error, never a partial plan.

use crate::domain::{ActivityPlan, SectionPlan, StructureType, ThemePlan, WeekPlan};
use serde_json::{json, Map, Value};

/// A malformed or mismatched AI response. Distinct from a backend failure:
/// the backend answered, but the answer cannot be used.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[error("{message}")]
pub struct ValidationError {
    pub message: String,
}

impl ValidationError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// The validated structured plan returned by the generation backend.
#[derive(Debug, Clone, PartialEq)]
pub enum ModuleOutline {
    /// Weekly and flexible structures share the flat `sections` shape.
    Sections {
        summary: Option<String>,
        sections: Vec<SectionPlan>,
    },
    /// The themed structure nests delivery weeks inside each theme.
    Themes {
        summary: Option<String>,
        themes: Vec<ThemePlan>,
    },
}

impl ModuleOutline {
    /// Validating parse from decoded JSON against the requested structure
    /// type. The top-level key must be present and be an array; entries
    /// that are not objects are silently dropped.
    pub fn from_value(value: &Value, structure: StructureType) -> Result<Self, ValidationError> {
        let object = value.as_object().ok_or_else(|| {
            ValidationError::new("The AI response is not a JSON object.")
        })?;
        let summary = non_empty_string(object.get("summary"));

        match structure {
            StructureType::Theme => {
                let themes = object
                    .get("themes")
                    .and_then(Value::as_array)
                    .ok_or_else(|| {
                        ValidationError::new(
                            "Expected a top-level \"themes\" array for the themed structure.",
                        )
                    })?;
                Ok(Self::Themes {
                    summary,
                    themes: themes.iter().filter_map(parse_theme).collect(),
                })
            }
            StructureType::Weekly | StructureType::Flexible => {
                let sections = object
                    .get("sections")
                    .and_then(Value::as_array)
                    .ok_or_else(|| {
                        ValidationError::new(format!(
                            "Expected a top-level \"sections\" array for the {} structure.",
                            structure.as_str()
                        ))
                    })?;
                Ok(Self::Sections {
                    summary,
                    sections: sections.iter().filter_map(parse_section).collect(),
                })
            }
        }
    }

    /// Re-encodes the outline into the same JSON shape the parse accepts.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Sections { summary, sections } => {
                let mut object = Map::new();
                if let Some(summary) = summary {
                    object.insert("summary".into(), json!(summary));
                }
                object.insert(
                    "sections".into(),
                    Value::Array(sections.iter().map(section_to_value).collect()),
                );
                Value::Object(object)
            }
            Self::Themes { summary, themes } => {
                let mut object = Map::new();
                if let Some(summary) = summary {
                    object.insert("summary".into(), json!(summary));
                }
                object.insert(
                    "themes".into(),
                    Value::Array(themes.iter().map(theme_to_value).collect()),
                );
                Value::Object(object)
            }
        }
    }

    /// The AI-supplied overall summary, when one was present.
    pub fn summary(&self) -> Option<&str> {
        match self {
            Self::Sections { summary, .. } | Self::Themes { summary, .. } => summary.as_deref(),
        }
    }
}

//=========================================================================================
// Tolerant Entry Parsing
//=========================================================================================

fn non_empty_string(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_owned)
}

fn string_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    object.get(key).and_then(Value::as_str).map(str::to_owned)
}

fn parse_activities(value: Option<&Value>) -> Vec<ActivityPlan> {
    value
        .and_then(Value::as_array)
        .map(|entries| entries.iter().filter_map(parse_activity).collect())
        .unwrap_or_default()
}

fn parse_activity(value: &Value) -> Option<ActivityPlan> {
    let object = value.as_object()?;
    let kind = object.get("type")?.as_str()?.trim();
    if kind.is_empty() {
        return None;
    }
    let extra: Map<String, Value> = object
        .iter()
        .filter(|(key, _)| !matches!(key.as_str(), "type" | "name" | "description"))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    Some(ActivityPlan {
        kind: kind.to_owned(),
        name: string_field(object, "name"),
        description: string_field(object, "description"),
        extra,
    })
}

fn parse_outline(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default()
}

fn parse_section(value: &Value) -> Option<SectionPlan> {
    let object = value.as_object()?;
    Some(SectionPlan {
        title: string_field(object, "title"),
        summary: string_field(object, "summary").unwrap_or_default(),
        outline: parse_outline(object.get("outline")),
        activities: parse_activities(object.get("activities")),
    })
}

fn parse_week(value: &Value) -> Option<WeekPlan> {
    let object = value.as_object()?;
    Some(WeekPlan {
        title: string_field(object, "title"),
        summary: string_field(object, "summary").unwrap_or_default(),
        activities: parse_activities(object.get("activities")),
    })
}

fn parse_theme(value: &Value) -> Option<ThemePlan> {
    let object = value.as_object()?;
    let weeks = object
        .get("weeks")
        .and_then(Value::as_array)
        .map(|entries| entries.iter().filter_map(parse_week).collect())
        .unwrap_or_default();
    Some(ThemePlan {
        title: string_field(object, "title"),
        summary: string_field(object, "summary").unwrap_or_default(),
        activities: parse_activities(object.get("activities")),
        weeks,
    })
}

//=========================================================================================
// Re-encoding
//=========================================================================================

fn activity_to_value(activity: &ActivityPlan) -> Value {
    let mut object = Map::new();
    object.insert("type".into(), json!(activity.kind));
    if let Some(name) = &activity.name {
        object.insert("name".into(), json!(name));
    }
    if let Some(description) = &activity.description {
        object.insert("description".into(), json!(description));
    }
    for (key, value) in &activity.extra {
        object.insert(key.clone(), value.clone());
    }
    Value::Object(object)
}

fn section_to_value(section: &SectionPlan) -> Value {
    let mut object = Map::new();
    if let Some(title) = &section.title {
        object.insert("title".into(), json!(title));
    }
    object.insert("summary".into(), json!(section.summary));
    object.insert("outline".into(), json!(section.outline));
    object.insert(
        "activities".into(),
        Value::Array(section.activities.iter().map(activity_to_value).collect()),
    );
    Value::Object(object)
}

fn week_to_value(week: &WeekPlan) -> Value {
    let mut object = Map::new();
    if let Some(title) = &week.title {
        object.insert("title".into(), json!(title));
    }
    object.insert("summary".into(), json!(week.summary));
    object.insert(
        "activities".into(),
        Value::Array(week.activities.iter().map(activity_to_value).collect()),
    );
    Value::Object(object)
}

fn theme_to_value(theme: &ThemePlan) -> Value {
    let mut object = Map::new();
    if let Some(title) = &theme.title {
        object.insert("title".into(), json!(title));
    }
    object.insert("summary".into(), json!(theme.summary));
    object.insert(
        "activities".into(),
        Value::Array(theme.activities.iter().map(activity_to_value).collect()),
    );
    object.insert(
        "weeks".into(),
        Value::Array(theme.weeks.iter().map(week_to_value).collect()),
    );
    Value::Object(object)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weekly_outline_parses_sections_in_order() {
        let value = json!({
            "summary": "Two weeks of material",
            "sections": [
                {"title": "Week 1", "summary": "Basics", "outline": ["Read intro", "Do exercise"]},
                {"title": "Week 2", "summary": "More", "activities": [{"type": "quiz", "name": "Quiz 1"}]}
            ]
        });
        let outline = ModuleOutline::from_value(&value, StructureType::Weekly).unwrap();
        match &outline {
            ModuleOutline::Sections { summary, sections } => {
                assert_eq!(summary.as_deref(), Some("Two weeks of material"));
                assert_eq!(sections.len(), 2);
                assert_eq!(sections[0].title.as_deref(), Some("Week 1"));
                assert_eq!(sections[0].outline.len(), 2);
                assert_eq!(sections[1].activities[0].kind, "quiz");
            }
            _ => panic!("expected a sections outline"),
        }
    }

    #[test]
    fn non_object_entries_are_skipped() {
        let value = json!({
            "sections": [
                "just a string",
                42,
                null,
                {"title": "Kept", "summary": ""}
            ]
        });
        let outline = ModuleOutline::from_value(&value, StructureType::Flexible).unwrap();
        match outline {
            ModuleOutline::Sections { sections, .. } => {
                assert_eq!(sections.len(), 1);
                assert_eq!(sections[0].title.as_deref(), Some("Kept"));
            }
            _ => panic!("expected a sections outline"),
        }
    }

    #[test]
    fn mismatched_top_level_key_is_a_validation_error() {
        let value = json!({"themes": [{"title": "T1", "summary": ""}]});
        let err = ModuleOutline::from_value(&value, StructureType::Weekly).unwrap_err();
        assert!(err.message.contains("sections"));
    }

    #[test]
    fn theme_outline_collects_weeks_and_activities() {
        let value = json!({
            "themes": [{
                "title": "Foundations",
                "summary": "<p>Intro</p>",
                "activities": [{"type": "forum", "name": "Welcome forum"}],
                "weeks": [
                    {"title": "Week 1", "summary": "Start", "activities": [{"type": "quiz", "name": "Check"}]},
                    "bogus"
                ]
            }]
        });
        let outline = ModuleOutline::from_value(&value, StructureType::Theme).unwrap();
        match outline {
            ModuleOutline::Themes { themes, .. } => {
                assert_eq!(themes.len(), 1);
                assert_eq!(themes[0].weeks.len(), 1);
                assert_eq!(themes[0].activities[0].kind, "forum");
                assert_eq!(themes[0].weeks[0].activities[0].kind, "quiz");
            }
            _ => panic!("expected a themes outline"),
        }
    }

    #[test]
    fn activity_extra_fields_are_preserved() {
        let value = json!({
            "sections": [{
                "summary": "",
                "activities": [{"type": "url", "name": "Reading", "externalurl": "https://example.com"}]
            }]
        });
        let outline = ModuleOutline::from_value(&value, StructureType::Weekly).unwrap();
        match outline {
            ModuleOutline::Sections { sections, .. } => {
                let activity = &sections[0].activities[0];
                assert_eq!(
                    activity.extra.get("externalurl").and_then(Value::as_str),
                    Some("https://example.com")
                );
            }
            _ => panic!("expected a sections outline"),
        }
    }

    #[test]
    fn round_trips_through_to_value() {
        let value = json!({
            "summary": "Overview",
            "themes": [{
                "title": "T1",
                "summary": "S",
                "activities": [{"type": "book", "name": "Reader", "description": "Read it"}],
                "weeks": [{"title": "W1", "summary": "", "activities": []}]
            }]
        });
        let outline = ModuleOutline::from_value(&value, StructureType::Theme).unwrap();
        let reparsed = ModuleOutline::from_value(&outline.to_value(), StructureType::Theme).unwrap();
        assert_eq!(outline, reparsed);
    }
}

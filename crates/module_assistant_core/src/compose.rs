//! crates/module_assistant_core/src/compose.rs
//!
//! Merges the instructor's prompt, the structure-type instructions, the
//! activity-inclusion policy, optional curriculum-template data, and
//! extracted supporting texts into one generation request.
//!
//! Composition is deterministic: the same inputs always produce the same
//! composed text. Any randomness lives behind the generation backend.

use crate::domain::{GenerationRequest, StructureType, TemplateData};
use std::fmt::Write;

const WEEKLY_INSTRUCTION: &str = "Structure the module as sequential weekly teaching sections \
with clear titles, summaries, and an outline array of 3-5 bullet points describing \
activities/resources.";

const THEME_INSTRUCTION: &str = "Structure the module into distinct themes. For each theme \
provide a high-level summary and include an array of weekly entries that detail how the theme \
is delivered over time.";

const FLEXIBLE_INSTRUCTION: &str = "Structure the module as sequential sections with clear \
titles, summaries, and an outline array of 3-5 bullet points describing activities/resources. \
This format uses the Flexible Sections course format if available.";

const NO_ACTIVITIES_INSTRUCTION: &str = "IMPORTANT: Do NOT include an 'activities' array in \
your response. Create section headings and summaries only. The sections should be structured \
with titles and descriptions, but do not suggest any activities, quizzes, or resources. This \
allows the user to add their own content.";

const ACTIVITY_GUIDANCE: &str = r#"ACTIVITY GUIDANCE AND COHERENCE - CRITICAL REQUIREMENTS:

AUDIENCE: All summaries, guidance, and activity descriptions must be written for UK UNIVERSITY STUDENTS. Use appropriate academic language and assume prior tertiary-level education.

ACTIVITY REQUIREMENTS:
- Each week MUST include AT LEAST ONE activity, maximum 5 activities per week (or as many as the content supports, up to 5)
- External links and face-to-face activities do not count toward the activity limit and can be included as described below
- The number and type of activities should be led by the topic complexity and learning outcomes
- All suggested activities MUST be pedagogically sound and evidence-based
- Focus on the learning outcome, and naturally reference the activity when it helps clarify the task

EXTERNAL LINKS (URLs):
- Use external links to direct students to reading materials, reference websites, videos, multimedia content, or context related to other activities
- External links do NOT count toward the activity limit and can be used liberally to supplement learning
- Include externalurl field with full URL (e.g., "https://example.com")

FACE-TO-FACE ACTIVITIES:
- If the module includes face-to-face components, include these as descriptive text in the weekly summary
- Face-to-face activities do NOT require associated online activities
- Keep descriptions clear about timing, location expectations, and learning purpose

1. IN EACH WEEKLY/SECTION SUMMARY, YOU MUST:
   - Clearly describe what students will learn and do this week
   - Explain the LEARNING PURPOSE of each element (what concept or skill it develops)
   - Provide HOW TO APPROACH guidance (what students should do first, then next, etc.)
   - Use natural, conversational language appropriate for university students
   - Reference activities by name when it aids clarity, e.g., "Use the [Activity Name] book to read about X"

2. IN EACH ACTIVITY DESCRIPTION, YOU MUST:
   - Expand on and reinforce the learning purposes from the weekly summary
   - Provide specific, practical guidance for engaging with the activity
   - Link back to the learning objectives mentioned in the summary

3. COHERENCE REQUIREMENT:
   - The weekly summary and activity descriptions MUST tell a consistent story
   - Students should understand not just WHAT to do, but WHY they are doing it and what it contributes to their learning

PEDAGOGICAL SOUNDNESS:
- Activities should align with Bloom's taxonomy (remember, understand, apply, analyze, evaluate, create)
- Vary activity types throughout the week to maintain student engagement
- Ensure activities build progressively toward the learning outcomes

LANGUAGE GUIDELINES:
- Write for mature learners; avoid patronising or overly simple language
- Be specific about what students will learn, not just what they'll do

IMPORTANT - DO NOT USE LABELS:
- Never include "label" activity types in your response - they are not learning activities
- Labels are content display containers, not pedagogical activities
- All items in the "activities" array must be real learning activities (quiz, book, forum, url, assignment, etc.)
- If you need to display important information, use a different activity type or include it in the section summary instead"#;

/// The fully composed generation request text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalPrompt {
    pub text: String,
    /// Echo of the composed text, kept for the preview's prompt details.
    pub debug_echo: String,
}

/// Composes the final prompt from the request and optional template data.
pub fn compose(request: &GenerationRequest, template: Option<&TemplateData>) -> FinalPrompt {
    let mut text = request.freeform_prompt.trim().to_owned();

    let type_instruction = match request.structure_type {
        StructureType::Weekly => WEEKLY_INSTRUCTION,
        StructureType::Theme => THEME_INSTRUCTION,
        StructureType::Flexible => FLEXIBLE_INSTRUCTION,
    };
    text.push_str("\n\n");
    text.push_str(type_instruction);

    text.push_str("\n\n");
    if request.include_activities {
        text.push_str(ACTIVITY_GUIDANCE);
    } else {
        text.push_str(NO_ACTIVITIES_INSTRUCTION);
    }

    if let Some(template) = template {
        text.push_str("\n\n");
        text.push_str(&template_block(template));
    }

    for (index, supporting) in request.supporting_texts.iter().enumerate() {
        let _ = write!(
            text,
            "\n\nSUPPORTING DOCUMENT {}: {}\n{}",
            index + 1,
            supporting.filename,
            supporting.text
        );
    }

    let debug_echo = text.clone();
    FinalPrompt { text, debug_echo }
}

/// Renders the curriculum-template structure summary used to bias the
/// generated output toward a known shape.
fn template_block(template: &TemplateData) -> String {
    let mut block = format!(
        "CURRICULUM TEMPLATE: {}\nModel the generated module on this existing template.\n",
        template.label
    );

    let _ = writeln!(block, "Template sections ({}):", template.structure.len());
    for section in &template.structure {
        let _ = writeln!(block, "- {}", section.title);
    }

    if !template.activities.is_empty() {
        let _ = writeln!(
            block,
            "Activities found in the template ({}):",
            template.activities.len()
        );
        for activity in &template.activities {
            let _ = writeln!(block, "- {} ({})", activity.name, activity.kind);
        }
    }

    if !template.bootstrap_structure.is_empty() {
        let _ = writeln!(
            block,
            "Detected layout containers: {}",
            template.bootstrap_structure.join(", ")
        );
    }

    if !template.template_html.is_empty() {
        let _ = write!(
            block,
            "Template HTML skeleton (reuse this structure and styling in section summaries):\n{}",
            template.template_html
        );
    }

    block
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{SupportingText, TemplateActivity, TemplateSection};
    use uuid::Uuid;

    fn request(structure_type: StructureType, include_activities: bool) -> GenerationRequest {
        GenerationRequest {
            course_id: Uuid::nil(),
            freeform_prompt: "Intro to databases".to_owned(),
            structure_type,
            include_activities,
            keep_date_labels: false,
            include_about_assessments: false,
            include_about_learning: false,
            template_ref: None,
            supporting_texts: Vec::new(),
        }
    }

    #[test]
    fn weekly_prompt_carries_type_and_activity_guidance() {
        let prompt = compose(&request(StructureType::Weekly, true), None);
        assert!(prompt.text.starts_with("Intro to databases"));
        assert!(prompt.text.contains("sequential weekly teaching sections"));
        assert!(prompt.text.contains("DO NOT USE LABELS"));
    }

    #[test]
    fn disabling_activities_swaps_in_the_omission_instruction() {
        let prompt = compose(&request(StructureType::Theme, false), None);
        assert!(prompt.text.contains("distinct themes"));
        assert!(prompt.text.contains("Do NOT include an 'activities' array"));
        assert!(!prompt.text.contains("ACTIVITY GUIDANCE"));
    }

    #[test]
    fn supporting_texts_are_appended_in_input_order() {
        let mut request = request(StructureType::Weekly, true);
        request.supporting_texts = vec![
            SupportingText {
                filename: "syllabus.txt".into(),
                mimetype: "text/plain".into(),
                text: "First file".into(),
                truncated: false,
            },
            SupportingText {
                filename: "reading.md".into(),
                mimetype: "text/markdown".into(),
                text: "Second file".into(),
                truncated: false,
            },
        ];
        let prompt = compose(&request, None);
        let first = prompt.text.find("SUPPORTING DOCUMENT 1: syllabus.txt").unwrap();
        let second = prompt.text.find("SUPPORTING DOCUMENT 2: reading.md").unwrap();
        assert!(first < second);
    }

    #[test]
    fn template_block_lists_structure_and_skeleton() {
        let template = TemplateData {
            label: "Basic Mathematics".into(),
            structure: vec![TemplateSection {
                title: "Week 1".into(),
                summary_html: "<div id=\"acc\">x</div>".into(),
            }],
            activities: vec![TemplateActivity {
                kind: "quiz".into(),
                name: "Check-in".into(),
            }],
            template_html: "<div id=\"acc\">x</div>".into(),
            bootstrap_structure: vec!["accordion x1".into()],
        };
        let prompt = compose(&request(StructureType::Weekly, true), Some(&template));
        assert!(prompt.text.contains("CURRICULUM TEMPLATE: Basic Mathematics"));
        assert!(prompt.text.contains("- Week 1"));
        assert!(prompt.text.contains("Check-in (quiz)"));
        assert!(prompt.text.contains("accordion x1"));
    }

    #[test]
    fn composition_is_deterministic() {
        let request = request(StructureType::Flexible, true);
        assert_eq!(compose(&request, None), compose(&request, None));
    }
}

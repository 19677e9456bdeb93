//! crates/module_assistant_core/src/materialize.rs
//!
//! Walks a validated outline and issues the ordered creation operations
//! that turn it into real course structure: sections, delegated
//! subsections, and activities.
//!
//! The pass is deterministic and single-pass, ordered by section number.
//! Section numbering and the cache-refresh flag are local to one pass and
//! threaded through explicitly; nothing survives the call. The pass is
//! not transactional: an individual creation failure skips that item (and
//! its success message) without aborting the rest.

use crate::domain::{
    MaterializationReport, ModuleFields, ModuleRef, SectionPlan, SectionRef, StructureType,
    ThemePlan, WeekPlan,
};
use crate::markup::{ensure_unique_ids, escape_html};
use crate::outline::ModuleOutline;
use crate::ports::{
    ActivityOutcome, ActivityRegistry, CoursePersistence, ModulePersistence, PortResult,
};
use tracing::warn;
use uuid::Uuid;

const ABOUT_ASSESSMENTS_NAME: &str = "About Assessments";
const ABOUT_LEARNING_NAME: &str = "About Learning Outcomes";
const THEME_FALLBACK_TITLE: &str = "Theme overview";
const WEEK_FALLBACK_TITLE: &str = "Weekly focus";
const SECTION_FALLBACK_TITLE: &str = "AI Generated Summary";
const WEEKLY_OUTLINE_HEADING: &str = "Weekly outline";
const NO_SECTIONS_WARNING: &str = "No sections were created from the AI response.";

/// The collaborators one materialization pass writes through.
pub struct MaterializeContext<'a> {
    pub courses: &'a dyn CoursePersistence,
    pub modules: &'a dyn ModulePersistence,
    pub activities: &'a dyn ActivityRegistry,
}

/// The approval-time options one materialization pass honors.
#[derive(Debug, Clone)]
pub struct MaterializeOptions {
    pub course_id: Uuid,
    pub structure_type: StructureType,
    pub keep_date_labels: bool,
    pub include_about_assessments: bool,
    pub include_about_learning: bool,
}

/// Materializes a validated outline into the course.
///
/// `template_used` switches on id-uniquification of generated HTML, since
/// curriculum templates may embed fixed element ids that would collide
/// once duplicated across sections.
///
/// Errors propagate only from the up-front steps (layout change, reading
/// existing sections) that run before any content is created; afterwards
/// failures degrade to omitted messages and warnings.
pub async fn materialize(
    outline: &ModuleOutline,
    options: &MaterializeOptions,
    template_used: bool,
    ctx: &MaterializeContext<'_>,
) -> PortResult<MaterializationReport> {
    let course = options.course_id;

    let layout = select_layout(options.structure_type, ctx.courses).await;
    ctx.courses.set_course_layout(course, layout).await?;
    ctx.courses.rebuild_cache(course).await?;

    let mut report = MaterializationReport::default();
    let mut needs_cache_refresh = false;

    // Well-known subsections anchor at section 0, ahead of any generated
    // content, independent of the structure type.
    if options.include_about_assessments {
        add_about_subsection(ctx, course, ABOUT_ASSESSMENTS_NAME, &mut report).await;
    }
    if options.include_about_learning {
        add_about_subsection(ctx, course, ABOUT_LEARNING_NAME, &mut report).await;
    }

    // New content is always appended after the highest existing section
    // number (including any delegated sections created just above).
    let existing = ctx.courses.get_sections(course).await?;
    let start = existing.iter().map(|s| s.number).max().unwrap_or(0) + 1;

    match outline {
        ModuleOutline::Themes { themes, .. } => {
            materialize_themes(
                themes,
                course,
                start,
                template_used,
                ctx,
                &mut report,
                &mut needs_cache_refresh,
            )
            .await;
        }
        ModuleOutline::Sections { sections, .. } => {
            materialize_sections(
                sections,
                options,
                start,
                template_used,
                ctx,
                &mut report,
            )
            .await;
        }
    }

    if needs_cache_refresh {
        if let Err(error) = ctx.courses.rebuild_cache(course).await {
            warn!(%error, "course cache rebuild failed after subsection updates");
        }
    }

    if report.created.is_empty() {
        report.warnings.push(NO_SECTIONS_WARNING.to_owned());
    }
    Ok(report)
}

/// Weekly maps to the host's dated layout, themes to the topic layout,
/// and flexible to its own layout only when the host has it installed.
async fn select_layout(structure: StructureType, courses: &dyn CoursePersistence) -> &'static str {
    match structure {
        StructureType::Weekly => "weeks",
        StructureType::Theme => "topics",
        StructureType::Flexible => {
            if courses.supports_layout("flexsections").await {
                "flexsections"
            } else {
                "weeks"
            }
        }
    }
}

async fn materialize_themes(
    themes: &[ThemePlan],
    course: Uuid,
    start: i64,
    template_used: bool,
    ctx: &MaterializeContext<'_>,
    report: &mut MaterializationReport,
    needs_cache_refresh: &mut bool,
) {
    let mut section_number = start;
    for theme in themes {
        // The counter advances once per theme: weeks live inside the
        // theme's section as delegated subsections.
        let number = section_number;
        section_number += 1;

        let title = theme.title.clone().unwrap_or_else(|| THEME_FALLBACK_TITLE.to_owned());
        let section = match ctx.courses.create_section(course, number).await {
            Ok(section) => section,
            Err(error) => {
                warn!(%error, number, "theme section creation failed");
                continue;
            }
        };

        let mut section_html = theme.summary.trim().to_owned();
        if template_used && !section_html.is_empty() {
            section_html = ensure_unique_ids(&section_html, &format!("sec{number}"));
        }
        if let Err(error) = ctx
            .courses
            .update_section(&section, Some(&title), Some(&section_html))
            .await
        {
            warn!(%error, number, "theme section update failed");
            continue;
        }

        if !theme.activities.is_empty() {
            let outcome = ctx
                .activities
                .create_for_section(&theme.activities, course, number)
                .await;
            merge_outcome(report, outcome);
        }

        for week in &theme.weeks {
            materialize_week(
                week,
                course,
                number,
                template_used,
                ctx,
                report,
                needs_cache_refresh,
            )
            .await;
        }

        report.created.push(format!("Section created: {title}"));
    }
}

async fn materialize_week(
    week: &WeekPlan,
    course: Uuid,
    parent_number: i64,
    template_used: bool,
    ctx: &MaterializeContext<'_>,
    report: &mut MaterializationReport,
    needs_cache_refresh: &mut bool,
) {
    let title = week.title.clone().unwrap_or_else(|| WEEK_FALLBACK_TITLE.to_owned());
    let Some((_, delegated)) = create_subsection(ctx, course, parent_number, &title).await else {
        return;
    };
    report.created.push(format!("Subsection created: {title}"));

    let mut delegated_number = None;
    if let Some(delegated) = delegated {
        delegated_number = Some(delegated.number);

        // The generated weekly summary becomes the delegated section's
        // description, uniquified per parent/delegated pair in template mode.
        let summary = week.summary.trim();
        if !summary.is_empty() {
            let mut summary_html = summary.to_owned();
            if template_used {
                let suffix = format!("sec{parent_number}-sub{}", delegated.number);
                summary_html = ensure_unique_ids(&summary_html, &suffix);
            }
            match ctx
                .courses
                .update_section(&delegated, None, Some(&summary_html))
                .await
            {
                Ok(()) => *needs_cache_refresh = true,
                Err(error) => warn!(%error, "delegated section summary update failed"),
            }
        }
    }

    // Week activities belong to the delegated section, not the parent.
    if !week.activities.is_empty() {
        let target = delegated_number.unwrap_or(parent_number);
        let outcome = ctx
            .activities
            .create_for_section(&week.activities, course, target)
            .await;
        merge_outcome(report, outcome);
    }
}

async fn materialize_sections(
    sections: &[SectionPlan],
    options: &MaterializeOptions,
    start: i64,
    template_used: bool,
    ctx: &MaterializeContext<'_>,
    report: &mut MaterializationReport,
) {
    let course = options.course_id;
    // The date-label option only applies to the weekly layout.
    let keep_date_labels =
        options.keep_date_labels && options.structure_type == StructureType::Weekly;
    let mut section_number = start;
    for plan in sections {
        let number = section_number;
        section_number += 1;

        let title = plan.title.clone().unwrap_or_else(|| SECTION_FALLBACK_TITLE.to_owned());
        let section = match ctx.courses.create_section(course, number).await {
            Ok(section) => section,
            Err(error) => {
                warn!(%error, number, "section creation failed");
                continue;
            }
        };

        let mut section_html = String::new();
        if keep_date_labels {
            section_html.push_str(&format!("<h3>{}</h3>", escape_html(&title)));
        }
        let summary = plan.summary.trim();
        if !summary.is_empty() {
            section_html.push_str(summary);
            if template_used {
                section_html = ensure_unique_ids(&section_html, &format!("sec{number}"));
            }
        }

        let items: String = plan
            .outline
            .iter()
            .filter(|entry| !entry.trim().is_empty())
            .map(|entry| format!("<li>{}</li>", escape_html(entry)))
            .collect();
        if !items.is_empty() {
            section_html.push_str(&format!("<h4>{WEEKLY_OUTLINE_HEADING}</h4><ul>{items}</ul>"));
        }

        // With date labels kept, the host-assigned default name stays and
        // the title only appears as the heading rendered above.
        let new_name = if keep_date_labels {
            None
        } else {
            Some(title.as_str())
        };
        if let Err(error) = ctx
            .courses
            .update_section(&section, new_name, Some(&section_html))
            .await
        {
            warn!(%error, number, "section update failed");
            continue;
        }

        if !plan.activities.is_empty() {
            let outcome = ctx
                .activities
                .create_for_section(&plan.activities, course, number)
                .await;
            merge_outcome(report, outcome);
        }

        report.created.push(format!("Section created: {title}"));
    }
}

async fn add_about_subsection(
    ctx: &MaterializeContext<'_>,
    course: Uuid,
    name: &str,
    report: &mut MaterializationReport,
) {
    if create_subsection(ctx, course, 0, name).await.is_some() {
        report.created.push(format!("Subsection created: {name}"));
    }
}

/// Creates a subsection module and resolves its delegated section
/// container. Returns `None` when the module itself could not be created;
/// a missing delegated section is tolerated.
async fn create_subsection(
    ctx: &MaterializeContext<'_>,
    course: Uuid,
    section_number: i64,
    name: &str,
) -> Option<(ModuleRef, Option<SectionRef>)> {
    let fields = ModuleFields {
        name: name.to_owned(),
        intro_html: String::new(),
        extra: Default::default(),
    };
    let module = match ctx
        .modules
        .create_module(course, section_number, "subsection", fields)
        .await
    {
        Ok(module) => module,
        Err(error) => {
            warn!(%error, name, "subsection creation failed");
            return None;
        }
    };
    let delegated = match ctx.modules.delegated_section(&module).await {
        Ok(delegated) => delegated,
        Err(error) => {
            warn!(%error, name, "delegated section lookup failed");
            None
        }
    };
    Some((module, delegated))
}

fn merge_outcome(report: &mut MaterializationReport, outcome: ActivityOutcome) {
    report.created.extend(outcome.created);
    report.warnings.extend(outcome.warnings);
}

//! services/api/src/adapters/course_db.rs
//!
//! This module contains the host-course database adapter, the concrete
//! implementation of the `CoursePersistence` and `ModulePersistence` ports
//! from the `core` crate. It handles all interactions with the PostgreSQL
//! database using `sqlx`.

use async_trait::async_trait;
use module_assistant_core::domain::{
    ModuleDescriptor, ModuleFields, ModuleRef, SectionRef,
};
use module_assistant_core::ports::{
    CoursePersistence, ModulePersistence, PortError, PortResult,
};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the course and module persistence ports.
#[derive(Clone)]
pub struct CourseDbAdapter {
    pool: PgPool,
    /// Course layouts installed on this host (e.g. `weeks`, `topics`).
    installed_layouts: Vec<String>,
}

impl CourseDbAdapter {
    /// Creates a new `CourseDbAdapter`.
    pub fn new(pool: PgPool, installed_layouts: Vec<String>) -> Self {
        Self {
            pool,
            installed_layouts,
        }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct SectionRecord {
    id: Uuid,
    section_num: i64,
    name: Option<String>,
    summary_html: String,
}
impl SectionRecord {
    fn to_domain(self) -> SectionRef {
        SectionRef {
            id: self.id,
            number: self.section_num,
            name: self.name,
            summary_html: self.summary_html,
        }
    }
}

#[derive(FromRow)]
struct ModuleRecord {
    id: Uuid,
    kind: String,
}
impl ModuleRecord {
    fn to_domain(self) -> ModuleRef {
        ModuleRef {
            id: self.id,
            kind: self.kind,
        }
    }
}

#[derive(FromRow)]
struct ModuleListRecord {
    kind: String,
    name: String,
    section_num: i64,
}
impl ModuleListRecord {
    fn to_domain(self) -> ModuleDescriptor {
        ModuleDescriptor {
            kind: self.kind,
            name: self.name,
            section_number: self.section_num,
        }
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

//=========================================================================================
// `CoursePersistence` Trait Implementation
//=========================================================================================

#[async_trait]
impl CoursePersistence for CourseDbAdapter {
    /// Inserts a section at the given number, shifting any existing
    /// sections at or after that number up by one.
    async fn create_section(&self, course: Uuid, number: i64) -> PortResult<SectionRef> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        sqlx::query(
            "UPDATE course_sections SET section_num = section_num + 1
             WHERE course_id = $1 AND section_num >= $2",
        )
        .bind(course)
        .bind(number)
        .execute(&mut *tx)
        .await
        .map_err(unexpected)?;

        let record = sqlx::query_as::<_, SectionRecord>(
            "INSERT INTO course_sections (id, course_id, section_num, name, summary_html, time_modified)
             VALUES ($1, $2, $3, NULL, '', now())
             RETURNING id, section_num, name, summary_html",
        )
        .bind(Uuid::new_v4())
        .bind(course)
        .bind(number)
        .fetch_one(&mut *tx)
        .await
        .map_err(unexpected)?;

        tx.commit().await.map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn update_section(
        &self,
        section: &SectionRef,
        name: Option<&str>,
        summary_html: Option<&str>,
    ) -> PortResult<()> {
        let result = sqlx::query(
            "UPDATE course_sections
             SET name = COALESCE($2, name),
                 summary_html = COALESCE($3, summary_html),
                 time_modified = now()
             WHERE id = $1",
        )
        .bind(section.id)
        .bind(name)
        .bind(summary_html)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Section {} not found", section.id)));
        }
        Ok(())
    }

    async fn get_sections(&self, course: Uuid) -> PortResult<Vec<SectionRef>> {
        // An unknown course id is reported distinctly from a course that
        // simply has no sections yet.
        let course_exists =
            sqlx::query_as::<_, (i64,)>("SELECT COUNT(*) FROM courses WHERE id = $1")
                .bind(course)
                .fetch_one(&self.pool)
                .await
                .map_err(unexpected)?;
        if course_exists.0 == 0 {
            return Err(PortError::NotFound(format!("Course {} not found", course)));
        }

        let records = sqlx::query_as::<_, SectionRecord>(
            "SELECT id, section_num, name, summary_html FROM course_sections
             WHERE course_id = $1 ORDER BY section_num",
        )
        .bind(course)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(records.into_iter().map(SectionRecord::to_domain).collect())
    }

    async fn set_course_layout(&self, course: Uuid, layout: &str) -> PortResult<()> {
        let result = sqlx::query("UPDATE courses SET layout = $2 WHERE id = $1")
            .bind(course)
            .bind(layout)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Course {} not found", course)));
        }
        Ok(())
    }

    async fn supports_layout(&self, layout: &str) -> bool {
        self.installed_layouts.iter().any(|installed| installed == layout)
    }

    async fn rebuild_cache(&self, course: Uuid) -> PortResult<()> {
        sqlx::query("UPDATE courses SET cache_rev = cache_rev + 1 WHERE id = $1")
            .bind(course)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }
}

//=========================================================================================
// `ModulePersistence` Trait Implementation
//=========================================================================================

#[async_trait]
impl ModulePersistence for CourseDbAdapter {
    async fn create_module(
        &self,
        course: Uuid,
        section_number: i64,
        kind: &str,
        fields: ModuleFields,
    ) -> PortResult<ModuleRef> {
        let extra = serde_json::to_string(&fields.extra)
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        let record = sqlx::query_as::<_, ModuleRecord>(
            "INSERT INTO course_modules (id, course_id, section_num, kind, name, intro_html, extra)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING id, kind",
        )
        .bind(Uuid::new_v4())
        .bind(course)
        .bind(section_number)
        .bind(kind)
        .bind(&fields.name)
        .bind(&fields.intro_html)
        .bind(extra)
        .fetch_one(&mut *tx)
        .await
        .map_err(unexpected)?;

        // A subsection module owns a delegated section container, appended
        // after the course's highest section number.
        if kind == "subsection" {
            let (next,): (i64,) = sqlx::query_as(
                "SELECT COALESCE(MAX(section_num), 0) + 1 FROM course_sections WHERE course_id = $1",
            )
            .bind(course)
            .fetch_one(&mut *tx)
            .await
            .map_err(unexpected)?;

            sqlx::query(
                "INSERT INTO course_sections (id, course_id, section_num, name, summary_html, parent_module_id, time_modified)
                 VALUES ($1, $2, $3, $4, '', $5, now())",
            )
            .bind(Uuid::new_v4())
            .bind(course)
            .bind(next)
            .bind(&fields.name)
            .bind(record.id)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;
        }

        tx.commit().await.map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn delegated_section(&self, module: &ModuleRef) -> PortResult<Option<SectionRef>> {
        let record = sqlx::query_as::<_, SectionRecord>(
            "SELECT id, section_num, name, summary_html FROM course_sections
             WHERE parent_module_id = $1",
        )
        .bind(module.id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(record.map(SectionRecord::to_domain))
    }

    async fn list_modules(&self, course: Uuid) -> PortResult<Vec<ModuleDescriptor>> {
        let records = sqlx::query_as::<_, ModuleListRecord>(
            "SELECT kind, name, section_num FROM course_modules
             WHERE course_id = $1 ORDER BY section_num, name",
        )
        .bind(course)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(records.into_iter().map(ModuleListRecord::to_domain).collect())
    }
}

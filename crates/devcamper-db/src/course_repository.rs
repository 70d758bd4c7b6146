use chrono::{DateTime, Utc};
use devcamper_core::AppError;
use devcamper_core::aggregate::average_cost;
use devcamper_core::models::{Course, CourseChanges, NewCourse, SkillLevel};
use devcamper_core::query::{Page, ResultQuery};
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::database::db_error;
use crate::query::{Scope, fetch_page};

const COLUMNS: &str =
    "id, title, description, weeks, tuition, minimum_skill, scholarship_available, created_at, bootcamp_id";

/// Repository for course persistence in PostgreSQL.
///
/// Every write that can move a bootcamp's average cost runs in one
/// transaction with the owning bootcamp row locked, so concurrent course
/// writes against the same bootcamp recompute in sequence.
#[derive(Clone)]
pub struct CourseRepository {
    pool: PgPool,
}

impl CourseRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// One page of courses, optionally restricted to a single bootcamp.
    pub async fn list(
        &self,
        query: &ResultQuery,
        bootcamp_id: Option<Uuid>,
    ) -> Result<Page<Course>, AppError> {
        let scope = bootcamp_id.map(|id| Scope::new("bootcamp_id", id));
        let (rows, total) =
            fetch_page::<CourseRow>(&self.pool, "courses", COLUMNS, query, scope).await?;
        Ok(Page::new(into_courses(rows)?, total, query.page))
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Course>, AppError> {
        let row = sqlx::query_as::<_, CourseRow>(&format!(
            "SELECT {COLUMNS} FROM courses WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        row.map(Course::try_from).transpose()
    }

    /// All courses of the given bootcamps, newest first.
    pub async fn for_bootcamps(&self, bootcamp_ids: &[Uuid]) -> Result<Vec<Course>, AppError> {
        if bootcamp_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, CourseRow>(&format!(
            r#"
            SELECT {COLUMNS}
            FROM courses
            WHERE bootcamp_id = ANY($1)
            ORDER BY created_at DESC, id ASC
            "#
        ))
        .bind(bootcamp_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        into_courses(rows)
    }

    /// Insert a course and refresh its bootcamp's average cost.
    ///
    /// Fails with `NotFound` if the owning bootcamp does not exist.
    pub async fn create(&self, course: &NewCourse) -> Result<Course, AppError> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        lock_bootcamp(&mut tx, course.bootcamp_id).await?;

        let row = sqlx::query_as::<_, CourseRow>(&format!(
            r#"
            INSERT INTO courses (bootcamp_id, title, description, weeks, tuition, minimum_skill, scholarship_available)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(course.bootcamp_id)
        .bind(&course.title)
        .bind(&course.description)
        .bind(&course.weeks)
        .bind(course.tuition)
        .bind(course.minimum_skill.as_str())
        .bind(course.scholarship_available)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error)?;

        recompute_average_cost(&mut tx, course.bootcamp_id).await?;
        tx.commit().await.map_err(db_error)?;

        tracing::info!(id = %row.id, bootcamp_id = %row.bootcamp_id, "Course created");
        row.try_into()
    }

    /// Apply a partial update. Returns `None` if the course does not exist.
    pub async fn update(
        &self,
        id: Uuid,
        changes: &CourseChanges,
    ) -> Result<Option<Course>, AppError> {
        if changes.is_empty() {
            return self.get(id).await;
        }

        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let Some(bootcamp_id) = owning_bootcamp(&mut tx, id).await? else {
            return Ok(None);
        };
        lock_bootcamp(&mut tx, bootcamp_id).await?;

        let mut qb: QueryBuilder<'static, Postgres> = QueryBuilder::new("UPDATE courses SET ");
        {
            let mut set = qb.separated(", ");
            if let Some(v) = &changes.title {
                set.push("title = ").push_bind_unseparated(v.clone());
            }
            if let Some(v) = &changes.description {
                set.push("description = ").push_bind_unseparated(v.clone());
            }
            if let Some(v) = &changes.weeks {
                set.push("weeks = ").push_bind_unseparated(v.clone());
            }
            if let Some(v) = changes.tuition {
                set.push("tuition = ").push_bind_unseparated(v);
            }
            if let Some(v) = changes.minimum_skill {
                set.push("minimum_skill = ")
                    .push_bind_unseparated(v.as_str());
            }
            if let Some(v) = changes.scholarship_available {
                set.push("scholarship_available = ")
                    .push_bind_unseparated(v);
            }
        }
        qb.push(" WHERE id = ")
            .push_bind(id)
            .push(format!(" RETURNING {COLUMNS}"));

        // The course row itself is not locked; a concurrent delete leaves nothing to return.
        let Some(row) = qb
            .build_query_as::<CourseRow>()
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error)?
        else {
            return Ok(None);
        };

        if changes.tuition.is_some() {
            recompute_average_cost(&mut tx, bootcamp_id).await?;
        }
        tx.commit().await.map_err(db_error)?;

        row.try_into().map(Some)
    }

    /// Delete a course and refresh its bootcamp's average cost.
    ///
    /// Returns `false` if the course does not exist.
    pub async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let Some(bootcamp_id) = owning_bootcamp(&mut tx, id).await? else {
            return Ok(false);
        };
        lock_bootcamp(&mut tx, bootcamp_id).await?;

        sqlx::query("DELETE FROM courses WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;

        recompute_average_cost(&mut tx, bootcamp_id).await?;
        tx.commit().await.map_err(db_error)?;

        tracing::info!(%id, %bootcamp_id, "Course deleted");
        Ok(true)
    }

    /// Remove every course. Returns the number removed.
    pub async fn delete_all(&self) -> Result<u64, AppError> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let result = sqlx::query("DELETE FROM courses")
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
        sqlx::query("UPDATE bootcamps SET average_cost = NULL")
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;

        tx.commit().await.map_err(db_error)?;
        Ok(result.rows_affected())
    }
}

// ---------------------------------------------------------------------------
// Average cost maintenance
// ---------------------------------------------------------------------------

/// Take a row lock on the bootcamp, failing with `NotFound` if it is gone.
async fn lock_bootcamp(conn: &mut PgConnection, bootcamp_id: Uuid) -> Result<(), AppError> {
    let locked: Option<Uuid> =
        sqlx::query_scalar("SELECT id FROM bootcamps WHERE id = $1 FOR UPDATE")
            .bind(bootcamp_id)
            .fetch_optional(&mut *conn)
            .await
            .map_err(db_error)?;

    locked
        .map(|_| ())
        .ok_or_else(|| AppError::not_found("Bootcamp", bootcamp_id))
}

async fn owning_bootcamp(conn: &mut PgConnection, course_id: Uuid) -> Result<Option<Uuid>, AppError> {
    sqlx::query_scalar("SELECT bootcamp_id FROM courses WHERE id = $1")
        .bind(course_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(db_error)
}

/// Recompute and store a bootcamp's average cost from its current courses.
///
/// Callers must already hold the bootcamp's row lock.
pub async fn recompute_average_cost(
    conn: &mut PgConnection,
    bootcamp_id: Uuid,
) -> Result<Option<f64>, AppError> {
    let tuitions: Vec<f64> = sqlx::query_scalar("SELECT tuition FROM courses WHERE bootcamp_id = $1")
        .bind(bootcamp_id)
        .fetch_all(&mut *conn)
        .await
        .map_err(db_error)?;

    let cost = average_cost(&tuitions);

    sqlx::query("UPDATE bootcamps SET average_cost = $2 WHERE id = $1")
        .bind(bootcamp_id)
        .bind(cost)
        .execute(&mut *conn)
        .await
        .map_err(db_error)?;

    tracing::debug!(%bootcamp_id, courses = tuitions.len(), ?cost, "Average cost recomputed");
    Ok(cost)
}

// -- Internal row type for sqlx deserialization --

#[derive(sqlx::FromRow)]
struct CourseRow {
    id: Uuid,
    title: String,
    description: String,
    weeks: String,
    tuition: f64,
    minimum_skill: String,
    scholarship_available: bool,
    created_at: DateTime<Utc>,
    bootcamp_id: Uuid,
}

impl TryFrom<CourseRow> for Course {
    type Error = AppError;

    fn try_from(row: CourseRow) -> Result<Self, Self::Error> {
        let minimum_skill: SkillLevel = row
            .minimum_skill
            .parse()
            .map_err(|e: String| AppError::DatabaseError(format!("Corrupt course row {}: {e}", row.id)))?;

        Ok(Course {
            id: row.id,
            title: row.title,
            description: row.description,
            weeks: row.weeks,
            tuition: row.tuition,
            minimum_skill,
            scholarship_available: row.scholarship_available,
            created_at: row.created_at,
            bootcamp_id: row.bootcamp_id,
        })
    }
}

fn into_courses(rows: Vec<CourseRow>) -> Result<Vec<Course>, AppError> {
    rows.into_iter().map(Course::try_from).collect()
}

use chrono::{DateTime, Utc};
use devcamper_core::AppError;
use devcamper_core::geo::RadiusQuery;
use devcamper_core::models::{Bootcamp, BootcampChanges, Location, NewBootcamp};
use devcamper_core::query::{Page, ResultQuery};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::database::db_error;
use crate::query::fetch_page;

const COLUMNS: &str = "id, name, slug, description, website, phone, email, \
    longitude, latitude, formatted_address, street, city, state, zipcode, country, \
    careers, average_rating, average_cost, photo, \
    housing, job_assistance, job_guarantee, accept_gi, created_at";

/// Repository for bootcamp persistence in PostgreSQL.
#[derive(Clone)]
pub struct BootcampRepository {
    pool: PgPool,
}

impl BootcampRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// One filtered, sorted page of bootcamps.
    pub async fn list(&self, query: &ResultQuery) -> Result<Page<Bootcamp>, AppError> {
        let (rows, total) =
            fetch_page::<BootcampRow>(&self.pool, "bootcamps", COLUMNS, query, None).await?;
        Ok(Page::new(
            rows.into_iter().map(Into::into).collect(),
            total,
            query.page,
        ))
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Bootcamp>, AppError> {
        let row = sqlx::query_as::<_, BootcampRow>(&format!(
            "SELECT {COLUMNS} FROM bootcamps WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.map(Into::into))
    }

    /// Fetch several bootcamps at once, in no particular order.
    pub async fn get_many(&self, ids: &[Uuid]) -> Result<Vec<Bootcamp>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, BootcampRow>(&format!(
            "SELECT {COLUMNS} FROM bootcamps WHERE id = ANY($1)"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Insert a validated bootcamp at its geocoded location.
    pub async fn create(
        &self,
        bootcamp: &NewBootcamp,
        location: &Location,
    ) -> Result<Bootcamp, AppError> {
        let row = sqlx::query_as::<_, BootcampRow>(&format!(
            r#"
            INSERT INTO bootcamps (
                name, slug, description, website, phone, email,
                longitude, latitude, formatted_address, street, city, state, zipcode, country,
                careers, average_rating, housing, job_assistance, job_guarantee, accept_gi
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(&bootcamp.name)
        .bind(&bootcamp.slug)
        .bind(&bootcamp.description)
        .bind(&bootcamp.website)
        .bind(&bootcamp.phone)
        .bind(&bootcamp.email)
        .bind(location.longitude())
        .bind(location.latitude())
        .bind(&location.formatted_address)
        .bind(&location.street)
        .bind(&location.city)
        .bind(&location.state)
        .bind(&location.zipcode)
        .bind(&location.country)
        .bind(&bootcamp.careers)
        .bind(bootcamp.average_rating)
        .bind(bootcamp.housing)
        .bind(bootcamp.job_assistance)
        .bind(bootcamp.job_guarantee)
        .bind(bootcamp.accept_gi)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)?;

        tracing::info!(id = %row.id, name = %row.name, "Bootcamp created");
        Ok(row.into())
    }

    /// Apply a partial update. `location` replaces the stored point and
    /// address parts when the address was re-geocoded.
    ///
    /// Returns `None` if the bootcamp does not exist.
    pub async fn update(
        &self,
        id: Uuid,
        changes: &BootcampChanges,
        location: Option<&Location>,
    ) -> Result<Option<Bootcamp>, AppError> {
        if changes.is_empty() && location.is_none() {
            return self.get(id).await;
        }

        let mut qb: QueryBuilder<'static, Postgres> = QueryBuilder::new("UPDATE bootcamps SET ");
        {
            let mut set = qb.separated(", ");
            if let Some(v) = &changes.name {
                set.push("name = ").push_bind_unseparated(v.clone());
            }
            if let Some(v) = &changes.slug {
                set.push("slug = ").push_bind_unseparated(v.clone());
            }
            if let Some(v) = &changes.description {
                set.push("description = ").push_bind_unseparated(v.clone());
            }
            if let Some(v) = &changes.website {
                set.push("website = ").push_bind_unseparated(v.clone());
            }
            if let Some(v) = &changes.phone {
                set.push("phone = ").push_bind_unseparated(v.clone());
            }
            if let Some(v) = &changes.email {
                set.push("email = ").push_bind_unseparated(v.clone());
            }
            if let Some(v) = &changes.careers {
                set.push("careers = ").push_bind_unseparated(v.clone());
            }
            if let Some(v) = changes.average_rating {
                set.push("average_rating = ").push_bind_unseparated(v);
            }
            if let Some(v) = changes.housing {
                set.push("housing = ").push_bind_unseparated(v);
            }
            if let Some(v) = changes.job_assistance {
                set.push("job_assistance = ").push_bind_unseparated(v);
            }
            if let Some(v) = changes.job_guarantee {
                set.push("job_guarantee = ").push_bind_unseparated(v);
            }
            if let Some(v) = changes.accept_gi {
                set.push("accept_gi = ").push_bind_unseparated(v);
            }
            if let Some(loc) = location {
                set.push("longitude = ").push_bind_unseparated(loc.longitude());
                set.push("latitude = ").push_bind_unseparated(loc.latitude());
                set.push("formatted_address = ")
                    .push_bind_unseparated(loc.formatted_address.clone());
                set.push("street = ").push_bind_unseparated(loc.street.clone());
                set.push("city = ").push_bind_unseparated(loc.city.clone());
                set.push("state = ").push_bind_unseparated(loc.state.clone());
                set.push("zipcode = ").push_bind_unseparated(loc.zipcode.clone());
                set.push("country = ").push_bind_unseparated(loc.country.clone());
            }
        }
        qb.push(" WHERE id = ")
            .push_bind(id)
            .push(format!(" RETURNING {COLUMNS}"));

        let row = qb
            .build_query_as::<BootcampRow>()
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;

        Ok(row.map(Into::into))
    }

    /// Record the stored photo filename. Returns `None` if the bootcamp does not exist.
    pub async fn set_photo(&self, id: Uuid, photo: &str) -> Result<Option<Bootcamp>, AppError> {
        let row = sqlx::query_as::<_, BootcampRow>(&format!(
            "UPDATE bootcamps SET photo = $2 WHERE id = $1 RETURNING {COLUMNS}"
        ))
        .bind(id)
        .bind(photo)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.map(Into::into))
    }

    /// Delete a bootcamp and, by cascade, its courses.
    ///
    /// Returns `false` if the bootcamp does not exist.
    pub async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM bootcamps WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        if result.rows_affected() > 0 {
            tracing::info!(%id, "Bootcamp deleted");
        }
        Ok(result.rows_affected() > 0)
    }

    /// Bootcamps whose stored point lies within the query's central angle.
    pub async fn within_radius(&self, radius: &RadiusQuery) -> Result<Vec<Bootcamp>, AppError> {
        let rows = sqlx::query_as::<_, BootcampRow>(&format!(
            r#"
            SELECT {COLUMNS}
            FROM bootcamps
            WHERE latitude IS NOT NULL
              AND longitude IS NOT NULL
              AND 2 * ASIN(LEAST(1.0, SQRT(
                    POWER(SIN(RADIANS(latitude - $1) / 2), 2)
                    + COS(RADIANS($1)) * COS(RADIANS(latitude))
                      * POWER(SIN(RADIANS(longitude - $2) / 2), 2)
                  ))) <= $3
            ORDER BY created_at DESC, id ASC
            "#
        ))
        .bind(radius.latitude)
        .bind(radius.longitude)
        .bind(radius.radians)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Remove every bootcamp (and their courses). Returns the number removed.
    pub async fn delete_all(&self) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM bootcamps")
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(result.rows_affected())
    }
}

// -- Internal row type for sqlx deserialization --

#[derive(sqlx::FromRow)]
struct BootcampRow {
    id: Uuid,
    name: String,
    slug: String,
    description: String,
    website: Option<String>,
    phone: Option<String>,
    email: Option<String>,
    longitude: Option<f64>,
    latitude: Option<f64>,
    formatted_address: Option<String>,
    street: Option<String>,
    city: Option<String>,
    state: Option<String>,
    zipcode: Option<String>,
    country: Option<String>,
    careers: Vec<String>,
    average_rating: Option<f64>,
    average_cost: Option<f64>,
    photo: String,
    housing: bool,
    job_assistance: bool,
    job_guarantee: bool,
    accept_gi: bool,
    created_at: DateTime<Utc>,
}

impl From<BootcampRow> for Bootcamp {
    fn from(row: BootcampRow) -> Self {
        let location = match (row.longitude, row.latitude) {
            (Some(longitude), Some(latitude)) => Some(Location {
                formatted_address: row.formatted_address,
                street: row.street,
                city: row.city,
                state: row.state,
                zipcode: row.zipcode,
                country: row.country,
                ..Location::point(longitude, latitude)
            }),
            _ => None,
        };

        Bootcamp {
            id: row.id,
            name: row.name,
            slug: row.slug,
            description: row.description,
            website: row.website,
            phone: row.phone,
            email: row.email,
            location,
            careers: row.careers,
            average_rating: row.average_rating,
            average_cost: row.average_cost,
            photo: row.photo,
            housing: row.housing,
            job_assistance: row.job_assistance,
            job_guarantee: row.job_guarantee,
            accept_gi: row.accept_gi,
            created_at: row.created_at,
        }
    }
}

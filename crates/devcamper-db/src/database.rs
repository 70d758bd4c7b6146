use devcamper_core::AppError;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::bootcamp_repository::BootcampRepository;
use crate::config::DatabaseConfig;
use crate::course_repository::CourseRepository;

/// Central database facade. Owns the connection pool and hands out repositories.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Connect to PostgreSQL with the given configuration.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, AppError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to connect: {e}")))?;

        Ok(Self { pool })
    }

    /// Create a `Database` from an existing pool (useful for testing).
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run all pending migrations.
    pub async fn migrate(&self) -> Result<(), AppError> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Migration failed: {e}")))?;
        Ok(())
    }

    /// Get a [`BootcampRepository`] backed by this pool.
    pub fn bootcamp_repo(&self) -> BootcampRepository {
        BootcampRepository::new(self.pool.clone())
    }

    /// Get a [`CourseRepository`] backed by this pool.
    pub fn course_repo(&self) -> CourseRepository {
        CourseRepository::new(self.pool.clone())
    }

    /// Check database connectivity.
    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;
        Ok(())
    }

    /// Get a reference to the underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Map a driver error onto the application taxonomy.
///
/// Unique violations become [`AppError::DuplicateKey`]; foreign-key and
/// check violations are client mistakes and surface as validation failures.
pub(crate) fn db_error(err: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db) = &err {
        let constraint = db.constraint().unwrap_or_default().to_string();
        if db.is_unique_violation() {
            return AppError::DuplicateKey(constraint);
        }
        if db.is_foreign_key_violation() {
            return AppError::Validation(format!("Referenced record does not exist ({constraint})"));
        }
        if db.is_check_violation() {
            return AppError::Validation(format!("Value violates constraint {constraint}"));
        }
    }
    AppError::DatabaseError(err.to_string())
}

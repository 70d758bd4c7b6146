pub mod bootcamp_repository;
pub mod config;
pub mod course_repository;
pub mod database;
pub mod query;

pub use bootcamp_repository::BootcampRepository;
pub use config::DatabaseConfig;
pub use course_repository::CourseRepository;
pub use database::Database;

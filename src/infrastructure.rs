// Infrastructure layer modules
pub mod config;
pub mod course_repository;
pub mod logging;
pub mod table_resolver;

// Re-exports
pub use config::{AppConfig, ConfigError};
pub use course_repository::{
    CourseRepository, CourseRepositoryError, DynamoCourseRepository, ScanMode,
};
pub use logging::init_logging;
pub use table_resolver::{CloudMapTableResolver, DiscoveryError, TableResolver};

// Domain layer modules
pub mod domain;

// Application layer modules
pub mod application;

// Infrastructure layer modules
pub mod infrastructure;

// HTTP layer modules
pub mod error;
pub mod gateway;

pub use error::ApiError;
pub use gateway::{AppState, create_router};

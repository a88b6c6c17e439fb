pub mod accounts;
pub mod app;
pub mod config;
pub mod error;
pub mod extract;
pub mod guard;
pub mod handlers;
pub mod menu;
pub mod orders;
pub mod store;

pub use app::{build_router, AppState};
pub use config::ServiceConfig;
pub use error::{ServiceError, ServiceResult};

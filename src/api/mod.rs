// API routes and handlers

pub mod admin;
pub mod attendance;
pub mod auth;
pub mod branches;
pub mod coach_attendance;
pub mod coaches;
pub mod dashboard;
pub mod error;
pub mod health;
pub mod packages;
pub mod payments;
pub mod routes;
pub mod sessions;
pub mod students;

pub use error::ApiError;
pub use routes::{create_routes, AppState};

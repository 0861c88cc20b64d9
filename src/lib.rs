pub mod api;
pub mod auth;
pub mod config;
pub mod domain;
pub mod models;
pub mod services;

//! Library Ledger
//!
//! A library management server providing a REST JSON API over books,
//! members and borrowings, with a borrow/return ledger that keeps copy
//! counts consistent under concurrent requests.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub services: Arc<services::Services>,
}

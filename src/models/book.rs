//! Book (catalog entry) model and related types

use chrono::{Datelike, Local};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

/// Book model from database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub book_id: i32,
    pub title: String,
    pub isbn: String,
    pub published_year: Option<String>,
    pub total_copies: i32,
    pub available_copies: i32,
}

impl Book {
    /// Clamp a candidate available-copies value into `[0, total_copies]`.
    pub fn clamp_available(&self, candidate: i32) -> i32 {
        candidate.clamp(0, self.total_copies.max(0))
    }
}

/// Availability of a book, as reported to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Availability {
    pub available: bool,
    pub available_copies: i32,
}

impl From<&Book> for Availability {
    fn from(book: &Book) -> Self {
        let available_copies = book.available_copies.max(0);
        Self {
            available: available_copies > 0,
            available_copies,
        }
    }
}

/// Create book request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(custom(function = "validate_title"))]
    pub title: String,
    /// ISBN-13, digits only
    #[validate(custom(function = "validate_isbn"))]
    pub isbn: String,
    #[validate(custom(function = "validate_published_year"))]
    pub published_year: Option<String>,
    #[validate(range(min = 0, message = "Total copies must be >= 0"))]
    pub total_copies: i32,
}

/// Change the number of copies a library owns
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateTotalCopies {
    #[validate(range(min = 0, message = "Total copies must be >= 0"))]
    pub total_copies: i32,
}

/// Book search query
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BookQuery {
    /// Case-insensitive text matched against title and ISBN
    pub q: Option<String>,
}

/// Titles are stored trimmed, so the length bound applies after trimming
fn validate_title(title: &str) -> Result<(), ValidationError> {
    let len = title.trim().chars().count();
    if !(1..=150).contains(&len) {
        let mut err = ValidationError::new("title");
        err.message = Some("Title must be 1-150 characters".into());
        return Err(err);
    }
    Ok(())
}

fn validate_isbn(isbn: &str) -> Result<(), ValidationError> {
    let isbn = isbn.trim();
    if isbn.len() != 13 || !isbn.chars().all(|c| c.is_ascii_digit()) {
        let mut err = ValidationError::new("isbn");
        err.message = Some("ISBN must be exactly 13 digits".into());
        return Err(err);
    }
    Ok(())
}

fn validate_published_year(value: &str) -> Result<(), ValidationError> {
    let value = value.trim();
    let year: i32 = value
        .chars()
        .all(|c| c.is_ascii_digit())
        .then(|| value.parse::<i32>().ok())
        .flatten()
        .ok_or_else(|| {
            let mut err = ValidationError::new("published_year");
            err.message = Some("published_year must contain only digits".into());
            err
        })?;

    let year_now = Local::now().year();
    if year > year_now {
        let mut err = ValidationError::new("published_year");
        err.message = Some(format!("published_year must be between 0 and {}", year_now).into());
        return Err(err);
    }
    Ok(())
}

//! Books repository for database operations

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use super::BOOK_COLUMNS;
use crate::{
    error::{AppError, AppResult},
    models::{Book, CreateBook},
    repository::CatalogStore,
};

/// `ILIKE` pattern matching `query` anywhere, with LIKE metacharacters escaped
fn contains_pattern(query: &str) -> String {
    let escaped = query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogStore for BooksRepository {
    async fn get_book(&self, book_id: i32) -> AppResult<Book> {
        sqlx::query_as::<_, Book>(&format!("SELECT {} FROM book WHERE book_id = $1", BOOK_COLUMNS))
            .bind(book_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", book_id)))
    }

    async fn list_books(&self) -> AppResult<Vec<Book>> {
        let books = sqlx::query_as::<_, Book>(&format!(
            "SELECT {} FROM book ORDER BY book_id",
            BOOK_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(books)
    }

    async fn search_books(&self, query: &str) -> AppResult<Vec<Book>> {
        let pattern = contains_pattern(query);
        let books = sqlx::query_as::<_, Book>(&format!(
            r#"
            SELECT {} FROM book
            WHERE title ILIKE $1 OR isbn ILIKE $1
            ORDER BY book_id
            "#,
            BOOK_COLUMNS
        ))
        .bind(pattern)
        .fetch_all(&self.pool)
        .await?;

        Ok(books)
    }

    async fn create_book(&self, book: &CreateBook) -> AppResult<Book> {
        let created = sqlx::query_as::<_, Book>(&format!(
            r#"
            INSERT INTO book (title, isbn, published_year, total_copies, available_copies)
            VALUES ($1, $2, $3, $4, $4)
            RETURNING {}
            "#,
            BOOK_COLUMNS
        ))
        .bind(book.title.trim())
        .bind(book.isbn.trim())
        .bind(book.published_year.as_deref().map(str::trim))
        .bind(book.total_copies)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db) = &e {
                if db.is_unique_violation() {
                    return AppError::Validation(format!("A book with ISBN {} already exists", book.isbn.trim()));
                }
            }
            AppError::from(e)
        })?;

        Ok(created)
    }

    async fn count_books(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM book")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

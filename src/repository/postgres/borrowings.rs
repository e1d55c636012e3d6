//! Borrowings repository and the Postgres per-book transaction

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{Pool, Postgres, Row, Transaction};

use super::{BOOK_COLUMNS, BORROWING_COLUMNS};
use crate::{
    error::{AppError, AppResult},
    models::{Book, Borrowing, BorrowingCounts, BorrowingQuery, NewBorrowing},
    repository::{BookTransaction, BorrowingStore},
};

#[derive(Clone)]
pub struct BorrowingsRepository {
    pool: Pool<Postgres>,
    lock_timeout: Duration,
}

impl BorrowingsRepository {
    pub fn new(pool: Pool<Postgres>, lock_timeout: Duration) -> Self {
        Self { pool, lock_timeout }
    }
}

#[async_trait]
impl BorrowingStore for BorrowingsRepository {
    async fn begin(&self, book_id: i32) -> AppResult<Box<dyn BookTransaction>> {
        let mut tx = self.pool.begin().await?;

        // SET does not take bind parameters
        sqlx::query(&format!(
            "SET LOCAL lock_timeout = '{}ms'",
            self.lock_timeout.as_millis().max(1)
        ))
        .execute(&mut *tx)
        .await?;

        let book = sqlx::query_as::<_, Book>(&format!(
            "SELECT {} FROM book WHERE book_id = $1 FOR UPDATE",
            BOOK_COLUMNS
        ))
        .bind(book_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", book_id)))?;

        Ok(Box::new(PgBookTransaction { tx, book }))
    }

    async fn book_of_borrowing(&self, borrowing_id: i32) -> AppResult<Option<i32>> {
        let book_id = sqlx::query_scalar::<_, i32>("SELECT book_id FROM borrowing WHERE borrowing_id = $1")
            .bind(borrowing_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(book_id)
    }

    async fn list_borrowings(&self, query: &BorrowingQuery) -> AppResult<Vec<Borrowing>> {
        let borrowings = sqlx::query_as::<_, Borrowing>(&format!(
            r#"
            SELECT {} FROM borrowing
            WHERE ($1::INT IS NULL OR book_id = $1)
              AND ($2::INT IS NULL OR member_id = $2)
              AND ($3::DATE IS NULL OR borrow_date = $3)
              AND ($4::DATE IS NULL OR due_date = $4)
              AND ($5::DATE IS NULL OR return_date = $5)
              AND ($6::BOOLEAN IS NULL OR (return_date IS NULL) = $6)
            ORDER BY borrowing_id
            "#,
            BORROWING_COLUMNS
        ))
        .bind(query.book_id)
        .bind(query.member_id)
        .bind(query.borrow_date)
        .bind(query.due_date)
        .bind(query.return_date)
        .bind(query.active)
        .fetch_all(&self.pool)
        .await?;

        Ok(borrowings)
    }

    async fn member_history(&self, member_id: i32) -> AppResult<Vec<Borrowing>> {
        let borrowings = sqlx::query_as::<_, Borrowing>(&format!(
            r#"
            SELECT {} FROM borrowing
            WHERE member_id = $1
            ORDER BY borrow_date DESC, borrowing_id DESC
            "#,
            BORROWING_COLUMNS
        ))
        .bind(member_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(borrowings)
    }

    async fn counts(&self, today: NaiveDate) -> AppResult<BorrowingCounts> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS total,
                   COUNT(*) FILTER (WHERE return_date IS NULL) AS active,
                   COUNT(*) FILTER (WHERE return_date > due_date) AS late_returns,
                   COUNT(*) FILTER (WHERE return_date IS NULL AND due_date < $1) AS overdue
            FROM borrowing
            "#,
        )
        .bind(today)
        .fetch_one(&self.pool)
        .await?;

        Ok(BorrowingCounts {
            total: row.get("total"),
            active: row.get("active"),
            late_returns: row.get("late_returns"),
            overdue: row.get("overdue"),
        })
    }
}

/// Transaction holding the row lock of one `book`. Dropping it without
/// committing rolls the sqlx transaction back.
pub struct PgBookTransaction {
    tx: Transaction<'static, Postgres>,
    book: Book,
}

impl PgBookTransaction {
    async fn write_copies(&mut self, total_copies: i32, available_copies: i32) -> AppResult<Book> {
        let book = sqlx::query_as::<_, Book>(&format!(
            r#"
            UPDATE book SET total_copies = $2, available_copies = $3
            WHERE book_id = $1
            RETURNING {}
            "#,
            BOOK_COLUMNS
        ))
        .bind(self.book.book_id)
        .bind(total_copies)
        .bind(available_copies)
        .fetch_one(&mut *self.tx)
        .await?;

        self.book = book.clone();
        Ok(book)
    }
}

#[async_trait]
impl BookTransaction for PgBookTransaction {
    fn book(&self) -> &Book {
        &self.book
    }

    async fn find_active_loan(&mut self, member_id: i32) -> AppResult<Option<Borrowing>> {
        let borrowing = sqlx::query_as::<_, Borrowing>(&format!(
            r#"
            SELECT {} FROM borrowing
            WHERE book_id = $1 AND member_id = $2 AND return_date IS NULL
            LIMIT 1
            "#,
            BORROWING_COLUMNS
        ))
        .bind(self.book.book_id)
        .bind(member_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(borrowing)
    }

    async fn find_active_by_id(&mut self, borrowing_id: i32) -> AppResult<Option<Borrowing>> {
        let borrowing = sqlx::query_as::<_, Borrowing>(&format!(
            r#"
            SELECT {} FROM borrowing
            WHERE borrowing_id = $1 AND book_id = $2 AND return_date IS NULL
            FOR UPDATE
            "#,
            BORROWING_COLUMNS
        ))
        .bind(borrowing_id)
        .bind(self.book.book_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(borrowing)
    }

    async fn count_active_loans(&mut self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM borrowing WHERE book_id = $1 AND return_date IS NULL",
        )
        .bind(self.book.book_id)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(count)
    }

    async fn create_borrowing(&mut self, borrowing: NewBorrowing) -> AppResult<Borrowing> {
        let created = sqlx::query_as::<_, Borrowing>(&format!(
            r#"
            INSERT INTO borrowing (book_id, member_id, borrow_date, due_date)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            BORROWING_COLUMNS
        ))
        .bind(borrowing.book_id)
        .bind(borrowing.member_id)
        .bind(borrowing.borrow_date)
        .bind(borrowing.due_date)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| {
            // Backstop for the partial unique index on active loans
            if let sqlx::Error::Database(db) = &e {
                if db.is_unique_violation() {
                    return AppError::DuplicateActiveLoan {
                        book_id: borrowing.book_id,
                        member_id: borrowing.member_id,
                    };
                }
            }
            AppError::from(e)
        })?;

        Ok(created)
    }

    async fn close_borrowing(&mut self, borrowing_id: i32, return_date: NaiveDate) -> AppResult<Borrowing> {
        sqlx::query_as::<_, Borrowing>(&format!(
            r#"
            UPDATE borrowing SET return_date = $3
            WHERE borrowing_id = $1 AND book_id = $2 AND return_date IS NULL
            RETURNING {}
            "#,
            BORROWING_COLUMNS
        ))
        .bind(borrowing_id)
        .bind(self.book.book_id)
        .bind(return_date)
        .fetch_optional(&mut *self.tx)
        .await?
        .ok_or(AppError::NotActiveLoan { borrowing_id })
    }

    async fn update_available_copies(&mut self, delta: i32) -> AppResult<Book> {
        let available = self
            .book
            .clamp_available(self.book.available_copies.saturating_add(delta));
        self.write_copies(self.book.total_copies, available).await
    }

    async fn set_total_copies(&mut self, total_copies: i32) -> AppResult<Book> {
        if total_copies < 0 {
            return Err(AppError::Validation("Total copies must be >= 0".to_string()));
        }
        let delta = total_copies - self.book.total_copies;
        let available = (self.book.available_copies + delta).clamp(0, total_copies);
        self.write_copies(total_copies, available).await
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}

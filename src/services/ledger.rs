//! Borrowing ledger: borrow/return transitions and copy accounting
//!
//! Every transition runs inside a [`BookTransaction`], which holds the
//! exclusive lock of the affected book from the first read of its counter
//! until commit or drop. Operations on different books never wait on each
//! other. Failures are reported as-is; nothing here retries.

use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::{
        borrowing::late_days, Availability, BorrowOutcome, Borrowing, BorrowingQuery, NewBorrowing,
        ReturnOutcome,
    },
    repository::{BookTransaction, Repository},
    services::Clock,
};

#[derive(Clone)]
pub struct LedgerService {
    repository: Repository,
    clock: Arc<dyn Clock>,
}

impl LedgerService {
    pub fn new(repository: Repository, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    async fn lock_book(&self, book_id: i32) -> AppResult<Box<dyn BookTransaction>> {
        self.repository.borrowings.begin(book_id).await.map_err(|e| {
            if e.is_retryable() {
                tracing::warn!(book_id, "Lock contention: {}", e);
            }
            e
        })
    }

    /// Borrow a copy of `book_id` for `member_id`
    pub async fn borrow(&self, book_id: i32, member_id: i32) -> AppResult<BorrowOutcome> {
        // Members are never mutated by the ledger, no lock needed
        self.repository.members.get_member(member_id).await?;

        let mut tx = self.lock_book(book_id).await?;

        if tx.book().available_copies <= 0 {
            tracing::debug!(book_id, member_id, "Borrow rejected: no copies left");
            return Err(AppError::Unavailable { book_id });
        }

        if tx.find_active_loan(member_id).await?.is_some() {
            tracing::debug!(book_id, member_id, "Borrow rejected: loan already active");
            return Err(AppError::DuplicateActiveLoan { book_id, member_id });
        }

        let borrowing = tx
            .create_borrowing(NewBorrowing::starting(book_id, member_id, self.clock.today()))
            .await?;
        let book = tx.update_available_copies(-1).await?;
        tx.commit().await?;

        tracing::info!(
            book_id,
            member_id,
            borrowing_id = borrowing.borrowing_id,
            available_copies = book.available_copies,
            "Book borrowed, due {}",
            borrowing.due_date
        );

        Ok(BorrowOutcome {
            borrowing,
            available_copies: book.available_copies,
        })
    }

    /// Close the active borrowing `borrowing_id`
    pub async fn return_borrowing(&self, borrowing_id: i32) -> AppResult<ReturnOutcome> {
        let book_id = self
            .repository
            .borrowings
            .book_of_borrowing(borrowing_id)
            .await?
            .ok_or(AppError::NotActiveLoan { borrowing_id })?;

        let mut tx = self.lock_book(book_id).await?;

        // Re-read under the lock: a concurrent return may have closed it
        let active = tx
            .find_active_by_id(borrowing_id)
            .await?
            .ok_or(AppError::NotActiveLoan { borrowing_id })?;

        let return_date = self.clock.today();
        let borrowing = tx.close_borrowing(active.borrowing_id, return_date).await?;
        let book = tx.update_available_copies(1).await?;
        tx.commit().await?;

        let late_days = late_days(borrowing.due_date, return_date);

        tracing::info!(
            book_id,
            member_id = borrowing.member_id,
            borrowing_id,
            available_copies = book.available_copies,
            late_days,
            "Book returned"
        );

        Ok(ReturnOutcome {
            borrowing,
            return_date,
            late_days,
            available_copies: book.available_copies,
        })
    }

    /// Current availability of a book, read without taking its lock
    pub async fn availability(&self, book_id: i32) -> AppResult<Availability> {
        let book = self.repository.books.get_book(book_id).await?;
        Ok(Availability::from(&book))
    }

    /// The borrowing history, oldest first, filtered by `query`
    pub async fn list_borrowings(&self, query: &BorrowingQuery) -> AppResult<Vec<Borrowing>> {
        self.repository.borrowings.list_borrowings(query).await
    }

    /// All borrowings of a member, newest first
    pub async fn member_history(&self, member_id: i32) -> AppResult<Vec<Borrowing>> {
        self.repository.members.get_member(member_id).await?;
        self.repository.borrowings.member_history(member_id).await
    }
}

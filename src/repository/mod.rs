//! Repository layer: storage seams for the catalog, members and the borrowing ledger
//!
//! Two backends implement the same traits: [`postgres`] for deployments and
//! [`memory`] for single-process use and tests.

pub mod memory;
pub mod postgres;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    models::{
        Book, Borrowing, BorrowingCounts, BorrowingQuery, CreateBook, CreateMember, Member, MemberQuery,
        NewBorrowing,
    },
};

/// Book records. Copy counters are only changed through a [`BookTransaction`].
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Get a book by id, `NotFound` if it does not exist
    async fn get_book(&self, book_id: i32) -> AppResult<Book>;

    /// All books ordered by id
    async fn list_books(&self) -> AppResult<Vec<Book>>;

    /// Books whose title or ISBN contains `query`, case-insensitively
    async fn search_books(&self, query: &str) -> AppResult<Vec<Book>>;

    async fn create_book(&self, book: &CreateBook) -> AppResult<Book>;

    async fn count_books(&self) -> AppResult<i64>;

    /// Cheap round trip to the backing store
    async fn ping(&self) -> AppResult<()>;
}

/// Member records, read-only from the ledger's point of view
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MembershipStore: Send + Sync {
    /// Get a member by id, `NotFound` if it does not exist
    async fn get_member(&self, member_id: i32) -> AppResult<Member>;

    /// Members matching `query`, ordered by id
    async fn list_members(&self, query: &MemberQuery) -> AppResult<Vec<Member>>;

    async fn create_member(&self, member: &CreateMember) -> AppResult<Member>;

    async fn count_members(&self) -> AppResult<i64>;
}

/// Borrowing history and the entry point to per-book transactions
#[async_trait]
pub trait BorrowingStore: Send + Sync {
    /// Lock `book_id` exclusively and open a transaction scoped to it.
    ///
    /// Fails with `NotFound` if the book does not exist and with `Contention`
    /// if the lock cannot be obtained within the configured timeout.
    async fn begin(&self, book_id: i32) -> AppResult<Box<dyn BookTransaction>>;

    /// Unlocked lookup of the book a borrowing refers to
    async fn book_of_borrowing(&self, borrowing_id: i32) -> AppResult<Option<i32>>;

    /// Borrowings matching `query`, ordered by id
    async fn list_borrowings(&self, query: &BorrowingQuery) -> AppResult<Vec<Borrowing>>;

    /// Every borrowing of a member, newest first
    async fn member_history(&self, member_id: i32) -> AppResult<Vec<Borrowing>>;

    /// Snapshot counters for statistics; never takes a book lock
    async fn counts(&self, today: NaiveDate) -> AppResult<BorrowingCounts>;
}

/// A transaction holding the exclusive lock of a single book.
///
/// Nothing is visible to other readers until [`commit`](Self::commit).
/// Dropping the transaction discards every write and releases the lock.
#[async_trait]
pub trait BookTransaction: Send {
    /// The locked book, reflecting writes made in this transaction
    fn book(&self) -> &Book;

    /// The active loan of this book held by `member_id`, if any
    async fn find_active_loan(&mut self, member_id: i32) -> AppResult<Option<Borrowing>>;

    /// The borrowing `borrowing_id` if it belongs to this book and is still active
    async fn find_active_by_id(&mut self, borrowing_id: i32) -> AppResult<Option<Borrowing>>;

    async fn count_active_loans(&mut self) -> AppResult<i64>;

    async fn create_borrowing(&mut self, borrowing: NewBorrowing) -> AppResult<Borrowing>;

    /// Set `return_date` on an active borrowing; `NotActiveLoan` otherwise
    async fn close_borrowing(&mut self, borrowing_id: i32, return_date: NaiveDate) -> AppResult<Borrowing>;

    /// Move `available_copies` by `delta`, clamped to `[0, total_copies]`
    async fn update_available_copies(&mut self, delta: i32) -> AppResult<Book>;

    /// Replace `total_copies`, moving `available_copies` by the same amount
    async fn set_total_copies(&mut self, total_copies: i32) -> AppResult<Book>;

    async fn commit(self: Box<Self>) -> AppResult<()>;
}

/// Main repository struct holding one handle per store
#[derive(Clone)]
pub struct Repository {
    pub books: Arc<dyn CatalogStore>,
    pub members: Arc<dyn MembershipStore>,
    pub borrowings: Arc<dyn BorrowingStore>,
}

impl Repository {
    /// Create a Postgres-backed repository with the given database pool
    pub fn postgres(pool: Pool<Postgres>, lock_timeout: Duration) -> Self {
        Self {
            books: Arc::new(postgres::BooksRepository::new(pool.clone())),
            members: Arc::new(postgres::MembersRepository::new(pool.clone())),
            borrowings: Arc::new(postgres::BorrowingsRepository::new(pool, lock_timeout)),
        }
    }

    /// Create a repository over a shared in-memory store
    pub fn memory(store: memory::MemoryStore) -> Self {
        Self {
            books: Arc::new(store.clone()),
            members: Arc::new(store.clone()),
            borrowings: Arc::new(store),
        }
    }
}

//! In-memory backend
//!
//! Committed rows live behind a single `RwLock` that is only held for short,
//! non-async sections. The per-book lock is a `tokio` mutex keyed by `book_id`;
//! a [`MemoryBookTransaction`] owns its guard and stages every write until
//! commit, so dropping it is a full rollback.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::{
    error::{AppError, AppResult},
    models::{
        Book, Borrowing, BorrowingCounts, BorrowingQuery, CreateBook, CreateMember, Member, MemberQuery,
        NewBorrowing,
    },
    repository::{BookTransaction, BorrowingStore, CatalogStore, MembershipStore},
};

#[derive(Default)]
struct Tables {
    books: BTreeMap<i32, Book>,
    members: BTreeMap<i32, Member>,
    borrowings: BTreeMap<i32, Borrowing>,
}

impl Tables {
    fn active_loans_of(&self, book_id: i32) -> impl Iterator<Item = &Borrowing> {
        self.borrowings
            .values()
            .filter(move |b| b.book_id == book_id && b.is_active())
    }
}

struct Inner {
    tables: RwLock<Tables>,
    book_locks: Mutex<HashMap<i32, Arc<AsyncMutex<()>>>>,
    next_book_id: AtomicI32,
    next_member_id: AtomicI32,
    next_borrowing_id: AtomicI32,
    lock_timeout: Duration,
}

impl Inner {
    fn read(&self) -> AppResult<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| AppError::Storage("In-memory tables are poisoned".to_string()))
    }

    fn write(&self) -> AppResult<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| AppError::Storage("In-memory tables are poisoned".to_string()))
    }

    fn book_lock(&self, book_id: i32) -> AppResult<Arc<AsyncMutex<()>>> {
        let mut locks = self
            .book_locks
            .lock()
            .map_err(|_| AppError::Storage("Book lock table is poisoned".to_string()))?;
        Ok(locks.entry(book_id).or_default().clone())
    }
}

/// Shared in-process store implementing every repository trait
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    pub fn new(lock_timeout: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                tables: RwLock::new(Tables::default()),
                book_locks: Mutex::new(HashMap::new()),
                next_book_id: AtomicI32::new(1),
                next_member_id: AtomicI32::new(1),
                next_borrowing_id: AtomicI32::new(1),
                lock_timeout,
            }),
        }
    }

    fn not_found(book_id: i32) -> AppError {
        AppError::NotFound(format!("Book with id {} not found", book_id))
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn get_book(&self, book_id: i32) -> AppResult<Book> {
        let tables = self.inner.read()?;
        tables.books.get(&book_id).cloned().ok_or_else(|| Self::not_found(book_id))
    }

    async fn list_books(&self) -> AppResult<Vec<Book>> {
        let tables = self.inner.read()?;
        Ok(tables.books.values().cloned().collect())
    }

    async fn search_books(&self, query: &str) -> AppResult<Vec<Book>> {
        let needle = query.to_lowercase();
        let tables = self.inner.read()?;
        Ok(tables
            .books
            .values()
            .filter(|b| b.title.to_lowercase().contains(&needle) || b.isbn.contains(&needle))
            .cloned()
            .collect())
    }

    async fn create_book(&self, book: &CreateBook) -> AppResult<Book> {
        let isbn = book.isbn.trim().to_string();
        let mut tables = self.inner.write()?;
        if tables.books.values().any(|b| b.isbn == isbn) {
            return Err(AppError::Validation(format!("A book with ISBN {} already exists", isbn)));
        }

        let created = Book {
            book_id: self.inner.next_book_id.fetch_add(1, Ordering::SeqCst),
            title: book.title.trim().to_string(),
            isbn,
            published_year: book.published_year.as_deref().map(|y| y.trim().to_string()),
            total_copies: book.total_copies,
            available_copies: book.total_copies,
        };
        tables.books.insert(created.book_id, created.clone());
        Ok(created)
    }

    async fn count_books(&self) -> AppResult<i64> {
        Ok(self.inner.read()?.books.len() as i64)
    }

    async fn ping(&self) -> AppResult<()> {
        self.inner.read().map(|_| ())
    }
}

#[async_trait]
impl MembershipStore for MemoryStore {
    async fn get_member(&self, member_id: i32) -> AppResult<Member> {
        let tables = self.inner.read()?;
        tables
            .members
            .get(&member_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Member with id {} not found", member_id)))
    }

    async fn list_members(&self, query: &MemberQuery) -> AppResult<Vec<Member>> {
        let tables = self.inner.read()?;
        Ok(tables
            .members
            .values()
            .filter(|m| query.member_type.as_deref().map_or(true, |t| m.member_type == t))
            .cloned()
            .collect())
    }

    async fn create_member(&self, member: &CreateMember) -> AppResult<Member> {
        let mut tables = self.inner.write()?;
        if let Some(email) = &member.email {
            if tables.members.values().any(|m| m.email.as_deref() == Some(email.as_str())) {
                return Err(AppError::Validation("A member with this email already exists".to_string()));
            }
        }

        let created = Member {
            member_id: self.inner.next_member_id.fetch_add(1, Ordering::SeqCst),
            name: member.name.trim().to_string(),
            email: member.email.clone(),
            phone_number: member.phone_number.clone(),
            member_type: member.member_type.clone(),
        };
        tables.members.insert(created.member_id, created.clone());
        Ok(created)
    }

    async fn count_members(&self) -> AppResult<i64> {
        Ok(self.inner.read()?.members.len() as i64)
    }
}

#[async_trait]
impl BorrowingStore for MemoryStore {
    async fn begin(&self, book_id: i32) -> AppResult<Box<dyn BookTransaction>> {
        let exists = self.inner.read()?.books.contains_key(&book_id);
        if !exists {
            return Err(Self::not_found(book_id));
        }

        let lock = self.inner.book_lock(book_id)?;
        let guard = tokio::time::timeout(self.inner.lock_timeout, lock.lock_owned())
            .await
            .map_err(|_| {
                AppError::Contention(format!("Timed out waiting for the lock on book {}", book_id))
            })?;

        // Re-read under the lock so the snapshot includes every earlier commit
        let book = self
            .inner
            .read()?
            .books
            .get(&book_id)
            .cloned()
            .ok_or_else(|| Self::not_found(book_id))?;

        Ok(Box::new(MemoryBookTransaction {
            inner: self.inner.clone(),
            book,
            created: Vec::new(),
            closed: BTreeMap::new(),
            _guard: guard,
        }))
    }

    async fn book_of_borrowing(&self, borrowing_id: i32) -> AppResult<Option<i32>> {
        let tables = self.inner.read()?;
        Ok(tables.borrowings.get(&borrowing_id).map(|b| b.book_id))
    }

    async fn list_borrowings(&self, query: &BorrowingQuery) -> AppResult<Vec<Borrowing>> {
        let tables = self.inner.read()?;
        Ok(tables
            .borrowings
            .values()
            .filter(|b| query.matches(b))
            .cloned()
            .collect())
    }

    async fn member_history(&self, member_id: i32) -> AppResult<Vec<Borrowing>> {
        let tables = self.inner.read()?;
        let mut history: Vec<Borrowing> = tables
            .borrowings
            .values()
            .filter(|b| b.member_id == member_id)
            .cloned()
            .collect();
        history.sort_by(|a, b| {
            b.borrow_date
                .cmp(&a.borrow_date)
                .then(b.borrowing_id.cmp(&a.borrowing_id))
        });
        Ok(history)
    }

    async fn counts(&self, today: NaiveDate) -> AppResult<BorrowingCounts> {
        let tables = self.inner.read()?;
        Ok(tables
            .borrowings
            .values()
            .fold(BorrowingCounts::default(), |mut counts, b| {
                counts.total += 1;
                counts.active += i64::from(b.is_active());
                counts.late_returns += i64::from(b.is_late_return());
                counts.overdue += i64::from(b.is_overdue(today));
                counts
            }))
    }
}

/// Per-book transaction over a [`MemoryStore`]
pub struct MemoryBookTransaction {
    inner: Arc<Inner>,
    book: Book,
    /// Borrowings inserted by this transaction
    created: Vec<Borrowing>,
    /// Committed borrowings closed by this transaction, keyed by id
    closed: BTreeMap<i32, Borrowing>,
    _guard: OwnedMutexGuard<()>,
}

#[async_trait]
impl BookTransaction for MemoryBookTransaction {
    fn book(&self) -> &Book {
        &self.book
    }

    async fn find_active_loan(&mut self, member_id: i32) -> AppResult<Option<Borrowing>> {
        if let Some(staged) = self
            .created
            .iter()
            .find(|b| b.member_id == member_id && b.is_active())
        {
            return Ok(Some(staged.clone()));
        }

        let tables = self.inner.read()?;
        let committed = tables
            .active_loans_of(self.book.book_id)
            .find(|b| b.member_id == member_id && !self.closed.contains_key(&b.borrowing_id))
            .cloned();
        Ok(committed)
    }

    async fn find_active_by_id(&mut self, borrowing_id: i32) -> AppResult<Option<Borrowing>> {
        if let Some(staged) = self.created.iter().find(|b| b.borrowing_id == borrowing_id) {
            return Ok(staged.is_active().then(|| staged.clone()));
        }
        if self.closed.contains_key(&borrowing_id) {
            return Ok(None);
        }

        let tables = self.inner.read()?;
        Ok(tables
            .borrowings
            .get(&borrowing_id)
            .filter(|b| b.book_id == self.book.book_id && b.is_active())
            .cloned())
    }

    async fn count_active_loans(&mut self) -> AppResult<i64> {
        let tables = self.inner.read()?;
        let committed = tables
            .active_loans_of(self.book.book_id)
            .filter(|b| !self.closed.contains_key(&b.borrowing_id))
            .count();
        let staged = self.created.iter().filter(|b| b.is_active()).count();
        Ok((committed + staged) as i64)
    }

    async fn create_borrowing(&mut self, borrowing: NewBorrowing) -> AppResult<Borrowing> {
        if borrowing.book_id != self.book.book_id {
            return Err(AppError::Internal(format!(
                "Borrowing for book {} created in transaction of book {}",
                borrowing.book_id, self.book.book_id
            )));
        }

        let created = Borrowing {
            borrowing_id: self.inner.next_borrowing_id.fetch_add(1, Ordering::SeqCst),
            book_id: borrowing.book_id,
            member_id: borrowing.member_id,
            borrow_date: borrowing.borrow_date,
            due_date: borrowing.due_date,
            return_date: None,
        };
        self.created.push(created.clone());
        Ok(created)
    }

    async fn close_borrowing(&mut self, borrowing_id: i32, return_date: NaiveDate) -> AppResult<Borrowing> {
        if let Some(staged) = self
            .created
            .iter_mut()
            .find(|b| b.borrowing_id == borrowing_id && b.is_active())
        {
            staged.return_date = Some(return_date);
            return Ok(staged.clone());
        }

        let mut closed = self
            .find_active_by_id(borrowing_id)
            .await?
            .ok_or(AppError::NotActiveLoan { borrowing_id })?;
        closed.return_date = Some(return_date);
        self.closed.insert(borrowing_id, closed.clone());
        Ok(closed)
    }

    async fn update_available_copies(&mut self, delta: i32) -> AppResult<Book> {
        self.book.available_copies = self
            .book
            .clamp_available(self.book.available_copies.saturating_add(delta));
        Ok(self.book.clone())
    }

    async fn set_total_copies(&mut self, total_copies: i32) -> AppResult<Book> {
        if total_copies < 0 {
            return Err(AppError::Validation("Total copies must be >= 0".to_string()));
        }
        let delta = total_copies - self.book.total_copies;
        self.book.total_copies = total_copies;
        self.book.available_copies = (self.book.available_copies + delta).clamp(0, total_copies);
        Ok(self.book.clone())
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let MemoryBookTransaction {
            inner,
            book,
            created,
            closed,
            _guard,
        } = *self;

        // Writes land before `_guard` is released at the end of this scope
        let mut tables = inner.write()?;
        if let Some(row) = tables.books.get_mut(&book.book_id) {
            row.total_copies = book.total_copies;
            row.available_copies = book.available_copies;
        }
        for borrowing in created.into_iter().chain(closed.into_values()) {
            tables.borrowings.insert(borrowing.borrowing_id, borrowing);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 8, d).unwrap()
    }

    async fn store_with_book(copies: i32) -> (MemoryStore, Book, Member) {
        let store = MemoryStore::new(Duration::from_millis(100));
        let book = store
            .create_book(&CreateBook {
                title: "The Rust Programming Language".to_string(),
                isbn: "9781718503106".to_string(),
                published_year: Some("2023".to_string()),
                total_copies: copies,
            })
            .await
            .unwrap();
        let member = store
            .create_member(&CreateMember {
                name: "Grace Hopper".to_string(),
                email: Some("grace@example.org".to_string()),
                phone_number: None,
                member_type: "staff".to_string(),
            })
            .await
            .unwrap();
        (store, book, member)
    }

    #[tokio::test]
    async fn test_begin_unknown_book_is_not_found() {
        let store = MemoryStore::new(Duration::from_millis(100));
        let err = store.begin(42).await.err().unwrap();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_commit_applies_staged_writes() {
        let (store, book, member) = store_with_book(2).await;

        let mut tx = store.begin(book.book_id).await.unwrap();
        let created = tx
            .create_borrowing(NewBorrowing::starting(book.book_id, member.member_id, day(1)))
            .await
            .unwrap();
        tx.update_available_copies(-1).await.unwrap();

        // Not visible before commit
        assert_eq!(store.get_book(book.book_id).await.unwrap().available_copies, 2);
        assert_eq!(store.book_of_borrowing(created.borrowing_id).await.unwrap(), None);

        tx.commit().await.unwrap();

        assert_eq!(store.get_book(book.book_id).await.unwrap().available_copies, 1);
        assert_eq!(
            store.book_of_borrowing(created.borrowing_id).await.unwrap(),
            Some(book.book_id)
        );
    }

    #[tokio::test]
    async fn test_drop_rolls_back() {
        let (store, book, member) = store_with_book(1).await;

        {
            let mut tx = store.begin(book.book_id).await.unwrap();
            tx.create_borrowing(NewBorrowing::starting(book.book_id, member.member_id, day(1)))
                .await
                .unwrap();
            tx.update_available_copies(-1).await.unwrap();
        }

        assert_eq!(store.get_book(book.book_id).await.unwrap().available_copies, 1);
        assert!(store.member_history(member.member_id).await.unwrap().is_empty());

        // Lock released on drop
        let tx = store.begin(book.book_id).await.unwrap();
        assert_eq!(tx.book().available_copies, 1);
    }

    #[tokio::test]
    async fn test_second_transaction_times_out_with_contention() {
        let (store, book, _) = store_with_book(1).await;

        let _held = store.begin(book.book_id).await.unwrap();
        let err = store.begin(book.book_id).await.err().unwrap();
        assert!(matches!(err, AppError::Contention(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_other_books_are_not_blocked() {
        let (store, book, _) = store_with_book(1).await;
        let other = store
            .create_book(&CreateBook {
                title: "Programming Rust".to_string(),
                isbn: "9781492052593".to_string(),
                published_year: None,
                total_copies: 1,
            })
            .await
            .unwrap();

        let _held = store.begin(book.book_id).await.unwrap();
        assert!(store.begin(other.book_id).await.is_ok());
    }

    #[tokio::test]
    async fn test_updates_are_clamped() {
        let (store, book, _) = store_with_book(2).await;

        let mut tx = store.begin(book.book_id).await.unwrap();
        assert_eq!(tx.update_available_copies(5).await.unwrap().available_copies, 2);
        assert_eq!(tx.update_available_copies(-7).await.unwrap().available_copies, 0);
    }

    #[tokio::test]
    async fn test_close_borrowing_twice_is_not_active() {
        let (store, book, member) = store_with_book(1).await;

        let mut tx = store.begin(book.book_id).await.unwrap();
        let created = tx
            .create_borrowing(NewBorrowing::starting(book.book_id, member.member_id, day(1)))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin(book.book_id).await.unwrap();
        tx.close_borrowing(created.borrowing_id, day(3)).await.unwrap();
        assert_eq!(tx.count_active_loans().await.unwrap(), 0);
        let err = tx.close_borrowing(created.borrowing_id, day(4)).await.err().unwrap();
        assert!(matches!(err, AppError::NotActiveLoan { .. }));
    }

    #[tokio::test]
    async fn test_duplicate_isbn_rejected() {
        let (store, book, _) = store_with_book(1).await;
        let err = store
            .create_book(&CreateBook {
                title: "Another".to_string(),
                isbn: book.isbn.clone(),
                published_year: None,
                total_copies: 1,
            })
            .await
            .err()
            .unwrap();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive() {
        let (store, book, _) = store_with_book(1).await;
        assert!(store.search_books("haskell").await.unwrap().is_empty());
        let found = store.search_books("PROGRAMMING language").await.unwrap();
        assert_eq!(found, vec![book.clone()]);
        let found = store.search_books("718503").await.unwrap();
        assert_eq!(found, vec![book]);
    }
}

//! Postgres backend
//!
//! The per-book lock is the `book` row lock taken by `SELECT ... FOR UPDATE`
//! inside a transaction whose `lock_timeout` bounds the wait.

mod books;
mod borrowings;
mod members;

pub use books::BooksRepository;
pub use borrowings::BorrowingsRepository;
pub use members::MembersRepository;

pub(crate) const BOOK_COLUMNS: &str =
    "book_id, title, isbn, published_year, total_copies, available_copies";

pub(crate) const BORROWING_COLUMNS: &str =
    "borrowing_id, book_id, member_id, borrow_date, due_date, return_date";

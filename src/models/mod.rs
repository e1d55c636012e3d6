//! Data models for the library ledger

pub mod book;
pub mod borrowing;
pub mod member;
pub mod stats;

// Re-export commonly used types
pub use book::{Availability, Book, BookQuery, CreateBook, UpdateTotalCopies};
pub use borrowing::{BorrowOutcome, Borrowing, BorrowingQuery, NewBorrowing, ReturnOutcome, LOAN_PERIOD_DAYS};
pub use member::{CreateMember, Member, MemberQuery};
pub use stats::{BorrowingCounts, LibraryStats};

//! Aggregated library statistics

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Borrowing counters computed by a single read of the ledger
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BorrowingCounts {
    pub total: i64,
    pub active: i64,
    pub late_returns: i64,
    pub overdue: i64,
}

/// Library-wide statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LibraryStats {
    pub total_books: i64,
    pub total_members: i64,
    /// All borrowings ever recorded
    pub total_borrowings: i64,
    /// Borrowings not yet returned
    pub currently_borrowed: i64,
    /// Borrowings returned after their due date
    pub late_returns: i64,
    /// Active borrowings already past their due date
    pub overdue_loans: i64,
}

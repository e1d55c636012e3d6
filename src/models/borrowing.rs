//! Borrowing (loan) model and related types

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

/// Length of a loan; the due date is always this many days after the borrow date
pub const LOAN_PERIOD_DAYS: i64 = 14;

/// Borrowing model from database. Rows are never deleted; a return only sets
/// `return_date`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Borrowing {
    pub borrowing_id: i32,
    pub book_id: i32,
    pub member_id: i32,
    pub borrow_date: NaiveDate,
    pub due_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
}

impl Borrowing {
    /// An active loan has not been returned yet
    pub fn is_active(&self) -> bool {
        self.return_date.is_none()
    }

    pub fn is_late_return(&self) -> bool {
        self.return_date.is_some_and(|returned| returned > self.due_date)
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.is_active() && today > self.due_date
    }
}

/// Filters for listing the borrowing history; every given field must match
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BorrowingQuery {
    pub book_id: Option<i32>,
    pub member_id: Option<i32>,
    pub borrow_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub return_date: Option<NaiveDate>,
    /// `true` for loans not yet returned, `false` for closed ones
    pub active: Option<bool>,
}

impl BorrowingQuery {
    pub fn matches(&self, borrowing: &Borrowing) -> bool {
        self.book_id.map_or(true, |id| borrowing.book_id == id)
            && self.member_id.map_or(true, |id| borrowing.member_id == id)
            && self.borrow_date.map_or(true, |d| borrowing.borrow_date == d)
            && self.due_date.map_or(true, |d| borrowing.due_date == d)
            && self.return_date.map_or(true, |d| borrowing.return_date == Some(d))
            && self.active.map_or(true, |active| borrowing.is_active() == active)
    }
}

/// Due date for a loan starting on `borrow_date`
pub fn due_date_for(borrow_date: NaiveDate) -> NaiveDate {
    borrow_date + Duration::days(LOAN_PERIOD_DAYS)
}

/// Whole days by which `return_date` exceeds `due_date`; zero when on time or early
pub fn late_days(due_date: NaiveDate, return_date: NaiveDate) -> i64 {
    (return_date - due_date).num_days().max(0)
}

/// Values for a borrowing row about to be inserted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBorrowing {
    pub book_id: i32,
    pub member_id: i32,
    pub borrow_date: NaiveDate,
    pub due_date: NaiveDate,
}

impl NewBorrowing {
    pub fn starting(book_id: i32, member_id: i32, borrow_date: NaiveDate) -> Self {
        Self {
            book_id,
            member_id,
            borrow_date,
            due_date: due_date_for(borrow_date),
        }
    }
}

/// Result of a committed borrow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct BorrowOutcome {
    pub borrowing: Borrowing,
    /// Copies left after this borrow
    pub available_copies: i32,
}

/// Result of a committed return
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ReturnOutcome {
    pub borrowing: Borrowing,
    pub return_date: NaiveDate,
    pub late_days: i64,
    /// Copies available after this return
    pub available_copies: i32,
}

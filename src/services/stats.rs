//! Statistics service

use std::sync::Arc;

use crate::{error::AppResult, models::LibraryStats, repository::Repository, services::Clock};

#[derive(Clone)]
pub struct StatsService {
    repository: Repository,
    clock: Arc<dyn Clock>,
}

impl StatsService {
    pub fn new(repository: Repository, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    /// Library-wide counters.
    ///
    /// Each count is an independent snapshot read and no book lock is taken,
    /// so figures may be slightly off while borrows and returns are in flight.
    pub async fn get_stats(&self) -> AppResult<LibraryStats> {
        let (total_books, total_members, borrowings) = tokio::try_join!(
            self.repository.books.count_books(),
            self.repository.members.count_members(),
            self.repository.borrowings.counts(self.clock.today()),
        )?;

        Ok(LibraryStats {
            total_books,
            total_members,
            total_borrowings: borrowings.total,
            currently_borrowed: borrowings.active,
            late_returns: borrowings.late_returns,
            overdue_loans: borrowings.overdue,
        })
    }
}

//! Catalog and membership maintenance service

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{Book, CreateBook, CreateMember, Member, MemberQuery, UpdateTotalCopies},
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// List every book ordered by id
    pub async fn list_books(&self) -> AppResult<Vec<Book>> {
        self.repository.books.list_books().await
    }

    /// Search books by title or ISBN. An empty query matches nothing.
    pub async fn search_books(&self, query: Option<&str>) -> AppResult<Vec<Book>> {
        let query = query.map(str::trim).unwrap_or_default();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        self.repository.books.search_books(query).await
    }

    pub async fn get_book(&self, book_id: i32) -> AppResult<Book> {
        self.repository.books.get_book(book_id).await
    }

    /// Create a book; all of its copies start out available
    pub async fn create_book(&self, book: CreateBook) -> AppResult<Book> {
        book.validate()?;
        let created = self.repository.books.create_book(&book).await?;
        tracing::info!(book_id = created.book_id, isbn = %created.isbn, "Book created");
        Ok(created)
    }

    /// Change how many copies of a book the library owns.
    ///
    /// Runs under the book's ledger lock. The new total may not drop below the
    /// number of copies currently on loan.
    pub async fn update_total_copies(&self, book_id: i32, update: UpdateTotalCopies) -> AppResult<Book> {
        update.validate()?;

        let mut tx = self.repository.borrowings.begin(book_id).await?;
        let on_loan = tx.count_active_loans().await?;
        if i64::from(update.total_copies) < on_loan {
            return Err(AppError::Validation(format!(
                "Book {} has {} copies on loan, total copies cannot be set to {}",
                book_id, on_loan, update.total_copies
            )));
        }

        let book = tx.set_total_copies(update.total_copies).await?;
        tx.commit().await?;

        tracing::info!(
            book_id,
            total_copies = book.total_copies,
            available_copies = book.available_copies,
            "Book copies updated"
        );
        Ok(book)
    }

    pub async fn get_member(&self, member_id: i32) -> AppResult<Member> {
        self.repository.members.get_member(member_id).await
    }

    /// List members ordered by id, optionally of one type only
    pub async fn list_members(&self, query: &MemberQuery) -> AppResult<Vec<Member>> {
        self.repository.members.list_members(query).await
    }

    pub async fn create_member(&self, member: CreateMember) -> AppResult<Member> {
        let member = member.normalized();
        member.validate()?;
        let created = self.repository.members.create_member(&member).await?;
        tracing::info!(member_id = created.member_id, "Member created");
        Ok(created)
    }

    /// Round trip to the backing store for readiness checks
    pub async fn ping(&self) -> AppResult<()> {
        self.repository.books.ping().await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::NaiveDate;

    use super::*;
    use crate::{
        repository::memory::MemoryStore,
        services::{ledger::LedgerService, FixedClock},
    };

    fn services() -> (CatalogService, LedgerService) {
        let repository = Repository::memory(MemoryStore::new(Duration::from_secs(1)));
        let clock = Arc::new(FixedClock::new(NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()));
        (
            CatalogService::new(repository.clone()),
            LedgerService::new(repository, clock),
        )
    }

    fn new_book(total_copies: i32) -> CreateBook {
        CreateBook {
            title: "Crafting Interpreters".to_string(),
            isbn: "9780990582939".to_string(),
            published_year: Some("2021".to_string()),
            total_copies,
        }
    }

    fn new_member(name: &str) -> CreateMember {
        CreateMember {
            name: name.to_string(),
            email: None,
            phone_number: Some("0123456789".to_string()),
            member_type: "student".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_book_starts_fully_available() {
        let (catalog, _) = services();
        let book = catalog.create_book(new_book(4)).await.unwrap();
        assert_eq!(book.total_copies, 4);
        assert_eq!(book.available_copies, 4);
        assert_eq!(catalog.get_book(book.book_id).await.unwrap(), book);
    }

    #[tokio::test]
    async fn test_create_book_rejects_invalid_input() {
        let (catalog, _) = services();
        let mut book = new_book(1);
        book.isbn = "12345".to_string();
        let err = catalog.create_book(book).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(catalog.list_books().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_search_returns_nothing() {
        let (catalog, _) = services();
        catalog.create_book(new_book(1)).await.unwrap();
        assert!(catalog.search_books(None).await.unwrap().is_empty());
        assert!(catalog.search_books(Some("   ")).await.unwrap().is_empty());
        assert_eq!(catalog.search_books(Some("interpreters")).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_total_copies_moves_available() {
        let (catalog, ledger) = services();
        let book = catalog.create_book(new_book(2)).await.unwrap();
        let member = catalog.create_member(new_member("Ada")).await.unwrap();
        ledger.borrow(book.book_id, member.member_id).await.unwrap();

        let grown = catalog
            .update_total_copies(book.book_id, UpdateTotalCopies { total_copies: 5 })
            .await
            .unwrap();
        assert_eq!((grown.total_copies, grown.available_copies), (5, 4));

        let shrunk = catalog
            .update_total_copies(book.book_id, UpdateTotalCopies { total_copies: 1 })
            .await
            .unwrap();
        assert_eq!((shrunk.total_copies, shrunk.available_copies), (1, 0));
    }

    #[tokio::test]
    async fn test_total_copies_cannot_drop_below_loans() {
        let (catalog, ledger) = services();
        let book = catalog.create_book(new_book(2)).await.unwrap();
        let a = catalog.create_member(new_member("A")).await.unwrap();
        let b = catalog.create_member(new_member("B")).await.unwrap();
        ledger.borrow(book.book_id, a.member_id).await.unwrap();
        ledger.borrow(book.book_id, b.member_id).await.unwrap();

        let err = catalog
            .update_total_copies(book.book_id, UpdateTotalCopies { total_copies: 1 })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let unchanged = catalog.get_book(book.book_id).await.unwrap();
        assert_eq!((unchanged.total_copies, unchanged.available_copies), (2, 0));
    }

    #[tokio::test]
    async fn test_create_member_validation() {
        let (catalog, _) = services();
        let mut member = new_member("Ada");
        member.phone_number = Some("12".to_string());
        assert!(matches!(
            catalog.create_member(member).await.unwrap_err(),
            AppError::Validation(_)
        ));

        let created = catalog.create_member(new_member("Ada")).await.unwrap();
        assert_eq!(catalog.get_member(created.member_id).await.unwrap(), created);
    }

    #[tokio::test]
    async fn test_blank_title_is_not_stored() {
        let (catalog, _) = services();
        let mut book = new_book(1);
        book.title = "   ".to_string();
        assert!(matches!(
            catalog.create_book(book).await.unwrap_err(),
            AppError::Validation(_)
        ));
        assert!(catalog.list_books().await.unwrap().is_empty());

        let mut book = new_book(1);
        book.title = "  Crafting Interpreters ".to_string();
        assert_eq!(catalog.create_book(book).await.unwrap().title, "Crafting Interpreters");
    }

    #[tokio::test]
    async fn test_blank_member_fields() {
        let (catalog, _) = services();
        assert!(matches!(
            catalog.create_member(new_member("  ")).await.unwrap_err(),
            AppError::Validation(_)
        ));

        let mut member = new_member("Grace");
        member.email = Some(String::new());
        member.phone_number = Some(String::new());
        let created = catalog.create_member(member).await.unwrap();
        assert_eq!(created.email, None);
        assert_eq!(created.phone_number, None);
    }

    #[tokio::test]
    async fn test_list_members_by_type() {
        let (catalog, _) = services();
        let student = catalog.create_member(new_member("Ada")).await.unwrap();
        let mut staff = new_member("Grace");
        staff.member_type = "staff".to_string();
        let staff = catalog.create_member(staff).await.unwrap();

        let all = catalog.list_members(&MemberQuery::default()).await.unwrap();
        assert_eq!(all, vec![student, staff.clone()]);

        let only_staff = catalog
            .list_members(&MemberQuery {
                member_type: Some("staff".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(only_staff, vec![staff]);
    }
}

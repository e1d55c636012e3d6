//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{books, borrowings, health, members, stats};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Library Ledger API",
        version = "0.1.0",
        description = "Library catalog, membership and borrowing ledger REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Books
        books::list_books,
        books::search_books,
        books::get_book,
        books::create_book,
        books::update_total_copies,
        books::get_availability,
        // Members
        members::list_members,
        members::get_member,
        members::create_member,
        members::get_member_borrowings,
        // Borrowings
        borrowings::list_borrowings,
        borrowings::borrow,
        borrowings::return_book,
        // Stats
        stats::get_stats,
    ),
    components(
        schemas(
            // Books
            crate::models::Book,
            crate::models::CreateBook,
            crate::models::UpdateTotalCopies,
            crate::models::Availability,
            // Members
            crate::models::Member,
            crate::models::CreateMember,
            // Borrowings
            crate::models::Borrowing,
            borrowings::BorrowRequest,
            borrowings::BorrowResponse,
            borrowings::ReturnRequest,
            borrowings::ReturnResponse,
            // Stats
            crate::models::LibraryStats,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "books", description = "Catalog management"),
        (name = "members", description = "Member management"),
        (name = "borrowings", description = "Borrow and return"),
        (name = "stats", description = "Statistics")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

//! Borrow and return endpoints

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::{Borrowing, BorrowingQuery},
    AppState,
};

/// Borrow request
#[derive(Deserialize, ToSchema)]
pub struct BorrowRequest {
    /// Book ID
    pub book_id: i32,
    /// Member ID
    pub member_id: i32,
}

/// Borrow response
#[derive(Serialize, ToSchema)]
pub struct BorrowResponse {
    pub borrowing_id: i32,
    pub borrow_date: NaiveDate,
    pub due_date: NaiveDate,
    /// Copies left after this borrow
    pub available_copies: i32,
    /// Status message
    pub message: String,
}

/// Return request
#[derive(Deserialize, ToSchema)]
pub struct ReturnRequest {
    /// ID of the active borrowing to close
    pub borrowing_id: i32,
}

/// Return response
#[derive(Serialize, ToSchema)]
pub struct ReturnResponse {
    pub borrowing_id: i32,
    pub return_date: NaiveDate,
    /// Whole days past the due date, 0 when on time
    pub late_days: i64,
    /// Copies available after this return
    pub available_copies: i32,
    /// Status message
    pub message: String,
}

/// List the borrowing history
#[utoipa::path(
    get,
    path = "/borrowings",
    tag = "borrowings",
    params(BorrowingQuery),
    responses(
        (status = 200, description = "Borrowings ordered by id", body = Vec<Borrowing>)
    )
)]
pub async fn list_borrowings(
    State(state): State<AppState>,
    Query(query): Query<BorrowingQuery>,
) -> AppResult<Json<Vec<Borrowing>>> {
    let borrowings = state.services.ledger.list_borrowings(&query).await?;
    Ok(Json(borrowings))
}

/// Borrow a book
#[utoipa::path(
    post,
    path = "/borrow",
    tag = "borrowings",
    request_body = BorrowRequest,
    responses(
        (status = 201, description = "Book borrowed", body = BorrowResponse),
        (status = 404, description = "Book or member not found", body = crate::error::ErrorResponse),
        (status = 409, description = "No copies left, or member already holds this book", body = crate::error::ErrorResponse),
        (status = 503, description = "Book is locked by concurrent requests, retry", body = crate::error::ErrorResponse)
    )
)]
pub async fn borrow(
    State(state): State<AppState>,
    Json(request): Json<BorrowRequest>,
) -> AppResult<(StatusCode, Json<BorrowResponse>)> {
    let outcome = state
        .services
        .ledger
        .borrow(request.book_id, request.member_id)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(BorrowResponse {
            borrowing_id: outcome.borrowing.borrowing_id,
            borrow_date: outcome.borrowing.borrow_date,
            due_date: outcome.borrowing.due_date,
            available_copies: outcome.available_copies,
            message: "Book borrowed successfully".to_string(),
        }),
    ))
}

/// Return a borrowed book
#[utoipa::path(
    post,
    path = "/return",
    tag = "borrowings",
    request_body = ReturnRequest,
    responses(
        (status = 200, description = "Book returned", body = ReturnResponse),
        (status = 409, description = "No active borrowing with this ID", body = crate::error::ErrorResponse),
        (status = 503, description = "Book is locked by concurrent requests, retry", body = crate::error::ErrorResponse)
    )
)]
pub async fn return_book(
    State(state): State<AppState>,
    Json(request): Json<ReturnRequest>,
) -> AppResult<Json<ReturnResponse>> {
    let outcome = state
        .services
        .ledger
        .return_borrowing(request.borrowing_id)
        .await?;

    Ok(Json(ReturnResponse {
        borrowing_id: outcome.borrowing.borrowing_id,
        return_date: outcome.return_date,
        late_days: outcome.late_days,
        available_copies: outcome.available_copies,
        message: "Book returned successfully".to_string(),
    }))
}

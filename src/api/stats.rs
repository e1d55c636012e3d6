//! Statistics endpoints

use axum::{extract::State, Json};

use crate::{error::AppResult, models::LibraryStats, AppState};

/// Library-wide borrowing statistics
#[utoipa::path(
    get,
    path = "/stats",
    tag = "stats",
    responses(
        (status = 200, description = "Aggregated counts", body = LibraryStats)
    )
)]
pub async fn get_stats(State(state): State<AppState>) -> AppResult<Json<LibraryStats>> {
    let stats = state.services.stats.get_stats().await?;
    Ok(Json(stats))
}

use axum::{extract::State, response::Json};
use chrono::Utc;

use crate::errors::ServiceError;
use crate::services::dashboard::DashboardSummary;
use crate::{ApiResponse, AppState};

/// Business overview for management and accounting
#[utoipa::path(
    get,
    path = "/api/v1/dashboard",
    responses(
        (status = 200, description = "Dashboard figures", body = ApiResponse<DashboardSummary>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "dashboard"
)]
pub async fn summary(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<DashboardSummary>>, ServiceError> {
    let summary = state.services.dashboard.summary(Utc::now()).await?;
    Ok(Json(ApiResponse::success(summary)))
}

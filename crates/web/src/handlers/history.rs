use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use storage::{
    dto::common::PaginatedResponse,
    dto::rates_history::{
        ChangesResponse, CreateSnapshotRequest, HistoryDetailResponse, HistoryListParams,
        HistoryRecordResponse, RestoreRequest, RestoreResponse,
    },
    services::versioning,
};
use uuid::Uuid;
use validator::Validate;

use crate::app_state::AppState;
use crate::error::WebResult;

#[utoipa::path(
    post,
    path = "/api/rates/snapshots",
    request_body = CreateSnapshotRequest,
    responses(
        (status = 201, description = "Snapshot captured", body = HistoryRecordResponse),
        (status = 400, description = "Validation error")
    ),
    tag = "rates-history"
)]
pub async fn create_snapshot(
    State(state): State<AppState>,
    Json(req): Json<CreateSnapshotRequest>,
) -> WebResult<Response> {
    req.validate()?;

    let record = versioning::create_snapshot(state.db.pool(), &req).await?;

    Ok((StatusCode::CREATED, Json(HistoryRecordResponse::from(record))).into_response())
}

#[utoipa::path(
    put,
    path = "/api/rates/history/{uid}/activate",
    params(
        ("uid" = Uuid, Path, description = "History record uid")
    ),
    responses(
        (status = 200, description = "Version activated", body = HistoryRecordResponse),
        (status = 404, description = "History record not found")
    ),
    tag = "rates-history"
)]
pub async fn set_active_version(
    State(state): State<AppState>,
    Path(uid): Path<Uuid>,
) -> WebResult<Response> {
    let record = versioning::set_active_version(state.db.pool(), uid).await?;

    Ok(Json(HistoryRecordResponse::from(record)).into_response())
}

#[utoipa::path(
    post,
    path = "/api/rates/history/{uid}/restore",
    params(
        ("uid" = Uuid, Path, description = "History record uid")
    ),
    request_body = RestoreRequest,
    responses(
        (status = 200, description = "Snapshot restored", body = RestoreResponse),
        (status = 404, description = "History record not found"),
        (status = 422, description = "Snapshot payload is not restorable")
    ),
    tag = "rates-history"
)]
pub async fn restore_snapshot(
    State(state): State<AppState>,
    Path(uid): Path<Uuid>,
    req: Option<Json<RestoreRequest>>,
) -> WebResult<Response> {
    let req = req.map(|Json(body)| body).unwrap_or_default();
    req.validate()?;

    let result =
        versioning::restore_snapshot(state.db.pool(), uid, state.restore_policy, &req).await?;

    Ok(Json(result).into_response())
}

#[utoipa::path(
    get,
    path = "/api/rates/history",
    params(HistoryListParams),
    responses(
        (status = 200, description = "Paginated ledger listing"),
        (status = 400, description = "Invalid pagination parameters")
    ),
    tag = "rates-history"
)]
pub async fn list_history(
    State(state): State<AppState>,
    Query(params): Query<HistoryListParams>,
) -> WebResult<Response> {
    let (records, total) = versioning::list_history(state.db.pool(), &params).await?;

    let data: Vec<HistoryRecordResponse> =
        records.into_iter().map(HistoryRecordResponse::from).collect();

    Ok(Json(PaginatedResponse::new(data, params.page, params.limit, total)).into_response())
}

#[utoipa::path(
    get,
    path = "/api/rates/history/{uid}",
    params(
        ("uid" = Uuid, Path, description = "History record uid")
    ),
    responses(
        (status = 200, description = "History record with captured payloads", body = HistoryDetailResponse),
        (status = 404, description = "History record not found")
    ),
    tag = "rates-history"
)]
pub async fn get_history_record(
    State(state): State<AppState>,
    Path(uid): Path<Uuid>,
) -> WebResult<Response> {
    let record = versioning::get_history_record(state.db.pool(), uid).await?;

    Ok(Json(HistoryDetailResponse::from(record)).into_response())
}

#[utoipa::path(
    get,
    path = "/api/rates/changes",
    responses(
        (status = 200, description = "Live table compared against the active snapshot", body = ChangesResponse)
    ),
    tag = "rates-history"
)]
pub async fn get_changes(State(state): State<AppState>) -> WebResult<Response> {
    let changes = versioning::compute_changes(state.db.pool()).await?;

    Ok(Json(ChangesResponse::from(changes)).into_response())
}

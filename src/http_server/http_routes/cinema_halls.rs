use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::http_server::{
    error::ApiResult, http_routes::body::WriteBody, representation::CinemaHallRepr, state::AppState,
};
use crate::services::cinema_hall::{CinemaHallFields, CinemaHallService};
use crate::services::validation::WriteMode;

pub async fn list_cinema_halls(
    State(app_state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<CinemaHallRepr>>> {
    let halls = CinemaHallService::new(app_state.db.clone()).list().await?;
    Ok(Json(halls.iter().map(CinemaHallRepr::from).collect()))
}

pub async fn create_cinema_hall(
    State(app_state): State<Arc<AppState>>,
    WriteBody(fields): WriteBody<CinemaHallFields>,
) -> ApiResult<(StatusCode, Json<CinemaHallRepr>)> {
    let hall = CinemaHallService::new(app_state.db.clone())
        .create(fields)
        .await?;
    Ok((StatusCode::CREATED, Json(CinemaHallRepr::from(&hall))))
}

pub async fn get_cinema_hall(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<CinemaHallRepr>> {
    let hall = CinemaHallService::new(app_state.db.clone()).get(id).await?;
    Ok(Json(CinemaHallRepr::from(&hall)))
}

pub async fn replace_cinema_hall(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    WriteBody(fields): WriteBody<CinemaHallFields>,
) -> ApiResult<Json<CinemaHallRepr>> {
    update(app_state, id, fields, WriteMode::Replace).await
}

pub async fn patch_cinema_hall(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    WriteBody(fields): WriteBody<CinemaHallFields>,
) -> ApiResult<Json<CinemaHallRepr>> {
    update(app_state, id, fields, WriteMode::Partial).await
}

async fn update(
    app_state: Arc<AppState>,
    id: i64,
    fields: CinemaHallFields,
    mode: WriteMode,
) -> ApiResult<Json<CinemaHallRepr>> {
    let hall = CinemaHallService::new(app_state.db.clone())
        .update(id, fields, mode)
        .await?;
    Ok(Json(CinemaHallRepr::from(&hall)))
}

pub async fn delete_cinema_hall(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    CinemaHallService::new(app_state.db.clone())
        .delete(id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

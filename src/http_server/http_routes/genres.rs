use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::http_server::{
    error::ApiResult, http_routes::body::WriteBody, representation::GenreRepr, state::AppState,
};
use crate::services::genre::{GenreFields, GenreService};
use crate::services::validation::WriteMode;

pub async fn list_genres(
    State(app_state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<GenreRepr>>> {
    let genres = GenreService::new(app_state.db.clone()).list().await?;
    Ok(Json(genres.iter().map(GenreRepr::from).collect()))
}

pub async fn create_genre(
    State(app_state): State<Arc<AppState>>,
    WriteBody(fields): WriteBody<GenreFields>,
) -> ApiResult<(StatusCode, Json<GenreRepr>)> {
    let genre = GenreService::new(app_state.db.clone()).create(fields).await?;
    Ok((StatusCode::CREATED, Json(GenreRepr::from(&genre))))
}

pub async fn get_genre(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<GenreRepr>> {
    let genre = GenreService::new(app_state.db.clone()).get(id).await?;
    Ok(Json(GenreRepr::from(&genre)))
}

pub async fn replace_genre(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    WriteBody(fields): WriteBody<GenreFields>,
) -> ApiResult<Json<GenreRepr>> {
    update(app_state, id, fields, WriteMode::Replace).await
}

pub async fn patch_genre(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    WriteBody(fields): WriteBody<GenreFields>,
) -> ApiResult<Json<GenreRepr>> {
    update(app_state, id, fields, WriteMode::Partial).await
}

async fn update(
    app_state: Arc<AppState>,
    id: i64,
    fields: GenreFields,
    mode: WriteMode,
) -> ApiResult<Json<GenreRepr>> {
    let genre = GenreService::new(app_state.db.clone())
        .update(id, fields, mode)
        .await?;
    Ok(Json(GenreRepr::from(&genre)))
}

pub async fn delete_genre(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    GenreService::new(app_state.db.clone()).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

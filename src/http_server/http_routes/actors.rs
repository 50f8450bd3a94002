use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::http_server::{
    error::ApiResult, http_routes::body::WriteBody, representation::ActorRepr, state::AppState,
};
use crate::services::actor::{ActorFields, ActorService};
use crate::services::validation::WriteMode;

pub async fn list_actors(
    State(app_state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<ActorRepr>>> {
    let actors = ActorService::new(app_state.db.clone()).list().await?;
    Ok(Json(actors.iter().map(ActorRepr::from).collect()))
}

pub async fn create_actor(
    State(app_state): State<Arc<AppState>>,
    WriteBody(fields): WriteBody<ActorFields>,
) -> ApiResult<(StatusCode, Json<ActorRepr>)> {
    let actor = ActorService::new(app_state.db.clone()).create(fields).await?;
    Ok((StatusCode::CREATED, Json(ActorRepr::from(&actor))))
}

pub async fn get_actor(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<ActorRepr>> {
    let actor = ActorService::new(app_state.db.clone()).get(id).await?;
    Ok(Json(ActorRepr::from(&actor)))
}

pub async fn replace_actor(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    WriteBody(fields): WriteBody<ActorFields>,
) -> ApiResult<Json<ActorRepr>> {
    update(app_state, id, fields, WriteMode::Replace).await
}

pub async fn patch_actor(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    WriteBody(fields): WriteBody<ActorFields>,
) -> ApiResult<Json<ActorRepr>> {
    update(app_state, id, fields, WriteMode::Partial).await
}

async fn update(
    app_state: Arc<AppState>,
    id: i64,
    fields: ActorFields,
    mode: WriteMode,
) -> ApiResult<Json<ActorRepr>> {
    let actor = ActorService::new(app_state.db.clone())
        .update(id, fields, mode)
        .await?;
    Ok(Json(ActorRepr::from(&actor)))
}

pub async fn delete_actor(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    ActorService::new(app_state.db.clone()).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

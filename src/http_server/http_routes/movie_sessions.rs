use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;

use crate::http_server::{
    error::{ApiError, ApiResult},
    http_routes::body::WriteBody,
    http_routes::params::{parse_date, parse_id},
    representation::{
        Action, MovieSessionDetailRepr, MovieSessionListRepr, MovieSessionRepr,
        MovieSessionShape, MovieSessionWriteRepr,
    },
    state::AppState,
};
use crate::services::error::FieldErrors;
use crate::services::movie_session::{MovieSessionFields, MovieSessionFilter, MovieSessionService};
use crate::services::validation::WriteMode;

#[derive(Debug, Default, Deserialize)]
pub struct MovieSessionListParams {
    date: Option<String>,
    movie: Option<String>,
}

impl MovieSessionListParams {
    fn into_filter(self) -> ApiResult<MovieSessionFilter> {
        let mut errors = FieldErrors::new();
        let filter = MovieSessionFilter {
            date: parse_date(&mut errors, "date", self.date.as_deref()),
            movie: parse_id(&mut errors, "movie", self.movie.as_deref()),
        };
        if !errors.is_empty() {
            return Err(ApiError::Params(errors));
        }
        Ok(filter)
    }
}

/// Load session `id` in the shape `action` calls for.
async fn render(service: &MovieSessionService, id: i64, action: Action) -> ApiResult<MovieSessionRepr> {
    Ok(match MovieSessionShape::for_action(action) {
        MovieSessionShape::Detail => {
            MovieSessionRepr::Detail(MovieSessionDetailRepr::from(&service.get_detail(id).await?))
        }
        MovieSessionShape::Write => {
            MovieSessionRepr::Write(MovieSessionWriteRepr::from(&service.get(id).await?))
        }
    })
}

pub async fn list_movie_sessions(
    State(app_state): State<Arc<AppState>>,
    Query(params): Query<MovieSessionListParams>,
) -> ApiResult<Json<Vec<MovieSessionListRepr>>> {
    let filter = params.into_filter()?;
    let sessions = MovieSessionService::new(app_state.db.clone())
        .list(&filter)
        .await?;
    Ok(Json(sessions.iter().map(MovieSessionListRepr::from).collect()))
}

pub async fn create_movie_session(
    State(app_state): State<Arc<AppState>>,
    WriteBody(fields): WriteBody<MovieSessionFields>,
) -> ApiResult<(StatusCode, Json<MovieSessionRepr>)> {
    let service = MovieSessionService::new(app_state.db.clone());
    let session = service.create(fields).await?;
    let repr = render(&service, session.id, Action::Create).await?;
    Ok((StatusCode::CREATED, Json(repr)))
}

pub async fn get_movie_session(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<MovieSessionRepr>> {
    let service = MovieSessionService::new(app_state.db.clone());
    Ok(Json(render(&service, id, Action::Retrieve).await?))
}

pub async fn replace_movie_session(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    WriteBody(fields): WriteBody<MovieSessionFields>,
) -> ApiResult<Json<MovieSessionRepr>> {
    update(app_state, id, fields, Action::Update).await
}

pub async fn patch_movie_session(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    WriteBody(fields): WriteBody<MovieSessionFields>,
) -> ApiResult<Json<MovieSessionRepr>> {
    update(app_state, id, fields, Action::PartialUpdate).await
}

async fn update(
    app_state: Arc<AppState>,
    id: i64,
    fields: MovieSessionFields,
    action: Action,
) -> ApiResult<Json<MovieSessionRepr>> {
    let mode = match action {
        Action::PartialUpdate => WriteMode::Partial,
        _ => WriteMode::Replace,
    };

    let service = MovieSessionService::new(app_state.db.clone());
    service.update(id, fields, mode).await?;
    Ok(Json(render(&service, id, action).await?))
}

pub async fn delete_movie_session(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    MovieSessionService::new(app_state.db.clone())
        .delete(id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

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
    http_routes::params::parse_id_list,
    representation::{Action, MovieRepr, MovieShape},
    state::AppState,
};
use crate::services::error::FieldErrors;
use crate::services::movie::{MovieFields, MovieFilter, MovieService};
use crate::services::validation::WriteMode;

#[derive(Debug, Default, Deserialize)]
pub struct MovieListParams {
    genres: Option<String>,
    actors: Option<String>,
    title: Option<String>,
}

impl MovieListParams {
    fn into_filter(self) -> ApiResult<MovieFilter> {
        let mut errors = FieldErrors::new();
        let filter = MovieFilter {
            genres: parse_id_list(&mut errors, "genres", self.genres.as_deref()),
            actors: parse_id_list(&mut errors, "actors", self.actors.as_deref()),
            title: self.title.filter(|title| !title.is_empty()),
        };
        if !errors.is_empty() {
            return Err(ApiError::Params(errors));
        }
        Ok(filter)
    }
}

pub async fn list_movies(
    State(app_state): State<Arc<AppState>>,
    Query(params): Query<MovieListParams>,
) -> ApiResult<Json<Vec<MovieRepr>>> {
    let filter = params.into_filter()?;
    let shape = MovieShape::for_action(Action::List);

    let movies = MovieService::new(app_state.db.clone()).list(&filter).await?;
    Ok(Json(movies.iter().map(|movie| shape.render(movie)).collect()))
}

pub async fn create_movie(
    State(app_state): State<Arc<AppState>>,
    WriteBody(fields): WriteBody<MovieFields>,
) -> ApiResult<(StatusCode, Json<MovieRepr>)> {
    let movie = MovieService::new(app_state.db.clone()).create(fields).await?;
    let shape = MovieShape::for_action(Action::Create);
    Ok((StatusCode::CREATED, Json(shape.render(&movie))))
}

pub async fn get_movie(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<MovieRepr>> {
    let movie = MovieService::new(app_state.db.clone()).get(id).await?;
    Ok(Json(MovieShape::for_action(Action::Retrieve).render(&movie)))
}

pub async fn replace_movie(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    WriteBody(fields): WriteBody<MovieFields>,
) -> ApiResult<Json<MovieRepr>> {
    update(app_state, id, fields, Action::Update).await
}

pub async fn patch_movie(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    WriteBody(fields): WriteBody<MovieFields>,
) -> ApiResult<Json<MovieRepr>> {
    update(app_state, id, fields, Action::PartialUpdate).await
}

async fn update(
    app_state: Arc<AppState>,
    id: i64,
    fields: MovieFields,
    action: Action,
) -> ApiResult<Json<MovieRepr>> {
    let mode = match action {
        Action::PartialUpdate => WriteMode::Partial,
        _ => WriteMode::Replace,
    };

    let movie = MovieService::new(app_state.db.clone())
        .update(id, fields, mode)
        .await?;
    Ok(Json(MovieShape::for_action(action).render(&movie)))
}

pub async fn delete_movie(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    MovieService::new(app_state.db.clone()).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::test_utils::{insert_actor, insert_genre, insert_movie, send, test_app, test_db};

    #[tokio::test]
    async fn test_list_and_detail_shapes() {
        let db = test_db().await;
        let crime = insert_genre(&db, "Crime").await;
        let pacino = insert_actor(&db, "Al", "Pacino").await;
        let movie = insert_movie(&db, "Heat", &[crime.id], &[pacino.id]).await;
        let app = test_app(db);

        let (status, list) = send(&app, "GET", "/api/cinema/movies/", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            list,
            json!([{
                "id": movie.id,
                "title": "Heat",
                "description": "About Heat",
                "duration": 120,
                "genres": ["Crime"],
                "actors": ["Al Pacino"],
            }])
        );

        let (status, detail) = send(
            &app,
            "GET",
            &format!("/api/cinema/movies/{}/", movie.id),
            None,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(detail["genres"], json!([{"id": crime.id, "name": "Crime"}]));
        assert_eq!(detail["actors"][0]["full_name"], "Al Pacino");
    }

    #[tokio::test]
    async fn test_create_responds_with_ids() {
        let db = test_db().await;
        let crime = insert_genre(&db, "Crime").await;
        let pacino = insert_actor(&db, "Al", "Pacino").await;
        let app = test_app(db);

        let (status, body) = send(
            &app,
            "POST",
            "/api/cinema/movies/",
            None,
            Some(json!({
                "title": "Heat",
                "description": "Crime epic",
                "duration": 170,
                "genres": [crime.id],
                "actors": [pacino.id],
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["genres"], json!([crime.id]));
        assert_eq!(body["actors"], json!([pacino.id]));
    }

    #[tokio::test]
    async fn test_genre_filter_is_distinct() {
        let db = test_db().await;
        let drama = insert_genre(&db, "Drama").await;
        let crime = insert_genre(&db, "Crime").await;
        insert_movie(&db, "Heat", &[drama.id, crime.id], &[]).await;
        insert_movie(&db, "Airplane!", &[], &[]).await;
        let app = test_app(db);

        let uri = format!("/api/cinema/movies/?genres={},{}", drama.id, crime.id);
        let (status, body) = send(&app, "GET", &uri, None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().map(Vec::len), Some(1));
        assert_eq!(body[0]["title"], "Heat");
    }

    #[tokio::test]
    async fn test_title_filter() {
        let db = test_db().await;
        insert_movie(&db, "The Matrix", &[], &[]).await;
        insert_movie(&db, "Heat", &[], &[]).await;
        let app = test_app(db);

        let (_, body) = send(&app, "GET", "/api/cinema/movies/?title=matrix", None, None).await;
        assert_eq!(body.as_array().map(Vec::len), Some(1));
        assert_eq!(body[0]["title"], "The Matrix");
    }

    #[tokio::test]
    async fn test_non_integer_filter_is_rejected() {
        let db = test_db().await;
        let app = test_app(db);

        let (status, body) = send(&app, "GET", "/api/cinema/movies/?genres=1,drama", None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"genres": ["Enter a whole number."]}));
    }
}

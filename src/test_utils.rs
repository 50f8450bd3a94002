use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use chrono::NaiveDateTime;
use http_body_util::BodyExt;
use sea_orm::{ActiveModelBehavior, ActiveModelTrait, Set};
use serde_json::Value;
use tower::ServiceExt;

use crate::database::Database;
use crate::entities;
use crate::http_server::{app::router, state::AppState};

/// Fresh in-memory database with every migration applied.
pub async fn test_db() -> Arc<Database> {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    Arc::new(db)
}

/// The API router over `db`, one order per page.
pub fn test_app(db: Arc<Database>) -> Router {
    router(Arc::new(AppState {
        db,
        orders_page_size: 1,
    }))
}

/// Send one request through `app`. The body is decoded as JSON when possible,
/// as a JSON string otherwise, and `Null` when empty.
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Token {token}"));
    }
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => request.body(Body::empty()),
    }
    .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, value)
}

pub async fn insert_genre(db: &Database, name: &str) -> entities::genre::Model {
    entities::genre::ActiveModel {
        name: Set(name.into()),
        ..Default::default()
    }
    .insert(&db.conn)
    .await
    .unwrap()
}

pub async fn insert_actor(db: &Database, first_name: &str, last_name: &str) -> entities::actor::Model {
    entities::actor::ActiveModel {
        first_name: Set(first_name.into()),
        last_name: Set(last_name.into()),
        ..Default::default()
    }
    .insert(&db.conn)
    .await
    .unwrap()
}

pub async fn insert_hall(
    db: &Database,
    name: &str,
    rows: i32,
    seats_in_row: i32,
) -> entities::cinema_hall::Model {
    entities::cinema_hall::ActiveModel {
        name: Set(name.into()),
        rows: Set(rows),
        seats_in_row: Set(seats_in_row),
        ..Default::default()
    }
    .insert(&db.conn)
    .await
    .unwrap()
}

/// Inserts a movie and links it to the given genres and actors.
pub async fn insert_movie(
    db: &Database,
    title: &str,
    genre_ids: &[i64],
    actor_ids: &[i64],
) -> entities::movie::Model {
    let movie = entities::movie::ActiveModel {
        title: Set(title.into()),
        description: Set(format!("About {title}")),
        duration: Set(120),
        ..Default::default()
    }
    .insert(&db.conn)
    .await
    .unwrap();

    for genre_id in genre_ids {
        entities::movie_genre::ActiveModel {
            movie_id: Set(movie.id),
            genre_id: Set(*genre_id),
            ..Default::default()
        }
        .insert(&db.conn)
        .await
        .unwrap();
    }
    for actor_id in actor_ids {
        entities::movie_actor::ActiveModel {
            movie_id: Set(movie.id),
            actor_id: Set(*actor_id),
            ..Default::default()
        }
        .insert(&db.conn)
        .await
        .unwrap();
    }

    movie
}

pub async fn insert_session(
    db: &Database,
    movie_id: i64,
    cinema_hall_id: i64,
    show_time: &str,
) -> entities::movie_session::Model {
    entities::movie_session::ActiveModel {
        show_time: Set(NaiveDateTime::parse_from_str(show_time, "%Y-%m-%d %H:%M").unwrap()),
        movie_id: Set(movie_id),
        cinema_hall_id: Set(cinema_hall_id),
        ..Default::default()
    }
    .insert(&db.conn)
    .await
    .unwrap()
}

pub async fn insert_user(db: &Database, username: &str) -> entities::user::Model {
    entities::user::ActiveModel {
        username: Set(username.into()),
        token: Set(format!("token-{username}")),
        ..entities::user::ActiveModel::new()
    }
    .insert(&db.conn)
    .await
    .unwrap()
}

/// Inserts an order for `user_id` holding one ticket per `(row, seat)`.
pub async fn insert_order(
    db: &Database,
    user_id: i64,
    movie_session_id: i64,
    seats: &[(i32, i32)],
) -> entities::order::Model {
    let order = entities::order::ActiveModel {
        user_id: Set(user_id),
        ..entities::order::ActiveModel::new()
    }
    .insert(&db.conn)
    .await
    .unwrap();

    for (row, seat) in seats {
        entities::ticket::ActiveModel {
            row: Set(*row),
            seat: Set(*seat),
            movie_session_id: Set(movie_session_id),
            order_id: Set(order.id),
            ..Default::default()
        }
        .insert(&db.conn)
        .await
        .unwrap();
    }

    order
}

use std::sync::Arc;

use axum::{Router, routing::get};
use color_eyre::eyre::{WrapErr, eyre};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
#[cfg(not(debug_assertions))]
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin};
use tower_http::trace::TraceLayer;

use crate::{
    database::Database,
    http_server::{
        error::method_not_allowed,
        http_routes::{actors, cinema_halls, genres, movie_sessions, movies, orders},
        state::AppState,
    },
};

pub struct HttpServerConfig {
    pub port: u16,
    pub database: Arc<Database>,
    pub orders_page_size: u64,
}

async fn root() -> &'static str {
    "Cinema booking API"
}

/// All API routes with their shared state. Layers that only matter for a real
/// listener are added in [`start`].
pub fn router(app_state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route(
            "/genres/",
            get(genres::list_genres).post(genres::create_genre),
        )
        .route(
            "/genres/{id}/",
            get(genres::get_genre)
                .put(genres::replace_genre)
                .patch(genres::patch_genre)
                .delete(genres::delete_genre),
        )
        .route(
            "/actors/",
            get(actors::list_actors).post(actors::create_actor),
        )
        .route(
            "/actors/{id}/",
            get(actors::get_actor)
                .put(actors::replace_actor)
                .patch(actors::patch_actor)
                .delete(actors::delete_actor),
        )
        .route(
            "/cinema_halls/",
            get(cinema_halls::list_cinema_halls).post(cinema_halls::create_cinema_hall),
        )
        .route(
            "/cinema_halls/{id}/",
            get(cinema_halls::get_cinema_hall)
                .put(cinema_halls::replace_cinema_hall)
                .patch(cinema_halls::patch_cinema_hall)
                .delete(cinema_halls::delete_cinema_hall),
        )
        .route(
            "/movies/",
            get(movies::list_movies).post(movies::create_movie),
        )
        .route(
            "/movies/{id}/",
            get(movies::get_movie)
                .put(movies::replace_movie)
                .patch(movies::patch_movie)
                .delete(movies::delete_movie),
        )
        .route(
            "/movie_sessions/",
            get(movie_sessions::list_movie_sessions).post(movie_sessions::create_movie_session),
        )
        .route(
            "/movie_sessions/{id}/",
            get(movie_sessions::get_movie_session)
                .put(movie_sessions::replace_movie_session)
                .patch(movie_sessions::patch_movie_session)
                .delete(movie_sessions::delete_movie_session),
        )
        .route(
            "/orders/",
            get(orders::list_orders).post(orders::create_order),
        )
        .route(
            "/orders/{id}/",
            get(orders::get_order)
                .delete(orders::delete_order)
                .fallback(method_not_allowed),
        );

    Router::new()
        .route("/", get(root))
        .nest("/api/cinema", api)
        .with_state(app_state)
}

pub async fn start(config: HttpServerConfig) -> color_eyre::Result<()> {
    let HttpServerConfig {
        port,
        database,
        orders_page_size,
    } = config;

    let app_state = Arc::new(AppState {
        db: database,
        orders_page_size,
    });

    #[cfg(debug_assertions)]
    let cors_layer = CorsLayer::permissive();

    #[cfg(not(debug_assertions))]
    let cors_layer = CorsLayer::new()
        .allow_origin(AllowOrigin::any())
        .allow_methods(AllowMethods::any())
        .allow_headers(AllowHeaders::any());

    let app = router(app_state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(cors_layer),
    );

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .wrap_err_with(|| eyre!("Failed to bind to port {}", port))?;
    log::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .await
        .wrap_err("Failed to start HTTP server")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::test_utils::{send, test_app, test_db};

    #[tokio::test]
    async fn test_root_responds() {
        let db = test_db().await;
        let app = test_app(db);

        let (status, body) = send(&app, "GET", "/", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!("Cinema booking API"));
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let db = test_db().await;
        let app = test_app(db);

        let (status, _) = send(&app, "GET", "/api/cinema/tickets/", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_catalog_collections_start_empty() {
        let db = test_db().await;
        let app = test_app(db);

        for path in [
            "/api/cinema/genres/",
            "/api/cinema/actors/",
            "/api/cinema/cinema_halls/",
            "/api/cinema/movies/",
            "/api/cinema/movie_sessions/",
        ] {
            let (status, body) = send(&app, "GET", path, None, None).await;
            assert_eq!(status, StatusCode::OK, "{path}");
            assert_eq!(body, json!([]), "{path}");
        }
    }
}

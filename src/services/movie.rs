use std::collections::HashMap;
use std::sync::Arc;

use sea_orm::sea_query::Query;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Select, Set, TransactionTrait,
};
use serde::Deserialize;
use tracing::instrument;

use crate::database::Database;
use crate::entities;
use crate::services::error::{ServiceError, ServiceResult};
use crate::services::query_builder::{apply_text_search, first_missing_id, load_by_ids};
use crate::services::validation::{Input, Validator, WriteMode, does_not_exist};

/// List filters. Each one narrows the previous, in field order.
#[derive(Debug, Clone, Default)]
pub struct MovieFilter {
    /// Movies with at least one of these genres
    pub genres: Option<Vec<i64>>,
    /// Movies with at least one of these actors
    pub actors: Option<Vec<i64>>,
    pub title: Option<String>,
}

impl MovieFilter {
    /// Junction matches go through `IN (subquery)`, so a movie matching several ids
    /// still appears once.
    pub fn apply(&self, mut query: Select<entities::movie::Entity>) -> Select<entities::movie::Entity> {
        if let Some(genre_ids) = self.genres.as_ref().filter(|ids| !ids.is_empty()) {
            query = query.filter(
                entities::movie::Column::Id.in_subquery(
                    Query::select()
                        .column(entities::movie_genre::Column::MovieId)
                        .from(entities::movie_genre::Entity)
                        .and_where(entities::movie_genre::Column::GenreId.is_in(genre_ids.clone()))
                        .to_owned(),
                ),
            );
        }

        if let Some(actor_ids) = self.actors.as_ref().filter(|ids| !ids.is_empty()) {
            query = query.filter(
                entities::movie::Column::Id.in_subquery(
                    Query::select()
                        .column(entities::movie_actor::Column::MovieId)
                        .from(entities::movie_actor::Entity)
                        .and_where(entities::movie_actor::Column::ActorId.is_in(actor_ids.clone()))
                        .to_owned(),
                ),
            );
        }

        if let Some(title) = &self.title {
            query = apply_text_search(query, entities::movie::Column::Title, title);
        }

        query
    }
}

#[derive(Debug, Clone)]
pub struct MovieWithRelations {
    pub movie: entities::movie::Model,
    pub genres: Vec<entities::genre::Model>,
    pub actors: Vec<entities::actor::Model>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MovieFields {
    pub title: Input,
    pub description: Input,
    pub duration: Input,
    /// Genre ids
    pub genres: Input,
    /// Actor ids
    pub actors: Input,
}

struct MovieChanges {
    title: Option<String>,
    description: Option<String>,
    duration: Option<i32>,
    genres: Option<Vec<i64>>,
    actors: Option<Vec<i64>>,
}

impl MovieChanges {
    fn touches_row(&self) -> bool {
        self.title.is_some() || self.description.is_some() || self.duration.is_some()
    }

    fn apply(&mut self, active: &mut entities::movie::ActiveModel) {
        if let Some(title) = self.title.take() {
            active.title = Set(title);
        }
        if let Some(description) = self.description.take() {
            active.description = Set(description);
        }
        if let Some(duration) = self.duration.take() {
            active.duration = Set(duration);
        }
    }
}

pub struct MovieService {
    db: Arc<Database>,
}

impl MovieService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn list(&self, filter: &MovieFilter) -> ServiceResult<Vec<MovieWithRelations>> {
        let query = filter.apply(entities::movie::Entity::find());
        let movies = query
            .order_by_asc(entities::movie::Column::Id)
            .all(&self.db.conn)
            .await?;

        Ok(load_relations(&self.db.conn, movies).await?)
    }

    pub async fn get(&self, id: i64) -> ServiceResult<MovieWithRelations> {
        let movie = entities::movie::Entity::find_by_id(id)
            .one(&self.db.conn)
            .await?
            .ok_or(ServiceError::not_found("movie", id))?;

        let mut loaded = load_relations(&self.db.conn, vec![movie]).await?;
        loaded.pop().ok_or(ServiceError::not_found("movie", id))
    }

    #[instrument(skip(self))]
    pub async fn create(&self, fields: MovieFields) -> ServiceResult<MovieWithRelations> {
        let changes = self.validate(fields, WriteMode::Create).await?;

        let movie = self
            .db
            .conn
            .transaction::<_, entities::movie::Model, ServiceError>(|txn| {
                Box::pin(async move {
                    let mut changes = changes;
                    let mut active: entities::movie::ActiveModel = ActiveModelTrait::default();
                    changes.apply(&mut active);
                    let movie = active.insert(txn).await?;

                    replace_links(txn, movie.id, changes.genres, changes.actors).await?;
                    Ok(movie)
                })
            })
            .await?;

        tracing::info!(movie_id = movie.id, title = %movie.title, "Movie created");
        self.get(movie.id).await
    }

    #[instrument(skip(self))]
    pub async fn update(
        &self,
        id: i64,
        fields: MovieFields,
        mode: WriteMode,
    ) -> ServiceResult<MovieWithRelations> {
        let movie = entities::movie::Entity::find_by_id(id)
            .one(&self.db.conn)
            .await?
            .ok_or(ServiceError::not_found("movie", id))?;
        let changes = self.validate(fields, mode).await?;

        self.db
            .conn
            .transaction::<_, (), ServiceError>(|txn| {
                Box::pin(async move {
                    let mut changes = changes;
                    if changes.touches_row() {
                        let mut active: entities::movie::ActiveModel = movie.into();
                        changes.apply(&mut active);
                        active.update(txn).await?;
                    }

                    replace_links(txn, id, changes.genres, changes.actors).await?;
                    Ok(())
                })
            })
            .await?;

        self.get(id).await
    }

    /// Sessions of the movie (and their tickets) go with it.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: i64) -> ServiceResult<()> {
        let result = entities::movie::Entity::delete_by_id(id)
            .exec(&self.db.conn)
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::not_found("movie", id));
        }
        tracing::info!(movie_id = id, "Movie deleted");
        Ok(())
    }

    async fn validate(&self, fields: MovieFields, mode: WriteMode) -> ServiceResult<MovieChanges> {
        let mut validator = Validator::new(mode);
        let changes = MovieChanges {
            title: validator.char_field("title", fields.title),
            description: validator.text_field("description", fields.description),
            duration: validator.integer("duration", fields.duration),
            genres: validator.pk_list("genres", fields.genres),
            actors: validator.pk_list("actors", fields.actors),
        };

        if let Some(genre_ids) = &changes.genres
            && let Some(missing) = first_missing_id::<entities::genre::Entity, _>(
                &self.db.conn,
                entities::genre::Column::Id,
                genre_ids,
            )
            .await?
        {
            validator.add("genres", does_not_exist(missing));
        }

        if let Some(actor_ids) = &changes.actors
            && let Some(missing) = first_missing_id::<entities::actor::Entity, _>(
                &self.db.conn,
                entities::actor::Column::Id,
                actor_ids,
            )
            .await?
        {
            validator.add("actors", does_not_exist(missing));
        }

        validator.finish()?;
        Ok(changes)
    }
}

/// Rewrite the genre and actor links of a movie. `None` leaves that set untouched.
async fn replace_links<C: ConnectionTrait>(
    conn: &C,
    movie_id: i64,
    genre_ids: Option<Vec<i64>>,
    actor_ids: Option<Vec<i64>>,
) -> Result<(), DbErr> {
    if let Some(mut genre_ids) = genre_ids {
        genre_ids.sort_unstable();
        genre_ids.dedup();

        entities::movie_genre::Entity::delete_many()
            .filter(entities::movie_genre::Column::MovieId.eq(movie_id))
            .exec(conn)
            .await?;
        for genre_id in genre_ids {
            entities::movie_genre::ActiveModel {
                movie_id: Set(movie_id),
                genre_id: Set(genre_id),
                ..Default::default()
            }
            .insert(conn)
            .await?;
        }
    }

    if let Some(mut actor_ids) = actor_ids {
        actor_ids.sort_unstable();
        actor_ids.dedup();

        entities::movie_actor::Entity::delete_many()
            .filter(entities::movie_actor::Column::MovieId.eq(movie_id))
            .exec(conn)
            .await?;
        for actor_id in actor_ids {
            entities::movie_actor::ActiveModel {
                movie_id: Set(movie_id),
                actor_id: Set(actor_id),
                ..Default::default()
            }
            .insert(conn)
            .await?;
        }
    }

    Ok(())
}

/// Attach genres and actors to each movie with two queries per relation.
/// Related rows are ordered by id.
pub async fn load_relations<C: ConnectionTrait>(
    conn: &C,
    movies: Vec<entities::movie::Model>,
) -> Result<Vec<MovieWithRelations>, DbErr> {
    let movie_ids: Vec<i64> = movies.iter().map(|movie| movie.id).collect();
    if movie_ids.is_empty() {
        return Ok(Vec::new());
    }

    let genre_links = entities::movie_genre::Entity::find()
        .filter(entities::movie_genre::Column::MovieId.is_in(movie_ids.clone()))
        .order_by_asc(entities::movie_genre::Column::GenreId)
        .all(conn)
        .await?;
    let genres = load_by_ids::<entities::genre::Entity, _>(
        conn,
        entities::genre::Column::Id,
        genre_links.iter().map(|link| link.genre_id),
        |genre| genre.id,
    )
    .await?;

    let actor_links = entities::movie_actor::Entity::find()
        .filter(entities::movie_actor::Column::MovieId.is_in(movie_ids))
        .order_by_asc(entities::movie_actor::Column::ActorId)
        .all(conn)
        .await?;
    let actors = load_by_ids::<entities::actor::Entity, _>(
        conn,
        entities::actor::Column::Id,
        actor_links.iter().map(|link| link.actor_id),
        |actor| actor.id,
    )
    .await?;

    let mut genres_by_movie: HashMap<i64, Vec<entities::genre::Model>> = HashMap::new();
    for link in &genre_links {
        if let Some(genre) = genres.get(&link.genre_id) {
            genres_by_movie
                .entry(link.movie_id)
                .or_default()
                .push(genre.clone());
        }
    }

    let mut actors_by_movie: HashMap<i64, Vec<entities::actor::Model>> = HashMap::new();
    for link in &actor_links {
        if let Some(actor) = actors.get(&link.actor_id) {
            actors_by_movie
                .entry(link.movie_id)
                .or_default()
                .push(actor.clone());
        }
    }

    Ok(movies
        .into_iter()
        .map(|movie| MovieWithRelations {
            genres: genres_by_movie.remove(&movie.id).unwrap_or_default(),
            actors: actors_by_movie.remove(&movie.id).unwrap_or_default(),
            movie,
        })
        .collect())
}

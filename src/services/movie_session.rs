use std::collections::HashMap;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Select, Set,
};
use serde::Deserialize;
use tracing::instrument;

use crate::database::Database;
use crate::entities;
use crate::services::error::{ServiceError, ServiceResult};
use crate::services::movie::{MovieWithRelations, load_relations};
use crate::services::query_builder::load_by_ids;
use crate::services::validation::{Input, Validator, WriteMode, does_not_exist};

#[derive(Debug, Clone, Default)]
pub struct MovieSessionFilter {
    /// Sessions whose show time falls on this calendar day
    pub date: Option<NaiveDate>,
    pub movie: Option<i64>,
}

impl MovieSessionFilter {
    pub fn apply(
        &self,
        mut query: Select<entities::movie_session::Entity>,
    ) -> Select<entities::movie_session::Entity> {
        if let Some(date) = self.date {
            query = query.filter(
                entities::movie_session::Column::ShowTime.gte(date.and_time(NaiveTime::MIN)),
            );
            if let Some(next_day) = date.succ_opt() {
                query = query.filter(
                    entities::movie_session::Column::ShowTime
                        .lt(next_day.and_time(NaiveTime::MIN)),
                );
            }
        }

        if let Some(movie_id) = self.movie {
            query = query.filter(entities::movie_session::Column::MovieId.eq(movie_id));
        }

        query
    }
}

/// A session with what its list and ticket representations show.
#[derive(Debug, Clone)]
pub struct MovieSessionSummary {
    pub session: entities::movie_session::Model,
    pub movie_title: String,
    pub cinema_hall: entities::cinema_hall::Model,
    pub tickets_sold: i64,
}

impl MovieSessionSummary {
    pub fn tickets_available(&self) -> i64 {
        self.cinema_hall.capacity() - self.tickets_sold
    }
}

#[derive(Debug, Clone)]
pub struct MovieSessionDetail {
    pub session: entities::movie_session::Model,
    pub movie: MovieWithRelations,
    pub cinema_hall: entities::cinema_hall::Model,
    /// `(row, seat)` of every sold ticket
    pub taken_places: Vec<(i32, i32)>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MovieSessionFields {
    pub show_time: Input,
    /// Movie id
    pub movie: Input,
    /// Cinema hall id
    pub cinema_hall: Input,
}

pub struct MovieSessionService {
    db: Arc<Database>,
}

impl MovieSessionService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn list(&self, filter: &MovieSessionFilter) -> ServiceResult<Vec<MovieSessionSummary>> {
        let sessions = filter
            .apply(entities::movie_session::Entity::find())
            .order_by_asc(entities::movie_session::Column::Id)
            .all(&self.db.conn)
            .await?;

        Ok(summarize(&self.db.conn, sessions).await?)
    }

    pub async fn get(&self, id: i64) -> ServiceResult<entities::movie_session::Model> {
        entities::movie_session::Entity::find_by_id(id)
            .one(&self.db.conn)
            .await?
            .ok_or(ServiceError::not_found("movie session", id))
    }

    pub async fn get_detail(&self, id: i64) -> ServiceResult<MovieSessionDetail> {
        let session = self.get(id).await?;

        let movie = entities::movie::Entity::find_by_id(session.movie_id)
            .one(&self.db.conn)
            .await?
            .ok_or(ServiceError::not_found("movie", session.movie_id))?;
        let movie = load_relations(&self.db.conn, vec![movie])
            .await?
            .pop()
            .ok_or(ServiceError::not_found("movie", session.movie_id))?;

        let cinema_hall = entities::cinema_hall::Entity::find_by_id(session.cinema_hall_id)
            .one(&self.db.conn)
            .await?
            .ok_or(ServiceError::not_found("cinema hall", session.cinema_hall_id))?;

        let taken_places = entities::ticket::Entity::find()
            .select_only()
            .column(entities::ticket::Column::Row)
            .column(entities::ticket::Column::Seat)
            .filter(entities::ticket::Column::MovieSessionId.eq(id))
            .order_by_asc(entities::ticket::Column::Id)
            .into_tuple::<(i32, i32)>()
            .all(&self.db.conn)
            .await?;

        Ok(MovieSessionDetail {
            session,
            movie,
            cinema_hall,
            taken_places,
        })
    }

    #[instrument(skip(self))]
    pub async fn create(
        &self,
        fields: MovieSessionFields,
    ) -> ServiceResult<entities::movie_session::Model> {
        let mut active: entities::movie_session::ActiveModel = ActiveModelTrait::default();
        self.validate(fields, WriteMode::Create, &mut active).await?;
        let session = active.insert(&self.db.conn).await?;

        tracing::info!(
            movie_session_id = session.id,
            movie_id = session.movie_id,
            cinema_hall_id = session.cinema_hall_id,
            "Movie session created"
        );
        Ok(session)
    }

    #[instrument(skip(self))]
    pub async fn update(
        &self,
        id: i64,
        fields: MovieSessionFields,
        mode: WriteMode,
    ) -> ServiceResult<entities::movie_session::Model> {
        let session = self.get(id).await?;
        let mut active: entities::movie_session::ActiveModel = session.clone().into();
        self.validate(fields, mode, &mut active).await?;

        if !active.is_changed() {
            return Ok(session);
        }
        Ok(active.update(&self.db.conn).await?)
    }

    /// Tickets sold for the session are deleted with it.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: i64) -> ServiceResult<()> {
        let result = entities::movie_session::Entity::delete_by_id(id)
            .exec(&self.db.conn)
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::not_found("movie session", id));
        }
        tracing::info!(movie_session_id = id, "Movie session deleted");
        Ok(())
    }

    /// Check `fields` and copy the supplied ones onto `active`.
    async fn validate(
        &self,
        fields: MovieSessionFields,
        mode: WriteMode,
        active: &mut entities::movie_session::ActiveModel,
    ) -> ServiceResult<()> {
        let mut validator = Validator::new(mode);
        let show_time = validator.datetime("show_time", fields.show_time);
        let movie_id = validator.pk("movie", fields.movie);
        let cinema_hall_id = validator.pk("cinema_hall", fields.cinema_hall);

        if let Some(movie_id) = movie_id
            && entities::movie::Entity::find_by_id(movie_id)
                .one(&self.db.conn)
                .await?
                .is_none()
        {
            validator.add("movie", does_not_exist(movie_id));
        }

        if let Some(cinema_hall_id) = cinema_hall_id
            && entities::cinema_hall::Entity::find_by_id(cinema_hall_id)
                .one(&self.db.conn)
                .await?
                .is_none()
        {
            validator.add("cinema_hall", does_not_exist(cinema_hall_id));
        }

        validator.finish()?;

        if let Some(show_time) = show_time {
            active.show_time = Set(show_time);
        }
        if let Some(movie_id) = movie_id {
            active.movie_id = Set(movie_id);
        }
        if let Some(cinema_hall_id) = cinema_hall_id {
            active.cinema_hall_id = Set(cinema_hall_id);
        }
        Ok(())
    }
}

/// Attach movie title, hall and sold ticket count to each session.
///
/// Ticket counts come from a single grouped query, so the cost does not grow with
/// the number of sessions.
pub async fn summarize<C: ConnectionTrait>(
    conn: &C,
    sessions: Vec<entities::movie_session::Model>,
) -> Result<Vec<MovieSessionSummary>, DbErr> {
    if sessions.is_empty() {
        return Ok(Vec::new());
    }

    let movies = load_by_ids::<entities::movie::Entity, _>(
        conn,
        entities::movie::Column::Id,
        sessions.iter().map(|s| s.movie_id),
        |movie| movie.id,
    )
    .await?;
    let halls = load_by_ids::<entities::cinema_hall::Entity, _>(
        conn,
        entities::cinema_hall::Column::Id,
        sessions.iter().map(|s| s.cinema_hall_id),
        |hall| hall.id,
    )
    .await?;

    let session_ids: Vec<i64> = sessions.iter().map(|s| s.id).collect();
    let sold: HashMap<i64, i64> = entities::ticket::Entity::find()
        .select_only()
        .column(entities::ticket::Column::MovieSessionId)
        .column_as(entities::ticket::Column::Id.count(), "sold")
        .filter(entities::ticket::Column::MovieSessionId.is_in(session_ids))
        .group_by(entities::ticket::Column::MovieSessionId)
        .into_tuple::<(i64, i64)>()
        .all(conn)
        .await?
        .into_iter()
        .collect();

    let mut summaries = Vec::with_capacity(sessions.len());
    for session in sessions {
        let movie = movies.get(&session.movie_id).ok_or_else(|| {
            DbErr::RecordNotFound(format!("movie {} of session {}", session.movie_id, session.id))
        })?;
        let hall = halls.get(&session.cinema_hall_id).ok_or_else(|| {
            DbErr::RecordNotFound(format!(
                "cinema hall {} of session {}",
                session.cinema_hall_id, session.id
            ))
        })?;

        summaries.push(MovieSessionSummary {
            movie_title: movie.title.clone(),
            cinema_hall: hall.clone(),
            tickets_sold: sold.get(&session.id).copied().unwrap_or(0),
            session,
        });
    }
    Ok(summaries)
}

//! Wire representations of the cinema resources.
//!
//! A resource can be rendered in more than one shape. Which shape a response uses
//! depends only on the operation being served, see [`MovieShape::for_action`] and
//! [`MovieSessionShape::for_action`].

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;

use crate::entities;
use crate::services::movie::MovieWithRelations;
use crate::services::movie_session::{MovieSessionDetail, MovieSessionSummary};
use crate::services::order::{OrderWithTickets, TicketWithSession};
use crate::services::query_builder::PaginatedResult;

/// The operation a request performs on a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    List,
    Retrieve,
    Create,
    Update,
    PartialUpdate,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenreRepr {
    pub id: i64,
    pub name: String,
}

impl From<&entities::genre::Model> for GenreRepr {
    fn from(genre: &entities::genre::Model) -> Self {
        Self {
            id: genre.id,
            name: genre.name.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ActorRepr {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
}

impl From<&entities::actor::Model> for ActorRepr {
    fn from(actor: &entities::actor::Model) -> Self {
        Self {
            id: actor.id,
            first_name: actor.first_name.clone(),
            last_name: actor.last_name.clone(),
            full_name: actor.full_name(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CinemaHallRepr {
    pub id: i64,
    pub name: String,
    pub rows: i32,
    pub seats_in_row: i32,
    pub capacity: i64,
}

impl From<&entities::cinema_hall::Model> for CinemaHallRepr {
    fn from(hall: &entities::cinema_hall::Model) -> Self {
        Self {
            id: hall.id,
            name: hall.name.clone(),
            rows: hall.rows,
            seats_in_row: hall.seats_in_row,
            capacity: hall.capacity(),
        }
    }
}

/// Relations of a movie as they appear in one of its shapes.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Related<Name, Nested> {
    Names(Vec<Name>),
    Nested(Vec<Nested>),
    Ids(Vec<i64>),
}

#[derive(Debug, Clone, Serialize)]
pub struct MovieRepr {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub duration: i32,
    pub genres: Related<String, GenreRepr>,
    pub actors: Related<String, ActorRepr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovieShape {
    /// Genre names and actor full names
    List,
    /// Nested genre and actor objects
    Detail,
    /// Genre and actor ids, as accepted on input
    Write,
}

impl MovieShape {
    pub fn for_action(action: Action) -> Self {
        match action {
            Action::List => MovieShape::List,
            Action::Retrieve => MovieShape::Detail,
            Action::Create | Action::Update | Action::PartialUpdate => {
                MovieShape::Write
            }
        }
    }

    pub fn render(self, movie: &MovieWithRelations) -> MovieRepr {
        let (genres, actors) = match self {
            MovieShape::List => (
                Related::Names(movie.genres.iter().map(|g| g.name.clone()).collect()),
                Related::Names(movie.actors.iter().map(|a| a.full_name()).collect()),
            ),
            MovieShape::Detail => (
                Related::Nested(movie.genres.iter().map(GenreRepr::from).collect()),
                Related::Nested(movie.actors.iter().map(ActorRepr::from).collect()),
            ),
            MovieShape::Write => (
                Related::Ids(movie.genres.iter().map(|g| g.id).collect()),
                Related::Ids(movie.actors.iter().map(|a| a.id).collect()),
            ),
        };

        MovieRepr {
            id: movie.movie.id,
            title: movie.movie.title.clone(),
            description: movie.movie.description.clone(),
            duration: movie.movie.duration,
            genres,
            actors,
        }
    }
}

/// Shape of a single session response. Listings are always
/// [`MovieSessionListRepr`], built straight from the availability query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovieSessionShape {
    Detail,
    Write,
}

impl MovieSessionShape {
    pub fn for_action(action: Action) -> Self {
        match action {
            Action::Retrieve => MovieSessionShape::Detail,
            Action::List | Action::Create | Action::Update | Action::PartialUpdate => {
                MovieSessionShape::Write
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MovieSessionListRepr {
    pub id: i64,
    pub show_time: NaiveDateTime,
    pub movie_title: String,
    pub cinema_hall_name: String,
    pub cinema_hall_capacity: i64,
    pub tickets_available: i64,
}

impl From<&MovieSessionSummary> for MovieSessionListRepr {
    fn from(summary: &MovieSessionSummary) -> Self {
        Self {
            id: summary.session.id,
            show_time: summary.session.show_time,
            movie_title: summary.movie_title.clone(),
            cinema_hall_name: summary.cinema_hall.name.clone(),
            cinema_hall_capacity: summary.cinema_hall.capacity(),
            tickets_available: summary.tickets_available(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TakenPlace {
    pub row: i32,
    pub seat: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct MovieSessionDetailRepr {
    pub id: i64,
    pub show_time: NaiveDateTime,
    pub movie: MovieRepr,
    pub cinema_hall: CinemaHallRepr,
    pub taken_places: Vec<TakenPlace>,
}

impl From<&MovieSessionDetail> for MovieSessionDetailRepr {
    fn from(detail: &MovieSessionDetail) -> Self {
        Self {
            id: detail.session.id,
            show_time: detail.session.show_time,
            movie: MovieShape::List.render(&detail.movie),
            cinema_hall: CinemaHallRepr::from(&detail.cinema_hall),
            taken_places: detail
                .taken_places
                .iter()
                .map(|&(row, seat)| TakenPlace { row, seat })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MovieSessionWriteRepr {
    pub id: i64,
    pub show_time: NaiveDateTime,
    pub movie: i64,
    pub cinema_hall: i64,
}

impl From<&entities::movie_session::Model> for MovieSessionWriteRepr {
    fn from(session: &entities::movie_session::Model) -> Self {
        Self {
            id: session.id,
            show_time: session.show_time,
            movie: session.movie_id,
            cinema_hall: session.cinema_hall_id,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum MovieSessionRepr {
    Detail(MovieSessionDetailRepr),
    Write(MovieSessionWriteRepr),
}

/// A session as embedded in a ticket: the list shape without availability.
#[derive(Debug, Clone, Serialize)]
pub struct TicketSessionRepr {
    pub id: i64,
    pub show_time: NaiveDateTime,
    pub movie_title: String,
    pub cinema_hall_name: String,
    pub cinema_hall_capacity: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TicketRepr {
    pub id: i64,
    pub row: i32,
    pub seat: i32,
    pub movie_session: TicketSessionRepr,
}

impl From<&TicketWithSession> for TicketRepr {
    fn from(ticket: &TicketWithSession) -> Self {
        let session = &ticket.movie_session;
        Self {
            id: ticket.ticket.id,
            row: ticket.ticket.row,
            seat: ticket.ticket.seat,
            movie_session: TicketSessionRepr {
                id: session.session.id,
                show_time: session.session.show_time,
                movie_title: session.movie_title.clone(),
                cinema_hall_name: session.cinema_hall.name.clone(),
                cinema_hall_capacity: session.cinema_hall.capacity(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderRepr {
    pub id: i64,
    pub tickets: Vec<TicketRepr>,
    pub created_at: DateTime<Utc>,
}

impl From<&OrderWithTickets> for OrderRepr {
    fn from(order: &OrderWithTickets) -> Self {
        Self {
            id: order.order.id,
            tickets: order.tickets.iter().map(TicketRepr::from).collect(),
            created_at: order.order.created_at,
        }
    }
}

/// Page-number pagination envelope.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub count: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    /// `base` is the collection path; page 1 links to it without a query string.
    pub fn from_result<S>(
        base: &str,
        result: &PaginatedResult<S>,
        render: impl Fn(&S) -> T,
    ) -> Self {
        let link = |page: u64| {
            if page <= 1 {
                base.to_string()
            } else {
                format!("{base}?page={page}")
            }
        };

        Self {
            count: result.total_count,
            next: result.has_next().then(|| link(result.page + 1)),
            previous: result.has_previous().then(|| link(result.page - 1)),
            results: result.items.iter().map(render).collect(),
        }
    }
}

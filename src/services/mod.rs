pub mod actor;
pub mod cinema_hall;
pub mod error;
pub mod genre;
pub mod movie;
pub mod movie_session;
pub mod order;
pub mod query_builder;
pub mod user;
pub mod validation;

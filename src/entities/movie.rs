use sea_orm::entity::prelude::*;

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "movies")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    /// Duration in minutes
    pub duration: i32,

    #[sea_orm(has_many, via = "movie_genre")]
    pub genres: HasMany<super::genre::Entity>,
    #[sea_orm(has_many, via = "movie_actor")]
    pub actors: HasMany<super::actor::Entity>,
    #[sea_orm(has_many)]
    pub movie_sessions: HasMany<super::movie_session::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}

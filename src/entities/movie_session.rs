use chrono::NaiveDateTime;
use sea_orm::entity::prelude::*;

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "movie_sessions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub show_time: NaiveDateTime,
    pub movie_id: i64,
    pub cinema_hall_id: i64,

    #[sea_orm(belongs_to, from = "movie_id", to = "id", on_delete = "Cascade")]
    pub movie: HasOne<super::movie::Entity>,
    #[sea_orm(belongs_to, from = "cinema_hall_id", to = "id", on_delete = "Cascade")]
    pub cinema_hall: HasOne<super::cinema_hall::Entity>,
    #[sea_orm(has_many)]
    pub tickets: HasMany<super::ticket::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}

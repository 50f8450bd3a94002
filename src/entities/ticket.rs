use sea_orm::entity::prelude::*;

/// A sold seat. Nothing prevents two tickets for the same (session, row, seat).
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "tickets")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub row: i32,
    pub seat: i32,
    pub movie_session_id: i64,
    pub order_id: i64,

    #[sea_orm(belongs_to, from = "movie_session_id", to = "id", on_delete = "Cascade")]
    pub movie_session: HasOne<super::movie_session::Entity>,
    #[sea_orm(belongs_to, from = "order_id", to = "id", on_delete = "Cascade")]
    pub order: HasOne<super::order::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}

use sea_orm::entity::prelude::*;

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "cinema_halls")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    pub rows: i32,
    pub seats_in_row: i32,

    #[sea_orm(has_many)]
    pub movie_sessions: HasMany<super::movie_session::Entity>,
}

impl Model {
    /// Total number of seats. Never stored, always derived from the hall layout.
    pub fn capacity(&self) -> i64 {
        i64::from(self.rows) * i64::from(self.seats_in_row)
    }
}

impl ActiveModelBehavior for ActiveModel {}

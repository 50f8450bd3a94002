use std::sync::Arc;

use sea_orm::{ActiveModelTrait, ColumnTrait, DbErr, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::Deserialize;
use tracing::instrument;

use crate::database::Database;
use crate::entities;
use crate::services::error::{ServiceError, ServiceResult, is_unique_violation};
use crate::services::validation::{Input, Validator, WriteMode};

const DUPLICATE_NAME: &str = "genre with this name already exists.";

/// Writable genre fields. Absent fields are `None`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenreFields {
    pub name: Input,
}

pub struct GenreService {
    db: Arc<Database>,
}

impl GenreService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub async fn list(&self) -> ServiceResult<Vec<entities::genre::Model>> {
        Ok(entities::genre::Entity::find()
            .order_by_asc(entities::genre::Column::Id)
            .all(&self.db.conn)
            .await?)
    }

    pub async fn get(&self, id: i64) -> ServiceResult<entities::genre::Model> {
        entities::genre::Entity::find_by_id(id)
            .one(&self.db.conn)
            .await?
            .ok_or(ServiceError::not_found("genre", id))
    }

    #[instrument(skip(self))]
    pub async fn create(&self, fields: GenreFields) -> ServiceResult<entities::genre::Model> {
        let name = self.validate(fields, WriteMode::Create, None).await?;

        let mut active: entities::genre::ActiveModel = ActiveModelTrait::default();
        if let Some(name) = name {
            active.name = Set(name);
        }
        let genre = active.insert(&self.db.conn).await.map_err(duplicate_name)?;

        tracing::info!(genre_id = genre.id, "Genre created");
        Ok(genre)
    }

    #[instrument(skip(self))]
    pub async fn update(
        &self,
        id: i64,
        fields: GenreFields,
        mode: WriteMode,
    ) -> ServiceResult<entities::genre::Model> {
        let genre = self.get(id).await?;
        let name = self.validate(fields, mode, Some(id)).await?;

        let Some(name) = name else {
            return Ok(genre);
        };
        let mut active: entities::genre::ActiveModel = genre.into();
        active.name = Set(name);
        Ok(active.update(&self.db.conn).await.map_err(duplicate_name)?)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: i64) -> ServiceResult<()> {
        let result = entities::genre::Entity::delete_by_id(id)
            .exec(&self.db.conn)
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::not_found("genre", id));
        }
        tracing::info!(genre_id = id, "Genre deleted");
        Ok(())
    }

    async fn validate(
        &self,
        fields: GenreFields,
        mode: WriteMode,
        current_id: Option<i64>,
    ) -> ServiceResult<Option<String>> {
        let mut validator = Validator::new(mode);
        let name = validator.char_field("name", fields.name);

        if let Some(name) = &name {
            let mut query =
                entities::genre::Entity::find().filter(entities::genre::Column::Name.eq(name));
            if let Some(current_id) = current_id {
                query = query.filter(entities::genre::Column::Id.ne(current_id));
            }
            if query.one(&self.db.conn).await?.is_some() {
                validator.add("name", DUPLICATE_NAME);
            }
        }

        validator.finish()?;
        Ok(name)
    }
}

/// The unique index on `name` is the last word when a concurrent write slips
/// past [`GenreService::validate`].
fn duplicate_name(err: DbErr) -> ServiceError {
    if is_unique_violation(&err) {
        ServiceError::field("name", DUPLICATE_NAME)
    } else {
        err.into()
    }
}

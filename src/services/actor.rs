use std::sync::Arc;

use sea_orm::{ActiveModelTrait, EntityTrait, QueryOrder, Set};
use serde::Deserialize;
use tracing::instrument;

use crate::database::Database;
use crate::entities;
use crate::services::error::{ServiceError, ServiceResult};
use crate::services::validation::{Input, Validator, WriteMode};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActorFields {
    pub first_name: Input,
    pub last_name: Input,
}

struct ActorChanges {
    first_name: Option<String>,
    last_name: Option<String>,
}

impl ActorChanges {
    fn is_empty(&self) -> bool {
        self.first_name.is_none() && self.last_name.is_none()
    }

    fn apply(self, active: &mut entities::actor::ActiveModel) {
        if let Some(first_name) = self.first_name {
            active.first_name = Set(first_name);
        }
        if let Some(last_name) = self.last_name {
            active.last_name = Set(last_name);
        }
    }
}

pub struct ActorService {
    db: Arc<Database>,
}

impl ActorService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub async fn list(&self) -> ServiceResult<Vec<entities::actor::Model>> {
        Ok(entities::actor::Entity::find()
            .order_by_asc(entities::actor::Column::Id)
            .all(&self.db.conn)
            .await?)
    }

    pub async fn get(&self, id: i64) -> ServiceResult<entities::actor::Model> {
        entities::actor::Entity::find_by_id(id)
            .one(&self.db.conn)
            .await?
            .ok_or(ServiceError::not_found("actor", id))
    }

    #[instrument(skip(self))]
    pub async fn create(&self, fields: ActorFields) -> ServiceResult<entities::actor::Model> {
        let changes = validate(fields, WriteMode::Create)?;

        let mut active: entities::actor::ActiveModel = ActiveModelTrait::default();
        changes.apply(&mut active);
        let actor = active.insert(&self.db.conn).await?;

        tracing::info!(actor_id = actor.id, "Actor created");
        Ok(actor)
    }

    #[instrument(skip(self))]
    pub async fn update(
        &self,
        id: i64,
        fields: ActorFields,
        mode: WriteMode,
    ) -> ServiceResult<entities::actor::Model> {
        let actor = self.get(id).await?;
        let changes = validate(fields, mode)?;
        if changes.is_empty() {
            return Ok(actor);
        }

        let mut active: entities::actor::ActiveModel = actor.into();
        changes.apply(&mut active);
        Ok(active.update(&self.db.conn).await?)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: i64) -> ServiceResult<()> {
        let result = entities::actor::Entity::delete_by_id(id)
            .exec(&self.db.conn)
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::not_found("actor", id));
        }
        tracing::info!(actor_id = id, "Actor deleted");
        Ok(())
    }
}

fn validate(fields: ActorFields, mode: WriteMode) -> ServiceResult<ActorChanges> {
    let mut validator = Validator::new(mode);
    let changes = ActorChanges {
        first_name: validator.char_field("first_name", fields.first_name),
        last_name: validator.char_field("last_name", fields.last_name),
    };
    validator.finish()?;
    Ok(changes)
}

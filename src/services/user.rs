use std::sync::Arc;

use sea_orm::{ActiveModelBehavior, ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use tracing::instrument;

use crate::database::Database;
use crate::entities;
use crate::services::error::{ServiceError, ServiceResult, is_unique_violation};
use crate::services::validation::{Validator, WriteMode};

const DUPLICATE_USERNAME: &str = "A user with that username already exists.";

pub struct UserService {
    db: Arc<Database>,
}

impl UserService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Register a user and issue a fresh API token for it.
    #[instrument(skip(self))]
    pub async fn create_user(&self, username: &str) -> ServiceResult<entities::user::Model> {
        let mut validator = Validator::new(WriteMode::Create);
        let username = validator.char_field("username", Some(username.into()));

        if let Some(name) = &username
            && entities::user::Entity::find()
                .filter(entities::user::Column::Username.eq(name))
                .one(&self.db.conn)
                .await?
                .is_some()
        {
            validator.add("username", DUPLICATE_USERNAME);
        }
        validator.finish()?;

        let mut active = entities::user::ActiveModel::new();
        if let Some(username) = username {
            active.username = Set(username);
        }
        active.token = Set(uuid::Uuid::new_v4().simple().to_string());
        let user = active.insert(&self.db.conn).await.map_err(|err| {
            if is_unique_violation(&err) {
                ServiceError::field("username", DUPLICATE_USERNAME)
            } else {
                err.into()
            }
        })?;

        tracing::info!(user_id = user.id, username = %user.username, "User created");
        Ok(user)
    }

    pub async fn find_by_token(&self, token: &str) -> ServiceResult<Option<entities::user::Model>> {
        Ok(entities::user::Entity::find()
            .filter(entities::user::Column::Token.eq(token))
            .one(&self.db.conn)
            .await?)
    }
}

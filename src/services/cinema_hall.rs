use std::sync::Arc;

use sea_orm::{ActiveModelTrait, EntityTrait, QueryOrder, Set};
use serde::Deserialize;
use tracing::instrument;

use crate::database::Database;
use crate::entities;
use crate::services::error::{ServiceError, ServiceResult};
use crate::services::validation::{Input, Validator, WriteMode};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CinemaHallFields {
    pub name: Input,
    pub rows: Input,
    pub seats_in_row: Input,
}

struct CinemaHallChanges {
    name: Option<String>,
    rows: Option<i32>,
    seats_in_row: Option<i32>,
}

impl CinemaHallChanges {
    fn is_empty(&self) -> bool {
        self.name.is_none() && self.rows.is_none() && self.seats_in_row.is_none()
    }

    fn apply(self, active: &mut entities::cinema_hall::ActiveModel) {
        if let Some(name) = self.name {
            active.name = Set(name);
        }
        if let Some(rows) = self.rows {
            active.rows = Set(rows);
        }
        if let Some(seats_in_row) = self.seats_in_row {
            active.seats_in_row = Set(seats_in_row);
        }
    }
}

pub struct CinemaHallService {
    db: Arc<Database>,
}

impl CinemaHallService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub async fn list(&self) -> ServiceResult<Vec<entities::cinema_hall::Model>> {
        Ok(entities::cinema_hall::Entity::find()
            .order_by_asc(entities::cinema_hall::Column::Id)
            .all(&self.db.conn)
            .await?)
    }

    pub async fn get(&self, id: i64) -> ServiceResult<entities::cinema_hall::Model> {
        entities::cinema_hall::Entity::find_by_id(id)
            .one(&self.db.conn)
            .await?
            .ok_or(ServiceError::not_found("cinema hall", id))
    }

    #[instrument(skip(self))]
    pub async fn create(
        &self,
        fields: CinemaHallFields,
    ) -> ServiceResult<entities::cinema_hall::Model> {
        let changes = validate(fields, WriteMode::Create)?;

        let mut active: entities::cinema_hall::ActiveModel = ActiveModelTrait::default();
        changes.apply(&mut active);
        let hall = active.insert(&self.db.conn).await?;

        tracing::info!(
            cinema_hall_id = hall.id,
            capacity = hall.capacity(),
            "Cinema hall created"
        );
        Ok(hall)
    }

    #[instrument(skip(self))]
    pub async fn update(
        &self,
        id: i64,
        fields: CinemaHallFields,
        mode: WriteMode,
    ) -> ServiceResult<entities::cinema_hall::Model> {
        let hall = self.get(id).await?;
        let changes = validate(fields, mode)?;
        if changes.is_empty() {
            return Ok(hall);
        }

        let mut active: entities::cinema_hall::ActiveModel = hall.into();
        changes.apply(&mut active);
        Ok(active.update(&self.db.conn).await?)
    }

    /// Deleting a hall also deletes its sessions and their tickets.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: i64) -> ServiceResult<()> {
        let result = entities::cinema_hall::Entity::delete_by_id(id)
            .exec(&self.db.conn)
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::not_found("cinema hall", id));
        }
        tracing::info!(cinema_hall_id = id, "Cinema hall deleted");
        Ok(())
    }
}

fn validate(fields: CinemaHallFields, mode: WriteMode) -> ServiceResult<CinemaHallChanges> {
    let mut validator = Validator::new(mode);
    let changes = CinemaHallChanges {
        name: validator.char_field("name", fields.name),
        rows: validator.non_negative("rows", fields.rows),
        seats_in_row: validator.non_negative("seats_in_row", fields.seats_in_row),
    };
    validator.finish()?;
    Ok(changes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{insert_hall, insert_movie, insert_session, test_db};
    use serde_json::json;

    #[tokio::test]
    async fn test_create_derives_capacity() {
        let db = test_db().await;
        let service = CinemaHallService::new(db);

        let hall = service
            .create(CinemaHallFields {
                name: Some("Blue".into()),
                rows: Some(json!(10)),
                seats_in_row: Some(json!("15")),
            })
            .await
            .unwrap();
        assert_eq!(hall.capacity(), 150);
    }

    #[tokio::test]
    async fn test_negative_dimensions_are_rejected() {
        let db = test_db().await;
        let service = CinemaHallService::new(db);

        let err = service
            .create(CinemaHallFields {
                name: Some("Blue".into()),
                rows: Some(json!(-1)),
                seats_in_row: None,
            })
            .await
            .unwrap_err();
        let ServiceError::Validation(errors) = err else {
            panic!("expected validation error, got {err:?}");
        };
        assert_eq!(
            errors.messages("rows"),
            ["Ensure this value is greater than or equal to 0."]
        );
        assert_eq!(errors.messages("seats_in_row"), ["This field is required."]);
    }

    #[tokio::test]
    async fn test_badly_typed_dimensions_are_field_errors() {
        let db = test_db().await;
        let service = CinemaHallService::new(db);

        let err = service
            .create(CinemaHallFields {
                name: Some(json!("Blue")),
                rows: Some(json!("abc")),
                seats_in_row: Some(json!([15])),
            })
            .await
            .unwrap_err();
        let ServiceError::Validation(errors) = err else {
            panic!("expected validation error, got {err:?}");
        };
        assert_eq!(errors.messages("rows"), ["A valid integer is required."]);
        assert_eq!(errors.messages("seats_in_row"), ["A valid integer is required."]);
    }

    #[tokio::test]
    async fn test_delete_cascades_to_sessions() {
        let db = test_db().await;
        let hall = insert_hall(&db, "Blue", 10, 15).await;
        let movie = insert_movie(&db, "Heat", &[], &[]).await;
        insert_session(&db, movie.id, hall.id, "2024-05-01 18:00").await;
        let service = CinemaHallService::new(db.clone());

        service.delete(hall.id).await.unwrap();

        let sessions = entities::movie_session::Entity::find()
            .all(&db.conn)
            .await
            .unwrap();
        assert!(sessions.is_empty());
    }

    #[tokio::test]
    async fn test_partial_update_changes_one_dimension() {
        let db = test_db().await;
        let hall = insert_hall(&db, "Blue", 10, 15).await;
        let service = CinemaHallService::new(db);

        let updated = service
            .update(
                hall.id,
                CinemaHallFields {
                    rows: Some(json!(12)),
                    ..Default::default()
                },
                WriteMode::Partial,
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Blue");
        assert_eq!(updated.capacity(), 180);
    }
}

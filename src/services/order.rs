use std::collections::HashMap;
use std::sync::Arc;

use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::instrument;

use crate::database::Database;
use crate::entities;
use crate::services::error::{
    FieldErrors, NON_FIELD_ERRORS, ServiceError, ServiceResult, is_foreign_key_violation,
};
use crate::services::movie_session::{MovieSessionSummary, summarize};
use crate::services::query_builder::{
    PaginatedResult, apply_pagination, existing_ids, load_by_ids, page_count,
};
use crate::services::validation::{Input, Validator, WriteMode, does_not_exist, not_a_dict};

/// One requested seat. `movie_session_id` names the session by id.
#[derive(Debug, Clone, Default, Deserialize)]
struct TicketFields {
    row: Input,
    seat: Input,
    movie_session_id: Input,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderFields {
    /// Ticket objects, see `TicketFields`
    pub tickets: Input,
}

/// One ticket item after type checks, before its session is looked up.
struct TicketCheck {
    validator: Validator,
    row: Option<i32>,
    seat: Option<i32>,
    movie_session_id: Option<i64>,
}

impl TicketCheck {
    fn new(item: Value) -> Self {
        let mut validator = Validator::new(WriteMode::Create);
        let fields = match item {
            Value::Object(map) => serde_json::from_value::<TicketFields>(Value::Object(map))
                .map_err(|err| err.to_string()),
            other => Err(not_a_dict(&other)),
        };

        match fields {
            Ok(fields) => Self {
                row: validator.integer("row", fields.row),
                seat: validator.integer("seat", fields.seat),
                movie_session_id: validator.pk("movie_session_id", fields.movie_session_id),
                validator,
            },
            Err(message) => {
                validator.add(NON_FIELD_ERRORS, message);
                Self {
                    validator,
                    row: None,
                    seat: None,
                    movie_session_id: None,
                }
            }
        }
    }
}

/// Per-ticket errors with only the ticket at `position` pointing at a missing session.
fn missing_session(count: usize, position: usize, movie_session_id: i64) -> ServiceError {
    let mut items = vec![FieldErrors::new(); count];
    if let Some(item) = items.get_mut(position) {
        item.add("movie_session_id", does_not_exist(movie_session_id));
    }
    let mut errors = FieldErrors::new();
    errors.add_items("tickets", items);
    ServiceError::Validation(errors)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct NewTicket {
    row: i32,
    seat: i32,
    movie_session_id: i64,
}

#[derive(Debug, Clone)]
pub struct TicketWithSession {
    pub ticket: entities::ticket::Model,
    pub movie_session: MovieSessionSummary,
}

#[derive(Debug, Clone)]
pub struct OrderWithTickets {
    pub order: entities::order::Model,
    pub tickets: Vec<TicketWithSession>,
}

pub struct OrderService {
    db: Arc<Database>,
}

impl OrderService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Orders of one user, newest first. `page` is 1-based and must exist.
    #[instrument(skip(self))]
    pub async fn list_for_user(
        &self,
        user_id: i64,
        page: u64,
        page_size: u64,
    ) -> ServiceResult<PaginatedResult<OrderWithTickets>> {
        let page_size = page_size.max(1);
        let query = entities::order::Entity::find()
            .filter(entities::order::Column::UserId.eq(user_id));

        let total_count = query.clone().count(&self.db.conn).await?;
        if page == 0 || page > page_count(total_count, page_size) {
            return Err(ServiceError::InvalidPage(page.to_string()));
        }

        let query = query
            .order_by_desc(entities::order::Column::CreatedAt)
            .order_by_desc(entities::order::Column::Id);
        let orders = apply_pagination(query, page, page_size)
            .all(&self.db.conn)
            .await?;

        let items = load_tickets(&self.db.conn, orders).await?;

        Ok(PaginatedResult {
            items,
            total_count,
            page,
            page_size,
        })
    }

    /// Another user's order is reported as missing.
    pub async fn get_for_user(&self, user_id: i64, id: i64) -> ServiceResult<OrderWithTickets> {
        let order = entities::order::Entity::find_by_id(id)
            .filter(entities::order::Column::UserId.eq(user_id))
            .one(&self.db.conn)
            .await?
            .ok_or(ServiceError::not_found("order", id))?;

        load_tickets(&self.db.conn, vec![order])
            .await?
            .pop()
            .ok_or(ServiceError::not_found("order", id))
    }

    /// Create an order and its tickets as one unit. Nothing is written if any
    /// ticket is invalid.
    #[instrument(skip(self, fields))]
    pub async fn create(&self, user_id: i64, fields: OrderFields) -> ServiceResult<OrderWithTickets> {
        let tickets = self.validate(fields).await?;
        let ticket_count = tickets.len();

        let order = self.persist(user_id, tickets).await?;

        tracing::info!(order_id = order.id, user_id, ticket_count, "Order created");
        self.get_for_user(user_id, order.id).await
    }

    #[instrument(skip(self))]
    pub async fn delete_for_user(&self, user_id: i64, id: i64) -> ServiceResult<()> {
        let result = entities::order::Entity::delete_many()
            .filter(entities::order::Column::Id.eq(id))
            .filter(entities::order::Column::UserId.eq(user_id))
            .exec(&self.db.conn)
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::not_found("order", id));
        }
        tracing::info!(order_id = id, user_id, "Order deleted");
        Ok(())
    }

    async fn persist(
        &self,
        user_id: i64,
        tickets: Vec<NewTicket>,
    ) -> ServiceResult<entities::order::Model> {
        let order = self
            .db
            .conn
            .transaction::<_, entities::order::Model, ServiceError>(|txn| {
                Box::pin(async move {
                    let order = entities::order::ActiveModel {
                        user_id: Set(user_id),
                        ..entities::order::ActiveModel::new()
                    }
                    .insert(txn)
                    .await?;

                    let count = tickets.len();
                    for (position, ticket) in tickets.into_iter().enumerate() {
                        entities::ticket::ActiveModel {
                            row: Set(ticket.row),
                            seat: Set(ticket.seat),
                            movie_session_id: Set(ticket.movie_session_id),
                            order_id: Set(order.id),
                            ..Default::default()
                        }
                        .insert(txn)
                        .await
                        .map_err(|err| {
                            // The session went away after validation
                            if is_foreign_key_violation(&err) {
                                missing_session(count, position, ticket.movie_session_id)
                            } else {
                                ServiceError::from(err)
                            }
                        })?;
                    }

                    Ok(order)
                })
            })
            .await?;
        Ok(order)
    }

    /// Ticket errors are reported per position, so the n-th error set belongs to
    /// the n-th requested ticket.
    async fn validate(&self, fields: OrderFields) -> ServiceResult<Vec<NewTicket>> {
        let mut validator = Validator::new(WriteMode::Create);
        let Some(requested) = validator.list("tickets", fields.tickets) else {
            validator.finish()?;
            return Ok(Vec::new());
        };

        let checks: Vec<TicketCheck> = requested.into_iter().map(TicketCheck::new).collect();
        let sessions = existing_ids::<entities::movie_session::Entity, _>(
            &self.db.conn,
            entities::movie_session::Column::Id,
            checks.iter().filter_map(|check| check.movie_session_id),
        )
        .await?;

        let mut tickets = Vec::with_capacity(checks.len());
        let mut item_errors = Vec::with_capacity(checks.len());
        for mut check in checks {
            if let Some(id) = check.movie_session_id
                && !sessions.contains(&id)
            {
                check.validator.add("movie_session_id", does_not_exist(id));
            }

            if let (Some(row), Some(seat), Some(movie_session_id)) =
                (check.row, check.seat, check.movie_session_id)
                && check.validator.is_valid()
            {
                tickets.push(NewTicket {
                    row,
                    seat,
                    movie_session_id,
                });
            }
            item_errors.push(check.validator.into_errors());
        }

        validator.add_items("tickets", item_errors);
        validator.finish()?;
        Ok(tickets)
    }
}

/// Attach tickets, each with its session summary, to every order.
async fn load_tickets<C: ConnectionTrait>(
    conn: &C,
    orders: Vec<entities::order::Model>,
) -> Result<Vec<OrderWithTickets>, DbErr> {
    if orders.is_empty() {
        return Ok(Vec::new());
    }

    let order_ids: Vec<i64> = orders.iter().map(|order| order.id).collect();
    let tickets = entities::ticket::Entity::find()
        .filter(entities::ticket::Column::OrderId.is_in(order_ids))
        .order_by_asc(entities::ticket::Column::Id)
        .all(conn)
        .await?;

    let sessions = load_by_ids::<entities::movie_session::Entity, _>(
        conn,
        entities::movie_session::Column::Id,
        tickets.iter().map(|ticket| ticket.movie_session_id),
        |session| session.id,
    )
    .await?;
    let summaries: HashMap<i64, MovieSessionSummary> =
        summarize(conn, sessions.into_values().collect())
            .await?
            .into_iter()
            .map(|summary| (summary.session.id, summary))
            .collect();

    let mut tickets_by_order: HashMap<i64, Vec<TicketWithSession>> = HashMap::new();
    for ticket in tickets {
        let movie_session = summaries.get(&ticket.movie_session_id).cloned().ok_or_else(|| {
            DbErr::RecordNotFound(format!(
                "movie session {} of ticket {}",
                ticket.movie_session_id, ticket.id
            ))
        })?;
        tickets_by_order
            .entry(ticket.order_id)
            .or_default()
            .push(TicketWithSession {
                ticket,
                movie_session,
            });
    }

    Ok(orders
        .into_iter()
        .map(|order| OrderWithTickets {
            tickets: tickets_by_order.remove(&order.id).unwrap_or_default(),
            order,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::error::FieldError;
    use crate::test_utils::{
        insert_hall, insert_movie, insert_order, insert_session, insert_user, test_db,
    };
    use serde_json::json;

    fn ticket(row: i32, seat: i32, movie_session_id: i64) -> Value {
        json!({"row": row, "seat": seat, "movie_session_id": movie_session_id})
    }

    async fn count_rows(db: &Database) -> (u64, u64) {
        let orders = entities::order::Entity::find().count(&db.conn).await.unwrap();
        let tickets = entities::ticket::Entity::find().count(&db.conn).await.unwrap();
        (orders, tickets)
    }

    #[tokio::test]
    async fn test_create_writes_order_and_tickets() {
        let db = test_db().await;
        let hall = insert_hall(&db, "Blue", 10, 15).await;
        let movie = insert_movie(&db, "Heat", &[], &[]).await;
        let session = insert_session(&db, movie.id, hall.id, "2024-05-01 18:00").await;
        let user = insert_user(&db, "alice").await;
        let service = OrderService::new(db.clone());

        let created = service
            .create(
                user.id,
                OrderFields {
                    tickets: Some(json!([ticket(1, 1, session.id), ticket(1, 2, session.id)])),
                },
            )
            .await
            .unwrap();

        assert_eq!(created.order.user_id, user.id);
        assert_eq!(created.tickets.len(), 2);
        assert_eq!(created.tickets[0].movie_session.movie_title, "Heat");
        assert_eq!(created.tickets[1].movie_session.cinema_hall.capacity(), 150);
        assert_eq!(count_rows(&db).await, (1, 2));
    }

    #[tokio::test]
    async fn test_one_bad_ticket_rejects_whole_order() {
        let db = test_db().await;
        let hall = insert_hall(&db, "Blue", 10, 15).await;
        let movie = insert_movie(&db, "Heat", &[], &[]).await;
        let session = insert_session(&db, movie.id, hall.id, "2024-05-01 18:00").await;
        let user = insert_user(&db, "alice").await;
        let service = OrderService::new(db.clone());

        let err = service
            .create(
                user.id,
                OrderFields {
                    tickets: Some(json!([ticket(1, 1, session.id), ticket(1, 2, 999)])),
                },
            )
            .await
            .unwrap_err();

        let ServiceError::Validation(errors) = err else {
            panic!("expected validation error, got {err:?}");
        };
        let Some(FieldError::Items(items)) = errors.get("tickets") else {
            panic!("expected per-ticket errors, got {errors:?}");
        };
        assert!(items[0].is_empty());
        assert_eq!(
            items[1].messages("movie_session_id"),
            ["Invalid pk \"999\" - object does not exist."]
        );
        assert_eq!(count_rows(&db).await, (0, 0));
    }

    #[tokio::test]
    async fn test_session_gone_at_insert_rolls_back_as_field_error() {
        let db = test_db().await;
        let hall = insert_hall(&db, "Blue", 10, 15).await;
        let movie = insert_movie(&db, "Heat", &[], &[]).await;
        let session = insert_session(&db, movie.id, hall.id, "2024-05-01 18:00").await;
        let user = insert_user(&db, "alice").await;
        let service = OrderService::new(db.clone());

        let tickets = vec![
            NewTicket {
                row: 1,
                seat: 1,
                movie_session_id: session.id,
            },
            NewTicket {
                row: 1,
                seat: 2,
                movie_session_id: 999,
            },
        ];
        let err = service.persist(user.id, tickets).await.unwrap_err();

        let ServiceError::Validation(errors) = err else {
            panic!("expected validation error, got {err:?}");
        };
        let Some(FieldError::Items(items)) = errors.get("tickets") else {
            panic!("expected per-ticket errors, got {errors:?}");
        };
        assert!(items[0].is_empty());
        assert_eq!(
            items[1].messages("movie_session_id"),
            ["Invalid pk \"999\" - object does not exist."]
        );
        assert_eq!(count_rows(&db).await, (0, 0));
    }

    #[tokio::test]
    async fn test_ticket_values_are_coerced_or_reported() {
        let db = test_db().await;
        let hall = insert_hall(&db, "Blue", 10, 15).await;
        let movie = insert_movie(&db, "Heat", &[], &[]).await;
        let session = insert_session(&db, movie.id, hall.id, "2024-05-01 18:00").await;
        let user = insert_user(&db, "alice").await;
        let service = OrderService::new(db.clone());

        let created = service
            .create(
                user.id,
                OrderFields {
                    tickets: Some(json!([
                        {"row": "3", "seat": 4.0, "movie_session_id": session.id.to_string()}
                    ])),
                },
            )
            .await
            .unwrap();
        assert_eq!((created.tickets[0].ticket.row, created.tickets[0].ticket.seat), (3, 4));

        let err = service
            .create(
                user.id,
                OrderFields {
                    tickets: Some(json!([
                        {"row": "front", "movie_session_id": session.id},
                        "A1",
                    ])),
                },
            )
            .await
            .unwrap_err();
        let ServiceError::Validation(errors) = err else {
            panic!("expected validation error, got {err:?}");
        };
        assert_eq!(
            serde_json::to_value(&errors).unwrap(),
            json!({"tickets": [
                {"row": ["A valid integer is required."], "seat": ["This field is required."]},
                {"non_field_errors": ["Invalid data. Expected a dictionary, but got str."]},
            ]})
        );

        let err = service
            .create(user.id, OrderFields { tickets: Some(json!({"row": 1})) })
            .await
            .unwrap_err();
        let ServiceError::Validation(errors) = err else {
            panic!("expected validation error, got {err:?}");
        };
        assert_eq!(
            errors.messages("tickets"),
            ["Expected a list of items but got type \"dict\"."]
        );
        assert_eq!(count_rows(&db).await, (1, 1));
    }

    #[tokio::test]
    async fn test_tickets_are_required() {
        let db = test_db().await;
        let user = insert_user(&db, "alice").await;
        let service = OrderService::new(db);

        let err = service
            .create(user.id, OrderFields::default())
            .await
            .unwrap_err();
        let ServiceError::Validation(errors) = err else {
            panic!("expected validation error, got {err:?}");
        };
        assert_eq!(errors.messages("tickets"), ["This field is required."]);
    }

    #[tokio::test]
    async fn test_same_seat_can_be_sold_twice() {
        let db = test_db().await;
        let hall = insert_hall(&db, "Blue", 10, 15).await;
        let movie = insert_movie(&db, "Heat", &[], &[]).await;
        let session = insert_session(&db, movie.id, hall.id, "2024-05-01 18:00").await;
        let alice = insert_user(&db, "alice").await;
        let bob = insert_user(&db, "bob").await;
        let service = OrderService::new(db.clone());

        for user in [&alice, &bob] {
            service
                .create(
                    user.id,
                    OrderFields {
                        tickets: Some(json!([ticket(4, 4, session.id)])),
                    },
                )
                .await
                .unwrap();
        }

        assert_eq!(count_rows(&db).await, (2, 2));
    }

    #[tokio::test]
    async fn test_list_is_scoped_and_paginated() {
        let db = test_db().await;
        let hall = insert_hall(&db, "Blue", 10, 15).await;
        let movie = insert_movie(&db, "Heat", &[], &[]).await;
        let session = insert_session(&db, movie.id, hall.id, "2024-05-01 18:00").await;
        let alice = insert_user(&db, "alice").await;
        let bob = insert_user(&db, "bob").await;
        let first = insert_order(&db, alice.id, session.id, &[(1, 1)]).await;
        let second = insert_order(&db, alice.id, session.id, &[(1, 2)]).await;
        insert_order(&db, bob.id, session.id, &[(1, 3)]).await;
        let service = OrderService::new(db);

        let page = service.list_for_user(alice.id, 1, 1).await.unwrap();
        assert_eq!(page.total_count, 2);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].order.id, second.id);
        assert!(page.has_next());
        assert!(!page.has_previous());

        let page = service.list_for_user(alice.id, 2, 1).await.unwrap();
        assert_eq!(page.items[0].order.id, first.id);
        assert!(!page.has_next());

        assert!(matches!(
            service.list_for_user(alice.id, 3, 1).await,
            Err(ServiceError::InvalidPage(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_history_has_one_page() {
        let db = test_db().await;
        let user = insert_user(&db, "alice").await;
        let service = OrderService::new(db);

        let page = service.list_for_user(user.id, 1, 1).await.unwrap();
        assert_eq!(page.total_count, 0);
        assert!(page.items.is_empty());
    }

    #[tokio::test]
    async fn test_other_users_orders_are_hidden() {
        let db = test_db().await;
        let hall = insert_hall(&db, "Blue", 10, 15).await;
        let movie = insert_movie(&db, "Heat", &[], &[]).await;
        let session = insert_session(&db, movie.id, hall.id, "2024-05-01 18:00").await;
        let alice = insert_user(&db, "alice").await;
        let bob = insert_user(&db, "bob").await;
        let order = insert_order(&db, alice.id, session.id, &[(1, 1)]).await;
        let service = OrderService::new(db.clone());

        assert!(matches!(
            service.get_for_user(bob.id, order.id).await,
            Err(ServiceError::NotFound { .. })
        ));
        assert!(matches!(
            service.delete_for_user(bob.id, order.id).await,
            Err(ServiceError::NotFound { .. })
        ));

        service.delete_for_user(alice.id, order.id).await.unwrap();
        assert_eq!(count_rows(&db).await, (0, 0));
    }
}

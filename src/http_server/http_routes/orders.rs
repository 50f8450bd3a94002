use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;

use crate::http_server::{
    auth::CurrentUser,
    error::ApiResult,
    http_routes::body::WriteBody,
    representation::{OrderRepr, Page},
    state::AppState,
};
use crate::services::error::ServiceError;
use crate::services::order::{OrderFields, OrderService};

pub const ORDERS_PATH: &str = "/api/cinema/orders/";

#[derive(Debug, Default, Deserialize)]
pub struct OrderListParams {
    page: Option<String>,
}

impl OrderListParams {
    /// 1 when absent. Anything but a positive integer is an invalid page.
    fn page(&self) -> Result<u64, ServiceError> {
        match self.page.as_deref().map(str::trim) {
            None | Some("") => Ok(1),
            Some(raw) => raw
                .parse::<u64>()
                .ok()
                .filter(|page| *page > 0)
                .ok_or_else(|| ServiceError::InvalidPage(raw.to_string())),
        }
    }
}

pub async fn list_orders(
    State(app_state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Query(params): Query<OrderListParams>,
) -> ApiResult<Json<Page<OrderRepr>>> {
    let page = params.page()?;
    let result = OrderService::new(app_state.db.clone())
        .list_for_user(user.id, page, app_state.orders_page_size)
        .await?;
    Ok(Json(Page::from_result(ORDERS_PATH, &result, |order| {
        OrderRepr::from(order)
    })))
}

pub async fn create_order(
    State(app_state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    WriteBody(fields): WriteBody<OrderFields>,
) -> ApiResult<(StatusCode, Json<OrderRepr>)> {
    let order = OrderService::new(app_state.db.clone())
        .create(user.id, fields)
        .await?;
    Ok((StatusCode::CREATED, Json(OrderRepr::from(&order))))
}

pub async fn get_order(
    State(app_state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<Json<OrderRepr>> {
    let order = OrderService::new(app_state.db.clone())
        .get_for_user(user.id, id)
        .await?;
    Ok(Json(OrderRepr::from(&order)))
}

pub async fn delete_order(
    State(app_state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    OrderService::new(app_state.db.clone())
        .delete_for_user(user.id, id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

//! Web Order API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use shared::models::{
    CreateOrderRequest, MarkPaidRequest, Order, OrderPage, OrderStatus, PlacedOrder,
    UpdateOrderStatusRequest,
};

use crate::api::{AppJson, pagination};
use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::utils::AppResult;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<OrderStatus>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Checkout; the order belongs to the authenticated user
pub async fn create(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    AppJson(payload): AppJson<CreateOrderRequest>,
) -> AppResult<(StatusCode, Json<PlacedOrder<Order>>)> {
    let placed = state.web_orders.create(payload, &current_user.id).await?;
    Ok((StatusCode::CREATED, Json(placed)))
}

pub async fn list(
    State(state): State<ServerState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<OrderPage>> {
    let (page, limit) = pagination(query.page, query.limit);
    let orders = state.web_orders.list(query.status, page, limit).await?;
    Ok(Json(orders))
}

pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Order>> {
    let order = state.web_orders.get(id).await?;
    Ok(Json(order))
}

pub async fn update_status(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Path(id): Path<i64>,
    AppJson(payload): AppJson<UpdateOrderStatusRequest>,
) -> AppResult<Json<Order>> {
    let order = state
        .web_orders
        .update_status(id, payload.status, Some(&current_user.id))
        .await?;
    Ok(Json(order))
}

pub async fn mark_paid(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    AppJson(payload): AppJson<MarkPaidRequest>,
) -> AppResult<Json<Order>> {
    let order = state
        .web_orders
        .mark_paid(id, payload.payment_reference)
        .await?;
    Ok(Json(order))
}

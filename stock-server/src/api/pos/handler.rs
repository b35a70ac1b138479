//! POS API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use shared::models::{
    CreatePosOrderRequest, PlacedOrder, PosOrder, PosOrderPage, UpdatePosPaymentRequest,
};

use crate::api::{AppJson, pagination};
use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::utils::AppResult;
use crate::utils::time::parse_date;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// Business day, YYYY-MM-DD
    pub date: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

pub async fn create(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    AppJson(payload): AppJson<CreatePosOrderRequest>,
) -> AppResult<(StatusCode, Json<PlacedOrder<PosOrder>>)> {
    let placed = state.pos.process(payload, &current_user.id).await?;
    Ok((StatusCode::CREATED, Json(placed)))
}

pub async fn list(
    State(state): State<ServerState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<PosOrderPage>> {
    let date = query.date.as_deref().map(parse_date).transpose()?;
    let (page, limit) = pagination(query.page, query.limit);
    let orders = state.pos.list(date, page, limit).await?;
    Ok(Json(orders))
}

pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<PosOrder>> {
    let order = state.pos.get(id).await?;
    Ok(Json(order))
}

pub async fn update_payment(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    AppJson(payload): AppJson<UpdatePosPaymentRequest>,
) -> AppResult<Json<PosOrder>> {
    let order = state.pos.update_payment(id, payload).await?;
    Ok(Json(order))
}

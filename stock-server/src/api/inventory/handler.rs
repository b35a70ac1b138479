//! Inventory API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use shared::models::{
    AddStockRequest, AdjustInventoryRequest, InventoryLogEntry, InventoryLogPage,
    InventoryLogType, InventoryRecord, LedgerVerification,
};

use crate::api::{AppJson, pagination};
use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::db::repository::inventory_log::LogFilter;
use crate::inventory::{MutationOutcome, normalize_variant_key};
use crate::utils::AppResult;
use crate::utils::time::{day_end_millis, day_start_millis, parse_date};
use crate::utils::validation::{MAX_SHORT_TEXT_LEN, validate_optional_text};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    #[serde(default)]
    pub low_stock_only: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantQuery {
    pub variant_key: Option<String>,
}

impl VariantQuery {
    fn key(self) -> AppResult<Option<String>> {
        validate_optional_text(&self.variant_key, "variantKey", MAX_SHORT_TEXT_LEN)?;
        Ok(normalize_variant_key(self.variant_key))
    }
}

/// Log query filters; dates are YYYY-MM-DD in the business timezone, end day inclusive
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogQuery {
    pub product_id: Option<i64>,
    pub variant_key: Option<String>,
    #[serde(rename = "type")]
    pub log_type: Option<InventoryLogType>,
    pub reference: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Record after a change, with the log entry that explains it
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockUpdateResponse {
    pub inventory: InventoryRecord,
    pub log: InventoryLogEntry,
}

impl From<MutationOutcome> for StockUpdateResponse {
    fn from(outcome: MutationOutcome) -> Self {
        Self {
            inventory: outcome.record,
            log: outcome.entry,
        }
    }
}

pub async fn list(
    State(state): State<ServerState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<InventoryRecord>>> {
    let records = state.inventory.list(query.low_stock_only).await?;
    Ok(Json(records))
}

pub async fn get_record(
    State(state): State<ServerState>,
    Path(product_id): Path<i64>,
    Query(query): Query<VariantQuery>,
) -> AppResult<Json<InventoryRecord>> {
    let variant_key = query.key()?;
    let record = state
        .inventory
        .get_record(product_id, variant_key.as_deref())
        .await?;
    Ok(Json(record))
}

pub async fn add_stock(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Path(product_id): Path<i64>,
    Query(query): Query<VariantQuery>,
    AppJson(payload): AppJson<AddStockRequest>,
) -> AppResult<(StatusCode, Json<StockUpdateResponse>)> {
    let variant_key = query.key()?;
    let outcome = state
        .inventory
        .add_stock(product_id, variant_key, payload, Some(current_user.id))
        .await?;
    Ok((StatusCode::CREATED, Json(outcome.into())))
}

pub async fn adjust(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Path(product_id): Path<i64>,
    Query(query): Query<VariantQuery>,
    AppJson(payload): AppJson<AdjustInventoryRequest>,
) -> AppResult<Json<StockUpdateResponse>> {
    let variant_key = query.key()?;
    let outcome = state
        .inventory
        .adjust(product_id, variant_key, payload, Some(current_user.id))
        .await?;
    Ok(Json(outcome.into()))
}

pub async fn verify(
    State(state): State<ServerState>,
    Path(product_id): Path<i64>,
    Query(query): Query<VariantQuery>,
) -> AppResult<Json<LedgerVerification>> {
    let variant_key = query.key()?;
    let verification = state
        .inventory
        .verify_ledger(product_id, variant_key.as_deref())
        .await?;
    Ok(Json(verification))
}

pub async fn query_logs(
    State(state): State<ServerState>,
    Query(query): Query<LogQuery>,
) -> AppResult<Json<InventoryLogPage>> {
    let tz = state.config.timezone;
    let start = query
        .start_date
        .as_deref()
        .map(parse_date)
        .transpose()?
        .map(|d| day_start_millis(d, tz));
    let end = query
        .end_date
        .as_deref()
        .map(parse_date)
        .transpose()?
        .map(|d| day_end_millis(d, tz));

    let filter = LogFilter {
        product_id: query.product_id,
        variant_key: normalize_variant_key(query.variant_key),
        log_type: query.log_type,
        reference: query.reference,
        start,
        end,
    };
    let (page, limit) = pagination(query.page, query.limit);
    let logs = state.inventory.query_logs(&filter, page, limit).await?;
    Ok(Json(logs))
}

//! Statistics API Handlers

use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;
use shared::models::{CombinedSalesStats, StatsPeriod};

use crate::core::ServerState;
use crate::utils::AppResult;
use crate::utils::time::parse_date;

/// `period` or an explicit `startDate`..`endDate` range (both inclusive days)
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesQuery {
    pub period: Option<StatsPeriod>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

pub async fn sales(
    State(state): State<ServerState>,
    Query(query): Query<SalesQuery>,
) -> AppResult<Json<CombinedSalesStats>> {
    let start_date = query.start_date.as_deref().map(parse_date).transpose()?;
    let end_date = query.end_date.as_deref().map(parse_date).transpose()?;
    let stats = state
        .statistics
        .combined_stats(query.period, start_date, end_date)
        .await?;
    Ok(Json(stats))
}

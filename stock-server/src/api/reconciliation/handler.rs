//! Reconciliation API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use shared::models::{ReconciliationIssue, ReconciliationStatus, ResolveIssueRequest};

use crate::api::AppJson;
use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::utils::AppResult;
use crate::utils::validation::{MAX_NOTE_LEN, validate_required_text};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<ReconciliationStatus>,
}

pub async fn list(
    State(state): State<ServerState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<ReconciliationIssue>>> {
    let issues = state.reconciliation.list(query.status).await?;
    Ok(Json(issues))
}

pub async fn resolve(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Path(id): Path<i64>,
    AppJson(payload): AppJson<ResolveIssueRequest>,
) -> AppResult<Json<ReconciliationIssue>> {
    validate_required_text(&payload.note, "note", MAX_NOTE_LEN)?;
    let issue = state
        .reconciliation
        .resolve(id, payload.note.trim(), &current_user.id)
        .await?;
    Ok(Json(issue))
}

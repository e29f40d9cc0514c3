use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use tracing::info;

use crate::assessment::handlers::require_assessment;
use crate::errors::AppError;
use crate::report::export::{export_report, ExportedReport};
use crate::report::paginate::{paginate, Page};
use crate::report::sections::{build_sections, OrderedSection, ReportType};
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportResponse {
    pub assessment_id: String,
    pub report_type: ReportType,
    pub title: &'static str,
    pub sections: Vec<OrderedSection>,
    pub pages: Vec<Page>,
}

async fn build_report(
    state: &AppState,
    assessment_id: &str,
    raw_report_type: &str,
) -> Result<ReportResponse, AppError> {
    let report_type: ReportType = raw_report_type.parse().map_err(AppError::Validation)?;
    let assessment = require_assessment(state.store.as_ref(), assessment_id).await?;

    let categories = state.store.list_categories().await?;
    let questions = state.store.list_questions().await?;
    let responses = state.store.list_responses(&assessment.id).await?;

    let sections = build_sections(&state.resolver, report_type, &categories, &questions, &responses);

    let page_config = state.page_config.clone();
    let to_paginate = sections.clone();
    let pages = tokio::task::spawn_blocking(move || paginate(&to_paginate, &page_config))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("spawn_blocking failed in pagination: {e}")))?;

    info!(
        assessment_id = %assessment.id,
        report_type = %report_type,
        sections = sections.len(),
        pages = pages.len(),
        "Built report"
    );

    Ok(ReportResponse {
        assessment_id: assessment.id,
        report_type,
        title: report_type.title(),
        sections,
        pages,
    })
}

/// GET /api/v1/assessments/:id/reports/:report_type
pub async fn handle_get_report(
    State(state): State<AppState>,
    Path((assessment_id, report_type)): Path<(String, String)>,
) -> Result<Json<ReportResponse>, AppError> {
    Ok(Json(build_report(&state, &assessment_id, &report_type).await?))
}

/// POST /api/v1/assessments/:id/reports/:report_type/export
pub async fn handle_export_report(
    State(state): State<AppState>,
    Path((assessment_id, report_type)): Path<(String, String)>,
) -> Result<Json<ExportedReport>, AppError> {
    let report = build_report(&state, &assessment_id, &report_type).await?;
    let exported = export_report(
        state.snapshots.as_ref(),
        &report.assessment_id,
        report.report_type,
        &report.pages,
    )
    .await?;
    Ok(Json(exported))
}

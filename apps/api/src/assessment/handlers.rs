use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use tracing::{info, warn};

use crate::assessment::cache::{merge_server_responses, ResponseSelections};
use crate::assessment::classifier::classify;
use crate::assessment::completion::{completion, Completion};
use crate::assessment::progress::{
    compute_progress, overall_progress, reconcile_progress, CategoryProgress, ReconciledProgress,
};
use crate::assessment::store::AssessmentStore;
use crate::assessment::sync::{push_progress, save_response};
use crate::errors::AppError;
use crate::models::assessment::{AssessmentResponseRow, AssessmentRow, ResponseInput};
use crate::models::catalog::{CategoryRow, QuestionRow};
use crate::state::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedCategoriesResponse {
    pub tier_categories: Vec<CategoryRow>,
    pub gap_categories: Vec<CategoryRow>,
    /// Category ids in the order the guided flow visits them.
    pub step_order: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryQuestionsResponse {
    pub category_id: String,
    /// Name of the resolver stage that produced `questions`, if any did.
    pub strategy: Option<String>,
    pub degraded: bool,
    pub questions: Vec<QuestionRow>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressResponse {
    pub assessment_id: String,
    pub categories: Vec<CategoryProgress>,
    pub overall: Completion,
    pub percentage: u8,
    pub reconciled: ReconciledProgress,
    /// Cached answers storage has not confirmed yet.
    pub pending_question_ids: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryCompletionResponse {
    pub assessment_id: String,
    pub category_id: String,
    #[serde(flatten)]
    pub completion: Completion,
    pub percentage: u8,
    pub complete: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSyncResponse {
    pub assessment_id: String,
    pub percentage: u8,
}

pub(crate) async fn require_assessment(
    store: &dyn AssessmentStore,
    assessment_id: &str,
) -> Result<AssessmentRow, AppError> {
    store
        .get_assessment(assessment_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Assessment {assessment_id} not found")))
}

/// Cached selections merged with the server's responses. A cache outage degrades to the
/// server view alone.
async fn local_selections(
    state: &AppState,
    assessment_id: &str,
    server: &[AssessmentResponseRow],
) -> ResponseSelections {
    match state.cache.merge(assessment_id, server).await {
        Ok(selections) => selections,
        Err(e) => {
            warn!(assessment_id, "Response cache unavailable, using server responses only: {e}");
            let mut selections = ResponseSelections::new();
            merge_server_responses(&mut selections, assessment_id, server);
            selections
        }
    }
}

async fn load_progress(state: &AppState, assessment: &AssessmentRow) -> Result<ProgressResponse, AppError> {
    let categories = state.store.list_categories().await?;
    let questions = state.store.list_questions().await?;
    let responses = state.store.list_responses(&assessment.id).await?;
    let local = local_selections(state, &assessment.id, &responses).await;

    let progress = compute_progress(
        &state.resolver,
        &categories,
        &questions,
        &assessment.id,
        &responses,
        &local,
    );
    let percentage = progress.percentage();

    let mut pending_question_ids: Vec<String> = local
        .iter()
        .filter(|(_, entry)| !entry.is_confirmed())
        .map(|(question_id, _)| question_id.clone())
        .collect();
    pending_question_ids.sort();

    Ok(ProgressResponse {
        assessment_id: assessment.id.clone(),
        categories: progress.categories,
        overall: progress.overall,
        percentage,
        reconciled: reconcile_progress(percentage, assessment.progress_percentage),
        pending_question_ids,
    })
}

/// Recomputes the overall percentage and persists it in the background.
async fn refresh_progress(state: &AppState, assessment_id: &str) -> Result<u8, AppError> {
    let categories = state.store.list_categories().await?;
    let questions = state.store.list_questions().await?;
    let responses = state.store.list_responses(assessment_id).await?;
    let local = local_selections(state, assessment_id, &responses).await;

    let percentage = overall_progress(
        &state.resolver,
        &categories,
        &questions,
        assessment_id,
        &responses,
        &local,
    );
    push_progress(
        state.store.clone(),
        state.retry_policy,
        assessment_id.to_string(),
        percentage,
    );
    Ok(percentage)
}

/// GET /api/v1/categories/classified
pub async fn handle_classified_categories(
    State(state): State<AppState>,
) -> Result<Json<ClassifiedCategoriesResponse>, AppError> {
    let categories = state.store.list_categories().await?;
    let classified = classify(&categories);
    let step_order = classified.step_order().iter().map(|c| c.id.clone()).collect();

    Ok(Json(ClassifiedCategoriesResponse {
        tier_categories: classified.tier_categories,
        gap_categories: classified.gap_categories,
        step_order,
    }))
}

/// GET /api/v1/categories/:id/questions
pub async fn handle_category_questions(
    State(state): State<AppState>,
    Path(category_id): Path<String>,
) -> Result<Json<CategoryQuestionsResponse>, AppError> {
    let categories = state.store.list_categories().await?;
    let questions = state.store.list_questions().await?;
    let category = categories
        .iter()
        .find(|c| c.id == category_id)
        .ok_or_else(|| AppError::NotFound(format!("Category {category_id} not found")))?;

    let resolution = state.resolver.resolve(category, &questions, &categories);
    Ok(Json(CategoryQuestionsResponse {
        category_id: category.id.clone(),
        strategy: resolution.strategy.map(String::from),
        degraded: resolution.degraded,
        questions: resolution.questions.into_iter().cloned().collect(),
    }))
}

/// GET /api/v1/assessments/:id/progress
pub async fn handle_get_progress(
    State(state): State<AppState>,
    Path(assessment_id): Path<String>,
) -> Result<Json<ProgressResponse>, AppError> {
    let assessment = require_assessment(state.store.as_ref(), &assessment_id).await?;
    Ok(Json(load_progress(&state, &assessment).await?))
}

/// PUT /api/v1/assessments/:id/responses/:question_id
pub async fn handle_save_response(
    State(state): State<AppState>,
    Path((assessment_id, question_id)): Path<(String, String)>,
    Json(input): Json<ResponseInput>,
) -> Result<Json<AssessmentResponseRow>, AppError> {
    let assessment = require_assessment(state.store.as_ref(), &assessment_id).await?;
    let questions = state.store.list_questions().await?;
    let question = questions
        .iter()
        .find(|q| q.id == question_id)
        .ok_or_else(|| AppError::NotFound(format!("Question {question_id} not found")))?;

    let row = save_response(
        state.store.as_ref(),
        state.cache.as_ref(),
        state.retry_policy,
        &assessment,
        question,
        &input,
    )
    .await?;

    if let Err(e) = refresh_progress(&state, &assessment.id).await {
        warn!(assessment_id = %assessment.id, "Progress refresh after save failed: {e}");
    }
    Ok(Json(row))
}

/// GET /api/v1/assessments/:id/categories/:category_id/progress
pub async fn handle_category_progress(
    State(state): State<AppState>,
    Path((assessment_id, category_id)): Path<(String, String)>,
) -> Result<Json<CategoryCompletionResponse>, AppError> {
    let assessment = require_assessment(state.store.as_ref(), &assessment_id).await?;
    let categories = state.store.list_categories().await?;
    let questions = state.store.list_questions().await?;
    let category = categories
        .iter()
        .find(|c| c.id == category_id)
        .ok_or_else(|| AppError::NotFound(format!("Category {category_id} not found")))?;

    let responses = state.store.list_responses(&assessment.id).await?;
    let local = local_selections(&state, &assessment.id, &responses).await;
    let result = completion(
        &state.resolver,
        category,
        &questions,
        &categories,
        &assessment.id,
        &responses,
        &local,
    );

    Ok(Json(CategoryCompletionResponse {
        assessment_id: assessment.id,
        category_id: category.id.clone(),
        percentage: result.percentage(),
        complete: result.is_complete(),
        completion: result,
    }))
}

/// DELETE /api/v1/assessments/:id/cache
///
/// Drops every cached answer for the assessment, including unsaved local edits.
pub async fn handle_clear_cache(
    State(state): State<AppState>,
    Path(assessment_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let assessment = require_assessment(state.store.as_ref(), &assessment_id).await?;
    state.cache.clear(&assessment.id).await?;
    info!(assessment_id = %assessment.id, "Cleared local response cache");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/assessments/:id/progress/sync
///
/// Responds as soon as the percentage is computed; the write happens in the background.
pub async fn handle_sync_progress(
    State(state): State<AppState>,
    Path(assessment_id): Path<String>,
) -> Result<(StatusCode, Json<ProgressSyncResponse>), AppError> {
    let assessment = require_assessment(state.store.as_ref(), &assessment_id).await?;
    let percentage = refresh_progress(&state, &assessment.id).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(ProgressSyncResponse {
            assessment_id: assessment.id,
            percentage,
        }),
    ))
}

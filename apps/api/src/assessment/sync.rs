//! Response save flow and progress push.
//!
//! Saves are optimistic: the answer lands in the local cache first, then storage is
//! written with bounded retries. A terminal storage failure is reported to the caller
//! but never rolls back the cached answer.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::assessment::cache::{CachedResponse, LocalResponseCache};
use crate::assessment::store::AssessmentStore;
use crate::errors::AppError;
use crate::models::assessment::{
    AssessmentResponseRow, AssessmentRow, AssessmentStatus, ResponseInput,
};
use crate::models::catalog::{QuestionRow, QuestionType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry; doubles for each later retry.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Backoff before retry number `retry` (1-based): 500ms, 1000ms, ...
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(retry.saturating_sub(1))
    }
}

/// Runs `op` until it succeeds, fails permanently, or the retries run out.
pub async fn with_retry<T, F, Fut>(policy: RetryPolicy, label: &str, mut op: F) -> Result<T, AppError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AppError>>,
{
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_transient() => return Err(e),
            Err(e) if attempt > policy.max_retries => {
                return Err(AppError::SaveFailed {
                    attempts: attempt,
                    message: e.to_string(),
                });
            }
            Err(e) => {
                let delay = policy.delay_for(attempt);
                warn!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "{label} failed, retrying: {e}"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Checks that the answer carries the field matching the question type and respects the
/// question's validation rules (`options` for select, `min`/`max` for numeric).
pub fn validate_response(question: &QuestionRow, input: &ResponseInput) -> Result<(), AppError> {
    let question_type = question.question_type().ok_or_else(|| {
        AppError::Validation(format!(
            "Question {} has unknown type '{}'",
            question.id, question.question_type_raw
        ))
    })?;
    let rules = question.validation_rules.as_ref();

    match question_type {
        QuestionType::Boolean => {
            if input.response.is_none() {
                return Err(missing_field(question, question_type, "response"));
            }
        }
        QuestionType::Text => {
            if input.text_response.as_deref().map_or(true, |t| t.trim().is_empty()) {
                return Err(missing_field(question, question_type, "textResponse"));
            }
        }
        QuestionType::Numeric => {
            let value = input
                .numeric_response
                .ok_or_else(|| missing_field(question, question_type, "numericResponse"))?;
            if !value.is_finite() {
                return Err(AppError::Validation("numericResponse must be finite".to_string()));
            }
            if let Some(min) = rules.and_then(|r| r.get("min")).and_then(Value::as_f64) {
                if value < min {
                    return Err(AppError::Validation(format!("Value {value} is below minimum {min}")));
                }
            }
            if let Some(max) = rules.and_then(|r| r.get("max")).and_then(Value::as_f64) {
                if value > max {
                    return Err(AppError::Validation(format!("Value {value} is above maximum {max}")));
                }
            }
        }
        QuestionType::Select => {
            let choice = input
                .select_response
                .as_deref()
                .filter(|s| !s.is_empty())
                .ok_or_else(|| missing_field(question, question_type, "selectResponse"))?;
            if let Some(options) = rules.and_then(|r| r.get("options")).and_then(Value::as_array) {
                if !options.iter().any(|o| o.as_str() == Some(choice)) {
                    return Err(AppError::Validation(format!(
                        "'{choice}' is not an allowed option"
                    )));
                }
            }
        }
    }
    Ok(())
}

fn missing_field(question: &QuestionRow, question_type: QuestionType, field: &str) -> AppError {
    AppError::Validation(format!(
        "Question {} ({}) requires {field}",
        question.id,
        question_type.as_str()
    ))
}

fn cached_from_input(input: &ResponseInput) -> CachedResponse {
    CachedResponse {
        response: input.response,
        text_response: input.text_response.clone(),
        numeric_response: input.numeric_response,
        select_response: input.select_response.clone(),
        notes: input.notes.clone(),
        response_id: None,
        cached_at: Some(Utc::now()),
    }
}

/// Saves one answer: cache first, then storage with retries.
pub async fn save_response(
    store: &dyn AssessmentStore,
    cache: &dyn LocalResponseCache,
    policy: RetryPolicy,
    assessment: &AssessmentRow,
    question: &QuestionRow,
    input: &ResponseInput,
) -> Result<AssessmentResponseRow, AppError> {
    validate_response(question, input)?;

    // A cache outage must not block the authoritative write.
    if let Err(e) = cache
        .set(&assessment.id, &question.id, cached_from_input(input))
        .await
    {
        warn!(assessment_id = %assessment.id, question_id = %question.id, "Optimistic cache write failed: {e}");
    }

    let row = with_retry(policy, "Response save", || {
        store.upsert_response(&assessment.id, &question.id, input)
    })
    .await?;

    if let Err(e) = cache
        .set(&assessment.id, &question.id, CachedResponse::from_server(&row))
        .await
    {
        warn!(assessment_id = %assessment.id, "Could not record confirmation in cache: {e}");
    }

    if assessment.status() == Some(AssessmentStatus::Planned) {
        match store
            .update_status(&assessment.id, AssessmentStatus::InProgress)
            .await
        {
            Ok(()) => info!(assessment_id = %assessment.id, "Assessment moved to in_progress"),
            Err(e) => warn!(assessment_id = %assessment.id, "Could not update assessment status: {e}"),
        }
    }

    Ok(row)
}

/// Pushes the locally computed percentage to storage without blocking the caller.
///
/// Failures are logged once retries are exhausted; the returned handle is only needed by
/// callers that want to observe completion.
pub fn push_progress(
    store: Arc<dyn AssessmentStore>,
    policy: RetryPolicy,
    assessment_id: String,
    percentage: u8,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let result = with_retry(policy, "Progress push", || {
            store.update_progress(&assessment_id, percentage)
        })
        .await;

        match result {
            Ok(()) => info!(assessment_id = %assessment_id, percentage, "Persisted assessment progress"),
            Err(e) => warn!(assessment_id = %assessment_id, percentage, "Progress push failed: {e}"),
        }
    })
}

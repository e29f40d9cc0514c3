//! Storage port for categories, questions, responses and assessments.
//!
//! `AppState` carries an `Arc<dyn AssessmentStore>`; production uses Postgres, tests use
//! the in-memory double in [`testing`].

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::assessment::{
    AssessmentResponseRow, AssessmentRow, AssessmentStatus, ResponseInput,
};
use crate::models::catalog::{CategoryRow, QuestionRow};

#[async_trait]
pub trait AssessmentStore: Send + Sync {
    async fn list_categories(&self) -> Result<Vec<CategoryRow>, AppError>;

    async fn list_questions(&self) -> Result<Vec<QuestionRow>, AppError>;

    async fn list_responses(&self, assessment_id: &str)
        -> Result<Vec<AssessmentResponseRow>, AppError>;

    async fn get_assessment(&self, assessment_id: &str) -> Result<Option<AssessmentRow>, AppError>;

    /// Updates the existing response for `(assessment_id, question_id)` or inserts one.
    /// Last write wins.
    async fn upsert_response(
        &self,
        assessment_id: &str,
        question_id: &str,
        input: &ResponseInput,
    ) -> Result<AssessmentResponseRow, AppError>;

    async fn update_progress(&self, assessment_id: &str, percentage: u8) -> Result<(), AppError>;

    async fn update_status(
        &self,
        assessment_id: &str,
        status: AssessmentStatus,
    ) -> Result<(), AppError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Postgres
// ────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct PgAssessmentStore {
    pool: PgPool,
}

impl PgAssessmentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AssessmentStore for PgAssessmentStore {
    async fn list_categories(&self) -> Result<Vec<CategoryRow>, AppError> {
        Ok(sqlx::query_as::<_, CategoryRow>(
            "SELECT id, name, description, order_index FROM categories ORDER BY order_index, id",
        )
        .fetch_all(&self.pool)
        .await?)
    }

    async fn list_questions(&self) -> Result<Vec<QuestionRow>, AppError> {
        Ok(sqlx::query_as::<_, QuestionRow>(
            r#"
            SELECT id, category_id, text, description, order_index,
                   question_type, validation_rules, impacts_tier
            FROM questions
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?)
    }

    async fn list_responses(
        &self,
        assessment_id: &str,
    ) -> Result<Vec<AssessmentResponseRow>, AppError> {
        Ok(sqlx::query_as::<_, AssessmentResponseRow>(
            "SELECT * FROM assessment_responses WHERE assessment_id = $1 ORDER BY updated_at ASC",
        )
        .bind(assessment_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn get_assessment(&self, assessment_id: &str) -> Result<Option<AssessmentRow>, AppError> {
        Ok(sqlx::query_as::<_, AssessmentRow>(
            r#"
            SELECT id, agency_id, status, progress_percentage, tier_level, started_at
            FROM assessments
            WHERE id = $1
            "#,
        )
        .bind(assessment_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn upsert_response(
        &self,
        assessment_id: &str,
        question_id: &str,
        input: &ResponseInput,
    ) -> Result<AssessmentResponseRow, AppError> {
        // Uniqueness of (assessment_id, question_id) is enforced here, not by a constraint.
        let existing: Option<String> = sqlx::query_scalar(
            r#"
            SELECT id FROM assessment_responses
            WHERE assessment_id = $1 AND question_id = $2
            ORDER BY updated_at DESC
            LIMIT 1
            "#,
        )
        .bind(assessment_id)
        .bind(question_id)
        .fetch_optional(&self.pool)
        .await?;

        let row = match existing {
            Some(id) => {
                sqlx::query_as::<_, AssessmentResponseRow>(
                    r#"
                    UPDATE assessment_responses
                    SET response = $1, text_response = $2, numeric_response = $3,
                        select_response = $4, notes = $5, updated_at = NOW()
                    WHERE id = $6
                    RETURNING *
                    "#,
                )
                .bind(input.response)
                .bind(&input.text_response)
                .bind(input.numeric_response)
                .bind(&input.select_response)
                .bind(&input.notes)
                .bind(&id)
                .fetch_one(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, AssessmentResponseRow>(
                    r#"
                    INSERT INTO assessment_responses
                        (id, assessment_id, question_id, response, text_response,
                         numeric_response, select_response, notes, updated_at)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW())
                    RETURNING *
                    "#,
                )
                .bind(Uuid::new_v4().to_string())
                .bind(assessment_id)
                .bind(question_id)
                .bind(input.response)
                .bind(&input.text_response)
                .bind(input.numeric_response)
                .bind(&input.select_response)
                .bind(&input.notes)
                .fetch_one(&self.pool)
                .await?
            }
        };

        info!(
            assessment_id,
            question_id,
            response_id = %row.id,
            "Stored assessment response"
        );
        Ok(row)
    }

    async fn update_progress(&self, assessment_id: &str, percentage: u8) -> Result<(), AppError> {
        let result =
            sqlx::query("UPDATE assessments SET progress_percentage = $1 WHERE id = $2")
                .bind(i32::from(percentage))
                .bind(assessment_id)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Assessment {assessment_id} not found")));
        }
        Ok(())
    }

    async fn update_status(
        &self,
        assessment_id: &str,
        status: AssessmentStatus,
    ) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE assessments SET status = $1 WHERE id = $2")
            .bind(status.as_str())
            .bind(assessment_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Assessment {assessment_id} not found")));
        }
        Ok(())
    }
}

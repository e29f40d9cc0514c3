use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentStatus {
    Planned,
    InProgress,
    Completed,
}

impl AssessmentStatus {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "planned" => Some(AssessmentStatus::Planned),
            "in_progress" => Some(AssessmentStatus::InProgress),
            "completed" => Some(AssessmentStatus::Completed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AssessmentStatus::Planned => "planned",
            AssessmentStatus::InProgress => "in_progress",
            AssessmentStatus::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentRow {
    pub id: String,
    pub agency_id: String,
    pub status: String,
    /// Server-persisted snapshot of the response count; may lag behind live progress.
    pub progress_percentage: i32,
    pub tier_level: Option<i32>,
    pub started_at: DateTime<Utc>,
}

impl AssessmentRow {
    pub fn status(&self) -> Option<AssessmentStatus> {
        AssessmentStatus::parse(&self.status)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentResponseRow {
    pub id: String,
    pub assessment_id: String,
    pub question_id: String,
    pub response: Option<bool>,
    pub text_response: Option<String>,
    pub numeric_response: Option<f64>,
    pub select_response: Option<String>,
    pub notes: String,
    pub updated_at: DateTime<Utc>,
}

/// An answer as submitted by the client, before storage assigns it an id.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResponseInput {
    pub response: Option<bool>,
    pub text_response: Option<String>,
    pub numeric_response: Option<f64>,
    pub select_response: Option<String>,
    #[serde(default)]
    pub notes: String,
}

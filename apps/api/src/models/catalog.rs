use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRow {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub order_index: i32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    Boolean,
    Text,
    Numeric,
    Select,
}

impl QuestionType {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "boolean" => Some(QuestionType::Boolean),
            "text" => Some(QuestionType::Text),
            "numeric" => Some(QuestionType::Numeric),
            "select" => Some(QuestionType::Select),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::Boolean => "boolean",
            QuestionType::Text => "text",
            QuestionType::Numeric => "numeric",
            QuestionType::Select => "select",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuestionRow {
    pub id: String,
    pub category_id: String,
    pub text: String,
    pub description: Option<String>,
    pub order_index: Option<i32>,
    /// Stored as free text; see [`QuestionRow::question_type`].
    #[serde(rename = "questionType")]
    #[sqlx(rename = "question_type")]
    pub question_type_raw: String,
    pub validation_rules: Option<Value>,
    pub impacts_tier: Option<bool>,
}

impl QuestionRow {
    pub fn question_type(&self) -> Option<QuestionType> {
        QuestionType::parse(&self.question_type_raw)
    }
}

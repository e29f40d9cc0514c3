//! Local response cache: per-assessment mirror of in-flight and confirmed answers.
//!
//! The cache masks storage latency and keeps unconfirmed input alive across reloads.
//! It is never the source of truth for confirmed answers, but an unconfirmed edit stays
//! authoritative until storage has a row at least as recent as the edit.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::models::assessment::AssessmentResponseRow;

/// A cached answer, keyed by question id within one assessment.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CachedResponse {
    pub response: Option<bool>,
    pub text_response: Option<String>,
    pub numeric_response: Option<f64>,
    pub select_response: Option<String>,
    #[serde(default)]
    pub notes: String,
    /// Set once storage has confirmed the write.
    pub response_id: Option<String>,
    /// When the answer was written locally, or the server row's `updated_at` once
    /// confirmed. Entries written before this field existed carry `None`.
    #[serde(default)]
    pub cached_at: Option<DateTime<Utc>>,
}

impl CachedResponse {
    pub fn from_server(row: &AssessmentResponseRow) -> Self {
        Self {
            response: row.response,
            text_response: row.text_response.clone(),
            numeric_response: row.numeric_response,
            select_response: row.select_response.clone(),
            notes: row.notes.clone(),
            response_id: Some(row.id.clone()),
            cached_at: Some(row.updated_at),
        }
    }

    pub fn is_confirmed(&self) -> bool {
        self.response_id.is_some()
    }

    /// Whether `row` may replace this entry.
    ///
    /// Confirmed entries always take the server's view. An unconfirmed edit is only
    /// replaced by a row written at or after the edit.
    fn yields_to(&self, row: &AssessmentResponseRow) -> bool {
        match (self.is_confirmed(), self.cached_at) {
            (true, _) | (false, None) => true,
            (false, Some(cached_at)) => row.updated_at >= cached_at,
        }
    }
}

/// All cached answers for one assessment, keyed by question id.
pub type ResponseSelections = HashMap<String, CachedResponse>;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Cache entry is not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub fn cache_key(assessment_id: &str) -> String {
    format!("responseSelections_{assessment_id}")
}

/// Applies the server's view of each question to the cached selections.
///
/// Responses belonging to other assessments are ignored, and newer unconfirmed edits
/// are kept (see [`CachedResponse::yields_to`]). Returns the question ids whose entries
/// were replaced.
pub fn merge_server_responses(
    selections: &mut ResponseSelections,
    assessment_id: &str,
    server: &[AssessmentResponseRow],
) -> Vec<String> {
    let mut applied = Vec::new();
    for row in server.iter().filter(|r| r.assessment_id == assessment_id) {
        if let Some(existing) = selections.get(&row.question_id) {
            if !existing.yields_to(row) {
                debug!(
                    assessment_id,
                    question_id = %row.question_id,
                    "Keeping unconfirmed local edit newer than server response"
                );
                continue;
            }
        }
        selections.insert(row.question_id.clone(), CachedResponse::from_server(row));
        if !applied.contains(&row.question_id) {
            applied.push(row.question_id.clone());
        }
    }
    applied
}

#[async_trait]
pub trait LocalResponseCache: Send + Sync {
    async fn get(&self, assessment_id: &str) -> Result<ResponseSelections, CacheError>;

    async fn set(
        &self,
        assessment_id: &str,
        question_id: &str,
        entry: CachedResponse,
    ) -> Result<(), CacheError>;

    /// Applies server-confirmed responses and returns the resulting selections.
    async fn merge(
        &self,
        assessment_id: &str,
        server: &[AssessmentResponseRow],
    ) -> Result<ResponseSelections, CacheError>;

    async fn clear(&self, assessment_id: &str) -> Result<(), CacheError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Redis adapter
// ────────────────────────────────────────────────────────────────────────────

/// Stores each assessment as a Redis hash: field = question id, value = JSON entry.
#[derive(Clone)]
pub struct RedisResponseCache {
    client: redis::Client,
}

impl RedisResponseCache {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection, CacheError> {
        Ok(self.client.get_multiplexed_async_connection().await?)
    }
}

#[async_trait]
impl LocalResponseCache for RedisResponseCache {
    async fn get(&self, assessment_id: &str) -> Result<ResponseSelections, CacheError> {
        let mut conn = self.connection().await?;
        let raw: HashMap<String, String> = conn.hgetall(cache_key(assessment_id)).await?;

        let mut selections = ResponseSelections::with_capacity(raw.len());
        for (question_id, json) in raw {
            selections.insert(question_id, serde_json::from_str(&json)?);
        }
        Ok(selections)
    }

    async fn set(
        &self,
        assessment_id: &str,
        question_id: &str,
        entry: CachedResponse,
    ) -> Result<(), CacheError> {
        let json = serde_json::to_string(&entry)?;
        let mut conn = self.connection().await?;
        conn.hset::<_, _, _, ()>(cache_key(assessment_id), question_id, json)
            .await?;
        Ok(())
    }

    async fn merge(
        &self,
        assessment_id: &str,
        server: &[AssessmentResponseRow],
    ) -> Result<ResponseSelections, CacheError> {
        let mut selections = self.get(assessment_id).await?;
        let applied = merge_server_responses(&mut selections, assessment_id, server);

        // Only replaced fields are written back; kept local edits are never touched.
        let fields = applied
            .iter()
            .filter_map(|question_id| selections.get(question_id).map(|e| (question_id, e)))
            .map(|(question_id, entry)| Ok((question_id.clone(), serde_json::to_string(entry)?)))
            .collect::<Result<Vec<(String, String)>, CacheError>>()?;

        if !fields.is_empty() {
            let mut conn = self.connection().await?;
            conn.hset_multiple::<_, _, _, ()>(cache_key(assessment_id), fields.as_slice())
                .await?;
            debug!(assessment_id, merged = fields.len(), "Merged server responses into Redis cache");
        }

        Ok(selections)
    }

    async fn clear(&self, assessment_id: &str) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        conn.del::<_, ()>(cache_key(assessment_id)).await?;
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::testing::InMemoryResponseCache;
    use super::*;

    fn server_row(id: &str, assessment_id: &str, question_id: &str, answer: bool) -> AssessmentResponseRow {
        AssessmentResponseRow {
            id: id.to_string(),
            assessment_id: assessment_id.to_string(),
            question_id: question_id.to_string(),
            response: Some(answer),
            text_response: None,
            numeric_response: None,
            select_response: None,
            notes: String::new(),
            updated_at: Utc::now(),
        }
    }

    fn unconfirmed(answer: bool) -> CachedResponse {
        CachedResponse {
            response: Some(answer),
            ..Default::default()
        }
    }

    fn edited_at(answer: bool, at: DateTime<Utc>) -> CachedResponse {
        CachedResponse {
            response: Some(answer),
            cached_at: Some(at),
            ..Default::default()
        }
    }

    #[test]
    fn test_cache_key_format() {
        assert_eq!(cache_key("42"), "responseSelections_42");
    }

    #[test]
    fn test_merge_server_wins_for_same_question() {
        let mut selections = ResponseSelections::new();
        selections.insert("q1".to_string(), unconfirmed(false));
        let applied = merge_server_responses(&mut selections, "a1", &[server_row("r1", "a1", "q1", true)]);

        assert_eq!(applied, vec!["q1".to_string()]);
        let entry = &selections["q1"];
        assert_eq!(entry.response, Some(true));
        assert!(entry.is_confirmed());
    }

    #[test]
    fn test_merge_keeps_unconfirmed_entries() {
        let mut selections = ResponseSelections::new();
        selections.insert("q2".to_string(), unconfirmed(true));
        merge_server_responses(&mut selections, "a1", &[server_row("r1", "a1", "q1", true)]);

        assert_eq!(selections.len(), 2);
        assert!(!selections["q2"].is_confirmed());
    }

    #[test]
    fn test_merge_keeps_edit_newer_than_stale_server_row() {
        // q1 was confirmed as "No"; the user changed it to "Yes" and the save failed.
        let mut stale = server_row("r1", "a1", "q1", false);
        stale.updated_at = Utc::now() - Duration::minutes(10);
        let mut selections = ResponseSelections::new();
        selections.insert("q1".to_string(), edited_at(true, Utc::now()));

        let applied = merge_server_responses(&mut selections, "a1", &[stale]);

        assert!(applied.is_empty());
        assert_eq!(selections["q1"].response, Some(true));
        assert!(!selections["q1"].is_confirmed());
    }

    #[test]
    fn test_merge_applies_server_row_newer_than_edit() {
        let mut selections = ResponseSelections::new();
        selections.insert(
            "q1".to_string(),
            edited_at(true, Utc::now() - Duration::minutes(10)),
        );

        merge_server_responses(&mut selections, "a1", &[server_row("r1", "a1", "q1", false)]);

        assert_eq!(selections["q1"].response, Some(false));
        assert!(selections["q1"].is_confirmed());
    }

    #[test]
    fn test_confirmed_entry_always_takes_server_view() {
        let mut confirmed = server_row("r1", "a1", "q1", true);
        let mut selections = ResponseSelections::new();
        selections.insert("q1".to_string(), CachedResponse::from_server(&confirmed));

        // Clock skew: the server row reports an older timestamp than the cached copy.
        confirmed.response = Some(false);
        confirmed.updated_at -= Duration::minutes(1);
        merge_server_responses(&mut selections, "a1", &[confirmed]);

        assert_eq!(selections["q1"].response, Some(false));
    }

    #[test]
    fn test_merge_ignores_other_assessments() {
        let mut selections = ResponseSelections::new();
        let applied = merge_server_responses(&mut selections, "a1", &[server_row("r1", "a2", "q1", true)]);
        assert!(applied.is_empty());
        assert!(selections.is_empty());
    }

    #[test]
    fn test_cached_response_json_shape() {
        let entry = CachedResponse {
            text_response: Some("Two teams".to_string()),
            response_id: Some("r9".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_value(&entry).expect("serializes");
        assert_eq!(json["textResponse"], "Two teams");
        assert_eq!(json["responseId"], "r9");

        let parsed: CachedResponse =
            serde_json::from_str(r#"{"response": true}"#).expect("notes defaults to empty");
        assert_eq!(parsed.notes, "");
        assert_eq!(parsed.cached_at, None);
    }

    #[tokio::test]
    async fn test_in_memory_cache_is_isolated_per_assessment() {
        let cache = InMemoryResponseCache::new();
        cache.set("a1", "q1", unconfirmed(true)).await.unwrap();
        cache.set("a2", "q1", unconfirmed(false)).await.unwrap();

        assert_eq!(cache.get("a1").await.unwrap()["q1"].response, Some(true));
        assert_eq!(cache.get("a2").await.unwrap()["q1"].response, Some(false));

        cache.clear("a1").await.unwrap();
        assert!(cache.get("a1").await.unwrap().is_empty());
        assert_eq!(cache.get("a2").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_in_memory_merge_returns_combined_view() {
        let cache = InMemoryResponseCache::new();
        cache.set("a1", "q2", unconfirmed(false)).await.unwrap();
        let merged = cache
            .merge("a1", &[server_row("r1", "a1", "q1", true)])
            .await
            .unwrap();

        assert_eq!(merged.len(), 2);
        assert!(merged["q1"].is_confirmed());
        assert_eq!(cache.get("a1").await.unwrap(), merged);
    }

    #[tokio::test]
    async fn test_in_memory_merge_preserves_failed_edit() {
        let cache = InMemoryResponseCache::new();
        let mut confirmed_no = server_row("r1", "a1", "q1", false);
        confirmed_no.updated_at = Utc::now() - Duration::minutes(5);
        cache
            .set("a1", "q1", CachedResponse::from_server(&confirmed_no))
            .await
            .unwrap();
        cache.set("a1", "q1", edited_at(true, Utc::now())).await.unwrap();

        let merged = cache.merge("a1", &[confirmed_no]).await.unwrap();

        assert_eq!(merged["q1"].response, Some(true));
        assert!(!merged["q1"].is_confirmed());
        assert_eq!(cache.get("a1").await.unwrap()["q1"].response, Some(true));
    }
}

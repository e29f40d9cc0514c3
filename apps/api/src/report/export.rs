//! Markdown snapshots of paginated reports, uploaded to S3.

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use serde::Serialize;
use tracing::info;

use crate::errors::AppError;
use crate::report::paginate::{Page, PageBlock};
use crate::report::sections::ReportType;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExportedReport {
    pub s3_key: String,
    pub page_count: usize,
    pub bytes: usize,
}

pub fn snapshot_key(assessment_id: &str, report_type: ReportType) -> String {
    format!("reports/{assessment_id}/{report_type}.md")
}

/// Renders pages as Markdown, one `## Page n` block per page.
pub fn render_markdown(assessment_id: &str, report_type: ReportType, pages: &[Page]) -> String {
    let mut md = format!("# {}\n\nAssessment: {assessment_id}\n", report_type.title());

    if pages.is_empty() {
        md.push_str("\n_No responses recorded._\n");
        return md;
    }

    for page in pages {
        md.push_str(&format!("\n## Page {} of {}\n", page.number, pages.len()));
        for block in &page.blocks {
            match block {
                PageBlock::Heading { .. } => {
                    if let Some(heading) = block.heading_text() {
                        md.push_str(&format!("\n### {heading}\n"));
                    }
                }
                PageBlock::Item(item) => {
                    md.push_str(&format!("\n**{}**\n\n", item.question_text));
                    md.push_str(&format!("Response: {}\n", item.response_text));
                    if !item.notes.trim().is_empty() {
                        md.push_str(&format!("\nNotes: {}\n", item.notes.trim()));
                    }
                }
            }
        }
    }
    md
}

/// Destination for rendered report snapshots.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn put(&self, key: &str, body: String) -> Result<(), AppError>;
}

pub struct S3SnapshotStore {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3SnapshotStore {
    pub fn new(client: aws_sdk_s3::Client, bucket: String) -> Self {
        Self { client, bucket }
    }
}

#[async_trait]
impl SnapshotStore for S3SnapshotStore {
    async fn put(&self, key: &str, body: String) -> Result<(), AppError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type("text/markdown; charset=utf-8")
            .body(ByteStream::from(body.into_bytes()))
            .send()
            .await
            .map_err(|e| AppError::S3(format!("upload of {key} failed: {e}")))?;

        info!("Uploaded report snapshot to s3://{}/{}", self.bucket, key);
        Ok(())
    }
}

pub async fn export_report(
    snapshots: &dyn SnapshotStore,
    assessment_id: &str,
    report_type: ReportType,
    pages: &[Page],
) -> Result<ExportedReport, AppError> {
    let markdown = render_markdown(assessment_id, report_type, pages);
    let s3_key = snapshot_key(assessment_id, report_type);
    let bytes = markdown.len();
    snapshots.put(&s3_key, markdown).await?;

    Ok(ExportedReport {
        s3_key,
        page_count: pages.len(),
        bytes,
    })
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;

    use tokio::sync::RwLock;

    use super::*;

    #[derive(Default)]
    pub struct InMemorySnapshotStore {
        pub objects: RwLock<HashMap<String, String>>,
    }

    #[async_trait]
    impl SnapshotStore for InMemorySnapshotStore {
        async fn put(&self, key: &str, body: String) -> Result<(), AppError> {
            self.objects.write().await.insert(key.to_string(), body);
            Ok(())
        }
    }
}

use std::sync::Arc;

use crate::assessment::cache::LocalResponseCache;
use crate::assessment::resolver::QuestionResolver;
use crate::assessment::store::AssessmentStore;
use crate::assessment::sync::RetryPolicy;
use crate::report::export::SnapshotStore;
use crate::report::PageConfig;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Postgres in production.
    pub store: Arc<dyn AssessmentStore>,
    /// Redis-backed mirror of in-flight answers.
    pub cache: Arc<dyn LocalResponseCache>,
    /// S3 destination for exported report snapshots.
    pub snapshots: Arc<dyn SnapshotStore>,
    /// Resolution chain built once at startup. Fallback sampling via ENABLE_FALLBACK_SAMPLING.
    pub resolver: Arc<QuestionResolver>,
    pub retry_policy: RetryPolicy,
    /// Report pagination: Helvetica 11pt on US letter with 1" margins.
    pub page_config: PageConfig,
}

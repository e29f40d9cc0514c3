use serde::{Deserialize, Serialize};

use crate::assessment::cache::ResponseSelections;
use crate::assessment::classifier::{classify, AssessmentGroup};
use crate::assessment::completion::{count_completed, Completion};
use crate::assessment::resolver::QuestionResolver;
use crate::models::assessment::AssessmentResponseRow;
use crate::models::catalog::{CategoryRow, QuestionRow};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryProgress {
    pub category_id: String,
    pub category_name: String,
    pub group: AssessmentGroup,
    pub total: usize,
    pub completed: usize,
    pub percentage: u8,
    pub complete: bool,
    /// Resolver stage that produced this category's question set.
    pub strategy: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProgressSource {
    Local,
    Persisted,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReconciledProgress {
    pub percentage: u8,
    pub source: ProgressSource,
}

/// Per-category completion in step order (tier first, then gap) plus the grand total.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentProgress {
    pub categories: Vec<CategoryProgress>,
    pub overall: Completion,
}

impl AssessmentProgress {
    pub fn percentage(&self) -> u8 {
        self.overall.percentage()
    }
}

/// Computes completion for every classified category.
///
/// Unclassified categories are not part of either questionnaire and are skipped.
pub fn compute_progress(
    resolver: &QuestionResolver,
    categories: &[CategoryRow],
    questions: &[QuestionRow],
    assessment_id: &str,
    server: &[AssessmentResponseRow],
    local: &ResponseSelections,
) -> AssessmentProgress {
    let classified = classify(categories);
    let steps = classified
        .tier_categories
        .iter()
        .map(|c| (c, AssessmentGroup::Tier))
        .chain(classified.gap_categories.iter().map(|c| (c, AssessmentGroup::Gap)));

    let mut overall = Completion::default();
    let mut per_category = Vec::new();

    for (category, group) in steps {
        let resolution = resolver.resolve(category, questions, categories);
        let result = count_completed(&resolution.questions, assessment_id, server, local);
        overall = overall + result;

        per_category.push(CategoryProgress {
            category_id: category.id.clone(),
            category_name: category.name.clone(),
            group,
            total: result.total,
            completed: result.completed,
            percentage: result.percentage(),
            complete: result.is_complete(),
            strategy: resolution.strategy.map(String::from),
        });
    }

    AssessmentProgress {
        categories: per_category,
        overall,
    }
}

/// Overall completion percentage across every tier and gap category, 0 when nothing
/// resolves.
pub fn overall_progress(
    resolver: &QuestionResolver,
    categories: &[CategoryRow],
    questions: &[QuestionRow],
    assessment_id: &str,
    server: &[AssessmentResponseRow],
    local: &ResponseSelections,
) -> u8 {
    compute_progress(resolver, categories, questions, assessment_id, server, local).percentage()
}

/// Chooses the percentage to display.
///
/// The locally computed value includes unconfirmed cache writes, so it wins whenever it
/// is non-zero. Otherwise the server-persisted snapshot is used.
pub fn reconcile_progress(local_percentage: u8, persisted_percentage: i32) -> ReconciledProgress {
    if local_percentage > 0 {
        ReconciledProgress {
            percentage: local_percentage.min(100),
            source: ProgressSource::Local,
        }
    } else {
        ReconciledProgress {
            percentage: persisted_percentage.clamp(0, 100) as u8,
            source: ProgressSource::Persisted,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::assessment::cache::CachedResponse;
    use crate::assessment::resolver::EquivalenceTable;

    fn category(id: &str, name: &str, order_index: i32) -> CategoryRow {
        CategoryRow {
            id: id.to_string(),
            name: name.to_string(),
            description: None,
            order_index,
        }
    }

    fn question(id: &str, category_id: &str) -> QuestionRow {
        QuestionRow {
            id: id.to_string(),
            category_id: category_id.to_string(),
            text: "...".to_string(),
            description: None,
            order_index: Some(0),
            question_type_raw: "boolean".to_string(),
            validation_rules: None,
            impacts_tier: None,
        }
    }

    fn answered(question_id: &str) -> AssessmentResponseRow {
        AssessmentResponseRow {
            id: format!("r-{question_id}"),
            assessment_id: "a1".to_string(),
            question_id: question_id.to_string(),
            response: Some(true),
            text_response: None,
            numeric_response: None,
            select_response: None,
            notes: String::new(),
            updated_at: Utc::now(),
        }
    }

    fn resolver() -> QuestionResolver {
        QuestionResolver::standard(EquivalenceTable::default())
    }

    #[test]
    fn test_overall_progress_empty_is_zero() {
        let pct = overall_progress(&resolver(), &[], &[], "a1", &[], &ResponseSelections::new());
        assert_eq!(pct, 0);
    }

    #[test]
    fn test_overall_progress_half_answered() {
        let categories = vec![
            category("c1", "Mission Profiles", 0),
            category("c2", "Supervisor-to-Operator Ratio", 0),
        ];
        let questions = vec![question("q1", "c1"), question("q2", "c2")];
        let server = vec![answered("q1")];

        let pct = overall_progress(&resolver(), &categories, &questions, "a1", &server, &ResponseSelections::new());
        assert_eq!(pct, 50);
    }

    #[test]
    fn test_unclassified_categories_do_not_count() {
        let categories = vec![
            category("c1", "Mission Profiles", 0),
            category("cx", "Admin Scratchpad", 1),
        ];
        let questions = vec![question("q1", "c1"), question("qx", "cx")];
        let server = vec![answered("q1")];

        let progress = compute_progress(&resolver(), &categories, &questions, "a1", &server, &ResponseSelections::new());
        assert_eq!(progress.categories.len(), 1);
        assert_eq!(progress.overall, Completion { total: 1, completed: 1 });
        assert_eq!(progress.percentage(), 100);
    }

    #[test]
    fn test_progress_lists_tier_before_gap() {
        let categories = vec![
            category("g", "Equipment Inventory Management", 0),
            category("t2", "Chemical Munitions", 2),
            category("t1", "Breaching Operations", 1),
        ];
        let progress = compute_progress(&resolver(), &categories, &[], "a1", &[], &ResponseSelections::new());
        let order: Vec<_> = progress.categories.iter().map(|c| c.category_id.as_str()).collect();
        assert_eq!(order, vec!["t1", "t2", "g"]);
        assert!(progress.categories.iter().all(|c| c.percentage == 0));
    }

    #[test]
    fn test_local_cache_contributes_to_progress() {
        let categories = vec![category("c1", "Mission Profiles", 0)];
        let questions = vec![question("q1", "c1"), question("q2", "c1")];
        let mut local = ResponseSelections::new();
        local.insert("q2".to_string(), CachedResponse::default());

        let progress = compute_progress(&resolver(), &categories, &questions, "a1", &[], &local);
        assert_eq!(progress.categories[0].completed, 1);
        assert_eq!(progress.categories[0].strategy.as_deref(), Some("direct_match"));
    }

    #[test]
    fn test_reconcile_prefers_local_when_positive() {
        assert_eq!(
            reconcile_progress(40, 10),
            ReconciledProgress {
                percentage: 40,
                source: ProgressSource::Local
            }
        );
    }

    #[test]
    fn test_reconcile_falls_back_to_persisted() {
        assert_eq!(
            reconcile_progress(0, 25),
            ReconciledProgress {
                percentage: 25,
                source: ProgressSource::Persisted
            }
        );
        assert_eq!(reconcile_progress(0, 250).percentage, 100);
        assert_eq!(reconcile_progress(0, -3).percentage, 0);
    }
}

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::assessment::classifier::{classify, AssessmentGroup};
use crate::assessment::resolver::QuestionResolver;
use crate::models::assessment::AssessmentResponseRow;
use crate::models::catalog::{CategoryRow, QuestionRow};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ReportType {
    TierAssessment,
    GapAnalysis,
}

impl ReportType {
    /// The only category group a report of this type may contain.
    pub fn group(&self) -> AssessmentGroup {
        match self {
            ReportType::TierAssessment => AssessmentGroup::Tier,
            ReportType::GapAnalysis => AssessmentGroup::Gap,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportType::TierAssessment => "tier-assessment",
            ReportType::GapAnalysis => "gap-analysis",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            ReportType::TierAssessment => "Tier Assessment Report",
            ReportType::GapAnalysis => "Gap Analysis Report",
        }
    }
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tier-assessment" => Ok(ReportType::TierAssessment),
            "gap-analysis" => Ok(ReportType::GapAnalysis),
            other => Err(format!(
                "Unknown report type '{other}' (expected tier-assessment or gap-analysis)"
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReportItem {
    pub question_text: String,
    pub response_text: String,
    pub notes: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderedSection {
    pub category_name: String,
    pub items: Vec<ReportItem>,
}

/// Renders a stored answer as report text.
///
/// First non-empty of: boolean as Yes/No, text, numeric, select; else "Not specified".
pub fn format_response_value(response: &AssessmentResponseRow) -> String {
    if let Some(answer) = response.response {
        return if answer { "Yes" } else { "No" }.to_string();
    }
    if let Some(text) = response.text_response.as_deref().filter(|t| !t.is_empty()) {
        return text.to_string();
    }
    if let Some(number) = response.numeric_response {
        return number.to_string();
    }
    if let Some(choice) = response.select_response.as_deref().filter(|s| !s.is_empty()) {
        return choice.to_string();
    }
    "Not specified".to_string()
}

/// Latest response per question id.
fn index_responses(responses: &[AssessmentResponseRow]) -> HashMap<&str, &AssessmentResponseRow> {
    let mut by_question: HashMap<&str, &AssessmentResponseRow> = HashMap::new();
    for response in responses {
        by_question
            .entry(response.question_id.as_str())
            .and_modify(|current| {
                if response.updated_at > current.updated_at {
                    *current = response;
                }
            })
            .or_insert(response);
    }
    by_question
}

/// Builds the ordered sections of one report.
///
/// Only categories of the report's group are considered. Unanswered questions are
/// skipped and categories without any answered question are dropped.
pub fn build_sections(
    resolver: &QuestionResolver,
    report_type: ReportType,
    categories: &[CategoryRow],
    questions: &[QuestionRow],
    responses: &[AssessmentResponseRow],
) -> Vec<OrderedSection> {
    let classified = classify(categories);
    let by_question = index_responses(responses);

    classified
        .group(report_type.group())
        .iter()
        .filter_map(|category| {
            let resolution = resolver.resolve(category, questions, categories);
            let items: Vec<ReportItem> = resolution
                .questions
                .iter()
                .filter_map(|question| {
                    let response = by_question.get(question.id.as_str())?;
                    Some(ReportItem {
                        question_text: question.text.clone(),
                        response_text: format_response_value(response),
                        notes: response.notes.clone(),
                    })
                })
                .collect();

            if items.is_empty() {
                None
            } else {
                Some(OrderedSection {
                    category_name: category.name.clone(),
                    items,
                })
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use chrono::{Duration, Utc};

    use super::*;
    use crate::assessment::cache::ResponseSelections;
    use crate::assessment::classifier::classify;
    use crate::assessment::completion::completion;
    use crate::assessment::progress::overall_progress;
    use crate::assessment::resolver::EquivalenceTable;

    fn category(id: &str, name: &str, order_index: i32) -> CategoryRow {
        CategoryRow {
            id: id.to_string(),
            name: name.to_string(),
            description: None,
            order_index,
        }
    }

    fn question(id: &str, category_id: &str, text: &str, order_index: i32) -> QuestionRow {
        QuestionRow {
            id: id.to_string(),
            category_id: category_id.to_string(),
            text: text.to_string(),
            description: None,
            order_index: Some(order_index),
            question_type_raw: "boolean".to_string(),
            validation_rules: None,
            impacts_tier: None,
        }
    }

    fn response(question_id: &str) -> AssessmentResponseRow {
        AssessmentResponseRow {
            id: format!("r-{question_id}"),
            assessment_id: "a1".to_string(),
            question_id: question_id.to_string(),
            response: None,
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
    fn test_format_boolean() {
        let mut r = response("q1");
        r.response = Some(false);
        r.text_response = Some("ignored".to_string());
        assert_eq!(format_response_value(&r), "No");
    }

    #[test]
    fn test_format_falls_through_empty_values() {
        let mut r = response("q1");
        r.text_response = Some(String::new());
        r.numeric_response = Some(12.0);
        assert_eq!(format_response_value(&r), "12");

        let mut r = response("q1");
        r.numeric_response = Some(2.5);
        assert_eq!(format_response_value(&r), "2.5");

        let mut r = response("q1");
        r.select_response = Some("Tier 2".to_string());
        assert_eq!(format_response_value(&r), "Tier 2");

        assert_eq!(format_response_value(&response("q1")), "Not specified");
    }

    #[test]
    fn test_report_type_parsing() {
        assert_eq!("gap-analysis".parse::<ReportType>(), Ok(ReportType::GapAnalysis));
        assert_eq!(ReportType::TierAssessment.to_string(), "tier-assessment");
        assert!("summary".parse::<ReportType>().is_err());
    }

    #[test]
    fn test_end_to_end_scenario() {
        let categories = vec![
            category("c1", "Mission Profiles", 0),
            category("c2", "Supervisor-to-Operator Ratio", 0),
        ];
        let questions = vec![question("q1", "c1", "...", 0), question("q2", "c2", "...", 0)];
        let mut answer = response("q1");
        answer.response = Some(true);
        let responses = vec![answer];
        let local = ResponseSelections::new();
        let resolver = resolver();

        let classified = classify(&categories);
        assert_eq!(classified.tier_categories[0].id, "c1");
        assert_eq!(classified.gap_categories[0].id, "c2");

        let c1 = completion(&resolver, &categories[0], &questions, &categories, "a1", &responses, &local);
        let c2 = completion(&resolver, &categories[1], &questions, &categories, "a1", &responses, &local);
        assert_eq!((c1.total, c1.completed), (1, 1));
        assert_eq!((c2.total, c2.completed), (1, 0));

        assert_eq!(overall_progress(&resolver, &categories, &questions, "a1", &responses, &local), 50);

        let tier = build_sections(&resolver, ReportType::TierAssessment, &categories, &questions, &responses);
        assert_eq!(tier.len(), 1);
        assert_eq!(tier[0].category_name, "Mission Profiles");
        assert_eq!(tier[0].items.len(), 1);
        assert_eq!(tier[0].items[0].response_text, "Yes");

        let gap = build_sections(&resolver, ReportType::GapAnalysis, &categories, &questions, &responses);
        assert!(gap.is_empty());
    }

    #[test]
    fn test_reports_are_disjoint() {
        let categories = vec![
            category("t1", "Breaching Operations", 1),
            category("t2", "Chemical Munitions", 0),
            category("g1", "Equipment Inventory Management", 0),
            category("u1", "Misc", 0),
        ];
        let questions = vec![
            question("q1", "t1", "Breach kit?", 0),
            question("q2", "t2", "CS stock?", 0),
            question("q3", "g1", "Inventory audited?", 0),
            question("q4", "u1", "Anything?", 0),
        ];
        let responses: Vec<_> = ["q1", "q2", "q3", "q4"]
            .iter()
            .map(|q| {
                let mut r = response(q);
                r.response = Some(true);
                r
            })
            .collect();
        let resolver = resolver();

        let tier = build_sections(&resolver, ReportType::TierAssessment, &categories, &questions, &responses);
        let gap = build_sections(&resolver, ReportType::GapAnalysis, &categories, &questions, &responses);

        let tier_names: HashSet<_> = tier.iter().map(|s| s.category_name.clone()).collect();
        let gap_names: HashSet<_> = gap.iter().map(|s| s.category_name.clone()).collect();
        assert!(tier_names.is_disjoint(&gap_names));
        assert_eq!(
            tier.iter().map(|s| s.category_name.as_str()).collect::<Vec<_>>(),
            vec!["Chemical Munitions", "Breaching Operations"]
        );
        assert_eq!(gap_names.len(), 1);
        assert!(!tier_names.contains("Misc") && !gap_names.contains("Misc"));
    }

    #[test]
    fn test_unanswered_questions_skipped_and_order_kept() {
        let categories = vec![category("c1", "Breaching Operations", 0)];
        let questions = vec![
            question("q2", "c1", "Second", 2),
            question("q1", "c1", "First", 1),
            question("q3", "c1", "Unanswered", 3),
        ];
        let mut r1 = response("q1");
        r1.text_response = Some("Yes, two rams".to_string());
        r1.notes = "Checked 2024".to_string();
        let mut r2 = response("q2");
        r2.response = Some(false);

        let sections = build_sections(&resolver(), ReportType::TierAssessment, &categories, &questions, &[r2, r1]);
        let items = &sections[0].items;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].question_text, "First");
        assert_eq!(items[0].notes, "Checked 2024");
        assert_eq!(items[1].response_text, "No");
    }

    #[test]
    fn test_latest_duplicate_response_wins() {
        let categories = vec![category("c1", "Chemical Munitions", 0)];
        let questions = vec![question("q1", "c1", "CS stock?", 0)];
        let mut older = response("q1");
        older.response = Some(false);
        older.updated_at = Utc::now() - Duration::hours(1);
        let mut newer = response("q1");
        newer.response = Some(true);

        let sections = build_sections(&resolver(), ReportType::TierAssessment, &categories, &questions, &[newer, older]);
        assert_eq!(sections[0].items[0].response_text, "Yes");
    }
}

use std::collections::HashSet;
use std::ops::Add;

use serde::{Deserialize, Serialize};

use crate::assessment::cache::ResponseSelections;
use crate::assessment::resolver::QuestionResolver;
use crate::models::assessment::AssessmentResponseRow;
use crate::models::catalog::{CategoryRow, QuestionRow};

/// Answered vs total questions. Always `completed <= total`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Completion {
    pub total: usize,
    pub completed: usize,
}

impl Completion {
    /// Rounded percentage; `0/0` is 0.
    pub fn percentage(&self) -> u8 {
        percentage(self.completed, self.total)
    }

    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.completed == self.total
    }
}

impl Add for Completion {
    type Output = Completion;

    fn add(self, rhs: Completion) -> Completion {
        Completion {
            total: self.total + rhs.total,
            completed: self.completed + rhs.completed,
        }
    }
}

pub fn percentage(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    ((100.0 * completed as f64 / total as f64).round() as u8).min(100)
}

/// Counts answered questions from both sources.
///
/// A question counts once: first against server responses for this assessment, then,
/// only if the server has nothing yet, against the local cache.
pub fn count_completed(
    questions: &[&QuestionRow],
    assessment_id: &str,
    server: &[AssessmentResponseRow],
    local: &ResponseSelections,
) -> Completion {
    let answered_on_server: HashSet<&str> = server
        .iter()
        .filter(|r| r.assessment_id == assessment_id)
        .map(|r| r.question_id.as_str())
        .collect();

    let completed = questions
        .iter()
        .filter(|q| answered_on_server.contains(q.id.as_str()) || local.contains_key(&q.id))
        .count();

    Completion {
        total: questions.len(),
        completed,
    }
}

/// Completion of one category: resolve its questions, then count answers.
pub fn completion(
    resolver: &QuestionResolver,
    category: &CategoryRow,
    questions: &[QuestionRow],
    categories: &[CategoryRow],
    assessment_id: &str,
    server: &[AssessmentResponseRow],
    local: &ResponseSelections,
) -> Completion {
    let resolution = resolver.resolve(category, questions, categories);
    count_completed(&resolution.questions, assessment_id, server, local)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::assessment::cache::CachedResponse;
    use crate::assessment::resolver::EquivalenceTable;

    fn category(id: &str, name: &str) -> CategoryRow {
        CategoryRow {
            id: id.to_string(),
            name: name.to_string(),
            description: None,
            order_index: 0,
        }
    }

    fn question(id: &str, category_id: &str) -> QuestionRow {
        QuestionRow {
            id: id.to_string(),
            category_id: category_id.to_string(),
            text: format!("Question {id}"),
            description: None,
            order_index: None,
            question_type_raw: "boolean".to_string(),
            validation_rules: None,
            impacts_tier: None,
        }
    }

    fn answered(assessment_id: &str, question_id: &str) -> AssessmentResponseRow {
        AssessmentResponseRow {
            id: format!("r-{question_id}"),
            assessment_id: assessment_id.to_string(),
            question_id: question_id.to_string(),
            response: Some(true),
            text_response: None,
            numeric_response: None,
            select_response: None,
            notes: String::new(),
            updated_at: Utc::now(),
        }
    }

    fn fixture() -> (Vec<CategoryRow>, Vec<QuestionRow>) {
        let categories = vec![category("c1", "Chemical Munitions")];
        let questions = vec![question("q1", "c1"), question("q2", "c1"), question("q3", "c1")];
        (categories, questions)
    }

    #[test]
    fn test_percentage_zero_total_is_zero() {
        assert_eq!(percentage(0, 0), 0);
        assert_eq!(Completion::default().percentage(), 0);
    }

    #[test]
    fn test_percentage_rounds() {
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(1, 2), 50);
    }

    #[test]
    fn test_server_and_local_counted_without_double_counting() {
        let (categories, questions) = fixture();
        let resolver = QuestionResolver::standard(EquivalenceTable::default());
        let server = vec![answered("a1", "q1")];
        let mut local = ResponseSelections::new();
        // q1 is both confirmed and cached; q2 is only cached
        local.insert("q1".to_string(), CachedResponse::from_server(&server[0]));
        local.insert("q2".to_string(), CachedResponse::default());

        let result = completion(&resolver, &categories[0], &questions, &categories, "a1", &server, &local);
        assert_eq!(result, Completion { total: 3, completed: 2 });
    }

    #[test]
    fn test_responses_of_other_assessments_ignored() {
        let (categories, questions) = fixture();
        let resolver = QuestionResolver::standard(EquivalenceTable::default());
        let server = vec![answered("other", "q1")];

        let result = completion(
            &resolver,
            &categories[0],
            &questions,
            &categories,
            "a1",
            &server,
            &ResponseSelections::new(),
        );
        assert_eq!(result.completed, 0);
    }

    #[test]
    fn test_answers_outside_category_ignored() {
        let (categories, questions) = fixture();
        let resolver = QuestionResolver::standard(EquivalenceTable::default());
        let mut local = ResponseSelections::new();
        local.insert("q-elsewhere".to_string(), CachedResponse::default());

        let result = completion(&resolver, &categories[0], &questions, &categories, "a1", &[], &local);
        assert_eq!(result, Completion { total: 3, completed: 0 });
    }

    #[test]
    fn test_empty_category_is_zero_over_zero() {
        let categories = vec![category("c9", "Cooking Skills")];
        let resolver = QuestionResolver::standard(EquivalenceTable::default());
        let result = completion(&resolver, &categories[0], &[], &categories, "a1", &[], &ResponseSelections::new());

        assert_eq!(result, Completion { total: 0, completed: 0 });
        assert_eq!(result.percentage(), 0);
        assert!(!result.is_complete());
    }

    #[test]
    fn test_adding_answers_is_monotonic_and_bounded() {
        let (categories, questions) = fixture();
        let resolver = QuestionResolver::standard(EquivalenceTable::default());
        let mut server = Vec::new();
        let mut previous = 0;

        for q in ["q1", "q2", "q3", "q1"] {
            server.push(answered("a1", q));
            let result = completion(
                &resolver,
                &categories[0],
                &questions,
                &categories,
                "a1",
                &server,
                &ResponseSelections::new(),
            );
            assert!(result.completed >= previous);
            assert!(result.completed <= result.total);
            previous = result.completed;
        }
        assert_eq!(previous, 3);
    }

    #[test]
    fn test_completion_add() {
        let sum = Completion { total: 3, completed: 1 } + Completion { total: 1, completed: 1 };
        assert_eq!(sum, Completion { total: 4, completed: 2 });
        assert_eq!(sum.percentage(), 50);
    }
}

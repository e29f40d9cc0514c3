use serde::{Deserialize, Serialize};

use crate::assessment::catalog::{synonym_for, GAP_CATEGORY_NAMES, TIER_CATEGORY_NAMES};
use crate::models::catalog::CategoryRow;

/// Which questionnaire a category belongs to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentGroup {
    Tier,
    Gap,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedCategories {
    pub tier_categories: Vec<CategoryRow>,
    pub gap_categories: Vec<CategoryRow>,
}

impl ClassifiedCategories {
    /// Tier categories first, then gap categories, each already in `order_index` order.
    pub fn step_order(&self) -> Vec<&CategoryRow> {
        self.tier_categories
            .iter()
            .chain(self.gap_categories.iter())
            .collect()
    }

    pub fn group(&self, group: AssessmentGroup) -> &[CategoryRow] {
        match group {
            AssessmentGroup::Tier => &self.tier_categories,
            AssessmentGroup::Gap => &self.gap_categories,
        }
    }
}

/// Removes a leading `"<number>. "` ordinal, e.g. `"3. Breaching Operations"`.
pub fn strip_numeric_prefix(name: &str) -> &str {
    let trimmed = name.trim();
    let digits = trimmed.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 {
        return trimmed;
    }
    match trimmed[digits..].strip_prefix('.') {
        Some(rest) if rest.starts_with(char::is_whitespace) => rest.trim_start(),
        _ => trimmed,
    }
}

/// Maps a display name onto its canonical category name.
///
/// A literal canonical name always wins over a synonym entry; names matching neither
/// come back with only the ordinal prefix removed.
pub fn normalize_category_name(name: &str) -> &str {
    let stripped = strip_numeric_prefix(name);
    if group_for_name(stripped).is_some() {
        return stripped;
    }
    synonym_for(stripped).unwrap_or(stripped)
}

/// Exact match of an already-stripped name against the two reference lists.
pub fn group_for_name(stripped_name: &str) -> Option<AssessmentGroup> {
    if TIER_CATEGORY_NAMES.contains(&stripped_name) {
        Some(AssessmentGroup::Tier)
    } else if GAP_CATEGORY_NAMES.contains(&stripped_name) {
        Some(AssessmentGroup::Gap)
    } else {
        None
    }
}

pub fn group_of(category: &CategoryRow) -> Option<AssessmentGroup> {
    group_for_name(strip_numeric_prefix(&category.name))
}

/// Partitions categories into the tier and gap questionnaires.
///
/// Categories matching neither reference list are left out of both.
pub fn classify(categories: &[CategoryRow]) -> ClassifiedCategories {
    let mut classified = ClassifiedCategories::default();

    for category in categories {
        match group_of(category) {
            Some(AssessmentGroup::Tier) => classified.tier_categories.push(category.clone()),
            Some(AssessmentGroup::Gap) => classified.gap_categories.push(category.clone()),
            None => {}
        }
    }

    // sort_by_key is stable, so ties keep input order
    classified.tier_categories.sort_by_key(|c| c.order_index);
    classified.gap_categories.sort_by_key(|c| c.order_index);
    classified
}

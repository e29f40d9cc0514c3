//! Question resolution: maps a category onto the questions that belong to it.
//!
//! Historical re-seeding left questions pointing at duplicate or orphaned category ids,
//! so a plain foreign-key filter is not enough. Resolution runs an ordered chain of
//! named strategies and stops at the first one that yields anything:
//!
//! 1. `direct_match`: `question.category_id == category.id`
//! 2. `equivalence_table`: legacy ids recorded for the category
//! 3. `normalized_name`: the question's own category normalizes to the same name
//! 4. `keyword_heuristic`: question text/description mentions a category keyword
//! 5. `fallback_sample`: first few questions system-wide (opt-in, degraded)
//!
//! Every stage is a pure function of its inputs, so identical inputs always produce an
//! identical, identically-ordered result.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::assessment::catalog::{keywords_for, LEGACY_CATEGORY_IDS};
use crate::assessment::classifier::normalize_category_name;
use crate::models::catalog::{CategoryRow, QuestionRow};

/// Number of questions returned by [`FallbackSample`].
pub const FALLBACK_SAMPLE_SIZE: usize = 5;

// ────────────────────────────────────────────────────────────────────────────
// Strategy trait
// ────────────────────────────────────────────────────────────────────────────

/// Inputs shared by every strategy in a single resolution.
pub struct ResolutionContext<'a> {
    pub category: &'a CategoryRow,
    pub questions: &'a [QuestionRow],
    pub categories: &'a [CategoryRow],
}

/// One stage of the resolution chain.
pub trait ResolutionStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn resolve<'a>(&self, ctx: &ResolutionContext<'a>) -> Vec<&'a QuestionRow>;

    /// Degraded strategies produce a result that is not actually tied to the category.
    fn is_degraded(&self) -> bool {
        false
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Strategies
// ────────────────────────────────────────────────────────────────────────────

pub struct DirectMatch;

impl ResolutionStrategy for DirectMatch {
    fn name(&self) -> &'static str {
        "direct_match"
    }

    fn resolve<'a>(&self, ctx: &ResolutionContext<'a>) -> Vec<&'a QuestionRow> {
        ctx.questions
            .iter()
            .filter(|q| q.category_id == ctx.category.id)
            .collect()
    }
}

/// Alternate category ids keyed by the id currently in use.
#[derive(Debug, Clone, Default)]
pub struct EquivalenceTable {
    aliases: HashMap<String, HashSet<String>>,
}

impl EquivalenceTable {
    pub fn builtin() -> Self {
        let mut table = Self::default();
        for (id, legacy_ids) in LEGACY_CATEGORY_IDS {
            table.insert(id, legacy_ids.iter().copied());
        }
        table
    }

    pub fn insert<'s>(&mut self, category_id: &str, legacy_ids: impl IntoIterator<Item = &'s str>) {
        let entry = self.aliases.entry(category_id.to_string()).or_default();
        entry.extend(
            legacy_ids
                .into_iter()
                .filter(|legacy| *legacy != category_id)
                .map(String::from),
        );
    }

    /// Merges a JSON object of the form `{"<categoryId>": ["<legacyId>", ...]}`.
    pub fn extend_from_json(&mut self, json: &str) -> Result<usize, serde_json::Error> {
        let parsed: HashMap<String, Vec<String>> = serde_json::from_str(json)?;
        let count = parsed.len();
        for (id, legacy_ids) in &parsed {
            self.insert(id, legacy_ids.iter().map(String::as_str));
        }
        Ok(count)
    }

    pub fn alternates(&self, category_id: &str) -> Option<&HashSet<String>> {
        self.aliases.get(category_id)
    }

    /// Number of categories with recorded legacy ids.
    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

pub struct EquivalentIds {
    pub table: EquivalenceTable,
}

impl ResolutionStrategy for EquivalentIds {
    fn name(&self) -> &'static str {
        "equivalence_table"
    }

    fn resolve<'a>(&self, ctx: &ResolutionContext<'a>) -> Vec<&'a QuestionRow> {
        let Some(alternates) = self.table.alternates(&ctx.category.id) else {
            return Vec::new();
        };
        ctx.questions
            .iter()
            .filter(|q| alternates.contains(&q.category_id))
            .collect()
    }
}

pub struct NormalizedName;

impl ResolutionStrategy for NormalizedName {
    fn name(&self) -> &'static str {
        "normalized_name"
    }

    fn resolve<'a>(&self, ctx: &ResolutionContext<'a>) -> Vec<&'a QuestionRow> {
        let target = normalize_category_name(&ctx.category.name);
        let matching_ids: HashSet<&str> = ctx
            .categories
            .iter()
            .filter(|c| normalize_category_name(&c.name) == target)
            .map(|c| c.id.as_str())
            .collect();

        ctx.questions
            .iter()
            .filter(|q| matching_ids.contains(q.category_id.as_str()))
            .collect()
    }
}

pub struct KeywordHeuristic;

impl ResolutionStrategy for KeywordHeuristic {
    fn name(&self) -> &'static str {
        "keyword_heuristic"
    }

    fn resolve<'a>(&self, ctx: &ResolutionContext<'a>) -> Vec<&'a QuestionRow> {
        let Some(keywords) = keywords_for(normalize_category_name(&ctx.category.name)) else {
            return Vec::new();
        };

        ctx.questions
            .iter()
            .filter(|q| {
                let text = q.text.to_lowercase();
                let description = q.description.as_deref().unwrap_or("").to_lowercase();
                keywords
                    .iter()
                    .any(|kw| text.contains(kw) || description.contains(kw))
            })
            .collect()
    }
}

/// Returns the first questions system-wide by `order_index` (then id), regardless of
/// category.
pub struct FallbackSample {
    pub limit: usize,
}

impl ResolutionStrategy for FallbackSample {
    fn name(&self) -> &'static str {
        "fallback_sample"
    }

    fn resolve<'a>(&self, ctx: &ResolutionContext<'a>) -> Vec<&'a QuestionRow> {
        let mut all: Vec<&'a QuestionRow> = ctx.questions.iter().collect();
        all.sort_by(|a, b| {
            (a.order_index.is_none(), a.order_index, &a.id)
                .cmp(&(b.order_index.is_none(), b.order_index, &b.id))
        });
        all.truncate(self.limit);
        all
    }

    fn is_degraded(&self) -> bool {
        true
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Resolver
// ────────────────────────────────────────────────────────────────────────────

/// Outcome of resolving a single category.
#[derive(Debug, Clone)]
pub struct Resolution<'a> {
    pub questions: Vec<&'a QuestionRow>,
    /// Name of the strategy that produced `questions`; `None` when nothing matched.
    pub strategy: Option<&'static str>,
    pub degraded: bool,
}

pub struct QuestionResolver {
    strategies: Vec<Box<dyn ResolutionStrategy>>,
}

impl QuestionResolver {
    pub fn new(strategies: Vec<Box<dyn ResolutionStrategy>>) -> Self {
        Self { strategies }
    }

    /// Stages 1–4. Fallback sampling is appended separately.
    pub fn standard(table: EquivalenceTable) -> Self {
        Self::new(vec![
            Box::new(DirectMatch),
            Box::new(EquivalentIds { table }),
            Box::new(NormalizedName),
            Box::new(KeywordHeuristic),
        ])
    }

    pub fn with_fallback_sampling(mut self) -> Self {
        self.strategies.push(Box::new(FallbackSample {
            limit: FALLBACK_SAMPLE_SIZE,
        }));
        self
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Resolves the questions for `category`, ordered by `order_index` ascending with
    /// unordered questions last.
    pub fn resolve<'a>(
        &self,
        category: &'a CategoryRow,
        questions: &'a [QuestionRow],
        categories: &'a [CategoryRow],
    ) -> Resolution<'a> {
        let ctx = ResolutionContext {
            category,
            questions,
            categories,
        };

        for strategy in &self.strategies {
            let mut found = strategy.resolve(&ctx);
            if found.is_empty() {
                continue;
            }

            sort_by_order_index(&mut found);
            if strategy.is_degraded() {
                warn!(
                    category_id = %category.id,
                    category = %category.name,
                    strategy = strategy.name(),
                    count = found.len(),
                    "Category resolved through a degraded strategy; check category data"
                );
            } else {
                debug!(
                    category_id = %category.id,
                    strategy = strategy.name(),
                    count = found.len(),
                    "Resolved category questions"
                );
            }

            return Resolution {
                questions: found,
                strategy: Some(strategy.name()),
                degraded: strategy.is_degraded(),
            };
        }

        warn!(
            category_id = %category.id,
            category = %category.name,
            "No questions resolved for category"
        );
        Resolution {
            questions: Vec::new(),
            strategy: None,
            degraded: false,
        }
    }
}

fn sort_by_order_index(questions: &mut [&QuestionRow]) {
    // stable: equal keys keep input order
    questions.sort_by_key(|q| (q.order_index.is_none(), q.order_index));
}

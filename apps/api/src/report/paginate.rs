//! Report pagination: lays ordered sections onto fixed-height pages.
//!
//! Section order and item order are preserved. An item is never split; it moves to
//! the next page whole, and the section heading is repeated there as "(continued)".
//! An item taller than a page gets a page to itself and overflows it.

use serde::{Deserialize, Serialize};

use crate::report::font_metrics::{get_metrics, FontMetricTable, PageConfig};
use crate::report::sections::{OrderedSection, ReportItem};

/// Heading line plus the gap under it.
const HEADING_LINES: u16 = 2;
/// Blank line after every item.
const ITEM_GAP_LINES: u16 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PageBlock {
    #[serde(rename_all = "camelCase")]
    Heading { category_name: String, continued: bool },
    Item(ReportItem),
}

impl PageBlock {
    pub fn heading_text(&self) -> Option<String> {
        match self {
            PageBlock::Heading {
                category_name,
                continued: true,
            } => Some(format!("{category_name} (continued)")),
            PageBlock::Heading { category_name, .. } => Some(category_name.clone()),
            PageBlock::Item(_) => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub number: u32,
    pub blocks: Vec<PageBlock>,
    pub lines_used: u16,
}

impl Page {
    fn new(number: u32) -> Self {
        Self {
            number,
            blocks: Vec::new(),
            lines_used: 0,
        }
    }

    fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

/// Lines an item occupies: question, answer, optional notes, then the gap.
pub fn item_lines(metrics: &FontMetricTable, item: &ReportItem, config: &PageConfig) -> u16 {
    let question = metrics.estimated_lines(&item.question_text, config).max(1);
    let answer = metrics
        .estimated_lines(&format!("Response: {}", item.response_text), config)
        .max(1);
    let notes = if item.notes.trim().is_empty() {
        0
    } else {
        metrics.estimated_lines(&format!("Notes: {}", item.notes), config)
    };
    question
        .saturating_add(answer)
        .saturating_add(notes)
        .saturating_add(ITEM_GAP_LINES)
}

struct Paginator<'c> {
    config: &'c PageConfig,
    pages: Vec<Page>,
    current: Page,
}

impl<'c> Paginator<'c> {
    fn new(config: &'c PageConfig) -> Self {
        Self {
            config,
            pages: Vec::new(),
            current: Page::new(1),
        }
    }

    fn fits(&self, lines: u16) -> bool {
        self.current.lines_used.saturating_add(lines) <= self.config.lines_per_page
    }

    fn break_page(&mut self) {
        let next = Page::new(self.current.number + 1);
        self.pages.push(std::mem::replace(&mut self.current, next));
    }

    fn push(&mut self, block: PageBlock, lines: u16) {
        self.current.lines_used = self.current.lines_used.saturating_add(lines);
        self.current.blocks.push(block);
    }

    fn heading(&mut self, category_name: &str, continued: bool) {
        self.push(
            PageBlock::Heading {
                category_name: category_name.to_string(),
                continued,
            },
            HEADING_LINES,
        );
    }

    fn finish(mut self) -> Vec<Page> {
        if !self.current.is_empty() {
            self.pages.push(self.current);
        }
        self.pages
    }
}

/// Paginates sections. CPU-bound; handlers call it through `spawn_blocking`.
pub fn paginate(sections: &[OrderedSection], config: &PageConfig) -> Vec<Page> {
    let metrics = get_metrics(&config.font);
    let mut paginator = Paginator::new(config);

    for section in sections {
        for (index, item) in section.items.iter().enumerate() {
            let lines = item_lines(metrics, item, config);

            if index == 0 {
                // Keep the heading with the first item.
                if !paginator.fits(HEADING_LINES.saturating_add(lines)) && !paginator.current.is_empty() {
                    paginator.break_page();
                }
                paginator.heading(&section.category_name, false);
            } else if !paginator.fits(lines) {
                paginator.break_page();
                paginator.heading(&section.category_name, true);
            }

            paginator.push(PageBlock::Item(item.clone()), lines);
        }
    }

    paginator.finish()
}

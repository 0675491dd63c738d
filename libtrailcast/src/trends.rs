//! Built-in trend suggestions
//!
//! A small curated set of post ideas for seeding a fresh queue. A live
//! trends feed can replace this later; the shape of a suggestion is the
//! same either way.

use crate::types::ContentItem;

/// A post idea: title, summary and suggested tags
#[derive(Debug, Clone)]
pub struct TrendSuggestion {
    pub title: &'static str,
    pub summary: &'static str,
    pub tags: &'static [&'static str],
}

impl TrendSuggestion {
    /// Turn the suggestion into a content item ready for scheduling
    pub fn to_content_item(&self) -> ContentItem {
        ContentItem::new(
            self.title.to_string(),
            self.summary.to_string(),
            self.tags.iter().map(|t| t.to_string()).collect(),
        )
    }
}

/// The current suggestion set
pub fn sample_trends() -> &'static [TrendSuggestion] {
    const TRENDS: &[TrendSuggestion] = &[
        TrendSuggestion {
            title: "Top Safari Lodges in Queen Elizabeth NP",
            summary: "A tour of the lodges with the best sunrise views over the Kazinga Channel.",
            tags: &["#QueenElizabethNP", "#Safari", "#Uganda"],
        },
        TrendSuggestion {
            title: "Murchison Falls: What to Expect",
            summary: "The roar of the falls, the boat safari upriver and where to get the best photos.",
            tags: &["#MurchisonFalls", "#Travel", "#Wildlife"],
        },
    ];
    TRENDS
}

//! Announcement query detection

use once_cell::sync::Lazy;
use regex::Regex;

/// Vocabulary that marks a query as asking for announcements
pub const ANNOUNCEMENT_KEYWORDS: &[&str] = &[
    "announcement",
    "announce",
    "news",
    "update",
    "latest",
    "recent",
    "notification",
    "alert",
    "bulletin",
    "inform",
    "what's new",
    "what's happening",
    "current events",
    "university news",
    "college news",
    "campus news",
    "reva news",
    "reva updates",
    "reva announcements",
    "important information",
    "bulletin board",
    "notice board",
    "events",
    "upcoming events",
    "calendar",
    "schedule",
    "new information",
    "anything new",
    "what's going on",
    "any updates",
    "latest happenings",
    "recent developments",
    "notices",
    "circulars",
    "memos",
    "announcements",
    "whats new",
    "tell me news",
    "any news",
    "current news",
    "updates from reva",
    "university updates",
    "college updates",
];

/// Word-bounded pattern per keyword, allowing common suffixes
static KEYWORD_PATTERNS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    ANNOUNCEMENT_KEYWORDS
        .iter()
        .filter_map(|keyword| {
            let pattern = format!(r"\b{}(s|es|ing|ed|ment)?\b", regex::escape(keyword));
            Regex::new(&pattern).ok().map(|regex| (*keyword, regex))
        })
        .collect()
});

/// Whether the query asks for announcements or news
pub fn is_announcement_query(query: &str) -> bool {
    matched_announcement_keyword(query).is_some()
}

/// First keyword that marks `query` as an announcement query, if any
pub fn matched_announcement_keyword(query: &str) -> Option<&'static str> {
    let lower = query.to_lowercase();

    KEYWORD_PATTERNS
        .iter()
        .find(|(keyword, pattern)| lower.contains(keyword) || pattern.is_match(&lower))
        .map(|(keyword, _)| *keyword)
}

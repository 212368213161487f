//! Render announcement items as a chat message

use std::cmp::Reverse;
use unibot_core::AnnouncementItem;

/// Reply used when there is nothing to show
pub const NO_ANNOUNCEMENTS_MESSAGE: &str =
    "I couldn't find any recent announcements from REVA University.";

const BANNER: &str = "📢 Here are the latest announcements from REVA University:\n\n";
const CLOSING: &str =
    "\nFor more details on these announcements, visit the university website or student portal.";
const MISSING_DATE: &str = "No date available";
const UNTITLED: &str = "Untitled Announcement";

/// Descriptions longer than this many characters are shortened
pub const DESCRIPTION_LIMIT: usize = 100;

/// Format announcements newest first.
///
/// Items from more than one category are grouped under a header per category, in the order
/// each category first appears after sorting; a single category yields a flat numbered list.
pub fn format_announcements(items: &[AnnouncementItem]) -> String {
    if items.is_empty() {
        return NO_ANNOUNCEMENTS_MESSAGE.to_string();
    }

    let mut sorted: Vec<&AnnouncementItem> = items.iter().collect();
    // Stable: equal timestamps keep their input order
    sorted.sort_by_key(|item| Reverse(recency_key(item)));

    let groups = group_by_category(&sorted);
    let mut message = String::from(BANNER);

    if groups.len() > 1 {
        for (category, entries) in &groups {
            message.push_str(&format!("📌 {}:\n", category));

            for (index, item) in entries.iter().enumerate() {
                message.push_str(&format!(
                    "  {}. {} ({})\n",
                    index + 1,
                    title_of(item),
                    format_date(item)
                ));

                if !item.description.is_empty() {
                    message.push_str(&format!("     {}\n", shorten(&item.description)));
                }

                if let Some(link) = &item.link {
                    message.push_str(&format!("     Read more: {}\n", link));
                }
            }

            message.push('\n');
        }
    } else {
        for (index, item) in sorted.iter().enumerate() {
            message.push_str(&format!(
                "{}. 📋 {} ({})\n",
                index + 1,
                title_of(item),
                format_date(item)
            ));

            if !item.description.is_empty() {
                message.push_str(&format!("   {}\n\n", shorten(&item.description)));
            }

            if let Some(link) = &item.link {
                message.push_str(&format!("   Read more: {}\n\n", link));
            }
        }
    }

    message.push_str(CLOSING);
    message
}

/// Milliseconds since the epoch; undated items count as the epoch itself
fn recency_key(item: &AnnouncementItem) -> i64 {
    item.published_at
        .map(|published| published.timestamp_millis())
        .unwrap_or(0)
}

fn group_by_category<'a>(
    items: &[&'a AnnouncementItem],
) -> Vec<(&'a str, Vec<&'a AnnouncementItem>)> {
    let mut groups: Vec<(&'a str, Vec<&'a AnnouncementItem>)> = Vec::new();

    for &item in items {
        let category = item.category.as_str();
        match groups.iter().position(|(seen, _)| *seen == category) {
            Some(index) => groups[index].1.push(item),
            None => groups.push((category, vec![item])),
        }
    }

    groups
}

fn title_of(item: &AnnouncementItem) -> &str {
    if item.title.is_empty() {
        UNTITLED
    } else {
        &item.title
    }
}

fn format_date(item: &AnnouncementItem) -> String {
    item.published_at
        .map(|published| published.format("%b %-d, %Y").to_string())
        .unwrap_or_else(|| MISSING_DATE.to_string())
}

fn shorten(description: &str) -> String {
    if description.chars().count() > DESCRIPTION_LIMIT {
        let head: String = description.chars().take(DESCRIPTION_LIMIT - 3).collect();
        format!("{}...", head)
    } else {
        description.to_string()
    }
}

use serde::{Deserialize, Serialize};

use crate::trash::sanitize::{sanitize_text, sanitize_url};

/// Contributor recorded when no human can be attributed (cron, system jobs).
pub const AUTOMATIC_ACTION: &str = "Automatic action";

/// One recorded deletion. Immutable once built.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogEntry {
    pub contributor_name: String,
    pub deleted_item: String,
    pub deletion_date: String,
    #[serde(default)]
    pub media_size: String,
    #[serde(default)]
    pub url: String,
    pub timestamp: i64,
}

impl LogEntry {
    /// Builds an entry with every text field sanitized and the URL validated.
    /// An empty contributor after sanitizing becomes [`AUTOMATIC_ACTION`].
    pub fn new(
        contributor_name: &str,
        deleted_item: &str,
        deletion_date: &str,
        media_size: &str,
        url: &str,
        timestamp: i64,
    ) -> Self {
        let contributor = sanitize_text(contributor_name);
        Self {
            contributor_name: if contributor.is_empty() {
                AUTOMATIC_ACTION.to_string()
            } else {
                contributor
            },
            deleted_item: sanitize_text(deleted_item),
            deletion_date: sanitize_text(deletion_date),
            media_size: sanitize_text(media_size),
            url: sanitize_url(url),
            timestamp,
        }
    }

    /// Column values in CSV order.
    pub fn csv_row(&self) -> [&str; 5] {
        [
            &self.contributor_name,
            &self.deleted_item,
            &self.deletion_date,
            &self.media_size,
            &self.url,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_contributor_falls_back_to_automatic_action() {
        let entry = LogEntry::new(" <i></i> ", "Page", "01/01/2024", "", "", 0);
        assert_eq!(entry.contributor_name, AUTOMATIC_ACTION);
    }

    #[test]
    fn invalid_url_is_emptied() {
        let entry = LogEntry::new("Alice", "Post", "01/01/2024", "", "ftp://x/y", 0);
        assert_eq!(entry.url, "");
        assert_eq!(
            entry.csv_row(),
            ["Alice", "Post", "01/01/2024", "", ""]
        );
    }
}

// crates/extract/src/feed.rs

use crate::ExtractError;
use domain::doc::Metadata;
use feed_rs::parser;

/// One syndicated entry, reduced to the fields the indexer cares about.
/// Entries without a link are unaddressable and get dropped at parse
/// time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEntry {
    pub link: String,
    pub title: Option<String>,
    /// RFC 3339 publication timestamp, when the feed carries one.
    pub published: Option<String>,
    pub author: Option<String>,
    pub summary: Option<String>,
    pub categories: Vec<String>,
}

impl FeedEntry {
    /// Entry title, falling back to the link.
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.link)
    }

    pub fn metadata(&self) -> Metadata {
        let mut metadata = Metadata::new();
        metadata.insert("link".into(), self.link.clone());
        metadata.insert("title".into(), self.display_title().to_owned());
        if let Some(published) = &self.published {
            metadata.insert("published".into(), published.clone());
        }
        if let Some(author) = &self.author {
            metadata.insert("author".into(), author.clone());
        }
        if let Some(summary) = &self.summary {
            metadata.insert("summary".into(), summary.clone());
        }
        if !self.categories.is_empty() {
            metadata.insert("categories".into(), self.categories.join(", "));
        }
        metadata
    }
}

/// Parse an RSS/Atom document into entries, preserving the publisher's
/// order. Malformed feeds fail as a whole.
pub fn parse_feed(bytes: &[u8]) -> Result<Vec<FeedEntry>, ExtractError> {
    let feed = parser::parse(bytes).map_err(|e| ExtractError::FeedParse(e.to_string()))?;
    Ok(feed.entries.into_iter().filter_map(entry_from).collect())
}

fn entry_from(entry: feed_rs::model::Entry) -> Option<FeedEntry> {
    let link = entry.links.first()?.href.clone();

    Some(FeedEntry {
        link,
        title: entry.title.map(|t| t.content),
        published: entry.published.map(|d| d.to_rfc3339()),
        author: entry.authors.first().map(|p| p.name.clone()),
        summary: entry.summary.map(|t| t.content),
        categories: entry.categories.into_iter().map(|c| c.term).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSS: &str = r#"<?xml version="1.0"?>
<rss version="2.0">
  <channel>
    <title>Example Blog</title>
    <link>https://blog.example</link>
    <item>
      <title>First post</title>
      <link>https://blog.example/first</link>
      <pubDate>Mon, 06 Jan 2025 08:00:00 GMT</pubDate>
      <author>jo@example.com</author>
      <category>rust</category>
      <category>search</category>
      <description>An opening post.</description>
    </item>
    <item>
      <title>Second post</title>
      <link>https://blog.example/second</link>
    </item>
  </channel>
</rss>"#;

    const ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Example Feed</title>
  <id>urn:uuid:60a76c80-d399-11d9-b93C-0003939e0af6</id>
  <updated>2025-01-06T18:30:02Z</updated>
  <entry>
    <title>Atom entry</title>
    <link href="https://atom.example/entry"/>
    <id>urn:uuid:1225c695-cfb8-4ebb-aaaa-80da344efa6a</id>
    <updated>2025-01-06T18:30:02Z</updated>
  </entry>
</feed>"#;

    #[test]
    fn rss_entries_keep_publisher_order() {
        let entries = parse_feed(RSS.as_bytes()).expect("parse");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].link, "https://blog.example/first");
        assert_eq!(entries[1].link, "https://blog.example/second");
    }

    #[test]
    fn rss_entry_fields_are_mapped() {
        let entries = parse_feed(RSS.as_bytes()).expect("parse");
        let first = &entries[0];

        assert_eq!(first.display_title(), "First post");
        assert!(first.published.as_deref().is_some_and(|p| p.starts_with("2025-01-06")));
        assert_eq!(first.categories, vec!["rust", "search"]);
        assert_eq!(first.summary.as_deref(), Some("An opening post."));
    }

    #[test]
    fn atom_feeds_parse_too() {
        let entries = parse_feed(ATOM.as_bytes()).expect("parse");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].link, "https://atom.example/entry");
        assert_eq!(entries[0].display_title(), "Atom entry");
    }

    #[test]
    fn malformed_feed_is_a_parse_error() {
        let err = parse_feed(b"<html><body>not a feed</body></html>").unwrap_err();
        assert!(matches!(err, ExtractError::FeedParse(_)));
    }

    #[test]
    fn metadata_contains_the_entry_fields() {
        let entries = parse_feed(RSS.as_bytes()).expect("parse");
        let metadata = entries[0].metadata();

        assert_eq!(metadata["link"], "https://blog.example/first");
        assert_eq!(metadata["title"], "First post");
        assert_eq!(metadata["categories"], "rust, search");
    }

    #[test]
    fn title_falls_back_to_link() {
        let rss = r#"<rss version="2.0"><channel><title>t</title>
            <item><link>https://blog.example/untitled</link></item>
        </channel></rss>"#;

        let entries = parse_feed(rss.as_bytes()).expect("parse");
        assert_eq!(entries[0].display_title(), "https://blog.example/untitled");
    }
}
